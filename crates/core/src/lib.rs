mod apply;
mod batch;
mod config;
mod dedup;
mod note;
mod planner;
mod resolver;
mod sanitize;
mod template;

pub const DEFAULT_NAME_PATTERN: &str = "{{fileName}}";

pub use apply::{apply_tasks, ApplyResult, RenameTask, TaskFailure};
pub use batch::{match_embeds, CompiledMatchPattern, MatchPattern, MatchPatternError};
pub use config::{app_paths, load_config, save_config, AppConfig, AppPaths};
pub use dedup::{deduplicate, split_name, DedupName, DuplicateNumberPolicy};
pub use note::{parse_note, parse_note_content, FrontmatterValue, HeadingEntry, NoteContext, ParsedNote};
pub use planner::{
    generate_batch_plan, generate_new_name, generate_plan, generate_plan_at, BatchOptions,
    BatchPlan, BatchStats, NewName, PlanOptions, PlanStats, RenamePlan, IMAGE_EXTENSIONS,
};
pub use resolver::{list_sibling_names, resolve_embed, EmbedFile};
pub use sanitize::{is_meaningful, sanitize_delimiter, sanitize_filename};
pub use template::{render_pattern, validate_pattern, PatternError, TemplateContext};
