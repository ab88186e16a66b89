use crate::apply::RenameTask;
use crate::batch::{match_embeds, MatchPattern};
use crate::dedup::{deduplicate, DuplicateNumberPolicy};
use crate::note::parse_note;
use crate::resolver::{list_sibling_names, resolve_embed};
use crate::sanitize::{is_meaningful, sanitize_filename};
use crate::template::{render_pattern, TemplateContext};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "tiff",
];

#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub note_path: PathBuf,
    pub vault_root: PathBuf,
    pub image_name_pattern: String,
    pub policy: DuplicateNumberPolicy,
    pub handle_all_attachments: bool,
    pub exclude_extension_pattern: String,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            note_path: PathBuf::new(),
            vault_root: PathBuf::new(),
            image_name_pattern: crate::DEFAULT_NAME_PATTERN.to_string(),
            policy: DuplicateNumberPolicy::default(),
            handle_all_attachments: false,
            exclude_extension_pattern: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewName {
    pub stem: String,
    pub name: String,
    pub is_meaningful: bool,
}

pub fn generate_new_name(
    pattern: &str,
    context: &TemplateContext,
    extension: &str,
    delimiter: &str,
    now: DateTime<Local>,
) -> NewName {
    let rendered = render_pattern(pattern, context, now);
    let stem = sanitize_filename(&rendered);
    let name = if extension.is_empty() {
        stem.clone()
    } else {
        format!("{stem}.{extension}")
    };
    NewName {
        is_meaningful: is_meaningful(&stem, delimiter),
        stem,
        name,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanStats {
    pub embeds: usize,
    pub unresolved: usize,
    pub skipped_extension: usize,
    pub skipped_meaningless: usize,
    pub planned: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub note_path: PathBuf,
    pub pattern: String,
    pub tasks: Vec<RenameTask>,
    pub stats: PlanStats,
}

pub fn generate_plan(options: &PlanOptions) -> Result<RenamePlan> {
    generate_plan_at(options, Local::now())
}

pub fn generate_plan_at(options: &PlanOptions, now: DateTime<Local>) -> Result<RenamePlan> {
    if !options.note_path.exists() {
        anyhow::bail!("ノートが存在しません: {}", options.note_path.display());
    }

    let exclude = compile_exclude(&options.exclude_extension_pattern)?;
    let parsed = parse_note(&options.note_path)?;
    let note_dir = parent_dir(&options.note_path);
    let context = parsed.context.template_context();
    let delimiter = options.policy.effective_delimiter();

    let mut stats = PlanStats::default();
    let mut tasks = Vec::new();
    let mut seen_sources = HashSet::<PathBuf>::new();
    let mut planned_names = HashMap::<PathBuf, Vec<String>>::new();

    for link in &parsed.embeds {
        stats.embeds += 1;
        let Some(file) = resolve_embed(&options.vault_root, &note_dir, link) else {
            stats.unresolved += 1;
            continue;
        };
        if !seen_sources.insert(file.path.clone()) {
            continue;
        }
        if file.extension.eq_ignore_ascii_case("md") {
            stats.skipped_extension += 1;
            continue;
        }
        if !options.handle_all_attachments && !is_image_extension(&file.extension) {
            stats.skipped_extension += 1;
            continue;
        }
        if let Some(exclude) = &exclude {
            if exclude.is_match(&file.extension) {
                stats.skipped_extension += 1;
                continue;
            }
        }

        let new_name = generate_new_name(
            &options.image_name_pattern,
            &context,
            &file.extension,
            &delimiter,
            now,
        );
        if !new_name.is_meaningful {
            stats.skipped_meaningless += 1;
            continue;
        }

        let parent = parent_dir(&file.path);
        let mut siblings: Vec<String> = list_sibling_names(&parent)
            .into_iter()
            .filter(|name| name != &file.name)
            .collect();
        if let Some(extra) = planned_names.get(&parent) {
            siblings.extend_from_slice(extra);
        }

        let dedup = deduplicate(&new_name.name, &siblings, &options.policy);
        if dedup.name == file.name {
            stats.unchanged += 1;
            continue;
        }

        planned_names.entry(parent).or_default().push(dedup.name.clone());
        stats.planned += 1;
        tasks.push(RenameTask {
            source: file.path,
            proposed_name: dedup.name,
        });
    }

    Ok(RenamePlan {
        note_path: options.note_path.clone(),
        pattern: options.image_name_pattern.clone(),
        tasks,
        stats,
    })
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub note_path: PathBuf,
    pub vault_root: PathBuf,
    pub pattern: MatchPattern,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub embeds: usize,
    pub unresolved: usize,
    pub matched: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlan {
    pub note_path: PathBuf,
    pub tasks: Vec<RenameTask>,
    pub stats: BatchStats,
}

pub fn generate_batch_plan(options: &BatchOptions) -> Result<BatchPlan> {
    if !options.note_path.exists() {
        anyhow::bail!("ノートが存在しません: {}", options.note_path.display());
    }

    let compiled = options.pattern.compile()?;
    let parsed = parse_note(&options.note_path)?;
    let note_dir = parent_dir(&options.note_path);

    let mut stats = BatchStats::default();
    let mut embeds = Vec::new();
    for link in &parsed.embeds {
        stats.embeds += 1;
        match resolve_embed(&options.vault_root, &note_dir, link) {
            Some(file) => embeds.push(file),
            None => stats.unresolved += 1,
        }
    }

    let tasks = match_embeds(&embeds, &compiled);
    stats.matched = tasks.len();

    Ok(BatchPlan {
        note_path: options.note_path.clone(),
        tasks,
        stats,
    })
}

fn compile_exclude(pattern: &str) -> Result<Option<Regex>> {
    if pattern.is_empty() {
        return Ok(None);
    }
    let regex = Regex::new(pattern)
        .with_context(|| format!("除外拡張子パターンが不正です: {pattern}"))?;
    Ok(Some(regex))
}

fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|image_ext| image_ext.eq_ignore_ascii_case(extension))
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn instant() -> DateTime<Local> {
        Local.with_ymd_and_hms(2022, 4, 8, 9, 5, 7).unwrap()
    }

    fn write_note(vault: &Path, name: &str, content: &str) -> PathBuf {
        let path = vault.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("note dir");
        }
        fs::write(&path, content).expect("write note");
        path
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dirs");
        }
        fs::write(path, b"x").expect("touch file");
    }

    fn options(note_path: PathBuf, vault_root: PathBuf, pattern: &str) -> PlanOptions {
        PlanOptions {
            note_path,
            vault_root,
            image_name_pattern: pattern.to_string(),
            ..PlanOptions::default()
        }
    }

    #[test]
    fn generate_new_name_sanitizes_and_appends_extension() {
        let context = TemplateContext {
            file_name: "a/b".to_string(),
            ..TemplateContext::default()
        };
        let new_name = generate_new_name("{{fileName}}", &context, "png", "-", instant());
        assert_eq!(new_name.stem, "a_b");
        assert_eq!(new_name.name, "a_b.png");
        assert!(new_name.is_meaningful);
    }

    #[test]
    fn generate_new_name_flags_meaningless_stems() {
        let context = TemplateContext::default();
        let new_name = generate_new_name("{{imageNameKey}}", &context, "png", "-", instant());
        assert_eq!(new_name.name, ".png");
        assert!(!new_name.is_meaningful);
    }

    #[test]
    fn plan_renames_image_embeds_with_rendered_pattern() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("Pasted image 1.png"));
        let note = write_note(vault, "meeting.md", "![[Pasted image 1.png]]\n");

        let plan = generate_plan_at(
            &options(note, vault.to_path_buf(), "{{fileName}}-{{DATE:YYYYMMDD}}"),
            instant(),
        )
        .expect("plan should build");

        assert_eq!(plan.stats.planned, 1);
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].proposed_name, "meeting-20220408.png");
    }

    #[test]
    fn plan_deduplicates_against_existing_siblings() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("img.png"));
        touch(&vault.join("meeting.png"));
        touch(&vault.join("meeting-2.png"));
        let note = write_note(vault, "meeting.md", "![[img.png]]\n");

        let plan = generate_plan_at(
            &options(note, vault.to_path_buf(), "{{fileName}}"),
            instant(),
        )
        .expect("plan should build");

        assert_eq!(plan.tasks[0].proposed_name, "meeting-3.png");
    }

    #[test]
    fn plan_deduplicates_within_the_plan_itself() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("a.png"));
        touch(&vault.join("b.png"));
        let note = write_note(vault, "meeting.md", "![[a.png]]\n![[b.png]]\n");

        let plan = generate_plan_at(
            &options(note, vault.to_path_buf(), "{{fileName}}"),
            instant(),
        )
        .expect("plan should build");

        let names: Vec<&str> = plan
            .tasks
            .iter()
            .map(|task| task.proposed_name.as_str())
            .collect();
        assert_eq!(names, vec!["meeting.png", "meeting-1.png"]);
    }

    #[test]
    fn plan_skips_non_image_attachments_by_default() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("report.pdf"));
        let note = write_note(vault, "meeting.md", "![[report.pdf]]\n");

        let base = options(note, vault.to_path_buf(), "{{fileName}}");
        let plan = generate_plan_at(&base, instant()).expect("plan should build");
        assert_eq!(plan.stats.skipped_extension, 1);
        assert!(plan.tasks.is_empty());

        let all = PlanOptions {
            handle_all_attachments: true,
            ..base
        };
        let plan = generate_plan_at(&all, instant()).expect("plan should build");
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].proposed_name, "meeting.pdf");
    }

    #[test]
    fn plan_honors_exclude_extension_pattern() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("anim.gif"));
        let note = write_note(vault, "meeting.md", "![[anim.gif]]\n");

        let plan_options = PlanOptions {
            exclude_extension_pattern: "gif|bmp".to_string(),
            ..options(note, vault.to_path_buf(), "{{fileName}}")
        };
        let plan = generate_plan_at(&plan_options, instant()).expect("plan should build");
        assert_eq!(plan.stats.skipped_extension, 1);
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn plan_rejects_invalid_exclude_pattern() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        let note = write_note(vault, "meeting.md", "");

        let plan_options = PlanOptions {
            exclude_extension_pattern: "gif(".to_string(),
            ..options(note, vault.to_path_buf(), "{{fileName}}")
        };
        let err = generate_plan_at(&plan_options, instant()).expect_err("must fail");
        assert!(err.to_string().contains("除外拡張子パターンが不正です"));
    }

    #[test]
    fn plan_skips_meaningless_rendered_names() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("img.png"));
        let note = write_note(vault, "meeting.md", "![[img.png]]\n");

        let plan = generate_plan_at(
            &options(note, vault.to_path_buf(), "{{imageNameKey}}"),
            instant(),
        )
        .expect("plan should build");

        assert_eq!(plan.stats.skipped_meaningless, 1);
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn plan_marks_already_named_files_unchanged() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("meeting.png"));
        let note = write_note(vault, "meeting.md", "![[meeting.png]]\n");

        let plan = generate_plan_at(
            &options(note, vault.to_path_buf(), "{{fileName}}"),
            instant(),
        )
        .expect("plan should build");

        assert_eq!(plan.stats.unchanged, 1);
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn plan_counts_unresolved_embeds() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        let note = write_note(vault, "meeting.md", "![[missing.png]]\n");

        let plan = generate_plan_at(
            &options(note, vault.to_path_buf(), "{{fileName}}"),
            instant(),
        )
        .expect("plan should build");

        assert_eq!(plan.stats.unresolved, 1);
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn batch_plan_matches_and_replaces() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("img1.png"));
        touch(&vault.join("img2.png"));
        touch(&vault.join("chart.png"));
        let note = write_note(
            vault,
            "meeting.md",
            "![[img1.png]]\n![[chart.png]]\n![[img2.png]]\n",
        );

        let plan = generate_batch_plan(&BatchOptions {
            note_path: note,
            vault_root: vault.to_path_buf(),
            pattern: MatchPattern {
                name_pattern: r"^img(\d+)$".to_string(),
                ext_pattern: String::new(),
                name_replace: "photo-$1".to_string(),
            },
        })
        .expect("batch plan should build");

        assert_eq!(plan.stats.embeds, 3);
        assert_eq!(plan.stats.matched, 2);
        let names: Vec<&str> = plan
            .tasks
            .iter()
            .map(|task| task.proposed_name.as_str())
            .collect();
        assert_eq!(names, vec!["photo-1.png", "photo-2.png"]);
    }

    #[test]
    fn batch_plan_surfaces_invalid_pattern_once() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        let note = write_note(vault, "meeting.md", "![[a.png]]\n");

        let err = generate_batch_plan(&BatchOptions {
            note_path: note,
            vault_root: vault.to_path_buf(),
            pattern: MatchPattern {
                name_pattern: "img(".to_string(),
                ext_pattern: String::new(),
                name_replace: String::new(),
            },
        })
        .expect_err("invalid pattern must fail");
        assert!(err.to_string().contains("名前パターンが不正です"));
    }
}
