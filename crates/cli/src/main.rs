use anyhow::Result;
use attach_renamer_core::{
    app_paths, apply_tasks, generate_batch_plan, generate_plan, load_config, validate_pattern,
    ApplyResult, BatchOptions, BatchPlan, DuplicateNumberPolicy, MatchPattern, PlanOptions,
    RenamePlan, RenameTask,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "attach-renamer-cli")]
#[command(about = "ノートの添付ファイルをテンプレートで一括リネームします")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
    Batch(BatchArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
}

#[derive(Debug, Args)]
struct RenameArgs {
    #[arg(long)]
    note: PathBuf,
    #[arg(long)]
    vault: Option<PathBuf>,
    #[arg(long)]
    pattern: Option<String>,
    #[arg(long, default_value_t = false)]
    all_attachments: bool,
    #[arg(long)]
    exclude_ext: Option<String>,
    #[arg(long, default_value_t = false)]
    at_start: bool,
    #[arg(long)]
    delimiter: Option<String>,
    #[arg(long, default_value_t = false)]
    always_number: bool,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
struct BatchArgs {
    #[arg(long)]
    note: PathBuf,
    #[arg(long)]
    vault: Option<PathBuf>,
    #[arg(long)]
    name_pattern: String,
    #[arg(long, default_value = "")]
    ext_pattern: String,
    #[arg(long, default_value = "")]
    name_replace: String,
    #[arg(long, default_value_t = false)]
    apply: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Batch(args) => cmd_batch(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let config = load_config()?;
    let pattern = args
        .pattern
        .unwrap_or_else(|| config.image_name_pattern.clone());
    validate_pattern(&pattern)?;

    let options = PlanOptions {
        vault_root: vault_root_for(&args.note, args.vault),
        note_path: args.note,
        image_name_pattern: pattern,
        policy: DuplicateNumberPolicy {
            at_start: args.at_start || config.dup_number_at_start,
            delimiter: args
                .delimiter
                .unwrap_or_else(|| config.dup_number_delimiter.clone()),
            always: args.always_number || config.dup_number_always,
        },
        handle_all_attachments: args.all_attachments || config.handle_all_attachments,
        exclude_extension_pattern: args
            .exclude_ext
            .unwrap_or_else(|| config.exclude_extension_pattern.clone()),
    };

    let plan = generate_plan(&options)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Table => print_plan_table(&plan),
    }

    finish(&plan.tasks, args.apply)
}

fn cmd_batch(args: BatchArgs) -> Result<()> {
    let options = BatchOptions {
        vault_root: vault_root_for(&args.note, args.vault),
        note_path: args.note,
        pattern: MatchPattern {
            name_pattern: args.name_pattern,
            ext_pattern: args.ext_pattern,
            name_replace: args.name_replace,
        },
    };

    let plan = generate_batch_plan(&options)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Table => print_batch_table(&plan),
    }

    finish(&plan.tasks, args.apply)
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("設定ファイル: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn vault_root_for(note: &PathBuf, vault: Option<PathBuf>) -> PathBuf {
    vault.unwrap_or_else(|| {
        note.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn finish(tasks: &[RenameTask], apply: bool) -> Result<()> {
    if !apply {
        eprintln!(
            "dry-runモード: 実ファイルは変更していません。適用するには --apply を指定してください。"
        );
        return Ok(());
    }

    let result = apply_tasks(tasks);
    report_apply(&result);
    Ok(())
}

fn report_apply(result: &ApplyResult) {
    eprintln!(
        "適用完了: {}件 (スキップ {}件, 失敗 {}件)",
        result.applied,
        result.skipped,
        result.failures.len()
    );
    for failure in &result.failures {
        eprintln!(
            "リネーム失敗: {} -> {} ({})",
            failure.current_name, failure.proposed_name, failure.reason
        );
    }
}

fn print_plan_table(plan: &RenamePlan) {
    println!("元ファイル -> 新ファイル");
    for task in &plan.tasks {
        println!("{} -> {}", task.source.display(), task.proposed_name);
    }

    println!(
        "\n集計: embeds={} unresolved={} ext_skip={} meaningless_skip={} planned={} unchanged={}",
        plan.stats.embeds,
        plan.stats.unresolved,
        plan.stats.skipped_extension,
        plan.stats.skipped_meaningless,
        plan.stats.planned,
        plan.stats.unchanged
    );
}

fn print_batch_table(plan: &BatchPlan) {
    println!("元ファイル -> 新ファイル");
    for task in &plan.tasks {
        println!("{} -> {}", task.source.display(), task.proposed_name);
    }

    println!(
        "\n集計: embeds={} unresolved={} matched={}",
        plan.stats.embeds, plan.stats.unresolved, plan.stats.matched
    );
}
