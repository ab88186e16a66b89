use crate::dedup::DuplicateNumberPolicy;
use crate::sanitize::sanitize_delimiter;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub image_name_pattern: String,
    pub dup_number_at_start: bool,
    pub dup_number_delimiter: String,
    pub dup_number_always: bool,
    pub handle_all_attachments: bool,
    pub exclude_extension_pattern: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            image_name_pattern: crate::DEFAULT_NAME_PATTERN.to_string(),
            dup_number_at_start: false,
            dup_number_delimiter: "-".to_string(),
            dup_number_always: false,
            handle_all_attachments: false,
            exclude_extension_pattern: String::new(),
        }
    }
}

impl AppConfig {
    pub fn policy(&self) -> DuplicateNumberPolicy {
        DuplicateNumberPolicy {
            at_start: self.dup_number_at_start,
            delimiter: sanitize_delimiter(&self.dup_number_delimiter, "-"),
            always: self.dup_number_always,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "attach-renamer", "attach-renamer")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(&paths.config_path).with_context(|| {
        format!(
            "設定ファイルを読めませんでした: {}",
            paths.config_path.display()
        )
    })?;

    let mut config =
        toml::from_str::<AppConfig>(&raw).context("設定ファイルのパースに失敗しました")?;
    config.dup_number_delimiter = sanitize_delimiter(&config.dup_number_delimiter, "-");
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    fs::create_dir_all(&paths.config_dir).with_context(|| {
        format!(
            "設定ディレクトリを作成できませんでした: {}",
            paths.config_dir.display()
        )
    })?;
    let body = toml::to_string_pretty(config).context("設定のシリアライズに失敗しました")?;
    fs::write(&paths.config_path, body).with_context(|| {
        format!(
            "設定ファイルを書き込めませんでした: {}",
            paths.config_path.display()
        )
    })?;
    Ok(())
}
