use crate::apply::RenameTask;
use crate::resolver::EmbedFile;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchPattern {
    pub name_pattern: String,
    pub ext_pattern: String,
    pub name_replace: String,
}

#[derive(Debug, Error)]
pub enum MatchPatternError {
    #[error("名前パターンが空です")]
    EmptyNamePattern,
    #[error("名前パターンが不正です: {0}")]
    InvalidNamePattern(regex::Error),
    #[error("拡張子パターンが不正です: {0}")]
    InvalidExtPattern(regex::Error),
}

#[derive(Debug, Clone)]
pub struct CompiledMatchPattern {
    name: Regex,
    ext: Option<Regex>,
    replace: String,
}

impl MatchPattern {
    pub fn compile(&self) -> Result<CompiledMatchPattern, MatchPatternError> {
        if self.name_pattern.is_empty() {
            return Err(MatchPatternError::EmptyNamePattern);
        }
        let name =
            Regex::new(&self.name_pattern).map_err(MatchPatternError::InvalidNamePattern)?;
        let ext = if self.ext_pattern.is_empty() {
            None
        } else {
            Some(Regex::new(&self.ext_pattern).map_err(MatchPatternError::InvalidExtPattern)?)
        };
        Ok(CompiledMatchPattern {
            name,
            ext,
            replace: normalize_group_refs(&self.name_replace),
        })
    }
}

// `$1_photo` はグループ1とリテラル `_photo` の意味なので `${1}_photo` に揃える
fn normalize_group_refs(replace: &str) -> String {
    let mut out = String::with_capacity(replace.len());
    let mut chars = replace.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                out.push_str("$$");
                chars.next();
            }
            Some(next) if next.is_ascii_digit() => {
                out.push_str("${");
                while let Some(digit) = chars.peek().filter(|c| c.is_ascii_digit()) {
                    out.push(*digit);
                    chars.next();
                }
                out.push('}');
            }
            _ => out.push(ch),
        }
    }

    out
}

pub fn match_embeds(embeds: &[EmbedFile], pattern: &CompiledMatchPattern) -> Vec<RenameTask> {
    let mut tasks = Vec::new();

    for embed in embeds {
        if let Some(ext_regex) = &pattern.ext {
            if !ext_regex.is_match(&embed.extension) {
                continue;
            }
        }
        if !pattern.name.is_match(&embed.stem) {
            continue;
        }

        let proposed_name = if pattern.replace.is_empty() {
            embed.name.clone()
        } else {
            let replaced = pattern.name.replace(&embed.stem, pattern.replace.as_str());
            if embed.extension.is_empty() {
                replaced.into_owned()
            } else {
                format!("{replaced}.{}", embed.extension)
            }
        };

        tasks.push(RenameTask {
            source: embed.path.clone(),
            proposed_name,
        });
    }

    tasks
}
