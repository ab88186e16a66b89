use crate::template::TemplateContext;
use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("valid heading regex"));
static WIKI_EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\[\]]+)\]\]").expect("valid wiki embed regex"));
static MARKDOWN_EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(([^()]+)\)").expect("valid markdown embed regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum FrontmatterValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

impl FrontmatterValue {
    pub fn as_binding(&self) -> Option<String> {
        match self {
            FrontmatterValue::Text(text) => Some(text.clone()),
            FrontmatterValue::Number(number) => {
                if number.fract() == 0.0 && number.is_finite() && number.abs() < 1e15 {
                    Some((*number as i64).to_string())
                } else {
                    Some(number.to_string())
                }
            }
            FrontmatterValue::Bool(flag) => Some(flag.to_string()),
        }
    }

    fn from_yaml(value: &serde_yaml::Value) -> Option<FrontmatterValue> {
        match value {
            serde_yaml::Value::String(text) => Some(FrontmatterValue::Text(text.clone())),
            serde_yaml::Value::Number(number) => number.as_f64().map(FrontmatterValue::Number),
            serde_yaml::Value::Bool(flag) => Some(FrontmatterValue::Bool(*flag)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEntry {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct NoteContext {
    pub path: PathBuf,
    pub file_name: String,
    pub dir_name: String,
    pub frontmatter: BTreeMap<String, FrontmatterValue>,
    pub headings: Vec<HeadingEntry>,
}

impl NoteContext {
    pub fn first_heading(&self) -> String {
        self.headings
            .iter()
            .find(|heading| heading.level == 1)
            .map(|heading| heading.text.clone())
            .unwrap_or_default()
    }

    pub fn image_name_key(&self) -> String {
        self.frontmatter
            .get("imageNameKey")
            .and_then(FrontmatterValue::as_binding)
            .unwrap_or_default()
    }

    pub fn template_context(&self) -> TemplateContext {
        TemplateContext {
            image_name_key: self.image_name_key(),
            file_name: self.file_name.clone(),
            dir_name: self.dir_name.clone(),
            first_heading: self.first_heading(),
            frontmatter: self.frontmatter.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParsedNote {
    pub context: NoteContext,
    pub embeds: Vec<String>,
}

pub fn parse_note(path: &Path) -> Result<ParsedNote> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("ノートを読めませんでした: {}", path.display()))?;
    Ok(parse_note_content(path, &content))
}

pub fn parse_note_content(path: &Path, content: &str) -> ParsedNote {
    let (frontmatter_block, body) = split_frontmatter(content);
    let frontmatter = frontmatter_block
        .map(parse_frontmatter)
        .unwrap_or_default();

    let mut headings = Vec::new();
    let mut embeds = Vec::new();
    let mut fence: Option<&str> = None;
    for line in body.lines() {
        let trimmed = line.trim_start();
        let marker = ["```", "~~~"]
            .into_iter()
            .find(|marker| trimmed.starts_with(marker));
        match (fence, marker) {
            // 閉じるのは開いたときと同じマーカーのみ
            (Some(open), Some(marker)) if open == marker => {
                fence = None;
                continue;
            }
            (Some(_), _) => continue,
            (None, Some(marker)) => {
                fence = Some(marker);
                continue;
            }
            (None, None) => {}
        }

        if let Some(caps) = HEADING_RE.captures(line) {
            headings.push(HeadingEntry {
                level: caps[1].len() as u8,
                text: caps[2].trim().to_string(),
            });
        }

        for caps in WIKI_EMBED_RE.captures_iter(line) {
            if let Some(link) = clean_wiki_target(&caps[1]) {
                embeds.push(link);
            }
        }
        for caps in MARKDOWN_EMBED_RE.captures_iter(line) {
            if let Some(link) = clean_markdown_target(&caps[1]) {
                embeds.push(link);
            }
        }
    }

    let file_name = path
        .file_stem()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    let dir_name = path
        .parent()
        .and_then(|parent| parent.file_name())
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();

    ParsedNote {
        context: NoteContext {
            path: path.to_path_buf(),
            file_name,
            dir_name,
            frontmatter,
            headings,
        },
        embeds,
    }
}

fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let Some(body) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&body[..offset]), &body[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, content)
}

fn parse_frontmatter(block: &str) -> BTreeMap<String, FrontmatterValue> {
    let Ok(mapping) = serde_yaml::from_str::<serde_yaml::Mapping>(block) else {
        return BTreeMap::new();
    };

    let mut frontmatter = BTreeMap::new();
    for (key, value) in &mapping {
        let Some(key) = key.as_str() else {
            continue;
        };
        if let Some(value) = FrontmatterValue::from_yaml(value) {
            frontmatter.insert(key.to_string(), value);
        }
    }
    frontmatter
}

fn clean_wiki_target(raw: &str) -> Option<String> {
    let target = raw.split('|').next().unwrap_or(raw);
    let target = target.split('#').next().unwrap_or(target).trim();
    if target.is_empty() {
        return None;
    }
    Some(target.to_string())
}

fn clean_markdown_target(raw: &str) -> Option<String> {
    let target = raw.split_whitespace().next().unwrap_or(raw);
    let target = target.trim_start_matches('<').trim_end_matches('>');
    if target.is_empty() || target.contains("://") {
        return None;
    }
    let decoded = percent_decode_str(target).decode_utf8().ok()?;
    Some(decoded.to_string())
}
