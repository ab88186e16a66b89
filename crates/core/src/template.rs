use crate::note::FrontmatterValue;
use chrono::{DateTime, Datelike, Local, Timelike};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub image_name_key: String,
    pub file_name: String,
    pub dir_name: String,
    pub first_heading: String,
    pub frontmatter: BTreeMap<String, FrontmatterValue>,
}

impl TemplateContext {
    pub fn binding(&self, key: &str) -> String {
        match key {
            "imageNameKey" => self.image_name_key.clone(),
            "fileName" => self.file_name.clone(),
            "dirName" => self.dir_name.clone(),
            "firstHeading" => self.first_heading.clone(),
            _ => self
                .frontmatter
                .get(key)
                .and_then(FrontmatterValue::as_binding)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("名前パターンが空です")]
    Empty,
    #[error("閉じられていない変数参照があります: {0}")]
    UnterminatedReference(String),
}

pub fn validate_pattern(pattern: &str) -> Result<(), PatternError> {
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    let mut rest = pattern;
    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => rest = &after[end + 2..],
            None => return Err(PatternError::UnterminatedReference(rest[start..].to_string())),
        }
    }

    Ok(())
}

pub fn render_pattern(pattern: &str, context: &TemplateContext, now: DateTime<Local>) -> String {
    let mut output = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(start) = rest.find("{{") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                output.push_str(&expand_reference(&after[..end], context, now));
                rest = &after[end + 2..];
            }
            None => {
                output.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    output.push_str(rest);
    output
}

fn expand_reference(body: &str, context: &TemplateContext, now: DateTime<Local>) -> String {
    if let Some(fmt) = body.strip_prefix("DATE:") {
        return format_date(fmt, now);
    }
    context.binding(body)
}

fn format_date(fmt: &str, now: DateTime<Local>) -> String {
    let chars: Vec<char> = fmt.chars().collect();
    let mut output = String::with_capacity(fmt.len());
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        let run = chars[index..].iter().take_while(|c| **c == ch).count();
        let consumed = match ch {
            'Y' if run >= 4 => {
                output.push_str(&format!("{:04}", now.year()));
                4
            }
            'Y' if run >= 2 => {
                output.push_str(&format!("{:02}", now.year().rem_euclid(100)));
                2
            }
            'Y' => {
                output.push_str(&now.year().to_string());
                1
            }
            'M' => push_padded(&mut output, now.month(), run),
            'D' => push_padded(&mut output, now.day(), run),
            'H' => push_padded(&mut output, now.hour(), run),
            'm' => push_padded(&mut output, now.minute(), run),
            's' => push_padded(&mut output, now.second(), run),
            other => {
                output.push(other);
                1
            }
        };
        index += consumed;
    }

    output
}

fn push_padded(output: &mut String, value: u32, run: usize) -> usize {
    if run >= 2 {
        output.push_str(&format!("{:02}", value));
        2
    } else {
        output.push_str(&value.to_string());
        1
    }
}
