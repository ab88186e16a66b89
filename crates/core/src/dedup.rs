use crate::sanitize::sanitize_delimiter;
use regex::Regex;
use serde::{Deserialize, Serialize};

const FALLBACK_DELIMITER: &str = "-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateNumberPolicy {
    pub at_start: bool,
    pub delimiter: String,
    pub always: bool,
}

impl Default for DuplicateNumberPolicy {
    fn default() -> Self {
        Self {
            at_start: false,
            delimiter: FALLBACK_DELIMITER.to_string(),
            always: false,
        }
    }
}

impl DuplicateNumberPolicy {
    pub fn effective_delimiter(&self) -> String {
        sanitize_delimiter(&self.delimiter, FALLBACK_DELIMITER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupName {
    pub name: String,
    pub stem: String,
    pub extension: String,
}

pub fn split_name(name: &str) -> (&str, &str) {
    match name.rsplit_once('.') {
        Some((stem, extension)) => (stem, extension),
        None => (name, ""),
    }
}

pub fn deduplicate(
    candidate: &str,
    siblings: &[String],
    policy: &DuplicateNumberPolicy,
) -> DedupName {
    let (stem, extension) = split_name(candidate);
    let unchanged = DedupName {
        name: candidate.to_string(),
        stem: stem.to_string(),
        extension: extension.to_string(),
    };

    let delimiter = policy.effective_delimiter();
    let Some(dup_regex) = build_dup_regex(stem, extension, &delimiter, policy.at_start) else {
        return unchanged;
    };

    let mut exists = false;
    let mut numbers = Vec::new();
    for sibling in siblings {
        if sibling == candidate {
            exists = true;
            continue;
        }
        if let Some(caps) = dup_regex.captures(sibling) {
            if let Ok(number) = caps["number"].parse::<u64>() {
                numbers.push(number);
            }
        }
    }

    if !exists && !policy.always {
        return unchanged;
    }

    let next = numbers.iter().max().map_or(1, |max| max.saturating_add(1));
    let stem = if policy.at_start {
        format!("{next}{delimiter}{stem}")
    } else {
        format!("{stem}{delimiter}{next}")
    };
    let name = if extension.is_empty() {
        stem.clone()
    } else {
        format!("{stem}.{extension}")
    };

    DedupName {
        name,
        stem,
        extension: extension.to_string(),
    }
}

fn build_dup_regex(stem: &str, extension: &str, delimiter: &str, at_start: bool) -> Option<Regex> {
    let stem = regex::escape(stem);
    let delimiter = regex::escape(delimiter);
    let ext_part = if extension.is_empty() {
        String::new()
    } else {
        format!("\\.{}", regex::escape(extension))
    };

    let pattern = if at_start {
        format!("^(?P<number>\\d+){delimiter}(?P<name>{stem}){ext_part}$")
    } else {
        format!("^(?P<name>{stem}){delimiter}(?P<number>\\d+){ext_part}$")
    };

    Regex::new(&pattern).ok()
}
