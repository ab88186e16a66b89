use crate::dedup::split_name;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFile {
    pub path: PathBuf,
    pub name: String,
    pub stem: String,
    pub extension: String,
}

impl EmbedFile {
    pub fn from_path(path: &Path) -> Option<EmbedFile> {
        let name = path.file_name()?.to_str()?.to_string();
        let (stem, extension) = split_name(&name);
        Some(EmbedFile {
            path: path.to_path_buf(),
            stem: stem.to_string(),
            extension: extension.to_string(),
            name,
        })
    }
}

pub fn resolve_embed(vault_root: &Path, note_dir: &Path, link: &str) -> Option<EmbedFile> {
    let from_root = vault_root.join(link);
    if from_root.is_file() {
        return EmbedFile::from_path(&from_root);
    }

    let from_note = note_dir.join(link);
    if from_note.is_file() {
        return EmbedFile::from_path(&from_note);
    }

    let target_name = Path::new(link).file_name()?.to_string_lossy().to_string();
    for entry in WalkDir::new(vault_root).sort_by_file_name() {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy() == target_name {
            return EmbedFile::from_path(entry.path());
        }
    }

    None
}

pub fn list_sibling_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dirs must be creatable");
        }
        File::create(path).expect("file must be creatable");
    }

    #[test]
    fn resolves_vault_relative_path_first() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("assets/chart.png"));

        let found = resolve_embed(vault, &vault.join("notes"), "assets/chart.png")
            .expect("embed should resolve");
        assert_eq!(found.path, vault.join("assets/chart.png"));
        assert_eq!(found.name, "chart.png");
        assert_eq!(found.stem, "chart");
        assert_eq!(found.extension, "png");
    }

    #[test]
    fn resolves_note_relative_path_second() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        let note_dir = vault.join("notes");
        touch(&note_dir.join("local.png"));

        let found =
            resolve_embed(vault, &note_dir, "local.png").expect("embed should resolve");
        assert_eq!(found.path, note_dir.join("local.png"));
    }

    #[test]
    fn falls_back_to_vault_wide_search_by_file_name() {
        let temp = tempdir().expect("tempdir");
        let vault = temp.path();
        touch(&vault.join("deep/nested/figure.png"));

        let found = resolve_embed(vault, &vault.join("notes"), "figure.png")
            .expect("embed should resolve");
        assert_eq!(found.path, vault.join("deep/nested/figure.png"));
    }

    #[test]
    fn unresolvable_link_returns_none() {
        let temp = tempdir().expect("tempdir");
        assert!(resolve_embed(temp.path(), temp.path(), "missing.png").is_none());
    }

    #[test]
    fn sibling_listing_contains_only_files() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("b.png"));
        touch(&temp.path().join("a.png"));
        fs::create_dir_all(temp.path().join("subdir")).expect("subdir");

        let names = list_sibling_names(temp.path());
        assert_eq!(names, vec!["a.png".to_string(), "b.png".to_string()]);
    }

    #[test]
    fn sibling_listing_of_missing_dir_is_empty() {
        let temp = tempdir().expect("tempdir");
        assert!(list_sibling_names(&temp.path().join("nope")).is_empty());
    }
}
