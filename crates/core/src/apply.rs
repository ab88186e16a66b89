use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameTask {
    pub source: PathBuf,
    pub proposed_name: String,
}

impl RenameTask {
    pub fn current_name(&self) -> String {
        self.source
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn target_path(&self) -> PathBuf {
        self.source
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&self.proposed_name)
    }

    pub fn is_noop(&self) -> bool {
        self.proposed_name.is_empty() || self.proposed_name == self.current_name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub source: PathBuf,
    pub current_name: String,
    pub proposed_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    pub applied: usize,
    pub skipped: usize,
    pub failures: Vec<TaskFailure>,
}

pub fn apply_tasks(tasks: &[RenameTask]) -> ApplyResult {
    let mut result = ApplyResult::default();

    for task in tasks {
        if task.is_noop() {
            result.skipped += 1;
            continue;
        }

        let target = task.target_path();
        if target.exists() {
            result.failures.push(failure_for(
                task,
                "同名のファイルが既に存在します".to_string(),
            ));
            continue;
        }

        match fs::rename(&task.source, &target) {
            Ok(()) => result.applied += 1,
            Err(err) => result
                .failures
                .push(failure_for(task, format!("リネームに失敗しました: {err}"))),
        }
    }

    result
}

fn failure_for(task: &RenameTask, reason: String) -> TaskFailure {
    TaskFailure {
        source: task.source.clone(),
        current_name: task.current_name(),
        proposed_name: task.proposed_name.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn task(dir: &Path, current: &str, proposed: &str) -> RenameTask {
        RenameTask {
            source: dir.join(current),
            proposed_name: proposed.to_string(),
        }
    }

    #[test]
    fn renames_each_task_in_place() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a.png"), b"a").expect("write a");
        fs::write(temp.path().join("b.png"), b"b").expect("write b");

        let tasks = vec![
            task(temp.path(), "a.png", "one.png"),
            task(temp.path(), "b.png", "two.png"),
        ];
        let result = apply_tasks(&tasks);

        assert_eq!(result.applied, 2);
        assert!(result.failures.is_empty());
        assert!(temp.path().join("one.png").exists());
        assert!(temp.path().join("two.png").exists());
    }

    #[test]
    fn noop_tasks_are_skipped() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a.png"), b"a").expect("write a");

        let result = apply_tasks(&[task(temp.path(), "a.png", "a.png")]);
        assert_eq!(result.applied, 0);
        assert_eq!(result.skipped, 1);
        assert!(temp.path().join("a.png").exists());
    }

    #[test]
    fn failed_task_does_not_abort_the_rest() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join("a.png"), b"a").expect("write a");
        fs::write(temp.path().join("taken.png"), b"x").expect("write taken");
        fs::write(temp.path().join("b.png"), b"b").expect("write b");

        let tasks = vec![
            task(temp.path(), "a.png", "taken.png"),
            task(temp.path(), "missing.png", "other.png"),
            task(temp.path(), "b.png", "renamed.png"),
        ];
        let result = apply_tasks(&tasks);

        assert_eq!(result.applied, 1);
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.failures[0].proposed_name, "taken.png");
        assert_eq!(result.failures[0].current_name, "a.png");
        assert!(temp.path().join("a.png").exists(), "collision leaves source");
        assert!(temp.path().join("renamed.png").exists());
    }
}
