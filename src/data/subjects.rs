use crate::error::{CorrelationError, Result};
use std::path::{Path, PathBuf};

/// Resource files of one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFiles {
    pub id: usize,
    pub acc_path: PathBuf,
    pub hr_path: PathBuf,
}

impl SubjectFiles {
    /// `<root>/NNN/ACC_NNN.csv` and `<root>/NNN/HR_NNN.csv`
    pub fn locate(root: &Path, id: usize) -> Self {
        let number = format!("{:03}", id);
        let dir = root.join(&number);
        Self {
            id,
            acc_path: dir.join(format!("ACC_{}.csv", number)),
            hr_path: dir.join(format!("HR_{}.csv", number)),
        }
    }
}

/// Subjects `1..=count` whose ACC and HR files both exist and are non-empty.
pub fn discover_subjects(root: &Path, count: usize) -> Result<Vec<SubjectFiles>> {
    if !root.is_dir() {
        return Err(CorrelationError::DataLoading(format!(
            "Resource folder not found: {}",
            root.display()
        )));
    }

    let mut subjects = Vec::new();
    for id in 1..=count {
        let files = SubjectFiles::locate(root, id);

        if !files.acc_path.is_file() || !files.hr_path.is_file() {
            log::warn!("Subject {:03} will not be processed due to missing file(s)", id);
            continue;
        }
        if is_empty(&files.acc_path)? || is_empty(&files.hr_path)? {
            log::warn!("Subject's {:03} file(s) are empty, skipping", id);
            continue;
        }

        log::info!("Subject's {:03} resource files found", id);
        subjects.push(files);
    }

    Ok(subjects)
}

fn is_empty(path: &Path) -> Result<bool> {
    Ok(std::fs::metadata(path)?.len() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_skips_missing_and_empty() {
        let root = std::env::temp_dir().join(format!("hrcorr_subjects_{}", std::process::id()));
        for (id, acc, hr) in [(1, "h\n1", "h\n1"), (2, "h\n1", ""), (4, "h\n1", "h\n1")] {
            let files = SubjectFiles::locate(&root, id);
            fs::create_dir_all(files.acc_path.parent().unwrap()).unwrap();
            fs::write(&files.acc_path, acc).unwrap();
            fs::write(&files.hr_path, hr).unwrap();
        }

        let subjects = discover_subjects(&root, 5).unwrap();
        fs::remove_dir_all(&root).ok();

        let ids: Vec<usize> = subjects.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert!(subjects[0].acc_path.ends_with("001/ACC_001.csv"));
    }

    #[test]
    fn test_missing_root_is_error() {
        let result = discover_subjects(Path::new("/definitely/not/here"), 16);
        assert!(matches!(result, Err(CorrelationError::DataLoading(_))));
    }
}
