//! Executor for a local deployment target

use camino::Utf8Path;
use walkdir::WalkDir;

use super::{ExecError, RemoteExecutor};

/// Runs every operation directly against the local filesystem.
///
/// Used when no host is configured, and by the integration tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl RemoteExecutor for LocalExecutor {
    fn list_directory(&self, path: &Utf8Path) -> Result<Vec<String>, ExecError> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let name = entry
                .file_name()
                .into_string()
                .map_err(|name| ExecError::NonUtf8Path { path: name.into() })?;
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn make_directory(&self, path: &Utf8Path) -> Result<(), ExecError> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    fn create_directory(&self, path: &Utf8Path) -> Result<(), ExecError> {
        std::fs::create_dir(path)?;
        Ok(())
    }

    fn copy_tree(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), ExecError> {
        std::fs::create_dir_all(dst)?;

        for entry in WalkDir::new(src).follow_links(false) {
            let entry = entry.map_err(std::io::Error::from)?;

            let src_path = Utf8Path::from_path(entry.path()).ok_or_else(|| {
                ExecError::NonUtf8Path {
                    path: entry.path().to_path_buf(),
                }
            })?;

            let rel_path = src_path
                .strip_prefix(src)
                .expect("walked path is under its root - this is a bug in shipway");
            let dst_path = dst.join(rel_path);

            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dst_path)?;
            } else if entry.file_type().is_symlink() {
                // Preserve symlinks within the copied tree
                let target = std::fs::read_link(entry.path())?;
                if dst_path.symlink_metadata().is_ok() {
                    std::fs::remove_file(&dst_path)?;
                }
                std::os::unix::fs::symlink(target, &dst_path)?;
            } else {
                if let Some(parent) = dst_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(src_path, &dst_path)?;
            }
        }

        Ok(())
    }

    fn remove_tree(&self, path: &Utf8Path) -> Result<(), ExecError> {
        // rm -rf semantics: a missing path is not an error
        let metadata = match path.symlink_metadata() {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            std::fs::remove_dir_all(path)?;
        } else {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn create_symlink(&self, target: &Utf8Path, link: &Utf8Path) -> Result<(), ExecError> {
        std::os::unix::fs::symlink(target, link)?;
        Ok(())
    }

    fn atomic_rename(&self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), ExecError> {
        // rename(2) replaces an existing destination atomically
        std::fs::rename(src, dst)?;
        Ok(())
    }

    fn exists(&self, path: &Utf8Path) -> Result<bool, ExecError> {
        match path.symlink_metadata() {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::{Utf8Path, Utf8PathBuf};
    use std::fs;
    use tempfile::TempDir;

    fn utf8(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(temp_dir.path()).unwrap().to_path_buf()
    }

    #[test]
    fn test_list_directory_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let dir = utf8(&temp_dir);

        fs::create_dir(dir.join("b")).unwrap();
        fs::create_dir(dir.join("a")).unwrap();
        fs::write(dir.join("c.txt"), "x").unwrap();

        let names = LocalExecutor.list_directory(&dir).unwrap();
        assert_eq!(names, vec!["a", "b", "c.txt"]);
    }

    #[test]
    fn test_list_directory_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let dir = utf8(&temp_dir);

        assert!(LocalExecutor.list_directory(&dir.join("missing")).is_err());
    }

    #[test]
    fn test_copy_tree() {
        let temp_dir = TempDir::new().unwrap();
        let dir = utf8(&temp_dir);
        let src = dir.join("src");
        let dst = dir.join("dst");

        fs::create_dir_all(src.join("subdir")).unwrap();
        fs::write(src.join("file1.txt"), "content1").unwrap();
        fs::write(src.join("subdir/file2.txt"), "content2").unwrap();

        LocalExecutor.copy_tree(&src, &dst).unwrap();

        assert_eq!(fs::read_to_string(dst.join("file1.txt")).unwrap(), "content1");
        assert_eq!(
            fs::read_to_string(dst.join("subdir/file2.txt")).unwrap(),
            "content2"
        );
    }

    #[test]
    fn test_create_directory_fails_when_present() {
        let temp_dir = TempDir::new().unwrap();
        let dir = utf8(&temp_dir);
        let path = dir.join("lock");

        LocalExecutor.create_directory(&path).unwrap();
        assert!(LocalExecutor.create_directory(&path).is_err());
    }

    #[test]
    fn test_remove_tree_tolerates_missing() {
        let temp_dir = TempDir::new().unwrap();
        let dir = utf8(&temp_dir);

        LocalExecutor.remove_tree(&dir.join("missing")).unwrap();
    }

    #[test]
    fn test_remove_tree_removes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = utf8(&temp_dir);
        let target = dir.join("tree");

        fs::create_dir_all(target.join("nested")).unwrap();
        fs::write(target.join("nested/file"), "x").unwrap();

        LocalExecutor.remove_tree(&target).unwrap();
        assert!(!target.exists());
    }

    #[test]
    fn test_atomic_rename_replaces_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let dir = utf8(&temp_dir);

        let old_target = dir.join("old");
        let new_target = dir.join("new");
        fs::create_dir(&old_target).unwrap();
        fs::create_dir(&new_target).unwrap();

        let current = dir.join("current");
        let staged = dir.join("current.staged");
        LocalExecutor.create_symlink(&old_target, &current).unwrap();
        LocalExecutor.create_symlink(&new_target, &staged).unwrap();

        LocalExecutor.atomic_rename(&staged, &current).unwrap();

        assert_eq!(
            fs::read_link(&current).unwrap(),
            new_target.as_std_path()
        );
        assert!(staged.symlink_metadata().is_err());
    }

    #[test]
    fn test_exists_sees_dangling_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let dir = utf8(&temp_dir);

        let link = dir.join("dangling");
        LocalExecutor
            .create_symlink(&dir.join("gone"), &link)
            .unwrap();

        assert!(LocalExecutor.exists(&link).unwrap());
        assert!(!LocalExecutor.exists(&dir.join("missing")).unwrap());
    }
}
