use crate::tree::DiskTree;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::ops::{Deref, DerefMut};

/// Exclusively owned job directory, deleted when dropped.
///
/// Creation fails if the directory already exists, so two jobs can never
/// share one. Dropping also runs while unwinding from a panic.
#[derive(Debug)]
pub struct WorkingTree {
    tree: DiskTree,
}

impl WorkingTree {
    pub fn create(path: Utf8PathBuf) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir(&path)?;
        tracing::debug!("Created working tree {}", path);
        Ok(Self {
            tree: DiskTree::new(path),
        })
    }

    pub fn path(&self) -> &Utf8Path {
        self.tree.root()
    }
}

impl Deref for WorkingTree {
    type Target = DiskTree;

    fn deref(&self) -> &DiskTree {
        &self.tree
    }
}

impl DerefMut for WorkingTree {
    fn deref_mut(&mut self) -> &mut DiskTree {
        &mut self.tree
    }
}

impl Drop for WorkingTree {
    fn drop(&mut self) {
        let path = self.tree.root();
        match fs::remove_dir_all(path) {
            Ok(()) => tracing::debug!("Removed working tree {}", path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Failed to remove working tree {}: {}", path, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::PackageTree;
    use tempfile::TempDir;

    #[test]
    fn test_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("processed/_work_1")).unwrap();

        let mut working = WorkingTree::create(path.clone()).unwrap();
        working.write("js/data.xml", b"<data/>").unwrap();
        assert!(path.join("js/data.xml").exists());

        drop(working);
        assert!(!path.exists());
        assert!(path.parent().unwrap().exists());
    }

    #[test]
    fn test_existing_directory_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("_work_1")).unwrap();

        let _first = WorkingTree::create(path.clone()).unwrap();
        let err = WorkingTree::create(path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_removed_when_unwinding() {
        let temp = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("_work_2")).unwrap();

        let inner = path.clone();
        let result = std::panic::catch_unwind(move || {
            let _working = WorkingTree::create(inner).unwrap();
            panic!("stage blew up");
        });

        assert!(result.is_err());
        assert!(!path.exists());
    }
}
