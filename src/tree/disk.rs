use super::{PackageTree, TreeEntry, normalize};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use walkdir::WalkDir;

/// [`PackageTree`] backed by a directory on disk
#[derive(Debug, Clone)]
pub struct DiskTree {
    root: Utf8PathBuf,
}

impl DiskTree {
    /// Wrap an existing directory
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Resolve a logical path to a real path under the root
    pub fn resolve(&self, path: &str) -> io::Result<Utf8PathBuf> {
        Ok(self.root.join(normalize(path)?))
    }

    fn logical(&self, path: &std::path::Path) -> Option<String> {
        let relative = path.strip_prefix(self.root.as_std_path()).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }
}

impl PackageTree for DiskTree {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn is_dir(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path)?)
    }

    fn write(&mut self, path: &str, contents: &[u8]) -> io::Result<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(target, contents)
    }

    fn create_dir_all(&mut self, path: &str) -> io::Result<()> {
        fs::create_dir_all(self.resolve(path)?)
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        let target = self.resolve(to)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(self.resolve(from)?, target)
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        fs::remove_file(self.resolve(path)?)
    }

    fn remove_dir_all(&mut self, path: &str) -> io::Result<()> {
        fs::remove_dir_all(self.resolve(path)?)
    }

    fn entries(&self) -> io::Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .contents_first(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(io::Error::from)?;
            if let Some(path) = self.logical(entry.path()) {
                entries.push(TreeEntry {
                    path,
                    is_dir: entry.file_type().is_dir(),
                });
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_tree() -> (DiskTree, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        (DiskTree::new(root), temp_dir)
    }

    #[test]
    fn test_write_creates_parents() {
        let (mut tree, _temp_dir) = create_test_tree();
        tree.write("xmls/en/adminsettings.xml", b"<root/>").unwrap();

        assert!(tree.is_dir("xmls/en"));
        assert_eq!(tree.read("xmls/en/adminsettings.xml").unwrap(), b"<root/>");
    }

    #[test]
    fn test_entries_are_contents_first() {
        let (mut tree, _temp_dir) = create_test_tree();
        tree.write("a/b/c.txt", b"c").unwrap();
        tree.write("a/d.txt", b"d").unwrap();

        let entries = tree.entries().unwrap();
        let position = |p: &str| entries.iter().position(|e| e.path == p).unwrap();

        assert!(position("a/b/c.txt") < position("a/b"));
        assert!(position("a/b") < position("a"));
        assert!(position("a/d.txt") < position("a"));
        assert!(entries.iter().find(|e| e.path == "a").unwrap().is_dir);
    }

    #[test]
    fn test_rename_and_remove() {
        let (mut tree, _temp_dir) = create_test_tree();
        tree.write("imsmanifest_SCORM2004.xml", b"2004").unwrap();
        tree.rename("imsmanifest_SCORM2004.xml", "imsmanifest.xml").unwrap();

        assert!(!tree.exists("imsmanifest_SCORM2004.xml"));
        assert_eq!(tree.read("imsmanifest.xml").unwrap(), b"2004");

        tree.remove_file("imsmanifest.xml").unwrap();
        assert!(!tree.exists("imsmanifest.xml"));
    }

    #[test]
    fn test_rejects_escape() {
        let (mut tree, _temp_dir) = create_test_tree();
        assert!(tree.write("../outside.txt", b"x").is_err());
        assert!(!tree.exists("../"));
    }
}
