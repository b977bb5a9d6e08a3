use super::{PackageTree, TreeEntry, normalize, parent};
use std::collections::{BTreeMap, BTreeSet};
use std::io;

/// In-memory [`PackageTree`]; directories are tracked explicitly so empty
/// directories survive like they would on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTree {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `(path, contents)` pairs
    pub fn from_files<I, P, C>(files: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = (P, C)>,
        P: AsRef<str>,
        C: AsRef<[u8]>,
    {
        let mut tree = Self::new();
        for (path, contents) in files {
            tree.write(path.as_ref(), contents.as_ref())?;
        }
        Ok(tree)
    }

    /// Logical paths of all files, sorted
    pub fn file_paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    fn add_ancestors(&mut self, path: &str) {
        let mut current = parent(path);
        while !current.is_empty() {
            self.dirs.insert(current.to_string());
            current = parent(current);
        }
    }

    fn not_found(path: &str) -> io::Error {
        io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path))
    }
}

fn is_below(candidate: &str, dir: &str) -> bool {
    candidate.len() > dir.len() && candidate.starts_with(dir) && candidate.as_bytes()[dir.len()] == b'/'
}

impl PackageTree for MemoryTree {
    fn exists(&self, path: &str) -> bool {
        normalize(path)
            .map(|p| self.files.contains_key(&p) || self.dirs.contains(&p))
            .unwrap_or(false)
    }

    fn is_dir(&self, path: &str) -> bool {
        normalize(path).map(|p| self.dirs.contains(&p)).unwrap_or(false)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let path = normalize(path)?;
        self.files
            .get(&path)
            .cloned()
            .ok_or_else(|| Self::not_found(&path))
    }

    fn write(&mut self, path: &str, contents: &[u8]) -> io::Result<()> {
        let path = normalize(path)?;
        if self.dirs.contains(&path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path),
            ));
        }
        self.add_ancestors(&path);
        self.files.insert(path, contents.to_vec());
        Ok(())
    }

    fn create_dir_all(&mut self, path: &str) -> io::Result<()> {
        let path = normalize(path)?;
        if self.files.contains_key(&path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is a file", path),
            ));
        }
        self.add_ancestors(&path);
        self.dirs.insert(path);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()> {
        let from = normalize(from)?;
        let to = normalize(to)?;

        if let Some(contents) = self.files.remove(&from) {
            self.add_ancestors(&to);
            self.files.insert(to, contents);
            return Ok(());
        }
        if !self.dirs.contains(&from) {
            return Err(Self::not_found(&from));
        }

        let moved_files: Vec<String> = self
            .files
            .keys()
            .filter(|p| is_below(p, &from))
            .cloned()
            .collect();
        for old in moved_files {
            if let Some(contents) = self.files.remove(&old) {
                self.files.insert(format!("{}{}", to, &old[from.len()..]), contents);
            }
        }
        let moved_dirs: Vec<String> = self
            .dirs
            .iter()
            .filter(|p| **p == from || is_below(p, &from))
            .cloned()
            .collect();
        for old in moved_dirs {
            self.dirs.remove(&old);
            self.dirs.insert(format!("{}{}", to, &old[from.len()..]));
        }
        self.add_ancestors(&to);
        Ok(())
    }

    fn remove_file(&mut self, path: &str) -> io::Result<()> {
        let path = normalize(path)?;
        self.files
            .remove(&path)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(&path))
    }

    fn remove_dir_all(&mut self, path: &str) -> io::Result<()> {
        let path = normalize(path)?;
        if !self.dirs.remove(&path) {
            return Err(Self::not_found(&path));
        }
        self.files.retain(|p, _| !is_below(p, &path));
        self.dirs.retain(|p| !is_below(p, &path));
        Ok(())
    }

    fn entries(&self) -> io::Result<Vec<TreeEntry>> {
        let mut entries: Vec<TreeEntry> = self
            .files
            .keys()
            .map(|p| TreeEntry {
                path: p.clone(),
                is_dir: false,
            })
            .chain(self.dirs.iter().map(|p| TreeEntry {
                path: p.clone(),
                is_dir: true,
            }))
            .collect();

        // Deeper entries first: every child precedes its parent directory
        entries.sort_by(|a, b| {
            let depth = |e: &TreeEntry| e.path.matches('/').count();
            depth(b).cmp(&depth(a)).then_with(|| a.path.cmp(&b.path))
        });
        Ok(entries)
    }
}
