//! Filesystem abstraction for an extracted package.
//!
//! Every pipeline stage mutates the package through [`PackageTree`] using
//! *logical paths*: relative, `/`-separated paths rooted at the package root
//! (`imsmanifest.xml`, `js/scorm_2004.js`, ...). This keeps the stages free of
//! direct filesystem calls so they can run against a [`MemoryTree`] in tests
//! and against a [`DiskTree`] in production.
//!
//! # Components
//!
//! - [`PackageTree`]: the narrow set of operations stages are allowed to use
//! - [`DiskTree`]: backed by a real directory (the job's working tree)
//! - [`MemoryTree`]: backed by ordered maps, no disk I/O

mod disk;
mod memory;

pub use disk::DiskTree;
pub use memory::MemoryTree;

use std::io;

/// One entry returned by [`PackageTree::entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Logical path of the entry
    pub path: String,
    pub is_dir: bool,
}

impl TreeEntry {
    /// Final path component
    pub fn name(&self) -> &str {
        file_name(&self.path)
    }
}

/// Operations a pipeline stage may perform on a package tree.
///
/// `write` and `create_dir_all` create missing parent directories.
/// `entries` lists every file and directory below the root in contents-first
/// order: an entry always precedes the directory that contains it, so callers
/// can delete while iterating without invalidating the listing.
#[cfg_attr(test, mockall::automock)]
pub trait PackageTree {
    fn exists(&self, path: &str) -> bool;

    fn is_dir(&self, path: &str) -> bool;

    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    fn write(&mut self, path: &str, contents: &[u8]) -> io::Result<()>;

    fn create_dir_all(&mut self, path: &str) -> io::Result<()>;

    fn rename(&mut self, from: &str, to: &str) -> io::Result<()>;

    fn remove_file(&mut self, path: &str) -> io::Result<()>;

    fn remove_dir_all(&mut self, path: &str) -> io::Result<()>;

    fn entries(&self) -> io::Result<Vec<TreeEntry>>;
}

/// Last component of a logical path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent of a logical path, `""` for top-level entries
pub fn parent(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Join a logical directory and a child name
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}

/// Validate and normalize a logical path.
///
/// Backslashes become `/`, empty and `.` components are dropped. Absolute
/// paths and `..` components are rejected so no operation can escape the root.
pub fn normalize(path: &str) -> io::Result<String> {
    let mut parts = Vec::new();
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("absolute path not allowed in package tree: {}", path),
        ));
    }
    for component in unified.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("parent traversal not allowed in package tree: {}", path),
                ));
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty path in package tree",
        ));
    }
    Ok(parts.join("/"))
}
