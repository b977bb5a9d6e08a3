use crate::progress::ProgressReporter;
use crate::tree::PackageTree;
use glob::{MatchOptions, Pattern};

/// File name patterns removed from every package (case-sensitive)
pub const FILE_PATTERNS: &[&str] = &["aicc.*", "readme.md", ".gitignore", "README.md"];

/// Directory names removed from every package, with all their contents
pub const DIR_NAMES: &[&str] = &[".idea", ".vscode", "__MACOSX"];

/// Outcome of a cleaning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed_files: Vec<String>,
    pub removed_dirs: Vec<String>,
    /// Items that matched but could not be removed
    pub failures: Vec<String>,
}

impl CleanReport {
    pub fn found_any(&self) -> bool {
        !self.removed_files.is_empty() || !self.removed_dirs.is_empty() || !self.failures.is_empty()
    }

    pub fn removed_count(&self) -> usize {
        self.removed_files.len() + self.removed_dirs.len()
    }
}

/// Removes editor metadata, macOS resource forks and stray descriptors.
///
/// The service pre-compiles its glob patterns at construction time:
///
/// - `file_patterns`: matched against file names only, never full paths
///   - `aicc.*` matches `aicc.au`, `aicc.crs`, ...
/// - `dir_names`: exact directory names
///
/// Deletion is best-effort. A failed removal becomes a warning event and the
/// pass continues; cleaning never aborts a job. Running it on an already
/// cleaned tree finds nothing.
pub struct TreeCleaner {
    file_patterns: Vec<Pattern>,
    dir_names: Vec<String>,
    options: MatchOptions,
}

impl TreeCleaner {
    /// Create a TreeCleaner with the standard pattern set
    pub fn new() -> Self {
        Self::with_patterns(FILE_PATTERNS, DIR_NAMES)
    }

    /// Create a TreeCleaner with custom patterns; invalid globs are ignored
    pub fn with_patterns(file_patterns: &[&str], dir_names: &[&str]) -> Self {
        let file_patterns = file_patterns
            .iter()
            .filter_map(|p| match Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("Ignoring invalid cleanup pattern '{}': {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            file_patterns,
            dir_names: dir_names.iter().map(|d| d.to_string()).collect(),
            options: MatchOptions {
                case_sensitive: true,
                require_literal_separator: true,
                require_literal_leading_dot: false,
            },
        }
    }

    pub fn matches_file(&self, name: &str) -> bool {
        self.file_patterns
            .iter()
            .any(|p| p.matches_with(name, self.options))
    }

    pub fn matches_dir(&self, name: &str) -> bool {
        self.dir_names.iter().any(|d| d == name)
    }

    /// Run the cleaning stage over the whole tree.
    ///
    /// The listing is contents-first, so a matching file inside a matching
    /// directory is removed (and reported) before the directory itself.
    pub fn clean(&self, tree: &mut dyn PackageTree, progress: &mut ProgressReporter<'_>) -> CleanReport {
        progress.step("Cleaning unnecessary files and folders");
        let mut report = CleanReport::default();

        let entries = match tree.entries() {
            Ok(entries) => entries,
            Err(e) => {
                progress.warning(format!("Could not list package contents for cleanup: {}", e));
                return report;
            }
        };

        for entry in entries {
            let name = entry.name();
            if entry.is_dir {
                if !self.matches_dir(name) {
                    continue;
                }
                match tree.remove_dir_all(&entry.path) {
                    Ok(()) => {
                        progress.action(format!("Removed directory: {}", entry.path));
                        report.removed_dirs.push(entry.path);
                    }
                    Err(e) => {
                        progress.warning(format!("Error removing directory {}: {}", entry.path, e));
                        report.failures.push(entry.path);
                    }
                }
            } else if self.matches_file(name) {
                match tree.remove_file(&entry.path) {
                    Ok(()) => {
                        progress.action(format!("Removed file: {}", entry.path));
                        report.removed_files.push(entry.path);
                    }
                    Err(e) => {
                        progress.warning(format!("Error removing file {}: {}", entry.path, e));
                        report.failures.push(entry.path);
                    }
                }
            }
        }

        if !report.found_any() {
            progress.action("No unnecessary files or folders found to clean.");
        }
        tracing::debug!(
            removed = report.removed_count(),
            failures = report.failures.len(),
            "Cleanup pass finished"
        );
        progress.success("Cleanup complete.");
        report
    }
}

impl Default for TreeCleaner {
    fn default() -> Self {
        Self::new()
    }
}
