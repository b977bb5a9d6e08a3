use crate::error::{PipelineError, ResourceContext};
use crate::progress::ProgressReporter;
use crate::tree::{PackageTree, TreeEntry};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Upper bound on the buffer reserved up front for one entry. The declared
/// size comes from the archive and is not trusted beyond this.
const MAX_PREALLOCATION: usize = 1 << 20;

fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared).unwrap_or(usize::MAX).min(MAX_PREALLOCATION)
}

/// Expand `archive` into `tree`.
///
/// Entries whose names would escape the tree (absolute paths, `..`) are
/// skipped with a warning. Returns the number of files written.
pub fn extract_archive(
    archive: &Utf8Path,
    display_name: &str,
    tree: &mut dyn PackageTree,
    progress: &mut ProgressReporter<'_>,
) -> Result<usize, PipelineError> {
    progress.step(format!("Unzipping '{}'", display_name));

    let file = File::open(archive).resource_context(|| format!("Could not open archive {}", archive))?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;

    let mut extracted = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            progress.warning(format!("Skipping unsafe archive entry: {}", entry.name()));
            continue;
        };
        let logical = relative.to_string_lossy().replace('\\', "/");
        if logical.trim_matches('/').is_empty() {
            continue;
        }

        if entry.is_dir() {
            tree.create_dir_all(&logical)
                .resource_context(|| format!("Could not create {}", logical))?;
            continue;
        }

        let mut contents = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut contents)
            .resource_context(|| format!("Could not extract {}", logical))?;
        tree.write(&logical, &contents)
            .resource_context(|| format!("Could not write {}", logical))?;
        extracted += 1;
    }

    tracing::debug!(files = extracted, "Archive extracted");
    progress.success("Package unzipped.");
    Ok(extracted)
}

/// Pack `tree` into a deflated archive at `output`.
///
/// Files keep their bytes and empty directories are kept as directory
/// entries. The archive is written next to `output` under a unique
/// `.partial` name and renamed into place while `output_lock` is held, so
/// `output` never exists half-written and never appears in the middle of a
/// collection holding the same lock. The tree is only read.
pub fn repack_tree(
    tree: &dyn PackageTree,
    output: &Utf8Path,
    output_lock: &Mutex<()>,
    progress: &mut ProgressReporter<'_>,
) -> Result<usize, PipelineError> {
    progress.step("Re-zipping the package");

    let partial = Utf8PathBuf::from(format!("{}.{}.partial", output, Uuid::new_v4().simple()));
    let packed = write_archive(tree, &partial).and_then(|count| {
        let _guard = output_lock.lock().unwrap_or_else(PoisonError::into_inner);
        fs::rename(&partial, output)
            .resource_context(|| format!("Could not move archive into place at {}", output))?;
        Ok(count)
    });
    if packed.is_err() && partial.exists() {
        if let Err(e) = fs::remove_file(&partial) {
            tracing::warn!("Could not remove partial archive {}: {}", partial, e);
        }
    }
    let count = packed?;

    progress.success(format!("Created {}", output.file_name().unwrap_or(output.as_str())));
    Ok(count)
}

/// Directories with nothing beneath them; the rest are implied by file paths
fn empty_dirs(entries: &[TreeEntry]) -> Vec<&str> {
    entries
        .iter()
        .filter(|entry| entry.is_dir)
        .filter(|dir| {
            let prefix = format!("{}/", dir.path);
            !entries.iter().any(|other| other.path.starts_with(&prefix))
        })
        .map(|dir| dir.path.as_str())
        .collect()
}

fn write_archive(tree: &dyn PackageTree, path: &Utf8Path) -> Result<usize, PipelineError> {
    let entries = tree
        .entries()
        .resource_context(|| "Could not list package contents")?;
    let mut files: Vec<&str> = entries
        .iter()
        .filter(|entry| !entry.is_dir)
        .map(|entry| entry.path.as_str())
        .collect();
    files.sort_unstable();
    let mut dirs = empty_dirs(&entries);
    dirs.sort_unstable();

    let file = File::create(path).resource_context(|| format!("Could not create {}", path))?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for dir in &dirs {
        writer.add_directory(format!("{}/", dir), options)?;
    }
    for logical in &files {
        let contents = tree
            .read(logical)
            .resource_context(|| format!("Could not read {}", logical))?;
        writer.start_file(*logical, options)?;
        writer
            .write_all(&contents)
            .resource_context(|| format!("Could not add {} to archive", logical))?;
    }

    writer
        .finish()?
        .flush()
        .resource_context(|| format!("Could not flush {}", path))?;
    Ok(files.len())
}
