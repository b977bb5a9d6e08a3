use crate::error::{PipelineError, ResourceContext};
use crate::models::TargetVersion;
use crate::progress::ProgressReporter;
use crate::tree::PackageTree;

/// Package descriptor that must exist at the root of every package
pub const DEFAULT_DESCRIPTOR: &str = "imsmanifest.xml";

/// Descriptor variant used when converting to SCORM 2004
pub const ALTERNATE_DESCRIPTOR: &str = "imsmanifest_SCORM2004.xml";

fn is_descriptor(tree: &dyn PackageTree, path: &str) -> bool {
    tree.exists(path) && !tree.is_dir(path)
}

/// Fast check right after extraction: the default descriptor must be present
pub fn validate_package(
    tree: &dyn PackageTree,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.step("Validating SCORM package...");
    if !is_descriptor(tree, DEFAULT_DESCRIPTOR) {
        return Err(PipelineError::validation(format!(
            "The uploaded file is not a valid SCORM package (missing '{}').",
            DEFAULT_DESCRIPTOR
        )));
    }
    progress.success(format!("'{}' found.", DEFAULT_DESCRIPTOR));
    Ok(())
}

/// Gate before the manifest switch: both descriptors must be present
pub fn validate_manifests(
    tree: &dyn PackageTree,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.step("Validating manifest files");
    if !is_descriptor(tree, DEFAULT_DESCRIPTOR) || !is_descriptor(tree, ALTERNATE_DESCRIPTOR) {
        return Err(PipelineError::validation(format!(
            "Package does not contain both '{}' and '{}'.",
            DEFAULT_DESCRIPTOR, ALTERNATE_DESCRIPTOR
        )));
    }
    progress.success("Both manifest files found.");
    Ok(())
}

/// Make the descriptor matching `target` the only one left.
///
/// For 2004 the alternate replaces the default; for 1.2 the alternate is
/// removed and the default is not touched. Both descriptors must have been
/// checked with [`validate_manifests`] first.
pub fn switch_manifest(
    tree: &mut dyn PackageTree,
    target: TargetVersion,
    progress: &mut ProgressReporter<'_>,
) -> Result<(), PipelineError> {
    progress.step(format!("Updating manifest for SCORM {}", target));

    match target {
        TargetVersion::Scorm2004 => {
            tree.remove_file(DEFAULT_DESCRIPTOR)
                .resource_context(|| format!("Could not remove {}", DEFAULT_DESCRIPTOR))?;
            tree.rename(ALTERNATE_DESCRIPTOR, DEFAULT_DESCRIPTOR)
                .resource_context(|| {
                    format!("Could not rename {} to {}", ALTERNATE_DESCRIPTOR, DEFAULT_DESCRIPTOR)
                })?;
        }
        TargetVersion::Scorm12 => {
            tree.remove_file(ALTERNATE_DESCRIPTOR)
                .resource_context(|| format!("Could not remove {}", ALTERNATE_DESCRIPTOR))?;
        }
    }

    progress.success("Manifest updated.");
    Ok(())
}
