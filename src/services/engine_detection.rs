//! Engine detection for extracted packages.
//!
//! A package built by the legacy engine ships a top-level `scorm/` runtime
//! folder; its presence means [`EngineVariant::VariantA`], its absence
//! [`EngineVariant::VariantB`]. Nothing else in the tree is consulted, so
//! the classification is total and never ambiguous.
//!
//! # Examples
//!
//! ```ignore
//! use scorm_processor::services::detect_engine_variant;
//! use scorm_processor::tree::DiskTree;
//!
//! let tree = DiskTree::new("processed/_work_0f3a...");
//! let variant = detect_engine_variant(&tree);
//! ```

use crate::models::EngineVariant;
use crate::progress::ProgressReporter;
use crate::tree::PackageTree;

/// Classify a package by its top-level directory structure.
///
/// # Arguments
///
/// * `tree` - The extracted package
///
/// # Returns
///
/// `VariantA` when the marker directory exists at the root, `VariantB` otherwise
pub fn detect_engine_variant(tree: &dyn PackageTree) -> EngineVariant {
    if tree.is_dir(EngineVariant::MARKER_DIR) {
        EngineVariant::VariantA
    } else {
        EngineVariant::VariantB
    }
}

/// Detection stage: classify and report the result
pub fn detect_engine_stage(
    tree: &dyn PackageTree,
    progress: &mut ProgressReporter<'_>,
) -> EngineVariant {
    let variant = detect_engine_variant(tree);
    progress.action(format!("Engine Type detected: {}", variant));
    variant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MemoryTree;
    use proptest::prelude::*;

    #[test]
    fn test_marker_dir_means_variant_a() {
        let tree = MemoryTree::from_files([
            ("imsmanifest.xml", "<manifest/>"),
            ("scorm/api.js", "//"),
        ])
        .unwrap();
        assert_eq!(detect_engine_variant(&tree), EngineVariant::VariantA);
    }

    #[test]
    fn test_missing_marker_means_variant_b() {
        let tree = MemoryTree::from_files([("imsmanifest.xml", "<manifest/>")]).unwrap();
        assert_eq!(detect_engine_variant(&tree), EngineVariant::VariantB);
    }

    #[test]
    fn test_marker_must_be_directory_at_root() {
        let tree = MemoryTree::from_files([
            ("scorm", "not a directory"),
            ("content/scorm/api.js", "//"),
        ])
        .unwrap();
        assert_eq!(detect_engine_variant(&tree), EngineVariant::VariantB);
    }

    #[test]
    fn test_stage_reports_engine() {
        let tree = MemoryTree::from_files([("scorm/api.js", "//")]).unwrap();
        let mut events = Vec::new();
        let mut progress = ProgressReporter::new(&mut events);
        detect_engine_stage(&tree, &mut progress);
        drop(progress);
        assert_eq!(events[0].text, "Engine Type detected: iengine5");
    }

    proptest! {
        #[test]
        fn prop_detection_depends_only_on_marker(
            files in proptest::collection::vec("[a-z]{1,6}(/[a-z]{1,6}){0,2}\\.txt", 0..12),
            with_marker in any::<bool>(),
        ) {
            let mut tree = MemoryTree::new();
            for file in files.iter().filter(|f| !f.starts_with("scorm/")) {
                tree.write(file, b"x").unwrap();
            }
            if with_marker {
                tree.create_dir_all("scorm").unwrap();
            }
            let expected = if with_marker { EngineVariant::VariantA } else { EngineVariant::VariantB };
            prop_assert_eq!(detect_engine_variant(&tree), expected);
        }
    }
}
