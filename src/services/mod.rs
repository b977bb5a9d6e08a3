//! Services module - the stages of the package transformation pipeline.
//!
//! Each stage operates on a [`PackageTree`](crate::tree::PackageTree) and
//! reports through a [`ProgressReporter`](crate::progress::ProgressReporter).
//! Stages have no knowledge of each other or of the job lifecycle; the
//! [`Orchestrator`](crate::pipeline::Orchestrator) sequences them and owns the
//! working tree.
//!
//! # Components
//!
//! - [`extract_archive`] / [`repack_tree`]: archive in, archive out
//! - [`detect_engine_variant`]: VariantA vs VariantB from the tree layout
//! - [`TreeCleaner`]: removes editor metadata and stray descriptors
//! - [`prepare_logo`]: resizes the branding logo and places it
//! - [`apply_license`]: writes the VariantA license data file
//! - [`validate_package`], [`validate_manifests`], [`switch_manifest`]:
//!   descriptor checks and the SCORM version switch
//! - [`edit_settings`]: rewrites every `adminsettings.xml`
//!   via [`ConfigDocument`]
//! - [`patch_scripts`]: SCORM 2004 script fixes
//!
//! # Error policy
//!
//! A stage returns `Err` only for problems that must abort the job.
//! Everything else (a file that could not be cleaned, a tag that is missing,
//! an unpatched script) is emitted as a warning and the stage carries on.

pub mod archive;
pub mod branding;
pub mod config_document;
pub mod engine_detection;
pub mod license;
pub mod manifest;
pub mod scripts;
pub mod settings;
pub mod tree_cleaner;

pub use archive::{extract_archive, repack_tree};
pub use branding::{LOGO_HEIGHT, LOGO_WIDTH, PlacedLogo, prepare_logo};
pub use config_document::{ConfigDocument, Lookup};
pub use engine_detection::{detect_engine_stage, detect_engine_variant};
pub use license::apply_license;
pub use manifest::{
    ALTERNATE_DESCRIPTOR, DEFAULT_DESCRIPTOR, switch_manifest, validate_manifests,
    validate_package,
};
pub use scripts::{ScriptPatch, patch_scripts};
pub use settings::{CONFIG_DOCUMENT_NAME, SettingsEdit, SettingsReport, edit_settings, version_flags};
pub use tree_cleaner::{CleanReport, TreeCleaner};
