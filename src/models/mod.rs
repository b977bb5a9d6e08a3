//! Data models for the SCORM processor.
//!
//! - [`PackageJob`]: one processing request (source archive, target version, options)
//! - [`TargetVersion`]: SCORM 1.2 or SCORM 2004
//! - [`LogoAsset`]: branding image supplied with a job
//! - [`EngineVariant`] / [`EngineLayout`]: the two authoring-engine generations and
//!   the variant-specific paths and tag names that distinguish them
//! - [`ProcessorConfig`]: directories and feature settings loaded from YAML

pub mod config;
pub mod engine;
pub mod job;

pub use config::{LoggingSettings, ProcessorConfig};
pub use engine::{EngineLayout, EngineVariant};
pub use job::{LogoAsset, PackageJob, TargetVersion, sanitize_filename};
