// SCORM Processor - SCORM package conversion between engine configurations
//
// This is the library crate containing the package transformation pipeline.
// The binary crate (main.rs) provides the command-line entry point.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod progress;
pub mod services;
pub mod tree;
pub mod workspace;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use error::PipelineError;
pub use metrics::Metrics;
pub use models::{EngineVariant, LogoAsset, PackageJob, ProcessorConfig, TargetVersion};
pub use outputs::OutputLocks;
pub use pipeline::{JobOutcome, JobReport, Orchestrator, PipelineState};
pub use progress::{EventKind, EventSink, ProgressEvent};
pub use workspace::Workspace;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
