use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Processor configuration from `scorm-processor.yaml`
///
/// Constructed once at startup and threaded into the
/// [`Orchestrator`](crate::pipeline::Orchestrator); stages never read
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Where uploaded archives are staged before processing
    pub upload_dir: Utf8PathBuf,

    /// Where processed archives (and job working trees) are written
    pub processed_dir: Utf8PathBuf,

    /// Reference `scorm_2004.js` used for customer-variant jobs
    pub customer_script_path: Utf8PathBuf,

    /// Also apply the course-engine.js / scorm.js fixes for SCORM 2004
    pub extended_script_fixes: bool,

    /// Capacity of the bounded progress channel between a job and its consumer
    pub event_buffer: usize,

    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: Utf8PathBuf,
    pub prefix: String,

    /// Rotated log files kept on disk
    pub max_files: usize,

    pub debug: bool,
    pub console: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            upload_dir: Utf8PathBuf::from("uploads"),
            processed_dir: Utf8PathBuf::from("processed"),
            customer_script_path: Utf8PathBuf::from("special_files/scorm_2004.js"),
            extended_script_fixes: false,
            event_buffer: default_event_buffer(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: Utf8PathBuf::from("logs"),
            prefix: "scorm_processor".to_string(),
            max_files: default_max_log_files(),
            debug: false,
            console: true,
        }
    }
}

fn default_event_buffer() -> usize {
    64
}

fn default_max_log_files() -> usize {
    5
}

impl ProcessorConfig {
    /// Channel capacity, never zero
    pub fn event_capacity(&self) -> usize {
        self.event_buffer.max(1)
    }
}
