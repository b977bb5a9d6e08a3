use crate::models::ProcessorConfig;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Name of the configuration file inside the configuration directory
pub const CONFIG_FILE_NAME: &str = "scorm-processor.yaml";

/// Prefix of environment variables overriding file settings,
/// e.g. `SCORM_PROCESSOR__LOGGING__DEBUG=true`
pub const ENV_PREFIX: &str = "SCORM_PROCESSOR";

const ENV_SEPARATOR: &str = "__";

/// Configuration manager for loading and saving the processor configuration.
///
/// Layers, lowest priority first:
/// - built-in defaults ([`ProcessorConfig::default`])
/// - `scorm-processor.yaml` in the configuration directory (optional)
/// - `SCORM_PROCESSOR__*` environment variables
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    config_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing `scorm-processor.yaml`
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE_NAME),
            config_dir,
        })
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Utf8Path {
        &self.config_path
    }

    /// Load the configuration from the file and the process environment.
    ///
    /// # Returns
    /// The merged ProcessorConfig; defaults when neither source sets anything
    pub fn load(&self) -> Result<ProcessorConfig> {
        self.load_with_env(None)
    }

    /// Load with an explicit environment map instead of the process environment
    pub fn load_with_env(&self, env: Option<config::Map<String, String>>) -> Result<ProcessorConfig> {
        if !self.config_path.exists() {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                self.config_path
            );
        }

        let settings = config::Config::builder()
            .add_source(
                config::File::new(self.config_path.as_str(), config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .with_context(|| format!("Failed to read config: {}", self.config_path))?;

        let config: ProcessorConfig = settings
            .try_deserialize()
            .with_context(|| format!("Failed to parse config: {}", self.config_path))?;

        tracing::info!("Loaded config from {}", self.config_path);
        Ok(config)
    }

    /// Save the configuration file.
    ///
    /// # Arguments
    /// * `config` - The ProcessorConfig to save
    pub fn save(&self, config: &ProcessorConfig) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(config).context("Failed to serialize config to YAML")?;

        fs::write(&self.config_path, yaml_string)
            .with_context(|| format!("Failed to write config: {}", self.config_path))?;

        tracing::info!("Saved config to {}", self.config_path);
        Ok(())
    }

    /// Write the default configuration if no file exists yet.
    ///
    /// # Returns
    /// `true` when a file was created
    pub fn create_default_if_missing(&self) -> Result<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }
        self.save(&ProcessorConfig::default())?;
        Ok(true)
    }
}

/// Create the upload and processed directories of `config`.
///
/// Relative directories resolve against the current working directory.
pub fn ensure_directories(config: &ProcessorConfig) -> Result<()> {
    for dir in [&config.upload_dir, &config.processed_dir] {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir))?;
    }
    Ok(())
}
