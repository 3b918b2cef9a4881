use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::OUTPUT_SUFFIX;
use super::error::ConfigError;
use super::event_decoder::TagConfig;

/// Structure representing the application configuration. Contains pathing and run information
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input_paths: Vec<PathBuf>,
    pub output_path: PathBuf,
    pub max_events: Option<u64>,
    pub n_threads: i32,
    pub chunk_size: usize,
    pub verbose: bool,
    #[serde(default)]
    pub tags: TagConfig,
}

impl Default for Config {
    /// Generate a new Config object. Paths will be empty/invalid
    fn default() -> Self {
        Self {
            input_paths: Vec::new(),
            output_path: PathBuf::from("output"),
            max_events: None,
            n_threads: 1,
            chunk_size: 10_000,
            verbose: false,
            tags: TagConfig::default(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Check the numeric fields and that there is something to process
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.is_n_threads_valid() {
            return Err(ConfigError::BadThreadCount(self.n_threads));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::BadChunkSize(self.chunk_size));
        }
        if self.input_paths.is_empty() {
            return Err(ConfigError::NoInputFiles);
        }
        Ok(())
    }

    /// Get the path to the output JSON file for a given input file
    pub fn get_output_file_name(&self, input_path: &Path) -> PathBuf {
        let stem = input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("fadc"));
        self.output_path.join(format!("{stem}{OUTPUT_SUFFIX}"))
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }

    /// True if the event limit has been reached
    pub fn is_event_limit_reached(&self, n_events: u64) -> bool {
        self.max_events.is_some_and(|max| n_events >= max)
    }
}
