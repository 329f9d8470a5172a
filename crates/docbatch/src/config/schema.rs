use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::queue::DEFAULT_MAX_RETRIES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub version: String,
    /// Retry budget for items enqueued without one.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Keep completed and failed items listed until `clear_terminal`.
    #[serde(default = "default_true")]
    pub retain_finished: bool,
    /// When unset, results carry logical output names and nothing is
    /// written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_command_capacity() -> usize {
    64
}

fn default_event_capacity() -> usize {
    256
}

fn default_true() -> bool {
    true
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            max_retries: default_max_retries(),
            command_capacity: default_command_capacity(),
            event_capacity: default_event_capacity(),
            retain_finished: true,
            output_directory: None,
        }
    }
}

impl BatchConfig {
    pub fn with_output_directory<P: Into<PathBuf>>(mut self, directory: P) -> Self {
        self.output_directory = Some(directory.into());
        self
    }
}
