use std::path::Path;

use palimpsest_history::{GotoPolicy, Mode};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const DEFAULT_CONFIG_NAME: &str = "palimpsest.config.json";

/// Timeline tuning knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineConfig {
    /// Events since the last checkpoint before a gesture end triggers one
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    /// Minimum replays a forward seek must save before it loads a checkpoint
    #[serde(default = "default_warm_start_threshold")]
    pub warm_start_threshold: usize,

    /// Handling of gotos that do not jump backwards
    #[serde(default)]
    pub goto_policy: GotoPolicy,

    /// Settings in force before the first mode patch
    #[serde(default)]
    pub initial_mode: Mode,

    /// Capacity of the command queue in front of a spawned timeline
    #[serde(default = "default_command_queue_depth")]
    pub command_queue_depth: usize,
}

fn default_checkpoint_interval() -> usize {
    100
}

fn default_warm_start_threshold() -> usize {
    750
}

fn default_command_queue_depth() -> usize {
    64
}

impl TimelineConfig {
    /// Load config from a JSON file; a missing file gives the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load `palimpsest.config.json` from a directory
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(dir.as_ref().join(DEFAULT_CONFIG_NAME))
    }

    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    pub fn with_warm_start_threshold(mut self, threshold: usize) -> Self {
        self.warm_start_threshold = threshold;
        self
    }

    pub fn with_goto_policy(mut self, policy: GotoPolicy) -> Self {
        self.goto_policy = policy;
        self
    }

    pub fn with_initial_mode(mut self, mode: Mode) -> Self {
        self.initial_mode = mode;
        self
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            warm_start_threshold: default_warm_start_threshold(),
            goto_policy: GotoPolicy::default(),
            initial_mode: Mode::default(),
            command_queue_depth: default_command_queue_depth(),
        }
    }
}
