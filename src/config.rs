// SPDX-License-Identifier: GPL-3.0-only

use crate::buffers::{PictureFormat, PictureKind, PictureLayout, PoolConfig};
use crate::constants::{DEFAULT_BUFFERS_PER_PATH, DEFAULT_MAX_PENDING_COMMANDS};
use crate::errors::{ConfigError, DispatchError, DispatchResult};
use crate::paths::OutputPath;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Numeric controller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Depth of the command queue
    pub max_pending_commands: usize,
    /// Empty buffers kept prepared for the pipeline on the main path
    pub num_buffers_main: usize,
    /// Empty buffers kept prepared for the pipeline on the self path
    pub num_buffers_self: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            max_pending_commands: DEFAULT_MAX_PENDING_COMMANDS,
            num_buffers_main: DEFAULT_BUFFERS_PER_PATH,
            num_buffers_self: DEFAULT_BUFFERS_PER_PATH,
        }
    }
}

impl ControllerSettings {
    pub fn num_buffers(&self, path: OutputPath) -> usize {
        match path {
            OutputPath::Main => self.num_buffers_main,
            OutputPath::SelfPath => self.num_buffers_self,
        }
    }
}

/// Complete configuration of one controller and its pools
///
/// A missing pool entry falls back to the default pool; an explicit `null`
/// leaves that path without a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub controller: ControllerSettings,
    pub main_pool: Option<PoolConfig>,
    pub self_pool: Option<PoolConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller: ControllerSettings::default(),
            main_pool: Some(PoolConfig::default()),
            // Self path defaults to a quarter-size preview
            self_pool: Some(PoolConfig {
                format: PictureFormat::new(
                    PictureKind::YCbCr420,
                    PictureLayout::SemiPlanar,
                    320,
                    240,
                ),
                ..PoolConfig::default()
            }),
        }
    }
}

impl Config {
    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        debug!(?config, "Configuration parsed");
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn pool(&self, path: OutputPath) -> Option<&PoolConfig> {
        match path {
            OutputPath::Main => self.main_pool.as_ref(),
            OutputPath::SelfPath => self.self_pool.as_ref(),
        }
    }

    /// Check everything a controller would reject at construction
    pub fn validate(&self) -> DispatchResult<()> {
        if self.controller.max_pending_commands == 0 {
            return Err(DispatchError::OutOfRange(
                "max_pending_commands must be at least 1".into(),
            ));
        }
        if self.main_pool.is_none() && self.self_pool.is_none() {
            return Err(DispatchError::InvalidParameter(
                "at least one buffer pool is required".into(),
            ));
        }
        for path in OutputPath::ALL {
            if let Some(pool) = self.pool(path) {
                pool.validate()?;
                let wanted = self.controller.num_buffers(path);
                if wanted > pool.capacity {
                    return Err(DispatchError::OutOfRange(format!(
                        "{} path wants {} buffers but its pool holds {}",
                        path, wanted, pool.capacity
                    )));
                }
            }
        }
        Ok(())
    }
}
