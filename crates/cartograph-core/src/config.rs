// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Renderer configuration, loadable from JSON.

use crate::gfx::types::{BackendType, ContextMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Sizing rules for the dynamic texture atlases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Edge length of a freshly created atlas, in pixels. Must be a power of two.
    pub initial_size: u32,
    /// Largest edge length an atlas may grow to when a batch does not fit.
    pub max_size: u32,
    /// Transparent border added on every side of each packed image.
    pub padding: u32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            initial_size: 512,
            max_size: 4096,
            padding: 1,
        }
    }
}

/// Top-level settings for a renderer instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// The graphics API the backend should drive.
    pub backend: BackendType,
    /// Whether the renderer owns the GPU state exclusively.
    pub context_mode: ContextMode,
    /// Number of off-screen tiles retained by each tile cache.
    pub tile_cache_size: usize,
    /// Dynamic texture atlas sizing.
    pub atlas: AtlasConfig,
    /// Copy atlas images into a pending map and upload them from the render thread.
    pub defer_texture_upload: bool,
    /// Number of background threads parsing tiles.
    pub worker_threads: usize,
    /// Device pixel ratio forwarded to shader programs.
    pub pixel_ratio: f32,
    /// Compile shader variants with the overdraw inspector enabled.
    pub overdraw_inspector: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            context_mode: ContextMode::Unique,
            tile_cache_size: 64,
            atlas: AtlasConfig::default(),
            defer_texture_upload: true,
            worker_threads: 2,
            pixel_ratio: 1.0,
            overdraw_inspector: false,
        }
    }
}

impl RendererConfig {
    /// Parses a configuration from a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        log::debug!("Loading renderer configuration from '{}'", path.display());
        Self::from_json_str(&text)
    }

    /// Checks the cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.atlas.initial_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "atlas.initial_size must be a power of two, got {}",
                self.atlas.initial_size
            )));
        }
        if self.atlas.initial_size > self.atlas.max_size {
            return Err(ConfigError::Invalid(format!(
                "atlas.initial_size ({}) exceeds atlas.max_size ({})",
                self.atlas.initial_size, self.atlas.max_size
            )));
        }
        if self.worker_threads == 0 {
            return Err(ConfigError::Invalid(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.pixel_ratio.is_nan() || self.pixel_ratio <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "pixel_ratio must be positive, got {}",
                self.pixel_ratio
            )));
        }
        Ok(())
    }
}

/// An error raised while loading or validating a [`RendererConfig`].
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io {
        /// The path that failed to load.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// The document is not valid JSON or does not match the schema.
    Parse(serde_json::Error),
    /// A value is out of range or inconsistent with another value.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "Failed to read configuration '{path}': {source}")
            }
            ConfigError::Parse(e) => write!(f, "Failed to parse configuration: {e}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}
