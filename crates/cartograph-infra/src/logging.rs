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


//! Process-wide logger setup.
//!
//! Every crate of the workspace logs through the `log` facade; this module
//! installs `env_logger` as the sink.

use std::sync::Once;

static INIT: Once = Once::new();

/// How the logger filters records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// An `env_logger` filter such as `"cartograph_core=debug,wgpu_core=warn"`.
    /// When `None`, `RUST_LOG` is used, falling back to `info`.
    pub filter: Option<String>,
    /// Include timestamps in every line.
    pub timestamps: bool,
}

impl LoggingConfig {
    /// A configuration with an explicit filter.
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            ..Default::default()
        }
    }
}

/// Installs the global logger. Only the first call has an effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = match &config.filter {
            Some(filter) => {
                let mut builder = env_logger::Builder::new();
                builder.parse_filters(filter);
                builder
            }
            None => env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("info"),
            ),
        };
        if !config.timestamps {
            builder.format_timestamp(None);
        }
        // A logger installed by the host application wins.
        if builder.try_init().is_err() {
            log::debug!("A global logger was already installed");
            return;
        }
        log::debug!("Logging initialised with {:?}", config);
    });
}
