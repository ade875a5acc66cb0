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

//! Renderer-wide inputs that affect every compiled shader variant.

use crate::config::RendererConfig;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// A preprocessor definition, `#define NAME VALUE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Define {
    /// Macro name.
    pub name: String,
    /// Optional replacement text.
    pub value: Option<String>,
}

impl Define {
    /// A flag definition without a value.
    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Renders the definition as a source line.
    pub fn to_line(&self) -> String {
        match &self.value {
            Some(value) => format!("#define {} {}", self.name, value),
            None => format!("#define {}", self.name),
        }
    }
}

/// Parameters shared by every program the renderer compiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramParameters {
    pixel_ratio: f32,
    overdraw_inspector: bool,
    extra: BTreeMap<String, Option<String>>,
}

impl ProgramParameters {
    /// Creates parameters for the given device pixel ratio.
    pub fn new(pixel_ratio: f32, overdraw_inspector: bool) -> Self {
        Self {
            pixel_ratio,
            overdraw_inspector,
            extra: BTreeMap::new(),
        }
    }

    /// Builds parameters from a renderer configuration.
    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.pixel_ratio, config.overdraw_inspector)
    }

    /// Adds a custom definition applied to every program.
    pub fn with_define(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Device pixel ratio.
    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Returns the definitions in a stable order.
    pub fn defines(&self) -> Vec<Define> {
        let mut defines = vec![Define {
            name: "DEVICE_PIXEL_RATIO".to_string(),
            value: Some(format!("{:.6}", self.pixel_ratio)),
        }];
        if self.overdraw_inspector {
            defines.push(Define::flag("OVERDRAW_INSPECTOR"));
        }
        defines.extend(self.extra.iter().map(|(name, value)| Define {
            name: name.clone(),
            value: value.clone(),
        }));
        defines
    }

    /// Stable hash of [`defines`](Self::defines).
    pub fn defines_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.defines().hash(&mut hasher);
        hasher.finish()
    }
}

impl Default for ProgramParameters {
    fn default() -> Self {
        Self::new(1.0, false)
    }
}
