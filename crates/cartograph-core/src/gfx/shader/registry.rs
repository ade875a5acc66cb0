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

//! The name-keyed shader group registry.

use super::group::ShaderGroup;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Name-keyed registry of shader groups, owned by the renderer.
///
/// Backends fill it in `RendererBackend::init_shaders`; layers look groups up
/// by name when building drawables.
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    groups: RwLock<HashMap<String, Arc<ShaderGroup>>>,
}

impl ShaderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the group registered under `name`.
    pub fn get_shader_group(&self, name: &str) -> Option<Arc<ShaderGroup>> {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns `true` if a group is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registers `group` under its own name.
    ///
    /// Returns `false` without touching the registry if the name is taken.
    pub fn register_shader_group(&self, group: Arc<ShaderGroup>) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        if groups.contains_key(group.name()) {
            log::warn!("Shader group '{}' is already registered", group.name());
            return false;
        }
        log::debug!("Registered shader group '{}'", group.name());
        groups.insert(group.name().to_string(), group);
        true
    }

    /// Replaces the group registered under `group`'s name.
    ///
    /// Returns `false` and registers nothing if no group had that name.
    pub fn replace_shader_group(&self, group: Arc<ShaderGroup>) -> bool {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        match groups.get_mut(group.name()) {
            Some(slot) => {
                log::debug!("Replaced shader group '{}'", group.name());
                *slot = group;
                true
            }
            None => false,
        }
    }

    /// Number of registered groups.
    pub fn len(&self) -> usize {
        self.groups.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
