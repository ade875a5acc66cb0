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

//! A built-in shader and the cache of its specialized programs.

use super::parameters::{Define, ProgramParameters};
use super::program::{ProgramSource, ShaderProgram};
use crate::gfx::context::Context;
use crate::gfx::error::ShaderError;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};

/// Identifies one specialization of a shader group.
///
/// Bit `i` of `uniform_mask` is set when the `i`-th uniform-eligible property of
/// the source is bound as a uniform rather than a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramKey {
    /// Promoted-property bitmask.
    pub uniform_mask: u64,
    /// Hash of the renderer-wide program parameters.
    pub defines_hash: u64,
}

impl ProgramKey {
    /// Folds the key into one value, used in program names.
    pub fn hash_value(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// One logical shader (e.g. `FillShader`) and the programs compiled from it.
#[derive(Debug)]
pub struct ShaderGroup {
    name: String,
    source: ProgramSource,
    parameters: ProgramParameters,
    programs: RwLock<HashMap<ProgramKey, Arc<dyn ShaderProgram>>>,
}

impl ShaderGroup {
    /// Creates a group for `source`, compiled with `parameters`.
    pub fn new(source: ProgramSource, parameters: ProgramParameters) -> Self {
        Self {
            name: source.name.clone(),
            source,
            parameters,
            programs: RwLock::new(HashMap::new()),
        }
    }

    /// Logical shader name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unspecialized source.
    pub fn source(&self) -> &ProgramSource {
        &self.source
    }

    /// Program parameters applied to every variant.
    pub fn parameters(&self) -> &ProgramParameters {
        &self.parameters
    }

    /// Name of a specialized program.
    pub fn shader_name(name: &str, hash: u64) -> String {
        format!("{name}#{hash:x}")
    }

    /// Hash of a property set. Iteration order of the input does not matter.
    pub fn property_hash<'a>(properties: impl IntoIterator<Item = &'a str>) -> u64 {
        let sorted: BTreeSet<&str> = properties.into_iter().collect();
        let mut hasher = DefaultHasher::new();
        sorted.hash(&mut hasher);
        hasher.finish()
    }

    /// Computes the cache key for the given promoted properties. Properties the
    /// source does not list as uniform-eligible are ignored.
    pub fn program_key(&self, properties_as_uniforms: &BTreeSet<String>) -> Result<ProgramKey, ShaderError> {
        let eligible = &self.source.uniform_properties;
        if eligible.len() > 64 {
            return Err(ShaderError::TooManyUniformProperties {
                shader: self.name.clone(),
                count: eligible.len(),
            });
        }
        let uniform_mask = eligible
            .iter()
            .enumerate()
            .filter(|(_, p)| properties_as_uniforms.contains(p.as_str()))
            .fold(0u64, |mask, (i, _)| mask | (1 << i));
        Ok(ProgramKey {
            uniform_mask,
            defines_hash: self.parameters.defines_hash(),
        })
    }

    /// Returns the program specialized for `properties_as_uniforms`, compiling it
    /// on first use.
    ///
    /// Each promoted property adds `#define HAS_UNIFORM_u_<name>`. A compilation
    /// failure is returned and nothing is cached, so the next call retries.
    pub fn get_or_create_shader<C: Context + ?Sized>(
        &self,
        context: &C,
        properties_as_uniforms: &BTreeSet<String>,
        first_attrib_name: &str,
    ) -> Result<Arc<dyn ShaderProgram>, ShaderError> {
        let key = self.program_key(properties_as_uniforms)?;
        if let Some(program) = self.get_shader(&key) {
            return Ok(program);
        }

        let shader_name = Self::shader_name(&self.name, key.hash_value());
        if self.source.attribute(first_attrib_name).is_none() {
            return Err(ShaderError::MissingAttribute {
                shader: shader_name,
                attribute: first_attrib_name.to_string(),
            });
        }

        let mut defines = self.parameters.defines();
        for (i, property) in self.source.uniform_properties.iter().enumerate() {
            if key.uniform_mask & (1 << i) != 0 {
                defines.push(Define::flag(format!("HAS_UNIFORM_u_{property}")));
            }
        }

        log::debug!("Compiling shader variant '{}'", shader_name);
        let program = context
            .create_program(&shader_name, &self.source, &defines, first_attrib_name)
            .map_err(|e| {
                log::error!("Failed to compile '{}': {}", shader_name, e);
                e
            })?;

        let mut programs = self.programs.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have compiled the same variant meanwhile; keep the first.
        Ok(programs.entry(key).or_insert(program).clone())
    }

    /// Returns a cached program.
    pub fn get_shader(&self, key: &ProgramKey) -> Option<Arc<dyn ShaderProgram>> {
        self.programs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Caches `program` under `key`. Returns `false` and keeps the existing
    /// program when the key is taken.
    pub fn register_shader(&self, key: ProgramKey, program: Arc<dyn ShaderProgram>) -> bool {
        let mut programs = self.programs.write().unwrap_or_else(PoisonError::into_inner);
        if programs.contains_key(&key) {
            log::warn!(
                "Shader variant '{}' already registered",
                Self::shader_name(&self.name, key.hash_value())
            );
            return false;
        }
        programs.insert(key, program);
        true
    }

    /// Caches `program` under `key`, replacing any existing entry. Returns `true`
    /// if an entry was replaced.
    pub fn replace_shader(&self, key: ProgramKey, program: Arc<dyn ShaderProgram>) -> bool {
        self.programs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, program)
            .is_some()
    }

    /// Number of compiled variants.
    pub fn len(&self) -> usize {
        self.programs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if no variant was compiled yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::types::AttributeDataType;

    fn group() -> ShaderGroup {
        let source = ProgramSource::new("FillShader", "vs", "fs")
            .with_attribute("a_pos", 0, AttributeDataType::Short2)
            .with_uniform_property("color")
            .with_uniform_property("opacity");
        ShaderGroup::new(source, ProgramParameters::default())
    }

    #[test]
    fn test_program_key_uses_declared_order() {
        let group = group();
        let set: BTreeSet<String> = ["opacity".to_string(), "unknown".to_string()].into();
        let key = group.program_key(&set).unwrap();
        assert_eq!(key.uniform_mask, 0b10);
        assert_eq!(group.program_key(&BTreeSet::new()).unwrap().uniform_mask, 0);
    }

    #[test]
    fn test_property_hash_is_order_independent() {
        assert_eq!(
            ShaderGroup::property_hash(["color", "opacity"]),
            ShaderGroup::property_hash(["opacity", "color"])
        );
        assert_ne!(
            ShaderGroup::property_hash(["color"]),
            ShaderGroup::property_hash(["opacity"])
        );
    }

    #[test]
    fn test_shader_name_format() {
        assert_eq!(ShaderGroup::shader_name("FillShader", 255), "FillShader#ff");
    }
}
