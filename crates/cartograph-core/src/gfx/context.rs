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

//! The per-backend root factory for GPU resources.

use super::command::CommandEncoder;
use super::drawable::Drawable;
use super::error::{RenderError, ResourceError, ShaderError};
use super::shader::{Define, ProgramSource, ShaderProgram, ShaderRegistry};
use super::state::{FramebufferBinding, ScissorRect, Viewport};
use super::stats::RenderingStats;
use super::texture::Texture2D;
use super::types::{BackendType, ContextMode};
use super::uniform_buffer::UniformBuffer;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

/// Creates every GPU resource of one backend and tracks its global state.
///
/// Call sites never name a concrete backend: textures, buffers, drawables and
/// programs all come out of this factory, and the only concrete implementation
/// is chosen once when the renderer is built.
///
/// All methods must be called on the render thread with the backend activated
/// (see [`BackendScope`](super::backend::BackendScope)).
pub trait Context: Send + Sync + Debug {
    /// The graphics API behind this context.
    fn backend_type(&self) -> BackendType;

    /// Whether the context owns the GPU state exclusively.
    fn context_mode(&self) -> ContextMode;

    /// Creates an empty texture. Configure it with `set_format`/`set_size`, then `create`.
    fn create_texture_2d(&self) -> Arc<dyn Texture2D>;

    /// Creates a uniform buffer holding `data`. Its size is fixed to `data.len()`.
    ///
    /// `persistent` hints that the buffer lives for many frames.
    fn create_uniform_buffer(
        &self,
        data: &[u8],
        persistent: bool,
    ) -> Result<Arc<dyn UniformBuffer>, ResourceError>;

    /// Creates an empty backend drawable.
    fn create_drawable(&self, name: &str) -> Box<dyn Drawable>;

    /// Compiles one specialization of `source`.
    fn create_program(
        &self,
        name: &str,
        source: &ProgramSource,
        defines: &[Define],
        first_attrib_name: &str,
    ) -> Result<Arc<dyn ShaderProgram>, ShaderError>;

    /// Starts recording a frame.
    fn create_command_encoder(&self) -> Result<Box<dyn CommandEncoder + '_>, RenderError>;

    /// Writes `data` into `slot`, creating the buffer if the slot is empty or
    /// holds a buffer of another size.
    fn emplace_or_update_uniform_buffer(
        &self,
        slot: &mut Option<Arc<dyn UniformBuffer>>,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        match slot {
            Some(buffer) if buffer.size() == data.len() => buffer.update(data),
            _ => {
                *slot = Some(self.create_uniform_buffer(data, false)?);
                Ok(())
            }
        }
    }

    /// Returns the unspecialized variant of the shader `name`.
    fn get_generic_shader(
        &self,
        registry: &ShaderRegistry,
        name: &str,
    ) -> Result<Arc<dyn ShaderProgram>, ShaderError> {
        let group = registry
            .get_shader_group(name)
            .ok_or_else(|| ShaderError::UnknownShader(name.to_string()))?;
        let first_attrib = group
            .source()
            .attributes
            .first()
            .map(|a| a.name.clone())
            .ok_or_else(|| ShaderError::MissingAttribute {
                shader: name.to_string(),
                attribute: "<any>".to_string(),
            })?;
        group.get_or_create_shader(self, &BTreeSet::new(), &first_attrib)
    }

    /// Marks the start of a frame.
    fn begin_frame(&self);

    /// Marks the end of a frame.
    fn end_frame(&self);

    /// Releases resources whose last user went away during the frame.
    fn perform_cleanup(&self);

    /// Drops caches that can be rebuilt, e.g. after a low-memory warning.
    fn reduce_memory_usage(&self);

    /// Current counters.
    fn stats(&self) -> RenderingStats;

    /// Records a viewport set outside this layer.
    fn assume_viewport(&self, viewport: Viewport);

    /// Records a scissor rectangle set outside this layer.
    fn assume_scissor(&self, rect: ScissorRect);

    /// Records a render target bound outside this layer.
    fn assume_framebuffer(&self, framebuffer: FramebufferBinding);

    /// Forgets every assumed value; the next setters always apply.
    fn set_dirty_state(&self);
}
