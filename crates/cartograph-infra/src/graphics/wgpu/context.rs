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


//! The resource factory of the wgpu backend.

use super::buffer::WgpuUniformBuffer;
use super::command::WgpuCommandEncoder;
use super::device::WgpuDevice;
use super::drawable::WgpuDrawable;
use super::renderable::WgpuRenderable;
use super::shader::WgpuShaderProgram;
use super::texture::WgpuTexture2D;
use cartograph_core::gfx::command::CommandEncoder;
use cartograph_core::gfx::context::Context;
use cartograph_core::gfx::drawable::Drawable;
use cartograph_core::gfx::error::{RenderError, ResourceError, ShaderError};
use cartograph_core::gfx::shader::{Define, ProgramSource, ShaderProgram};
use cartograph_core::gfx::state::{ContextState, FramebufferBinding, ScissorRect, Viewport};
use cartograph_core::gfx::stats::RenderingStats;
use cartograph_core::gfx::texture::Texture2D;
use cartograph_core::gfx::types::{BackendType, ContextMode};
use cartograph_core::gfx::uniform_buffer::UniformBuffer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Creates every resource of the wgpu backend and owns the assumed state.
#[derive(Debug)]
pub struct WgpuContext {
    device: Arc<WgpuDevice>,
    renderable: Arc<WgpuRenderable>,
    state: Arc<Mutex<ContextState>>,
    backend_type: BackendType,
    context_mode: ContextMode,
    programs: Mutex<Vec<Weak<WgpuShaderProgram>>>,
}

impl WgpuContext {
    pub(crate) fn new(
        device: Arc<WgpuDevice>,
        renderable: Arc<WgpuRenderable>,
        backend_type: BackendType,
        context_mode: ContextMode,
    ) -> Self {
        Self {
            device,
            renderable,
            state: Arc::new(Mutex::new(ContextState::new())),
            backend_type,
            context_mode,
            programs: Mutex::new(Vec::new()),
        }
    }

    /// The shared device.
    pub fn device(&self) -> &Arc<WgpuDevice> {
        &self.device
    }

    /// The default render target.
    pub fn renderable(&self) -> &Arc<WgpuRenderable> {
        &self.renderable
    }

    fn state(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_programs(&self) -> Vec<Arc<WgpuShaderProgram>> {
        let mut programs = self.programs.lock().unwrap_or_else(PoisonError::into_inner);
        programs.retain(|p| p.strong_count() > 0);
        programs.iter().filter_map(Weak::upgrade).collect()
    }
}

impl Context for WgpuContext {
    fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    fn context_mode(&self) -> ContextMode {
        self.context_mode
    }

    fn create_texture_2d(&self) -> Arc<dyn Texture2D> {
        Arc::new(WgpuTexture2D::new(self.device.clone()))
    }

    fn create_uniform_buffer(
        &self,
        data: &[u8],
        persistent: bool,
    ) -> Result<Arc<dyn UniformBuffer>, ResourceError> {
        Ok(Arc::new(WgpuUniformBuffer::new(
            self.device.clone(),
            data,
            persistent,
        )?))
    }

    fn create_drawable(&self, name: &str) -> Box<dyn Drawable> {
        Box::new(WgpuDrawable::new(self.device.clone(), name))
    }

    fn create_program(
        &self,
        name: &str,
        source: &ProgramSource,
        defines: &[Define],
        first_attrib_name: &str,
    ) -> Result<Arc<dyn ShaderProgram>, ShaderError> {
        let program = Arc::new(WgpuShaderProgram::new(
            self.device.clone(),
            name,
            source,
            defines,
            first_attrib_name,
        )?);
        self.programs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&program));
        Ok(program)
    }

    fn create_command_encoder(&self) -> Result<Box<dyn CommandEncoder + '_>, RenderError> {
        self.device.check_alive()?;
        Ok(Box::new(WgpuCommandEncoder::new(
            self.device.clone(),
            self.renderable.clone(),
            self.state.clone(),
        )))
    }

    fn begin_frame(&self) {
        self.device.stats().begin_frame();
    }

    fn end_frame(&self) {
        log::trace!("Frame ended: {:?}", self.device.stats().snapshot());
    }

    fn perform_cleanup(&self) {
        self.device.poll_non_blocking();
    }

    fn reduce_memory_usage(&self) {
        let programs = self.live_programs();
        log::info!(
            "Reducing memory usage: dropping pipelines of {} programs",
            programs.len()
        );
        for program in programs {
            program.clear_pipelines();
        }
        self.device.poll_blocking();
    }

    fn stats(&self) -> RenderingStats {
        self.device.stats().snapshot()
    }

    fn assume_viewport(&self, viewport: Viewport) {
        self.state().viewport.assume(viewport);
    }

    fn assume_scissor(&self, rect: ScissorRect) {
        self.state().scissor.assume(rect);
    }

    fn assume_framebuffer(&self, framebuffer: FramebufferBinding) {
        self.state().framebuffer.assume(framebuffer);
    }

    fn set_dirty_state(&self) {
        self.state().set_dirty();
    }
}
