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

//! An in-memory backend recording what the core asks of it.

#![allow(dead_code)]

use cartograph_core::gfx::command::{CommandEncoder, RenderPass, RenderPassDescriptor, UploadPass};
use cartograph_core::gfx::shader::{
    default_vertex_attributes, Define, ProgramParameters, ProgramSource, ShaderProgram,
    ShaderRegistry, UniformBlockInfo,
};
use cartograph_core::gfx::state::{ContextState, FramebufferBinding, ScissorRect, Viewport};
use cartograph_core::gfx::texture::validate_upload;
use cartograph_core::gfx::vertex_attribute::VertexAttributeArray;
use cartograph_core::gfx::{
    BackendType, BufferResource, BufferUsage, ContextMode, Drawable, DrawableBase, Rect,
    RenderError, RenderPasses, Renderable, RendererBackend, RenderingStats, ResourceError,
    SamplerState, ScopeState, ScopeToken, ShaderError, Size, StatsTracker, Texture2D,
    TextureChannelDataType, TexturePixelType, UniformBuffer, UniformBufferArray,
};
use cartograph_core::gfx::Context;
use cartograph_core::renderer::PaintParameters;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Shared, ordered record of backend calls.
pub type CallLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CallLog, entry: String) {
    log.lock().unwrap().push(entry);
}

// --- Texture ---

#[derive(Debug, Default)]
struct TextureState {
    size: Size,
    pixel_type: TexturePixelType,
    channel_type: TextureChannelDataType,
    sampler: SamplerState,
    pixels: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
pub struct MockTexture {
    state: Mutex<TextureState>,
    pub uploads: AtomicUsize,
    /// Sub-region uploads allowed before they start failing; `None` never fails.
    pub upload_budget: Mutex<Option<usize>>,
}

impl MockTexture {
    /// Contents of the texture, if created.
    pub fn pixels(&self) -> Option<Vec<u8>> {
        self.state.lock().unwrap().pixels.clone()
    }

    /// Reads one pixel's bytes.
    pub fn pixel_at(&self, x: u32, y: u32) -> Vec<u8> {
        let stride = self.pixel_stride();
        let state = self.state.lock().unwrap();
        let offset = (y as usize * state.size.width as usize + x as usize) * stride;
        state.pixels.as_ref().expect("created")[offset..offset + stride].to_vec()
    }
}

impl Texture2D for MockTexture {
    fn set_sampler_configuration(&self, sampler: SamplerState) {
        self.state.lock().unwrap().sampler = sampler;
    }

    fn sampler_configuration(&self) -> SamplerState {
        self.state.lock().unwrap().sampler
    }

    fn set_format(&self, pixel_type: TexturePixelType, channel_type: TextureChannelDataType) {
        let mut state = self.state.lock().unwrap();
        state.pixel_type = pixel_type;
        state.channel_type = channel_type;
        state.pixels = None;
    }

    fn set_size(&self, size: Size) {
        let mut state = self.state.lock().unwrap();
        state.size = size;
        state.pixels = None;
    }

    fn size(&self) -> Size {
        self.state.lock().unwrap().size
    }

    fn pixel_type(&self) -> TexturePixelType {
        self.state.lock().unwrap().pixel_type
    }

    fn channel_type(&self) -> TextureChannelDataType {
        self.state.lock().unwrap().channel_type
    }

    fn create(&self) -> Result<(), ResourceError> {
        let len = self.data_size();
        let mut state = self.state.lock().unwrap();
        if state.size.is_empty() {
            return Err(ResourceError::InvalidSize {
                width: state.size.width,
                height: state.size.height,
            });
        }
        state.pixels = Some(vec![0; len]);
        Ok(())
    }

    fn is_created(&self) -> bool {
        self.state.lock().unwrap().pixels.is_some()
    }

    fn upload(&self, pixels: &[u8]) -> Result<(), ResourceError> {
        validate_upload(self, pixels, self.size())?;
        self.state.lock().unwrap().pixels = Some(pixels.to_vec());
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn upload_sub_region(&self, pixels: &[u8], region: Rect) -> Result<(), ResourceError> {
        if let Some(budget) = self.upload_budget.lock().unwrap().as_mut() {
            if *budget == 0 {
                return Err(ResourceError::BackendError("device lost".to_string()));
            }
            *budget -= 1;
        }
        validate_upload(self, pixels, region.size())?;
        let stride = self.pixel_stride();
        let mut state = self.state.lock().unwrap();
        if !region.fits_in(state.size) {
            return Err(ResourceError::InvalidSize {
                width: region.w,
                height: region.h,
            });
        }
        let width = state.size.width as usize;
        let target = state
            .pixels
            .as_mut()
            .ok_or_else(|| ResourceError::NotCreated("texture".to_string()))?;
        let row_bytes = region.w as usize * stride;
        for row in 0..region.h as usize {
            let src = row * row_bytes;
            let dst = ((region.y as usize + row) * width + region.x as usize) * stride;
            target[dst..dst + row_bytes].copy_from_slice(&pixels[src..src + row_bytes]);
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// --- Buffers ---

#[derive(Debug)]
pub struct MockUniformBuffer {
    pub id: usize,
    data: Mutex<Vec<u8>>,
    pub updates: AtomicUsize,
}

impl MockUniformBuffer {
    pub fn data(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl UniformBuffer for MockUniformBuffer {
    fn size(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    fn update(&self, data: &[u8]) -> Result<(), ResourceError> {
        let mut current = self.data.lock().unwrap();
        if current.len() != data.len() {
            return Err(ResourceError::SizeMismatch {
                expected: current.len(),
                actual: data.len(),
            });
        }
        current.copy_from_slice(data);
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MockBuffer {
    pub size: usize,
    pub usage: BufferUsage,
}

impl BufferResource for MockBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// --- Program ---

#[derive(Debug)]
pub struct MockProgram {
    pub name: String,
    pub defines: Vec<Define>,
    attributes: VertexAttributeArray,
    blocks: Vec<UniformBlockInfo>,
}

impl ShaderProgram for MockProgram {
    fn type_name(&self) -> &'static str {
        "mock"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn vertex_attributes(&self) -> &VertexAttributeArray {
        &self.attributes
    }

    fn uniform_blocks(&self) -> &[UniformBlockInfo] {
        &self.blocks
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// --- Drawable ---

#[derive(Debug)]
pub struct MockDrawable {
    base: DrawableBase,
    log: CallLog,
    stats: Arc<StatsTracker>,
    /// Layer uniform ids visible at the last draw.
    pub last_layer_uniforms: Vec<usize>,
}

impl Drop for MockDrawable {
    fn drop(&mut self) {
        self.stats.drawable_released();
    }
}

impl Drawable for MockDrawable {
    fn base(&self) -> &DrawableBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DrawableBase {
        &mut self.base
    }

    fn upload(&mut self, pass: &mut dyn UploadPass) -> Result<(), ResourceError> {
        if !self.base.needs_upload() {
            return Ok(());
        }
        if self.base.vertex_count() > 0 {
            pass.create_buffer(self.base.name(), self.base.vertex_data(), BufferUsage::VERTEX)?;
        }
        self.base.mark_uploaded();
        record(&self.log, format!("upload:{}", self.base.name()));
        Ok(())
    }

    fn draw(
        &mut self,
        _pass: &mut dyn RenderPass,
        layer_uniforms: &UniformBufferArray,
        parameters: &PaintParameters,
    ) -> Result<(), RenderError> {
        let pass = if parameters.render_pass == RenderPasses::OPAQUE {
            "opaque"
        } else {
            "translucent"
        };
        self.last_layer_uniforms = layer_uniforms.iter().map(|(id, _)| id).collect();
        self.stats.record_draw(self.base.triangle_count() as u64);
        record(&self.log, format!("draw:{}:{}", self.base.name(), pass));
        Ok(())
    }
}

// --- Passes and encoder ---

pub struct MockUploadPass {
    log: CallLog,
}

impl UploadPass for MockUploadPass {
    fn create_buffer(
        &mut self,
        _label: &str,
        data: &[u8],
        usage: BufferUsage,
    ) -> Result<Arc<dyn BufferResource>, ResourceError> {
        Ok(Arc::new(MockBuffer {
            size: data.len(),
            usage,
        }))
    }

    fn update_buffer(&mut self, buffer: &dyn BufferResource, data: &[u8]) -> Result<(), ResourceError> {
        if buffer.size() != data.len() {
            return Err(ResourceError::SizeMismatch {
                expected: buffer.size(),
                actual: data.len(),
            });
        }
        Ok(())
    }

    fn push_debug_group(&mut self, name: &str) {
        record(&self.log, format!("push:{name}"));
    }

    fn pop_debug_group(&mut self) {
        record(&self.log, "pop".to_string());
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct MockRenderPass {
    descriptor: RenderPassDescriptor,
    log: CallLog,
}

impl RenderPass for MockRenderPass {
    fn descriptor(&self) -> &RenderPassDescriptor {
        &self.descriptor
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        record(&self.log, format!("viewport:{}x{}", viewport.width, viewport.height));
    }

    fn set_scissor(&mut self, _rect: ScissorRect) {}

    fn push_debug_group(&mut self, _name: &str) {}

    fn pop_debug_group(&mut self) {}

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct MockCommandEncoder<'a> {
    context: &'a MockContext,
}

impl CommandEncoder for MockCommandEncoder<'_> {
    fn create_upload_pass(&mut self, _name: &str) -> Box<dyn UploadPass + '_> {
        Box::new(MockUploadPass {
            log: self.context.log.clone(),
        })
    }

    fn create_render_pass(
        &mut self,
        name: &str,
        descriptor: RenderPassDescriptor,
    ) -> Result<Box<dyn RenderPass + '_>, RenderError> {
        if let Some(e) = self.context.fail_render_pass.lock().unwrap().take() {
            return Err(e);
        }
        record(&self.context.log, format!("render_pass:{name}"));
        Ok(Box::new(MockRenderPass {
            descriptor,
            log: self.context.log.clone(),
        }))
    }

    fn push_debug_group(&mut self, _name: &str) {}

    fn pop_debug_group(&mut self) {}

    fn submit(self: Box<Self>) -> Result<(), RenderError> {
        self.context.submits.fetch_add(1, Ordering::SeqCst);
        record(&self.context.log, "submit".to_string());
        Ok(())
    }
}

// --- Context ---

#[derive(Debug, Default)]
pub struct MockContext {
    pub log: CallLog,
    pub stats: Arc<StatsTracker>,
    next_id: AtomicUsize,
    pub programs_created: AtomicUsize,
    pub uniform_buffers_created: AtomicUsize,
    pub fail_compilation: AtomicBool,
    pub fail_render_pass: Mutex<Option<RenderError>>,
    pub submits: AtomicUsize,
    pub cleanups: AtomicUsize,
    pub state: Mutex<ContextState>,
    pub textures: Mutex<Vec<Arc<MockTexture>>>,
}

impl MockContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries of the call log starting with `prefix`.
    pub fn calls(&self, prefix: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// The concrete texture behind `texture`.
    pub fn mock_texture(texture: &dyn Texture2D) -> &MockTexture {
        texture
            .as_any()
            .downcast_ref::<MockTexture>()
            .expect("texture created by MockContext")
    }
}

impl Context for MockContext {
    fn backend_type(&self) -> BackendType {
        BackendType::WebGpu
    }

    fn context_mode(&self) -> ContextMode {
        ContextMode::Unique
    }

    fn create_texture_2d(&self) -> Arc<dyn Texture2D> {
        let texture = Arc::new(MockTexture::default());
        self.textures.lock().unwrap().push(texture.clone());
        self.stats.texture_created(0);
        texture
    }

    fn create_uniform_buffer(
        &self,
        data: &[u8],
        _persistent: bool,
    ) -> Result<Arc<dyn UniformBuffer>, ResourceError> {
        self.uniform_buffers_created.fetch_add(1, Ordering::SeqCst);
        self.stats.buffer_created(data.len() as u64);
        Ok(Arc::new(MockUniformBuffer {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            data: Mutex::new(data.to_vec()),
            updates: AtomicUsize::new(0),
        }))
    }

    fn create_drawable(&self, name: &str) -> Box<dyn Drawable> {
        self.stats.drawable_created();
        Box::new(MockDrawable {
            base: DrawableBase::new(name),
            log: self.log.clone(),
            stats: self.stats.clone(),
            last_layer_uniforms: Vec::new(),
        })
    }

    fn create_program(
        &self,
        name: &str,
        source: &ProgramSource,
        defines: &[Define],
        _first_attrib_name: &str,
    ) -> Result<Arc<dyn ShaderProgram>, ShaderError> {
        if self.fail_compilation.load(Ordering::SeqCst) {
            return Err(ShaderError::CompilationFailed {
                shader: name.to_string(),
                details: "forced failure".to_string(),
            });
        }
        self.programs_created.fetch_add(1, Ordering::SeqCst);
        let promoted = |p: &str| {
            defines
                .iter()
                .any(|d| d.name == format!("HAS_UNIFORM_u_{p}"))
        };
        Ok(Arc::new(MockProgram {
            name: name.to_string(),
            defines: defines.to_vec(),
            attributes: default_vertex_attributes(source, promoted),
            blocks: source.uniform_blocks.clone(),
        }))
    }

    fn create_command_encoder(&self) -> Result<Box<dyn CommandEncoder + '_>, RenderError> {
        Ok(Box::new(MockCommandEncoder { context: self }))
    }

    fn begin_frame(&self) {
        self.stats.begin_frame();
    }

    fn end_frame(&self) {}

    fn perform_cleanup(&self) {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
    }

    fn reduce_memory_usage(&self) {}

    fn stats(&self) -> RenderingStats {
        self.stats.snapshot()
    }

    fn assume_viewport(&self, viewport: Viewport) {
        self.state.lock().unwrap().viewport.assume(viewport);
    }

    fn assume_scissor(&self, rect: ScissorRect) {
        self.state.lock().unwrap().scissor.assume(rect);
    }

    fn assume_framebuffer(&self, framebuffer: FramebufferBinding) {
        self.state.lock().unwrap().framebuffer.assume(framebuffer);
    }

    fn set_dirty_state(&self) {
        self.state.lock().unwrap().set_dirty();
    }
}

// --- Backend ---

#[derive(Debug, Default)]
pub struct MockRenderable {
    size: Mutex<Size>,
}

impl Renderable for MockRenderable {
    fn size(&self) -> Size {
        *self.size.lock().unwrap()
    }

    fn resize(&self, size: Size) {
        *self.size.lock().unwrap() = size;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct MockBackend {
    pub mode: Option<ContextMode>,
    scope: ScopeState,
    pub activations: AtomicUsize,
    pub deactivations: AtomicUsize,
    renderable: MockRenderable,
}

impl MockBackend {
    pub fn new(mode: ContextMode) -> Self {
        Self {
            mode: Some(mode),
            ..Default::default()
        }
    }
}

impl RendererBackend for MockBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::WebGpu
    }

    fn context_mode(&self) -> ContextMode {
        self.mode.unwrap_or(ContextMode::Unique)
    }

    fn create_context(&self) -> Result<Box<dyn Context>, RenderError> {
        Ok(Box::new(MockContext::new()))
    }

    fn default_renderable(&self) -> &dyn Renderable {
        &self.renderable
    }

    fn init_shaders(
        &self,
        registry: &ShaderRegistry,
        parameters: &ProgramParameters,
    ) -> Result<(), ShaderError> {
        registry.register_shader_group(Arc::new(
            cartograph_core::gfx::shader::ShaderGroup::new(fill_source(), parameters.clone()),
        ));
        Ok(())
    }

    fn activate(&self, _token: &ScopeToken) {
        self.activations.fetch_add(1, Ordering::SeqCst);
    }

    fn deactivate(&self, _token: &ScopeToken) {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
    }

    fn scope_state(&self) -> &ScopeState {
        &self.scope
    }
}

/// A fill program source with two promotable properties.
pub fn fill_source() -> ProgramSource {
    use cartograph_core::gfx::AttributeDataType;
    ProgramSource::new("FillShader", "vertex", "fragment")
        .with_attribute("a_pos", 0, AttributeDataType::Short2)
        .with_attribute("a_color", 1, AttributeDataType::Float4)
        .with_attribute("a_opacity", 2, AttributeDataType::Float2)
        .with_uniform_property("color")
        .with_uniform_property("opacity")
        .with_uniform_block("FillDrawableUBO", 1)
        .with_uniform_block("FillEvaluatedPropsUBO", 3)
}
