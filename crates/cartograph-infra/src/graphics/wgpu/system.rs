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


//! The wgpu renderer backend: adapter, device and default render target.

use super::backend::{SelectedAdapter, WgpuAdapterSelector};
use super::context::WgpuContext;
use super::device::WgpuDevice;
use super::renderable::WgpuRenderable;
use super::shaders::builtin_sources;
use anyhow::anyhow;
use cartograph_core::config::RendererConfig;
use cartograph_core::gfx::backend::{
    AdapterInfo, AdapterSelection, AdapterSelector, RendererBackend, ScopeState, ScopeToken,
};
use cartograph_core::gfx::context::Context;
use cartograph_core::gfx::error::{RenderError, ShaderError};
use cartograph_core::gfx::renderable::Renderable;
use cartograph_core::gfx::shader::{ProgramParameters, ShaderGroup, ShaderRegistry};
use cartograph_core::gfx::types::{BackendType, ContextMode, Size};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::fmt;
use std::sync::Arc;

/// Renders through wgpu on whichever API the adapter selection settled on.
pub struct WgpuRendererBackend {
    // Surfaces borrow from the instance that created them.
    _instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: Arc<WgpuDevice>,
    renderable: Arc<WgpuRenderable>,
    context_mode: ContextMode,
    scope: ScopeState,
    attempted_backends: Vec<BackendType>,
    selection_time_ms: u64,
}

impl fmt::Debug for WgpuRendererBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuRendererBackend")
            .field("adapter", self.device.info())
            .field("context_mode", &self.context_mode)
            .field("renderable", &self.renderable)
            .field("scope_depth", &self.scope.depth())
            .finish()
    }
}

impl WgpuRendererBackend {
    /// Creates a backend drawing into an offscreen target of `size`.
    pub fn new_headless(config: &RendererConfig, size: Size) -> Result<Self, RenderError> {
        let selection = pollster::block_on(select_adapter(config))?;
        let selected = unpack(selection);
        let device = create_device(&selected.adapter, selected.info.clone())?;
        let renderable = Arc::new(WgpuRenderable::offscreen(device.clone(), size));
        Ok(Self::assemble(selected, device, renderable, config))
    }

    /// Creates a backend presenting to `window`.
    ///
    /// # Safety
    ///
    /// `window` must outlive the backend; the surface keeps raw handles to it.
    pub unsafe fn from_window<W>(
        config: &RendererConfig,
        window: &W,
        size: Size,
    ) -> Result<Self, RenderError>
    where
        W: HasWindowHandle + HasDisplayHandle,
    {
        let selection = pollster::block_on(select_adapter(config))?;
        let selected = unpack(selection);

        let surface_target = unsafe { wgpu::SurfaceTargetUnsafe::from_window(window) }
            .map_err(|e| {
                RenderError::InitializationFailed(format!("Failed to create surface target: {e}"))
            })?;
        let surface = unsafe { selected.instance.create_surface_unsafe(surface_target) }.map_err(|e| {
            RenderError::InitializationFailed(format!("Failed to create surface: {e}"))
        })?;
        if !selected.adapter.is_surface_supported(&surface) {
            return Err(RenderError::InitializationFailed(format!(
                "Adapter \"{}\" cannot present to this window",
                selected.info.name
            )));
        }
        log::debug!("WGPU surface created for the window.");

        let device = create_device(&selected.adapter, selected.info.clone())?;
        let renderable = Arc::new(WgpuRenderable::from_surface(
            device.clone(),
            &selected.adapter,
            surface,
            size,
        ));
        Ok(Self::assemble(selected, device, renderable, config))
    }

    fn assemble(
        selected: Selected,
        device: Arc<WgpuDevice>,
        renderable: Arc<WgpuRenderable>,
        config: &RendererConfig,
    ) -> Self {
        log::info!(
            "Renderer backend ready on {} ({})",
            selected.info.name,
            selected.info.backend_type
        );
        Self {
            _instance: selected.instance,
            adapter: selected.adapter,
            device,
            renderable,
            context_mode: config.context_mode,
            scope: ScopeState::new(),
            attempted_backends: selected.attempted_backends,
            selection_time_ms: selected.selection_time_ms,
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

    /// The adapter in use.
    pub fn adapter_info(&self) -> &AdapterInfo {
        self.device.info()
    }

    /// Native limits of the adapter.
    pub fn adapter_limits(&self) -> wgpu::Limits {
        self.adapter.limits()
    }

    /// APIs tried before the adapter was found, in order.
    pub fn attempted_backends(&self) -> &[BackendType] {
        &self.attempted_backends
    }

    /// Time spent selecting the adapter.
    pub fn selection_time_ms(&self) -> u64 {
        self.selection_time_ms
    }

    /// Creates the context with its concrete type.
    pub fn create_wgpu_context(&self) -> WgpuContext {
        WgpuContext::new(
            self.device.clone(),
            self.renderable.clone(),
            self.backend_type(),
            self.context_mode,
        )
    }
}

async fn select_adapter(config: &RendererConfig) -> Result<AdapterSelection<SelectedAdapter>, RenderError> {
    WgpuAdapterSelector::new()
        .select_adapter(config.backend)
        .await
        .map_err(RenderError::InitializationFailed)
}

struct Selected {
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    info: AdapterInfo,
    attempted_backends: Vec<BackendType>,
    selection_time_ms: u64,
}

fn unpack(selection: AdapterSelection<SelectedAdapter>) -> Selected {
    log::debug!(
        "Adapter selection tried {:?} in {} ms",
        selection.attempted_backends,
        selection.selection_time_ms
    );
    let SelectedAdapter { instance, adapter } = selection.adapter;
    Selected {
        instance,
        adapter,
        info: selection.info,
        attempted_backends: selection.attempted_backends,
        selection_time_ms: selection.selection_time_ms,
    }
}

fn create_device(adapter: &wgpu::Adapter, info: AdapterInfo) -> Result<Arc<WgpuDevice>, RenderError> {
    let (device, queue) = pollster::block_on(request_device(adapter))
        .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;
    log::info!("Logical device and command queue created.");
    log::debug!("Device limits: {:?}", device.limits());
    Ok(Arc::new(WgpuDevice::new(device, queue, info)))
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("cartograph device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            experimental_features: Default::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .map_err(|e| anyhow!("Failed to create logical device: {}", e))
}

impl RendererBackend for WgpuRendererBackend {
    fn backend_type(&self) -> BackendType {
        self.device.info().backend_type
    }

    fn context_mode(&self) -> ContextMode {
        self.context_mode
    }

    fn create_context(&self) -> Result<Box<dyn Context>, RenderError> {
        self.device.check_alive()?;
        Ok(Box::new(self.create_wgpu_context()))
    }

    fn default_renderable(&self) -> &dyn Renderable {
        self.renderable.as_ref()
    }

    fn init_shaders(
        &self,
        registry: &ShaderRegistry,
        parameters: &ProgramParameters,
    ) -> Result<(), ShaderError> {
        for source in builtin_sources() {
            if registry.is_registered(&source.name) {
                log::debug!("Shader group '{}' already registered", source.name);
                continue;
            }
            registry.register_shader_group(Arc::new(ShaderGroup::new(source, parameters.clone())));
        }
        log::info!("Registered {} shader groups", registry.len());
        Ok(())
    }

    fn activate(&self, _token: &ScopeToken) {
        log::trace!("wgpu backend activated");
    }

    fn deactivate(&self, _token: &ScopeToken) {
        self.device.poll_non_blocking();
    }

    fn scope_state(&self) -> &ScopeState {
        &self.scope
    }
}
