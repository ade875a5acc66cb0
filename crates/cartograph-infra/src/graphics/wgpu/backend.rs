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


//! Adapter selection with fallback across graphics APIs.
//!
//! Each API is probed through its own [`wgpu::Instance`] restricted to that
//! API, so the adapter found is guaranteed to run on it. The first API that
//! yields an adapter wins; the instance is kept alongside the adapter because
//! surfaces must be created from the same instance.

use super::conversions::{backend_type_from_wgpu, IntoWgpu};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use cartograph_core::gfx::backend::{fallback_order, AdapterInfo, AdapterSelection, AdapterSelector};
use cartograph_core::gfx::types::BackendType;
use std::time::Instant;
use wgpu::{Adapter, Backend, DeviceType, Instance, RequestAdapterOptions};

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Vulkan => "Vulkan",
        Backend::Metal => "Metal",
        Backend::Dx12 => "DirectX 12",
        Backend::Gl => "OpenGL",
        Backend::BrowserWebGpu => "WebGPU",
        Backend::Noop => "No-op",
    }
}

fn device_type_name(device_type: DeviceType) -> &'static str {
    match device_type {
        DeviceType::IntegratedGpu => "integrated",
        DeviceType::DiscreteGpu => "discrete",
        DeviceType::VirtualGpu => "virtual",
        DeviceType::Cpu => "cpu",
        DeviceType::Other => "other",
    }
}

/// An adapter together with the instance it was found through.
#[derive(Debug)]
pub struct SelectedAdapter {
    /// Instance restricted to the adapter's API.
    pub instance: Instance,
    /// The adapter.
    pub adapter: Adapter,
}

/// Probes graphics APIs in fallback order until one yields an adapter.
#[derive(Debug, Clone, Copy)]
pub struct WgpuAdapterSelector {
    power_preference: wgpu::PowerPreference,
}

impl Default for WgpuAdapterSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl WgpuAdapterSelector {
    /// A selector preferring high-performance adapters.
    pub fn new() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
        }
    }

    /// Overrides the power preference passed to wgpu.
    pub fn with_power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }

    fn adapter_to_info(adapter: &Adapter, backend_type: BackendType) -> AdapterInfo {
        let info = adapter.get_info();
        AdapterInfo {
            name: info.name,
            backend_type,
            device_type: device_type_name(info.device_type).to_string(),
        }
    }

    /// Tries to get an adapter running on `backend_type`.
    async fn try_backend(&self, backend_type: BackendType) -> Result<SelectedAdapter> {
        let backend: Backend = backend_type.into_wgpu();
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: backend_type.into_wgpu(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: self.power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| anyhow!("No adapter for {}: {}", backend_name(backend), e))?;

        let adapter_info = adapter.get_info();
        if adapter_info.backend != backend {
            return Err(anyhow!(
                "Adapter returned wrong backend: requested {:?}, got {:?}",
                backend,
                adapter_info.backend
            ));
        }

        log::info!(
            "{} backend succeeded with adapter: \"{}\"",
            backend_name(backend),
            adapter_info.name
        );
        Ok(SelectedAdapter { instance, adapter })
    }
}

#[async_trait]
impl AdapterSelector<SelectedAdapter> for WgpuAdapterSelector {
    type Error = String;

    async fn select_adapter(
        &self,
        preferred: BackendType,
    ) -> Result<AdapterSelection<SelectedAdapter>, Self::Error> {
        let start_time = Instant::now();
        let mut attempted_backends = Vec::new();

        log::info!("Selecting a graphics adapter, preferring {preferred}...");

        for backend_type in fallback_order(preferred) {
            if !self.is_backend_supported(backend_type) {
                log::debug!("Skipping {backend_type}: not supported on this platform");
                continue;
            }
            attempted_backends.push(backend_type);

            match self.try_backend(backend_type).await {
                Ok(selected) => {
                    let info = Self::adapter_to_info(&selected.adapter, backend_type);
                    let selection_time_ms = start_time.elapsed().as_millis() as u64;
                    if backend_type != preferred {
                        log::warn!("{preferred} unavailable, fell back to {backend_type}");
                    }
                    log::info!(
                        "Selected {} adapter \"{}\" ({}) in {} ms",
                        backend_type,
                        info.name,
                        info.device_type,
                        selection_time_ms
                    );
                    return Ok(AdapterSelection {
                        adapter: selected,
                        info,
                        selection_time_ms,
                        attempted_backends,
                    });
                }
                Err(e) => {
                    log::warn!("Failed to initialize {backend_type} backend: {e}");
                }
            }
        }

        Err(format!(
            "All backend attempts failed. Attempted: {attempted_backends:?}"
        ))
    }

    fn is_backend_supported(&self, backend_type: BackendType) -> bool {
        match backend_type {
            BackendType::Vulkan => {
                #[cfg(any(target_os = "windows", target_os = "linux", target_os = "android"))]
                return true;
                #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "android")))]
                return false;
            }
            BackendType::Metal => {
                #[cfg(any(target_os = "macos", target_os = "ios"))]
                return true;
                #[cfg(not(any(target_os = "macos", target_os = "ios")))]
                return false;
            }
            BackendType::OpenGl => true,
            BackendType::WebGpu => {
                #[cfg(target_arch = "wasm32")]
                return true;
                #[cfg(not(target_arch = "wasm32"))]
                return false;
            }
        }
    }
}

/// The API an adapter actually runs on, when it is one we model.
pub fn adapter_backend_type(adapter: &Adapter) -> Option<BackendType> {
    backend_type_from_wgpu(adapter.get_info().backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_name_function() {
        assert_eq!(backend_name(Backend::Vulkan), "Vulkan");
        assert_eq!(backend_name(Backend::Metal), "Metal");
        assert_eq!(backend_name(Backend::Dx12), "DirectX 12");
        assert_eq!(backend_name(Backend::Gl), "OpenGL");
    }

    #[test]
    fn test_opengl_is_always_supported() {
        let selector = WgpuAdapterSelector::new();
        assert!(selector.is_backend_supported(BackendType::OpenGl));
        assert!(selector.is_backend_supported(BackendType::default()));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_webgpu_is_browser_only() {
        assert!(!WgpuAdapterSelector::new().is_backend_supported(BackendType::WebGpu));
    }
}
