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

//! The per-API root object and the scope guard that activates it.

use super::context::Context;
use super::error::{RenderError, ShaderError};
use super::renderable::Renderable;
use super::shader::{ProgramParameters, ShaderRegistry};
use super::types::{BackendType, ContextMode};
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// Proof that the caller is inside a [`BackendScope`].
///
/// Only the scope guard can construct it, so `activate`/`deactivate` cannot be
/// called from anywhere else.
#[derive(Debug)]
pub struct ScopeToken {
    _private: (),
}

/// Nesting depth of the scopes opened on a backend, per thread.
///
/// The backend is activated once on each thread that opens a scope, so two
/// threads holding scopes at the same time both see it current.
#[derive(Debug, Default)]
pub struct ScopeState {
    depths: Mutex<HashMap<ThreadId, usize>>,
}

impl ScopeState {
    /// Creates an inactive state.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ThreadId, usize>> {
        self.depths.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of scopes currently open on the calling thread.
    pub fn depth(&self) -> usize {
        self.lock()
            .get(&thread::current().id())
            .copied()
            .unwrap_or(0)
    }

    /// Returns `true` while the calling thread holds at least one scope.
    pub fn is_active(&self) -> bool {
        self.depth() > 0
    }

    /// Number of threads holding at least one scope.
    pub fn active_threads(&self) -> usize {
        self.lock().len()
    }

    /// Increments the depth of the calling thread and returns the previous one.
    fn enter(&self) -> usize {
        let mut depths = self.lock();
        let depth = depths.entry(thread::current().id()).or_insert(0);
        *depth += 1;
        *depth - 1
    }

    /// Decrements the depth of the calling thread and returns the previous one.
    fn exit(&self) -> usize {
        let mut depths = self.lock();
        let id = thread::current().id();
        let previous = depths.get(&id).copied().unwrap_or(0);
        if previous <= 1 {
            depths.remove(&id);
        } else {
            depths.insert(id, previous - 1);
        }
        previous
    }
}

/// One graphics API implementation (OpenGL, Metal, Vulkan or WebGPU).
pub trait RendererBackend: Send + Sync {
    /// The graphics API.
    fn backend_type(&self) -> BackendType;

    /// Whether the backend owns the GPU state exclusively.
    fn context_mode(&self) -> ContextMode;

    /// Creates the context that produces every resource of this backend.
    fn create_context(&self) -> Result<Box<dyn Context>, RenderError>;

    /// The surface the host supplied, drawn into by default.
    fn default_renderable(&self) -> &dyn Renderable;

    /// Registers the built-in shader groups.
    fn init_shaders(
        &self,
        registry: &ShaderRegistry,
        parameters: &ProgramParameters,
    ) -> Result<(), ShaderError>;

    /// Makes the backend current on this thread.
    fn activate(&self, token: &ScopeToken);

    /// Releases the backend from this thread.
    fn deactivate(&self, token: &ScopeToken);

    /// Scope bookkeeping owned by the backend.
    fn scope_state(&self) -> &ScopeState;

    /// Invalidates the state the context assumes after the host may have
    /// touched it. Only called in [`ContextMode::Shared`].
    fn update_assumed_state(&self, _token: &ScopeToken, context: &dyn Context) {
        context.set_dirty_state();
    }
}

/// Activates a backend for the lifetime of the guard.
///
/// Scopes nest per thread: only the outermost scope of a thread calls
/// `activate` and `deactivate`. The guard is neither `Send` nor `Sync`, so a
/// scope opened on a thread is closed on that thread.
pub struct BackendScope<'a> {
    backend: &'a dyn RendererBackend,
    token: ScopeToken,
    _not_send: PhantomData<*const ()>,
}

impl<'a> BackendScope<'a> {
    /// Opens a scope. In shared mode the outermost scope also invalidates the
    /// assumed state of `context`.
    pub fn new(backend: &'a dyn RendererBackend, context: Option<&dyn Context>) -> Self {
        let token = ScopeToken { _private: () };
        let previous = backend.scope_state().enter();
        if previous == 0 {
            log::trace!("Activating {} backend", backend.backend_type());
            backend.activate(&token);
            if backend.context_mode() == ContextMode::Shared {
                if let Some(context) = context {
                    backend.update_assumed_state(&token, context);
                }
            }
        }
        Self {
            backend,
            token,
            _not_send: PhantomData,
        }
    }

    /// Nesting depth on this thread, including this scope.
    pub fn depth(&self) -> usize {
        self.backend.scope_state().depth()
    }
}

impl Drop for BackendScope<'_> {
    fn drop(&mut self) {
        let previous = self.backend.scope_state().exit();
        debug_assert!(previous > 0, "unbalanced backend scope");
        if previous == 1 {
            log::trace!("Deactivating {} backend", self.backend.backend_type());
            self.backend.deactivate(&self.token);
        }
    }
}

/// Backend-agnostic information about a GPU adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    /// Adapter name, e.g. the GPU model.
    pub name: String,
    /// API the adapter was found through.
    pub backend_type: BackendType,
    /// Driver-reported device class (discrete, integrated, cpu...).
    pub device_type: String,
}

/// The adapter chosen by an [`AdapterSelector`].
#[derive(Debug)]
pub struct AdapterSelection<A> {
    /// The backend adapter.
    pub adapter: A,
    /// What was selected.
    pub info: AdapterInfo,
    /// Time spent selecting.
    pub selection_time_ms: u64,
    /// Every API tried, in order.
    pub attempted_backends: Vec<BackendType>,
}

/// Finds a usable adapter, trying the preferred API first.
#[async_trait]
pub trait AdapterSelector<A> {
    /// Error returned when no adapter is usable.
    type Error: Debug + Display + Send + Sync + 'static;

    /// Selects an adapter, falling back to other supported APIs when
    /// `preferred` is unavailable.
    async fn select_adapter(
        &self,
        preferred: BackendType,
    ) -> Result<AdapterSelection<A>, Self::Error>;

    /// Returns `true` if `backend` can work on this platform.
    fn is_backend_supported(&self, backend: BackendType) -> bool;
}

/// APIs to try for `preferred`, in order, without duplicates.
pub fn fallback_order(preferred: BackendType) -> Vec<BackendType> {
    let mut order = vec![preferred];
    for candidate in [
        BackendType::default(),
        BackendType::Vulkan,
        BackendType::Metal,
        BackendType::OpenGl,
        BackendType::WebGpu,
    ] {
        if !order.contains(&candidate) {
            order.push(candidate);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_order_starts_with_preferred() {
        let order = fallback_order(BackendType::OpenGl);
        assert_eq!(order[0], BackendType::OpenGl);
        assert_eq!(order.len(), 4);
        assert_eq!(order.iter().filter(|b| **b == BackendType::OpenGl).count(), 1);
    }
}
