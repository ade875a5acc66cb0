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

//! Render targets.

use super::types::Size;
use std::any::Any;
use std::fmt::Debug;

/// Something a render pass can draw into: the default surface of a backend or
/// an offscreen target.
pub trait Renderable: Send + Sync + Debug {
    /// Current size in physical pixels.
    fn size(&self) -> Size;

    /// Resizes the target. Takes effect at the next acquired frame.
    fn resize(&self, size: Size);

    /// Allows the owning backend to recover its concrete type.
    fn as_any(&self) -> &dyn Any;
}
