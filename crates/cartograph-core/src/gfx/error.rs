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

//! Defines the hierarchy of error types for the graphics layer.
//!
//! Shader and adapter failures are fatal setup errors. Atlas exhaustion is not an
//! error at all (it is reported as `None`). Device loss and out-of-memory
//! conditions travel up as [`RenderError`] and are handled at the frame boundary.

use std::fmt;

/// An error related to compiling or specializing a shader program.
#[derive(Debug)]
pub enum ShaderError {
    /// The backend rejected the program source.
    CompilationFailed {
        /// Specialized program name (`<shader>#<hash>`).
        shader: String,
        /// Messages reported by the shader compiler.
        details: String,
    },
    /// No shader group is registered under this name.
    UnknownShader(String),
    /// The program source is missing a stage the backend requires.
    MissingSource {
        /// The shader being compiled.
        shader: String,
        /// The missing stage, e.g. `"fragment"`.
        stage: &'static str,
    },
    /// The attribute expected at location zero is not declared by the program.
    MissingAttribute {
        /// The shader being compiled.
        shader: String,
        /// The attribute name that was not found.
        attribute: String,
    },
    /// More properties are eligible for uniform promotion than the program key can encode.
    TooManyUniformProperties {
        /// The shader being described.
        shader: String,
        /// Number of properties declared.
        count: usize,
    },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationFailed { shader, details } => {
                write!(f, "Shader compilation failed for '{shader}': {details}")
            }
            ShaderError::UnknownShader(name) => write!(f, "Unknown shader '{name}'"),
            ShaderError::MissingSource { shader, stage } => {
                write!(f, "Shader '{shader}' has no {stage} source")
            }
            ShaderError::MissingAttribute { shader, attribute } => {
                write!(f, "Shader '{shader}' does not declare attribute '{attribute}'")
            }
            ShaderError::TooManyUniformProperties { shader, count } => {
                write!(
                    f,
                    "Shader '{shader}' declares {count} uniform-eligible properties (max 64)"
                )
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// An error related to the creation, update or destruction of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// A generic error reported by the backend.
    BackendError(String),
    /// The requested resource could not be found.
    NotFound,
    /// A texture or buffer was given a zero or oversized extent.
    InvalidSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The resource was used before `create()`.
    NotCreated(String),
    /// New contents do not match a fixed-size resource.
    SizeMismatch {
        /// Size of the existing resource, in bytes.
        expected: usize,
        /// Size of the data supplied, in bytes.
        actual: usize,
    },
    /// The GPU ran out of memory while allocating.
    OutOfMemory,
    /// A batch of images does not fit even in the largest allowed atlas.
    AtlasFull {
        /// Width of the largest atlas tried.
        width: u32,
        /// Height of the largest atlas tried.
        height: u32,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::BackendError(msg) => write!(f, "Backend error: {msg}"),
            ResourceError::NotFound => write!(f, "Resource not found"),
            ResourceError::InvalidSize { width, height } => {
                write!(f, "Invalid resource size {width}x{height}")
            }
            ResourceError::NotCreated(what) => write!(f, "{what} used before creation"),
            ResourceError::SizeMismatch { expected, actual } => write!(
                f,
                "Size mismatch: resource holds {expected} bytes, got {actual}"
            ),
            ResourceError::OutOfMemory => write!(f, "Out of GPU memory"),
            ResourceError::AtlasFull { width, height } => {
                write!(f, "Images do not fit in a {width}x{height} atlas")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A high-level error raised while setting up the renderer or producing a frame.
#[derive(Debug)]
pub enum RenderError {
    /// No adapter or device could be created.
    InitializationFailed(String),
    /// The device was lost; the frame is dropped and the next one retried.
    DeviceLost(String),
    /// The GPU ran out of memory during the frame.
    OutOfMemory,
    /// The presentation surface could not provide a frame.
    SurfaceAcquisitionFailed(String),
    /// A resource operation failed.
    Resource(ResourceError),
    /// A shader could not be specialized or compiled.
    Shader(ShaderError),
}

impl RenderError {
    /// Returns `true` for errors the frame loop drops and retries on the next tick.
    pub fn is_frame_recoverable(&self) -> bool {
        matches!(
            self,
            RenderError::DeviceLost(_)
                | RenderError::OutOfMemory
                | RenderError::SurfaceAcquisitionFailed(_)
                | RenderError::Resource(ResourceError::OutOfMemory)
        )
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Renderer initialization failed: {msg}")
            }
            RenderError::DeviceLost(msg) => write!(f, "Graphics device lost: {msg}"),
            RenderError::OutOfMemory => write!(f, "Out of GPU memory"),
            RenderError::SurfaceAcquisitionFailed(msg) => {
                write!(f, "Failed to acquire surface frame: {msg}")
            }
            RenderError::Resource(e) => write!(f, "Resource error: {e}"),
            RenderError::Shader(e) => write!(f, "Shader error: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Resource(e) => Some(e),
            RenderError::Shader(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(e: ResourceError) -> Self {
        RenderError::Resource(e)
    }
}

impl From<ShaderError> for RenderError {
    fn from(e: ShaderError) -> Self {
        RenderError::Shader(e)
    }
}
