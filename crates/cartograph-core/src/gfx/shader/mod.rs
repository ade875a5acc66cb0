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

//! Shader sources, their specialization, and the registry that owns them.

pub mod group;
pub mod parameters;
pub mod preprocessor;
pub mod program;
pub mod registry;

pub use group::{ProgramKey, ShaderGroup};
pub use parameters::{Define, ProgramParameters};
pub use preprocessor::preprocess;
pub use program::{
    default_vertex_attributes, AttributeInfo, ProgramSource, ShaderProgram, UniformBlockInfo,
};
pub use registry::ShaderRegistry;
