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


//! WGSL sources of the built-in shader groups.

use cartograph_core::gfx::shader::ProgramSource;
use cartograph_core::gfx::types::AttributeDataType;
use cartograph_core::renderer::{
    DRAWABLE_INTERPOLATE_UBO, DRAWABLE_UBO, EVALUATED_PROPS_UBO, GLOBAL_PAINT_PARAMS_UBO,
};

/// Name of the polygon fill shader group.
pub const FILL_SHADER: &str = "FillShader";
/// Name of the line shader group.
pub const LINE_SHADER: &str = "LineShader";

const FILL_VERTEX: &str = include_str!("shaders/fill.vertex.wgsl");
const FILL_FRAGMENT: &str = include_str!("shaders/fill.fragment.wgsl");
const LINE_VERTEX: &str = include_str!("shaders/line.vertex.wgsl");
const LINE_FRAGMENT: &str = include_str!("shaders/line.fragment.wgsl");

/// Solid polygon fill. `color` and `opacity` may become uniforms.
pub fn fill_source() -> ProgramSource {
    ProgramSource::new(FILL_SHADER, FILL_VERTEX, FILL_FRAGMENT)
        .with_attribute("a_pos", 0, AttributeDataType::Short2)
        .with_attribute("a_color", 1, AttributeDataType::Float4)
        .with_attribute("a_opacity", 2, AttributeDataType::Float2)
        .with_uniform_property("color")
        .with_uniform_property("opacity")
        .with_uniform_block("GlobalPaintParamsUBO", GLOBAL_PAINT_PARAMS_UBO)
        .with_uniform_block("FillDrawableUBO", DRAWABLE_UBO)
        .with_uniform_block("FillInterpolateUBO", DRAWABLE_INTERPOLATE_UBO)
        .with_uniform_block("FillEvaluatedPropsUBO", EVALUATED_PROPS_UBO)
}

/// Antialiased line with gap width and offset.
pub fn line_source() -> ProgramSource {
    ProgramSource::new(LINE_SHADER, LINE_VERTEX, LINE_FRAGMENT)
        .with_attribute("a_pos_normal", 0, AttributeDataType::Short2)
        .with_attribute("a_data", 1, AttributeDataType::UByte4)
        .with_attribute("a_color", 2, AttributeDataType::Float4)
        .with_attribute("a_blur", 3, AttributeDataType::Float2)
        .with_attribute("a_opacity", 4, AttributeDataType::Float2)
        .with_attribute("a_gapwidth", 5, AttributeDataType::Float2)
        .with_attribute("a_offset", 6, AttributeDataType::Float2)
        .with_attribute("a_width", 7, AttributeDataType::Float2)
        .with_uniform_property("blur")
        .with_uniform_property("color")
        .with_uniform_property("gapwidth")
        .with_uniform_property("offset")
        .with_uniform_property("opacity")
        .with_uniform_property("width")
        .with_uniform_block("GlobalPaintParamsUBO", GLOBAL_PAINT_PARAMS_UBO)
        .with_uniform_block("LineDrawableUBO", DRAWABLE_UBO)
        .with_uniform_block("LineInterpolateUBO", DRAWABLE_INTERPOLATE_UBO)
        .with_uniform_block("LineEvaluatedPropsUBO", EVALUATED_PROPS_UBO)
}

/// Every built-in source, registered by the backend at startup.
pub fn builtin_sources() -> Vec<ProgramSource> {
    vec![fill_source(), line_source()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartograph_core::gfx::shader::{preprocess, Define, ProgramParameters};

    #[test]
    fn test_builtin_sources_preprocess_in_every_variant() {
        let params = ProgramParameters::new(2.0, true);
        for source in builtin_sources() {
            for promoted in [false, true] {
                let mut defines = params.defines();
                if promoted {
                    defines.extend(
                        source
                            .uniform_properties
                            .iter()
                            .map(|p| Define::flag(format!("HAS_UNIFORM_u_{p}"))),
                    );
                }
                let vertex = preprocess(&source.name, &source.vertex, &defines).unwrap();
                let fragment = preprocess(&source.name, &source.fragment, &defines).unwrap();
                assert!(vertex.contains("fn vs_main"));
                assert!(fragment.contains("fn fs_main"));
                assert!(!vertex.contains('#'));
                assert!(!fragment.contains("DEVICE_PIXEL_RATIO"));
            }
        }
    }

    #[test]
    fn test_uniform_branch_drops_vertex_input() {
        let source = fill_source();
        let defines = vec![Define::flag("HAS_UNIFORM_u_color")];
        let vertex = preprocess(&source.name, &source.vertex, &defines).unwrap();
        assert!(!vertex.contains("@location(1) color"));
        assert!(vertex.contains("out.color = props.color;"));
    }

    #[test]
    fn test_attribute_locations_are_unique() {
        for source in builtin_sources() {
            let mut locations: Vec<u32> = source.attributes.iter().map(|a| a.index).collect();
            locations.sort_unstable();
            locations.dedup();
            assert_eq!(locations.len(), source.attributes.len(), "{}", source.name);
            assert_eq!(source.attributes[0].index, 0);
        }
    }
}
