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

mod common;

use cartograph_core::gfx::shader::{ProgramParameters, ShaderGroup, ShaderRegistry};
use cartograph_core::gfx::{BackendScope, Context, ContextMode, RendererBackend, ShaderError};
use common::{fill_source, MockBackend, MockContext, MockProgram};
use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn fill_group() -> Arc<ShaderGroup> {
    Arc::new(ShaderGroup::new(fill_source(), ProgramParameters::new(2.0, false)))
}

fn props(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_register_rejects_duplicate_names() {
    let registry = ShaderRegistry::new();
    let first = fill_group();
    assert!(registry.register_shader_group(first.clone()));
    assert!(!registry.register_shader_group(fill_group()));

    let stored = registry.get_shader_group("FillShader").expect("registered");
    assert!(Arc::ptr_eq(&stored, &first));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_replace_requires_existing_group() {
    let registry = ShaderRegistry::new();
    assert!(!registry.replace_shader_group(fill_group()));
    assert!(registry.is_empty());

    registry.register_shader_group(fill_group());
    let replacement = fill_group();
    assert!(registry.replace_shader_group(replacement.clone()));
    let stored = registry.get_shader_group("FillShader").expect("registered");
    assert!(Arc::ptr_eq(&stored, &replacement));
}

#[test]
fn test_unknown_group_is_absent() {
    let registry = ShaderRegistry::new();
    assert!(registry.get_shader_group("LineShader").is_none());
    assert!(!registry.is_registered("LineShader"));
}

#[test]
fn test_variants_are_compiled_once() {
    let context = MockContext::new();
    let group = fill_group();
    let set = props(&["color"]);

    let a = group.get_or_create_shader(&context, &set, "a_pos").expect("compiles");
    let b = group.get_or_create_shader(&context, &set, "a_pos").expect("cached");
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(context.programs_created.load(Ordering::SeqCst), 1);

    let c = group
        .get_or_create_shader(&context, &props(&["color", "opacity"]), "a_pos")
        .expect("compiles");
    assert!(!Arc::ptr_eq(&a, &c));
    assert_ne!(a.name(), c.name());
    assert_eq!(group.len(), 2);
}

#[test]
fn test_promoted_properties_become_defines() {
    let context = MockContext::new();
    let group = fill_group();
    let program = group
        .get_or_create_shader(&context, &props(&["opacity"]), "a_pos")
        .expect("compiles");
    let mock = program.as_any().downcast_ref::<MockProgram>().expect("mock program");

    let names: Vec<&str> = mock.defines.iter().map(|d| d.name.as_str()).collect();
    assert!(names.contains(&"HAS_UNIFORM_u_opacity"));
    assert!(!names.contains(&"HAS_UNIFORM_u_color"));
    assert!(names.contains(&"DEVICE_PIXEL_RATIO"));

    assert!(program.vertex_attributes().get("a_opacity").is_none());
    assert!(program.vertex_attributes().get("a_color").is_some());
    assert!(mock.name.starts_with("FillShader#"));
}

#[test]
fn test_compilation_failure_is_not_cached() {
    let context = MockContext::new();
    let group = fill_group();
    context.fail_compilation.store(true, Ordering::SeqCst);
    let result = group.get_or_create_shader(&context, &BTreeSet::new(), "a_pos");
    assert!(matches!(result, Err(ShaderError::CompilationFailed { .. })));
    assert!(group.is_empty());

    context.fail_compilation.store(false, Ordering::SeqCst);
    assert!(group.get_or_create_shader(&context, &BTreeSet::new(), "a_pos").is_ok());
    assert_eq!(group.len(), 1);
}

#[test]
fn test_missing_first_attribute_fails() {
    let context = MockContext::new();
    let group = fill_group();
    let result = group.get_or_create_shader(&context, &BTreeSet::new(), "a_extrude");
    assert!(matches!(
        result,
        Err(ShaderError::MissingAttribute { attribute, .. }) if attribute == "a_extrude"
    ));
    assert_eq!(context.programs_created.load(Ordering::SeqCst), 0);
}

#[test]
fn test_register_and_replace_variants() {
    let context = MockContext::new();
    let group = fill_group();
    let key = group.program_key(&BTreeSet::new()).expect("key");
    let first = group.get_or_create_shader(&context, &BTreeSet::new(), "a_pos").expect("compiles");

    assert!(!group.register_shader(key, first.clone()));
    let other = group
        .get_or_create_shader(&context, &props(&["color"]), "a_pos")
        .expect("compiles");
    assert!(group.replace_shader(key, other.clone()));
    let stored = group.get_shader(&key).expect("cached");
    assert!(Arc::ptr_eq(&stored, &other));
}

#[test]
fn test_generic_shader_and_backend_init() {
    let backend = MockBackend::new(ContextMode::Unique);
    let registry = ShaderRegistry::new();
    let context = backend.create_context().expect("context");
    {
        let _scope = BackendScope::new(&backend, Some(context.as_ref()));
        backend
            .init_shaders(&registry, &ProgramParameters::default())
            .expect("shaders");
    }
    assert!(registry.is_registered("FillShader"));

    let generic = context
        .get_generic_shader(&registry, "FillShader")
        .expect("generic variant");
    assert!(generic.vertex_attributes().get("a_color").is_some());
    assert!(matches!(
        context.get_generic_shader(&registry, "CircleShader"),
        Err(ShaderError::UnknownShader(name)) if name == "CircleShader"
    ));
}
