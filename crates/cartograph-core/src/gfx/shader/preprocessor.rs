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

//! A line-based conditional-compilation pass for shading languages without a
//! preprocessor (WGSL).
//!
//! Supported directives: `#define NAME [VALUE]`, `#ifdef NAME`, `#ifndef NAME`,
//! `#else`, `#endif`. Valued definitions are substituted as whole identifiers in
//! active lines. Any other line starting with `#` is passed through untouched.

use super::parameters::Define;
use crate::gfx::error::ShaderError;
use std::collections::HashMap;

struct Frame {
    parent_active: bool,
    condition: bool,
    in_else: bool,
}

impl Frame {
    fn active(&self) -> bool {
        self.parent_active && (self.condition != self.in_else)
    }
}

fn fail(shader: &str, line_no: usize, msg: &str) -> ShaderError {
    ShaderError::CompilationFailed {
        shader: shader.to_string(),
        details: format!("line {line_no}: {msg}"),
    }
}

fn substitute(line: &str, values: &HashMap<String, String>) -> String {
    if values.is_empty() {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    let mut ident = String::new();
    let flush = |ident: &mut String, out: &mut String| {
        if !ident.is_empty() {
            match values.get(ident.as_str()) {
                Some(value) => out.push_str(value),
                None => out.push_str(ident),
            }
            ident.clear();
        }
    };
    for c in line.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            ident.push(c);
        } else {
            flush(&mut ident, &mut out);
            out.push(c);
        }
    }
    flush(&mut ident, &mut out);
    out
}

/// Resolves conditional blocks in `source` against `defines`.
///
/// `shader` is only used to label errors.
pub fn preprocess(shader: &str, source: &str, defines: &[Define]) -> Result<String, ShaderError> {
    let mut defined: HashMap<String, Option<String>> = defines
        .iter()
        .map(|d| (d.name.clone(), d.value.clone()))
        .collect();
    let mut values: HashMap<String, String> = defined
        .iter()
        .filter_map(|(k, v)| v.clone().map(|v| (k.clone(), v)))
        .collect();

    let mut stack: Vec<Frame> = Vec::new();
    let mut out = String::with_capacity(source.len());

    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let active = stack.last().map_or(true, Frame::active);
        let trimmed = line.trim_start();
        let mut words = trimmed.split_whitespace();

        match words.next() {
            Some("#ifdef") | Some("#ifndef") => {
                let name = words
                    .next()
                    .ok_or_else(|| fail(shader, line_no, "conditional without a name"))?;
                let is_defined = defined.contains_key(name);
                let condition = if trimmed.starts_with("#ifdef") {
                    is_defined
                } else {
                    !is_defined
                };
                stack.push(Frame {
                    parent_active: active,
                    condition,
                    in_else: false,
                });
            }
            Some("#else") => {
                let frame = stack
                    .last_mut()
                    .ok_or_else(|| fail(shader, line_no, "#else without #ifdef"))?;
                if frame.in_else {
                    return Err(fail(shader, line_no, "duplicate #else"));
                }
                frame.in_else = true;
            }
            Some("#endif") => {
                stack
                    .pop()
                    .ok_or_else(|| fail(shader, line_no, "#endif without #ifdef"))?;
            }
            Some("#define") if active => {
                let name = words
                    .next()
                    .ok_or_else(|| fail(shader, line_no, "#define without a name"))?;
                let rest: Vec<&str> = words.collect();
                let value = (!rest.is_empty()).then(|| rest.join(" "));
                if let Some(value) = &value {
                    values.insert(name.to_string(), value.clone());
                }
                defined.insert(name.to_string(), value);
            }
            _ if active => {
                out.push_str(&substitute(line, &values));
                out.push('\n');
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(fail(
            shader,
            source.lines().count(),
            "unterminated conditional block",
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\
#ifdef HAS_UNIFORM_u_color
let color = props.color;
#else
let color = in.color;
#endif
#ifndef HAS_UNIFORM_u_opacity
let opacity = in.opacity;
#endif
let ratio = DEVICE_PIXEL_RATIO;";

    #[test]
    fn test_selects_uniform_branch() {
        let out = preprocess(
            "fill",
            SOURCE,
            &[
                Define::flag("HAS_UNIFORM_u_color"),
                Define {
                    name: "DEVICE_PIXEL_RATIO".to_string(),
                    value: Some("2.0".to_string()),
                },
            ],
        )
        .expect("valid source");
        assert_eq!(
            out,
            "let color = props.color;\nlet opacity = in.opacity;\nlet ratio = 2.0;\n"
        );
    }

    #[test]
    fn test_selects_attribute_branch() {
        let out = preprocess("fill", SOURCE, &[Define::flag("HAS_UNIFORM_u_opacity")])
            .expect("valid source");
        assert_eq!(
            out,
            "let color = in.color;\nlet ratio = DEVICE_PIXEL_RATIO;\n"
        );
    }

    #[test]
    fn test_nested_blocks_inherit_inactive_parent() {
        let src = "#ifdef A\n#ifndef B\ninner\n#endif\n#endif\nouter";
        assert_eq!(preprocess("t", src, &[]).unwrap(), "outer\n");
        assert_eq!(
            preprocess("t", src, &[Define::flag("A")]).unwrap(),
            "inner\nouter\n"
        );
    }

    #[test]
    fn test_in_source_define() {
        let src = "#define WIDTH 4\n#ifdef WIDTH\nlet w = WIDTH;\n#endif";
        assert_eq!(preprocess("t", src, &[]).unwrap(), "let w = 4;\n");
    }

    #[test]
    fn test_unbalanced_blocks_fail() {
        assert!(preprocess("t", "#ifdef A\nx", &[]).is_err());
        assert!(preprocess("t", "#endif", &[]).is_err());
        assert!(preprocess("t", "#else", &[]).is_err());
    }
}
