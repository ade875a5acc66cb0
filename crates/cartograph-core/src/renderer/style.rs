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

//! Evaluated paint properties handed over by style evaluation.
//!
//! Only the parts the tweakers consume are modelled. A property is either a
//! constant for the whole layer, in which case it can become a uniform, or it
//! varies per feature and stays a vertex attribute.

use std::collections::BTreeSet;

/// A straight-alpha RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a color.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Components multiplied by alpha, as shaders expect them.
    pub fn premultiplied(&self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Whether a translation is relative to the map or to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranslateAnchor {
    /// Rotates with the map.
    #[default]
    Map,
    /// Stays aligned with the screen.
    Viewport,
}

/// A paint property after zoom evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum PossiblyEvaluated<T> {
    /// One value for the whole layer.
    Constant(T),
    /// Varies per feature; the value is the style default used as a fallback.
    PerFeature(T),
}

impl<T: Clone> PossiblyEvaluated<T> {
    /// Returns the layer-wide value, if there is one.
    pub fn constant(&self) -> Option<&T> {
        match self {
            PossiblyEvaluated::Constant(v) => Some(v),
            PossiblyEvaluated::PerFeature(_) => None,
        }
    }

    /// Returns `true` for a layer-wide value.
    pub fn is_constant(&self) -> bool {
        matches!(self, PossiblyEvaluated::Constant(_))
    }

    /// The constant, or the fallback for per-feature values.
    pub fn constant_or_default(&self) -> T {
        match self {
            PossiblyEvaluated::Constant(v) | PossiblyEvaluated::PerFeature(v) => v.clone(),
        }
    }
}

fn collect_constants<'a>(entries: impl IntoIterator<Item = (&'a str, bool)>) -> BTreeSet<String> {
    entries
        .into_iter()
        .filter(|(_, constant)| *constant)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Evaluated paint of a fill layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FillPaintProperties {
    /// Whether edges are smoothed by an outline pass.
    pub antialias: bool,
    /// Opacity in `0..=1`.
    pub opacity: PossiblyEvaluated<f32>,
    /// Fill color.
    pub color: PossiblyEvaluated<Color>,
    /// Color of the antialiasing outline.
    pub outline_color: PossiblyEvaluated<Color>,
    /// Offset in pixels.
    pub translate: [f32; 2],
    /// Frame `translate` is expressed in.
    pub translate_anchor: TranslateAnchor,
}

impl Default for FillPaintProperties {
    fn default() -> Self {
        Self {
            antialias: true,
            opacity: PossiblyEvaluated::Constant(1.0),
            color: PossiblyEvaluated::Constant(Color::BLACK),
            outline_color: PossiblyEvaluated::Constant(Color::BLACK),
            translate: [0.0, 0.0],
            translate_anchor: TranslateAnchor::Map,
        }
    }
}

impl FillPaintProperties {
    /// Names of the properties that can be bound as uniforms this frame.
    pub fn properties_as_uniforms(&self) -> BTreeSet<String> {
        collect_constants([
            ("color", self.color.is_constant()),
            ("opacity", self.opacity.is_constant()),
            ("outline_color", self.outline_color.is_constant()),
        ])
    }
}

/// Evaluated paint of a line layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LinePaintProperties {
    /// Opacity in `0..=1`.
    pub opacity: PossiblyEvaluated<f32>,
    /// Stroke color.
    pub color: PossiblyEvaluated<Color>,
    /// Stroke width in pixels.
    pub width: PossiblyEvaluated<f32>,
    /// Width of the gap between the two strokes of a casing, `0` for a single stroke.
    pub gap_width: PossiblyEvaluated<f32>,
    /// Perpendicular offset in pixels.
    pub offset: PossiblyEvaluated<f32>,
    /// Blur in pixels.
    pub blur: PossiblyEvaluated<f32>,
    /// Offset in pixels.
    pub translate: [f32; 2],
    /// Frame `translate` is expressed in.
    pub translate_anchor: TranslateAnchor,
}

impl Default for LinePaintProperties {
    fn default() -> Self {
        Self {
            opacity: PossiblyEvaluated::Constant(1.0),
            color: PossiblyEvaluated::Constant(Color::BLACK),
            width: PossiblyEvaluated::Constant(1.0),
            gap_width: PossiblyEvaluated::Constant(0.0),
            offset: PossiblyEvaluated::Constant(0.0),
            blur: PossiblyEvaluated::Constant(0.0),
            translate: [0.0, 0.0],
            translate_anchor: TranslateAnchor::Map,
        }
    }
}

impl LinePaintProperties {
    /// Names of the properties that can be bound as uniforms this frame.
    pub fn properties_as_uniforms(&self) -> BTreeSet<String> {
        collect_constants([
            ("blur", self.blur.is_constant()),
            ("color", self.color.is_constant()),
            ("gapwidth", self.gap_width.is_constant()),
            ("offset", self.offset.is_constant()),
            ("opacity", self.opacity.is_constant()),
            ("width", self.width.is_constant()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_constants_become_uniforms() {
        let props = FillPaintProperties {
            color: PossiblyEvaluated::PerFeature(Color::BLACK),
            ..Default::default()
        };
        let uniforms = props.properties_as_uniforms();
        assert!(!uniforms.contains("color"));
        assert!(uniforms.contains("opacity"));
        assert!(uniforms.contains("outline_color"));
    }

    #[test]
    fn test_premultiplied_color() {
        let c = Color::new(1.0, 0.5, 0.0, 0.5);
        assert_eq!(c.premultiplied(), [0.5, 0.25, 0.0, 0.5]);
    }
}
