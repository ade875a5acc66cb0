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

//! Defines the `Mat4` type and associated operations.

use std::ops::Mul;

/// A 4x4 column-major matrix of `f64`.
///
/// Element `(row, col)` lives at `m[col * 4 + row]`, matching the layout the
/// shaders expect once narrowed with [`Mat4::to_f32_array`].
///
/// The in-place builders (`translate`, `scale`, `rotate_x`, `rotate_z`) post-multiply,
/// so a chain reads in the order the transforms are applied to the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat4 {
    /// The sixteen elements in column-major order.
    pub m: [f64; 16],
}

impl Mat4 {
    /// The 4x4 identity matrix.
    pub const IDENTITY: Self = Self {
        m: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Returns element at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.m[col * 4 + row]
    }

    /// Creates a translation matrix.
    #[inline]
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        let mut out = Self::IDENTITY;
        out.m[12] = x;
        out.m[13] = y;
        out.m[14] = z;
        out
    }

    /// Creates a non-uniform scaling matrix.
    #[inline]
    pub fn from_scale(x: f64, y: f64, z: f64) -> Self {
        let mut out = Self::IDENTITY;
        out.m[0] = x;
        out.m[5] = y;
        out.m[10] = z;
        out
    }

    /// Creates a matrix for a rotation around the X-axis.
    ///
    /// # Arguments
    ///
    /// * `angle`: The angle of rotation in radians.
    #[inline]
    pub fn from_rotation_x(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut out = Self::IDENTITY;
        out.m[5] = c;
        out.m[6] = s;
        out.m[9] = -s;
        out.m[10] = c;
        out
    }

    /// Creates a matrix for a rotation around the Z-axis.
    #[inline]
    pub fn from_rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut out = Self::IDENTITY;
        out.m[0] = c;
        out.m[1] = s;
        out.m[4] = -s;
        out.m[5] = c;
        out
    }

    /// Creates a right-handed perspective projection with a `[0, 1]` depth range.
    ///
    /// * `fov_y`: Vertical field of view in radians.
    /// * `aspect`: Width divided by height of the viewport.
    /// * `near`, `far`: Clip plane distances, `0 < near < far`.
    pub fn perspective_rh_zo(fov_y: f64, aspect: f64, near: f64, far: f64) -> Self {
        debug_assert!(near > 0.0 && far > near);
        let f = 1.0 / (fov_y / 2.0).tan();
        let mut out = Self { m: [0.0; 16] };
        out.m[0] = f / aspect;
        out.m[5] = f;
        out.m[10] = far / (near - far);
        out.m[11] = -1.0;
        out.m[14] = (near * far) / (near - far);
        out
    }

    /// Post-multiplies by a translation.
    #[inline]
    pub fn translate(self, x: f64, y: f64, z: f64) -> Self {
        self * Self::from_translation(x, y, z)
    }

    /// Post-multiplies by a scale.
    #[inline]
    pub fn scale(self, x: f64, y: f64, z: f64) -> Self {
        self * Self::from_scale(x, y, z)
    }

    /// Post-multiplies by a rotation around X.
    #[inline]
    pub fn rotate_x(self, angle: f64) -> Self {
        self * Self::from_rotation_x(angle)
    }

    /// Post-multiplies by a rotation around Z.
    #[inline]
    pub fn rotate_z(self, angle: f64) -> Self {
        self * Self::from_rotation_z(angle)
    }

    /// Transforms the point `(x, y, z, w)`.
    pub fn transform(&self, v: [f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = (0..4).map(|col| self.get(row, col) * v[col]).sum();
        }
        out
    }

    /// Narrows the matrix for upload into a uniform buffer.
    pub fn to_f32_array(&self) -> [f32; 16] {
        let mut out = [0.0f32; 16];
        for (dst, src) in out.iter_mut().zip(self.m.iter()) {
            *dst = *src as f32;
        }
        out
    }
}

impl Default for Mat4 {
    /// Returns the 4x4 identity matrix.
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Mat4> for Mat4 {
    type Output = Self;
    /// Multiplies this matrix by another `Mat4`. Note that matrix multiplication is not commutative.
    fn mul(self, rhs: Mat4) -> Self::Output {
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                out[col * 4 + row] = (0..4).map(|k| self.get(row, k) * rhs.get(k, col)).sum();
            }
        }
        Mat4 { m: out }
    }
}

// --- Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn assert_point_eq(a: [f64; 4], b: [f64; 4]) {
        for i in 0..4 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn test_identity_is_neutral() {
        let t = Mat4::from_translation(3.0, -2.0, 1.0);
        assert_eq!(t * Mat4::IDENTITY, t);
        assert_eq!(Mat4::IDENTITY * t, t);
    }

    #[test]
    fn test_translate_then_scale_applies_scale_first() {
        // Post-multiplication: the point is scaled, then translated.
        let m = Mat4::IDENTITY.translate(10.0, 20.0, 0.0).scale(2.0, 2.0, 1.0);
        assert_point_eq(m.transform([1.0, 1.0, 0.0, 1.0]), [12.0, 22.0, 0.0, 1.0]);
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let m = Mat4::from_rotation_z(FRAC_PI_2);
        assert_point_eq(m.transform([1.0, 0.0, 0.0, 1.0]), [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_perspective_maps_near_plane_to_zero_depth() {
        let p = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 1.0, 100.0);
        let clip = p.transform([0.0, 0.0, -1.0, 1.0]);
        assert_relative_eq!(clip[2] / clip[3], 0.0, epsilon = 1e-9);
        let clip = p.transform([0.0, 0.0, -100.0, 1.0]);
        assert_relative_eq!(clip[2] / clip[3], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_to_f32_array_preserves_layout() {
        let m = Mat4::from_translation(1.5, 2.5, 3.5);
        let f = m.to_f32_array();
        assert_eq!(&f[12..15], &[1.5, 2.5, 3.5]);
        assert_eq!(f[15], 1.0);
    }
}
