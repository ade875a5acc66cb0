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

//! Camera state and the matrices derived from it.

use crate::gfx::types::Size;
use crate::math::Mat4;
use crate::tile::tile_id::{UnwrappedTileId, EXTENT, TILE_SIZE};
use std::f64::consts::FRAC_PI_2;

/// Default vertical field of view, `atan(0.75) * 2` radians.
pub const DEFAULT_FOV: f64 = 0.643_501_108_793_284_4;

/// The camera: viewport, zoom, center and orientation.
///
/// The center is stored in normalized Web Mercator coordinates, `(0, 0)` being
/// the north-west corner of the world and `(1, 1)` the south-east one.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformState {
    size: Size,
    zoom: f64,
    center: [f64; 2],
    bearing: f64,
    pitch: f64,
    fov: f64,
}

impl TransformState {
    /// Creates a camera looking straight down at the center of the world.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            zoom: 0.0,
            center: [0.5, 0.5],
            bearing: 0.0,
            pitch: 0.0,
            fov: DEFAULT_FOV,
        }
    }

    /// Viewport size in pixels.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Resizes the viewport.
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    /// Fractional zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Sets the zoom, clamped at `0`.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.max(0.0);
    }

    /// Integer zoom level used to pick tiles.
    pub fn integer_zoom(&self) -> u8 {
        self.zoom.floor().clamp(0.0, f64::from(u8::MAX)) as u8
    }

    /// Center in normalized Mercator coordinates.
    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    /// Sets the center in normalized Mercator coordinates.
    pub fn set_center(&mut self, x: f64, y: f64) {
        self.center = [x, y.clamp(0.0, 1.0)];
    }

    /// Bearing in radians, clockwise from north.
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    /// Sets the bearing in radians.
    pub fn set_bearing(&mut self, bearing: f64) {
        self.bearing = bearing;
    }

    /// Pitch in radians, `0` looking straight down.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Sets the pitch, clamped below 60 degrees.
    pub fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch.clamp(0.0, 60f64.to_radians());
    }

    /// Vertical field of view in radians.
    pub fn fov(&self) -> f64 {
        self.fov
    }

    /// Edge length of the whole world at the current zoom, in pixels.
    pub fn world_size(&self) -> f64 {
        f64::from(TILE_SIZE) * 2f64.powf(self.zoom)
    }

    /// Distance from the camera to the center of the map plane, in pixels.
    pub fn camera_to_center_distance(&self) -> f64 {
        0.5 * f64::from(self.size.height) / (self.fov / 2.0).tan()
    }

    /// Maps world pixels at the current zoom to clip space.
    pub fn projection_matrix(&self) -> Mat4 {
        let width = f64::from(self.size.width.max(1));
        let height = f64::from(self.size.height.max(1));
        let distance = self.camera_to_center_distance();

        // Farthest visible point of the map plane along the view direction.
        let half_fov = self.fov / 2.0;
        let ground_angle = FRAC_PI_2 + self.pitch;
        let top_half = half_fov.sin() * distance / (std::f64::consts::PI - ground_angle - half_fov).sin();
        let furthest = (FRAC_PI_2 - self.pitch).cos() * top_half + distance;
        let far = furthest * 1.01;
        let near = height / 50.0;

        let world = self.world_size();
        Mat4::perspective_rh_zo(self.fov, width / height, near, far)
            .scale(1.0, -1.0, 1.0)
            .translate(0.0, 0.0, -distance)
            .rotate_x(self.pitch)
            .rotate_z(self.bearing)
            .translate(-self.center[0] * world, -self.center[1] * world, 0.0)
    }

    /// Matrix placing tile-local coordinates (`0..EXTENT`) of `tile` on screen.
    pub fn matrix_for(&self, tile: &UnwrappedTileId) -> Mat4 {
        self.projection_matrix() * Self::tile_transform(tile, self.world_size())
    }

    /// Tile-local coordinates to world pixels for a world of `world_size` pixels.
    pub fn tile_transform(tile: &UnwrappedTileId, world_size: f64) -> Mat4 {
        let z = tile.canonical.z;
        let tiles = 2f64.powi(i32::from(z));
        let scale = world_size / tiles;
        let x = (f64::from(tile.canonical.x) + f64::from(tile.wrap) * tiles) * scale;
        let y = f64::from(tile.canonical.y) * scale;
        Mat4::from_translation(x, y, 0.0).scale(
            scale / f64::from(EXTENT),
            scale / f64::from(EXTENT),
            1.0,
        )
    }
}
