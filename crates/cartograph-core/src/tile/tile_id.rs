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

//! Tile identifiers.
//!
//! * [`CanonicalTileId`] names a tile in the tile pyramid (`z/x/y`).
//! * [`UnwrappedTileId`] adds the world copy the tile is drawn in, so tiles can
//!   be repeated across the antimeridian.
//! * [`OverscaledTileId`] additionally records the zoom level the tile is
//!   displayed at, which may exceed the zoom of the data it contains.
//!
//! All three derive `Ord`, ordering first by zoom and then by position, which is
//! what the tile pyramid and the tile layer groups rely on.

use std::fmt;

/// Number of units along each edge of a tile's internal coordinate system.
pub const EXTENT: u32 = 8192;

/// Nominal edge length of a tile on screen, in pixels.
pub const TILE_SIZE: u32 = 512;

/// Converts a length in screen pixels into tile units for a tile at zoom level `tile_z`,
/// displayed while the map is at `zoom`.
#[inline]
pub fn pixels_to_tile_units(pixels: f64, tile_z: u8, zoom: f64) -> f64 {
    pixels * (EXTENT as f64 / (TILE_SIZE as f64 * 2f64.powf(zoom - tile_z as f64)))
}

/// A tile at a given position in the tile pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalTileId {
    /// Zoom level.
    pub z: u8,
    /// Column, in `0..2^z`.
    pub x: u32,
    /// Row, in `0..2^z`.
    pub y: u32,
}

impl CanonicalTileId {
    /// Creates a canonical id. Coordinates must lie inside the zoom level.
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        debug_assert!(z <= 32, "zoom level {z} out of range");
        debug_assert!(
            (x as u64) < (1u64 << z) && (y as u64) < (1u64 << z),
            "tile {x}/{y} out of bounds at zoom {z}"
        );
        Self { z, x, y }
    }

    /// Returns the ancestor (or first descendant) of this tile at `target_z`.
    pub fn scaled_to(&self, target_z: u8) -> Self {
        if target_z <= self.z {
            let dz = self.z - target_z;
            Self {
                z: target_z,
                x: self.x >> dz,
                y: self.y >> dz,
            }
        } else {
            let dz = target_z - self.z;
            Self {
                z: target_z,
                x: self.x << dz,
                y: self.y << dz,
            }
        }
    }

    /// Returns `true` if `parent` is an ancestor of this tile.
    pub fn is_child_of(&self, parent: &CanonicalTileId) -> bool {
        if parent.z >= self.z {
            return false;
        }
        let dz = self.z - parent.z;
        parent.x == (self.x >> dz) && parent.y == (self.y >> dz)
    }

    /// Returns the four tiles one zoom level down.
    pub fn children(&self) -> [CanonicalTileId; 4] {
        let z = self.z + 1;
        let x = self.x * 2;
        let y = self.y * 2;
        [
            Self { z, x, y },
            Self { z, x: x + 1, y },
            Self { z, x, y: y + 1 },
            Self {
                z,
                x: x + 1,
                y: y + 1,
            },
        ]
    }

    /// Converts screen pixels into this tile's units at map zoom `zoom`.
    #[inline]
    pub fn pixels_to_tile_units(&self, pixels: f64, zoom: f64) -> f64 {
        pixels_to_tile_units(pixels, self.z, zoom)
    }
}

impl fmt::Display for CanonicalTileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// A canonical tile placed in a particular copy of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnwrappedTileId {
    /// World copy index; `0` is the primary world, negative values lie to the west.
    pub wrap: i16,
    /// The tile inside that world copy.
    pub canonical: CanonicalTileId,
}

impl UnwrappedTileId {
    /// Creates an id from an unbounded column, folding it into a world copy.
    ///
    /// Rows outside the world are clamped to the first or last row.
    pub fn new(z: u8, x: i64, y: i64) -> Self {
        let tiles = 1i64 << z;
        let wrap = x.div_euclid(tiles);
        let x = x.rem_euclid(tiles);
        let y = y.clamp(0, tiles - 1);
        Self {
            wrap: wrap as i16,
            canonical: CanonicalTileId::new(z, x as u32, y as u32),
        }
    }

    /// Creates an id from a wrap and canonical tile.
    pub fn from_canonical(wrap: i16, canonical: CanonicalTileId) -> Self {
        Self { wrap, canonical }
    }

    /// Returns `true` if `parent` is an ancestor in the same world copy.
    pub fn is_child_of(&self, parent: &UnwrappedTileId) -> bool {
        self.wrap == parent.wrap && self.canonical.is_child_of(&parent.canonical)
    }

    /// Returns the ancestor (or first descendant) at `z`, in the same world copy.
    pub fn scaled_to(&self, z: u8) -> Self {
        Self {
            wrap: self.wrap,
            canonical: self.canonical.scaled_to(z),
        }
    }

    /// Returns the overscaled id for displaying this tile at `overscaled_z`.
    pub fn overscale_to(&self, overscaled_z: u8) -> OverscaledTileId {
        OverscaledTileId::new(overscaled_z, self.wrap, self.canonical)
    }

    /// Returns the four tiles one zoom level down, in the same world copy.
    pub fn children(&self) -> [UnwrappedTileId; 4] {
        self.canonical
            .children()
            .map(|canonical| Self::from_canonical(self.wrap, canonical))
    }
}

impl fmt::Display for UnwrappedTileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.canonical, self.wrap)
    }
}

/// A tile displayed at `overscaled_z`, possibly deeper than its data zoom.
///
/// This is the key of the tile cache and of per-tile drawables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverscaledTileId {
    /// Display zoom level; never less than `canonical.z`.
    pub overscaled_z: u8,
    /// World copy index.
    pub wrap: i16,
    /// The data tile.
    pub canonical: CanonicalTileId,
}

impl OverscaledTileId {
    /// Creates an overscaled id.
    pub fn new(overscaled_z: u8, wrap: i16, canonical: CanonicalTileId) -> Self {
        debug_assert!(
            overscaled_z >= canonical.z,
            "overscaled zoom {overscaled_z} below data zoom {}",
            canonical.z
        );
        Self {
            overscaled_z,
            wrap,
            canonical,
        }
    }

    /// Creates an id for a non-overscaled tile in the primary world.
    pub fn from_zxy(z: u8, x: u32, y: u32) -> Self {
        Self::new(z, 0, CanonicalTileId::new(z, x, y))
    }

    /// Returns how many times the data is magnified, `2^(overscaled_z - z)`.
    pub fn overscale_factor(&self) -> u32 {
        1 << (self.overscaled_z - self.canonical.z)
    }

    /// Returns the id displayed at `z`. Data zoom is only reduced when `z` is below it.
    pub fn scaled_to(&self, z: u8) -> Self {
        if z >= self.canonical.z {
            Self::new(z, self.wrap, self.canonical)
        } else {
            Self::new(z, self.wrap, self.canonical.scaled_to(z))
        }
    }

    /// Returns `true` if `parent` covers this tile at a lower display zoom.
    pub fn is_child_of(&self, parent: &OverscaledTileId) -> bool {
        self.wrap == parent.wrap
            && self.overscaled_z > parent.overscaled_z
            && (parent.canonical == self.canonical || self.canonical.is_child_of(&parent.canonical))
    }

    /// Drops the overscale information.
    pub fn to_unwrapped(&self) -> UnwrappedTileId {
        UnwrappedTileId::from_canonical(self.wrap, self.canonical)
    }

    /// Returns the same tile placed in another world copy.
    pub fn unwrap_to(&self, wrap: i16) -> Self {
        Self::new(self.overscaled_z, wrap, self.canonical)
    }
}

impl fmt::Display for OverscaledTileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=>{}@{}", self.overscaled_z, self.canonical, self.wrap)
    }
}
