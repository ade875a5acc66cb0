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

//! A shelf-based 2D bin packer with reference-counted bins.
//!
//! Rectangles are placed left to right on horizontal shelves. A new rectangle
//! goes on the shortest shelf that is tall and wide enough, otherwise a new shelf
//! is opened below the last one. Freed bins keep their place and are reused for
//! rectangles that fit in them.

use super::types::{Rect, Size};
use std::collections::HashMap;

/// A packed rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bin {
    /// Caller-visible identifier.
    pub id: u32,
    /// Occupied area.
    pub rect: Rect,
    /// Width of the slot the bin occupies.
    pub max_w: u32,
    /// Height of the slot the bin occupies.
    pub max_h: u32,
    /// Number of holders.
    pub refcount: u32,
}

#[derive(Debug, Clone, Copy)]
struct Shelf {
    y: u32,
    x: u32,
    h: u32,
    free: u32,
}

impl Shelf {
    fn alloc(&mut self, w: u32, h: u32) -> Option<Rect> {
        if w > self.free || h > self.h {
            return None;
        }
        let rect = Rect::new(self.x, self.y, w, h);
        self.x += w;
        self.free -= w;
        Some(rect)
    }
}

/// Packs rectangles into a fixed-size area.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    size: Size,
    shelves: Vec<Shelf>,
    bins: HashMap<u32, Bin>,
    free_bins: Vec<Bin>,
    max_id: u32,
}

impl ShelfPacker {
    /// Creates an empty packer for an area of `size`.
    pub fn new(size: Size) -> Self {
        Self {
            size,
            shelves: Vec::new(),
            bins: HashMap::new(),
            free_bins: Vec::new(),
            max_id: 0,
        }
    }

    /// Packed area.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Reserves a `w` x `h` rectangle.
    ///
    /// When `id` names a live bin, that bin's refcount is incremented and it is
    /// returned unchanged. Otherwise a freed bin or a shelf slot is used, and the
    /// new bin gets `id` or the next free identifier. Returns `None` when the
    /// rectangle does not fit.
    pub fn pack_one(&mut self, w: u32, h: u32, id: Option<u32>) -> Option<Bin> {
        if let Some(id) = id {
            if let Some(bin) = self.bins.get_mut(&id) {
                bin.refcount += 1;
                return Some(*bin);
            }
        }
        if w == 0 || h == 0 {
            return None;
        }

        let (rect, max_w, max_h) = self
            .take_free_bin(w, h)
            .or_else(|| self.alloc_on_shelf(w, h))?;

        let id = match id {
            Some(id) => {
                self.max_id = self.max_id.max(id);
                id
            }
            None => {
                self.max_id += 1;
                self.max_id
            }
        };
        let bin = Bin {
            id,
            rect,
            max_w,
            max_h,
            refcount: 1,
        };
        self.bins.insert(id, bin);
        Some(bin)
    }

    fn take_free_bin(&mut self, w: u32, h: u32) -> Option<(Rect, u32, u32)> {
        let wanted = u64::from(w) * u64::from(h);
        let best = self
            .free_bins
            .iter()
            .enumerate()
            .filter(|(_, b)| w <= b.max_w && h <= b.max_h)
            .min_by_key(|(_, b)| u64::from(b.max_w) * u64::from(b.max_h) - wanted)
            .map(|(i, _)| i)?;
        let bin = self.free_bins.swap_remove(best);
        Some((
            Rect::new(bin.rect.x, bin.rect.y, w, h),
            bin.max_w,
            bin.max_h,
        ))
    }

    fn alloc_on_shelf(&mut self, w: u32, h: u32) -> Option<(Rect, u32, u32)> {
        let best = self
            .shelves
            .iter()
            .enumerate()
            .filter(|(_, s)| h <= s.h && w <= s.free)
            .min_by_key(|(_, s)| s.h - h)
            .map(|(i, _)| i);
        if let Some(i) = best {
            let shelf = &mut self.shelves[i];
            return shelf.alloc(w, h).map(|rect| (rect, w, shelf.h));
        }

        let y = self.shelves.last().map_or(0, |s| s.y + s.h);
        if w > self.size.width || y + h > self.size.height {
            return None;
        }
        let mut shelf = Shelf {
            y,
            x: 0,
            h,
            free: self.size.width,
        };
        let rect = shelf.alloc(w, h)?;
        self.shelves.push(shelf);
        Some((rect, w, h))
    }

    /// Decrements the refcount of a live bin and frees it at zero.
    ///
    /// Returns the remaining count, `Some(0)` when the bin was freed, or `None`
    /// when `id` is not live.
    pub fn unref(&mut self, id: u32) -> Option<u32> {
        let bin = self.bins.get_mut(&id)?;
        debug_assert!(bin.refcount > 0);
        bin.refcount -= 1;
        let remaining = bin.refcount;
        if remaining == 0 {
            if let Some(bin) = self.bins.remove(&id) {
                self.free_bins.push(bin);
            }
        }
        Some(remaining)
    }

    /// Returns a live bin.
    pub fn get_bin(&self, id: u32) -> Option<&Bin> {
        self.bins.get(&id)
    }

    /// Refcount of a live bin, zero otherwise.
    pub fn ref_count(&self, id: u32) -> u32 {
        self.bins.get(&id).map_or(0, |b| b.refcount)
    }

    /// Number of live bins.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Returns `true` when no bin is live.
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Forgets every bin and shelf.
    pub fn clear(&mut self) {
        self.shelves.clear();
        self.bins.clear();
        self.free_bins.clear();
        self.max_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packs_left_to_right_then_new_shelf() {
        let mut packer = ShelfPacker::new(Size::new(20, 20));
        let a = packer.pack_one(10, 10, None).unwrap();
        let b = packer.pack_one(10, 10, None).unwrap();
        let c = packer.pack_one(10, 10, None).unwrap();
        assert_eq!(a.rect, Rect::new(0, 0, 10, 10));
        assert_eq!(b.rect, Rect::new(10, 0, 10, 10));
        assert_eq!(c.rect, Rect::new(0, 10, 10, 10));
        assert!(packer.pack_one(10, 11, None).is_none());
    }

    #[test]
    fn test_prefers_shortest_fitting_shelf() {
        let mut packer = ShelfPacker::new(Size::new(100, 100));
        packer.pack_one(90, 30, None).unwrap();
        // Too wide for the 10 pixels left on the first shelf.
        packer.pack_one(20, 10, None).unwrap();
        // Fits both shelves; the 10-high shelf wastes less.
        let bin = packer.pack_one(10, 8, None).unwrap();
        assert_eq!(bin.rect.y, 30);
    }

    #[test]
    fn test_same_id_is_refcounted() {
        let mut packer = ShelfPacker::new(Size::new(50, 50));
        let first = packer.pack_one(10, 10, Some(7)).unwrap();
        let second = packer.pack_one(10, 10, Some(7)).unwrap();
        assert_eq!(first.rect, second.rect);
        assert_eq!(packer.ref_count(7), 2);
        assert_eq!(packer.unref(7), Some(1));
        assert!(packer.get_bin(7).is_some());
        assert_eq!(packer.unref(7), Some(0));
        assert!(packer.get_bin(7).is_none());
        assert_eq!(packer.unref(7), None);
    }

    #[test]
    fn test_freed_bin_is_reused() {
        let mut packer = ShelfPacker::new(Size::new(10, 10));
        let bin = packer.pack_one(10, 10, None).unwrap();
        assert!(packer.pack_one(10, 10, None).is_none());
        packer.unref(bin.id);
        let reused = packer.pack_one(8, 8, None).unwrap();
        assert_eq!(reused.rect, Rect::new(0, 0, 8, 8));
        assert_ne!(reused.id, bin.id);
    }
}
