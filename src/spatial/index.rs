use crate::map::Map;
use crate::world::CreatureId;
use macroquad::prelude::Rect;
use std::collections::HashMap;

/// A raw gid as stored in a layer: the id in the low 29 bits, flip flags above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId(pub u32);

/// Horizontal flip flag, bit 31
pub const FLIP_H: u32 = 0x8000_0000;
/// Vertical flip flag, bit 30
pub const FLIP_V: u32 = 0x4000_0000;
/// Diagonal (anti-diagonal transpose) flip flag, bit 29
pub const FLIP_D: u32 = 0x2000_0000;
/// Low 29 bits: the gid itself. Also the largest gid a map can use.
pub const GID_MASK: u32 = 0x1FFF_FFFF;

impl TileId {
    /// Value including flags.
    #[inline] pub fn raw(self) -> u32 { self.0 }
    /// Gid with the flags masked off.
    #[inline] pub fn clean(self) -> u32 { self.0 & GID_MASK }
    /// Flipped horizontally.
    #[inline] pub fn flip_h(self) -> bool { (self.0 & FLIP_H) != 0 }
    /// Flipped vertically.
    #[inline] pub fn flip_v(self) -> bool { (self.0 & FLIP_V) != 0 }
    /// Flipped along the diagonal.
    #[inline] pub fn flip_d(self) -> bool { (self.0 & FLIP_D) != 0 }
}

/// Integer grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl TileCoord {
    /// Cell at column `x`, row `y`.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        TileCoord { x, y }
    }
}

/// Which creatures overlap which map tiles.
///
/// Invariant: for every indexed creature, the set of tiles listing it equals
/// `map.tiles_overlapping(box)` for the box it was last indexed with. Tiles with
/// no occupants are pruned.
#[derive(Debug, Default)]
pub struct SpatialOccupancy {
    tiles: HashMap<TileCoord, Vec<CreatureId>>,
    // reverse index, so removal never depends on a box recomputed later
    by_creature: HashMap<CreatureId, Vec<TileCoord>>,
}

impl SpatialOccupancy {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a newly spawned creature.
    pub fn insert(&mut self, map: &Map, id: CreatureId, bounding_box: Rect) {
        self.reindex(map, id, bounding_box);
    }

    /// Drop every entry for `id`, then add it to the tiles `bounding_box` overlaps.
    /// Idempotent; calling it with an unchanged box is a no-op.
    pub fn reindex(&mut self, map: &Map, id: CreatureId, bounding_box: Rect) {
        let new_tiles = map.tiles_overlapping(bounding_box);
        if self.by_creature.get(&id) == Some(&new_tiles) {
            return;
        }
        self.remove(id);
        for &tile in &new_tiles {
            let occupants = self.tiles.entry(tile).or_default();
            if !occupants.contains(&id) {
                occupants.push(id);
            }
        }
        if !new_tiles.is_empty() {
            self.by_creature.insert(id, new_tiles);
        }
    }

    /// Forget `id` entirely.
    pub fn remove(&mut self, id: CreatureId) {
        let Some(old_tiles) = self.by_creature.remove(&id) else {
            return;
        };
        for tile in old_tiles {
            if let Some(occupants) = self.tiles.get_mut(&tile) {
                occupants.retain(|o| *o != id);
                if occupants.is_empty() {
                    self.tiles.remove(&tile);
                }
            }
        }
    }

    /// Creatures listed under `tile`.
    pub fn occupants(&self, tile: TileCoord) -> &[CreatureId] {
        self.tiles.get(&tile).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tiles `id` is currently listed under, row-major.
    pub fn tiles_of(&self, id: CreatureId) -> &[TileCoord] {
        self.by_creature.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Union of occupants across `tiles`, each creature once, in first-seen order.
    pub fn query_tiles(&self, tiles: &[TileCoord]) -> Vec<CreatureId> {
        let mut out: Vec<CreatureId> = Vec::new();
        for tile in tiles {
            for id in self.occupants(*tile) {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
        }
        out
    }

    /// Number of non-empty tiles.
    pub fn occupied_tiles(&self) -> usize {
        self.tiles.len()
    }

    /// True when no tile has an occupant.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::test_support::open_map;
    use crate::world::CreatureId;

    fn id(index: u32) -> CreatureId {
        CreatureId::from_raw_parts(index, 0)
    }

    fn keys_containing(occ: &SpatialOccupancy, who: CreatureId) -> Vec<TileCoord> {
        let mut keys: Vec<TileCoord> = occ
            .tiles
            .iter()
            .filter(|(_, v)| v.contains(&who))
            .map(|(k, _)| *k)
            .collect();
        keys.sort_by_key(|c| (c.y, c.x));
        keys
    }

    #[test]
    fn tile_id_masks_flip_flags() {
        let id = TileId(5 | FLIP_H | FLIP_D);
        assert_eq!(id.clean(), 5);
        assert!(id.flip_h() && id.flip_d() && !id.flip_v());
    }

    #[test]
    fn reindex_keeps_keys_equal_to_overlap_set() {
        let map = open_map(8, 8);
        let mut occ = SpatialOccupancy::new();
        let a = id(0);

        let boxes = [
            Rect::new(4.0, 4.0, 8.0, 8.0),
            Rect::new(12.0, 12.0, 10.0, 10.0),
            Rect::new(16.0, 16.0, 16.0, 16.0),
            Rect::new(40.0, 3.0, 30.0, 2.0),
        ];
        for b in boxes {
            occ.reindex(&map, a, b);
            assert_eq!(keys_containing(&occ, a), map.tiles_overlapping(b));
            assert_eq!(occ.tiles_of(a), map.tiles_overlapping(b).as_slice());
        }
    }

    #[test]
    fn empty_tiles_are_pruned_and_no_duplicates_kept() {
        let map = open_map(8, 8);
        let mut occ = SpatialOccupancy::new();
        let (a, b) = (id(0), id(1));

        occ.insert(&map, a, Rect::new(0.0, 0.0, 20.0, 8.0));
        occ.insert(&map, b, Rect::new(18.0, 0.0, 4.0, 4.0));
        occ.insert(&map, a, Rect::new(0.0, 0.0, 20.0, 8.0));
        assert_eq!(occ.occupants(TileCoord::new(1, 0)), &[a, b]);
        assert_eq!(occ.occupied_tiles(), 2);

        occ.reindex(&map, a, Rect::new(64.0, 64.0, 8.0, 8.0));
        assert!(occ.occupants(TileCoord::new(0, 0)).is_empty());
        assert_eq!(occ.occupants(TileCoord::new(1, 0)), &[b]);
        assert_eq!(occ.occupied_tiles(), 2);

        occ.remove(a);
        occ.remove(b);
        assert!(occ.is_empty());
    }

    #[test]
    fn query_tiles_deduplicates_by_creature() {
        let map = open_map(8, 8);
        let mut occ = SpatialOccupancy::new();
        let (a, b) = (id(0), id(1));
        occ.insert(&map, a, Rect::new(8.0, 8.0, 16.0, 16.0));
        occ.insert(&map, b, Rect::new(20.0, 8.0, 4.0, 4.0));

        let tiles = map.tiles_overlapping(Rect::new(0.0, 0.0, 32.0, 32.0));
        assert_eq!(occ.query_tiles(&tiles), vec![a, b]);
    }
}
