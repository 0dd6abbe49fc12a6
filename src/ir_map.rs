//! Format-agnostic description of a map, produced by the loaders and consumed by
//! [`Map::from_ir`](crate::Map::from_ir).

use crate::error::LoadError;
use crate::spatial::GID_MASK;
use macroquad::prelude::Rect;
use std::fmt;
use std::str::FromStr;

/// Canonical, format-agnostic map.
#[derive(Debug, Clone)]
pub struct IrMap {
    /// Grid width in cells
    pub width: usize,
    /// Grid height in cells
    pub height: usize,
    /// Tile width in pixels
    pub tile_w: u32,
    /// Tile height in pixels
    pub tile_h: u32,
    /// Sorted by `first_gid` once loaded
    pub tilesets: Vec<IrTileset>,
    /// Collision and draw order is array order
    pub layers: Vec<IrLayer>,
    /// Spawn objects from every object group
    pub spawns: Vec<IrSpawn>,
}

/// One image atlas with a regular grid.
#[derive(Debug, Clone)]
pub struct IrTileset {
    /// Tileset name
    pub name: String,
    /// Gid of local tile 0
    pub first_gid: u32,
    /// Atlas image path, as written in the document
    pub image: String,
    /// Tile width in pixels
    pub tile_w: u32,
    /// Tile height in pixels
    pub tile_h: u32,
    /// Number of tiles
    pub tilecount: u32,
    /// Tiles per atlas row
    pub columns: u32,
    /// Pixels between tiles, 0 if not used
    pub spacing: u32,
    /// Pixels around the atlas border, 0 if not used
    pub margin: u32,
    /// Only tiles that carry collision or animation data
    pub tiles: Vec<IrTileMetadata>,
}

impl IrTileset {
    /// One past the last gid this tileset owns, or `None` when the range runs
    /// past the 29 id bits Tiled leaves free of flip flags.
    pub fn gid_end(&self) -> Option<u32> {
        let end = self.first_gid.checked_add(self.tilecount)?;
        (end.saturating_sub(1) <= GID_MASK).then_some(end)
    }
}

/// Collision and animation data for one tile.
#[derive(Debug, Clone)]
pub struct IrTileMetadata {
    /// Local tile id
    pub id: u32,
    /// Tile-local collision rectangle
    pub collision: Option<Rect>,
    /// Animation frames, empty if static
    pub animation: Vec<IrFrame>,
}

/// One animation frame.
#[derive(Debug, Clone, Copy)]
pub struct IrFrame {
    /// Local id shown during this frame
    pub tile_id: u32,
    /// Seconds
    pub duration: f32,
}

/// One tile layer.
#[derive(Debug, Clone)]
pub struct IrLayer {
    /// Layer name
    pub name: String,
    /// Width in cells
    pub width: usize,
    /// Height in cells
    pub height: usize,
    /// Row-major raw gids, flip flags allowed
    pub data: Vec<u32>,
}

/// Semantic type of a spawn object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnKind {
    /// `PlayerSpawn`
    Player,
    /// `SlimeSpawn`
    Slime,
}

impl FromStr for SpawnKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PlayerSpawn" => Ok(SpawnKind::Player),
            "SlimeSpawn" => Ok(SpawnKind::Slime),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SpawnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpawnKind::Player => f.write_str("PlayerSpawn"),
            SpawnKind::Slime => f.write_str("SlimeSpawn"),
        }
    }
}

/// A spawn point from an object group.
#[derive(Debug, Clone)]
pub struct IrSpawn {
    /// Tiled object id
    pub id: u32,
    /// Object name, often empty
    pub name: String,
    /// What spawns here
    pub kind: SpawnKind,
    /// Object rectangle; creatures spawn at its top-left
    pub rect: Rect,
}

/// Sorts tilesets by `first_gid` and rejects overlapping or out-of-range gid ranges.
pub(crate) fn sort_and_check_tilesets(tilesets: &mut [IrTileset]) -> Result<(), LoadError> {
    tilesets.sort_by_key(|t| t.first_gid);
    if let Some(first) = tilesets.first() {
        if first.first_gid == 0 {
            return Err(LoadError::InvalidMap(format!(
                "tileset '{}' has firstgid 0",
                first.name
            )));
        }
    }
    for ts in tilesets.iter() {
        if ts.gid_end().is_none() {
            return Err(LoadError::InvalidMap(format!(
                "tileset '{}' (firstgid {}, {} tiles) runs past the largest gid {}",
                ts.name, ts.first_gid, ts.tilecount, GID_MASK
            )));
        }
    }
    for pair in tilesets.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.gid_end().map_or(true, |end| end > b.first_gid) {
            return Err(LoadError::OverlappingTilesets {
                first: a.name.clone(),
                second: b.name.clone(),
                gid: b.first_gid,
            });
        }
    }
    Ok(())
}
