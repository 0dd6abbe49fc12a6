use crate::animation::AnimationClip;
use crate::ir_map::IrTileset;
use macroquad::prelude::Rect;

/// One frame of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    /// Local id (within the same tileset) of the tile shown for this frame
    pub tile_id: u32,
    /// Seconds
    pub duration: f32,
}

/// Frames a tile cycles through.
#[derive(Debug, Clone, PartialEq)]
pub struct TileAnimation {
    /// Frames in play order
    pub frames: Vec<AnimationFrame>,
    /// Whether playback wraps
    pub looping: bool,
}

impl TileAnimation {
    /// Timeline for these frames.
    pub fn clip(&self) -> AnimationClip {
        AnimationClip::new(
            self.frames.iter().map(|f| f.duration).collect(),
            self.looping,
        )
    }
}

/// Immutable per-tile geometry and identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Global id
    pub gid: u32,
    /// Id within its tileset
    pub local_id: u32,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Tile-local. May poke slightly outside the tile (negative offsets) as authored.
    pub collision: Option<Rect>,
    /// Animation, if any
    pub animation: Option<TileAnimation>,
}

impl Tile {
    /// True when the tile has a non-empty collision rectangle.
    pub fn has_collision(&self) -> bool {
        self.collision.map_or(false, |r| r.w > 0.0 && r.h > 0.0)
    }
}

/// A tileset with every tile materialized, indexed by local id.
#[derive(Debug, Clone)]
pub struct Tileset {
    /// Tileset name
    pub name: String,
    /// Gid of local tile 0
    pub first_gid: u32,
    /// Tiles per atlas row
    pub columns: u32,
    /// Tile width in pixels
    pub tile_w: u32,
    /// Tile height in pixels
    pub tile_h: u32,
    /// Pixels between tiles in the atlas
    pub spacing: u32,
    /// Pixels around the atlas border
    pub margin: u32,
    /// Atlas image path
    pub image: String,
    tiles: Vec<Tile>,
}

impl Tileset {
    /// Build every tile and attach its metadata. A gid range that does not fit yields no tiles.
    pub fn from_ir(ir: IrTileset) -> Self {
        let tilecount = if ir.gid_end().is_some() {
            ir.tilecount
        } else {
            log::warn!(
                "[MapLoad] tileset '{}' gid range starting at {} is out of bounds, dropping its tiles",
                ir.name,
                ir.first_gid
            );
            0
        };
        let mut tiles: Vec<Tile> = (0..tilecount)
            .map(|local_id| Tile {
                gid: ir.first_gid + local_id,
                local_id,
                width: ir.tile_w,
                height: ir.tile_h,
                collision: None,
                animation: None,
            })
            .collect();

        for meta in ir.tiles {
            let Some(tile) = tiles.get_mut(meta.id as usize) else {
                log::warn!(
                    "[MapLoad] tileset '{}' has metadata for tile {} beyond tilecount {}",
                    ir.name,
                    meta.id,
                    ir.tilecount
                );
                continue;
            };
            tile.collision = meta.collision;
            if !meta.animation.is_empty() {
                tile.animation = Some(TileAnimation {
                    frames: meta
                        .animation
                        .iter()
                        .map(|f| AnimationFrame {
                            tile_id: f.tile_id,
                            duration: f.duration,
                        })
                        .collect(),
                    looping: true,
                });
            }
        }

        Tileset {
            name: ir.name,
            first_gid: ir.first_gid,
            columns: ir.columns,
            tile_w: ir.tile_w,
            tile_h: ir.tile_h,
            spacing: ir.spacing,
            margin: ir.margin,
            image: ir.image,
            tiles,
        }
    }

    /// Number of tiles.
    pub fn tile_count(&self) -> u32 {
        self.tiles.len() as u32
    }

    /// Last gid owned by this tileset (inclusive).
    pub fn last_gid(&self) -> u32 {
        self.first_gid
            .saturating_add(self.tile_count())
            .saturating_sub(1)
    }

    /// All tiles, by local id.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile with local id `local_id`.
    #[inline]
    pub fn tile(&self, local_id: u32) -> Option<&Tile> {
        self.tiles.get(local_id as usize)
    }

    /// Source rectangle of `local_id` inside the tileset image.
    pub fn atlas_rect(&self, local_id: u32) -> Rect {
        let cols = self.columns.max(1);
        let col = local_id % cols;
        let row = local_id / cols;
        let sx = self.margin + col * (self.tile_w + self.spacing);
        let sy = self.margin + row * (self.tile_h + self.spacing);
        Rect::new(sx as f32, sy as f32, self.tile_w as f32, self.tile_h as f32)
    }
}
