use crate::error::LoadError;
use crate::geom::translated;
use crate::ir_map::{sort_and_check_tilesets, IrMap, IrSpawn};
use crate::layer::Layer;
use crate::loader::json_loader::{decode_map_file_to_ir, layer_cell_count};
use crate::spatial::{TileCoord, TileId};
use crate::tileset::{Tile, Tileset};
use macroquad::prelude::{vec2, Rect, Vec2};
use std::path::Path;

/// A loaded map: layered tile grids, tilesets and spawn points, plus the
/// world-space query surface used by collision and occupancy.
#[derive(Debug, Clone)]
pub struct Map {
    width: usize,
    height: usize,
    tile_w: u32,
    tile_h: u32,
    layers: Vec<Layer>,
    tilesets: Vec<Tileset>, // ascending first_gid, disjoint ranges
    spawns: Vec<IrSpawn>,
}

impl Map {
    /// Load and validate a Tiled JSON map.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let ir = decode_map_file_to_ir(path.as_ref())?;
        let map = Self::from_ir(ir)?;
        log::info!(
            "[MapLoad] {}: {}x{} tiles, {} layers, {} tilesets, {} spawns",
            path.as_ref().display(),
            map.width,
            map.height,
            map.layers.len(),
            map.tilesets.len(),
            map.spawns.len()
        );
        Ok(map)
    }

    /// Validate `ir` and build the map. Tilesets are sorted by `first_gid`.
    pub fn from_ir(mut ir: IrMap) -> Result<Self, LoadError> {
        if ir.tile_w == 0 || ir.tile_h == 0 {
            return Err(LoadError::InvalidMap("tile size must be non-zero".into()));
        }
        sort_and_check_tilesets(&mut ir.tilesets)?;

        for layer in &ir.layers {
            if layer.width != ir.width || layer.height != ir.height {
                return Err(LoadError::InvalidMap(format!(
                    "Layer '{}' is {}x{} but the map is {}x{}",
                    layer.name, layer.width, layer.height, ir.width, ir.height
                )));
            }
            let expected = layer_cell_count(&layer.name, layer.width, layer.height)?;
            if layer.data.len() != expected {
                return Err(LoadError::InvalidLayerSize {
                    layer: layer.name.clone(),
                    expected,
                    found: layer.data.len(),
                });
            }
        }

        Ok(Map {
            width: ir.width,
            height: ir.height,
            tile_w: ir.tile_w,
            tile_h: ir.tile_h,
            layers: ir.layers.into_iter().map(Layer::from_ir).collect(),
            tilesets: ir.tilesets.into_iter().map(Tileset::from_ir).collect(),
            spawns: ir.spawns,
        })
    }

    /// Grid width in cells
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height in cells
    pub fn height(&self) -> usize {
        self.height
    }

    /// Tile size in pixels.
    pub fn tile_size(&self) -> Vec2 {
        vec2(self.tile_w as f32, self.tile_h as f32)
    }

    /// Map width in pixels.
    pub fn world_pixel_width(&self) -> f32 {
        (self.width as u64 * self.tile_w as u64) as f32
    }

    /// Map height in pixels.
    pub fn world_pixel_height(&self) -> f32 {
        (self.height as u64 * self.tile_h as u64) as f32
    }

    /// The whole map in world space.
    pub fn world_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.world_pixel_width(), self.world_pixel_height())
    }

    /// Layers in document order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Tilesets, ascending `first_gid`.
    pub fn tilesets(&self) -> &[Tileset] {
        &self.tilesets
    }

    /// Spawn objects in document order.
    pub fn spawns(&self) -> &[IrSpawn] {
        &self.spawns
    }

    /// Whether `p` lies on the map.
    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.world_pixel_width() && p.y < self.world_pixel_height()
    }

    /// Grid cell containing `p`, or `None` off the map.
    pub fn cell_at(&self, p: Vec2) -> Option<TileCoord> {
        if !self.contains_point(p) {
            return None;
        }
        Some(TileCoord::new(
            (p.x / self.tile_w as f32) as i32,
            (p.y / self.tile_h as f32) as i32,
        ))
    }

    /// World rectangle covered by `cell`.
    pub fn cell_rect(&self, cell: TileCoord) -> Rect {
        let (tw, th) = (self.tile_w as f32, self.tile_h as f32);
        Rect::new(cell.x as f32 * tw, cell.y as f32 * th, tw, th)
    }

    /// Tile drawn at world point `p` on `layer`.
    ///
    /// Callers bounds-check first; an off-map point is a programming error.
    pub fn tile_at(&self, p: Vec2, layer: usize) -> Option<&Tile> {
        debug_assert!(
            self.contains_point(p),
            "tile_at called with off-map point ({}, {})",
            p.x,
            p.y
        );
        let cell = self.cell_at(p)?;
        self.tile_in_cell(cell, layer)
    }

    /// Tile stored in `cell` on `layer`; `None` for empty cells.
    pub fn tile_in_cell(&self, cell: TileCoord, layer: usize) -> Option<&Tile> {
        let gid = self.layers.get(layer)?.gid_at(cell)?;
        self.resolve_tile_by_id(gid)
    }

    /// Tileset owning `gid`: the one with the greatest `first_gid <= gid`.
    pub fn tileset_for_gid(&self, gid: u32) -> Option<&Tileset> {
        let gid = TileId(gid).clean();
        if gid == 0 {
            return None;
        }
        let idx = self.tilesets.partition_point(|ts| ts.first_gid <= gid);
        self.tilesets.get(idx.checked_sub(1)?)
    }

    /// Tile for `gid`, flip flags ignored.
    pub fn resolve_tile_by_id(&self, gid: u32) -> Option<&Tile> {
        let ts = self.tileset_for_gid(gid)?;
        ts.tile(TileId(gid).clean() - ts.first_gid)
    }

    /// Tile to draw for `gid` after `elapsed` seconds of its animation.
    /// Non-animated tiles resolve to themselves.
    pub fn animated_tile(&self, gid: u32, elapsed: f32) -> Option<&Tile> {
        let ts = self.tileset_for_gid(gid)?;
        let tile = ts.tile(TileId(gid).clean() - ts.first_gid)?;
        match &tile.animation {
            Some(anim) if !anim.frames.is_empty() => {
                let frame = anim.frames[anim.clip().frame_at(elapsed)];
                ts.tile(frame.tile_id).or(Some(tile))
            }
            _ => Some(tile),
        }
    }

    /// Every in-map cell whose world rectangle strictly intersects `rect`, row-major.
    pub fn tiles_overlapping(&self, rect: Rect) -> Vec<TileCoord> {
        let xs = cell_span(rect.x, rect.w, self.tile_w as f32, self.width);
        let ys = cell_span(rect.y, rect.h, self.tile_h as f32, self.height);
        let (Some((x0, x1)), Some((y0, y1))) = (xs, ys) else {
            return Vec::new();
        };

        let mut cells = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                cells.push(TileCoord::new(x, y));
            }
        }
        cells
    }

    /// World-space collision rectangle of the tile in `cell` on `layer`.
    pub fn collision_rect(&self, cell: TileCoord, layer: usize) -> Option<Rect> {
        let tile = self.tile_in_cell(cell, layer)?;
        if !tile.has_collision() {
            return None;
        }
        let local = tile.collision?;
        let origin = self.cell_rect(cell);
        Some(translated(local, vec2(origin.x, origin.y)))
    }

    /// Collision rectangles of every layer's tile in `cells`.
    pub fn collision_rects(&self, cells: &[TileCoord]) -> Vec<Rect> {
        let mut out = Vec::new();
        for &cell in cells {
            for layer in 0..self.layers.len() {
                if let Some(r) = self.collision_rect(cell, layer) {
                    out.push(r);
                }
            }
        }
        out
    }
}

/// Inclusive range of cells along one axis strictly overlapped by `(start, start + len)`,
/// clipped to `0..count`. An empty span overlaps nothing.
fn cell_span(start: f32, len: f32, cell: f32, count: usize) -> Option<(i32, i32)> {
    if !start.is_finite() || !len.is_finite() || len <= 0.0 || count == 0 {
        return None;
    }
    let first = (start / cell).floor() as i64;
    let last = (((start + len) / cell).ceil() as i64 - 1).max(first);
    let first = first.max(0);
    let last = last.min(count as i64 - 1);
    if first > last {
        None
    } else {
        Some((first as i32, last as i32))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::ir_map::{IrLayer, IrTileMetadata, IrTileset};

    pub const OPEN: u32 = 1;
    pub const WALL: u32 = 2;

    /// 16x16 tiles; gid 1 is open floor, gid 2 a full-tile wall.
    pub fn map_from_grid(width: usize, height: usize, data: Vec<u32>) -> Map {
        Map::from_ir(IrMap {
            width,
            height,
            tile_w: 16,
            tile_h: 16,
            tilesets: vec![IrTileset {
                name: "test".into(),
                first_gid: 1,
                image: "test.png".into(),
                tile_w: 16,
                tile_h: 16,
                tilecount: 2,
                columns: 2,
                spacing: 0,
                margin: 0,
                tiles: vec![IrTileMetadata {
                    id: 1,
                    collision: Some(Rect::new(0.0, 0.0, 16.0, 16.0)),
                    animation: Vec::new(),
                }],
            }],
            layers: vec![IrLayer {
                name: "ground".into(),
                width,
                height,
                data,
            }],
            spawns: Vec::new(),
        })
        .expect("test map")
    }

    pub fn open_map(width: usize, height: usize) -> Map {
        map_from_grid(width, height, vec![OPEN; width * height])
    }

    pub fn map_with_walls(width: usize, height: usize, walls: &[(usize, usize)]) -> Map {
        let mut data = vec![OPEN; width * height];
        for &(x, y) in walls {
            data[y * width + x] = WALL;
        }
        map_from_grid(width, height, data)
    }
}
