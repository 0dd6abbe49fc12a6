#![warn(missing_docs)]

//! Tile maps, creatures and sliding collision for a small top-down action game.
//!
//! Maps load from Tiled JSON into a [`Map`]; a [`World`] owns the creatures that
//! walk on it and steps them one fixed tick at a time.

mod animation;
mod collision;
mod config;
mod creature;
mod error;
mod geom;
mod ir_map;
mod layer;
mod loader {
    pub mod json_loader;
}
mod map;
mod spatial;
mod tileset;
mod world;

pub use animation::{AnimationClip, Animator};
pub use collision::{reject_out_of_bounds, resolve_dynamic, resolve_static};
pub use config::{BoxSpec, ClipSet, ClipSpec, Config, CreatureParams};
pub use creature::{Body, Creature, CreatureKind, CreatureState, Facing, MoveContext};
pub use error::LoadError;
pub use geom::{intersects, leading_edge};
pub use ir_map::{IrFrame, IrLayer, IrMap, IrSpawn, IrTileMetadata, IrTileset, SpawnKind};
pub use layer::Layer;
pub use loader::json_loader::{decode_map_file_to_ir, decode_map_str, decode_tileset_file};
pub use map::Map;
pub use spatial::{SpatialOccupancy, TileCoord, TileId, FLIP_D, FLIP_H, FLIP_V, GID_MASK};
pub use tileset::{AnimationFrame, Tile, TileAnimation, Tileset};
pub use world::{CreatureId, World};
