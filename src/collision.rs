//! Axis-separated sliding collision.
//!
//! Static tiles are checked by sampling the two leading corners of the moved box,
//! which is cheap enough to run for every creature every frame. It misses
//! obstacles that only touch the middle of an edge (a thin column between the
//! corners); authored collision tiles are full or near-full, so that gap never
//! shows up in practice. Creatures are checked against a 1-pixel slice on the
//! leading edge instead, so being overlapped from behind never blocks moving on.

use crate::geom::{has_nan, intersects, leading_edge, translated};
use crate::map::Map;
use crate::spatial::SpatialOccupancy;
use crate::world::CreatureId;
use macroquad::prelude::{vec2, Rect, Vec2};

/// Zero each axis of `delta` that would push `current` out across a map edge.
///
/// Only the edge being moved towards is checked, so a box that already hangs
/// over one side can still move back onto the map.
pub fn reject_out_of_bounds(map: &Map, current: Rect, delta: Vec2) -> Vec2 {
    let (w, h) = (map.world_pixel_width(), map.world_pixel_height());
    let mut out = delta;

    let moved = translated(current, vec2(delta.x, 0.0));
    if (delta.x < 0.0 && moved.x < 0.0) || (delta.x > 0.0 && moved.x + moved.w > w) {
        out.x = 0.0;
    }
    let moved = translated(current, vec2(0.0, delta.y));
    if (delta.y < 0.0 && moved.y < 0.0) || (delta.y > 0.0 && moved.y + moved.h > h) {
        out.y = 0.0;
    }
    out
}

/// Adjust `delta` against static tile collision using corner sampling.
///
/// Each axis is tested with the box moved along that axis alone, so a diagonal
/// move into a wall keeps sliding along it.
pub fn resolve_static(map: &Map, current: Rect, delta: Vec2) -> Vec2 {
    if has_nan(delta) {
        log::trace!("[Collision] dropping NaN displacement");
        return Vec2::ZERO;
    }
    if delta == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let mut out = delta;
    if delta.x != 0.0 {
        let moved = translated(current, vec2(delta.x, 0.0));
        let edge = if delta.x > 0.0 { moved.x + moved.w } else { moved.x };
        if corners_blocked(map, &moved, [vec2(edge, moved.y), vec2(edge, moved.y + moved.h)]) {
            out.x = 0.0;
        }
    }
    if delta.y != 0.0 {
        let moved = translated(current, vec2(0.0, delta.y));
        let edge = if delta.y > 0.0 { moved.y + moved.h } else { moved.y };
        if corners_blocked(map, &moved, [vec2(moved.x, edge), vec2(moved.x + moved.w, edge)]) {
            out.y = 0.0;
        }
    }
    out
}

fn corners_blocked(map: &Map, moved: &Rect, corners: [Vec2; 2]) -> bool {
    corners
        .iter()
        .filter(|p| map.contains_point(**p))
        .filter_map(|p| map.cell_at(*p))
        .any(|cell| {
            (0..map.layers().len())
                .filter_map(|layer| map.collision_rect(cell, layer))
                .any(|r| intersects(&r, moved))
        })
}

/// Adjust `delta` against other creatures and the collision rects of every tile
/// the moved box covers, looking only at the leading-edge slice.
///
/// `bodies` maps a creature to its current bounding box; `None` means it does
/// not collide (removed, dead or the mover itself).
pub fn resolve_dynamic<F>(
    map: &Map,
    occupancy: &SpatialOccupancy,
    self_id: CreatureId,
    current: Rect,
    delta: Vec2,
    bodies: F,
) -> Vec2
where
    F: Fn(CreatureId) -> Option<Rect>,
{
    if has_nan(delta) {
        log::trace!("[Collision] dropping NaN displacement");
        return Vec2::ZERO;
    }
    if delta == Vec2::ZERO {
        return Vec2::ZERO;
    }

    let mut out = delta;
    if delta.x != 0.0 && leading_blocked(map, occupancy, self_id, current, vec2(delta.x, 0.0), &bodies) {
        out.x = 0.0;
    }
    if delta.y != 0.0 && leading_blocked(map, occupancy, self_id, current, vec2(0.0, delta.y), &bodies) {
        out.y = 0.0;
    }
    out
}

fn leading_blocked<F>(
    map: &Map,
    occupancy: &SpatialOccupancy,
    self_id: CreatureId,
    current: Rect,
    step: Vec2,
    bodies: &F,
) -> bool
where
    F: Fn(CreatureId) -> Option<Rect>,
{
    let moved = translated(current, step);
    let Some(slice) = leading_edge(moved, step) else {
        return false;
    };
    let tiles = map.tiles_overlapping(moved);

    let creatures = occupancy
        .query_tiles(&tiles)
        .into_iter()
        .filter(|id| *id != self_id)
        .filter_map(|id| bodies(id));

    creatures
        .chain(map.collision_rects(&tiles))
        .any(|r| intersects(&r, &slice))
}
