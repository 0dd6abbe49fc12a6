//! Rectangle helpers with strict (open-interval) overlap semantics.
//!
//! `macroquad::Rect::overlaps` treats touching edges as overlapping, which would
//! make a creature standing flush against a wall count as inside it.

use macroquad::prelude::{vec2, Rect, Vec2};

/// True when the interiors of `a` and `b` intersect. Shared edges do not count.
#[inline]
pub fn intersects(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && b.x < a.x + a.w && a.y < b.y + b.h && b.y < a.y + a.h
}

/// `r` moved by `delta`.
#[inline]
pub fn translated(r: Rect, delta: Vec2) -> Rect {
    Rect::new(r.x + delta.x, r.y + delta.y, r.w, r.h)
}

/// The 1-pixel slice of `r` on the side it is travelling towards.
///
/// `dir` is read per axis; only the sign matters. Returns `None` for a zero direction.
pub fn leading_edge(r: Rect, dir: Vec2) -> Option<Rect> {
    if dir.x > 0.0 {
        Some(Rect::new(r.x + r.w - 1.0, r.y, 1.0, r.h))
    } else if dir.x < 0.0 {
        Some(Rect::new(r.x, r.y, 1.0, r.h))
    } else if dir.y > 0.0 {
        Some(Rect::new(r.x, r.y + r.h - 1.0, r.w, 1.0))
    } else if dir.y < 0.0 {
        Some(Rect::new(r.x, r.y, r.w, 1.0))
    } else {
        None
    }
}

/// Collapses each component to -1, 0 or 1. Components with magnitude below
/// `deadzone` become 0.
pub fn axis_signs(v: Vec2, deadzone: f32) -> Vec2 {
    let sign = |c: f32| {
        if c > deadzone {
            1.0
        } else if c < -deadzone {
            -1.0
        } else {
            0.0
        }
    };
    vec2(sign(v.x), sign(v.y))
}

/// Center point of `r`.
#[inline]
pub fn center(r: &Rect) -> Vec2 {
    vec2(r.x + r.w * 0.5, r.y + r.h * 0.5)
}

/// True if either component is NaN.
#[inline]
pub fn has_nan(v: Vec2) -> bool {
    v.x.is_nan() || v.y.is_nan()
}
