use crate::animation::AnimationClip;
use crate::creature::CreatureKind;
use crate::error::LoadError;
use macroquad::prelude::{Rect, Vec2};
use serde::Deserialize;
use std::path::Path;

/// Game-feel tuning. Every value here was picked by playtesting, not derived.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-axis speed is divided by this when moving diagonally.
    pub diagonal_divisor: f32,
    /// Direction components closer to zero than this count as no input.
    pub direction_deadzone: f32,
    /// Player tuning.
    pub player: CreatureParams,
    /// Slime tuning.
    pub slime: CreatureParams,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            diagonal_divisor: 1.5,
            direction_deadzone: 0.2,
            player: CreatureParams::player(),
            slime: CreatureParams::slime(),
        }
    }
}

impl Config {
    /// Tuning for `kind`.
    pub fn params(&self, kind: CreatureKind) -> &CreatureParams {
        match kind {
            CreatureKind::Player => &self.player,
            CreatureKind::Slime => &self.slime,
        }
    }

    /// Parse a config document. Missing top-level keys keep their defaults.
    pub fn from_json_str(txt: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(txt)
    }

    /// Read and parse a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let p = path.as_ref();
        let txt = std::fs::read_to_string(p).map_err(|source| LoadError::Io {
            path: p.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&txt).map_err(|source| LoadError::Json {
            path: p.to_path_buf(),
            source,
        })
    }
}

/// Box relative to a creature's position (top-left of its idle frame).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoxSpec {
    /// Offset from the position, x
    pub x: f32,
    /// Offset from the position, y
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl BoxSpec {
    /// Box at offset `(x, y)` of size `w` x `h`.
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        BoxSpec { x, y, w, h }
    }

    /// World-space box for a creature at `pos`.
    #[inline]
    pub fn at(&self, pos: Vec2) -> Rect {
        Rect::new(pos.x + self.x, pos.y + self.y, self.w, self.h)
    }
}

/// Uniform-speed animation clip.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ClipSpec {
    /// Frame count
    pub frames: usize,
    /// Seconds per frame
    pub frame_time: f32,
}

impl ClipSpec {
    /// `frames` frames of `frame_time` seconds each.
    pub const fn new(frames: usize, frame_time: f32) -> Self {
        ClipSpec { frames, frame_time }
    }

    /// Build the clip.
    pub fn clip(&self, looping: bool) -> AnimationClip {
        AnimationClip::uniform(self.frames, self.frame_time, looping)
    }
}

/// One clip per creature state.
#[derive(Debug, Clone, Deserialize)]
pub struct ClipSet {
    /// Idling
    pub idle: ClipSpec,
    /// Walking
    pub walk: ClipSpec,
    /// Attacking; plays once
    pub attack: ClipSpec,
    /// Dying; plays once
    pub death: ClipSpec,
}

/// Kind-specific constants fed into the shared movement/collision code.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatureParams {
    /// Starting health
    pub max_health: f32,
    /// Pixels per second when starting to walk
    pub initial_velocity: f32,
    /// Speed cap, pixels per second
    pub max_velocity: f32,
    /// Pixels per second squared
    pub acceleration: f32,
    /// Velocity lost per second while blocked
    pub friction: f32,
    /// Collision body while idling or walking
    pub body: BoxSpec,
    /// Body used while attacking, if the attack frames are framed differently
    #[serde(default)]
    pub attack_body: Option<BoxSpec>,
    /// How far the weapon box extends past the body in the facing direction
    pub attack_reach: f32,
    /// How far the weapon box extends sideways past the body
    pub attack_spread: f32,
    /// Health taken from each creature hit
    pub attack_damage: f32,
    /// Seconds the damage flash stays on
    pub damage_flash: f32,
    /// Animation clips
    pub clips: ClipSet,
    /// Chase the player within this many pixels; 0 disables chasing
    #[serde(default)]
    pub aggro_radius: f32,
    /// Seconds before a dead creature of this kind reappears at its spawn; 0 never
    #[serde(default)]
    pub respawn_delay: f32,
}

impl CreatureParams {
    /// Playtested player defaults.
    pub fn player() -> Self {
        CreatureParams {
            max_health: 100.0,
            initial_velocity: 40.0,
            max_velocity: 110.0,
            acceleration: 300.0,
            friction: 400.0,
            body: BoxSpec::new(3.0, 6.0, 10.0, 10.0),
            attack_body: Some(BoxSpec::new(4.0, 7.0, 8.0, 9.0)),
            attack_reach: 10.0,
            attack_spread: 2.0,
            attack_damage: 25.0,
            damage_flash: 0.2,
            clips: ClipSet {
                idle: ClipSpec::new(4, 0.15),
                walk: ClipSpec::new(4, 0.1),
                attack: ClipSpec::new(4, 0.08),
                death: ClipSpec::new(4, 0.12),
            },
            aggro_radius: 0.0,
            respawn_delay: 0.0,
        }
    }

    /// Playtested slime defaults.
    pub fn slime() -> Self {
        CreatureParams {
            max_health: 50.0,
            initial_velocity: 20.0,
            max_velocity: 50.0,
            acceleration: 120.0,
            friction: 200.0,
            body: BoxSpec::new(2.0, 6.0, 12.0, 10.0),
            attack_body: None,
            attack_reach: 4.0,
            attack_spread: 0.0,
            attack_damage: 10.0,
            damage_flash: 0.2,
            clips: ClipSet {
                idle: ClipSpec::new(4, 0.2),
                walk: ClipSpec::new(4, 0.15),
                attack: ClipSpec::new(3, 0.15),
                death: ClipSpec::new(5, 0.1),
            },
            aggro_radius: 96.0,
            respawn_delay: 5.0,
        }
    }
}
