use crate::animation::Animator;
use crate::collision::{reject_out_of_bounds, resolve_dynamic, resolve_static};
use crate::config::{Config, CreatureParams};
use crate::geom::{axis_signs, has_nan};
use crate::ir_map::SpawnKind;
use crate::map::Map;
use crate::spatial::SpatialOccupancy;
use crate::world::CreatureId;
use macroquad::prelude::{Rect, Vec2};

/// Every kind of creature the game knows. Behaviour differences live in [`CreatureParams`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatureKind {
    /// Controlled by input.
    Player,
    /// Enemy; chases the player when it has an aggro radius.
    Slime,
}

impl From<SpawnKind> for CreatureKind {
    fn from(kind: SpawnKind) -> Self {
        match kind {
            SpawnKind::Player => CreatureKind::Player,
            SpawnKind::Slime => CreatureKind::Slime,
        }
    }
}

/// Movement and action state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatureState {
    /// Standing still.
    Idling,
    /// Moving towards the held direction.
    Walking,
    /// Heavy action: move and attack requests are refused until the clip ends.
    Attacking,
    /// Terminal.
    Dead,
}

/// Cardinal direction a creature looks and swings in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Towards negative y.
    Up,
    /// Towards positive y.
    Down,
    /// Towards negative x.
    Left,
    /// Towards positive x.
    Right,
}

impl Facing {
    /// Nearest cardinal direction; horizontal wins when both axes are non-zero.
    pub fn from_direction(dir: Vec2) -> Option<Facing> {
        if has_nan(dir) {
            None
        } else if dir.x > 0.0 {
            Some(Facing::Right)
        } else if dir.x < 0.0 {
            Some(Facing::Left)
        } else if dir.y > 0.0 {
            Some(Facing::Down)
        } else if dir.y < 0.0 {
            Some(Facing::Up)
        } else {
            None
        }
    }
}

/// What the rest of the game needs from anything that can be hit.
pub trait Body {
    /// Collision box in world space.
    fn bounding_box(&self) -> Rect;
    /// Weapon reach while an attack is in progress.
    fn attack_box(&self) -> Option<Rect>;
    /// Take `amount` damage.
    fn on_damage(&mut self, amount: f32);
}

/// Everything a creature reads from the world while it moves.
pub struct MoveContext<'a> {
    /// Static geometry.
    pub map: &'a Map,
    /// Which creatures sit on which tiles.
    pub occupancy: &'a SpatialOccupancy,
    /// The creature being moved; skipped when checking others.
    pub self_id: CreatureId,
    /// Bounding boxes of the other creatures that still collide.
    pub bodies: &'a dyn Fn(CreatureId) -> Option<Rect>,
}

/// A player or enemy: position, movement state, health and animation.
#[derive(Debug, Clone)]
pub struct Creature {
    kind: CreatureKind,
    params: CreatureParams,
    diagonal_divisor: f32,
    deadzone: f32,
    position: Vec2,
    state: CreatureState,
    facing: Facing,
    desired: Vec2,
    velocity: f32,
    health: f32,
    flash: f32,
    animator: Animator,
    hit_this_cycle: Vec<CreatureId>,
}

impl Creature {
    /// Fresh idle creature of `kind` at `position`, facing down, at full health.
    pub fn new(kind: CreatureKind, config: &Config, position: Vec2) -> Self {
        let params = config.params(kind).clone();
        Creature {
            kind,
            diagonal_divisor: config.diagonal_divisor.max(1.0),
            deadzone: config.direction_deadzone,
            position,
            state: CreatureState::Idling,
            facing: Facing::Down,
            desired: Vec2::ZERO,
            velocity: params.initial_velocity,
            health: params.max_health,
            flash: 0.0,
            animator: Animator::new(params.clips.idle.clip(true)),
            hit_this_cycle: Vec::new(),
            params,
        }
    }

    /// Which kind this is.
    pub fn kind(&self) -> CreatureKind {
        self.kind
    }

    /// Tuning this creature was built with.
    pub fn params(&self) -> &CreatureParams {
        &self.params
    }

    /// Current state.
    pub fn state(&self) -> CreatureState {
        self.state
    }

    /// Current facing.
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Top-left of the sprite frame, in world pixels.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Current speed in pixels per second.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Remaining health, never below zero.
    pub fn health(&self) -> f32 {
        self.health
    }

    /// True once health has run out.
    pub fn is_dead(&self) -> bool {
        self.state == CreatureState::Dead
    }

    /// Dead and done playing the death clip; ready to be removed.
    pub fn is_finished(&self) -> bool {
        self.is_dead() && !self.animator.is_playing()
    }

    /// True while the damage flash is showing.
    pub fn is_flashing(&self) -> bool {
        self.flash > 0.0
    }

    /// True while an attack clip is playing.
    pub fn is_attacking(&self) -> bool {
        self.state == CreatureState::Attacking && self.animator.is_playing()
    }

    /// Frame of the current clip.
    pub fn animation_frame(&self) -> usize {
        self.animator.frame()
    }

    /// Increments every time a clip restarts. Renderers use it to reset sprites.
    pub fn animation_cycle(&self) -> u32 {
        self.animator.cycle()
    }

    /// Collision box for the current state, in world space.
    pub fn bounding_box(&self) -> Rect {
        let spec = match (self.state, self.params.attack_body) {
            (CreatureState::Attacking, Some(spec)) => spec,
            _ => self.params.body,
        };
        spec.at(self.position)
    }

    /// Weapon reach if this creature swung now while facing `facing`.
    pub fn weapon_box(&self, facing: Facing) -> Rect {
        let b = self.bounding_box();
        let reach = self.params.attack_reach;
        let spread = self.params.attack_spread;
        match facing {
            Facing::Right => Rect::new(b.x + b.w, b.y - spread, reach, b.h + 2.0 * spread),
            Facing::Left => Rect::new(b.x - reach, b.y - spread, reach, b.h + 2.0 * spread),
            Facing::Down => Rect::new(b.x - spread, b.y + b.h, b.w + 2.0 * spread, reach),
            Facing::Up => Rect::new(b.x - spread, b.y - reach, b.w + 2.0 * spread, reach),
        }
    }

    /// Weapon box while an attack is playing.
    pub fn attack_box(&self) -> Option<Rect> {
        self.is_attacking().then(|| self.weapon_box(self.facing))
    }

    /// Ask to walk towards `direction` (zero stops). Refused while dead or mid-attack.
    pub fn request_move(&mut self, direction: Vec2) -> bool {
        if self.is_dead() || self.is_attacking() {
            return false;
        }
        if has_nan(direction) {
            log::trace!("[Creature] {:?} ignoring NaN move direction", self.kind);
            self.desired = Vec2::ZERO;
            if self.state != CreatureState::Idling {
                self.enter_idle();
            }
            return false;
        }

        self.desired = axis_signs(direction, self.deadzone);
        if self.desired == Vec2::ZERO {
            if self.state != CreatureState::Idling {
                self.enter_idle();
            }
        } else {
            if let Some(facing) = Facing::from_direction(self.desired) {
                self.facing = facing;
            }
            if self.state != CreatureState::Walking {
                self.state = CreatureState::Walking;
                self.animator.play(&self.params.clips.walk.clip(true));
            }
        }
        true
    }

    /// Start a fresh attack, facing `direction` if it has one.
    pub fn request_attack(&mut self, direction: Vec2) -> bool {
        if self.is_dead() || self.is_attacking() {
            return false;
        }
        if let Some(facing) = Facing::from_direction(axis_signs(direction, self.deadzone)) {
            self.facing = facing;
        }
        self.state = CreatureState::Attacking;
        self.animator.play(&self.params.clips.attack.clip(false));
        self.hit_this_cycle.clear();
        true
    }

    /// Lose `amount` health and start the flash. Dead creatures and non-positive amounts are ignored.
    pub fn apply_damage(&mut self, amount: f32) {
        if self.is_dead() || !(amount > 0.0) {
            return;
        }
        self.health -= amount;
        self.flash = self.params.damage_flash;
        if self.health <= 0.0 {
            self.health = 0.0;
            self.die();
        }
    }

    /// Record `victim` as hit by the current attack. False if it already was.
    pub fn register_hit(&mut self, victim: CreatureId) -> bool {
        if self.hit_this_cycle.contains(&victim) {
            return false;
        }
        self.hit_this_cycle.push(victim);
        true
    }

    /// Advance timers and animation by `dt` seconds, then walk if walking.
    pub fn update(&mut self, ctx: &MoveContext<'_>, dt: f32) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.flash = (self.flash - dt).max(0.0);
        self.animator.advance(dt);

        match self.state {
            CreatureState::Dead => return,
            CreatureState::Attacking if self.animator.is_playing() => return,
            CreatureState::Attacking => {
                if self.desired == Vec2::ZERO {
                    self.enter_idle();
                } else {
                    self.state = CreatureState::Walking;
                    self.animator.play(&self.params.clips.walk.clip(true));
                }
            }
            _ => {}
        }

        if self.state == CreatureState::Walking {
            self.walk(ctx, dt);
        }
    }

    fn walk(&mut self, ctx: &MoveContext<'_>, dt: f32) {
        self.velocity = (self.velocity + self.params.acceleration * dt).min(self.params.max_velocity);

        let mut delta = self.desired * self.velocity * dt;
        if self.desired.x != 0.0 && self.desired.y != 0.0 {
            delta /= self.diagonal_divisor;
        }

        let current = self.bounding_box();
        let allowed = reject_out_of_bounds(ctx.map, current, delta);
        let allowed = resolve_static(ctx.map, current, allowed);
        let allowed = resolve_dynamic(
            ctx.map,
            ctx.occupancy,
            ctx.self_id,
            current,
            allowed,
            ctx.bodies,
        );

        if allowed != delta {
            self.velocity = (self.velocity - self.params.friction * dt).max(self.params.initial_velocity);
        }
        self.position += allowed;
    }

    fn enter_idle(&mut self) {
        self.state = CreatureState::Idling;
        self.desired = Vec2::ZERO;
        self.velocity = self.params.initial_velocity;
        self.animator.play(&self.params.clips.idle.clip(true));
    }

    fn die(&mut self) {
        log::debug!("[Creature] {:?} died", self.kind);
        self.state = CreatureState::Dead;
        self.desired = Vec2::ZERO;
        self.velocity = 0.0;
        self.animator.play(&self.params.clips.death.clip(false));
    }
}

impl Body for Creature {
    fn bounding_box(&self) -> Rect {
        Creature::bounding_box(self)
    }

    fn attack_box(&self) -> Option<Rect> {
        Creature::attack_box(self)
    }

    fn on_damage(&mut self, amount: f32) {
        self.apply_damage(amount)
    }
}
