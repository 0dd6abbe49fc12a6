use crate::config::Config;
use crate::creature::{Body, Creature, CreatureKind, CreatureState, Facing, MoveContext};
use crate::geom::{axis_signs, center, intersects};
use crate::map::Map;
use crate::spatial::SpatialOccupancy;
use anyhow::Context;
use macroquad::prelude::{vec2, Rect, Vec2};
use std::path::Path;

/// Stable handle to a creature. A slot reused after despawn gets a new
/// generation, so stale ids never alias the new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatureId {
    index: u32,
    generation: u32,
}

impl CreatureId {
    /// Rebuild an id from its parts.
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        CreatureId { index, generation }
    }

    /// Slot index.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Slot generation this id was issued for.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

struct Slot {
    generation: u32,
    alive: bool,
    home: Vec2,
    // None while the creature is being updated
    creature: Option<Creature>,
}

#[derive(Debug, Clone, Copy)]
struct SpawnTimer {
    kind: CreatureKind,
    position: Vec2,
    remaining: f32,
}

fn live_creature(slots: &[Slot], id: CreatureId) -> Option<&Creature> {
    slots
        .get(id.index as usize)
        .filter(|s| s.alive && s.generation == id.generation)
        .and_then(|s| s.creature.as_ref())
}

/// Owns the map, every creature and the occupancy index, and steps them one tick at a time.
///
/// Creatures update in spawn order. Spawns and removals triggered during a tick
/// are queued and applied once every creature has been updated.
pub struct World {
    map: Map,
    config: Config,
    occupancy: SpatialOccupancy,
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<CreatureId>,
    player: Option<CreatureId>,
    pending_spawns: Vec<(CreatureKind, Vec2)>,
    pending_despawns: Vec<CreatureId>,
    respawns: Vec<SpawnTimer>,
    elapsed: f32,
}

impl World {
    /// Empty world on `map`.
    pub fn new(map: Map, config: Config) -> Self {
        World {
            map,
            config,
            occupancy: SpatialOccupancy::new(),
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            player: None,
            pending_spawns: Vec::new(),
            pending_despawns: Vec::new(),
            respawns: Vec::new(),
            elapsed: 0.0,
        }
    }

    /// World with a creature at every spawn object of `map`.
    pub fn from_map(map: Map, config: Config) -> Self {
        let spawns: Vec<(CreatureKind, Vec2)> = map
            .spawns()
            .iter()
            .map(|s| (CreatureKind::from(s.kind), vec2(s.rect.x, s.rect.y)))
            .collect();
        let mut world = Self::new(map, config);
        for (kind, position) in spawns {
            world.spawn(kind, position);
        }
        log::info!(
            "[World] spawned {} creatures, player {:?}",
            world.order.len(),
            world.player
        );
        world
    }

    /// Load a map and, optionally, a config file (defaults otherwise), then spawn from the map.
    pub fn load(map_path: impl AsRef<Path>, config_path: Option<&Path>) -> anyhow::Result<Self> {
        let map_path = map_path.as_ref();
        let config = match config_path {
            Some(p) => Config::load(p).with_context(|| format!("Loading config {}", p.display()))?,
            None => Config::default(),
        };
        let map = Map::load(map_path)
            .with_context(|| format!("Loading map {}", map_path.display()))?;
        Ok(Self::from_map(map, config))
    }

    /// The map.
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Tuning in effect.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tile occupancy of every live creature.
    pub fn occupancy(&self) -> &SpatialOccupancy {
        &self.occupancy
    }

    /// First player spawned, while it is alive.
    pub fn player(&self) -> Option<CreatureId> {
        self.player
    }

    /// Live creatures in update order.
    pub fn creature_ids(&self) -> &[CreatureId] {
        &self.order
    }

    /// Number of live creatures.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True with no live creatures.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Seconds simulated so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Live creature behind `id`; `None` for stale ids.
    pub fn creature(&self, id: CreatureId) -> Option<&Creature> {
        live_creature(&self.slots, id)
    }

    fn creature_mut(&mut self, id: CreatureId) -> Option<&mut Creature> {
        self.slot_mut(id).and_then(|s| s.creature.as_mut())
    }

    fn slot_mut(&mut self, id: CreatureId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.alive && s.generation == id.generation)
    }

    /// Current bounding box of `id`.
    pub fn bounding_box(&self, id: CreatureId) -> Option<Rect> {
        self.creature(id).map(Creature::bounding_box)
    }

    /// Add a creature now and index it. The first player spawned becomes [`World::player`].
    pub fn spawn(&mut self, kind: CreatureKind, position: Vec2) -> CreatureId {
        let creature = Creature::new(kind, &self.config, position);
        let bounding_box = creature.bounding_box();

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.alive = true;
                slot.home = position;
                slot.creature = Some(creature);
                CreatureId::from_raw_parts(index, slot.generation)
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    alive: true,
                    home: position,
                    creature: Some(creature),
                });
                CreatureId::from_raw_parts(self.slots.len() as u32 - 1, 0)
            }
        };

        self.occupancy.insert(&self.map, id, bounding_box);
        self.order.push(id);
        if kind == CreatureKind::Player && self.player.is_none() {
            self.player = Some(id);
        }
        log::debug!("[World] spawned {:?} {:?} at {:?}", kind, id, position);
        id
    }

    /// Remove a creature right away. Only valid between ticks, which `&mut self` guarantees.
    pub fn despawn(&mut self, id: CreatureId) -> Option<Creature> {
        let slot = self.slot_mut(id)?;
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        let creature = slot.creature.take();

        self.free.push(id.index);
        self.order.retain(|o| *o != id);
        self.occupancy.remove(id);
        if self.player == Some(id) {
            self.player = None;
        }
        log::debug!("[World] despawned {:?}", id);
        creature
    }

    /// Spawn `kind` at `position` once `delay` seconds of ticks have passed.
    pub fn schedule_spawn(&mut self, kind: CreatureKind, position: Vec2, delay: f32) {
        self.respawns.push(SpawnTimer {
            kind,
            position,
            remaining: delay,
        });
    }

    /// Spawns still waiting on a timer.
    pub fn scheduled_spawns(&self) -> usize {
        self.respawns.len()
    }

    /// Forward a move request to `id`. False if refused or `id` is stale.
    pub fn request_move(&mut self, id: CreatureId, direction: Vec2) -> bool {
        let accepted = self
            .creature_mut(id)
            .map_or(false, |c| c.request_move(direction));
        self.refresh_occupancy(id);
        accepted
    }

    /// Forward an attack request to `id`. False if refused or `id` is stale.
    pub fn request_attack(&mut self, id: CreatureId, direction: Vec2) -> bool {
        let accepted = self
            .creature_mut(id)
            .map_or(false, |c| c.request_attack(direction));
        self.refresh_occupancy(id);
        accepted
    }

    /// Damage `id` directly.
    pub fn apply_damage(&mut self, id: CreatureId, amount: f32) {
        if let Some(c) = self.creature_mut(id) {
            c.apply_damage(amount);
        }
        self.refresh_occupancy(id);
    }

    // state changes can swap the body box
    fn refresh_occupancy(&mut self, id: CreatureId) {
        if let Some(bounding_box) = self.bounding_box(id) {
            self.occupancy.reindex(&self.map, id, bounding_box);
        }
    }

    /// Advance the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        self.run_brains();

        let order = self.order.clone();
        for id in order {
            self.step_creature(id, dt);
        }

        self.apply_attacks();
        self.collect_finished();
        self.tick_spawn_timers(dt);
        self.flush();
    }

    fn step_creature(&mut self, id: CreatureId, dt: f32) {
        // Taken out of its slot so the others can be read while it moves.
        let Some(mut creature) = self.slot_mut(id).and_then(|s| s.creature.take()) else {
            return;
        };

        {
            let slots = &self.slots;
            let bodies = |other: CreatureId| -> Option<Rect> {
                live_creature(slots, other)
                    .filter(|c| !c.is_dead())
                    .map(Creature::bounding_box)
            };
            let ctx = MoveContext {
                map: &self.map,
                occupancy: &self.occupancy,
                self_id: id,
                bodies: &bodies,
            };
            creature.update(&ctx, dt);
        }

        self.occupancy.reindex(&self.map, id, creature.bounding_box());
        if let Some(slot) = self.slot_mut(id) {
            slot.creature = Some(creature);
        }
    }

    /// Slimes walk toward the player inside their aggro radius and swing when in reach.
    fn run_brains(&mut self) {
        let Some(target) = self
            .player
            .and_then(|p| self.creature(p))
            .filter(|p| !p.is_dead())
            .map(Creature::bounding_box)
        else {
            return;
        };
        let goal = center(&target);
        let deadzone = self.config.direction_deadzone;

        for id in self.order.clone() {
            let Some(c) = self.creature_mut(id) else {
                continue;
            };
            if c.kind() != CreatureKind::Slime || c.is_dead() {
                continue;
            }
            let radius = c.params().aggro_radius;
            if radius <= 0.0 {
                continue;
            }

            let offset = goal - center(&c.bounding_box());
            let distance = offset.length();
            if distance > radius {
                if c.state() == CreatureState::Walking {
                    c.request_move(Vec2::ZERO);
                }
                continue;
            }

            // zero distance yields NaN here; the creature drops it
            let toward = offset / distance;
            let facing = Facing::from_direction(axis_signs(toward, deadzone)).unwrap_or(c.facing());
            if intersects(&c.weapon_box(facing), &target) {
                c.request_attack(toward);
            } else {
                c.request_move(toward);
            }
        }
        for id in self.order.clone() {
            self.refresh_occupancy(id);
        }
    }

    /// Every attacking creature damages each overlapping creature of another
    /// kind at most once per attack cycle.
    fn apply_attacks(&mut self) {
        for id in self.order.clone() {
            let Some(attacker) = self.creature(id) else {
                continue;
            };
            let Some(reach) = attacker.attack_box() else {
                continue;
            };
            let kind = attacker.kind();
            let damage = attacker.params().attack_damage;

            let tiles = self.map.tiles_overlapping(reach);
            let victims: Vec<CreatureId> = self
                .occupancy
                .query_tiles(&tiles)
                .into_iter()
                .filter(|v| *v != id)
                .filter(|v| {
                    self.creature(*v).map_or(false, |c| {
                        c.kind() != kind && !c.is_dead() && intersects(&c.bounding_box(), &reach)
                    })
                })
                .collect();

            for victim in victims {
                let first_hit = self
                    .creature_mut(id)
                    .map_or(false, |a| a.register_hit(victim));
                if !first_hit {
                    continue;
                }
                if let Some(target) = self.creature_mut(victim) {
                    target.on_damage(damage);
                    log::debug!(
                        "[World] {:?} hit {:?} for {} ({} left)",
                        id,
                        victim,
                        damage,
                        target.health()
                    );
                }
                self.refresh_occupancy(victim);
            }
        }
    }

    fn collect_finished(&mut self) {
        for &id in &self.order {
            let Some(slot) = self.slots.get(id.index as usize) else {
                continue;
            };
            let Some(c) = slot.creature.as_ref().filter(|c| c.is_finished()) else {
                continue;
            };
            self.pending_despawns.push(id);
            let delay = c.params().respawn_delay;
            if delay > 0.0 {
                self.respawns.push(SpawnTimer {
                    kind: c.kind(),
                    position: slot.home,
                    remaining: delay,
                });
            }
        }
    }

    fn tick_spawn_timers(&mut self, dt: f32) {
        for timer in &mut self.respawns {
            timer.remaining -= dt;
        }
        let (ready, waiting): (Vec<SpawnTimer>, Vec<SpawnTimer>) =
            self.respawns.drain(..).partition(|t| t.remaining <= 0.0);
        self.respawns = waiting;
        self.pending_spawns
            .extend(ready.into_iter().map(|t| (t.kind, t.position)));
    }

    fn flush(&mut self) {
        for id in std::mem::take(&mut self.pending_despawns) {
            self.despawn(id);
        }
        for (kind, position) in std::mem::take(&mut self.pending_spawns) {
            self.spawn(kind, position);
        }
    }
}
