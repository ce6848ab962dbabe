//! Cheese pickups: one on the field at a time, replaced on collection

use glam::Vec2;

use super::SpawnContext;
use crate::consts::COLLECTIBLE_RADIUS;
use crate::sim::collision::circles_overlap;
use crate::sim::placement::{BoundsRule, DiskGenerator, SpawnKind, SpawnRequest};
use crate::sim::state::GameEvent;

#[derive(Debug, Clone, PartialEq)]
pub struct Collectible {
    pub id: u32,
    pub pos: Vec2,
    pub points: u32,
}

#[derive(Debug, Clone)]
pub struct CollectibleSpawner {
    pub items: Vec<Collectible>,
    /// Spawns owed (initial one, then one per collection)
    pending: u32,
    spawn_radius: f32,
    base_radius: f32,
    active: bool,
}

impl CollectibleSpawner {
    pub fn new(spawn_radius: f32) -> Self {
        Self {
            items: Vec::new(),
            pending: 0,
            spawn_radius,
            base_radius: spawn_radius,
            active: false,
        }
    }

    /// Begin a run; the first collectible appears on the next update
    pub fn start(&mut self) {
        self.active = true;
        self.pending = 1;
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.pending = 0;
    }

    pub fn reset(&mut self) {
        self.stop();
        self.items.clear();
        self.spawn_radius = self.base_radius;
    }

    pub fn spawn_radius(&self) -> f32 {
        self.spawn_radius
    }

    pub fn scale_radius(&mut self, factor: f32) {
        self.spawn_radius *= factor;
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.items.iter().map(|c| c.pos).collect()
    }

    /// Remove every collectible the player touches
    pub fn collect(&mut self, player: Vec2, player_radius: f32) -> Vec<Collectible> {
        let (taken, kept): (Vec<_>, Vec<_>) = self
            .items
            .drain(..)
            .partition(|c| circles_overlap(player, player_radius, c.pos, COLLECTIBLE_RADIUS));
        self.items = kept;
        if self.active {
            self.pending += taken.len() as u32;
        }
        taken
    }

    /// Place owed collectibles, keeping clear of hazards and escape holes
    pub fn update(&mut self, ctx: &mut SpawnContext<'_>, hazards: &[Vec2], holes: &[Vec2]) {
        if !self.active {
            return;
        }
        while self.pending > 0 {
            let Some(center) = ctx.center() else {
                log::debug!("Collectible spawn deferred: arena not detected");
                return;
            };
            let tuning = ctx.tuning;
            let t = &tuning.collectible;
            let request = SpawnRequest::new(SpawnKind::Collectible, center, self.spawn_radius)
                .with_player(ctx.player, t.min_distance_from_player)
                .with_peers(self.positions(), t.peer_distance)
                .with_peers(hazards.to_vec(), tuning.hazard.peer_distance)
                .with_peers(holes.to_vec(), tuning.escape_hole.hole_distance)
                .with_bounds(BoundsRule::Axis {
                    horizontal: t.vertical_allowance,
                    vertical: t.vertical_allowance,
                });
            let Some(placement) = ctx.place(&request, &DiskGenerator) else {
                return;
            };

            let id = ctx.alloc_id();
            self.items.push(Collectible {
                id,
                pos: placement.position,
                points: t.points,
            });
            ctx.emit(GameEvent::CollectibleSpawned {
                id,
                pos: placement.position,
            });
            self.pending -= 1;
        }
    }
}
