//! Hazard spawning and per-tick hazard simulation
//!
//! A recurring scaled timer drives the spawn cadence; each cycle reads the
//! interval, speed and population cap from the difficulty scheduler at that
//! moment. A spawn is announced by a warning and lands one warning period
//! later, after the cap has been checked again.

use glam::Vec2;

use super::SpawnContext;
use crate::consts::HAZARD_RADIUS;
use crate::sim::collision::{LayerMask, circles_overlap};
use crate::sim::difficulty::DifficultyScheduler;
use crate::sim::hazard::{AbilityRoll, Hazard, WallOutcome, roll_abilities};
use crate::sim::placement::{BoundsRule, EdgeGenerator, Side, SpawnKind, SpawnRequest};
use crate::sim::state::{DestroyCause, GameEvent};
use crate::sim::timers::{Clock, TimerList};

#[derive(Debug, Clone, Copy, PartialEq)]
enum HazardTimer {
    Cycle,
    Spawn { pos: Vec2, side: Side },
}

/// Spawn-time snapshot of everything the ability roll depends on
#[derive(Debug, Clone, Copy)]
pub struct HazardSpawnInputs {
    pub score: u32,
    pub owned_upgrades: usize,
}

#[derive(Debug, Clone)]
pub struct HazardSpawner {
    pub hazards: Vec<Hazard>,
    timers: TimerList<HazardTimer>,
    spawn_radius: f32,
    base_radius: f32,
    active: bool,
}

impl HazardSpawner {
    pub fn new(spawn_radius: f32) -> Self {
        Self {
            hazards: Vec::new(),
            timers: TimerList::new(),
            spawn_radius,
            base_radius: spawn_radius,
            active: false,
        }
    }

    /// Arm the first cycle one current interval from now
    pub fn start(&mut self, difficulty: &DifficultyScheduler) {
        self.timers.clear();
        self.active = true;
        self.timers
            .schedule(Clock::Scaled, difficulty.state().spawn_interval, HazardTimer::Cycle);
    }

    /// Cancel the cadence and every pending warning
    pub fn stop(&mut self) {
        self.active = false;
        self.timers.clear();
    }

    pub fn reset(&mut self) {
        self.stop();
        self.hazards.clear();
        self.spawn_radius = self.base_radius;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pending_warnings(&self) -> usize {
        self.timers
            .count(|t| matches!(t, HazardTimer::Spawn { .. }))
    }

    pub fn scale_radius(&mut self, factor: f32) {
        self.spawn_radius *= factor;
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.hazards.iter().map(|h| h.pos).collect()
    }

    /// Fire due timers: schedule warnings and land pending spawns
    pub fn update(
        &mut self,
        ctx: &mut SpawnContext<'_>,
        difficulty: &DifficultyScheduler,
        inputs: HazardSpawnInputs,
        holes: &[Vec2],
        scaled_dt: f32,
        unscaled_dt: f32,
    ) {
        for timer in self.timers.advance(scaled_dt, unscaled_dt) {
            if !self.active {
                break;
            }
            match timer {
                HazardTimer::Cycle => {
                    let interval = difficulty.state().spawn_interval;
                    self.timers.schedule(Clock::Scaled, interval, HazardTimer::Cycle);
                    self.begin_spawn(ctx, difficulty, holes);
                }
                HazardTimer::Spawn { pos, side } => {
                    self.land_spawn(ctx, difficulty, inputs, pos, side)
                }
            }
        }
    }

    fn begin_spawn(
        &mut self,
        ctx: &mut SpawnContext<'_>,
        difficulty: &DifficultyScheduler,
        holes: &[Vec2],
    ) {
        let cap = difficulty.state().population_cap as usize;
        if self.hazards.len() >= cap {
            log::debug!("Hazard cycle skipped: {} live, cap {}", self.hazards.len(), cap);
            return;
        }
        let Some(center) = ctx.center() else {
            log::debug!("Hazard cycle skipped: arena not detected");
            return;
        };

        let tuning = ctx.tuning;
        let t = &tuning.hazard;
        let request = SpawnRequest::new(SpawnKind::Hazard, center, self.spawn_radius)
            .with_player(ctx.player, t.min_distance_from_player)
            .with_peers(self.positions(), t.peer_distance)
            .with_peers(holes.to_vec(), tuning.escape_hole.hole_distance)
            .with_bounds(BoundsRule::Axis {
                horizontal: t.horizontal_padding,
                vertical: t.vertical_avoidance,
            });
        // The fallback point sits on the center line, so the edge is drawn up front
        let side = Side::random(&mut *ctx.rng);
        let generator = EdgeGenerator {
            vertical_deviation: t.vertical_deviation,
            side: Some(side),
            ..Default::default()
        };
        let Some(placement) = ctx.place(&request, &generator) else {
            return;
        };

        ctx.emit(GameEvent::HazardWarning {
            pos: placement.position,
        });
        self.timers.schedule(
            Clock::Scaled,
            t.warning_duration,
            HazardTimer::Spawn {
                pos: placement.position,
                side,
            },
        );
    }

    fn land_spawn(
        &mut self,
        ctx: &mut SpawnContext<'_>,
        difficulty: &DifficultyScheduler,
        inputs: HazardSpawnInputs,
        pos: Vec2,
        side: Side,
    ) {
        let state = difficulty.state();
        if self.hazards.len() >= state.population_cap as usize {
            log::debug!("Hazard spawn dropped: population cap {} reached", state.population_cap);
            return;
        }
        if ctx.center().is_none() {
            log::debug!("Hazard spawn dropped: arena not detected");
            return;
        }

        let tuning = ctx.tuning;
        let roll = AbilityRoll {
            score: inputs.score,
            chance: difficulty.ability_chance(&tuning.hazard),
            multiplier: difficulty.difficulty_multiplier(),
            owned_upgrades: inputs.owned_upgrades,
        };
        let abilities = roll_abilities(roll, &tuning.hazard, &mut *ctx.rng);
        let id = ctx.alloc_id();
        let hazard = Hazard::spawn(id, pos, side, state.hazard_speed, HAZARD_RADIUS, abilities);
        ctx.emit(GameEvent::HazardSpawned {
            id,
            pos,
            threat: hazard.threat_level(),
        });
        self.hazards.push(hazard);
    }

    /// Remove every live hazard at once. Pending warnings still land.
    pub fn destroy_all(&mut self, ctx: &mut SpawnContext<'_>, cause: DestroyCause) -> usize {
        let count = self.hazards.len();
        for h in self.hazards.drain(..) {
            ctx.emit(GameEvent::HazardDestroyed {
                id: h.id,
                pos: h.pos,
                cause,
            });
        }
        count
    }

    /// Move every hazard and resolve contacts: hazard pairs, then walls, then
    /// the player. Returns the id of a hazard that reached the player, if any.
    /// Destroyed hazards are gone from the registry when this returns.
    pub fn simulate(
        &mut self,
        ctx: &mut SpawnContext<'_>,
        scaled_dt: f32,
        player_radius: f32,
    ) -> Option<u32> {
        let player = ctx.player;
        for hazard in &mut self.hazards {
            hazard.advance(scaled_dt, player);
        }

        // Hazard pairs destroy each other
        let n = self.hazards.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.hazards[i], &self.hazards[j]);
                if a.is_destroyed() || b.is_destroyed() {
                    continue;
                }
                if circles_overlap(a.pos, a.radius, b.pos, b.radius) {
                    for k in [i, j] {
                        let h = &mut self.hazards[k];
                        h.destroy();
                        ctx.events.push(GameEvent::HazardDestroyed {
                            id: h.id,
                            pos: h.pos,
                            cause: DestroyCause::HazardCollision,
                        });
                    }
                }
            }
        }

        // Walls
        let tuning = ctx.tuning;
        for hazard in &mut self.hazards {
            if hazard.is_destroyed() {
                continue;
            }
            let contact = ctx
                .obstacles
                .circle_contact(hazard.pos, hazard.radius, LayerMask::WALLS);
            if !contact.hit {
                continue;
            }
            let outcome =
                hazard.on_wall_contact(contact.normal, player, &tuning.hazard, &mut *ctx.rng);
            let event = match outcome {
                WallOutcome::Bounced => GameEvent::HazardBounced {
                    id: hazard.id,
                    pos: hazard.pos,
                },
                WallOutcome::Destroyed => GameEvent::HazardDestroyed {
                    id: hazard.id,
                    pos: hazard.pos,
                    cause: DestroyCause::Wall,
                },
            };
            ctx.events.push(event);
        }

        // Player, checked only against survivors
        let hit = player.and_then(|p| {
            self.hazards
                .iter()
                .find(|h| !h.is_destroyed() && circles_overlap(h.pos, h.radius, p, player_radius))
                .map(|h| h.id)
        });

        self.hazards.retain(|h| !h.is_destroyed());
        self.hazards.sort_by_key(|h| h.id);
        hit
    }
}
