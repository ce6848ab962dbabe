//! Temporary buff pickups
//!
//! Buffs appear on a randomized scaled cadence, announced one pre-effect
//! delay ahead, and vanish if not picked up within their lifetime. The
//! slow-motion safety restore also lives here: it runs on the unscaled
//! clock so a stuck time scale is always recovered.

use glam::Vec2;
use rand::Rng;
use rand::seq::IndexedRandom;

use super::SpawnContext;
use crate::consts::BUFF_RADIUS;
use crate::move_towards;
use crate::sim::collision::circles_overlap;
use crate::sim::placement::{DiskGenerator, SpawnKind, SpawnRequest};
use crate::sim::player::BuffKind;
use crate::sim::state::GameEvent;
use crate::sim::timers::{Clock, GameClock, TimerList};
use crate::tuning::BuffTuning;

#[derive(Debug, Clone, PartialEq)]
pub struct Buff {
    pub id: u32,
    pub kind: BuffKind,
    pub pos: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BuffTimer {
    Cycle,
    Spawn { kind: BuffKind, pos: Vec2 },
    Despawn { id: u32 },
    SlowMotionSafety,
}

#[derive(Debug, Clone)]
pub struct BuffSpawner {
    pub buffs: Vec<Buff>,
    timers: TimerList<BuffTimer>,
    spawn_radius: f32,
    base_radius: f32,
    /// Divides the spawn interval; lowered by the magnet upgrade
    spawn_rate: f32,
    max_live: u32,
    base_max_live: u32,
    active: bool,
}

impl BuffSpawner {
    pub fn new(tuning: &BuffTuning) -> Self {
        Self {
            buffs: Vec::new(),
            timers: TimerList::new(),
            spawn_radius: tuning.spawn_radius,
            base_radius: tuning.spawn_radius,
            spawn_rate: 1.0,
            max_live: tuning.max_live,
            base_max_live: tuning.max_live,
            active: false,
        }
    }

    pub fn start<R: Rng + ?Sized>(&mut self, tuning: &BuffTuning, rng: &mut R) {
        self.timers.clear();
        self.active = true;
        self.schedule_cycle(tuning, rng);
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.timers.clear();
    }

    pub fn reset(&mut self) {
        self.stop();
        self.buffs.clear();
        self.spawn_radius = self.base_radius;
        self.spawn_rate = 1.0;
        self.max_live = self.base_max_live;
    }

    pub fn max_live(&self) -> u32 {
        self.max_live
    }

    pub fn spawn_rate(&self) -> f32 {
        self.spawn_rate
    }

    pub fn scale_radius(&mut self, factor: f32) {
        self.spawn_radius *= factor;
    }

    /// Magnet upgrade trade-off: fewer buffs, less often
    pub fn reduce_spawn_rate(&mut self, factor: f32) {
        self.spawn_rate *= factor;
        self.max_live = ((self.max_live as f32 * factor).round() as u32).max(1);
    }

    fn schedule_cycle<R: Rng + ?Sized>(&mut self, tuning: &BuffTuning, rng: &mut R) {
        let base = rng.random_range(tuning.min_interval..=tuning.max_interval);
        self.timers
            .schedule(Clock::Scaled, base / self.spawn_rate.max(f32::EPSILON), BuffTimer::Cycle);
    }

    fn pending_spawns(&self) -> usize {
        self.timers.count(|t| matches!(t, BuffTimer::Spawn { .. }))
    }

    /// Restore the time scale later if nothing else has by then
    pub fn arm_slow_motion_safety(&mut self, after: f32) {
        self.timers
            .cancel_where(|t| matches!(t, BuffTimer::SlowMotionSafety));
        self.timers
            .schedule(Clock::Unscaled, after, BuffTimer::SlowMotionSafety);
    }

    pub fn update(
        &mut self,
        ctx: &mut SpawnContext<'_>,
        clock: &mut GameClock,
        slow_motion_active: bool,
        scaled_dt: f32,
        unscaled_dt: f32,
    ) {
        let tuning = ctx.tuning;
        for timer in self.timers.advance(scaled_dt, unscaled_dt) {
            match timer {
                BuffTimer::Cycle if self.active => {
                    self.schedule_cycle(&tuning.buff, &mut *ctx.rng);
                    self.begin_spawn(ctx);
                }
                BuffTimer::Spawn { kind, pos } if self.active => {
                    if self.buffs.len() >= self.max_live as usize {
                        log::debug!("Buff spawn dropped: {} live", self.buffs.len());
                        continue;
                    }
                    let id = ctx.alloc_id();
                    self.buffs.push(Buff { id, kind, pos });
                    self.timers
                        .schedule(Clock::Scaled, tuning.buff.lifetime, BuffTimer::Despawn { id });
                    ctx.emit(GameEvent::BuffSpawned { id, kind, pos });
                }
                BuffTimer::Despawn { id } => {
                    let before = self.buffs.len();
                    self.buffs.retain(|b| b.id != id);
                    if self.buffs.len() != before {
                        ctx.emit(GameEvent::BuffDespawned { id });
                    }
                }
                BuffTimer::SlowMotionSafety => {
                    if !slow_motion_active && clock.time_scale != 1.0 {
                        log::warn!(
                            "Time scale {:.2} left behind by slow motion, restoring",
                            clock.time_scale
                        );
                        clock.time_scale = 1.0;
                    }
                }
                _ => {}
            }
        }
    }

    fn begin_spawn(&mut self, ctx: &mut SpawnContext<'_>) {
        if self.buffs.len() + self.pending_spawns() >= self.max_live as usize {
            log::debug!("Buff cycle skipped: cap {} reached", self.max_live);
            return;
        }
        let Some(center) = ctx.center() else {
            log::debug!("Buff cycle skipped: arena not detected");
            return;
        };

        let tuning = ctx.tuning;
        let t = &tuning.buff;
        let Some(&kind) = t.kinds.choose(&mut *ctx.rng) else {
            return;
        };
        let request = SpawnRequest::new(SpawnKind::Buff, center, self.spawn_radius)
            .with_player(ctx.player, t.min_distance_from_player)
            .with_peers(self.buffs.iter().map(|b| b.pos).collect(), t.peer_distance);
        let Some(placement) = ctx.place(&request, &DiskGenerator) else {
            return;
        };

        ctx.emit(GameEvent::BuffIncoming {
            kind,
            pos: placement.position,
        });
        self.timers.schedule(
            Clock::Scaled,
            t.pre_effect_delay,
            BuffTimer::Spawn {
                kind,
                pos: placement.position,
            },
        );
    }

    /// Remove the buffs the player touches and cancel their lifetimes
    pub fn collect(&mut self, player: Vec2, player_radius: f32) -> Vec<Buff> {
        let (taken, kept): (Vec<_>, Vec<_>) = self
            .buffs
            .drain(..)
            .partition(|b| circles_overlap(player, player_radius, b.pos, BUFF_RADIUS));
        self.buffs = kept;
        for buff in &taken {
            let id = buff.id;
            self.timers
                .cancel_where(|t| *t == BuffTimer::Despawn { id });
        }
        taken
    }

    /// Pull nearby buffs toward the player, harder the closer they are
    pub fn apply_magnet(&mut self, player: Vec2, range: f32, strength: f32, dt: f32) {
        if range <= 0.0 {
            return;
        }
        for buff in &mut self.buffs {
            let dist = buff.pos.distance(player);
            if dist <= range {
                let force = strength * (1.0 - dist / range);
                buff.pos = move_towards(buff.pos, player, force * dt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spawners::test_support::Fixture;

    fn started(world: &mut Fixture) -> BuffSpawner {
        let mut spawner = BuffSpawner::new(&world.tuning.buff);
        spawner.start(&world.tuning.buff, &mut world.rng);
        spawner
    }

    #[test]
    fn test_cycle_announces_then_spawns() {
        let mut world = Fixture::new();
        let mut clock = GameClock::default();
        let mut spawner = started(&mut world);

        // Never before the minimum interval
        spawner.update(&mut world.ctx(), &mut clock, false, 14.9, 14.9);
        assert!(world.events.is_empty());

        // Past the maximum interval the cycle has fired
        spawner.update(&mut world.ctx(), &mut clock, false, 15.2, 15.2);
        assert!(matches!(world.events[0], GameEvent::BuffIncoming { .. }));
        assert!(spawner.buffs.is_empty());

        spawner.update(&mut world.ctx(), &mut clock, false, 1.0, 1.0);
        assert_eq!(spawner.buffs.len(), 1);
        assert!(matches!(world.events[1], GameEvent::BuffSpawned { .. }));
    }

    #[test]
    fn test_uncollected_buff_despawns() {
        let mut world = Fixture::new();
        let mut clock = GameClock::default();
        let mut spawner = started(&mut world);
        spawner.update(&mut world.ctx(), &mut clock, false, 30.0, 30.0);
        spawner.update(&mut world.ctx(), &mut clock, false, 1.0, 1.0);
        assert_eq!(spawner.buffs.len(), 1);
        let id = spawner.buffs[0].id;

        spawner.update(&mut world.ctx(), &mut clock, false, 20.0, 20.0);
        assert!(spawner.buffs.iter().all(|b| b.id != id));
        assert!(world.events.contains(&GameEvent::BuffDespawned { id }));
    }

    #[test]
    fn test_collect_cancels_lifetime() {
        let mut world = Fixture::new();
        let mut clock = GameClock::default();
        let mut spawner = started(&mut world);
        spawner.update(&mut world.ctx(), &mut clock, false, 30.0, 30.0);
        spawner.update(&mut world.ctx(), &mut clock, false, 1.0, 1.0);
        let pos = spawner.buffs[0].pos;

        let taken = spawner.collect(pos, 0.35);
        assert_eq!(taken.len(), 1);
        assert!(!spawner.timers.any(|t| matches!(t, BuffTimer::Despawn { .. })));
    }

    #[test]
    fn test_magnet_pulls_within_range() {
        let mut spawner = BuffSpawner::new(&BuffTuning::default());
        spawner.buffs.push(Buff {
            id: 1,
            kind: BuffKind::SpeedBoost,
            pos: Vec2::new(2.0, 0.0),
        });
        spawner.buffs.push(Buff {
            id: 2,
            kind: BuffKind::SpeedBoost,
            pos: Vec2::new(10.0, 0.0),
        });
        spawner.apply_magnet(Vec2::ZERO, 3.0, 3.0, 0.5);
        assert!(spawner.buffs[0].pos.x < 2.0);
        assert_eq!(spawner.buffs[1].pos.x, 10.0);
    }

    #[test]
    fn test_reduce_spawn_rate_keeps_one() {
        let mut spawner = BuffSpawner::new(&BuffTuning::default());
        spawner.reduce_spawn_rate(0.7);
        assert_eq!(spawner.max_live(), 1);
        spawner.reduce_spawn_rate(0.1);
        assert_eq!(spawner.max_live(), 1);
        spawner.reset();
        assert_eq!(spawner.max_live(), 2);
        assert_eq!(spawner.spawn_rate(), 1.0);
    }

    #[test]
    fn test_safety_restore_uses_real_time() {
        let mut world = Fixture::new();
        let mut clock = GameClock {
            time_scale: 0.5,
            ..Default::default()
        };
        let mut spawner = BuffSpawner::new(&world.tuning.buff);
        spawner.arm_slow_motion_safety(6.0);

        // Only 3 scaled seconds pass but 6 real ones
        spawner.update(&mut world.ctx(), &mut clock, false, 3.0, 6.0);
        assert_eq!(clock.time_scale, 1.0);
    }

    #[test]
    fn test_safety_restore_leaves_running_effect() {
        let mut world = Fixture::new();
        let mut clock = GameClock {
            time_scale: 0.5,
            ..Default::default()
        };
        let mut spawner = BuffSpawner::new(&world.tuning.buff);
        spawner.arm_slow_motion_safety(6.0);
        spawner.update(&mut world.ctx(), &mut clock, true, 3.0, 6.0);
        assert_eq!(clock.time_scale, 0.5);
    }
}
