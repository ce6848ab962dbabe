//! Escape holes: the push-your-luck exit
//!
//! Each hole costs more than the last (`threshold * multiplier^index`).
//! Early holes time out; later ones stay until the player either escapes
//! through them or spends below their requirement. A threshold the balance
//! cannot cover stays armed until the balance catches up.

use glam::Vec2;

use super::SpawnContext;
use crate::consts::ESCAPE_HOLE_RADIUS;
use crate::error::ConfigError;
use crate::sim::collision::circles_overlap;
use crate::sim::placement::{DiskGenerator, SpawnKind, SpawnRequest};
use crate::sim::state::{Gate, GameEvent};
use crate::sim::threshold::ThresholdGate;
use crate::sim::timers::{Clock, TimerList};
use crate::tuning::EscapeHoleTuning;

#[derive(Debug, Clone, PartialEq)]
pub struct EscapeHole {
    pub id: u32,
    pub pos: Vec2,
    /// Balance needed to keep the hole open
    pub requirement: u32,
    /// Position of the threshold that opened it
    pub index: usize,
    pub permanent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum HoleTimer {
    Expire { id: u32 },
}

#[derive(Debug, Clone)]
pub struct EscapeHoleSpawner {
    pub hole: Option<EscapeHole>,
    gate: ThresholdGate,
    timers: TimerList<HoleTimer>,
    spawn_radius: f32,
    base_radius: f32,
    active: bool,
}

impl EscapeHoleSpawner {
    pub fn new(tuning: &EscapeHoleTuning) -> Result<Self, ConfigError> {
        Ok(Self {
            hole: None,
            gate: ThresholdGate::new("escape_hole.thresholds", tuning.effective_thresholds())?,
            timers: TimerList::new(),
            spawn_radius: tuning.spawn_radius,
            base_radius: tuning.spawn_radius,
            active: false,
        })
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.timers.clear();
    }

    pub fn reset(&mut self) {
        self.stop();
        self.hole = None;
        self.gate.reset();
        self.spawn_radius = self.base_radius;
    }

    pub fn gate(&self) -> &ThresholdGate {
        &self.gate
    }

    pub fn scale_radius(&mut self, factor: f32) {
        self.spawn_radius *= factor;
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.hole.iter().map(|h| h.pos).collect()
    }

    /// Feed the cumulative score and the spendable balance
    pub fn on_score(&mut self, ctx: &mut SpawnContext<'_>, score: u32, balance: u32) {
        if !self.active {
            return;
        }
        let Some(center) = ctx.center() else {
            log::debug!("Escape hole gate not polled: arena not detected");
            return;
        };
        // With no hole open, only fire what the balance can keep open
        let reach = if self.hole.is_some() {
            score
        } else {
            score.min(balance)
        };
        if let Some(next) = self.gate.next_threshold().filter(|&t| t <= score && t > reach) {
            log::debug!("Escape hole threshold {} held: balance {} is short", next, balance);
        }
        let crossed = self.gate.update(reach);
        let Some(&requirement) = crossed.last() else {
            return;
        };
        for &threshold in &crossed {
            ctx.emit(GameEvent::ThresholdCrossed {
                gate: Gate::EscapeHole,
                threshold,
            });
        }

        if self.hole.is_some() {
            log::debug!("Escape hole threshold {} ignored: a hole is already open", requirement);
            return;
        }

        let tuning = ctx.tuning;
        let t = &tuning.escape_hole;
        let index = self.gate.thresholds().iter().position(|&x| x == requirement).unwrap_or(0);
        let permanent = index >= t.permanent_from_index;

        let request = SpawnRequest::new(SpawnKind::EscapeHole, center, self.spawn_radius)
            .with_player(ctx.player, t.min_distance_from_player)
            .with_peers(self.positions(), t.hole_distance);
        let Some(placement) = ctx.place(&request, &DiskGenerator) else {
            return;
        };

        let id = ctx.alloc_id();
        self.hole = Some(EscapeHole {
            id,
            pos: placement.position,
            requirement,
            index,
            permanent,
        });
        if !permanent {
            self.timers.schedule(Clock::Scaled, t.lifetime, HoleTimer::Expire { id });
        }
        log::info!(
            "Escape hole {} opened (requirement {}, permanent: {})",
            index,
            requirement,
            permanent
        );
        ctx.emit(GameEvent::EscapeHoleSpawned {
            id,
            pos: placement.position,
            requirement,
            permanent,
        });
    }

    /// Close the hole once the spendable balance drops below its requirement
    pub fn check_balance(&mut self, ctx: &mut SpawnContext<'_>, balance: u32) {
        if self.hole.as_ref().is_some_and(|h| balance < h.requirement) {
            self.despawn(ctx);
        }
    }

    pub fn update(&mut self, ctx: &mut SpawnContext<'_>, scaled_dt: f32, unscaled_dt: f32) {
        for timer in self.timers.advance(scaled_dt, unscaled_dt) {
            let HoleTimer::Expire { id } = timer;
            if self.hole.as_ref().is_some_and(|h| h.id == id) {
                self.despawn(ctx);
            }
        }
    }

    /// The hole the player is standing in, if any
    pub fn reached(&self, player: Vec2, player_radius: f32) -> Option<&EscapeHole> {
        self.hole
            .as_ref()
            .filter(|h| circles_overlap(player, player_radius, h.pos, ESCAPE_HOLE_RADIUS))
    }

    fn despawn(&mut self, ctx: &mut SpawnContext<'_>) {
        if let Some(hole) = self.hole.take() {
            self.timers.clear();
            ctx.emit(GameEvent::EscapeHoleDespawned { id: hole.id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spawners::test_support::Fixture;

    fn spawner(world: &Fixture) -> EscapeHoleSpawner {
        let mut s = EscapeHoleSpawner::new(&world.tuning.escape_hole).unwrap();
        s.start();
        s
    }

    #[test]
    fn test_progressive_thresholds() {
        let world = Fixture::new();
        let s = spawner(&world);
        assert_eq!(s.gate().thresholds(), &[50, 120, 288, 518]);
    }

    #[test]
    fn test_first_hole_times_out() {
        let mut world = Fixture::new();
        let mut s = spawner(&world);
        s.on_score(&mut world.ctx(), 50, 50);
        let hole = s.hole.clone().unwrap();
        assert_eq!(hole.requirement, 50);
        assert!(!hole.permanent);
        assert!(hole.pos.distance(Vec2::ZERO) >= 4.0);

        s.update(&mut world.ctx(), 59.0, 59.0);
        assert!(s.hole.is_some());
        s.update(&mut world.ctx(), 1.5, 1.5);
        assert!(s.hole.is_none());
        assert!(world.events.contains(&GameEvent::EscapeHoleDespawned { id: hole.id }));
    }

    #[test]
    fn test_later_hole_is_permanent() {
        let mut world = Fixture::new();
        let mut s = spawner(&world);
        // One jump across three thresholds opens a single hole for the last
        s.on_score(&mut world.ctx(), 300, 300);
        let hole = s.hole.clone().unwrap();
        assert_eq!(hole.index, 2);
        assert_eq!(hole.requirement, 288);
        assert!(hole.permanent);
        s.update(&mut world.ctx(), 1000.0, 1000.0);
        assert!(s.hole.is_some());
    }

    #[test]
    fn test_spending_below_requirement_closes_hole() {
        let mut world = Fixture::new();
        let mut s = spawner(&world);
        s.on_score(&mut world.ctx(), 50, 50);
        s.check_balance(&mut world.ctx(), 50);
        assert!(s.hole.is_some());
        s.check_balance(&mut world.ctx(), 49);
        assert!(s.hole.is_none());
    }

    #[test]
    fn test_crossing_while_open_is_ignored() {
        let mut world = Fixture::new();
        let mut s = spawner(&world);
        s.on_score(&mut world.ctx(), 50, 50);
        let first = s.hole.clone().unwrap();
        s.on_score(&mut world.ctx(), 120, 120);
        assert_eq!(s.hole.as_ref().map(|h| h.id), Some(first.id));
        assert!(s.gate().is_fired(120));
    }

    #[test]
    fn test_reached_by_overlap() {
        let mut world = Fixture::new();
        let mut s = spawner(&world);
        s.on_score(&mut world.ctx(), 50, 50);
        let pos = s.hole.as_ref().map(|h| h.pos).unwrap();
        assert!(s.reached(pos + Vec2::new(1.0, 0.0), 0.35).is_some());
        assert!(s.reached(pos + Vec2::new(3.0, 0.0), 0.35).is_none());
    }

    #[test]
    fn test_missing_arena_keeps_gate_armed() {
        let mut world = Fixture::new();
        world.arena = None;
        let mut s = spawner(&world);
        s.on_score(&mut world.ctx(), 50, 50);
        assert!(s.hole.is_none());
        assert_eq!(s.gate().fired_count(), 0);

        let mut world = Fixture::new();
        s.on_score(&mut world.ctx(), 50, 50);
        assert!(s.hole.is_some());
    }

    #[test]
    fn test_short_balance_keeps_threshold_armed() {
        let mut world = Fixture::new();
        let mut s = spawner(&world);
        // Spent 20 of 60 at a market: the first hole is out of reach
        s.on_score(&mut world.ctx(), 60, 40);
        s.check_balance(&mut world.ctx(), 40);
        assert!(s.hole.is_none());
        assert!(!s.gate().is_fired(50));
        assert!(!world
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::EscapeHoleSpawned { .. })));

        s.on_score(&mut world.ctx(), 80, 60);
        s.check_balance(&mut world.ctx(), 60);
        let hole = s.hole.clone().unwrap();
        assert_eq!(hole.requirement, 50);
        assert!(s.gate().is_fired(50));
    }

    #[test]
    fn test_balance_picks_highest_affordable_hole() {
        let mut world = Fixture::new();
        let mut s = spawner(&world);
        s.on_score(&mut world.ctx(), 130, 60);
        assert_eq!(s.hole.as_ref().map(|h| h.requirement), Some(50));
        assert!(!s.gate().is_fired(120));
    }
}
