//! Upgrade market: opens at score milestones, one at a time
//!
//! A market waits in the arena until it expires or the player walks into
//! it; entering consumes it and opens a shop session.

use glam::Vec2;

use super::SpawnContext;
use crate::consts::MARKET_RADIUS;
use crate::error::ConfigError;
use crate::sim::collision::circles_overlap;
use crate::sim::placement::{DiskGenerator, SpawnKind, SpawnRequest};
use crate::sim::state::{Gate, GameEvent};
use crate::sim::threshold::ThresholdGate;
use crate::sim::timers::{Clock, TimerList};
use crate::tuning::MarketTuning;

#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    pub id: u32,
    pub pos: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MarketTimer {
    Expire { id: u32 },
}

#[derive(Debug, Clone)]
pub struct MarketSpawner {
    pub market: Option<Market>,
    gate: ThresholdGate,
    timers: TimerList<MarketTimer>,
    spawn_radius: f32,
    base_radius: f32,
    active: bool,
}

impl MarketSpawner {
    pub fn new(tuning: &MarketTuning) -> Result<Self, ConfigError> {
        Ok(Self {
            market: None,
            gate: ThresholdGate::new("market.thresholds", tuning.thresholds.clone())?,
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
        self.market = None;
        self.gate.reset();
        self.spawn_radius = self.base_radius;
    }

    pub fn is_open(&self) -> bool {
        self.market.is_some()
    }

    pub fn gate(&self) -> &ThresholdGate {
        &self.gate
    }

    pub fn scale_radius(&mut self, factor: f32) {
        self.spawn_radius *= factor;
    }

    /// Feed the cumulative score. Crossings while a market is open are
    /// consumed without spawning.
    pub fn on_score(&mut self, ctx: &mut SpawnContext<'_>, score: u32) {
        if !self.active {
            return;
        }
        // Leave the gate armed until there is an arena to place into
        let Some(center) = ctx.center() else {
            log::debug!("Market gate not polled: arena not detected");
            return;
        };
        let crossed = self.gate.update(score);
        let Some(&last) = crossed.last() else {
            return;
        };
        for &threshold in &crossed {
            ctx.emit(GameEvent::ThresholdCrossed {
                gate: Gate::Market,
                threshold,
            });
        }

        if self.market.is_some() {
            log::debug!("Market threshold {} ignored: market already open", last);
            return;
        }

        let tuning = ctx.tuning;
        let t = &tuning.market;
        let request = SpawnRequest::new(SpawnKind::Market, center, self.spawn_radius)
            .with_player(ctx.player, t.min_distance_from_player);
        let Some(placement) = ctx.place(&request, &DiskGenerator) else {
            return;
        };

        let id = ctx.alloc_id();
        self.market = Some(Market {
            id,
            pos: placement.position,
        });
        self.timers
            .schedule(Clock::Scaled, t.lifetime, MarketTimer::Expire { id });
        log::info!("Market opened at score {}", score);
        ctx.emit(GameEvent::MarketSpawned {
            id,
            pos: placement.position,
        });
    }

    /// The market the player is touching, if any
    pub fn reached(&self, player: Vec2, player_radius: f32) -> Option<&Market> {
        self.market
            .as_ref()
            .filter(|m| circles_overlap(player, player_radius, m.pos, MARKET_RADIUS))
    }

    /// Take the market out of the arena and cancel its expiry
    pub fn consume(&mut self) -> Option<Market> {
        self.timers.clear();
        self.market.take()
    }

    pub fn update(&mut self, ctx: &mut SpawnContext<'_>, scaled_dt: f32, unscaled_dt: f32) {
        for timer in self.timers.advance(scaled_dt, unscaled_dt) {
            let MarketTimer::Expire { id } = timer;
            if self.market.as_ref().is_some_and(|m| m.id == id) {
                self.market = None;
                ctx.emit(GameEvent::MarketExpired { id });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::spawners::test_support::Fixture;

    fn spawner(thresholds: Vec<u32>) -> MarketSpawner {
        let tuning = MarketTuning {
            thresholds,
            ..Default::default()
        };
        let mut s = MarketSpawner::new(&tuning).unwrap();
        s.start();
        s
    }

    fn spawned(world: &Fixture) -> usize {
        world
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::MarketSpawned { .. }))
            .count()
    }

    #[test]
    fn test_crossings_while_open_are_consumed() {
        let mut world = Fixture::new();
        let mut s = spawner(vec![5, 15, 30]);

        s.on_score(&mut world.ctx(), 5);
        assert!(s.is_open());
        s.on_score(&mut world.ctx(), 16);
        assert_eq!(spawned(&world), 1);

        // Expire the first market; 15 is not replayed
        s.update(&mut world.ctx(), 30.0, 30.0);
        assert!(!s.is_open());
        s.on_score(&mut world.ctx(), 20);
        assert_eq!(spawned(&world), 1);

        s.on_score(&mut world.ctx(), 30);
        assert_eq!(spawned(&world), 2);
        assert!(s.gate().is_fired(30));
    }

    #[test]
    fn test_jump_spawns_single_market() {
        let mut world = Fixture::new();
        let mut s = spawner(vec![5, 15, 30]);
        s.on_score(&mut world.ctx(), 100);
        assert_eq!(spawned(&world), 1);
        let crossed = world
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::ThresholdCrossed { gate: Gate::Market, .. }))
            .count();
        assert_eq!(crossed, 3);
    }

    #[test]
    fn test_expiry_after_lifetime() {
        let mut world = Fixture::new();
        let mut s = spawner(vec![5]);
        s.on_score(&mut world.ctx(), 5);
        let id = s.market.as_ref().map(|m| m.id).unwrap();
        s.update(&mut world.ctx(), 29.9, 29.9);
        assert!(s.is_open());
        s.update(&mut world.ctx(), 0.2, 0.2);
        assert!(!s.is_open());
        assert!(world.events.contains(&GameEvent::MarketExpired { id }));
    }

    #[test]
    fn test_reset_rearms_gate() {
        let mut world = Fixture::new();
        let mut s = spawner(vec![5]);
        s.on_score(&mut world.ctx(), 5);
        s.reset();
        s.start();
        assert!(!s.is_open());
        s.on_score(&mut world.ctx(), 5);
        assert!(s.is_open());
    }

    #[test]
    fn test_reached_and_consumed() {
        let mut world = Fixture::new();
        let mut s = spawner(vec![5, 15]);
        s.on_score(&mut world.ctx(), 5);
        let market = s.market.clone().unwrap();
        assert!(s.reached(market.pos + Vec2::new(0.8, 0.0), 0.35).is_some());
        assert!(s.reached(market.pos + Vec2::new(1.0, 0.0), 0.35).is_none());

        assert_eq!(s.consume(), Some(market));
        assert!(!s.is_open());
        // The expiry timer went with it
        s.update(&mut world.ctx(), 60.0, 60.0);
        assert!(!world
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::MarketExpired { .. })));

        // Later milestones still open fresh markets
        s.on_score(&mut world.ctx(), 15);
        assert!(s.is_open());
    }
}
