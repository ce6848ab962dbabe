//! Hazard agents (cats crossing the arena)
//!
//! A hazard enters from the left or right edge and runs horizontally. Its
//! capabilities are rolled once at spawn from the score and difficulty at
//! that moment: a bounce budget, aiming at the player after a bounce,
//! periodic pursuit and a speed multiplier. A wall contact either bounces
//! (once the cached decision allows it and budget remains) or destroys it.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::reflect_velocity;
pub use super::placement::Side;
use crate::blend_direction;
use crate::tuning::HazardTuning;

/// Lifecycle of a hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardState {
    /// Placed this tick, not yet moved
    Spawned,
    Moving,
    /// Removed from the registry before the tick returns
    Destroyed,
}

/// Capabilities rolled at spawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Abilities {
    pub bounce_budget: u32,
    /// Probability used for the one-time bounce decision
    pub bounce_chance: f32,
    pub aim_on_bounce: bool,
    pub pursuit_enabled: bool,
    pub pursuit_strength: f32,
    /// Seconds between pursuit steering updates
    pub pursuit_interval: f32,
    pub speed_multiplier: f32,
    pub elite: bool,
}

impl Default for Abilities {
    fn default() -> Self {
        Self {
            bounce_budget: 0,
            bounce_chance: 0.0,
            aim_on_bounce: false,
            pursuit_enabled: false,
            pursuit_strength: 0.3,
            pursuit_interval: 0.5,
            speed_multiplier: 1.0,
            elite: false,
        }
    }
}

/// Inputs to the spawn-time ability roll
#[derive(Debug, Clone, Copy)]
pub struct AbilityRoll {
    pub score: u32,
    /// Base unlock chance from the scheduler
    pub chance: f32,
    /// Difficulty multiplier from the scheduler
    pub multiplier: f32,
    pub owned_upgrades: usize,
}

/// Roll every capability independently. A tier only consumes randomness
/// once the score has reached it.
pub fn roll_abilities<R: Rng + ?Sized>(
    roll: AbilityRoll,
    tuning: &HazardTuning,
    rng: &mut R,
) -> Abilities {
    let tiers = &tuning.abilities;
    let m = roll.multiplier;
    let chance = (roll.chance + tuning.chance_per_upgrade * roll.owned_upgrades as f32)
        .min(tuning.max_ability_chance);
    let mut unlock = |tier: u32, chance: f32| roll.score >= tier && rng.random::<f32>() < chance;

    let mut a = Abilities::default();

    if unlock(tiers.bounce, chance) {
        a.bounce_budget = 1;
        a.bounce_chance = 1.0;
    }
    if unlock(tiers.aim_on_bounce, chance) {
        a.aim_on_bounce = true;
    }
    if unlock(tiers.double_bounce, chance) {
        a.bounce_budget = 2;
        a.bounce_chance = 1.0;
    }
    if unlock(tiers.pursuit, chance) {
        a.pursuit_enabled = true;
        a.pursuit_strength = 0.4 * m;
        a.pursuit_interval = (0.3 / m).max(0.1);
    }
    if unlock(tiers.speed_boost, chance) {
        a.speed_multiplier = 1.5 + (m - 1.0) * 0.5;
    }
    if unlock(tiers.elite, chance * 0.8) {
        a.elite = true;
        a.bounce_budget = (2.0 + m).round() as u32;
        a.bounce_chance = 1.0;
        a.aim_on_bounce = true;
        a.pursuit_enabled = true;
        a.pursuit_strength = 0.6 * m;
        a.speed_multiplier = 1.3 + (m - 1.0) * 0.3;
    }
    if unlock(tiers.tracker, chance) {
        a.pursuit_enabled = true;
        a.pursuit_strength = 0.7 * m;
        a.pursuit_interval = (0.1 / m).max(0.05);
    }
    a
}

/// What a wall contact did to the hazard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallOutcome {
    Bounced,
    Destroyed,
}

#[derive(Debug, Clone)]
pub struct Hazard {
    pub id: u32,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub base_speed: f32,
    pub side: Side,
    pub abilities: Abilities,
    pub bounces_used: u32,
    /// Made on the first wall contact, then reused
    pub bounce_decided: Option<bool>,
    pub state: HazardState,
    pursuit_elapsed: f32,
}

impl Hazard {
    /// New hazard at `pos`, heading away from the edge it entered from
    pub fn spawn(
        id: u32,
        pos: Vec2,
        side: Side,
        base_speed: f32,
        radius: f32,
        abilities: Abilities,
    ) -> Self {
        let speed = base_speed * abilities.speed_multiplier;
        Self {
            id,
            pos,
            vel: Vec2::new(side.heading() * speed, 0.0),
            radius,
            base_speed,
            side,
            abilities,
            bounces_used: 0,
            bounce_decided: None,
            state: HazardState::Spawned,
            pursuit_elapsed: 0.0,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.base_speed * self.abilities.speed_multiplier
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state == HazardState::Destroyed
    }

    pub fn destroy(&mut self) {
        self.state = HazardState::Destroyed;
    }

    /// Integrate one scaled step, steering toward the player when pursuing
    pub fn advance(&mut self, dt: f32, player: Option<Vec2>) {
        if self.is_destroyed() {
            return;
        }
        self.state = HazardState::Moving;

        if self.abilities.pursuit_enabled {
            self.pursuit_elapsed += dt;
            if self.pursuit_elapsed >= self.abilities.pursuit_interval {
                if let Some(target) = player {
                    self.steer_toward(target, self.pursuit_elapsed);
                }
                self.pursuit_elapsed = 0.0;
            }
        }

        self.pos += self.vel * dt;
    }

    fn steer_toward(&mut self, target: Vec2, elapsed: f32) {
        let to_player = target - self.pos;
        let t = (self.abilities.pursuit_strength * elapsed).min(1.0);
        let dir = blend_direction(self.vel, to_player, t);
        if dir != Vec2::ZERO {
            self.vel = dir * self.speed();
        }
    }

    /// Resolve a wall contact with outward `normal`
    pub fn on_wall_contact<R: Rng + ?Sized>(
        &mut self,
        normal: Vec2,
        player: Option<Vec2>,
        tuning: &HazardTuning,
        rng: &mut R,
    ) -> WallOutcome {
        if self.is_destroyed() {
            return WallOutcome::Destroyed;
        }

        let chance = self.abilities.bounce_chance;
        let allowed = *self
            .bounce_decided
            .get_or_insert_with(|| rng.random::<f32>() < chance);

        if !allowed || self.bounces_used >= self.abilities.bounce_budget {
            self.destroy();
            return WallOutcome::Destroyed;
        }

        let speed = self.speed();
        let mut dir = reflect_velocity(self.vel, normal).normalize_or_zero();
        if dir == Vec2::ZERO {
            dir = normal;
        }
        if self.abilities.aim_on_bounce {
            if let Some(target) = player {
                dir = blend_direction(dir, target - self.pos, tuning.aim_blend);
            }
        }

        self.vel = dir * speed;
        self.pos += normal * tuning.wall_separation;
        self.bounces_used += 1;
        self.side = if self.vel.x >= 0.0 { Side::Left } else { Side::Right };
        WallOutcome::Bounced
    }

    /// Danger rating 1..=5 for presentation
    pub fn threat_level(&self) -> u8 {
        let a = &self.abilities;
        if a.elite {
            return 5;
        }
        let mut level = 1;
        if a.bounce_budget > 0 {
            level += 1;
        }
        if a.aim_on_bounce {
            level += 1;
        }
        if a.pursuit_enabled {
            level += 1;
        }
        if a.speed_multiplier > 1.0 {
            level += 1;
        }
        level.min(5)
    }
}
