//! Score-driven difficulty escalation
//!
//! Difficulty only ever goes up during a run. Score tiers raise the level,
//! owned upgrades scale the curves through a bonus factor, and an
//! independent legacy gate adds a small bump every few points. Spawners read
//! the resulting [`DifficultyState`] when they spawn; nothing is retroactive.

use super::player::PlayerModifierSet;
use super::threshold::ThresholdGate;
use crate::error::ConfigError;
use crate::tuning::{DifficultyTuning, HazardTuning};

/// Growth of the hazard ability multiplier per level
const MULTIPLIER_PER_LEVEL: f32 = 0.1;

/// Values read by the spawners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyState {
    pub level: u32,
    pub spawn_interval: f32,
    pub hazard_speed: f32,
    pub population_cap: u32,
}

#[derive(Debug, Clone)]
pub struct DifficultyScheduler {
    config: DifficultyTuning,
    tiers: ThresholdGate,
    legacy: ThresholdGate,
    level: u32,
    legacy_steps: u32,
    bonus: f32,
    /// Size of the upgrade set when modifiers were last applied
    known_upgrades: usize,
    state: DifficultyState,
}

impl DifficultyScheduler {
    pub fn new(config: &DifficultyTuning) -> Result<Self, ConfigError> {
        let tiers =
            ThresholdGate::optional("difficulty.tier_thresholds", config.tier_thresholds.clone())?;
        let legacy = ThresholdGate::periodic(config.legacy_bump_every, config.legacy_bump_count);
        let mut scheduler = Self {
            config: config.clone(),
            tiers,
            legacy,
            level: 0,
            legacy_steps: 0,
            bonus: 1.0,
            known_upgrades: 0,
            state: DifficultyState {
                level: 0,
                spawn_interval: config.base_spawn_interval,
                hazard_speed: config.base_hazard_speed,
                population_cap: config.base_population,
            },
        };
        scheduler.recompute();
        Ok(scheduler)
    }

    pub fn state(&self) -> DifficultyState {
        self.state
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn bonus(&self) -> f32 {
        self.bonus
    }

    /// Feed the latest cumulative score. Returns the new level if it changed.
    pub fn on_score_update(&mut self, score: u32) -> Option<u32> {
        let crossed = self.tiers.update(score);
        let bumps = self.legacy.update(score);
        if crossed.is_empty() && bumps.is_empty() {
            return None;
        }

        self.level += crossed.len() as u32;
        self.legacy_steps += bumps.len() as u32;
        self.recompute();

        if crossed.is_empty() {
            None
        } else {
            log::info!(
                "Difficulty level {} at score {} (interval {:.2}s, speed {:.2}, cap {})",
                self.level,
                score,
                self.state.spawn_interval,
                self.state.hazard_speed,
                self.state.population_cap
            );
            Some(self.level)
        }
    }

    /// Re-apply the upgrade bonus. A purchase that pushes the bonus past the
    /// aggression threshold also forces one extra tier.
    pub fn on_modifiers_changed(&mut self, modifiers: &PlayerModifierSet) -> Option<u32> {
        let bonus_table = &self.config.upgrade_bonus;
        self.bonus = 1.0
            + modifiers
                .upgrades()
                .map(|u| bonus_table.for_upgrade(u))
                .sum::<f32>();

        let count = modifiers.upgrade_count();
        let grew = count > self.known_upgrades;
        self.known_upgrades = count;

        if grew && self.bonus > self.config.aggression_threshold {
            log::info!("Upgrade bonus {:.2} forces an extra difficulty tier", self.bonus);
            return Some(self.force_increase());
        }
        self.recompute();
        None
    }

    /// Advance one tier regardless of score
    pub fn force_increase(&mut self) -> u32 {
        self.level += 1;
        self.recompute();
        self.level
    }

    pub fn reset(&mut self) {
        self.tiers.reset();
        self.legacy.reset();
        self.level = 0;
        self.legacy_steps = 0;
        self.bonus = 1.0;
        self.known_upgrades = 0;
        self.recompute();
    }

    /// Per-ability unlock chance at the current level
    pub fn ability_chance(&self, hazard: &HazardTuning) -> f32 {
        (hazard.base_ability_chance + hazard.chance_per_level * self.level as f32)
            .min(hazard.max_ability_chance)
    }

    /// Scales ability strengths as the run progresses
    pub fn difficulty_multiplier(&self) -> f32 {
        1.0 + MULTIPLIER_PER_LEVEL * self.level as f32
    }

    fn recompute(&mut self) {
        let c = &self.config;
        let growth = 1.0 + self.level as f32 * c.step_factor;
        let legacy = self.legacy_steps as f32;

        let interval =
            c.base_spawn_interval / (growth * self.bonus) - legacy * c.legacy_interval_decrease;
        let speed = c.base_hazard_speed * growth * self.bonus + legacy * c.legacy_speed_increment;
        self.state = DifficultyState {
            level: self.level,
            spawn_interval: interval.max(c.min_spawn_interval),
            hazard_speed: speed,
            population_cap: c
                .base_population
                .saturating_add(self.level)
                .min(c.max_population),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::player::Upgrade;
    use proptest::prelude::*;

    fn no_legacy() -> DifficultyTuning {
        DifficultyTuning {
            legacy_bump_count: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_initial_state_is_base() {
        let s = DifficultyScheduler::new(&DifficultyTuning::default()).unwrap();
        assert_eq!(
            s.state(),
            DifficultyState {
                level: 0,
                spawn_interval: 2.0,
                hazard_speed: 5.0,
                population_cap: 3,
            }
        );
    }

    #[test]
    fn test_tier_jump_counts_every_tier() {
        let mut s = DifficultyScheduler::new(&no_legacy()).unwrap();
        assert_eq!(s.on_score_update(14), None);
        assert_eq!(s.on_score_update(31), Some(2));
        let state = s.state();
        assert!((state.spawn_interval - 2.0 / 1.4).abs() < 1e-4);
        assert!((state.hazard_speed - 7.0).abs() < 1e-4);
        assert_eq!(state.population_cap, 5);
        assert_eq!(s.on_score_update(31), None);
    }

    #[test]
    fn test_outputs_clamped() {
        let mut s = DifficultyScheduler::new(&DifficultyTuning::default()).unwrap();
        s.on_score_update(10_000);
        for _ in 0..20 {
            s.force_increase();
        }
        let state = s.state();
        assert_eq!(state.spawn_interval, 0.5);
        assert_eq!(state.population_cap, 8);
        assert_eq!(state.level, 26);
    }

    #[test]
    fn test_legacy_bump_every_five_points() {
        let mut s = DifficultyScheduler::new(&DifficultyTuning::default()).unwrap();
        // Two bumps, no tier
        assert_eq!(s.on_score_update(10), None);
        let state = s.state();
        assert!((state.spawn_interval - 1.8).abs() < 1e-4);
        assert!((state.hazard_speed - 6.0).abs() < 1e-4);
        assert_eq!(state.level, 0);
    }

    #[test]
    fn test_purchase_bonus_and_forced_tier() {
        let mut s = DifficultyScheduler::new(&no_legacy()).unwrap();
        let mut mods = PlayerModifierSet::default();

        mods.add_upgrade(Upgrade::Swat);
        assert_eq!(s.on_modifiers_changed(&mods), None);
        assert!((s.bonus() - 1.15).abs() < 1e-5);
        assert!((s.state().hazard_speed - 5.75).abs() < 1e-4);

        mods.add_upgrade(Upgrade::MapExpansion);
        assert_eq!(s.on_modifiers_changed(&mods), Some(1));

        // Re-applying the same set does not force again
        assert_eq!(s.on_modifiers_changed(&mods), None);
        assert_eq!(s.level(), 1);
    }

    #[test]
    fn test_reset_restores_base() {
        let mut s = DifficultyScheduler::new(&DifficultyTuning::default()).unwrap();
        s.on_score_update(95);
        s.force_increase();
        s.reset();
        assert_eq!(s.level(), 0);
        assert_eq!(s.state().spawn_interval, 2.0);
        assert_eq!(s.on_score_update(15), Some(1));
    }

    #[test]
    fn test_ability_chance_caps() {
        let hazard = HazardTuning::default();
        let mut s = DifficultyScheduler::new(&DifficultyTuning::default()).unwrap();
        assert!((s.ability_chance(&hazard) - 0.25).abs() < 1e-6);
        for _ in 0..20 {
            s.force_increase();
        }
        assert_eq!(s.ability_chance(&hazard), 0.75);
        assert!((s.difficulty_multiplier() - 3.0).abs() < 1e-5);
    }

    proptest! {
        #[test]
        fn test_monotonic_over_rising_score(
            steps in proptest::collection::vec(0u32..25, 1..60),
        ) {
            let mut s = DifficultyScheduler::new(&DifficultyTuning::default()).unwrap();
            let mut score = 0u32;
            let mut prev = s.state();
            for step in steps {
                score += step;
                s.on_score_update(score);
                let next = s.state();
                prop_assert!(next.level >= prev.level);
                prop_assert!(next.spawn_interval <= prev.spawn_interval);
                prop_assert!(next.hazard_speed >= prev.hazard_speed);
                prop_assert!(next.population_cap >= prev.population_cap);
                prev = next;
            }
        }
    }
}
