//! Player collaborator: position, invincibility, owned modifiers and the
//! cooldowns of the active abilities

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::PLAYER_RADIUS;
use crate::tuning::Tuning;

/// Permanent upgrade bought at the market
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Upgrade {
    SpeedBoost,
    Swat,
    Teleport,
    BuffMagnet,
    MapExpansion,
    ScoreMultiplier,
    Invincibility,
    SlowMotion,
}

impl Upgrade {
    pub const ALL: [Upgrade; 8] = [
        Upgrade::SpeedBoost,
        Upgrade::Swat,
        Upgrade::Teleport,
        Upgrade::BuffMagnet,
        Upgrade::MapExpansion,
        Upgrade::ScoreMultiplier,
        Upgrade::Invincibility,
        Upgrade::SlowMotion,
    ];

    /// Market price in collected points
    pub fn base_cost(self) -> u32 {
        match self {
            Upgrade::SpeedBoost => 10,
            Upgrade::Swat => 15,
            Upgrade::Teleport => 20,
            Upgrade::BuffMagnet => 25,
            Upgrade::MapExpansion => 30,
            Upgrade::SlowMotion => 30,
            Upgrade::ScoreMultiplier => 35,
            Upgrade::Invincibility => 40,
        }
    }
}

/// Temporary effect granted by a buff pickup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuffKind {
    Invincibility,
    SpeedBoost,
    SlowMotion,
    ScoreMultiplier,
}

impl BuffKind {
    /// Slow motion outlives the time scale it sets, so it runs on real time
    pub fn uses_unscaled_time(self) -> bool {
        matches!(self, BuffKind::SlowMotion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveBuff {
    pub kind: BuffKind,
    pub remaining: f32,
}

/// Upgrades plus running buff effects
#[derive(Debug, Clone, Default)]
pub struct PlayerModifierSet {
    upgrades: BTreeSet<Upgrade>,
    buffs: Vec<ActiveBuff>,
}

impl PlayerModifierSet {
    pub fn has_upgrade(&self, upgrade: Upgrade) -> bool {
        self.upgrades.contains(&upgrade)
    }

    /// Returns false if already owned
    pub fn add_upgrade(&mut self, upgrade: Upgrade) -> bool {
        self.upgrades.insert(upgrade)
    }

    pub fn upgrades(&self) -> impl Iterator<Item = Upgrade> + '_ {
        self.upgrades.iter().copied()
    }

    pub fn upgrade_count(&self) -> usize {
        self.upgrades.len()
    }

    pub fn has_buff(&self, kind: BuffKind) -> bool {
        self.buffs.iter().any(|b| b.kind == kind)
    }

    pub fn buffs(&self) -> &[ActiveBuff] {
        &self.buffs
    }

    /// Start an effect, or refresh it if already running
    pub fn apply_buff(&mut self, kind: BuffKind, duration: f32) {
        match self.buffs.iter_mut().find(|b| b.kind == kind) {
            Some(active) => active.remaining = active.remaining.max(duration),
            None => self.buffs.push(ActiveBuff {
                kind,
                remaining: duration,
            }),
        }
    }

    /// Count down effects; returns the kinds that ran out
    pub fn tick_buffs(&mut self, scaled_dt: f32, unscaled_dt: f32) -> Vec<BuffKind> {
        let mut expired = Vec::new();
        self.buffs.retain_mut(|b| {
            b.remaining -= if b.kind.uses_unscaled_time() {
                unscaled_dt
            } else {
                scaled_dt
            };
            if b.remaining <= 0.0 {
                expired.push(b.kind);
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn clear(&mut self) {
        self.upgrades.clear();
        self.buffs.clear();
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    pub radius: f32,
    pub modifiers: PlayerModifierSet,
    pub alive: bool,
    /// Scaled game time at which swat can be used again
    pub swat_ready_at: f32,
    pub teleport_ready_at: f32,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Self {
            pos,
            radius: PLAYER_RADIUS,
            modifiers: PlayerModifierSet::default(),
            alive: true,
            swat_ready_at: 0.0,
            teleport_ready_at: 0.0,
        }
    }

    /// Owned and off cooldown. Only swat and teleport are triggered abilities.
    pub fn ability_ready(&self, ability: Upgrade, now: f32) -> bool {
        let ready_at = match ability {
            Upgrade::Swat => self.swat_ready_at,
            Upgrade::Teleport => self.teleport_ready_at,
            _ => return false,
        };
        self.modifiers.has_upgrade(ability) && now >= ready_at
    }

    pub fn is_invincible(&self) -> bool {
        self.modifiers.has_buff(BuffKind::Invincibility)
    }

    /// Movement speed with upgrade and buff multipliers applied
    pub fn speed(&self, tuning: &Tuning) -> f32 {
        let mut speed = tuning.player.speed;
        if self.modifiers.has_upgrade(Upgrade::SpeedBoost) {
            speed *= tuning.player.speed_upgrade;
        }
        if self.modifiers.has_buff(BuffKind::SpeedBoost) {
            speed *= tuning.buff.speed_boost;
        }
        speed
    }

    /// Points awarded per collectible point
    pub fn score_multiplier(&self, tuning: &Tuning) -> u32 {
        let mut multiplier = 1;
        if self.modifiers.has_upgrade(Upgrade::ScoreMultiplier) {
            multiplier *= tuning.player.score_upgrade.max(1);
        }
        if self.modifiers.has_buff(BuffKind::ScoreMultiplier) {
            multiplier *= tuning.buff.score_multiplier.max(1);
        }
        multiplier
    }

    /// Returns true if the hit landed
    pub fn take_damage(&mut self) -> bool {
        if self.is_invincible() || !self.alive {
            return false;
        }
        self.alive = false;
        true
    }
}
