//! Data-driven game balance
//!
//! Every spawner, the difficulty scheduler and the hazard ability table read
//! their numbers from here. Defaults reproduce the shipped game balance;
//! a JSON file can override any subset of fields.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::{BuffKind, Upgrade};

/// Arena probing and obstacle clearance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    /// Maximum ray length when probing for walls (also the open-side fallback)
    pub max_probe_distance: f32,
    /// Inward offset applied to every detected wall
    pub wall_padding: f32,
    /// Radius of the prop-overlap test around a candidate point
    pub obstacle_clearance: f32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            max_probe_distance: 50.0,
            wall_padding: 0.1,
            obstacle_clearance: 1.0,
        }
    }
}

/// Per-upgrade difficulty increments
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeBonuses {
    pub speed_boost: f32,
    pub swat: f32,
    pub teleport: f32,
    pub buff_magnet: f32,
    pub map_expansion: f32,
    pub score_multiplier: f32,
    pub invincibility: f32,
    pub slow_motion: f32,
}

impl Default for UpgradeBonuses {
    fn default() -> Self {
        Self {
            speed_boost: 0.10,
            swat: 0.15,
            teleport: 0.15,
            buff_magnet: 0.10,
            map_expansion: 0.20,
            score_multiplier: 0.05,
            invincibility: 0.05,
            slow_motion: 0.05,
        }
    }
}

impl UpgradeBonuses {
    /// Increment contributed by one owned upgrade
    pub fn for_upgrade(&self, upgrade: Upgrade) -> f32 {
        match upgrade {
            Upgrade::SpeedBoost => self.speed_boost,
            Upgrade::Swat => self.swat,
            Upgrade::Teleport => self.teleport,
            Upgrade::BuffMagnet => self.buff_magnet,
            Upgrade::MapExpansion => self.map_expansion,
            Upgrade::ScoreMultiplier => self.score_multiplier,
            Upgrade::Invincibility => self.invincibility,
            Upgrade::SlowMotion => self.slow_motion,
        }
    }

    fn values(&self) -> [(&'static str, f32); 8] {
        [
            ("upgrade_bonus.speed_boost", self.speed_boost),
            ("upgrade_bonus.swat", self.swat),
            ("upgrade_bonus.teleport", self.teleport),
            ("upgrade_bonus.buff_magnet", self.buff_magnet),
            ("upgrade_bonus.map_expansion", self.map_expansion),
            ("upgrade_bonus.score_multiplier", self.score_multiplier),
            ("upgrade_bonus.invincibility", self.invincibility),
            ("upgrade_bonus.slow_motion", self.slow_motion),
        ]
    }
}

/// Score tiers and the curves they drive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyTuning {
    pub tier_thresholds: Vec<u32>,
    pub base_spawn_interval: f32,
    pub min_spawn_interval: f32,
    pub base_hazard_speed: f32,
    /// Per-level growth of the difficulty multiplier
    pub step_factor: f32,
    pub base_population: u32,
    pub max_population: u32,
    /// Modifier bonus above which a purchase forces an extra tier
    pub aggression_threshold: f32,
    pub upgrade_bonus: UpgradeBonuses,
    /// Legacy bump: one step every N points, for at most `legacy_bump_count` steps
    pub legacy_bump_every: u32,
    pub legacy_bump_count: u32,
    pub legacy_interval_decrease: f32,
    pub legacy_speed_increment: f32,
}

impl Default for DifficultyTuning {
    fn default() -> Self {
        Self {
            tier_thresholds: vec![15, 30, 45, 60, 75, 90],
            base_spawn_interval: 2.0,
            min_spawn_interval: 0.5,
            base_hazard_speed: 5.0,
            step_factor: 0.2,
            base_population: 3,
            max_population: 8,
            aggression_threshold: 1.2,
            upgrade_bonus: UpgradeBonuses::default(),
            legacy_bump_every: 5,
            legacy_bump_count: 20,
            legacy_interval_decrease: 0.1,
            legacy_speed_increment: 0.5,
        }
    }
}

/// Minimum score for each hazard capability roll
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityTiers {
    pub bounce: u32,
    pub aim_on_bounce: u32,
    pub double_bounce: u32,
    pub pursuit: u32,
    pub speed_boost: u32,
    pub elite: u32,
    pub tracker: u32,
}

impl Default for AbilityTiers {
    fn default() -> Self {
        Self {
            bounce: 30,
            aim_on_bounce: 40,
            double_bounce: 60,
            pursuit: 70,
            speed_boost: 80,
            elite: 100,
            tracker: 120,
        }
    }
}

/// Hazard spawner and agent behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HazardTuning {
    pub spawn_radius: f32,
    pub min_distance_from_player: f32,
    /// Distance kept from other hazards and from escape holes
    pub peer_distance: f32,
    /// Padding against left/right walls
    pub horizontal_padding: f32,
    /// Extra padding against top/bottom walls
    pub vertical_avoidance: f32,
    /// Maximum vertical component of the edge spawn direction
    pub vertical_deviation: f32,
    pub warning_duration: f32,
    /// Blend toward the player applied after an aimed bounce
    pub aim_blend: f32,
    /// Distance a bouncing hazard is pushed off the wall
    pub wall_separation: f32,
    pub base_ability_chance: f32,
    pub chance_per_level: f32,
    pub max_ability_chance: f32,
    /// Chance bonus per upgrade the player owns
    pub chance_per_upgrade: f32,
    pub abilities: AbilityTiers,
}

impl Default for HazardTuning {
    fn default() -> Self {
        Self {
            spawn_radius: 8.0,
            min_distance_from_player: 2.0,
            peer_distance: 3.0,
            horizontal_padding: 0.5,
            vertical_avoidance: 1.5,
            vertical_deviation: 0.3,
            warning_duration: 1.0,
            aim_blend: 0.6,
            wall_separation: 0.3,
            base_ability_chance: 0.25,
            chance_per_level: 0.05,
            max_ability_chance: 0.75,
            chance_per_upgrade: 0.05,
            abilities: AbilityTiers::default(),
        }
    }
}

/// Cheese pickups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectibleTuning {
    pub spawn_radius: f32,
    pub min_distance_from_player: f32,
    pub peer_distance: f32,
    /// Reduced padding against top/bottom walls
    pub vertical_allowance: f32,
    pub points: u32,
}

impl Default for CollectibleTuning {
    fn default() -> Self {
        Self {
            spawn_radius: 8.0,
            min_distance_from_player: 2.0,
            peer_distance: 2.0,
            vertical_allowance: 0.5,
            points: 1,
        }
    }
}

/// Temporary buffs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffTuning {
    pub kinds: Vec<BuffKind>,
    pub spawn_radius: f32,
    pub min_distance_from_player: f32,
    pub peer_distance: f32,
    pub min_interval: f32,
    pub max_interval: f32,
    pub max_live: u32,
    /// Delay between the pre-spawn effect and the buff appearing
    pub pre_effect_delay: f32,
    pub lifetime: f32,
    pub effect_duration: f32,
    pub speed_boost: f32,
    pub slow_motion_scale: f32,
    /// Extra real time before the slow-motion safety restore fires
    pub safety_margin: f32,
    pub score_multiplier: u32,
    pub magnet_range: f32,
    pub magnet_strength: f32,
    /// Spawn-rate and cap factor applied once the magnet upgrade is owned
    pub magnet_spawn_rate: f32,
}

impl Default for BuffTuning {
    fn default() -> Self {
        Self {
            kinds: vec![
                BuffKind::Invincibility,
                BuffKind::SpeedBoost,
                BuffKind::SlowMotion,
                BuffKind::ScoreMultiplier,
            ],
            spawn_radius: 12.0,
            min_distance_from_player: 3.0,
            peer_distance: 2.0,
            min_interval: 15.0,
            max_interval: 30.0,
            max_live: 2,
            pre_effect_delay: 1.0,
            lifetime: 20.0,
            effect_duration: 5.0,
            speed_boost: 1.5,
            slow_motion_scale: 0.5,
            safety_margin: 1.0,
            score_multiplier: 2,
            magnet_range: 3.0,
            magnet_strength: 3.0,
            magnet_spawn_rate: 0.7,
        }
    }
}

/// Player movement, permanent upgrade effects and active abilities
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub speed: f32,
    pub speed_upgrade: f32,
    pub score_upgrade: u32,
    /// Seconds between swats (clears every live hazard)
    pub swat_cooldown: f32,
    pub teleport_cooldown: f32,
    /// Radius around a teleport target that must be free of walls
    pub teleport_clearance: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 5.0,
            speed_upgrade: 1.5,
            score_upgrade: 2,
            swat_cooldown: 30.0,
            teleport_cooldown: 15.0,
            teleport_clearance: 0.5,
        }
    }
}

/// Upgrade market
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketTuning {
    pub thresholds: Vec<u32>,
    pub lifetime: f32,
    /// Real seconds a shop session stays open without a purchase
    pub session_duration: f32,
    pub spawn_radius: f32,
    pub min_distance_from_player: f32,
    pub peer_distance: f32,
}

impl Default for MarketTuning {
    fn default() -> Self {
        Self {
            thresholds: vec![5, 15, 30, 50, 80],
            lifetime: 30.0,
            session_duration: 8.0,
            spawn_radius: 12.0,
            min_distance_from_player: 2.0,
            peer_distance: 2.0,
        }
    }
}

/// Escape holes (push-your-luck exit)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscapeHoleTuning {
    pub thresholds: Vec<u32>,
    /// Each later hole costs `threshold * multiplier^index`
    pub requirement_multiplier: f32,
    pub spawn_radius: f32,
    pub min_distance_from_player: f32,
    pub peer_distance: f32,
    pub hole_distance: f32,
    pub lifetime: f32,
    /// Holes from this threshold index on never time out
    pub permanent_from_index: usize,
}

impl Default for EscapeHoleTuning {
    fn default() -> Self {
        Self {
            thresholds: vec![50, 100, 200, 300],
            requirement_multiplier: 1.2,
            spawn_radius: 10.0,
            min_distance_from_player: 4.0,
            peer_distance: 2.0,
            hole_distance: 3.0,
            lifetime: 60.0,
            permanent_from_index: 2,
        }
    }
}

impl EscapeHoleTuning {
    /// Thresholds after the progressive requirement is applied
    pub fn effective_thresholds(&self) -> Vec<u32> {
        self.thresholds
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                if i == 0 {
                    t
                } else {
                    (t as f32 * self.requirement_multiplier.powi(i as i32)).round() as u32
                }
            })
            .collect()
    }
}

/// Complete balance sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub arena: ArenaTuning,
    pub max_placement_attempts: u32,
    pub map_expansion_factor: f32,
    pub player: PlayerTuning,
    pub difficulty: DifficultyTuning,
    pub hazard: HazardTuning,
    pub collectible: CollectibleTuning,
    pub buff: BuffTuning,
    pub market: MarketTuning,
    pub escape_hole: EscapeHoleTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            arena: ArenaTuning::default(),
            max_placement_attempts: 15,
            map_expansion_factor: 1.5,
            player: PlayerTuning::default(),
            difficulty: DifficultyTuning::default(),
            hazard: HazardTuning::default(),
            collectible: CollectibleTuning::default(),
            buff: BuffTuning::default(),
            market: MarketTuning::default(),
            escape_hole: EscapeHoleTuning::default(),
        }
    }
}

impl Tuning {
    /// The shipped game balance
    pub fn standard() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON balance file. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Load from disk; fails fast on unreadable or invalid files
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Reject balance sheets that indicate a setup bug
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.arena;
        positive("arena.max_probe_distance", a.max_probe_distance)?;
        non_negative("arena.wall_padding", a.wall_padding)?;
        non_negative("arena.obstacle_clearance", a.obstacle_clearance)?;
        positive("map_expansion_factor", self.map_expansion_factor)?;
        if self.max_placement_attempts == 0 {
            return Err(ConfigError::NotPositive {
                name: "max_placement_attempts",
                value: 0.0,
            });
        }

        let d = &self.difficulty;
        ascending("difficulty.tier_thresholds", &d.tier_thresholds, true)?;
        positive("difficulty.base_spawn_interval", d.base_spawn_interval)?;
        positive("difficulty.min_spawn_interval", d.min_spawn_interval)?;
        if d.min_spawn_interval > d.base_spawn_interval {
            return Err(ConfigError::InvertedRange {
                name: "difficulty spawn interval",
                min: d.min_spawn_interval,
                max: d.base_spawn_interval,
            });
        }
        positive("difficulty.base_hazard_speed", d.base_hazard_speed)?;
        non_negative("difficulty.step_factor", d.step_factor)?;
        if d.max_population < d.base_population {
            return Err(ConfigError::CapBelowBase {
                base: d.base_population,
                max: d.max_population,
            });
        }
        non_negative("difficulty.aggression_threshold", d.aggression_threshold)?;
        for (name, value) in d.upgrade_bonus.values() {
            non_negative(name, value)?;
        }
        non_negative("difficulty.legacy_interval_decrease", d.legacy_interval_decrease)?;
        non_negative("difficulty.legacy_speed_increment", d.legacy_speed_increment)?;

        let h = &self.hazard;
        positive("hazard.spawn_radius", h.spawn_radius)?;
        non_negative("hazard.min_distance_from_player", h.min_distance_from_player)?;
        non_negative("hazard.peer_distance", h.peer_distance)?;
        non_negative("hazard.horizontal_padding", h.horizontal_padding)?;
        non_negative("hazard.vertical_avoidance", h.vertical_avoidance)?;
        non_negative("hazard.vertical_deviation", h.vertical_deviation)?;
        non_negative("hazard.warning_duration", h.warning_duration)?;
        unit("hazard.aim_blend", h.aim_blend)?;
        non_negative("hazard.wall_separation", h.wall_separation)?;
        unit("hazard.base_ability_chance", h.base_ability_chance)?;
        non_negative("hazard.chance_per_level", h.chance_per_level)?;
        unit("hazard.max_ability_chance", h.max_ability_chance)?;
        non_negative("hazard.chance_per_upgrade", h.chance_per_upgrade)?;

        let c = &self.collectible;
        positive("collectible.spawn_radius", c.spawn_radius)?;
        non_negative("collectible.min_distance_from_player", c.min_distance_from_player)?;
        non_negative("collectible.peer_distance", c.peer_distance)?;
        non_negative("collectible.vertical_allowance", c.vertical_allowance)?;

        let b = &self.buff;
        if b.kinds.is_empty() {
            return Err(ConfigError::NoBuffKinds);
        }
        positive("buff.spawn_radius", b.spawn_radius)?;
        positive("buff.min_interval", b.min_interval)?;
        positive("buff.max_interval", b.max_interval)?;
        if b.min_interval > b.max_interval {
            return Err(ConfigError::InvertedRange {
                name: "buff spawn interval",
                min: b.min_interval,
                max: b.max_interval,
            });
        }
        non_negative("buff.pre_effect_delay", b.pre_effect_delay)?;
        positive("buff.lifetime", b.lifetime)?;
        positive("buff.effect_duration", b.effect_duration)?;
        positive("buff.speed_boost", b.speed_boost)?;
        positive("buff.slow_motion_scale", b.slow_motion_scale)?;
        non_negative("buff.safety_margin", b.safety_margin)?;
        non_negative("buff.magnet_range", b.magnet_range)?;
        non_negative("buff.magnet_strength", b.magnet_strength)?;
        positive("buff.magnet_spawn_rate", b.magnet_spawn_rate)?;

        positive("player.speed", self.player.speed)?;
        positive("player.speed_upgrade", self.player.speed_upgrade)?;
        non_negative("player.swat_cooldown", self.player.swat_cooldown)?;
        non_negative("player.teleport_cooldown", self.player.teleport_cooldown)?;
        non_negative("player.teleport_clearance", self.player.teleport_clearance)?;

        let m = &self.market;
        ascending("market.thresholds", &m.thresholds, false)?;
        positive("market.lifetime", m.lifetime)?;
        positive("market.session_duration", m.session_duration)?;
        positive("market.spawn_radius", m.spawn_radius)?;

        let e = &self.escape_hole;
        ascending("escape_hole.thresholds", &e.thresholds, false)?;
        ascending("escape_hole.effective_thresholds", &e.effective_thresholds(), false)?;
        positive("escape_hole.requirement_multiplier", e.requirement_multiplier)?;
        positive("escape_hole.spawn_radius", e.spawn_radius)?;
        positive("escape_hole.lifetime", e.lifetime)?;

        Ok(())
    }
}

fn non_negative(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidNumber { name, value })
    }
}

fn positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    non_negative(name, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

fn unit(name: &'static str, value: f32) -> Result<(), ConfigError> {
    non_negative(name, value)?;
    if value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::InvertedRange {
            name,
            min: value,
            max: 1.0,
        })
    }
}

/// Thresholds must be strictly ascending; `allow_empty` for optional gates
pub(crate) fn ascending(
    name: &'static str,
    thresholds: &[u32],
    allow_empty: bool,
) -> Result<(), ConfigError> {
    if thresholds.is_empty() && !allow_empty {
        return Err(ConfigError::EmptyThresholds { name });
    }
    for pair in thresholds.windows(2) {
        if pair[1] <= pair[0] {
            return Err(ConfigError::UnorderedThresholds {
                name,
                previous: pair[0],
                next: pair[1],
            });
        }
    }
    Ok(())
}
