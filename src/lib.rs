//! Cheese Hunter - challenge engine for a top-down arcade chase game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (arena, placement, difficulty, hazards, spawners)
//! - `tuning`: Data-driven game balance
//! - `highscores`: Leaderboard handed to the persistence layer
//! - `error`: Configuration and purchase errors

pub mod error;
pub mod highscores;
pub mod sim;
pub mod tuning;

pub use error::{ConfigError, PurchaseError};
pub use highscores::HighScores;
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, one gameplay frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Collider radii (world units)
    pub const PLAYER_RADIUS: f32 = 0.35;
    pub const HAZARD_RADIUS: f32 = 0.2;
    pub const COLLECTIBLE_RADIUS: f32 = 0.1;
    pub const BUFF_RADIUS: f32 = 0.4;
    pub const MARKET_RADIUS: f32 = 0.5;
    pub const ESCAPE_HOLE_RADIUS: f32 = 1.5;

    /// Offset of the placement fallback from the spawn center
    pub const FALLBACK_OFFSET_Y: f32 = 3.0;
}

/// Move `from` toward `to` by at most `max_step`
#[inline]
pub fn move_towards(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let delta = to - from;
    let dist = delta.length();
    if dist <= max_step || dist <= f32::EPSILON {
        to
    } else {
        from + delta / dist * max_step
    }
}

/// Blend a direction toward a target direction and renormalize.
///
/// Falls back to `dir` when the blend cancels out.
#[inline]
pub fn blend_direction(dir: Vec2, target: Vec2, t: f32) -> Vec2 {
    let dir = dir.normalize_or_zero();
    let blended = dir.lerp(target.normalize_or_zero(), t.clamp(0.0, 1.0));
    blended.try_normalize().unwrap_or(dir)
}
