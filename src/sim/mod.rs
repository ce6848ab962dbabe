//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod arena;
pub mod collision;
pub mod difficulty;
pub mod hazard;
pub mod placement;
pub mod player;
pub mod spawners;
pub mod state;
pub mod threshold;
pub mod tick;
pub mod timers;

pub use arena::Arena;
pub use collision::{CollisionResult, Layer, LayerMask, Obstacle, ObstacleMap, reflect_velocity};
pub use difficulty::{DifficultyScheduler, DifficultyState};
pub use hazard::{Abilities, Hazard, HazardState, Side};
pub use placement::{PlacementResult, PlacementValidator, SpawnKind, SpawnPlacer, SpawnRequest};
pub use player::{BuffKind, Player, PlayerModifierSet, Upgrade};
pub use state::{DestroyCause, GameEvent, GamePhase, GameState, Gate, Score, ShopSession, World};
pub use threshold::ThresholdGate;
pub use tick::{TickInput, tick};
pub use timers::{Clock, GameClock, TimerList};
