//! Spawn orchestrators
//!
//! One orchestrator per entity kind. Each owns its live registry, its timer
//! list and (where it has one) its threshold gate, and decides whether,
//! where and with what to instantiate. Other registries are only seen as
//! read-only position snapshots.

pub mod buff;
pub mod collectible;
pub mod escape_hole;
pub mod hazard;
pub mod market;

pub use buff::{Buff, BuffSpawner};
pub use collectible::{Collectible, CollectibleSpawner};
pub use escape_hole::{EscapeHole, EscapeHoleSpawner};
pub use hazard::{HazardSpawnInputs, HazardSpawner};
pub use market::{Market, MarketSpawner};

use glam::Vec2;
use rand_pcg::Pcg32;

use super::arena::Arena;
use super::collision::ObstacleMap;
use super::placement::{
    CandidateGenerator, PlacementResult, PlacementValidator, SpawnPlacer, SpawnRequest,
};
use super::state::GameEvent;
use crate::tuning::Tuning;

/// Shared world view handed to an orchestrator for one update
pub struct SpawnContext<'a> {
    /// `None` until the arena has been (re-)detected
    pub arena: Option<&'a Arena>,
    pub obstacles: &'a ObstacleMap,
    pub tuning: &'a Tuning,
    pub player: Option<Vec2>,
    pub rng: &'a mut Pcg32,
    pub events: &'a mut Vec<GameEvent>,
    pub next_entity_id: &'a mut u32,
}

impl SpawnContext<'_> {
    pub fn alloc_id(&mut self) -> u32 {
        let id = *self.next_entity_id;
        *self.next_entity_id += 1;
        id
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Spawn center: the arena center once detected
    pub fn center(&self) -> Option<Vec2> {
        self.arena.map(|a| a.center)
    }

    /// Run a placement search. `None` when the arena is not known yet; the
    /// caller skips this cycle.
    pub fn place<G: CandidateGenerator>(
        &mut self,
        request: &SpawnRequest,
        generator: &G,
    ) -> Option<PlacementResult> {
        let Some(arena) = self.arena else {
            log::debug!("Skipping {:?} spawn: arena not detected", request.kind);
            return None;
        };
        let clearance = self.tuning.arena.obstacle_clearance;
        let validator = PlacementValidator::new(arena, self.obstacles, clearance);
        let placer = SpawnPlacer::new(self.tuning.max_placement_attempts);
        Some(placer.find_position(request, &validator, generator, &mut *self.rng))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    use super::SpawnContext;
    use crate::sim::arena::Arena;
    use crate::sim::collision::{LayerMask, ObstacleMap};
    use crate::sim::state::GameEvent;
    use crate::tuning::Tuning;

    /// Owned backing storage for a [`SpawnContext`]
    pub struct Fixture {
        pub arena: Option<Arena>,
        pub obstacles: ObstacleMap,
        pub tuning: Tuning,
        pub player: Option<Vec2>,
        pub rng: Pcg32,
        pub events: Vec<GameEvent>,
        pub next_id: u32,
    }

    impl Fixture {
        pub fn new() -> Self {
            let obstacles = ObstacleMap::walled_box(Vec2::ZERO, Vec2::new(16.0, 10.0), 1.0);
            let arena = Arena::detect(Vec2::ZERO, 50.0, &obstacles, LayerMask::WALLS, 0.1);
            Self {
                arena: Some(arena),
                obstacles,
                tuning: Tuning::standard(),
                player: Some(Vec2::ZERO),
                rng: Pcg32::seed_from_u64(9),
                events: Vec::new(),
                next_id: 1,
            }
        }

        pub fn ctx(&mut self) -> SpawnContext<'_> {
            SpawnContext {
                arena: self.arena.as_ref(),
                obstacles: &self.obstacles,
                tuning: &self.tuning,
                player: self.player,
                rng: &mut self.rng,
                events: &mut self.events,
                next_entity_id: &mut self.next_id,
            }
        }
    }
}
