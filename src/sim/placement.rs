//! Spawn placement
//!
//! A bounded search: draw candidate points from a generator, keep the first
//! one the validator accepts, otherwise fall back to a fixed offset from the
//! spawn center. Never loops beyond the attempt budget.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::arena::Arena;
use super::collision::{LayerMask, ObstacleMap};
use crate::consts::FALLBACK_OFFSET_Y;

/// What is being placed (for logging and per-kind rules)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnKind {
    Collectible,
    Hazard,
    Buff,
    Market,
    EscapeHole,
}

/// How a candidate is checked against the arena walls
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundsRule {
    /// One ray from the arena center toward the point, extended by `padding`
    Radial { padding: f32 },
    /// Separate rays along x and y with per-axis padding
    Axis { horizontal: f32, vertical: f32 },
}

impl Default for BoundsRule {
    fn default() -> Self {
        BoundsRule::Radial { padding: 0.5 }
    }
}

/// Positions a candidate must keep clear of
#[derive(Debug, Clone, Default)]
pub struct PeerGroup {
    pub positions: Vec<Vec2>,
    pub min_distance: f32,
}

impl PeerGroup {
    pub fn new(positions: Vec<Vec2>, min_distance: f32) -> Self {
        Self {
            positions,
            min_distance,
        }
    }

    fn is_clear(&self, point: Vec2) -> bool {
        let min_sq = self.min_distance * self.min_distance;
        self.positions
            .iter()
            .all(|p| p.distance_squared(point) >= min_sq)
    }
}

/// Parameters of one placement search
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub kind: SpawnKind,
    pub center: Vec2,
    pub radius: f32,
    pub min_distance_from_player: f32,
    /// `None` skips the player-distance check
    pub player: Option<Vec2>,
    pub peers: Vec<PeerGroup>,
    pub bounds: BoundsRule,
}

impl SpawnRequest {
    pub fn new(kind: SpawnKind, center: Vec2, radius: f32) -> Self {
        Self {
            kind,
            center,
            radius,
            min_distance_from_player: 0.0,
            player: None,
            peers: Vec::new(),
            bounds: BoundsRule::default(),
        }
    }

    pub fn with_player(mut self, player: Option<Vec2>, min_distance: f32) -> Self {
        self.player = player;
        self.min_distance_from_player = min_distance;
        self
    }

    pub fn with_peers(mut self, positions: Vec<Vec2>, min_distance: f32) -> Self {
        self.peers.push(PeerGroup::new(positions, min_distance));
        self
    }

    pub fn with_bounds(mut self, bounds: BoundsRule) -> Self {
        self.bounds = bounds;
        self
    }
}

/// Outcome of a placement search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementResult {
    pub position: Vec2,
    /// False when the fallback position was used
    pub valid: bool,
    pub attempts_used: u32,
}

/// Pure validity predicate over candidate points
pub struct PlacementValidator<'a> {
    pub arena: &'a Arena,
    pub obstacles: &'a ObstacleMap,
    /// Radius of the prop-overlap probe
    pub obstacle_clearance: f32,
}

impl<'a> PlacementValidator<'a> {
    pub fn new(arena: &'a Arena, obstacles: &'a ObstacleMap, obstacle_clearance: f32) -> Self {
        Self {
            arena,
            obstacles,
            obstacle_clearance,
        }
    }

    pub fn is_valid(&self, point: Vec2, request: &SpawnRequest) -> bool {
        if !self.arena.contains(point) {
            return false;
        }
        if !self.within_walls(point, request.bounds) {
            return false;
        }
        if self
            .obstacles
            .overlaps_circle(point, self.obstacle_clearance, LayerMask::PROPS)
        {
            return false;
        }
        if let Some(player) = request.player {
            let min = request.min_distance_from_player;
            if player.distance_squared(point) < min * min {
                return false;
            }
        }
        request.peers.iter().all(|group| group.is_clear(point))
    }

    fn within_walls(&self, point: Vec2, rule: BoundsRule) -> bool {
        let origin = self.arena.center;
        let blocked = |dir: Vec2, reach: f32| {
            self.obstacles
                .raycast(origin, dir, reach, LayerMask::WALLS)
                .is_some()
        };

        match rule {
            BoundsRule::Radial { padding } => {
                let offset = point - origin;
                let dist = offset.length();
                dist <= f32::EPSILON || !blocked(offset, dist + padding)
            }
            BoundsRule::Axis {
                horizontal,
                vertical,
            } => {
                let d = point - origin;
                let x_clear = d.x.abs() <= f32::EPSILON
                    || !blocked(Vec2::new(d.x.signum(), 0.0), d.x.abs() + horizontal);
                let y_clear = d.y.abs() <= f32::EPSILON
                    || !blocked(Vec2::new(0.0, d.y.signum()), d.y.abs() + vertical);
                x_clear && y_clear
            }
        }
    }
}

/// Source of candidate points around a spawn center
pub trait CandidateGenerator {
    fn sample<R: Rng + ?Sized>(&self, center: Vec2, radius: f32, rng: &mut R) -> Vec2;
}

/// Uniform point in a disk, kept out of the innermost 30%
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskGenerator;

/// Fraction of the radius kept clear around the spawn center
const DISK_INNER_FRACTION: f32 = 0.3;

impl CandidateGenerator for DiskGenerator {
    fn sample<R: Rng + ?Sized>(&self, center: Vec2, radius: f32, rng: &mut R) -> Vec2 {
        let angle = rng.random_range(0.0..std::f32::consts::TAU);
        let dist = (radius * rng.random::<f32>().sqrt()).max(radius * DISK_INNER_FRACTION);
        center + Vec2::from_angle(angle) * dist
    }
}

/// Left or right edge of the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Side::Right
        } else {
            Side::Left
        }
    }

    /// Sign of x from the center toward this edge
    pub fn outward(self) -> f32 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    /// Direction of travel away from this edge
    pub fn heading(self) -> f32 {
        -self.outward()
    }
}

/// Left or right edge of a disk, for things that cross the arena sideways
#[derive(Debug, Clone, Copy)]
pub struct EdgeGenerator {
    /// Maximum vertical component of the (unnormalized) direction
    pub vertical_deviation: f32,
    /// Minimum distance as a fraction of the radius
    pub inner_fraction: f32,
    /// Fixed edge; `None` picks one per sample
    pub side: Option<Side>,
}

impl Default for EdgeGenerator {
    fn default() -> Self {
        Self {
            vertical_deviation: 0.3,
            inner_fraction: 0.8,
            side: None,
        }
    }
}

impl CandidateGenerator for EdgeGenerator {
    fn sample<R: Rng + ?Sized>(&self, center: Vec2, radius: f32, rng: &mut R) -> Vec2 {
        let side = self.side.unwrap_or_else(|| Side::random(rng));
        let dev = self.vertical_deviation.abs();
        let dy = rng.random_range(-dev..=dev);
        let dir = Vec2::new(side.outward(), dy).normalize();
        let dist = rng.random_range(radius * self.inner_fraction..=radius);
        center + dir * dist
    }
}

/// Bounded candidate search with a deterministic fallback
#[derive(Debug, Clone, Copy)]
pub struct SpawnPlacer {
    pub max_attempts: u32,
}

impl Default for SpawnPlacer {
    fn default() -> Self {
        Self { max_attempts: 15 }
    }
}

impl SpawnPlacer {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn find_position<G, R>(
        &self,
        request: &SpawnRequest,
        validator: &PlacementValidator<'_>,
        generator: &G,
        rng: &mut R,
    ) -> PlacementResult
    where
        G: CandidateGenerator,
        R: Rng + ?Sized,
    {
        for attempt in 1..=self.max_attempts {
            let candidate = generator.sample(request.center, request.radius, rng);
            if validator.is_valid(candidate, request) {
                return PlacementResult {
                    position: candidate,
                    valid: true,
                    attempts_used: attempt,
                };
            }
        }

        let position = request.center + Vec2::new(0.0, FALLBACK_OFFSET_Y);
        log::warn!(
            "No valid {:?} position after {} attempts, using fallback ({:.2}, {:.2})",
            request.kind,
            self.max_attempts,
            position.x,
            position.y
        );
        PlacementResult {
            position,
            valid: false,
            attempts_used: self.max_attempts,
        }
    }
}
