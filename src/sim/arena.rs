//! Arena bound detection
//!
//! Probes outward from the arena center along the four cardinal directions.
//! The first wall hit in each direction, pulled in by a small padding, forms
//! the play rectangle. An open side falls back to the probe distance.

use glam::Vec2;

use super::collision::{LayerMask, ObstacleMap};

/// Detected play rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub center: Vec2,
    pub min: Vec2,
    pub max: Vec2,
}

impl Arena {
    /// Probe the obstacle layout around `center`. Never fails.
    pub fn detect(
        center: Vec2,
        max_probe_distance: f32,
        obstacles: &ObstacleMap,
        mask: LayerMask,
        padding: f32,
    ) -> Self {
        let probe = |dir: Vec2| -> f32 {
            match obstacles.raycast(center, dir, max_probe_distance, mask) {
                Some(hit) => (hit.distance - padding).max(0.0),
                None => max_probe_distance,
            }
        };

        let right = probe(Vec2::X);
        let left = probe(Vec2::NEG_X);
        let up = probe(Vec2::Y);
        let down = probe(Vec2::NEG_Y);

        let arena = Self {
            center,
            min: Vec2::new(center.x - left, center.y - down),
            max: Vec2::new(center.x + right, center.y + up),
        };
        log::info!(
            "Arena detected: {:.2} x {:.2} around ({:.2}, {:.2})",
            arena.width(),
            arena.height(),
            center.x,
            center.y
        );
        arena
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Clamp a point into the rectangle shrunk by `margin`
    pub fn clamp(&self, point: Vec2, margin: f32) -> Vec2 {
        let lo = (self.min + Vec2::splat(margin)).min(self.center);
        let hi = (self.max - Vec2::splat(margin)).max(self.center);
        point.clamp(lo, hi)
    }
}
