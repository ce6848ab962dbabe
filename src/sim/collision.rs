//! Obstacle geometry and collision response
//!
//! The arena is a set of axis-aligned rectangles. Walls bound the play field;
//! props are static clutter that nothing may spawn on top of. Ray casts feed
//! arena detection and bounds checks, circle contacts feed hazard bounces.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Collision layer of an obstacle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    Wall,
    Prop,
}

/// Set of layers a query considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(u8);

impl LayerMask {
    pub const WALLS: Self = Self(0b01);
    pub const PROPS: Self = Self(0b10);
    pub const ALL: Self = Self(0b11);

    #[inline]
    pub fn contains(self, layer: Layer) -> bool {
        let bit = match layer {
            Layer::Wall => 0b01,
            Layer::Prop => 0b10,
        };
        self.0 & bit != 0
    }
}

/// Axis-aligned obstacle rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub min: Vec2,
    pub max: Vec2,
    pub layer: Layer,
}

impl Obstacle {
    pub fn new(center: Vec2, half_extents: Vec2, layer: Layer) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
            layer,
        }
    }

    pub fn wall(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center, half_extents, Layer::Wall)
    }

    pub fn prop(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center, half_extents, Layer::Prop)
    }

    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Closest point on (or inside) the rectangle
    #[inline]
    pub fn closest_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }

    /// Same rectangle with its corners pushed away from `origin` by `factor`
    pub fn scaled_about(&self, origin: Vec2, factor: f32) -> Self {
        Self {
            min: origin + (self.min - origin) * factor,
            max: origin + (self.max - origin) * factor,
            layer: self.layer,
        }
    }
}

/// First surface hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec2,
    pub distance: f32,
    /// Surface normal, facing back toward the ray origin
    pub normal: Vec2,
}

/// Result of a circle contact check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Closest point on the obstacle
    pub point: Vec2,
    /// Surface normal pointing toward the circle center, for reflection
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Slab test of a ray against one rectangle
///
/// `dir` must be normalized. A ray starting inside the rectangle hits at
/// distance zero.
pub fn raycast_obstacle(
    origin: Vec2,
    dir: Vec2,
    max_distance: f32,
    obstacle: &Obstacle,
) -> Option<RayHit> {
    if obstacle.contains(origin) {
        return Some(RayHit {
            point: origin,
            distance: 0.0,
            normal: -dir,
        });
    }

    let mut t_enter = 0.0_f32;
    let mut t_exit = max_distance;
    let mut normal = Vec2::ZERO;

    for axis in 0..2 {
        let o = origin[axis];
        let d = dir[axis];
        let (lo, hi) = (obstacle.min[axis], obstacle.max[axis]);

        if d.abs() < 1e-8 {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_enter {
            t_enter = t0;
            normal = Vec2::ZERO;
            normal[axis] = -d.signum();
        }
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }

    Some(RayHit {
        point: origin + dir * t_enter,
        distance: t_enter,
        normal,
    })
}

/// Contact between a circle and one rectangle
pub fn circle_obstacle_contact(center: Vec2, radius: f32, obstacle: &Obstacle) -> CollisionResult {
    let closest = obstacle.closest_point(center);
    let offset = center - closest;
    let dist_sq = offset.length_squared();

    if dist_sq > radius * radius {
        return CollisionResult::miss();
    }

    if dist_sq > 1e-10 {
        let dist = dist_sq.sqrt();
        return CollisionResult {
            hit: true,
            point: closest,
            normal: offset / dist,
            penetration: radius - dist,
        };
    }

    // Center inside the rectangle: push out along the shallowest face
    let to_min = center - obstacle.min;
    let to_max = obstacle.max - center;
    let faces = [
        (to_min.x, Vec2::NEG_X),
        (to_max.x, Vec2::X),
        (to_min.y, Vec2::NEG_Y),
        (to_max.y, Vec2::Y),
    ];
    let (depth, normal) = faces
        .into_iter()
        .fold((f32::INFINITY, Vec2::ZERO), |best, face| if face.0 < best.0 { face } else { best });

    CollisionResult {
        hit: true,
        point: center + normal * depth,
        normal,
        penetration: depth + radius,
    }
}

/// Whether two circles overlap
#[inline]
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let r = radius_a + radius_b;
    a.distance_squared(b) <= r * r
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Static obstacle layout of a level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleMap {
    pub obstacles: Vec<Obstacle>,
}

impl ObstacleMap {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    /// Four walls enclosing a `2*half_extents` play field
    pub fn walled_box(center: Vec2, half_extents: Vec2, thickness: f32) -> Self {
        let half_t = thickness * 0.5;
        let outer = half_extents + Vec2::splat(thickness);
        let horizontal = Vec2::new(outer.x, half_t);
        let vertical = Vec2::new(half_t, outer.y);
        let dy = Vec2::new(0.0, half_extents.y + half_t);
        let dx = Vec2::new(half_extents.x + half_t, 0.0);
        let obstacles = vec![
            Obstacle::wall(center + dy, horizontal),
            Obstacle::wall(center - dy, horizontal),
            Obstacle::wall(center + dx, vertical),
            Obstacle::wall(center - dx, vertical),
        ];
        Self { obstacles }
    }

    pub fn push(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    fn masked(&self, mask: LayerMask) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter().filter(move |o| mask.contains(o.layer))
    }

    /// Nearest hit along a ray within `max_distance`
    pub fn raycast(
        &self,
        origin: Vec2,
        dir: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let dir = dir.try_normalize()?;
        self.masked(mask)
            .filter_map(|o| raycast_obstacle(origin, dir, max_distance, o))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    pub fn overlaps_circle(&self, center: Vec2, radius: f32, mask: LayerMask) -> bool {
        self.masked(mask)
            .any(|o| circle_obstacle_contact(center, radius, o).hit)
    }

    /// Deepest contact between a circle and the masked obstacles
    pub fn circle_contact(&self, center: Vec2, radius: f32, mask: LayerMask) -> CollisionResult {
        self.masked(mask)
            .map(|o| circle_obstacle_contact(center, radius, o))
            .filter(|c| c.hit)
            .max_by(|a, b| a.penetration.total_cmp(&b.penetration))
            .unwrap_or_else(CollisionResult::miss)
    }

    /// Push every wall away from `origin` (map expansion). Props stay put.
    pub fn scale_walls(&mut self, origin: Vec2, factor: f32) {
        for obstacle in &mut self.obstacles {
            if obstacle.layer == Layer::Wall {
                *obstacle = obstacle.scaled_about(origin, factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> ObstacleMap {
        ObstacleMap::walled_box(Vec2::ZERO, Vec2::new(10.0, 6.0), 1.0)
    }

    #[test]
    fn test_raycast_hits_nearest_wall() {
        let map = arena();
        let hit = map.raycast(Vec2::ZERO, Vec2::X, 50.0, LayerMask::WALLS).unwrap();
        assert!((hit.distance - 10.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec2::NEG_X);

        let hit = map.raycast(Vec2::ZERO, Vec2::NEG_Y, 50.0, LayerMask::WALLS).unwrap();
        assert!((hit.point.y + 6.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec2::Y);
    }

    #[test]
    fn test_raycast_respects_range_and_mask() {
        let map = arena();
        assert!(map.raycast(Vec2::ZERO, Vec2::X, 5.0, LayerMask::WALLS).is_none());
        assert!(map.raycast(Vec2::ZERO, Vec2::X, 50.0, LayerMask::PROPS).is_none());
    }

    #[test]
    fn test_circle_contact_normal_points_out_of_wall() {
        let map = arena();
        let contact = map.circle_contact(Vec2::new(9.9, 0.0), 0.2, LayerMask::WALLS);
        assert!(contact.hit);
        assert_eq!(contact.normal, Vec2::NEG_X);
        assert!((contact.penetration - 0.1).abs() < 1e-4);

        assert!(!map.circle_contact(Vec2::ZERO, 0.2, LayerMask::WALLS).hit);
    }

    #[test]
    fn test_circle_inside_obstacle_uses_shallowest_face() {
        let prop = Obstacle::prop(Vec2::ZERO, Vec2::new(2.0, 1.0));
        let contact = circle_obstacle_contact(Vec2::new(0.0, 0.8), 0.1, &prop);
        assert!(contact.hit);
        assert_eq!(contact.normal, Vec2::Y);
    }

    #[test]
    fn test_reflect_velocity() {
        let reflected = reflect_velocity(Vec2::new(5.0, 0.0), Vec2::NEG_X);
        assert!((reflected.x + 5.0).abs() < 1e-4);
        assert!(reflected.y.abs() < 1e-4);
    }

    #[test]
    fn test_scale_walls_leaves_props() {
        let mut map = arena();
        map.push(Obstacle::prop(Vec2::new(2.0, 2.0), Vec2::splat(0.5)));
        map.scale_walls(Vec2::ZERO, 1.5);
        let hit = map.raycast(Vec2::ZERO, Vec2::X, 50.0, LayerMask::WALLS).unwrap();
        assert!((hit.distance - 15.0).abs() < 1e-4);
        assert_eq!(map.obstacles[4].min, Vec2::splat(1.5));
    }
}
