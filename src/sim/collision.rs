//! Collision detection and hit resolution
//!
//! The player is a box, obstacles are boxes, pickups are spheres. The
//! player box is stretched along z by the distance the world scrolls in a
//! frame so fast obstacles cannot tunnel through it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::entity::{EntityKind, EntityPools, PowerUpKind};
use super::modifiers::ModifierEngine;
use super::player::Player;
use super::pool::Handle;
use crate::consts::*;
use crate::tuning::Tuning;

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Strict overlap; touching faces do not count
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    pub fn inflated(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Same box moved along z so its center sits at `z`
    pub fn at_depth(&self, z: f32) -> Aabb {
        let shift = Vec3::new(0.0, 0.0, z - self.center().z);
        Aabb {
            min: self.min + shift,
            max: self.max + shift,
        }
    }

    /// Closest point inside the box to `p`
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    /// Non-finite or inside-out boxes cannot be tested meaningfully
    pub fn is_degenerate(&self) -> bool {
        !self.min.is_finite() || !self.max.is_finite() || self.min.cmpgt(self.max).any()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Center distance under the radius sum
    pub fn touches(&self, other: &Sphere) -> bool {
        let r = self.radius + other.radius;
        self.center.distance_squared(other.center) < r * r
    }
}

/// Bounding volume of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    Box(Aabb),
    Sphere(Sphere),
}

impl Volume {
    pub fn intersects_box(&self, other: &Aabb) -> bool {
        match self {
            Volume::Box(b) => b.intersects(other),
            Volume::Sphere(s) => {
                let closest = other.closest_point(s.center);
                closest.distance_squared(s.center) < s.radius * s.radius
            }
        }
    }

    pub fn touches_sphere(&self, other: &Sphere) -> bool {
        match self {
            Volume::Box(b) => Volume::Sphere(*other).intersects_box(b),
            Volume::Sphere(s) => s.touches(other),
        }
    }
}

/// Player body for obstacle tests this frame
pub fn player_volume(player: &Player, speed: f32, tuning: &Tuning) -> Aabb {
    let (w, h) = player.body_size();
    let depth = PLAYER_DEPTH + speed.max(0.0) * tuning.collision_sweep_pad;
    Aabb::from_center(player.body_center(), Vec3::new(w / 2.0, h / 2.0, depth / 2.0))
}

/// Reach used for pickups
pub fn pickup_sphere(player: &Player) -> Sphere {
    Sphere::new(player.body_center(), PICKUP_REACH)
}

/// A pickup consumed this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collected {
    Coin,
    PowerUp(PowerUpKind),
    Crystal,
}

/// Everything the player touched this frame
#[derive(Debug, Clone, Default)]
pub struct Contacts {
    /// Obstacles overlapping the player box, slot order
    pub obstacles: Vec<Handle>,
    pub near_misses: u32,
    /// Already deactivated
    pub collected: Vec<Collected>,
}

/// Test the player against every active entity.
///
/// Pickups are deactivated here so a pickup can never be consumed twice.
/// Obstacles are only reported; [`resolve_obstacle_hit`] decides their fate.
pub fn detect(body: &Aabb, reach: &Sphere, pools: &mut EntityPools, near_miss_tolerance: f32) -> Contacts {
    let mut contacts = Contacts::default();
    let band = body.inflated(near_miss_tolerance);
    let body_z = body.center().z;

    for (handle, e) in pools.obstacles.iter_active_mut() {
        let volume = e.volume();
        if volume.intersects_box(body) {
            e.touched = true;
            contacts.obstacles.push(handle);
            continue;
        }
        // Graded where the obstacle crossed the player's depth this frame,
        // however far it moved
        let crossed = e.prev_z < body_z && e.pos.z >= body_z;
        if e.touched || !crossed {
            continue;
        }
        if let Volume::Box(b) = volume {
            let alongside = b.at_depth(body_z);
            if alongside.intersects(&band) && !alongside.intersects(body) {
                e.touched = true;
                contacts.near_misses += 1;
            }
        }
    }

    let mut consumed = Vec::new();
    for (handle, e) in pools.coins.iter_active() {
        if e.volume().touches_sphere(reach) {
            consumed.push(handle);
        }
    }
    for handle in consumed.drain(..) {
        if pools.coins.deactivate(handle).is_some() {
            contacts.collected.push(Collected::Coin);
        }
    }

    for (handle, e) in pools.power_ups.iter_active() {
        if e.volume().touches_sphere(reach) {
            consumed.push(handle);
        }
    }
    for handle in consumed.drain(..) {
        if let Some(EntityKind::PowerUp(kind)) = pools.power_ups.deactivate(handle).map(|e| e.kind) {
            contacts.collected.push(Collected::PowerUp(kind));
        }
    }

    for (handle, e) in pools.crystals.iter_active() {
        if e.volume().touches_sphere(reach) {
            consumed.push(handle);
        }
    }
    for handle in consumed.drain(..) {
        if pools.crystals.deactivate(handle).is_some() {
            contacts.collected.push(Collected::Crystal);
        }
    }

    contacts
}

/// What an obstacle contact did to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Flying or invincible
    Ignored,
    /// Shield spent, obstacle removed
    Absorbed,
    LifeLost { remaining: u8 },
}

/// Apply the hit policy for one obstacle contact
pub fn resolve_obstacle_hit(
    handle: Handle,
    player: &mut Player,
    modifiers: &mut ModifierEngine,
    pools: &mut EntityPools,
    now: f64,
    tuning: &Tuning,
) -> HitOutcome {
    if player.is_flying() || player.is_invincible(now) {
        return HitOutcome::Ignored;
    }

    if modifiers.consume_shield(now) {
        pools.obstacles.deactivate(handle);
        player.grant_invincibility(now + tuning.shield_grace_ms);
        return HitOutcome::Absorbed;
    }

    let remaining = player.lose_life();
    player.grant_invincibility(now + tuning.hit_invincibility_ms);
    HitOutcome::LifeLost { remaining }
}
