//! Pooled world entities: obstacles, coins, power-ups and crystals
//!
//! Positions live in the scrolling frame: the player sits at z = 0, new
//! entities appear at negative z and travel toward +z at scroll speed.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collision::{Aabb, Sphere, Volume};
use super::lane::Lane;
use super::pool::EntityPool;
use crate::consts::*;

/// Obstacle subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Sits on the ground, jump over it
    Ground,
    /// Hangs overhead, slide under it
    Air,
}

impl ObstacleKind {
    pub fn half_extents(self) -> Vec3 {
        match self {
            ObstacleKind::Ground => Vec3::new(
                OBSTACLE_WIDTH / 2.0,
                GROUND_OBSTACLE_HEIGHT / 2.0,
                OBSTACLE_DEPTH / 2.0,
            ),
            ObstacleKind::Air => Vec3::new(
                OBSTACLE_WIDTH / 2.0,
                AIR_OBSTACLE_HEIGHT / 2.0,
                OBSTACLE_DEPTH / 2.0,
            ),
        }
    }

    /// Height of the box center
    pub fn center_y(self) -> f32 {
        match self {
            ObstacleKind::Ground => GROUND_OBSTACLE_HEIGHT / 2.0,
            ObstacleKind::Air => AIR_OBSTACLE_BOTTOM + AIR_OBSTACLE_HEIGHT / 2.0,
        }
    }
}

/// Lateral sway around the lane center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    pub amplitude: f32,
    pub frequency_hz: f32,
    pub phase: f32,
}

impl Oscillation {
    pub fn offset_at(&self, now_ms: f64) -> f32 {
        let t = (now_ms / 1000.0) as f32;
        self.amplitude * (self.phase + std::f32::consts::TAU * self.frequency_hz * t).sin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub oscillation: Option<Oscillation>,
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    Magnet,
    Boost,
    Shield,
    /// Bonus mid-air jump
    Double,
    /// Double coin score, faster scroll
    Risk,
    /// Wings
    Flight,
    ExtraLife,
}

impl PowerUpKind {
    pub const COUNT: usize = 7;
    pub const ALL: [PowerUpKind; Self::COUNT] = [
        PowerUpKind::Magnet,
        PowerUpKind::Boost,
        PowerUpKind::Shield,
        PowerUpKind::Double,
        PowerUpKind::Risk,
        PowerUpKind::Flight,
        PowerUpKind::ExtraLife,
    ];
}

/// Entity kind with its per-kind payload
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Obstacle(Obstacle),
    Coin,
    PowerUp(PowerUpKind),
    /// Upgrade currency
    Crystal,
}

/// A pooled world entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    /// Box center for obstacles, sphere center for pickups
    pub pos: Vec3,
    /// Lane center the entity was placed on; oscillation pivots here
    pub anchor_x: f32,
    /// Set once this obstacle has hit or grazed the player
    #[serde(default)]
    pub touched: bool,
    /// Depth before this frame's scroll
    #[serde(default)]
    pub prev_z: f32,
}

impl Entity {
    pub fn obstacle(lane: Lane, z: f32, kind: ObstacleKind, oscillation: Option<Oscillation>) -> Self {
        Self {
            kind: EntityKind::Obstacle(Obstacle { kind, oscillation }),
            pos: Vec3::new(lane.x(), kind.center_y(), z),
            anchor_x: lane.x(),
            touched: false,
            prev_z: z,
        }
    }

    pub fn coin(lane: Lane, z: f32, y: f32) -> Self {
        Self::pickup(EntityKind::Coin, lane, z, y)
    }

    pub fn power_up(lane: Lane, z: f32, kind: PowerUpKind) -> Self {
        Self::pickup(EntityKind::PowerUp(kind), lane, z, POWER_UP_Y)
    }

    pub fn crystal(lane: Lane, z: f32) -> Self {
        Self::pickup(EntityKind::Crystal, lane, z, CRYSTAL_Y)
    }

    fn pickup(kind: EntityKind, lane: Lane, z: f32, y: f32) -> Self {
        Self {
            kind,
            pos: Vec3::new(lane.x(), y, z),
            anchor_x: lane.x(),
            touched: false,
            prev_z: z,
        }
    }

    /// Collision volume at the current position
    pub fn volume(&self) -> Volume {
        match self.kind {
            EntityKind::Obstacle(obstacle) => {
                Volume::Box(Aabb::from_center(self.pos, obstacle.kind.half_extents()))
            }
            EntityKind::Coin => Volume::Sphere(Sphere::new(self.pos, COIN_RADIUS)),
            EntityKind::PowerUp(_) => Volume::Sphere(Sphere::new(self.pos, POWER_UP_RADIUS)),
            EntityKind::Crystal => Volume::Sphere(Sphere::new(self.pos, CRYSTAL_RADIUS)),
        }
    }

    pub fn obstacle_kind(&self) -> Option<ObstacleKind> {
        match self.kind {
            EntityKind::Obstacle(o) => Some(o.kind),
            _ => None,
        }
    }

    /// Lane the entity was placed on
    pub fn lane(&self) -> Lane {
        Lane::new((self.anchor_x / LANE_WIDTH).round() as i8)
    }
}

/// Coin attraction for this frame
#[derive(Debug, Clone, Copy)]
pub struct Magnet {
    pub center: Vec3,
    pub radius: f32,
    pub pull_speed: f32,
}

/// One pool per entity family; no entity is ever shared between pools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityPools {
    pub obstacles: EntityPool<Entity>,
    pub coins: EntityPool<Entity>,
    pub power_ups: EntityPool<Entity>,
    pub crystals: EntityPool<Entity>,
}

impl Default for EntityPools {
    fn default() -> Self {
        Self {
            obstacles: EntityPool::with_capacity(OBSTACLE_CAPACITY),
            coins: EntityPool::with_capacity(COIN_CAPACITY),
            power_ups: EntityPool::with_capacity(POWER_UP_CAPACITY),
            crystals: EntityPool::with_capacity(CRYSTAL_CAPACITY),
        }
    }
}

impl EntityPools {
    pub fn clear(&mut self) {
        self.obstacles.clear();
        self.coins.clear();
        self.power_ups.clear();
        self.crystals.clear();
    }

    pub fn active_total(&self) -> usize {
        self.obstacles.active_count()
            + self.coins.active_count()
            + self.power_ups.active_count()
            + self.crystals.active_count()
    }

    /// Deactivate everything that has scrolled behind the camera
    pub fn recycle_offscreen(&mut self) -> usize {
        let onscreen = |e: &Entity| e.pos.z <= DESPAWN_Z;
        self.obstacles.retain(onscreen)
            + self.coins.retain(onscreen)
            + self.power_ups.retain(onscreen)
            + self.crystals.retain(onscreen)
    }

    /// Scroll everything toward the player and apply per-kind motion
    pub fn advance(&mut self, dt_secs: f32, speed: f32, now_ms: f64, magnet: Option<Magnet>) {
        let dz = speed * dt_secs;

        for (_, e) in self.obstacles.iter_active_mut() {
            e.prev_z = e.pos.z;
            e.pos.z += dz;
            if let EntityKind::Obstacle(Obstacle {
                oscillation: Some(osc),
                ..
            }) = e.kind
            {
                e.pos.x = e.anchor_x + osc.offset_at(now_ms);
            }
        }

        for (_, e) in self.coins.iter_active_mut() {
            e.pos.z += dz;
            if let Some(m) = magnet {
                let to_player = m.center - e.pos;
                let dist = to_player.length();
                if dist > 1e-4 && dist < m.radius {
                    let step = (m.pull_speed * dt_secs).min(dist);
                    e.pos += to_player / dist * step;
                }
            }
        }

        for (_, e) in self.power_ups.iter_active_mut() {
            e.pos.z += dz;
        }
        for (_, e) in self.crystals.iter_active_mut() {
            e.pos.z += dz;
        }
    }

    /// Any obstacle in `lane` within `window` of `z`
    pub fn obstacle_near(&self, lane: Lane, z: f32, window: f32) -> Option<ObstacleKind> {
        self.obstacles
            .iter_active()
            .find(|(_, e)| e.lane() == lane && (e.pos.z - z).abs() < window)
            .and_then(|(_, e)| e.obstacle_kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obstacle_boxes_leave_room_to_jump_and_slide() {
        let ground = Entity::obstacle(Lane::CENTER, -10.0, ObstacleKind::Ground, None);
        let Volume::Box(ground_box) = ground.volume() else {
            panic!("obstacles are boxes");
        };
        assert!((ground_box.min.y - 0.0).abs() < 1e-6);
        assert!(ground_box.max.y < JUMP_VELOCITY * JUMP_VELOCITY / (2.0 * GRAVITY));

        let air = Entity::obstacle(Lane::LEFT, -10.0, ObstacleKind::Air, None);
        let Volume::Box(air_box) = air.volume() else {
            panic!("obstacles are boxes");
        };
        assert!(air_box.min.y > SLIDE_HEIGHT);
        assert!(air_box.min.y < PLAYER_HEIGHT);
    }

    #[test]
    fn test_advance_scrolls_and_recycles() {
        let mut pools = EntityPools::default();
        let h = pools
            .coins
            .spawn(Entity::coin(Lane::CENTER, -1.0, COIN_Y))
            .expect("free slot");
        pools.advance(0.5, 14.0, 0.0, None);
        let z = pools.coins.get(h).map(|e| e.pos.z).unwrap_or_default();
        assert!((z - 6.0).abs() < 1e-5);

        // Exactly at the despawn line is still on screen
        assert_eq!(pools.recycle_offscreen(), 0);
        pools.advance(0.1, 14.0, 0.0, None);
        assert_eq!(pools.recycle_offscreen(), 1);
        assert!(!pools.coins.is_active(h));
    }

    #[test]
    fn test_magnet_pulls_coins_in_range_only() {
        let mut pools = EntityPools::default();
        let near = pools
            .coins
            .spawn(Entity::coin(Lane::LEFT, -2.0, COIN_Y))
            .expect("free slot");
        let far = pools
            .coins
            .spawn(Entity::coin(Lane::RIGHT, -40.0, COIN_Y))
            .expect("free slot");
        let magnet = Magnet {
            center: Vec3::new(0.0, 0.9, 0.0),
            radius: 8.0,
            pull_speed: 30.0,
        };
        pools.advance(0.016, 0.0, 0.0, Some(magnet));

        let near_x = pools.coins.get(near).map(|e| e.pos.x).unwrap_or_default();
        assert!(near_x > Lane::LEFT.x());
        let far_x = pools.coins.get(far).map(|e| e.pos.x).unwrap_or_default();
        assert_eq!(far_x, Lane::RIGHT.x());
    }

    #[test]
    fn test_oscillation_sways_around_anchor() {
        let osc = Oscillation {
            amplitude: 0.8,
            frequency_hz: 1.0,
            phase: 0.0,
        };
        let mut pools = EntityPools::default();
        let h = pools
            .obstacles
            .spawn(Entity::obstacle(Lane::CENTER, -50.0, ObstacleKind::Ground, Some(osc)))
            .expect("free slot");
        // Quarter period: peak of the sine
        pools.advance(0.0, 0.0, 250.0, None);
        let x = pools.obstacles.get(h).map(|e| e.pos.x).unwrap_or_default();
        assert!((x - 0.8).abs() < 1e-4);
        assert_eq!(pools.obstacles.get(h).map(|e| e.lane()), Some(Lane::CENTER));
    }
}
