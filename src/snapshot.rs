//! Read-only view of a frame for the render collaborator
//!
//! [`FrameSnapshot`] is plain data; [`FrameSnapshot::instances`] flattens it
//! into GPU-ready instance records.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::Serialize;

use crate::settings::QualityPreset;
use crate::sim::entity::{EntityKind, ObstacleKind, PowerUpKind};
use crate::sim::modifiers::Effect;
use crate::sim::player::VerticalState;
use crate::sim::state::{RunState, World};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerView {
    pub pos: Vec3,
    pub lane: i8,
    pub state: VerticalState,
    pub lives: u8,
    /// Flicker while true
    pub invincible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EntityView {
    pub kind: EntityKind,
    pub pos: Vec3,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    pub player: PlayerView,
    /// Obstacles, coins, power-ups, crystals; slot order within each family
    pub entities: Vec<EntityView>,
    pub speed: f32,
    pub world: World,
    pub score: u64,
    pub combo: u8,
    pub boost: bool,
    pub shield: bool,
    pub flight: bool,
    pub slow_motion: bool,
    pub quality: QualityPreset,
}

/// Instance record for GPU upload
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub position: [f32; 3],
    /// See [`instance_kind`]
    pub kind: u32,
}

/// Mesh id of an instance; 0 is the player
pub fn instance_kind(kind: &EntityKind) -> u32 {
    match kind {
        EntityKind::Obstacle(o) => match o.kind {
            ObstacleKind::Ground => 1,
            ObstacleKind::Air => 2,
        },
        EntityKind::Coin => 3,
        EntityKind::Crystal => 4,
        EntityKind::PowerUp(p) => {
            10 + match p {
                PowerUpKind::Magnet => 0,
                PowerUpKind::Boost => 1,
                PowerUpKind::Shield => 2,
                PowerUpKind::Double => 3,
                PowerUpKind::Risk => 4,
                PowerUpKind::Flight => 5,
                PowerUpKind::ExtraLife => 6,
            }
        }
    }
}

impl FrameSnapshot {
    /// Player first, then every entity in snapshot order
    pub fn instances(&self) -> Vec<InstanceRaw> {
        let player = InstanceRaw {
            position: self.player.pos.to_array(),
            kind: 0,
        };
        std::iter::once(player)
            .chain(self.entities.iter().map(|e| InstanceRaw {
                position: e.pos.to_array(),
                kind: instance_kind(&e.kind),
            }))
            .collect()
    }
}

impl RunState {
    /// Snapshot with a quality hint taken from the frame-rate average
    pub fn snapshot(&self) -> FrameSnapshot {
        self.snapshot_with_quality(QualityPreset::for_fps(self.clock.fps_ema))
    }

    pub fn snapshot_with_quality(&self, quality: QualityPreset) -> FrameSnapshot {
        let pools = [
            &self.pools.obstacles,
            &self.pools.coins,
            &self.pools.power_ups,
            &self.pools.crystals,
        ];
        let entities = pools
            .into_iter()
            .flat_map(|pool| pool.iter_active())
            .map(|(_, e)| EntityView {
                kind: e.kind,
                pos: e.pos,
            })
            .collect();

        FrameSnapshot {
            player: PlayerView {
                pos: self.player.pos,
                lane: self.player.lane.index(),
                state: self.player.state,
                lives: self.player.lives,
                invincible: self.player.is_invincible(self.now_ms),
            },
            entities,
            speed: self.scroll_speed(),
            world: self.world,
            score: self.score(),
            combo: self.combo(),
            boost: self.is_effect_active(Effect::Boost),
            shield: self.is_effect_active(Effect::Shield),
            flight: self.is_effect_active(Effect::Flight),
            slow_motion: self.is_slow_motion(),
            quality,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::entity::Entity;
    use crate::sim::lane::Lane;
    use crate::sim::state::RunConfig;
    use crate::sim::tick::{TickInput, tick};

    #[test]
    fn test_snapshot_lists_active_entities_only() {
        let mut state = RunState::new(RunConfig::with_seed(11));
        let coin = state
            .pools
            .coins
            .spawn(Entity::coin(Lane::LEFT, -30.0, 0.8))
            .expect("free slot");
        state
            .pools
            .obstacles
            .spawn(Entity::obstacle(Lane::RIGHT, -40.0, ObstacleKind::Air, None));

        let snap = state.snapshot();
        assert_eq!(snap.entities.len(), 2);
        assert!(matches!(snap.entities[0].kind, EntityKind::Obstacle(_)));
        assert_eq!(snap.entities[1].kind, EntityKind::Coin);

        state.pools.coins.deactivate(coin);
        assert_eq!(state.snapshot().entities.len(), 1);
    }

    #[test]
    fn test_instances_follow_snapshot_order() {
        let mut state = RunState::new(RunConfig::with_seed(11));
        tick(&mut state, &TickInput::default(), 16.0);
        let snap = state.snapshot();
        let instances = snap.instances();
        assert_eq!(instances.len(), snap.entities.len() + 1);
        assert_eq!(instances[0].kind, 0);
        assert_eq!(instances[0].position, snap.player.pos.to_array());

        let bytes: &[u8] = bytemuck::cast_slice(&instances);
        assert_eq!(bytes.len(), instances.len() * std::mem::size_of::<InstanceRaw>());
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 16);
    }

    #[test]
    fn test_quality_hint_follows_fps() {
        let mut state = RunState::new(RunConfig::with_seed(1));
        assert_eq!(state.snapshot().quality, QualityPreset::High);
        state.clock.fps_ema = 25.0;
        assert_eq!(state.snapshot().quality, QualityPreset::Low);
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = RunState::new(RunConfig::with_seed(1));
        let json = serde_json::to_string(&state.snapshot()).expect("serializable");
        assert!(json.contains("\"world\":\"Meadow\""));
    }
}
