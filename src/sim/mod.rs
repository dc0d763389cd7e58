//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Seeded RNG only, owned by the run
//! - Timers are absolute timestamps on the simulation clock
//! - Stable iteration order (pool slot order)
//! - No rendering or platform dependencies

pub mod collision;
pub mod entity;
pub mod lane;
pub mod modifiers;
pub mod player;
pub mod pool;
pub mod rng;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{Aabb, Collected, Contacts, HitOutcome, Sphere, Volume};
pub use entity::{Entity, EntityKind, EntityPools, ObstacleKind, Oscillation, PowerUpKind};
pub use lane::Lane;
pub use modifiers::{ComboState, Effect, ModifierEngine, ModifierTimers};
pub use player::{Player, Upgrades, VerticalState};
pub use pool::{EntityPool, Handle};
pub use rng::{RunRng, SeedSource};
pub use spawn::{SpawnScheduler, difficulty};
pub use state::{GameEvent, RunConfig, RunPhase, RunState, World};
pub use tick::{FrameClock, FrameOutcome, TickInput, tick};
