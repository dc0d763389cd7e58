//! Lane Dash - deterministic core of a three-lane endless runner
//!
//! Core modules:
//! - `sim`: Deterministic simulation (player physics, spawning, collisions, modifiers)
//! - `snapshot`: Per-frame view handed to the renderer
//! - `session`: Run lifecycle and score reporting
//! - `tuning`: Data-driven game balance
//! - `settings`: Presentation preferences and adaptive quality

pub mod error;
pub mod highscores;
pub mod session;
pub mod settings;
pub mod sim;
pub mod snapshot;
pub mod tuning;

pub use error::{FrameError, TuningError};
pub use highscores::HighScores;
pub use session::{RunReport, ScoreSink, Session};
pub use settings::{QualityPreset, Settings};
pub use snapshot::FrameSnapshot;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Reference frame for per-frame physics constants (60 Hz)
    pub const REFERENCE_FRAME_MS: f64 = 1000.0 / 60.0;
    /// Smallest dt the simulation will integrate
    pub const MIN_DT_MS: f64 = 1.0;
    /// Frame spikes are clamped to this (prevents tunnelling after a hitch)
    pub const MAX_DT_MS: f64 = 50.0;
    /// Smoothing factor for the FPS moving average
    pub const FPS_EMA_ALPHA: f64 = 0.1;

    /// Lateral distance between lane centers
    pub const LANE_WIDTH: f32 = 2.5;
    /// Maximum lateral speed while changing lanes (units/s)
    pub const LATERAL_SPEED: f32 = 14.0;

    /// Player box (y is measured at the feet)
    pub const GROUND_Y: f32 = 0.0;
    pub const PLAYER_WIDTH: f32 = 0.9;
    pub const PLAYER_HEIGHT: f32 = 1.8;
    pub const PLAYER_DEPTH: f32 = 0.8;
    pub const SLIDE_WIDTH: f32 = 0.8;
    pub const SLIDE_HEIGHT: f32 = 0.8;
    /// Radius of the player's pickup sphere
    pub const PICKUP_REACH: f32 = 0.9;

    /// Gravity per reference frame (units/frame²)
    pub const GRAVITY: f32 = 0.018;
    /// Jump impulse per reference frame (units/frame)
    pub const JUMP_VELOCITY: f32 = 0.32;
    /// Downward velocity applied when sliding in mid-air
    pub const SLIDE_SLAM_VELOCITY: f32 = 0.35;
    /// Feet height while flying
    pub const FLIGHT_ALTITUDE: f32 = 4.0;
    pub const MAX_LIVES: u8 = 3;

    /// Scroll speed at difficulty 0 (units/s)
    pub const BASE_SPEED: f32 = 14.0;
    /// Extra scroll speed at difficulty 1
    pub const MAX_SPEED_BONUS: f32 = 12.0;

    /// Nothing spawns further ahead than this (z = -SPAWN_HORIZON)
    pub const SPAWN_HORIZON: f32 = 120.0;
    /// Entities past this z are behind the camera and get recycled
    pub const DESPAWN_Z: f32 = 6.0;

    /// Pool capacities
    pub const OBSTACLE_CAPACITY: usize = 16;
    pub const COIN_CAPACITY: usize = 16;
    pub const POWER_UP_CAPACITY: usize = 6;
    pub const CRYSTAL_CAPACITY: usize = 8;

    /// Obstacle boxes
    pub const OBSTACLE_WIDTH: f32 = 2.0;
    pub const OBSTACLE_DEPTH: f32 = 1.0;
    pub const GROUND_OBSTACLE_HEIGHT: f32 = 1.1;
    /// Air obstacles hang above this height; slide under them
    pub const AIR_OBSTACLE_BOTTOM: f32 = 1.1;
    pub const AIR_OBSTACLE_HEIGHT: f32 = 1.5;

    /// Pickup spheres
    pub const COIN_RADIUS: f32 = 0.5;
    pub const POWER_UP_RADIUS: f32 = 0.7;
    pub const CRYSTAL_RADIUS: f32 = 0.6;
    pub const COIN_Y: f32 = 0.8;
    /// Coin lifted over a ground obstacle (on the jump arc)
    pub const COIN_HIGH_Y: f32 = 2.4;
    /// Coin lowered under an air obstacle (on the slide path)
    pub const COIN_LOW_Y: f32 = 0.4;
    pub const POWER_UP_Y: f32 = 1.0;
    pub const CRYSTAL_Y: f32 = 1.2;

    /// One distance point per this many simulated ticks (0.05 points/tick)
    pub const TICKS_PER_DISTANCE_POINT: u64 = 20;
    /// Distance covered in one world/theme before the next takes over
    pub const WORLD_LENGTH: f64 = 1500.0;
}

/// Move `current` toward `target` by at most `max_step`
#[inline]
pub fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(delta)
    }
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
