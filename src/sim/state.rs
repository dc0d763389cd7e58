//! Run state and the types shared across subsystems
//!
//! Everything a run owns lives in [`RunState`]; a new run is a new value,
//! so a reset can never leak timers, pooled entities or RNG position.

use serde::{Deserialize, Serialize};

use super::entity::{EntityPools, PowerUpKind};
use super::modifiers::{Effect, ModifierEngine};
use super::player::{Player, Upgrades};
use super::rng::{RunRng, SeedSource};
use super::spawn::{self, SpawnScheduler};
use super::tick::FrameClock;
use crate::consts::*;
use crate::session::RunReport;
use crate::tuning::Tuning;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Running,
    /// Simulation suspended, `now` frozen
    Paused,
    /// Terminal; the final score is fixed
    Ended,
}

/// Host-supplied parameters of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub seed_source: SeedSource,
    /// Wider coyote window
    pub assist_mode: bool,
    /// Added to the difficulty curve
    pub initial_difficulty_bias: f32,
    pub upgrades: Upgrades,
    pub tuning: Tuning,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed_source: SeedSource::WallClock,
            assist_mode: false,
            initial_difficulty_bias: 0.0,
            upgrades: Upgrades::default(),
            tuning: Tuning::default(),
        }
    }
}

impl RunConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed_source: SeedSource::Fixed(seed),
            ..Default::default()
        }
    }
}

/// Visual theme, changes every `WORLD_LENGTH` units travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum World {
    #[default]
    Meadow,
    Canyon,
    Tundra,
    Neon,
}

impl World {
    pub const ALL: [World; 4] = [World::Meadow, World::Canyon, World::Tundra, World::Neon];

    pub fn for_distance(distance: f64) -> World {
        let index = (distance.max(0.0) / WORLD_LENGTH) as usize;
        World::ALL[index % World::ALL.len()]
    }

    pub fn id(self) -> u8 {
        match self {
            World::Meadow => 0,
            World::Canyon => 1,
            World::Tundra => 2,
            World::Neon => 3,
        }
    }
}

/// Something that happened this frame (audio and HUD feed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    Jumped,
    AirJumped,
    Landed,
    SlideStarted,
    Dashed,
    CoinCollected { points: u64, combo: u8 },
    PowerUpCollected(PowerUpKind),
    CrystalCollected,
    ChainBoost,
    ShieldAbsorbed,
    LifeLost { remaining: u8 },
    NearMiss,
    BossBurst { threshold: u64 },
    WorldChanged(World),
    RunEnded { final_score: u64 },
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct RunState {
    pub seed: u64,
    pub config: RunConfig,
    pub phase: RunPhase,
    /// Simulated frames advanced
    pub ticks: u64,
    /// Simulation clock (ms); frozen while paused
    pub now_ms: f64,
    pub distance: f64,
    /// Score from pickups, on top of the distance baseline
    pub bonus_score: u64,
    pub crystals: u32,
    pub player: Player,
    pub pools: EntityPools,
    pub modifiers: ModifierEngine,
    pub spawner: SpawnScheduler,
    pub clock: FrameClock,
    pub world: World,
    pub slow_motion_until: f64,
    pub final_score: Option<u64>,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) rng: RunRng,
    /// Next simulated frame is the first after a resume
    pub(crate) resume_pending: bool,
}

impl RunState {
    /// Fresh run: new pools, player, modifiers and RNG
    pub fn new(mut config: RunConfig) -> Self {
        if let Err(err) = config.tuning.validate() {
            log::warn!("rejecting run tuning ({}), using defaults", err);
            config.tuning = Tuning::default();
        }
        if !config.initial_difficulty_bias.is_finite() {
            log::warn!(
                "difficulty bias {} is not finite, using 0",
                config.initial_difficulty_bias
            );
            config.initial_difficulty_bias = 0.0;
        }
        let seed = config.seed_source.resolve();
        log::info!(
            "run start: seed {} (assist: {}, bias: {:.2})",
            seed,
            config.assist_mode,
            config.initial_difficulty_bias
        );

        Self {
            seed,
            spawner: SpawnScheduler::new(&config.tuning),
            config,
            phase: RunPhase::Running,
            ticks: 0,
            now_ms: 0.0,
            distance: 0.0,
            bonus_score: 0,
            crystals: 0,
            player: Player::default(),
            pools: EntityPools::default(),
            modifiers: ModifierEngine::default(),
            clock: FrameClock::default(),
            world: World::default(),
            slow_motion_until: 0.0,
            final_score: None,
            events: Vec::new(),
            rng: RunRng::new(seed),
            resume_pending: false,
        }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.config.tuning
    }

    /// Baseline points: one per `TICKS_PER_DISTANCE_POINT` frames
    pub fn distance_points(&self) -> u64 {
        self.ticks / TICKS_PER_DISTANCE_POINT
    }

    /// Current score; fixed once the run has ended
    pub fn score(&self) -> u64 {
        self.final_score
            .unwrap_or_else(|| self.distance_points() + self.bonus_score)
    }

    pub fn lives(&self) -> u8 {
        self.player.lives
    }

    pub fn is_terminal(&self) -> bool {
        self.phase == RunPhase::Ended
    }

    pub fn is_paused(&self) -> bool {
        self.phase == RunPhase::Paused
    }

    pub fn difficulty(&self) -> f32 {
        spawn::difficulty(
            self.now_ms,
            self.score(),
            self.config.initial_difficulty_bias,
            &self.config.tuning,
        )
    }

    /// Derived every frame from difficulty and active effects
    pub fn scroll_speed(&self) -> f32 {
        let base = BASE_SPEED + self.difficulty() * MAX_SPEED_BONUS;
        base * self.modifiers.speed_multiplier(self.now_ms, &self.config.tuning)
    }

    pub fn combo(&self) -> u8 {
        self.modifiers.combo(self.now_ms, &self.config.tuning)
    }

    pub fn is_effect_active(&self, effect: Effect) -> bool {
        self.modifiers.is_active(effect, self.now_ms)
    }

    pub fn is_slow_motion(&self) -> bool {
        self.now_ms < self.slow_motion_until
    }

    /// Events raised by the last frame
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            final_score: self.score(),
            distance: self.distance,
            crystals: self.crystals,
            ticks: self.ticks,
            seed: self.seed,
        }
    }
}
