//! Per-frame simulation step
//!
//! Advances every subsystem once, in a fixed order: player, spawner, entity
//! motion, collision, modifiers, then run bookkeeping.

use serde::{Deserialize, Serialize};

use super::collision::{self, Collected, HitOutcome, Volume};
use super::modifiers::Effect;
use super::player::PlayerContext;
use super::spawn::SpawnContext;
use super::state::{GameEvent, RunPhase, RunState, World};
use crate::consts::*;
use crate::error::FrameError;
use crate::session::RunReport;

/// Edge-triggered input for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub move_left: bool,
    pub move_right: bool,
    pub jump: bool,
    pub slide: bool,
    pub dash: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Frame-time bookkeeping; the FPS average never feeds physics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameClock {
    pub fps_ema: f64,
    pub last_dt_ms: f64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            fps_ema: 1000.0 / REFERENCE_FRAME_MS,
            last_dt_ms: REFERENCE_FRAME_MS,
        }
    }
}

impl FrameClock {
    /// Reject unusable frame times, clamp the rest into `[MIN_DT_MS, MAX_DT_MS]`
    pub fn sanitize(raw_dt_ms: f64) -> Result<f64, FrameError> {
        if !raw_dt_ms.is_finite() {
            return Err(FrameError::NonFiniteDt(raw_dt_ms));
        }
        if raw_dt_ms < 0.0 {
            return Err(FrameError::NegativeDt(raw_dt_ms));
        }
        Ok(raw_dt_ms.clamp(MIN_DT_MS, MAX_DT_MS))
    }

    /// Fold a raw frame time into the FPS average
    pub fn observe(&mut self, raw_dt_ms: f64) {
        let dt = raw_dt_ms.max(MIN_DT_MS);
        self.last_dt_ms = raw_dt_ms;
        self.fps_ema += FPS_EMA_ALPHA * (1000.0 / dt - self.fps_ema);
    }
}

/// What a call to [`tick`] did
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Advanced,
    Paused,
    /// Frame dropped, state untouched
    Skipped(FrameError),
    /// The run ended on this frame
    Ended(RunReport),
    /// The run had already ended
    Over,
}

/// Advance the run by one host frame of `raw_dt_ms` wall time
pub fn tick(state: &mut RunState, input: &TickInput, raw_dt_ms: f64) -> FrameOutcome {
    state.events.clear();
    if state.phase == RunPhase::Ended {
        return FrameOutcome::Over;
    }

    let mut dt_ms = match FrameClock::sanitize(raw_dt_ms) {
        Ok(dt) => dt,
        Err(err) => {
            log::debug!("frame skipped: {}", err);
            return FrameOutcome::Skipped(err);
        }
    };
    state.clock.observe(raw_dt_ms);

    if input.pause {
        match state.phase {
            RunPhase::Running => {
                state.phase = RunPhase::Paused;
                log::debug!("paused at {:.0}ms", state.now_ms);
                return FrameOutcome::Paused;
            }
            RunPhase::Paused => {
                state.phase = RunPhase::Running;
                state.resume_pending = true;
            }
            RunPhase::Ended => {}
        }
    }
    if state.phase == RunPhase::Paused {
        return FrameOutcome::Paused;
    }

    if has_degenerate_volume(state) {
        log::debug!("frame skipped: {}", FrameError::DegenerateVolume);
        return FrameOutcome::Skipped(FrameError::DegenerateVolume);
    }

    // Wall time spent paused is never simulated
    if state.resume_pending {
        dt_ms = dt_ms.min(REFERENCE_FRAME_MS);
        state.resume_pending = false;
    }
    if state.is_slow_motion() {
        dt_ms *= state.config.tuning.slow_motion_scale;
    }

    let now = state.now_ms + dt_ms;
    state.now_ms = now;
    let difficulty = state.difficulty();
    let speed = state.scroll_speed();
    let dt_secs = (dt_ms / 1000.0) as f32;

    let RunState {
        config,
        player,
        pools,
        modifiers,
        spawner,
        rng,
        events,
        bonus_score,
        crystals,
        slow_motion_until,
        ..
    } = state;
    let tuning = &config.tuning;

    // Player
    let ctx = PlayerContext {
        now,
        dt_ms,
        speed,
        combo: modifiers.combo(now, tuning),
        double_jump: modifiers.is_active(Effect::Double, now),
        flight_active: modifiers.is_active(Effect::Flight, now),
        assist: config.assist_mode,
        upgrades: config.upgrades,
        tuning,
    };
    player.update(input, &ctx, events);

    // Spawn, then move the world
    let spawn_ctx = SpawnContext {
        now,
        dt_secs,
        difficulty,
        flying: player.is_flying(),
        tuning,
    };
    spawner.update(&spawn_ctx, pools, rng);
    let magnet = modifiers.magnet(now, player, tuning);
    pools.advance(dt_secs, speed, now, magnet);
    spawner.scroll(speed * dt_secs);

    // Collision
    let body = collision::player_volume(player, speed, tuning);
    let reach = collision::pickup_sphere(player);
    let contacts = collision::detect(&body, &reach, pools, tuning.near_miss_tolerance);

    if contacts.near_misses > 0 {
        *slow_motion_until = slow_motion_until.max(now + tuning.slow_motion_ms);
        for _ in 0..contacts.near_misses {
            events.push(GameEvent::NearMiss);
        }
    }

    let mut dead = false;
    for &handle in &contacts.obstacles {
        match collision::resolve_obstacle_hit(handle, player, modifiers, pools, now, tuning) {
            HitOutcome::Ignored => {}
            HitOutcome::Absorbed => events.push(GameEvent::ShieldAbsorbed),
            HitOutcome::LifeLost { remaining } => {
                events.push(GameEvent::LifeLost { remaining });
                if remaining == 0 {
                    dead = true;
                    break;
                }
            }
        }
    }

    if dead {
        // Score stays where the previous frame left it
        let final_score = state.score();
        state.final_score = Some(final_score);
        state.phase = RunPhase::Ended;
        state.events.push(GameEvent::RunEnded { final_score });
        log::info!(
            "run over: score {} after {} ticks ({:.0} units)",
            final_score,
            state.ticks,
            state.distance
        );
        return FrameOutcome::Ended(state.report());
    }

    // Modifiers
    for item in contacts.collected {
        match item {
            Collected::Coin => {
                let award = modifiers.collect_coin(now, tuning);
                *bonus_score += award.points;
                events.push(GameEvent::CoinCollected {
                    points: award.points,
                    combo: award.combo,
                });
                if award.chain_boost {
                    events.push(GameEvent::ChainBoost);
                }
            }
            Collected::PowerUp(kind) => {
                modifiers.apply_power_up(kind, now, player, tuning);
                events.push(GameEvent::PowerUpCollected(kind));
            }
            Collected::Crystal => {
                *crystals += 1;
                events.push(GameEvent::CrystalCollected);
            }
        }
    }

    // Run bookkeeping
    state.ticks += 1;
    state.distance += (speed * dt_secs) as f64;

    let score = state.score();
    if let Some(threshold) = state
        .spawner
        .check_boss(score, &mut state.rng, &state.config.tuning)
    {
        state.events.push(GameEvent::BossBurst { threshold });
    }

    let world = World::for_distance(state.distance);
    if world != state.world {
        log::info!("entering {:?} at {:.0} units", world, state.distance);
        state.world = world;
        state.events.push(GameEvent::WorldChanged(world));
    }

    FrameOutcome::Advanced
}

fn has_degenerate_volume(state: &RunState) -> bool {
    let body = collision::player_volume(&state.player, state.scroll_speed(), &state.config.tuning);
    body.is_degenerate()
        || state.pools.obstacles.iter_active().any(|(_, e)| match e.volume() {
            Volume::Box(b) => b.is_degenerate(),
            Volume::Sphere(_) => false,
        })
}
