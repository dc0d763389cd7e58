//! Procedural level generation
//!
//! Obstacles come from a small pattern library or as singles, always at
//! least one difficulty-dependent gap behind the last placed obstacle.
//! Pieces that would land beyond the horizon wait in a pending queue that
//! scrolls with the world. Coins, power-ups and crystals have their own
//! density rules; while flying, coin rows appear at flight altitude instead.

use std::collections::VecDeque;
use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityPools, ObstacleKind, Oscillation, PowerUpKind};
use super::lane::Lane;
use super::rng::RunRng;
use crate::consts::*;
use crate::lerp;
use crate::tuning::Tuning;

/// Where the first ground coin of a run (or after a flight) is laid
const FIRST_COIN_Z: f32 = -20.0;
/// Where the first crystal is laid
const FIRST_CRYSTAL_Z: f32 = -SPAWN_HORIZON / 2.0;
/// Coins within this z distance of an obstacle in the same lane are moved
/// over or under it
const COIN_CLEARANCE: f32 = 2.0;
const POWER_UP_CLEARANCE: f32 = 3.0;
/// A pending piece that could not be released before reaching this z is
/// dropped rather than popping in close to the player
const PENDING_DROP_Z: f32 = -SPAWN_HORIZON / 2.0;

/// Difficulty in `[0, 1]`.
///
/// Elapsed time reaches full difficulty at `difficulty_horizon_ms`. Once the
/// run is old enough to trust it, a score-per-second term pushes skilled
/// players along faster. The run's initial bias is added last.
pub fn difficulty(elapsed_ms: f64, score: u64, bias: f32, tuning: &Tuning) -> f32 {
    let time_term = (elapsed_ms / tuning.difficulty_horizon_ms).clamp(0.0, 1.0);
    let adaptive = if elapsed_ms >= tuning.adaptive_min_elapsed_ms && elapsed_ms > 0.0 {
        let per_sec = score as f64 / (elapsed_ms / 1000.0);
        ((per_sec - tuning.adaptive_sps_baseline) / tuning.adaptive_sps_range).clamp(0.0, 1.0)
            * tuning.adaptive_weight
    } else {
        0.0
    };
    (time_term + adaptive + bias as f64).clamp(0.0, 1.0) as f32
}

/// One obstacle of a pattern, `dz` units further away than the pattern start
#[derive(Debug, Clone, Copy)]
struct Piece {
    lane: i8,
    dz: f32,
    kind: ObstacleKind,
}

const fn ground(lane: i8, dz: f32) -> Piece {
    Piece {
        lane,
        dz,
        kind: ObstacleKind::Ground,
    }
}

const fn air(lane: i8, dz: f32) -> Piece {
    Piece {
        lane,
        dz,
        kind: ObstacleKind::Air,
    }
}

/// Hand-built obstacle formation; every row leaves a way through
#[derive(Debug)]
struct Pattern {
    name: &'static str,
    min_difficulty: f32,
    pieces: &'static [Piece],
}

static PATTERNS: &[Pattern] = &[
    Pattern {
        name: "wall",
        min_difficulty: 0.0,
        pieces: &[ground(-1, 0.0), ground(0, 0.0)],
    },
    Pattern {
        name: "zigzag",
        min_difficulty: 0.0,
        pieces: &[ground(-1, 0.0), ground(0, 10.0), ground(1, 20.0)],
    },
    Pattern {
        name: "hurdles",
        min_difficulty: 0.2,
        pieces: &[ground(0, 0.0), ground(0, 9.0), ground(0, 18.0)],
    },
    Pattern {
        name: "low-bridge",
        min_difficulty: 0.35,
        pieces: &[air(-1, 0.0), air(0, 0.0), ground(1, 0.0)],
    },
    Pattern {
        name: "mixed-gate",
        min_difficulty: 0.5,
        pieces: &[ground(-1, 0.0), air(1, 0.0), air(0, 10.0), ground(-1, 10.0)],
    },
    Pattern {
        name: "switchback",
        min_difficulty: 0.7,
        pieces: &[
            ground(-1, 0.0),
            ground(0, 0.0),
            ground(0, 12.0),
            ground(1, 12.0),
            air(-1, 24.0),
            air(0, 24.0),
        ],
    },
];

/// Obstacle waiting to come into range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingObstacle {
    pub lane: Lane,
    pub z: f32,
    pub kind: ObstacleKind,
    pub oscillation: Option<Oscillation>,
}

impl PendingObstacle {
    fn entity(&self) -> Entity {
        Entity::obstacle(self.lane, self.z, self.kind, self.oscillation)
    }
}

/// Per-frame inputs of the scheduler
#[derive(Debug, Clone, Copy)]
pub struct SpawnContext<'a> {
    pub now: f64,
    pub dt_secs: f32,
    pub difficulty: f32,
    pub flying: bool,
    pub tuning: &'a Tuning,
}

/// Spawner state owned by the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnScheduler {
    /// z of the furthest obstacle placed or queued; scrolls with the world
    last_obstacle_z: Option<f32>,
    coin_cursor_z: Option<f32>,
    crystal_cursor_z: Option<f32>,
    last_coin_lane: Lane,
    pending: VecDeque<PendingObstacle>,
    next_boss_at: u64,
    sky_ready_at: f64,
    sky_rows_used: u32,
    was_flying: bool,
}

impl SpawnScheduler {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            last_obstacle_z: None,
            coin_cursor_z: None,
            crystal_cursor_z: None,
            last_coin_lane: Lane::CENTER,
            pending: VecDeque::new(),
            next_boss_at: tuning.boss_first_threshold,
            sky_ready_at: 0.0,
            sky_rows_used: 0,
            was_flying: false,
        }
    }

    pub fn pending(&self) -> impl Iterator<Item = &PendingObstacle> {
        self.pending.iter()
    }

    pub fn next_boss_at(&self) -> u64 {
        self.next_boss_at
    }

    /// Recycle what scrolled away, then top up every entity family
    pub fn update(&mut self, ctx: &SpawnContext, pools: &mut EntityPools, rng: &mut RunRng) {
        pools.recycle_offscreen();
        self.release_pending(pools);

        if ctx.now >= ctx.tuning.obstacle_warmup_ms {
            self.spawn_obstacles(ctx, pools, rng);
        }

        if ctx.flying {
            self.spawn_sky_row(ctx, pools);
        } else {
            self.spawn_coins(ctx.tuning, pools, rng);
        }
        self.was_flying = ctx.flying;

        self.spawn_power_up(ctx, pools, rng);
        self.spawn_crystals(ctx.tuning, pools, rng);
    }

    /// Move every cursor and pending piece along with the world
    pub fn scroll(&mut self, dz: f32) {
        for z in [
            &mut self.last_obstacle_z,
            &mut self.coin_cursor_z,
            &mut self.crystal_cursor_z,
        ]
        .into_iter()
        .flatten()
        {
            *z += dz;
        }
        for piece in &mut self.pending {
            piece.z += dz;
        }
    }

    /// Queue a boss wave once the score crosses the next threshold.
    ///
    /// Rows alternate ground and air, each blocking two lanes. Returns the
    /// threshold that fired.
    pub fn check_boss(&mut self, score: u64, rng: &mut RunRng, tuning: &Tuning) -> Option<u64> {
        if score < self.next_boss_at {
            return None;
        }
        let threshold = self.next_boss_at;
        self.next_boss_at = self.next_boss_at.saturating_add(tuning.boss_increment.max(1));

        let start = self
            .last_obstacle_z
            .map_or(-SPAWN_HORIZON, |z| z.min(-SPAWN_HORIZON))
            - tuning.min_gap_hard;
        for row in 0..tuning.boss_rows {
            let z = start - row as f32 * tuning.boss_row_spacing;
            let kind = if row % 2 == 0 {
                ObstacleKind::Ground
            } else {
                ObstacleKind::Air
            };
            let open = rng.index(Lane::ALL.len());
            for (i, lane) in Lane::ALL.into_iter().enumerate() {
                if i != open {
                    self.pending.push_back(PendingObstacle {
                        lane,
                        z,
                        kind,
                        oscillation: None,
                    });
                }
            }
            self.last_obstacle_z = Some(z);
        }

        log::info!("boss burst at score {} ({} rows)", threshold, tuning.boss_rows);
        Some(threshold)
    }

    fn release_pending(&mut self, pools: &mut EntityPools) {
        let mut waiting = VecDeque::with_capacity(self.pending.len());
        while let Some(piece) = self.pending.pop_front() {
            if piece.z < -SPAWN_HORIZON {
                waiting.push_back(piece);
            } else if piece.z > PENDING_DROP_Z {
                log::debug!("dropping pending obstacle that never found a slot (z={:.1})", piece.z);
            } else if pools.obstacles.spawn(piece.entity()).is_none() {
                waiting.push_back(piece);
            }
        }
        self.pending = waiting;
    }

    fn spawn_obstacles(&mut self, ctx: &SpawnContext, pools: &mut EntityPools, rng: &mut RunRng) {
        // Throttle: a full pool or an unfinished pattern waits for later frames
        if pools.obstacles.is_full() || !self.pending.is_empty() {
            return;
        }

        let t = ctx.tuning;
        let d = ctx.difficulty;
        let gap = lerp(t.min_gap_easy, t.min_gap_hard, d);
        let z = -SPAWN_HORIZON;
        if self.last_obstacle_z.is_some_and(|last| last - gap < z) {
            return;
        }

        if rng.chance(lerp(t.pattern_chance_easy, t.pattern_chance_hard, d)) {
            let eligible: Vec<&Pattern> = PATTERNS.iter().filter(|p| p.min_difficulty <= d).collect();
            if !eligible.is_empty() {
                let pattern = eligible[rng.index(eligible.len())];
                let mirrored = rng.chance(0.5);
                self.queue_pattern(pattern, z, mirrored, pools);
                return;
            }
        }

        self.place_single(z, ctx, pools, rng);
    }

    fn queue_pattern(&mut self, pattern: &Pattern, z: f32, mirrored: bool, pools: &mut EntityPools) {
        log::trace!("pattern {} (mirrored: {})", pattern.name, mirrored);
        let mut furthest = z;
        for piece in pattern.pieces {
            let lane = Lane::new(if mirrored { -piece.lane } else { piece.lane });
            let pz = z - piece.dz;
            furthest = furthest.min(pz);
            self.pending.push_back(PendingObstacle {
                lane,
                z: pz,
                kind: piece.kind,
                oscillation: None,
            });
        }
        self.last_obstacle_z = Some(furthest);
        self.release_pending(pools);
    }

    fn place_single(&mut self, z: f32, ctx: &SpawnContext, pools: &mut EntityPools, rng: &mut RunRng) {
        let t = ctx.tuning;
        let d = ctx.difficulty;
        let lane = Lane::ALL[rng.index(Lane::ALL.len())];
        let kind = if rng.chance(lerp(t.air_ratio_easy, t.air_ratio_hard, d)) {
            ObstacleKind::Air
        } else {
            ObstacleKind::Ground
        };
        let oscillation = if kind == ObstacleKind::Ground
            && d >= t.oscillation_min_difficulty
            && rng.chance(t.oscillation_chance)
        {
            Some(Oscillation {
                amplitude: rng.range(0.3, 0.8),
                frequency_hz: rng.range(0.25, 0.6),
                phase: rng.range(0.0, TAU),
            })
        } else {
            None
        };

        if pools
            .obstacles
            .spawn(Entity::obstacle(lane, z, kind, oscillation))
            .is_some()
        {
            self.last_obstacle_z = Some(z);
        }
    }

    fn spawn_coins(&mut self, tuning: &Tuning, pools: &mut EntityPools, rng: &mut RunRng) {
        while pools.coins.active_count() < tuning.min_active_coins {
            let z = self
                .coin_cursor_z
                .map_or(FIRST_COIN_Z, |c| (c - tuning.coin_spacing).min(FIRST_COIN_Z));
            if z < -SPAWN_HORIZON {
                break;
            }

            let lane = if rng.chance(tuning.coin_lane_streak) {
                self.last_coin_lane
            } else {
                Lane::ALL[rng.index(Lane::ALL.len())]
            };
            let y = match pools.obstacle_near(lane, z, COIN_CLEARANCE) {
                Some(ObstacleKind::Ground) => COIN_HIGH_Y,
                Some(ObstacleKind::Air) => COIN_LOW_Y,
                None => COIN_Y,
            };
            if pools.coins.spawn(Entity::coin(lane, z, y)).is_none() {
                break;
            }
            self.coin_cursor_z = Some(z);
            self.last_coin_lane = lane;
        }
    }

    fn spawn_sky_row(&mut self, ctx: &SpawnContext, pools: &mut EntityPools) {
        let t = ctx.tuning;
        if !self.was_flying {
            self.sky_rows_used = 0;
            self.sky_ready_at = ctx.now;
        }
        if self.sky_rows_used >= t.sky_row_budget || ctx.now < self.sky_ready_at {
            return;
        }
        if pools.coins.capacity() - pools.coins.active_count() < Lane::ALL.len() {
            return;
        }

        let y = FLIGHT_ALTITUDE + PLAYER_HEIGHT / 2.0;
        for lane in Lane::ALL {
            pools.coins.spawn(Entity::coin(lane, -t.sky_row_distance, y));
        }
        self.sky_rows_used += 1;
        self.sky_ready_at = ctx.now + t.sky_row_cooldown_ms;
    }

    fn spawn_power_up(&mut self, ctx: &SpawnContext, pools: &mut EntityPools, rng: &mut RunRng) {
        let t = ctx.tuning;
        if pools.power_ups.active_count() >= t.power_up_cap {
            return;
        }
        if !rng.chance(t.power_up_rate_per_sec * ctx.dt_secs) {
            return;
        }
        let Some(i) = rng.weighted(&t.power_up_weights) else {
            return;
        };
        let kind = PowerUpKind::ALL[i];
        let lane = Lane::ALL[rng.index(Lane::ALL.len())];
        let z = -SPAWN_HORIZON;
        if pools.obstacle_near(lane, z, POWER_UP_CLEARANCE).is_some() {
            log::debug!("power-up {:?} skipped, lane {} blocked", kind, lane.index());
            return;
        }
        pools.power_ups.spawn(Entity::power_up(lane, z, kind));
    }

    fn spawn_crystals(&mut self, tuning: &Tuning, pools: &mut EntityPools, rng: &mut RunRng) {
        while pools.crystals.active_count() < tuning.min_active_crystals {
            let z = self
                .crystal_cursor_z
                .map_or(FIRST_CRYSTAL_Z, |c| (c - tuning.crystal_spacing).min(FIRST_CRYSTAL_Z));
            if z < -SPAWN_HORIZON {
                break;
            }
            let lane = Lane::ALL[rng.index(Lane::ALL.len())];
            if pools.crystals.spawn(Entity::crystal(lane, z)).is_none() {
                break;
            }
            self.crystal_cursor_z = Some(z);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    const DT_MS: f64 = 16.0;

    /// Drive the scheduler the way a tick does, checking the horizon after
    /// every spawn pass
    fn run_frames(
        scheduler: &mut SpawnScheduler,
        pools: &mut EntityPools,
        rng: &mut RunRng,
        tuning: &Tuning,
        frames: std::ops::Range<usize>,
        difficulty: f32,
        flying: bool,
    ) {
        let dt_secs = (DT_MS / 1000.0) as f32;
        for i in frames {
            let now = i as f64 * DT_MS;
            let ctx = SpawnContext {
                now,
                dt_secs,
                difficulty,
                flying,
                tuning,
            };
            scheduler.update(&ctx, pools, rng);
            for pool in [&pools.obstacles, &pools.coins, &pools.power_ups, &pools.crystals] {
                for (_, e) in pool.iter_active() {
                    assert!(e.pos.z >= -SPAWN_HORIZON - 1e-3, "spawned beyond horizon: {}", e.pos.z);
                    assert!(e.pos.z <= DESPAWN_Z);
                }
            }
            assert!(pools.power_ups.active_count() <= tuning.power_up_cap);
            pools.advance(dt_secs, BASE_SPEED, now, None);
            scheduler.scroll(BASE_SPEED * dt_secs);
        }
    }

    fn obstacle_layout(pools: &EntityPools) -> Vec<(i8, u32)> {
        pools
            .obstacles
            .iter_active()
            .map(|(_, e)| (e.lane().index(), e.pos.z.to_bits()))
            .collect()
    }

    #[test]
    fn test_difficulty_curve() {
        let tuning = Tuning::default();
        assert_eq!(difficulty(0.0, 0, 0.0, &tuning), 0.0);
        assert_eq!(difficulty(tuning.difficulty_horizon_ms, 0, 0.0, &tuning), 1.0);
        assert!((difficulty(45_000.0, 0, 0.0, &tuning) - 0.5).abs() < 1e-6);
        assert!((difficulty(0.0, 0, 0.3, &tuning) - 0.3).abs() < 1e-6);
        assert_eq!(difficulty(0.0, 0, 5.0, &tuning), 1.0);

        // Huge score is ignored before the adaptive gate, counted after it
        let early = difficulty(5_000.0, 1_000_000, 0.0, &tuning);
        assert!((early - difficulty(5_000.0, 0, 0.0, &tuning)).abs() < 1e-6);
        let late = difficulty(20_000.0, 1_000_000, 0.0, &tuning);
        let late_plain = difficulty(20_000.0, 0, 0.0, &tuning);
        assert!((late - late_plain - tuning.adaptive_weight as f32).abs() < 1e-5);
    }

    #[test]
    fn test_patterns_leave_a_way_through() {
        for pattern in PATTERNS {
            let mut rows: BTreeMap<u32, Vec<ObstacleKind>> = BTreeMap::new();
            for piece in pattern.pieces {
                rows.entry(piece.dz.to_bits()).or_default().push(piece.kind);
            }
            for row in rows.values() {
                let all_ground = row.iter().all(|&k| k == ObstacleKind::Ground);
                assert!(row.len() < 3 || !all_ground, "pattern {} has a solid row", pattern.name);
            }
        }
    }

    #[test]
    fn test_warmup_holds_obstacles_but_lays_pickups() {
        let tuning = Tuning::default();
        let mut scheduler = SpawnScheduler::new(&tuning);
        let mut pools = EntityPools::default();
        let mut rng = RunRng::new(42);
        run_frames(&mut scheduler, &mut pools, &mut rng, &tuning, 0..1, 1.0, false);

        assert_eq!(pools.obstacles.active_count(), 0);
        assert_eq!(pools.coins.active_count(), tuning.min_active_coins);
        assert_eq!(pools.crystals.active_count(), tuning.min_active_crystals);
    }

    #[test]
    fn test_single_obstacles_respect_min_gap() {
        let tuning = Tuning {
            pattern_chance_easy: 0.0,
            pattern_chance_hard: 0.0,
            ..Tuning::default()
        };
        let d = 0.5;
        let gap = lerp(tuning.min_gap_easy, tuning.min_gap_hard, d);
        let mut scheduler = SpawnScheduler::new(&tuning);
        let mut pools = EntityPools::default();
        let mut rng = RunRng::new(9);

        for chunk in 0..20 {
            let start = chunk * 100;
            run_frames(&mut scheduler, &mut pools, &mut rng, &tuning, start..start + 100, d, false);
            let mut zs: Vec<f32> = pools.obstacles.iter_active().map(|(_, e)| e.pos.z).collect();
            zs.sort_by(f32::total_cmp);
            for pair in zs.windows(2) {
                assert!(pair[1] - pair[0] >= gap - 1e-3, "gap {} < {}", pair[1] - pair[0], gap);
            }
        }
        assert!(pools.obstacles.active_count() > 0);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let tuning = Tuning::default();
        let layout = |seed| {
            let mut scheduler = SpawnScheduler::new(&tuning);
            let mut pools = EntityPools::default();
            let mut rng = RunRng::new(seed);
            run_frames(&mut scheduler, &mut pools, &mut rng, &tuning, 0..900, 0.8, false);
            obstacle_layout(&pools)
        };
        let a = layout(42);
        assert!(!a.is_empty());
        assert_eq!(a, layout(42));
    }

    #[test]
    fn test_boss_burst_rows_keep_an_open_lane() {
        let tuning = Tuning::default();
        let mut scheduler = SpawnScheduler::new(&tuning);
        let mut pools = EntityPools::default();
        let mut rng = RunRng::new(3);

        assert_eq!(scheduler.check_boss(tuning.boss_first_threshold - 1, &mut rng, &tuning), None);
        assert_eq!(
            scheduler.check_boss(tuning.boss_first_threshold, &mut rng, &tuning),
            Some(tuning.boss_first_threshold)
        );
        assert_eq!(
            scheduler.next_boss_at(),
            tuning.boss_first_threshold + tuning.boss_increment
        );
        assert_eq!(scheduler.check_boss(tuning.boss_first_threshold + 1, &mut rng, &tuning), None);

        let queued: Vec<PendingObstacle> = scheduler.pending().copied().collect();
        assert_eq!(queued.len(), tuning.boss_rows * 2);
        for row in queued.chunks(2) {
            assert_eq!(row[0].z, row[1].z);
            assert_eq!(row[0].kind, row[1].kind);
            assert_ne!(row[0].lane, row[1].lane);
            assert!(row[0].z < -SPAWN_HORIZON);
        }
        assert_eq!(queued[0].kind, ObstacleKind::Ground);
        assert_eq!(queued[2].kind, ObstacleKind::Air);

        // Pieces are released as they scroll into range
        let dt_secs = 0.016;
        let mut released = 0;
        for frame in 0..200 {
            let ctx = SpawnContext {
                now: frame as f64 * DT_MS,
                dt_secs,
                difficulty: 0.0,
                flying: false,
                tuning: &tuning,
            };
            scheduler.update(&ctx, &mut pools, &mut rng);
            released = released.max(pools.obstacles.active_count());
            pools.advance(dt_secs, BASE_SPEED, ctx.now, None);
            scheduler.scroll(BASE_SPEED * dt_secs);
        }
        assert!(released >= 2);
    }

    #[test]
    fn test_sky_rows_while_flying() {
        let tuning = Tuning::default();
        let mut scheduler = SpawnScheduler::new(&tuning);
        let mut pools = EntityPools::default();
        let mut rng = RunRng::new(5);

        let ctx = SpawnContext {
            now: 0.0,
            dt_secs: 0.016,
            difficulty: 0.0,
            flying: true,
            tuning: &tuning,
        };
        scheduler.update(&ctx, &mut pools, &mut rng);
        let sky_y = FLIGHT_ALTITUDE + PLAYER_HEIGHT / 2.0;
        let sky: Vec<f32> = pools
            .coins
            .iter_active()
            .filter(|(_, e)| (e.pos.y - sky_y).abs() < 1e-6)
            .map(|(_, e)| e.pos.z)
            .collect();
        assert_eq!(sky.len(), Lane::ALL.len());
        assert!(sky.iter().all(|&z| z == -tuning.sky_row_distance));
        // No ground coins are laid during flight
        assert_eq!(pools.coins.active_count(), Lane::ALL.len());

        // The budget caps the rows per flight
        let tight = Tuning {
            sky_row_budget: 2,
            ..Tuning::default()
        };
        let mut scheduler = SpawnScheduler::new(&tight);
        let mut pools = EntityPools::default();
        run_frames(&mut scheduler, &mut pools, &mut rng, &tight, 0..200, 0.0, true);
        assert_eq!(scheduler.sky_rows_used, 2);
    }
}
