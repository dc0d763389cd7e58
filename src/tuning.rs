//! Data-driven game balance
//!
//! Every knob that shapes feel or pacing lives here rather than in
//! [`crate::consts`], so a host can ship a balance table without rebuilding.
//! Geometry (lane width, box sizes) stays in `consts`.

use serde::{Deserialize, Serialize};

use crate::error::TuningError;
use crate::sim::PowerUpKind;

/// Balance table for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Jump forgiveness ===
    /// Coyote window after leaving the ground (ms)
    pub coyote_ms: f64,
    /// Coyote window in assist mode (ms)
    pub assist_coyote_ms: f64,
    /// How long an early jump press is remembered (ms)
    pub jump_buffer_ms: f64,
    /// Jump impulse bonus per jump-upgrade level
    pub jump_upgrade_step: f32,
    /// Jump impulse bonus per unit of speed ratio above base speed
    pub jump_speed_scale: f32,
    /// Upper bound on the speed-derived jump bonus
    pub jump_speed_scale_cap: f32,

    // === Slide / dash ===
    pub slide_ms: f64,
    pub slide_per_combo_ms: f64,
    pub slide_per_upgrade_ms: f64,
    pub slide_cooldown_ms: f64,
    pub dash_cooldown_ms: f64,

    // === Hits ===
    pub hit_invincibility_ms: f64,
    pub shield_grace_ms: f64,
    /// Invincibility after flight ends
    pub landing_grace_ms: f64,
    /// Player box inflation along scroll axis, in seconds of travel
    pub collision_sweep_pad: f32,
    /// Band around the player box that counts as a near miss
    pub near_miss_tolerance: f32,
    pub slow_motion_ms: f64,
    /// Simulation time scale while slow motion is active
    pub slow_motion_scale: f64,

    // === Combo / scoring ===
    pub combo_window_ms: f64,
    pub combo_cap: u8,
    pub combo_step: f64,
    pub coin_base: u64,
    pub chain_window_ms: f64,
    pub chain_needed: usize,
    pub chain_boost_ms: f64,
    /// Combo level that grants the small auto-magnet
    pub auto_magnet_combo: u8,
    pub auto_magnet_radius: f32,

    // === Power-ups ===
    pub magnet_radius: f32,
    /// Extra closing speed of magnetized coins (units/s)
    pub magnet_pull_speed: f32,
    pub magnet_ms: f64,
    pub boost_ms: f64,
    pub shield_ms: f64,
    pub double_ms: f64,
    pub risk_ms: f64,
    pub flight_ms: f64,
    pub boost_multiplier: f32,
    pub risk_speed_multiplier: f32,

    // === Difficulty ===
    /// Elapsed time to reach full difficulty (ms)
    pub difficulty_horizon_ms: f64,
    /// Adaptive term waits for this much play before trusting score/sec
    pub adaptive_min_elapsed_ms: f64,
    pub adaptive_sps_baseline: f64,
    pub adaptive_sps_range: f64,
    pub adaptive_weight: f64,

    // === Obstacles ===
    pub obstacle_warmup_ms: f64,
    pub min_gap_easy: f32,
    pub min_gap_hard: f32,
    pub pattern_chance_easy: f32,
    pub pattern_chance_hard: f32,
    pub air_ratio_easy: f32,
    pub air_ratio_hard: f32,
    pub oscillation_min_difficulty: f32,
    pub oscillation_chance: f32,
    pub boss_first_threshold: u64,
    pub boss_increment: u64,
    pub boss_rows: usize,
    pub boss_row_spacing: f32,

    // === Pickups ===
    pub min_active_coins: usize,
    pub coin_spacing: f32,
    /// Chance the next coin stays in the previous coin's lane
    pub coin_lane_streak: f32,
    pub power_up_cap: usize,
    pub power_up_rate_per_sec: f32,
    /// Draw weights in [`PowerUpKind::ALL`] order
    pub power_up_weights: [u32; PowerUpKind::COUNT],
    pub min_active_crystals: usize,
    pub crystal_spacing: f32,
    pub sky_row_cooldown_ms: f64,
    pub sky_row_budget: u32,
    pub sky_row_distance: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            coyote_ms: 100.0,
            assist_coyote_ms: 160.0,
            jump_buffer_ms: 120.0,
            jump_upgrade_step: 0.03,
            jump_speed_scale: 0.08,
            jump_speed_scale_cap: 0.12,

            slide_ms: 650.0,
            slide_per_combo_ms: 30.0,
            slide_per_upgrade_ms: 50.0,
            slide_cooldown_ms: 250.0,
            dash_cooldown_ms: 900.0,

            hit_invincibility_ms: 1200.0,
            shield_grace_ms: 500.0,
            landing_grace_ms: 600.0,
            collision_sweep_pad: 0.02,
            near_miss_tolerance: 0.4,
            slow_motion_ms: 250.0,
            slow_motion_scale: 0.5,

            combo_window_ms: 2500.0,
            combo_cap: 5,
            combo_step: 0.25,
            coin_base: 10,
            chain_window_ms: 1800.0,
            chain_needed: 4,
            chain_boost_ms: 2500.0,
            auto_magnet_combo: 4,
            auto_magnet_radius: 3.5,

            magnet_radius: 8.0,
            magnet_pull_speed: 30.0,
            magnet_ms: 8000.0,
            boost_ms: 6000.0,
            shield_ms: 10_000.0,
            double_ms: 8000.0,
            risk_ms: 7000.0,
            flight_ms: 5000.0,
            boost_multiplier: 1.5,
            risk_speed_multiplier: 1.2,

            difficulty_horizon_ms: 90_000.0,
            adaptive_min_elapsed_ms: 10_000.0,
            adaptive_sps_baseline: 8.0,
            adaptive_sps_range: 40.0,
            adaptive_weight: 0.15,

            obstacle_warmup_ms: 3000.0,
            min_gap_easy: 26.0,
            min_gap_hard: 12.0,
            pattern_chance_easy: 0.25,
            pattern_chance_hard: 0.7,
            air_ratio_easy: 0.15,
            air_ratio_hard: 0.5,
            oscillation_min_difficulty: 0.5,
            oscillation_chance: 0.2,
            boss_first_threshold: 1500,
            boss_increment: 2000,
            boss_rows: 6,
            boss_row_spacing: 12.0,

            min_active_coins: 10,
            coin_spacing: 4.0,
            coin_lane_streak: 0.8,
            power_up_cap: 2,
            power_up_rate_per_sec: 0.12,
            // magnet, boost, shield, double, risk, flight, extra life
            power_up_weights: [20, 16, 16, 14, 10, 8, 6],
            min_active_crystals: 2,
            crystal_spacing: 45.0,
            sky_row_cooldown_ms: 350.0,
            sky_row_budget: 12,
            sky_row_distance: 50.0,
        }
    }
}

impl Tuning {
    /// Parse a balance table handed over by the host and validate it.
    /// Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values that would break the simulation's invariants
    pub fn validate(&self) -> Result<(), TuningError> {
        let durations = [
            ("coyote_ms", self.coyote_ms),
            ("assist_coyote_ms", self.assist_coyote_ms),
            ("jump_buffer_ms", self.jump_buffer_ms),
            ("slide_ms", self.slide_ms),
            ("slide_cooldown_ms", self.slide_cooldown_ms),
            ("dash_cooldown_ms", self.dash_cooldown_ms),
            ("hit_invincibility_ms", self.hit_invincibility_ms),
            ("shield_grace_ms", self.shield_grace_ms),
            ("combo_window_ms", self.combo_window_ms),
            ("chain_window_ms", self.chain_window_ms),
            ("magnet_ms", self.magnet_ms),
            ("boost_ms", self.boost_ms),
            ("shield_ms", self.shield_ms),
            ("double_ms", self.double_ms),
            ("risk_ms", self.risk_ms),
            ("flight_ms", self.flight_ms),
        ];
        for (field, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(TuningError::OutOfRange { field, value });
            }
        }

        if self.difficulty_horizon_ms <= 0.0 || !self.difficulty_horizon_ms.is_finite() {
            return Err(TuningError::OutOfRange {
                field: "difficulty_horizon_ms",
                value: self.difficulty_horizon_ms,
            });
        }
        if !(1..=5).contains(&self.combo_cap) {
            return Err(TuningError::OutOfRange {
                field: "combo_cap",
                value: self.combo_cap as f64,
            });
        }
        if self.chain_needed == 0 {
            return Err(TuningError::OutOfRange {
                field: "chain_needed",
                value: 0.0,
            });
        }
        if !(self.slow_motion_scale > 0.0 && self.slow_motion_scale <= 1.0) {
            return Err(TuningError::OutOfRange {
                field: "slow_motion_scale",
                value: self.slow_motion_scale,
            });
        }
        if self.min_gap_hard <= 0.0 || self.min_gap_easy < self.min_gap_hard {
            return Err(TuningError::OutOfRange {
                field: "min_gap_hard",
                value: self.min_gap_hard as f64,
            });
        }
        if self.coin_spacing <= 0.0 || self.crystal_spacing <= 0.0 {
            return Err(TuningError::OutOfRange {
                field: "coin_spacing",
                value: self.coin_spacing.min(self.crystal_spacing) as f64,
            });
        }
        if self.power_up_weights.iter().all(|&w| w == 0) {
            return Err(TuningError::OutOfRange {
                field: "power_up_weights",
                value: 0.0,
            });
        }
        Ok(())
    }

    /// Duration of the timed effect granted by a power-up
    pub fn effect_duration_ms(&self, kind: PowerUpKind) -> f64 {
        match kind {
            PowerUpKind::Magnet => self.magnet_ms,
            PowerUpKind::Boost => self.boost_ms,
            PowerUpKind::Shield => self.shield_ms,
            PowerUpKind::Double => self.double_ms,
            PowerUpKind::Risk => self.risk_ms,
            PowerUpKind::Flight => self.flight_ms,
            PowerUpKind::ExtraLife => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_from_json_partial_override() {
        let tuning = Tuning::from_json(r#"{ "chain_needed": 6, "coyote_ms": 90.0 }"#)
            .expect("valid tuning");
        assert_eq!(tuning.chain_needed, 6);
        assert_eq!(tuning.coyote_ms, 90.0);
        // Untouched fields keep defaults
        assert_eq!(tuning.combo_window_ms, 2500.0);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        let err = Tuning::from_json(r#"{ "combo_cap": 9 }"#).unwrap_err();
        assert!(matches!(
            err,
            TuningError::OutOfRange {
                field: "combo_cap",
                ..
            }
        ));

        let err = Tuning::from_json(r#"{ "boost_ms": -1.0 }"#).unwrap_err();
        assert!(matches!(err, TuningError::OutOfRange { field: "boost_ms", .. }));

        assert!(matches!(
            Tuning::from_json("not json").unwrap_err(),
            TuningError::Parse(_)
        ));
    }
}
