//! Timed power-up effects, combo and chain boost
//!
//! All timers are absolute expiry timestamps compared against the frame's
//! `now`. Nothing here is decremented per tick, so pausing (which freezes
//! `now`) freezes every effect with it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::entity::{Magnet, PowerUpKind};
use super::player::Player;
use crate::tuning::Tuning;

/// Effects that run on a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Magnet,
    Boost,
    Shield,
    Double,
    Risk,
    Flight,
}

impl Effect {
    pub const COUNT: usize = 6;

    fn index(self) -> usize {
        match self {
            Effect::Magnet => 0,
            Effect::Boost => 1,
            Effect::Shield => 2,
            Effect::Double => 3,
            Effect::Risk => 4,
            Effect::Flight => 5,
        }
    }

    /// Timed effect granted by a power-up, `None` for instant ones
    pub fn from_power_up(kind: PowerUpKind) -> Option<Effect> {
        match kind {
            PowerUpKind::Magnet => Some(Effect::Magnet),
            PowerUpKind::Boost => Some(Effect::Boost),
            PowerUpKind::Shield => Some(Effect::Shield),
            PowerUpKind::Double => Some(Effect::Double),
            PowerUpKind::Risk => Some(Effect::Risk),
            PowerUpKind::Flight => Some(Effect::Flight),
            PowerUpKind::ExtraLife => None,
        }
    }
}

/// One "active-until" timestamp per effect
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifierTimers {
    until: [f64; Effect::COUNT],
}

impl ModifierTimers {
    /// Refresh, never reset: the new expiry is the later of the two
    pub fn activate(&mut self, effect: Effect, now: f64, duration_ms: f64) -> f64 {
        let slot = &mut self.until[effect.index()];
        *slot = slot.max(now + duration_ms);
        *slot
    }

    pub fn is_active(&self, effect: Effect, now: f64) -> bool {
        now < self.until[effect.index()]
    }

    pub fn until(&self, effect: Effect) -> f64 {
        self.until[effect.index()]
    }

    pub fn remaining(&self, effect: Effect, now: f64) -> f64 {
        (self.until[effect.index()] - now).max(0.0)
    }

    pub fn clear(&mut self, effect: Effect) {
        self.until[effect.index()] = 0.0;
    }
}

/// Coin streak with lazy decay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComboState {
    count: u8,
    last_pickup_at: Option<f64>,
}

impl ComboState {
    /// Current combo; reads 0 once the window has lapsed
    pub fn read(&self, now: f64, window_ms: f64) -> u8 {
        match self.last_pickup_at {
            Some(at) if now - at <= window_ms => self.count,
            _ => 0,
        }
    }

    /// Register a pickup and return the new combo
    pub fn register(&mut self, now: f64, window_ms: f64, cap: u8) -> u8 {
        let current = self.read(now, window_ms);
        self.count = if current == 0 { 1 } else { (current + 1).min(cap) };
        self.last_pickup_at = Some(now);
        self.count
    }
}

/// Points and side effects of one coin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoinAward {
    pub points: u64,
    pub combo: u8,
    /// This pickup completed a chain and granted boost
    pub chain_boost: bool,
}

/// All run modifiers, owned by the run state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifierEngine {
    pub timers: ModifierTimers,
    pub combo: ComboState,
    /// Timestamps of recent pickups inside the chain window
    chain: VecDeque<f64>,
}

impl ModifierEngine {
    pub fn is_active(&self, effect: Effect, now: f64) -> bool {
        self.timers.is_active(effect, now)
    }

    pub fn combo(&self, now: f64, tuning: &Tuning) -> u8 {
        self.combo.read(now, tuning.combo_window_ms)
    }

    /// Score a coin: `base × (1 + min(cap, combo) × step) × risk`
    pub fn collect_coin(&mut self, now: f64, tuning: &Tuning) -> CoinAward {
        let combo = self
            .combo
            .register(now, tuning.combo_window_ms, tuning.combo_cap);
        let risk = if self.is_active(Effect::Risk, now) { 2.0 } else { 1.0 };
        let multiplier = 1.0 + combo.min(tuning.combo_cap) as f64 * tuning.combo_step;
        let points = (tuning.coin_base as f64 * multiplier * risk).floor() as u64;

        while self
            .chain
            .front()
            .is_some_and(|&at| now - at > tuning.chain_window_ms)
        {
            self.chain.pop_front();
        }
        self.chain.push_back(now);

        let chain_boost = self.chain.len() >= tuning.chain_needed;
        if chain_boost {
            self.timers.activate(Effect::Boost, now, tuning.chain_boost_ms);
            self.chain.clear();
        }

        CoinAward {
            points,
            combo,
            chain_boost,
        }
    }

    /// Apply a power-up the moment it is picked up
    pub fn apply_power_up(&mut self, kind: PowerUpKind, now: f64, player: &mut Player, tuning: &Tuning) {
        match Effect::from_power_up(kind) {
            Some(effect) => {
                self.timers
                    .activate(effect, now, tuning.effect_duration_ms(kind));
                if effect == Effect::Flight {
                    player.enter_flight();
                }
            }
            None => {
                player.add_life();
            }
        }
    }

    /// Spend the shield if one is up
    pub fn consume_shield(&mut self, now: f64) -> bool {
        if self.timers.is_active(Effect::Shield, now) {
            self.timers.clear(Effect::Shield);
            true
        } else {
            false
        }
    }

    /// Coin attraction this frame: the magnet power-up, or the small
    /// combo auto-magnet when grounded physics are in effect
    pub fn magnet(&self, now: f64, player: &Player, tuning: &Tuning) -> Option<Magnet> {
        let radius = if self.is_active(Effect::Magnet, now) {
            tuning.magnet_radius
        } else if !player.is_flying() && self.combo(now, tuning) >= tuning.auto_magnet_combo {
            tuning.auto_magnet_radius
        } else {
            return None;
        };
        Some(Magnet {
            center: player.body_center(),
            radius,
            pull_speed: tuning.magnet_pull_speed,
        })
    }

    /// Scroll speed multiplier from boost and risk
    pub fn speed_multiplier(&self, now: f64, tuning: &Tuning) -> f32 {
        let mut m = 1.0;
        if self.is_active(Effect::Boost, now) {
            m *= tuning.boost_multiplier;
        }
        if self.is_active(Effect::Risk, now) {
            m *= tuning.risk_speed_multiplier;
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::MAX_LIVES;
    use crate::sim::player::VerticalState;

    #[test]
    fn test_refresh_not_reset() {
        let tuning = Tuning::default();
        let mut timers = ModifierTimers::default();
        timers.activate(Effect::Boost, 0.0, tuning.boost_ms);

        // 2000ms left, re-acquire with the full 6000ms duration
        let now = 4000.0;
        assert_eq!(timers.remaining(Effect::Boost, now), 2000.0);
        let until = timers.activate(Effect::Boost, now, tuning.boost_ms);
        assert_eq!(until, now + 6000.0);

        // A shorter grant never cuts the remaining time
        let until = timers.activate(Effect::Boost, now, 500.0);
        assert_eq!(until, now + 6000.0);
    }

    #[test]
    fn test_effect_active_strictly_before_until() {
        let mut timers = ModifierTimers::default();
        timers.activate(Effect::Risk, 100.0, 1000.0);
        assert!(timers.is_active(Effect::Risk, 1099.9));
        assert!(!timers.is_active(Effect::Risk, 1100.0));
    }

    #[test]
    fn test_combo_chain_and_auto_boost() {
        let tuning = Tuning::default();
        let mut engine = ModifierEngine::default();

        let a = engine.collect_coin(0.0, &tuning);
        let b = engine.collect_coin(400.0, &tuning);
        let c = engine.collect_coin(900.0, &tuning);
        assert_eq!((a.combo, b.combo, c.combo), (1, 2, 3));
        assert_eq!(engine.combo(900.0, &tuning), 3);
        assert!(!c.chain_boost);
        assert!(!engine.is_active(Effect::Boost, 900.0));

        let d = engine.collect_coin(1400.0, &tuning);
        assert_eq!(d.combo, 4);
        assert!(d.chain_boost);
        assert!(engine.is_active(Effect::Boost, 1400.0));
        assert_eq!(engine.timers.until(Effect::Boost), 1400.0 + tuning.chain_boost_ms);
    }

    #[test]
    fn test_combo_lazily_decays_and_caps() {
        let tuning = Tuning::default();
        let mut engine = ModifierEngine::default();
        let mut now = 0.0;
        for _ in 0..8 {
            engine.collect_coin(now, &tuning);
            now += 100.0;
        }
        assert_eq!(engine.combo(now, &tuning), tuning.combo_cap);

        let late = now + tuning.combo_window_ms + 1.0;
        assert_eq!(engine.combo(late, &tuning), 0);
        assert_eq!(engine.collect_coin(late, &tuning).combo, 1);
    }

    #[test]
    fn test_coin_points_use_combo_and_risk() {
        let tuning = Tuning::default();
        let mut engine = ModifierEngine::default();
        // combo 1: 10 × 1.25
        assert_eq!(engine.collect_coin(0.0, &tuning).points, 12);

        engine.timers.activate(Effect::Risk, 0.0, tuning.risk_ms);
        // combo 2: 10 × 1.5 × 2
        assert_eq!(engine.collect_coin(100.0, &tuning).points, 30);
    }

    #[test]
    fn test_chain_window_drops_stale_pickups() {
        let tuning = Tuning::default();
        let mut engine = ModifierEngine::default();
        engine.collect_coin(0.0, &tuning);
        engine.collect_coin(1000.0, &tuning);
        engine.collect_coin(2000.0, &tuning);
        // The pickup at 0 fell out of the 1800ms window
        assert!(!engine.collect_coin(2500.0, &tuning).chain_boost);
        assert!(engine.collect_coin(2600.0, &tuning).chain_boost);
    }

    #[test]
    fn test_shield_is_consumed_once() {
        let tuning = Tuning::default();
        let mut engine = ModifierEngine::default();
        let mut player = Player::default();
        engine.apply_power_up(PowerUpKind::Shield, 0.0, &mut player, &tuning);
        assert!(engine.consume_shield(10.0));
        assert!(!engine.consume_shield(20.0));
    }

    #[test]
    fn test_flight_and_extra_life() {
        let tuning = Tuning::default();
        let mut engine = ModifierEngine::default();
        let mut player = Player::default();

        engine.apply_power_up(PowerUpKind::Flight, 50.0, &mut player, &tuning);
        assert_eq!(player.state, VerticalState::Flying);
        assert!(engine.is_active(Effect::Flight, 50.0 + tuning.flight_ms - 1.0));

        player.lives = 1;
        engine.apply_power_up(PowerUpKind::ExtraLife, 60.0, &mut player, &tuning);
        assert_eq!(player.lives, 2);
        player.lives = MAX_LIVES;
        engine.apply_power_up(PowerUpKind::ExtraLife, 70.0, &mut player, &tuning);
        assert_eq!(player.lives, MAX_LIVES);
    }

    #[test]
    fn test_auto_magnet_needs_combo_and_ground() {
        let tuning = Tuning::default();
        let mut engine = ModifierEngine::default();
        let mut player = Player::default();
        assert!(engine.magnet(0.0, &player, &tuning).is_none());

        for i in 0..tuning.auto_magnet_combo {
            engine.collect_coin(i as f64 * 100.0, &tuning);
        }
        let now = 400.0;
        let auto = engine.magnet(now, &player, &tuning).expect("auto magnet");
        assert_eq!(auto.radius, tuning.auto_magnet_radius);

        player.enter_flight();
        assert!(engine.magnet(now, &player, &tuning).is_none());

        engine.timers.activate(Effect::Magnet, now, tuning.magnet_ms);
        let full = engine.magnet(now, &player, &tuning).expect("magnet power-up");
        assert_eq!(full.radius, tuning.magnet_radius);
    }

    #[test]
    fn test_speed_multiplier_stacks() {
        let tuning = Tuning::default();
        let mut engine = ModifierEngine::default();
        assert_eq!(engine.speed_multiplier(0.0, &tuning), 1.0);
        engine.timers.activate(Effect::Boost, 0.0, 1000.0);
        engine.timers.activate(Effect::Risk, 0.0, 1000.0);
        let m = engine.speed_multiplier(10.0, &tuning);
        assert!((m - tuning.boost_multiplier * tuning.risk_speed_multiplier).abs() < 1e-6);
    }
}
