//! Player physics and input resolution
//!
//! Vertical state machine:
//! - `Grounded -> Airborne` on jump, or when y leaves the ground plane
//! - `Airborne -> Grounded` when y returns to the ground (a buffered jump fires here)
//! - `Grounded/Airborne <-> Sliding` manual, time-boxed, cancelled by jump
//! - `* -> Flying` only through the flight power-up
//! - `Flying -> Grounded` when the flight timer expires

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::lane::Lane;
use super::state::GameEvent;
use super::tick::TickInput;
use crate::approach;
use crate::consts::*;
use crate::tuning::Tuning;

/// Highest purchasable upgrade level
pub const MAX_UPGRADE_LEVEL: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalState {
    Grounded,
    Airborne,
    Sliding,
    Flying,
}

/// Persistent upgrades bought with crystals (owned by the host)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Upgrades {
    pub jump_level: u8,
    pub slide_level: u8,
}

/// Result of a jump request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpResult {
    Jumped,
    /// Used the double power-up's mid-air jump
    AirJumped,
    /// Not legal yet; remembered until the buffer window closes
    Buffered,
    Ignored,
}

/// Per-frame inputs the controller needs from the rest of the run
#[derive(Debug, Clone, Copy)]
pub struct PlayerContext<'a> {
    pub now: f64,
    pub dt_ms: f64,
    pub speed: f32,
    pub combo: u8,
    pub double_jump: bool,
    pub flight_active: bool,
    pub assist: bool,
    pub upgrades: Upgrades,
    pub tuning: &'a Tuning,
}

/// The player avatar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// x follows the lane, y is the feet height, z stays 0
    pub pos: Vec3,
    pub vy: f32,
    pub state: VerticalState,
    /// Lane the player is moving toward
    pub lane: Lane,
    pub lives: u8,
    pub invincible_until: f64,
    pub last_grounded_at: f64,
    pub jump_buffer_until: Option<f64>,
    pub air_jumps_used: u8,
    /// Current airborne phase began with a jump, so coyote time is spent
    pub jumped: bool,
    pub slide_started_at: Option<f64>,
    pub slide_until: f64,
    pub slide_ready_at: f64,
    pub dash_ready_at: f64,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            pos: Vec3::new(0.0, GROUND_Y, 0.0),
            vy: 0.0,
            state: VerticalState::Grounded,
            lane: Lane::CENTER,
            lives: MAX_LIVES,
            invincible_until: 0.0,
            last_grounded_at: 0.0,
            jump_buffer_until: None,
            air_jumps_used: 0,
            jumped: false,
            slide_started_at: None,
            slide_until: 0.0,
            slide_ready_at: 0.0,
            dash_ready_at: 0.0,
        }
    }
}

impl Player {
    /// Resolve this frame's input and integrate physics
    pub fn update(&mut self, input: &TickInput, ctx: &PlayerContext, events: &mut Vec<GameEvent>) {
        let now = ctx.now;

        if self.state == VerticalState::Flying && !ctx.flight_active {
            self.land_from_flight(now, ctx.tuning);
            events.push(GameEvent::Landed);
        }

        if input.move_left {
            self.lane = self.lane.shifted(-1);
        }
        if input.move_right {
            self.lane = self.lane.shifted(1);
        }
        if input.dash && self.try_dash(now, ctx.tuning) {
            events.push(GameEvent::Dashed);
        }
        if input.slide && self.try_slide(ctx) {
            events.push(GameEvent::SlideStarted);
        }
        if input.jump {
            match self.request_jump(ctx) {
                JumpResult::Jumped => events.push(GameEvent::Jumped),
                JumpResult::AirJumped => events.push(GameEvent::AirJumped),
                JumpResult::Buffered | JumpResult::Ignored => {}
            }
        }

        self.integrate(ctx, events);

        let max_step = LATERAL_SPEED * (ctx.dt_ms / 1000.0) as f32;
        self.pos.x = approach(self.pos.x, self.lane.x(), max_step);
    }

    pub fn on_ground(&self) -> bool {
        self.pos.y <= GROUND_Y
    }

    pub fn is_flying(&self) -> bool {
        self.state == VerticalState::Flying
    }

    pub fn is_sliding(&self) -> bool {
        self.state == VerticalState::Sliding
    }

    pub fn is_invincible(&self, now: f64) -> bool {
        now < self.invincible_until
    }

    /// Extend invincibility; never shortens an existing window
    pub fn grant_invincibility(&mut self, until: f64) {
        self.invincible_until = self.invincible_until.max(until);
    }

    /// Remove one life, returns what is left
    pub fn lose_life(&mut self) -> u8 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Restore one life up to the maximum, returns the new count
    pub fn add_life(&mut self) -> u8 {
        self.lives = (self.lives + 1).min(MAX_LIVES);
        self.lives
    }

    /// Collision body size (width, height); shrinks while sliding
    pub fn body_size(&self) -> (f32, f32) {
        match self.state {
            VerticalState::Sliding => (SLIDE_WIDTH, SLIDE_HEIGHT),
            VerticalState::Grounded | VerticalState::Airborne | VerticalState::Flying => {
                (PLAYER_WIDTH, PLAYER_HEIGHT)
            }
        }
    }

    /// Center of the collision body
    pub fn body_center(&self) -> Vec3 {
        let (_, h) = self.body_size();
        Vec3::new(self.pos.x, self.pos.y + h / 2.0, self.pos.z)
    }

    /// Jump if legal, otherwise buffer the press
    pub fn request_jump(&mut self, ctx: &PlayerContext) -> JumpResult {
        let now = ctx.now;
        if self.state == VerticalState::Flying {
            return JumpResult::Ignored;
        }
        if self.state == VerticalState::Sliding {
            self.end_slide(now, ctx.tuning);
        }

        let coyote_ms = if ctx.assist {
            ctx.tuning.assist_coyote_ms
        } else {
            ctx.tuning.coyote_ms
        };

        if self.state == VerticalState::Grounded
            || (!self.jumped && now - self.last_grounded_at <= coyote_ms)
        {
            self.launch(ctx);
            return JumpResult::Jumped;
        }

        if ctx.double_jump && self.air_jumps_used < 1 {
            self.air_jumps_used += 1;
            self.launch(ctx);
            return JumpResult::AirJumped;
        }

        self.jump_buffer_until = Some(now + ctx.tuning.jump_buffer_ms);
        JumpResult::Buffered
    }

    /// Jump impulse: mildly higher at speed and with the jump upgrade
    pub fn jump_impulse(ctx: &PlayerContext) -> f32 {
        let t = ctx.tuning;
        let speed_ratio = (ctx.speed / BASE_SPEED - 1.0).max(0.0);
        let speed_bonus = (speed_ratio * t.jump_speed_scale).min(t.jump_speed_scale_cap);
        let upgrade_bonus = ctx.upgrades.jump_level.min(MAX_UPGRADE_LEVEL) as f32 * t.jump_upgrade_step;
        JUMP_VELOCITY * (1.0 + speed_bonus + upgrade_bonus)
    }

    fn launch(&mut self, ctx: &PlayerContext) {
        self.vy = Self::jump_impulse(ctx);
        self.state = VerticalState::Airborne;
        self.jumped = true;
        self.jump_buffer_until = None;
    }

    /// Start a slide; pressing again mid-slide does nothing
    pub fn try_slide(&mut self, ctx: &PlayerContext) -> bool {
        let now = ctx.now;
        if matches!(self.state, VerticalState::Flying | VerticalState::Sliding) {
            return false;
        }
        if now < self.slide_ready_at {
            return false;
        }

        let t = ctx.tuning;
        let duration = t.slide_ms
            + ctx.combo as f64 * t.slide_per_combo_ms
            + ctx.upgrades.slide_level.min(MAX_UPGRADE_LEVEL) as f64 * t.slide_per_upgrade_ms;

        if !self.on_ground() {
            // Slam down out of a jump
            self.vy = self.vy.min(-SLIDE_SLAM_VELOCITY);
        }
        self.state = VerticalState::Sliding;
        self.slide_started_at = Some(now);
        self.slide_until = now + duration;
        true
    }

    fn end_slide(&mut self, now: f64, tuning: &Tuning) {
        self.state = if self.on_ground() {
            VerticalState::Grounded
        } else {
            VerticalState::Airborne
        };
        self.slide_started_at = None;
        self.slide_ready_at = now + tuning.slide_cooldown_ms;
    }

    /// Finish an in-progress lane change instantly
    pub fn try_dash(&mut self, now: f64, tuning: &Tuning) -> bool {
        if now < self.dash_ready_at {
            return false;
        }
        let target = self.lane.x();
        if (self.pos.x - target).abs() < 1e-4 {
            return false;
        }
        self.pos.x = target;
        self.dash_ready_at = now + tuning.dash_cooldown_ms;
        true
    }

    /// Switch to flight: altitude locked, ground physics suspended
    pub fn enter_flight(&mut self) {
        self.state = VerticalState::Flying;
        self.pos.y = FLIGHT_ALTITUDE;
        self.vy = 0.0;
        self.slide_started_at = None;
        self.jump_buffer_until = None;
    }

    /// Snap back to ground physics with no velocity carried over
    pub fn land_from_flight(&mut self, now: f64, tuning: &Tuning) {
        self.state = VerticalState::Grounded;
        self.pos.y = GROUND_Y;
        self.vy = 0.0;
        self.last_grounded_at = now;
        self.jumped = false;
        self.air_jumps_used = 0;
        self.grant_invincibility(now + tuning.landing_grace_ms);
    }

    fn integrate(&mut self, ctx: &PlayerContext, events: &mut Vec<GameEvent>) {
        let now = ctx.now;
        if self.state == VerticalState::Flying {
            self.pos.y = FLIGHT_ALTITUDE;
            self.vy = 0.0;
            return;
        }

        if self.state == VerticalState::Sliding && now >= self.slide_until {
            self.end_slide(now, ctx.tuning);
        }

        // Per-frame constants scaled to the actual frame length
        let k = (ctx.dt_ms / REFERENCE_FRAME_MS) as f32;
        self.vy -= GRAVITY * k;
        self.pos.y += self.vy * k;

        if self.pos.y <= GROUND_Y {
            self.pos.y = GROUND_Y;
            self.vy = 0.0;
            if self.state == VerticalState::Airborne {
                self.state = VerticalState::Grounded;
                events.push(GameEvent::Landed);
            }
            self.last_grounded_at = now;
            self.jumped = false;
            self.air_jumps_used = 0;

            match self.jump_buffer_until {
                Some(until) if now <= until => {
                    if self.state == VerticalState::Sliding {
                        self.end_slide(now, ctx.tuning);
                    }
                    self.launch(ctx);
                    events.push(GameEvent::Jumped);
                }
                Some(_) => self.jump_buffer_until = None,
                None => {}
            }
        } else if self.state == VerticalState::Grounded {
            self.state = VerticalState::Airborne;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 16.0;

    fn ctx(now: f64, tuning: &Tuning) -> PlayerContext<'_> {
        PlayerContext {
            now,
            dt_ms: DT,
            speed: BASE_SPEED,
            combo: 0,
            double_jump: false,
            flight_active: false,
            assist: false,
            upgrades: Upgrades::default(),
            tuning,
        }
    }

    /// Player that walked off the ground at `left_at` without jumping
    fn falling_player(left_at: f64) -> Player {
        Player {
            pos: Vec3::new(0.0, 0.5, 0.0),
            vy: -0.05,
            state: VerticalState::Airborne,
            last_grounded_at: left_at,
            ..Default::default()
        }
    }

    #[test]
    fn test_jump_from_ground_and_land() {
        let tuning = Tuning::default();
        let mut player = Player::default();
        let mut events = Vec::new();
        let jump = TickInput {
            jump: true,
            ..Default::default()
        };

        player.update(&jump, &ctx(16.0, &tuning), &mut events);
        assert_eq!(player.state, VerticalState::Airborne);
        assert!(player.pos.y > 0.0);
        assert!(events.contains(&GameEvent::Jumped));

        let mut now = 16.0;
        for _ in 0..120 {
            now += DT;
            player.update(&TickInput::default(), &ctx(now, &tuning), &mut events);
            if player.state == VerticalState::Grounded {
                break;
            }
        }
        assert_eq!(player.state, VerticalState::Grounded);
        assert_eq!(player.pos.y, GROUND_Y);
        assert_eq!(player.vy, 0.0);
        assert!(events.contains(&GameEvent::Landed));
    }

    #[test]
    fn test_coyote_window_edges() {
        let tuning = Tuning::default();
        let left_at = 1000.0;

        let mut inside = falling_player(left_at);
        let result = inside.request_jump(&ctx(left_at + tuning.coyote_ms - 1.0, &tuning));
        assert_eq!(result, JumpResult::Jumped);
        assert_eq!(inside.air_jumps_used, 0);

        let mut outside = falling_player(left_at);
        let result = outside.request_jump(&ctx(left_at + tuning.coyote_ms + 1.0, &tuning));
        assert_eq!(result, JumpResult::Buffered);
        assert!(outside.vy < 0.0);
    }

    #[test]
    fn test_assist_mode_extends_coyote() {
        let tuning = Tuning::default();
        let left_at = 1000.0;
        let mut player = falling_player(left_at);
        let mut c = ctx(left_at + tuning.coyote_ms + 20.0, &tuning);
        c.assist = true;
        assert_eq!(player.request_jump(&c), JumpResult::Jumped);
    }

    #[test]
    fn test_coyote_not_granted_after_a_jump() {
        let tuning = Tuning::default();
        let mut player = falling_player(1000.0);
        player.jumped = true;
        assert_eq!(player.request_jump(&ctx(1010.0, &tuning)), JumpResult::Buffered);
    }

    #[test]
    fn test_double_jump_grants_one_air_jump() {
        let tuning = Tuning::default();
        let mut player = falling_player(0.0);
        player.jumped = true;
        let mut c = ctx(5000.0, &tuning);
        c.double_jump = true;

        assert_eq!(player.request_jump(&c), JumpResult::AirJumped);
        assert_eq!(player.air_jumps_used, 1);
        assert_eq!(player.request_jump(&c), JumpResult::Buffered);
    }

    #[test]
    fn test_buffered_jump_fires_on_landing() {
        let tuning = Tuning::default();
        // Just above the ground, falling, coyote long gone
        let mut player = Player {
            pos: Vec3::new(0.0, 0.05, 0.0),
            vy: -0.2,
            state: VerticalState::Airborne,
            jumped: true,
            ..Default::default()
        };
        let mut events = Vec::new();
        let jump = TickInput {
            jump: true,
            ..Default::default()
        };
        player.update(&jump, &ctx(5000.0, &tuning), &mut events);

        // Landed and relaunched in the same frame
        assert!(events.contains(&GameEvent::Landed));
        assert!(events.contains(&GameEvent::Jumped));
        assert_eq!(player.state, VerticalState::Airborne);
        assert!(player.vy > 0.0);
        assert_eq!(player.jump_buffer_until, None);
    }

    #[test]
    fn test_expired_buffer_is_dropped() {
        let tuning = Tuning::default();
        let mut player = Player {
            pos: Vec3::new(0.0, 0.05, 0.0),
            vy: -0.2,
            state: VerticalState::Airborne,
            jumped: true,
            jump_buffer_until: Some(100.0),
            ..Default::default()
        };
        let mut events = Vec::new();
        player.update(&TickInput::default(), &ctx(5000.0, &tuning), &mut events);
        assert_eq!(player.state, VerticalState::Grounded);
        assert!(!events.contains(&GameEvent::Jumped));
        assert_eq!(player.jump_buffer_until, None);
    }

    #[test]
    fn test_jump_impulse_scales_with_speed_and_upgrade() {
        let tuning = Tuning::default();
        let base = Player::jump_impulse(&ctx(0.0, &tuning));
        assert_eq!(base, JUMP_VELOCITY);

        let mut fast = ctx(0.0, &tuning);
        fast.speed = BASE_SPEED * 1.5;
        let fast_impulse = Player::jump_impulse(&fast);
        assert!(fast_impulse > base);
        assert!(fast_impulse <= JUMP_VELOCITY * (1.0 + tuning.jump_speed_scale_cap) + 1e-6);

        let mut upgraded = ctx(0.0, &tuning);
        upgraded.upgrades.jump_level = 2;
        assert!(Player::jump_impulse(&upgraded) > base);
    }

    #[test]
    fn test_slide_is_timeboxed_with_cooldown() {
        let tuning = Tuning::default();
        let mut player = Player::default();
        let mut events = Vec::new();
        let slide = TickInput {
            slide: true,
            ..Default::default()
        };

        player.update(&slide, &ctx(0.0, &tuning), &mut events);
        assert!(player.is_sliding());
        assert_eq!(player.body_size(), (SLIDE_WIDTH, SLIDE_HEIGHT));

        let end = tuning.slide_ms;
        player.update(&TickInput::default(), &ctx(end, &tuning), &mut events);
        assert_eq!(player.state, VerticalState::Grounded);

        // Cooldown blocks an immediate re-trigger
        player.update(&slide, &ctx(end + 16.0, &tuning), &mut events);
        assert!(!player.is_sliding());
        player.update(&slide, &ctx(end + tuning.slide_cooldown_ms + 1.0, &tuning), &mut events);
        assert!(player.is_sliding());
    }

    #[test]
    fn test_slide_duration_grows_with_combo_and_upgrade() {
        let tuning = Tuning::default();
        let mut player = Player::default();
        let mut c = ctx(0.0, &tuning);
        c.combo = 3;
        c.upgrades.slide_level = 2;
        assert!(player.try_slide(&c));
        let expected = tuning.slide_ms + 3.0 * tuning.slide_per_combo_ms + 2.0 * tuning.slide_per_upgrade_ms;
        assert_eq!(player.slide_until, expected);
    }

    #[test]
    fn test_jump_cancels_slide() {
        let tuning = Tuning::default();
        let mut player = Player::default();
        assert!(player.try_slide(&ctx(0.0, &tuning)));
        assert_eq!(player.request_jump(&ctx(100.0, &tuning)), JumpResult::Jumped);
        assert_eq!(player.state, VerticalState::Airborne);
        assert_eq!(player.slide_started_at, None);
    }

    #[test]
    fn test_lane_change_is_rate_limited_and_dash_snaps() {
        let tuning = Tuning::default();
        let mut player = Player::default();
        let mut events = Vec::new();
        let right = TickInput {
            move_right: true,
            ..Default::default()
        };
        player.update(&right, &ctx(0.0, &tuning), &mut events);
        assert_eq!(player.lane, Lane::RIGHT);
        let step = LATERAL_SPEED * (DT / 1000.0) as f32;
        assert!((player.pos.x - step).abs() < 1e-5);

        let dash = TickInput {
            dash: true,
            ..Default::default()
        };
        player.update(&dash, &ctx(16.0, &tuning), &mut events);
        assert_eq!(player.pos.x, Lane::RIGHT.x());
        assert!(events.contains(&GameEvent::Dashed));

        // Cooldown: next dash is refused
        let left = TickInput {
            move_left: true,
            dash: true,
            ..Default::default()
        };
        events.clear();
        player.update(&left, &ctx(32.0, &tuning), &mut events);
        assert!(!events.contains(&GameEvent::Dashed));
        assert!(player.pos.x > Lane::CENTER.x());
    }

    #[test]
    fn test_flight_locks_altitude_then_snaps_to_ground() {
        let tuning = Tuning::default();
        let mut player = Player::default();
        let mut events = Vec::new();
        player.enter_flight();

        let mut c = ctx(100.0, &tuning);
        c.flight_active = true;
        player.update(
            &TickInput {
                jump: true,
                ..Default::default()
            },
            &c,
            &mut events,
        );
        assert_eq!(player.state, VerticalState::Flying);
        assert_eq!(player.pos.y, FLIGHT_ALTITUDE);

        let mut c = ctx(200.0, &tuning);
        c.flight_active = false;
        player.update(&TickInput::default(), &c, &mut events);
        assert_eq!(player.state, VerticalState::Grounded);
        assert_eq!(player.pos.y, GROUND_Y);
        assert_eq!(player.vy, 0.0);
        assert!(player.is_invincible(200.0 + tuning.landing_grace_ms - 1.0));
    }

    #[test]
    fn test_lives_stay_in_bounds() {
        let mut player = Player::default();
        assert_eq!(player.add_life(), MAX_LIVES);
        for _ in 0..5 {
            player.lose_life();
        }
        assert_eq!(player.lives, 0);
    }
}
