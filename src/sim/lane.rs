//! The three lanes

use serde::{Deserialize, Serialize};

use crate::consts::LANE_WIDTH;

/// Lane index in `{-1, 0, 1}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Lane(i8);

impl Lane {
    pub const LEFT: Lane = Lane(-1);
    pub const CENTER: Lane = Lane(0);
    pub const RIGHT: Lane = Lane(1);
    pub const ALL: [Lane; 3] = [Lane::LEFT, Lane::CENTER, Lane::RIGHT];

    /// Build a lane, clamping out-of-range indices (logged, never fatal)
    pub fn new(index: i8) -> Self {
        if !(-1..=1).contains(&index) {
            log::warn!("lane index {} out of range, clamping", index);
        }
        Lane(index.clamp(-1, 1))
    }

    pub fn index(self) -> i8 {
        self.0
    }

    /// World x of the lane center
    pub fn x(self) -> f32 {
        self.0 as f32 * LANE_WIDTH
    }

    /// Neighbouring lane, saturating at the edges
    pub fn shifted(self, delta: i8) -> Self {
        Lane((self.0 + delta).clamp(-1, 1))
    }
}
