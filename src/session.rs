//! Run lifecycle across restarts
//!
//! A [`Session`] owns the current run and the best score seen so far. Each
//! finished run is reported exactly once to the host's [`ScoreSink`].

use serde::{Deserialize, Serialize};

use crate::settings::Settings;
use crate::sim::state::{RunConfig, RunState};
use crate::sim::tick::{FrameOutcome, TickInput, tick};
use crate::snapshot::FrameSnapshot;

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub final_score: u64,
    /// World units travelled
    pub distance: f64,
    pub crystals: u32,
    pub ticks: u64,
    pub seed: u64,
}

/// Receives run reports (leaderboard, local storage, analytics)
pub trait ScoreSink {
    fn submit(&mut self, report: &RunReport);
}

/// Discards reports
#[derive(Debug, Default)]
pub struct NullSink;

impl ScoreSink for NullSink {
    fn submit(&mut self, _report: &RunReport) {}
}

impl ScoreSink for Vec<RunReport> {
    fn submit(&mut self, report: &RunReport) {
        self.push(report.clone());
    }
}

pub struct Session {
    run: RunState,
    pub settings: Settings,
    best_score: u64,
    /// The current run's report has been delivered
    reported: bool,
}

impl Session {
    pub fn new(config: RunConfig, settings: Settings) -> Self {
        Self {
            run: RunState::new(config),
            settings,
            best_score: 0,
            reported: false,
        }
    }

    pub fn run(&self) -> &RunState {
        &self.run
    }

    pub fn best_score(&self) -> u64 {
        self.best_score
    }

    /// Advance the current run one frame; deliver its report when it ends
    pub fn frame(&mut self, input: &TickInput, raw_dt_ms: f64, sink: &mut dyn ScoreSink) -> FrameOutcome {
        let outcome = tick(&mut self.run, input, raw_dt_ms);
        if let FrameOutcome::Ended(report) = &outcome {
            self.finish(report.clone(), sink);
        }
        outcome
    }

    /// End the current run early (quit to menu) and report it
    pub fn abandon(&mut self, sink: &mut dyn ScoreSink) {
        if !self.reported {
            let report = self.run.report();
            self.finish(report, sink);
        }
    }

    /// Replace the run with a fresh one built from `config`
    pub fn restart(&mut self, config: RunConfig) {
        self.run = RunState::new(config);
        self.reported = false;
    }

    /// Snapshot with the quality hint the player's settings allow
    pub fn snapshot(&self) -> FrameSnapshot {
        let quality = self.settings.resolve_quality(self.run.clock.fps_ema);
        self.run.snapshot_with_quality(quality)
    }

    fn finish(&mut self, report: RunReport, sink: &mut dyn ScoreSink) {
        if self.reported {
            return;
        }
        self.reported = true;
        self.best_score = self.best_score.max(report.final_score);
        log::info!(
            "reporting run: score {} (best {})",
            report.final_score,
            self.best_score
        );
        sink.submit(&report);
    }
}
