//! Lane Dash headless runner
//!
//! Plays one seeded run without a renderer and prints its report as JSON.

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::{Path, PathBuf};

    use clap::Parser;
    use lane_dash::consts::LANE_WIDTH;
    use lane_dash::sim::{EntityKind, FrameOutcome, ObstacleKind, RunConfig, SeedSource, TickInput};
    use lane_dash::{FrameSnapshot, HighScores, Session, Settings, Tuning};

    /// Play one seeded run headless and print its report as JSON
    #[derive(Debug, Parser)]
    #[command(name = "lane-dash", version, about, long_about = None)]
    pub struct Args {
        /// Fixed run seed; omitted means a wall-clock seed
        #[arg(long)]
        pub seed: Option<u64>,
        /// Frames to simulate before the run is abandoned
        #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
        pub ticks: u64,
        /// Frame time in milliseconds
        #[arg(long = "dt", value_name = "MS", default_value_t = 1000.0 / 60.0)]
        pub dt_ms: f64,
        /// JSON balance table to run with
        #[arg(long = "tuning", value_name = "FILE")]
        pub tuning_path: Option<PathBuf>,
        /// JSON display settings (quality preference)
        #[arg(long = "settings", value_name = "FILE")]
        pub settings_path: Option<PathBuf>,
        /// High score table to update with this run
        #[arg(long = "scores", value_name = "FILE")]
        pub scores_path: Option<PathBuf>,
        /// Jump and slide past obstacles in the current lane
        #[arg(long)]
        pub autopilot: bool,
    }

    /// Jump ground obstacles and slide under air ones in the current lane
    fn autopilot(snapshot: &FrameSnapshot) -> TickInput {
        let lane = snapshot.player.lane;
        let ahead = snapshot
            .entities
            .iter()
            .filter_map(|e| match e.kind {
                EntityKind::Obstacle(o) => Some((o.kind, e.pos)),
                _ => None,
            })
            .filter(|(_, pos)| (pos.x / LANE_WIDTH).round() as i8 == lane)
            .filter(|(_, pos)| pos.z < 0.0 && pos.z > -snapshot.speed * 0.35)
            .max_by(|a, b| a.1.z.total_cmp(&b.1.z));

        match ahead {
            Some((ObstacleKind::Ground, _)) => TickInput {
                jump: true,
                ..Default::default()
            },
            Some((ObstacleKind::Air, _)) => TickInput {
                slide: true,
                ..Default::default()
            },
            None => TickInput::default(),
        }
    }

    fn read(path: &Path) -> Result<String, String> {
        std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {}", path.display(), e))
    }

    pub fn run(args: Args) -> Result<String, String> {
        let tuning = match &args.tuning_path {
            Some(path) => Tuning::from_json(&read(path)?).map_err(|e| e.to_string())?,
            None => Tuning::default(),
        };
        let settings = match &args.settings_path {
            Some(path) => Settings::from_json(&read(path)?).map_err(|e| e.to_string())?,
            None => Settings::default(),
        };
        // A missing table is a first run
        let mut scores = match &args.scores_path {
            Some(path) if path.exists() => HighScores::from_json(&read(path)?),
            _ => HighScores::new(),
        };

        let config = RunConfig {
            seed_source: args.seed.map_or(SeedSource::WallClock, SeedSource::Fixed),
            tuning,
            ..Default::default()
        };

        let mut session = Session::new(config, settings);
        for _ in 0..args.ticks {
            let input = if args.autopilot {
                autopilot(&session.snapshot())
            } else {
                TickInput::default()
            };
            match session.frame(&input, args.dt_ms, &mut scores) {
                FrameOutcome::Ended(_) | FrameOutcome::Over => break,
                FrameOutcome::Advanced | FrameOutcome::Paused | FrameOutcome::Skipped(_) => {}
            }
        }
        // Still alive when the tick budget ran out
        session.abandon(&mut scores);

        if let Some(path) = &args.scores_path {
            let json = scores.to_json().map_err(|e| e.to_string())?;
            std::fs::write(path, json)
                .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
            log::info!(
                "best of {} runs on file: {}",
                scores.entries.len(),
                scores.top_score().unwrap_or(0)
            );
        }

        serde_json::to_string_pretty(&session.run().report()).map_err(|e| e.to_string())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Lane Dash (headless) starting...");

    let args = headless::Args::parse();
    match headless::run(args) {
        Ok(json) => println!("{}", json),
        Err(msg) => {
            log::error!("{}", msg);
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The browser host drives the library directly
}
