//! Cheese Hunter headless runner
//!
//! Plays one run on the default level with a simple autopilot, feeding the
//! simulation through the fixed-timestep accumulator, then records the
//! result on the leaderboard.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use glam::Vec2;

use cheese_hunter::consts::*;
use cheese_hunter::highscores::HighScoreEntry;
use cheese_hunter::sim::{GameEvent, GamePhase, GameState, TickInput, Upgrade, tick};
use cheese_hunter::{HighScores, Tuning};

#[derive(Parser)]
#[command(name = "cheese-hunter")]
#[command(about = "Run a headless Cheese Hunter session with an autopilot player")]
struct Args {
    /// Run seed
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Maximum simulation ticks before the run is cut off
    #[arg(long, default_value_t = 60 * 60 * 5)]
    ticks: u64,
    /// JSON balance file; defaults are used when absent
    #[arg(long)]
    tuning: Option<PathBuf>,
    /// Leaderboard file to update at the end of the run
    #[arg(long)]
    highscores: Option<PathBuf>,
    /// Cumulative score at which the autopilot heads for an open escape hole
    #[arg(long, default_value_t = 120)]
    escape_at: u32,
}

fn cheapest_affordable(state: &GameState) -> Option<Upgrade> {
    Upgrade::ALL
        .into_iter()
        .filter(|u| !state.player.modifiers.has_upgrade(*u))
        .filter(|u| u.base_cost() <= state.score.balance())
        .min_by_key(|u| u.base_cost())
}

/// Pick a movement target: fight or flee close hazards, else escape, else
/// shop, else eat
fn autopilot(state: &GameState, escape_at: u32) -> TickInput {
    let pos = state.player.pos;
    let now = state.clock.scaled;

    let threat = state
        .hazards
        .hazards
        .iter()
        .filter(|h| h.pos.distance(pos) < 2.5)
        .min_by(|a, b| a.pos.distance(pos).total_cmp(&b.pos.distance(pos)));
    if let Some(hazard) = threat {
        if hazard.pos.distance(pos) < 1.5 {
            if state.player.ability_ready(Upgrade::Swat, now) {
                return TickInput {
                    swat: true,
                    ..Default::default()
                };
            }
            if state.player.ability_ready(Upgrade::Teleport, now) {
                // Jump halfway across the level center
                let center = state.world.center;
                return TickInput {
                    teleport: Some(center + (center - pos) * 0.5),
                    ..Default::default()
                };
            }
        }
        let away = (pos - hazard.pos).normalize_or(Vec2::Y);
        // Hazards cross horizontally, so dodge vertically
        return TickInput {
            move_dir: Vec2::new(away.x * 0.3, away.y.signum()),
            ..Default::default()
        };
    }

    let target = state
        .escape_holes
        .hole
        .as_ref()
        .filter(|_| state.score.total() >= escape_at)
        .map(|h| h.pos)
        .or_else(|| {
            let market = state.market.market.as_ref()?;
            cheapest_affordable(state).map(|_| market.pos)
        })
        .or_else(|| {
            state
                .buffs
                .buffs
                .iter()
                .map(|b| b.pos)
                .find(|p| p.distance(pos) < 4.0)
        })
        .or_else(|| state.collectibles.items.first().map(|c| c.pos));

    TickInput {
        move_target: target,
        ..Default::default()
    }
}

/// Buy the cheapest affordable upgrade in an open shop, or walk out
fn shop(state: &mut GameState) {
    if state.phase != GamePhase::Shopping {
        return;
    }
    let Some(upgrade) = cheapest_affordable(state) else {
        state.close_shop();
        return;
    };
    if let Err(err) = state.purchase_upgrade(upgrade, upgrade.base_cost()) {
        log::warn!("Autopilot purchase failed: {}", err);
        state.close_shop();
    }
}

fn report(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::DifficultyChanged { level } => log::info!("Difficulty level {}", level),
            GameEvent::MarketSpawned { pos, .. } => {
                log::info!("Market at ({:.1}, {:.1})", pos.x, pos.y)
            }
            GameEvent::EscapeHoleSpawned {
                requirement,
                permanent,
                ..
            } => log::info!(
                "Escape hole open (needs {}, permanent: {})",
                requirement,
                permanent
            ),
            GameEvent::UpgradePurchased { upgrade, cost } => {
                log::info!("Bought {:?} for {}", upgrade, cost)
            }
            GameEvent::PlayerTeleported { to, .. } => {
                log::info!("Teleported to ({:.1}, {:.1})", to.x, to.y)
            }
            other => log::trace!("{:?}", other),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let tuning = match &args.tuning {
        Some(path) => match Tuning::load(path) {
            Ok(tuning) => tuning,
            Err(err) => {
                log::error!("Invalid tuning: {}", err);
                return ExitCode::FAILURE;
            }
        },
        None => Tuning::standard(),
    };
    let mut state = match GameState::with_default_level(args.seed, tuning) {
        Ok(state) => state,
        Err(err) => {
            log::error!("Cannot start game: {}", err);
            return ExitCode::FAILURE;
        }
    };
    log::info!("Cheese Hunter (headless) starting, seed {}", args.seed);

    // Frames arrive at a jittery ~50 Hz; the accumulator turns them into
    // fixed ticks
    let frame_times = [0.021_f32, 0.019, 0.020, 0.024, 0.016];
    let mut accumulator = 0.0_f32;
    let mut frame = 0usize;
    let running = |phase: GamePhase| matches!(phase, GamePhase::Playing | GamePhase::Shopping);
    while running(state.phase) && state.time_ticks < args.ticks {
        let dt = frame_times[frame % frame_times.len()].min(0.1);
        frame += 1;
        accumulator += dt;

        let mut substeps = 0;
        while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = autopilot(&state, args.escape_at);
            tick(&mut state, &input, SIM_DT);
            accumulator -= SIM_DT;
            substeps += 1;
        }
        shop(&mut state);
        report(&state.drain_events());
    }

    let escaped = state.phase == GamePhase::Victory;
    let score = state.score.total();
    println!(
        "Run over after {:.1}s: score {}, level {}, {}",
        state.clock.unscaled,
        score,
        state.difficulty.level(),
        match state.phase {
            GamePhase::Victory => "escaped",
            GamePhase::GameOver => "caught",
            _ => "time up",
        }
    );

    if let Some(path) = &args.highscores {
        let mut scores = HighScores::load(path);
        let entry = HighScoreEntry {
            score,
            level: state.difficulty.level(),
            escaped,
            ticks: state.time_ticks,
        };
        if let Some(rank) = scores.add_score(entry) {
            println!("New high score! Rank #{}", rank);
        }
        if let Err(err) = scores.save(path) {
            log::error!("Could not save high scores: {}", err);
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}
