use std::path::PathBuf;

use clap::Parser;

use michigan_bench::config::{BenchmarkConfig, ResolvedOutputs};
use michigan_bench::logging::init_logging;
use michigan_bench::tournament::TournamentRunner;

/// Tournament harness for the Michigan decision engine.
#[derive(Debug, Parser)]
#[command(
    name = "michigan-bench",
    author,
    version,
    about = "Deterministic Michigan tournament harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed for game generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the configuration (no tournament is run).
    #[arg(long)]
    validate_only: bool,

    /// Log every turn regardless of config (needs structured logging enabled).
    #[arg(long)]
    log_decision_details: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = cli.games {
        config.matches.games = games;
    }

    if let Some(seed) = cli.seed {
        config.matches.seed = Some(seed);
    }

    if cli.log_decision_details {
        config.logging.decision_details = true;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let player_count = config.players.len();
    let run_id = config.run_id.clone();
    let games = config.matches.games;
    let rounds = config.matches.rounds_per_game();

    println!(
        "Loaded configuration '{run_id}' with {player_count} players ({games} game{}, {rounds} rounds each)",
        if games == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = TournamentRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: tournament execution skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Tournament complete for '{run_id}': {} games × {} rounds → {} rows at {}",
        summary.games_played,
        summary.rounds_per_game,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    if summary.stalled_rounds > 0 {
        println!(
            "  {} round(s) hit the turn cap and were scored as they stood",
            summary.stalled_rounds
        );
    }
    for player in summary.standings.players() {
        println!(
            "  {:<12} {:<6} wins {:>3}/{:<3} avg {:>6.2} points/round",
            player.name,
            player.difficulty.as_str(),
            player.wins,
            player.games,
            player.avg_points_per_round()
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
