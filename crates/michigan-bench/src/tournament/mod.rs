mod standings;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use michigan_bot::{AiDifficulty, DrawSource, EngineError, TurnPlanner, apply_lay_offs};
use michigan_core::bundle::Bundle;
use michigan_core::model::deck::Deck;
use michigan_core::model::hand::Hand;
use michigan_core::model::wild::WildRank;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::config::{BenchmarkConfig, MAX_PLAYERS, MIN_PLAYERS, ResolvedOutputs};
use crate::logging::telemetry_dir;

pub use standings::{PlayerStanding, Standings};

/// A round nobody closes within this many turns is scored as it stands.
const MAX_TURNS_PER_ROUND: usize = 2_000;

/// Plays the configured games and streams one JSONL row per player per round.
pub struct TournamentRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    players: Vec<PlayerBlueprint>,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub rounds_per_game: usize,
    pub rows_written: usize,
    pub stalled_rounds: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
    pub standings: Standings,
}

impl TournamentRunner {
    /// Build a runner from a validated configuration.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let players: Vec<PlayerBlueprint> = config
            .players
            .iter()
            .map(|player| PlayerBlueprint {
                name: player.name.clone(),
                difficulty: player.resolved_difficulty(),
            })
            .collect();

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players.len()) {
            return Err(RunnerError::SeatCount {
                found: players.len(),
            });
        }

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            players,
        })
    }

    /// Execute the tournament, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.matches.seed.unwrap_or(0));
        let mut standings = Standings::new(
            self.players
                .iter()
                .map(|player| (player.name.clone(), player.difficulty)),
        );
        let mut rows_written = 0usize;
        let mut stalled_rounds = 0usize;

        for game_index in 0..self.config.matches.games {
            let game_seed = rng.next_u64();
            let outcome = self.play_game(game_index, game_seed)?;
            stalled_rounds += outcome.rounds.iter().filter(|round| round.stalled).count();
            rows_written += write_game_rows(
                &mut writer,
                &self.config,
                &self.players,
                game_index,
                game_seed,
                &outcome,
            )?;
            standings.record_game(&outcome);
        }

        writer.flush()?;
        standings.write_markdown(&self.outputs.summary_md, &self.config)?;

        let telemetry_path = self
            .logging_enabled
            .then(|| telemetry_dir(&self.outputs).join("telemetry.jsonl"));

        Ok(RunSummary {
            games_played: self.config.matches.games,
            rounds_per_game: self.config.matches.rounds_per_game(),
            rows_written,
            stalled_rounds,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
            standings,
        })
    }

    /// Every configured round once, the starting seat moving one to the left each round.
    pub fn play_game(&self, game_index: usize, game_seed: u64) -> Result<GameOutcome, RunnerError> {
        let mut rng = StdRng::seed_from_u64(game_seed);
        let mut rounds = Vec::with_capacity(self.config.matches.rounds_per_game());
        for (offset, round) in self.config.matches.rounds().enumerate() {
            let starter = (game_index + offset) % self.players.len();
            rounds.push(self.play_round(game_index, round, starter, &mut rng)?);
        }
        Ok(GameOutcome { rounds })
    }

    fn play_round(
        &self,
        game_index: usize,
        round: u8,
        starter: usize,
        rng: &mut StdRng,
    ) -> Result<RoundOutcome, RunnerError> {
        let wild = WildRank::for_round(round).ok_or(RunnerError::InvalidRound { round })?;
        let mut deck = Deck::shuffled(rng);
        let mut seats = Vec::with_capacity(self.players.len());
        for player in &self.players {
            let hand = Hand::with_cards(deck.deal_hand(usize::from(round), rng));
            let planner = TurnPlanner::deal(player.difficulty, &hand, wild, rng);
            seats.push(SeatState {
                hand,
                planner,
                metrics: DecisionMetrics::default(),
                points: None,
            });
        }

        let seat_count = seats.len();
        let mut open: Option<Vec<Bundle>> = None;
        let mut closer: Option<usize> = None;
        let mut seat = starter;
        let mut turns = 0usize;
        let mut stalled = false;

        loop {
            if closer == Some(seat) {
                break;
            }
            if turns == MAX_TURNS_PER_ROUND {
                stalled = true;
                tracing::warn!(
                    target: "michigan_bench::round",
                    game_index = game_index as u32,
                    round,
                    turns,
                    message = "round stalled; scoring hands as they stand"
                );
                break;
            }
            turns += 1;

            let state = &mut seats[seat];
            let start = Instant::now();
            let source = state
                .planner
                .draw_source(&state.hand, deck.top_of_discard(), rng);
            let drawn = match source {
                DrawSource::Discard => deck.draw_from_discard(),
                DrawSource::Deck => deck.draw_from_deck(rng),
            }
            .ok_or(RunnerError::DeckExhausted { round })?;
            let drawn_id = state.hand.add(drawn);
            state.planner.observe_draw(&state.hand, drawn_id, rng);

            let decision = state.planner.decide(&state.hand, open.as_deref(), rng)?;
            let elapsed_ms = state.metrics.record(start.elapsed());

            if let Some(table) = open.as_mut() {
                apply_lay_offs(table, &decision.lay_offs, wild)?;
            }
            state.hand.remove(decision.discard.id);
            state.planner.observe_discard(&state.hand, decision.discard.id);
            deck.discard(decision.discard.card);

            if self.logging_enabled
                && self.config.logging.decision_details
                && tracing::enabled!(Level::INFO)
            {
                let laid_off: usize = decision.lay_offs.iter().map(Vec::len).sum();
                event!(
                    target: "michigan_bench::turn",
                    Level::INFO,
                    run_id = %self.config.run_id,
                    game_index = game_index as u32,
                    round,
                    seat = seat as u32,
                    player = %self.players[seat].name,
                    source = source.as_str(),
                    drawn = %drawn,
                    discard = %decision.discard.card,
                    goes_out = decision.goes_out,
                    closing_lap = open.is_some(),
                    laid_off,
                    elapsed_ms
                );
            }

            if open.is_some() {
                state.points = Some(decision.score);
            } else if decision.goes_out {
                state.points = Some(0);
                open = Some(decision.bundles);
                closer = Some(seat);
            }
            seat = (seat + 1) % seat_count;
        }

        if self.logging_enabled && tracing::enabled!(Level::INFO) {
            event!(
                target: "michigan_bench::round",
                Level::INFO,
                run_id = %self.config.run_id,
                game_index = game_index as u32,
                round,
                starter = starter as u32,
                closer = closer.map(|seat| seat as i64).unwrap_or(-1),
                turns,
                stalled
            );
        }

        let seats = seats
            .into_iter()
            .enumerate()
            .map(|(index, state)| SeatResult {
                points: state.points.unwrap_or_else(|| state.hand.score()),
                went_out: closer == Some(index),
                metrics: state.metrics.finalize(),
            })
            .collect();

        Ok(RoundOutcome {
            round,
            wild,
            starter,
            closer,
            turns,
            stalled,
            seats,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_rows(
    writer: &mut BufWriter<File>,
    config: &BenchmarkConfig,
    players: &[PlayerBlueprint],
    game_index: usize,
    game_seed: u64,
    outcome: &GameOutcome,
) -> Result<usize, RunnerError> {
    let mut totals = vec![0u32; players.len()];
    let mut rows_written = 0usize;

    for round in &outcome.rounds {
        let game_id = format!("G{game_index:05}_R{:02}", round.round);
        for (index, (player, result)) in players.iter().zip(&round.seats).enumerate() {
            totals[index] += result.points;
            let row = RoundLogRow {
                run_id: config.run_id.clone(),
                game_id: game_id.clone(),
                game_index,
                game_seed,
                round: round.round,
                wild: round.wild.rank().to_string(),
                player: player.name.clone(),
                difficulty: player.difficulty.as_str(),
                seat: index,
                starter: round.starter == index,
                went_out: result.went_out,
                stalled: round.stalled,
                points: result.points,
                total_points: totals[index],
                decisions: result.metrics.decisions,
                speed_ms_turn: result.metrics.avg_ms_per_decision,
            };

            serde_json::to_writer(&mut *writer, &row)?;
            writer.write_all(b"\n")?;
            rows_written += 1;
        }
    }

    Ok(rows_written)
}

struct PlayerBlueprint {
    name: String,
    difficulty: AiDifficulty,
}

struct SeatState {
    hand: Hand,
    planner: TurnPlanner,
    metrics: DecisionMetrics,
    points: Option<u32>,
}

pub struct GameOutcome {
    pub rounds: Vec<RoundOutcome>,
}

impl GameOutcome {
    /// Points per seat summed over the game's rounds.
    pub fn totals(&self) -> Vec<u32> {
        let mut totals: Vec<u32> = Vec::new();
        for round in &self.rounds {
            totals.resize(round.seats.len().max(totals.len()), 0);
            for (total, seat) in totals.iter_mut().zip(&round.seats) {
                *total += seat.points;
            }
        }
        totals
    }
}

pub struct RoundOutcome {
    pub round: u8,
    pub wild: WildRank,
    pub starter: usize,
    pub closer: Option<usize>,
    pub turns: usize,
    pub stalled: bool,
    pub seats: Vec<SeatResult>,
}

pub struct SeatResult {
    pub points: u32,
    pub went_out: bool,
    pub metrics: DecisionSummary,
}

#[derive(Default)]
struct DecisionMetrics {
    total: Duration,
    decisions: u32,
}

impl DecisionMetrics {
    fn record(&mut self, duration: Duration) -> f64 {
        self.total += duration;
        self.decisions += 1;
        duration.as_secs_f64() * 1000.0
    }

    fn finalize(self) -> DecisionSummary {
        let avg_ms = if self.decisions == 0 {
            0.0
        } else {
            self.total.as_secs_f64() * 1000.0 / f64::from(self.decisions)
        };

        DecisionSummary {
            decisions: self.decisions,
            avg_ms_per_decision: avg_ms,
            total_ms: self.total.as_secs_f64() * 1000.0,
        }
    }
}

#[derive(Clone)]
pub struct DecisionSummary {
    pub decisions: u32,
    pub avg_ms_per_decision: f64,
    pub total_ms: f64,
}

#[derive(Serialize)]
struct RoundLogRow {
    run_id: String,
    game_id: String,
    game_index: usize,
    game_seed: u64,
    round: u8,
    wild: String,
    player: String,
    difficulty: &'static str,
    seat: usize,
    starter: bool,
    went_out: bool,
    stalled: bool,
    points: u32,
    total_points: u32,
    decisions: u32,
    speed_ms_turn: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("a table seats 2 to 8 players but found {found}")]
    SeatCount { found: usize },
    #[error("round {round} has no wild rank")]
    InvalidRound { round: u8 },
    #[error("draw and discard piles both ran dry in round {round}")]
    DeckExhausted { round: u8 },
}
