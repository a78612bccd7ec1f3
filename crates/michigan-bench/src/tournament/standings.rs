use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use michigan_bot::AiDifficulty;

use super::{GameOutcome, RunnerError};
use crate::config::BenchmarkConfig;

/// Running totals per player across every game of a run.
pub struct Standings {
    players: Vec<PlayerStanding>,
    games: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStanding {
    pub name: String,
    pub difficulty: AiDifficulty,
    pub games: usize,
    /// Games finished with the lowest total; ties count for every tied player.
    pub wins: usize,
    pub rounds: usize,
    pub rounds_out: usize,
    pub total_points: u64,
    pub total_decisions: u64,
    pub total_latency_ms: f64,
}

impl PlayerStanding {
    fn new(name: String, difficulty: AiDifficulty) -> Self {
        Self {
            name,
            difficulty,
            games: 0,
            wins: 0,
            rounds: 0,
            rounds_out: 0,
            total_points: 0,
            total_decisions: 0,
            total_latency_ms: 0.0,
        }
    }

    pub fn avg_points_per_round(&self) -> f64 {
        if self.rounds == 0 {
            0.0
        } else {
            self.total_points as f64 / self.rounds as f64
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.wins as f64 / self.games as f64
        }
    }

    pub fn avg_ms_per_decision(&self) -> f64 {
        if self.total_decisions == 0 {
            0.0
        } else {
            self.total_latency_ms / self.total_decisions as f64
        }
    }
}

impl Standings {
    pub fn new(players: impl IntoIterator<Item = (String, AiDifficulty)>) -> Self {
        Self {
            players: players
                .into_iter()
                .map(|(name, difficulty)| PlayerStanding::new(name, difficulty))
                .collect(),
            games: 0,
        }
    }

    pub fn players(&self) -> &[PlayerStanding] {
        &self.players
    }

    pub fn games(&self) -> usize {
        self.games
    }

    pub fn record_game(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        for round in &outcome.rounds {
            for (standing, seat) in self.players.iter_mut().zip(&round.seats) {
                standing.rounds += 1;
                standing.total_points += u64::from(seat.points);
                standing.total_decisions += u64::from(seat.metrics.decisions);
                standing.total_latency_ms += seat.metrics.total_ms;
                if seat.went_out {
                    standing.rounds_out += 1;
                }
            }
        }

        let totals = outcome.totals();
        let best = totals.iter().copied().min();
        for (standing, total) in self.players.iter_mut().zip(&totals) {
            standing.games += 1;
            if Some(*total) == best {
                standing.wins += 1;
            }
        }
    }

    pub fn write_markdown(
        &self,
        path: impl AsRef<Path>,
        config: &BenchmarkConfig,
    ) -> Result<(), RunnerError> {
        let mut rows = String::new();
        rows.push_str("# Michigan Tournament Summary\n\n");
        let _ = writeln!(
            rows,
            "Run `{}`: {} game{}, rounds {} to {}\n",
            config.run_id,
            self.games,
            if self.games == 1 { "" } else { "s" },
            config.matches.first_round,
            config.matches.last_round,
        );
        rows.push_str("| Player | Difficulty | Games | Wins | Win % | Rounds out | Avg points/round | Total points | Avg ms/decision |\n");
        rows.push_str("|--------|------------|-------|------|-------|------------|------------------|--------------|-----------------|\n");

        for player in &self.players {
            let _ = writeln!(
                rows,
                "| {name} | {difficulty} | {games} | {wins} | {win:.1}% | {out} | {avg:.2} | {total} | {latency:.2} |",
                name = player.name,
                difficulty = player.difficulty.as_str(),
                games = player.games,
                wins = player.wins,
                win = player.win_rate() * 100.0,
                out = player.rounds_out,
                avg = player.avg_points_per_round(),
                total = player.total_points,
                latency = player.avg_ms_per_decision(),
            );
        }

        fs::write(path.as_ref(), rows)?;
        Ok(())
    }
}
