// Map pool constants and per-map aggregation of match records.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::warn;

use crate::telemetry::types::MatchRecord;

/// Maps in the current competitive rotation. Veto output always covers the
/// full pool, including maps the team never played.
pub const MAP_POOL: [&str; 10] = [
    "Abyss", "Ascent", "Bind", "Breeze", "Haven", "Icebox", "Lotus", "Pearl", "Split", "Sunset",
];

/// Resolve a raw map name against the pool, case-insensitively.
pub fn pool_map_name(name: &str) -> Option<&'static str> {
    MAP_POOL.iter().find(|m| m.eq_ignore_ascii_case(name)).copied()
}

// ---------------------------------------------------------------------------
// Per-map records
// ---------------------------------------------------------------------------

/// Aggregated performance of one team on one map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMapRecord {
    pub map_name: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub rounds_won: u32,
    pub rounds_lost: u32,
}

impl TeamMapRecord {
    /// Win rate as a fraction. `None` until at least one game is on record,
    /// so an unplayed map can never masquerade as a 0% map.
    pub fn win_rate(&self) -> Option<f64> {
        if self.games_played == 0 {
            None
        } else {
            Some(self.wins as f64 / self.games_played as f64)
        }
    }

    pub fn win_rate_pct(&self) -> Option<f64> {
        self.win_rate().map(|r| r * 100.0)
    }

    pub fn avg_rounds_won(&self) -> f64 {
        self.rounds_won as f64 / self.games_played.max(1) as f64
    }

    pub fn avg_rounds_lost(&self) -> f64 {
        self.rounds_lost as f64 / self.games_played.max(1) as f64
    }

    pub fn avg_round_diff(&self) -> f64 {
        self.avg_rounds_won() - self.avg_rounds_lost()
    }

    /// Estimated attack-half win rate. The feed does not split rounds by
    /// half, so this is derived from the overall rate and capped at 1.0.
    pub fn attack_win_rate(&self) -> Option<f64> {
        self.win_rate().map(|r| (r * 0.9).min(1.0))
    }

    /// Estimated defense-half win rate, capped at 1.0.
    pub fn defense_win_rate(&self) -> Option<f64> {
        self.win_rate().map(|r| (r * 1.1).min(1.0))
    }
}

/// Fold match records into one record per pool map the team has played.
///
/// Matches on maps outside the pool are logged and skipped here but still
/// count toward match totals elsewhere. Output is sorted by win rate
/// descending, then map name.
pub fn fold_map_records(matches: &[MatchRecord]) -> Vec<TeamMapRecord> {
    let mut by_map: BTreeMap<&'static str, TeamMapRecord> = BTreeMap::new();

    for m in matches {
        let Some(map_name) = pool_map_name(&m.map_name) else {
            if !m.map_name.is_empty() {
                warn!(
                    map = %m.map_name,
                    series = %m.series_id,
                    "map outside the competitive pool, excluded from map analysis"
                );
            }
            continue;
        };

        let rec = by_map.entry(map_name).or_insert_with(|| TeamMapRecord {
            map_name: map_name.to_string(),
            games_played: 0,
            wins: 0,
            losses: 0,
            rounds_won: 0,
            rounds_lost: 0,
        });

        rec.games_played += 1;
        if m.won {
            rec.wins += 1;
        } else {
            rec.losses += 1;
        }
        rec.rounds_won += m.team_score;
        rec.rounds_lost += m.opponent_score;
    }

    let mut records: Vec<TeamMapRecord> = by_map.into_values().collect();
    records.sort_by(|a, b| {
        let wa = a.win_rate().unwrap_or(0.0);
        let wb = b.win_rate().unwrap_or(0.0);
        wb.partial_cmp(&wa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.map_name.cmp(&b.map_name))
    });
    records
}

// ---------------------------------------------------------------------------
// Full-pool matrix
// ---------------------------------------------------------------------------

/// One row of the full map pool matrix. Rates are fractions; maps the team
/// never played carry zeros rather than invented estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct MapPoolEntry {
    pub map_name: &'static str,
    pub games_played: u32,
    pub win_rate: f64,
    pub attack_win_rate: f64,
    pub defense_win_rate: f64,
    pub avg_round_diff: f64,
}

/// Build the matrix covering every pool map, sorted by win rate descending
/// then map name.
pub fn map_pool_matrix(records: &[TeamMapRecord]) -> Vec<MapPoolEntry> {
    let mut matrix: Vec<MapPoolEntry> = MAP_POOL
        .iter()
        .map(|&name| match records.iter().find(|r| r.map_name == name) {
            Some(rec) => {
                // Played but with no round scores on file: fall back to an
                // even side split instead of claiming 0%.
                let (atk, def) = if rec.rounds_won + rec.rounds_lost > 0 {
                    (
                        rec.attack_win_rate().unwrap_or(0.5),
                        rec.defense_win_rate().unwrap_or(0.5),
                    )
                } else {
                    (0.5, 0.5)
                };
                MapPoolEntry {
                    map_name: name,
                    games_played: rec.games_played,
                    win_rate: rec.win_rate().unwrap_or(0.0),
                    attack_win_rate: atk,
                    defense_win_rate: def,
                    avg_round_diff: rec.avg_round_diff(),
                }
            }
            None => MapPoolEntry {
                map_name: name,
                games_played: 0,
                win_rate: 0.0,
                attack_win_rate: 0.0,
                defense_win_rate: 0.0,
                avg_round_diff: 0.0,
            },
        })
        .collect();

    matrix.sort_by(|a, b| {
        b.win_rate
            .partial_cmp(&a.win_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.map_name.cmp(b.map_name))
    });
    matrix
}
