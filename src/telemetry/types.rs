// Normalized telemetry records shared by the provider and the analysis engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A game title known to the upstream data platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Title {
    pub id: String,
    pub name: String,
}

/// Team identity as resolved by the upstream team directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamRef {
    pub id: String,
    pub name: String,
}

/// One series (best-of-N) from a team's recent schedule, as listed by the
/// central data endpoint. Game detail comes from a separate series-state
/// lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub id: String,
    pub start_time: Option<DateTime<Utc>>,
    pub tournament: String,
    pub teams: Vec<TeamRef>,
}

/// Which half of the map a round was played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Attack,
    Defense,
}

/// Rough buy classification for a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyKind {
    FullBuy,
    ForceBuy,
    Eco,
}

/// One round of one map, from the perspective of the tracked team.
///
/// Round-level data is optional in most feeds; fields that a provider cannot
/// fill stay `None` and the economy analyzer degrades accordingly.
#[derive(Debug, Clone)]
pub struct RoundRecord {
    pub number: u32,
    pub won: bool,
    pub side: Option<Side>,
    pub buy: Option<BuyKind>,
    pub spike_planted: bool,
}

/// Per-player stat line for a single map.
#[derive(Debug, Clone)]
pub struct PlayerLine {
    pub player_id: String,
    pub player_name: String,
    pub agent: String,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub acs: f64,
    pub adr: f64,
    pub first_bloods: u32,
    pub first_deaths: u32,
    pub plants: u32,
    pub defuses: u32,
    pub headshot_pct: f64,
}

impl PlayerLine {
    pub fn kd_ratio(&self) -> f64 {
        self.kills as f64 / self.deaths.max(1) as f64
    }

    pub fn kda_ratio(&self) -> f64 {
        (self.kills + self.assists) as f64 / self.deaths.max(1) as f64
    }

    /// Share of this player's opening duels that they won.
    pub fn first_blood_rate(&self) -> f64 {
        let duels = self.first_bloods + self.first_deaths;
        if duels == 0 {
            return 0.0;
        }
        self.first_bloods as f64 / duels as f64
    }
}

/// One completed map between two teams, from the tracked team's perspective.
///
/// Records are immutable once built; every derived number downstream is
/// computed fresh from a set of these.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub series_id: String,
    pub match_date: Option<DateTime<Utc>>,
    pub map_name: String,
    pub team_id: String,
    pub team_name: String,
    pub opponent_id: String,
    pub opponent_name: String,
    pub team_score: u32,
    pub opponent_score: u32,
    pub won: bool,
    pub tournament: String,
    pub players: Vec<PlayerLine>,
    pub rounds: Vec<RoundRecord>,
}

impl MatchRecord {
    pub fn total_rounds(&self) -> u32 {
        self.team_score + self.opponent_score
    }

    pub fn round_diff(&self) -> i64 {
        self.team_score as i64 - self.opponent_score as i64
    }
}
