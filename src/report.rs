// Wire shapes of scout and comparison reports.
//
// Engine types carry full-precision fractions; everything here is rounded at
// construction so a serialized report is stable down to the last digit.
// Rates are percentages with one decimal, ratios carry two.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::aggregate::PlayerAggregate;
use crate::analysis::compare::{Advantage, MapAdvantage};
use crate::analysis::composition::{EconomyTendency, TeamComposition};
use crate::analysis::insight::TacticalInsight;
use crate::analysis::maps::{MapPoolEntry, TeamMapRecord};
use crate::analysis::profile::{PlayerBehaviorProfile, Role};
use crate::analysis::veto::{VetoRecommendation, VetoTier};
use crate::telemetry::types::{MatchRecord, PlayerLine};

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Scout report
// ---------------------------------------------------------------------------

/// ACS thresholds behind the qualitative impact label.
const IMPACT_HIGH_ACS: f64 = 250.0;
const IMPACT_MEDIUM_ACS: f64 = 200.0;

/// Agents shown per player in the stat table.
const TOP_AGENTS_SHOWN: usize = 3;

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub primary_threat: String,
    pub threat_reason: String,
    pub key_takeaway: String,
    pub team_playstyle: String,
    pub recent_form: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerStatsRow {
    pub name: String,
    pub games: u32,
    pub avg_acs: f64,
    pub avg_kd: f64,
    /// Percent of opening duels won.
    pub first_blood_rate: f64,
    pub top_agents: Vec<String>,
    pub impact: &'static str,
}

impl From<&PlayerAggregate> for PlayerStatsRow {
    fn from(agg: &PlayerAggregate) -> Self {
        let avg_acs = agg.avg_acs();
        let impact = if avg_acs >= IMPACT_HIGH_ACS {
            "High"
        } else if avg_acs >= IMPACT_MEDIUM_ACS {
            "Medium"
        } else {
            "Low"
        };
        PlayerStatsRow {
            name: agg.name.clone(),
            games: agg.games,
            avg_acs: round1(avg_acs),
            avg_kd: round2(agg.avg_kd()),
            first_blood_rate: round1(agg.first_blood_rate() * 100.0),
            top_agents: agg.top_agents(TOP_AGENTS_SHOWN),
            impact,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapStatsRow {
    pub map_name: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub avg_rounds_won: f64,
    pub avg_rounds_lost: f64,
}

impl From<&TeamMapRecord> for MapStatsRow {
    fn from(rec: &TeamMapRecord) -> Self {
        MapStatsRow {
            map_name: rec.map_name.clone(),
            games_played: rec.games_played,
            wins: rec.wins,
            losses: rec.losses,
            win_rate: round1(rec.win_rate_pct().unwrap_or(0.0)),
            avg_rounds_won: round1(rec.avg_rounds_won()),
            avg_rounds_lost: round1(rec.avg_rounds_lost()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VetoRow {
    pub map_name: String,
    pub score: f64,
    pub recommendation: VetoTier,
    pub our_win_rate: f64,
    pub their_win_rate: f64,
    pub games_played: u32,
    pub reason: String,
}

impl From<&VetoRecommendation> for VetoRow {
    fn from(rec: &VetoRecommendation) -> Self {
        VetoRow {
            map_name: rec.map_name.clone(),
            score: round2(rec.score),
            recommendation: rec.tier,
            our_win_rate: round1(rec.our_win_rate),
            their_win_rate: round1(rec.their_win_rate),
            games_played: rec.games_played,
            reason: rec.reason.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapPoolRow {
    pub map_name: &'static str,
    pub games_played: u32,
    pub win_rate: f64,
    pub attack_win_rate: f64,
    pub defense_win_rate: f64,
    pub avg_round_diff: f64,
}

impl From<&MapPoolEntry> for MapPoolRow {
    fn from(entry: &MapPoolEntry) -> Self {
        MapPoolRow {
            map_name: entry.map_name,
            games_played: entry.games_played,
            win_rate: round1(entry.win_rate * 100.0),
            attack_win_rate: round1(entry.attack_win_rate * 100.0),
            defense_win_rate: round1(entry.defense_win_rate * 100.0),
            avg_round_diff: round1(entry.avg_round_diff),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileRow {
    pub name: String,
    pub primary_role: Role,
    pub secondary_role: Role,
    pub aggression: f64,
    pub consistency: f64,
    pub impact_rating: f64,
    pub playstyle_tags: Vec<String>,
    pub agent_pool: Vec<String>,
    pub preferred_site: Option<String>,
    pub round_presence: &'static str,
}

impl From<&PlayerBehaviorProfile> for ProfileRow {
    fn from(profile: &PlayerBehaviorProfile) -> Self {
        ProfileRow {
            name: profile.name.clone(),
            primary_role: profile.primary_role,
            secondary_role: profile.secondary_role,
            aggression: round1(profile.aggression),
            consistency: round1(profile.consistency),
            impact_rating: round1(profile.impact_rating),
            playstyle_tags: profile.playstyle_tags.clone(),
            agent_pool: profile.agent_pool.clone(),
            preferred_site: profile.preferred_site.clone(),
            round_presence: profile.round_presence,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CompositionRow {
    pub core_lineup: Vec<String>,
    pub core_lineup_pct: f64,
    pub role_distribution: BTreeMap<&'static str, f64>,
    pub flex_players: Vec<String>,
    pub one_tricks: Vec<String>,
    pub style: String,
}

impl From<&TeamComposition> for CompositionRow {
    fn from(comp: &TeamComposition) -> Self {
        CompositionRow {
            core_lineup: comp.core_lineup.clone(),
            core_lineup_pct: round1(comp.core_lineup_share * 100.0),
            role_distribution: comp
                .role_distribution
                .iter()
                .map(|(role, avg)| (*role, round1(*avg)))
                .collect(),
            flex_players: comp.flex_players.clone(),
            one_tricks: comp.one_tricks.clone(),
            style: comp.style.clone(),
        }
    }
}

/// Full scouting report for one team. Built once per request; never cached
/// or mutated after assembly.
#[derive(Debug, Clone, Serialize)]
pub struct ScoutReport {
    pub team_id: String,
    pub team_name: String,
    pub summary: ReportSummary,
    pub recommended_bans: Vec<String>,
    pub player_stats: Vec<PlayerStatsRow>,
    pub map_stats: Vec<MapStatsRow>,
    pub matches_analyzed: usize,
    pub date_range: String,
    pub veto_recommendations: Vec<VetoRow>,
    pub tactical_insights: Vec<TacticalInsight>,
    pub map_pool_matrix: Vec<MapPoolRow>,
    pub player_behavior_profiles: Vec<ProfileRow>,
    pub team_composition: Option<CompositionRow>,
    pub economy_tendency: Option<EconomyTendency>,
}

// ---------------------------------------------------------------------------
// Comparison report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AdvantageRow {
    pub map: String,
    pub your_win_rate: f64,
    pub opponent_win_rate: f64,
    pub advantage: Advantage,
}

impl From<&MapAdvantage> for AdvantageRow {
    fn from(adv: &MapAdvantage) -> Self {
        AdvantageRow {
            map: adv.map_name.clone(),
            your_win_rate: round1(adv.your_win_rate),
            opponent_win_rate: round1(adv.opponent_win_rate),
            advantage: adv.advantage,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonReport {
    pub your_team: ScoutReport,
    pub opponent: ScoutReport,
    pub map_advantages: Vec<AdvantageRow>,
    pub recommendation: String,
}

// ---------------------------------------------------------------------------
// Match payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PlayerLineRow {
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
    pub kd_ratio: f64,
    pub kda_ratio: f64,
    /// Fraction of opening duels won, unlike the report table's percentage.
    pub first_blood_rate: f64,
    pub headshot_pct: f64,
}

impl From<&PlayerLine> for PlayerLineRow {
    fn from(line: &PlayerLine) -> Self {
        PlayerLineRow {
            player_id: line.player_id.clone(),
            player_name: line.player_name.clone(),
            agent: line.agent.clone(),
            kills: line.kills,
            deaths: line.deaths,
            assists: line.assists,
            acs: round1(line.acs),
            adr: round1(line.adr),
            first_bloods: line.first_bloods,
            first_deaths: line.first_deaths,
            kd_ratio: round2(line.kd_ratio()),
            kda_ratio: round2(line.kda_ratio()),
            first_blood_rate: round2(line.first_blood_rate()),
            headshot_pct: round1(line.headshot_pct),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchRow {
    pub series_id: String,
    pub match_date: Option<String>,
    pub map_name: String,
    pub team_name: String,
    pub opponent_name: String,
    pub team_score: u32,
    pub opponent_score: u32,
    pub won: bool,
    pub tournament_name: String,
    pub player_stats: Vec<PlayerLineRow>,
}

impl From<&MatchRecord> for MatchRow {
    fn from(m: &MatchRecord) -> Self {
        MatchRow {
            series_id: m.series_id.clone(),
            match_date: m.match_date.map(|d| d.to_rfc3339()),
            map_name: m.map_name.clone(),
            team_name: m.team_name.clone(),
            opponent_name: m.opponent_name.clone(),
            team_score: m.team_score,
            opponent_score: m.opponent_score,
            won: m.won,
            tournament_name: m.tournament.clone(),
            player_stats: m.players.iter().map(PlayerLineRow::from).collect(),
        }
    }
}
