// Scouting analysis engine: folds raw match records into the full report.

pub mod aggregate;
pub mod compare;
pub mod composition;
pub mod insight;
pub mod maps;
pub mod profile;
pub mod veto;

use tracing::debug;

use crate::analysis::aggregate::fold_player_aggregates;
use crate::analysis::composition::{economy_tendency, team_composition};
use crate::analysis::insight::{generate_insights, InsightContext};
use crate::analysis::maps::{fold_map_records, map_pool_matrix, TeamMapRecord};
use crate::analysis::profile::{build_profiles, identify_primary_threat, team_playstyle};
use crate::analysis::veto::{recommend, VetoPolicy};
use crate::config::AnalysisConfig;
use crate::report::{
    CompositionRow, MapPoolRow, MapStatsRow, PlayerStatsRow, ProfileRow, ReportSummary,
    ScoutReport, VetoRow,
};
use crate::telemetry::types::{MatchRecord, TeamRef};

/// Maps suggested as bans in the summary.
const SUMMARY_BAN_COUNT: usize = 2;

/// How many of a ban slot's games must be on record before it is suggested.
const SUMMARY_BAN_MIN_GAMES: u32 = 2;

/// Series counted toward the recent form line.
const RECENT_FORM_SERIES: usize = 5;

/// Build the full scouting report for one team from its match records.
///
/// Pure and deterministic: the same records and config produce an identical
/// report, field for field. `our_maps` switches the veto section from
/// self-scout framing to head-to-head framing.
pub fn generate_scout_report(
    team: &TeamRef,
    matches: &[MatchRecord],
    our_maps: Option<&[TeamMapRecord]>,
    cfg: &AnalysisConfig,
) -> ScoutReport {
    let aggregates = fold_player_aggregates(matches);
    let map_records = fold_map_records(matches);
    let profiles = build_profiles(&aggregates);
    debug!(
        team = %team.name,
        matches = matches.len(),
        players = aggregates.len(),
        maps = map_records.len(),
        "assembling scout report"
    );

    let (primary_threat, threat_reason) = identify_primary_threat(&aggregates);
    let recommended_bans = recommended_bans(&map_records);
    let playstyle = team_playstyle(&aggregates);
    let key_takeaway = key_takeaway(&team.name, &primary_threat, &playstyle, &recommended_bans);

    let policy = VetoPolicy::from_config(cfg);
    let veto_recommendations: Vec<VetoRow> = recommend(&map_records, our_maps, &policy)
        .iter()
        .map(VetoRow::from)
        .collect();

    let economy = economy_tendency(matches, cfg);
    let composition = team_composition(matches, &aggregates);
    let tactical_insights = generate_insights(&InsightContext {
        aggregates: &aggregates,
        profiles: &profiles,
        map_records: &map_records,
        matches,
        economy: economy.as_ref(),
    });

    ScoutReport {
        team_id: team.id.clone(),
        team_name: team.name.clone(),
        summary: ReportSummary {
            primary_threat,
            threat_reason,
            key_takeaway,
            team_playstyle: playstyle,
            recent_form: recent_form(matches),
        },
        recommended_bans,
        player_stats: aggregates.iter().map(PlayerStatsRow::from).collect(),
        map_stats: map_records.iter().map(MapStatsRow::from).collect(),
        matches_analyzed: matches.len(),
        date_range: date_range(matches),
        veto_recommendations,
        tactical_insights,
        map_pool_matrix: map_pool_matrix(&map_records).iter().map(MapPoolRow::from).collect(),
        player_behavior_profiles: profiles.iter().map(ProfileRow::from).collect(),
        team_composition: composition.as_ref().map(CompositionRow::from),
        economy_tendency: economy,
    }
}

/// The team's best maps by win rate, skipping thin samples, padded with
/// "TBD" when fewer than two qualify.
fn recommended_bans(map_records: &[TeamMapRecord]) -> Vec<String> {
    let mut bans: Vec<String> = map_records
        .iter()
        .filter(|r| r.games_played >= SUMMARY_BAN_MIN_GAMES)
        .take(SUMMARY_BAN_COUNT)
        .map(|r| r.map_name.clone())
        .collect();
    while bans.len() < SUMMARY_BAN_COUNT {
        bans.push("TBD".to_string());
    }
    bans
}

/// Win-loss line over the most recent distinct series, newest first.
fn recent_form(matches: &[MatchRecord]) -> String {
    let mut seen = std::collections::BTreeSet::new();
    let mut results = Vec::new();
    for m in matches {
        if !seen.insert(m.series_id.clone()) {
            continue;
        }
        results.push(m.won);
        if results.len() >= RECENT_FORM_SERIES {
            break;
        }
    }
    if results.is_empty() {
        return "No recent data".to_string();
    }
    let wins = results.iter().filter(|w| **w).count();
    format!("{}W-{}L in last {}", wins, results.len() - wins, results.len())
}

/// Span of the analyzed matches, e.g. "Jan 15 - Feb 01, 2025". Years appear
/// on both ends only when they differ.
fn date_range(matches: &[MatchRecord]) -> String {
    let dates: Vec<_> = matches.iter().filter_map(|m| m.match_date).collect();
    let (Some(min), Some(max)) = (dates.iter().min(), dates.iter().max()) else {
        return "Date range unavailable".to_string();
    };
    if min.format("%Y").to_string() == max.format("%Y").to_string() {
        format!("{} - {}", min.format("%b %d"), max.format("%b %d, %Y"))
    } else {
        format!("{} - {}", min.format("%b %d, %Y"), max.format("%b %d, %Y"))
    }
}

fn key_takeaway(team_name: &str, primary_threat: &str, playstyle: &str, bans: &[String]) -> String {
    let bans: Vec<&str> = bans
        .iter()
        .filter(|b| b.as_str() != "TBD")
        .map(|b| b.as_str())
        .take(2)
        .collect();
    let bans_str = if bans.is_empty() {
        "their comfort maps".to_string()
    } else {
        bans.join(" and ")
    };

    if playstyle.contains("Aggressive") {
        format!(
            "{team_name} plays aggressively around {primary_threat}. Ban {bans_str} and force \
             late-round engagements."
        )
    } else if playstyle.contains("Defensive") {
        format!(
            "{team_name} relies on defensive setups. Ban {bans_str} and prepare fast executes."
        )
    } else {
        format!(
            "{team_name} has a balanced approach with {primary_threat} as key threat. \
             Ban {bans_str}."
        )
    }
}
