// Head-to-head comparison: per-map advantage calls and a veto one-liner.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::analysis::maps::TeamMapRecord;

/// Which side a map favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Advantage {
    Yours,
    Opponent,
    Neutral,
}

impl Advantage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Advantage::Yours => "yours",
            Advantage::Opponent => "opponent",
            Advantage::Neutral => "neutral",
        }
    }
}

/// Advantage call for one map. Win rates are percentages; a side with no
/// games on the map reads as 0.
#[derive(Debug, Clone)]
pub struct MapAdvantage {
    pub map_name: String,
    pub your_win_rate: f64,
    pub opponent_win_rate: f64,
    pub advantage: Advantage,
}

/// Compare both teams across every map either of them has played.
///
/// The gap must exceed `threshold_pp` percentage points to call an edge;
/// anything inside the band is neutral. Output is sorted by map name so the
/// same inputs always render identically.
pub fn map_advantages(
    yours: &[TeamMapRecord],
    theirs: &[TeamMapRecord],
    threshold_pp: f64,
) -> Vec<MapAdvantage> {
    let names: BTreeSet<&str> = yours
        .iter()
        .map(|r| r.map_name.as_str())
        .chain(theirs.iter().map(|r| r.map_name.as_str()))
        .collect();

    names
        .into_iter()
        .map(|name| {
            let your_wr = rate_on(yours, name);
            let their_wr = rate_on(theirs, name);
            let gap = your_wr - their_wr;
            let advantage = if gap > threshold_pp {
                Advantage::Yours
            } else if gap < -threshold_pp {
                Advantage::Opponent
            } else {
                Advantage::Neutral
            };
            MapAdvantage {
                map_name: name.to_string(),
                your_win_rate: your_wr,
                opponent_win_rate: their_wr,
                advantage,
            }
        })
        .collect()
}

fn rate_on(records: &[TeamMapRecord], name: &str) -> f64 {
    records
        .iter()
        .find(|r| r.map_name == name)
        .and_then(|r| r.win_rate_pct())
        .unwrap_or(0.0)
}

/// One-line veto plan: up to two picks, up to two bans, and the opposing
/// player to build anti-strats around.
pub fn veto_recommendation(advantages: &[MapAdvantage], opponent_threat: &str) -> String {
    let picks: Vec<&str> = advantages
        .iter()
        .filter(|a| a.advantage == Advantage::Yours)
        .take(2)
        .map(|a| a.map_name.as_str())
        .collect();
    let bans: Vec<&str> = advantages
        .iter()
        .filter(|a| a.advantage == Advantage::Opponent)
        .take(2)
        .map(|a| a.map_name.as_str())
        .collect();

    let mut parts = Vec::new();
    if !picks.is_empty() {
        parts.push(format!("Pick: {}", picks.join(", ")));
    }
    if !bans.is_empty() {
        parts.push(format!("Ban: {}", bans.join(", ")));
    }
    parts.push(format!("Key threat to neutralize: {opponent_threat}"));
    parts.join(" | ")
}
