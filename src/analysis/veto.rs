// Veto scoring: map pick/ban recommendations under small-sample uncertainty.

use serde::Serialize;

use crate::analysis::maps::{TeamMapRecord, MAP_POOL};
use crate::config::AnalysisConfig;

/// Win rate assumed for a map nobody has data on, in percent.
pub const BASELINE_WIN_RATE: f64 = 50.0;

/// Sample size at which the caveat about a thin sample is dropped.
const SMALL_SAMPLE_GAMES: u32 = 3;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunable knobs of the veto scorer.
#[derive(Debug, Clone, Copy)]
pub struct VetoPolicy {
    /// Pseudo-game count pulling observed rates toward the baseline. Higher
    /// values mean a thin sample moves the score less.
    pub prior_games: f64,
    /// Score magnitude at which a map becomes a BAN or PICK.
    pub ban_threshold: f64,
    /// Score magnitude at which a map becomes a MUST_BAN or MUST_PICK.
    pub must_ban_threshold: f64,
}

impl Default for VetoPolicy {
    fn default() -> Self {
        VetoPolicy {
            prior_games: 8.0,
            ban_threshold: 10.0,
            must_ban_threshold: 25.0,
        }
    }
}

impl VetoPolicy {
    pub fn from_config(cfg: &AnalysisConfig) -> Self {
        VetoPolicy {
            prior_games: cfg.veto_prior_games,
            ban_threshold: cfg.veto_ban_threshold,
            must_ban_threshold: cfg.veto_must_ban_threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

/// Recommendation tier for one map, from drop-everything ban to free pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VetoTier {
    MustBan,
    Ban,
    Neutral,
    Pick,
    MustPick,
}

impl VetoTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            VetoTier::MustBan => "MUST_BAN",
            VetoTier::Ban => "BAN",
            VetoTier::Neutral => "NEUTRAL",
            VetoTier::Pick => "PICK",
            VetoTier::MustPick => "MUST_PICK",
        }
    }

    /// Sort rank: picks first, bans last.
    fn rank(&self) -> u8 {
        match self {
            VetoTier::MustPick => 0,
            VetoTier::Pick => 1,
            VetoTier::Neutral => 2,
            VetoTier::Ban => 3,
            VetoTier::MustBan => 4,
        }
    }
}

fn tier_for(score: f64, policy: &VetoPolicy) -> VetoTier {
    if score >= policy.must_ban_threshold {
        VetoTier::MustBan
    } else if score >= policy.ban_threshold {
        VetoTier::Ban
    } else if score <= -policy.must_ban_threshold {
        VetoTier::MustPick
    } else if score <= -policy.ban_threshold {
        VetoTier::Pick
    } else {
        VetoTier::Neutral
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// One scored map. Win rates are percentages; `score` is positive when the
/// map favors the opposing side of the veto (ban it) and negative when it
/// favors us (pick it).
#[derive(Debug, Clone)]
pub struct VetoRecommendation {
    pub map_name: String,
    pub score: f64,
    pub tier: VetoTier,
    pub our_win_rate: f64,
    pub their_win_rate: f64,
    pub games_played: u32,
    pub reason: String,
}

/// Pull an observed win rate toward the baseline in proportion to how little
/// evidence backs it: `baseline + (raw - baseline) * n / (n + prior)`.
///
/// Zero games returns the baseline exactly; an infinite sample would return
/// the raw rate.
fn adjusted_win_rate(raw_pct: f64, games: u32, prior_games: f64) -> f64 {
    let n = games as f64;
    BASELINE_WIN_RATE + (raw_pct - BASELINE_WIN_RATE) * n / (n + prior_games)
}

/// Score every map in the pool for a veto against `subject`.
///
/// With `ours` present this is a head-to-head read: positive scores are maps
/// where the subject holds the edge over us. Without it the subject's own
/// pool is read against the baseline, so their best maps surface as picks
/// and their worst as bans.
///
/// Maps the subject has never played always come out NEUTRAL with a zero
/// score; an empty book is not evidence in either direction.
pub fn recommend(
    subject: &[TeamMapRecord],
    ours: Option<&[TeamMapRecord]>,
    policy: &VetoPolicy,
) -> Vec<VetoRecommendation> {
    let mut recs: Vec<VetoRecommendation> = MAP_POOL
        .iter()
        .map(|&map_name| {
            let subject_rec = find_map(subject, map_name);
            let games_played = subject_rec.map_or(0, |r| r.games_played);
            let subject_raw = subject_rec.and_then(|r| r.win_rate_pct());

            if games_played == 0 || subject_raw.is_none() {
                return VetoRecommendation {
                    map_name: map_name.to_string(),
                    score: 0.0,
                    tier: VetoTier::Neutral,
                    our_win_rate: match ours {
                        Some(our_maps) => raw_or_baseline(find_map(our_maps, map_name)),
                        None => BASELINE_WIN_RATE,
                    },
                    their_win_rate: match ours {
                        Some(_) => raw_or_baseline(subject_rec),
                        None => BASELINE_WIN_RATE,
                    },
                    games_played,
                    reason: "No recent games on this map".to_string(),
                };
            }
            let subject_raw = subject_raw.unwrap_or(BASELINE_WIN_RATE);
            let subject_adj = adjusted_win_rate(subject_raw, games_played, policy.prior_games);

            let (score, our_win_rate, their_win_rate) = match ours {
                Some(our_maps) => {
                    let our_rec = find_map(our_maps, map_name);
                    let our_games = our_rec.map_or(0, |r| r.games_played);
                    let our_raw = raw_or_baseline(our_rec);
                    let our_adj = adjusted_win_rate(our_raw, our_games, policy.prior_games);
                    (subject_adj - our_adj, our_raw, subject_raw)
                }
                // Self scout: the subject's pool is read as our own, so their
                // strong maps land on the pick side of the scale.
                None => (BASELINE_WIN_RATE - subject_adj, subject_raw, BASELINE_WIN_RATE),
            };

            let tier = tier_for(score, policy);
            let reason = reason_for(tier, score, subject_raw, games_played, ours.is_some());

            VetoRecommendation {
                map_name: map_name.to_string(),
                score,
                tier,
                our_win_rate,
                their_win_rate,
                games_played,
                reason,
            }
        })
        .collect();

    recs.sort_by(|a, b| {
        a.tier
            .rank()
            .cmp(&b.tier.rank())
            .then_with(|| b.games_played.cmp(&a.games_played))
            .then_with(|| a.map_name.cmp(&b.map_name))
    });
    recs
}

fn find_map<'a>(records: &'a [TeamMapRecord], name: &str) -> Option<&'a TeamMapRecord> {
    records.iter().find(|r| r.map_name.eq_ignore_ascii_case(name))
}

fn raw_or_baseline(rec: Option<&TeamMapRecord>) -> f64 {
    rec.and_then(|r| r.win_rate_pct()).unwrap_or(BASELINE_WIN_RATE)
}

fn reason_for(tier: VetoTier, score: f64, subject_raw: f64, games: u32, head_to_head: bool) -> String {
    if tier == VetoTier::Neutral && games < SMALL_SAMPLE_GAMES {
        let noun = if games == 1 { "game" } else { "games" };
        return format!("Limited sample ({games} {noun})");
    }

    if head_to_head {
        match tier {
            VetoTier::MustBan => format!("They dominate this map ({subject_raw:.0}% WR)"),
            VetoTier::Ban => "They have the edge here".to_string(),
            VetoTier::Neutral => "Even matchup - decider potential".to_string(),
            VetoTier::Pick => "They struggle here".to_string(),
            VetoTier::MustPick => format!("Clear advantage for us (+{:.0})", score.abs()),
        }
    } else {
        match tier {
            VetoTier::MustBan => format!("Weak map, avoid ({subject_raw:.0}% WR)"),
            VetoTier::Ban => format!("Struggling here ({subject_raw:.0}% WR)"),
            VetoTier::Neutral => "Even performance".to_string(),
            VetoTier::Pick => format!("Strong map ({subject_raw:.0}% WR)"),
            VetoTier::MustPick => format!("Comfort pick ({subject_raw:.0}% WR)"),
        }
    }
}
