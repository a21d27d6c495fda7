// Player behavior profiles: role inference and derived behavior scores.

use std::cmp::Ordering;

use serde::Serialize;

use crate::analysis::aggregate::PlayerAggregate;

// ---------------------------------------------------------------------------
// Agent roles
// ---------------------------------------------------------------------------

/// In-game role an agent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Duelist,
    Initiator,
    Controller,
    Sentinel,
    Unknown,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Duelist => "Duelist",
            Role::Initiator => "Initiator",
            Role::Controller => "Controller",
            Role::Sentinel => "Sentinel",
            Role::Unknown => "Unknown",
        }
    }
}

const AGENT_ROLES: &[(&str, Role)] = &[
    ("Jett", Role::Duelist),
    ("Raze", Role::Duelist),
    ("Reyna", Role::Duelist),
    ("Phoenix", Role::Duelist),
    ("Yoru", Role::Duelist),
    ("Neon", Role::Duelist),
    ("Iso", Role::Duelist),
    ("Sova", Role::Initiator),
    ("Fade", Role::Initiator),
    ("KAY/O", Role::Initiator),
    ("Breach", Role::Initiator),
    ("Skye", Role::Initiator),
    ("Gekko", Role::Initiator),
    ("Omen", Role::Controller),
    ("Brimstone", Role::Controller),
    ("Viper", Role::Controller),
    ("Astra", Role::Controller),
    ("Harbor", Role::Controller),
    ("Clove", Role::Controller),
    ("Killjoy", Role::Sentinel),
    ("Cypher", Role::Sentinel),
    ("Sage", Role::Sentinel),
    ("Chamber", Role::Sentinel),
    ("Deadlock", Role::Sentinel),
    ("Vyse", Role::Sentinel),
];

/// Role of an agent by name, case-insensitively. Unrecognized agents map to
/// `Role::Unknown` rather than failing.
pub fn role_of(agent: &str) -> Role {
    AGENT_ROLES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(agent))
        .map(|(_, role)| *role)
        .unwrap_or(Role::Unknown)
}

// ---------------------------------------------------------------------------
// Behavior scores
// ---------------------------------------------------------------------------

/// ACS value treated as a full contribution in the impact blend.
const IMPACT_ACS_SCALE: f64 = 300.0;
const IMPACT_ACS_WEIGHT: f64 = 0.4;
const IMPACT_KD_WEIGHT: f64 = 0.3;
const IMPACT_FB_WEIGHT: f64 = 0.3;

const AGGRESSION_ENTRY_WEIGHT: f64 = 0.45;
const AGGRESSION_FB_WEIGHT: f64 = 0.35;
const AGGRESSION_DUELIST_WEIGHT: f64 = 0.20;

/// Entry rate at which the aggression entry term saturates.
const ENTRY_RATE_CEILING: f64 = 0.30;

/// Below this sum, a roster mean is treated as zero.
const MEAN_EPSILON: f64 = 1e-9;

/// Neutral score reported when there are too few games to measure spread.
const NEUTRAL_CONSISTENCY: f64 = 50.0;

/// Unnormalized impact blend: combat output, trading efficiency, and opening
/// duel success. Normalized against the roster mean by `build_profiles`.
pub(crate) fn raw_impact(agg: &PlayerAggregate) -> f64 {
    (agg.avg_acs() / IMPACT_ACS_SCALE) * IMPACT_ACS_WEIGHT
        + agg.avg_kd() * IMPACT_KD_WEIGHT
        + agg.first_blood_rate() * IMPACT_FB_WEIGHT
}

/// Aggression on a 0-100 scale from entry frequency, opening duel success,
/// and duelist pick share.
fn aggression_score(agg: &PlayerAggregate) -> f64 {
    let entry_term = (agg.entry_rate() / ENTRY_RATE_CEILING).min(1.0);
    let duelist_share = role_pick_share(agg, Role::Duelist);
    let score = 100.0
        * (AGGRESSION_ENTRY_WEIGHT * entry_term
            + AGGRESSION_FB_WEIGHT * agg.first_blood_rate()
            + AGGRESSION_DUELIST_WEIGHT * duelist_share);
    score.clamp(0.0, 100.0)
}

/// Consistency on a 0-100 scale: 100 minus the coefficient of variation of
/// per-game ACS, in percent. Fewer than two games reads as neutral.
fn consistency_score(agg: &PlayerAggregate) -> f64 {
    if agg.acs_per_game.len() < 2 {
        return NEUTRAL_CONSISTENCY;
    }
    let n = agg.acs_per_game.len() as f64;
    let mean = agg.acs_per_game.iter().sum::<f64>() / n;
    if mean < MEAN_EPSILON {
        return NEUTRAL_CONSISTENCY;
    }
    let variance = agg.acs_per_game.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let cv = variance.sqrt() / mean;
    (100.0 - 100.0 * cv).clamp(0.0, 100.0)
}

/// Share of this player's agent picks belonging to one role.
fn role_pick_share(agg: &PlayerAggregate, role: Role) -> f64 {
    let total: u32 = agg.agents.values().sum();
    if total == 0 {
        return 0.0;
    }
    let picks: u32 = agg
        .agents
        .iter()
        .filter(|(agent, _)| role_of(agent) == role)
        .map(|(_, n)| n)
        .sum();
    picks as f64 / total as f64
}

/// Pick counts per role, ordered by count descending. Ties keep the fixed
/// Duelist/Initiator/Controller/Sentinel/Unknown order.
fn role_counts(agg: &PlayerAggregate) -> Vec<(Role, u32)> {
    let mut counts = vec![
        (Role::Duelist, 0u32),
        (Role::Initiator, 0),
        (Role::Controller, 0),
        (Role::Sentinel, 0),
        (Role::Unknown, 0),
    ];
    for (agent, n) in &agg.agents {
        let role = role_of(agent);
        if let Some(slot) = counts.iter_mut().find(|(r, _)| *r == role) {
            slot.1 += n;
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

// ---------------------------------------------------------------------------
// Playstyle tags
// ---------------------------------------------------------------------------

pub(crate) struct TagSignals {
    pub aggression: f64,
    pub consistency: f64,
    pub entry_rate: f64,
    pub avg_kd: f64,
    pub primary_role: Role,
    pub distinct_roles: usize,
}

struct TagRule {
    tag: &'static str,
    applies: fn(&TagSignals) -> bool,
}

const TAG_RULES: &[TagRule] = &[
    TagRule {
        tag: "Entry",
        applies: |s| s.aggression >= 70.0 && s.entry_rate >= 0.25,
    },
    TagRule {
        tag: "Anchor",
        applies: |s| s.primary_role == Role::Sentinel && s.entry_rate < 0.10,
    },
    TagRule {
        tag: "Lurker",
        applies: |s| {
            s.primary_role != Role::Sentinel && s.entry_rate < 0.08 && s.avg_kd >= 1.1
        },
    },
    TagRule {
        tag: "Steady Hand",
        applies: |s| s.consistency >= 70.0,
    },
    TagRule {
        tag: "Boom or Bust",
        applies: |s| s.consistency < 40.0 && s.aggression >= 50.0,
    },
    TagRule {
        tag: "Role Flex",
        applies: |s| s.distinct_roles >= 3,
    },
];

fn playstyle_tags(signals: &TagSignals) -> Vec<String> {
    TAG_RULES
        .iter()
        .filter(|rule| (rule.applies)(signals))
        .map(|rule| rule.tag.to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Round presence
// ---------------------------------------------------------------------------

const PRESENCE_ENTRY_RATE: f64 = 0.25;
const PRESENCE_OBJECTIVE_PER_GAME: f64 = 1.0;

fn round_presence(agg: &PlayerAggregate) -> &'static str {
    if agg.entry_rate() >= PRESENCE_ENTRY_RATE {
        "Opening duels"
    } else if agg.objective_actions_per_game() >= PRESENCE_OBJECTIVE_PER_GAME {
        "Objective play"
    } else {
        "Mid-round trades"
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Behavioral read on one player, derived entirely from their aggregate.
#[derive(Debug, Clone)]
pub struct PlayerBehaviorProfile {
    pub name: String,
    pub primary_role: Role,
    pub secondary_role: Role,
    /// 0-100, higher means more entry-oriented.
    pub aggression: f64,
    /// 0-100, higher means less game-to-game variance.
    pub consistency: f64,
    /// 100 is the roster average; scale is relative, not absolute.
    pub impact_rating: f64,
    pub playstyle_tags: Vec<String>,
    pub agent_pool: Vec<String>,
    /// Only set when a provider supplies positional telemetry; never guessed.
    pub preferred_site: Option<String>,
    pub round_presence: &'static str,
}

/// Build one profile per aggregate, in the same order.
///
/// Impact ratings are normalized so the roster mean is 100; a roster of one
/// therefore always reads exactly 100.
pub fn build_profiles(aggregates: &[PlayerAggregate]) -> Vec<PlayerBehaviorProfile> {
    if aggregates.is_empty() {
        return Vec::new();
    }

    let raws: Vec<f64> = aggregates.iter().map(raw_impact).collect();
    let mean = raws.iter().sum::<f64>() / raws.len() as f64;

    aggregates
        .iter()
        .zip(raws.iter())
        .map(|(agg, raw)| {
            let impact_rating = if mean < MEAN_EPSILON { 0.0 } else { 100.0 * raw / mean };
            let counts = role_counts(agg);
            let primary_role = if counts[0].1 > 0 { counts[0].0 } else { Role::Unknown };
            let secondary_role = if agg.distinct_agents() < 2 || counts[1].1 == 0 {
                Role::Unknown
            } else {
                counts[1].0
            };
            let aggression = aggression_score(agg);
            let consistency = consistency_score(agg);
            let signals = TagSignals {
                aggression,
                consistency,
                entry_rate: agg.entry_rate(),
                avg_kd: agg.avg_kd(),
                primary_role,
                distinct_roles: counts.iter().filter(|(r, n)| *r != Role::Unknown && *n > 0).count(),
            };

            PlayerBehaviorProfile {
                name: agg.name.clone(),
                primary_role,
                secondary_role,
                aggression,
                consistency,
                impact_rating,
                playstyle_tags: playstyle_tags(&signals),
                agent_pool: agg.agent_pool(),
                preferred_site: None,
                round_presence: round_presence(agg),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Team playstyle
// ---------------------------------------------------------------------------

/// Qualitative one-line read on how the roster plays as a unit.
pub fn team_playstyle(aggregates: &[PlayerAggregate]) -> String {
    if aggregates.is_empty() {
        return "Balanced approach".to_string();
    }

    let mut duelists = 0u32;
    let mut controllers = 0u32;
    let mut sentinels = 0u32;
    for agg in aggregates {
        match primary_role_of(agg) {
            Role::Duelist => duelists += 1,
            Role::Controller => controllers += 1,
            Role::Sentinel => sentinels += 1,
            _ => {}
        }
    }

    let total_fb: u32 = aggregates.iter().map(|a| a.first_bloods).sum();
    let total_fd: u32 = aggregates.iter().map(|a| a.first_deaths).sum();
    let fb_ratio = total_fb as f64 / total_fd.max(1) as f64;

    let style = if fb_ratio > 1.2 && duelists > controllers {
        "Aggressive duelist-focused"
    } else if sentinels > duelists {
        "Defensive utility-heavy"
    } else if controllers > duelists {
        "Methodical execute-style"
    } else if fb_ratio > 1.1 {
        "Early aggression focused"
    } else {
        "Balanced approach"
    };
    style.to_string()
}

fn primary_role_of(agg: &PlayerAggregate) -> Role {
    let counts = role_counts(agg);
    if counts[0].1 > 0 {
        counts[0].0
    } else {
        Role::Unknown
    }
}

/// Most impactful player on the roster with a short reason, or a placeholder
/// pair when there is no player data at all.
pub fn identify_primary_threat(aggregates: &[PlayerAggregate]) -> (String, String) {
    let Some(top) = aggregates
        .iter()
        .max_by(|a, b| {
            raw_impact(a)
                .partial_cmp(&raw_impact(b))
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.name.cmp(&a.name))
        })
    else {
        return ("Unknown Threat".to_string(), "insufficient data".to_string());
    };

    let agent = top
        .top_agents(1)
        .into_iter()
        .next()
        .unwrap_or_else(|| "Unknown".to_string());
    let reason = if top.first_blood_rate() > 0.6 {
        "aggressive opener"
    } else if top.avg_acs() > 250.0 {
        "high impact"
    } else {
        "key player"
    };
    (format!("{} ({})", top.name, agent), reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn agg(name: &str, acs: Vec<f64>, kills: u32, deaths: u32, fb: u32, fd: u32, rounds: u32, agents: &[(&str, u32)]) -> PlayerAggregate {
        let mut map = BTreeMap::new();
        for (agent, n) in agents {
            map.insert(agent.to_string(), *n);
        }
        PlayerAggregate {
            player_id: name.to_lowercase(),
            name: name.into(),
            games: acs.len() as u32,
            kills,
            deaths,
            first_bloods: fb,
            first_deaths: fd,
            plants: 0,
            defuses: 0,
            rounds_observed: rounds,
            acs_per_game: acs,
            agents: map,
        }
    }

    // ---- role lookup ----

    #[test]
    fn role_lookup_covers_all_four_roles() {
        assert_eq!(role_of("Jett"), Role::Duelist);
        assert_eq!(role_of("Sova"), Role::Initiator);
        assert_eq!(role_of("Omen"), Role::Controller);
        assert_eq!(role_of("Killjoy"), Role::Sentinel);
        assert_eq!(role_of("kay/o"), Role::Initiator);
        assert_eq!(role_of("NotAnAgent"), Role::Unknown);
    }

    // ---- role inference ----

    #[test]
    fn primary_and_secondary_roles_from_pick_counts() {
        let a = agg("ace", vec![240.0; 5], 80, 60, 10, 5, 100, &[("Jett", 3), ("Omen", 2)]);
        let profiles = build_profiles(&[a]);
        assert_eq!(profiles[0].primary_role, Role::Duelist);
        assert_eq!(profiles[0].secondary_role, Role::Controller);
    }

    #[test]
    fn single_agent_player_has_no_secondary_role() {
        let a = agg("one", vec![200.0; 4], 60, 60, 2, 2, 80, &[("Killjoy", 4)]);
        let profiles = build_profiles(&[a]);
        assert_eq!(profiles[0].primary_role, Role::Sentinel);
        assert_eq!(profiles[0].secondary_role, Role::Unknown);
    }

    #[test]
    fn no_agent_data_reads_unknown() {
        let a = agg("ghost", vec![200.0; 2], 30, 30, 1, 1, 40, &[]);
        let profiles = build_profiles(&[a]);
        assert_eq!(profiles[0].primary_role, Role::Unknown);
        assert_eq!(profiles[0].secondary_role, Role::Unknown);
    }

    // ---- scores ----

    #[test]
    fn aggression_saturates_at_the_entry_ceiling() {
        // entry rate 0.5 saturates the entry term; fb rate 1.0; all duelist.
        // 100 * (0.45 + 0.35 + 0.20) = 100.
        let hot = agg("hot", vec![250.0; 4], 80, 40, 20, 0, 40, &[("Jett", 4)]);
        let profiles = build_profiles(&[hot]);
        assert!((profiles[0].aggression - 100.0).abs() < 1e-9);
    }

    #[test]
    fn aggression_is_low_for_passive_players() {
        let quiet = agg("quiet", vec![180.0; 4], 50, 50, 0, 2, 100, &[("Killjoy", 4)]);
        let profiles = build_profiles(&[quiet]);
        assert!(profiles[0].aggression < 15.0);
    }

    #[test]
    fn consistency_neutral_below_two_games() {
        let a = agg("new", vec![300.0], 20, 10, 3, 1, 20, &[("Jett", 1)]);
        let profiles = build_profiles(&[a]);
        assert!((profiles[0].consistency - 50.0).abs() < 1e-9);
    }

    #[test]
    fn identical_games_read_perfectly_consistent() {
        let a = agg("metronome", vec![220.0, 220.0, 220.0], 60, 40, 3, 3, 60, &[("Sova", 3)]);
        let profiles = build_profiles(&[a]);
        assert!((profiles[0].consistency - 100.0).abs() < 1e-9);
    }

    #[test]
    fn volatile_games_read_less_consistent() {
        let steady = agg("steady", vec![200.0, 210.0, 190.0], 60, 40, 3, 3, 60, &[("Sova", 3)]);
        let wild = agg("wild", vec![320.0, 90.0, 210.0], 60, 40, 3, 3, 60, &[("Jett", 3)]);
        let profiles = build_profiles(&[steady, wild]);
        let steady_score = profiles.iter().find(|p| p.name == "steady").unwrap().consistency;
        let wild_score = profiles.iter().find(|p| p.name == "wild").unwrap().consistency;
        assert!(steady_score > wild_score);
    }

    // ---- impact normalization ----

    #[test]
    fn impact_mean_is_one_hundred() {
        let a = agg("a", vec![280.0; 4], 90, 50, 12, 4, 80, &[("Jett", 4)]);
        let b = agg("b", vec![200.0; 4], 60, 60, 4, 6, 80, &[("Omen", 4)]);
        let c = agg("c", vec![160.0; 4], 40, 70, 2, 6, 80, &[("Sage", 4)]);
        let profiles = build_profiles(&[a, b, c]);
        let mean: f64 = profiles.iter().map(|p| p.impact_rating).sum::<f64>() / 3.0;
        assert!((mean - 100.0).abs() < 1e-6);
        assert!(profiles.iter().find(|p| p.name == "a").unwrap().impact_rating > 100.0);
        assert!(profiles.iter().find(|p| p.name == "c").unwrap().impact_rating < 100.0);
    }

    #[test]
    fn solo_roster_reads_exactly_average() {
        let a = agg("solo", vec![240.0; 3], 60, 40, 6, 2, 60, &[("Jett", 3)]);
        let profiles = build_profiles(&[a]);
        assert!((profiles[0].impact_rating - 100.0).abs() < 1e-9);
    }

    // ---- tags and presence ----

    #[test]
    fn entry_tag_requires_both_aggression_and_entry_rate() {
        let entry = agg("entry", vec![250.0; 4], 80, 40, 16, 4, 60, &[("Jett", 4)]);
        let profiles = build_profiles(&[entry]);
        assert!(profiles[0].playstyle_tags.iter().any(|t| t == "Entry"));
        assert_eq!(profiles[0].round_presence, "Opening duels");
    }

    #[test]
    fn anchor_tag_for_passive_sentinels() {
        let anchor = agg("anchor", vec![190.0; 4], 50, 50, 1, 2, 100, &[("Cypher", 4)]);
        let profiles = build_profiles(&[anchor]);
        assert!(profiles[0].playstyle_tags.iter().any(|t| t == "Anchor"));
    }

    #[test]
    fn objective_presence_when_plants_dominate() {
        let mut a = agg("planter", vec![190.0; 4], 50, 50, 1, 2, 100, &[("Brimstone", 4)]);
        a.plants = 5;
        let profiles = build_profiles(&[a]);
        assert_eq!(profiles[0].round_presence, "Objective play");
    }

    // ---- team playstyle ----

    #[test]
    fn duelist_heavy_winning_openers_reads_aggressive() {
        let ros = vec![
            agg("d1", vec![250.0; 4], 80, 40, 15, 5, 80, &[("Jett", 4)]),
            agg("d2", vec![240.0; 4], 70, 50, 12, 6, 80, &[("Raze", 4)]),
            agg("s1", vec![180.0; 4], 50, 50, 2, 4, 80, &[("Sova", 4)]),
        ];
        assert_eq!(team_playstyle(&ros), "Aggressive duelist-focused");
    }

    #[test]
    fn sentinel_heavy_reads_defensive() {
        let ros = vec![
            agg("s1", vec![200.0; 4], 60, 50, 2, 4, 80, &[("Killjoy", 4)]),
            agg("s2", vec![190.0; 4], 55, 50, 1, 4, 80, &[("Cypher", 4)]),
            agg("i1", vec![180.0; 4], 50, 50, 2, 4, 80, &[("Sova", 4)]),
        ];
        assert_eq!(team_playstyle(&ros), "Defensive utility-heavy");
    }

    #[test]
    fn empty_roster_reads_balanced() {
        assert_eq!(team_playstyle(&[]), "Balanced approach");
    }

    // ---- primary threat ----

    #[test]
    fn primary_threat_picks_highest_raw_impact() {
        let star = agg("star", vec![290.0; 4], 100, 40, 14, 4, 80, &[("Jett", 4)]);
        let other = agg("other", vec![180.0; 4], 50, 60, 2, 6, 80, &[("Omen", 4)]);
        let (threat, reason) = identify_primary_threat(&[star, other]);
        assert_eq!(threat, "star (Jett)");
        assert_eq!(reason, "aggressive opener");
    }

    #[test]
    fn primary_threat_reason_falls_back_to_acs() {
        let star = agg("star", vec![280.0; 4], 100, 50, 5, 5, 80, &[("Jett", 4)]);
        let (_, reason) = identify_primary_threat(&[star]);
        assert_eq!(reason, "high impact");
    }

    #[test]
    fn primary_threat_placeholder_without_players() {
        let (threat, reason) = identify_primary_threat(&[]);
        assert_eq!(threat, "Unknown Threat");
        assert_eq!(reason, "insufficient data");
    }
}
