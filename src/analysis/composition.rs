// Team composition reads and economy tendency classification.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::aggregate::PlayerAggregate;
use crate::analysis::profile::{role_of, Role};
use crate::config::AnalysisConfig;
use crate::telemetry::types::{BuyKind, MatchRecord, Side};

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// A player needs a role on at least this share of their maps for it to
/// count toward flex status.
const FLEX_ROLE_SHARE: f64 = 0.30;

/// Share of maps on one agent that makes a player a one-trick.
const ONE_TRICK_SHARE: f64 = 0.80;

/// Role averages that split fast-hitting from setup-heavy styles.
const FAST_DUELIST_AVG: f64 = 2.0;
const SLOW_SENTINEL_AVG: f64 = 1.5;

/// How the team fields agents across its matches.
#[derive(Debug, Clone)]
pub struct TeamComposition {
    /// Agents of the most common full lineup, sorted by name.
    pub core_lineup: Vec<String>,
    /// Share of full-lineup maps on which the core lineup appeared, 0-1.
    pub core_lineup_share: f64,
    /// Average number of agents fielded per role per map.
    pub role_distribution: BTreeMap<&'static str, f64>,
    pub flex_players: Vec<String>,
    pub one_tricks: Vec<String>,
    pub style: String,
}

/// Derive the composition read, or `None` when no match fields a full five.
pub fn team_composition(
    matches: &[MatchRecord],
    aggregates: &[PlayerAggregate],
) -> Option<TeamComposition> {
    let mut lineup_counts: BTreeMap<Vec<String>, u32> = BTreeMap::new();
    let mut role_totals: BTreeMap<&'static str, f64> = BTreeMap::new();
    let mut full_lineups = 0u32;

    for m in matches {
        if m.players.len() != 5 {
            continue;
        }
        full_lineups += 1;

        let mut lineup: Vec<String> = m.players.iter().map(|p| p.agent.clone()).collect();
        lineup.sort();
        *lineup_counts.entry(lineup).or_insert(0) += 1;

        for p in &m.players {
            let role = role_of(&p.agent);
            if role != Role::Unknown {
                *role_totals.entry(role.as_str()).or_insert(0.0) += 1.0;
            }
        }
    }

    if full_lineups == 0 {
        return None;
    }

    // BTreeMap iteration makes the modal lineup deterministic on ties: the
    // lexicographically smallest lineup wins.
    let (core_lineup, core_count) = lineup_counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(lineup, count)| (lineup.clone(), *count))?;

    let role_distribution: BTreeMap<&'static str, f64> = role_totals
        .into_iter()
        .map(|(role, total)| (role, total / full_lineups as f64))
        .collect();

    let mut flex_players = Vec::new();
    let mut one_tricks = Vec::new();
    for agg in aggregates {
        let total: u32 = agg.agents.values().sum();
        if total == 0 {
            continue;
        }
        let mut role_games: BTreeMap<&'static str, u32> = BTreeMap::new();
        for (agent, n) in &agg.agents {
            *role_games.entry(role_of(agent).as_str()).or_insert(0) += n;
        }
        let flexed_roles = role_games
            .iter()
            .filter(|(role, games)| {
                **role != Role::Unknown.as_str() && **games as f64 / total as f64 >= FLEX_ROLE_SHARE
            })
            .count();
        if flexed_roles >= 2 {
            flex_players.push(agg.name.clone());
        }
        if agg
            .agents
            .values()
            .any(|n| *n as f64 / total as f64 >= ONE_TRICK_SHARE)
        {
            one_tricks.push(agg.name.clone());
        }
    }

    let duelist_avg = role_distribution.get(Role::Duelist.as_str()).copied().unwrap_or(0.0);
    let sentinel_avg = role_distribution.get(Role::Sentinel.as_str()).copied().unwrap_or(0.0);
    let style = if duelist_avg >= FAST_DUELIST_AVG {
        "Fast-hitting, duelist-led executes"
    } else if sentinel_avg >= SLOW_SENTINEL_AVG {
        "Setup-heavy, slow defaults"
    } else {
        "Balanced tempo"
    };

    Some(TeamComposition {
        core_lineup,
        core_lineup_share: core_count as f64 / full_lineups as f64,
        role_distribution,
        flex_players,
        one_tricks,
        style: style.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

const ECO_DISCIPLINED_WR: f64 = 0.30;
const ECO_STANDARD_WR: f64 = 0.15;
const SAVE_PATIENT: f64 = 0.15;
const SAVE_GREEDY: f64 = 0.05;
const POST_PLANT_STRONG: f64 = 0.60;
const POST_PLANT_AVERAGE: f64 = 0.45;

/// Categorical read of how the team spends. All labels, no raw numbers: the
/// underlying samples are usually too thin to quote as rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EconomyTendency {
    pub force_buys: &'static str,
    pub eco_discipline: &'static str,
    pub save_rounds: &'static str,
    pub post_plant: &'static str,
}

/// Classify economy habits from round-level data. Returns `None` when no
/// round carries buy information, which is the common case for feeds that
/// only report map scores.
pub fn economy_tendency(matches: &[MatchRecord], cfg: &AnalysisConfig) -> Option<EconomyTendency> {
    let mut classified = 0u32;
    let mut forces = 0u32;
    let mut ecos = 0u32;
    let mut eco_wins = 0u32;
    let mut losses_followed = 0u32;
    let mut saves_after_loss = 0u32;
    let mut plants = 0u32;
    let mut plant_wins = 0u32;

    for m in matches {
        let mut rounds: Vec<_> = m.rounds.iter().collect();
        rounds.sort_by_key(|r| r.number);

        let mut prev_lost = false;
        for r in &rounds {
            if let Some(buy) = r.buy {
                classified += 1;
                match buy {
                    BuyKind::ForceBuy => forces += 1,
                    BuyKind::Eco => {
                        ecos += 1;
                        if r.won {
                            eco_wins += 1;
                        }
                    }
                    BuyKind::FullBuy => {}
                }
                if prev_lost {
                    losses_followed += 1;
                    if buy == BuyKind::Eco {
                        saves_after_loss += 1;
                    }
                }
            }
            if r.spike_planted && r.side != Some(Side::Defense) {
                plants += 1;
                if r.won {
                    plant_wins += 1;
                }
            }
            prev_lost = !r.won;
        }
    }

    if classified == 0 {
        return None;
    }

    let force_rate = forces as f64 / classified as f64;
    let force_buys = if force_rate > cfg.force_buy_often {
        "Often"
    } else if force_rate < cfg.force_buy_rarely {
        "Rarely"
    } else {
        "Occasional"
    };

    let eco_discipline = if ecos == 0 {
        "Standard"
    } else {
        let wr = eco_wins as f64 / ecos as f64;
        if wr >= ECO_DISCIPLINED_WR {
            "Disciplined"
        } else if wr >= ECO_STANDARD_WR {
            "Standard"
        } else {
            "Loose"
        }
    };

    let save_rounds = if losses_followed == 0 {
        "Standard"
    } else {
        let rate = saves_after_loss as f64 / losses_followed as f64;
        if rate > SAVE_PATIENT {
            "Patient"
        } else if rate < SAVE_GREEDY {
            "Greedy"
        } else {
            "Standard"
        }
    };

    let post_plant = if plants == 0 {
        "Average"
    } else {
        let wr = plant_wins as f64 / plants as f64;
        if wr >= POST_PLANT_STRONG {
            "Strong"
        } else if wr >= POST_PLANT_AVERAGE {
            "Average"
        } else {
            "Weak"
        }
    };

    Some(EconomyTendency {
        force_buys,
        eco_discipline,
        save_rounds,
        post_plant,
    })
}
