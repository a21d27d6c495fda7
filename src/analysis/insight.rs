// Tactical insight rules: threshold checks over aggregates that surface
// exploitable patterns as short coaching notes.

use std::cmp::Ordering;

use serde::Serialize;

use crate::analysis::aggregate::PlayerAggregate;
use crate::analysis::composition::EconomyTendency;
use crate::analysis::maps::TeamMapRecord;
use crate::analysis::profile::{role_of, PlayerBehaviorProfile, Role};
use crate::telemetry::types::MatchRecord;

/// How urgently an insight should be treated in preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Warning,
    Info,
    Tip,
}

/// One actionable note about the scouted team.
#[derive(Debug, Clone, Serialize)]
pub struct TacticalInsight {
    pub category: &'static str,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    pub icon: &'static str,
}

/// Everything the rules are allowed to look at.
pub struct InsightContext<'a> {
    pub aggregates: &'a [PlayerAggregate],
    pub profiles: &'a [PlayerBehaviorProfile],
    pub map_records: &'a [TeamMapRecord],
    pub matches: &'a [MatchRecord],
    pub economy: Option<&'a EconomyTendency>,
}

type Rule = fn(&InsightContext) -> Option<TacticalInsight>;

/// Rule order is presentation order. Each rule fires at most once; a rule
/// with nothing to say returns `None`.
const RULES: &[Rule] = &[
    opening_duels_won,
    opening_duels_lost,
    star_player,
    impact_concentration,
    weakest_map,
    strongest_map,
    side_imbalance,
    duelist_heavy,
    close_games,
    round_diff_dominant,
    round_diff_struggling,
    economy_pattern,
];

/// Run every rule against the context, in order.
pub fn generate_insights(ctx: &InsightContext) -> Vec<TacticalInsight> {
    RULES.iter().filter_map(|rule| rule(ctx)).collect()
}

// ---------------------------------------------------------------------------
// Opening duels
// ---------------------------------------------------------------------------

const OPENING_STRONG: f64 = 0.55;
const OPENING_WEAK: f64 = 0.45;

fn team_first_blood_rate(aggregates: &[PlayerAggregate]) -> Option<f64> {
    let fb: u32 = aggregates.iter().map(|a| a.first_bloods).sum();
    let fd: u32 = aggregates.iter().map(|a| a.first_deaths).sum();
    if fb + fd == 0 {
        return None;
    }
    Some(fb as f64 / (fb + fd) as f64)
}

fn opening_duels_won(ctx: &InsightContext) -> Option<TacticalInsight> {
    let rate = team_first_blood_rate(ctx.aggregates)?;
    if rate <= OPENING_STRONG {
        return None;
    }
    Some(TacticalInsight {
        category: "OPENING",
        title: "Aggressive Openers".to_string(),
        description: format!(
            "They win {:.0}% of opening duels. Play passive angles on pistol rounds (1 & 13) \
             to deny their aggression. Don't peek dry.",
            rate * 100.0
        ),
        severity: Severity::Warning,
        icon: "!",
    })
}

fn opening_duels_lost(ctx: &InsightContext) -> Option<TacticalInsight> {
    let rate = team_first_blood_rate(ctx.aggregates)?;
    if rate >= OPENING_WEAK {
        return None;
    }
    Some(TacticalInsight {
        category: "OPENING",
        title: "Vulnerable to Early Pressure".to_string(),
        description: format!(
            "They lose {:.0}% of opening duels. Apply early pressure with aggressive \
             utility usage and fast map control.",
            (1.0 - rate) * 100.0
        ),
        severity: Severity::Tip,
        icon: "+",
    })
}

// ---------------------------------------------------------------------------
// Key players
// ---------------------------------------------------------------------------

const STAR_ACS: f64 = 270.0;
const IMPACT_SHARE: f64 = 0.35;

fn star_player(ctx: &InsightContext) -> Option<TacticalInsight> {
    let star = ctx.aggregates.iter().max_by(|a, b| {
        a.avg_acs()
            .partial_cmp(&b.avg_acs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.name.cmp(&a.name))
    })?;
    if star.avg_acs() <= STAR_ACS {
        return None;
    }
    let agent = star
        .top_agents(1)
        .into_iter()
        .next()
        .unwrap_or_else(|| "their comfort agent".to_string());
    Some(TacticalInsight {
        category: "KEY_PLAYER",
        title: format!("Neutralize {}", star.name),
        description: format!(
            "{} averages {:.0} ACS on {}. Dedicate utility to shut them down early. \
             If they're quiet, the whole team struggles.",
            star.name,
            star.avg_acs(),
            agent
        ),
        severity: Severity::Warning,
        icon: "*",
    })
}

fn impact_concentration(ctx: &InsightContext) -> Option<TacticalInsight> {
    if ctx.profiles.len() < 2 {
        return None;
    }
    let total: f64 = ctx.profiles.iter().map(|p| p.impact_rating).sum();
    if total <= 0.0 {
        return None;
    }
    let top = ctx.profiles.iter().max_by(|a, b| {
        a.impact_rating
            .partial_cmp(&b.impact_rating)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.name.cmp(&a.name))
    })?;
    let share = top.impact_rating / total;
    if share <= IMPACT_SHARE {
        return None;
    }
    Some(TacticalInsight {
        category: "KEY_PLAYER",
        title: format!("Heavy Reliance on {}", top.name),
        description: format!(
            "{} carries {:.0}% of the team's impact. Force them into unfavorable duels \
             and the structure collapses.",
            top.name,
            share * 100.0
        ),
        severity: Severity::Warning,
        icon: "*",
    })
}

// ---------------------------------------------------------------------------
// Map pool
// ---------------------------------------------------------------------------

const WEAK_MAP_WR: f64 = 0.40;
const STRONG_MAP_WR: f64 = 0.70;
const MAP_MIN_GAMES: u32 = 2;
const SIDE_GAP: f64 = 0.15;

fn weakest_map(ctx: &InsightContext) -> Option<TacticalInsight> {
    let weakest = ctx
        .map_records
        .iter()
        .filter(|r| r.games_played >= MAP_MIN_GAMES)
        .filter(|r| r.win_rate().is_some_and(|wr| wr < WEAK_MAP_WR))
        .min_by(|a, b| {
            a.win_rate()
                .partial_cmp(&b.win_rate())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.map_name.cmp(&b.map_name))
        })?;
    let wr = weakest.win_rate().unwrap_or(0.0);
    Some(TacticalInsight {
        category: "MAP_POOL",
        title: format!("Exploit {}", weakest.map_name),
        description: format!(
            "Only {:.0}% win rate on {} over {} games. Steer the veto toward it.",
            wr * 100.0,
            weakest.map_name,
            weakest.games_played
        ),
        severity: Severity::Tip,
        icon: ">",
    })
}

fn strongest_map(ctx: &InsightContext) -> Option<TacticalInsight> {
    let strongest = ctx
        .map_records
        .iter()
        .filter(|r| r.games_played >= MAP_MIN_GAMES)
        .filter(|r| r.win_rate().is_some_and(|wr| wr > STRONG_MAP_WR))
        .max_by(|a, b| {
            a.win_rate()
                .partial_cmp(&b.win_rate())
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.map_name.cmp(&a.map_name))
        })?;
    let wr = strongest.win_rate().unwrap_or(0.0);
    Some(TacticalInsight {
        category: "MAP_POOL",
        title: format!("Avoid {}", strongest.map_name),
        description: format!(
            "They hold a {:.0}% win rate on {}. Must ban unless you bring a specific counter.",
            wr * 100.0,
            strongest.map_name
        ),
        severity: Severity::Warning,
        icon: "X",
    })
}

fn side_imbalance(ctx: &InsightContext) -> Option<TacticalInsight> {
    let skewed = ctx
        .map_records
        .iter()
        .filter(|r| r.games_played >= MAP_MIN_GAMES)
        .filter_map(|r| {
            let atk = r.attack_win_rate()?;
            let def = r.defense_win_rate()?;
            let gap = (atk - def).abs();
            (gap > SIDE_GAP).then_some((r, atk, def, gap))
        })
        .max_by(|a, b| a.3.partial_cmp(&b.3).unwrap_or(Ordering::Equal))?;
    let (rec, atk, def, _) = skewed;
    Some(TacticalInsight {
        category: "MAP_POOL",
        title: format!("Side-Skewed on {}", rec.map_name),
        description: format!(
            "Attack {:.0}% vs defense {:.0}% on {}. Target the weaker half.",
            atk * 100.0,
            def * 100.0,
            rec.map_name
        ),
        severity: Severity::Info,
        icon: "%",
    })
}

// ---------------------------------------------------------------------------
// Composition and tempo
// ---------------------------------------------------------------------------

const DUELIST_PICK_SHARE: f64 = 0.35;
const CLOSE_GAME_MARGIN: i64 = 3;
const CLOSE_GAME_SHARE: f64 = 0.40;
const DOMINANT_ROUND_DIFF: f64 = 3.0;
const STRUGGLING_ROUND_DIFF: f64 = -2.0;

fn duelist_heavy(ctx: &InsightContext) -> Option<TacticalInsight> {
    let total: u32 = ctx.aggregates.iter().flat_map(|a| a.agents.values()).sum();
    if total == 0 {
        return None;
    }
    let duelists: u32 = ctx
        .aggregates
        .iter()
        .flat_map(|a| a.agents.iter())
        .filter(|(agent, _)| role_of(agent) == Role::Duelist)
        .map(|(_, n)| n)
        .sum();
    let share = duelists as f64 / total as f64;
    if share <= DUELIST_PICK_SHARE {
        return None;
    }
    Some(TacticalInsight {
        category: "COMPOSITION",
        title: "Duelist Heavy Comp".to_string(),
        description: format!(
            "{:.0}% of their agent picks are duelists. Expect aggressive dry peeks and \
             trade-focused plays. Stack utility for retakes.",
            share * 100.0
        ),
        severity: Severity::Info,
        icon: "!",
    })
}

fn close_games(ctx: &InsightContext) -> Option<TacticalInsight> {
    if ctx.matches.is_empty() {
        return None;
    }
    let close = ctx
        .matches
        .iter()
        .filter(|m| m.round_diff().abs() <= CLOSE_GAME_MARGIN)
        .count();
    let share = close as f64 / ctx.matches.len() as f64;
    if share <= CLOSE_GAME_SHARE {
        return None;
    }
    Some(TacticalInsight {
        category: "MENTAL",
        title: "Clutch Situations".to_string(),
        description: format!(
            "{:.0}% of their maps end within {} rounds. They're dangerous under pressure; \
             close rounds out early instead of letting them drag.",
            share * 100.0,
            CLOSE_GAME_MARGIN
        ),
        severity: Severity::Info,
        icon: "~",
    })
}

fn avg_round_diff(matches: &[MatchRecord]) -> Option<f64> {
    if matches.is_empty() {
        return None;
    }
    let total: i64 = matches.iter().map(|m| m.round_diff()).sum();
    Some(total as f64 / matches.len() as f64)
}

fn round_diff_dominant(ctx: &InsightContext) -> Option<TacticalInsight> {
    let diff = avg_round_diff(ctx.matches)?;
    if diff <= DOMINANT_ROUND_DIFF {
        return None;
    }
    Some(TacticalInsight {
        category: "FORM",
        title: "Dominant Form".to_string(),
        description: format!(
            "Averaging +{diff:.1} round differential. They're in peak form; expect \
             disciplined, confident play."
        ),
        severity: Severity::Warning,
        icon: "^",
    })
}

fn round_diff_struggling(ctx: &InsightContext) -> Option<TacticalInsight> {
    let diff = avg_round_diff(ctx.matches)?;
    if diff >= STRUGGLING_ROUND_DIFF {
        return None;
    }
    Some(TacticalInsight {
        category: "FORM",
        title: "Struggling Recently".to_string(),
        description: format!(
            "Negative round differential ({diff:.1}) across recent maps. Apply early \
             pressure to tilt them further."
        ),
        severity: Severity::Tip,
        icon: "v",
    })
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

fn economy_pattern(ctx: &InsightContext) -> Option<TacticalInsight> {
    let econ = ctx.economy?;
    let description = if econ.force_buys == "Often" {
        "They force-buy often after lost rounds. Expect surprise rifle rounds; \
         hold utility for anti-eco setups and play retake-ready."
    } else if econ.eco_discipline == "Loose" {
        "Loose eco discipline: they convert few low-buy rounds. Punish their saves \
         with aggressive map control."
    } else {
        return None;
    };
    Some(TacticalInsight {
        category: "ECONOMY",
        title: "Exploitable Buy Patterns".to_string(),
        description: description.to_string(),
        severity: Severity::Tip,
        icon: "$",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate::fold_player_aggregates;
    use crate::analysis::maps::fold_map_records;
    use crate::analysis::profile::build_profiles;
    use crate::telemetry::types::PlayerLine;

    fn line(id: &str, agent: &str, acs: f64, fb: u32, fd: u32) -> PlayerLine {
        PlayerLine {
            player_id: id.into(),
            player_name: id.into(),
            agent: agent.into(),
            kills: 15,
            deaths: 12,
            assists: 4,
            acs,
            adr: 140.0,
            first_bloods: fb,
            first_deaths: fd,
            plants: 0,
            defuses: 0,
            headshot_pct: 22.0,
        }
    }

    fn match_record(map: &str, score: (u32, u32), players: Vec<PlayerLine>) -> MatchRecord {
        MatchRecord {
            series_id: "s1".into(),
            match_date: None,
            map_name: map.into(),
            team_id: "t1".into(),
            team_name: "Team".into(),
            opponent_id: "t2".into(),
            opponent_name: "Opp".into(),
            team_score: score.0,
            opponent_score: score.1,
            won: score.0 > score.1,
            tournament: "VCT".into(),
            players,
            rounds: Vec::new(),
        }
    }

    struct Fixture {
        aggregates: Vec<PlayerAggregate>,
        profiles: Vec<PlayerBehaviorProfile>,
        map_records: Vec<TeamMapRecord>,
        matches: Vec<MatchRecord>,
    }

    fn fixture(matches: Vec<MatchRecord>) -> Fixture {
        let aggregates = fold_player_aggregates(&matches);
        let profiles = build_profiles(&aggregates);
        let map_records = fold_map_records(&matches);
        Fixture {
            aggregates,
            profiles,
            map_records,
            matches,
        }
    }

    fn insights_of(fix: &Fixture, economy: Option<&EconomyTendency>) -> Vec<TacticalInsight> {
        generate_insights(&InsightContext {
            aggregates: &fix.aggregates,
            profiles: &fix.profiles,
            map_records: &fix.map_records,
            matches: &fix.matches,
            economy,
        })
    }

    fn titles(insights: &[TacticalInsight]) -> Vec<&str> {
        insights.iter().map(|i| i.title.as_str()).collect()
    }

    // ---- opening duels ----

    #[test]
    fn strong_openers_raise_a_warning() {
        let fix = fixture(vec![match_record(
            "Ascent",
            (13, 7),
            vec![line("p1", "Jett", 240.0, 8, 2), line("p2", "Omen", 180.0, 4, 2)],
        )]);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Aggressive Openers"));
        assert!(!titles(&insights).contains(&"Vulnerable to Early Pressure"));
    }

    #[test]
    fn weak_openers_raise_a_tip() {
        let fix = fixture(vec![match_record(
            "Ascent",
            (7, 13),
            vec![line("p1", "Jett", 200.0, 2, 8), line("p2", "Omen", 180.0, 2, 4)],
        )]);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Vulnerable to Early Pressure"));
        assert!(!titles(&insights).contains(&"Aggressive Openers"));
    }

    #[test]
    fn no_opening_data_fires_neither_rule() {
        let fix = fixture(vec![match_record(
            "Ascent",
            (13, 7),
            vec![line("p1", "Jett", 200.0, 0, 0)],
        )]);
        let insights = insights_of(&fix, None);
        assert!(!titles(&insights).contains(&"Aggressive Openers"));
        assert!(!titles(&insights).contains(&"Vulnerable to Early Pressure"));
    }

    // ---- key players ----

    #[test]
    fn star_player_is_called_out_by_name() {
        let fix = fixture(vec![match_record(
            "Ascent",
            (13, 7),
            vec![line("star", "Jett", 310.0, 5, 4), line("p2", "Omen", 180.0, 2, 2)],
        )]);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Neutralize star"));
    }

    #[test]
    fn average_roster_has_no_star_insight() {
        let fix = fixture(vec![match_record(
            "Ascent",
            (13, 7),
            vec![line("p1", "Jett", 220.0, 3, 3), line("p2", "Omen", 210.0, 2, 2)],
        )]);
        let insights = insights_of(&fix, None);
        assert!(!insights.iter().any(|i| i.title.starts_with("Neutralize")));
    }

    #[test]
    fn lopsided_impact_flags_reliance() {
        // One player far above three quiet teammates.
        let fix = fixture(vec![match_record(
            "Ascent",
            (13, 7),
            vec![
                line("carry", "Jett", 320.0, 9, 1),
                line("a", "Omen", 110.0, 0, 3),
                line("b", "Sova", 105.0, 0, 3),
                line("c", "Sage", 100.0, 0, 3),
            ],
        )]);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Heavy Reliance on carry"));
    }

    // ---- map pool ----

    #[test]
    fn weak_and_strong_maps_both_surface() {
        let matches = vec![
            match_record("Ascent", (13, 5), vec![line("p1", "Jett", 220.0, 3, 3)]),
            match_record("Ascent", (13, 8), vec![line("p1", "Jett", 220.0, 3, 3)]),
            match_record("Bind", (6, 13), vec![line("p1", "Jett", 180.0, 2, 4)]),
            match_record("Bind", (9, 13), vec![line("p1", "Jett", 180.0, 2, 4)]),
        ];
        let fix = fixture(matches);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Exploit Bind"));
        assert!(titles(&insights).contains(&"Avoid Ascent"));
    }

    #[test]
    fn single_game_maps_do_not_trigger_map_insights() {
        let matches = vec![
            match_record("Ascent", (13, 5), vec![line("p1", "Jett", 220.0, 3, 3)]),
            match_record("Bind", (6, 13), vec![line("p1", "Jett", 180.0, 2, 4)]),
        ];
        let fix = fixture(matches);
        let insights = insights_of(&fix, None);
        assert!(!insights.iter().any(|i| i.category == "MAP_POOL"));
    }

    // ---- composition and form ----

    #[test]
    fn duelist_stacked_roster_is_flagged() {
        let fix = fixture(vec![match_record(
            "Ascent",
            (13, 7),
            vec![
                line("p1", "Jett", 240.0, 4, 2),
                line("p2", "Raze", 230.0, 3, 2),
                line("p3", "Omen", 180.0, 1, 2),
            ],
        )]);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Duelist Heavy Comp"));
    }

    #[test]
    fn overtime_heavy_schedule_is_flagged() {
        let matches = vec![
            match_record("Ascent", (13, 11), vec![line("p1", "Jett", 220.0, 3, 3)]),
            match_record("Bind", (14, 12), vec![line("p1", "Jett", 220.0, 3, 3)]),
            match_record("Haven", (13, 4), vec![line("p1", "Jett", 220.0, 3, 3)]),
        ];
        let fix = fixture(matches);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Clutch Situations"));
    }

    #[test]
    fn strong_round_diff_reads_dominant() {
        let matches = vec![
            match_record("Ascent", (13, 4), vec![line("p1", "Jett", 220.0, 3, 3)]),
            match_record("Bind", (13, 6), vec![line("p1", "Jett", 220.0, 3, 3)]),
        ];
        let fix = fixture(matches);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Dominant Form"));
        assert!(!titles(&insights).contains(&"Struggling Recently"));
    }

    #[test]
    fn negative_round_diff_reads_struggling() {
        let matches = vec![
            match_record("Ascent", (5, 13), vec![line("p1", "Jett", 180.0, 2, 4)]),
            match_record("Bind", (7, 13), vec![line("p1", "Jett", 180.0, 2, 4)]),
        ];
        let fix = fixture(matches);
        let insights = insights_of(&fix, None);
        assert!(titles(&insights).contains(&"Struggling Recently"));
        assert!(!titles(&insights).contains(&"Dominant Form"));
    }

    // ---- economy ----

    #[test]
    fn frequent_forces_surface_an_economy_tip() {
        let fix = fixture(vec![match_record(
            "Ascent",
            (13, 7),
            vec![line("p1", "Jett", 220.0, 3, 3)],
        )]);
        let econ = EconomyTendency {
            force_buys: "Often",
            eco_discipline: "Standard",
            save_rounds: "Standard",
            post_plant: "Average",
        };
        let insights = insights_of(&fix, Some(&econ));
        assert!(titles(&insights).contains(&"Exploitable Buy Patterns"));
    }

    #[test]
    fn healthy_economy_stays_silent() {
        let fix = fixture(vec![match_record(
            "Ascent",
            (13, 7),
            vec![line("p1", "Jett", 220.0, 3, 3)],
        )]);
        let econ = EconomyTendency {
            force_buys: "Occasional",
            eco_discipline: "Disciplined",
            save_rounds: "Patient",
            post_plant: "Strong",
        };
        let insights = insights_of(&fix, Some(&econ));
        assert!(!titles(&insights).contains(&"Exploitable Buy Patterns"));
    }

    #[test]
    fn no_input_yields_no_insights() {
        let fix = fixture(Vec::new());
        assert!(insights_of(&fix, None).is_empty());
    }
}
