// Per-player aggregation across a set of match records.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::telemetry::types::MatchRecord;

/// Accumulated performance of one player across the analyzed matches.
///
/// Rate accessors guard against empty denominators so a player with a single
/// sparse stat line still produces finite numbers.
#[derive(Debug, Clone)]
pub struct PlayerAggregate {
    pub player_id: String,
    pub name: String,
    pub games: u32,
    pub kills: u32,
    pub deaths: u32,
    pub first_bloods: u32,
    pub first_deaths: u32,
    pub plants: u32,
    pub defuses: u32,
    /// Total rounds in the matches this player appeared in.
    pub rounds_observed: u32,
    /// ACS of each individual game, in match order. Kept per game so
    /// consistency can be measured as variance rather than just an average.
    pub acs_per_game: Vec<f64>,
    /// Times each agent was picked, keyed by agent name.
    pub agents: BTreeMap<String, u32>,
}

impl PlayerAggregate {
    pub fn avg_acs(&self) -> f64 {
        if self.acs_per_game.is_empty() {
            return 0.0;
        }
        self.acs_per_game.iter().sum::<f64>() / self.acs_per_game.len() as f64
    }

    pub fn avg_kd(&self) -> f64 {
        self.kills as f64 / self.deaths.max(1) as f64
    }

    /// Share of opening duels won: first bloods over all openings involved in.
    pub fn first_blood_rate(&self) -> f64 {
        let duels = self.first_bloods + self.first_deaths;
        if duels == 0 {
            return 0.0;
        }
        self.first_bloods as f64 / duels as f64
    }

    /// How often this player is part of the opening duel at all, per round.
    pub fn entry_rate(&self) -> f64 {
        (self.first_bloods + self.first_deaths) as f64 / self.rounds_observed.max(1) as f64
    }

    pub fn objective_actions_per_game(&self) -> f64 {
        (self.plants + self.defuses) as f64 / self.games.max(1) as f64
    }

    pub fn distinct_agents(&self) -> usize {
        self.agents.len()
    }

    /// Most-picked agents, count descending then name, at most `n`.
    pub fn top_agents(&self, n: usize) -> Vec<String> {
        let mut picks: Vec<(&String, &u32)> = self.agents.iter().collect();
        picks.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        picks.into_iter().take(n).map(|(agent, _)| agent.clone()).collect()
    }

    /// Every agent this player has picked, most-played first.
    pub fn agent_pool(&self) -> Vec<String> {
        self.top_agents(self.agents.len())
    }
}

/// Fold match records into one aggregate per player, keyed by player id
/// (player name when the feed carries no id).
///
/// Output is sorted by average ACS descending, then name, so downstream
/// consumers see a stable roster order for identical input.
pub fn fold_player_aggregates(matches: &[MatchRecord]) -> Vec<PlayerAggregate> {
    let mut by_player: BTreeMap<String, PlayerAggregate> = BTreeMap::new();

    for m in matches {
        let match_rounds = m.total_rounds();
        for line in &m.players {
            let key = if line.player_id.is_empty() {
                line.player_name.clone()
            } else {
                line.player_id.clone()
            };
            let agg = by_player
                .entry(key)
                .or_insert_with(|| PlayerAggregate {
                    player_id: line.player_id.clone(),
                    name: line.player_name.clone(),
                    games: 0,
                    kills: 0,
                    deaths: 0,
                    first_bloods: 0,
                    first_deaths: 0,
                    plants: 0,
                    defuses: 0,
                    rounds_observed: 0,
                    acs_per_game: Vec::new(),
                    agents: BTreeMap::new(),
                });

            agg.games += 1;
            agg.kills += line.kills;
            agg.deaths += line.deaths;
            agg.first_bloods += line.first_bloods;
            agg.first_deaths += line.first_deaths;
            agg.plants += line.plants;
            agg.defuses += line.defuses;
            agg.rounds_observed += match_rounds;
            agg.acs_per_game.push(line.acs);
            if !line.agent.is_empty() {
                *agg.agents.entry(line.agent.clone()).or_insert(0) += 1;
            }
        }
    }

    let mut aggregates: Vec<PlayerAggregate> = by_player.into_values().collect();
    aggregates.sort_by(|a, b| {
        b.avg_acs()
            .partial_cmp(&a.avg_acs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    aggregates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::types::PlayerLine;

    fn line(id: &str, name: &str, agent: &str, acs: f64, fb: u32, fd: u32) -> PlayerLine {
        PlayerLine {
            player_id: id.into(),
            player_name: name.into(),
            agent: agent.into(),
            kills: 15,
            deaths: 10,
            assists: 5,
            acs,
            adr: 140.0,
            first_bloods: fb,
            first_deaths: fd,
            plants: 1,
            defuses: 0,
            headshot_pct: 25.0,
        }
    }

    fn match_with(players: Vec<PlayerLine>, score: (u32, u32)) -> MatchRecord {
        MatchRecord {
            series_id: "s1".into(),
            match_date: None,
            map_name: "Ascent".into(),
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

    #[test]
    fn folds_across_matches_by_player_id() {
        let matches = vec![
            match_with(vec![line("p1", "ace", "Jett", 250.0, 4, 1)], (13, 7)),
            match_with(vec![line("p1", "ace", "Raze", 210.0, 2, 2)], (13, 10)),
        ];
        let aggs = fold_player_aggregates(&matches);
        assert_eq!(aggs.len(), 1);

        let ace = &aggs[0];
        assert_eq!(ace.games, 2);
        assert_eq!(ace.kills, 30);
        assert_eq!(ace.first_bloods, 6);
        assert_eq!(ace.rounds_observed, 43);
        assert!((ace.avg_acs() - 230.0).abs() < 1e-9);
        assert_eq!(ace.agents.len(), 2);
        assert_eq!(ace.agents["Jett"], 1);
    }

    #[test]
    fn entry_rate_uses_rounds_observed() {
        // 5 openings over 20 rounds.
        let matches = vec![match_with(vec![line("p1", "ace", "Jett", 250.0, 4, 1)], (13, 7))];
        let aggs = fold_player_aggregates(&matches);
        assert!((aggs[0].entry_rate() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn output_sorted_by_avg_acs_then_name() {
        let matches = vec![match_with(
            vec![
                line("p1", "beta", "Omen", 180.0, 0, 1),
                line("p2", "alpha", "Jett", 260.0, 3, 1),
                line("p3", "gamma", "Sova", 180.0, 1, 1),
            ],
            (13, 7),
        )];
        let aggs = fold_player_aggregates(&matches);
        assert_eq!(aggs[0].name, "alpha");
        // beta and gamma tie at 180 ACS, name breaks the tie.
        assert_eq!(aggs[1].name, "beta");
        assert_eq!(aggs[2].name, "gamma");
    }

    #[test]
    fn top_agents_orders_by_pick_count() {
        let matches = vec![
            match_with(vec![line("p1", "ace", "Jett", 250.0, 0, 0)], (13, 7)),
            match_with(vec![line("p1", "ace", "Jett", 250.0, 0, 0)], (13, 7)),
            match_with(vec![line("p1", "ace", "Raze", 250.0, 0, 0)], (13, 7)),
            match_with(vec![line("p1", "ace", "Omen", 250.0, 0, 0)], (13, 7)),
        ];
        let aggs = fold_player_aggregates(&matches);
        let top = aggs[0].top_agents(3);
        assert_eq!(top[0], "Jett");
        // Omen and Raze tie at one pick each, alphabetical.
        assert_eq!(top[1], "Omen");
        assert_eq!(top[2], "Raze");
    }

    #[test]
    fn empty_agent_names_are_not_counted() {
        let matches = vec![match_with(vec![line("p1", "ace", "", 250.0, 0, 0)], (13, 7))];
        let aggs = fold_player_aggregates(&matches);
        assert_eq!(aggs[0].distinct_agents(), 0);
    }

    #[test]
    fn players_without_ids_fold_by_name() {
        let matches = vec![match_with(
            vec![
                line("", "ace", "Jett", 260.0, 2, 1),
                line("", "beam", "Sova", 200.0, 1, 2),
            ],
            (13, 7),
        )];
        let aggs = fold_player_aggregates(&matches);
        assert_eq!(aggs.len(), 2);
        assert_eq!(aggs[0].name, "ace");
        assert_eq!(aggs[1].name, "beam");
    }

    #[test]
    fn empty_input_yields_empty_roster() {
        assert!(fold_player_aggregates(&[]).is_empty());
    }
}
