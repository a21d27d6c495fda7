// Application state and orchestration logic.
//
// ScoutApp sits between the HTTP layer and the telemetry provider: it owns
// the read-through caches, resolves team selectors, assembles match history
// across series, and drives the analysis engine to produce reports.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::analysis::compare::{map_advantages, veto_recommendation};
use crate::analysis::generate_scout_report;
use crate::analysis::maps::{fold_map_records, TeamMapRecord};
use crate::config::Config;
use crate::report::{AdvantageRow, ComparisonReport, ScoutReport};
use crate::telemetry::cache::TelemetryCache;
use crate::telemetry::grid::{TelemetryError, TelemetryProvider};
use crate::telemetry::types::{MatchRecord, SeriesSummary, TeamRef, Title};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScoutError {
    /// No team matched the selector, by id or by name.
    #[error("no team found matching `{query}`")]
    TeamNotFound { query: String },

    /// The team exists but has no match data to analyze.
    #[error("no recent match data for team {team_id}")]
    InsufficientData { team_id: String },

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// One half of a head-to-head comparison failed.
    #[error("failed to scout {side} team ({team_id}): {source}")]
    PartialComparison {
        side: &'static str,
        team_id: String,
        source: Box<ScoutError>,
    },
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// How a scout request names its subject.
#[derive(Debug, Clone)]
pub enum TeamSelector {
    ById(String),
    ByName(String),
}

// ---------------------------------------------------------------------------
// ScoutApp
// ---------------------------------------------------------------------------

/// Shared application state. One instance lives for the whole process and is
/// cloned into handlers behind an `Arc`.
pub struct ScoutApp {
    config: Config,
    provider: Arc<dyn TelemetryProvider>,
    titles_cache: TelemetryCache<Vec<Title>>,
    search_cache: TelemetryCache<Vec<TeamRef>>,
    team_cache: TelemetryCache<Option<TeamRef>>,
    series_cache: TelemetryCache<Vec<SeriesSummary>>,
    state_cache: TelemetryCache<Vec<MatchRecord>>,
}

impl ScoutApp {
    pub fn new(config: Config, provider: Arc<dyn TelemetryProvider>) -> Self {
        let team_ttl = Duration::from_secs(config.cache.team_ttl_secs);
        let series_ttl = Duration::from_secs(config.cache.series_list_ttl_secs);
        let state_ttl = Duration::from_secs(config.cache.series_state_ttl_secs);
        Self {
            provider,
            titles_cache: TelemetryCache::new(team_ttl),
            search_cache: TelemetryCache::new(team_ttl),
            team_cache: TelemetryCache::new(team_ttl),
            series_cache: TelemetryCache::new(series_ttl),
            state_cache: TelemetryCache::new(state_ttl),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Cached telemetry lookups
    // -----------------------------------------------------------------------

    pub async fn titles(&self) -> Result<Vec<Title>, TelemetryError> {
        self.titles_cache
            .get_or_fetch("titles", || self.provider.list_titles())
            .await
    }

    pub async fn search_teams(
        &self,
        query: &str,
        title: Option<&str>,
    ) -> Result<Vec<TeamRef>, TelemetryError> {
        let key = format!(
            "search:{}:{}",
            query.to_lowercase(),
            title.unwrap_or("all")
        );
        self.search_cache
            .get_or_fetch(&key, || self.provider.search_teams(query, title))
            .await
    }

    pub async fn team(&self, team_id: &str) -> Result<Option<TeamRef>, TelemetryError> {
        let key = format!("team:{team_id}");
        self.team_cache
            .get_or_fetch(&key, || self.provider.team_by_id(team_id))
            .await
    }

    /// Match records for the team's most recent series, newest first.
    ///
    /// Each series' detail is cached under its own key so two teams sharing a
    /// series never see each other's perspective. A series whose detail fetch
    /// fails is skipped; the error only surfaces when nothing at all loaded.
    pub async fn team_matches(
        &self,
        team_id: &str,
        limit: u32,
    ) -> Result<Vec<MatchRecord>, TelemetryError> {
        let series_key = format!("series:{team_id}:{limit}");
        let series = self
            .series_cache
            .get_or_fetch(&series_key, || self.provider.recent_series(team_id, limit))
            .await?;

        let mut matches = Vec::new();
        let mut last_error = None;
        for summary in &series {
            let state_key = format!("state:{}:{}", summary.id, team_id);
            let fetched = self
                .state_cache
                .get_or_fetch(&state_key, || self.provider.series_matches(team_id, summary))
                .await;
            match fetched {
                Ok(records) => matches.extend(records),
                Err(e) => {
                    warn!(series_id = %summary.id, error = %e, "skipping series after fetch failure");
                    last_error = Some(e);
                }
            }
        }

        if matches.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }
        Ok(matches)
    }

    // -----------------------------------------------------------------------
    // Reports
    // -----------------------------------------------------------------------

    /// Scout one team. With `our_team_id` the veto section is framed
    /// head-to-head against our own map records instead of self-scout.
    pub async fn scout(
        &self,
        selector: &TeamSelector,
        match_count: u32,
        our_team_id: Option<&str>,
    ) -> Result<ScoutReport, ScoutError> {
        let team = self.resolve_team(selector).await?;
        let matches = self.team_matches(&team.id, match_count).await?;
        if matches.is_empty() {
            return Err(ScoutError::InsufficientData { team_id: team.id });
        }

        let our_maps = match our_team_id {
            Some(our_id) => {
                let ours = self.team_matches(our_id, match_count).await?;
                Some(fold_map_records(&ours))
            }
            None => None,
        };

        info!(
            team = %team.name,
            matches = matches.len(),
            head_to_head = our_maps.is_some(),
            "building scout report"
        );
        Ok(generate_scout_report(
            &team,
            &matches,
            our_maps.as_deref(),
            &self.config.analysis,
        ))
    }

    /// Scout both teams concurrently and call the per-map edges.
    pub async fn compare(
        &self,
        your_team_id: &str,
        opponent_team_id: &str,
        match_count: u32,
    ) -> Result<ComparisonReport, ScoutError> {
        let (yours, theirs) = tokio::join!(
            self.scout_with_maps(your_team_id, match_count),
            self.scout_with_maps(opponent_team_id, match_count),
        );

        let (your_report, your_maps) = yours.map_err(|e| side_failure("your", your_team_id, e))?;
        let (opponent_report, opponent_maps) =
            theirs.map_err(|e| side_failure("opponent", opponent_team_id, e))?;

        let advantages = map_advantages(
            &your_maps,
            &opponent_maps,
            self.config.analysis.advantage_threshold,
        );
        let recommendation =
            veto_recommendation(&advantages, &opponent_report.summary.primary_threat);

        info!(
            your_team = %your_report.team_name,
            opponent = %opponent_report.team_name,
            maps_compared = advantages.len(),
            "built comparison"
        );
        Ok(ComparisonReport {
            your_team: your_report,
            opponent: opponent_report,
            map_advantages: advantages.iter().map(AdvantageRow::from).collect(),
            recommendation,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn resolve_team(&self, selector: &TeamSelector) -> Result<TeamRef, ScoutError> {
        match selector {
            TeamSelector::ById(id) => match self.team(id).await? {
                Some(team) => Ok(team),
                None => Err(ScoutError::TeamNotFound { query: id.clone() }),
            },
            TeamSelector::ByName(name) => {
                let hits = self.search_teams(name, None).await?;
                hits.into_iter()
                    .next()
                    .ok_or_else(|| ScoutError::TeamNotFound {
                        query: name.clone(),
                    })
            }
        }
    }

    async fn scout_with_maps(
        &self,
        team_id: &str,
        match_count: u32,
    ) -> Result<(ScoutReport, Vec<TeamMapRecord>), ScoutError> {
        let team = self
            .resolve_team(&TeamSelector::ById(team_id.to_string()))
            .await?;
        let matches = self.team_matches(&team.id, match_count).await?;
        if matches.is_empty() {
            return Err(ScoutError::InsufficientData { team_id: team.id });
        }
        let maps = fold_map_records(&matches);
        let report = generate_scout_report(&team, &matches, None, &self.config.analysis);
        Ok((report, maps))
    }
}

/// Tag a comparison half's failure with its side. A missing team passes
/// through untouched so the API can give it the usual 404 treatment.
fn side_failure(side: &'static str, team_id: &str, err: ScoutError) -> ScoutError {
    match err {
        ScoutError::TeamNotFound { .. } => err,
        other => ScoutError::PartialComparison {
            side,
            team_id: team_id.to_string(),
            source: Box::new(other),
        },
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::{BTreeSet, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::{
        AnalysisConfig, CacheConfig, CredentialsConfig, GridConfig, ServerConfig,
    };
    use crate::telemetry::types::PlayerLine;

    // ------------------------------------------------------------------
    // Scripted provider
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct ScriptedTelemetry {
        teams: Vec<TeamRef>,
        series: HashMap<String, Vec<SeriesSummary>>,
        matches: HashMap<String, Vec<MatchRecord>>,
        failing_series: BTreeSet<String>,
        series_calls: AtomicUsize,
        state_calls: AtomicUsize,
    }

    #[async_trait]
    impl TelemetryProvider for ScriptedTelemetry {
        async fn list_titles(&self) -> Result<Vec<Title>, TelemetryError> {
            Ok(vec![Title {
                id: "3".into(),
                name: "valorant".into(),
            }])
        }

        async fn search_teams(
            &self,
            query: &str,
            _title: Option<&str>,
        ) -> Result<Vec<TeamRef>, TelemetryError> {
            let needle = query.to_lowercase();
            Ok(self
                .teams
                .iter()
                .filter(|t| t.name.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        }

        async fn team_by_id(&self, team_id: &str) -> Result<Option<TeamRef>, TelemetryError> {
            Ok(self.teams.iter().find(|t| t.id == team_id).cloned())
        }

        async fn recent_series(
            &self,
            team_id: &str,
            limit: u32,
        ) -> Result<Vec<SeriesSummary>, TelemetryError> {
            self.series_calls.fetch_add(1, Ordering::SeqCst);
            let mut series = self.series.get(team_id).cloned().unwrap_or_default();
            series.truncate(limit as usize);
            Ok(series)
        }

        async fn series_matches(
            &self,
            team_id: &str,
            series: &SeriesSummary,
        ) -> Result<Vec<MatchRecord>, TelemetryError> {
            self.state_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_series.contains(&series.id) {
                return Err(TelemetryError::Unavailable {
                    message: format!("series {} timed out", series.id),
                });
            }
            Ok(self
                .matches
                .get(&series.id)
                .map(|records| {
                    records
                        .iter()
                        .filter(|m| m.team_id == team_id)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8000,
            },
            grid: GridConfig {
                central_data_url: "http://127.0.0.1:9/central".into(),
                series_state_url: "http://127.0.0.1:9/state".into(),
                timeout_secs: 5,
                max_retries: 1,
                retry_base_delay_ms: 10,
            },
            cache: CacheConfig {
                team_ttl_secs: 3600,
                series_list_ttl_secs: 3600,
                series_state_ttl_secs: 3600,
            },
            analysis: AnalysisConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }

    fn team(id: &str, name: &str) -> TeamRef {
        TeamRef {
            id: id.into(),
            name: name.into(),
        }
    }

    fn summary(id: &str, team_ids: &[&str]) -> SeriesSummary {
        SeriesSummary {
            id: id.into(),
            start_time: Some(Utc.with_ymd_and_hms(2025, 2, 10, 17, 0, 0).unwrap()),
            tournament: "VCT".into(),
            teams: team_ids
                .iter()
                .map(|id| team(id, &format!("Team {id}")))
                .collect(),
        }
    }

    fn line(name: &str, agent: &str, kills: u32, deaths: u32) -> PlayerLine {
        PlayerLine {
            player_id: format!("id-{name}"),
            player_name: name.into(),
            agent: agent.into(),
            kills,
            deaths,
            assists: 4,
            acs: 200.0,
            adr: 140.0,
            first_bloods: 2,
            first_deaths: 1,
            plants: 1,
            defuses: 0,
            headshot_pct: 22.0,
        }
    }

    fn match_record(series_id: &str, team_id: &str, map: &str, won: bool) -> MatchRecord {
        let (ts, os) = if won { (13, 9) } else { (9, 13) };
        MatchRecord {
            series_id: series_id.into(),
            match_date: Some(Utc.with_ymd_and_hms(2025, 2, 10, 17, 0, 0).unwrap()),
            map_name: map.into(),
            team_id: team_id.into(),
            team_name: format!("Team {team_id}"),
            opponent_id: "opp".into(),
            opponent_name: "Opponents".into(),
            team_score: ts,
            opponent_score: os,
            won,
            tournament: "VCT".into(),
            players: vec![
                line("ace", "Jett", 22, 14),
                line("beam", "Sova", 15, 13),
                line("cloud", "Omen", 13, 15),
            ],
            rounds: Vec::new(),
        }
    }

    fn app_with(provider: ScriptedTelemetry) -> ScoutApp {
        ScoutApp::new(test_config(), Arc::new(provider))
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn scout_by_name_resolves_the_first_hit() {
        let provider = ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels"), team("t2", "Sentinels Academy")],
            series: HashMap::from([("t1".to_string(), vec![summary("s1", &["t1", "opp"])])]),
            matches: HashMap::from([(
                "s1".to_string(),
                vec![match_record("s1", "t1", "Ascent", true)],
            )]),
            ..Default::default()
        };
        let app = app_with(provider);

        let report = app
            .scout(&TeamSelector::ByName("sentinels".into()), 10, None)
            .await
            .expect("should scout by name");
        assert_eq!(report.team_id, "t1");
        assert_eq!(report.team_name, "Sentinels");
        assert_eq!(report.matches_analyzed, 1);
    }

    #[tokio::test]
    async fn unknown_selector_is_team_not_found() {
        let app = app_with(ScriptedTelemetry::default());

        let by_id = app
            .scout(&TeamSelector::ById("ghost".into()), 10, None)
            .await
            .unwrap_err();
        match &by_id {
            ScoutError::TeamNotFound { query } => assert_eq!(query, "ghost"),
            other => panic!("expected TeamNotFound, got: {other}"),
        }

        let by_name = app
            .scout(&TeamSelector::ByName("nobody".into()), 10, None)
            .await
            .unwrap_err();
        assert!(matches!(by_name, ScoutError::TeamNotFound { .. }));
    }

    #[tokio::test]
    async fn zero_matches_is_insufficient_data() {
        let provider = ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels")],
            ..Default::default()
        };
        let app = app_with(provider);

        let err = app
            .scout(&TeamSelector::ById("t1".into()), 10, None)
            .await
            .unwrap_err();
        match &err {
            ScoutError::InsufficientData { team_id } => assert_eq!(team_id, "t1"),
            other => panic!("expected InsufficientData, got: {other}"),
        }
    }

    #[tokio::test]
    async fn failed_series_detail_is_skipped() {
        let provider = ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels")],
            series: HashMap::from([(
                "t1".to_string(),
                vec![summary("s1", &["t1", "opp"]), summary("s2", &["t1", "opp"])],
            )]),
            matches: HashMap::from([(
                "s1".to_string(),
                vec![match_record("s1", "t1", "Ascent", true)],
            )]),
            failing_series: BTreeSet::from(["s2".to_string()]),
            ..Default::default()
        };
        let app = app_with(provider);

        let matches = app.team_matches("t1", 10).await.expect("partial data should load");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].series_id, "s1");
    }

    #[tokio::test]
    async fn all_series_failing_surfaces_the_error() {
        let provider = ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels")],
            series: HashMap::from([("t1".to_string(), vec![summary("s1", &["t1", "opp"])])]),
            failing_series: BTreeSet::from(["s1".to_string()]),
            ..Default::default()
        };
        let app = app_with(provider);

        let err = app.team_matches("t1", 10).await.unwrap_err();
        match &err {
            TelemetryError::Unavailable { message } => {
                assert!(message.contains("s1"));
            }
            other => panic!("expected Unavailable, got: {other}"),
        }
    }

    #[tokio::test]
    async fn repeat_scouts_reuse_cached_telemetry() {
        let provider = Arc::new(ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels")],
            series: HashMap::from([(
                "t1".to_string(),
                vec![summary("s1", &["t1", "opp"]), summary("s2", &["t1", "opp"])],
            )]),
            matches: HashMap::from([
                (
                    "s1".to_string(),
                    vec![match_record("s1", "t1", "Ascent", true)],
                ),
                (
                    "s2".to_string(),
                    vec![match_record("s2", "t1", "Bind", false)],
                ),
            ]),
            ..Default::default()
        });
        let app = ScoutApp::new(test_config(), provider.clone());

        let selector = TeamSelector::ById("t1".into());
        app.scout(&selector, 10, None).await.expect("first scout");
        app.scout(&selector, 10, None).await.expect("second scout");

        assert_eq!(provider.series_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.state_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn compare_names_the_failing_side() {
        let provider = ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels"), team("t2", "Fnatic")],
            series: HashMap::from([
                ("t1".to_string(), vec![summary("s1", &["t1", "t2"])]),
                ("t2".to_string(), vec![summary("s2", &["t2", "x"])]),
            ]),
            matches: HashMap::from([(
                "s1".to_string(),
                vec![match_record("s1", "t1", "Ascent", true)],
            )]),
            failing_series: BTreeSet::from(["s2".to_string()]),
            ..Default::default()
        };
        let app = app_with(provider);

        let err = app.compare("t1", "t2", 10).await.unwrap_err();
        match &err {
            ScoutError::PartialComparison { side, team_id, source } => {
                assert_eq!(*side, "opponent");
                assert_eq!(team_id, "t2");
                assert!(matches!(
                    source.as_ref(),
                    ScoutError::Telemetry(TelemetryError::Unavailable { .. })
                ));
            }
            other => panic!("expected PartialComparison, got: {other}"),
        }
    }

    #[tokio::test]
    async fn compare_missing_team_stays_a_plain_not_found() {
        let provider = ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels")],
            series: HashMap::from([("t1".to_string(), vec![summary("s1", &["t1", "x"])])]),
            matches: HashMap::from([(
                "s1".to_string(),
                vec![match_record("s1", "t1", "Ascent", true)],
            )]),
            ..Default::default()
        };
        let app = app_with(provider);

        let err = app.compare("t1", "ghost", 10).await.unwrap_err();
        assert!(matches!(err, ScoutError::TeamNotFound { .. }));
    }

    #[tokio::test]
    async fn compare_calls_edges_and_names_the_threat() {
        let provider = ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels"), team("t2", "Fnatic")],
            series: HashMap::from([
                ("t1".to_string(), vec![summary("s1", &["t1", "t2"])]),
                ("t2".to_string(), vec![summary("s2", &["t2", "x"])]),
            ]),
            matches: HashMap::from([
                (
                    "s1".to_string(),
                    vec![
                        match_record("s1", "t1", "Ascent", true),
                        match_record("s1", "t1", "Haven", true),
                    ],
                ),
                (
                    "s2".to_string(),
                    vec![
                        match_record("s2", "t2", "Ascent", false),
                        match_record("s2", "t2", "Bind", true),
                    ],
                ),
            ]),
            ..Default::default()
        };
        let app = app_with(provider);

        let comparison = app.compare("t1", "t2", 10).await.expect("compare should work");
        assert_eq!(comparison.your_team.team_id, "t1");
        assert_eq!(comparison.opponent.team_id, "t2");
        // Ascent, Bind, and Haven all show up for at least one side.
        assert_eq!(comparison.map_advantages.len(), 3);
        assert!(comparison
            .recommendation
            .contains("Key threat to neutralize:"));
    }

    #[tokio::test]
    async fn head_to_head_scout_pulls_our_matches_too() {
        let provider = ScriptedTelemetry {
            teams: vec![team("t1", "Sentinels"), team("us", "Our Team")],
            series: HashMap::from([
                ("t1".to_string(), vec![summary("s1", &["t1", "us"])]),
                ("us".to_string(), vec![summary("s2", &["us", "x"])]),
            ]),
            matches: HashMap::from([
                (
                    "s1".to_string(),
                    vec![match_record("s1", "t1", "Ascent", true)],
                ),
                (
                    "s2".to_string(),
                    vec![match_record("s2", "us", "Ascent", false)],
                ),
            ]),
            ..Default::default()
        };
        let app = app_with(provider);

        let report = app
            .scout(&TeamSelector::ById("t1".into()), 10, Some("us"))
            .await
            .expect("head-to-head scout should work");
        let ascent = report
            .veto_recommendations
            .iter()
            .find(|v| v.map_name == "Ascent")
            .expect("Ascent should be scored");
        // Head-to-head framing fills in our side of the ledger.
        assert!(ascent.our_win_rate < 100.0);
        assert_eq!(ascent.their_win_rate, 100.0);
    }
}
