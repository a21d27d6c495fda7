// GRID e-sports API client over the platform's two GraphQL endpoints.
//
// Central Data serves titles, the team directory, and series listings;
// Series State serves per-game detail. Both take JSON POSTs authenticated
// with an `x-api-key` header. Responses are navigated with `serde_json::Value`
// and absent fields default to zero, since field shapes vary by title and
// data package.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Config, GridConfig};
use crate::telemetry::types::{MatchRecord, PlayerLine, SeriesSummary, TeamRef, Title};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failures surfaced by the telemetry layer.
///
/// `Clone` so a cached in-flight fetch can hand the same failure to every
/// waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    /// Upstream unreachable, timed out, or answering with server errors.
    #[error("telemetry source unavailable: {message}")]
    Unavailable { message: String },

    /// The response arrived but could not be understood.
    #[error("telemetry protocol error: {message}")]
    Protocol { message: String },

    /// No GRID API key is configured.
    #[error("GRID API key not configured")]
    MissingApiKey,
}

// ---------------------------------------------------------------------------
// TelemetryProvider trait
// ---------------------------------------------------------------------------

/// The engine's view of the upstream data platform.
///
/// `recent_series` and `series_matches` are separate calls so the cache layer
/// can hold series listings and per-series detail under different TTLs.
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Game titles known to the platform.
    async fn list_titles(&self) -> Result<Vec<Title>, TelemetryError>;

    /// Teams whose name contains `query`, optionally restricted to a title.
    async fn search_teams(
        &self,
        query: &str,
        title: Option<&str>,
    ) -> Result<Vec<TeamRef>, TelemetryError>;

    /// Look up one team by id. `None` when the id is unknown upstream.
    async fn team_by_id(&self, team_id: &str) -> Result<Option<TeamRef>, TelemetryError>;

    /// The team's most recent series, newest first.
    async fn recent_series(
        &self,
        team_id: &str,
        limit: u32,
    ) -> Result<Vec<SeriesSummary>, TelemetryError>;

    /// Per-map match records for one series, from `team_id`'s perspective.
    /// Empty when the platform has no detail for the series.
    async fn series_matches(
        &self,
        team_id: &str,
        series: &SeriesSummary,
    ) -> Result<Vec<MatchRecord>, TelemetryError>;
}

// ---------------------------------------------------------------------------
// GraphQL queries
// ---------------------------------------------------------------------------

const TITLES_QUERY: &str = r#"
query GetTitles {
    titles {
        edges {
            node {
                id
                name
            }
        }
    }
}
"#;

const SEARCH_TEAMS_QUERY: &str = r#"
query SearchTeams($filter: TeamFilter, $first: Int) {
    teams(filter: $filter, first: $first) {
        edges {
            node {
                id
                name
            }
        }
    }
}
"#;

const TEAM_QUERY: &str = r#"
query GetTeam($id: ID!) {
    team(id: $id) {
        id
        name
    }
}
"#;

const TEAM_SERIES_QUERY: &str = r#"
query GetTeamSeries($filter: SeriesFilter, $first: Int) {
    allSeries(filter: $filter, first: $first) {
        edges {
            node {
                id
                startTimeScheduled
                format {
                    name
                }
                tournament {
                    name
                }
                teams {
                    baseInfo {
                        id
                        name
                    }
                }
            }
        }
    }
}
"#;

const SERIES_STATE_QUERY: &str = r#"
query GetSeriesState($id: ID!) {
    seriesState(id: $id) {
        id
        finished
        games {
            id
            sequenceNumber
            map {
                name
            }
            teams {
                id
                name
                score
                won
                players {
                    id
                    name
                    character {
                        name
                    }
                }
            }
        }
    }
}
"#;

/// Page size for team searches.
const SEARCH_PAGE_SIZE: u32 = 20;

// ---------------------------------------------------------------------------
// GridClient
// ---------------------------------------------------------------------------

/// Low-level GRID GraphQL client.
pub struct GridClient {
    http: reqwest::Client,
    api_key: String,
    central_data_url: String,
    series_state_url: String,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl GridClient {
    /// Create a new client with the given API key and endpoint settings.
    pub fn new(api_key: String, grid: &GridConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            central_data_url: grid.central_data_url.clone(),
            series_state_url: grid.series_state_url.clone(),
            timeout: Duration::from_secs(grid.timeout_secs),
            max_retries: grid.max_retries.max(1),
            retry_base_delay: Duration::from_millis(grid.retry_base_delay_ms),
        }
    }

    /// Execute one GraphQL query, retrying `Unavailable` failures with a
    /// doubling delay up to `max_retries` total attempts. Protocol errors are
    /// never retried.
    async fn post_graphql(
        &self,
        url: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, TelemetryError> {
        let payload = serde_json::json!({ "query": query, "variables": variables });
        let mut delay = self.retry_base_delay;
        let mut attempt = 1;
        loop {
            match self.execute_once(url, &payload).await {
                Ok(data) => return Ok(data),
                Err(TelemetryError::Unavailable { message }) if attempt < self.max_retries => {
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        %message,
                        "telemetry request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn execute_once(&self, url: &str, payload: &Value) -> Result<Value, TelemetryError> {
        let response = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| TelemetryError::Unavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TelemetryError::Unavailable {
                message: format!("upstream returned status {status}"),
            });
        }
        if !status.is_success() {
            return Err(TelemetryError::Protocol {
                message: format!("upstream returned status {status}"),
            });
        }

        let body: Value = response.json().await.map_err(|e| TelemetryError::Protocol {
            message: format!("invalid JSON response: {e}"),
        })?;

        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let first = errors[0]
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown GraphQL error");
                let has_data = body
                    .get("data")
                    .and_then(Value::as_object)
                    .is_some_and(|d| !d.is_empty());
                if has_data {
                    // Partial data is still usable.
                    warn!(error = %first, "GraphQL reported errors alongside partial data");
                } else {
                    return Err(TelemetryError::Protocol {
                        message: format!("GraphQL error: {first}"),
                    });
                }
            }
        }

        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl TelemetryProvider for GridClient {
    async fn list_titles(&self) -> Result<Vec<Title>, TelemetryError> {
        let data = self
            .post_graphql(&self.central_data_url, TITLES_QUERY, Value::Null)
            .await?;
        let titles = parse_titles(&data);
        debug!(count = titles.len(), "fetched title list");
        Ok(titles)
    }

    async fn search_teams(
        &self,
        query: &str,
        title: Option<&str>,
    ) -> Result<Vec<TeamRef>, TelemetryError> {
        let mut filter = serde_json::json!({ "name": { "contains": query } });
        if let Some(title_id) = title {
            filter["titleId"] = Value::String(title_id.to_string());
        }
        let variables = serde_json::json!({ "filter": filter, "first": SEARCH_PAGE_SIZE });
        let data = self
            .post_graphql(&self.central_data_url, SEARCH_TEAMS_QUERY, variables)
            .await?;
        let teams = parse_teams(&data);
        debug!(query, count = teams.len(), "team search complete");
        Ok(teams)
    }

    async fn team_by_id(&self, team_id: &str) -> Result<Option<TeamRef>, TelemetryError> {
        let variables = serde_json::json!({ "id": team_id });
        let data = self
            .post_graphql(&self.central_data_url, TEAM_QUERY, variables)
            .await?;
        Ok(parse_team(&data))
    }

    async fn recent_series(
        &self,
        team_id: &str,
        limit: u32,
    ) -> Result<Vec<SeriesSummary>, TelemetryError> {
        let variables = serde_json::json!({
            "filter": {
                "teamIds": { "in": [team_id] },
                "type": "ESPORTS"
            },
            "first": limit
        });
        let data = self
            .post_graphql(&self.central_data_url, TEAM_SERIES_QUERY, variables)
            .await?;
        let series = parse_series_summaries(&data);
        debug!(team_id, count = series.len(), "fetched recent series");
        Ok(series)
    }

    async fn series_matches(
        &self,
        team_id: &str,
        series: &SeriesSummary,
    ) -> Result<Vec<MatchRecord>, TelemetryError> {
        let variables = serde_json::json!({ "id": series.id });
        let data = self
            .post_graphql(&self.series_state_url, SERIES_STATE_QUERY, variables)
            .await?;
        match data.get("seriesState") {
            Some(state) if !state.is_null() => Ok(parse_series_matches(team_id, series, state)),
            _ => {
                warn!(series_id = %series.id, "no series state available");
                Ok(Vec::new())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Iterate the nodes of a Relay-style connection field.
///
/// Expected shape: `{ "<field>": { "edges": [ { "node": {...} }, ... ] } }`
fn edges<'a>(data: &'a Value, field: &str) -> impl Iterator<Item = &'a Value> {
    data.get(field)
        .and_then(|v| v.get("edges"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|edge| edge.get("node"))
}

pub(crate) fn parse_titles(data: &Value) -> Vec<Title> {
    edges(data, "titles")
        .filter_map(|node| {
            Some(Title {
                id: node.get("id")?.as_str()?.to_string(),
                name: node.get("name")?.as_str()?.to_string(),
            })
        })
        .collect()
}

pub(crate) fn parse_teams(data: &Value) -> Vec<TeamRef> {
    edges(data, "teams")
        .filter_map(|node| {
            Some(TeamRef {
                id: node.get("id")?.as_str()?.to_string(),
                name: node.get("name")?.as_str()?.to_string(),
            })
        })
        .collect()
}

pub(crate) fn parse_team(data: &Value) -> Option<TeamRef> {
    let team = data.get("team")?;
    Some(TeamRef {
        id: team.get("id")?.as_str()?.to_string(),
        name: team.get("name")?.as_str()?.to_string(),
    })
}

/// Expected node shape: `{ "id", "startTimeScheduled", "tournament": {"name"},
/// "teams": [ { "baseInfo": { "id", "name" } } ] }`. Nodes without an id are
/// dropped.
pub(crate) fn parse_series_summaries(data: &Value) -> Vec<SeriesSummary> {
    edges(data, "allSeries")
        .filter_map(|node| {
            let id = node.get("id")?.as_str()?.to_string();
            let start_time = node
                .get("startTimeScheduled")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let tournament = node
                .get("tournament")
                .and_then(|t| t.get("name"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            let teams = node
                .get("teams")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|t| {
                    let base = t.get("baseInfo")?;
                    Some(TeamRef {
                        id: base.get("id")?.as_str()?.to_string(),
                        name: base
                            .get("name")
                            .and_then(Value::as_str)
                            .unwrap_or("")
                            .to_string(),
                    })
                })
                .collect();
            Some(SeriesSummary {
                id,
                start_time,
                tournament,
                teams,
            })
        })
        .collect()
}

/// Build one `MatchRecord` per game in a series state, from `team_id`'s
/// perspective. Games where the subject team does not appear yield records
/// with zeroed scores rather than being dropped.
pub(crate) fn parse_series_matches(
    team_id: &str,
    series: &SeriesSummary,
    state: &Value,
) -> Vec<MatchRecord> {
    let Some(games) = state.get("games").and_then(Value::as_array) else {
        return Vec::new();
    };

    let subject = series.teams.iter().find(|t| t.id == team_id);
    let opponent = series.teams.iter().find(|t| t.id != team_id);

    let mut matches = Vec::new();
    for game in games {
        let map_name = game
            .get("map")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown")
            .to_string();

        let mut team_score = 0;
        let mut opponent_score = 0;
        let mut won = false;
        let mut players = Vec::new();

        for game_team in game.get("teams").and_then(Value::as_array).into_iter().flatten() {
            let gt_id = game_team
                .get("id")
                .and_then(Value::as_str)
                .or_else(|| {
                    game_team
                        .get("baseInfo")
                        .and_then(|b| b.get("id"))
                        .and_then(Value::as_str)
                })
                .unwrap_or("");

            if gt_id == team_id {
                team_score = uint(game_team, "score");
                won = game_team
                    .get("won")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                if let Some(lines) = game_team.get("players").and_then(Value::as_array) {
                    players = lines.iter().map(parse_player_line).collect();
                }
            } else {
                opponent_score = uint(game_team, "score");
            }
        }

        matches.push(MatchRecord {
            series_id: series.id.clone(),
            match_date: series.start_time,
            map_name,
            team_id: team_id.to_string(),
            team_name: subject.map(|t| t.name.clone()).unwrap_or_default(),
            opponent_id: opponent.map(|t| t.id.clone()).unwrap_or_default(),
            opponent_name: opponent.map(|t| t.name.clone()).unwrap_or_default(),
            team_score,
            opponent_score,
            won,
            tournament: series.tournament.clone(),
            players,
            rounds: Vec::new(),
        });
    }
    matches
}

/// Parse one player's stat line, tolerating the schema variants GRID serves:
/// per-round stat rows (`statsByRound`), flat integer totals, and kill/death
/// event lists carrying first-blood and headshot flags.
pub(crate) fn parse_player_line(player: &Value) -> PlayerLine {
    let player_id = player
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let player_name = player
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let agent = player
        .get("character")
        .and_then(|c| c.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();

    let stats_by_round = player.get("statsByRound").and_then(Value::as_array);
    let (kills, deaths, assists, damage, combat_score, rounds) = match stats_by_round {
        Some(rows) if !rows.is_empty() => {
            let sum = |key: &str| -> u64 {
                rows.iter()
                    .map(|r| r.get(key).and_then(Value::as_u64).unwrap_or(0))
                    .sum()
            };
            (
                sum("kills") as u32,
                sum("deaths") as u32,
                sum("assists") as u32,
                sum("damage"),
                sum("combatScore"),
                rows.len() as u32,
            )
        }
        _ => (
            uint(player, "kills"),
            uint(player, "deaths"),
            uint(player, "assists"),
            0,
            0,
            1,
        ),
    };

    // Some data packages deliver kills/deaths as event lists instead of
    // totals; those carry the opening-duel flags.
    let kill_events = player.get("kills").and_then(Value::as_array);
    let death_events = player.get("deaths").and_then(Value::as_array);
    let first_bloods = count_flagged(kill_events, "isFirstBlood");
    let first_deaths = count_flagged(death_events, "isFirstDeath");
    let headshots = count_flagged(kill_events, "isHeadshot");

    let acs = combat_score as f64 / rounds.max(1) as f64;
    let adr = damage as f64 / rounds.max(1) as f64;
    let headshot_pct = if kills > 0 {
        headshots as f64 / kills as f64 * 100.0
    } else {
        0.0
    };

    PlayerLine {
        player_id,
        player_name,
        agent,
        kills,
        deaths,
        assists,
        acs,
        adr,
        first_bloods,
        first_deaths,
        plants: list_len(player, "plants"),
        defuses: list_len(player, "defuses"),
        headshot_pct,
    }
}

fn uint(value: &Value, key: &str) -> u32 {
    value.get(key).and_then(Value::as_u64).unwrap_or(0) as u32
}

fn count_flagged(events: Option<&Vec<Value>>, flag: &str) -> u32 {
    events
        .map(|list| {
            list.iter()
                .filter(|e| e.get(flag).and_then(Value::as_bool).unwrap_or(false))
                .count() as u32
        })
        .unwrap_or(0)
}

fn list_len(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|l| l.len() as u32)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// TelemetryClient wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that is either an active GRID client or disabled.
pub enum TelemetryClient {
    /// GRID API is configured and ready.
    Active(GridClient),
    /// Telemetry is disabled (no API key configured).
    Disabled,
}

impl TelemetryClient {
    /// Build a `TelemetryClient` from the application config.
    ///
    /// Returns `Active` if an API key is present in credentials, otherwise
    /// `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.grid_api_key {
            Some(key) if !key.is_empty() => {
                TelemetryClient::Active(GridClient::new(key.clone(), &config.grid))
            }
            _ => TelemetryClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TelemetryClient::Active(_))
    }

    fn active(&self) -> Result<&GridClient, TelemetryError> {
        match self {
            TelemetryClient::Active(client) => Ok(client),
            TelemetryClient::Disabled => Err(TelemetryError::MissingApiKey),
        }
    }
}

#[async_trait]
impl TelemetryProvider for TelemetryClient {
    async fn list_titles(&self) -> Result<Vec<Title>, TelemetryError> {
        self.active()?.list_titles().await
    }

    async fn search_teams(
        &self,
        query: &str,
        title: Option<&str>,
    ) -> Result<Vec<TeamRef>, TelemetryError> {
        self.active()?.search_teams(query, title).await
    }

    async fn team_by_id(&self, team_id: &str) -> Result<Option<TeamRef>, TelemetryError> {
        self.active()?.team_by_id(team_id).await
    }

    async fn recent_series(
        &self,
        team_id: &str,
        limit: u32,
    ) -> Result<Vec<SeriesSummary>, TelemetryError> {
        self.active()?.recent_series(team_id, limit).await
    }

    async fn series_matches(
        &self,
        team_id: &str,
        series: &SeriesSummary,
    ) -> Result<Vec<MatchRecord>, TelemetryError> {
        self.active()?.series_matches(team_id, series).await
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
