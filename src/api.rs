// HTTP surface: axum router, request/response shapes, and error mapping.
//
// Handlers stay thin. Everything interesting happens in ScoutApp; this module
// translates selectors in and ScoutError out, holding the error body contract
// (`{error, code}` plus `details` for internal failures) stable for the
// front end.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::app::{ScoutApp, ScoutError, TeamSelector};
use crate::report::{ComparisonReport, MatchRow, ScoutReport};
use crate::telemetry::grid::TelemetryError;
use crate::telemetry::types::TeamRef;

/// Matches analyzed per team when the request does not say.
const DEFAULT_MATCH_COUNT: u32 = 10;

/// Hard cap on matches per team, keeping worst-case upstream fan-out bounded.
const MAX_MATCH_COUNT: u32 = 20;

// ---------------------------------------------------------------------------
// State and router
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<ScoutApp>,
    pub api_key_configured: bool,
}

impl AppState {
    /// Data endpoints refuse to run without an upstream key. Mirrors the
    /// degraded mode the provider itself enforces, but fails before any
    /// cache or fetch work happens.
    fn require_api_key(&self) -> Result<(), ApiError> {
        if self.api_key_configured {
            Ok(())
        } else {
            Err(missing_api_key())
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/titles", get(titles))
        .route("/api/teams", get(search_teams))
        .route("/api/teams/:team_id", get(get_team))
        .route("/api/teams/:team_id/matches", get(team_matches))
        .route("/api/scout", post(scout))
        .route("/api/scout/compare", post(compare))
        .fallback(endpoint_not_found)
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error body
// ---------------------------------------------------------------------------

/// An error response in the API's wire format.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    error: String,
    details: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, error: impl Into<String>) -> Self {
        ApiError {
            status,
            code,
            error: error.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error, "code": self.code });
        if let Some(details) = self.details {
            body["details"] = Value::String(details);
        }
        (self.status, Json(body)).into_response()
    }
}

fn missing_api_key() -> ApiError {
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "MISSING_API_KEY",
        "GRID API key not configured",
    )
}

/// Map a raw telemetry failure onto the endpoint's fallback error, keeping
/// upstream outages distinguishable as 502s.
fn telemetry_failure(err: TelemetryError, fallback: &str, code: &'static str) -> ApiError {
    match &err {
        TelemetryError::Unavailable { .. } => ApiError::new(
            StatusCode::BAD_GATEWAY,
            "UPSTREAM_UNAVAILABLE",
            "GRID upstream unavailable",
        )
        .with_details(err.to_string()),
        TelemetryError::MissingApiKey => missing_api_key(),
        TelemetryError::Protocol { .. } => {
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, code, fallback)
                .with_details(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "api_key_configured": state.api_key_configured,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn titles(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.require_api_key()?;
    let titles = state
        .app
        .titles()
        .await
        .map_err(|e| telemetry_failure(e, "Failed to get titles", "GET_FAILED"))?;
    Ok(Json(json!({ "titles": titles, "count": titles.len() })))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    search: Option<String>,
    game: Option<String>,
}

async fn search_teams(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    state.require_api_key()?;

    let query = params.search.unwrap_or_default().trim().to_string();
    if query.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "MISSING_SEARCH",
            "Search term is required",
        ));
    }
    if query.chars().count() < 2 {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "INVALID_SEARCH",
            "Search term must be at least 2 characters",
        ));
    }

    let teams = state
        .app
        .search_teams(&query, params.game.as_deref())
        .await
        .map_err(|e| telemetry_failure(e, "Failed to search teams", "SEARCH_FAILED"))?;
    Ok(Json(json!({ "teams": teams, "count": teams.len() })))
}

async fn get_team(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<TeamRef>, ApiError> {
    state.require_api_key()?;

    let team = state
        .app
        .team(&team_id)
        .await
        .map_err(|e| telemetry_failure(e, "Failed to get team", "GET_FAILED"))?;
    match team {
        Some(team) => Ok(Json(team)),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Team not found",
        )),
    }
}

#[derive(Debug, Deserialize)]
struct MatchesParams {
    limit: Option<u32>,
}

async fn team_matches(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    Query(params): Query<MatchesParams>,
) -> Result<Json<Value>, ApiError> {
    state.require_api_key()?;

    let limit = params.limit.unwrap_or(DEFAULT_MATCH_COUNT).min(MAX_MATCH_COUNT);
    let matches = state
        .app
        .team_matches(&team_id, limit)
        .await
        .map_err(|e| telemetry_failure(e, "Failed to get matches", "GET_FAILED"))?;
    let rows: Vec<MatchRow> = matches.iter().map(MatchRow::from).collect();
    Ok(Json(json!({ "matches": rows, "count": rows.len() })))
}

#[derive(Debug, Deserialize)]
struct ScoutRequest {
    team_id: Option<String>,
    team_name: Option<String>,
    match_count: Option<u32>,
    our_team_id: Option<String>,
}

async fn scout(
    State(state): State<AppState>,
    Json(body): Json<ScoutRequest>,
) -> Result<Json<ScoutReport>, ApiError> {
    state.require_api_key()?;

    let team_id = body.team_id.unwrap_or_default().trim().to_string();
    let team_name = body.team_name.unwrap_or_default().trim().to_string();
    let selector = if !team_id.is_empty() {
        TeamSelector::ById(team_id)
    } else if !team_name.is_empty() {
        TeamSelector::ByName(team_name)
    } else {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "MISSING_TEAM",
            "Either team_id or team_name is required",
        ));
    };
    let match_count = body.match_count.unwrap_or(DEFAULT_MATCH_COUNT).min(MAX_MATCH_COUNT);

    let report = state
        .app
        .scout(&selector, match_count, body.our_team_id.as_deref())
        .await
        .map_err(|e| scout_failure(e, &selector))?;
    Ok(Json(report))
}

fn scout_failure(err: ScoutError, selector: &TeamSelector) -> ApiError {
    match err {
        ScoutError::TeamNotFound { query } => {
            let message = match selector {
                TeamSelector::ById(_) => format!("Team with ID '{query}' not found"),
                TeamSelector::ByName(_) => format!("No team found matching '{query}'"),
            };
            ApiError::new(StatusCode::NOT_FOUND, "TEAM_NOT_FOUND", message)
        }
        ScoutError::InsufficientData { team_id } => ApiError::new(
            StatusCode::NOT_FOUND,
            "NO_MATCHES",
            format!("No recent matches found for team '{team_id}'"),
        ),
        ScoutError::Telemetry(e) => {
            telemetry_failure(e, "Failed to generate scouting report", "REPORT_FAILED")
        }
        other => {
            error!(error = %other, "scout report failed");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "REPORT_FAILED",
                "Failed to generate scouting report",
            )
            .with_details(other.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompareRequest {
    your_team_id: Option<String>,
    opponent_team_id: Option<String>,
    match_count: Option<u32>,
}

async fn compare(
    State(state): State<AppState>,
    Json(body): Json<CompareRequest>,
) -> Result<Json<ComparisonReport>, ApiError> {
    state.require_api_key()?;

    let your_team_id = body.your_team_id.unwrap_or_default().trim().to_string();
    let opponent_team_id = body.opponent_team_id.unwrap_or_default().trim().to_string();
    if your_team_id.is_empty() || opponent_team_id.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "MISSING_TEAMS",
            "Both your_team_id and opponent_team_id are required",
        ));
    }
    let match_count = body.match_count.unwrap_or(DEFAULT_MATCH_COUNT).min(MAX_MATCH_COUNT);

    let comparison = state
        .app
        .compare(&your_team_id, &opponent_team_id, match_count)
        .await
        .map_err(compare_failure)?;
    Ok(Json(comparison))
}

fn compare_failure(err: ScoutError) -> ApiError {
    match &err {
        ScoutError::TeamNotFound { .. } => ApiError::new(
            StatusCode::NOT_FOUND,
            "TEAM_NOT_FOUND",
            "One or both teams not found",
        ),
        ScoutError::PartialComparison { source, .. } => match source.as_ref() {
            ScoutError::Telemetry(TelemetryError::Unavailable { .. }) => ApiError::new(
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_UNAVAILABLE",
                "GRID upstream unavailable",
            )
            .with_details(err.to_string()),
            ScoutError::Telemetry(TelemetryError::MissingApiKey) => missing_api_key(),
            ScoutError::InsufficientData { .. } => ApiError::new(
                StatusCode::NOT_FOUND,
                "NO_MATCHES",
                "No recent matches found for one of the teams",
            )
            .with_details(err.to_string()),
            _ => compare_fallback(&err),
        },
        ScoutError::Telemetry(e) => {
            telemetry_failure(e.clone(), "Failed to generate comparison", "COMPARE_FAILED")
        }
        ScoutError::InsufficientData { .. } => ApiError::new(
            StatusCode::NOT_FOUND,
            "NO_MATCHES",
            "No recent matches found for one of the teams",
        )
        .with_details(err.to_string()),
    }
}

fn compare_fallback(err: &ScoutError) -> ApiError {
    error!(error = %err, "comparison failed");
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "COMPARE_FAILED",
        "Failed to generate comparison",
    )
    .with_details(err.to_string())
}

async fn endpoint_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Endpoint not found")
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
