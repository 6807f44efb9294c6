// =============================================================================
// Admin REST API — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`.  Health is public; everything else
// requires the `AdminAuth` bearer token.
//
// CORS is configured permissively; the API binds to localhost by default.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::access::{generate_code, ttl_seconds_from_minutes};
use crate::analysis::{run_analysis, AnalysisError};
use crate::api::auth::AdminAuth;
use crate::app_state::AppState;
use crate::runtime_config::RuntimeConfig;
use crate::signal::Strategy;
use crate::types::{normalize_symbol, parse_interval};

/// Build the admin API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Public ──────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        // ── Authenticated ───────────────────────────────────────────
        .route("/api/v1/codes", get(list_codes).post(create_code))
        .route("/api/v1/errors", get(recent_errors))
        .route("/api/v1/signal", get(signal))
        .layer(cors)
        .with_state(state)
}

/// Status and message for a request the API refuses.
type Rejection = (StatusCode, String);

fn unprocessable(message: impl Into<String>) -> Rejection {
    (StatusCode::UNPROCESSABLE_ENTITY, message.into())
}

fn error_body((status, message): Rejection) -> axum::response::Response {
    let body = serde_json::json!({ "error": message });
    (status, Json(body)).into_response()
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_codes: usize,
    used_weight_1m: u32,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.uptime_secs(),
        active_codes: state.access.active_codes().len(),
        used_weight_1m: state.market.rate_limit().snapshot().used_weight_1m,
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Access codes (authenticated)
// =============================================================================

async fn list_codes(_auth: AdminAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.access.active_codes())
}

#[derive(Debug, Deserialize)]
struct CreateCodeRequest {
    #[serde(default)]
    code: Option<String>,
    ttl_minutes: i64,
}

#[derive(Debug, Serialize)]
struct CreatedCode {
    code: String,
    expires_at: DateTime<Utc>,
}

async fn create_code(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCodeRequest>,
) -> impl IntoResponse {
    match issue_code(&state, req) {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(rejection) => error_body(rejection),
    }
}

/// Validate the lifetime, pick a code and register it.
fn issue_code(state: &AppState, req: CreateCodeRequest) -> Result<CreatedCode, Rejection> {
    let ttl_seconds =
        ttl_seconds_from_minutes(req.ttl_minutes).map_err(|e| unprocessable(e.to_string()))?;

    let code = match req.code.map(|c| c.trim().to_string()) {
        Some(c) if !c.is_empty() => c,
        _ => generate_code(),
    };
    let expires_at = state
        .access
        .issue(&code, ttl_seconds)
        .map_err(|e| unprocessable(e.to_string()))?;
    info!(ttl_minutes = req.ttl_minutes, "access code created via API");

    Ok(CreatedCode { code, expires_at })
}

async fn recent_errors(_auth: AdminAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_errors.read().clone())
}

// =============================================================================
// Signal (authenticated)
// =============================================================================

#[derive(Debug, Deserialize)]
struct SignalQuery {
    symbol: String,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    strategy: Option<Strategy>,
}

/// Symbol, interval and strategy for a signal request, defaults filled in.
#[derive(Debug, PartialEq)]
struct SignalParams {
    symbol: String,
    interval: String,
    strategy: Strategy,
}

async fn signal(
    _auth: AdminAuth,
    State(state): State<Arc<AppState>>,
    Query(q): Query<SignalQuery>,
) -> impl IntoResponse {
    let params = match signal_params(&q, &state.config) {
        Ok(p) => p,
        Err(rejection) => return error_body(rejection),
    };

    let limit = state.config.kline_limit;
    match run_analysis(&state.market, &params.symbol, &params.interval, params.strategy, limit).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_body((analysis_status(&e), e.to_string())),
    }
}

fn signal_params(q: &SignalQuery, config: &RuntimeConfig) -> Result<SignalParams, Rejection> {
    let symbol = normalize_symbol(&q.symbol).ok_or_else(|| unprocessable("invalid symbol"))?;
    let interval = match q.interval.as_deref() {
        None => config.default_interval.clone(),
        Some(raw) => parse_interval(raw)
            .ok_or_else(|| unprocessable("invalid interval"))?
            .to_string(),
    };
    Ok(SignalParams {
        symbol,
        interval,
        strategy: q.strategy.unwrap_or(config.default_strategy),
    })
}

/// Too little or no data is the caller's problem; a failed fetch is upstream's.
fn analysis_status(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::NoData(_) | AnalysisError::Indicator(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AnalysisError::Fetch(_) => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Clock, MAX_TTL_MINUTES};
    use crate::app_state::tests::test_state;
    use crate::indicators::IndicatorError;

    fn query(symbol: &str, interval: Option<&str>, strategy: Option<Strategy>) -> SignalQuery {
        SignalQuery {
            symbol: symbol.to_string(),
            interval: interval.map(str::to_string),
            strategy,
        }
    }

    fn create(code: Option<&str>, ttl_minutes: i64) -> CreateCodeRequest {
        CreateCodeRequest {
            code: code.map(str::to_string),
            ttl_minutes,
        }
    }

    #[test]
    fn create_code_request_parses_without_code() {
        let req: CreateCodeRequest = serde_json::from_str(r#"{"ttl_minutes": 30}"#).unwrap();
        assert!(req.code.is_none());
        assert_eq!(req.ttl_minutes, 30);
    }

    #[test]
    fn omitted_code_is_generated_and_registered() {
        let (clock, state) = test_state(RuntimeConfig::default());
        let created = issue_code(&state, create(None, 30)).unwrap();

        assert_eq!(created.code.len(), 8);
        assert_eq!(created.expires_at, clock.now() + chrono::Duration::minutes(30));
        let active = state.access.active_codes();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].code, created.code);
    }

    #[test]
    fn blank_code_is_replaced_and_given_code_is_trimmed() {
        let (_, state) = test_state(RuntimeConfig::default());
        assert_eq!(issue_code(&state, create(Some("  VIP  "), 5)).unwrap().code, "VIP");
        assert_eq!(issue_code(&state, create(Some("   "), 5)).unwrap().code.len(), 8);
    }

    #[test]
    fn out_of_range_ttl_is_unprocessable() {
        let (_, state) = test_state(RuntimeConfig::default());
        for ttl in [0, -5, MAX_TTL_MINUTES + 1, i64::MAX / 2, 1_000_000_000_000] {
            let (status, _) = issue_code(&state, create(Some("X"), ttl)).unwrap_err();
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "ttl {ttl}");
        }
        assert!(state.access.active_codes().is_empty());
        assert!(issue_code(&state, create(Some("X"), MAX_TTL_MINUTES)).is_ok());
    }

    #[test]
    fn signal_params_fill_in_config_defaults() {
        let cfg = RuntimeConfig {
            default_strategy: Strategy::Rsi,
            ..RuntimeConfig::default()
        };
        let params = signal_params(&query("eth/usdt", None, None), &cfg).unwrap();
        assert_eq!(
            params,
            SignalParams {
                symbol: "ETHUSDT".into(),
                interval: "1d".into(),
                strategy: Strategy::Rsi,
            }
        );

        let params = signal_params(&query("BTCUSDT", Some("4h"), Some(Strategy::Ema)), &cfg).unwrap();
        assert_eq!(params.interval, "4h");
        assert_eq!(params.strategy, Strategy::Ema);
    }

    #[test]
    fn bad_symbol_or_interval_is_unprocessable() {
        let cfg = RuntimeConfig::default();
        let (status, msg) = signal_params(&query("BTC$USDT", None, None), &cfg).unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(msg, "invalid symbol");

        let (status, msg) = signal_params(&query("BTCUSDT", Some("7m"), None), &cfg).unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(msg, "invalid interval");
    }

    #[test]
    fn analysis_errors_map_to_statuses() {
        assert_eq!(
            analysis_status(&AnalysisError::NoData("BTCUSDT".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let short = IndicatorError::InsufficientData { required: 20, available: 3 };
        assert_eq!(
            analysis_status(&AnalysisError::Indicator(short)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            analysis_status(&AnalysisError::Fetch(anyhow::anyhow!("timed out"))),
            StatusCode::BAD_GATEWAY
        );
    }
}
