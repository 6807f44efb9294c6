// =============================================================================
// Binance REST API Client — public market data
// =============================================================================
//
// Only unsigned endpoints are used, so no API key or secret is needed.  Every
// response feeds the shared request-weight tracker.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::rate_limit::RateLimitTracker;
use crate::types::Candle;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Request weight of `GET /api/v3/klines` for any limit up to 100.
const KLINES_WEIGHT: u32 = 2;

/// Non-success HTTP reply from Binance, carried inside the `anyhow::Error`
/// so callers can tell a rejected request from an unreachable service.
#[derive(Debug, Error)]
#[error("Binance {endpoint} returned {status}: {body}")]
pub struct BinanceApiError {
    pub endpoint: &'static str,
    pub status: u16,
    pub body: String,
}

impl BinanceApiError {
    /// A 4xx caused by the request itself (unknown symbol, bad interval).
    /// 418 and 429 are rate-limit bans and do not count.
    pub fn is_request_rejected(&self) -> bool {
        (400..500).contains(&self.status) && !matches!(self.status, 418 | 429)
    }
}

/// Binance spot REST client for public market data.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
    rate_limit: Arc<RateLimitTracker>,
}

impl BinanceClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("failed to build reqwest client")?;

        debug!(%base_url, "BinanceClient initialised");

        Ok(Self {
            base_url,
            client,
            rate_limit: Arc::new(RateLimitTracker::new()),
        })
    }

    pub fn rate_limit(&self) -> &RateLimitTracker {
        &self.rate_limit
    }

    /// GET /api/v3/klines (public, unsigned).
    ///
    /// Returns candles oldest first, exactly as Binance orders them.
    #[instrument(skip(self), name = "binance::get_klines")]
    pub async fn get_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Candle>> {
        if !self.rate_limit.can_send_request(KLINES_WEIGHT) {
            anyhow::bail!("Binance request weight exhausted — try again in a minute");
        }

        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("interval", interval), ("limit", limit.as_str())])
            .send()
            .await
            .context("GET /api/v3/klines request failed")?;

        self.rate_limit.update_from_headers(resp.headers());

        let status = resp.status();
        let text = resp.text().await.context("failed to read klines response")?;

        if !status.is_success() {
            return Err(BinanceApiError {
                endpoint: "GET /api/v3/klines",
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let body: serde_json::Value =
            serde_json::from_str(&text).context("failed to parse klines response")?;

        let candles = parse_klines(&body)?;
        debug!(symbol, interval, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    /// Closing prices for `symbol`, oldest first.
    pub async fn get_closes(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<f64>> {
        let candles = self.get_klines(symbol, interval, limit).await?;
        Ok(candles.into_iter().map(|c| c.close).collect())
    }
}

/// Parse Binance's array-of-arrays kline format.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
///   [6] closeTime, ...
pub(crate) fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;

        if arr.len() < 7 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }

        candles.push(Candle {
            open_time: arr[0].as_i64().unwrap_or(0),
            open: parse_str_f64(&arr[1])?,
            high: parse_str_f64(&arr[2])?,
            low: parse_str_f64(&arr[3])?,
            close: parse_str_f64(&arr[4])?,
            volume: parse_str_f64(&arr[5])?,
            close_time: arr[6].as_i64().unwrap_or(0),
        });
    }

    Ok(candles)
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}
