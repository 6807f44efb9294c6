// =============================================================================
// Analysis — market data → recommendation → chat text
// =============================================================================
//
// Glue between the exchange client and the signal policy.  The current price
// is always the last close of the fetched series.
// =============================================================================

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::binance::{BinanceApiError, BinanceClient};
use crate::indicators::IndicatorError;
use crate::signal::{decide, Direction, Recommendation, Strategy};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no market data returned for {0}")]
    NoData(String),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error("market data request failed: {0:#}")]
    Fetch(anyhow::Error),
}

impl AnalysisError {
    /// Message suitable for showing to a chat user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoData(_) | Self::Indicator(_) => "⚠️ No data available for this symbol.",
            Self::Fetch(_) => "⚠️ Could not reach the market data service. Please try again later.",
        }
    }

    /// Classify a failed fetch for `symbol`.  Binance refusing the request
    /// (e.g. code -1121 "Invalid symbol.") means there is no data to show;
    /// everything else is a transport or service failure.
    pub fn from_fetch(symbol: &str, err: anyhow::Error) -> Self {
        match err.downcast_ref::<BinanceApiError>() {
            Some(api) if api.is_request_rejected() => Self::NoData(symbol.to_string()),
            _ => Self::Fetch(err),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub interval: String,
    pub recommendation: Recommendation,
}

/// Run `strategy` on an already fetched close series.
pub fn analyze_closes(
    symbol: &str,
    interval: &str,
    strategy: Strategy,
    closes: &[f64],
) -> Result<AnalysisReport, AnalysisError> {
    let current_price = *closes
        .last()
        .ok_or_else(|| AnalysisError::NoData(symbol.to_string()))?;

    let recommendation = decide(strategy, closes, current_price)?;

    Ok(AnalysisReport {
        symbol: symbol.to_string(),
        interval: interval.to_string(),
        recommendation,
    })
}

/// Fetch `limit` candles for `symbol` and analyse them.
#[instrument(skip(client))]
pub async fn run_analysis(
    client: &BinanceClient,
    symbol: &str,
    interval: &str,
    strategy: Strategy,
    limit: u32,
) -> Result<AnalysisReport, AnalysisError> {
    let closes = client
        .get_closes(symbol, interval, limit)
        .await
        .map_err(|e| {
            error!(symbol, error = %e, "market data fetch failed");
            AnalysisError::from_fetch(symbol, e)
        })?;

    let report = analyze_closes(symbol, interval, strategy, &closes)?;
    info!(
        symbol,
        %strategy,
        direction = ?report.recommendation.direction,
        "analysis complete"
    );
    Ok(report)
}

// =============================================================================
// Rendering
// =============================================================================

/// Format a price with precision that suits its magnitude.
pub fn format_price(price: f64) -> String {
    let decimals = match price.abs() {
        p if p >= 1000.0 => 2,
        p if p >= 1.0 => 4,
        p if p >= 0.01 => 6,
        _ => 8,
    };
    format!("{price:.decimals$}")
}

fn direction_label(direction: Option<Direction>) -> &'static str {
    match direction {
        Some(Direction::Up) => "📈 Up",
        Some(Direction::Down) => "📉 Down",
        Some(Direction::Neutral) => "➖ Neutral",
        None => "—",
    }
}

/// Chat-ready text for a report.
pub fn render_report(report: &AnalysisReport) -> String {
    let rec = &report.recommendation;
    let mut lines = vec![format!(
        "📊 {} ({}) · {} strategy",
        report.symbol, report.interval, rec.strategy
    )];

    if rec.signal_text.is_empty() {
        lines.push("⚪️ No signal: price is sitting on the EMA.".to_string());
    } else {
        lines.push(rec.signal_text.clone());
    }

    lines.push(format!("Direction: {}", direction_label(rec.direction)));
    lines.push(format!("Entry price: {}", format_price(rec.entry_price)));
    if let Some(tp) = rec.take_profit {
        lines.push(format!("Take profit: {}", format_price(tp)));
    }
    if let Some(sl) = rec.stop_loss {
        lines.push(format!("Stop loss: {}", format_price(sl)));
    }
    lines.push(format!("Risk/Reward: 1:{}", rec.risk_reward_ratio));

    match rec.strategy {
        Strategy::Ema => lines.push(format!("EMA(20): {}", format_price(rec.indicator_value))),
        Strategy::Rsi => lines.push(format!("RSI(14): {:.2}", rec.indicator_value)),
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_is_no_data() {
        let err = analyze_closes("BTCUSDT", "1d", Strategy::Ema, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::NoData(ref s) if s == "BTCUSDT"));
        assert_eq!(err.user_message(), "⚠️ No data available for this symbol.");
    }

    #[test]
    fn short_series_surfaces_indicator_error() {
        let err = analyze_closes("BTCUSDT", "1d", Strategy::Ema, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Indicator(IndicatorError::InsufficientData { required: 20, available: 2 })
        ));
    }

    #[test]
    fn rejected_symbol_reads_as_no_data() {
        let rejected = anyhow::Error::new(BinanceApiError {
            endpoint: "GET /api/v3/klines",
            status: 400,
            body: r#"{"code":-1121,"msg":"Invalid symbol."}"#.into(),
        });
        let err = AnalysisError::from_fetch("BTCUSTD", rejected);
        assert!(matches!(err, AnalysisError::NoData(ref s) if s == "BTCUSTD"));
        assert_eq!(err.user_message(), "⚠️ No data available for this symbol.");
    }

    #[test]
    fn outages_and_rate_limits_stay_fetch_errors() {
        let throttled = anyhow::Error::new(BinanceApiError {
            endpoint: "GET /api/v3/klines",
            status: 429,
            body: String::new(),
        });
        assert!(matches!(
            AnalysisError::from_fetch("BTCUSDT", throttled),
            AnalysisError::Fetch(_)
        ));
        assert!(matches!(
            AnalysisError::from_fetch("BTCUSDT", anyhow::anyhow!("connection reset")),
            AnalysisError::Fetch(_)
        ));
    }

    #[test]
    fn current_price_is_last_close() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let report = analyze_closes("ETHUSDT", "4h", Strategy::Rsi, &closes).unwrap();
        assert_eq!(report.recommendation.entry_price, 30.0);
        assert_eq!(report.interval, "4h");
    }

    #[test]
    fn render_ema_report_includes_levels() {
        let closes: Vec<f64> = (1..=40).rev().map(|x| x as f64).collect();
        let report = analyze_closes("BNBUSDT", "1d", Strategy::Ema, &closes).unwrap();
        let text = render_report(&report);
        assert!(text.contains("BNBUSDT (1d) · EMA strategy"));
        assert!(text.contains("Direction: 📈 Up"));
        assert!(text.contains("Take profit: 1.0300"));
        assert!(text.contains("Stop loss: 0.970000"));
        assert!(text.contains("Risk/Reward: 1:2"));
    }

    #[test]
    fn render_rsi_report_has_no_levels() {
        let closes: Vec<f64> = (0..21).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let report = analyze_closes("BTCUSDT", "1d", Strategy::Rsi, &closes).unwrap();
        let text = render_report(&report);
        assert!(text.contains("Market is balanced"));
        assert!(!text.contains("Take profit"));
        assert!(text.contains("RSI(14): 50.00"));
    }

    #[test]
    fn render_flat_ema_report_says_no_signal() {
        let closes = vec![5.0; 20];
        let report = analyze_closes("XRPUSDT", "1h", Strategy::Ema, &closes).unwrap();
        let text = render_report(&report);
        assert!(text.contains("No signal"));
        assert!(text.contains("Direction: —"));
    }

    #[test]
    fn price_precision_follows_magnitude() {
        assert_eq!(format_price(65000.123), "65000.12");
        assert_eq!(format_price(2.5), "2.5000");
        assert_eq!(format_price(0.5), "0.500000");
        assert_eq!(format_price(0.00001234), "0.00001234");
    }
}
