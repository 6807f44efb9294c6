// =============================================================================
// Shared types used across the bot
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single OHLCV candle from the Binance klines endpoint.
///
/// Mirrors one kline row in full.  The signal strategies only read `close`;
/// the other fields are kept so a parsed row can be checked against the raw
/// payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Kline intervals accepted by Binance spot.
pub const KLINE_INTERVALS: &[&str] = &[
    "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

/// Normalise user input such as `btc/usdt` or `ETH-USDT` into an exchange
/// symbol (`BTCUSDT`).  Returns `None` for anything that is not 2–20
/// alphanumeric characters once separators are removed.
pub fn normalize_symbol(input: &str) -> Option<String> {
    let symbol: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | '_' | ' '))
        .collect::<String>()
        .to_uppercase();

    let ok = (2..=20).contains(&symbol.len()) && symbol.chars().all(|c| c.is_ascii_alphanumeric());
    ok.then_some(symbol)
}

/// Validate a kline interval.  Case matters: `1m` is a minute, `1M` a month.
pub fn parse_interval(input: &str) -> Option<&'static str> {
    let input = input.trim();
    KLINE_INTERVALS.iter().copied().find(|i| *i == input)
}
