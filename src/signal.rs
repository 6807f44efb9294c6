// =============================================================================
// Signal Policy — indicator output → trading recommendation
// =============================================================================
//
// Two strategies are supported:
//
//   EMA(20)  price below the EMA => Up   (TP +3 %, SL -3 %)
//            price above the EMA => Down (TP -3 %, SL +3 %)
//            price on the EMA    => no direction, no levels
//
//   RSI(14)  rsi < 30 => Up   (oversold)
//            rsi > 70 => Down (overbought)
//            else     => Neutral; no TP/SL in any RSI branch
//
// The risk/reward ratio is a fixed 2 and is not derived from the levels.
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::indicators::{compute_ema, compute_rsi, IndicatorError};

/// EMA look-back used by the EMA strategy.
pub const EMA_PERIOD: usize = 20;
/// RSI look-back used by the RSI strategy.
pub const RSI_PERIOD: usize = 14;
/// RSI strictly below this is oversold.
pub const RSI_OVERSOLD: f64 = 30.0;
/// RSI strictly above this is overbought.
pub const RSI_OVERBOUGHT: f64 = 70.0;
/// Reported risk/reward, independent of the computed levels.
pub const RISK_REWARD_RATIO: f64 = 2.0;

/// Level multipliers: 3 % either side of the entry.
const LEVEL_ABOVE: f64 = 1.03;
const LEVEL_BELOW: f64 = 0.97;

// =============================================================================
// Strategy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Ema,
    Rsi,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Ema
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ema => write!(f, "EMA"),
            Self::Rsi => write!(f, "RSI"),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ema" => Ok(Self::Ema),
            "rsi" => Ok(Self::Rsi),
            other => anyhow::bail!("unknown strategy '{other}' (expected ema or rsi)"),
        }
    }
}

// =============================================================================
// Recommendation
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

/// A single trading recommendation. Built fresh for every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub strategy: Strategy,
    /// `None` when the EMA strategy sees the price exactly on the EMA.
    pub direction: Option<Direction>,
    /// Human-readable signal line; empty when there is no direction.
    pub signal_text: String,
    pub entry_price: f64,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
    pub risk_reward_ratio: f64,
    /// Last EMA value or the RSI the decision was taken on.
    pub indicator_value: f64,
}

impl Recommendation {
    fn new(strategy: Strategy, entry_price: f64, indicator_value: f64) -> Self {
        Self {
            strategy,
            direction: None,
            signal_text: String::new(),
            entry_price,
            take_profit: None,
            stop_loss: None,
            risk_reward_ratio: RISK_REWARD_RATIO,
            indicator_value,
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Run `strategy` over `prices` and turn the result into a recommendation for
/// an entry at `current_price`.
///
/// `InsufficientData` from the indicator engine is returned unchanged.
pub fn decide(
    strategy: Strategy,
    prices: &[f64],
    current_price: f64,
) -> Result<Recommendation, IndicatorError> {
    match strategy {
        Strategy::Ema => {
            let ema = compute_ema(prices, EMA_PERIOD)?;
            // compute_ema never returns an empty series on success.
            let last = ema[ema.len() - 1];
            Ok(ema_recommendation(last, current_price))
        }
        Strategy::Rsi => {
            let rsi = compute_rsi(prices, RSI_PERIOD)?;
            Ok(rsi_recommendation(rsi, current_price))
        }
    }
}

/// EMA branch of the policy, given the most recent EMA value.
pub fn ema_recommendation(last_ema: f64, current_price: f64) -> Recommendation {
    let mut rec = Recommendation::new(Strategy::Ema, current_price, last_ema);
    let entry = current_price;

    if current_price < last_ema {
        rec.direction = Some(Direction::Up);
        rec.signal_text = "🔵 Buy signal based on EMA.".to_string();
        rec.take_profit = Some(entry * LEVEL_ABOVE);
        rec.stop_loss = Some(entry * LEVEL_BELOW);
    } else if current_price > last_ema {
        rec.direction = Some(Direction::Down);
        rec.signal_text = "🔴 Sell signal based on EMA.".to_string();
        rec.take_profit = Some(entry * LEVEL_BELOW);
        rec.stop_loss = Some(entry * LEVEL_ABOVE);
    }
    // Price exactly on the EMA: left without a direction.

    rec
}

/// RSI branch of the policy. 30 and 70 themselves are neutral.
pub fn rsi_recommendation(rsi: f64, current_price: f64) -> Recommendation {
    let mut rec = Recommendation::new(Strategy::Rsi, current_price, rsi);

    let (direction, text) = if rsi < RSI_OVERSOLD {
        (Direction::Up, "🔵 Buy signal based on RSI (oversold).")
    } else if rsi > RSI_OVERBOUGHT {
        (Direction::Down, "🔴 Sell signal based on RSI (overbought).")
    } else {
        (Direction::Neutral, "⚪️ Market is balanced.")
    };
    rec.direction = Some(direction);
    rec.signal_text = text.to_string();

    rec
}
