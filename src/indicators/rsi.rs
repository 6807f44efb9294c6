// =============================================================================
// Relative Strength Index (RSI) — trailing-window mean
// =============================================================================
//
// Step 1 — Compute price changes (deltas) across the whole series.
// Step 2 — Split each delta into a gain (positive part) and a loss (magnitude
//          of the negative part); the other side is recorded as 0.
// Step 3 — avg_gain / avg_loss = plain mean of the LAST `period` entries.
//          No Wilder smoothing: the window is recomputed on every call.
// Step 4 — RS  = avg_gain / avg_loss, or 0 when avg_loss == 0
//          RSI = 100 - 100 / (1 + RS)
//
// NOTE: with zero average loss the RSI is 0, not the textbook 100.  A strictly
// rising series therefore reads as "oversold".
// =============================================================================

use super::IndicatorError;

/// Compute the RSI of `prices` over the trailing `period` price changes.
///
/// # Errors
/// `prices.len() < period + 1` (fewer than `period` changes) or `period == 0`
/// => [`IndicatorError::InsufficientData`].
pub fn compute_rsi(prices: &[f64], period: usize) -> Result<f64, IndicatorError> {
    if period == 0 || prices.len() < period + 1 {
        return Err(IndicatorError::InsufficientData {
            required: period + 1,
            available: prices.len(),
        });
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = prices
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            if change > 0.0 {
                (change, 0.0)
            } else {
                (0.0, -change)
            }
        })
        .unzip();

    let period_f = period as f64;
    let avg_gain = gains[gains.len() - period..].iter().sum::<f64>() / period_f;
    let avg_loss = losses[losses.len() - period..].iter().sum::<f64>() / period_f;

    let rs = if avg_loss != 0.0 { avg_gain / avg_loss } else { 0.0 };
    Ok(100.0 - 100.0 / (1.0 + rs))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(compute_rsi(&[], 14).is_err());
    }

    #[test]
    fn rsi_period_zero() {
        assert!(compute_rsi(&[1.0, 2.0, 3.0], 0).is_err());
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert_eq!(
            compute_rsi(&closes, 14),
            Err(IndicatorError::InsufficientData { required: 15, available: 14 })
        );
    }

    #[test]
    fn rsi_minimum_length_is_period_plus_one() {
        let closes: Vec<f64> = (1..=15).map(|x| if x % 2 == 0 { 10.0 } else { 11.0 }).collect();
        assert!(compute_rsi(&closes, 14).is_ok());
    }

    #[test]
    fn rsi_all_gains_is_zero() {
        // Zero average loss maps to RSI 0, not 100.
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        assert_eq!(compute_rsi(&closes, 14).unwrap(), 0.0);
    }

    #[test]
    fn rsi_flat_market_is_zero() {
        let closes = vec![100.0; 30];
        assert_eq!(compute_rsi(&closes, 14).unwrap(), 0.0);
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        assert!(compute_rsi(&closes, 14).unwrap().abs() < 1e-10);
    }

    #[test]
    fn rsi_only_uses_trailing_window() {
        // Big losses early on, then 14 alternating +2 / -1 moves.
        let mut closes = vec![200.0, 150.0, 100.0];
        let mut price = 100.0;
        for i in 0..14 {
            price += if i % 2 == 0 { 2.0 } else { -1.0 };
            closes.push(price);
        }
        // avg_gain = 7*2/14 = 1, avg_loss = 7*1/14 = 0.5, RS = 2.
        let rsi = compute_rsi(&closes, 14).unwrap();
        assert!((rsi - (100.0 - 100.0 / 3.0)).abs() < 1e-10, "got {rsi}");
    }

    #[test]
    fn rsi_equal_gains_and_losses_is_fifty() {
        let closes: Vec<f64> = (0..21).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let rsi = compute_rsi(&closes, 14).unwrap();
        assert!((rsi - 50.0).abs() < 1e-10, "got {rsi}");
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        for period in 1..closes.len() {
            let v = compute_rsi(&closes, period).unwrap();
            assert!((0.0..=100.0).contains(&v), "RSI {v} out of range for period {period}");
        }
    }
}
