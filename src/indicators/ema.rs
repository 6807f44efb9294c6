// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   k     = 2 / (period + 1)
//   EMA_t = close_t * k + EMA_{t-1} * (1 - k)
//
// The very first EMA value is seeded with the SMA of the first `period` closes.
// =============================================================================

use super::IndicatorError;

/// Compute the EMA series for the given `prices` slice and look-back `period`.
///
/// The returned vector has `prices.len() - period + 1` elements; element `i`
/// corresponds to the close at index `period - 1 + i`.
///
/// # Errors
/// - `prices.len() < period` => [`IndicatorError::InsufficientData`]
/// - `period == 0` => [`IndicatorError::InsufficientData`] (nothing to seed)
pub fn compute_ema(prices: &[f64], period: usize) -> Result<Vec<f64>, IndicatorError> {
    if period == 0 || prices.len() < period {
        return Err(IndicatorError::InsufficientData {
            required: period.max(1),
            available: prices.len(),
        });
    }

    let k = 2.0 / (period + 1) as f64;

    // Seed: SMA of the first `period` values.
    let seed = prices[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(prices.len() - period + 1);
    result.push(seed);

    let mut prev = seed;
    for &price in &prices[period..] {
        prev = price * k + prev * (1.0 - k);
        result.push(prev);
    }

    Ok(result)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: build a simple ascending price series.
    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn ema_empty_input() {
        assert_eq!(
            compute_ema(&[], 5),
            Err(IndicatorError::InsufficientData { required: 5, available: 0 })
        );
    }

    #[test]
    fn ema_period_zero() {
        assert!(compute_ema(&[1.0, 2.0, 3.0], 0).is_err());
    }

    #[test]
    fn ema_shorter_than_period_always_fails() {
        for period in 1..=25 {
            for n in 0..period {
                let closes = ascending(n);
                assert!(
                    matches!(
                        compute_ema(&closes, period),
                        Err(IndicatorError::InsufficientData { .. })
                    ),
                    "n={n} period={period} should fail"
                );
            }
        }
    }

    #[test]
    fn ema_output_length_is_n_minus_period_plus_one() {
        for period in 1..=20 {
            for n in period..=40 {
                let ema = compute_ema(&ascending(n), period).unwrap();
                assert_eq!(ema.len(), n - period + 1, "n={n} period={period}");
            }
        }
    }

    #[test]
    fn ema_constant_series_equals_constant() {
        assert_eq!(compute_ema(&[10.0, 10.0, 10.0, 10.0, 10.0], 5).unwrap(), vec![10.0]);
    }

    #[test]
    fn ema_period_equals_length() {
        let ema = compute_ema(&[2.0, 4.0, 6.0], 3).unwrap();
        assert_eq!(ema.len(), 1);
        // SMA = (2+4+6)/3 = 4.0
        assert!((ema[0] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn ema_known_values() {
        // 5-period EMA of [1..=10]: seed 3.0, k = 1/3.
        let closes = ascending(10);
        let ema = compute_ema(&closes, 5).unwrap();
        assert_eq!(ema.len(), 6);

        let k = 2.0 / 6.0;
        let mut expected = 3.0;
        let mut expected_vec = vec![expected];
        for &c in &closes[5..] {
            expected = c * k + expected * (1.0 - k);
            expected_vec.push(expected);
        }
        for (a, b) in ema.iter().zip(expected_vec.iter()) {
            assert!((a - b).abs() < 1e-10, "got {a}, expected {b}");
        }
    }

    #[test]
    fn ema_lags_a_rising_series() {
        let closes = ascending(60);
        let last = *compute_ema(&closes, 20).unwrap().last().unwrap();
        assert!(last < 60.0);
        assert!(last > 40.0);
    }
}
