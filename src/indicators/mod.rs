// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the signal policy
// is built on.  Every public function returns `Result<T, IndicatorError>` so
// callers are forced to handle the insufficient-data case.

pub mod ema;
pub mod rsi;

pub use ema::compute_ema;
pub use rsi::compute_rsi;

use thiserror::Error;

/// The only failure mode of the indicator engine: the price series is shorter
/// than the look-back window requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IndicatorError {
    #[error("insufficient data: need at least {required} prices, got {available}")]
    InsufficientData { required: usize, available: usize },
}
