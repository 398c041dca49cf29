//! Bar-pair predicates and the explanation strings attached to labels.

use crate::OHLC;

// ============================================================
// REASONS
// ============================================================

pub const REASON_RUN_BULL: &str = "Continuation: bullish bar after a bullish bar";
pub const REASON_RUN_BEAR: &str = "Continuation: bearish bar after a bearish bar";
pub const REASON_REVERSAL_BULL: &str = "Reversal: bullish bar after a bearish bar";
pub const REASON_REVERSAL_BEAR: &str = "Reversal: bearish bar after a bullish bar";

pub const REASON_GRAB_LOW: &str = "Liquidity grab: low swept below the previous low";
pub const REASON_GRAB_HIGH: &str = "Liquidity grab: high swept above the previous high";

pub const REASON_CLOSE_ABOVE_CLOSE: &str = "Strength: closed above the previous close";
pub const REASON_CLOSE_BELOW_CLOSE: &str = "Strength: closed below the previous close";
pub const REASON_CLOSE_ABOVE_OPEN: &str = "Strength: closed above the previous open";
pub const REASON_CLOSE_BELOW_OPEN: &str = "Strength: closed below the previous open";

pub const REASON_PLUS_BULL: &str = "Plus: closed above the previous high";
pub const REASON_PLUS_BEAR: &str = "Plus: closed below the previous low";

// ============================================================
// PREDICATES
// ============================================================

/// Current low swept below the previous low (stops under the bar triggered)
#[inline]
pub fn bull_grab<T: OHLC>(curr: &T, prev: &T) -> bool {
    curr.low() < prev.low()
}

/// Current high swept above the previous high
#[inline]
pub fn bear_grab<T: OHLC>(curr: &T, prev: &T) -> bool {
    curr.high() > prev.high()
}

/// Close broke above the previous high
#[inline]
pub fn plus_bull<T: OHLC>(curr: &T, prev: &T) -> bool {
    curr.close() > prev.high()
}

/// Close broke below the previous low
#[inline]
pub fn plus_bear<T: OHLC>(curr: &T, prev: &T) -> bool {
    curr.close() < prev.low()
}
