//! Synthetic bar pairs that classify to a requested pattern
//!
//! [`synthesize`] is the inverse of [`classify`]: for every [`Pattern`] it
//! builds a `(prev, curr)` pair such that `classify(&curr, Some(&prev))`
//! reproduces the pattern exactly.
//!
//! The construction is a fixed numeric layout, not a solver. Its constants
//! live in [`SynthesisTuning`]; [`SynthesisTuning::validate`] range-checks them
//! and round-trips all eight patterns through the classifier, and a
//! [`Synthesizer`] cannot be built from a tuning that fails.
//!
//! Layout for a bullish target (bearish mirrors it):
//!
//! ```text
//! prev: open = start, close = start ± prev_body, wicks of prev_wick
//! curr: open  = prev.close
//!       low   = prev.low - grab_amount
//!       close = prev.high + plus_buffer     (plus)
//!             = prev.high - regular_buffer  (regular)
//!       high  = max(close + close_wick, prev.high - grab_wick_inset)
//! ```

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    detectors::classify,
    params::{get_value, ParamMeta, Tunable},
    walk::DEFAULT_BAR_INTERVAL,
    Candle, Direction, OHLCExt, Pattern, Result, SweepError,
};

/// Start prices the tuning self-check runs at
/// Largest `|start_price|` a validated tuning is checked against
pub const MAX_START_PRICE: f64 = 1.0e9;

const REFERENCE_PRICES: [f64; 7] =
    [-MAX_START_PRICE, -2_500.0, -7.25, 0.0, 100.0, 65_432.5, MAX_START_PRICE];

static TUNING_PARAMS: [ParamMeta; 8] = [
    ParamMeta::distance(
        "prev_body",
        6.0,
        (1.0, 20.0, 1.0),
        "Body size of the previous bar",
    ),
    ParamMeta::distance(
        "prev_wick",
        3.0,
        (2.0, 10.0, 0.5),
        "Wick length on both sides of the previous bar",
    ),
    ParamMeta::distance(
        "grab_amount",
        2.5,
        (0.5, 10.0, 0.5),
        "How far the current bar sweeps past the previous extreme",
    ),
    ParamMeta::distance(
        "plus_buffer",
        3.0,
        (0.5, 10.0, 0.5),
        "Distance the plus close lands beyond the previous opposite extreme",
    ),
    ParamMeta::distance(
        "regular_buffer",
        1.5,
        (0.0, 2.5, 0.5),
        "Distance the regular close stays inside the previous opposite extreme; must be < prev_wick",
    ),
    ParamMeta::distance(
        "close_wick",
        1.5,
        (0.0, 10.0, 0.5),
        "Wick beyond the current close",
    ),
    ParamMeta::distance(
        "grab_wick_inset",
        0.5,
        (0.0, 10.0, 0.5),
        "Minimum close-side wick, measured inward from the previous opposite extreme",
    ),
    ParamMeta::distance(
        "jitter",
        0.0,
        (0.0, 5.0, 0.5),
        "Maximum random extra added to grab, plus buffer and close wick",
    ),
];

// ============================================================
// TUNING
// ============================================================

/// Numeric layout of synthesized pairs. All values are price distances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisTuning {
    pub prev_body: f64,
    pub prev_wick: f64,
    /// Must be > 0 for the sweep to register
    pub grab_amount: f64,
    /// Must be > 0 so a plus close clears the previous extreme
    pub plus_buffer: f64,
    /// Must be < `prev_wick` so a regular close still clears the previous close
    pub regular_buffer: f64,
    pub close_wick: f64,
    pub grab_wick_inset: f64,
    pub jitter: f64,
}

impl Default for SynthesisTuning {
    fn default() -> Self {
        Self {
            prev_body: 6.0,
            prev_wick: 3.0,
            grab_amount: 2.5,
            plus_buffer: 3.0,
            regular_buffer: 1.5,
            close_wick: 1.5,
            grab_wick_inset: 0.5,
            jitter: 0.0,
        }
    }
}

impl SynthesisTuning {
    /// Values in `param_meta()` order
    fn values(&self) -> [f64; 8] {
        [
            self.prev_body,
            self.prev_wick,
            self.grab_amount,
            self.plus_buffer,
            self.regular_buffer,
            self.close_wick,
            self.grab_wick_inset,
            self.jitter,
        ]
    }

    /// Range-check every field, then check that all eight patterns survive a
    /// synthesize/classify round trip at the reference prices, with and
    /// without maximum jitter.
    pub fn validate(&self) -> Result<()> {
        for (meta, value) in TUNING_PARAMS.iter().zip(self.values()) {
            meta.validate(value)?;
        }
        if self.regular_buffer >= self.prev_wick {
            return Err(SweepError::InvalidConfig(format!(
                "{}: regular_buffer ({}) must be smaller than prev_wick ({})",
                Self::section(),
                self.regular_buffer,
                self.prev_wick
            )));
        }
        self.verify_round_trip()
    }

    fn verify_round_trip(&self) -> Result<()> {
        let offset_sets = [Offsets::NONE, Offsets::uniform(self.jitter)];

        for price in REFERENCE_PRICES {
            for pattern in Pattern::ALL {
                for offsets in offset_sets {
                    let (prev, curr) =
                        build_pair(self, pattern, price, 0, DEFAULT_BAR_INTERVAL, offsets);
                    let label = classify(&curr, Some(&prev));
                    if label.pattern != Some(pattern)
                        || prev.validate().is_err()
                        || curr.validate().is_err()
                    {
                        warn!(
                            section = Self::section(),
                            %pattern,
                            price,
                            got = ?label.pattern,
                            "synthesis tuning failed round-trip check"
                        );
                        return Err(SweepError::TuningRejected {
                            pattern: pattern.id().as_str(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl Tunable for SynthesisTuning {
    fn param_meta() -> &'static [ParamMeta] {
        &TUNING_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let d = Self::default();
        let tuning = Self {
            prev_body: get_value(params, "prev_body", d.prev_body),
            prev_wick: get_value(params, "prev_wick", d.prev_wick),
            grab_amount: get_value(params, "grab_amount", d.grab_amount),
            plus_buffer: get_value(params, "plus_buffer", d.plus_buffer),
            regular_buffer: get_value(params, "regular_buffer", d.regular_buffer),
            close_wick: get_value(params, "close_wick", d.close_wick),
            grab_wick_inset: get_value(params, "grab_wick_inset", d.grab_wick_inset),
            jitter: get_value(params, "jitter", d.jitter),
        };
        tuning.validate()?;
        Ok(tuning)
    }

    fn section() -> &'static str {
        "synthesis"
    }
}

// ============================================================
// CONSTRUCTION
// ============================================================

/// Extra distances drawn from the jitter budget. Only ever widen the layout.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Offsets {
    grab: f64,
    plus: f64,
    wick: f64,
}

impl Offsets {
    const NONE: Self = Self {
        grab: 0.0,
        plus: 0.0,
        wick: 0.0,
    };

    fn uniform(amount: f64) -> Self {
        Self {
            grab: amount,
            plus: amount,
            wick: amount,
        }
    }

    fn draw<R: Rng + ?Sized>(rng: &mut R, jitter: f64) -> Self {
        if jitter <= 0.0 {
            return Self::NONE;
        }
        Self {
            grab: rng.gen_range(0.0..jitter),
            plus: rng.gen_range(0.0..jitter),
            wick: rng.gen_range(0.0..jitter),
        }
    }
}

fn build_pair(
    tuning: &SynthesisTuning,
    pattern: Pattern,
    start_price: f64,
    timestamp: i64,
    bar_interval: i64,
    offsets: Offsets,
) -> (Candle, Candle) {
    let prev_open = start_price;
    let prev_close = match pattern.family.prev_direction(pattern.direction) {
        Direction::Bullish => prev_open + tuning.prev_body,
        Direction::Bearish => prev_open - tuning.prev_body,
    };
    let prev = Candle {
        open: prev_open,
        high: prev_open.max(prev_close) + tuning.prev_wick,
        low: prev_open.min(prev_close) - tuning.prev_wick,
        close: prev_close,
        timestamp,
    };

    let grab = tuning.grab_amount + offsets.grab;
    let plus = tuning.plus_buffer + offsets.plus;
    let close_wick = tuning.close_wick + offsets.wick;
    let curr_timestamp = timestamp.saturating_add(bar_interval);

    let curr = match pattern.direction {
        Direction::Bullish => {
            let close = if pattern.is_plus {
                prev.high + plus
            } else {
                prev.high - tuning.regular_buffer
            };
            Candle {
                open: prev.close,
                high: (close + close_wick).max(prev.high - tuning.grab_wick_inset),
                low: prev.low - grab,
                close,
                timestamp: curr_timestamp,
            }
        }
        Direction::Bearish => {
            let close = if pattern.is_plus {
                prev.low - plus
            } else {
                prev.low + tuning.regular_buffer
            };
            Candle {
                open: prev.close,
                high: prev.high + grab,
                low: (close - close_wick).min(prev.low + tuning.grab_wick_inset),
                close,
                timestamp: curr_timestamp,
            }
        }
    };

    (prev, curr)
}

/// Build a `(prev, curr)` pair for `pattern` with the default tuning.
///
/// `prev` opens at `start_price` with timestamp 0; `curr` follows one default
/// interval later and opens at `prev.close`.
///
/// The layout uses fixed price offsets, so the round trip is only checked up
/// to `|start_price| <=` [`MAX_START_PRICE`]. Past about 1e16 the f64 spacing
/// swallows the offsets and the pair classifies as no pattern.
pub fn synthesize(pattern: Pattern, start_price: f64) -> (Candle, Candle) {
    debug_assert!(
        start_price.abs() <= MAX_START_PRICE,
        "start_price {start_price} outside the synthesizable range"
    );
    build_pair(
        &SynthesisTuning::default(),
        pattern,
        start_price,
        0,
        DEFAULT_BAR_INTERVAL,
        Offsets::NONE,
    )
}

// ============================================================
// SYNTHESIZER
// ============================================================

/// Pair builder over a tuning that passed [`SynthesisTuning::validate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Synthesizer {
    tuning: SynthesisTuning,
    bar_interval: i64,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self {
            tuning: SynthesisTuning::default(),
            bar_interval: DEFAULT_BAR_INTERVAL,
        }
    }
}

impl Synthesizer {
    pub fn new(tuning: SynthesisTuning) -> Result<Self> {
        tuning.validate()?;
        Ok(Self::from_validated(tuning))
    }

    /// Caller guarantees `tuning.validate()` already passed
    pub(crate) fn from_validated(tuning: SynthesisTuning) -> Self {
        Self {
            tuning,
            bar_interval: DEFAULT_BAR_INTERVAL,
        }
    }

    pub fn with_bar_interval(mut self, bar_interval: i64) -> Self {
        self.bar_interval = bar_interval;
        self
    }

    pub fn tuning(&self) -> &SynthesisTuning {
        &self.tuning
    }

    pub fn bar_interval(&self) -> i64 {
        self.bar_interval
    }

    /// Build a pair for `pattern`; `prev` opens at `start_price` stamped
    /// `timestamp`. Jitter, if configured, is drawn from `rng`.
    ///
    /// Same price range as [`synthesize`].
    pub fn synthesize<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        pattern: Pattern,
        start_price: f64,
        timestamp: i64,
    ) -> (Candle, Candle) {
        debug_assert!(
            start_price.abs() <= MAX_START_PRICE,
            "start_price {start_price} outside the synthesizable range"
        );
        let offsets = Offsets::draw(rng, self.tuning.jitter);
        build_pair(
            &self.tuning,
            pattern,
            start_price,
            timestamp,
            self.bar_interval,
            offsets,
        )
    }
}
