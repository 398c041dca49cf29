//! Unconstrained random-walk bars used as background data.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Candle, Result, SweepError};

/// Default per-bar volatility in price units
pub const DEFAULT_VOLATILITY: f64 = 5.0;
/// Default spacing between consecutive bar timestamps (seconds)
pub const DEFAULT_BAR_INTERVAL: i64 = 60;

/// Next bar of a random walk opening at `prev_close`.
///
/// `close = prev_close + U(-1, 1) * volatility * 2`, and each wick extends
/// `U(0, 1) * |volatility| * 0.5` beyond the body, so the OHLC invariants hold
/// for any finite input. The returned bar has timestamp 0; use
/// [`RandomWalk::next_bar`] to thread timestamps.
pub fn generate_walk<R: Rng + ?Sized>(rng: &mut R, prev_close: f64, volatility: f64) -> Candle {
    walk_bar(rng, prev_close, volatility, 0)
}

fn walk_bar<R: Rng + ?Sized>(rng: &mut R, prev_close: f64, volatility: f64, timestamp: i64) -> Candle {
    let change = rng.gen_range(-1.0_f64..1.0) * volatility * 2.0;
    let open = prev_close;
    let close = prev_close + change;
    let wick = volatility.abs() * 0.5;
    let high = open.max(close) + rng.gen::<f64>() * wick;
    let low = open.min(close) - rng.gen::<f64>() * wick;

    Candle {
        open,
        high,
        low,
        close,
        timestamp,
    }
}

/// Random-walk generator with a fixed volatility and bar spacing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomWalk {
    pub volatility: f64,
    pub bar_interval: i64,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            volatility: DEFAULT_VOLATILITY,
            bar_interval: DEFAULT_BAR_INTERVAL,
        }
    }
}

impl RandomWalk {
    pub fn new(volatility: f64, bar_interval: i64) -> Result<Self> {
        let walk = Self {
            volatility,
            bar_interval,
        };
        walk.validate()?;
        Ok(walk)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.volatility.is_finite() || self.volatility < 0.0 {
            return Err(SweepError::InvalidValue(
                "volatility must be finite and non-negative",
            ));
        }
        if self.bar_interval <= 0 {
            return Err(SweepError::InvalidValue("bar_interval must be > 0"));
        }
        Ok(())
    }

    /// Bar opening at `prev_close` stamped with `timestamp`
    pub fn bar_at<R: Rng + ?Sized>(&self, rng: &mut R, prev_close: f64, timestamp: i64) -> Candle {
        walk_bar(rng, prev_close, self.volatility, timestamp)
    }

    /// Bar following `prev`, one interval later
    pub fn next_bar<R: Rng + ?Sized>(&self, rng: &mut R, prev: &Candle) -> Candle {
        self.bar_at(
            rng,
            prev.close,
            prev.timestamp.saturating_add(self.bar_interval),
        )
    }

    /// `len` contiguous bars, the first opening at `start_price`
    pub fn series<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        start_price: f64,
        start_timestamp: i64,
        len: usize,
    ) -> Vec<Candle> {
        let mut bars = Vec::with_capacity(len);
        let mut prev_close = start_price;
        let mut timestamp = start_timestamp;

        for _ in 0..len {
            let bar = self.bar_at(rng, prev_close, timestamp);
            prev_close = bar.close;
            timestamp = timestamp.saturating_add(self.bar_interval);
            bars.push(bar);
        }

        bars
    }
}
