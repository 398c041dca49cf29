//! # sweeplab - liquidity-sweep candlestick patterns
//!
//! Classifies consecutive price bars as liquidity-sweep patterns, synthesizes
//! bar pairs that classify to a requested pattern, and runs a practice exam
//! on top of both.
//!
//! ## Quick Start
//!
//! ```rust
//! use sweeplab::prelude::*;
//!
//! // A bearish bar followed by a bullish bar that sweeps its low
//! let prev = Candle::new(100.0, 103.0, 91.0, 94.0, 0).unwrap();
//! let curr = Candle::new(94.0, 103.0, 88.5, 101.5, 60).unwrap();
//!
//! let label = classify(&curr, Some(&prev));
//! assert_eq!(label.family(), Some(Family::Reversal));
//! assert_eq!(label.direction(), Some(Direction::Bullish));
//! assert!(!label.is_plus());
//!
//! // The synthesizer is the inverse of the classifier
//! let target = Pattern::new(Family::Run, Direction::Bearish, true);
//! let (prev, curr) = synthesize(target, 250.0);
//! assert_eq!(classify(&curr, Some(&prev)).pattern, Some(target));
//!
//! // Practice exam
//! let mut exam = ExamBuilder::new().build_seeded(7).unwrap();
//! let actual = exam.scenario().actual_label();
//! let result = exam.submit_guess(Guess::NoPattern).unwrap();
//! assert_eq!(result.correct, actual.is_none());
//! ```

pub mod detectors;
pub mod exam;
pub mod params;
pub mod series;
pub mod synth;
pub mod walk;

pub mod prelude {
    pub use crate::{
        // Classifier
        detectors::{classify, classify_at, SweepRule},
        // Exam
        exam::{
            ExamBuilder, ExamConfig, ExamEngine, ExamScenario, ExamState, GradeResult, Guess,
            ScoreState,
        },
        // Parameters
        params::{ParamMeta, ParamType, Tunable},
        // Series
        series::{
            annotate, annotate_parallel, iter_labels, validate_bars, AnnotateError,
            AnnotatedSeries, BarLabel, CandleSeries, LabelIterator,
        },
        // Synthesis
        synth::{synthesize, SynthesisTuning, Synthesizer, MAX_START_PRICE},
        // Random walk
        walk::{generate_walk, RandomWalk, DEFAULT_VOLATILITY},
        // Types
        BarCount,
        Candle,
        Direction,
        Family,
        Pattern,
        PatternId,
        PatternLabel,
        Probability,
        Result,
        SweepError,
        OHLCExt,
        OHLC,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SweepError>;

/// Errors raised at the edges of the engine (configuration and input data).
///
/// Classification, synthesis and grading themselves are total.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SweepError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid candle at index {index}: {reason}")]
    InvalidCandle { index: usize, reason: &'static str },

    #[error("Synthesis tuning does not reproduce {pattern}")]
    TuningRejected { pattern: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Probability in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Probability(f64);

impl Probability {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(SweepError::InvalidValue(
                "Probability cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(SweepError::OutOfRange {
                field: "Probability",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Probability {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Probability {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Probability::new(value).map_err(serde::de::Error::custom)
    }
}

/// Number of bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BarCount(usize);

impl BarCount {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(SweepError::InvalidValue("BarCount must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for BarCount {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for BarCount {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        BarCount::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Price bar access. Implement it for your own bar type to classify it directly.
pub trait OHLC {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLC data
pub trait OHLCExt: OHLC {
    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Bar colour. `None` when close == open.
    #[inline]
    fn direction(&self) -> Option<Direction> {
        if self.is_bullish() {
            Some(Direction::Bullish)
        } else if self.is_bearish() {
            Some(Direction::Bearish)
        } else {
            None
        }
    }

    /// Validate `low <= min(open, close)` and `high >= max(open, close)` on finite prices
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(SweepError::InvalidCandle {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(SweepError::InvalidCandle {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.low() > self.open().min(self.close()) {
            return Err(SweepError::InvalidCandle {
                index: 0,
                reason: "low above body",
            });
        }
        if self.high() < self.open().max(self.close()) {
            return Err(SweepError::InvalidCandle {
                index: 0,
                reason: "high below body",
            });
        }
        Ok(())
    }
}

impl<T: OHLC> OHLCExt for T {}

// ============================================================
// CANDLE
// ============================================================

/// One price bar
///
/// Deserializing goes through [`Candle::new`], so invalid bars are rejected.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub timestamp: i64,
}

impl Candle {
    /// Create a candle, validating the OHLC invariants
    pub fn new(open: f64, high: f64, low: f64, close: f64, timestamp: i64) -> Result<Self> {
        let candle = Self {
            open,
            high,
            low,
            close,
            timestamp,
        };
        candle.validate()?;
        Ok(candle)
    }
}

impl<'de> serde::Deserialize<'de> for Candle {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct Raw {
            open: f64,
            high: f64,
            low: f64,
            close: f64,
            timestamp: i64,
        }

        let raw = Raw::deserialize(d)?;
        Candle::new(raw.open, raw.high, raw.low, raw.close, raw.timestamp)
            .map_err(serde::de::Error::custom)
    }
}

impl OHLC for Candle {
    #[inline]
    fn open(&self) -> f64 {
        self.open
    }

    #[inline]
    fn high(&self) -> f64 {
        self.high
    }

    #[inline]
    fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    fn close(&self) -> f64 {
        self.close
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// PATTERNS
// ============================================================

/// Stable identifier for a pattern variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub &'static str);

impl PatternId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

/// Bias of a bar or a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::Bullish => Direction::Bearish,
            Direction::Bearish => Direction::Bullish,
        }
    }
}

/// Relation between the current bar and its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Family {
    /// Same direction as the previous bar
    Run,
    /// Opposite direction to the previous bar
    Reversal,
}

impl Family {
    /// Direction the previous bar must have for a pattern of this family
    #[inline]
    pub fn prev_direction(self, direction: Direction) -> Direction {
        match self {
            Family::Run => direction,
            Family::Reversal => direction.opposite(),
        }
    }
}

/// A concrete pattern: the triple that grading compares and synthesis targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Pattern {
    pub family: Family,
    pub direction: Direction,
    /// Close broke past the opposite extreme of the previous bar
    pub is_plus: bool,
}

impl Pattern {
    /// All eight synthesizable patterns
    pub const ALL: [Pattern; 8] = [
        Pattern::new(Family::Run, Direction::Bullish, false),
        Pattern::new(Family::Run, Direction::Bullish, true),
        Pattern::new(Family::Run, Direction::Bearish, false),
        Pattern::new(Family::Run, Direction::Bearish, true),
        Pattern::new(Family::Reversal, Direction::Bullish, false),
        Pattern::new(Family::Reversal, Direction::Bullish, true),
        Pattern::new(Family::Reversal, Direction::Bearish, false),
        Pattern::new(Family::Reversal, Direction::Bearish, true),
    ];

    pub const fn new(family: Family, direction: Direction, is_plus: bool) -> Self {
        Self {
            family,
            direction,
            is_plus,
        }
    }

    pub fn id(&self) -> PatternId {
        use Direction::*;
        use Family::*;

        PatternId(match (self.family, self.direction, self.is_plus) {
            (Run, Bullish, false) => "RUN_BULL",
            (Run, Bullish, true) => "RUN_BULL_PLUS",
            (Run, Bearish, false) => "RUN_BEAR",
            (Run, Bearish, true) => "RUN_BEAR_PLUS",
            (Reversal, Bullish, false) => "REVERSAL_BULL",
            (Reversal, Bullish, true) => "REVERSAL_BULL_PLUS",
            (Reversal, Bearish, false) => "REVERSAL_BEAR",
            (Reversal, Bearish, true) => "REVERSAL_BEAR_PLUS",
        })
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id().as_str())
    }
}

/// Classification of one bar against its predecessor.
///
/// `pattern` is `None` when no rule fired, including when there is no
/// predecessor. `reasons` lists the conditions that justified the label, in
/// display order; grading never looks at them.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PatternLabel {
    pub pattern: Option<Pattern>,
    pub reasons: Vec<&'static str>,
}

impl PatternLabel {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(pattern: Pattern, reasons: Vec<&'static str>) -> Self {
        Self {
            pattern: Some(pattern),
            reasons,
        }
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.pattern.is_none()
    }

    #[inline]
    pub fn family(&self) -> Option<Family> {
        self.pattern.map(|p| p.family)
    }

    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        self.pattern.map(|p| p.direction)
    }

    #[inline]
    pub fn is_plus(&self) -> bool {
        self.pattern.is_some_and(|p| p.is_plus)
    }

    pub fn id(&self) -> Option<PatternId> {
        self.pattern.map(|p| p.id())
    }
}

// ============================================================
// TESTS
// ============================================================
