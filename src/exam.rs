//! Practice exam: generate a scenario, take a guess, grade it, keep score.
//!
//! Each round builds a random-walk lead-in and then, with probability
//! `pattern_probability`, appends a synthesized pattern pair; otherwise two
//! more random bars. The player guesses the label of the last bar and is
//! graded against the classifier.
//!
//! ```text
//!   new_scenario()          submit_guess()
//! ─────────────────► Guessing ─────────────► Result
//!        ▲                                     │
//!        └──────────── new_scenario() ─────────┘
//! ```

use std::collections::HashMap;

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    detectors::classify_at,
    params::{get_count, get_probability, get_value, ParamMeta, Tunable},
    synth::{SynthesisTuning, Synthesizer, MAX_START_PRICE},
    walk::{RandomWalk, DEFAULT_BAR_INTERVAL, DEFAULT_VOLATILITY},
    BarCount, Candle, Direction, Family, Pattern, PatternLabel, Probability, Result, SweepError,
};

/// (family, direction) combinations drawn for injected patterns
const TARGETS: [(Family, Direction); 4] = [
    (Family::Run, Direction::Bullish),
    (Family::Run, Direction::Bearish),
    (Family::Reversal, Direction::Bullish),
    (Family::Reversal, Direction::Bearish),
];

static EXAM_PARAMS: [ParamMeta; 3] = [
    ParamMeta::count(
        "lead_in",
        15.0,
        (1.0, 200.0, 1.0),
        "Random-walk bars before the graded pair",
    ),
    ParamMeta::probability(
        "pattern_probability",
        0.8,
        (0.0, 1.0, 0.1),
        "Chance that a round ends in a synthesized pattern",
    ),
    ParamMeta::distance(
        "volatility",
        DEFAULT_VOLATILITY,
        (0.0, 100.0, 0.5),
        "Random-walk volatility",
    ),
];

// ============================================================
// CONFIG
// ============================================================

/// Exam session configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamConfig {
    pub lead_in: BarCount,
    pub pattern_probability: Probability,
    pub volatility: f64,
    pub start_price: f64,
    pub start_timestamp: i64,
    pub bar_interval: i64,
    /// Points for a correct guess with no streak
    pub base_points: u64,
    /// Extra points per streak step
    pub streak_bonus: u64,
    pub tuning: SynthesisTuning,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            lead_in: BarCount::new_const(15),
            pattern_probability: Probability::new_const(0.8),
            volatility: DEFAULT_VOLATILITY,
            start_price: 100.0,
            start_timestamp: 0,
            bar_interval: DEFAULT_BAR_INTERVAL,
            base_points: 100,
            streak_bonus: 20,
            tuning: SynthesisTuning::default(),
        }
    }
}

impl ExamConfig {
    pub fn validate(&self) -> Result<()> {
        EXAM_PARAMS[0].validate(self.lead_in.get() as f64)?;
        EXAM_PARAMS[1].validate(self.pattern_probability.get())?;
        EXAM_PARAMS[2].validate(self.volatility)?;
        // Worst-case lead-in drift must keep the graded pair synthesizable
        let drift = self.lead_in.get() as f64 * self.volatility * 2.0;
        if !self.start_price.is_finite() || self.start_price.abs() + drift > MAX_START_PRICE {
            return Err(SweepError::InvalidConfig(format!(
                "{}: start_price {} leaves the synthesizable range (max {MAX_START_PRICE})",
                Self::section(),
                self.start_price
            )));
        }
        if self.bar_interval <= 0 {
            return Err(SweepError::InvalidConfig(format!(
                "{}: bar_interval must be > 0, got {}",
                Self::section(),
                self.bar_interval
            )));
        }
        self.tuning.validate()
    }
}

impl Tunable for ExamConfig {
    fn param_meta() -> &'static [ParamMeta] {
        &EXAM_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let d = Self::default();
        let config = Self {
            lead_in: get_count(params, "lead_in", d.lead_in.get())?,
            pattern_probability: get_probability(
                params,
                "pattern_probability",
                d.pattern_probability.get(),
            )?,
            volatility: get_value(params, "volatility", d.volatility),
            ..d
        };
        config.validate()?;
        Ok(config)
    }

    fn section() -> &'static str {
        "exam"
    }
}

// ============================================================
// SCENARIO & GRADING TYPES
// ============================================================

/// A generated series. The true label is recomputed from the last two bars
/// on demand, never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExamScenario {
    candles: Vec<Candle>,
}

impl ExamScenario {
    #[inline]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Label of the last bar against the one before it
    pub fn actual_label(&self) -> PatternLabel {
        classify_at(&self.candles, self.candles.len().saturating_sub(1))
    }
}

/// A player's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Guess {
    Pattern(Pattern),
    /// Explicit "no pattern" choice
    NoPattern,
}

impl Guess {
    /// Exact match: a pattern guess must agree on family, direction and plus
    pub fn is_correct(&self, actual: &PatternLabel) -> bool {
        match self {
            Guess::NoPattern => actual.is_none(),
            Guess::Pattern(p) => actual.pattern == Some(*p),
        }
    }
}

impl From<Pattern> for Guess {
    fn from(pattern: Pattern) -> Self {
        Guess::Pattern(pattern)
    }
}

/// Outcome of one graded guess
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeResult {
    pub guess: Guess,
    pub correct: bool,
    pub actual: PatternLabel,
    /// Points awarded for this guess
    pub points: u64,
}

impl GradeResult {
    /// Reasons behind the actual label, shown only after a wrong guess
    pub fn explanation(&self) -> Option<&[&'static str]> {
        (!self.correct).then_some(self.actual.reasons.as_slice())
    }
}

/// Session score
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub score: u64,
    pub streak: u32,
}

impl ScoreState {
    /// Apply one graded guess, returning the points awarded.
    ///
    /// Correct: `base + streak * bonus`, then the streak grows.
    /// Incorrect: the streak resets.
    pub(crate) fn record(&mut self, correct: bool, base: u64, bonus: u64) -> u64 {
        if !correct {
            self.streak = 0;
            return 0;
        }
        let points = base.saturating_add(u64::from(self.streak).saturating_mul(bonus));
        self.score = self.score.saturating_add(points);
        self.streak = self.streak.saturating_add(1);
        points
    }
}

/// Round state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamState {
    Guessing,
    Result(GradeResult),
}

// ============================================================
// ENGINE
// ============================================================

/// One exam session. Owns its RNG and score.
#[derive(Debug)]
pub struct ExamEngine<R: Rng = StdRng> {
    config: ExamConfig,
    walk: RandomWalk,
    synthesizer: Synthesizer,
    rng: R,
    scenario: ExamScenario,
    state: ExamState,
    score: ScoreState,
}

impl<R: Rng> ExamEngine<R> {
    fn from_parts(config: ExamConfig, rng: R) -> Self {
        let walk = RandomWalk {
            volatility: config.volatility,
            bar_interval: config.bar_interval,
        };
        let synthesizer =
            Synthesizer::from_validated(config.tuning).with_bar_interval(config.bar_interval);

        let mut engine = Self {
            config,
            walk,
            synthesizer,
            rng,
            scenario: ExamScenario::default(),
            state: ExamState::Guessing,
            score: ScoreState::default(),
        };
        engine.new_scenario();
        engine
    }

    /// Start a new round: regenerate the scenario and move to `Guessing`
    pub fn new_scenario(&mut self) -> &ExamScenario {
        let cfg = &self.config;
        let mut candles = self.walk.series(
            &mut self.rng,
            cfg.start_price,
            cfg.start_timestamp,
            cfg.lead_in.get(),
        );
        let (price, timestamp) = candles.last().map_or(
            (cfg.start_price, cfg.start_timestamp),
            |last| (last.close, last.timestamp.saturating_add(cfg.bar_interval)),
        );

        if self.rng.gen_bool(cfg.pattern_probability.get()) {
            let (family, direction) = TARGETS[self.rng.gen_range(0..TARGETS.len())];
            let pattern = Pattern::new(family, direction, self.rng.gen_bool(0.5));
            let (prev, curr) = self
                .synthesizer
                .synthesize(&mut self.rng, pattern, price, timestamp);
            candles.extend([prev, curr]);
            debug!(%pattern, bars = candles.len(), "new scenario with injected pattern");
        } else {
            let first = self.walk.bar_at(&mut self.rng, price, timestamp);
            let second = self.walk.next_bar(&mut self.rng, &first);
            candles.extend([first, second]);
            debug!(bars = candles.len(), "new scenario with random ending");
        }

        self.scenario = ExamScenario { candles };
        self.state = ExamState::Guessing;
        &self.scenario
    }

    /// Grade `guess` against the current scenario.
    ///
    /// Only valid while `Guessing`; otherwise nothing changes and `None` is
    /// returned, so a repeated submission cannot be scored twice.
    pub fn submit_guess(&mut self, guess: Guess) -> Option<GradeResult> {
        if self.state != ExamState::Guessing {
            trace!(?guess, "guess ignored outside guessing state");
            return None;
        }

        let actual = self.scenario.actual_label();
        let correct = guess.is_correct(&actual);
        let points = self
            .score
            .record(correct, self.config.base_points, self.config.streak_bonus);

        debug!(
            ?guess,
            actual = ?actual.id(),
            correct,
            points,
            score = self.score.score,
            streak = self.score.streak,
            "guess graded"
        );

        let result = GradeResult {
            guess,
            correct,
            actual,
            points,
        };
        self.state = ExamState::Result(result.clone());
        Some(result)
    }

    /// Start a new session: zero the score and generate a fresh scenario
    pub fn reset(&mut self) {
        self.score = ScoreState::default();
        self.new_scenario();
    }

    #[inline]
    pub fn scenario(&self) -> &ExamScenario {
        &self.scenario
    }

    #[inline]
    pub fn state(&self) -> &ExamState {
        &self.state
    }

    #[inline]
    pub fn score(&self) -> ScoreState {
        self.score
    }

    #[inline]
    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    /// Result of the current round, if it has been graded
    pub fn last_result(&self) -> Option<&GradeResult> {
        match &self.state {
            ExamState::Result(result) => Some(result),
            ExamState::Guessing => None,
        }
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`ExamEngine`]
#[derive(Debug, Clone, Default)]
pub struct ExamBuilder {
    config: ExamConfig,
}

impl ExamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing config (e.g. deserialized)
    pub fn from_config(config: ExamConfig) -> Self {
        Self { config }
    }

    pub fn lead_in(mut self, bars: BarCount) -> Self {
        self.config.lead_in = bars;
        self
    }

    pub fn pattern_probability(mut self, probability: Probability) -> Self {
        self.config.pattern_probability = probability;
        self
    }

    pub fn volatility(mut self, volatility: f64) -> Self {
        self.config.volatility = volatility;
        self
    }

    pub fn start_price(mut self, price: f64) -> Self {
        self.config.start_price = price;
        self
    }

    pub fn start_timestamp(mut self, timestamp: i64) -> Self {
        self.config.start_timestamp = timestamp;
        self
    }

    pub fn bar_interval(mut self, interval: i64) -> Self {
        self.config.bar_interval = interval;
        self
    }

    pub fn scoring(mut self, base_points: u64, streak_bonus: u64) -> Self {
        self.config.base_points = base_points;
        self.config.streak_bonus = streak_bonus;
        self
    }

    pub fn tuning(mut self, tuning: SynthesisTuning) -> Self {
        self.config.tuning = tuning;
        self
    }

    /// Build with an entropy-seeded RNG
    pub fn build(self) -> Result<ExamEngine<StdRng>> {
        self.build_with_rng(StdRng::from_entropy())
    }

    /// Build with a fixed seed for deterministic replay
    pub fn build_seeded(self, seed: u64) -> Result<ExamEngine<StdRng>> {
        self.build_with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn build_with_rng<R: Rng>(self, rng: R) -> Result<ExamEngine<R>> {
        self.config.validate()?;
        Ok(ExamEngine::from_parts(self.config, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrong_guess(actual: &PatternLabel) -> Guess {
        match actual.pattern {
            Some(p) => Guess::Pattern(Pattern {
                is_plus: !p.is_plus,
                ..p
            }),
            None => Guess::Pattern(Pattern::ALL[0]),
        }
    }

    fn right_guess(actual: &PatternLabel) -> Guess {
        actual.pattern.map_or(Guess::NoPattern, Guess::Pattern)
    }

    #[test]
    fn test_score_record_formula() {
        let mut score = ScoreState::default();
        assert_eq!(score.record(true, 100, 20), 100);
        assert_eq!(score.record(true, 100, 20), 120);
        assert_eq!(score.record(true, 100, 20), 140);
        assert_eq!(score, ScoreState { score: 360, streak: 3 });

        assert_eq!(score.record(false, 100, 20), 0);
        assert_eq!(score, ScoreState { score: 360, streak: 0 });
        assert_eq!(score.record(true, 100, 20), 100);
    }

    #[test]
    fn test_new_engine_is_guessing() {
        let exam = ExamBuilder::new().build_seeded(1).unwrap();
        assert_eq!(exam.state(), &ExamState::Guessing);
        assert_eq!(exam.scenario().len(), 17);
        assert_eq!(exam.score(), ScoreState::default());
        assert!(exam.last_result().is_none());
    }

    #[test]
    fn test_scenario_is_contiguous() {
        let mut exam = ExamBuilder::new().build_seeded(2).unwrap();
        for _ in 0..20 {
            let scenario = exam.new_scenario().clone();
            for pair in scenario.candles().windows(2) {
                assert_eq!(pair[1].open, pair[0].close);
                assert_eq!(pair[1].timestamp, pair[0].timestamp + 60);
            }
        }
    }

    #[test]
    fn test_second_submit_is_noop() {
        let mut exam = ExamBuilder::new().build_seeded(3).unwrap();
        let actual = exam.scenario().actual_label();

        let first = exam.submit_guess(right_guess(&actual)).unwrap();
        assert!(first.correct);
        let after_first = exam.score();

        assert!(exam.submit_guess(right_guess(&actual)).is_none());
        assert_eq!(exam.score(), after_first);
        assert_eq!(exam.last_result(), Some(&first));
    }

    #[test]
    fn test_wrong_guess_explains() {
        let mut exam = ExamBuilder::new().build_seeded(4).unwrap();
        let actual = exam.scenario().actual_label();

        let result = exam.submit_guess(wrong_guess(&actual)).unwrap();
        assert!(!result.correct);
        assert_eq!(result.points, 0);
        assert_eq!(result.explanation(), Some(actual.reasons.as_slice()));
        assert_eq!(exam.score().streak, 0);
    }

    #[test]
    fn test_right_guess_hides_explanation() {
        let mut exam = ExamBuilder::new().build_seeded(5).unwrap();
        let actual = exam.scenario().actual_label();

        let result = exam.submit_guess(right_guess(&actual)).unwrap();
        assert!(result.correct);
        assert_eq!(result.explanation(), None);
    }

    #[test]
    fn test_always_pattern_when_probability_one() {
        let mut exam = ExamBuilder::new()
            .pattern_probability(Probability::new(1.0).unwrap())
            .build_seeded(6)
            .unwrap();
        for _ in 0..50 {
            assert!(!exam.new_scenario().actual_label().is_none());
        }
    }

    #[test]
    fn test_reset_zeroes_score() {
        let mut exam = ExamBuilder::new().build_seeded(7).unwrap();
        let actual = exam.scenario().actual_label();
        exam.submit_guess(right_guess(&actual));
        assert!(exam.score().score > 0);

        exam.reset();
        assert_eq!(exam.score(), ScoreState::default());
        assert_eq!(exam.state(), &ExamState::Guessing);
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        assert!(ExamBuilder::new().volatility(-1.0).build_seeded(0).is_err());
        assert!(ExamBuilder::new().bar_interval(0).build_seeded(0).is_err());
        assert!(ExamBuilder::new()
            .start_price(f64::INFINITY)
            .build_seeded(0)
            .is_err());
        let tuning = SynthesisTuning {
            plus_buffer: 0.0,
            ..Default::default()
        };
        assert!(ExamBuilder::new().tuning(tuning).build_seeded(0).is_err());
    }

    #[test]
    fn test_builder_rejects_tuning_that_fails_round_trip() {
        let tuning = SynthesisTuning {
            prev_wick: 2.0,
            regular_buffer: 2.0 - 1e-9,
            ..Default::default()
        };
        assert!(matches!(
            ExamBuilder::new().tuning(tuning).build_seeded(0),
            Err(SweepError::TuningRejected { .. })
        ));
    }

    #[test]
    fn test_config_errors_name_section() {
        let err = ExamBuilder::new()
            .start_price(MAX_START_PRICE)
            .build_seeded(0)
            .unwrap_err();
        assert!(err.to_string().contains("exam: start_price"));

        // Zero volatility means no drift, so the bound itself is accepted
        assert!(ExamBuilder::new()
            .start_price(MAX_START_PRICE)
            .volatility(0.0)
            .build_seeded(0)
            .is_ok());

        let err = ExamBuilder::new().bar_interval(-5).build_seeded(0).unwrap_err();
        assert!(err.to_string().contains("exam: bar_interval"));
    }

    #[test]
    fn test_config_with_params() {
        let mut params = HashMap::new();
        params.insert("lead_in", 30.0);
        params.insert("pattern_probability", 0.5);

        let config = ExamConfig::with_params(&params).unwrap();
        assert_eq!(config.lead_in.get(), 30);
        assert_eq!(config.pattern_probability.get(), 0.5);
        assert_eq!(config.volatility, DEFAULT_VOLATILITY);

        params.insert("pattern_probability", 1.2);
        assert!(ExamConfig::with_params(&params).is_err());
        assert_eq!(ExamConfig::section(), "exam");
    }

    #[test]
    fn test_config_from_json() {
        let config: ExamConfig =
            serde_json::from_str(r#"{ "lead_in": 20, "tuning": { "jitter": 1.0 } }"#).unwrap();
        assert_eq!(config.lead_in.get(), 20);
        assert_eq!(config.tuning.jitter, 1.0);
        assert_eq!(config.base_points, 100);
        assert!(config.validate().is_ok());

        assert!(serde_json::from_str::<ExamConfig>(r#"{ "lead_in": 0 }"#).is_err());
        assert!(serde_json::from_str::<ExamConfig>(r#"{ "pattern_probability": 2.0 }"#).is_err());
    }
}
