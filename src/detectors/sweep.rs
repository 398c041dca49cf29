//! Rule table and classifier

use super::helpers::{
    bear_grab, bull_grab, plus_bear, plus_bull, REASON_CLOSE_ABOVE_CLOSE,
    REASON_CLOSE_ABOVE_OPEN, REASON_CLOSE_BELOW_CLOSE, REASON_CLOSE_BELOW_OPEN,
    REASON_GRAB_HIGH, REASON_GRAB_LOW, REASON_PLUS_BEAR, REASON_PLUS_BULL, REASON_REVERSAL_BEAR,
    REASON_REVERSAL_BULL, REASON_RUN_BEAR, REASON_RUN_BULL,
};
use crate::{Direction, Family, OHLCExt, Pattern, PatternLabel, OHLC};

/// One liquidity-sweep rule. Each requires a distinct colour combination of
/// the current and previous bar, so at most one can match a given pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepRule {
    RunBull,
    RunBear,
    ReversalBull,
    ReversalBear,
}

impl SweepRule {
    /// Evaluation order. The first matching rule labels the bar.
    pub const PRIORITY: [SweepRule; 4] = [
        SweepRule::RunBull,
        SweepRule::RunBear,
        SweepRule::ReversalBull,
        SweepRule::ReversalBear,
    ];

    #[inline]
    pub const fn family(self) -> Family {
        match self {
            SweepRule::RunBull | SweepRule::RunBear => Family::Run,
            SweepRule::ReversalBull | SweepRule::ReversalBear => Family::Reversal,
        }
    }

    #[inline]
    pub const fn direction(self) -> Direction {
        match self {
            SweepRule::RunBull | SweepRule::ReversalBull => Direction::Bullish,
            SweepRule::RunBear | SweepRule::ReversalBear => Direction::Bearish,
        }
    }

    /// Previous-bar price the current close has to clear: the close for a
    /// run, the open for a reversal.
    #[inline]
    fn strength_level<T: OHLC>(self, prev: &T) -> f64 {
        match self.family() {
            Family::Run => prev.close(),
            Family::Reversal => prev.open(),
        }
    }

    pub fn matches<T: OHLC>(self, curr: &T, prev: &T) -> bool {
        let direction = self.direction();
        if curr.direction() != Some(direction)
            || prev.direction() != Some(self.family().prev_direction(direction))
        {
            return false;
        }

        let level = self.strength_level(prev);
        match direction {
            Direction::Bullish => bull_grab(curr, prev) && curr.close() > level,
            Direction::Bearish => bear_grab(curr, prev) && curr.close() < level,
        }
    }

    #[inline]
    pub fn is_plus<T: OHLC>(self, curr: &T, prev: &T) -> bool {
        match self.direction() {
            Direction::Bullish => plus_bull(curr, prev),
            Direction::Bearish => plus_bear(curr, prev),
        }
    }

    #[inline]
    pub fn pattern(self, is_plus: bool) -> Pattern {
        Pattern::new(self.family(), self.direction(), is_plus)
    }

    pub fn reasons(self, is_plus: bool) -> Vec<&'static str> {
        let mut reasons = match self {
            SweepRule::RunBull => vec![REASON_RUN_BULL, REASON_GRAB_LOW, REASON_CLOSE_ABOVE_CLOSE],
            SweepRule::RunBear => {
                vec![REASON_RUN_BEAR, REASON_GRAB_HIGH, REASON_CLOSE_BELOW_CLOSE]
            }
            SweepRule::ReversalBull => {
                vec![REASON_REVERSAL_BULL, REASON_GRAB_LOW, REASON_CLOSE_ABOVE_OPEN]
            }
            SweepRule::ReversalBear => {
                vec![REASON_REVERSAL_BEAR, REASON_GRAB_HIGH, REASON_CLOSE_BELOW_OPEN]
            }
        };
        if is_plus {
            reasons.push(match self.direction() {
                Direction::Bullish => REASON_PLUS_BULL,
                Direction::Bearish => REASON_PLUS_BEAR,
            });
        }
        reasons
    }

    /// Label the pair, or `None` if this rule does not match it
    pub fn apply<T: OHLC>(self, curr: &T, prev: &T) -> Option<PatternLabel> {
        if !self.matches(curr, prev) {
            return None;
        }
        let is_plus = self.is_plus(curr, prev);
        Some(PatternLabel::new(self.pattern(is_plus), self.reasons(is_plus)))
    }
}

/// Classify `curr` against its predecessor.
///
/// Total and pure: without a predecessor, or when no rule fires, the label
/// carries no pattern and no reasons.
pub fn classify<T: OHLC>(curr: &T, prev: Option<&T>) -> PatternLabel {
    let Some(prev) = prev else {
        return PatternLabel::none();
    };

    SweepRule::PRIORITY
        .iter()
        .find_map(|rule| rule.apply(curr, prev))
        .unwrap_or_default()
}

/// Classify the bar at `index` against `bars[index - 1]`.
/// Out-of-range indices yield an empty label.
pub fn classify_at<T: OHLC>(bars: &[T], index: usize) -> PatternLabel {
    let Some(curr) = bars.get(index) else {
        return PatternLabel::none();
    };
    let prev = index.checked_sub(1).and_then(|i| bars.get(i));
    classify(curr, prev)
}
