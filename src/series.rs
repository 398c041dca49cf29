//! Candle series and per-bar annotation
//!
//! [`CandleSeries`] is a growable series for live charts: extend it with
//! random-walk bars or inject a synthesized pattern. [`annotate`],
//! [`iter_labels`] and [`annotate_parallel`] label every bar of a series
//! against its predecessor.

use rand::Rng;
use rayon::prelude::*;

use crate::{
    detectors::classify_at,
    synth::Synthesizer,
    walk::RandomWalk,
    Candle, OHLCExt, Pattern, PatternLabel, Result, SweepError, OHLC,
};

// ============================================================
// ANNOTATION
// ============================================================

/// Label every bar; the first bar never has a pattern.
pub fn annotate<T: OHLC>(bars: &[T]) -> Vec<PatternLabel> {
    (0..bars.len()).map(|i| classify_at(bars, i)).collect()
}

/// Lazily label every bar
pub fn iter_labels<T: OHLC>(bars: &[T]) -> LabelIterator<'_, T> {
    LabelIterator { bars, current: 0 }
}

/// Check every bar's OHLC invariants, reporting the first bad index
pub fn validate_bars<T: OHLC>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            SweepError::InvalidCandle { reason, .. } => {
                SweepError::InvalidCandle { index: i, reason }
            }
            other => other,
        })?;
    }
    Ok(())
}

/// Label of the bar at `index`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarLabel {
    pub index: usize,
    pub label: PatternLabel,
}

/// Iterator over bars with their labels
pub struct LabelIterator<'a, T: OHLC> {
    bars: &'a [T],
    current: usize,
}

impl<'a, T: OHLC> Iterator for LabelIterator<'a, T> {
    type Item = BarLabel;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.bars.len() {
            return None;
        }

        let index = self.current;
        self.current += 1;

        Some(BarLabel {
            index,
            label: classify_at(self.bars, index),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bars.len().saturating_sub(self.current);
        (remaining, Some(remaining))
    }
}

impl<'a, T: OHLC> ExactSizeIterator for LabelIterator<'a, T> {}

// ============================================================
// PARALLEL ANNOTATION
// ============================================================

/// Labels for one named series
#[derive(Debug)]
pub struct AnnotatedSeries {
    pub symbol: String,
    pub labels: Vec<PatternLabel>,
}

/// Validation failure for one named series
#[derive(Debug)]
pub struct AnnotateError {
    pub symbol: String,
    pub error: SweepError,
}

/// Validate and annotate many independent series in parallel
pub fn annotate_parallel<'a, T, I>(instruments: I) -> (Vec<AnnotatedSeries>, Vec<AnnotateError>)
where
    T: OHLC + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            validate_bars(bars)
                .map(|()| AnnotatedSeries {
                    symbol: symbol.to_string(),
                    labels: annotate(bars),
                })
                .map_err(|error| AnnotateError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// CANDLE SERIES
// ============================================================

/// Growable, contiguous candle series
#[derive(Debug, Clone)]
pub struct CandleSeries {
    candles: Vec<Candle>,
    start_price: f64,
    start_timestamp: i64,
    walk: RandomWalk,
    synthesizer: Synthesizer,
}

impl CandleSeries {
    /// Empty series whose first bar will open at `start_price`
    pub fn new(start_price: f64, start_timestamp: i64) -> Self {
        let walk = RandomWalk::default();
        Self {
            candles: Vec::new(),
            start_price,
            start_timestamp,
            walk,
            synthesizer: Synthesizer::default().with_bar_interval(walk.bar_interval),
        }
    }

    /// Wrap existing candles after validating each of them
    pub fn from_candles(candles: Vec<Candle>) -> Result<Self> {
        validate_bars(&candles)?;
        let (start_price, start_timestamp) =
            candles.first().map_or((0.0, 0), |c| (c.open, c.timestamp));
        let mut series = Self::new(start_price, start_timestamp);
        series.candles = candles;
        Ok(series)
    }

    pub fn with_walk(mut self, walk: RandomWalk) -> Self {
        self.walk = walk;
        self.synthesizer = self.synthesizer.with_bar_interval(walk.bar_interval);
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: Synthesizer) -> Self {
        self.synthesizer = synthesizer.with_bar_interval(self.walk.bar_interval);
        self
    }

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

    #[inline]
    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Open price and timestamp of the next bar
    fn next_origin(&self) -> (f64, i64) {
        match self.candles.last() {
            Some(last) => (
                last.close,
                last.timestamp.saturating_add(self.walk.bar_interval),
            ),
            None => (self.start_price, self.start_timestamp),
        }
    }

    /// Append one random-walk bar
    pub fn push_walk<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Candle {
        let (price, timestamp) = self.next_origin();
        let bar = self.walk.bar_at(rng, price, timestamp);
        self.candles.push(bar);
        bar
    }

    /// Append `count` random-walk bars
    pub fn extend_walk<R: Rng + ?Sized>(&mut self, rng: &mut R, count: usize) {
        let (price, timestamp) = self.next_origin();
        let bars = self.walk.series(rng, price, timestamp, count);
        self.candles.extend(bars);
    }

    /// Append a synthesized pair whose last bar classifies as `pattern`
    pub fn inject<R: Rng + ?Sized>(&mut self, rng: &mut R, pattern: Pattern) -> (Candle, Candle) {
        let (price, timestamp) = self.next_origin();
        let (prev, curr) = self.synthesizer.synthesize(rng, pattern, price, timestamp);
        self.candles.extend([prev, curr]);
        (prev, curr)
    }

    pub fn label_at(&self, index: usize) -> PatternLabel {
        classify_at(&self.candles, index)
    }

    pub fn labels(&self) -> Vec<PatternLabel> {
        annotate(&self.candles)
    }

    pub fn iter_labels(&self) -> LabelIterator<'_, Candle> {
        iter_labels(&self.candles)
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{Direction, Family};

    #[test]
    fn test_annotate_first_bar_is_none() {
        let mut series = CandleSeries::new(100.0, 0);
        let mut rng = StdRng::seed_from_u64(5);
        series.extend_walk(&mut rng, 30);

        let labels = series.labels();
        assert_eq!(labels.len(), 30);
        assert!(labels[0].is_none());
    }

    #[test]
    fn test_annotate_empty() {
        let bars: Vec<Candle> = vec![];
        assert!(annotate(&bars).is_empty());
        assert_eq!(iter_labels(&bars).len(), 0);
    }

    #[test]
    fn test_iterator_matches_annotate() {
        let mut series = CandleSeries::new(100.0, 0);
        let mut rng = StdRng::seed_from_u64(6);
        series.extend_walk(&mut rng, 40);

        let eager = series.labels();
        let lazy: Vec<_> = series.iter_labels().collect();
        assert_eq!(lazy.len(), eager.len());
        for (bar_label, label) in lazy.iter().zip(&eager) {
            assert_eq!(&bar_label.label, label);
        }
        assert_eq!(lazy[7].index, 7);
    }

    #[test]
    fn test_inject_is_contiguous_and_labelled() {
        let mut series = CandleSeries::new(100.0, 0);
        let mut rng = StdRng::seed_from_u64(7);
        series.extend_walk(&mut rng, 10);

        let before = *series.last().unwrap();
        let pattern = Pattern::new(Family::Reversal, Direction::Bearish, true);
        let (prev, curr) = series.inject(&mut rng, pattern);

        assert_eq!(series.len(), 12);
        assert_eq!(prev.open, before.close);
        assert_eq!(prev.timestamp, before.timestamp + 60);
        assert_eq!(curr.timestamp, prev.timestamp + 60);
        assert_eq!(series.label_at(11).pattern, Some(pattern));
    }

    #[test]
    fn test_push_walk_on_empty_uses_start() {
        let mut series = CandleSeries::new(250.0, 1_000);
        let mut rng = StdRng::seed_from_u64(8);

        let bar = series.push_walk(&mut rng);
        assert_eq!(bar.open, 250.0);
        assert_eq!(bar.timestamp, 1_000);

        let next = series.push_walk(&mut rng);
        assert_eq!(next.open, bar.close);
        assert_eq!(next.timestamp, 1_060);
    }

    #[test]
    fn test_with_walk_sets_interval() {
        let walk = RandomWalk::new(2.0, 300).unwrap();
        let mut series = CandleSeries::new(100.0, 0).with_walk(walk);
        let mut rng = StdRng::seed_from_u64(9);

        series.push_walk(&mut rng);
        let (prev, curr) =
            series.inject(&mut rng, Pattern::new(Family::Run, Direction::Bullish, false));
        assert_eq!(prev.timestamp, 300);
        assert_eq!(curr.timestamp, 600);
    }

    #[test]
    fn test_from_candles_rejects_invalid() {
        let good = Candle::new(100.0, 105.0, 95.0, 102.0, 0).unwrap();
        let bad = Candle {
            open: 100.0,
            high: 99.0,
            low: 95.0,
            close: 102.0,
            timestamp: 60,
        };

        assert!(CandleSeries::from_candles(vec![good]).is_ok());
        let err = CandleSeries::from_candles(vec![good, bad]).unwrap_err();
        assert!(matches!(err, SweepError::InvalidCandle { index: 1, .. }));
    }

    #[test]
    fn test_parallel_annotate() {
        let mut rng = StdRng::seed_from_u64(10);
        let walk = RandomWalk::default();
        let a = walk.series(&mut rng, 100.0, 0, 50);
        let b = walk.series(&mut rng, 20.0, 0, 80);
        let mut c = a.clone();
        c[3].high = c[3].low - 1.0;

        let instruments: Vec<(&str, &[Candle])> = vec![("BTC", &a), ("ETH", &b), ("BAD", &c)];
        let (results, errors) = annotate_parallel(instruments);

        assert_eq!(results.len(), 2);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "BAD");
        assert!(matches!(
            errors[0].error,
            SweepError::InvalidCandle { index: 3, .. }
        ));

        let btc = results.iter().find(|r| r.symbol == "BTC").unwrap();
        assert_eq!(btc.labels, annotate(&a));
    }
}
