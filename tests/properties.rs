//! Property tests for classifier/synthesizer invariants.

use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use sweeplab::prelude::*;

fn any_pattern() -> impl Strategy<Value = Pattern> {
    (0..Pattern::ALL.len()).prop_map(|i| Pattern::ALL[i])
}

/// Valid candle built from a body and two non-negative wicks
fn valid_candle() -> impl Strategy<Value = Candle> {
    (
        -1_000.0f64..1_000.0, // open
        -50.0f64..50.0,       // change
        0.0f64..20.0,         // upper wick
        0.0f64..20.0,         // lower wick
    )
        .prop_map(|(open, change, upper, lower)| {
            let close = open + change;
            Candle {
                open,
                high: open.max(close) + upper,
                low: open.min(close) - lower,
                close,
                timestamp: 0,
            }
        })
}

proptest! {
    #[test]
    fn synthesize_round_trips(pattern in any_pattern(), start in -1.0e6f64..1.0e6) {
        let (prev, curr) = synthesize(pattern, start);
        prop_assert_eq!(classify(&curr, Some(&prev)).pattern, Some(pattern));
    }

    #[test]
    fn synthesized_candles_are_valid(pattern in any_pattern(), start in -1.0e6f64..1.0e6) {
        let (prev, curr) = synthesize(pattern, start);
        prop_assert!(prev.validate().is_ok());
        prop_assert!(curr.validate().is_ok());
        prop_assert_eq!(curr.open, prev.close);
    }

    #[test]
    fn jittered_synthesis_round_trips(
        pattern in any_pattern(),
        start in -1.0e5f64..1.0e5,
        jitter in 0.0f64..5.0,
        seed in any::<u64>(),
    ) {
        let tuning = SynthesisTuning { jitter, ..Default::default() };
        let synth = Synthesizer::new(tuning).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        let (prev, curr) = synth.synthesize(&mut rng, pattern, start, 0);
        prop_assert_eq!(classify(&curr, Some(&prev)).pattern, Some(pattern));
    }

    #[test]
    fn random_walk_preserves_invariants(
        prev_close in -1.0e6f64..1.0e6,
        volatility in 0.0f64..100.0,
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let bar = generate_walk(&mut rng, prev_close, volatility);
        prop_assert!(bar.validate().is_ok());
        prop_assert_eq!(bar.open, prev_close);
    }

    #[test]
    fn classify_is_deterministic(prev in valid_candle(), curr in valid_candle()) {
        prop_assert_eq!(classify(&curr, Some(&prev)), classify(&curr, Some(&prev)));
    }

    #[test]
    fn classify_without_prev_is_none(curr in valid_candle()) {
        prop_assert!(classify(&curr, None).is_none());
    }

    #[test]
    fn matched_label_agrees_with_bar_colours(prev in valid_candle(), curr in valid_candle()) {
        let label = classify(&curr, Some(&prev));
        if let Some(pattern) = label.pattern {
            prop_assert_eq!(curr.direction(), Some(pattern.direction));
            prop_assert_eq!(
                prev.direction(),
                Some(pattern.family.prev_direction(pattern.direction))
            );
            match pattern.direction {
                Direction::Bullish => prop_assert!(curr.low < prev.low),
                Direction::Bearish => prop_assert!(curr.high > prev.high),
            }
        } else {
            prop_assert!(label.reasons.is_empty());
        }
    }
}
