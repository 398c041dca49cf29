//! Parameter metadata for tunable configurations
//!
//! Every numeric knob of [`SynthesisTuning`](crate::synth::SynthesisTuning)
//! and [`ExamConfig`](crate::exam::ExamConfig) is described by a [`ParamMeta`]
//! carrying its default and validity range. This enables:
//! - Range validation at construction time
//! - Grid sweeps when re-validating synthesis constants
//! - Building configs from a flat key/value map
//!
//! # Example
//!
//! ```rust
//! use sweeplab::prelude::*;
//!
//! for param in SynthesisTuning::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//! ```

use std::collections::HashMap;

use crate::{BarCount, Probability, Result, SweepError};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Price distance (non-negative, in price units)
  Distance,
  /// Probability in 0.0..=1.0
  Probability,
  /// Bar count (positive integer)
  Count,
}

/// Metadata for a single tunable parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "grab_amount")
  pub name: &'static str,
  /// Parameter type (Distance, Probability or Count)
  pub param_type: ParamType,
  /// Default value, as used by `Default` on the owning config
  pub default: f64,
  /// Validity range and grid step: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a price-distance parameter
  pub const fn distance(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Distance, default, range, description }
  }

  /// Create a new ParamMeta for a Probability parameter
  pub const fn probability(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Probability, default, range, description }
  }

  /// Create a new ParamMeta for a bar-count parameter
  pub const fn count(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Count, default, range, description }
  }

  /// Generate all values for a grid sweep
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    if !value.is_finite() {
      return Err(SweepError::InvalidValue("parameter cannot be NaN or infinite"));
    }
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(SweepError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Distance => Ok(()),
      ParamType::Probability => Probability::new(value).map(|_| ()),
      ParamType::Count => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(SweepError::InvalidValue("Count must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// TUNABLE TRAIT
// ============================================================

/// Configurations that can be described and rebuilt from flat parameters
pub trait Tunable: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a validated config from a key/value map.
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Config section name, used as a prefix in logs and error messages
  fn section() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a raw value from params with default fallback
pub fn get_value(params: &HashMap<&str, f64>, key: &str, default: f64) -> f64 {
  params.get(key).copied().unwrap_or(default)
}

/// Helper to get a Probability from params with default fallback
pub fn get_probability(
  params: &HashMap<&str, f64>,
  key: &str,
  default: f64,
) -> Result<Probability> {
  Probability::new(get_value(params, key, default))
}

/// Helper to get a BarCount from params with default fallback
pub fn get_count(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<BarCount> {
  let value = get_value(params, key, default as f64);
  if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
    return Err(SweepError::InvalidValue("Count must be a positive integer"));
  }
  BarCount::new(value as usize)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_distance() {
    let meta = ParamMeta::distance("grab", 2.5, (0.5, 10.0, 0.5), "Sweep distance");

    assert_eq!(meta.name, "grab");
    assert_eq!(meta.param_type, ParamType::Distance);
    assert_eq!(meta.default, 2.5);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::probability("p", 0.5, (0.25, 0.75, 0.25), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.25).abs() < f64::EPSILON);
    assert!((grid[1] - 0.5).abs() < f64::EPSILON);
    assert!((grid[2] - 0.75).abs() < f64::EPSILON);
  }

  #[test]
  fn test_validate_distance() {
    let meta = ParamMeta::distance("d", 1.5, (0.0, 2.5, 0.5), "Test");

    assert!(meta.validate(0.0).is_ok());
    assert!(meta.validate(2.5).is_ok());
    assert!(meta.validate(-0.1).is_err());
    assert!(meta.validate(2.6).is_err());
    assert!(meta.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_validate_count() {
    let meta = ParamMeta::count("lead_in", 15.0, (1.0, 100.0, 1.0), "Test");

    assert!(meta.validate(15.0).is_ok());
    assert!(meta.validate(1.0).is_ok());
    assert!(meta.validate(0.0).is_err());
    assert!(meta.validate(2.5).is_err());
  }

  #[test]
  fn test_get_helpers() {
    let mut params = HashMap::new();
    params.insert("p", 0.3);
    params.insert("n", 20.0);
    params.insert("bad", 1.5);

    assert!((get_probability(&params, "p", 0.8).unwrap().get() - 0.3).abs() < f64::EPSILON);
    assert!((get_probability(&params, "q", 0.8).unwrap().get() - 0.8).abs() < f64::EPSILON);
    assert_eq!(get_count(&params, "n", 15).unwrap().get(), 20);
    assert_eq!(get_count(&params, "m", 15).unwrap().get(), 15);
    assert!(get_count(&params, "bad", 15).is_err());
    assert!(get_probability(&params, "n", 0.8).is_err());
  }
}
