//! JSON-safe numeric coercion.
//!
//! Every number that reaches an artifact passes through [`sanitize`]: missing,
//! unparseable, NaN and infinite inputs all become `0`. The source tables are
//! known to carry blanks and non-numeric markers, so this is silent.

use serde::Serialize;

/// A finite number ready for JSON encoding.
///
/// Integers serialize without a fractional part (`5`), floats keep theirs (`5.0`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

/// Anything that may or may not hold a number.
pub trait NumericLike {
    fn to_f64(&self) -> Option<f64>;
}

impl NumericLike for f64 {
    fn to_f64(&self) -> Option<f64> {
        Some(*self)
    }
}

impl NumericLike for str {
    fn to_f64(&self) -> Option<f64> {
        self.trim().parse::<f64>().ok()
    }
}

impl NumericLike for String {
    fn to_f64(&self) -> Option<f64> {
        self.as_str().to_f64()
    }
}

impl<T: NumericLike + ?Sized> NumericLike for &T {
    fn to_f64(&self) -> Option<f64> {
        (**self).to_f64()
    }
}

impl<T: NumericLike> NumericLike for Option<T> {
    fn to_f64(&self) -> Option<f64> {
        self.as_ref().and_then(|v| v.to_f64())
    }
}

/// Coerce `value` to a finite number, optionally rounded to `decimals` places.
///
/// `Some(0)` produces [`Number::Int`]. Rounding is half to even on the exact
/// binary value, so `2.5` rounds to `2` and `2.675` (stored just below) to `2.67`.
pub fn sanitize<V: NumericLike>(value: V, decimals: Option<u32>) -> Number {
    let Some(f) = value.to_f64() else {
        return Number::Int(0);
    };
    if !f.is_finite() {
        return Number::Int(0);
    }

    match decimals {
        None => Number::Float(f),
        Some(0) => Number::Int(round_to(f, 0) as i64),
        Some(d) => Number::Float(round_to(f, d)),
    }
}

/// Fixed-precision formatting rounds the exact decimal expansion, ties to even.
fn round_to(value: f64, decimals: u32) -> f64 {
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}

/// Parse one raw CSV field. Returns the value and whether a substitution to
/// `0.0` happened (non-empty but unparseable, or non-finite).
pub fn coerce_field(raw: &str) -> (f64, bool) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return (0.0, false);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => (v, false),
        _ => (0.0, true),
    }
}

/// Non-finite values become `0.0`; used on polars-cast cells.
pub fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_and_missing_become_zero() {
        assert_eq!(sanitize(f64::NAN, None), Number::Int(0));
        assert_eq!(sanitize(f64::INFINITY, None), Number::Int(0));
        assert_eq!(sanitize(f64::NEG_INFINITY, Some(2)), Number::Int(0));
        assert_eq!(sanitize(None::<f64>, None), Number::Int(0));
        assert_eq!(sanitize("not a number", Some(1)), Number::Int(0));
        assert_eq!(sanitize("", None), Number::Int(0));
    }

    #[test]
    fn rounds_to_requested_places() {
        assert_eq!(sanitize(3.14159, Some(2)), Number::Float(3.14));
        assert_eq!(sanitize("  12.345 ", Some(1)), Number::Float(12.3));
        assert_eq!(sanitize(Some(2.5f64), None), Number::Float(2.5));
    }

    #[test]
    fn zero_places_yields_integer() {
        assert_eq!(sanitize(5.0, Some(0)), Number::Int(5));
        assert_eq!(sanitize(1234.6, Some(0)), Number::Int(1235));
        assert_eq!(serde_json::to_string(&sanitize(5.0, Some(0))).unwrap(), "5");
        assert_eq!(serde_json::to_string(&sanitize(5.0, Some(1))).unwrap(), "5.0");
    }

    #[test]
    fn ties_round_to_even() {
        assert_eq!(sanitize(2.5, Some(0)), Number::Int(2));
        assert_eq!(sanitize(3.5, Some(0)), Number::Int(4));
        assert_eq!(sanitize(-2.5, Some(0)), Number::Int(-2));
        assert_eq!(sanitize(0.25, Some(1)), Number::Float(0.2));
        // 2.675 is stored as 2.67499999...
        assert_eq!(sanitize(2.675, Some(2)), Number::Float(2.67));
        assert_eq!(sanitize(1e300, Some(1)), Number::Float(1e300));
    }

    #[test]
    fn coerce_field_flags_substitutions() {
        assert_eq!(coerce_field("4.5"), (4.5, false));
        assert_eq!(coerce_field(""), (0.0, false));
        assert_eq!(coerce_field("n/a"), (0.0, true));
        assert_eq!(coerce_field("inf"), (0.0, true));
    }
}
