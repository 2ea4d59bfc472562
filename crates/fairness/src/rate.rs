//! Exact blocks-per-layer rates
//!
//! Block and layer counts are integers, so rates are kept as fractions and
//! compared by cross-multiplication. `12/5` and `24/10` are the same rate.

use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// A non-negative rational rate with a non-zero denominator
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Rate {
    numerator: u64,
    denominator: u64,
}

impl Rate {
    /// Returns `None` when `denominator` is zero
    pub fn new(numerator: u64, denominator: u64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        Some(Self {
            numerator,
            denominator,
        })
    }

    /// Lossy decimal value, for display only
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    fn cross(&self, other: &Self) -> (u128, u128) {
        (
            self.numerator as u128 * other.denominator as u128,
            other.numerator as u128 * self.denominator as u128,
        )
    }
}

impl PartialEq for Rate {
    fn eq(&self, other: &Self) -> bool {
        let (lhs, rhs) = self.cross(other);
        lhs == rhs
    }
}

impl Eq for Rate {}

impl PartialOrd for Rate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rate {
    fn cmp(&self, other: &Self) -> Ordering {
        let (lhs, rhs) = self.cross(other);
        lhs.cmp(&rhs)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_f64())
    }
}
