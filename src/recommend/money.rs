use std::fmt;
use std::ops::{Add, Sub};

use serde::{Serialize, Serializer};

/// A currency amount held in minor units (hundredths). Arithmetic is exact,
/// so `budget - rent` always reconciles with the two values it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    minor: i64,
}

impl Money {
    pub const ZERO: Money = Money { minor: 0 };

    pub const fn from_minor(minor: i64) -> Self {
        Self { minor }
    }

    /// Rounds to the nearest minor unit. Non-finite input yields `None`.
    pub fn from_major(amount: f64) -> Option<Self> {
        let minor = (amount * 100.0).round();
        (minor.is_finite() && minor.abs() < i64::MAX as f64).then(|| Self {
            minor: minor as i64,
        })
    }

    /// Monthly rent of an apartment of `size_sqm` at `rent_per_sqm`.
    pub fn rent_for(rent_per_sqm: f64, size_sqm: f64) -> Option<Self> {
        Self::from_major(rent_per_sqm * size_sqm)
    }

    pub fn minor(self) -> i64 {
        self.minor
    }

    pub fn to_major(self) -> f64 {
        self.minor as f64 / 100.0
    }

    pub fn is_negative(self) -> bool {
        self.minor < 0
    }

    /// Whole major units, rounded half away from zero.
    pub fn whole(self) -> i64 {
        (self.minor as f64 / 100.0).round() as i64
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::from_minor(self.minor.saturating_add(rhs.minor))
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::from_minor(self.minor.saturating_sub(rhs.minor))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        let major = crate::format_thousands((abs / 100) as i64);
        match abs % 100 {
            0 => write!(f, "{sign}{major}"),
            cents => write!(f, "{sign}{major}.{cents:02}"),
        }
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major())
    }
}
