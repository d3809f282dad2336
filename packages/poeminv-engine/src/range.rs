//! range.rs — Half-open numeric interval `[ge, lt)`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Interval closed at the lower bound (`ge`) and open at the upper (`lt`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct Range {
    ge: f64,
    lt: f64,
}

#[derive(Deserialize)]
struct RawRange {
    ge: f64,
    lt: f64,
}

impl TryFrom<RawRange> for Range {
    type Error = Error;

    fn try_from(raw: RawRange) -> Result<Self> {
        Range::new(raw.ge, raw.lt)
    }
}

impl Range {
    /// Bounds may be infinite but not NaN. `ge >= lt` gives an empty range.
    pub fn new(ge: f64, lt: f64) -> Result<Self> {
        if ge.is_nan() || lt.is_nan() {
            return Err(Error::InvalidValue(format!("range bounds [{ge}, {lt}) must be numbers")));
        }
        Ok(Self { ge, lt })
    }

    pub fn ge(&self) -> f64 {
        self.ge
    }

    pub fn lt(&self) -> f64 {
        self.lt
    }

    pub fn contains(&self, value: f64) -> bool {
        self.ge <= value && value < self.lt
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.ge, self.lt)
    }
}
