use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const USDC_CURRENCY_CODE: &str = "USDC";
pub const USDC_CURRENCY_CODE_LOWER: &str = "usdc";

/// Number of micro-units in one dollar. USDC carries 6 decimal places on every major network.
const MICRO_PER_DOLLAR: i64 = 1_000_000;

//--------------------------------------     MicroUsd       ---------------------------------------------------------
/// A monetary amount in millionths of a dollar.
///
/// All balances, fees and ledger amounts in the engine are represented as an integer number of
/// micro-USD. Floating point never enters the picture, so sums over ledger histories are exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MicroUsd(i64);

op!(binary MicroUsd, Add, add);
op!(binary MicroUsd, Sub, sub);
op!(inplace MicroUsd, SubAssign, sub_assign);
op!(unary MicroUsd, Neg, neg);

impl Mul<i64> for MicroUsd {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MicroUsd {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in micro-USD: {0}")]
pub struct MicroUsdConversionError(String);

impl From<i64> for MicroUsd {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MicroUsd {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MicroUsd {}

impl TryFrom<u64> for MicroUsd {
    type Error = MicroUsdConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MicroUsdConversionError(format!("Value {} is too large to convert to MicroUsd", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

/// Parses decimal dollar amounts ("25", "25.50", "0.000001") into micro-USD.
/// More than 6 fractional digits is an error rather than a silent truncation.
impl FromStr for MicroUsd {
    type Err = MicroUsdConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let digits = digits.strip_prefix('$').unwrap_or(digits);
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(MicroUsdConversionError(format!("'{s}' is not a decimal dollar amount")));
        }
        if frac.len() > 6 {
            return Err(MicroUsdConversionError(format!("'{s}' has more than 6 decimal places")));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MicroUsdConversionError(format!("'{s}' is not a decimal dollar amount")));
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|e| MicroUsdConversionError(format!("'{s}' is not a decimal dollar amount. {e}")))?
        };
        let mut micro = 0i64;
        if !frac.is_empty() {
            let f: i64 =
                frac.parse().map_err(|e| MicroUsdConversionError(format!("'{s}' is not a decimal dollar amount. {e}")))?;
            micro = f * 10i64.pow(6 - frac.len() as u32);
        }
        Ok(Self(sign * (whole * MICRO_PER_DOLLAR + micro)))
    }
}

impl Display for MicroUsd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let v = self.0.unsigned_abs();
        write!(f, "{sign}${}.{:06}", v / MICRO_PER_DOLLAR as u64, v % MICRO_PER_DOLLAR as u64)
    }
}

impl MicroUsd {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_dollars(dollars: i64) -> Self {
        Self(dollars * MICRO_PER_DOLLAR)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_dollar_strings() {
        assert_eq!("25".parse::<MicroUsd>().unwrap(), MicroUsd::from_dollars(25));
        assert_eq!("25.50".parse::<MicroUsd>().unwrap(), MicroUsd::from(25_500_000));
        assert_eq!("$10000".parse::<MicroUsd>().unwrap(), MicroUsd::from_dollars(10_000));
        assert_eq!("0.000001".parse::<MicroUsd>().unwrap(), MicroUsd::from(1));
        assert_eq!("-7.5".parse::<MicroUsd>().unwrap(), MicroUsd::from(-7_500_000));
        assert_eq!(".5".parse::<MicroUsd>().unwrap(), MicroUsd::from(500_000));
        assert!("0.0000001".parse::<MicroUsd>().is_err());
        assert!("abc".parse::<MicroUsd>().is_err());
        assert!("".parse::<MicroUsd>().is_err());
    }

    #[test]
    fn display_is_fixed_point() {
        assert_eq!(MicroUsd::from(492_500_000).to_string(), "$492.500000");
        assert_eq!(MicroUsd::from(-15_000_000).to_string(), "-$15.000000");
        assert_eq!(MicroUsd::from(1).to_string(), "$0.000001");
    }

    #[test]
    fn sums_are_exact() {
        let total: MicroUsd = (1..=100).map(MicroUsd::from).sum();
        assert_eq!(total, MicroUsd::from(5050));
    }
}
