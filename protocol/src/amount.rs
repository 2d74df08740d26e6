use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProtocolError;

/// Number of decimals of the native token (CBTC).
pub const DECIMALS: u32 = 18;

const WEI_PER_UNIT: u128 = 10u128.pow(DECIMALS);

/// Amount of the native token in its smallest unit.
///
/// Human-readable form is a decimal string in whole CBTC (`"0.005"`), which
/// is also how the leaderboard store keeps earnings.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wei(u128);

impl Wei {
    pub const ZERO: Wei = Wei(0);

    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    pub const fn as_wei(self) -> u128 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parses a decimal CBTC amount such as `"1"`, `"0.05"` or `"0.005"`.
    pub fn parse_units(raw: &str) -> Result<Self, ProtocolError> {
        let invalid = || ProtocolError::InvalidAmount(raw.to_string());
        let trimmed = raw.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
            || fraction.len() > DECIMALS as usize
        {
            return Err(invalid());
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| ProtocolError::AmountOverflow)?
        };
        let mut fraction_wei: u128 = 0;
        for digit in fraction.bytes() {
            fraction_wei = fraction_wei * 10 + u128::from(digit - b'0');
        }
        fraction_wei *= 10u128.pow(DECIMALS - fraction.len() as u32);

        whole
            .checked_mul(WEI_PER_UNIT)
            .and_then(|wei| wei.checked_add(fraction_wei))
            .map(Wei)
            .ok_or(ProtocolError::AmountOverflow)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_UNIT;
        let fraction = self.0 % WEI_PER_UNIT;
        if fraction == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{fraction:018}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Wei {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_units(s)
    }
}

impl Serialize for Wei {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Wei {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
