//! # Account balance in wei with whole-token formatting.
//!
//! [`Balance`] stores an exact integer amount of wei and renders it as whole tokens:
//! - no fractional part → the plain integer (`"1"`, `"1000"`);
//! - otherwise → rounded half-away-from-zero to 4 decimals (`"1.2346"`).
//!
//! Formatting uses integer arithmetic only, so large balances never lose precision.

use std::{fmt, num::ParseIntError};

/// Number of wei in one whole token (10^18).
pub const WEI_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// 10^14: one unit of the fourth decimal place, in wei.
const FOURTH_DECIMAL: u128 = WEI_PER_TOKEN / 10_000;

/// Exact balance in wei.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Balance(u128);

impl Balance {
    /// Zero balance; also the fallback for a node without accounts.
    pub const ZERO: Balance = Balance(0);

    /// Creates a balance from an amount of wei.
    #[inline]
    pub const fn from_wei(wei: u128) -> Self {
        Balance(wei)
    }

    /// Parses a JSON-RPC quantity (`0x`-prefixed hexadecimal).
    ///
    /// # Example
    /// ```
    /// use nodevisor::Balance;
    ///
    /// let b = Balance::from_hex("0xde0b6b3a7640000").unwrap();
    /// assert_eq!(b.to_string(), "1");
    /// ```
    pub fn from_hex(quantity: &str) -> Result<Self, ParseIntError> {
        let digits = quantity
            .strip_prefix("0x")
            .or_else(|| quantity.strip_prefix("0X"))
            .unwrap_or(quantity);
        u128::from_str_radix(digits, 16).map(Balance)
    }

    /// Amount in wei.
    #[inline]
    pub const fn wei(&self) -> u128 {
        self.0
    }

    /// True if the balance is a whole number of tokens.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % WEI_PER_TOKEN == 0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_TOKEN;
        if self.is_whole() {
            return write!(f, "{whole}");
        }

        let frac = self.0 % WEI_PER_TOKEN;
        let mut decimals = frac / FOURTH_DECIMAL;
        if frac % FOURTH_DECIMAL >= FOURTH_DECIMAL / 2 {
            decimals += 1;
        }
        if decimals == 10_000 {
            write!(f, "{}.0000", whole + 1)
        } else {
            write!(f, "{whole}.{decimals:04}")
        }
    }
}
