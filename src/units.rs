//! Chain primitives: addresses, chain ids and native unit scaling
//!
//! Amounts typed by the user are decimal strings in the native unit (ETH).
//! The wallet expects integer values in the smallest unit (wei), so the
//! conversion is done with exact decimal arithmetic. No floats are involved.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    static ref ADDRESS_RE: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("static regex");
    static ref AMOUNT_RE: Regex = Regex::new(r"^([0-9]+\.?[0-9]*|\.[0-9]+)$").expect("static regex");
}

/// Decimals of the native unit on EVM chains (1 ETH = 10^18 wei)
pub const ETHER_DECIMALS: u32 = 18;

/// Errors produced while scaling decimal amounts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("'{0}' is not a decimal number")]
    Unparseable(String),

    #[error("amount must not be negative")]
    Negative,

    #[error("amount has more than {decimals} decimal places")]
    TooPrecise { decimals: u32 },

    #[error("amount is too large")]
    Overflow,
}

/// A 20-byte account address, `0x` followed by 40 hex digits.
///
/// Mixed-case checksums are accepted without verification; the value is
/// kept in lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The all-zero address
    pub fn zero() -> Self {
        Self(format!("0x{}", "0".repeat(40)))
    }

    /// Check whether a string has the address shape
    pub fn is_valid(s: &str) -> bool {
        ADDRESS_RE.is_match(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if Self::is_valid(s) {
            Ok(Self(s.to_ascii_lowercase()))
        } else {
            Err(format!("invalid address: {}", s))
        }
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// EIP-155 chain id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Hex quantity form used by wallet RPC methods (`8453` → `0x2105`)
    pub fn to_hex(self) -> String {
        format!("0x{:x}", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scale a decimal string into integer smallest units.
///
/// Only plain decimal notation is accepted: digits with at most one `.`.
/// `parse_units("0.000001", 18) == Ok(1_000_000_000_000)`
pub fn parse_units(amount: &str, decimals: u32) -> Result<u128, UnitsError> {
    let amount = amount.trim();

    if let Some(unsigned) = amount.strip_prefix('-') {
        if AMOUNT_RE.is_match(unsigned) {
            return Err(UnitsError::Negative);
        }
    }
    if !AMOUNT_RE.is_match(amount) {
        return Err(UnitsError::Unparseable(amount.to_string()));
    }

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > decimals as usize {
        return Err(UnitsError::TooPrecise { decimals });
    }

    let whole = if whole.is_empty() { "0" } else { whole };
    let canonical = if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    };

    // The grammar is already checked, so anything the decimal type refuses
    // is beyond its 96-bit mantissa
    let value = Decimal::from_str_exact(&canonical).map_err(|_| UnitsError::Overflow)?;
    let scale = value.scale();
    if scale > decimals {
        return Err(UnitsError::TooPrecise { decimals });
    }

    let mantissa = value.mantissa().unsigned_abs();
    let factor = 10u128
        .checked_pow(decimals - scale)
        .ok_or(UnitsError::Overflow)?;
    mantissa.checked_mul(factor).ok_or(UnitsError::Overflow)
}

/// Render integer smallest units as a decimal string, trailing zeros trimmed.
pub fn format_units(value: u128, decimals: u32) -> String {
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// JSON-RPC hex quantity: `0x` + lowercase hex, no leading zeros
pub fn to_hex_quantity(value: u128) -> String {
    format!("0x{:x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units_exact() {
        assert_eq!(parse_units("0.000001", 18), Ok(1_000_000_000_000));
        assert_eq!(parse_units("0.01", 18), Ok(10_000_000_000_000_000));
        assert_eq!(parse_units("1", 18), Ok(1_000_000_000_000_000_000));
        assert_eq!(parse_units("0.000000000000000001", 18), Ok(1));
        assert_eq!(parse_units("1.50", 6), Ok(1_500_000));
    }

    #[test]
    fn test_parse_units_rejects() {
        assert_eq!(parse_units("-1", 18), Err(UnitsError::Negative));
        assert_eq!(
            parse_units("0.0000000000000000001", 18),
            Err(UnitsError::TooPrecise { decimals: 18 })
        );
        assert!(matches!(parse_units("abc", 18), Err(UnitsError::Unparseable(_))));
        assert!(matches!(parse_units("", 18), Err(UnitsError::Unparseable(_))));
    }

    #[test]
    fn test_parse_units_plain_notation_only() {
        for input in ["1_000", "1e3", "1E-3", "0x10", "+1", "1.2.3", ".", " . ", "1 000"] {
            assert!(
                matches!(parse_units(input, 18), Err(UnitsError::Unparseable(_))),
                "accepted {:?}",
                input
            );
        }
        assert_eq!(
            parse_units("1.000000000000000000000000000000_1", 18),
            Err(UnitsError::Unparseable("1.000000000000000000000000000000_1".to_string()))
        );
        assert_eq!(parse_units(".5", 18), Ok(500_000_000_000_000_000));
        assert_eq!(parse_units("2.", 18), Ok(2_000_000_000_000_000_000));
    }

    #[test]
    fn test_parse_units_never_rounds() {
        // Past the 96-bit decimal mantissa
        assert_eq!(
            parse_units("9.0000000000000000000000000001", 28),
            Err(UnitsError::Overflow)
        );
        assert_eq!(
            parse_units("1.0000000000000000000000000000001", 18),
            Err(UnitsError::TooPrecise { decimals: 18 })
        );
        assert_eq!(
            parse_units("123456789.123456789012345678", 18),
            Ok(123_456_789_123_456_789_012_345_678)
        );
    }

    #[test]
    fn test_trailing_zeros_do_not_count_as_precision() {
        assert_eq!(parse_units("2.000000000000000000000", 18), Ok(2_000_000_000_000_000_000));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(1_000_000_000_000, 18), "0.000001");
        assert_eq!(format_units(1_500_000_000_000_000_000, 18), "1.5");
        assert_eq!(format_units(0, 18), "0");
        assert_eq!(format_units(42, 0), "42");
    }

    #[test]
    fn test_hex_quantity() {
        assert_eq!(to_hex_quantity(0), "0x0");
        assert_eq!(to_hex_quantity(1_000_000_000_000), "0xe8d4a51000");
        assert_eq!(ChainId(8453).to_hex(), "0x2105");
    }

    #[test]
    fn test_address_parsing() {
        let addr: Address = "0xAbCdEf0123456789abcdef0123456789ABCDEF01".parse().unwrap();
        assert_eq!(addr.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
        assert!("0xZZZ".parse::<Address>().is_err());
        assert!("abcdef0123456789abcdef0123456789abcdef0123".parse::<Address>().is_err());
        assert_eq!(Address::zero().as_str(), "0x0000000000000000000000000000000000000000");
    }

    #[test]
    fn test_address_serde() {
        let addr: Address =
            serde_json::from_str(r#""0x724E2959C48F2CEB162188B8ACDD044577359099""#).unwrap();
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            r#""0x724e2959c48f2ceb162188b8acdd044577359099""#
        );
        assert!(serde_json::from_str::<Address>(r#""0x1234""#).is_err());
    }
}
