//! Decimal parsing and fixed-scale unit prices.
//!
//! Exchange exports write numbers with thousands separators, currency
//! symbols and either `.` or `,` as the decimal mark. Everything is parsed
//! into `rust_decimal::Decimal`; no floating point is involved.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Default number of fractional digits kept in a unit price.
pub const DEFAULT_PRICE_SCALE: u32 = 10;

/// Which character a format uses as its decimal mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberStyle {
    /// `1,234.56`
    #[default]
    DecimalDot,
    /// `1.234,56`
    DecimalComma,
}

/// Parses a human formatted amount.
///
/// Whitespace, apostrophes, currency symbols and currency codes are
/// stripped. When both `.` and `,` occur, the one appearing last is the
/// decimal mark; otherwise the format's [`NumberStyle`] decides. A value in
/// parentheses is negative.
pub fn parse_amount(text: &str, style: NumberStyle) -> Option<Decimal> {
    let trimmed = text.trim();
    let (trimmed, parenthesized) = match trimmed.strip_prefix('(') {
        Some(inner) => (inner.strip_suffix(')')?, true),
        None => (trimmed, false),
    };

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-' | '+'))
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let (sign, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    if digits.contains(|c| c == '-' || c == '+') {
        return None;
    }

    let last_dot = digits.rfind('.');
    let last_comma = digits.rfind(',');
    let decimal_mark = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(_), None) if style == NumberStyle::DecimalDot => Some('.'),
        (None, Some(_)) if style == NumberStyle::DecimalComma => Some(','),
        // a lone separator of the "wrong" kind is a thousands separator,
        // unless it occurs once and is not followed by exactly three digits
        (Some(d), None) => lone_separator_as_decimal(digits, d).then_some('.'),
        (None, Some(c)) => lone_separator_as_decimal(digits, c).then_some(','),
        (None, None) => None,
    };
    if let Some(mark) = decimal_mark {
        if digits.matches(mark).count() > 1 {
            return None;
        }
    }

    let normalized: String = digits
        .char_indices()
        .filter_map(|(i, c)| match c {
            '.' | ',' => {
                let is_mark = Some(c) == decimal_mark
                    && Some(i) == if c == '.' { last_dot } else { last_comma };
                is_mark.then_some('.')
            }
            _ => Some(c),
        })
        .collect();

    let value = Decimal::from_str(&normalized).ok()?;
    let negative = (sign < 0) ^ parenthesized;
    Some(if negative { -value } else { value })
}

fn lone_separator_as_decimal(digits: &str, position: usize) -> bool {
    let count = digits.matches(&digits[position..position + 1]).count();
    count == 1 && digits.len() - position - 1 != 3
}

/// A non-rounded ratio rounded half-up to a fixed number of digits.
///
/// Returns `None` when `denominator` is zero or the division overflows.
pub fn divide_half_up(numerator: Decimal, denominator: Decimal, scale: u32) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    let ratio = numerator.checked_div(denominator)?;
    let mut rounded = ratio.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    Some(rounded)
}

/// Price of one unit of base currency expressed in quote currency.
///
/// The value is kept at a fixed scale so that output is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitPrice(Decimal);

impl UnitPrice {
    /// Wraps an already known price, normalizing it to `scale` digits.
    pub fn new(value: Decimal, scale: u32) -> Self {
        let mut v = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
        v.rescale(scale);
        UnitPrice(v)
    }

    /// Computes `|quote_amount| / |base_quantity|`, rounded half-up.
    pub fn from_amounts(quote_amount: Decimal, base_quantity: Decimal, scale: u32) -> Option<Self> {
        divide_half_up(quote_amount.abs(), base_quantity.abs(), scale).map(UnitPrice)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }
}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for UnitPrice {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.normalize().to_string())
    }
}
