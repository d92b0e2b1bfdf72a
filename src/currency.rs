//! Known currencies and currency pairs.
//!
//! The currency table is defined once, on first use, and never mutated.
//! A [`Currency`] is a small `Copy` value; lookups are by exact code.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Default fractional digits for fiat currencies.
pub const FIAT_DIGITS: u32 = 2;

/// Default fractional digits for crypto currencies.
pub const CRYPTO_DIGITS: u32 = 8;

/// An immutable, globally unique currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Currency {
    code: &'static str,
    fiat: bool,
    decimal_digits: u32,
    valid_from: Option<NaiveDate>,
    valid_until: Option<NaiveDate>,
}

impl Currency {
    /// Looks up a currency by its exact code.
    pub fn lookup(code: &str) -> Option<Currency> {
        CURRENCIES.get(code).copied()
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn is_fiat(&self) -> bool {
        self.fiat
    }

    pub fn decimal_digits(&self) -> u32 {
        self.decimal_digits
    }

    pub fn valid_from(&self) -> Option<NaiveDate> {
        self.valid_from
    }

    pub fn valid_until(&self) -> Option<NaiveDate> {
        self.valid_until
    }

    /// Returns `true` if the currency existed at the given instant.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.valid_from.map_or(true, |from| day >= from)
            && self.valid_until.map_or(true, |until| day <= until)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Serialize for Currency {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.code)
    }
}

/// Ordered (base, quote) pair of currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        CurrencyPair { base, quote }
    }

    /// First day on which both members exist.
    pub fn introduced(&self) -> Option<NaiveDate> {
        match (self.base.valid_from, self.quote.valid_from) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Last day on which both members exist.
    pub fn retired(&self) -> Option<NaiveDate> {
        match (self.base.valid_until, self.quote.valid_until) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.introduced().map_or(true, |from| day >= from)
            && self.retired().map_or(true, |until| day <= until)
    }

    /// A pair can be traded when its members differ and a fiat currency is
    /// never priced in a crypto currency.
    pub fn is_tradeable(&self) -> bool {
        self.base != self.quote && !(self.base.fiat && !self.quote.fiat)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

// code, fiat, digits, valid from, valid until
type CurrencyDef = (
    &'static str,
    bool,
    u32,
    Option<&'static str>,
    Option<&'static str>,
);

const CURRENCY_TABLE: &[CurrencyDef] = &[
    ("USD", true, FIAT_DIGITS, None, None),
    ("EUR", true, FIAT_DIGITS, Some("1999-01-01"), None),
    ("GBP", true, FIAT_DIGITS, None, None),
    ("CHF", true, FIAT_DIGITS, None, None),
    ("CAD", true, FIAT_DIGITS, None, None),
    ("AUD", true, FIAT_DIGITS, None, None),
    ("CZK", true, FIAT_DIGITS, Some("1993-02-08"), None),
    ("PLN", true, FIAT_DIGITS, None, None),
    ("JPY", true, 0, None, None),
    ("BTC", false, CRYPTO_DIGITS, Some("2009-01-03"), None),
    ("LTC", false, CRYPTO_DIGITS, Some("2011-10-07"), None),
    ("XRP", false, 6, Some("2012-06-02"), None),
    ("DOGE", false, CRYPTO_DIGITS, Some("2013-12-06"), None),
    ("XLM", false, 7, Some("2014-07-31"), None),
    ("USDT", false, 6, Some("2014-10-06"), None),
    ("XMR", false, CRYPTO_DIGITS, Some("2014-04-18"), None),
    ("ETH", false, CRYPTO_DIGITS, Some("2015-07-30"), None),
    ("ETC", false, CRYPTO_DIGITS, Some("2016-07-20"), None),
    ("ZEC", false, CRYPTO_DIGITS, Some("2016-10-28"), None),
    ("BCH", false, CRYPTO_DIGITS, Some("2017-08-01"), None),
    ("BNB", false, CRYPTO_DIGITS, Some("2017-07-25"), None),
    ("ADA", false, 6, Some("2017-09-29"), None),
    ("EOS", false, 4, Some("2017-06-26"), None),
    ("TRX", false, 6, Some("2017-09-13"), None),
    ("LINK", false, CRYPTO_DIGITS, Some("2017-09-19"), None),
    ("USDC", false, 6, Some("2018-09-26"), None),
    ("BUSD", false, CRYPTO_DIGITS, Some("2019-09-05"), Some("2024-12-31")),
    ("MATIC", false, CRYPTO_DIGITS, Some("2019-04-26"), None),
    ("SOL", false, CRYPTO_DIGITS, Some("2020-03-16"), None),
    ("DOT", false, CRYPTO_DIGITS, Some("2020-08-18"), None),
    ("UNI", false, CRYPTO_DIGITS, Some("2020-09-17"), None),
    ("AVAX", false, CRYPTO_DIGITS, Some("2020-09-21"), None),
];

static CURRENCIES: Lazy<HashMap<&'static str, Currency>> = Lazy::new(|| {
    let date = |s: Option<&str>| s.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
    CURRENCY_TABLE
        .iter()
        .map(|&(code, fiat, decimal_digits, from, until)| {
            (
                code,
                Currency {
                    code,
                    fiat,
                    decimal_digits,
                    valid_from: date(from),
                    valid_until: date(until),
                },
            )
        })
        .collect()
});
