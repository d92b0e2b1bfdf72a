//! Built-in exchange export formats.
//!
//! Every module contributes one [`ExchangeFormat`] record: column bindings
//! and rules only, no parsing code. Adding an exchange means adding a
//! module here and listing it in [`all`].

use crate::error::Result;
use crate::format::ExchangeFormat;

pub mod anycoin;
pub mod binance;
pub mod bitstamp;
pub mod coinbase;
pub mod coinbase_pro;
pub mod kraken;
pub mod ledger;

/// Builds every built-in format, in registration order.
pub fn all() -> Result<Vec<ExchangeFormat>> {
    Ok(vec![
        kraken::format()?,
        coinbase_pro::format()?,
        coinbase::format()?,
        bitstamp::format()?,
        binance::format()?,
        anycoin::format()?,
        ledger::format()?,
    ])
}
