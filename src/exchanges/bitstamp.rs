//! Bitstamp transaction export.
//!
//! Amount cells embed their currency (`0.50000000 BTC`). A market trade is
//! a single row whose `Sub Type` says which side the account took.

use crate::decimal::NumberStyle;
use crate::error::Result;
use crate::format::{
    registration_error, Binding, Conversion, Discriminant, ExchangeFormat, FeeCurrency, Field,
    Grouping, Orientation, Role, RowFilter, RuleSet,
};
use crate::mapping::RawRecord;
use crate::signature::HeaderTemplate;

pub const ID: &str = "bitstamp";

/// `Mar. 04, 2021, 10:11 AM`; May is written without the dot.
const TIME: &[&str] = &["%b. %d, %Y, %I:%M %p", "%b %d, %Y, %I:%M %p"];

fn classify(record: &RawRecord) -> Role {
    match (record.kind_lower().as_str(), record.side_lower().as_str()) {
        ("market", "buy") => Role::Buy,
        ("market", "sell") => Role::Sell,
        ("deposit", _) => Role::Deposit,
        ("withdrawal", _) => Role::Withdrawal,
        ("staking reward", _) => Role::Reward,
        ("sub account transfer", _) => Role::Skip("sub account transfer"),
        _ => Role::Unknown,
    }
}

pub fn format() -> Result<ExchangeFormat> {
    let template = HeaderTemplate::ordered(&[
        "Type", "Datetime", "Account", "Amount", "Value", "Rate", "Fee", "Sub Type",
    ])
    .map_err(registration_error(ID))?;

    Ok(ExchangeFormat {
        id: ID,
        name: "Bitstamp transactions",
        template,
        sample_headers: &["Type,Datetime,Account,Amount,Value,Rate,Fee,Sub Type"],
        bindings: vec![
            Binding::new("Type", Field::Kind, Conversion::Text).required(),
            Binding::new("Sub Type", Field::Side, Conversion::Text),
            Binding::new("Datetime", Field::ExecutedAt, Conversion::Instant(TIME)).required(),
            Binding::new("Amount", Field::Amount, Conversion::AmountWithCurrency).required(),
            Binding::new("Value", Field::QuoteAmount, Conversion::AmountWithCurrency),
            Binding::new("Rate", Field::Price, Conversion::AmountWithCurrency),
            Binding::new("Fee", Field::Fee, Conversion::AmountWithCurrency),
            Binding::new("Account", Field::Note, Conversion::Text),
        ],
        number_style: NumberStyle::DecimalDot,
        aliases: &[],
        row_filter: RowFilter::None,
        grouping: Grouping::Single,
        rules: RuleSet {
            discriminant: Discriminant::Classify(classify),
            orientation: Orientation::Declared,
            fee_currency: FeeCurrency::Quote,
            default_quote: None,
        },
    })
}
