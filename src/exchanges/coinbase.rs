//! Coinbase retail transaction report.
//!
//! One row per event. Column names changed several times over the years
//! (currency-prefixed amounts, "Spot Price", a leading ID column), so the
//! header is matched unordered with pattern tokens. Amounts in the price
//! columns are in the quote currency, USD when the report does not say.

use crate::decimal::NumberStyle;
use crate::error::Result;
use crate::format::{
    registration_error, Binding, Conversion, Discriminant, ExchangeFormat, FeeCurrency, Field,
    Grouping, Orientation, Role, RowFilter, RuleSet,
};
use crate::mapping::RawRecord;
use crate::signature::HeaderTemplate;

pub const ID: &str = "coinbase";

const TIME: &[&str] = &["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S"];

const PRICE_CURRENCY: &str = r"^(Spot )?Price Currency$";
const PRICE_CURRENCY_OPTIONAL: &str = r"^(Spot )?Price Currency$?";
const PRICE: &str = r"^([A-Z]{3} )?(Spot )?Price at Transaction$";
const SUBTOTAL: &str = r"^([A-Z]{3} )?Subtotal$";
const TOTAL: &str = r"^([A-Z]{3} )?Total \(inclusive of fees[^)]*\)$";
const FEES: &str = r"^([A-Z]{3} )?Fees( and/or Spread)?$";

fn classify(record: &RawRecord) -> Role {
    match record.kind_lower().as_str() {
        "buy" | "advanced trade buy" => Role::Buy,
        "sell" | "advanced trade sell" => Role::Sell,
        "receive" | "deposit" => Role::Deposit,
        "send" | "withdrawal" => Role::Withdrawal,
        "coinbase earn" | "rewards income" | "learning reward" | "staking income"
        | "inflation reward" => Role::Reward,
        "convert" => Role::Skip("convert rows do not list the received currency"),
        _ => Role::Unknown,
    }
}

pub fn format() -> Result<ExchangeFormat> {
    let template = HeaderTemplate::unordered(&[
        "ID?",
        "Timestamp",
        "Transaction Type",
        "Asset",
        "Quantity Transacted",
        PRICE_CURRENCY_OPTIONAL,
        PRICE,
        SUBTOTAL,
        TOTAL,
        FEES,
        "Notes?",
    ])
    .map_err(registration_error(ID))?;

    Ok(ExchangeFormat {
        id: ID,
        name: "Coinbase transaction report",
        template,
        sample_headers: &[
            "Timestamp,Transaction Type,Asset,Quantity Transacted,USD Spot Price at Transaction,USD Subtotal,USD Total (inclusive of fees),USD Fees,Notes",
            "Timestamp,Transaction Type,Asset,Quantity Transacted,Spot Price Currency,Spot Price at Transaction,Subtotal,Total (inclusive of fees and/or spread),Fees and/or Spread,Notes",
            "ID,Timestamp,Transaction Type,Asset,Quantity Transacted,Price Currency,Price at Transaction,Subtotal,Total (inclusive of fees and/or spread),Fees and/or Spread,Notes",
        ],
        bindings: vec![
            Binding::new("ID", Field::Id, Conversion::Text),
            Binding::new("Timestamp", Field::ExecutedAt, Conversion::Instant(TIME)).required(),
            Binding::new("Transaction Type", Field::Kind, Conversion::Text).required(),
            Binding::new("Asset", Field::Currency, Conversion::Currency).required(),
            Binding::new("Quantity Transacted", Field::Amount, Conversion::Decimal).required(),
            Binding::new(PRICE_CURRENCY, Field::QuoteCurrency, Conversion::Currency),
            Binding::new(PRICE, Field::Price, Conversion::Decimal),
            Binding::new(SUBTOTAL, Field::QuoteAmount, Conversion::Decimal),
            Binding::new(TOTAL, Field::QuoteAmount, Conversion::Decimal),
            Binding::new(FEES, Field::Fee, Conversion::Decimal),
            Binding::new("Notes", Field::Note, Conversion::Text),
        ],
        number_style: NumberStyle::DecimalDot,
        aliases: &[],
        row_filter: RowFilter::None,
        grouping: Grouping::Single,
        rules: RuleSet {
            discriminant: Discriminant::Classify(classify),
            orientation: Orientation::Declared,
            fee_currency: FeeCurrency::Quote,
            default_quote: Some("USD"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(s: &str) -> Vec<String> {
        s.split(',').map(str::to_string).collect()
    }

    #[test]
    fn test_template_rejects_unknown_column() {
        let format = format().unwrap();
        let mut columns = header(format.sample_headers[1]);
        assert!(format.template.matches(&columns));
        columns.push("Portfolio".to_string());
        assert!(!format.template.matches(&columns));
    }

    #[test]
    fn test_template_requires_quantity() {
        let format = format().unwrap();
        let columns = header("Timestamp,Transaction Type,Asset,Subtotal,Total (inclusive of fees),Fees");
        assert!(!format.template.matches(&columns));
    }

    #[test]
    fn test_classify() {
        let record = |kind: &str| RawRecord {
            kind: Some(kind.to_string()),
            ..RawRecord::default()
        };
        assert_eq!(classify(&record("Advanced Trade Buy")), Role::Buy);
        assert_eq!(classify(&record("Send")), Role::Withdrawal);
        assert_eq!(classify(&record("Rewards Income")), Role::Reward);
        assert!(matches!(classify(&record("Convert")), Role::Skip(_)));
    }
}
