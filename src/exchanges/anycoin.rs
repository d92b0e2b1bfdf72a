//! Anycoin trade statement.
//!
//! Semicolon separated with decimal commas. Every trade is written as two
//! consecutive `Trade` rows, one per currency, with no shared id: trade
//! rows are paired by position and the sign of the amount tells the
//! direction. Deposits and withdrawals are single rows and never take a
//! place in a pair.

use crate::decimal::NumberStyle;
use crate::error::Result;
use crate::format::{
    registration_error, Binding, Conversion, Discriminant, ExchangeFormat, FeeCurrency, Field,
    Grouping, Orientation, Role, RowFilter, RuleSet,
};
use crate::mapping::RawRecord;
use crate::signature::HeaderTemplate;

pub const ID: &str = "anycoin";

const TIME: &[&str] = &["%d.%m.%Y %H:%M:%S", "%d.%m.%Y %H:%M"];

fn classify(record: &RawRecord) -> Role {
    match record.kind_lower().as_str() {
        "trade" | "buy" | "sell" | "exchange" => Role::Trade,
        "deposit" => Role::Deposit,
        "withdrawal" | "withdraw" => Role::Withdrawal,
        _ => Role::Unknown,
    }
}

pub fn format() -> Result<ExchangeFormat> {
    let template = HeaderTemplate::ordered(&["Date", "Operation", "Currency", "Amount", "Fee?"])
        .map_err(registration_error(ID))?;

    Ok(ExchangeFormat {
        id: ID,
        name: "Anycoin trade statement",
        template,
        sample_headers: &["Date;Operation;Currency;Amount;Fee", "Date;Operation;Currency;Amount"],
        bindings: vec![
            Binding::new("Date", Field::ExecutedAt, Conversion::Instant(TIME)).required(),
            Binding::new("Operation", Field::Kind, Conversion::Text),
            Binding::new("Operation", Field::Note, Conversion::Text),
            Binding::new("Currency", Field::Currency, Conversion::Currency).required(),
            Binding::new("Amount", Field::Amount, Conversion::Decimal).required(),
            Binding::new("Fee", Field::Fee, Conversion::Decimal),
        ],
        number_style: NumberStyle::DecimalComma,
        aliases: &[],
        row_filter: RowFilter::None,
        grouping: Grouping::Window(2),
        rules: RuleSet {
            discriminant: Discriminant::Classify(classify),
            orientation: Orientation::NonFiatBase {
                quote_priority: &["USDT", "BTC", "ETH"],
            },
            fee_currency: FeeCurrency::Row,
            default_quote: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_operation() {
        let record = |op: &str| RawRecord {
            kind: Some(op.to_string()),
            ..RawRecord::default()
        };
        assert_eq!(classify(&record("Trade")), Role::Trade);
        assert_eq!(classify(&record("Deposit")), Role::Deposit);
        assert_eq!(classify(&record("Withdrawal")), Role::Withdrawal);
        assert_eq!(classify(&record("Staking")), Role::Unknown);
    }
}
