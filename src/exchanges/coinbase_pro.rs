//! Coinbase Pro account statement.
//!
//! A fill is one `match` row per currency plus an optional `fee` row, all
//! sharing the trade id. Transfers carry a transfer id instead.

use crate::decimal::NumberStyle;
use crate::error::Result;
use crate::format::{
    registration_error, Binding, Conversion, Discriminant, ExchangeFormat, FeeCurrency, Field,
    Grouping, Orientation, Role, RowFilter, RuleSet,
};
use crate::mapping::RawRecord;
use crate::signature::HeaderTemplate;

pub const ID: &str = "coinbase-pro";

const TIME: &[&str] = &["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%d %H:%M:%S%.f"];

fn classify(record: &RawRecord) -> Role {
    match record.kind_lower().as_str() {
        "match" => Role::Trade,
        // fee rows are negative, rebates positive
        "fee" | "rebate" => Role::Fee,
        "deposit" => Role::Deposit,
        "withdrawal" => Role::Withdrawal,
        "conversion" => Role::Skip("stablecoin conversion"),
        _ => Role::Unknown,
    }
}

pub fn format() -> Result<ExchangeFormat> {
    let template = HeaderTemplate::ordered(&[
        "portfolio?",
        "type",
        "time",
        "amount",
        "balance",
        "amount/balance unit",
        "transfer id",
        "trade id",
        "order id",
    ])
    .map_err(registration_error(ID))?;

    Ok(ExchangeFormat {
        id: ID,
        name: "Coinbase Pro account statement",
        template,
        sample_headers: &[
            "portfolio,type,time,amount,balance,amount/balance unit,transfer id,trade id,order id",
            "type,time,amount,balance,amount/balance unit,transfer id,trade id,order id",
        ],
        bindings: vec![
            Binding::new("trade id", Field::Id, Conversion::Text),
            Binding::new("transfer id", Field::Id, Conversion::Text),
            Binding::new("time", Field::ExecutedAt, Conversion::Instant(TIME)).required(),
            Binding::new("type", Field::Kind, Conversion::Text).required(),
            Binding::new("amount/balance unit", Field::Currency, Conversion::Currency).required(),
            Binding::new("amount", Field::Amount, Conversion::Decimal).required(),
            Binding::new("order id", Field::Note, Conversion::Text),
        ],
        number_style: NumberStyle::DecimalDot,
        aliases: &[],
        row_filter: RowFilter::None,
        grouping: Grouping::ById,
        rules: RuleSet {
            discriminant: Discriminant::Classify(classify),
            orientation: Orientation::NonFiatBase {
                quote_priority: &["USDC", "USDT", "BTC", "ETH"],
            },
            fee_currency: FeeCurrency::Row,
            default_quote: None,
        },
    })
}
