//! Generic signed ledger.
//!
//! A plain interchange layout for exchanges without a dedicated format:
//! one row per currency movement, legs of a trade share an `id`.

use crate::decimal::NumberStyle;
use crate::error::Result;
use crate::format::{
    registration_error, Binding, Conversion, Discriminant, ExchangeFormat, FeeCurrency, Field,
    Grouping, Orientation, RowFilter, RuleSet,
};
use crate::signature::HeaderTemplate;

pub const ID: &str = "ledger";

const TIME: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d",
];

pub fn format() -> Result<ExchangeFormat> {
    let template = HeaderTemplate::ordered(&["id", "date", "currency", "amount", "fee?"])
        .map_err(registration_error(ID))?;

    Ok(ExchangeFormat {
        id: ID,
        name: "Generic signed ledger",
        template,
        sample_headers: &[
            "id,date,currency,amount,fee",
            "id,date,currency,amount,fee,fee currency,address,note",
            "id;date;currency;amount",
        ],
        bindings: vec![
            Binding::new("id", Field::Id, Conversion::Text),
            Binding::new("date", Field::ExecutedAt, Conversion::Instant(TIME)).required(),
            Binding::new("currency", Field::Currency, Conversion::Currency).required(),
            Binding::new("amount", Field::Amount, Conversion::Decimal).required(),
            Binding::new("fee", Field::Fee, Conversion::Decimal),
            Binding::new("fee currency", Field::FeeCurrency, Conversion::Currency),
            Binding::new("address", Field::Address, Conversion::Text),
            Binding::new("note", Field::Note, Conversion::Text),
        ],
        number_style: NumberStyle::DecimalDot,
        aliases: &[],
        row_filter: RowFilter::None,
        grouping: Grouping::ById,
        rules: RuleSet {
            discriminant: Discriminant::AmountSign,
            orientation: Orientation::NonFiatBase {
                quote_priority: &["USDT", "USDC", "BTC", "ETH"],
            },
            fee_currency: FeeCurrency::Row,
            default_quote: None,
        },
    })
}
