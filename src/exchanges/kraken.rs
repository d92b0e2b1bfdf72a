//! Kraken ledger export (`ledgers.csv`).
//!
//! Each trade is written as two or three rows sharing a `refid`: one per
//! currency moved, with the fee in the `fee` column of the row whose asset
//! was charged. Entries that are still pending carry a blank `txid`.

use crate::decimal::NumberStyle;
use crate::error::Result;
use crate::format::{
    registration_error, Binding, Conversion, Discriminant, ExchangeFormat, FeeCurrency, Field,
    Grouping, Orientation, Role, RowFilter, RuleSet,
};
use crate::mapping::RawRecord;
use crate::signature::HeaderTemplate;

pub const ID: &str = "kraken";

const TIME: &[&str] = &["%Y-%m-%d %H:%M:%S%.f"];

/// Kraken's legacy X/Z prefixed tickers and staking suffixes.
const ALIASES: &[(&str, &str)] = &[
    ("XXBT", "BTC"),
    ("XBT", "BTC"),
    ("XBT.M", "BTC"),
    ("XETH", "ETH"),
    ("ETH2", "ETH"),
    ("ETH2.S", "ETH"),
    ("XLTC", "LTC"),
    ("XXRP", "XRP"),
    ("XXLM", "XLM"),
    ("XXMR", "XMR"),
    ("XZEC", "ZEC"),
    ("XETC", "ETC"),
    ("XXDG", "DOGE"),
    ("XDG", "DOGE"),
    ("DOT.S", "DOT"),
    ("ADA.S", "ADA"),
    ("SOL.S", "SOL"),
    ("ZUSD", "USD"),
    ("ZEUR", "EUR"),
    ("ZGBP", "GBP"),
    ("ZCAD", "CAD"),
    ("ZJPY", "JPY"),
    ("ZAUD", "AUD"),
];

fn classify(record: &RawRecord) -> Role {
    match (record.kind_lower().as_str(), record.side_lower().as_str()) {
        ("trade" | "spend" | "receive", _) => Role::Trade,
        ("deposit", _) => Role::Deposit,
        ("withdrawal", _) => Role::Withdrawal,
        ("staking", _) | ("earn", "reward") => Role::Reward,
        ("earn", _) => Role::Skip("earn allocation between wallets"),
        ("transfer", _) => Role::Skip("transfer between Kraken wallets"),
        ("margin" | "rollover" | "settled", _) => Role::Skip("margin trading is not imported"),
        ("adjustment", _) => Role::Skip("balance adjustment"),
        _ => Role::Unknown,
    }
}

pub fn format() -> Result<ExchangeFormat> {
    let template = HeaderTemplate::ordered(&[
        "txid", "refid", "time", "type", "subtype?", "aclass", "asset", "amount", "fee", "balance",
    ])
    .map_err(registration_error(ID))?;

    Ok(ExchangeFormat {
        id: ID,
        name: "Kraken ledger",
        template,
        sample_headers: &[
            r#""txid","refid","time","type","subtype","aclass","asset","amount","fee","balance""#,
            r#""txid","refid","time","type","subtype","aclass","asset","wallet","amount","fee","balance""#,
            "txid,refid,time,type,aclass,asset,amount,fee,balance",
        ],
        bindings: vec![
            Binding::new("refid", Field::Id, Conversion::Text).required(),
            Binding::new("time", Field::ExecutedAt, Conversion::Instant(TIME)).required(),
            Binding::new("type", Field::Kind, Conversion::Text).required(),
            Binding::new("subtype", Field::Side, Conversion::Text),
            Binding::new("asset", Field::Currency, Conversion::Currency).required(),
            Binding::new("amount", Field::Amount, Conversion::Decimal).required(),
            Binding::new("fee", Field::Fee, Conversion::Decimal),
        ],
        number_style: NumberStyle::DecimalDot,
        aliases: ALIASES,
        row_filter: RowFilter::RequireValue {
            column: "txid",
            reason: "pending ledger entry",
        },
        grouping: Grouping::ById,
        rules: RuleSet {
            discriminant: Discriminant::Classify(classify),
            orientation: Orientation::NonFiatBase {
                quote_priority: &["USDT", "USDC", "BTC", "ETH"],
            },
            fee_currency: FeeCurrency::Row,
            default_quote: None,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, subtype: &str) -> RawRecord {
        RawRecord {
            kind: Some(kind.to_string()),
            side: Some(subtype.to_string()),
            ..RawRecord::default()
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(&record("trade", "")), Role::Trade);
        assert_eq!(classify(&record("Receive", "")), Role::Trade);
        assert_eq!(classify(&record("earn", "reward")), Role::Reward);
        assert!(matches!(classify(&record("earn", "allocation")), Role::Skip(_)));
        assert!(matches!(classify(&record("transfer", "spottostaking")), Role::Skip(_)));
        assert_eq!(classify(&record("futures", "")), Role::Unknown);
    }

    #[test]
    fn test_aliases_resolve() {
        let format = format().unwrap();
        assert_eq!(format.resolve_currency("XXBT").unwrap().code(), "BTC");
        assert_eq!(format.resolve_currency("ZEUR").unwrap().code(), "EUR");
        assert_eq!(format.resolve_currency("dot.s").unwrap().code(), "DOT");
    }
}
