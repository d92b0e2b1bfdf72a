//! Binance transaction history.
//!
//! Rows carry no order id. The legs and fee of one fill are written with
//! the same `UTC_Time`, so adjacent rows with equal timestamps form a
//! group. Fees are usually charged in BNB, which is neither leg of most
//! trades and therefore counted as a failed fee.

use crate::decimal::NumberStyle;
use crate::error::Result;
use crate::format::{
    registration_error, Binding, Conversion, Discriminant, ExchangeFormat, FeeCurrency, Field,
    Grouping, Orientation, Role, RowFilter, RuleSet,
};
use crate::mapping::RawRecord;
use crate::signature::HeaderTemplate;

pub const ID: &str = "binance";

const TIME: &[&str] = &["%Y-%m-%d %H:%M:%S", "%y-%m-%d %H:%M:%S"];

fn classify(record: &RawRecord) -> Role {
    let operation = record.kind_lower();
    match operation.as_str() {
        "buy" | "sell" | "transaction related" | "transaction buy" | "transaction spend"
        | "transaction sold" | "transaction revenue" | "binance convert" | "large otc trading" => {
            Role::Trade
        }
        "fee" | "transaction fee" | "commission rebate" => Role::Fee,
        "deposit" => Role::Deposit,
        "withdraw" => Role::Withdrawal,
        "pos savings interest"
        | "simple earn flexible interest"
        | "simple earn locked rewards"
        | "staking rewards"
        | "eth 2.0 staking rewards"
        | "distribution"
        | "airdrop assets"
        | "referral kickback" => Role::Reward,
        "small assets exchange bnb" => Role::Skip("dust conversion to BNB"),
        "savings purchase"
        | "savings principal redemption"
        | "simple earn flexible subscription"
        | "simple earn flexible redemption" => Role::Skip("transfer between Binance wallets"),
        op if op.starts_with("transfer between") => Role::Skip("transfer between Binance wallets"),
        _ => Role::Unknown,
    }
}

pub fn format() -> Result<ExchangeFormat> {
    let template = HeaderTemplate::ordered(&[
        "^User_?I[Dd]$",
        "UTC_Time",
        "Account",
        "Operation",
        "Coin",
        "Change",
        "Remark?",
    ])
    .map_err(registration_error(ID))?;

    Ok(ExchangeFormat {
        id: ID,
        name: "Binance transaction history",
        template,
        sample_headers: &[
            "User_ID,UTC_Time,Account,Operation,Coin,Change,Remark",
            "UserId,UTC_Time,Account,Operation,Coin,Change,Remark",
            "\"User_ID\",\"UTC_Time\",\"Account\",\"Operation\",\"Coin\",\"Change\"",
        ],
        bindings: vec![
            Binding::new("UTC_Time", Field::ExecutedAt, Conversion::Instant(TIME)).required(),
            Binding::new("Operation", Field::Kind, Conversion::Text).required(),
            Binding::new("Account", Field::Side, Conversion::Text),
            Binding::new("Coin", Field::Currency, Conversion::Currency).required(),
            Binding::new("Change", Field::Amount, Conversion::Decimal).required(),
            Binding::new("Remark", Field::Note, Conversion::Text),
        ],
        number_style: NumberStyle::DecimalDot,
        aliases: &[],
        row_filter: RowFilter::None,
        grouping: Grouping::ByTimestamp,
        rules: RuleSet {
            discriminant: Discriminant::Classify(classify),
            orientation: Orientation::NonFiatBase {
                quote_priority: &["USDT", "BUSD", "USDC", "BTC", "ETH", "BNB"],
            },
            fee_currency: FeeCurrency::Row,
            default_quote: None,
        },
    })
}
