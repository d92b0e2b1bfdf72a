//! Transaction reconstruction.
//!
//! Each group goes through the same shape of state machine, parameterized
//! by the format's rule set:
//!
//! 1. every record is assigned a [`Role`] and split into currency legs and
//!    fee legs,
//! 2. the legs are classified as a trade (two opposite-signed legs) or a
//!    transfer (one leg),
//! 3. trade legs are oriented into base and quote and priced,
//! 4. fee legs are attached as related transactions,
//! 5. the resulting pair is validated.
//!
//! Failure in steps 1-3 or 5 rejects the whole group. A bad fee leg only
//! affects that fee and is counted on the cluster.

use crate::currency::{Currency, CurrencyPair};
use crate::decimal::UnitPrice;
use crate::format::{Discriminant, ExchangeFormat, FeeCurrency, Orientation, Role};
use crate::grouping::TransactionGroup;
use crate::mapping::RawRecord;
use crate::report::{Reject, RowResult};
use crate::transaction::{Action, ClusterBuilder, ImportedTransaction, TransactionCluster};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegKind {
    Trade,
    Deposit,
    Withdrawal,
    Reward,
}

/// One signed currency movement of a group.
#[derive(Debug, Clone, Copy)]
struct Leg<'r> {
    kind: LegKind,
    currency: Currency,
    amount: Decimal,
    /// Set on the base side of a single-row trade.
    declared_base: bool,
    record: &'r RawRecord,
}

/// A fee charged (positive cost) or rebated (negative cost).
#[derive(Debug, Clone, Copy)]
struct FeeLeg<'r> {
    currency: Option<Currency>,
    cost: Decimal,
    record: &'r RawRecord,
}

/// Rebuilds transaction clusters from groups of one format.
pub struct Reconstructor<'a> {
    format: &'a ExchangeFormat,
    price_scale: u32,
}

impl<'a> Reconstructor<'a> {
    pub fn new(format: &'a ExchangeFormat, price_scale: u32) -> Self {
        Reconstructor {
            format,
            price_scale,
        }
    }

    /// Reconstructs one group into a cluster.
    pub fn reconstruct(&self, group: &TransactionGroup) -> RowResult<TransactionCluster> {
        if let Some(line) = group.rejected.first() {
            return Err(Reject::failed(format!(
                "trade leg paired with rejected row {}",
                line
            )));
        }

        let mut legs = Vec::new();
        let mut fees = Vec::new();
        for record in &group.records {
            let role = self.format.role_of(record);
            self.split_record(record, role, &mut legs, &mut fees)?;
        }

        let (trades, transfers): (Vec<Leg>, Vec<Leg>) =
            legs.into_iter().partition(|l| l.kind == LegKind::Trade);
        let sign_only = matches!(self.format.rules.discriminant, Discriminant::AmountSign);

        let mut builder = match (trades.as_slice(), transfers.as_slice()) {
            ([a, b], []) => self.trade(group, a, b)?,
            ([leg], []) if sign_only => self.transfer(group, leg)?,
            ([], [leg]) => self.transfer(group, leg)?,
            ([], []) if fees.len() == 1 => return self.standalone_fee(group, &fees[0]),
            ([], []) => return Err(Reject::failed("group contains no currency movement")),
            (trades, transfers) => {
                return Err(Reject::failed(format!(
                    "cannot classify group with {} trade and {} transfer legs",
                    trades.len(),
                    transfers.len()
                )))
            }
        };

        for fee in &fees {
            self.attach_fee(&mut builder, fee);
        }
        Ok(builder.build())
    }

    fn split_record<'r>(
        &self,
        record: &'r RawRecord,
        role: Role,
        legs: &mut Vec<Leg<'r>>,
        fees: &mut Vec<FeeLeg<'r>>,
    ) -> RowResult<()> {
        let leg = |kind: LegKind, amount: Decimal| -> RowResult<Leg<'r>> {
            Ok(Leg {
                kind,
                currency: required_currency(record)?,
                amount,
                declared_base: false,
                record,
            })
        };

        match role {
            Role::Skip(reason) => return Err(Reject::ignored(reason)),
            Role::Unknown => {
                return Err(Reject::failed(format!(
                    "unsupported transaction type '{}'",
                    record.kind.as_deref().unwrap_or_default()
                )))
            }
            Role::Trade => legs.push(leg(LegKind::Trade, required_amount(record)?)?),
            Role::Buy | Role::Sell => {
                let quantity = required_amount(record)?.abs();
                let (base_amount, quote_sign) = if role == Role::Buy {
                    (quantity, Decimal::NEGATIVE_ONE)
                } else {
                    (-quantity, Decimal::ONE)
                };
                let mut base = leg(LegKind::Trade, base_amount)?;
                base.declared_base = true;
                legs.push(base);

                let quote_currency = record
                    .quote_currency
                    .or_else(|| self.format.default_quote())
                    .ok_or_else(|| Reject::failed("missing quote currency"))?;
                let quote_amount = match (record.quote_amount, record.price) {
                    (Some(total), _) => total.abs(),
                    (None, Some(price)) => (quantity * price).abs(),
                    (None, None) => return Err(Reject::failed("missing quote amount or price")),
                };
                legs.push(Leg {
                    kind: LegKind::Trade,
                    currency: quote_currency,
                    amount: quote_sign * quote_amount,
                    declared_base: false,
                    record,
                });
            }
            Role::Deposit => legs.push(leg(LegKind::Deposit, required_amount(record)?.abs())?),
            Role::Withdrawal => {
                legs.push(leg(LegKind::Withdrawal, -required_amount(record)?.abs())?)
            }
            Role::Reward => legs.push(leg(LegKind::Reward, required_amount(record)?.abs())?),
            Role::Fee => {
                fees.push(FeeLeg {
                    currency: Some(required_currency(record)?),
                    cost: -required_amount(record)?,
                    record,
                });
                return Ok(());
            }
        }

        if let Some(fee) = record.fee.filter(|f| !f.is_zero()) {
            let currency = record.fee_currency.or(match self.format.rules.fee_currency {
                FeeCurrency::Row => record.currency,
                FeeCurrency::Quote => record
                    .quote_currency
                    .or_else(|| self.format.default_quote())
                    .or(record.currency),
            });
            fees.push(FeeLeg {
                currency,
                cost: fee.abs(),
                record,
            });
        }
        Ok(())
    }

    fn trade(&self, group: &TransactionGroup, a: &Leg, b: &Leg) -> RowResult<ClusterBuilder> {
        if a.amount.is_zero() || b.amount.is_zero() {
            return Err(Reject::failed("trade leg with zero amount"));
        }
        if a.amount.is_sign_positive() == b.amount.is_sign_positive() {
            return Err(Reject::failed(format!(
                "trade legs {} {} and {} {} do not have opposite signs",
                a.amount, a.currency, b.amount, b.currency
            )));
        }
        if a.currency == b.currency {
            return Err(Reject::failed(format!(
                "both trade legs are denominated in {}",
                a.currency
            )));
        }

        let (base, quote) = self.orient(a, b)?;
        let action = if base.amount.is_sign_positive() {
            Action::Buy
        } else {
            Action::Sell
        };

        let unit_price = match (self.format.rules.orientation, base.record.price) {
            (Orientation::Declared, Some(price)) => UnitPrice::new(price, self.price_scale),
            _ => UnitPrice::from_amounts(quote.amount, base.amount, self.price_scale)
                .ok_or_else(|| Reject::failed("unit price cannot be computed"))?,
        };

        let executed_at = executed_at(group, base.record)?;
        let pair = CurrencyPair::new(base.currency, quote.currency);
        if !pair.is_tradeable() {
            return Err(Reject::failed(format!("{} is not a tradeable pair", pair)));
        }
        if !pair.is_valid_at(executed_at) {
            return Err(Reject::failed(format!(
                "{} did not exist at {}",
                pair,
                executed_at.to_rfc3339()
            )));
        }

        Ok(TransactionCluster::builder(ImportedTransaction {
            uid: uid(group, base.record),
            executed_at,
            base: base.currency,
            quote: quote.currency,
            action,
            quantity: base.amount.abs(),
            unit_price: Some(unit_price),
            address: first_text(group, |r| r.address.as_deref()),
            note: first_text(group, |r| r.note.as_deref()),
            row: base.record.line,
        }))
    }

    /// Chooses which of two opposite-signed legs is the base.
    fn orient<'l, 'r>(&self, a: &'l Leg<'r>, b: &'l Leg<'r>) -> RowResult<(&'l Leg<'r>, &'l Leg<'r>)> {
        let incoming_first = |a: &'l Leg<'r>, b: &'l Leg<'r>| {
            if a.amount.is_sign_positive() {
                (a, b)
            } else {
                (b, a)
            }
        };

        match self.format.rules.orientation {
            Orientation::IncomingBase => Ok(incoming_first(a, b)),
            Orientation::Declared => match (a.declared_base, b.declared_base) {
                (true, false) => Ok((a, b)),
                (false, true) => Ok((b, a)),
                _ => Err(Reject::failed("trade legs do not declare a base currency")),
            },
            Orientation::NonFiatBase { quote_priority } => {
                match (a.currency.is_fiat(), b.currency.is_fiat()) {
                    (false, true) => return Ok((a, b)),
                    (true, false) => return Ok((b, a)),
                    _ => {}
                }
                for code in quote_priority {
                    if a.currency.code() == *code {
                        return Ok((b, a));
                    }
                    if b.currency.code() == *code {
                        return Ok((a, b));
                    }
                }
                Ok(incoming_first(a, b))
            }
        }
    }

    fn transfer(&self, group: &TransactionGroup, leg: &Leg) -> RowResult<ClusterBuilder> {
        if leg.amount.is_zero() {
            return Err(Reject::failed(format!("zero-amount {} movement", leg.currency)));
        }
        let action = match leg.kind {
            LegKind::Deposit => Action::Deposit,
            LegKind::Withdrawal => Action::Withdrawal,
            LegKind::Reward => Action::Reward,
            LegKind::Trade if leg.amount.is_sign_positive() => Action::Deposit,
            LegKind::Trade => Action::Withdrawal,
        };

        let executed_at = executed_at(group, leg.record)?;
        if !leg.currency.is_valid_at(executed_at) {
            return Err(Reject::failed(format!(
                "{} did not exist at {}",
                leg.currency,
                executed_at.to_rfc3339()
            )));
        }

        Ok(TransactionCluster::builder(ImportedTransaction {
            uid: uid(group, leg.record),
            executed_at,
            base: leg.currency,
            quote: leg.currency,
            action,
            quantity: leg.amount.abs(),
            unit_price: None,
            address: first_text(group, |r| r.address.as_deref()),
            note: first_text(group, |r| r.note.as_deref()),
            row: leg.record.line,
        }))
    }

    fn standalone_fee(&self, group: &TransactionGroup, fee: &FeeLeg) -> RowResult<TransactionCluster> {
        let currency = fee
            .currency
            .ok_or_else(|| Reject::failed("fee without currency"))?;
        if fee.cost.is_zero() {
            return Err(Reject::ignored(format!("zero-amount {} fee", currency)));
        }
        let executed_at = executed_at(group, fee.record)?;
        Ok(TransactionCluster::builder(fee_transaction(
            currency,
            fee,
            executed_at,
            uid(group, fee.record),
        ))
        .build())
    }

    fn attach_fee(&self, builder: &mut ClusterBuilder, fee: &FeeLeg) {
        let (base, quote, main_at) = {
            let main = builder.main();
            (main.base, main.quote, main.executed_at)
        };
        let line = fee.record.line;
        let currency = match fee.currency {
            Some(c) => c,
            None => {
                builder.failed_fee(format!("row {}: fee without currency", line));
                return;
            }
        };
        if fee.cost.is_zero() {
            builder.ignored_fee(format!("row {}: zero-amount {} fee", line, currency));
            return;
        }
        if currency != base && currency != quote {
            let reason = if base == quote {
                format!("row {}: fee currency {} differs from {}", line, currency, base)
            } else {
                format!(
                    "row {}: fee currency {} is neither {} nor {}",
                    line, currency, base, quote
                )
            };
            builder.failed_fee(reason);
            return;
        }
        let executed_at = fee.record.executed_at.unwrap_or(main_at);
        builder.related(fee_transaction(currency, fee, executed_at, None));
    }
}

fn fee_transaction(
    currency: Currency,
    fee: &FeeLeg,
    executed_at: DateTime<Utc>,
    uid: Option<String>,
) -> ImportedTransaction {
    ImportedTransaction {
        uid,
        executed_at,
        base: currency,
        quote: currency,
        action: if fee.cost.is_sign_positive() {
            Action::Fee
        } else {
            Action::Rebate
        },
        quantity: fee.cost.abs(),
        unit_price: None,
        address: None,
        note: fee.record.note.clone(),
        row: fee.record.line,
    }
}

fn required_currency(record: &RawRecord) -> RowResult<Currency> {
    record
        .currency
        .ok_or_else(|| Reject::failed(format!("row {}: missing currency", record.line)))
}

fn required_amount(record: &RawRecord) -> RowResult<Decimal> {
    record
        .amount
        .ok_or_else(|| Reject::failed(format!("row {}: missing amount", record.line)))
}

fn executed_at(group: &TransactionGroup, preferred: &RawRecord) -> RowResult<DateTime<Utc>> {
    preferred
        .executed_at
        .or_else(|| group.records.iter().find_map(|r| r.executed_at))
        .ok_or_else(|| Reject::failed("missing execution time"))
}

fn uid(group: &TransactionGroup, preferred: &RawRecord) -> Option<String> {
    group.key.clone().or_else(|| preferred.id.clone())
}

fn first_text<F>(group: &TransactionGroup, f: F) -> Option<String>
where
    F: Fn(&RawRecord) -> Option<&str>,
{
    group.records.iter().find_map(|r| f(r)).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::RuleSet;
    use crate::report::ErrorKind;
    use crate::signature::HeaderTemplate;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn cur(code: &str) -> Currency {
        Currency::lookup(code).unwrap()
    }

    fn format(discriminant: Discriminant, orientation: Orientation) -> ExchangeFormat {
        let mut f = ExchangeFormat::stub("test", HeaderTemplate::ordered(&["x"]).unwrap());
        f.rules = RuleSet {
            discriminant,
            orientation,
            fee_currency: FeeCurrency::Row,
            default_quote: None,
        };
        f
    }

    fn signed() -> ExchangeFormat {
        format(
            Discriminant::AmountSign,
            Orientation::NonFiatBase {
                quote_priority: &["USDT", "BTC"],
            },
        )
    }

    fn rec(line: usize, id: &str, code: &str, amount: &str, fee: &str) -> RawRecord {
        RawRecord {
            line,
            raw: format!("{},{},{},{}", id, code, amount, fee),
            id: Some(id.to_string()),
            executed_at: Some(Utc.with_ymd_and_hms(2021, 3, 4, 10, 0, 0).unwrap()),
            currency: Currency::lookup(code),
            amount: Some(dec(amount)),
            fee: Some(dec(fee)),
            ..RawRecord::default()
        }
    }

    fn one_group(records: Vec<RawRecord>) -> TransactionGroup {
        TransactionGroup {
            key: records[0].id.clone(),
            records,
            rejected: Vec::new(),
        }
    }

    #[test]
    fn test_two_leg_buy_with_fee() {
        let f = signed();
        let r = Reconstructor::new(&f, 10);
        let cluster = r
            .reconstruct(&one_group(vec![
                rec(2, "R1", "ETH", "0.5", "0"),
                rec(3, "R1", "USD", "-100", "0.26"),
            ]))
            .unwrap();

        let main = cluster.main();
        assert_eq!(main.action, Action::Buy);
        assert_eq!(main.base, cur("ETH"));
        assert_eq!(main.quote, cur("USD"));
        assert_eq!(main.quantity, dec("0.5"));
        assert_eq!(main.unit_price.unwrap().value(), dec("200"));
        assert_eq!(main.uid.as_deref(), Some("R1"));

        assert_eq!(cluster.related().len(), 1);
        let fee = &cluster.related()[0];
        assert_eq!(fee.action, Action::Fee);
        assert_eq!(fee.base, cur("USD"));
        assert_eq!(fee.quantity, dec("0.26"));
        assert_eq!(cluster.ignored_fee_count(), 0);
        assert_eq!(cluster.failed_fee_count(), 0);
    }

    #[test]
    fn test_sell_orientation() {
        let f = signed();
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![
                rec(2, "S", "BTC", "-0.25", "0"),
                rec(3, "S", "EUR", "10000", "0"),
            ]))
            .unwrap();
        assert_eq!(cluster.main().action, Action::Sell);
        assert_eq!(cluster.main().base, cur("BTC"));
        assert_eq!(cluster.main().unit_price.unwrap().value(), dec("40000"));
    }

    #[test]
    fn test_crypto_pair_uses_quote_priority() {
        let f = signed();
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![
                rec(2, "C", "BTC", "-0.1", "0"),
                rec(3, "C", "ETH", "3", "0"),
            ]))
            .unwrap();
        // BTC is in the quote priority list, so ETH is bought with BTC
        assert_eq!(cluster.main().action, Action::Buy);
        assert_eq!(cluster.main().base, cur("ETH"));
        assert_eq!(cluster.main().quote, cur("BTC"));
        assert_eq!(
            cluster.main().unit_price.unwrap().value(),
            dec("0.0333333333")
        );
    }

    #[test]
    fn test_crypto_pair_without_priority_takes_incoming_base() {
        let f = signed();
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![
                rec(2, "C", "ADA", "100", "0"),
                rec(3, "C", "DOT", "-5", "0"),
            ]))
            .unwrap();
        assert_eq!(cluster.main().base, cur("ADA"));
        assert_eq!(cluster.main().action, Action::Buy);
    }

    #[test]
    fn test_single_signed_leg_is_transfer() {
        let f = signed();
        let r = Reconstructor::new(&f, 10);
        let deposit = r
            .reconstruct(&one_group(vec![rec(2, "R2", "BTC", "1", "0")]))
            .unwrap();
        assert_eq!(deposit.main().action, Action::Deposit);
        assert_eq!(deposit.main().base, deposit.main().quote);
        assert!(deposit.related().is_empty());

        let withdrawal = r
            .reconstruct(&one_group(vec![rec(2, "W", "BTC", "-1", "0.0005")]))
            .unwrap();
        assert_eq!(withdrawal.main().action, Action::Withdrawal);
        assert_eq!(withdrawal.main().quantity, dec("1"));
        assert_eq!(withdrawal.related()[0].quantity, dec("0.0005"));
    }

    #[test]
    fn test_same_fiat_legs_fail() {
        let f = signed();
        let err = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![
                rec(2, "X", "USD", "100", "0"),
                rec(3, "X", "USD", "-100", "0"),
            ]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
        assert!(err.message().contains("USD"));
    }

    #[test]
    fn test_same_sign_legs_fail() {
        let f = signed();
        let err = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![
                rec(2, "X", "BTC", "1", "0"),
                rec(3, "X", "USD", "100", "0"),
            ]))
            .unwrap_err();
        assert!(err.message().contains("opposite signs"));
    }

    #[test]
    fn test_three_legs_unclassifiable() {
        let f = signed();
        let err = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![
                rec(2, "X", "BTC", "1", "0"),
                rec(3, "X", "USD", "-100", "0"),
                rec(4, "X", "EUR", "-5", "0"),
            ]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
        assert!(err.message().contains("cannot classify"));
    }

    #[test]
    fn test_fee_in_foreign_currency_is_failed_fee() {
        let f = signed();
        let mut quote = rec(3, "F", "USDT", "-50", "0.01");
        quote.fee_currency = Currency::lookup("BNB");
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![rec(2, "F", "ETH", "0.02", "0"), quote]))
            .unwrap();
        assert_eq!(cluster.failed_fee_count(), 1);
        assert!(cluster.related().is_empty());
        assert_eq!(
            cluster.failed_fee_reasons()[0],
            "row 3: fee currency BNB is neither ETH nor USDT"
        );
    }

    fn classify(record: &RawRecord) -> Role {
        match record.kind_lower().as_str() {
            "trade" => Role::Trade,
            "fee" => Role::Fee,
            "deposit" => Role::Deposit,
            "withdrawal" => Role::Withdrawal,
            "staking" => Role::Reward,
            "transfer" => Role::Skip("internal transfer"),
            _ => Role::Unknown,
        }
    }

    fn kind(mut r: RawRecord, kind: &str) -> RawRecord {
        r.kind = Some(kind.to_string());
        r
    }

    fn typed() -> ExchangeFormat {
        format(
            Discriminant::Classify(classify),
            Orientation::NonFiatBase { quote_priority: &[] },
        )
    }

    #[test]
    fn test_fee_rows_zero_and_rebate() {
        let f = typed();
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![
                kind(rec(2, "T", "BTC", "0.1", "0"), "trade"),
                kind(rec(3, "T", "EUR", "-3000", "0"), "trade"),
                kind(rec(4, "T", "EUR", "-1.5", "0"), "fee"),
                kind(rec(5, "T", "EUR", "0", "0"), "fee"),
                kind(rec(6, "T", "BTC", "0.0001", "0"), "fee"),
            ]))
            .unwrap();
        let actions: Vec<Action> = cluster.related().iter().map(|t| t.action).collect();
        assert_eq!(actions, vec![Action::Fee, Action::Rebate]);
        assert_eq!(cluster.ignored_fee_count(), 1);
        assert_eq!(cluster.main().unit_price.unwrap().value(), dec("30000"));
    }

    #[test]
    fn test_withdrawal_role_normalizes_sign() {
        let f = typed();
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![kind(rec(2, "W", "ETH", "2", "0"), "withdrawal")]))
            .unwrap();
        assert_eq!(cluster.main().action, Action::Withdrawal);
        assert_eq!(cluster.main().quantity, dec("2"));
    }

    #[test]
    fn test_reward_and_skip_and_unknown() {
        let f = typed();
        let r = Reconstructor::new(&f, 10);
        let reward = r
            .reconstruct(&one_group(vec![kind(rec(2, "S", "DOT", "0.3", "0"), "staking")]))
            .unwrap();
        assert_eq!(reward.main().action, Action::Reward);

        let skipped = r
            .reconstruct(&one_group(vec![kind(rec(2, "X", "DOT", "1", "0"), "transfer")]))
            .unwrap_err();
        assert_eq!(skipped, Reject::ignored("internal transfer"));

        let unknown = r
            .reconstruct(&one_group(vec![kind(rec(2, "X", "DOT", "1", "0"), "margin")]))
            .unwrap_err();
        assert_eq!(unknown, Reject::failed("unsupported transaction type 'margin'"));
    }

    #[test]
    fn test_lone_trade_leg_with_type_column_fails() {
        let f = typed();
        let err = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![kind(rec(2, "T", "BTC", "1", "0"), "trade")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
    }

    #[test]
    fn test_standalone_fee() {
        let f = typed();
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![kind(rec(2, "F", "EUR", "-2", "0"), "fee")]))
            .unwrap();
        assert_eq!(cluster.main().action, Action::Fee);
        assert_eq!(cluster.main().quantity, dec("2"));
    }

    fn declared_classify(record: &RawRecord) -> Role {
        match record.kind_lower().as_str() {
            "buy" => Role::Buy,
            "sell" => Role::Sell,
            _ => Role::Unknown,
        }
    }

    fn declared() -> ExchangeFormat {
        let mut f = format(Discriminant::Classify(declared_classify), Orientation::Declared);
        f.rules.fee_currency = FeeCurrency::Quote;
        f.rules.default_quote = Some("USD");
        f
    }

    #[test]
    fn test_single_row_trade_with_total() {
        let f = declared();
        let mut r = kind(rec(2, "D", "BTC", "0.5", "1.99"), "sell");
        r.quote_amount = Some(dec("25000"));
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![r]))
            .unwrap();
        assert_eq!(cluster.main().action, Action::Sell);
        assert_eq!(cluster.main().quote, cur("USD"));
        assert_eq!(cluster.main().unit_price.unwrap().value(), dec("50000"));
        assert_eq!(cluster.related()[0].base, cur("USD"));
        assert_eq!(cluster.related()[0].quantity, dec("1.99"));
    }

    #[test]
    fn test_single_row_trade_keeps_declared_price() {
        let f = declared();
        let mut r = kind(rec(2, "D", "ETH", "2", "0"), "buy");
        r.quote_currency = Currency::lookup("EUR");
        r.price = Some(dec("-3"));
        let cluster = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![r]))
            .unwrap();
        assert!(cluster.main().unit_price.unwrap().is_negative());
        assert_eq!(cluster.main().quote, cur("EUR"));
    }

    #[test]
    fn test_untradeable_or_premature_pair_fails() {
        let f = signed();
        let mut eth = rec(2, "P", "ETH", "1", "0");
        eth.executed_at = Some(Utc.with_ymd_and_hms(2014, 1, 1, 0, 0, 0).unwrap());
        let mut usd = rec(3, "P", "USD", "-10", "0");
        usd.executed_at = eth.executed_at;
        let err = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![eth, usd]))
            .unwrap_err();
        assert!(err.message().contains("did not exist"));
    }

    #[test]
    fn test_missing_currency_fails_group() {
        let f = signed();
        let mut r = rec(2, "M", "BTC", "1", "0");
        r.currency = None;
        let err = Reconstructor::new(&f, 10)
            .reconstruct(&one_group(vec![r]))
            .unwrap_err();
        assert_eq!(err, Reject::failed("row 2: missing currency"));
    }

    #[test]
    fn test_group_with_rejected_slot_fails() {
        let f = signed();
        let mut g = one_group(vec![rec(3, "W", "CZK", "-10000", "0")]);
        g.rejected.push(2);
        let err = Reconstructor::new(&f, 10).reconstruct(&g).unwrap_err();
        assert_eq!(err, Reject::failed("trade leg paired with rejected row 2"));
    }
}
