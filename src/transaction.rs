//! Canonical transaction model produced by reconstruction.

use crate::currency::{Currency, CurrencyPair};
use crate::decimal::UnitPrice;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;

/// Economic meaning of an imported transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// Base currency acquired against quote currency.
    Buy,
    /// Base currency disposed of against quote currency.
    Sell,
    Deposit,
    Withdrawal,
    /// Cost charged by the exchange.
    Fee,
    /// Negative fee paid out by the exchange.
    Rebate,
    /// Staking, interest or promotional income.
    Reward,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Deposit => "DEPOSIT",
            Action::Withdrawal => "WITHDRAWAL",
            Action::Fee => "FEE",
            Action::Rebate => "REBATE",
            Action::Reward => "REWARD",
        };
        f.write_str(s)
    }
}

/// One normalized transaction event.
///
/// For non-trade actions `base == quote`: the event moves a single
/// currency. `quantity` is always non-negative; the action carries the
/// direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedTransaction {
    /// Idempotency key supplied by the exchange, if any.
    pub uid: Option<String>,
    pub executed_at: DateTime<Utc>,
    pub base: Currency,
    pub quote: Currency,
    pub action: Action,
    pub quantity: Decimal,
    pub unit_price: Option<UnitPrice>,
    pub address: Option<String>,
    pub note: Option<String>,
    /// Line number of the row this transaction was read from.
    pub row: usize,
}

impl ImportedTransaction {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.base, self.quote)
    }

    /// Quantity times unit price, when a price is known.
    pub fn volume(&self) -> Option<Decimal> {
        self.unit_price
            .and_then(|p| self.quantity.checked_mul(p.value()))
    }
}

/// A reconstructed transaction plus its fee and rebate legs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCluster {
    main: ImportedTransaction,
    related: Vec<ImportedTransaction>,
    ignored_fees: Vec<String>,
    failed_fees: Vec<String>,
}

impl TransactionCluster {
    pub fn builder(main: ImportedTransaction) -> ClusterBuilder {
        ClusterBuilder {
            main,
            related: Vec::new(),
            ignored_fees: Vec::new(),
            failed_fees: Vec::new(),
        }
    }

    pub fn main(&self) -> &ImportedTransaction {
        &self.main
    }

    pub fn related(&self) -> &[ImportedTransaction] {
        &self.related
    }

    /// Main transaction followed by related ones.
    pub fn transactions(&self) -> impl Iterator<Item = &ImportedTransaction> {
        std::iter::once(&self.main).chain(self.related.iter())
    }

    pub fn ignored_fee_count(&self) -> usize {
        self.ignored_fees.len()
    }

    pub fn failed_fee_count(&self) -> usize {
        self.failed_fees.len()
    }

    /// Reasons fee legs were dropped as zero-valued.
    pub fn ignored_fee_reasons(&self) -> &[String] {
        &self.ignored_fees
    }

    /// Reasons fee legs could not be attached.
    pub fn failed_fee_reasons(&self) -> &[String] {
        &self.failed_fees
    }
}

/// Collects the legs of a cluster; the cluster is immutable once built.
#[derive(Debug)]
pub struct ClusterBuilder {
    main: ImportedTransaction,
    related: Vec<ImportedTransaction>,
    ignored_fees: Vec<String>,
    failed_fees: Vec<String>,
}

impl ClusterBuilder {
    pub fn main(&self) -> &ImportedTransaction {
        &self.main
    }

    pub fn related(&mut self, tx: ImportedTransaction) -> &mut Self {
        self.related.push(tx);
        self
    }

    pub fn ignored_fee(&mut self, reason: impl Into<String>) -> &mut Self {
        self.ignored_fees.push(reason.into());
        self
    }

    pub fn failed_fee(&mut self, reason: impl Into<String>) -> &mut Self {
        self.failed_fees.push(reason.into());
        self
    }

    pub fn build(self) -> TransactionCluster {
        TransactionCluster {
            main: self.main,
            related: self.related,
            ignored_fees: self.ignored_fees,
            failed_fees: self.failed_fees,
        }
    }
}

/// Flat, serializable view of one transaction for CSV output.
#[derive(Debug, Serialize)]
pub struct TransactionRow<'a> {
    pub cluster: usize,
    pub uid: Option<&'a str>,
    pub executed_at: String,
    pub action: Action,
    pub base: Currency,
    pub quote: Currency,
    pub quantity: Decimal,
    pub unit_price: Option<UnitPrice>,
    pub address: Option<&'a str>,
    pub note: Option<&'a str>,
    pub row: usize,
}

impl<'a> TransactionRow<'a> {
    pub fn new(cluster: usize, tx: &'a ImportedTransaction) -> Self {
        TransactionRow {
            cluster,
            uid: tx.uid.as_deref(),
            executed_at: tx.executed_at.to_rfc3339(),
            action: tx.action,
            base: tx.base,
            quote: tx.quote,
            quantity: tx.quantity.normalize(),
            unit_price: tx.unit_price,
            address: tx.address.as_deref(),
            note: tx.note.as_deref(),
            row: tx.row,
        }
    }
}
