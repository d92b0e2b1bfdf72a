//! Cluster validation applied after reconstruction.

use crate::config::ImportConfig;
use crate::report::{Reject, RowResult};
use crate::transaction::{ImportedTransaction, TransactionCluster};
use rust_decimal::Decimal;

/// Accepts or rejects a freshly built cluster.
///
/// Any quantity or volume above `max_volume` is treated as a corrupted
/// number and fails the cluster. A negative unit price on the main
/// transaction is an export quirk: the cluster is ignored rather than
/// failed.
pub fn finalize(cluster: TransactionCluster, config: &ImportConfig) -> RowResult<TransactionCluster> {
    for tx in cluster.transactions() {
        check_bounds(tx, config.max_volume)?;
    }

    if let Some(price) = cluster.main().unit_price {
        if price.is_negative() {
            return Err(Reject::ignored(format!(
                "negative unit price {} for {}",
                price,
                cluster.main().pair()
            )));
        }
    }
    Ok(cluster)
}

fn check_bounds(tx: &ImportedTransaction, max: Decimal) -> RowResult<()> {
    if tx.quantity > max {
        return Err(Reject::failed(format!(
            "{} quantity {} {} exceeds {}",
            tx.action, tx.quantity, tx.base, max
        )));
    }
    match tx.volume() {
        Some(volume) if volume.abs() > max => Err(Reject::failed(format!(
            "{} volume {} {} exceeds {}",
            tx.action,
            volume.abs(),
            tx.quote,
            max
        ))),
        Some(_) => Ok(()),
        // quantity * price overflowed the decimal range
        None if tx.unit_price.is_some() => Err(Reject::failed(format!(
            "{} volume of {} {} overflows",
            tx.action, tx.quantity, tx.base
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;
    use crate::decimal::UnitPrice;
    use crate::report::ErrorKind;
    use crate::transaction::Action;
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn buy(qty: &str, price: &str) -> TransactionCluster {
        TransactionCluster::builder(ImportedTransaction {
            uid: None,
            executed_at: Utc.with_ymd_and_hms(2021, 3, 4, 10, 0, 0).unwrap(),
            base: Currency::lookup("BTC").unwrap(),
            quote: Currency::lookup("USD").unwrap(),
            action: Action::Buy,
            quantity: Decimal::from_str(qty).unwrap(),
            unit_price: Some(UnitPrice::new(Decimal::from_str(price).unwrap(), 10)),
            address: None,
            note: None,
            row: 2,
        })
        .build()
    }

    #[test]
    fn test_valid_cluster_passes() {
        let config = ImportConfig::default();
        assert!(finalize(buy("0.5", "40000"), &config).is_ok());
    }

    #[test]
    fn test_volume_above_bound_fails() {
        let config = ImportConfig::default();
        let err = finalize(buy("1000000", "2000000"), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Failed);
        assert!(err.message().contains("volume"));
    }

    #[test]
    fn test_quantity_above_bound_fails() {
        let config = ImportConfig {
            max_volume: Decimal::from(100),
            ..ImportConfig::default()
        };
        let err = finalize(buy("101", "0.0001"), &config).unwrap_err();
        assert!(err.message().contains("quantity"));
    }

    #[test]
    fn test_negative_price_is_ignored() {
        let config = ImportConfig::default();
        let err = finalize(buy("1", "-5"), &config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ignored);
        assert!(err.message().contains("BTC/USD"));
    }
}
