//! Fault-isolating import driver.
//!
//! Runs detection, mapping, grouping, reconstruction and validation over one
//! file. Only I/O failures and header problems abort; every row or group
//! that cannot be imported becomes a [`RowError`] and processing continues.

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use crate::format::FormatRegistry;
use crate::grouping::group;
use crate::mapping::RecordMapper;
use crate::reader::{delimiter_candidates, header_line, read_table, read_text};
use crate::reconstruct::Reconstructor;
use crate::report::{ParseResult, Reject, RowError};
use crate::signature::{detect, Detection};
use crate::transaction::{TransactionCluster, TransactionRow};
use crate::validate::finalize;
use csv::WriterBuilder;
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

const TRANSACTION_COLUMNS: [&str; 11] = [
    "cluster",
    "uid",
    "executed_at",
    "action",
    "base",
    "quote",
    "quantity",
    "unit_price",
    "address",
    "note",
    "row",
];

const ERROR_COLUMNS: [&str; 4] = ["row", "raw_row", "message", "kind"];

/// The import engine.
///
/// Holds the read-only format registry and settings; each parse call is
/// independent, so one `Importer` can be shared across threads.
pub struct Importer {
    registry: FormatRegistry,
    config: ImportConfig,
}

impl Importer {
    /// Creates an importer over every built-in exchange format.
    pub fn new(config: ImportConfig) -> Result<Self> {
        Ok(Importer::with_registry(FormatRegistry::builtin()?, config))
    }

    pub fn with_registry(registry: FormatRegistry, config: ImportConfig) -> Self {
        Importer { registry, config }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Identifies the format of `text` from its first non-blank line.
    pub fn detect(&self, text: &str) -> Result<Detection<'_>> {
        let (_, header) = header_line(text).ok_or(ImportError::EmptyInput)?;
        let candidates = delimiter_candidates(header, self.config.delimiter);
        detect(&self.registry, header, &candidates)
    }

    /// Parses an export file from disk.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<ParseResult> {
        let file = File::open(path)?;
        self.parse_reader(BufReader::new(file))
    }

    /// Drains `reader` fully, then parses its content.
    pub fn parse_reader<R: Read>(&self, reader: R) -> Result<ParseResult> {
        let text = read_text(reader)?;
        self.parse_str(&text)
    }

    /// Parses export content already held in memory.
    ///
    /// Errors are returned sorted by row number. Clusters keep the order in
    /// which their groups first appear in the file.
    pub fn parse_str(&self, text: &str) -> Result<ParseResult> {
        let detection = self.detect(text)?;
        let format = detection.format;
        let table = read_table(text, detection.delimiter)?;

        let mapper = RecordMapper::new(format, &table.header)?;
        let (mapped, mut errors) = mapper.map_all(&table.rows);

        let reconstructor = Reconstructor::new(format, self.config.price_scale);
        let mut clusters = Vec::new();
        for group in group(mapped, format) {
            let outcome = reconstructor
                .reconstruct(&group)
                .and_then(|cluster| finalize(cluster, &self.config));
            match outcome {
                Ok(cluster) => {
                    for reason in cluster.ignored_fee_reasons() {
                        debug!("Ignored fee: {}", reason);
                    }
                    for reason in cluster.failed_fee_reasons() {
                        warn!("Failed fee: {}", reason);
                    }
                    clusters.push(cluster);
                }
                Err(reject) => {
                    let row = group.first_line();
                    match &reject {
                        Reject::Ignored(msg) => debug!("Row {}: ignored group: {}", row, msg),
                        Reject::Failed(msg) => warn!("Row {}: {}", row, msg),
                    }
                    errors.push(RowError::new(row, group.raw_text(), reject));
                }
            }
        }
        errors.sort_by_key(|e| e.row);

        let result = ParseResult {
            format: format.id,
            clusters,
            errors,
        };
        let stats = result.statistic();
        info!(
            "Imported {} '{}' rows: {} clusters, {} failed, {} ignored, {} failed fees, {} ignored fees",
            table.rows.len(),
            format.id,
            stats.cluster_count,
            stats.failed_row_count,
            stats.ignored_row_count,
            stats.failed_fee_transaction_count,
            stats.ignored_fee_transaction_count
        );
        Ok(result)
    }
}

/// Writes every transaction of every cluster as CSV, main leg first.
///
/// Clusters are numbered from 1 in the `cluster` column so related legs can
/// be tied back to their main transaction.
pub fn write_transactions<W: Write>(clusters: &[TransactionCluster], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(TRANSACTION_COLUMNS)?;

    for (i, cluster) in clusters.iter().enumerate() {
        for tx in cluster.transactions() {
            csv_writer.serialize(TransactionRow::new(i + 1, tx))?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes row errors as CSV for operator triage.
pub fn write_errors<W: Write>(errors: &[RowError], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(ERROR_COLUMNS)?;

    for error in errors {
        csv_writer.serialize(error)?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ErrorKind;
    use crate::transaction::Action;
    use rust_decimal::Decimal;
    use std::io::Cursor;
    use std::str::FromStr;

    fn importer() -> Importer {
        Importer::new(ImportConfig::default()).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    const LEDGER: &str = "id,date,currency,amount,fee
R1,2021-03-04 10:00:00,ETH,0.5,0
R1,2021-03-04 10:00:00,USD,-100,0.26
R2,2021-03-04 11:00:00,BTC,1,0
";

    #[test]
    fn test_generic_ledger_scenario() {
        let result = importer().parse_str(LEDGER).unwrap();
        assert_eq!(result.format, "ledger");
        assert!(result.errors.is_empty());
        assert_eq!(result.clusters.len(), 2);

        let buy = &result.clusters[0];
        assert_eq!(buy.main().action, Action::Buy);
        assert_eq!(buy.main().quantity, dec("0.5"));
        assert_eq!(buy.main().unit_price.unwrap().value(), dec("200"));
        assert_eq!(buy.related().len(), 1);
        assert_eq!(buy.related()[0].action, Action::Fee);
        assert_eq!(buy.related()[0].quantity, dec("0.26"));

        let deposit = &result.clusters[1];
        assert_eq!(deposit.main().action, Action::Deposit);
        assert_eq!(deposit.main().quantity, dec("1"));
        assert!(deposit.related().is_empty());
    }

    #[test]
    fn test_bad_row_does_not_stop_file() {
        let csv = "id,date,currency,amount
A,2021-03-04 10:00:00,BTC,abc
B,2021-03-04 10:00:00,BTC,1
C,2021-03-04 10:00:00,NOPE,1
D,2021-03-04 10:00:00,ETH,2
";
        let result = importer().parse_str(csv).unwrap();
        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].row, 2);
        assert_eq!(result.errors[0].kind, ErrorKind::Failed);
        assert!(result.errors[1].message.contains("NOPE"));
    }

    #[test]
    fn test_group_error_keeps_all_raw_rows() {
        let csv = "id,date,currency,amount
X,2021-03-04 10:00:00,USD,100
X,2021-03-04 10:00:00,USD,-100
";
        let result = importer().parse_str(csv).unwrap();
        assert!(result.clusters.is_empty());
        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        assert_eq!(error.kind, ErrorKind::Failed);
        assert_eq!(
            error.raw_row,
            "X,2021-03-04 10:00:00,USD,100\nX,2021-03-04 10:00:00,USD,-100"
        );
    }

    #[test]
    fn test_empty_and_unknown_input() {
        assert!(matches!(
            importer().parse_str("\n \n"),
            Err(ImportError::EmptyInput)
        ));
        assert!(matches!(
            importer().parse_str("foo,bar\n1,2\n"),
            Err(ImportError::UnknownHeader { .. })
        ));
    }

    #[test]
    fn test_parse_reader_with_bom() {
        let input = format!("\u{feff}{}", LEDGER);
        let result = importer().parse_reader(Cursor::new(input)).unwrap();
        assert_eq!(result.clusters.len(), 2);
    }

    #[test]
    fn test_write_transactions_output() {
        let result = importer().parse_str(LEDGER).unwrap();
        let mut output = Vec::new();
        write_transactions(&result.clusters, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "cluster,uid,executed_at,action,base,quote,quantity,unit_price,address,note,row"
        );
        assert_eq!(
            lines[1],
            "1,R1,2021-03-04T10:00:00+00:00,BUY,ETH,USD,0.5,200,,,2"
        );
        assert_eq!(lines[2], "1,,2021-03-04T10:00:00+00:00,FEE,USD,USD,0.26,,,,3");
        assert_eq!(lines[3], "2,R2,2021-03-04T11:00:00+00:00,DEPOSIT,BTC,BTC,1,,,,4");
    }

    #[test]
    fn test_write_errors_output() {
        let csv = "id,date,currency,amount
A,2021-03-04 10:00:00,BTC,abc
";
        let result = importer().parse_str(csv).unwrap();
        let mut output = Vec::new();
        write_errors(&result.errors, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("row,raw_row,message,kind\n"));
        assert!(text.contains("FAILED"));
    }
}
