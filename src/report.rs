//! Row-scoped outcomes and per-file statistics.

use crate::transaction::TransactionCluster;
use serde::Serialize;
use std::fmt;

/// Why a row or group was not imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErrorKind {
    /// A real event deliberately not imported.
    Ignored,
    /// The row could not be interpreted.
    Failed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Ignored => f.write_str("IGNORED"),
            ErrorKind::Failed => f.write_str("FAILED"),
        }
    }
}

/// Typed rejection returned by mapping, reconstruction and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reject {
    Ignored(String),
    Failed(String),
}

impl Reject {
    pub fn ignored(message: impl Into<String>) -> Self {
        Reject::Ignored(message.into())
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Reject::Failed(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Reject::Ignored(_) => ErrorKind::Ignored,
            Reject::Failed(_) => ErrorKind::Failed,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Reject::Ignored(m) | Reject::Failed(m) => m,
        }
    }
}

impl fmt::Display for Reject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

/// Result of a row- or group-scoped step.
pub type RowResult<T> = std::result::Result<T, Reject>;

/// One unresolvable row or group, kept for operator triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// Line number of the first row involved (1-based, header included).
    pub row: usize,
    /// Raw text of every row involved, newline separated.
    pub raw_row: String,
    pub message: String,
    pub kind: ErrorKind,
}

impl RowError {
    pub fn new(row: usize, raw_row: impl Into<String>, reject: Reject) -> Self {
        RowError {
            row,
            raw_row: raw_row.into(),
            kind: reject.kind(),
            message: reject.message().to_string(),
        }
    }
}

/// Aggregate counts derived from a finished parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStatistic {
    pub cluster_count: usize,
    pub failed_row_count: usize,
    pub ignored_row_count: usize,
    pub ignored_fee_transaction_count: usize,
    pub failed_fee_transaction_count: usize,
}

impl ConversionStatistic {
    pub fn collect(clusters: &[TransactionCluster], errors: &[RowError]) -> Self {
        let failed_row_count = errors
            .iter()
            .filter(|e| e.kind == ErrorKind::Failed)
            .count();
        ConversionStatistic {
            cluster_count: clusters.len(),
            failed_row_count,
            ignored_row_count: errors.len() - failed_row_count,
            ignored_fee_transaction_count: clusters.iter().map(|c| c.ignored_fee_count()).sum(),
            failed_fee_transaction_count: clusters.iter().map(|c| c.failed_fee_count()).sum(),
        }
    }
}

/// Everything produced from one input file.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Identifier of the detected format.
    pub format: &'static str,
    pub clusters: Vec<TransactionCluster>,
    pub errors: Vec<RowError>,
}

impl ParseResult {
    pub fn statistic(&self) -> ConversionStatistic {
        ConversionStatistic::collect(&self.clusters, &self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_kind_and_message() {
        let r = Reject::ignored("pending");
        assert_eq!(r.kind(), ErrorKind::Ignored);
        assert_eq!(r.message(), "pending");
        assert_eq!(r.to_string(), "IGNORED: pending");

        let r = Reject::failed("bad number");
        assert_eq!(r.kind(), ErrorKind::Failed);
    }

    #[test]
    fn test_statistic_counts_by_kind() {
        let errors = vec![
            RowError::new(2, "a", Reject::failed("x")),
            RowError::new(3, "b", Reject::ignored("y")),
            RowError::new(4, "c", Reject::ignored("z")),
        ];
        let stat = ConversionStatistic::collect(&[], &errors);
        assert_eq!(stat.failed_row_count, 1);
        assert_eq!(stat.ignored_row_count, 2);
        assert_eq!(stat.cluster_count, 0);
    }
}
