//! # Exchange Import
//!
//! Normalizes transaction-history exports of cryptocurrency exchanges into
//! one canonical transaction model.
//!
//! ## Pipeline
//!
//! - **Tabular reader**: BOM-aware, delimiter candidates `;`, `,`, sniffed
//! - **Signature matcher**: finds the unique registered format for a header
//! - **Record mapper**: typed, per-row fault-isolated cell conversion
//! - **Grouper and reconstructor**: correlates rows into one logical event
//!   and classifies it as a trade, transfer, reward or fee
//! - **Validator**: fixed-scale half-up unit prices, magnitude bounds
//!
//! A malformed row or group never aborts a file: it is reported as a
//! [`RowError`] and the remaining rows are still imported.
//!
//! ## Example
//!
//! ```no_run
//! use exchange_import::{ImportConfig, Importer};
//!
//! let csv = "id,date,currency,amount,fee\n\
//!            R1,2021-03-04 10:00:00,ETH,0.5,0\n\
//!            R1,2021-03-04 10:00:00,USD,-100,0.26\n";
//! let importer = Importer::new(ImportConfig::default()).unwrap();
//! let result = importer.parse_str(csv).unwrap();
//! exchange_import::write_transactions(&result.clusters, std::io::stdout()).unwrap();
//! ```

pub mod config;
pub mod currency;
pub mod decimal;
pub mod engine;
pub mod error;
pub mod exchanges;
pub mod format;
pub mod grouping;
pub mod mapping;
pub mod reader;
pub mod reconstruct;
pub mod report;
pub mod signature;
pub mod transaction;
pub mod validate;

pub use config::ImportConfig;
pub use currency::{Currency, CurrencyPair};
pub use decimal::UnitPrice;
pub use engine::{write_errors, write_transactions, Importer};
pub use error::{ImportError, Result};
pub use format::{ExchangeFormat, FormatRegistry};
pub use report::{ConversionStatistic, ErrorKind, ParseResult, Reject, RowError};
pub use transaction::{Action, ImportedTransaction, TransactionCluster};
