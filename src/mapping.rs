//! Record mapper: binds raw row cells to typed record fields.
//!
//! Conversion failures are scoped to their row. A row that signals a
//! deliberately skippable state is reported as ignored instead of failed.

use crate::currency::Currency;
use crate::decimal::parse_amount;
use crate::error::Result;
use crate::format::{registration_error, Binding, Conversion, ExchangeFormat, Field, RowFilter};
use crate::reader::RawRow;
use crate::report::{Reject, RowError, RowResult};
use crate::signature::TokenMatcher;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;

/// One exchange row with its cells converted to typed fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based line number in the input.
    pub line: usize,
    pub raw: String,
    pub id: Option<String>,
    pub executed_at: Option<DateTime<Utc>>,
    pub kind: Option<String>,
    pub side: Option<String>,
    pub currency: Option<Currency>,
    pub amount: Option<Decimal>,
    pub quote_currency: Option<Currency>,
    pub quote_amount: Option<Decimal>,
    pub price: Option<Decimal>,
    pub fee: Option<Decimal>,
    pub fee_currency: Option<Currency>,
    pub address: Option<String>,
    pub note: Option<String>,
}

/// One row after mapping, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappedRow {
    Accepted(RawRecord),
    /// Reported as a row error; holds the cells that did convert.
    Rejected(RawRecord),
}

impl RawRecord {
    /// The kind column, lower-cased and trimmed, or `""`.
    pub fn kind_lower(&self) -> String {
        self.kind.as_deref().unwrap_or_default().trim().to_lowercase()
    }

    /// The side column, lower-cased and trimmed, or `""`.
    pub fn side_lower(&self) -> String {
        self.side.as_deref().unwrap_or_default().trim().to_lowercase()
    }

    fn is_set(&self, field: Field) -> bool {
        match field {
            Field::Id => self.id.is_some(),
            Field::ExecutedAt => self.executed_at.is_some(),
            Field::Kind => self.kind.is_some(),
            Field::Side => self.side.is_some(),
            Field::Currency => self.currency.is_some(),
            Field::Amount => self.amount.is_some(),
            Field::QuoteCurrency => self.quote_currency.is_some(),
            Field::QuoteAmount => self.quote_amount.is_some(),
            Field::Price => self.price.is_some(),
            Field::Fee => self.fee.is_some(),
            Field::FeeCurrency => self.fee_currency.is_some(),
            Field::Address => self.address.is_some(),
            Field::Note => self.note.is_some(),
        }
    }

    fn set_text(&mut self, field: Field, value: String) {
        match field {
            Field::Id => self.id = Some(value),
            Field::Kind => self.kind = Some(value),
            Field::Side => self.side = Some(value),
            Field::Address => self.address = Some(value),
            Field::Note => self.note = Some(value),
            _ => {}
        }
    }

    fn set_currency(&mut self, field: Field, value: Currency) {
        match field {
            Field::Currency => self.currency = Some(value),
            Field::QuoteCurrency => self.quote_currency = Some(value),
            Field::FeeCurrency => self.fee_currency = Some(value),
            _ => {}
        }
    }

    fn set_decimal(&mut self, field: Field, value: Decimal) {
        match field {
            Field::Amount => self.amount = Some(value),
            Field::QuoteAmount => self.quote_amount = Some(value),
            Field::Price => self.price = Some(value),
            Field::Fee => self.fee = Some(value),
            _ => {}
        }
    }
}

/// Parses an instant with the first matching pattern.
///
/// Offset-aware patterns keep their offset; naive ones are read as UTC. A
/// trailing ` UTC` is tolerated. Date-only patterns yield midnight.
pub fn parse_instant(text: &str, patterns: &[&str]) -> Option<DateTime<Utc>> {
    let text = text.trim();
    let text = text.strip_suffix(" UTC").unwrap_or(text).trim();
    for pattern in patterns {
        if let Ok(dt) = DateTime::parse_from_str(text, pattern) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Some(Utc.from_utc_datetime(&naive));
        }
        if let Some(naive) = NaiveDate::parse_from_str(text, pattern)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Splits `"0.5 BTC"` or `"BTC 0.5"` into its number and code.
fn split_amount_and_code(text: &str) -> Option<(&str, &str)> {
    let mut parts = text.split_whitespace();
    let (first, second) = (parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    if first.chars().any(|c| c.is_ascii_digit()) {
        Some((first, second))
    } else {
        Some((second, first))
    }
}

struct BoundColumn {
    index: usize,
    binding: Binding,
}

/// Maps raw rows of one file into [`RawRecord`]s for a detected format.
pub struct RecordMapper<'a> {
    format: &'a ExchangeFormat,
    columns: Vec<BoundColumn>,
    filter_column: Option<usize>,
}

impl<'a> RecordMapper<'a> {
    /// Resolves the format's bindings against the file's header.
    ///
    /// Bindings whose column is absent are skipped; such a column may only
    /// be optional in the header template.
    pub fn new(format: &'a ExchangeFormat, header: &[String]) -> Result<Self> {
        let find = |column: &str| -> Result<Option<usize>> {
            let matcher = TokenMatcher::parse(column).map_err(registration_error(format.id))?;
            Ok(header.iter().position(|h| matcher.matches(h)))
        };

        let mut columns = Vec::new();
        for binding in &format.bindings {
            if let Some(index) = find(binding.column)? {
                columns.push(BoundColumn {
                    index,
                    binding: *binding,
                });
            }
        }

        let filter_column = match format.row_filter {
            RowFilter::None => None,
            RowFilter::TerminalStatus { column, .. } | RowFilter::RequireValue { column, .. } => {
                find(column)?
            }
        };

        Ok(RecordMapper {
            format,
            columns,
            filter_column,
        })
    }

    /// Maps every row, collecting per-row errors instead of stopping.
    ///
    /// Rows come back in file order. A rejected row is kept with the cells
    /// that did convert, so positional grouping still counts it.
    pub fn map_all(&self, rows: &[RawRow]) -> (Vec<MappedRow>, Vec<RowError>) {
        let mut mapped = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();
        for row in rows {
            let (record, outcome) = self.map_partial(row);
            match outcome {
                Ok(()) => mapped.push(MappedRow::Accepted(record)),
                Err(reject) => {
                    match &reject {
                        Reject::Ignored(msg) => debug!("Row {}: ignored: {}", row.line, msg),
                        Reject::Failed(msg) => warn!("Row {}: {}", row.line, msg),
                    }
                    errors.push(RowError::new(row.line, row.raw.clone(), reject));
                    mapped.push(MappedRow::Rejected(record));
                }
            }
        }
        (mapped, errors)
    }

    /// Maps a single row.
    pub fn map_row(&self, row: &RawRow) -> RowResult<RawRecord> {
        let (record, outcome) = self.map_partial(row);
        outcome.map(|()| record)
    }

    /// Converts every bound cell, keeping the first conversion error.
    fn map_partial(&self, row: &RawRow) -> (RawRecord, RowResult<()>) {
        let mut record = RawRecord {
            line: row.line,
            raw: row.raw.clone(),
            ..RawRecord::default()
        };
        let mut failure = None;
        for column in &self.columns {
            let cell = row.field(column.index).unwrap_or_default();
            if let Err(message) = self.convert(&mut record, &column.binding, cell) {
                failure.get_or_insert(message);
            }
        }

        let outcome = match (self.skip_reason(row), failure) {
            (Some(reason), _) => Err(Reject::Ignored(reason)),
            (None, Some(message)) => Err(Reject::Failed(message)),
            (None, None) => Ok(()),
        };
        (record, outcome)
    }

    fn skip_reason(&self, row: &RawRow) -> Option<String> {
        let cell = self
            .filter_column
            .and_then(|i| row.field(i))
            .unwrap_or_default()
            .trim();
        match self.format.row_filter {
            RowFilter::None => None,
            RowFilter::TerminalStatus { accepted, .. } => {
                if accepted.iter().any(|a| a.eq_ignore_ascii_case(cell)) {
                    None
                } else {
                    Some(format!("non-terminal status '{}'", cell))
                }
            }
            RowFilter::RequireValue { reason, .. } => {
                cell.is_empty().then(|| reason.to_string())
            }
        }
    }

    fn convert(&self, record: &mut RawRecord, binding: &Binding, cell: &str) -> std::result::Result<(), String> {
        let cell = cell.trim();
        if cell.is_empty() {
            return if binding.required {
                Err(format!("missing value in column '{}'", binding.column))
            } else {
                Ok(())
            };
        }
        // first non-blank binding of a field wins
        if record.is_set(binding.field) {
            return Ok(());
        }

        let field = binding.field;
        let style = self.format.number_style;
        let bad = |what: &str| format!("invalid {} '{}' in column '{}'", what, cell, binding.column);
        let currency = |code: &str| {
            self.format
                .resolve_currency(code)
                .map_err(|r| r.message().to_string())
        };

        match binding.conversion {
            Conversion::Text => record.set_text(field, cell.to_string()),
            Conversion::Currency => record.set_currency(field, currency(cell)?),
            Conversion::Decimal => {
                let value = parse_amount(cell, style).ok_or_else(|| bad("number"))?;
                record.set_decimal(field, value);
            }
            Conversion::Instant(patterns) => {
                record.executed_at = Some(parse_instant(cell, patterns).ok_or_else(|| bad("date"))?);
            }
            Conversion::UnixSeconds | Conversion::UnixMillis => {
                let value: i64 = cell.parse().map_err(|_| bad("timestamp"))?;
                let at = if binding.conversion == Conversion::UnixSeconds {
                    Utc.timestamp_opt(value, 0).single()
                } else {
                    Utc.timestamp_millis_opt(value).single()
                };
                record.executed_at = Some(at.ok_or_else(|| bad("timestamp"))?);
            }
            Conversion::AmountWithCurrency => {
                let (number, code) = split_amount_and_code(cell).ok_or_else(|| bad("amount"))?;
                let value = parse_amount(number, style).ok_or_else(|| bad("number"))?;
                record.set_decimal(field, value);
                if let Some(slot) = field.paired_currency() {
                    if !record.is_set(slot) {
                        record.set_currency(slot, currency(code)?);
                    }
                }
            }
            Conversion::Pair => {
                let mut parts = cell.split(|c| c == '/' || c == '-' || c == '_');
                let (base, quote) = match (parts.next(), parts.next(), parts.next()) {
                    (Some(b), Some(q), None) => (b, q),
                    _ => return Err(bad("pair")),
                };
                record.currency = Some(currency(base)?);
                record.quote_currency = Some(currency(quote)?);
            }
        }
        Ok(())
    }
}
