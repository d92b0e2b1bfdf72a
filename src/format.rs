//! Per-exchange format registration.
//!
//! Each supported export is described by an [`ExchangeFormat`] record: a
//! header signature, a column binding table, a grouping strategy and a
//! reconstruction rule set. Formats are plain data referencing pure
//! functions; the registry is filled once and only read afterwards.

use crate::currency::Currency;
use crate::decimal::NumberStyle;
use crate::error::{ImportError, Result};
use crate::exchanges;
use crate::mapping::RawRecord;
use crate::report::{Reject, RowResult};
use crate::signature::HeaderTemplate;

/// A typed slot of [`RawRecord`] that a column can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    ExecutedAt,
    Kind,
    Side,
    Currency,
    Amount,
    QuoteCurrency,
    QuoteAmount,
    Price,
    Fee,
    FeeCurrency,
    Address,
    Note,
}

impl Field {
    /// The currency slot filled by an amount cell carrying its own code.
    pub fn paired_currency(self) -> Option<Field> {
        match self {
            Field::Amount => Some(Field::Currency),
            Field::QuoteAmount | Field::Price => Some(Field::QuoteCurrency),
            Field::Fee => Some(Field::FeeCurrency),
            _ => None,
        }
    }
}

/// How a cell's text is turned into a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Text,
    Currency,
    Decimal,
    /// `strftime` patterns tried in order.
    Instant(&'static [&'static str]),
    UnixSeconds,
    UnixMillis,
    /// `"0.5 BTC"`: fills the bound amount and its paired currency.
    AmountWithCurrency,
    /// `"BTC/USD"`: fills `Currency` and `QuoteCurrency`.
    Pair,
}

/// One entry of a format's column binding table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// Column name, or `^regex$`.
    pub column: &'static str,
    pub field: Field,
    pub conversion: Conversion,
    /// A required binding fails the row when its cell is blank.
    pub required: bool,
}

impl Binding {
    pub const fn new(column: &'static str, field: Field, conversion: Conversion) -> Self {
        Binding {
            column,
            field,
            conversion,
            required: false,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Rows that a format marks as deliberately skippable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    None,
    /// Rows whose `column` is not one of `accepted` are not final yet.
    TerminalStatus {
        column: &'static str,
        accepted: &'static [&'static str],
    },
    /// Rows whose `column` is blank are ignored with `reason`.
    RequireValue {
        column: &'static str,
        reason: &'static str,
    },
}

/// How records are correlated into transaction groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grouping {
    /// Records sharing the `Id` field; records without one stand alone.
    ById,
    /// Adjacent records with equal `ExecutedAt`.
    ByTimestamp,
    /// Consecutive fixed-size windows.
    Window(usize),
    /// Every record is its own group.
    Single,
}

/// What a record contributes to a transaction group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// A signed trade leg; the sign gives the direction.
    Trade,
    /// A single-row trade buying the record's currency.
    Buy,
    /// A single-row trade selling the record's currency.
    Sell,
    /// An explicit fee row; a negative amount is a cost, positive a rebate.
    Fee,
    Deposit,
    Withdrawal,
    Reward,
    /// A real event that is deliberately not imported.
    Skip(&'static str),
    Unknown,
}

/// How a record's role is decided.
#[derive(Debug, Clone, Copy)]
pub enum Discriminant {
    /// Per-format classification of the record's type columns.
    Classify(fn(&RawRecord) -> Role),
    /// No type column: every record is a signed leg. A lone leg is a
    /// deposit when positive and a withdrawal when negative.
    AmountSign,
}

/// Which leg of a two-leg trade is the base currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// The crypto leg is the base. When both legs are fiat or both crypto,
    /// the first currency of `quote_priority` present is the quote, else
    /// the incoming leg is the base.
    NonFiatBase {
        quote_priority: &'static [&'static str],
    },
    /// The incoming (positive) leg is the base.
    IncomingBase,
    /// The record's own currency is the base; the row carries the quote.
    Declared,
}

/// Currency assumed for a fee cell that does not name one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeCurrency {
    /// The currency of the row the fee appears on.
    Row,
    /// The quote currency of the row.
    Quote,
}

/// Reconstruction rules of one format.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    pub discriminant: Discriminant,
    pub orientation: Orientation,
    pub fee_currency: FeeCurrency,
    /// Quote currency for single-row trades that do not name one.
    pub default_quote: Option<&'static str>,
}

/// A registered exchange export format.
#[derive(Debug, Clone)]
pub struct ExchangeFormat {
    pub id: &'static str,
    pub name: &'static str,
    pub template: HeaderTemplate,
    /// Header lines this format is known to produce.
    pub sample_headers: &'static [&'static str],
    pub bindings: Vec<Binding>,
    pub number_style: NumberStyle,
    /// Exchange tickers substituted before currency lookup.
    pub aliases: &'static [(&'static str, &'static str)],
    pub row_filter: RowFilter,
    pub grouping: Grouping,
    pub rules: RuleSet,
}

impl ExchangeFormat {
    /// Resolves an exchange ticker to a known currency.
    pub fn resolve_currency(&self, code: &str) -> RowResult<Currency> {
        let code = code.trim().to_uppercase();
        let resolved = self
            .aliases
            .iter()
            .find(|(alias, _)| *alias == code)
            .map_or(code.as_str(), |&(_, target)| target);
        Currency::lookup(resolved)
            .ok_or_else(|| Reject::failed(format!("unknown currency '{}'", code)))
    }

    /// Quote currency for single-row trades without a quote column value.
    pub fn default_quote(&self) -> Option<Currency> {
        self.rules.default_quote.and_then(Currency::lookup)
    }

    /// What `record` contributes to its group.
    pub fn role_of(&self, record: &RawRecord) -> Role {
        match self.rules.discriminant {
            Discriminant::Classify(classify) => classify(record),
            Discriminant::AmountSign => Role::Trade,
        }
    }

    #[cfg(test)]
    pub(crate) fn stub(id: &'static str, template: HeaderTemplate) -> Self {
        ExchangeFormat {
            id,
            name: id,
            template,
            sample_headers: &[],
            bindings: Vec::new(),
            number_style: NumberStyle::DecimalDot,
            aliases: &[],
            row_filter: RowFilter::None,
            grouping: Grouping::Single,
            rules: RuleSet {
                discriminant: Discriminant::AmountSign,
                orientation: Orientation::IncomingBase,
                fee_currency: FeeCurrency::Row,
                default_quote: None,
            },
        }
    }
}

/// Builds the registration error for a malformed template or binding.
pub(crate) fn registration_error(format: &'static str) -> impl Fn(regex::Error) -> ImportError {
    move |e| ImportError::Registration {
        format,
        message: e.to_string(),
    }
}

/// Read-only table of known formats.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: Vec<ExchangeFormat>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        FormatRegistry {
            formats: Vec::new(),
        }
    }

    /// Registry holding every built-in exchange format.
    pub fn builtin() -> Result<Self> {
        let mut registry = FormatRegistry::new();
        for format in exchanges::all()? {
            registry.register(format)?;
        }
        Ok(registry)
    }

    /// Adds a format; identifiers must be unique.
    pub fn register(&mut self, format: ExchangeFormat) -> Result<()> {
        if self.get(format.id).is_some() {
            return Err(ImportError::Registration {
                format: format.id,
                message: "duplicate format id".to_string(),
            });
        }
        if let Some(alias) = format
            .aliases
            .iter()
            .find(|(_, target)| Currency::lookup(target).is_none())
        {
            return Err(ImportError::Registration {
                format: format.id,
                message: format!("alias '{}' targets unknown currency '{}'", alias.0, alias.1),
            });
        }
        self.formats.push(format);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ExchangeFormat> {
        self.formats.iter().find(|f| f.id == id)
    }

    pub fn formats(&self) -> &[ExchangeFormat] {
        &self.formats
    }
}
