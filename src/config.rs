//! Import settings.

use crate::decimal::DEFAULT_PRICE_SCALE;
use rust_decimal::Decimal;

/// Default magnitude bound for any quantity or volume: 10^12.
pub const DEFAULT_MAX_VOLUME: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Settings applied to every file processed by an [`crate::Importer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Forces a delimiter instead of trying `;`, `,` and a sniffed one.
    pub delimiter: Option<u8>,
    /// Quantities or volumes above this are treated as corrupted.
    pub max_volume: Decimal,
    /// Fractional digits of computed unit prices.
    pub price_scale: u32,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            delimiter: None,
            max_volume: DEFAULT_MAX_VOLUME,
            price_scale: DEFAULT_PRICE_SCALE,
        }
    }
}
