//! F29 field extraction module.

pub mod accumulator;
pub mod derived;
mod parser;
pub mod rules;
pub mod strategies;

pub use accumulator::{ExtractionAccumulator, PartialExtraction, Signal};
pub use derived::{auto_correct, coherence_ratio, expected_debito, VAT_RATE};
pub use parser::{merge_partials, ParseReport, StrategyReport, SuperParser};

use crate::decode::DecodedDocument;
use crate::error::ExtractionError;
use crate::models::f29::ExtractionMethod;

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// An independent extraction strategy.
///
/// Strategies see the same immutable decoded document and never depend on
/// each other; an error is local to the strategy that returned it.
pub trait ExtractionStrategy {
    /// Identifies the strategy in results and logs.
    fn method(&self) -> ExtractionMethod;

    /// Recover whatever fields the strategy can.
    fn extract(&self, document: &DecodedDocument) -> Result<PartialExtraction>;
}
