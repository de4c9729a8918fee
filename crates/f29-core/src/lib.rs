//! Core library for Chilean SII Form 29 (F29) extraction.
//!
//! This crate provides:
//! - Byte decoding under several encodings, including inflated PDF streams
//! - Independent heuristic strategies for the F29 codes and taxpayer identity
//! - Derived totals and a coherence validator with configurable policy
//! - The `SuperParser` orchestrator tying them together

pub mod decode;
pub mod error;
pub mod extract;
pub mod models;
pub mod validation;

pub use decode::{DecodedDocument, TextEncoding};
pub use error::{ExtractionError, F29Error, Result};
pub use extract::strategies::{Fingerprint, FingerprintCache};
pub use extract::{ExtractionStrategy, ParseReport, StrategyReport, SuperParser};
pub use models::config::F29Config;
pub use models::f29::{
    DerivedFields, ExtractedCodes, ExtractionMethod, ExtractionResult, F29Code, IdentityFields,
};
pub use validation::{
    Impact, Severity, ValidationCode, ValidationError, ValidationPolicy, ValidationResult,
    ValidationWarning, Validator,
};
