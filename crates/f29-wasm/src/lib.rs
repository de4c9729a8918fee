//! WASM bindings for Chilean SII Form 29 extraction.
//!
//! This crate provides WebAssembly bindings for use in browsers and Node.js.
//! PDF stream inflation is left out of the wasm build; every other strategy runs.

use wasm_bindgen::prelude::*;

use f29_core::extract::rules;
use f29_core::{
    ExtractionResult, F29Config, FingerprintCache, ParseReport, SuperParser, Validator,
};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Extract F29 data from the raw bytes of a file.
///
/// Returns the full parse report: merged result, validation and per-strategy summary.
#[wasm_bindgen]
pub fn parse_f29(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let report = SuperParser::new().parse(bytes).map_err(js_error)?;
    serde_wasm_bindgen::to_value(&report).map_err(js_error)
}

/// Validate an extraction result given as JSON, using the default rules.
#[wasm_bindgen]
pub fn validate_result(json: &str) -> Result<JsValue, JsValue> {
    let result: ExtractionResult = serde_json::from_str(json).map_err(js_error)?;
    let validation = Validator::default().validate(&result);
    serde_wasm_bindgen::to_value(&validation).map_err(js_error)
}

/// Validate a Chilean RUT check digit.
#[wasm_bindgen]
pub fn validate_rut(rut: &str) -> bool {
    rules::validate_rut(rut)
}

/// Format a RUT with thousands dots (76.086.428-5).
#[wasm_bindgen]
pub fn format_rut(rut: &str) -> String {
    rules::format_rut(rut)
}

/// Parse a Chilean-formatted amount (e.g., "$ 3.410.651").
#[wasm_bindgen]
pub fn parse_clp_amount(amount: &str) -> Option<f64> {
    rules::parse_clp_amount(amount).map(|v| v as f64)
}

/// Format a peso amount ($3.410.651).
#[wasm_bindgen]
pub fn format_clp_amount(amount: f64) -> String {
    rules::format_clp_amount(amount.round() as i64)
}

/// Parser class that keeps its fingerprint cache between documents.
#[wasm_bindgen]
pub struct F29Parser {
    parser: SuperParser,
}

#[wasm_bindgen]
impl F29Parser {
    /// Create a parser with the default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            parser: SuperParser::new(),
        }
    }

    /// Create a parser from a JSON configuration.
    #[wasm_bindgen]
    pub fn with_config(json: &str) -> Result<F29Parser, JsValue> {
        let config: F29Config = serde_json::from_str(json).map_err(js_error)?;
        Ok(Self {
            parser: SuperParser::from_config(config),
        })
    }

    /// Parse a document.
    #[wasm_bindgen]
    pub fn parse(&self, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let report = self.parser.parse(bytes).map_err(js_error)?;
        serde_wasm_bindgen::to_value(&report).map_err(js_error)
    }

    /// Learn the codes of a report returned by `parse`.
    ///
    /// Returns how many fingerprints were added.
    #[wasm_bindgen]
    pub fn learn(&mut self, report: JsValue) -> Result<usize, JsValue> {
        let report: ParseReport = serde_wasm_bindgen::from_value(report).map_err(js_error)?;
        Ok(self.parser.learn(&report))
    }

    /// Number of cached fingerprints.
    #[wasm_bindgen]
    pub fn fingerprint_count(&self) -> usize {
        self.parser.fingerprints().len()
    }

    /// Serialize the fingerprint cache, e.g. for localStorage.
    #[wasm_bindgen]
    pub fn export_fingerprints(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.parser.fingerprints()).map_err(js_error)
    }

    /// Replace the fingerprint cache with one produced by `export_fingerprints`.
    #[wasm_bindgen]
    pub fn import_fingerprints(&mut self, json: &str) -> Result<(), JsValue> {
        let cache: FingerprintCache = serde_json::from_str(json).map_err(js_error)?;
        *self.parser.fingerprints_mut() = cache;
        Ok(())
    }
}

impl Default for F29Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_validate_rut() {
        assert!(validate_rut("76.086.428-5"));
        assert!(!validate_rut("76.086.428-4"));
    }

    #[wasm_bindgen_test]
    fn test_parse_clp_amount() {
        assert_eq!(parse_clp_amount("$ 3.410.651"), Some(3410651.0));
        assert_eq!(parse_clp_amount("sin monto"), None);
    }

    #[wasm_bindgen_test]
    fn test_format_clp_amount() {
        assert_eq!(format_clp_amount(-777992.0), "-$777.992");
    }

    #[wasm_bindgen_test]
    fn test_fingerprints_round_trip_through_json() {
        let mut parser = F29Parser::new();
        let exported = parser.export_fingerprints().unwrap();

        parser.import_fingerprints("{\"entries\":[]}").unwrap();
        assert_eq!(parser.fingerprint_count(), 0);

        parser.import_fingerprints(&exported).unwrap();
        assert_eq!(parser.fingerprint_count(), 3);
    }
}
