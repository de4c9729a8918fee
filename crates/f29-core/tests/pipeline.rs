use f29_core::*;
use pretty_assertions::assert_eq;

/// A Latin-1 F29 export with the main codes on separate rows and some control noise.
fn latin1_form() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"%F29 \x01\x02\xd1\xd1\n");
    bytes.extend_from_slice(b"538 D\xe9bitos del per\xedodo   3.410.651\n");
    bytes.extend_from_slice(b"511 Cr\xe9dito fiscal \x07 4.188.643\n");
    bytes.extend_from_slice(b"563 Base imponible 17.950.795\n");
    bytes
}

fn complete_form() -> Vec<u8> {
    let mut bytes = latin1_form();
    bytes.extend_from_slice(b"062 PPM 45.000\n");
    bytes.extend_from_slice(b"077 Remanente 120.000\n");
    bytes.extend_from_slice(b"RUT: 76.086.428-5\nPERIODO: 03/2024\nFOLIO 8812345\n");
    bytes
}

#[test]
fn test_latin1_scenario() {
    let report = SuperParser::new().parse(&latin1_form()).unwrap();
    let result = &report.result;

    assert_eq!(result.codes.debito_fiscal, Some(3_410_651));
    assert_eq!(result.codes.credito_fiscal, Some(4_188_643));
    assert_eq!(result.codes.ventas_netas, Some(17_950_795));

    assert_eq!(result.derived.compras_netas, Some(22_045_489));
    assert_eq!(result.derived.iva_pagar, Some(-777_992));
    assert_eq!(result.derived.total_a_pagar, Some(-777_992));

    assert!(report.validation.is_valid);
    assert!(report.validation.confidence >= 70);
    assert!(result.is_valid);
    assert!(result.confidence > 0);
    assert_eq!(result.method, ExtractionMethod::SuperParser);
}

#[test]
fn test_binary_strategy_reads_labels() {
    let report = SuperParser::new().parse(&latin1_form()).unwrap();
    let binary = report
        .strategies
        .iter()
        .find(|s| s.method == ExtractionMethod::BinaryRegex)
        .unwrap();

    assert_eq!(binary.fields_found, 3);
    assert_eq!(binary.confidence, 60);
    assert!(binary.error.is_none());
    assert!(
        report
            .result
            .detected_values
            .iter()
            .any(|v| v.contains("débito fiscal (538) = 3410651 [regex/grouped"))
    );
}

#[test]
fn test_coherence_bonus_logged() {
    let report = SuperParser::new().parse(&latin1_form()).unwrap();
    assert!(
        report
            .result
            .detected_values
            .iter()
            .any(|v| v.starts_with("coherence excellent"))
    );
}

#[test]
fn test_parse_is_deterministic() {
    let parser = SuperParser::new();
    let bytes = complete_form();

    let first = parser.parse(&bytes).unwrap();
    let second = parser.parse(&bytes).unwrap();

    assert_eq!(first.result, second.result);
    assert_eq!(first.validation, second.validation);
    assert_eq!(first.strategies, second.strategies);
}

#[test]
fn test_complete_form() {
    let report = SuperParser::new().parse(&complete_form()).unwrap();
    let result = &report.result;

    assert_eq!(result.codes.ppm, Some(45_000));
    assert_eq!(result.codes.remanente, Some(120_000));
    assert_eq!(result.identity.rut.as_deref(), Some("76086428-5"));
    assert_eq!(result.identity.periodo.as_deref(), Some("202403"));
    assert_eq!(result.identity.folio.as_deref(), Some("8812345"));
    assert_eq!(result.derived.total_a_pagar, Some(-777_992 + 45_000 + 120_000));

    assert!(report.validation.is_valid);
    assert_eq!(report.validation.confidence, 100);
    assert_eq!(result.confidence, 100);
}

#[test]
fn test_missing_debito_is_critical() {
    let bytes = b"511 Credito fiscal 4.188.643\n563 Base imponible 17.950.795\nRUT: 76.086.428-5\n";
    let report = SuperParser::new().parse(bytes).unwrap();

    assert_eq!(report.result.codes.debito_fiscal, None);
    assert!(!report.validation.is_valid);
    assert!(!report.result.is_valid);

    let critical = report
        .validation
        .errors
        .iter()
        .find(|e| e.severity == Severity::Critical)
        .unwrap();
    assert_eq!(critical.code, ValidationCode::MissingCriticalField);
    assert_eq!(critical.field, "debitoFiscal");
}

#[test]
fn test_warnings_do_not_invalidate() {
    let report = SuperParser::new().parse(&latin1_form()).unwrap();

    assert!(!report.validation.warnings.is_empty());
    assert!(report.validation.errors.iter().all(|e| !e.severity.is_blocking()));
    assert!(report.result.is_valid);
}

#[test]
fn test_no_signal_is_an_error() {
    let bytes = b"\x00\xfe hello world, nothing here \xff\x01";
    let err = SuperParser::new().parse(bytes).unwrap_err();

    assert!(matches!(
        err,
        F29Error::Extraction(ExtractionError::NoSignal { strategies: 4 })
    ));
    assert!(err.to_string().contains("no strategy succeeded"));
}

#[test]
fn test_disabled_strategies_are_not_run() {
    let mut config = F29Config::default();
    config.extraction.enable_visual = false;
    config.extraction.enable_fingerprint = false;

    let report = SuperParser::from_config(config).parse(&latin1_form()).unwrap();
    let methods: Vec<ExtractionMethod> = report.strategies.iter().map(|s| s.method).collect();
    assert_eq!(
        methods,
        vec![ExtractionMethod::BinaryRegex, ExtractionMethod::Identity]
    );
}

#[test]
fn test_learned_fingerprints_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fingerprints.json");

    let mut parser = SuperParser::new().with_fingerprints(FingerprintCache::new());
    let report = parser.parse(&complete_form()).unwrap();
    assert_eq!(parser.learn(&report), 5);
    parser.fingerprints().save(&path).unwrap();

    let cache = FingerprintCache::load(&path).unwrap();
    assert_eq!(cache.len(), 5);
    assert!(
        cache
            .entries()
            .iter()
            .all(|f| f.source.as_deref() == Some("76086428-5 202403"))
    );
}

#[test]
fn test_report_serializes_camel_case() {
    let report = SuperParser::new().parse(&latin1_form()).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["result"]["debitoFiscal"], 3_410_651);
    assert_eq!(json["result"]["ivaPagar"], -777_992);
    assert_eq!(json["result"]["method"], "super-parser");
    assert_eq!(json["validation"]["isValid"], true);
    assert!(json["processingTimeMs"].is_u64());
}

#[test]
fn test_oversized_values_do_not_overflow() {
    let report = SuperParser::new()
        .parse(b"538 9000000000000000000\n511 18000000000000000000\n563 17.950.795\n")
        .unwrap();
    let result = &report.result;

    assert_eq!(result.codes.debito_fiscal, Some(9_000_000_000_000_000_000));
    assert_eq!(result.codes.credito_fiscal, Some(18_000_000_000_000_000_000));
    assert_eq!(result.derived.iva_pagar, Some(-9_000_000_000_000_000_000));
    assert!(report.validation.has(ValidationCode::OutOfRange));
    assert!(!result.is_valid);
}

#[test]
fn test_blank_code_row_stays_missing() {
    let report = SuperParser::new()
        .parse(b"538 Debitos\n511 Credito 4.188.643\n563 Base 17.950.795\n")
        .unwrap();
    let result = &report.result;

    assert_eq!(result.codes.debito_fiscal, None);
    assert_eq!(result.codes.credito_fiscal, Some(4_188_643));
    assert!(report.validation.has(ValidationCode::MissingCriticalField));
    assert!(!report.validation.has(ValidationCode::VatIncoherent));
}
