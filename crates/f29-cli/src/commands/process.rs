//! Process command - extract data from a single F29 file.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use f29_core::extract::rules::{format_clp_amount, format_rut};
use f29_core::{F29Code, ParseReport};

use super::{build_parser, load_config, save_fingerprints};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (usually a PDF)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show confidence scores and per-strategy results
    #[arg(long)]
    show_confidence: bool,

    /// Remember this document's values in the fingerprint cache when it validates
    #[arg(long)]
    learn: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Reading file...");
    let data = tokio::fs::read(&args.input).await?;

    pb.set_message("Extracting F29 codes...");
    let mut parser = build_parser(&config)?;
    let report = parser.parse(&data);
    pb.finish_and_clear();
    let report = report?;

    if !report.validation.is_valid {
        eprintln!("{} {}", style("Validation failed:").yellow(), report.validation.summary);
        for error in &report.validation.errors {
            eprintln!("  - [{}] {}", error.code, error.message);
        }
    }

    let output = format_report(&report, args.format)?;

    if let Some(output_path) = &args.output {
        tokio::fs::write(output_path, &output).await?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.learn {
        let added = parser.learn(&report);
        if added > 0 {
            let path = save_fingerprints(&config, parser.fingerprints())?;
            eprintln!(
                "{} Learned {} fingerprints into {}",
                style("✓").green(),
                added,
                path.display()
            );
        } else {
            eprintln!(
                "{} Nothing learned (result must be valid with confidence >= {})",
                style("ℹ").blue(),
                config.fingerprints.learn_min_confidence
            );
        }
    }

    if args.show_confidence {
        print_confidence(&report);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn print_confidence(report: &ParseReport) {
    println!();
    println!(
        "{} Confidence: {}% (validation {}%)",
        style("ℹ").blue(),
        report.result.confidence,
        report.validation.confidence
    );
    for strategy in &report.strategies {
        match &strategy.error {
            Some(error) => println!("   {:<14} {}", strategy.method.as_str(), style(error).red()),
            None => println!(
                "   {:<14} {:>3}%  {} fields",
                strategy.method.as_str(),
                strategy.confidence,
                strategy.fields_found
            ),
        }
    }
    println!(
        "{} Processing time: {}ms",
        style("ℹ").blue(),
        report.processing_time_ms
    );
}

/// One CSV row per parsed document.
#[derive(Serialize)]
struct ReportRow<'a> {
    debito_fiscal: Option<u64>,
    credito_fiscal: Option<u64>,
    ppm: Option<u64>,
    remanente: Option<u64>,
    ventas_netas: Option<u64>,
    compras_netas: Option<u64>,
    iva_pagar: Option<i64>,
    total_a_pagar: Option<i64>,
    rut: Option<&'a str>,
    periodo: Option<&'a str>,
    folio: Option<&'a str>,
    razon_social: Option<&'a str>,
    confidence: u32,
    is_valid: bool,
}

impl<'a> From<&'a ParseReport> for ReportRow<'a> {
    fn from(report: &'a ParseReport) -> Self {
        let result = &report.result;
        Self {
            debito_fiscal: result.codes.debito_fiscal,
            credito_fiscal: result.codes.credito_fiscal,
            ppm: result.codes.ppm,
            remanente: result.codes.remanente,
            ventas_netas: result.codes.ventas_netas,
            compras_netas: result.derived.compras_netas,
            iva_pagar: result.derived.iva_pagar,
            total_a_pagar: result.derived.total_a_pagar,
            rut: result.identity.rut.as_deref(),
            periodo: result.identity.periodo.as_deref(),
            folio: result.identity.folio.as_deref(),
            razon_social: result.identity.razon_social.as_deref(),
            confidence: result.confidence,
            is_valid: result.is_valid,
        }
    }
}

pub fn format_report(report: &ParseReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(report),
        OutputFormat::Text => Ok(format_text(report)),
    }
}

fn format_csv(report: &ParseReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.serialize(ReportRow::from(report))?;
    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(report: &ParseReport) -> String {
    let result = &report.result;
    let mut output = String::new();

    let rut = result.identity.rut.as_deref().map(format_rut);
    output.push_str(&format!("RUT:      {}\n", rut.as_deref().unwrap_or("-")));
    output.push_str(&format!(
        "Period:   {}\n",
        result.identity.periodo.as_deref().unwrap_or("-")
    ));
    if let Some(folio) = &result.identity.folio {
        output.push_str(&format!("Folio:    {}\n", folio));
    }
    if let Some(name) = &result.identity.razon_social {
        output.push_str(&format!("Company:  {}\n", name));
    }
    output.push('\n');

    output.push_str("Codes:\n");
    for code in F29Code::ALL {
        let value = result
            .codes
            .present(code)
            .map(format_clp_amount)
            .unwrap_or_else(|| "-".to_string());
        output.push_str(&format!("  [{}] {:<15} {:>15}\n", code, code.description(), value));
    }
    output.push('\n');

    output.push_str("Derived:\n");
    let derived = [
        ("Compras netas", result.derived.compras_netas.map(i128::from)),
        ("IVA a pagar", result.derived.iva_pagar.map(i128::from)),
        ("Total a pagar", result.derived.total_a_pagar.map(i128::from)),
    ];
    for (label, value) in derived {
        let value = value.map(format_clp_amount).unwrap_or_else(|| "-".to_string());
        output.push_str(&format!("  {:<21} {:>15}\n", label, value));
    }
    output.push('\n');

    output.push_str(&format!(
        "Validation: {} (confidence {}%)\n",
        if report.validation.is_valid { "valid" } else { "invalid" },
        report.validation.confidence
    ));
    output.push_str(&format!("  {}\n", report.validation.summary));
    for error in &report.validation.errors {
        output.push_str(&format!("  error   [{}] {}\n", error.code, error.message));
    }
    for warning in &report.validation.warnings {
        output.push_str(&format!("  warning [{}] {}\n", warning.code, warning.message));
    }
    for suggestion in &report.validation.suggestions {
        output.push_str(&format!("  hint    {}\n", suggestion));
    }

    output
}
