//! Batch processing command for multiple F29 files.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, error, warn};

use f29_core::{ParseReport, SuperParser};

use super::process::{format_report, OutputFormat};
use super::{build_parser, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct FileResult {
    path: PathBuf,
    report: Option<ParseReport>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        tokio::fs::create_dir_all(output_dir).await?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = build_parser(&config)?;
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let outcome = process_single_file(&path, &parser).await;
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(report) => results.push(FileResult {
                path,
                report: Some(report),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path,
                        report: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing {} failed: {}", path.display(), error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    let successful: Vec<&FileResult> = results.iter().filter(|r| r.report.is_some()).collect();
    let failed: Vec<&FileResult> = results.iter().filter(|r| r.error.is_some()).collect();

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            let Some(report) = &result.report else { continue };
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("f29");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.extension()));

            tokio::fs::write(&output_path, format_report(report, args.format)?).await?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let valid = successful
        .iter()
        .filter(|r| r.report.as_ref().is_some_and(|rep| rep.result.is_valid))
        .count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful ({} valid), {} failed",
        style(successful.len()).green(),
        valid,
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn process_single_file(path: &Path, parser: &SuperParser) -> anyhow::Result<ParseReport> {
    let data = tokio::fs::read(path).await?;
    if data.is_empty() {
        anyhow::bail!("File is empty");
    }
    Ok(parser.parse(&data)?)
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    filename: &'a str,
    status: &'a str,
    rut: Option<&'a str>,
    periodo: Option<&'a str>,
    debito_fiscal: Option<u64>,
    credito_fiscal: Option<u64>,
    ventas_netas: Option<u64>,
    iva_pagar: Option<i64>,
    total_a_pagar: Option<i64>,
    confidence: Option<u32>,
    is_valid: Option<bool>,
    processing_time_ms: u64,
    error: &'a str,
}

fn write_summary(path: &Path, results: &[FileResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let row = match &result.report {
            Some(report) => {
                let r = &report.result;
                SummaryRow {
                    filename,
                    status: "success",
                    rut: r.identity.rut.as_deref(),
                    periodo: r.identity.periodo.as_deref(),
                    debito_fiscal: r.codes.debito_fiscal,
                    credito_fiscal: r.codes.credito_fiscal,
                    ventas_netas: r.codes.ventas_netas,
                    iva_pagar: r.derived.iva_pagar,
                    total_a_pagar: r.derived.total_a_pagar,
                    confidence: Some(r.confidence),
                    is_valid: Some(r.is_valid),
                    processing_time_ms: result.processing_time_ms,
                    error: "",
                }
            }
            None => SummaryRow {
                filename,
                status: "error",
                rut: None,
                periodo: None,
                debito_fiscal: None,
                credito_fiscal: None,
                ventas_netas: None,
                iva_pagar: None,
                total_a_pagar: None,
                confidence: None,
                is_valid: None,
                processing_time_ms: result.processing_time_ms,
                error: result.error.as_deref().unwrap_or(""),
            },
        };
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(())
}
