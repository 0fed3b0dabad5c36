//! Report output: JSON envelope, file export, human summary.

use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;

use valida_io::{BaseFiles, ExportFormat};
use valida_recon::model::ReconSummary;
use valida_recon::resolve::ResolutionWarning;
use valida_recon::{Report, ResolvedColumns};

use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutFormat {
    Csv,
    Xlsx,
    Json,
}

impl From<OutFormat> for ExportFormat {
    fn from(f: OutFormat) -> Self {
        match f {
            OutFormat::Csv => ExportFormat::Csv,
            OutFormat::Xlsx => ExportFormat::Xlsx,
            OutFormat::Json => ExportFormat::Json,
        }
    }
}

#[derive(Serialize)]
pub struct ReportEnvelope<'a> {
    pub engine_version: &'static str,
    pub run_at: String,
    pub config: &'a str,
    pub inputs: Inputs,
    pub columns: &'a [String],
    pub records: Vec<RecordOutput<'a>>,
    pub summary: &'a ReconSummary,
    pub resolution: &'a ResolvedColumns,
    pub warnings: &'a [ResolutionWarning],
}

#[derive(Serialize)]
pub struct Inputs {
    pub painel: String,
    pub educapi: String,
    pub comercial: String,
}

#[derive(Serialize)]
pub struct RecordOutput<'a> {
    pub identifier: &'a str,
    pub status: &'a str,
    pub labels: Vec<&'a str>,
    /// Reference fields in source column order; `null` for empty cells.
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl<'a> ReportEnvelope<'a> {
    pub fn new(report: &'a Report, config_name: &'a str, bases: &BaseFiles) -> Self {
        let records = report
            .records
            .iter()
            .map(|record| {
                let fields = report
                    .columns
                    .iter()
                    .filter(|c| c.as_str() != valida_recon::STATUS_COLUMN)
                    .map(|c| {
                        let value = record
                            .fields
                            .get(c)
                            .and_then(|v| serde_json::to_value(v).ok())
                            .unwrap_or(serde_json::Value::Null);
                        (c.clone(), value)
                    })
                    .collect();
                RecordOutput {
                    identifier: &record.identifier,
                    status: &record.status,
                    labels: record.labels.iter().map(String::as_str).collect(),
                    fields,
                }
            })
            .collect();

        Self {
            engine_version: env!("CARGO_PKG_VERSION"),
            run_at: chrono::Utc::now().to_rfc3339(),
            config: config_name,
            inputs: Inputs {
                painel: bases.painel.display().to_string(),
                educapi: bases.educapi.display().to_string(),
                comercial: bases.comercial.display().to_string(),
            },
            columns: &report.columns,
            records,
            summary: &report.summary,
            resolution: &report.resolution,
            warnings: &report.warnings,
        }
    }
}

/// Write the report file in the chosen format.
pub fn write_report(
    report: &Report,
    envelope: &ReportEnvelope<'_>,
    format: ExportFormat,
    path: &Path,
) -> Result<(), CliError> {
    match format {
        ExportFormat::Csv => valida_io::csv::export(&report.to_table(), path)?,
        ExportFormat::Xlsx => valida_io::xlsx::export(&report.to_table(), path)?,
        ExportFormat::Json => valida_io::json::export(envelope, path)?,
    }
    tracing::info!(path = %path.display(), ?format, records = report.records.len(), "report written");
    Ok(())
}

/// Human summary to stderr.
pub fn print_summary(report: &Report) {
    let s = &report.summary;
    if s.blank_identifiers > 0 {
        eprintln!(
            "checked {} reference row(s): {} flagged, {} without CPF",
            s.reference_rows, s.flagged, s.blank_identifiers
        );
    } else {
        eprintln!("checked {} reference row(s): {} flagged", s.reference_rows, s.flagged);
    }

    for (label, count) in &s.label_counts {
        eprintln!("  {:>5}  {}", count, label);
    }
}
