mod csv;
mod json;

use smartgrid_core::{OrderedRowView, Row, Schema};
use std::io::Write;
use thiserror::Error;

pub use csv::{DelimitedExporter, ImportOptions, RowIdSource, import_delimited, infer_schema};
pub use json::JsonExporter;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("Missing id column: {0}")]
    MissingIdColumn(String),

    #[error("Line {line}: empty id")]
    EmptyId { line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    /// Tab separated, the format spreadsheets accept on paste.
    Tsv,
    JsonPretty,
    JsonCompact,
}

impl ExportFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Tsv => "TSV",
            Self::JsonPretty => "JSON (pretty)",
            Self::JsonCompact => "JSON (compact)",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::JsonPretty | Self::JsonCompact => "json",
        }
    }

    /// Parses a format name as typed on a command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" => Some(Self::Tsv),
            "json" | "json-pretty" => Some(Self::JsonPretty),
            "json-compact" => Some(Self::JsonCompact),
            _ => None,
        }
    }
}

/// Rows behind the data entries of `view`, in view order.
///
/// Group headers and indices that no longer resolve are skipped.
pub fn visible_rows<'a>(rows: &'a [Row], view: &OrderedRowView) -> Vec<&'a Row> {
    view.data_row_indices()
        .into_iter()
        .filter_map(|ix| rows.get(ix))
        .collect()
}

/// Writes the data rows of `view` in `format`.
pub fn export(
    rows: &[Row],
    schema: &Schema,
    view: &OrderedRowView,
    format: ExportFormat,
    writer: &mut dyn Write,
) -> Result<(), ExportError> {
    let visible = visible_rows(rows, view);

    log::info!(
        "Exporting {} rows x {} columns as {}",
        visible.len(),
        schema.len(),
        format.name()
    );

    match format {
        ExportFormat::Csv => DelimitedExporter { delimiter: b',' }.export(schema, &visible, writer),
        ExportFormat::Tsv => DelimitedExporter { delimiter: b'\t' }.export(schema, &visible, writer),
        ExportFormat::JsonPretty => JsonExporter { pretty: true }.export(schema, &visible, writer),
        ExportFormat::JsonCompact => {
            JsonExporter { pretty: false }.export(schema, &visible, writer)
        }
    }
}
