use crate::{ExportError, ImportError};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use smartgrid_core::{ColumnDefinition, ColumnType, Row, RowId, Schema, Value};
use std::io::{Read, Write};

pub struct DelimitedExporter {
    pub delimiter: u8,
}

impl DelimitedExporter {
    pub fn export(
        &self,
        schema: &Schema,
        rows: &[&Row],
        writer: &mut dyn Write,
    ) -> Result<(), ExportError> {
        let mut csv_writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);

        let headers: Vec<&str> = schema
            .columns()
            .iter()
            .map(|c| c.display_name.as_str())
            .collect();
        csv_writer.write_record(&headers)?;

        for row in rows {
            for column in schema.columns() {
                csv_writer.write_field(value_to_field(row.get(&column.id)))?;
            }
            csv_writer.write_record(None::<&[u8]>)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

fn value_to_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Float(f) if f.is_nan() => "NaN".to_string(),
        Value::Float(f) if f.is_infinite() => if f.is_sign_positive() {
            "Infinity"
        } else {
            "-Infinity"
        }
        .to_string(),
        Value::DateTime(dt) => dt.to_rfc3339(),
        other => other.as_display_string(),
    }
}

/// Where imported rows take their identity from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIdSource {
    /// Values of the named header; numeric values become integer ids.
    Header(String),
    /// The 1-based data line number.
    LineNumber,
    /// A fresh random UUID per row.
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    pub delimiter: u8,
    pub id_source: RowIdSource,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            id_source: RowIdSource::LineNumber,
        }
    }
}

impl ImportOptions {
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    pub fn with_id_header(mut self, header: impl Into<String>) -> Self {
        self.id_source = RowIdSource::Header(header.into());
        self
    }
}

/// Reads delimited text with a header row into rows of `schema`.
///
/// Headers match column ids or display names; unmatched headers are ignored.
/// Empty fields are `Null`, and fields that do not parse as the column type are
/// kept as text so nothing the user typed is lost.
pub fn import_delimited(
    reader: impl Read,
    schema: &Schema,
    options: &ImportOptions,
) -> Result<Vec<Row>, ImportError> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();

    let mapping: Vec<Option<(String, &ColumnDefinition)>> = headers
        .iter()
        .map(|h| schema.find_by_header(h).map(|c| (c.id.clone(), c)))
        .collect();

    for (header, mapped) in headers.iter().zip(&mapping) {
        if mapped.is_none() {
            log::debug!("Ignoring unknown header '{}'", header);
        }
    }

    let id_position = match &options.id_source {
        RowIdSource::Header(name) => Some(
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name.trim()))
                .ok_or_else(|| ImportError::MissingIdColumn(name.clone()))?,
        ),
        _ => None,
    };

    let mut rows = Vec::new();
    let mut uncoerced = 0usize;

    for (ix, record) in csv_reader.records().enumerate() {
        let record = record?;
        let line = ix + 1;

        let id = match (&options.id_source, id_position) {
            (RowIdSource::Header(_), Some(pos)) => {
                let raw = record.get(pos).unwrap_or("").trim();
                if raw.is_empty() {
                    return Err(ImportError::EmptyId { line });
                }
                parse_row_id(raw)
            }
            (RowIdSource::Generated, _) => RowId::Text(uuid::Uuid::new_v4().to_string()),
            _ => RowId::Int(line as i64),
        };

        let mut row = Row::new(id);
        for (field, mapped) in record.iter().zip(&mapping) {
            let Some((column_id, column)) = mapped else {
                continue;
            };

            let value = if field.trim().is_empty() {
                Value::Null
            } else {
                column.coerce(field).unwrap_or_else(|_| {
                    uncoerced += 1;
                    Value::Text(field.to_string())
                })
            };
            row.set(column_id.clone(), value);
        }
        rows.push(row);
    }

    if uncoerced > 0 {
        log::warn!("{} imported fields did not match their column type", uncoerced);
    }
    log::info!("Imported {} rows", rows.len());

    Ok(rows)
}

/// Builds a schema from the header row, typing each column by its values.
///
/// A column is the narrowest of integer, float, boolean and datetime that every
/// non-empty field parses as, and text otherwise. `skip` names headers to leave out.
pub fn infer_schema(
    reader: impl Read,
    delimiter: u8,
    skip: &[&str],
) -> Result<Schema, ImportError> {
    const CANDIDATES: [ColumnType; 4] = [
        ColumnType::Integer,
        ColumnType::Float,
        ColumnType::Boolean,
        ColumnType::DateTime,
    ];

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut fits: Vec<[bool; 4]> = vec![[true; 4]; headers.len()];

    for record in csv_reader.records() {
        let record = record?;
        for (field, fit) in record.iter().zip(fits.iter_mut()) {
            if field.trim().is_empty() {
                continue;
            }
            for (ok, candidate) in fit.iter_mut().zip(CANDIDATES) {
                *ok = *ok && Value::coerce(field, candidate).is_ok();
            }
        }
    }

    let columns = headers
        .iter()
        .zip(&fits)
        .filter(|(h, _)| !h.is_empty() && !skip.iter().any(|s| s.eq_ignore_ascii_case(h)))
        .map(|(header, fit)| {
            let column_type = fit
                .iter()
                .zip(CANDIDATES)
                .find_map(|(ok, candidate)| ok.then_some(candidate))
                .unwrap_or(ColumnType::Text);
            ColumnDefinition::new(header, header, column_type)
        })
        .collect();

    Ok(Schema::new(columns))
}

fn parse_row_id(raw: &str) -> RowId {
    raw.parse::<i64>()
        .map(RowId::Int)
        .unwrap_or_else(|_| RowId::Text(raw.to_string()))
}
