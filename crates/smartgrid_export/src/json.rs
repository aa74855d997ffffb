use crate::ExportError;
use smartgrid_core::{Row, Schema};
use std::io::Write;

pub struct JsonExporter {
    pub pretty: bool,
}

impl JsonExporter {
    /// Writes an array of objects keyed by column display name.
    pub fn export(
        &self,
        schema: &Schema,
        rows: &[&Row],
        writer: &mut dyn Write,
    ) -> Result<(), ExportError> {
        let json_value = serde_json::Value::Array(
            rows.iter()
                .map(|row| row_to_json_object(schema, row))
                .collect(),
        );

        if self.pretty {
            serde_json::to_writer_pretty(writer, &json_value)?;
        } else {
            serde_json::to_writer(writer, &json_value)?;
        }

        Ok(())
    }
}

fn row_to_json_object(schema: &Schema, row: &Row) -> serde_json::Value {
    let mut map = serde_json::Map::new();

    for column in schema.columns() {
        map.insert(
            column.display_name.clone(),
            row.get(&column.id).to_serde_json(),
        );
    }

    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartgrid_core::{ColumnDefinition, ColumnType, Value};

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDefinition::new("id", "Id", ColumnType::Integer),
            ColumnDefinition::new("meta", "Meta", ColumnType::Json),
            ColumnDefinition::new("note", "Note", ColumnType::Text),
        ])
    }

    fn export(rows: &[Row], pretty: bool) -> String {
        let refs: Vec<&Row> = rows.iter().collect();
        let mut buf = Vec::new();
        JsonExporter { pretty }
            .export(&schema(), &refs, &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn exports_array_of_objects() {
        let rows = vec![
            Row::new(1)
                .with("id", 1)
                .with("meta", Value::Json(r#"{"k":[1,2]}"#.into())),
        ];

        let parsed: serde_json::Value = serde_json::from_str(&export(&rows, false)).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr.len(), 1);
        assert_eq!(arr[0]["Id"], 1);
        assert_eq!(arr[0]["Meta"]["k"][1], 2);
        assert!(arr[0]["Note"].is_null());
    }

    #[test]
    fn pretty_output_is_indented() {
        let rows = vec![Row::new(1).with("id", 1)];
        let output = export(&rows, true);
        assert!(output.contains("\n  {"));
    }

    #[test]
    fn empty_rows_export_empty_array() {
        assert_eq!(export(&[], false), "[]");
    }
}
