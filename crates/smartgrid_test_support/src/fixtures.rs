use smartgrid_core::{
    ColumnDefinition, ColumnType, GridConfig, GridInput, Row, RowId, Schema, SmartGrid, Value,
};

/// Single text column `name`.
pub fn name_schema() -> Schema {
    Schema::new(vec![
        ColumnDefinition::new("name", "Name", ColumnType::Text).with_width(120.0),
    ])
}

/// `[{id:1,name:"A"},{id:2,name:"B"},{id:3,name:"C"}]`
pub fn abc_rows() -> Vec<Row> {
    vec![
        Row::new(1).with("name", "A"),
        Row::new(2).with("name", "B"),
        Row::new(3).with("name", "C"),
    ]
}

/// One column of every type.
pub fn people_schema() -> Schema {
    Schema::new(vec![
        ColumnDefinition::new("name", "Name", ColumnType::Text)
            .with_width(160.0)
            .flexible(),
        ColumnDefinition::new("age", "Age", ColumnType::Integer).with_width(70.0),
        ColumnDefinition::new("score", "Score", ColumnType::Float).with_width(80.0),
        ColumnDefinition::new("active", "Active", ColumnType::Boolean).with_width(70.0),
        ColumnDefinition::new("status", "Status", ColumnType::Enumeration)
            .with_options(["todo", "doing", "done"])
            .with_width(100.0),
        ColumnDefinition::new("joined", "Joined", ColumnType::DateTime).with_width(170.0),
        ColumnDefinition::new("meta", "Meta", ColumnType::Json).with_width(160.0),
    ])
}

/// `count` deterministic rows for [`people_schema`], ids starting at 1.
pub fn people_rows(count: usize) -> Vec<Row> {
    const NAMES: [&str; 6] = ["Ada", "Grace", "Linus", "Ken", "Barbara", "Edsger"];
    const STATUS: [&str; 3] = ["todo", "doing", "done"];

    (0..count)
        .map(|i| {
            let joined = Value::coerce(
                &format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1),
                ColumnType::DateTime,
            )
            .unwrap_or(Value::Null);

            Row::new(i as i64 + 1)
                .with("name", format!("{} {}", NAMES[i % NAMES.len()], i + 1))
                .with("age", 20 + (i as i64 * 7) % 50)
                .with("score", (i as f64 * 1.5) % 10.0)
                .with("active", i % 2 == 0)
                .with("status", STATUS[i % STATUS.len()])
                .with("joined", joined)
                .with("meta", Value::Json(format!("{{\"n\":{}}}", i)))
        })
        .collect()
}

/// Rows from a JSON array of objects; `id` is the identity, other keys are values.
pub fn rows_from_json(json: serde_json::Value, schema: &Schema) -> Vec<Row> {
    let serde_json::Value::Array(items) = json else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| {
            let serde_json::Value::Object(fields) = item else {
                return None;
            };

            let id = match fields.get("id")? {
                serde_json::Value::Number(n) => RowId::Int(n.as_i64()?),
                serde_json::Value::String(s) => RowId::Text(s.clone()),
                _ => return None,
            };

            let mut row = Row::new(id);
            for (key, value) in fields.iter().filter(|(k, _)| *k != "id") {
                row.set(key.clone(), json_value(value, schema.get(key)));
            }
            Some(row)
        })
        .collect()
}

fn json_value(value: &serde_json::Value, column: Option<&ColumnDefinition>) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => match column {
            Some(col) => col.coerce(s).unwrap_or_else(|_| Value::Text(s.clone())),
            None => Value::Text(s.clone()),
        },
        other => Value::Json(other.to_string()),
    }
}

/// Integer row identities.
pub fn ids(values: &[i64]) -> Vec<RowId> {
    values.iter().map(|&i| RowId::Int(i)).collect()
}

/// Grid with default config, an 800x400 viewport and the given rows.
pub fn sized_grid(schema: Schema, rows: Vec<Row>) -> SmartGrid {
    let mut grid = SmartGrid::new(schema, GridConfig::default());
    grid.handle(GridInput::Resize {
        width: 800.0,
        height: 400.0,
    });
    grid.set_rows(rows);
    grid
}
