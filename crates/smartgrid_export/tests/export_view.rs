use smartgrid_core::{
    FilterPredicate, FilterSpec, GroupState, QuerySpec, RowId, SortSpec, Value, apply,
};
use smartgrid_export::{
    ExportFormat, ImportOptions, RowIdSource, export, import_delimited, visible_rows,
};
use smartgrid_test_support::{abc_rows, name_schema, people_rows, people_schema};

fn export_to_string(format: ExportFormat, query: &QuerySpec) -> String {
    let rows = people_rows(6);
    let schema = people_schema();
    let view = apply(&rows, &schema, query, &GroupState::new());

    let mut buf = Vec::new();
    export(&rows, &schema, &view, format, &mut buf).unwrap();
    String::from_utf8(buf).unwrap()
}

#[test]
fn export_follows_view_order_and_filters() {
    let query = QuerySpec {
        sort: Some(SortSpec::desc("age")),
        filters: vec![FilterSpec::new("status", FilterPredicate::Equals, "todo")],
        ..QuerySpec::default()
    };

    let output = export_to_string(ExportFormat::Csv, &query);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines[0], "Name,Age,Score,Active,Status,Joined,Meta");
    // Rows 1 and 4 have status "todo"; row 4 is older
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("Ken 4,41,"));
    assert!(lines[2].starts_with("Ada 1,20,"));
}

#[test]
fn grouped_export_skips_headers() {
    let query = QuerySpec {
        grouping: vec!["status".to_string()],
        ..QuerySpec::default()
    };

    let output = export_to_string(ExportFormat::Tsv, &query);
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines.len(), 7);
    assert!(lines.iter().skip(1).all(|l| l.split('\t').count() == 7));
}

#[test]
fn json_export_uses_display_names() {
    let output = export_to_string(ExportFormat::JsonCompact, &QuerySpec::default());
    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(parsed.as_array().unwrap().len(), 6);
    assert_eq!(parsed[0]["Name"], "Ada 1");
    assert_eq!(parsed[0]["Meta"]["n"], 0);
}

#[test]
fn exported_csv_imports_back() {
    let rows = abc_rows();
    let schema = name_schema();
    let view = apply(&rows, &schema, &QuerySpec::default(), &GroupState::new());

    let mut buf = Vec::new();
    export(&rows, &schema, &view, ExportFormat::Csv, &mut buf).unwrap();

    let imported = import_delimited(buf.as_slice(), &schema, &ImportOptions::default()).unwrap();
    let names: Vec<&Value> = imported.iter().map(|r| r.get("name")).collect();

    assert_eq!(
        names,
        vec![
            &Value::Text("A".into()),
            &Value::Text("B".into()),
            &Value::Text("C".into())
        ]
    );
    assert_eq!(imported[2].id, RowId::Int(3));
}

#[test]
fn tsv_import_coerces_typed_columns() {
    let input = "Name\tAge\tActive\tStatus\tJoined\nZed\t33\tyes\tdoing\t2024-05-01\n";
    let options = ImportOptions {
        id_source: RowIdSource::LineNumber,
        ..ImportOptions::tsv()
    };

    let rows = import_delimited(input.as_bytes(), &people_schema(), &options).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("age"), &Value::Int(33));
    assert_eq!(rows[0].get("active"), &Value::Bool(true));
    assert_eq!(rows[0].get("status"), &Value::Text("doing".into()));
    assert_eq!(
        rows[0].get("joined").as_display_string(),
        "2024-05-01 00:00:00"
    );
}

#[test]
fn visible_rows_resolves_data_entries() {
    let rows = people_rows(3);
    let schema = people_schema();
    let query = QuerySpec {
        filters: vec![FilterSpec::new("active", FilterPredicate::Equals, "true")],
        ..QuerySpec::default()
    };
    let view = apply(&rows, &schema, &query, &GroupState::new());

    let ids: Vec<&RowId> = visible_rows(&rows, &view).iter().map(|r| &r.id).collect();
    assert_eq!(ids, vec![&RowId::Int(1), &RowId::Int(3)]);
}
