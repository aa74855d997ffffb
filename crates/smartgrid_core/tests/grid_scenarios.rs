use smartgrid_core::{
    CellMode, CellRef, FilterPredicate, FilterSpec, GridEvent, GridInput, GridKey, GroupState,
    Point, QuerySpec, Row, RowId, SmartGrid, Value, apply,
};
use smartgrid_test_support::{
    abc_rows, ids, name_schema, people_rows, people_schema, sized_grid,
};

/// Body point over the `key` cell of the given view row.
fn cell(grid: &SmartGrid, row: usize, key: &str) -> Point {
    let col = grid.layout().position_of(key).unwrap();
    let x = grid.layout().offset_of(col).unwrap() + 10.0;
    let height = grid.config().row_height();
    Point::new(x, row as f32 * height + height / 2.0)
}

fn name_cell(grid: &SmartGrid, row: usize) -> Point {
    cell(grid, row, "name")
}

fn handle(grid: &SmartGrid, row: usize) -> Point {
    let height = grid.config().row_height();
    Point::new(10.0, row as f32 * height + height / 2.0)
}

fn click(grid: &mut SmartGrid, point: Point) -> Vec<GridEvent> {
    grid.handle(GridInput::PointerDown {
        point,
        click_count: 1,
    })
}

#[test]
fn scenario_a_no_query_keeps_input_order() {
    let view = apply(
        &abc_rows(),
        &name_schema(),
        &QuerySpec::default(),
        &GroupState::new(),
    );
    assert_eq!(view.data_row_ids(), ids(&[1, 2, 3]));
}

#[test]
fn scenario_b_equals_filter() {
    let spec = QuerySpec {
        filters: vec![FilterSpec::new("name", FilterPredicate::Equals, "B")],
        ..QuerySpec::default()
    };
    let view = apply(&abc_rows(), &name_schema(), &spec, &GroupState::new());
    assert_eq!(view.data_row_ids(), ids(&[2]));
}

#[test]
fn scenario_c_arrow_down_clamps_at_last_row() {
    let mut grid = sized_grid(name_schema(), abc_rows());

    let point = name_cell(&grid, 0);
    click(&mut grid, point);
    assert_eq!(grid.focus().focused(), Some(&CellRef::new(1, "name")));

    grid.handle(GridInput::Key(GridKey::Down));
    assert_eq!(grid.focus().focused(), Some(&CellRef::new(2, "name")));

    grid.handle(GridInput::Key(GridKey::Down));
    grid.handle(GridInput::Key(GridKey::Down));
    assert_eq!(grid.focus().focused(), Some(&CellRef::new(3, "name")));
}

#[test]
fn scenario_d_edit_commits_once_and_moves_down() {
    let mut grid = sized_grid(name_schema(), abc_rows());

    let point = name_cell(&grid, 1);
    click(&mut grid, point);
    assert_eq!(grid.focus().focused(), Some(&CellRef::new(2, "name")));

    let events = grid.handle(GridInput::Key(GridKey::Enter));
    assert!(events.is_empty());
    assert_eq!(
        grid.focus().mode(),
        &CellMode::Editing {
            cell: CellRef::new(2, "name"),
            draft: "B".to_string(),
            select_all: true,
        }
    );

    grid.handle(GridInput::Key(GridKey::Char('X')));
    assert_eq!(grid.focus().editing().map(|(_, d)| d), Some("X"));

    let events = grid.handle(GridInput::Key(GridKey::Enter));
    assert_eq!(
        events,
        vec![GridEvent::CellEdited {
            row_id: RowId::Int(2),
            column_id: "name".to_string(),
            value: Value::Text("X".to_string()),
        }]
    );
    assert_eq!(
        grid.focus().mode(),
        &CellMode::Focused(CellRef::new(3, "name"))
    );
}

#[test]
fn escape_never_reports_an_edit() {
    let mut grid = sized_grid(name_schema(), abc_rows());

    let point = name_cell(&grid, 0);
    click(&mut grid, point);
    grid.handle(GridInput::Key(GridKey::Char('Q')));
    let events = grid.handle(GridInput::Key(GridKey::Escape));

    assert!(events.is_empty());
    assert_eq!(
        grid.focus().mode(),
        &CellMode::Focused(CellRef::new(1, "name"))
    );
}

#[test]
fn scenario_e_drag_up_inserts_before_target() {
    let rows = abc_rows();
    let mut grid = sized_grid(name_schema(), rows.clone());

    let start = handle(&grid, 2);
    click(&mut grid, start);
    assert!(grid.handle(GridInput::PointerMove(handle(&grid, 1))).is_empty());
    grid.handle(GridInput::PointerMove(handle(&grid, 0)));
    assert_eq!(
        grid.drag().state().and_then(|s| s.current_over_row_id.clone()),
        Some(RowId::Int(1))
    );

    let events = grid.handle(GridInput::PointerUp(handle(&grid, 0)));
    assert_eq!(
        events,
        vec![GridEvent::RowReordered {
            active_id: RowId::Int(3),
            over_id: RowId::Int(1),
            new_order: ids(&[3, 1, 2]),
        }]
    );
    assert!(!grid.drag().is_active());

    // Caller applies the order and hands the rows back
    let GridEvent::RowReordered { new_order, .. } = &events[0] else {
        unreachable!();
    };
    let reordered: Vec<Row> = new_order
        .iter()
        .filter_map(|id| rows.iter().find(|r| r.id == *id).cloned())
        .collect();
    grid.set_rows(reordered.clone());

    assert_eq!(grid.view().data_row_ids(), ids(&[3, 1, 2]));
    for row in &reordered {
        let original = rows.iter().find(|r| r.id == row.id).unwrap();
        assert_eq!(row.values, original.values);
    }
}

#[test]
fn drop_on_itself_is_silent() {
    let mut grid = sized_grid(name_schema(), abc_rows());

    let start = handle(&grid, 1);
    click(&mut grid, start);
    grid.handle(GridInput::PointerMove(handle(&grid, 2)));
    grid.handle(GridInput::PointerMove(handle(&grid, 1)));

    assert!(grid.handle(GridInput::PointerUp(handle(&grid, 1))).is_empty());
}

#[test]
fn focus_and_selection_follow_identity_across_reorder() {
    let mut grid = sized_grid(name_schema(), abc_rows());

    let point = name_cell(&grid, 0);
    click(&mut grid, point);
    grid.handle(GridInput::ToggleRowSelection(RowId::Int(1)));

    let rows = abc_rows();
    grid.set_rows(vec![rows[2].clone(), rows[1].clone(), rows[0].clone()]);

    assert_eq!(grid.focus().focused(), Some(&CellRef::new(1, "name")));
    assert!(grid.selection().contains(&RowId::Int(1)));

    // Row 1 is now last: moving down stays put
    grid.handle(GridInput::Key(GridKey::Down));
    assert_eq!(grid.focus().focused(), Some(&CellRef::new(1, "name")));
}

#[test]
fn grouped_drop_moves_row_into_target_group() {
    let schema = smartgrid_test_support::people_schema();
    let rows = vec![
        Row::new(1).with("name", "a").with("status", "todo"),
        Row::new(2).with("name", "b").with("status", "done"),
        Row::new(3).with("name", "c").with("status", "todo"),
    ];
    let mut grid = sized_grid(schema, rows);
    grid.handle(GridInput::SetGrouping(vec!["status".to_string()]));

    // [todo header, 1, 3, done header, 2]
    let start = handle(&grid, 4);
    click(&mut grid, start);
    grid.handle(GridInput::PointerMove(handle(&grid, 2)));
    let events = grid.handle(GridInput::PointerUp(handle(&grid, 2)));

    assert_eq!(
        events,
        vec![
            GridEvent::CellEdited {
                row_id: RowId::Int(2),
                column_id: "status".to_string(),
                value: Value::Text("todo".to_string()),
            },
            GridEvent::RowReordered {
                active_id: RowId::Int(2),
                over_id: RowId::Int(3),
                new_order: ids(&[1, 2, 3]),
            },
        ]
    );
}

#[test]
fn invalid_integer_draft_stays_open() {
    let schema = smartgrid_test_support::people_schema();
    let mut grid = sized_grid(schema, smartgrid_test_support::people_rows(3));

    let col = grid.layout().position_of("age").unwrap();
    let x = grid.layout().offset_of(col).unwrap() + 5.0;
    click(&mut grid, Point::new(x, 5.0));

    grid.handle(GridInput::Key(GridKey::Char('x')));
    let events = grid.handle(GridInput::Key(GridKey::Enter));
    assert!(events.is_empty());
    assert_eq!(grid.focus().editing().map(|(_, d)| d), Some("x"));

    let scene = grid.scene();
    let invalid = scene.body.rows.iter().any(|r| match &r.kind {
        smartgrid_core::scene::RowKind::Data { cells, .. } => cells
            .iter()
            .any(|c| c.editor.as_ref().is_some_and(|e| e.invalid)),
        _ => false,
    });
    assert!(invalid);

    grid.handle(GridInput::EditorInput("42".to_string()));
    let events = grid.handle(GridInput::EditorBlur);
    assert_eq!(
        events,
        vec![GridEvent::CellEdited {
            row_id: RowId::Int(1),
            column_id: "age".to_string(),
            value: Value::Int(42),
        }]
    );
}

#[test]
fn clicking_a_checkbox_commits_the_open_edit_first() {
    let mut grid = sized_grid(people_schema(), people_rows(3));

    let point = name_cell(&grid, 0);
    click(&mut grid, point);
    grid.handle(GridInput::Key(GridKey::Char('Z')));

    let point = cell(&grid, 1, "active");
    let events = click(&mut grid, point);
    assert_eq!(
        events,
        vec![
            GridEvent::CellEdited {
                row_id: RowId::Int(1),
                column_id: "name".to_string(),
                value: Value::Text("Z".to_string()),
            },
            GridEvent::CellEdited {
                row_id: RowId::Int(2),
                column_id: "active".to_string(),
                value: Value::Bool(true),
            },
        ]
    );
    assert_eq!(
        grid.focus().mode(),
        &CellMode::Focused(CellRef::new(2, "active"))
    );
}

#[test]
fn collapsing_a_group_commits_the_open_edit_first() {
    let mut grid = sized_grid(people_schema(), people_rows(6));
    grid.handle(GridInput::SetGrouping(vec!["status".to_string()]));

    // [todo, 1, 4, doing, 2, 5, done, 3, 6]
    let point = name_cell(&grid, 1);
    click(&mut grid, point);
    grid.handle(GridInput::Key(GridKey::Char('Q')));

    let point = name_cell(&grid, 0);
    let events = click(&mut grid, point);
    assert_eq!(
        events,
        vec![GridEvent::CellEdited {
            row_id: RowId::Int(1),
            column_id: "name".to_string(),
            value: Value::Text("Q".to_string()),
        }]
    );
    assert_eq!(grid.view().data_row_ids(), ids(&[2, 5, 3, 6]));
    assert_eq!(grid.focus().mode(), &CellMode::Idle);
}

#[test]
fn rejected_draft_keeps_the_group_open() {
    let mut grid = sized_grid(people_schema(), people_rows(6));
    grid.handle(GridInput::SetGrouping(vec!["status".to_string()]));

    let point = cell(&grid, 1, "age");
    click(&mut grid, point);
    grid.handle(GridInput::Key(GridKey::Char('x')));

    let header = name_cell(&grid, 0);
    assert!(click(&mut grid, header).is_empty());
    assert_eq!(grid.view().len(), 9);
    assert_eq!(grid.focus().editing().map(|(_, d)| d), Some("x"));

    grid.handle(GridInput::EditorInput("42".to_string()));
    let events = click(&mut grid, header);
    assert_eq!(
        events,
        vec![GridEvent::CellEdited {
            row_id: RowId::Int(1),
            column_id: "age".to_string(),
            value: Value::Int(42),
        }]
    );
    assert_eq!(grid.view().len(), 7);
}
