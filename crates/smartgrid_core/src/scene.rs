//! Framework-independent drawable description of the grid.
//!
//! [`render`] is a pure function of its input; hosts paint the returned [`Scene`].

use std::sync::Arc;

use crate::cell::{CellContent, CellEditor, dispatch, render_cell};
use crate::drag::DragState;
use crate::focus::CellMode;
use crate::query::{OrderedRowView, SortDirection, SortSpec, ViewEntry};
use crate::schema::{ColumnLayout, ColumnSlot};
use crate::selection::RowSelection;
use crate::theme::{SORT_INDICATOR_ASC, SORT_INDICATOR_DESC};
use crate::virtualizer::Virtualizer;
use crate::{ColumnType, Row, RowId, Schema, Value};

pub struct SceneInput<'a> {
    pub schema: &'a Schema,
    pub layout: &'a ColumnLayout,
    pub rows: &'a [Row],
    pub view: &'a OrderedRowView,
    pub virtualizer: &'a Virtualizer,
    pub sort: Option<&'a SortSpec>,
    pub mode: &'a CellMode,
    pub drag: Option<&'a DragState>,
    pub selection: &'a RowSelection,
    pub search: &'a str,
    /// The open draft was rejected by the last commit attempt.
    pub draft_rejected: bool,
    pub max_display_len: usize,
    pub indent_width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub toolbar: Toolbar,
    pub header: Vec<HeaderCell>,
    pub body: Body,
    pub footer: Footer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolbarAction {
    AddRow,
    AddColumn,
    DeleteSelected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolbarButton {
    pub action: ToolbarAction,
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toolbar {
    pub search: String,
    pub buttons: Vec<ToolbarButton>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub key: Arc<str>,
    pub title: Arc<str>,
    pub slot: ColumnSlot,
    pub x: f32,
    pub width: f32,
    pub column_type: Option<ColumnType>,
    pub sort: Option<SortDirection>,
    pub sort_indicator: Option<&'static str>,
    /// Select-all checkbox state for the selection column.
    pub all_selected: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub scroll_offset: f32,
    pub total_height: f32,
    pub total_width: f32,
    pub rows: Vec<SceneRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneRow {
    /// Position in the row view.
    pub index: usize,
    pub top: f32,
    pub height: f32,
    pub kind: RowKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
    Data {
        row_id: RowId,
        indent: f32,
        selected: bool,
        dragging: bool,
        drop_target: bool,
        cells: Vec<SceneCell>,
    },
    GroupHeader {
        label: String,
        count: usize,
        expanded: bool,
        indent: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneCell {
    pub key: Arc<str>,
    pub slot: ColumnSlot,
    pub x: f32,
    pub width: f32,
    pub content: Option<CellContent>,
    pub focused: bool,
    pub editor: Option<EditorView>,
}

/// An open editor drawn over its cell.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorView {
    pub editor: CellEditor,
    pub draft: String,
    pub invalid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Footer {
    pub visible_rows: usize,
    pub total_rows: usize,
    pub selected: usize,
    pub text: String,
}

pub fn render(input: &SceneInput<'_>) -> Scene {
    Scene {
        toolbar: toolbar(input),
        header: header(input),
        body: body(input),
        footer: footer(input),
    }
}

fn toolbar(input: &SceneInput<'_>) -> Toolbar {
    let buttons = vec![
        ToolbarButton {
            action: ToolbarAction::AddRow,
            label: "Add row",
            enabled: true,
        },
        ToolbarButton {
            action: ToolbarAction::AddColumn,
            label: "Add column",
            enabled: true,
        },
        ToolbarButton {
            action: ToolbarAction::DeleteSelected,
            label: "Delete",
            enabled: !input.selection.is_empty(),
        },
    ];

    Toolbar {
        search: input.search.to_string(),
        buttons,
    }
}

fn header(input: &SceneInput<'_>) -> Vec<HeaderCell> {
    input
        .layout
        .columns()
        .iter()
        .enumerate()
        .map(|(ix, col)| {
            let sort = input
                .sort
                .filter(|s| col.is_data() && *s.column_id == *col.key)
                .map(|s| s.direction);

            let sort_indicator = sort.map(|d| match d {
                SortDirection::Ascending => SORT_INDICATOR_ASC,
                SortDirection::Descending => SORT_INDICATOR_DESC,
            });

            HeaderCell {
                key: col.key.clone(),
                title: col.title.clone(),
                slot: col.slot,
                x: input.layout.offset_of(ix).unwrap_or(0.0),
                width: col.width,
                column_type: col.column_type,
                sort,
                sort_indicator,
                all_selected: (col.slot == ColumnSlot::Selection)
                    .then(|| input.selection.all_selected(input.view)),
            }
        })
        .collect()
}

fn body(input: &SceneInput<'_>) -> Body {
    let window = input.virtualizer.window();
    let mut rows = Vec::with_capacity(window.len());

    for (ix, top) in window.iter() {
        let Some(entry) = input.view.get(ix) else {
            continue;
        };
        let height = input.virtualizer.row_height(ix).unwrap_or(0.0);

        let kind = match entry {
            ViewEntry::Data {
                row_index,
                row_id,
                depth,
                ..
            } => {
                let Some(row) = input.rows.get(*row_index) else {
                    log::warn!("View row {ix} points at missing row {row_index}");
                    continue;
                };
                data_row(input, row, row_id, *depth)
            }
            ViewEntry::GroupHeader {
                value,
                count,
                expanded,
                depth,
                ..
            } => RowKind::GroupHeader {
                label: group_label(value),
                count: *count,
                expanded: *expanded,
                indent: *depth as f32 * input.indent_width,
            },
        };

        rows.push(SceneRow {
            index: ix,
            top,
            height,
            kind,
        });
    }

    Body {
        scroll_offset: input.virtualizer.scroll_offset(),
        total_height: window.total_height,
        total_width: input.layout.total_width(),
        rows,
    }
}

fn group_label(value: &Value) -> String {
    if value.is_null() {
        "(empty)".to_string()
    } else {
        value.as_display_string()
    }
}

fn data_row(input: &SceneInput<'_>, row: &Row, row_id: &RowId, depth: usize) -> RowKind {
    let selected = input.selection.contains(row_id);
    let dragging = input.drag.is_some_and(|d| d.active_row_id == *row_id);
    let drop_target = input
        .drag
        .is_some_and(|d| d.active_row_id != *row_id && d.current_over_row_id.as_ref() == Some(row_id));

    let (focus, edit) = match input.mode {
        CellMode::Idle => (None, None),
        CellMode::Focused(cell) => (Some(cell), None),
        CellMode::Editing { cell, draft, .. } => (Some(cell), Some(draft)),
    };
    let focus = focus.filter(|cell| cell.row_id == *row_id);

    let cells = input
        .layout
        .columns()
        .iter()
        .enumerate()
        .map(|(ix, col)| {
            let x = input.layout.offset_of(ix).unwrap_or(0.0);
            let mut cell = SceneCell {
                key: col.key.clone(),
                slot: col.slot,
                x,
                width: col.width,
                content: None,
                focused: false,
                editor: None,
            };

            if let ColumnSlot::Data(schema_ix) = col.slot
                && let Some(def) = input.schema.columns().get(schema_ix)
            {
                cell.content = Some(render_cell(def, row.get(&def.id), input.max_display_len));
                cell.focused = focus.is_some_and(|f| f.column_id == def.id);

                if cell.focused
                    && let Some(draft) = edit
                {
                    cell.editor = Some(EditorView {
                        editor: dispatch(def.column_type).editor,
                        draft: draft.clone(),
                        invalid: input.draft_rejected,
                    });
                }
            }

            cell
        })
        .collect();

    RowKind::Data {
        row_id: row_id.clone(),
        indent: depth as f32 * input.indent_width,
        selected,
        dragging,
        drop_target,
        cells,
    }
}

fn footer(input: &SceneInput<'_>) -> Footer {
    let visible_rows = input.view.data_row_count();
    let total_rows = input.rows.len();
    let selected = input.selection.len();

    let mut text = if visible_rows == total_rows {
        format!("{} rows", total_rows)
    } else {
        format!("{} of {} rows", visible_rows, total_rows)
    };

    if selected > 0 {
        text.push_str(&format!(", {} selected", selected));
    }

    Footer {
        visible_rows,
        total_rows,
        selected,
        text,
    }
}
