use crate::config::Density;
use crate::drag::Point;
use crate::focus::{CellRef, GridKey};
use crate::query::{FilterSpec, GroupKey, SortSpec};
use crate::{RowId, Value};

/// Input fed to the grid by the host.
///
/// Pointer coordinates are relative to the top-left of the body (below the header).
#[derive(Debug, Clone, PartialEq)]
pub enum GridInput {
    PointerDown { point: Point, click_count: u8 },
    PointerMove(Point),
    PointerUp(Point),
    Key(GridKey),

    /// The editor control replaced its text.
    EditorInput(String),

    /// Focus left the editor control.
    EditorBlur,

    /// Commit the open edit without moving.
    Commit,

    /// Raw scroll event; applied on the next frame.
    Scroll(f32),

    /// Animation frame tick.
    Frame,

    Resize { width: f32, height: f32 },

    HeaderClick(String),
    ResizeColumn { column_id: String, width: f32 },
    ToggleRowSelection(RowId),
    ToggleSelectAll,
    ClearSelection,
    ToggleGroup(GroupKey),

    SetFilters(Vec<FilterSpec>),
    SetGrouping(Vec<String>),
    SetSearch(String),
    SetDensity(Density),

    AddColumn,
    AddRow,
    EditRow(RowId),
    DeleteSelected,
}

/// What the pointer is over.
#[derive(Debug, Clone, PartialEq)]
pub enum HitTarget {
    Cell(CellRef),
    Handle(RowId),
    SelectionBox(RowId),
    GroupHeader(GroupKey),
}

/// Requests and notifications for the owner of the rows.
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    CellEdited {
        row_id: RowId,
        column_id: String,
        value: Value,
    },

    /// Emitted once per drop; `new_order` covers every caller row.
    RowReordered {
        active_id: RowId,
        over_id: RowId,
        new_order: Vec<RowId>,
    },

    SelectionChanged(Vec<RowId>),

    /// Sort cycled from a header click (`None` means unsorted).
    SortChanged(Option<SortSpec>),

    ColumnResized {
        column_id: String,
        width: f32,
    },

    AddColumnRequested,
    AddRowRequested,
    EditRowRequested(RowId),
    DeleteRowsRequested(Vec<RowId>),
}
