mod cell;
mod config;
mod drag;
mod error;
mod events;
mod focus;
mod grid;
mod outline;
mod query;
mod row;
pub mod scene;
mod schema;
mod selection;
pub mod theme;
mod value;
mod virtualizer;

pub use cell::{
    Badge, CellCapability, CellContent, CellEditor, CellRenderer, dispatch, inline_next_value,
    render_cell,
};
pub use config::{Density, GridConfig, GridConfigStore};
pub use drag::{
    DragEngine, DragOutcome, DragState, Point, Reorder, move_row, plan_reorder, resolve_over,
};
pub use error::{CoercionError, GridError};
pub use events::{GridEvent, GridInput, HitTarget};
pub use focus::{
    CellEdit, CellFocus, CellInput, CellMode, CellRef, CellSource, GridKey, Transition,
};
pub use grid::SmartGrid;
pub use outline::{FlatNode, OutlineNode, OutlineTree, Projection, project};
pub use query::{
    FilterPredicate, FilterSpec, GroupKey, GroupState, OrderedRowView, QueryPipeline, QuerySpec,
    SortDirection, SortSpec, ViewEntry, apply, next_sort,
};
pub use row::{Row, RowId, id_set, index_by_id};
pub use scene::{Scene, SceneInput, render};
pub use schema::{ColumnDefinition, ColumnLayout, ColumnSlot, ColumnType, DisplayColumn, Schema, TextAlign};
pub use selection::RowSelection;
pub use value::Value;
pub use virtualizer::{RowHeights, VirtualWindow, Virtualizer, compute_window};
