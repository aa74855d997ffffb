/// Height of the header row.
pub const HEADER_HEIGHT: f32 = 36.0;

/// Height of the toolbar above the header.
pub const TOOLBAR_HEIGHT: f32 = 44.0;

/// Height of the footer summary bar.
pub const FOOTER_HEIGHT: f32 = 28.0;

/// Width of the drag-handle column.
pub const HANDLE_COLUMN_WIDTH: f32 = 28.0;

/// Width of the row selection checkbox column.
pub const SELECTION_COLUMN_WIDTH: f32 = 36.0;

/// Minimum width for a column.
pub const MIN_COLUMN_WIDTH: f32 = 50.0;

/// Default width for a column.
pub const DEFAULT_COLUMN_WIDTH: f32 = 150.0;

/// Sort indicator for ascending sort.
pub const SORT_INDICATOR_ASC: &str = "↑";

/// Sort indicator for descending sort.
pub const SORT_INDICATOR_DESC: &str = "↓";

/// Badge colors for enumeration options, indexed by option position (wraps).
pub const BADGE_PALETTE: [&str; 8] = [
    "#3b82f6", "#22c55e", "#f59e0b", "#ef4444", "#a855f7", "#14b8a6", "#ec4899", "#64748b",
];
