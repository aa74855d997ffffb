//! Cell rendering dispatch: column type -> renderer and editor.

use std::sync::Arc;

use crate::theme::BADGE_PALETTE;
use crate::{ColumnDefinition, ColumnType, TextAlign, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellRenderer {
    TruncatedText,
    /// Right-aligned, monospace.
    Number,
    Checkbox,
    DateTime,
    Badge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellEditor {
    TextInput,
    NumericInput,
    /// Toggled in place; no edit mode.
    Toggle,
    DateTimeInput,
    /// Chosen in place; no edit mode.
    Select,
    MultilineInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellCapability {
    pub renderer: CellRenderer,
    pub editor: CellEditor,
    /// Click commits directly instead of entering edit mode.
    pub inline_commit: bool,
}

pub fn dispatch(column_type: ColumnType) -> CellCapability {
    let (renderer, editor) = match column_type {
        ColumnType::Text => (CellRenderer::TruncatedText, CellEditor::TextInput),
        ColumnType::Integer | ColumnType::Float => {
            (CellRenderer::Number, CellEditor::NumericInput)
        }
        ColumnType::Boolean => (CellRenderer::Checkbox, CellEditor::Toggle),
        ColumnType::DateTime => (CellRenderer::DateTime, CellEditor::DateTimeInput),
        ColumnType::Enumeration => (CellRenderer::Badge, CellEditor::Select),
        ColumnType::Json => (CellRenderer::TruncatedText, CellEditor::MultilineInput),
    };

    CellCapability {
        renderer,
        editor,
        inline_commit: column_type.commits_inline(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    pub label: Arc<str>,
    pub color: &'static str,
}

/// What a cell draws when not editing.
#[derive(Debug, Clone, PartialEq)]
pub struct CellContent {
    pub renderer: CellRenderer,
    pub text: Arc<str>,
    pub align: TextAlign,
    pub monospace: bool,
    pub is_null: bool,
    pub checked: Option<bool>,
    pub badge: Option<Badge>,
}

/// Renders one cell value for display.
pub fn render_cell(column: &ColumnDefinition, value: &Value, max_len: usize) -> CellContent {
    let capability = dispatch(column.column_type);
    let is_null = value.is_null();

    let mut content = CellContent {
        renderer: capability.renderer,
        text: "".into(),
        align: TextAlign::Left,
        monospace: false,
        is_null,
        checked: None,
        badge: None,
    };

    match capability.renderer {
        CellRenderer::TruncatedText => {
            // JSON is shown on one line
            let text = value.as_display_string_truncated(max_len).replace('\n', " ");
            content.text = text.into();
        }
        CellRenderer::Number => {
            content.text = value.as_display_string().into();
            content.align = TextAlign::Right;
            content.monospace = true;
        }
        CellRenderer::Checkbox => {
            content.checked = Some(value.as_bool().unwrap_or(false));
            content.align = TextAlign::Center;
        }
        CellRenderer::DateTime => {
            content.text = value.as_display_string().into();
        }
        CellRenderer::Badge => {
            if !is_null {
                let label: Arc<str> = value.as_display_string_truncated(max_len).into();
                let color = column
                    .option_index(value)
                    .map(|ix| BADGE_PALETTE[ix % BADGE_PALETTE.len()])
                    .unwrap_or(BADGE_PALETTE[BADGE_PALETTE.len() - 1]);
                content.text = label.clone();
                content.badge = Some(Badge { label, color });
            }
        }
    }

    content
}

/// Value a boolean or enumeration cell takes when clicked.
///
/// Booleans flip (null becomes true). Enumerations advance to the next option,
/// wrapping; a value outside the options starts at the first one.
pub fn inline_next_value(column: &ColumnDefinition, current: &Value) -> Option<Value> {
    match column.column_type {
        ColumnType::Boolean => Some(Value::Bool(!current.as_bool().unwrap_or(false))),
        ColumnType::Enumeration => {
            if column.options.is_empty() {
                return None;
            }
            let next = match column.option_index(current) {
                Some(ix) => (ix + 1) % column.options.len(),
                None => 0,
            };
            Some(Value::Text(column.options[next].clone()))
        }
        _ => None,
    }
}
