use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::theme::{
    DEFAULT_COLUMN_WIDTH, HANDLE_COLUMN_WIDTH, MIN_COLUMN_WIDTH, SELECTION_COLUMN_WIDTH,
};
use crate::{CoercionError, Value};

/// Cell type tag of a column. Drives sorting, coercion and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    Boolean,
    #[serde(alias = "date", alias = "timestamp")]
    DateTime,
    Json,
    #[serde(alias = "enum", alias = "select")]
    Enumeration,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Json => "json",
            Self::Enumeration => "enumeration",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Columns whose click commits immediately instead of opening an editor.
    pub fn commits_inline(self) -> bool {
        matches!(self, Self::Boolean | Self::Enumeration)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn default_width() -> f32 {
    DEFAULT_COLUMN_WIDTH
}

fn default_min_width() -> f32 {
    MIN_COLUMN_WIDTH
}

/// A typed field definition supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: String,
    pub display_name: String,
    pub column_type: ColumnType,

    #[serde(default = "default_width")]
    pub width: f32,

    #[serde(default = "default_min_width")]
    pub min_width: f32,

    #[serde(default)]
    pub is_flexible: bool,

    /// Allowed values of an enumeration column, in display order.
    #[serde(default)]
    pub options: Vec<String>,
}

impl ColumnDefinition {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        column_type: ColumnType,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            column_type,
            width: DEFAULT_COLUMN_WIDTH,
            min_width: MIN_COLUMN_WIDTH,
            is_flexible: false,
            options: Vec::new(),
        }
    }

    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    pub fn with_min_width(mut self, min_width: f32) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn flexible(mut self) -> Self {
        self.is_flexible = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Converts an edit draft into a value for this column.
    ///
    /// Enumeration columns with a declared option list only accept those options.
    pub fn coerce(&self, draft: &str) -> Result<Value, CoercionError> {
        let value = Value::coerce(draft, self.column_type)?;

        if self.column_type == ColumnType::Enumeration
            && !self.options.is_empty()
            && let Value::Text(text) = &value
            && !self.options.iter().any(|o| o == text)
        {
            return Err(CoercionError::new(draft, self.column_type));
        }

        Ok(value)
    }

    /// Position of a value in the option list of an enumeration column.
    pub fn option_index(&self, value: &Value) -> Option<usize> {
        match value {
            Value::Text(text) => self.options.iter().position(|o| o == text),
            _ => None,
        }
    }
}

/// Ordered list of column definitions with unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    columns: Vec<ColumnDefinition>,
}

impl Schema {
    /// Builds a schema, dropping any column whose id repeats an earlier one.
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        let mut seen = HashSet::new();
        let columns = columns
            .into_iter()
            .filter(|col| {
                let fresh = seen.insert(col.id.clone());
                if !fresh {
                    log::warn!("Duplicate column id '{}' ignored", col.id);
                }
                fresh
            })
            .collect();

        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.id == id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Finds a column by id or display name, ignoring case and surrounding spaces.
    pub fn find_by_header(&self, header: &str) -> Option<&ColumnDefinition> {
        let needle = header.trim();
        self.columns
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(needle))
            .or_else(|| {
                self.columns
                    .iter()
                    .find(|c| c.display_name.trim().eq_ignore_ascii_case(needle))
            })
    }

    /// Display columns, optionally preceded by the handle and selection columns.
    pub fn display_columns(&self, reorderable: bool, selectable: bool) -> Vec<DisplayColumn> {
        let mut out = Vec::with_capacity(self.columns.len() + 2);

        if reorderable {
            out.push(DisplayColumn::chrome(
                ColumnSlot::Handle,
                "__handle",
                HANDLE_COLUMN_WIDTH,
            ));
        }
        if selectable {
            out.push(DisplayColumn::chrome(
                ColumnSlot::Selection,
                "__select",
                SELECTION_COLUMN_WIDTH,
            ));
        }

        out.extend(
            self.columns
                .iter()
                .enumerate()
                .map(|(ix, col)| DisplayColumn::data(ix, col)),
        );
        out
    }
}

impl From<Vec<ColumnDefinition>> for Schema {
    fn from(columns: Vec<ColumnDefinition>) -> Self {
        Self::new(columns)
    }
}

/// What a display column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSlot {
    /// Drag handle for row reordering.
    Handle,
    /// Row selection checkbox.
    Selection,
    /// Schema column at this index.
    Data(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// A column as laid out on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayColumn {
    pub key: Arc<str>,
    pub title: Arc<str>,
    pub slot: ColumnSlot,
    pub column_type: Option<ColumnType>,
    pub width: f32,
    pub min_width: f32,
    pub flexible: bool,
    pub align: TextAlign,
}

impl DisplayColumn {
    fn chrome(slot: ColumnSlot, key: &str, width: f32) -> Self {
        Self {
            key: key.into(),
            title: "".into(),
            slot,
            column_type: None,
            width,
            min_width: width,
            flexible: false,
            align: TextAlign::Center,
        }
    }

    fn data(ix: usize, col: &ColumnDefinition) -> Self {
        let align = match col.column_type {
            ColumnType::Integer | ColumnType::Float => TextAlign::Right,
            ColumnType::Boolean => TextAlign::Center,
            _ => TextAlign::Left,
        };
        let min_width = col.min_width.max(0.0);

        Self {
            key: col.id.as_str().into(),
            title: col.display_name.as_str().into(),
            slot: ColumnSlot::Data(ix),
            column_type: Some(col.column_type),
            width: col.width.max(min_width),
            min_width,
            flexible: col.is_flexible,
            align,
        }
    }

    pub fn is_data(&self) -> bool {
        matches!(self.slot, ColumnSlot::Data(_))
    }
}

/// Horizontal layout of display columns: widths plus prefix offsets for hit-testing.
#[derive(Debug, Clone, Default)]
pub struct ColumnLayout {
    columns: Vec<DisplayColumn>,

    /// Prefix sums of column widths: [0, w0, w0+w1, ...].
    offsets: Vec<f32>,
}

impl ColumnLayout {
    pub fn new(columns: Vec<DisplayColumn>) -> Self {
        let offsets = calculate_offsets(&columns);
        Self { columns, offsets }
    }

    pub fn columns(&self) -> &[DisplayColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn total_width(&self) -> f32 {
        *self.offsets.last().unwrap_or(&0.0)
    }

    /// Left edge of the column at `ix`.
    pub fn offset_of(&self, ix: usize) -> Option<f32> {
        if ix < self.columns.len() {
            self.offsets.get(ix).copied()
        } else {
            None
        }
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.columns.iter().position(|c| &*c.key == key)
    }

    /// Index of the column under horizontal content coordinate `x`.
    pub fn column_at(&self, x: f32) -> Option<usize> {
        if x < 0.0 || x >= self.total_width() {
            return None;
        }

        let upper = self.offsets.partition_point(|&offset| offset <= x);
        upper.checked_sub(1)
    }

    /// Sets a column width, clamped to its minimum. Returns the applied width.
    pub fn set_width(&mut self, ix: usize, width: f32) -> Option<f32> {
        let col = self.columns.get_mut(ix)?;
        col.width = width.max(col.min_width);
        let applied = col.width;
        self.offsets = calculate_offsets(&self.columns);
        Some(applied)
    }

    /// Distributes any space left in `viewport_width` across flexible columns.
    pub fn fit_to(&mut self, viewport_width: f32) {
        let extra = viewport_width - self.total_width();
        let flexible = self.columns.iter().filter(|c| c.flexible).count();

        if extra <= 0.0 || flexible == 0 {
            return;
        }

        let share = extra / flexible as f32;
        for col in self.columns.iter_mut().filter(|c| c.flexible) {
            col.width += share;
        }
        self.offsets = calculate_offsets(&self.columns);
    }
}

fn calculate_offsets(columns: &[DisplayColumn]) -> Vec<f32> {
    let mut offsets = Vec::with_capacity(columns.len() + 1);
    offsets.push(0.0);
    let mut sum = 0.0;
    for col in columns {
        sum += col.width;
        offsets.push(sum);
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDefinition::new("name", "Name", ColumnType::Text).with_width(100.0),
            ColumnDefinition::new("age", "Age", ColumnType::Integer).with_width(80.0),
            ColumnDefinition::new("status", "Status", ColumnType::Enumeration)
                .with_options(["open", "closed"])
                .flexible(),
        ])
    }

    #[test]
    fn duplicate_column_ids_keep_first() {
        let schema = Schema::new(vec![
            ColumnDefinition::new("a", "First", ColumnType::Text),
            ColumnDefinition::new("a", "Second", ColumnType::Integer),
        ]);
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.columns()[0].display_name, "First");
    }

    #[test]
    fn display_columns_prepend_chrome() {
        let cols = schema().display_columns(true, true);
        assert_eq!(cols[0].slot, ColumnSlot::Handle);
        assert_eq!(cols[1].slot, ColumnSlot::Selection);
        assert_eq!(cols[2].slot, ColumnSlot::Data(0));
        assert_eq!(cols[3].align, TextAlign::Right);
        assert_eq!(cols.len(), 5);
    }

    #[test]
    fn layout_hit_testing_uses_prefix_sums() {
        let layout = ColumnLayout::new(schema().display_columns(false, false));
        assert_eq!(layout.column_at(0.0), Some(0));
        assert_eq!(layout.column_at(99.9), Some(0));
        assert_eq!(layout.column_at(100.0), Some(1));
        assert_eq!(layout.column_at(179.0), Some(1));
        assert_eq!(layout.column_at(-1.0), None);
        assert_eq!(layout.column_at(layout.total_width()), None);
    }

    #[test]
    fn resize_clamps_to_min_width() {
        let mut layout = ColumnLayout::new(schema().display_columns(false, false));
        assert_eq!(layout.set_width(0, 10.0), Some(MIN_COLUMN_WIDTH));
        assert_eq!(layout.offset_of(1), Some(MIN_COLUMN_WIDTH));
        assert_eq!(layout.set_width(9, 10.0), None);
    }

    #[test]
    fn fit_grows_only_flexible_columns() {
        let mut layout = ColumnLayout::new(schema().display_columns(false, false));
        let before = layout.total_width();
        layout.fit_to(before + 40.0);
        assert_eq!(layout.columns()[0].width, 100.0);
        assert_eq!(layout.columns()[2].width, DEFAULT_COLUMN_WIDTH + 40.0);
    }

    #[test]
    fn enumeration_coercion_checks_options() {
        let schema = schema();
        let status = schema.get("status").unwrap();
        assert_eq!(status.coerce("open"), Ok(Value::Text("open".into())));
        assert!(status.coerce("pending").is_err());
    }

    #[test]
    fn header_lookup_matches_id_or_display_name() {
        let schema = schema();
        assert_eq!(schema.find_by_header(" AGE ").map(|c| c.id.as_str()), Some("age"));
        assert_eq!(
            schema.find_by_header("status").map(|c| c.id.as_str()),
            Some("status")
        );
        assert!(schema.find_by_header("missing").is_none());
    }
}
