//! Sort, filter and group pipeline producing the ordered row view.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ColumnDefinition, ColumnType, Row, RowId, Schema, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// The single active sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column_id: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(column_id: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(column_id: impl Into<String>) -> Self {
        Self {
            column_id: column_id.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Cycle sort state for a column: none -> asc -> desc -> none.
pub fn next_sort(current: Option<&SortSpec>, column_id: &str) -> Option<SortSpec> {
    match current {
        Some(SortSpec {
            column_id: current_col,
            direction,
        }) if current_col == column_id => match direction {
            SortDirection::Ascending => Some(SortSpec::desc(column_id)),
            SortDirection::Descending => None,
        },
        _ => Some(SortSpec::asc(column_id)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPredicate {
    Contains,
    NotContains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    IsEmpty,
    IsNotEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub column_id: String,
    pub predicate: FilterPredicate,
    #[serde(default)]
    pub value: String,
}

impl FilterSpec {
    pub fn new(
        column_id: impl Into<String>,
        predicate: FilterPredicate,
        value: impl Into<String>,
    ) -> Self {
        Self {
            column_id: column_id.into(),
            predicate,
            value: value.into(),
        }
    }

    fn matches(&self, column: &ColumnDefinition, value: &Value) -> bool {
        use FilterPredicate::*;

        let text = value.as_display_string();

        match self.predicate {
            IsEmpty => value.is_null() || text.trim().is_empty(),
            IsNotEmpty => !(value.is_null() || text.trim().is_empty()),
            Contains => contains_ignore_case(&text, &self.value),
            NotContains => !contains_ignore_case(&text, &self.value),
            StartsWith => text.to_lowercase().starts_with(&self.value.to_lowercase()),
            EndsWith => text.to_lowercase().ends_with(&self.value.to_lowercase()),
            Equals => self.compare(column, value, &text) == Some(Ordering::Equal),
            NotEquals => self.compare(column, value, &text) != Some(Ordering::Equal),
            GreaterThan => self.compare(column, value, &text) == Some(Ordering::Greater),
            LessThan => self.compare(column, value, &text) == Some(Ordering::Less),
        }
    }

    /// Orders the cell against the filter operand. Typed when the operand coerces
    /// to the column type, textual otherwise. Nulls only compare with an empty operand.
    fn compare(&self, column: &ColumnDefinition, value: &Value, text: &str) -> Option<Ordering> {
        if value.is_null() {
            return self.value.trim().is_empty().then_some(Ordering::Equal);
        }

        match column.coerce(&self.value) {
            Ok(operand) if !operand.is_null() && column.column_type != ColumnType::Text => {
                Some(value.cmp(&operand))
            }
            _ => Some(text.cmp(self.value.as_str())),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Everything that determines which rows are shown and in what order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySpec {
    pub sort: Option<SortSpec>,
    pub filters: Vec<FilterSpec>,
    pub grouping: Vec<String>,
    pub global_search: String,
}

impl QuerySpec {
    pub fn is_noop(&self) -> bool {
        self.sort.is_none()
            && self.filters.is_empty()
            && self.grouping.is_empty()
            && self.global_search.trim().is_empty()
    }
}

/// Path of group values from the outermost grouping column inward.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    pub fn new(path: Vec<String>) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &[String] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    fn child(&self, value: String) -> Self {
        let mut path = self.0.clone();
        path.push(value);
        Self(path)
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" / "))
    }
}

/// One render-ready row of the view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEntry {
    Data {
        /// Index into the caller's row slice.
        row_index: usize,
        row_id: RowId,
        depth: usize,
        /// Innermost enclosing group, if grouped.
        group: Option<GroupKey>,
    },
    GroupHeader {
        key: GroupKey,
        column_id: String,
        value: Value,
        count: usize,
        depth: usize,
        expanded: bool,
    },
}

impl ViewEntry {
    pub fn row_id(&self) -> Option<&RowId> {
        match self {
            ViewEntry::Data { row_id, .. } => Some(row_id),
            ViewEntry::GroupHeader { .. } => None,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            ViewEntry::Data { depth, .. } | ViewEntry::GroupHeader { depth, .. } => *depth,
        }
    }

    pub fn is_group_header(&self) -> bool {
        matches!(self, ViewEntry::GroupHeader { .. })
    }
}

/// Derived sequence of data and group-header rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedRowView {
    entries: Vec<ViewEntry>,
}

impl OrderedRowView {
    pub fn entries(&self) -> &[ViewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, ix: usize) -> Option<&ViewEntry> {
        self.entries.get(ix)
    }

    /// Identities of the data rows, in view order.
    pub fn data_row_ids(&self) -> Vec<RowId> {
        self.entries
            .iter()
            .filter_map(|e| e.row_id().cloned())
            .collect()
    }

    /// Caller row indices of the data rows, in view order.
    pub fn data_row_indices(&self) -> Vec<usize> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                ViewEntry::Data { row_index, .. } => Some(*row_index),
                ViewEntry::GroupHeader { .. } => None,
            })
            .collect()
    }

    pub fn data_row_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_group_header()).count()
    }

    /// View position of a data row.
    pub fn position_of(&self, row_id: &RowId) -> Option<usize> {
        self.entries.iter().position(|e| e.row_id() == Some(row_id))
    }

    pub fn group_of(&self, row_id: &RowId) -> Option<&GroupKey> {
        self.entries.iter().find_map(|e| match e {
            ViewEntry::Data {
                row_id: id, group, ..
            } if id == row_id => group.as_ref(),
            _ => None,
        })
    }
}

/// Per-group expanded flags. Groups are expanded unless collapsed here.
#[derive(Debug, Clone, Default)]
pub struct GroupState {
    grouping: Vec<String>,
    collapsed: HashSet<GroupKey>,
    revision: u64,
}

impl GroupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the active grouping columns; a change re-expands every group.
    pub fn sync_grouping(&mut self, grouping: &[String]) {
        if self.grouping != grouping {
            self.grouping = grouping.to_vec();
            self.collapsed.clear();
            self.revision += 1;
        }
    }

    pub fn is_expanded(&self, key: &GroupKey) -> bool {
        !self.collapsed.contains(key)
    }

    pub fn set_expanded(&mut self, key: &GroupKey, expanded: bool) {
        let changed = if expanded {
            self.collapsed.remove(key)
        } else {
            self.collapsed.insert(key.clone())
        };
        if changed {
            self.revision += 1;
        }
    }

    /// Flips a group. Returns the new expanded flag.
    pub fn toggle(&mut self, key: &GroupKey) -> bool {
        let expanded = !self.is_expanded(key);
        self.set_expanded(key, expanded);
        expanded
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// Pre-computed sort key so the comparator does not re-render values.
#[derive(Debug)]
enum SortKey {
    Null,
    Number(f64),
    Text(String),
}

impl SortKey {
    fn of(value: &Value, numeric: bool) -> Self {
        if value.is_null() {
            return SortKey::Null;
        }

        let text = value.as_display_string();
        if numeric
            && let Some(n) = value.as_f64().or_else(|| text.trim().parse::<f64>().ok())
        {
            return SortKey::Number(n);
        }
        SortKey::Text(text)
    }
}

fn compare_keys(a: &SortKey, b: &SortKey, direction: SortDirection) -> Ordering {
    let ordering = match (a, b) {
        // Nulls last in both directions
        (SortKey::Null, SortKey::Null) => return Ordering::Equal,
        (SortKey::Null, _) => return Ordering::Greater,
        (_, SortKey::Null) => return Ordering::Less,

        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
    };

    match direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

/// Runs filter, search, sort and grouping over `rows`.
///
/// Unknown column ids are ignored wherever they appear. Later rows
/// repeating an earlier identity are dropped.
pub fn apply(
    rows: &[Row],
    schema: &Schema,
    spec: &QuerySpec,
    groups: &GroupState,
) -> OrderedRowView {
    let filters: Vec<(&FilterSpec, &ColumnDefinition)> = spec
        .filters
        .iter()
        .filter_map(|f| match schema.get(&f.column_id) {
            Some(col) => Some((f, col)),
            None => {
                log::debug!("Ignoring filter on unknown column '{}'", f.column_id);
                None
            }
        })
        .collect();

    let search = spec.global_search.trim().to_lowercase();

    let mut seen = HashSet::with_capacity(rows.len());
    let mut indices: Vec<usize> = Vec::with_capacity(rows.len());

    for (ix, row) in rows.iter().enumerate() {
        if !seen.insert(&row.id) {
            log::warn!("Duplicate row identity {} hidden", row.id);
            continue;
        }

        let passes_filters = filters
            .iter()
            .all(|(filter, col)| filter.matches(col, row.get(&col.id)));

        if passes_filters && (search.is_empty() || matches_search(row, schema, &search)) {
            indices.push(ix);
        }
    }

    if let Some(sort) = &spec.sort {
        match schema.get(&sort.column_id) {
            Some(col) => {
                let numeric = col.column_type.is_numeric();
                let keys: Vec<SortKey> = rows
                    .iter()
                    .map(|r| SortKey::of(r.get(&col.id), numeric))
                    .collect();

                // slice::sort_by is stable: equal keys keep input order
                indices.sort_by(|&a, &b| compare_keys(&keys[a], &keys[b], sort.direction));
            }
            None => log::debug!("Ignoring sort on unknown column '{}'", sort.column_id),
        }
    }

    let grouping: Vec<&ColumnDefinition> = spec
        .grouping
        .iter()
        .filter_map(|id| {
            let col = schema.get(id);
            if col.is_none() {
                log::debug!("Ignoring grouping on unknown column '{}'", id);
            }
            col
        })
        .collect();

    let mut entries = Vec::with_capacity(indices.len());
    emit_level(
        rows,
        &indices,
        &grouping,
        0,
        &GroupKey::default(),
        groups,
        &mut entries,
    );

    OrderedRowView { entries }
}

fn matches_search(row: &Row, schema: &Schema, needle: &str) -> bool {
    row.id.to_string().to_lowercase().contains(needle)
        || schema.columns().iter().any(|col| {
            row.get(&col.id)
                .as_display_string()
                .to_lowercase()
                .contains(needle)
        })
}

fn emit_level(
    rows: &[Row],
    indices: &[usize],
    grouping: &[&ColumnDefinition],
    level: usize,
    parent: &GroupKey,
    groups: &GroupState,
    out: &mut Vec<ViewEntry>,
) {
    let Some(column) = grouping.get(level) else {
        let group = (level > 0).then(|| parent.clone());
        out.extend(indices.iter().map(|&ix| ViewEntry::Data {
            row_index: ix,
            row_id: rows[ix].id.clone(),
            depth: level,
            group: group.clone(),
        }));
        return;
    };

    // First-appearance order keeps groups aligned with the active sort
    let mut buckets: IndexMap<String, Vec<usize>> = IndexMap::new();
    for &ix in indices {
        let label = rows[ix].get(&column.id).as_display_string();
        buckets.entry(label).or_default().push(ix);
    }

    for (label, members) in buckets {
        let key = parent.child(label);
        let expanded = groups.is_expanded(&key);

        out.push(ViewEntry::GroupHeader {
            key: key.clone(),
            column_id: column.id.clone(),
            value: rows[members[0]].get(&column.id).clone(),
            count: members.len(),
            depth: level,
            expanded,
        });

        if expanded {
            emit_level(rows, &members, grouping, level + 1, &key, groups, out);
        }
    }
}

struct CachedView {
    rows_revision: u64,
    schema: Schema,
    spec: QuerySpec,
    groups_revision: u64,
    view: Arc<OrderedRowView>,
}

/// Memoizes [`apply`] on (rows revision, schema, spec, group state).
#[derive(Default)]
pub struct QueryPipeline {
    cached: Option<CachedView>,
}

impl QueryPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached view when nothing changed since the last call.
    ///
    /// `rows_revision` must change whenever the caller replaces the rows.
    pub fn view(
        &mut self,
        rows: &[Row],
        rows_revision: u64,
        schema: &Schema,
        spec: &QuerySpec,
        groups: &GroupState,
    ) -> Arc<OrderedRowView> {
        if let Some(cached) = &self.cached
            && cached.rows_revision == rows_revision
            && cached.groups_revision == groups.revision()
            && cached.spec == *spec
            && cached.schema == *schema
        {
            return cached.view.clone();
        }

        let view = Arc::new(apply(rows, schema, spec, groups));
        log::debug!(
            "Rebuilt row view: {} entries from {} rows",
            view.len(),
            rows.len()
        );

        self.cached = Some(CachedView {
            rows_revision,
            schema: schema.clone(),
            spec: spec.clone(),
            groups_revision: groups.revision(),
            view: view.clone(),
        });
        view
    }
}
