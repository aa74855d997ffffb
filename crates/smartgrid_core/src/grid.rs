//! The grid controller: owns interaction state and turns input into events.
//!
//! Rows are caller-owned. The grid never edits them; it emits [`GridEvent`]s and
//! re-renders from whatever the caller passes back through [`SmartGrid::set_rows`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Density, GridConfig};
use crate::drag::{DragEngine, DragOutcome, Point, plan_reorder};
use crate::events::{GridEvent, GridInput, HitTarget};
use crate::focus::{CellFocus, CellInput, CellRef, CellSource, GridKey, Transition};
use crate::query::{
    FilterSpec, GroupKey, GroupState, OrderedRowView, QueryPipeline, QuerySpec, SortSpec,
    ViewEntry, next_sort,
};
use crate::row::{id_set, index_by_id};
use crate::scene::{Scene, SceneInput, render};
use crate::schema::{ColumnLayout, ColumnSlot};
use crate::selection::RowSelection;
use crate::virtualizer::{RowHeights, Virtualizer};
use crate::{ColumnDefinition, Row, RowId, Schema, Value};

/// Read view over the grid's rows for the focus machine.
struct GridCells<'a> {
    rows: &'a [Row],
    index: &'a HashMap<RowId, usize>,
    ids: &'a [RowId],
    columns: &'a [ColumnDefinition],
    page_rows: usize,
}

impl CellSource for GridCells<'_> {
    fn row_ids(&self) -> &[RowId] {
        self.ids
    }

    fn columns(&self) -> &[ColumnDefinition] {
        self.columns
    }

    fn value(&self, row_id: &RowId, column_id: &str) -> Option<&Value> {
        self.index.get(row_id).map(|&ix| self.rows[ix].get(column_id))
    }

    fn page_rows(&self) -> usize {
        self.page_rows
    }
}

pub struct SmartGrid {
    config: GridConfig,
    schema: Schema,
    rows: Arc<Vec<Row>>,
    rows_revision: u64,
    row_index: HashMap<RowId, usize>,

    query: QuerySpec,
    groups: GroupState,
    pipeline: QueryPipeline,
    view: Arc<OrderedRowView>,
    /// Data row ids of `view`, in order.
    nav_ids: Vec<RowId>,

    layout: ColumnLayout,
    column_widths: HashMap<String, f32>,
    viewport_width: f32,
    virtualizer: Virtualizer,

    focus: CellFocus,
    draft_rejected: bool,
    drag: DragEngine,
    selection: RowSelection,
}

impl SmartGrid {
    pub fn new(schema: Schema, config: GridConfig) -> Self {
        let virtualizer = Virtualizer::new(RowHeights::Uniform(config.row_height()), config.overscan);
        let drag = DragEngine::new(config.activation_distance);

        let mut grid = Self {
            config,
            schema,
            rows: Arc::new(Vec::new()),
            rows_revision: 0,
            row_index: HashMap::new(),
            query: QuerySpec::default(),
            groups: GroupState::new(),
            pipeline: QueryPipeline::new(),
            view: Arc::new(OrderedRowView::default()),
            nav_ids: Vec::new(),
            layout: ColumnLayout::default(),
            column_widths: HashMap::new(),
            viewport_width: 0.0,
            virtualizer,
            focus: CellFocus::new(),
            draft_rejected: false,
            drag,
            selection: RowSelection::new(),
        };

        grid.rebuild_layout();
        grid.refresh_view();
        grid
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn query(&self) -> &QuerySpec {
        &self.query
    }

    pub fn view(&self) -> &OrderedRowView {
        &self.view
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn virtualizer(&self) -> &Virtualizer {
        &self.virtualizer
    }

    pub fn focus(&self) -> &CellFocus {
        &self.focus
    }

    pub fn drag(&self) -> &DragEngine {
        &self.drag
    }

    pub fn selection(&self) -> &RowSelection {
        &self.selection
    }

    /// Replaces the row collection and drops state pointing at vanished rows.
    pub fn set_rows(&mut self, rows: Vec<Row>) -> Vec<GridEvent> {
        let (index, duplicates) = index_by_id(&rows);
        for &ix in &duplicates {
            log::warn!("Row identity {} appears more than once, hiding later copy", rows[ix].id);
        }

        self.rows = Arc::new(rows);
        self.row_index = index;
        self.rows_revision += 1;
        self.refresh_view();

        let mut events = Vec::new();
        if self.selection.retain_existing(&id_set(&self.rows)) {
            events.push(GridEvent::SelectionChanged(self.selection.ids()));
        }
        events
    }

    /// Replaces the schema. Sort, filter and grouping on removed columns become no-ops.
    pub fn set_schema(&mut self, schema: Schema) {
        self.column_widths.retain(|id, _| schema.contains(id));
        self.schema = schema;
        self.rebuild_layout();
        self.refresh_view();
    }

    /// Replaces the query. An open edit is committed first.
    pub fn set_query(&mut self, query: QuerySpec) -> Vec<GridEvent> {
        let mut events = Vec::new();
        self.blur_edit(&mut events);
        self.query = query;
        self.refresh_view();
        events
    }

    pub fn scene(&self) -> Scene {
        render(&SceneInput {
            schema: &self.schema,
            layout: &self.layout,
            rows: &self.rows,
            view: &self.view,
            virtualizer: &self.virtualizer,
            sort: self.query.sort.as_ref(),
            mode: self.focus.mode(),
            drag: self.drag.state(),
            selection: &self.selection,
            search: &self.query.global_search,
            draft_rejected: self.draft_rejected,
            max_display_len: self.config.max_display_len,
            indent_width: self.config.indent_width,
        })
    }

    /// What lies under a body-relative point.
    pub fn hit_test(&self, point: Point) -> Option<HitTarget> {
        let ix = self.virtualizer.hit_test(point.y)?;

        match self.view.get(ix)? {
            ViewEntry::GroupHeader { key, .. } => Some(HitTarget::GroupHeader(key.clone())),
            ViewEntry::Data { row_id, .. } => {
                let col = self.layout.column_at(point.x)?;
                let target = match self.layout.columns()[col].slot {
                    ColumnSlot::Handle => HitTarget::Handle(row_id.clone()),
                    ColumnSlot::Selection => HitTarget::SelectionBox(row_id.clone()),
                    ColumnSlot::Data(schema_ix) => HitTarget::Cell(CellRef {
                        row_id: row_id.clone(),
                        column_id: self.schema.columns().get(schema_ix)?.id.clone(),
                    }),
                };
                Some(target)
            }
        }
    }

    pub fn handle(&mut self, input: GridInput) -> Vec<GridEvent> {
        let mut events = Vec::new();

        match input {
            GridInput::PointerDown { point, click_count } => {
                self.pointer_down(point, click_count, &mut events);
            }
            GridInput::PointerMove(point) => {
                self.drag.pointer_move(point, &self.virtualizer, &self.view);
            }
            GridInput::PointerUp(point) => self.pointer_up(point, &mut events),
            GridInput::Key(GridKey::Escape) if self.drag.is_active() => {
                self.drag.cancel();
                log::debug!("Drag cancelled");
            }
            GridInput::Key(key) => self.focus_input(CellInput::Key(key), &mut events),
            GridInput::EditorInput(text) => self.focus_input(CellInput::Input(text), &mut events),
            GridInput::EditorBlur => self.focus_input(CellInput::Blur, &mut events),
            GridInput::Commit => self.focus_input(CellInput::Commit, &mut events),
            GridInput::Scroll(offset) => self.virtualizer.queue_scroll(offset),
            GridInput::Frame => {
                self.virtualizer.on_frame();
            }
            GridInput::Resize { width, height } => {
                self.viewport_width = width.max(0.0);
                self.virtualizer.set_viewport_height(height);
                self.rebuild_layout();
            }
            GridInput::HeaderClick(column_id) => {
                self.blur_edit(&mut events);
                self.toggle_sort(&column_id, &mut events);
            }
            GridInput::ResizeColumn { column_id, width } => {
                self.resize_column(column_id, width, &mut events);
            }
            GridInput::ToggleRowSelection(row_id) => {
                if self.row_index.contains_key(&row_id) && self.selection.toggle(row_id) {
                    events.push(GridEvent::SelectionChanged(self.selection.ids()));
                }
            }
            GridInput::ToggleSelectAll => {
                let changed = if self.selection.all_selected(&self.view) {
                    self.selection.clear()
                } else {
                    self.selection.select_all(&self.view)
                };
                if changed {
                    events.push(GridEvent::SelectionChanged(self.selection.ids()));
                }
            }
            GridInput::ClearSelection => {
                if self.selection.clear() {
                    events.push(GridEvent::SelectionChanged(Vec::new()));
                }
            }
            GridInput::ToggleGroup(key) => {
                self.blur_edit(&mut events);
                self.toggle_group(&key);
            }
            GridInput::SetFilters(filters) => {
                self.blur_edit(&mut events);
                self.set_filters(filters);
            }
            GridInput::SetGrouping(grouping) => {
                self.blur_edit(&mut events);
                self.query.grouping = grouping;
                self.refresh_view();
            }
            GridInput::SetSearch(search) => {
                self.blur_edit(&mut events);
                self.query.global_search = search;
                self.refresh_view();
            }
            GridInput::SetDensity(density) => self.set_density(density),
            GridInput::AddColumn => events.push(GridEvent::AddColumnRequested),
            GridInput::AddRow => events.push(GridEvent::AddRowRequested),
            GridInput::EditRow(row_id) => {
                if self.row_index.contains_key(&row_id) {
                    events.push(GridEvent::EditRowRequested(row_id));
                }
            }
            GridInput::DeleteSelected => {
                if !self.selection.is_empty() {
                    events.push(GridEvent::DeleteRowsRequested(self.selection.ids()));
                }
            }
        }

        events
    }

    fn pointer_down(&mut self, point: Point, click_count: u8, events: &mut Vec<GridEvent>) {
        if self.drag.is_active() {
            log::debug!("Ignoring pointer down while a drag holds the pointer");
            return;
        }

        let Some(target) = self.hit_test(point) else {
            return;
        };

        match target {
            HitTarget::Handle(row_id) => {
                if self.blur_edit(events) {
                    self.drag.pointer_down(row_id, point);
                }
            }
            HitTarget::SelectionBox(row_id) => {
                self.blur_edit(events);
                if self.selection.toggle(row_id) {
                    events.push(GridEvent::SelectionChanged(self.selection.ids()));
                }
            }
            HitTarget::GroupHeader(key) => {
                if self.blur_edit(events) {
                    self.toggle_group(&key);
                }
            }
            HitTarget::Cell(cell) if click_count >= 2 => {
                self.focus_input(CellInput::DoubleClick(cell), events);
            }
            HitTarget::Cell(cell) => self.focus_input(CellInput::Click(cell), events),
        }
    }

    fn pointer_up(&mut self, point: Point, events: &mut Vec<GridEvent>) {
        let (active_id, over_id) = match self.drag.pointer_up(point, &self.virtualizer, &self.view) {
            DragOutcome::Dropped { active_id, over_id } => (active_id, over_id),
            DragOutcome::Click(_) | DragOutcome::Cancelled | DragOutcome::None => return,
        };

        let Some(reorder) = plan_reorder(
            &self.rows,
            &self.schema,
            &self.view,
            &self.query.grouping,
            &active_id,
            &over_id,
        ) else {
            return;
        };

        log::debug!("Row {} dropped over {}", reorder.active_id, reorder.over_id);

        // Group moves change the grouping columns before the order
        events.extend(reorder.group_edits.into_iter().map(|edit| GridEvent::CellEdited {
            row_id: edit.row_id,
            column_id: edit.column_id,
            value: edit.value,
        }));
        events.push(GridEvent::RowReordered {
            active_id: reorder.active_id,
            over_id: reorder.over_id,
            new_order: reorder.new_order,
        });
    }

    fn focus_input(&mut self, input: CellInput, events: &mut Vec<GridEvent>) {
        let cells = GridCells {
            rows: &self.rows,
            index: &self.row_index,
            ids: &self.nav_ids,
            columns: self.schema.columns(),
            page_rows: self.virtualizer.page_rows(),
        };

        let transition = self.focus.handle(input, &cells);
        self.apply_transition(transition, events);
    }

    /// Commits the open edit before an input that takes focus away from it.
    ///
    /// Returns false when the draft was rejected and the editor stays open.
    fn blur_edit(&mut self, events: &mut Vec<GridEvent>) -> bool {
        if !self.focus.is_editing() {
            return true;
        }
        self.focus_input(CellInput::Blur, events);
        !self.draft_rejected
    }

    fn apply_transition(&mut self, transition: Transition, events: &mut Vec<GridEvent>) {
        self.draft_rejected = transition.rejected.is_some();

        events.extend(transition.commits.into_iter().map(|edit| GridEvent::CellEdited {
            row_id: edit.row_id,
            column_id: edit.column_id,
            value: edit.value,
        }));

        if transition.changed {
            self.reveal_focus();
        }
    }

    fn reveal_focus(&mut self) {
        let Some(cell) = self.focus.focused() else {
            return;
        };
        if let Some(ix) = self.view.position_of(&cell.row_id) {
            self.virtualizer.reveal(ix);
        }
    }

    fn toggle_sort(&mut self, column_id: &str, events: &mut Vec<GridEvent>) {
        if !self.schema.contains(column_id) {
            log::debug!("Ignoring sort on unknown column '{}'", column_id);
            return;
        }

        self.query.sort = next_sort(self.query.sort.as_ref(), column_id);
        self.refresh_view();
        events.push(GridEvent::SortChanged(self.query.sort.clone()));
    }

    /// Sets the sort directly, without cycling. An open edit is committed first.
    pub fn set_sort(&mut self, sort: Option<SortSpec>) -> Vec<GridEvent> {
        let mut events = Vec::new();
        self.blur_edit(&mut events);
        self.query.sort = sort;
        self.refresh_view();
        events
    }

    fn set_filters(&mut self, filters: Vec<FilterSpec>) {
        self.query.filters = filters;
        self.refresh_view();
    }

    fn toggle_group(&mut self, key: &GroupKey) {
        self.groups.toggle(key);
        self.refresh_view();
    }

    fn set_density(&mut self, density: Density) {
        self.config.density = density;
        self.virtualizer
            .set_heights(RowHeights::Uniform(self.config.row_height()));
    }

    fn resize_column(&mut self, column_id: String, width: f32, events: &mut Vec<GridEvent>) {
        let Some(ix) = self.layout.position_of(&column_id) else {
            return;
        };
        if !self.layout.columns()[ix].is_data() {
            return;
        }

        if let Some(applied) = self.layout.set_width(ix, width) {
            self.column_widths.insert(column_id.clone(), applied);
            events.push(GridEvent::ColumnResized {
                column_id,
                width: applied,
            });
        }
    }

    fn rebuild_layout(&mut self) {
        let mut columns = self
            .schema
            .display_columns(self.config.reorderable, self.config.selectable);

        for col in columns.iter_mut().filter(|c| c.is_data()) {
            if col.min_width <= 0.0 {
                col.min_width = self.config.min_column_width;
            }
            if col.width <= 0.0 {
                col.width = self.config.default_column_width;
            }
            if let Some(&width) = self.column_widths.get(&*col.key) {
                col.width = width.max(col.min_width);
                // Resized columns keep their width
                col.flexible = false;
            }
        }

        self.layout = ColumnLayout::new(columns);
        self.layout.fit_to(self.viewport_width);
    }

    /// Re-runs the pipeline (memoized) and reconciles state keyed on the view.
    fn refresh_view(&mut self) {
        self.groups.sync_grouping(&self.query.grouping);
        self.view = self.pipeline.view(
            &self.rows,
            self.rows_revision,
            &self.schema,
            &self.query,
            &self.groups,
        );
        self.nav_ids = self.view.data_row_ids();
        self.virtualizer.set_row_count(self.view.len());

        let cells = GridCells {
            rows: &self.rows,
            index: &self.row_index,
            ids: &self.nav_ids,
            columns: self.schema.columns(),
            page_rows: self.virtualizer.page_rows(),
        };
        if self.focus.reconcile(&cells) {
            self.draft_rejected = false;
        }

        self.drag.retain_in(&self.view);
    }
}
