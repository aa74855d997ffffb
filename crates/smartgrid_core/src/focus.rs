//! Cell focus and edit state machine.
//!
//! `Idle -> Focused(cell) -> Editing(cell, draft)`. Edit state lives inside the
//! `Editing` variant so focus always refers to the cell being edited.

use crate::cell::inline_next_value;
use crate::{CoercionError, ColumnDefinition, RowId, Value};

/// Coordinate of a cell by identity, not position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub row_id: RowId,
    pub column_id: String,
}

impl CellRef {
    pub fn new(row_id: impl Into<RowId>, column_id: impl Into<String>) -> Self {
        Self {
            row_id: row_id.into(),
            column_id: column_id.into(),
        }
    }
}

/// Keys the grid reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKey {
    Up,
    Down,
    Left,
    Right,
    Enter,
    Escape,
    Tab,
    BackTab,
    Home,
    End,
    CtrlHome,
    CtrlEnd,
    PageUp,
    PageDown,
    Backspace,
    Delete,
    Char(char),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellInput {
    Click(CellRef),
    DoubleClick(CellRef),
    Key(GridKey),
    /// The editor control replaced its text.
    Input(String),
    /// Focus left the editor control.
    Blur,
    /// Programmatic commit of the open edit.
    Commit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellMode {
    Idle,
    Focused(CellRef),
    Editing {
        cell: CellRef,
        draft: String,
        /// The whole draft is selected: the next typed character replaces it.
        select_all: bool,
    },
}

/// A committed cell value.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEdit {
    pub row_id: RowId,
    pub column_id: String,
    pub value: Value,
}

/// Result of feeding one input to the machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// Committed values in the order they happened. An implicit commit of the
    /// open edit comes before an inline toggle of the clicked cell.
    pub commits: Vec<CellEdit>,
    /// The open edit could not be committed and stays open.
    pub rejected: Option<CoercionError>,
    pub changed: bool,
}

impl Transition {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed() -> Self {
        Self {
            changed: true,
            ..Self::default()
        }
    }
}

/// Read access to the cells the machine navigates.
pub trait CellSource {
    /// Navigable rows (data rows only) in view order.
    fn row_ids(&self) -> &[RowId];

    /// Focusable data columns in display order.
    fn columns(&self) -> &[ColumnDefinition];

    fn value(&self, row_id: &RowId, column_id: &str) -> Option<&Value>;

    /// Rows moved by PageUp/PageDown.
    fn page_rows(&self) -> usize {
        10
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Up,
    Down,
    Left,
    Right,
    Next,
    Prev,
    RowStart,
    RowEnd,
    First,
    Last,
    PageUp,
    PageDown,
}

#[derive(Debug, Clone)]
pub struct CellFocus {
    mode: CellMode,
}

impl Default for CellFocus {
    fn default() -> Self {
        Self::new()
    }
}

impl CellFocus {
    pub fn new() -> Self {
        Self {
            mode: CellMode::Idle,
        }
    }

    pub fn mode(&self) -> &CellMode {
        &self.mode
    }

    pub fn focused(&self) -> Option<&CellRef> {
        match &self.mode {
            CellMode::Idle => None,
            CellMode::Focused(cell) | CellMode::Editing { cell, .. } => Some(cell),
        }
    }

    pub fn editing(&self) -> Option<(&CellRef, &str)> {
        match &self.mode {
            CellMode::Editing { cell, draft, .. } => Some((cell, draft.as_str())),
            _ => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, CellMode::Editing { .. })
    }

    pub fn clear(&mut self) {
        self.mode = CellMode::Idle;
    }

    pub fn handle(&mut self, input: CellInput, src: &impl CellSource) -> Transition {
        match input {
            CellInput::Click(cell) => self.click(cell, src),
            CellInput::DoubleClick(cell) => self.double_click(cell, src),
            CellInput::Key(key) => self.key(key, src),
            CellInput::Input(text) => self.set_draft(text),
            CellInput::Blur | CellInput::Commit => self.commit_in_place(src),
        }
    }

    /// Drops focus or edit state that points at a row or column that no longer exists.
    ///
    /// An open draft is cancelled here. Callers commit it beforehand when the
    /// row is going away through their own input.
    pub fn reconcile(&mut self, src: &impl CellSource) -> bool {
        let Some(cell) = self.focused() else {
            return false;
        };

        if cell_exists(src, cell) {
            return false;
        }

        if let Some((_, draft)) = self.editing() {
            log::warn!(
                "Cancelling edit of ({}, {}) with draft '{}': cell no longer shown",
                cell.row_id,
                cell.column_id,
                draft
            );
        } else {
            log::warn!(
                "Focused cell ({}, {}) no longer exists, resetting focus",
                cell.row_id,
                cell.column_id
            );
        }
        self.mode = CellMode::Idle;
        true
    }

    fn click(&mut self, cell: CellRef, src: &impl CellSource) -> Transition {
        if !cell_exists(src, &cell) {
            log::debug!("Ignoring click on unknown cell ({}, {})", cell.row_id, cell.column_id);
            return Transition::unchanged();
        }

        if let CellMode::Editing { cell: current, .. } = &self.mode
            && *current == cell
        {
            return Transition::unchanged();
        }

        let mut transition = self.leave_edit(src);
        if transition.rejected.is_some() {
            return transition;
        }

        let column = column_of(src, &cell.column_id);
        let inline = column.filter(|c| c.column_type.commits_inline());

        if let Some(column) = inline {
            transition.commits.extend(toggle_inline(column, &cell, src));
        }

        transition.changed |= self.focused() != Some(&cell) || !transition.commits.is_empty();
        self.mode = CellMode::Focused(cell);
        transition
    }

    fn double_click(&mut self, cell: CellRef, src: &impl CellSource) -> Transition {
        if !cell_exists(src, &cell) {
            return Transition::unchanged();
        }

        if let CellMode::Editing { cell: current, .. } = &self.mode
            && *current == cell
        {
            return Transition::unchanged();
        }

        let mut transition = self.leave_edit(src);
        if transition.rejected.is_some() {
            return transition;
        }

        self.mode = CellMode::Focused(cell.clone());
        transition.changed = true;

        if !is_inline(src, &cell.column_id) {
            self.begin_edit(cell, src);
        }
        transition
    }

    fn key(&mut self, key: GridKey, src: &impl CellSource) -> Transition {
        match &self.mode {
            CellMode::Idle => self.key_idle(key, src),
            CellMode::Focused(cell) => {
                let cell = cell.clone();
                self.key_focused(key, cell, src)
            }
            CellMode::Editing { .. } => self.key_editing(key, src),
        }
    }

    fn key_idle(&mut self, key: GridKey, src: &impl CellSource) -> Transition {
        let navigates = matches!(
            key,
            GridKey::Up
                | GridKey::Down
                | GridKey::Left
                | GridKey::Right
                | GridKey::Tab
                | GridKey::Home
                | GridKey::CtrlHome
        );

        // No focus yet: the first navigation key lands on the first cell
        match (navigates, first_cell(src)) {
            (true, Some(cell)) => {
                self.mode = CellMode::Focused(cell);
                Transition::changed()
            }
            _ => Transition::unchanged(),
        }
    }

    fn key_focused(&mut self, key: GridKey, cell: CellRef, src: &impl CellSource) -> Transition {
        let step = match key {
            GridKey::Up => Some(Step::Up),
            GridKey::Down => Some(Step::Down),
            GridKey::Left => Some(Step::Left),
            GridKey::Right => Some(Step::Right),
            GridKey::Tab => Some(Step::Next),
            GridKey::BackTab => Some(Step::Prev),
            GridKey::Home => Some(Step::RowStart),
            GridKey::End => Some(Step::RowEnd),
            GridKey::CtrlHome => Some(Step::First),
            GridKey::CtrlEnd => Some(Step::Last),
            GridKey::PageUp => Some(Step::PageUp),
            GridKey::PageDown => Some(Step::PageDown),
            _ => None,
        };

        if let Some(step) = step {
            return self.move_focus(&cell, step, src);
        }

        let inline = is_inline(src, &cell.column_id);

        match key {
            GridKey::Enter if inline => self.toggle_focused(&cell, src),
            GridKey::Char(' ') if inline => self.toggle_focused(&cell, src),
            GridKey::Enter => {
                self.begin_edit(cell, src);
                Transition::changed()
            }
            GridKey::Char(c) if !inline && !c.is_control() => {
                self.mode = CellMode::Editing {
                    cell,
                    draft: c.to_string(),
                    select_all: false,
                };
                Transition::changed()
            }
            GridKey::Backspace | GridKey::Delete if !inline => {
                self.mode = CellMode::Editing {
                    cell,
                    draft: String::new(),
                    select_all: false,
                };
                Transition::changed()
            }
            _ => Transition::unchanged(),
        }
    }

    fn key_editing(&mut self, key: GridKey, src: &impl CellSource) -> Transition {
        match key {
            GridKey::Enter => {
                let mut transition = self.commit_in_place(src);
                if transition.rejected.is_none()
                    && let Some(cell) = self.focused().cloned()
                {
                    let moved = self.move_focus(&cell, Step::Down, src);
                    transition.changed |= moved.changed;
                }
                transition
            }
            GridKey::Tab | GridKey::BackTab => {
                let mut transition = self.commit_in_place(src);
                if transition.rejected.is_none()
                    && let Some(cell) = self.focused().cloned()
                {
                    let step = if key == GridKey::Tab {
                        Step::Next
                    } else {
                        Step::Prev
                    };
                    transition.changed |= self.move_focus(&cell, step, src).changed;
                }
                transition
            }
            GridKey::Escape => {
                if let CellMode::Editing { cell, .. } = &self.mode {
                    self.mode = CellMode::Focused(cell.clone());
                }
                Transition::changed()
            }
            GridKey::Char(c) if !c.is_control() => {
                if let CellMode::Editing {
                    draft, select_all, ..
                } = &mut self.mode
                {
                    if *select_all {
                        draft.clear();
                        *select_all = false;
                    }
                    draft.push(c);
                }
                Transition::changed()
            }
            GridKey::Backspace => {
                if let CellMode::Editing {
                    draft, select_all, ..
                } = &mut self.mode
                {
                    if *select_all {
                        draft.clear();
                        *select_all = false;
                    } else {
                        draft.pop();
                    }
                }
                Transition::changed()
            }
            // Caret movement belongs to the editor control
            _ => Transition::unchanged(),
        }
    }

    fn set_draft(&mut self, text: String) -> Transition {
        match &mut self.mode {
            CellMode::Editing {
                draft, select_all, ..
            } => {
                *draft = text;
                *select_all = false;
                Transition::changed()
            }
            _ => Transition::unchanged(),
        }
    }

    fn begin_edit(&mut self, cell: CellRef, src: &impl CellSource) {
        let draft = src
            .value(&cell.row_id, &cell.column_id)
            .map(Value::edit_text)
            .unwrap_or_default();

        self.mode = CellMode::Editing {
            cell,
            draft,
            select_all: true,
        };
    }

    /// Commits the open edit and stays on the same cell. Invalid drafts stay open.
    ///
    /// A draft that coerces to the stored value closes the editor without a
    /// [`CellEdit`], so callers never see no-op writes.
    fn commit_in_place(&mut self, src: &impl CellSource) -> Transition {
        let CellMode::Editing { cell, draft, .. } = &self.mode else {
            return Transition::unchanged();
        };

        let Some(column) = column_of(src, &cell.column_id) else {
            // Column vanished under the editor; nothing to commit into
            self.mode = CellMode::Idle;
            return Transition::changed();
        };

        match column.coerce(draft) {
            Ok(value) => {
                let current = src.value(&cell.row_id, &cell.column_id);
                let commit = (current != Some(&value)).then(|| CellEdit {
                    row_id: cell.row_id.clone(),
                    column_id: cell.column_id.clone(),
                    value,
                });

                self.mode = CellMode::Focused(cell.clone());
                Transition {
                    commits: commit.into_iter().collect(),
                    rejected: None,
                    changed: true,
                }
            }
            Err(err) => {
                log::debug!("Rejected edit of ({}, {}): {}", cell.row_id, cell.column_id, err);
                Transition {
                    commits: Vec::new(),
                    rejected: Some(err),
                    changed: false,
                }
            }
        }
    }

    /// Implicitly commits an edit before focus moves elsewhere.
    fn leave_edit(&mut self, src: &impl CellSource) -> Transition {
        if self.is_editing() {
            self.commit_in_place(src)
        } else {
            Transition::unchanged()
        }
    }

    fn toggle_focused(&mut self, cell: &CellRef, src: &impl CellSource) -> Transition {
        let commit = column_of(src, &cell.column_id).and_then(|c| toggle_inline(c, cell, src));
        Transition {
            changed: commit.is_some(),
            commits: commit.into_iter().collect(),
            rejected: None,
        }
    }

    fn move_focus(&mut self, cell: &CellRef, step: Step, src: &impl CellSource) -> Transition {
        let rows = src.row_ids();
        let columns = src.columns();

        let (Some(row), Some(col)) = (
            rows.iter().position(|r| *r == cell.row_id),
            columns.iter().position(|c| c.id == cell.column_id),
        ) else {
            return Transition::unchanged();
        };

        let last_row = rows.len() - 1;
        let last_col = columns.len() - 1;
        let page = src.page_rows().max(1);

        let (row, col) = match step {
            Step::Up => (row.saturating_sub(1), col),
            Step::Down => ((row + 1).min(last_row), col),
            Step::Left => (row, col.saturating_sub(1)),
            Step::Right => (row, (col + 1).min(last_col)),
            Step::Next if col < last_col => (row, col + 1),
            Step::Next if row < last_row => (row + 1, 0),
            Step::Next => (row, col),
            Step::Prev if col > 0 => (row, col - 1),
            Step::Prev if row > 0 => (row - 1, last_col),
            Step::Prev => (row, col),
            Step::RowStart => (row, 0),
            Step::RowEnd => (row, last_col),
            Step::First => (0, 0),
            Step::Last => (last_row, last_col),
            Step::PageUp => (row.saturating_sub(page), col),
            Step::PageDown => ((row + page).min(last_row), col),
        };

        let next = CellRef {
            row_id: rows[row].clone(),
            column_id: columns[col].id.clone(),
        };

        if next == *cell {
            return Transition::unchanged();
        }

        self.mode = CellMode::Focused(next);
        Transition::changed()
    }
}

fn column_of<'a>(src: &'a impl CellSource, column_id: &str) -> Option<&'a ColumnDefinition> {
    src.columns().iter().find(|c| c.id == column_id)
}

fn is_inline(src: &impl CellSource, column_id: &str) -> bool {
    column_of(src, column_id).is_some_and(|c| c.column_type.commits_inline())
}

fn cell_exists(src: &impl CellSource, cell: &CellRef) -> bool {
    src.row_ids().contains(&cell.row_id) && column_of(src, &cell.column_id).is_some()
}

fn first_cell(src: &impl CellSource) -> Option<CellRef> {
    let row = src.row_ids().first()?;
    let col = src.columns().first()?;
    Some(CellRef {
        row_id: row.clone(),
        column_id: col.id.clone(),
    })
}

fn toggle_inline(
    column: &ColumnDefinition,
    cell: &CellRef,
    src: &impl CellSource,
) -> Option<CellEdit> {
    let current = src
        .value(&cell.row_id, &cell.column_id)
        .cloned()
        .unwrap_or(Value::Null);

    inline_next_value(column, &current).map(|value| CellEdit {
        row_id: cell.row_id.clone(),
        column_id: cell.column_id.clone(),
        value,
    })
}
