//! Row drag-reorder gesture.
//!
//! `Idle -> Pending -> Dragging -> {Dropped | Cancelled}`, driven by raw pointer
//! events on a row's drag handle. Hit-testing only needs the materialized window;
//! the drop itself is resolved against the whole view.

use crate::focus::CellEdit;
use crate::query::{OrderedRowView, ViewEntry};
use crate::virtualizer::Virtualizer;
use crate::{Row, RowId, Schema};

/// Pointer position in body viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// An active drag.
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub active_row_id: RowId,
    pub origin: Point,
    /// Pointer displacement from `origin`.
    pub pointer_offset: Point,
    pub current_over_row_id: Option<RowId>,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    Pending { row_id: RowId, origin: Point },
    Dragging(DragState),
}

/// How a gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    /// No gesture was in progress.
    None,
    /// Released before the activation distance.
    Click(RowId),
    Cancelled,
    Dropped { active_id: RowId, over_id: RowId },
}

#[derive(Debug, Clone)]
pub struct DragEngine {
    gesture: Gesture,
    activation_distance: f32,
}

impl DragEngine {
    pub fn new(activation_distance: f32) -> Self {
        Self {
            gesture: Gesture::Idle,
            activation_distance: activation_distance.max(0.0),
        }
    }

    /// Pending or dragging.
    pub fn is_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging(_))
    }

    pub fn state(&self) -> Option<&DragState> {
        match &self.gesture {
            Gesture::Dragging(state) => Some(state),
            _ => None,
        }
    }

    pub fn active_row_id(&self) -> Option<&RowId> {
        match &self.gesture {
            Gesture::Idle => None,
            Gesture::Pending { row_id, .. } => Some(row_id),
            Gesture::Dragging(state) => Some(&state.active_row_id),
        }
    }

    /// Press on a row's drag handle. Ignored while a gesture holds the pointer.
    pub fn pointer_down(&mut self, row_id: RowId, point: Point) -> bool {
        if self.is_active() {
            log::debug!("Ignoring pointer down on row {} during active gesture", row_id);
            return false;
        }

        self.gesture = Gesture::Pending {
            row_id,
            origin: point,
        };
        true
    }

    /// Returns true if the drag state changed.
    pub fn pointer_move(
        &mut self,
        point: Point,
        virtualizer: &Virtualizer,
        view: &OrderedRowView,
    ) -> bool {
        match &mut self.gesture {
            Gesture::Idle => false,
            Gesture::Pending { row_id, origin } => {
                if point.distance(*origin) <= self.activation_distance {
                    return false;
                }

                let origin = *origin;
                let active_row_id = row_id.clone();
                log::debug!("Drag started on row {}", active_row_id);

                self.gesture = Gesture::Dragging(DragState {
                    active_row_id,
                    origin,
                    pointer_offset: Point::new(point.x - origin.x, point.y - origin.y),
                    current_over_row_id: resolve_over(virtualizer, view, point.y),
                });
                true
            }
            Gesture::Dragging(state) => {
                let over = resolve_over(virtualizer, view, point.y);
                let offset = Point::new(point.x - state.origin.x, point.y - state.origin.y);
                let changed = over != state.current_over_row_id || offset != state.pointer_offset;

                state.current_over_row_id = over;
                state.pointer_offset = offset;
                changed
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        point: Point,
        virtualizer: &Virtualizer,
        view: &OrderedRowView,
    ) -> DragOutcome {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => DragOutcome::None,
            Gesture::Pending { row_id, .. } => DragOutcome::Click(row_id),
            Gesture::Dragging(state) => {
                match resolve_over(virtualizer, view, point.y) {
                    Some(over_id) => DragOutcome::Dropped {
                        active_id: state.active_row_id,
                        over_id,
                    },
                    // Released outside any row
                    None => {
                        log::debug!("Drag of row {} released without target", state.active_row_id);
                        DragOutcome::Cancelled
                    }
                }
            }
        }
    }

    /// Escape or lost pointer capture. Returns true if a gesture was cancelled.
    pub fn cancel(&mut self) -> bool {
        let was_active = self.is_active();
        self.gesture = Gesture::Idle;
        was_active
    }

    /// Cancels the gesture when its row left the view. Returns true if cancelled.
    pub fn retain_in(&mut self, view: &OrderedRowView) -> bool {
        let stale = self
            .active_row_id()
            .is_some_and(|id| view.position_of(id).is_none());

        if stale {
            log::warn!("Dragged row vanished from the view, cancelling drag");
            self.gesture = Gesture::Idle;
        }
        stale
    }
}

/// Data row under viewport coordinate `y`, among materialized rows only.
///
/// A group header resolves to the first data row of the group it starts.
pub fn resolve_over(virtualizer: &Virtualizer, view: &OrderedRowView, y: f32) -> Option<RowId> {
    let ix = virtualizer.hit_test(y)?;

    match view.get(ix)? {
        ViewEntry::Data { row_id, .. } => Some(row_id.clone()),
        ViewEntry::GroupHeader { depth, .. } => {
            let depth = *depth;
            view.entries()[ix + 1..]
                .iter()
                .take_while(|e| !(e.is_group_header() && e.depth() <= depth))
                .find_map(|e| e.row_id().cloned())
        }
    }
}

/// Single-element move: `active` goes right after `over` when moving down,
/// right before it when moving up. `None` when nothing moves.
pub fn move_row<T: Clone + PartialEq>(order: &[T], active: &T, over: &T) -> Option<Vec<T>> {
    let from = order.iter().position(|x| x == active)?;
    let to = order.iter().position(|x| x == over)?;
    if from == to {
        return None;
    }

    let mut next = order.to_vec();
    let item = next.remove(from);
    next.insert(to, item);
    Some(next)
}

/// Result of dropping one row onto another.
#[derive(Debug, Clone, PartialEq)]
pub struct Reorder {
    pub active_id: RowId,
    pub over_id: RowId,
    /// Every row identity of the caller's collection in its new order.
    pub new_order: Vec<RowId>,
    /// Grouping-column changes that move the row into the target's group.
    pub group_edits: Vec<CellEdit>,
}

/// Resolves a drop against the caller's rows and the current view.
///
/// The direction comes from view positions; the move is applied to the full
/// row order so rows hidden by filters keep their place.
pub fn plan_reorder(
    rows: &[Row],
    schema: &Schema,
    view: &OrderedRowView,
    grouping: &[String],
    active_id: &RowId,
    over_id: &RowId,
) -> Option<Reorder> {
    if active_id == over_id {
        return None;
    }

    let (Some(from), Some(to)) = (view.position_of(active_id), view.position_of(over_id)) else {
        log::debug!("Drop rows {} -> {} not in view", active_id, over_id);
        return None;
    };

    let mut order: Vec<RowId> = rows.iter().map(|r| r.id.clone()).collect();

    let from_src = order.iter().position(|id| id == active_id)?;
    let item = order.remove(from_src);
    let over_src = order.iter().position(|id| id == over_id)?;
    let insert_at = if from < to { over_src + 1 } else { over_src };
    order.insert(insert_at, item);

    let active = rows.iter().find(|r| r.id == *active_id)?;
    let over = rows.iter().find(|r| r.id == *over_id)?;

    let group_edits = grouping
        .iter()
        .filter(|column_id| schema.contains(column_id))
        .filter_map(|column_id| {
            let target = over.get(column_id);
            (active.get(column_id).as_display_string() != target.as_display_string()).then(|| {
                CellEdit {
                    row_id: active_id.clone(),
                    column_id: column_id.clone(),
                    value: target.clone(),
                }
            })
        })
        .collect();

    Some(Reorder {
        active_id: active_id.clone(),
        over_id: over_id.clone(),
        new_order: order,
        group_edits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{GroupState, QuerySpec, apply};
    use crate::virtualizer::RowHeights;
    use crate::{ColumnDefinition, ColumnType};

    fn rows() -> Vec<Row> {
        vec![
            Row::new(1).with("name", "A").with("team", "red"),
            Row::new(2).with("name", "B").with("team", "blue"),
            Row::new(3).with("name", "C").with("team", "red"),
        ]
    }

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDefinition::new("name", "Name", ColumnType::Text),
            ColumnDefinition::new("team", "Team", ColumnType::Text),
        ])
    }

    fn setup(spec: &QuerySpec) -> (Vec<Row>, OrderedRowView, Virtualizer) {
        let rows = rows();
        let view = apply(&rows, &schema(), spec, &GroupState::new());
        let mut virtualizer = Virtualizer::new(RowHeights::Uniform(40.0), 2);
        virtualizer.set_viewport_height(400.0);
        virtualizer.set_row_count(view.len());
        (rows, view, virtualizer)
    }

    #[test]
    fn move_row_direction() {
        let order = [1, 2, 3, 4];
        assert_eq!(move_row(&order, &3, &1), Some(vec![3, 1, 2, 4]));
        assert_eq!(move_row(&order, &1, &3), Some(vec![2, 3, 1, 4]));
        assert_eq!(move_row(&order, &2, &2), None);
        assert_eq!(move_row(&order, &9, &2), None);
    }

    #[test]
    fn press_without_travel_is_click() {
        let (_, view, virtualizer) = setup(&QuerySpec::default());
        let mut drag = DragEngine::new(5.0);

        assert!(drag.pointer_down(RowId::Int(2), Point::new(10.0, 50.0)));
        assert!(!drag.pointer_move(Point::new(12.0, 53.0), &virtualizer, &view));
        assert!(!drag.is_dragging());

        let outcome = drag.pointer_up(Point::new(12.0, 53.0), &virtualizer, &view);
        assert_eq!(outcome, DragOutcome::Click(RowId::Int(2)));
        assert!(!drag.is_active());
    }

    #[test]
    fn second_press_is_ignored() {
        let mut drag = DragEngine::new(5.0);
        assert!(drag.pointer_down(RowId::Int(1), Point::default()));
        assert!(!drag.pointer_down(RowId::Int(2), Point::default()));
        assert_eq!(drag.active_row_id(), Some(&RowId::Int(1)));
    }

    #[test]
    fn drag_tracks_row_under_pointer() {
        let (_, view, virtualizer) = setup(&QuerySpec::default());
        let mut drag = DragEngine::new(5.0);

        drag.pointer_down(RowId::Int(3), Point::new(10.0, 100.0));
        assert!(drag.pointer_move(Point::new(10.0, 60.0), &virtualizer, &view));

        let state = drag.state().unwrap();
        assert_eq!(state.current_over_row_id, Some(RowId::Int(2)));
        assert_eq!(state.pointer_offset, Point::new(0.0, -40.0));

        let outcome = drag.pointer_up(Point::new(10.0, 10.0), &virtualizer, &view);
        assert_eq!(
            outcome,
            DragOutcome::Dropped {
                active_id: RowId::Int(3),
                over_id: RowId::Int(1)
            }
        );
    }

    #[test]
    fn release_outside_rows_cancels() {
        let (_, view, virtualizer) = setup(&QuerySpec::default());
        let mut drag = DragEngine::new(5.0);

        drag.pointer_down(RowId::Int(1), Point::new(0.0, 10.0));
        drag.pointer_move(Point::new(0.0, 300.0), &virtualizer, &view);
        assert_eq!(drag.state().unwrap().current_over_row_id, None);

        let outcome = drag.pointer_up(Point::new(0.0, 300.0), &virtualizer, &view);
        assert_eq!(outcome, DragOutcome::Cancelled);
    }

    #[test]
    fn escape_cancels() {
        let (_, view, virtualizer) = setup(&QuerySpec::default());
        let mut drag = DragEngine::new(5.0);
        drag.pointer_down(RowId::Int(1), Point::new(0.0, 10.0));
        drag.pointer_move(Point::new(0.0, 90.0), &virtualizer, &view);

        assert!(drag.cancel());
        assert!(!drag.cancel());
        assert_eq!(
            drag.pointer_up(Point::new(0.0, 90.0), &virtualizer, &view),
            DragOutcome::None
        );
    }

    #[test]
    fn plan_moves_up_before_target() {
        let (rows, view, _) = setup(&QuerySpec::default());
        let plan = plan_reorder(&rows, &schema(), &view, &[], &RowId::Int(3), &RowId::Int(1))
            .unwrap();
        assert_eq!(
            plan.new_order,
            vec![RowId::Int(3), RowId::Int(1), RowId::Int(2)]
        );
        assert!(plan.group_edits.is_empty());

        assert!(plan_reorder(&rows, &schema(), &view, &[], &RowId::Int(2), &RowId::Int(2)).is_none());
    }

    #[test]
    fn plan_keeps_rows_hidden_by_filter() {
        let spec = QuerySpec {
            global_search: "red".to_string(),
            ..QuerySpec::default()
        };
        let (rows, view, _) = setup(&spec);

        let plan = plan_reorder(&rows, &schema(), &view, &[], &RowId::Int(1), &RowId::Int(3))
            .unwrap();
        assert_eq!(
            plan.new_order,
            vec![RowId::Int(2), RowId::Int(3), RowId::Int(1)]
        );
    }

    #[test]
    fn cross_group_drop_edits_group_column() {
        let spec = QuerySpec {
            grouping: vec!["team".to_string()],
            ..QuerySpec::default()
        };
        let (rows, view, _) = setup(&spec);

        let plan = plan_reorder(
            &rows,
            &schema(),
            &view,
            &spec.grouping,
            &RowId::Int(2),
            &RowId::Int(1),
        )
        .unwrap();

        assert_eq!(
            plan.group_edits,
            vec![CellEdit {
                row_id: RowId::Int(2),
                column_id: "team".to_string(),
                value: "red".into(),
            }]
        );
    }

    #[test]
    fn group_header_resolves_to_first_member() {
        let spec = QuerySpec {
            grouping: vec!["team".to_string()],
            ..QuerySpec::default()
        };
        let (_, view, virtualizer) = setup(&spec);

        // [red header, 1, 3, blue header, 2]
        assert_eq!(resolve_over(&virtualizer, &view, 5.0), Some(RowId::Int(1)));
        assert_eq!(resolve_over(&virtualizer, &view, 125.0), Some(RowId::Int(2)));
    }

    #[test]
    fn retain_in_cancels_vanished_row() {
        let (_, view, _) = setup(&QuerySpec::default());
        let mut drag = DragEngine::new(5.0);
        drag.pointer_down(RowId::Int(9), Point::default());
        assert!(drag.retain_in(&view));
        assert!(!drag.is_active());
    }
}
