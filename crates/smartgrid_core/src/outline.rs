//! Outline trees: nested rows that can be re-parented by dragging.
//!
//! The tree is stored flat with parent references and per-sibling sort indices.
//! [`project`] turns a vertical drop target plus a horizontal pointer offset into a
//! legal (depth, parent, position) triple.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::RowId;
use crate::drag::move_row;

/// Gap between sibling sort indices so inserts rarely renumber.
const SORT_INDEX_GAP: i32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub id: RowId,

    /// `None` for root-level nodes.
    pub parent_id: Option<RowId>,

    pub sort_index: i32,

    #[serde(default)]
    pub collapsed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineTree {
    nodes: Vec<OutlineNode>,
}

/// One visible node of a flattened tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode {
    pub id: RowId,
    pub parent_id: Option<RowId>,
    pub depth: usize,
    /// Position among its siblings.
    pub index: usize,
    pub has_children: bool,
    pub collapsed: bool,
}

/// Where a dragged node lands.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub depth: usize,
    pub parent_id: Option<RowId>,
    /// Sibling to insert after; `None` inserts first under `parent_id`.
    pub after_id: Option<RowId>,
}

impl OutlineTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, id: &RowId) -> Option<&OutlineNode> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    fn find_mut(&mut self, id: &RowId) -> Option<&mut OutlineNode> {
        self.nodes.iter_mut().find(|n| n.id == *id)
    }

    /// Appends a node as the last child of `parent_id`. Returns false if the id is
    /// taken or the parent does not exist.
    pub fn add(&mut self, id: impl Into<RowId>, parent_id: Option<RowId>) -> bool {
        let id = id.into();
        if self.find(&id).is_some() {
            log::warn!("Outline node {} already exists", id);
            return false;
        }
        if let Some(parent) = &parent_id
            && self.find(parent).is_none()
        {
            return false;
        }

        let sort_index = self.next_sort_index(parent_id.as_ref());
        self.nodes.push(OutlineNode {
            id,
            parent_id,
            sort_index,
            collapsed: false,
        });
        true
    }

    /// Direct children of `parent_id` (roots for `None`), in sibling order.
    pub fn children_of(&self, parent_id: Option<&RowId>) -> Vec<&OutlineNode> {
        let mut children: Vec<_> = self
            .nodes
            .iter()
            .filter(|n| n.parent_id.as_ref() == parent_id)
            .collect();

        children.sort_by_key(|n| n.sort_index);
        children
    }

    fn next_sort_index(&self, parent_id: Option<&RowId>) -> i32 {
        self.children_of(parent_id)
            .last()
            .map(|n| n.sort_index + SORT_INDEX_GAP)
            .unwrap_or(SORT_INDEX_GAP)
    }

    /// True if `new_parent_id` is `node_id` itself or one of its descendants.
    pub fn would_create_cycle(&self, node_id: &RowId, new_parent_id: Option<&RowId>) -> bool {
        let mut current = new_parent_id.cloned();

        while let Some(id) = current {
            if id == *node_id {
                return true;
            }
            current = self.find(&id).and_then(|n| n.parent_id.clone());
        }

        false
    }

    /// All nodes below `id`, at any depth.
    pub fn descendants(&self, id: &RowId) -> Vec<RowId> {
        let mut found = Vec::new();
        let mut to_visit = vec![id.clone()];

        while let Some(current) = to_visit.pop() {
            for node in self.nodes.iter().filter(|n| n.parent_id.as_ref() == Some(&current)) {
                found.push(node.id.clone());
                to_visit.push(node.id.clone());
            }
        }

        found
    }

    /// Removes a node and its subtree. Returns the removed ids.
    pub fn remove(&mut self, id: &RowId) -> Vec<RowId> {
        if self.find(id).is_none() {
            return Vec::new();
        }

        let mut removed = self.descendants(id);
        removed.push(id.clone());

        let gone: HashSet<&RowId> = removed.iter().collect();
        self.nodes.retain(|n| !gone.contains(&n.id));
        removed
    }

    pub fn toggle_collapsed(&mut self, id: &RowId) -> Option<bool> {
        let node = self.find_mut(id)?;
        node.collapsed = !node.collapsed;
        Some(node.collapsed)
    }

    /// Sort index for a node inserted after `after_id` under `parent_id`.
    ///
    /// Renumbers the siblings when the gap between two neighbours is exhausted.
    fn sort_index_between(
        &mut self,
        parent_id: Option<&RowId>,
        after_id: Option<&RowId>,
        moving: &RowId,
    ) -> Option<i32> {
        let siblings: Vec<(RowId, i32)> = self
            .children_of(parent_id)
            .into_iter()
            .filter(|n| n.id != *moving)
            .map(|n| (n.id.clone(), n.sort_index))
            .collect();

        let (prev, next) = match after_id {
            None => (None, siblings.first().map(|s| s.1)),
            Some(after) => {
                let pos = siblings.iter().position(|s| s.0 == *after)?;
                (Some(siblings[pos].1), siblings.get(pos + 1).map(|s| s.1))
            }
        };

        let candidate = match (prev, next) {
            (None, None) => SORT_INDEX_GAP,
            (None, Some(next)) => next - SORT_INDEX_GAP,
            (Some(prev), None) => prev + SORT_INDEX_GAP,
            (Some(prev), Some(next)) if next - prev > 1 => prev + (next - prev) / 2,
            (Some(_), Some(_)) => {
                self.renumber(&siblings);
                return self.sort_index_between(parent_id, after_id, moving);
            }
        };

        Some(candidate)
    }

    fn renumber(&mut self, siblings: &[(RowId, i32)]) {
        log::debug!("Renumbering {} outline siblings", siblings.len());
        for (i, (id, _)) in siblings.iter().enumerate() {
            if let Some(node) = self.find_mut(id) {
                node.sort_index = (i as i32 + 1) * SORT_INDEX_GAP;
            }
        }
    }

    /// Moves a node under `new_parent_id`, right after `after_id`.
    ///
    /// Returns false for unknown nodes, cycles and inserting after itself.
    pub fn move_node_to_position(
        &mut self,
        node_id: &RowId,
        new_parent_id: Option<&RowId>,
        after_id: Option<&RowId>,
    ) -> bool {
        if self.find(node_id).is_none() || self.would_create_cycle(node_id, new_parent_id) {
            return false;
        }

        if after_id == Some(node_id) {
            return false;
        }

        let Some(sort_index) = self.sort_index_between(new_parent_id, after_id, node_id) else {
            return false;
        };

        match self.find_mut(node_id) {
            Some(node) => {
                node.parent_id = new_parent_id.cloned();
                node.sort_index = sort_index;
                true
            }
            None => false,
        }
    }

    pub fn apply_projection(&mut self, node_id: &RowId, projection: &Projection) -> bool {
        self.move_node_to_position(
            node_id,
            projection.parent_id.as_ref(),
            projection.after_id.as_ref(),
        )
    }

    /// Depth-first visible order; children of collapsed nodes are skipped.
    pub fn flatten(&self) -> Vec<FlatNode> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.flatten_into(None, 0, &mut out);
        out
    }

    fn flatten_into(&self, parent_id: Option<&RowId>, depth: usize, out: &mut Vec<FlatNode>) {
        for (index, node) in self.children_of(parent_id).into_iter().enumerate() {
            let has_children = self.nodes.iter().any(|n| n.parent_id.as_ref() == Some(&node.id));
            out.push(FlatNode {
                id: node.id.clone(),
                parent_id: node.parent_id.clone(),
                depth,
                index,
                has_children,
                collapsed: node.collapsed,
            });

            if !node.collapsed {
                self.flatten_into(Some(&node.id), depth + 1, out);
            }
        }
    }
}

/// Projects a drop of `active_id` over `over_id` with horizontal displacement `offset_x`.
///
/// The depth moves by `offset_x / indent_width` rounded half away from zero, then
/// clamps to `[next.depth, previous.depth + 1]`. The active node's descendants are
/// not candidates, so a node can never land inside its own subtree.
pub fn project(
    flat: &[FlatNode],
    active_id: &RowId,
    over_id: &RowId,
    offset_x: f32,
    indent_width: f32,
) -> Option<Projection> {
    let active = flat.iter().find(|n| n.id == *active_id)?;

    let hidden = descendants_in(flat, active_id);
    let items: Vec<&FlatNode> = flat.iter().filter(|n| !hidden.contains(&n.id)).collect();

    let ids: Vec<&RowId> = items.iter().map(|&n| &n.id).collect();
    let over_index = ids.iter().position(|id| *id == over_id)?;

    let moved: Vec<&FlatNode> = match move_row(&ids, &active_id, &over_id) {
        Some(order) => order
            .into_iter()
            .filter_map(|id| items.iter().find(|n| n.id == *id).copied())
            .collect(),
        None => items.clone(),
    };

    let previous = over_index.checked_sub(1).and_then(|i| moved.get(i)).copied();
    let next = moved.get(over_index + 1).copied();

    let steps = if indent_width > 0.0 {
        (offset_x / indent_width).round() as i64
    } else {
        0
    };
    let projected = (active.depth as i64 + steps).max(0) as usize;

    let max_depth = previous.map(|p| p.depth + 1).unwrap_or(0);
    let min_depth = next.map(|n| n.depth).unwrap_or(0).min(max_depth);
    let depth = projected.clamp(min_depth, max_depth);

    let parent_id = resolve_parent(&moved[..over_index], previous, depth);
    let after_id = moved[..over_index]
        .iter()
        .rev()
        .take_while(|n| n.depth >= depth)
        .find(|n| n.depth == depth)
        .map(|n| n.id.clone());

    Some(Projection {
        depth,
        parent_id,
        after_id,
    })
}

fn resolve_parent(before: &[&FlatNode], previous: Option<&FlatNode>, depth: usize) -> Option<RowId> {
    let previous = previous?;
    if depth == 0 {
        return None;
    }
    if depth == previous.depth {
        return previous.parent_id.clone();
    }
    if depth > previous.depth {
        return Some(previous.id.clone());
    }

    // Walk back to the nearest sibling at the projected depth
    before
        .iter()
        .rev()
        .find(|n| n.depth == depth)
        .and_then(|n| n.parent_id.clone())
}

fn descendants_in(flat: &[FlatNode], id: &RowId) -> HashSet<RowId> {
    let mut out = HashSet::new();
    let Some(start) = flat.iter().position(|n| n.id == *id) else {
        return out;
    };

    let depth = flat[start].depth;
    for node in &flat[start + 1..] {
        if node.depth <= depth {
            break;
        }
        out.insert(node.id.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> RowId {
        RowId::from(s)
    }

    /// a
    ///   a1
    ///   a2
    /// b
    /// c
    fn tree() -> OutlineTree {
        let mut tree = OutlineTree::new();
        tree.add("a", None);
        tree.add("a1", Some(id("a")));
        tree.add("a2", Some(id("a")));
        tree.add("b", None);
        tree.add("c", None);
        tree
    }

    fn order(tree: &OutlineTree) -> Vec<(String, usize)> {
        tree.flatten()
            .into_iter()
            .map(|n| (n.id.to_string(), n.depth))
            .collect()
    }

    #[test]
    fn flatten_is_depth_first() {
        let tree = tree();
        assert_eq!(
            order(&tree),
            vec![
                ("a".into(), 0),
                ("a1".into(), 1),
                ("a2".into(), 1),
                ("b".into(), 0),
                ("c".into(), 0)
            ]
        );

        let flat = tree.flatten();
        assert!(flat[0].has_children);
        assert_eq!(flat[2].index, 1);
    }

    #[test]
    fn collapsed_children_are_hidden() {
        let mut tree = tree();
        assert_eq!(tree.toggle_collapsed(&id("a")), Some(true));
        assert_eq!(tree.flatten().len(), 3);
    }

    #[test]
    fn cycle_detection() {
        let tree = tree();
        assert!(tree.would_create_cycle(&id("a"), Some(&id("a1"))));
        assert!(tree.would_create_cycle(&id("a"), Some(&id("a"))));
        assert!(!tree.would_create_cycle(&id("a1"), Some(&id("b"))));
        assert!(!tree.would_create_cycle(&id("a"), None));
    }

    #[test]
    fn move_into_own_subtree_is_rejected() {
        let mut tree = tree();
        assert!(!tree.move_node_to_position(&id("a"), Some(&id("a2")), None));
        assert!(!tree.move_node_to_position(&id("b"), None, Some(&id("b"))));
    }

    #[test]
    fn move_to_position_orders_siblings() {
        let mut tree = tree();
        assert!(tree.move_node_to_position(&id("c"), None, None));
        assert!(tree.move_node_to_position(&id("b"), Some(&id("a")), Some(&id("a1"))));

        assert_eq!(
            order(&tree),
            vec![
                ("c".into(), 0),
                ("a".into(), 0),
                ("a1".into(), 1),
                ("b".into(), 1),
                ("a2".into(), 1)
            ]
        );
    }

    #[test]
    fn dense_siblings_are_renumbered() {
        let mut tree = OutlineTree::new();
        tree.add("x", None);
        tree.add("y", None);
        tree.add("z", None);
        for _ in 0..12 {
            assert!(tree.move_node_to_position(&id("z"), None, Some(&id("x"))));
            assert!(tree.move_node_to_position(&id("y"), None, Some(&id("x"))));
        }
        assert_eq!(
            order(&tree),
            vec![("x".into(), 0), ("y".into(), 0), ("z".into(), 0)]
        );
    }

    #[test]
    fn remove_drops_subtree() {
        let mut tree = tree();
        let mut removed = tree.remove(&id("a"));
        removed.sort();
        assert_eq!(removed, vec![id("a"), id("a1"), id("a2")]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn dragging_right_nests_under_row_above() {
        let tree = tree();
        let flat = tree.flatten();

        // b dragged one indent to the right while hovering itself
        let p = project(&flat, &id("b"), &id("b"), 24.0, 24.0).unwrap();
        assert_eq!(p.depth, 1);
        assert_eq!(p.parent_id, Some(id("a")));
        assert_eq!(p.after_id, Some(id("a2")));

        // Far right still clamps to previous.depth + 1
        let p = project(&flat, &id("b"), &id("b"), 200.0, 24.0).unwrap();
        assert_eq!(p.depth, 2);
        assert_eq!(p.parent_id, Some(id("a2")));
        assert_eq!(p.after_id, None);
    }

    #[test]
    fn dragging_left_promotes_to_grandparent() {
        let tree = tree();
        let flat = tree.flatten();

        let p = project(&flat, &id("a2"), &id("a2"), -30.0, 24.0).unwrap();
        assert_eq!(p.depth, 0);
        assert_eq!(p.parent_id, None);
        assert_eq!(p.after_id, Some(id("a")));
    }

    #[test]
    fn depth_is_clamped_by_next_row() {
        let tree = tree();
        let flat = tree.flatten();

        // a1 cannot leave the middle of a's children
        let p = project(&flat, &id("a1"), &id("a1"), -48.0, 24.0).unwrap();
        assert_eq!(p.depth, 1);
        assert_eq!(p.parent_id, Some(id("a")));
        assert_eq!(p.after_id, None);
    }

    #[test]
    fn half_step_rounds_away_from_zero() {
        let tree = tree();
        let flat = tree.flatten();
        let p = project(&flat, &id("b"), &id("b"), 12.0, 24.0).unwrap();
        assert_eq!(p.depth, 1);
        let p = project(&flat, &id("b"), &id("b"), 11.9, 24.0).unwrap();
        assert_eq!(p.depth, 0);
    }

    #[test]
    fn node_cannot_nest_in_own_subtree() {
        let tree = tree();
        let flat = tree.flatten();

        // a's children are not candidates, so hovering a1 is impossible
        assert!(project(&flat, &id("a"), &id("a1"), 100.0, 24.0).is_none());

        // Dropping a after b and dragging right nests it under b, never under a child
        let p = project(&flat, &id("a"), &id("b"), 100.0, 24.0).unwrap();
        assert_eq!(p.parent_id, Some(id("b")));

        let mut moved = tree.clone();
        assert!(moved.apply_projection(&id("a"), &p));
        assert_eq!(
            order(&moved),
            vec![
                ("b".into(), 0),
                ("a".into(), 1),
                ("a1".into(), 2),
                ("a2".into(), 2),
                ("c".into(), 0)
            ]
        );
    }

    #[test]
    fn projected_move_between_roots() {
        let mut tree = tree();
        let flat = tree.flatten();

        // c dragged up over a with no horizontal travel
        let p = project(&flat, &id("c"), &id("a"), 0.0, 24.0).unwrap();
        assert_eq!(p.depth, 0);
        assert_eq!(p.after_id, None);

        assert!(tree.apply_projection(&id("c"), &p));
        assert_eq!(order(&tree)[0], ("c".into(), 0));
    }
}
