//! Row windowing: which view rows must be materialized for a scroll position.
//!
//! Uniform heights are resolved arithmetically. Variable heights keep a prefix-sum
//! table, rebuilt when the height table changes and searched by bisection.

use std::ops::RangeInclusive;

/// Row height source.
#[derive(Debug, Clone, PartialEq)]
pub enum RowHeights {
    /// Every row has the same height (density presets).
    Uniform(f32),
    /// Per-row heights, indexed like the view.
    Variable(Vec<f32>),
}

/// Pixel geometry of rows, ready for offset lookups.
#[derive(Debug, Clone, PartialEq)]
enum HeightIndex {
    Uniform { height: f32, count: usize },
    /// `prefix[i]` is the top of row `i`; `prefix[count]` is the total height.
    Prefix { prefix: Vec<f32> },
}

impl HeightIndex {
    fn build(count: usize, heights: &RowHeights) -> Self {
        match heights {
            RowHeights::Uniform(height) => HeightIndex::Uniform {
                height: height.max(1.0),
                count,
            },
            RowHeights::Variable(table) => {
                let mut prefix = Vec::with_capacity(count + 1);
                let mut sum = 0.0;
                prefix.push(sum);
                for ix in 0..count {
                    // Rows without an entry fall back to the last known height
                    let h = table
                        .get(ix)
                        .or_else(|| table.last())
                        .copied()
                        .unwrap_or(1.0)
                        .max(1.0);
                    sum += h;
                    prefix.push(sum);
                }
                HeightIndex::Prefix { prefix }
            }
        }
    }

    fn count(&self) -> usize {
        match self {
            HeightIndex::Uniform { count, .. } => *count,
            HeightIndex::Prefix { prefix } => prefix.len() - 1,
        }
    }

    fn total_height(&self) -> f32 {
        match self {
            HeightIndex::Uniform { height, count } => *height * *count as f32,
            HeightIndex::Prefix { prefix } => *prefix.last().unwrap_or(&0.0),
        }
    }

    fn offset_of(&self, ix: usize) -> f32 {
        match self {
            HeightIndex::Uniform { height, .. } => *height * ix as f32,
            HeightIndex::Prefix { prefix } => prefix[ix.min(prefix.len() - 1)],
        }
    }

    fn height_of(&self, ix: usize) -> f32 {
        match self {
            HeightIndex::Uniform { height, .. } => *height,
            HeightIndex::Prefix { prefix } => prefix[ix + 1] - prefix[ix],
        }
    }

    /// Height used to size the overscan margin.
    fn overscan_unit(&self) -> f32 {
        match self {
            HeightIndex::Uniform { height, .. } => *height,
            HeightIndex::Prefix { .. } => {
                let count = self.count();
                if count == 0 {
                    0.0
                } else {
                    self.total_height() / count as f32
                }
            }
        }
    }

    /// Largest index whose top is <= `y`. Requires `count > 0`.
    fn last_at_or_before(&self, y: f32) -> usize {
        let last = self.count() - 1;
        if y <= 0.0 {
            return 0;
        }
        match self {
            HeightIndex::Uniform { height, .. } => ((y / height).floor() as usize).min(last),
            HeightIndex::Prefix { prefix } => prefix[..=last]
                .partition_point(|&top| top <= y)
                .saturating_sub(1),
        }
    }

    /// Smallest index whose top is >= `y`, clamped to the last row. Requires `count > 0`.
    fn first_at_or_after(&self, y: f32) -> usize {
        let last = self.count() - 1;
        if y <= 0.0 {
            return 0;
        }
        match self {
            HeightIndex::Uniform { height, .. } => ((y / height).ceil() as usize).min(last),
            HeightIndex::Prefix { prefix } => prefix[..=last]
                .partition_point(|&top| top < y)
                .min(last),
        }
    }
}

/// The materialized slice of the view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VirtualWindow {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    /// Pixel top of each materialized row, starting at `start_index`.
    pub row_offsets: Vec<f32>,
    pub total_height: f32,
}

impl VirtualWindow {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.row_offsets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.row_offsets.len()
    }

    pub fn range(&self) -> Option<RangeInclusive<usize>> {
        (!self.is_empty()).then(|| self.start_index..=self.end_index)
    }

    pub fn contains(&self, ix: usize) -> bool {
        !self.is_empty() && ix >= self.start_index && ix <= self.end_index
    }

    /// Pixel top of a materialized row.
    pub fn offset_of(&self, ix: usize) -> Option<f32> {
        if !self.contains(ix) {
            return None;
        }
        self.row_offsets.get(ix - self.start_index).copied()
    }

    /// `(index, top)` pairs of the materialized rows.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.row_offsets
            .iter()
            .enumerate()
            .map(move |(i, &top)| (self.start_index + i, top))
    }
}

fn window_from(
    index: &HeightIndex,
    scroll_offset: f32,
    viewport_height: f32,
    overscan: usize,
) -> VirtualWindow {
    let count = index.count();
    if count == 0 {
        return VirtualWindow::empty();
    }

    let margin = overscan as f32 * index.overscan_unit();
    let low = scroll_offset - margin;
    let high = scroll_offset + viewport_height.max(0.0) + margin;

    let start_index = index.last_at_or_before(low);
    let end_index = index.first_at_or_after(high).max(start_index);

    let row_offsets = (start_index..=end_index)
        .map(|ix| index.offset_of(ix))
        .collect();

    VirtualWindow {
        start_index,
        end_index,
        row_offsets,
        total_height: index.total_height(),
    }
}

/// One-shot window computation.
pub fn compute_window(
    total_count: usize,
    heights: &RowHeights,
    scroll_offset: f32,
    viewport_height: f32,
    overscan: usize,
) -> VirtualWindow {
    let index = HeightIndex::build(total_count, heights);
    window_from(&index, scroll_offset, viewport_height, overscan)
}

/// Stateful windowing with per-frame scroll coalescing.
///
/// Scroll events only record the latest offset; [`Virtualizer::on_frame`]
/// recomputes at most once per rendered frame.
#[derive(Debug, Clone)]
pub struct Virtualizer {
    index: HeightIndex,
    heights: RowHeights,
    overscan: usize,
    viewport_height: f32,
    scroll_offset: f32,
    pending_scroll: Option<f32>,
    window: VirtualWindow,
}

impl Virtualizer {
    pub fn new(heights: RowHeights, overscan: usize) -> Self {
        let index = HeightIndex::build(0, &heights);
        Self {
            index,
            heights,
            overscan,
            viewport_height: 0.0,
            scroll_offset: 0.0,
            pending_scroll: None,
            window: VirtualWindow::empty(),
        }
    }

    pub fn window(&self) -> &VirtualWindow {
        &self.window
    }

    pub fn row_count(&self) -> usize {
        self.index.count()
    }

    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> f32 {
        self.viewport_height
    }

    pub fn total_height(&self) -> f32 {
        self.index.total_height()
    }

    pub fn max_scroll(&self) -> f32 {
        (self.total_height() - self.viewport_height).max(0.0)
    }

    /// Row count changed (the view was rebuilt). Rebuilds the height index.
    pub fn set_row_count(&mut self, count: usize) {
        if count != self.index.count() {
            self.index = HeightIndex::build(count, &self.heights);
            self.scroll_offset = self.scroll_offset.min(self.max_scroll());
            self.recompute();
        }
    }

    pub fn set_heights(&mut self, heights: RowHeights) {
        if heights != self.heights {
            let count = self.index.count();
            self.heights = heights;
            self.index = HeightIndex::build(count, &self.heights);
            self.scroll_offset = self.scroll_offset.min(self.max_scroll());
            self.recompute();
        }
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        if height != self.viewport_height {
            self.viewport_height = height.max(0.0);
            self.scroll_offset = self.scroll_offset.min(self.max_scroll());
            self.recompute();
        }
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        if overscan != self.overscan {
            self.overscan = overscan;
            self.recompute();
        }
    }

    /// Records a scroll event; applied on the next frame.
    pub fn queue_scroll(&mut self, offset: f32) {
        self.pending_scroll = Some(offset);
    }

    /// Applies the latest queued scroll. Returns true if the window changed.
    pub fn on_frame(&mut self) -> bool {
        match self.pending_scroll.take() {
            Some(offset) => self.scroll_to(offset),
            None => false,
        }
    }

    /// Scrolls immediately. Returns true if the window changed.
    pub fn scroll_to(&mut self, offset: f32) -> bool {
        let clamped = offset.clamp(0.0, self.max_scroll());
        if clamped == self.scroll_offset && !self.window.is_empty() {
            return false;
        }
        self.scroll_offset = clamped;

        let next = self.bounds();
        match next {
            // Same materialized range: only the scroll position moved
            Some((start, end))
                if start == self.window.start_index
                    && end == self.window.end_index
                    && !self.window.is_empty() =>
            {
                false
            }
            _ => {
                self.recompute();
                true
            }
        }
    }

    /// Minimal scroll that brings row `ix` fully into view. Returns true if it moved.
    pub fn reveal(&mut self, ix: usize) -> bool {
        if ix >= self.index.count() {
            return false;
        }

        let top = self.index.offset_of(ix);
        let bottom = top + self.index.height_of(ix);

        let target = if top < self.scroll_offset {
            top
        } else if bottom > self.scroll_offset + self.viewport_height {
            bottom - self.viewport_height
        } else {
            return false;
        };

        // `scroll_to` reports window changes; the offset can move within one window
        let before = self.scroll_offset;
        self.scroll_to(target);
        self.scroll_offset != before
    }

    /// View index of the row under content coordinate `y`.
    pub fn index_at(&self, y: f32) -> Option<usize> {
        if self.index.count() == 0 || y < 0.0 || y >= self.total_height() {
            return None;
        }
        Some(self.index.last_at_or_before(y))
    }

    /// Row under viewport coordinate `y`, restricted to the materialized window.
    pub fn hit_test(&self, viewport_y: f32) -> Option<usize> {
        let ix = self.index_at(viewport_y + self.scroll_offset)?;
        self.window.contains(ix).then_some(ix)
    }

    pub fn row_top(&self, ix: usize) -> Option<f32> {
        (ix < self.index.count()).then(|| self.index.offset_of(ix))
    }

    pub fn row_height(&self, ix: usize) -> Option<f32> {
        (ix < self.index.count()).then(|| self.index.height_of(ix))
    }

    /// Rows that fit in one viewport, at least one.
    pub fn page_rows(&self) -> usize {
        let unit = self.index.overscan_unit();
        if unit <= 0.0 {
            return 1;
        }
        ((self.viewport_height / unit).floor() as usize).max(1)
    }

    fn bounds(&self) -> Option<(usize, usize)> {
        if self.index.count() == 0 {
            return None;
        }
        let margin = self.overscan as f32 * self.index.overscan_unit();
        let start = self.index.last_at_or_before(self.scroll_offset - margin);
        let end = self
            .index
            .first_at_or_after(self.scroll_offset + self.viewport_height + margin)
            .max(start);
        Some((start, end))
    }

    fn recompute(&mut self) {
        self.window = window_from(
            &self.index,
            self.scroll_offset,
            self.viewport_height,
            self.overscan,
        );
    }
}
