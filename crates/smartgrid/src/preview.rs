//! Plain-text rendering of a scene for terminal preview.

use smartgrid_core::ColumnSlot;
use smartgrid_core::scene::{RowKind, Scene, SceneCell};

/// Pixels per character cell when mapping column widths to text.
const PX_PER_CHAR: f32 = 8.0;
const MIN_CHARS: usize = 3;

pub fn render_text(scene: &Scene) -> String {
    let mut out = String::new();

    let buttons: Vec<String> = scene
        .toolbar
        .buttons
        .iter()
        .map(|b| {
            if b.enabled {
                format!("[{}]", b.label)
            } else {
                format!("({})", b.label)
            }
        })
        .collect();
    out.push_str(&format!("Search: {}  {}\n", scene.toolbar.search, buttons.join(" ")));

    let header: Vec<String> = scene
        .header
        .iter()
        .map(|cell| {
            let title = match (cell.slot, cell.all_selected) {
                (ColumnSlot::Selection, Some(true)) => "[x]".to_string(),
                (ColumnSlot::Selection, _) => "[ ]".to_string(),
                _ => match cell.sort_indicator {
                    Some(indicator) => format!("{} {}", cell.title, indicator),
                    None => cell.title.to_string(),
                },
            };
            fit(&title, chars_for(cell.width))
        })
        .collect();
    let header_line = header.join("|");
    out.push_str(header_line.trim_end());
    out.push('\n');
    out.push_str(&"-".repeat(header_line.trim_end().chars().count()));
    out.push('\n');

    for row in &scene.body.rows {
        let line = match &row.kind {
            RowKind::GroupHeader {
                label,
                count,
                expanded,
                indent,
            } => format!(
                "{}{} {} ({})",
                " ".repeat(chars_for_indent(*indent)),
                if *expanded { "v" } else { ">" },
                label,
                count
            ),
            RowKind::Data {
                indent,
                selected,
                cells,
                ..
            } => cells
                .iter()
                .enumerate()
                .map(|(ix, cell)| {
                    let width = chars_for(cell.width);
                    let text = cell_text(cell, *selected);
                    let text = if ix == first_data_cell(cells) {
                        format!("{}{}", " ".repeat(chars_for_indent(*indent)), text)
                    } else {
                        text
                    };
                    fit(&text, width)
                })
                .collect::<Vec<_>>()
                .join("|"),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out.push_str(&scene.footer.text);
    out.push('\n');
    out
}

fn cell_text(cell: &SceneCell, selected: bool) -> String {
    match cell.slot {
        ColumnSlot::Handle => "::".to_string(),
        ColumnSlot::Selection => if selected { "[x]" } else { "[ ]" }.to_string(),
        ColumnSlot::Data(_) => match &cell.content {
            Some(content) => match (content.checked, &content.badge) {
                (Some(true), _) => "[x]".to_string(),
                (Some(false), _) => "[ ]".to_string(),
                (None, Some(badge)) => badge.label.to_string(),
                (None, None) => content.text.to_string(),
            },
            None => String::new(),
        },
    }
}

fn first_data_cell(cells: &[SceneCell]) -> usize {
    cells
        .iter()
        .position(|c| matches!(c.slot, ColumnSlot::Data(_)))
        .unwrap_or(0)
}

fn chars_for(width: f32) -> usize {
    ((width / PX_PER_CHAR).floor() as usize).max(MIN_CHARS)
}

fn chars_for_indent(indent: f32) -> usize {
    (indent / PX_PER_CHAR).round() as usize
}

/// Pads or cuts `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return format!("{}{}", text, " ".repeat(width - count));
    }
    let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
    cut.push('~');
    cut
}
