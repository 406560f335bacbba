use std::io;

use crossterm::tty::IsTty;
use serde_json::{Map, Value};

use crate::application::{ProjectedRow, Projection};

const SEPARATOR: &str = " | ";
const RULE_SEPARATOR: &str = "-+-";

/// Width to truncate table lines to, when stdout is a terminal
pub fn terminal_width() -> Option<usize> {
    if !io::stdout().is_tty() {
        return None;
    }
    crossterm::terminal::size().ok().map(|(cols, _)| cols as usize)
}

/// Aligned table with a rule under the header.
///
/// Separator rows render as another rule; rows of empty cells stay rows.
pub fn render_table(projection: &Projection, max_width: Option<usize>) -> String {
    let headers = projection.headers();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &projection.rows {
        if let ProjectedRow::Cells(cells) = row {
            for (width, cell) in widths.iter_mut().zip(cells) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let rule = widths
        .iter()
        .map(|w| "-".repeat(*w))
        .collect::<Vec<_>>()
        .join(RULE_SEPARATOR);

    let mut lines = vec![format_line(&headers, &widths), rule.clone()];
    for row in &projection.rows {
        match row {
            ProjectedRow::Cells(cells) => lines.push(format_line(cells, &widths)),
            ProjectedRow::Separator => lines.push(rule.clone()),
        }
    }

    let mut out = String::new();
    for line in lines {
        match max_width {
            Some(max) => out.extend(line.chars().take(max)),
            None => out.push_str(&line),
        }
        out.push('\n');
    }
    out
}

fn format_line<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
        .trim_end()
        .to_string()
}

/// One JSON object per row, keys in column order; separators are dropped
pub fn to_json(projection: &Projection) -> Value {
    let headers = projection.headers();
    let rows = projection
        .rows
        .iter()
        .filter_map(|row| match row {
            ProjectedRow::Cells(cells) => Some(cells),
            ProjectedRow::Separator => None,
        })
        .map(|cells| {
            let object: Map<String, Value> = headers
                .iter()
                .zip(cells)
                .map(|(header, cell)| (header.to_string(), Value::String(cell.clone())))
                .collect();
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}
