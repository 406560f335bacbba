use regex::Regex;
use tracing::warn;

use crate::domain::{Column, ColumnSet, DeviceRow, SizeFormat};

/// Pattern filter over devices or rendered rows.
///
/// Patterns are OR-ed into a single alternation. With no patterns every row
/// matches, so `invert` alone removes everything.
#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    pattern: Option<Regex>,
    invert: bool,
    name_only: bool,
}

impl RowFilter {
    pub fn new<S: AsRef<str>>(patterns: &[S], invert: bool, name_only: bool) -> Result<Self, regex::Error> {
        let pattern = if patterns.is_empty() {
            None
        } else {
            let alternation = patterns
                .iter()
                .map(|p| format!("(?:{})", p.as_ref()))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation)?)
        };
        Ok(Self {
            pattern,
            invert,
            name_only,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        let hit = self.pattern.as_ref().map_or(true, |re| re.is_match(text));
        hit != self.invert
    }

    /// Candidate check on the kernel name, before anything is read for the device
    pub fn keeps_device(&self, name: &str) -> bool {
        !self.name_only || self.is_match(name)
    }

    /// Check on the rendered text of the selected cells
    pub fn keeps_row(&self, row: &DeviceRow, columns: &ColumnSet, sizes: &SizeFormat) -> bool {
        self.name_only || self.is_match(&row.cells(columns, sizes).join(" "))
    }
}

/// Resolve `-o` / `-x` lists into a column mask, warning about unknown names
pub fn select_columns<S: AsRef<str>>(include: &[S], exclude: &[S]) -> ColumnSet {
    let (columns, unknown) = ColumnSet::select(include, exclude);
    for name in unknown {
        warn!("Ignoring unknown column '{}'", name);
    }
    columns
}

/// One line of a projected report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectedRow {
    Cells(Vec<String>),
    /// Rendered as a rule in tables, skipped in JSON
    Separator,
}

/// Rows reduced to the selected columns, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub columns: Vec<Column>,
    pub rows: Vec<ProjectedRow>,
}

impl Projection {
    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header()).collect()
    }
}

/// Project rows onto the selected columns.
///
/// Pseudo-filesystem rows follow the block devices behind a separator.
pub fn project(rows: &[DeviceRow], columns: &ColumnSet, sizes: &SizeFormat) -> Projection {
    let mut projected = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        if row.pseudo && i > 0 && !rows[i - 1].pseudo {
            projected.push(ProjectedRow::Separator);
        }
        projected.push(ProjectedRow::Cells(row.cells(columns, sizes)));
    }
    Projection {
        columns: columns.iter().collect(),
        rows: projected,
    }
}
