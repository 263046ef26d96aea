//! Tabular report output
//!
//! Every view produces [`Sheet`]s. The CLI renders them as terminal tables
//! and the export writes them as CSV files.

use std::fmt;

use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

/// A titled table with a header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Create an empty sheet
    #[must_use]
    pub fn new(title: impl Into<String>, header: &[&str]) -> Self {
        Self {
            title: title.into(),
            header: header.iter().map(|h| (*h).to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; short rows are padded to the header width
    pub fn push(&mut self, mut row: Vec<String>) {
        if row.len() < self.header.len() {
            row.resize(self.header.len(), String::new());
        }
        self.rows.push(row);
    }

    /// Append a row
    #[must_use]
    pub fn with_row(mut self, row: Vec<String>) -> Self {
        self.push(row);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, by header name
    #[must_use]
    pub fn column(&self, name: &str) -> Vec<&str> {
        let Some(index) = self.header.iter().position(|h| h == name) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(index).map(String::as_str))
            .collect()
    }

    /// Render as a terminal table
    #[must_use]
    pub fn render(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic);

        let header: Vec<Cell> = self
            .header
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect();
        table.set_header(header);

        for row in &self.rows {
            table.add_row(row);
        }

        if self.title.is_empty() {
            table.to_string()
        } else {
            format!("{}\n{table}", self.title)
        }
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

// ============================================================================
// Cell formatting
// ============================================================================

pub(crate) fn text(value: Option<&str>) -> String {
    value.unwrap_or_default().to_string()
}

pub(crate) fn joined<S: AsRef<str>>(values: impl IntoIterator<Item = S>) -> String {
    values
        .into_iter()
        .map(|v| v.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tri-state flag as `yes`, `no` or `tbd`
pub(crate) fn flag(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "tbd",
    }
    .to_string()
}
