//! The rectangular text grid read from one tab, plus the structural
//! heuristics that run over it. Grids are ephemeral: read fresh per
//! operation, never cached across a mutation.

pub mod bands;
pub mod capacity;
pub mod days;

pub use bands::{index_bands, index_blocks, validate_ladder, Band, Block};
pub use capacity::{evaluate_block, evaluate_window, CapacityPolicy};
pub use days::resolve_day_column;

use crate::daytime::{day_loose, weekday_from_dateish};

/// Rows of cell text; absent cells read as empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Grid { rows }
    }

    /// Builder for tests and fixtures.
    pub fn from_rows(rows: &[&[&str]]) -> Self {
        Grid {
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest row; rows may be ragged.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell text at (row, col), empty string when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn row(&self, row: usize) -> &[String] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Set a cell, padding the row as needed. Used to keep a local
    /// snapshot in sync with cells just written to the store.
    pub fn set_cell(&mut self, row: usize, col: usize, value: &str) {
        while self.rows.len() <= row {
            self.rows.push(Vec::new());
        }
        let r = &mut self.rows[row];
        while r.len() <= col {
            r.push(String::new());
        }
        r[col] = value.to_string();
    }

    /// Rows in the scan window containing day-like cells; embedded in
    /// "weekday header unresolved" errors.
    pub fn day_cell_scan(&self, max_rows: usize, max_cols: usize) -> String {
        let r_n = max_rows.min(self.row_count());
        let c_n = max_cols.min(self.col_count());
        let mut out = String::new();
        for r in 0..r_n {
            let hits: Vec<(usize, &str)> = (0..c_n)
                .map(|c| (c, self.cell(r, c)))
                .filter(|(_, v)| day_loose(v).is_some() || weekday_from_dateish(v).is_some())
                .collect();
            if !hits.is_empty() {
                out.push_str(&format!("  r{:02} day-like cells: {:?}\n", r + 1, hits));
            }
        }
        if out.is_empty() {
            out.push_str("  (no day-like cells found in the scan window)\n");
        }
        out
    }
}

const PLACEHOLDERS: [&str; 6] = ["-", "–", "—", "·", ".", "n/a"];

/// A cell that counts as open capacity: empty or a placeholder token.
pub fn is_blankish(value: &str) -> bool {
    let s = value.trim();
    s.is_empty() || PLACEHOLDERS.contains(&s.to_lowercase().as_str())
}
