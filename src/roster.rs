//! Roster: the closed set of people allowed on the schedule. Every
//! request name is canonicalized against it before anything touches a
//! grid, so cells always carry the roster's exact spelling.

use tracing::warn;

use crate::config::Config;
use crate::error::{SchedulerError, StoreError};
use crate::grid::{is_blankish, Grid};
use crate::store::GridStore;

/// Whitespace-collapsed lowercase key used for every name comparison in
/// the crate (roster lookup, cell matching, hour counting).
pub fn name_key(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, Default)]
pub struct Roster {
    names: Vec<String>,
}

impl Roster {
    pub fn load(store: &mut dyn GridStore, cfg: &Config) -> Result<Self, StoreError> {
        let grid = store.read_region(&cfg.roster_tab)?;
        Ok(Roster::from_grid(&grid, cfg))
    }

    /// Find the name column by its header cell in the first few rows;
    /// sheets that lost the header fall back to column 0.
    pub fn from_grid(grid: &Grid, cfg: &Config) -> Self {
        let header_key = name_key(&cfg.roster_name_header);
        let mut name_col = 0;
        let mut first_name_row = 0;
        'scan: for r in 0..3.min(grid.row_count()) {
            for (c, cell) in grid.row(r).iter().enumerate() {
                if name_key(cell) == header_key {
                    name_col = c;
                    first_name_row = r + 1;
                    break 'scan;
                }
            }
        }
        if first_name_row == 0 {
            warn!(
                header = %cfg.roster_name_header,
                "roster header not found; reading names from column 0"
            );
        }

        let mut names = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for r in first_name_row..grid.row_count() {
            let cell = grid.cell(r, name_col).trim();
            if is_blankish(cell) {
                continue;
            }
            if seen.insert(name_key(cell)) {
                names.push(cell.to_string());
            }
        }
        Roster { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The roster's spelling of `input`, or an error naming the reject.
    pub fn canonical(&self, input: &str) -> Result<&str, SchedulerError> {
        let key = name_key(input);
        self.names
            .iter()
            .find(|n| name_key(n) == key)
            .map(String::as_str)
            .ok_or_else(|| SchedulerError::UnknownPerson(input.trim().to_string()))
    }
}
