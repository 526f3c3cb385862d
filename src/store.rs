//! Grid Store accessor: the trait the engine talks to, a retrying
//! wrapper for rate-limited backends, and an in-memory store used by
//! tests and fixtures.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::error::StoreError;
use crate::grid::Grid;

/// A shared spreadsheet-like backend: named tabs of rectangular text.
/// Rows and columns in `write_cell` are 1-indexed, matching the
/// external representation.
pub trait GridStore {
    fn tab_titles(&mut self) -> Result<Vec<String>, StoreError>;
    fn read_region(&mut self, tab: &str) -> Result<Grid, StoreError>;
    fn write_cell(&mut self, tab: &str, row: usize, col: usize, value: &str)
        -> Result<(), StoreError>;
    fn append_row(&mut self, tab: &str, values: &[String]) -> Result<(), StoreError>;
    /// Create an empty tab; succeeds quietly if it already exists.
    fn create_tab(&mut self, title: &str) -> Result<(), StoreError>;
}

/// Bounded exponential backoff with jitter for transient store errors.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Retry {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub max_jitter_ms: u64,
}

impl Default for Retry {
    fn default() -> Self {
        Retry {
            attempts: 4,
            base_delay_ms: 400,
            max_jitter_ms: 250,
        }
    }
}

/// Run `op`, retrying transient failures up to the attempt budget;
/// the final error is surfaced as fatal.
pub fn with_backoff<T>(
    retry: Retry,
    what: &str,
    mut op: impl FnMut() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let attempts = retry.attempts.max(1);
    for i in 0..attempts {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && i + 1 < attempts => {
                let jitter = if retry.max_jitter_ms > 0 {
                    rand::thread_rng().gen_range(0..=retry.max_jitter_ms)
                } else {
                    0
                };
                let delay = retry.base_delay_ms.saturating_mul(1 << i) + jitter;
                warn!(op = what, attempt = i + 1, delay_ms = delay, error = %e, "transient store error; backing off");
                thread::sleep(Duration::from_millis(delay));
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!("retry loop always returns");
}

/// In-memory store. Tabs keep insertion order (tab order matters for
/// fixed-block discovery). Transient failures can be injected per
/// operation for retry tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tabs: Vec<(String, Vec<Vec<String>>)>,
    fail_next: HashMap<&'static str, u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Builder: add a tab from string rows.
    pub fn with_tab(mut self, title: &str, rows: &[&[&str]]) -> Self {
        self.insert_tab(title, rows);
        self
    }

    pub fn insert_tab(&mut self, title: &str, rows: &[&[&str]]) {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| (*c).to_string()).collect())
            .collect();
        if let Some(slot) = self.tabs.iter_mut().find(|(t, _)| t == title) {
            slot.1 = rows;
        } else {
            self.tabs.push((title.to_string(), rows));
        }
    }

    /// Make the next `n` calls of `op` ("read", "write", "append",
    /// "titles") fail with a rate-limit error.
    pub fn fail_next(&mut self, op: &'static str, n: u32) {
        self.fail_next.insert(op, n);
    }

    fn trip(&mut self, op: &'static str) -> Result<(), StoreError> {
        if let Some(n) = self.fail_next.get_mut(op) {
            if *n > 0 {
                *n -= 1;
                return Err(StoreError::RateLimited);
            }
        }
        Ok(())
    }

    fn tab_mut(&mut self, tab: &str) -> Result<&mut Vec<Vec<String>>, StoreError> {
        self.tabs
            .iter_mut()
            .find(|(t, _)| t == tab)
            .map(|(_, rows)| rows)
            .ok_or_else(|| StoreError::UnknownTab(tab.to_string()))
    }

    /// Direct snapshot access for test assertions.
    pub fn snapshot(&self, tab: &str) -> Option<Grid> {
        self.tabs
            .iter()
            .find(|(t, _)| t == tab)
            .map(|(_, rows)| Grid::new(rows.clone()))
    }
}

impl GridStore for MemoryStore {
    fn tab_titles(&mut self) -> Result<Vec<String>, StoreError> {
        self.trip("titles")?;
        Ok(self.tabs.iter().map(|(t, _)| t.clone()).collect())
    }

    fn read_region(&mut self, tab: &str) -> Result<Grid, StoreError> {
        self.trip("read")?;
        let rows = self
            .tabs
            .iter()
            .find(|(t, _)| t == tab)
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| StoreError::UnknownTab(tab.to_string()))?;
        Ok(Grid::new(rows))
    }

    fn write_cell(
        &mut self,
        tab: &str,
        row: usize,
        col: usize,
        value: &str,
    ) -> Result<(), StoreError> {
        self.trip("write")?;
        if row == 0 || col == 0 {
            return Err(StoreError::Malformed(format!(
                "cell coordinates are 1-indexed, got ({row}, {col})"
            )));
        }
        let rows = self.tab_mut(tab)?;
        let (r, c) = (row - 1, col - 1);
        while rows.len() <= r {
            rows.push(Vec::new());
        }
        while rows[r].len() <= c {
            rows[r].push(String::new());
        }
        rows[r][c] = value.to_string();
        Ok(())
    }

    fn append_row(&mut self, tab: &str, values: &[String]) -> Result<(), StoreError> {
        self.trip("append")?;
        let rows = self.tab_mut(tab)?;
        rows.push(values.to_vec());
        Ok(())
    }

    fn create_tab(&mut self, title: &str) -> Result<(), StoreError> {
        if !self.tabs.iter().any(|(t, _)| t == title) {
            self.tabs.push((title.to_string(), Vec::new()));
        }
        Ok(())
    }
}
