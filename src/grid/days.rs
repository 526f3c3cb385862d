//! Day/Column Resolver: locates the column holding a weekday inside a
//! loosely structured grid via a cascade of increasingly permissive
//! strategies, first success wins.

use std::collections::HashMap;

use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::Grid;
use crate::daytime::{day_abbreviations, day_loose, day_name, weekday_from_dateish, RANGE_RE};

const HEADER_SCAN_ROWS: usize = 25;
const BLOCK_LOOKBACK_ROWS: usize = 8;
const ANYWHERE_SCAN: usize = 60;
const FUZZY_SCAN_ROWS: usize = 40;
const FUZZY_SCAN_COLS: usize = 60;

static NUMERIC_CELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d+)?$").unwrap());
static MERIDIEM_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(am|pm)\b").unwrap());

fn day_of_cell(cell: &str) -> Option<Weekday> {
    day_loose(cell).or_else(|| weekday_from_dateish(cell))
}

/// Day→column map from the first row only. Cells that are purely
/// numeric or contain a clock meridiem are skipped so a time ladder in
/// row 0 cannot masquerade as a header.
pub fn first_row_day_map(grid: &Grid) -> HashMap<Weekday, usize> {
    let mut cols = HashMap::new();
    for (c, raw) in grid.row(0).iter().enumerate() {
        let cell = raw.replace('\u{a0}', " ");
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        let low = cell.to_lowercase();
        if NUMERIC_CELL_RE.is_match(&low) || MERIDIEM_WORD_RE.is_match(&low) {
            continue;
        }
        if let Some(d) = day_of_cell(cell) {
            cols.entry(d).or_insert(c);
        }
    }
    cols
}

/// Strategy 2: the same per-cell weekday test as the first-row map
/// (names and date-like cells alike) across the first rows; the first
/// row with ≥2 distinct day hits wins, else the first row with ≥1.
fn header_rows_scan(grid: &Grid, target: Weekday) -> Option<usize> {
    let mut best: HashMap<Weekday, usize> = HashMap::new();
    for r in 0..HEADER_SCAN_ROWS.min(grid.row_count()) {
        let mut day_cols: HashMap<Weekday, usize> = HashMap::new();
        for (c, val) in grid.row(r).iter().enumerate() {
            if let Some(d) = day_of_cell(val) {
                day_cols.entry(d).or_insert(c);
            }
        }
        if day_cols.len() >= 2 {
            return day_cols.get(&target).copied();
        }
        if !day_cols.is_empty() && best.is_empty() {
            best = day_cols;
        }
    }
    best.get(&target).copied()
}

/// Strategy 3: anchor on "start–end" block labels. For every column,
/// find the first row with a range token and walk up a few rows looking
/// for the nearest weekday-like cell in the same column.
fn blocks_anchored(grid: &Grid, target: Weekday) -> Option<usize> {
    let mut day_cols: HashMap<Weekday, usize> = HashMap::new();
    let cols = grid.col_count();
    let mut first_range_row: HashMap<usize, usize> = HashMap::new();
    for r in 0..grid.row_count() {
        for c in 0..cols {
            if RANGE_RE.is_match(grid.cell(r, c)) {
                first_range_row.entry(c).or_insert(r);
            }
        }
    }
    for (&c, &r0) in &first_range_row {
        let top = r0.saturating_sub(BLOCK_LOOKBACK_ROWS);
        for r in (top..=r0).rev() {
            if let Some(d) = day_of_cell(grid.cell(r, c)) {
                day_cols.entry(d).or_insert(c);
                break;
            }
        }
    }
    day_cols.get(&target).copied()
}

/// Strategy 4: global scan of the grid head for the earliest occurrence
/// of each weekday; a unique single candidate wins even without a name
/// match.
fn anywhere_scan(grid: &Grid, target: Weekday) -> Option<usize> {
    let r_n = ANYWHERE_SCAN.min(grid.row_count());
    let c_n = ANYWHERE_SCAN.min(grid.col_count());
    let mut first_hits: HashMap<Weekday, usize> = HashMap::new();
    for r in 0..r_n {
        for c in 0..c_n {
            if let Some(d) = day_of_cell(grid.cell(r, c)) {
                first_hits.entry(d).or_insert(c);
            }
        }
    }
    if let Some(&c) = first_hits.get(&target) {
        return Some(c);
    }
    if first_hits.len() == 1 {
        // Ambiguous but unique: one weekday somewhere in the sheet.
        return first_hits.values().next().copied();
    }
    None
}

/// Strategy 5: whole-word frequency of the day's name and abbreviations
/// over a bounded window; highest count wins, ties to the lowest column.
fn fuzzy_count(grid: &Grid, target: Weekday) -> Option<usize> {
    let mut tokens = vec![day_name(target).to_string()];
    tokens.extend(day_abbreviations(target).iter().map(|a| (*a).to_string()));
    let patterns: Vec<Regex> = tokens
        .iter()
        .filter_map(|t| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(t))).ok())
        .collect();

    let r_n = FUZZY_SCAN_ROWS.min(grid.row_count());
    let c_n = FUZZY_SCAN_COLS.min(grid.col_count());
    let mut col_counts: HashMap<usize, usize> = HashMap::new();
    for r in 0..r_n {
        for c in 0..c_n {
            let low = grid.cell(r, c).replace('\n', " ");
            if patterns.iter().any(|p| p.is_match(&low)) {
                *col_counts.entry(c).or_insert(0) += 1;
            }
        }
    }
    col_counts
        .into_iter()
        .max_by(|(ca, na), (cb, nb)| na.cmp(nb).then(cb.cmp(ca)))
        .map(|(c, _)| c)
}

type Strategy = fn(&Grid, Weekday) -> Option<usize>;

const FALLBACK_STRATEGIES: [(&str, Strategy); 4] = [
    ("header-rows", header_rows_scan),
    ("block-anchored", blocks_anchored),
    ("anywhere", anywhere_scan),
    ("fuzzy-count", fuzzy_count),
];

/// Resolve the column for `target`, or `None` with the whole cascade
/// exhausted. The caller attaches the diagnostic scan dump.
pub fn resolve_day_column(grid: &Grid, target: Weekday) -> Option<usize> {
    if grid.is_empty() {
        return None;
    }

    // Strategy 1: first-row header. Two or more distinct days is a
    // confident header; a single hit is kept only as a last resort.
    let mut low_confidence: Option<usize> = None;
    let first = first_row_day_map(grid);
    if let Some(&c) = first.get(&target) {
        if first.len() >= 2 {
            debug!(day = day_name(target), col = c, "resolved via first-row header");
            return Some(c);
        }
        low_confidence = Some(c);
    }

    for (name, strategy) in FALLBACK_STRATEGIES {
        if let Some(c) = strategy(grid, target) {
            debug!(day = day_name(target), col = c, strategy = name, "resolved");
            return Some(c);
        }
    }

    if let Some(c) = low_confidence {
        debug!(
            day = day_name(target),
            col = c,
            "resolved via low-confidence single first-row hit"
        );
        return Some(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_header_wins() {
        let g = Grid::from_rows(&[
            &["Time", "Monday", "Tuesday", "Wednesday"],
            &["9:00 AM", "", "", ""],
        ]);
        assert_eq!(resolve_day_column(&g, Weekday::Tue), Some(2));
        // reference single-pass scan of row 0 agrees
        assert_eq!(first_row_day_map(&g)[&Weekday::Tue], 2);
    }

    #[test]
    fn first_row_skips_times_and_numbers() {
        let g = Grid::from_rows(&[&["9:00 AM", "42", "Friday", "Saturday"]]);
        let map = first_row_day_map(&g);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&Weekday::Fri], 2);
    }

    #[test]
    fn deep_header_of_bare_dates() {
        // 2025-09-08 is a Monday, 2025-09-09 a Tuesday
        let g = Grid::from_rows(&[
            &["Fall schedule", "", ""],
            &["", "9/8/2025", "9/9/2025"],
            &["9:00 AM", "", ""],
        ]);
        assert_eq!(header_rows_scan(&g, Weekday::Tue), Some(2));
        assert_eq!(resolve_day_column(&g, Weekday::Tue), Some(2));
    }

    #[test]
    fn deep_header_row_found() {
        let g = Grid::from_rows(&[
            &["Fall schedule"],
            &[""],
            &["", "Monday", "Tuesday", "Wednesday"],
            &["9:00 AM", "", "", ""],
        ]);
        assert_eq!(resolve_day_column(&g, Weekday::Wed), Some(3));
    }

    #[test]
    fn block_anchored_inference() {
        let g = Grid::from_rows(&[
            &["", "Monday, 9/8", "Tuesday, 9/9"],
            &["", "", ""],
            &["", "7:00 AM – 11:00 AM", "7:00 AM – 11:00 AM"],
            &["", "", ""],
        ]);
        // two header hits → strategy 1 already resolves; drop one header
        // to force the block-anchored path
        let g2 = Grid::from_rows(&[
            &["", "", ""],
            &["", "Tuesday, 9/9", ""],
            &["", "7:00 AM – 11:00 AM", ""],
            &["", "", ""],
        ]);
        assert_eq!(resolve_day_column(&g, Weekday::Tue), Some(2));
        assert_eq!(blocks_anchored(&g2, Weekday::Tue), Some(1));
    }

    #[test]
    fn anywhere_unique_candidate() {
        // only one weekday anywhere; target is a different day
        let g = Grid::from_rows(&[&["", ""], &["", "Friday"], &["", ""]]);
        assert_eq!(anywhere_scan(&g, Weekday::Mon), Some(1));
    }

    #[test]
    fn fuzzy_frequency_tie_breaks_low_column() {
        let g = Grid::from_rows(&[
            &["fri specials", "fri deadline"],
            &["due fri", "misc"],
            &["", ""],
        ]);
        // col 0 has two "fri" hits, col 1 has one
        assert_eq!(fuzzy_count(&g, Weekday::Fri), Some(0));
    }

    #[test]
    fn single_first_row_hit_is_kept_as_fallback() {
        let g = Grid::from_rows(&[&["", "Monday"], &["", ""]]);
        // strategy 4 will also find monday as the unique candidate, but
        // either way the resolved column must be 1
        assert_eq!(resolve_day_column(&g, Weekday::Mon), Some(1));
    }

    #[test]
    fn unresolvable_grid() {
        let g = Grid::from_rows(&[&["a", "b"], &["c", "d"]]);
        assert_eq!(resolve_day_column(&g, Weekday::Mon), None);
        assert_eq!(resolve_day_column(&Grid::default(), Weekday::Mon), None);
    }
}
