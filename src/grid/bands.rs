//! Slot/Band Indexer: partitions a grid's body rows into contiguous
//! time-anchored bands (capacity grids) or fixed "start–end" blocks
//! (the on-call rotation).

use std::collections::HashMap;
use std::ops::Range;

use chrono::NaiveTime;

use super::Grid;
use crate::daytime::{fmt_time, parse_time_cell, RANGE_RE, TIME_CELL_RE};
use crate::error::SchedulerError;

/// One time band: a label row plus the run of lane rows below it, up to
/// (not including) the next label row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Band {
    pub label_row: usize,
    pub start: NaiveTime,
    pub lane_rows: Range<usize>,
}

impl Band {
    pub fn label(&self) -> String {
        fmt_time(self.start)
    }
}

/// One fixed block on the rotation tab, identified by its exact
/// (start, end) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub label_row: usize,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub lane_rows: Range<usize>,
}

impl Block {
    pub fn label(&self) -> String {
        format!("{} – {}", fmt_time(self.start), fmt_time(self.end))
    }

    /// Block length in minutes; an end at or before the start wraps
    /// past midnight.
    pub fn minutes(&self) -> i64 {
        let delta = (self.end - self.start).num_minutes();
        if delta > 0 {
            delta
        } else {
            delta + 24 * 60
        }
    }
}

fn time_label_of(cell: &str) -> Option<NaiveTime> {
    if !TIME_CELL_RE.is_match(cell) {
        return None;
    }
    let s = cell.trim();
    if s.eq_ignore_ascii_case("time") {
        return None;
    }
    parse_time_cell(s)
}

/// Scan column 0 top-to-bottom; every parseable clock time opens a new
/// band, and a synthetic boundary at the grid's row count closes the
/// last one. Bands partition the body rows without gaps or overlaps.
pub fn index_bands(grid: &Grid) -> Vec<Band> {
    let mut label_rows: Vec<(usize, NaiveTime)> = Vec::new();
    for r in 0..grid.row_count() {
        if let Some(t) = time_label_of(grid.cell(r, 0)) {
            label_rows.push((r, t));
        }
    }
    let mut bands = Vec::with_capacity(label_rows.len());
    for (i, &(r0, start)) in label_rows.iter().enumerate() {
        let r1 = label_rows
            .get(i + 1)
            .map(|&(r, _)| r)
            .unwrap_or(grid.row_count());
        bands.push(Band {
            label_row: r0,
            start,
            lane_rows: (r0 + 1)..r1,
        });
    }
    bands
}

/// Lookup from formatted start label ("9:00 AM") to band.
pub fn band_map(bands: &[Band]) -> HashMap<String, Band> {
    bands.iter().map(|b| (b.label(), b.clone())).collect()
}

/// Reject capacity grids whose consecutive time labels are not 30
/// minutes apart; a malformed ladder would silently misplace every band
/// boundary otherwise.
pub fn validate_ladder(tab: &str, bands: &[Band]) -> Result<(), SchedulerError> {
    for pair in bands.windows(2) {
        let delta = (pair[1].start - pair[0].start).num_minutes();
        let delta = if delta <= 0 { delta + 24 * 60 } else { delta };
        if delta != 30 {
            return Err(SchedulerError::MalformedLadder {
                tab: tab.to_string(),
                prev: pair[0].label(),
                next: pair[1].label(),
            });
        }
    }
    Ok(())
}

/// Fixed blocks in one column: rows whose cell in that column carries a
/// "start – end" range token, each owning the rows down to the next
/// label row (names live under the same column as the label).
pub fn index_blocks(grid: &Grid, col: usize) -> Vec<Block> {
    let mut labels: Vec<(usize, NaiveTime, NaiveTime)> = Vec::new();
    for r in 0..grid.row_count() {
        if let Some(caps) = RANGE_RE.captures(grid.cell(r, col)) {
            let s = caps.get(1).and_then(|m| parse_time_cell(m.as_str()));
            let e = caps.get(2).and_then(|m| parse_time_cell(m.as_str()));
            if let (Some(s), Some(e)) = (s, e) {
                labels.push((r, s, e));
            }
        }
    }
    let mut blocks = Vec::with_capacity(labels.len());
    for (i, &(r0, s, e)) in labels.iter().enumerate() {
        let r1 = labels
            .get(i + 1)
            .map(|&(r, _, _)| r)
            .unwrap_or(grid.row_count());
        blocks.push(Block {
            label_row: r0,
            start: s,
            end: e,
            lane_rows: (r0 + 1)..r1,
        });
    }
    blocks
}

/// The one block whose boundaries equal the requested pair exactly;
/// there is no sub-block booking.
pub fn find_block(grid: &Grid, col: usize, start: NaiveTime, end: NaiveTime) -> Option<Block> {
    index_blocks(grid, col)
        .into_iter()
        .find(|b| b.start == start && b.end == end)
}

/// Human-readable listing of the blocks in a column, for block-not-found
/// diagnostics.
pub fn block_listing(grid: &Grid, col: usize) -> String {
    let blocks = index_blocks(grid, col);
    if blocks.is_empty() {
        return format!("  (no block labels found in column {col})\n");
    }
    blocks
        .iter()
        .map(|b| format!("  r{:02}: {}\n", b.label_row + 1, b.label()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn ladder_grid() -> Grid {
        Grid::from_rows(&[
            &["Time", "Monday", "Tuesday"],
            &["9:00 AM", "", ""],
            &["", "OA: Jane Doe", ""],
            &["", "", ""],
            &["9:30 AM", "", ""],
            &["", "", ""],
            &["10:00 AM", "", ""],
            &["", "", ""],
        ])
    }

    #[test]
    fn bands_partition_body_rows() {
        let g = ladder_grid();
        let bands = index_bands(&g);
        assert_eq!(bands.len(), 3);
        assert_eq!(bands[0].start, t(9, 0));
        assert_eq!(bands[0].lane_rows, 2..4);
        assert_eq!(bands[1].lane_rows, 5..6);
        // final band closed by the synthetic terminal boundary
        assert_eq!(bands[2].lane_rows, 7..8);
        // no gaps, no overlaps
        for pair in bands.windows(2) {
            assert_eq!(pair[0].lane_rows.end, pair[1].label_row);
        }
    }

    #[test]
    fn band_map_keys_are_formatted_labels() {
        let bands = index_bands(&ladder_grid());
        let map = band_map(&bands);
        assert!(map.contains_key("9:00 AM"));
        assert!(map.contains_key("9:30 AM"));
        assert_eq!(map["10:00 AM"].label_row, 6);
    }

    #[test]
    fn header_word_time_is_not_a_label() {
        let g = Grid::from_rows(&[&["Time"], &["9:00 AM"], &[""]]);
        assert_eq!(index_bands(&g).len(), 1);
    }

    #[test]
    fn uneven_ladder_fails_loudly() {
        let g = Grid::from_rows(&[
            &["9:00 AM", ""],
            &["", ""],
            &["10:00 AM", ""], // 60-minute jump
            &["", ""],
        ]);
        let bands = index_bands(&g);
        let err = validate_ladder("MC", &bands).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("9:00 AM"));
        assert!(msg.contains("10:00 AM"));
        assert!(validate_ladder("MC", &index_bands(&ladder_grid())).is_ok());
    }

    #[test]
    fn ladder_wraps_at_midnight() {
        let g = Grid::from_rows(&[
            &["11:30 PM", ""],
            &["", ""],
            &["12:00 AM", ""],
            &["", ""],
        ]);
        assert!(validate_ladder("MC", &index_bands(&g)).is_ok());
    }

    #[test]
    fn blocks_keyed_by_exact_pair() {
        let g = Grid::from_rows(&[
            &["", "Monday"],
            &["", "7:00 AM – 11:00 AM"],
            &["", "OA: Jane Doe"],
            &["", ""],
            &["", "11:00 AM – 4:00 PM"],
            &["", ""],
        ]);
        let blocks = index_blocks(&g, 1);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lane_rows, 2..4);
        assert_eq!(blocks[0].minutes(), 240);
        assert_eq!(blocks[1].minutes(), 300);
        assert!(find_block(&g, 1, t(7, 0), t(11, 0)).is_some());
        // non-matching boundary: no partial-block booking
        assert!(find_block(&g, 1, t(7, 30), t(11, 0)).is_none());
    }

    #[test]
    fn overnight_block_minutes() {
        let b = Block {
            label_row: 0,
            start: t(19, 0),
            end: t(0, 0),
            lane_rows: 1..2,
        };
        assert_eq!(b.minutes(), 300);
    }
}
