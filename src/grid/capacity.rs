//! Capacity Evaluator: per-policy admissibility of a requested window
//! against a grid snapshot. Checking is advisory — writes re-verify
//! blankishness per lane, and the lock arbiter narrows the remaining
//! check/write race.

use std::collections::HashMap;

use chrono::NaiveTime;

use super::bands::{Band, Block};
use super::{is_blankish, Grid};
use crate::daytime::{flip_half_day, fmt_time};

/// Admission policy for one tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityPolicy {
    /// Every band in the window needs ≥1 blankish lane.
    OpenLane,
    /// Occupied lanes per band must stay strictly under the cap.
    NumericCap(u32),
    /// The single matching block needs ≥1 blankish lane.
    ExclusiveBlock,
}

/// Lanes in a band's column that are already occupied.
pub fn occupied_lanes(grid: &Grid, band: &Band, col: usize) -> usize {
    band.lane_rows
        .clone()
        .filter(|&r| !is_blankish(grid.cell(r, col)))
        .count()
}

/// First lane row in the run that is still blankish, if any.
pub fn first_open_lane<I>(grid: &Grid, lane_rows: I, col: usize) -> Option<usize>
where
    I: IntoIterator<Item = usize>,
{
    lane_rows
        .into_iter()
        .find(|&r| is_blankish(grid.cell(r, col)))
}

/// Find the band for one tick, coercing onto the sheet's ladder with an
/// AM/PM flip when the literal label is absent.
pub fn band_for_tick<'a>(bands: &'a HashMap<String, Band>, tick: NaiveTime) -> Option<&'a Band> {
    bands
        .get(&fmt_time(tick))
        .or_else(|| bands.get(&fmt_time(flip_half_day(tick))))
}

/// Evaluate a multi-tick window under [`CapacityPolicy::OpenLane`] or
/// [`CapacityPolicy::NumericCap`]. Returns one human-readable reason per
/// inadmissible tick; an empty list means admissible. Each band is
/// evaluated independently — reservation happens only at write time.
pub fn evaluate_window(
    grid: &Grid,
    bands: &HashMap<String, Band>,
    col: usize,
    policy: CapacityPolicy,
    ticks: &[NaiveTime],
) -> Vec<String> {
    let mut reasons = Vec::new();
    for &tick in ticks {
        let label = fmt_time(tick);
        let Some(band) = band_for_tick(bands, tick) else {
            reasons.push(format!("{label} — no time-row band in sheet"));
            continue;
        };
        match policy {
            CapacityPolicy::OpenLane => {
                if first_open_lane(grid, band.lane_rows.clone(), col).is_none() {
                    reasons.push(format!("{label} — no empty cells"));
                }
            }
            CapacityPolicy::NumericCap(cap) => {
                let filled = occupied_lanes(grid, band, col);
                if filled >= cap as usize {
                    reasons.push(format!("{label} — at capacity ({filled}/{cap})"));
                }
            }
            CapacityPolicy::ExclusiveBlock => {
                reasons.push(format!(
                    "{label} — exclusive-block policy cannot evaluate a tick window"
                ));
            }
        }
    }
    reasons
}

/// Evaluate one fixed block under [`CapacityPolicy::ExclusiveBlock`].
pub fn evaluate_block(grid: &Grid, block: &Block, col: usize) -> Option<String> {
    if first_open_lane(grid, block.lane_rows.clone(), col).is_some() {
        None
    } else {
        Some(format!("block '{}' has no empty cells", block.label()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::bands::{band_map, index_bands};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn two_lane_grid(lane_a: &str, lane_b: &str) -> Grid {
        Grid::from_rows(&[
            &["Time", "Monday"],
            &["9:00 AM", ""],
            &["", lane_a],
            &["", lane_b],
            &["9:30 AM", ""],
            &["", ""],
            &["", ""],
        ])
    }

    #[test]
    fn open_lane_needs_one_blank() {
        let g = two_lane_grid("OA: Jane Doe", "");
        let bands = band_map(&index_bands(&g));
        assert!(evaluate_window(&g, &bands, 1, CapacityPolicy::OpenLane, &[t(9, 0)]).is_empty());

        let full = two_lane_grid("OA: Jane Doe", "OA: Amy Wu");
        let bands = band_map(&index_bands(&full));
        let reasons = evaluate_window(&full, &bands, 1, CapacityPolicy::OpenLane, &[t(9, 0)]);
        assert_eq!(reasons, vec!["9:00 AM — no empty cells"]);
    }

    #[test]
    fn numeric_cap_counts_occupied() {
        let g = two_lane_grid("OA: Jane Doe", "-");
        let bands = band_map(&index_bands(&g));
        // one occupied (the dash is blankish), cap 2 → admissible
        assert!(evaluate_window(&g, &bands, 1, CapacityPolicy::NumericCap(2), &[t(9, 0)]).is_empty());

        let full = two_lane_grid("OA: Jane Doe", "GOA: Amy Wu");
        let bands = band_map(&index_bands(&full));
        let reasons = evaluate_window(&full, &bands, 1, CapacityPolicy::NumericCap(2), &[t(9, 0)]);
        assert_eq!(reasons, vec!["9:00 AM — at capacity (2/2)"]);
    }

    #[test]
    fn every_tick_evaluated() {
        let g = two_lane_grid("OA: Jane Doe", "OA: Amy Wu");
        let bands = band_map(&index_bands(&g));
        let reasons = evaluate_window(
            &g,
            &bands,
            1,
            CapacityPolicy::OpenLane,
            &[t(9, 0), t(9, 30), t(10, 0)],
        );
        // 9:00 full, 9:30 open, 10:00 missing from the ladder
        assert_eq!(
            reasons,
            vec![
                "9:00 AM — no empty cells",
                "10:00 AM — no time-row band in sheet"
            ]
        );
    }

    #[test]
    fn ladder_coercion_flips_half_day() {
        // ladder labeled 9:00 AM; request arrives as 9:00 PM
        let g = two_lane_grid("", "");
        let bands = band_map(&index_bands(&g));
        assert!(band_for_tick(&bands, t(21, 0)).is_some());
        assert!(band_for_tick(&bands, t(11, 0)).is_none());
    }

    #[test]
    fn block_admissibility() {
        let g = Grid::from_rows(&[
            &["7:00 AM – 11:00 AM"],
            &["OA: Jane Doe"],
            &[""],
        ]);
        let block = crate::grid::bands::index_blocks(&g, 0).remove(0);
        assert!(evaluate_block(&g, &block, 0).is_none());

        let full = Grid::from_rows(&[
            &["7:00 AM – 11:00 AM"],
            &["OA: Jane Doe"],
            &["OA: Amy Wu"],
        ]);
        let block = crate::grid::bands::index_blocks(&full, 0).remove(0);
        let reason = evaluate_block(&full, &block, 0).unwrap();
        assert!(reason.contains("no empty cells"));
        assert!(reason.contains("7:00 AM – 11:00 AM"));
    }
}
