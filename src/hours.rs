//! Hour counting: how many weekly hours a person already holds across
//! the capacity tabs (half-hour lanes) and the fixed-block rotation.
//! Totals are recomputed from fresh grids whenever they gate a mutation;
//! a small epoch cache serves display-only reads.

use std::collections::HashMap;

use chrono::Weekday;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::config::Config;
use crate::daytime::{day_loose, weekday_from_dateish};
use crate::error::SchedulerError;
use crate::grid::{index_bands, index_blocks, is_blankish, resolve_day_column, Grid};
use crate::roster::name_key;
use crate::store::GridStore;

/// Multiple people can share one cell: "OA: Jane Doe, OA: Amy Wu",
/// newline-separated stacks, or an "and" in prose.
static SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[,\n/&+]|\s+and\s+").unwrap());

static PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:OA|GOA|On[-\s]*Call)\s*:\s*").unwrap());

static ONCALL_TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bon[\s-]*call\b").unwrap());

/// One mention, normalized for comparison: role prefix stripped, folded
/// to alphanumerics and spaces, whitespace collapsed, lowercased.
pub fn canon_mention(raw: &str) -> String {
    let stripped = PREFIX_RE.replace(raw.trim(), "");
    let folded: String = stripped
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    name_key(&folded)
}

/// All person mentions in one cell.
pub fn cell_mentions(cell: &str) -> Vec<String> {
    if is_blankish(cell) {
        return Vec::new();
    }
    SPLIT_RE
        .split(cell)
        .map(canon_mention)
        .filter(|m| !m.is_empty())
        .collect()
}

fn cell_mentions_person(cell: &str, person_key: &str) -> bool {
    cell_mentions(cell).iter().any(|m| m == person_key)
}

/// Hours held on a capacity tab: every lane cell mentioning the person
/// is one 30-minute band.
pub fn half_hour_total(grid: &Grid, person_key: &str) -> f64 {
    let bands = index_bands(grid);
    let mut halves = 0u32;
    for band in &bands {
        for r in band.lane_rows.clone() {
            for cell in grid.row(r) {
                if cell_mentions_person(cell, person_key) {
                    halves += 1;
                }
            }
        }
    }
    f64::from(halves) * 0.5
}

/// Column→weekday map from the first header-like row: the earliest of
/// the first rows holding ≥2 distinct day cells.
fn header_day_cols(grid: &Grid) -> Option<HashMap<usize, Weekday>> {
    for r in 0..10.min(grid.row_count()) {
        let mut cols: HashMap<usize, Weekday> = HashMap::new();
        for (c, cell) in grid.row(r).iter().enumerate() {
            if let Some(d) = day_loose(cell).or_else(|| weekday_from_dateish(cell)) {
                cols.entry(c).or_insert(d);
            }
        }
        if cols.len() >= 2 {
            return Some(cols);
        }
    }
    None
}

/// Hours held on the fixed-block rotation: a flat rate per mention —
/// weekday shifts count 5h, weekend shifts 4h, and a sheet without a
/// readable day header counts every mention at the weekday rate.
pub fn fixed_block_total(grid: &Grid, person_key: &str) -> f64 {
    let day_cols = header_day_cols(grid);
    let mut total = 0.0;
    for r in 0..grid.row_count() {
        for (c, cell) in grid.row(r).iter().enumerate() {
            if !cell_mentions_person(cell, person_key) {
                continue;
            }
            let rate = match day_cols.as_ref().and_then(|m| m.get(&c)) {
                Some(Weekday::Sat) | Some(Weekday::Sun) => 4.0,
                Some(_) | None => 5.0,
            };
            total += rate;
        }
    }
    total
}

/// The three tabs the engine works with, resolved against live titles.
#[derive(Debug, Clone)]
pub struct TabSet {
    pub open: String,
    pub capped: String,
    pub oncall: Option<String>,
}

/// Match a configured title against live tab titles: exact
/// (case-insensitive) first, then prefix on the title's first word.
pub fn resolve_title(titles: &[String], wanted: &str) -> Option<String> {
    let want = wanted.trim().to_lowercase();
    if want.is_empty() {
        return None;
    }
    if let Some(t) = titles.iter().find(|t| t.trim().to_lowercase() == want) {
        return Some(t.clone());
    }
    let head = want.split_whitespace().next()?;
    titles
        .iter()
        .find(|t| t.trim().to_lowercase().starts_with(head))
        .cloned()
}

/// Resolve the working tab set. The fixed-block tab is, in order: the
/// configured override, the tab to the right of the open tab (skipping
/// bookkeeping tabs), or any title that reads like an on-call tab.
pub fn tab_set(store: &mut dyn GridStore, cfg: &Config) -> Result<TabSet, SchedulerError> {
    let titles = store.tab_titles().map_err(SchedulerError::Store)?;
    let open = resolve_title(&titles, &cfg.open_tab)
        .ok_or_else(|| SchedulerError::UnknownTarget(cfg.open_tab.clone()))?;
    let capped = resolve_title(&titles, &cfg.capped_tab)
        .ok_or_else(|| SchedulerError::UnknownTarget(cfg.capped_tab.clone()))?;

    let oncall = if !cfg.oncall_override.trim().is_empty() {
        resolve_title(&titles, &cfg.oncall_override)
    } else {
        let right_of_open = titles
            .iter()
            .position(|t| *t == open)
            .and_then(|i| {
                titles[i + 1..]
                    .iter()
                    .find(|t| !cfg.is_bookkeeping_tab(t) && **t != capped)
            })
            .cloned();
        right_of_open.or_else(|| {
            titles
                .iter()
                .find(|t| ONCALL_TITLE_RE.is_match(t))
                .cloned()
        })
    };
    Ok(TabSet {
        open,
        capped,
        oncall,
    })
}

/// Does a title read like an on-call rotation tab?
pub fn looks_like_oncall(title: &str) -> bool {
    ONCALL_TITLE_RE.is_match(title)
}

/// Fresh weekly total across all tabs, uncapped. This is the number the
/// ceiling gate compares against; it must never come from a cache.
pub fn total_hours(
    store: &mut dyn GridStore,
    cfg: &Config,
    tabs: &TabSet,
    person: &str,
) -> Result<f64, SchedulerError> {
    let key = name_key(person);
    let mut total = 0.0;
    for tab in [&tabs.open, &tabs.capped] {
        let grid = crate::store::with_backoff(cfg.retry, "read capacity tab", || {
            store.read_region(tab)
        })?;
        total += half_hour_total(&grid, &key);
    }
    if let Some(oncall) = &tabs.oncall {
        let grid =
            crate::store::with_backoff(cfg.retry, "read rotation tab", || store.read_region(oncall))?;
        total += fixed_block_total(&grid, &key);
    }
    Ok(total)
}

/// Minutes already held on one weekday, for the daily ceiling. Tabs
/// whose day column cannot be resolved are skipped; an unreadable tab
/// must not block an otherwise valid request.
pub fn minutes_on_day(
    store: &mut dyn GridStore,
    cfg: &Config,
    tabs: &TabSet,
    person: &str,
    day: Weekday,
) -> Result<u32, SchedulerError> {
    let key = name_key(person);
    let mut minutes = 0u32;

    for tab in [&tabs.open, &tabs.capped] {
        let grid = crate::store::with_backoff(cfg.retry, "read capacity tab", || {
            store.read_region(tab)
        })?;
        let Some(col) = resolve_day_column(&grid, day) else {
            warn!(tab = %tab, "day column unresolved; tab skipped for daily total");
            continue;
        };
        for band in index_bands(&grid) {
            let held = band
                .lane_rows
                .clone()
                .any(|r| cell_mentions_person(grid.cell(r, col), &key));
            if held {
                minutes += 30;
            }
        }
    }

    if let Some(oncall) = &tabs.oncall {
        let grid =
            crate::store::with_backoff(cfg.retry, "read rotation tab", || store.read_region(oncall))?;
        if let Some(col) = resolve_day_column(&grid, day) {
            for block in index_blocks(&grid, col) {
                let held = block
                    .lane_rows
                    .clone()
                    .any(|r| cell_mentions_person(grid.cell(r, col), &key));
                if held {
                    minutes += block.minutes().max(0) as u32;
                }
            }
        }
    }
    Ok(minutes)
}

/// Epoch-gated cache of display totals. Mutations bump the epoch, so a
/// stale display total can never outlive the write that invalidated it.
#[derive(Debug, Default)]
pub struct HoursCache {
    epoch: u64,
    entries: HashMap<String, (u64, f64)>,
}

impl HoursCache {
    pub fn bump(&mut self) {
        self.epoch += 1;
        self.entries.clear();
    }

    pub fn get(&self, person_key: &str) -> Option<f64> {
        self.entries
            .get(person_key)
            .filter(|(e, _)| *e == self.epoch)
            .map(|&(_, h)| h)
    }

    pub fn put(&mut self, person_key: &str, hours: f64) {
        self.entries
            .insert(person_key.to_string(), (self.epoch, hours));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn mentions_split_and_strip_prefixes() {
        assert_eq!(canon_mention("OA: Jane Doe"), "jane doe");
        assert_eq!(canon_mention("On-Call: Jane Doe"), "jane doe");
        assert_eq!(canon_mention("  GOA:  Amy   Wu "), "amy wu");
        assert_eq!(
            cell_mentions("OA: Jane Doe, GOA: Amy Wu and Luis Ortega"),
            vec!["jane doe", "amy wu", "luis ortega"]
        );
        assert_eq!(cell_mentions("OA: Jane Doe\nOA: Amy Wu").len(), 2);
        assert!(cell_mentions("-").is_empty());
    }

    #[test]
    fn half_hours_count_every_lane_cell() {
        let g = Grid::from_rows(&[
            &["Time", "Monday", "Tuesday"],
            &["9:00 AM", "", ""],
            &["", "OA: Jane Doe", "OA: Jane Doe"],
            &["9:30 AM", "", ""],
            &["", "OA: Jane Doe, OA: Amy Wu", ""],
        ]);
        assert_eq!(half_hour_total(&g, "jane doe"), 1.5);
        assert_eq!(half_hour_total(&g, "amy wu"), 0.5);
        assert_eq!(half_hour_total(&g, "nobody"), 0.0);
    }

    #[test]
    fn fixed_blocks_rate_by_day_kind() {
        let g = Grid::from_rows(&[
            &["", "Monday", "Saturday"],
            &["", "7:00 AM – 12:00 PM", "8:00 AM – 12:00 PM"],
            &["", "OA: Jane Doe", "OA: Jane Doe"],
            &["", "", ""],
        ]);
        // one weekday mention (5h) + one weekend mention (4h)
        assert_eq!(fixed_block_total(&g, "jane doe"), 9.0);

        let headerless = Grid::from_rows(&[
            &["7:00 AM – 12:00 PM"],
            &["OA: Jane Doe"],
        ]);
        assert_eq!(fixed_block_total(&headerless, "jane doe"), 5.0);
    }

    #[test]
    fn titles_resolve_exact_then_prefix() {
        let titles = vec![
            "MC (OA and GOAs)".to_string(),
            "UNH (OA and GOAs)".to_string(),
            "On Call 9/8-9/14".to_string(),
        ];
        assert_eq!(
            resolve_title(&titles, "mc (oa and goas)").as_deref(),
            Some("MC (OA and GOAs)")
        );
        assert_eq!(
            resolve_title(&titles, "UNH").as_deref(),
            Some("UNH (OA and GOAs)")
        );
        assert_eq!(resolve_title(&titles, "Quad"), None);
        assert!(looks_like_oncall("On Call 9/8-9/14"));
        assert!(looks_like_oncall("ON-CALL rotation"));
        assert!(!looks_like_oncall("MC (OA and GOAs)"));
    }

    fn three_tab_store() -> (MemoryStore, Config) {
        let cfg = Config::default();
        let store = MemoryStore::new()
            .with_tab(
                "MC (OA and GOAs)",
                &[
                    &["Time", "Monday"],
                    &["9:00 AM", ""],
                    &["", "OA: Jane Doe"],
                ],
            )
            .with_tab(
                "On Call 9/8-9/14",
                &[
                    &["", "Monday"],
                    &["", "7:00 AM – 12:00 PM"],
                    &["", "OA: Jane Doe"],
                ],
            )
            .with_tab(
                "UNH (OA and GOAs)",
                &[
                    &["Time", "Monday"],
                    &["9:00 AM", ""],
                    &["", "OA: Jane Doe"],
                ],
            );
        (store, cfg)
    }

    #[test]
    fn tab_set_discovers_the_rotation_tab() {
        let (mut store, cfg) = three_tab_store();
        let tabs = tab_set(&mut store, &cfg).unwrap();
        assert_eq!(tabs.open, "MC (OA and GOAs)");
        assert_eq!(tabs.capped, "UNH (OA and GOAs)");
        // right-neighbor of the open tab, capped tab excluded
        assert_eq!(tabs.oncall.as_deref(), Some("On Call 9/8-9/14"));
    }

    #[test]
    fn oncall_override_wins() {
        let (mut store, mut cfg) = three_tab_store();
        cfg.oncall_override = "On Call 9/8-9/14".into();
        let tabs = tab_set(&mut store, &cfg).unwrap();
        assert_eq!(tabs.oncall.as_deref(), Some("On Call 9/8-9/14"));
    }

    #[test]
    fn weekly_total_spans_all_tabs() {
        let (mut store, cfg) = three_tab_store();
        let tabs = tab_set(&mut store, &cfg).unwrap();
        // 0.5h (MC) + 0.5h (UNH) + 5h (weekday block)
        let total = total_hours(&mut store, &cfg, &tabs, "Jane Doe").unwrap();
        assert_eq!(total, 6.0);
    }

    #[test]
    fn daily_minutes_combine_bands_and_blocks() {
        let (mut store, cfg) = three_tab_store();
        let tabs = tab_set(&mut store, &cfg).unwrap();
        let mins = minutes_on_day(&mut store, &cfg, &tabs, "Jane Doe", Weekday::Mon).unwrap();
        // 30 (MC band) + 30 (UNH band) + 300 (7:00 AM – 12:00 PM block)
        assert_eq!(mins, 360);
    }

    #[test]
    fn cache_invalidates_on_bump() {
        let mut cache = HoursCache::default();
        cache.put("jane doe", 6.0);
        assert_eq!(cache.get("jane doe"), Some(6.0));
        cache.bump();
        assert_eq!(cache.get("jane doe"), None);
    }
}
