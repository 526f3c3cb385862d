//! Mutation engine: validates a request, resolves its target grid,
//! gates it against hour ceilings and slot capacity, arbitrates with
//! the lock ledger, and only then writes — re-resolving the column and
//! re-checking each lane against a fresh snapshot so a stale pre-check
//! can never clobber someone else's cell.

use chrono::{Datelike, Duration as ChronoDuration, Local, NaiveDate, NaiveTime, Utc, Weekday};
use tracing::{info, warn};

use crate::config::Config;
use crate::daytime::{canon_day, day_title, fmt_time, validate_window, Window};
use crate::error::SchedulerError;
use crate::grid::bands::{band_map, block_listing, find_block};
use crate::grid::capacity::{band_for_tick, first_open_lane, occupied_lanes};
use crate::grid::{
    evaluate_block, evaluate_window, index_bands, validate_ladder, CapacityPolicy, Grid,
};
use crate::hours::{
    looks_like_oncall, minutes_on_day, tab_set, total_hours, HoursCache, TabSet,
};
use crate::locks::{acquire, lock_key, release, LockOutcome};
use crate::roster::{name_key, Roster};
use crate::store::{with_backoff, GridStore};

/// Which scheduling regime a tab runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabKind {
    Open,
    Capped,
    FixedBlock,
}

/// One requested shift position, as the user phrased it.
#[derive(Debug, Clone)]
pub struct Slot {
    pub target: String,
    pub day: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

#[derive(Debug, Clone)]
pub struct ShiftRequest {
    pub person: String,
    pub slot: Slot,
}

#[derive(Debug, Clone)]
pub struct ChangeRequest {
    pub person: String,
    pub old: Slot,
    pub new: Slot,
}

/// What a successful mutation did, for the caller's confirmation line.
#[derive(Debug, Clone)]
pub struct MutationSummary {
    pub person: String,
    pub tab: String,
    pub day: Weekday,
    pub window_label: String,
    pub weekly_hours: f64,
}

const OPEN_ALIASES: [&str; 4] = ["mc", "main", "main campus", "maincampus"];
const CAPPED_ALIASES: [&str; 5] = ["unh", "u hall", "uhall", "uh", "hall"];
const ONCALL_ALIASES: [&str; 3] = ["oncall", "on call", "oc"];

fn norm_target(input: &str) -> String {
    let folded: String = input
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    name_key(&folded)
}

fn alias_hit(norm: &str, aliases: &[&str]) -> bool {
    let padded = format!(" {norm} ");
    aliases.iter().any(|a| padded.contains(&format!(" {a} ")))
}

/// Classify a user-supplied target ("UNH", "main campus", "on-call",
/// or a full tab title) into a tab kind.
pub fn parse_target(input: &str) -> Result<TabKind, SchedulerError> {
    let norm = norm_target(input);
    if norm.is_empty() {
        return Err(SchedulerError::InvalidRequest(
            "No campus/tab given; say where the shift goes.".into(),
        ));
    }
    if alias_hit(&norm, &ONCALL_ALIASES) {
        return Ok(TabKind::FixedBlock);
    }
    if alias_hit(&norm, &CAPPED_ALIASES) {
        return Ok(TabKind::Capped);
    }
    if alias_hit(&norm, &OPEN_ALIASES) {
        return Ok(TabKind::Open);
    }
    Err(SchedulerError::UnknownTarget(input.trim().to_string()))
}

/// Predicted title of the current rotation tab: the week runs Sunday
/// through Saturday and the tab is named "On Call M/D-M/D".
pub fn predicted_oncall_title(today: NaiveDate) -> String {
    let back = today.weekday().num_days_from_sunday();
    let sunday = today - ChronoDuration::days(i64::from(back));
    let saturday = sunday + ChronoDuration::days(6);
    format!(
        "On Call {}/{}-{}/{}",
        sunday.month(),
        sunday.day(),
        saturday.month(),
        saturday.day()
    )
}

fn fmt_hm(minutes: u32) -> String {
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

pub struct Engine<S: GridStore> {
    store: S,
    cfg: Config,
    hours: HoursCache,
}

impl<S: GridStore> Engine<S> {
    pub fn new(store: S, cfg: Config) -> Self {
        Engine {
            store,
            cfg,
            hours: HoursCache::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn read_grid(&mut self, tab: &str) -> Result<Grid, SchedulerError> {
        let retry = self.cfg.retry;
        Ok(with_backoff(retry, "read tab", || {
            self.store.read_region(tab)
        })?)
    }

    fn resolve_col(&self, grid: &Grid, tab: &str, day: Weekday) -> Result<usize, SchedulerError> {
        crate::grid::resolve_day_column(grid, day).ok_or_else(|| SchedulerError::DayUnresolved {
            tab: tab.to_string(),
            day: day_title(day).to_string(),
            scan: grid.day_cell_scan(40, self.cfg.header_max_cols),
        })
    }

    fn canon_request(
        &mut self,
        person: &str,
        slot: &Slot,
    ) -> Result<(String, Weekday, Window, TabKind), SchedulerError> {
        let roster = Roster::load(&mut self.store, &self.cfg)?;
        let person = roster.canonical(person)?.to_string();
        let day = canon_day(&slot.day).ok_or_else(|| {
            SchedulerError::InvalidRequest(format!("'{}' is not a weekday I know.", slot.day))
        })?;
        let window = validate_window(slot.start, slot.end, &self.cfg)?;
        let kind = parse_target(&slot.target)?;
        Ok((person, day, window, kind))
    }

    /// Sub-shift requests on the rotation are quietly rerouted to the
    /// capped tab, where the half-hour ladder can actually hold them.
    fn reroute(&self, kind: TabKind, window: &Window) -> TabKind {
        if kind == TabKind::FixedBlock && window.minutes() < self.cfg.min_oncall_minutes {
            info!(
                minutes = window.minutes(),
                "window too short for a rotation block; rerouting to the capped tab"
            );
            TabKind::Capped
        } else {
            kind
        }
    }

    /// Rotation tabs worth trying, most-likely first: exact match on
    /// the predicted weekly title, then the discovered rotation tab,
    /// then anything whose title reads like an on-call tab.
    fn oncall_candidates(&mut self, tabs: &TabSet) -> Result<Vec<String>, SchedulerError> {
        let retry = self.cfg.retry;
        let titles = with_backoff(retry, "list tabs", || self.store.tab_titles())?;
        let predicted = predicted_oncall_title(Local::now().date_naive());
        let mut out: Vec<String> = Vec::new();
        if let Some(t) = titles
            .iter()
            .find(|t| t.trim().eq_ignore_ascii_case(predicted.trim()))
        {
            out.push(t.clone());
        }
        if let Some(t) = &tabs.oncall {
            if !out.contains(t) {
                out.push(t.clone());
            }
        }
        for t in &titles {
            if looks_like_oncall(t) && !out.contains(t) {
                out.push(t.clone());
            }
        }
        if out.is_empty() {
            return Err(SchedulerError::UnknownTarget("on call".into()));
        }
        Ok(out)
    }

    /// Pick the rotation tab that actually carries the requested block:
    /// for an add (`holder` is `None`) the block must have a free lane,
    /// for a remove it must hold the person. Candidates that fail are
    /// skipped, and the first near-miss shapes the error.
    fn select_block_tab(
        &mut self,
        tabs: &TabSet,
        day: Weekday,
        window: &Window,
        holder: Option<&str>,
    ) -> Result<String, SchedulerError> {
        let candidates = self.oncall_candidates(tabs)?;
        let holder_key = holder.map(name_key);
        let mut near_miss: Option<String> = None;
        let mut full_reason: Option<(String, String)> = None;
        let mut listing: Option<(String, usize, String)> = None;
        let mut day_fail: Option<(String, String)> = None;

        for tab in &candidates {
            let grid = self.read_grid(tab)?;
            let Some(col) = crate::grid::resolve_day_column(&grid, day) else {
                if day_fail.is_none() {
                    day_fail = Some((
                        tab.clone(),
                        grid.day_cell_scan(40, self.cfg.header_max_cols),
                    ));
                }
                continue;
            };
            if listing.is_none() {
                listing = Some((tab.clone(), col, block_listing(&grid, col)));
            }
            let Some(block) = find_block(&grid, col, window.start(), window.end_clock()) else {
                continue;
            };
            match &holder_key {
                None => match evaluate_block(&grid, &block, col) {
                    None => return Ok(tab.clone()),
                    Some(reason) => {
                        if full_reason.is_none() {
                            full_reason = Some((tab.clone(), reason));
                        }
                    }
                },
                Some(key) => {
                    let held = block
                        .lane_rows
                        .clone()
                        .any(|r| mentions(&grid, r, col, key));
                    if held {
                        return Ok(tab.clone());
                    }
                    if near_miss.is_none() {
                        near_miss = Some(tab.clone());
                    }
                }
            }
        }

        if let Some((tab, reasons)) = full_reason {
            return Err(SchedulerError::SlotFull { tab, reasons });
        }
        if let (Some(tab), Some(person)) = (near_miss, holder) {
            return Err(SchedulerError::NotInBlock {
                person: person.to_string(),
                start: window.start_label(),
                end: window.end_label(),
                tab,
            });
        }
        if let Some((tab, col, blocks)) = listing {
            return Err(SchedulerError::BlockNotFound {
                tab,
                start: window.start_label(),
                end: window.end_label(),
                col,
                blocks,
            });
        }
        let (tab, scan) = day_fail.unwrap_or_else(|| (candidates[0].clone(), String::new()));
        Err(SchedulerError::DayUnresolved {
            tab,
            day: day_title(day).to_string(),
            scan,
        })
    }

    fn check_ceilings(
        &mut self,
        tabs: &TabSet,
        person: &str,
        day: Weekday,
        window: &Window,
    ) -> Result<(), SchedulerError> {
        let have = total_hours(&mut self.store, &self.cfg, tabs, person)?;
        let want = window.hours();
        if have + want > self.cfg.weekly_cap_hours {
            return Err(SchedulerError::WeeklyCeiling {
                cap: self.cfg.weekly_cap_hours,
                have,
                want,
            });
        }
        let held = minutes_on_day(&mut self.store, &self.cfg, tabs, person, day)?;
        if held + window.minutes() > self.cfg.daily_cap_minutes {
            return Err(SchedulerError::DailyCeiling {
                day: day_title(day).to_string(),
                have: fmt_hm(held),
                want: fmt_hm(window.minutes()),
            });
        }
        Ok(())
    }

    pub fn add(&mut self, req: &ShiftRequest) -> Result<MutationSummary, SchedulerError> {
        let (person, day, window, kind) = self.canon_request(&req.person, &req.slot)?;
        let tabs = tab_set(&mut self.store, &self.cfg)?;
        let kind = self.reroute(kind, &window);

        self.check_ceilings(&tabs, &person, day, &window)?;

        let (tab, policy) = match kind {
            TabKind::Open => (tabs.open.clone(), CapacityPolicy::OpenLane),
            TabKind::Capped => (
                tabs.capped.clone(),
                CapacityPolicy::NumericCap(self.cfg.per_slot_cap),
            ),
            TabKind::FixedBlock => (
                self.select_block_tab(&tabs, day, &window, None)?,
                CapacityPolicy::ExclusiveBlock,
            ),
        };

        // Advisory pre-check on the current snapshot: cheap rejection
        // with reasons before any lock traffic. The fixed-block case was
        // already checked during tab selection.
        if kind != TabKind::FixedBlock {
            let grid = self.read_grid(&tab)?;
            let col = self.resolve_col(&grid, &tab, day)?;
            let bands = index_bands(&grid);
            validate_ladder(&tab, &bands)?;
            let bands = band_map(&bands);
            let reasons = evaluate_window(&grid, &bands, col, policy, &window.ticks());
            if !reasons.is_empty() {
                let mut text = reasons.join("; ");
                if let Some(next) = suggest_window(&grid, &bands, col, policy, &window) {
                    text.push_str(&format!("; next open window: {next}"));
                }
                return Err(SchedulerError::SlotFull { tab, reasons: text });
            }
        }

        // Arbitrate, then redo everything against a fresh snapshot.
        let key = lock_key(&tab, day, &window.start_label(), &window.end_label());
        let person_key = name_key(&person);
        let outcome = acquire(&mut self.store, &self.cfg, &key, &person_key)?;
        if !outcome.won {
            return Err(SchedulerError::LockLost);
        }
        let value = format!("{} {person}", self.cfg.role_prefix);
        let written = self.apply_add(&tab, kind, policy, day, &window, &value);
        self.release_claim(&outcome);
        written?;

        self.hours.bump();
        self.audit(&person, "add", &tab, day, &window.label());
        let weekly_hours = total_hours(&mut self.store, &self.cfg, &tabs, &person)?;
        self.hours.put(&person_key, weekly_hours);
        Ok(MutationSummary {
            person,
            tab,
            day,
            window_label: window.label(),
            weekly_hours,
        })
    }

    /// The write phase of an add, run only while holding the lock.
    /// Everything is re-derived from a fresh snapshot, including the
    /// ladder validation, so corruption after the pre-check still fails
    /// loudly instead of being written into.
    fn apply_add(
        &mut self,
        tab: &str,
        kind: TabKind,
        policy: CapacityPolicy,
        day: Weekday,
        window: &Window,
        value: &str,
    ) -> Result<(), SchedulerError> {
        let mut grid = self.read_grid(tab)?;
        let col = self.resolve_col(&grid, tab, day)?;
        match kind {
            TabKind::FixedBlock => {
                let block = find_block(&grid, col, window.start(), window.end_clock())
                    .ok_or_else(|| SchedulerError::BlockNotFound {
                        tab: tab.to_string(),
                        start: window.start_label(),
                        end: window.end_label(),
                        col,
                        blocks: block_listing(&grid, col),
                    })?;
                let row = first_open_lane(&grid, block.lane_rows.clone(), col).ok_or_else(|| {
                    SchedulerError::LaneTaken {
                        label: block.label(),
                    }
                })?;
                self.write_one(tab, row, col, value)
            }
            TabKind::Open | TabKind::Capped => {
                validate_ladder(tab, &index_bands(&grid))?;
                self.write_window(tab, &mut grid, col, policy, window, value)
            }
        }
    }

    /// Write every tick of the window, re-checking band, cap and lane
    /// against the fresh snapshot. A failed tick blanks everything the
    /// call already wrote so a half-placed shift never survives.
    fn write_window(
        &mut self,
        tab: &str,
        grid: &mut Grid,
        col: usize,
        policy: CapacityPolicy,
        window: &Window,
        value: &str,
    ) -> Result<(), SchedulerError> {
        let bands = band_map(&index_bands(grid));
        let mut written: Vec<(usize, usize)> = Vec::new();
        for tick in window.ticks() {
            let label = fmt_time(tick);
            let outcome = (|| {
                let band = band_for_tick(&bands, tick)
                    .ok_or(SchedulerError::LaneTaken {
                        label: label.clone(),
                    })?;
                if let CapacityPolicy::NumericCap(cap) = policy {
                    if occupied_lanes(grid, band, col) >= cap as usize {
                        return Err(SchedulerError::LaneTaken {
                            label: label.clone(),
                        });
                    }
                }
                first_open_lane(grid, band.lane_rows.clone(), col).ok_or(
                    SchedulerError::LaneTaken {
                        label: label.clone(),
                    },
                )
            })();
            let row = match outcome {
                Ok(row) => row,
                Err(e) => {
                    self.rollback(tab, &written);
                    return Err(e);
                }
            };
            if let Err(e) = self.write_one(tab, row, col, value) {
                self.rollback(tab, &written);
                return Err(e);
            }
            grid.set_cell(row, col, value);
            written.push((row, col));
        }
        Ok(())
    }

    fn write_one(&mut self, tab: &str, row: usize, col: usize, value: &str) -> Result<(), SchedulerError> {
        let retry = self.cfg.retry;
        Ok(with_backoff(retry, "write cell", || {
            self.store.write_cell(tab, row + 1, col + 1, value)
        })?)
    }

    fn rollback(&mut self, tab: &str, written: &[(usize, usize)]) {
        for &(row, col) in written {
            if let Err(e) = self.store.write_cell(tab, row + 1, col + 1, "") {
                warn!(tab, row = row + 1, col = col + 1, error = %e, "rollback blanking failed");
            }
        }
    }

    /// Resolve the claim once the operation finished, so the next
    /// request on the same window does not wait out the TTL. Purely an
    /// optimization; a failure here only delays later claimants.
    fn release_claim(&mut self, outcome: &LockOutcome) {
        if let Some(row) = outcome.claim_row {
            if let Err(e) = release(&mut self.store, &self.cfg, row) {
                warn!(error = %e, "lock release failed");
            }
        }
    }

    pub fn remove(&mut self, req: &ShiftRequest) -> Result<MutationSummary, SchedulerError> {
        let (person, day, window, kind) = self.canon_request(&req.person, &req.slot)?;
        let tabs = tab_set(&mut self.store, &self.cfg)?;
        let kind = self.reroute(kind, &window);
        let person_key = name_key(&person);

        let tab = match kind {
            TabKind::Open => tabs.open.clone(),
            TabKind::Capped => tabs.capped.clone(),
            TabKind::FixedBlock => {
                self.select_block_tab(&tabs, day, &window, Some(person.as_str()))?
            }
        };

        let key = lock_key(&tab, day, &window.start_label(), &window.end_label());
        let outcome = acquire(&mut self.store, &self.cfg, &key, &person_key)?;
        if !outcome.won {
            return Err(SchedulerError::LockLost);
        }
        let blanked = self.apply_remove(&tab, kind, day, &window, &person, &person_key);
        self.release_claim(&outcome);
        blanked?;

        self.hours.bump();
        self.audit(&person, "remove", &tab, day, &window.label());
        let weekly_hours = total_hours(&mut self.store, &self.cfg, &tabs, &person)?;
        self.hours.put(&person_key, weekly_hours);
        Ok(MutationSummary {
            person,
            tab,
            day,
            window_label: window.label(),
            weekly_hours,
        })
    }

    fn apply_remove(
        &mut self,
        tab: &str,
        kind: TabKind,
        day: Weekday,
        window: &Window,
        person: &str,
        person_key: &str,
    ) -> Result<(), SchedulerError> {
        let grid = self.read_grid(tab)?;
        let col = self.resolve_col(&grid, tab, day)?;
        match kind {
            TabKind::FixedBlock => {
                let block = find_block(&grid, col, window.start(), window.end_clock())
                    .ok_or_else(|| SchedulerError::BlockNotFound {
                        tab: tab.to_string(),
                        start: window.start_label(),
                        end: window.end_label(),
                        col,
                        blocks: block_listing(&grid, col),
                    })?;
                let holding: Vec<usize> = block
                    .lane_rows
                    .clone()
                    .filter(|&r| mentions(&grid, r, col, person_key))
                    .collect();
                if holding.is_empty() {
                    return Err(SchedulerError::NotInBlock {
                        person: person.to_string(),
                        start: window.start_label(),
                        end: window.end_label(),
                        tab: tab.to_string(),
                    });
                }
                for row in holding {
                    self.write_one(tab, row, col, "")?;
                }
            }
            TabKind::Open | TabKind::Capped => {
                // Tolerant by design: ticks the person never held are
                // logged and skipped, so a remove is safe to repeat.
                let bands = band_map(&index_bands(&grid));
                for tick in window.ticks() {
                    let label = fmt_time(tick);
                    let Some(band) = band_for_tick(&bands, tick) else {
                        warn!(tab = %tab, %label, "no band for tick; skipped");
                        continue;
                    };
                    let holding: Vec<usize> = band
                        .lane_rows
                        .clone()
                        .filter(|&r| mentions(&grid, r, col, person_key))
                        .collect();
                    if holding.is_empty() {
                        warn!(tab = %tab, %label, person = %person, "nothing to remove at tick");
                        continue;
                    }
                    for row in holding {
                        self.write_one(tab, row, col, "")?;
                    }
                }
            }
        }
        Ok(())
    }

    /// A change is a remove followed by an add. If the add fails, the
    /// original window is re-added; only when that compensation also
    /// fails does the schedule need a human.
    pub fn change(&mut self, req: &ChangeRequest) -> Result<MutationSummary, SchedulerError> {
        self.remove(&ShiftRequest {
            person: req.person.clone(),
            slot: req.old.clone(),
        })?;
        match self.add(&ShiftRequest {
            person: req.person.clone(),
            slot: req.new.clone(),
        }) {
            Ok(summary) => Ok(summary),
            Err(add_err) => {
                let restore = self.add(&ShiftRequest {
                    person: req.person.clone(),
                    slot: req.old.clone(),
                });
                match restore {
                    Ok(_) => Err(SchedulerError::ChangeReverted {
                        reason: add_err.to_string(),
                    }),
                    Err(restore_err) => Err(SchedulerError::CompensationFailed {
                        add: add_err.to_string(),
                        restore: restore_err.to_string(),
                    }),
                }
            }
        }
    }

    /// Weekly total for display, capped at the ceiling. Serves from the
    /// epoch cache when nothing has changed since the last mutation.
    pub fn display_hours(&mut self, person: &str) -> Result<f64, SchedulerError> {
        let roster = Roster::load(&mut self.store, &self.cfg)?;
        let person = roster.canonical(person)?.to_string();
        let key = name_key(&person);
        let total = match self.hours.get(&key) {
            Some(cached) => cached,
            None => {
                let tabs = tab_set(&mut self.store, &self.cfg)?;
                let fresh = total_hours(&mut self.store, &self.cfg, &tabs, &person)?;
                self.hours.put(&key, fresh);
                fresh
            }
        };
        Ok(total.min(self.cfg.weekly_cap_hours))
    }

    /// Audit rows are informational; a failed append never fails the
    /// mutation it describes.
    fn audit(&mut self, person: &str, action: &str, tab: &str, day: Weekday, window: &str) {
        let result = (|| {
            self.store.create_tab(&self.cfg.audit_tab)?;
            let grid = self.store.read_region(&self.cfg.audit_tab)?;
            if grid.is_empty() {
                self.store.append_row(
                    &self.cfg.audit_tab,
                    &["ISOTime", "Action", "Tab", "Day", "Window", "Person"]
                        .map(str::to_string),
                )?;
            }
            self.store.append_row(
                &self.cfg.audit_tab,
                &[
                    Utc::now().to_rfc3339(),
                    action.to_string(),
                    tab.to_string(),
                    day_title(day).to_string(),
                    window.to_string(),
                    person.to_string(),
                ],
            )
        })();
        if let Err(e) = result {
            warn!(error = %e, "audit append failed");
        }
    }
}

fn mentions(grid: &Grid, row: usize, col: usize, person_key: &str) -> bool {
    crate::hours::cell_mentions(grid.cell(row, col))
        .iter()
        .any(|m| m == person_key)
}

/// Scan forward in 30-minute steps for the nearest window of the same
/// length that would currently be admitted; purely advisory.
fn suggest_window(
    grid: &Grid,
    bands: &std::collections::HashMap<String, crate::grid::Band>,
    col: usize,
    policy: CapacityPolicy,
    window: &Window,
) -> Option<String> {
    for k in 1..=16i64 {
        let delta = ChronoDuration::minutes(30 * k);
        let ticks: Vec<NaiveTime> = window.ticks().iter().map(|t| *t + delta).collect();
        if evaluate_window(grid, bands, col, policy, &ticks).is_empty() {
            let start = window.start() + delta;
            let end = start + ChronoDuration::minutes(i64::from(window.minutes()));
            return Some(format!("{}–{}", fmt_time(start), fmt_time(end)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_aliases_classify() {
        assert_eq!(parse_target("MC").unwrap(), TabKind::Open);
        assert_eq!(parse_target("main campus").unwrap(), TabKind::Open);
        assert_eq!(parse_target("UNH (OA and GOAs)").unwrap(), TabKind::Capped);
        assert_eq!(parse_target("u hall").unwrap(), TabKind::Capped);
        assert_eq!(parse_target("on-call").unwrap(), TabKind::FixedBlock);
        assert_eq!(parse_target("oc").unwrap(), TabKind::FixedBlock);
        assert!(matches!(
            parse_target("the quad"),
            Err(SchedulerError::UnknownTarget(_))
        ));
        assert!(matches!(
            parse_target("  "),
            Err(SchedulerError::InvalidRequest(_))
        ));
    }

    #[test]
    fn predicted_rotation_title_runs_sunday_to_saturday() {
        // 2025-09-10 is a Wednesday; its week is Sun 9/7 – Sat 9/13.
        let d = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
        assert_eq!(predicted_oncall_title(d), "On Call 9/7-9/13");
        // a Sunday anchors its own week
        let sun = NaiveDate::from_ymd_opt(2025, 9, 7).unwrap();
        assert_eq!(predicted_oncall_title(sun), "On Call 9/7-9/13");
        // month boundary
        let d = NaiveDate::from_ymd_opt(2025, 8, 31).unwrap();
        assert_eq!(predicted_oncall_title(d), "On Call 8/31-9/6");
    }

    #[test]
    fn hour_minute_formatting() {
        assert_eq!(fmt_hm(450), "7h 30m");
        assert_eq!(fmt_hm(30), "0h 30m");
        assert_eq!(fmt_hm(480), "8h 00m");
    }
}
