use chrono::NaiveTime;
use serde::Deserialize;

use crate::store::Retry;

/// Engine configuration: tab names, role prefixes, ceilings and scan
/// bounds. `Default` mirrors the production workbook layout; the CLI can
/// override any field from a JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capacity tab with the open-lane policy ("main campus").
    pub open_tab: String,
    /// Capacity tab with the numeric-cap policy.
    pub capped_tab: String,
    /// Explicit fixed-block tab title; when empty the tab to the right
    /// of the open tab is used.
    pub oncall_override: String,
    pub roster_tab: String,
    pub roster_name_header: String,
    pub audit_tab: String,
    pub locks_tab: String,

    /// Primary role tag written into cells ("OA: <name>").
    pub role_prefix: String,
    /// Secondary role tag recognized when matching cells.
    pub lead_prefix: String,

    /// Per-band lane cap on the capped tab.
    pub per_slot_cap: u32,
    pub weekly_cap_hours: f64,
    pub daily_cap_minutes: u32,
    /// Requests shorter than this many minutes are rerouted away from
    /// the fixed-block tab.
    pub min_oncall_minutes: u32,

    pub day_start: NaiveTime,
    pub day_end: NaiveTime,

    pub lock_ttl_secs: i64,
    pub retry: Retry,

    /// Column bound for the header scan embedded in resolution errors.
    pub header_max_cols: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            open_tab: "MC (OA and GOAs)".into(),
            capped_tab: "UNH (OA and GOAs)".into(),
            oncall_override: String::new(),
            roster_tab: "(Names of hired OAs)".into(),
            roster_name_header: "Name (OAs)".into(),
            audit_tab: "Audit Log".into(),
            locks_tab: "_Locks".into(),
            role_prefix: "OA:".into(),
            lead_prefix: "GOA:".into(),
            per_slot_cap: 2,
            weekly_cap_hours: 20.0,
            daily_cap_minutes: 8 * 60,
            min_oncall_minutes: 3 * 60,
            day_start: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            day_end: NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            lock_ttl_secs: 90,
            retry: Retry::default(),
            header_max_cols: 80,
        }
    }
}

impl Config {
    /// Tabs that are bookkeeping, never schedule grids.
    pub fn is_bookkeeping_tab(&self, title: &str) -> bool {
        let low = title.trim().to_lowercase();
        low == self.locks_tab.trim().to_lowercase()
            || low == self.audit_tab.trim().to_lowercase()
            || low == self.roster_tab.trim().to_lowercase()
    }
}
