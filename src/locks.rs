//! Advisory first-come-first-served locking over an append-only ledger
//! tab. Claimants append a timestamped row, read the ledger back, and
//! the earliest live claim for the key wins. Completed operations mark
//! their claim done so later claimants stop contending with it; losing
//! is cheap, the caller just reports a conflict and the user resubmits.

use chrono::Weekday;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::Config;
use crate::daytime::day_name;
use crate::error::StoreError;
use crate::store::GridStore;

pub const LEDGER_HEADER: [&str; 4] = ["Key", "Actor", "ISOTime", "Status"];

/// One lock key per (tab, day, window); all claimants for the same
/// window contend on the same key.
pub fn lock_key(tab: &str, day: Weekday, start_label: &str, end_label: &str) -> String {
    format!("{tab}|{}|{start_label}-{end_label}", day_name(day))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockOutcome {
    pub won: bool,
    /// 0-based ledger row of the claim this call appended, when it
    /// could be read back.
    pub claim_row: Option<usize>,
}

fn ensure_ledger(store: &mut dyn GridStore, cfg: &Config) -> Result<(), StoreError> {
    store.create_tab(&cfg.locks_tab)?;
    let grid = store.read_region(&cfg.locks_tab)?;
    if grid.is_empty() {
        store.append_row(&cfg.locks_tab, &LEDGER_HEADER.map(str::to_string))?;
    }
    Ok(())
}

/// Claim `key` as `actor` at the current wall clock. The actor must be
/// stable across one caller's operations (the canonical person key):
/// a re-claim by the same actor matches its own earliest live entry
/// and wins, which is what lets an add be followed by a remove on the
/// same window inside the TTL.
pub fn acquire(
    store: &mut dyn GridStore,
    cfg: &Config,
    key: &str,
    actor: &str,
) -> Result<LockOutcome, StoreError> {
    acquire_at(store, cfg, key, actor, Utc::now())
}

/// Claim `key` as `actor` at an explicit instant.
///
/// Claims older than the TTL are treated as abandoned by a crashed
/// claimant and ignored, as are claims already resolved (`done` after a
/// completed operation, `lost` after a failed arbitration). If no claim
/// for the key survives the filters (clock skew, a ledger wiped
/// mid-claim), the claim fails closed rather than letting two writers
/// both believe they won.
pub fn acquire_at(
    store: &mut dyn GridStore,
    cfg: &Config,
    key: &str,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<LockOutcome, StoreError> {
    ensure_ledger(store, cfg)?;
    store.append_row(
        &cfg.locks_tab,
        &[
            key.to_string(),
            actor.to_string(),
            now.to_rfc3339(),
            "pending".to_string(),
        ],
    )?;

    let grid = store.read_region(&cfg.locks_tab)?;
    let ttl = Duration::seconds(cfg.lock_ttl_secs);

    // Live unresolved claims for this key, in ledger (insertion) order.
    let mut live: Vec<(usize, &str, DateTime<Utc>)> = Vec::new();
    let mut claim_row: Option<usize> = None;
    for r in 1..grid.row_count() {
        if grid.cell(r, 0) != key {
            continue;
        }
        let row_actor = grid.cell(r, 1);
        if row_actor == actor {
            claim_row = Some(r);
        }
        let status = grid.cell(r, 3).trim().to_ascii_lowercase();
        if status == "done" || status == "lost" {
            continue;
        }
        let Ok(ts) = DateTime::parse_from_rfc3339(grid.cell(r, 2)) else {
            warn!(row = r + 1, "unparseable ledger timestamp; row ignored");
            continue;
        };
        let ts = ts.with_timezone(&Utc);
        if now - ts <= ttl {
            live.push((r, row_actor, ts));
        }
    }

    // Earliest timestamp wins; stable sort keeps insertion order on ties.
    live.sort_by_key(|&(_, _, ts)| ts);
    let Some(&(_, winner, _)) = live.first() else {
        warn!(key, "no live claim survived the TTL filter; failing closed");
        return Ok(LockOutcome {
            won: false,
            claim_row,
        });
    };
    let won = winner == actor;
    debug!(key, actor, winner, won, "lock arbitration");

    // Status write-back is informational only; arbitration already
    // happened, so a failure here must not fail the claim.
    if let Some(r) = claim_row {
        let status = if won { "won" } else { "lost" };
        if let Err(e) = store.write_cell(&cfg.locks_tab, r + 1, 4, status) {
            warn!(error = %e, "lock status write-back failed");
        }
    }
    Ok(LockOutcome { won, claim_row })
}

/// Mark a claim resolved once its operation has finished (successfully
/// or not), so later claimants on the same key win without waiting out
/// the TTL.
pub fn release(store: &mut dyn GridStore, cfg: &Config, claim_row: usize) -> Result<(), StoreError> {
    store.write_cell(&cfg.locks_tab, claim_row + 1, 4, "done")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn key() -> String {
        lock_key("MC (OA and GOAs)", Weekday::Mon, "2:00 PM", "4:00 PM")
    }

    #[test]
    fn earliest_claim_wins() {
        let cfg = Config::default();
        let mut store = MemoryStore::new();
        let k = key();

        let first = acquire_at(&mut store, &cfg, &k, "alice", at(0)).unwrap();
        assert!(first.won);
        let second = acquire_at(&mut store, &cfg, &k, "bob", at(1)).unwrap();
        assert!(!second.won);
        let third = acquire_at(&mut store, &cfg, &k, "carol", at(2)).unwrap();
        assert!(!third.won);

        let ledger = store.snapshot(&cfg.locks_tab).unwrap();
        assert_eq!(ledger.cell(0, 0), "Key");
        assert_eq!(ledger.cell(1, 3), "won");
        assert_eq!(ledger.cell(2, 3), "lost");
        assert_eq!(ledger.cell(3, 3), "lost");
    }

    #[test]
    fn same_actor_reclaims_inside_the_ttl() {
        let cfg = Config::default();
        let mut store = MemoryStore::new();
        let k = key();

        let first = acquire_at(&mut store, &cfg, &k, "alice", at(0)).unwrap();
        assert!(first.won);
        // no release: alice's first claim is still live, but it is her
        // own, so the follow-up operation wins too
        let again = acquire_at(&mut store, &cfg, &k, "alice", at(5)).unwrap();
        assert!(again.won);
    }

    #[test]
    fn released_claims_stop_contending() {
        let cfg = Config::default();
        let mut store = MemoryStore::new();
        let k = key();

        let first = acquire_at(&mut store, &cfg, &k, "alice", at(0)).unwrap();
        assert!(first.won);
        release(&mut store, &cfg, first.claim_row.unwrap()).unwrap();

        // bob arrives well inside alice's TTL; her claim is done
        let second = acquire_at(&mut store, &cfg, &k, "bob", at(5)).unwrap();
        assert!(second.won);
    }

    #[test]
    fn unreleased_claims_still_block_other_actors() {
        let cfg = Config::default();
        let mut store = MemoryStore::new();
        let k = key();

        assert!(acquire_at(&mut store, &cfg, &k, "alice", at(0)).unwrap().won);
        // alice is mid-operation; bob must wait
        assert!(!acquire_at(&mut store, &cfg, &k, "bob", at(5)).unwrap().won);
    }

    #[test]
    fn stale_claims_expire() {
        let cfg = Config::default();
        let mut store = MemoryStore::new();
        let k = key();

        acquire_at(&mut store, &cfg, &k, "alice", at(0)).unwrap();
        // bob arrives long after alice's TTL ran out
        let late = acquire_at(&mut store, &cfg, &k, "bob", at(cfg.lock_ttl_secs + 60)).unwrap();
        assert!(late.won);
    }

    #[test]
    fn distinct_keys_do_not_contend() {
        let cfg = Config::default();
        let mut store = MemoryStore::new();
        let a = lock_key("MC", Weekday::Mon, "2:00 PM", "4:00 PM");
        let b = lock_key("MC", Weekday::Tue, "2:00 PM", "4:00 PM");
        assert!(acquire_at(&mut store, &cfg, &a, "alice", at(0)).unwrap().won);
        assert!(acquire_at(&mut store, &cfg, &b, "bob", at(1)).unwrap().won);
    }

    #[test]
    fn garbage_timestamps_are_skipped() {
        let cfg = Config::default();
        let mut store = MemoryStore::new();
        let k = key();
        acquire_at(&mut store, &cfg, &k, "alice", at(0)).unwrap();
        // corrupt alice's timestamp; bob should then win
        store.insert_tab(
            &cfg.locks_tab,
            &[
                &["Key", "Actor", "ISOTime", "Status"],
                &[k.as_str(), "alice", "not-a-time", "pending"],
            ],
        );
        let outcome = acquire_at(&mut store, &cfg, &k, "bob", at(1)).unwrap();
        assert!(outcome.won);
    }

    #[test]
    fn key_shape_is_stable() {
        assert_eq!(
            lock_key("MC", Weekday::Fri, "9:00 AM", "11:00 AM"),
            "MC|friday|9:00 AM-11:00 AM"
        );
    }
}
