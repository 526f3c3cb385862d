//! Grid-side scheduling for a shared shift workbook: weekday column
//! resolution over loosely structured tabs, time-band and fixed-block
//! indexing, capacity policies, advisory first-come-first-served
//! locking, and the add/remove/change mutation engine with weekly and
//! daily hour ceilings.

pub mod config;
pub mod csv_store;
pub mod daytime;
pub mod engine;
pub mod error;
pub mod grid;
pub mod hours;
pub mod locks;
pub mod roster;
pub mod store;

pub use config::Config;
pub use csv_store::CsvStore;
pub use engine::{ChangeRequest, Engine, MutationSummary, ShiftRequest, Slot, TabKind};
pub use error::{SchedulerError, StoreError};
pub use grid::{CapacityPolicy, Grid};
pub use roster::Roster;
pub use store::{GridStore, MemoryStore};
