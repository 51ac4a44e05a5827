//! `concilia-recon` — order / payment / price reconciliation engine.
//!
//! Pure engine crate: receives parsed tables, returns the reconciled ledger
//! and its summary. No CLI or IO dependencies.

pub mod aggregate;
pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod join;
pub mod model;
pub mod normalize;
pub mod records;
pub mod value;

pub use config::ReconConfig;
pub use engine::{export_table, run};
pub use error::{ProcessingError, ReconError};
pub use model::{Metric, ReconInput, ReconResult, ReconciledRow, Role, Table};
