//! `tally-infra`
//!
//! **Responsibility:** running account syncs.
//!
//! - [`jobs`]: job types, the job store, the worker pool and the queue façade
//! - [`sync`]: the aggregator port, the retry classifier and the job handler
//!   that writes into the ledger
//! - [`ledger_store`]: ledger storage adapters
//! - [`config`]: settings from the environment

pub mod config;
pub mod jobs;
pub mod ledger_store;
pub mod sync;


pub use config::{ConfigError, SyncSettings};
