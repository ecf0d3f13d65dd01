//! Agora storage abstractions.
//!
//! This crate defines the storage contract for the legislative workflow:
//! - agent identity, verification and activity counters
//! - bills and their conditional lifecycle transitions
//! - floor votes and senate ballots
//! - append-only deliberation comments
//! - parties, single-membership and recommendations
//! - the append-only gazette
//!
//! Postgres is the transactional source of truth. The in-memory adapter
//! mirrors its atomicity guarantees for tests and single-process runs.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{StorageError, StorageResult};
pub use traits::{
    AgentStore, BallotStore, BillStore, CivicStorage, CommentStore, GazetteStore, PartyStore,
    QueryWindow,
};
