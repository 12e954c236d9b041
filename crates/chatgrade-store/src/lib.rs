//! Chatgrade-Store: score record persistence
//!
//! This crate is the persistence collaborator for the batch evaluation
//! pipeline. It stores one [`ScoreRecord`] per successfully scored
//! transcript and serves them back per subject (agent) for aggregation.
//!
//! ## Key Components
//!
//! - `ScoreStore`: backend-agnostic async storage trait
//! - `MemoryScoreStore`: in-memory fake for tests and dry runs
//! - `SurrealScoreStore`: SurrealDB backend (in-memory, local file, or remote)

mod error;
pub mod fakes;
mod migrations;
mod record;
pub mod storage_traits;
pub mod surreal_store;

pub use error::StoreError;
pub use fakes::MemoryScoreStore;
pub use record::{RecordId, ScoreRecord};
pub use storage_traits::{ScoreStore, StoreResult};
pub use surreal_store::{StoreConfig, SurrealScoreStore};
