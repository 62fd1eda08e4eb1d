//! statline - heterogeneous-record normalization and incremental-merge engine
//!
//! Takes semi-structured league payloads (standings, team rosters,
//! per-player stats) whose shape and field names vary across provider
//! versions, deterministically produces rows on one fixed typed schema,
//! and unions them with whatever was previously persisted as Parquet.
//!
//! The stages run strictly in sequence:
//!
//! raw records → extraction → flattening → normalization → cross-reference
//! fill → incremental merge
//!
//! Every stage is a pure transformation except the merge store, which
//! performs the sole stateful I/O. Fetching, authentication and CLI wiring
//! live outside this crate; it consumes already-fetched payloads.

pub mod enrich;
pub mod error;
pub mod fill;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod schema;
pub mod source;
pub mod store;

pub use error::{EtlError, Result};
pub use normalize::{NormalizedBatch, SchemaNormalizer};
pub use pipeline::{RosterPipeline, RunReport, StandingsPipeline};
pub use schema::{ColumnSpec, ColumnType, DatasetKind};
pub use store::{MergeStore, WriteReport};
