//! Metadata and lifecycle engine.
//!
//! The [`LifecycleEngine`] is the only component that touches both the
//! [`RecordStore`](upd_records::RecordStore) and the
//! [`BlobBackend`](upd_blob::BlobBackend). It owns the invariant that a record
//! exists if and only if its blob does, outside the window of a single
//! operation.

pub mod allocator;
pub mod builder;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod sweeper;

pub use allocator::{AllocatorConfig, IdAllocator, Reservation};
pub use builder::EngineBuilder;
pub use engine::{Ingested, LifecycleEngine, Resolved, SweepReport};
pub use error::EngineError;
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use sweeper::{ExpirySweeper, ExpirySweeperBuilder, SweeperConfig};
