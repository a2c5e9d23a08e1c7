//! # atrium_engine - Layout Engine
//!
//! Pure layout logic over the store boundary, plus the bridge from
//! committed mutations to event-bus publications:
//! - Insert/move/resize/delete with ordering invariants (global index
//!   shifting, row capacity, single root space)
//! - Per-space serialization of index-mutating operations
//! - [`ChangePublisher`]: one event per logically-changed entity, published
//!   only after the commit succeeds
//! - [`EntityResolver`] boundary for asynchronous file-metadata population
//!
//! The engine trusts the caller identity it is handed; authorization
//! happens in an external layer.

pub mod engine;
pub mod error;
pub mod publisher;
pub mod resolver;

pub use engine::{EngineConfig, LayoutEngine};
pub use error::{EngineError, EngineResult};
pub use publisher::ChangePublisher;
pub use resolver::{EntityResolver, NoopResolver};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::engine::{EngineConfig, LayoutEngine};
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::publisher::ChangePublisher;
    pub use crate::resolver::{EntityResolver, NoopResolver};
}
