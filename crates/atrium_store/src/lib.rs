//! # atrium_store - Layout Store
//!
//! Durable record of spaces, blocks and translations with positions:
//! - [`LayoutStore`] async trait, the persistence boundary the engine
//!   mutates through
//! - [`MemoryStore`], a transactional in-memory implementation used as the
//!   reference backend and in tests
//! - Translation resolution with space-scoped to global fallback
//!
//! Every trait call is one transaction: batch updates are all-or-nothing,
//! readers never observe a partial shift. The store does not retry; retry
//! policy belongs to the caller.

pub mod memory;
pub mod store;
pub mod translation;

pub use memory::MemoryStore;
pub use store::{LayoutStore, StoreError, StoreResult};
pub use translation::{TranslationConfig, TranslationResolver};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::memory::MemoryStore;
    pub use crate::store::{LayoutStore, StoreError, StoreResult};
    pub use crate::translation::{TranslationConfig, TranslationResolver};
}
