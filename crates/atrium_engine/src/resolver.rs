//! Resolved-entity boundary
//!
//! Content entities of kind "file" may need external metadata (content
//! length, mime type, ...) fetched after the block commits. The resolver is
//! an external collaborator; it runs detached from the mutation and its
//! failure is non-fatal.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use atrium_core::ContentEntity;

/// Populates metadata for file entities
#[async_trait]
pub trait EntityResolver: Send + Sync {
    /// Fetch metadata for one entity; `None` when nothing could be resolved
    async fn resolve(&self, entity: &ContentEntity) -> Option<HashMap<String, Value>>;
}

/// Resolver that never produces metadata
pub struct NoopResolver;

#[async_trait]
impl EntityResolver for NoopResolver {
    async fn resolve(&self, _entity: &ContentEntity) -> Option<HashMap<String, Value>> {
        None
    }
}
