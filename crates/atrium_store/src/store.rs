//! The layout store boundary
//!
//! The engine never holds layout state across calls; the store is the single
//! source of truth. Each trait method executes inside one transaction
//! boundary, so a batch update is visible to readers either fully or not at
//! all.

use async_trait::async_trait;
use thiserror::Error;

use atrium_core::{Block, BlockId, Space, SpaceId, Translation, TranslationId};

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional CRUD over spaces, blocks and translations
///
/// All operations are asynchronous and may be retried by the caller on
/// transient failure; implementations do not retry internally.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    // --- spaces ---

    /// Persist a new space
    ///
    /// Enforces slug uniqueness ([`StoreError::Conflict`]) and the
    /// single-root constraint ([`StoreError::Constraint`]).
    async fn create_space(&self, space: Space) -> StoreResult<Space>;

    /// Fetch a space by id
    async fn space(&self, id: SpaceId) -> StoreResult<Space>;

    /// Fetch a space by slug
    async fn space_by_slug(&self, slug: &str) -> StoreResult<Space>;

    /// Replace a space record, bumping its update timestamp
    ///
    /// Slug and role constraints are re-checked against the new state.
    async fn update_space(&self, space: Space) -> StoreResult<Space>;

    /// Remove a space, cascading to its blocks
    ///
    /// Returns the removed space and its blocks so the caller can publish
    /// per-entity removal events.
    async fn remove_space(&self, id: SpaceId) -> StoreResult<(Space, Vec<Block>)>;

    /// List all spaces
    async fn list_spaces(&self) -> StoreResult<Vec<Space>>;

    /// The root space, if one exists
    async fn root_space(&self) -> StoreResult<Option<Space>>;

    // --- blocks ---

    /// Persist a new block
    async fn add_block(&self, block: Block) -> StoreResult<Block>;

    /// Fetch a block by id
    async fn block(&self, id: BlockId) -> StoreResult<Block>;

    /// Replace a block record
    async fn update_block(&self, block: Block) -> StoreResult<Block>;

    /// Replace several block records as one atomic unit
    ///
    /// Either every block in the batch is applied or none is; readers never
    /// observe a partial shift.
    async fn update_blocks(&self, blocks: Vec<Block>) -> StoreResult<Vec<Block>>;

    /// Remove a block, returning its final state
    async fn remove_block(&self, id: BlockId) -> StoreResult<Block>;

    /// All blocks of a space, sorted by resolved index
    async fn blocks_in_space(&self, space: SpaceId) -> StoreResult<Vec<Block>>;

    /// Blocks of one row, sorted by resolved index
    async fn blocks_in_row(&self, space: SpaceId, row: u32) -> StoreResult<Vec<Block>>;

    /// Highest resolved index across all rows of a space
    ///
    /// Fails with [`StoreError::NotFound`] when the space holds no blocks.
    async fn max_index_in_space(&self, space: SpaceId) -> StoreResult<u32>;

    /// Blocks of a space with resolved index >= the threshold, any row
    async fn blocks_with_index_ge(&self, space: SpaceId, threshold: u32) -> StoreResult<Vec<Block>>;

    // --- translations ---

    /// Persist a new translation
    async fn add_translation(&self, translation: Translation) -> StoreResult<Translation>;

    /// Fetch a translation by id
    async fn translation(&self, id: TranslationId) -> StoreResult<Translation>;

    /// Replace a translation record
    async fn update_translation(&self, translation: Translation) -> StoreResult<Translation>;

    /// Remove a translation
    async fn remove_translation(&self, id: TranslationId) -> StoreResult<Translation>;

    /// All translations
    async fn translations(&self) -> StoreResult<Vec<Translation>>;

    /// Translations of one scope, sorted by language code
    ///
    /// `space = None` lists the global scope.
    async fn translations_for_space(&self, space: Option<SpaceId>)
        -> StoreResult<Vec<Translation>>;

    /// The translation flagged as the default language, if any
    async fn default_translation(&self) -> StoreResult<Option<Translation>>;

    /// Translation for a language within a scope
    ///
    /// `space = None` looks up the global scope only; it does not fall back.
    /// Fallback order lives in [`crate::translation::TranslationResolver`].
    async fn translation_for_language(
        &self,
        space: Option<SpaceId>,
        language: &str,
    ) -> StoreResult<Option<Translation>>;
}
