//! Layout engine
//!
//! Computes position changes for insert, move, resize and delete intents
//! and requests them from the store as one atomic unit per operation. The
//! engine is stateless between calls; the store is the source of truth.
//!
//! Index-mutating operations within one space are serialized through a
//! per-space async mutex, so two concurrent inserts cannot both read the
//! same max index and claim the same slot. Independent spaces proceed
//! concurrently. Events are published only after the commit succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

use atrium_core::{
    ActorId, Block, BlockId, ContentEntity, Role, Space, SpaceId, Translation, TranslationId,
};
use atrium_event::EventBus;
use atrium_store::{LayoutStore, StoreError};

use crate::error::{EngineError, EngineResult};
use crate::publisher::ChangePublisher;
use crate::resolver::EntityResolver;

/// Engine configuration
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// A read-only engine rejects every mutation with `Unsupported`
    pub read_only: bool,
}

/// One async mutex per space id, created on first use
#[derive(Default)]
struct SpaceLocks {
    inner: Mutex<HashMap<SpaceId, Arc<AsyncMutex<()>>>>,
}

impl SpaceLocks {
    fn for_space(&self, id: SpaceId) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.inner.lock().entry(id).or_default())
    }

    fn forget(&self, id: SpaceId) {
        self.inner.lock().remove(&id);
    }
}

/// The block/row layout engine
///
/// Collaborators (store, bus, resolver) are passed in explicitly; the
/// engine holds no layout state of its own.
pub struct LayoutEngine {
    store: Arc<dyn LayoutStore>,
    publisher: ChangePublisher,
    resolver: Option<Arc<dyn EntityResolver>>,
    locks: SpaceLocks,
    config: EngineConfig,
}

impl LayoutEngine {
    /// Create an engine over the given store and event bus
    pub fn new(store: Arc<dyn LayoutStore>, bus: Arc<EventBus>) -> Self {
        Self {
            store,
            publisher: ChangePublisher::new(bus),
            resolver: None,
            locks: SpaceLocks::default(),
            config: EngineConfig::default(),
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an entity resolver for file metadata population
    pub fn with_resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// The change publisher used by this engine
    pub fn publisher(&self) -> &ChangePublisher {
        &self.publisher
    }

    fn ensure_writable(&self, op: &str) -> EngineResult<()> {
        if self.config.read_only {
            return Err(EngineError::Unsupported(format!(
                "{} on a read-only engine",
                op
            )));
        }
        Ok(())
    }

    /// Fail with `CapacityExceeded` when a row cannot take `additional`
    /// more size units; `exclude` ignores a block being moved or resized.
    async fn check_row_capacity(
        &self,
        space: &Space,
        row: u32,
        additional: u32,
        exclude: Option<BlockId>,
    ) -> EngineResult<()> {
        let occupied = self
            .store
            .blocks_in_row(space.id, row)
            .await?
            .iter()
            .filter(|b| Some(b.id) != exclude)
            .map(|b| b.size)
            .fold(0u32, u32::saturating_add);
        let fits = occupied
            .checked_add(additional)
            .map_or(false, |total| total <= space.row_capacity);
        if !fits {
            return Err(EngineError::CapacityExceeded {
                occupied,
                requested: additional,
                capacity: space.row_capacity,
            });
        }
        Ok(())
    }

    // --- spaces ---

    /// Create a space
    ///
    /// Pre-write checks for slug uniqueness and the single-root invariant;
    /// the store enforces both again at commit.
    pub async fn create_space(&self, space: Space, actor: ActorId) -> EngineResult<Space> {
        self.ensure_writable("create space")?;
        if self.store.space_by_slug(&space.slug).await.is_ok() {
            return Err(EngineError::Conflict(format!("slug '{}' taken", space.slug)));
        }
        if space.role == Role::Root && self.store.root_space().await?.is_some() {
            return Err(EngineError::InvariantViolation(
                "a root space already exists".into(),
            ));
        }
        let created = self.store.create_space(space).await?;
        self.publisher.space_created(&created, Some(actor));
        Ok(created)
    }

    /// Update a space (slug, metadata, view, capacity)
    pub async fn update_space(&self, space: Space, actor: ActorId) -> EngineResult<Space> {
        self.ensure_writable("update space")?;
        let updated = self.store.update_space(space).await?;
        self.publisher.space_updated(&updated, Some(actor));
        Ok(updated)
    }

    /// Remove a space, cascading to its blocks
    ///
    /// One `block-removed` event per cascaded block, then `space-removed`.
    pub async fn remove_space(&self, id: SpaceId, actor: ActorId) -> EngineResult<Space> {
        self.ensure_writable("remove space")?;
        let lock = self.locks.for_space(id);
        let _guard = lock.lock().await;

        let (removed, cascaded) = self.store.remove_space(id).await?;
        for block in &cascaded {
            self.publisher.block_removed(block, Some(actor));
        }
        self.publisher.space_removed(&removed, Some(actor));
        self.locks.forget(id);
        Ok(removed)
    }

    /// Fetch a space by id
    pub async fn space(&self, id: SpaceId) -> EngineResult<Space> {
        Ok(self.store.space(id).await?)
    }

    /// Fetch a space by slug
    pub async fn space_by_slug(&self, slug: &str) -> EngineResult<Space> {
        Ok(self.store.space_by_slug(slug).await?)
    }

    /// List all spaces
    pub async fn list_spaces(&self) -> EngineResult<Vec<Space>> {
        Ok(self.store.list_spaces().await?)
    }

    // --- blocks ---

    /// Insert a block
    ///
    /// Without a requested index the block is appended after the highest
    /// index in the space (0 in an empty space). With a requested index
    /// that is already occupied in its row, every block of the space at or
    /// above that index is shifted up by one first; the shift spans all
    /// rows because a single global ordering underlies the row grouping.
    pub async fn insert_block(&self, block: Block, actor: ActorId) -> EngineResult<Block> {
        self.ensure_writable("insert block")?;
        if block.size == 0 {
            return Err(EngineError::InvariantViolation(
                "block size must be positive".into(),
            ));
        }
        let lock = self.locks.for_space(block.space_id);
        let _guard = lock.lock().await;

        let space = self.store.space(block.space_id).await?;
        self.check_row_capacity(&space, block.row, block.size, None)
            .await?;

        let resolved = match block.index {
            None => match self.store.max_index_in_space(space.id).await {
                Ok(max) => max + 1,
                // empty space: append resolves to 0, not an error
                Err(StoreError::NotFound(_)) => 0,
                Err(err) => return Err(err.into()),
            },
            Some(requested) => {
                let row_blocks = self.store.blocks_in_row(space.id, block.row).await?;
                if row_blocks.iter().any(|b| b.resolved_index() == requested) {
                    self.shift_from(space.id, requested, actor).await?;
                }
                requested
            }
        };

        let mut block = block;
        block.index = Some(resolved);
        let created = self.store.add_block(block).await?;
        log::debug!(
            "inserted block {} in space {} at row {} index {}",
            created.id,
            created.space_id,
            created.row,
            resolved
        );
        self.publisher.block_created(&created, Some(actor));
        self.spawn_entity_population(&created, actor);
        Ok(created)
    }

    /// Shift every block of the space with index >= `threshold` up by one,
    /// as one batch, and publish an update per shifted block.
    async fn shift_from(
        &self,
        space: SpaceId,
        threshold: u32,
        actor: ActorId,
    ) -> EngineResult<()> {
        let mut trailing = self.store.blocks_with_index_ge(space, threshold).await?;
        for block in &mut trailing {
            block.index = Some(block.resolved_index() + 1);
        }
        let shifted = self.store.update_blocks(trailing).await?;
        log::debug!(
            "shifted {} blocks in space {} from index {}",
            shifted.len(),
            space,
            threshold
        );
        for block in &shifted {
            self.publisher.block_updated(block, Some(actor));
        }
        Ok(())
    }

    /// Move a block to a target row and index
    ///
    /// Computed as one shift-and-place batch: the displaced blocks and the
    /// moved block commit together, readers never see a transient
    /// duplicate-index state.
    pub async fn move_block(
        &self,
        id: BlockId,
        target_row: u32,
        target_index: u32,
        actor: ActorId,
    ) -> EngineResult<Block> {
        self.ensure_writable("move block")?;
        let current = self.store.block(id).await?;
        let lock = self.locks.for_space(current.space_id);
        let _guard = lock.lock().await;

        // re-read under the lock; a concurrent shift may have moved it
        let current = self.store.block(id).await?;
        let space = self.store.space(current.space_id).await?;
        self.check_row_capacity(&space, target_row, current.size, Some(id))
            .await?;

        let row_blocks = self.store.blocks_in_row(space.id, target_row).await?;
        let occupied = row_blocks
            .iter()
            .any(|b| b.id != id && b.resolved_index() == target_index);

        let mut batch = Vec::new();
        if occupied {
            let mut trailing = self.store.blocks_with_index_ge(space.id, target_index).await?;
            trailing.retain(|b| b.id != id);
            for block in &mut trailing {
                block.index = Some(block.resolved_index() + 1);
            }
            batch = trailing;
        }
        let mut moved = current;
        moved.row = target_row;
        moved.index = Some(target_index);
        batch.push(moved);

        let committed = self.store.update_blocks(batch).await?;
        for block in &committed {
            self.publisher.block_updated(block, Some(actor));
        }
        Ok(self.store.block(id).await?)
    }

    /// Resize a block, re-validating its row capacity
    pub async fn resize_block(
        &self,
        id: BlockId,
        size: u32,
        actor: ActorId,
    ) -> EngineResult<Block> {
        self.ensure_writable("resize block")?;
        if size == 0 {
            return Err(EngineError::InvariantViolation(
                "block size must be positive".into(),
            ));
        }
        let current = self.store.block(id).await?;
        let lock = self.locks.for_space(current.space_id);
        let _guard = lock.lock().await;

        let current = self.store.block(id).await?;
        let space = self.store.space(current.space_id).await?;
        self.check_row_capacity(&space, current.row, size, Some(id))
            .await?;

        let mut resized = current;
        resized.size = size;
        let committed = self.store.update_block(resized).await?;
        self.publisher.block_updated(&committed, Some(actor));
        Ok(committed)
    }

    /// Delete a block
    ///
    /// Trailing indices are not compacted; gaps are legal and the relative
    /// order of the remaining blocks is unchanged.
    pub async fn delete_block(&self, id: BlockId, actor: ActorId) -> EngineResult<Block> {
        self.ensure_writable("delete block")?;
        let current = self.store.block(id).await?;
        let lock = self.locks.for_space(current.space_id);
        let _guard = lock.lock().await;

        let removed = self.store.remove_block(id).await?;
        self.publisher.block_removed(&removed, Some(actor));
        Ok(removed)
    }

    /// Fetch a block by id
    pub async fn block(&self, id: BlockId) -> EngineResult<Block> {
        Ok(self.store.block(id).await?)
    }

    /// All blocks of a space, sorted by resolved index
    pub async fn blocks_in_space(&self, space: SpaceId) -> EngineResult<Vec<Block>> {
        Ok(self.store.blocks_in_space(space).await?)
    }

    /// Blocks of one row, sorted by resolved index
    pub async fn blocks_in_row(&self, space: SpaceId, row: u32) -> EngineResult<Vec<Block>> {
        Ok(self.store.blocks_in_row(space, row).await?)
    }

    // --- translations ---

    /// Create a translation
    pub async fn create_translation(
        &self,
        translation: Translation,
        actor: ActorId,
    ) -> EngineResult<Translation> {
        self.ensure_writable("create translation")?;
        let created = self.store.add_translation(translation).await?;
        self.publisher.translation_created(&created, Some(actor));
        Ok(created)
    }

    /// Update a translation
    pub async fn update_translation(
        &self,
        translation: Translation,
        actor: ActorId,
    ) -> EngineResult<Translation> {
        self.ensure_writable("update translation")?;
        let updated = self.store.update_translation(translation).await?;
        self.publisher.translation_updated(&updated, Some(actor));
        Ok(updated)
    }

    /// Remove a translation
    pub async fn remove_translation(
        &self,
        id: TranslationId,
        actor: ActorId,
    ) -> EngineResult<Translation> {
        self.ensure_writable("remove translation")?;
        let removed = self.store.remove_translation(id).await?;
        self.publisher.translation_removed(&removed, Some(actor));
        Ok(removed)
    }

    /// Populate file-entity metadata after the insert committed
    ///
    /// Runs detached; resolver or store failure leaves the metadata absent
    /// and is logged at debug only. The write patches only the metadata of
    /// a fresh read taken under the space lock, so a position change that
    /// committed while the resolver was in flight is never rolled back.
    fn spawn_entity_population(&self, block: &Block, actor: ActorId) {
        let Some(resolver) = self.resolver.clone() else {
            return;
        };
        let files: Vec<ContentEntity> = block
            .entities
            .iter()
            .filter(|e| e.is_file())
            .cloned()
            .collect();
        if files.is_empty() {
            return;
        }
        let store = Arc::clone(&self.store);
        let publisher = self.publisher.clone();
        let lock = self.locks.for_space(block.space_id);
        let id = block.id;
        tokio::spawn(async move {
            let mut resolved = HashMap::new();
            for entity in &files {
                match resolver.resolve(entity).await {
                    Some(metadata) => resolved.extend(metadata),
                    None => {
                        log::debug!("no metadata resolved for file entity of block {}", id);
                    }
                }
            }
            if resolved.is_empty() {
                return;
            }
            let _guard = lock.lock().await;
            let mut current = match store.block(id).await {
                Ok(block) => block,
                Err(err) => {
                    log::debug!("metadata population for block {} skipped: {}", id, err);
                    return;
                }
            };
            current.metadata.extend(resolved);
            match store.update_block(current).await {
                Ok(updated) => publisher.block_updated(&updated, Some(actor)),
                Err(err) => {
                    log::debug!("metadata population for block {} skipped: {}", id, err);
                }
            }
        });
    }
}
