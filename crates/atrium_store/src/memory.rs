//! In-memory transactional store
//!
//! Reference [`LayoutStore`] backend. All records live behind one
//! `parking_lot::RwLock`; each trait call holds the lock for its whole
//! mutation, which makes every call a single transaction boundary. Batch
//! updates are validated completely before anything is applied.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;

use atrium_core::{now_millis, Block, BlockId, Role, Space, SpaceId, Translation, TranslationId};

use crate::store::{LayoutStore, StoreError, StoreResult};

#[derive(Default)]
struct State {
    spaces: HashMap<SpaceId, Space>,
    slugs: HashMap<String, SpaceId>,
    blocks: HashMap<BlockId, Block>,
    translations: HashMap<TranslationId, Translation>,
}

impl State {
    fn space(&self, id: SpaceId) -> StoreResult<&Space> {
        self.spaces
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("space {}", id)))
    }

    /// Check that no two blocks of one (space, row) share a resolved index
    fn check_index_uniqueness(blocks: &HashMap<BlockId, Block>) -> StoreResult<()> {
        let mut seen: HashSet<(SpaceId, u32, u32)> = HashSet::new();
        for block in blocks.values() {
            if !seen.insert((block.space_id, block.row, block.resolved_index())) {
                return Err(StoreError::Constraint(format!(
                    "duplicate index {} in space {} row {}",
                    block.resolved_index(),
                    block.space_id,
                    block.row
                )));
            }
        }
        Ok(())
    }

    fn sorted_blocks<'a>(&'a self, filter: impl Fn(&Block) -> bool + 'a) -> Vec<Block> {
        let mut blocks: Vec<Block> = self.blocks.values().filter(|b| filter(b)).cloned().collect();
        blocks.sort_by_key(Block::resolved_index);
        blocks
    }
}

/// Transactional in-memory layout store
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Total block count, across all spaces
    pub fn block_count(&self) -> usize {
        self.state.read().blocks.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LayoutStore for MemoryStore {
    async fn create_space(&self, space: Space) -> StoreResult<Space> {
        let mut state = self.state.write();
        if state.slugs.contains_key(&space.slug) {
            return Err(StoreError::Conflict(format!("slug '{}' taken", space.slug)));
        }
        if space.role == Role::Root && state.spaces.values().any(|s| s.role == Role::Root) {
            return Err(StoreError::Constraint("a root space already exists".into()));
        }
        state.slugs.insert(space.slug.clone(), space.id);
        state.spaces.insert(space.id, space.clone());
        log::debug!("created space {} ({})", space.slug, space.id);
        Ok(space)
    }

    async fn space(&self, id: SpaceId) -> StoreResult<Space> {
        self.state.read().space(id).cloned()
    }

    async fn space_by_slug(&self, slug: &str) -> StoreResult<Space> {
        let state = self.state.read();
        let id = state
            .slugs
            .get(slug)
            .ok_or_else(|| StoreError::NotFound(format!("space '{}'", slug)))?;
        state.space(*id).cloned()
    }

    async fn update_space(&self, mut space: Space) -> StoreResult<Space> {
        let mut state = self.state.write();
        let previous = state.space(space.id)?.clone();
        if let Some(owner) = state.slugs.get(&space.slug) {
            if *owner != space.id {
                return Err(StoreError::Conflict(format!("slug '{}' taken", space.slug)));
            }
        }
        if space.role == Role::Root
            && state
                .spaces
                .values()
                .any(|s| s.role == Role::Root && s.id != space.id)
        {
            return Err(StoreError::Constraint("a root space already exists".into()));
        }
        space.updated_at = now_millis();
        if previous.slug != space.slug {
            state.slugs.remove(&previous.slug);
            state.slugs.insert(space.slug.clone(), space.id);
        }
        state.spaces.insert(space.id, space.clone());
        Ok(space)
    }

    async fn remove_space(&self, id: SpaceId) -> StoreResult<(Space, Vec<Block>)> {
        let mut state = self.state.write();
        let space = state
            .spaces
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("space {}", id)))?;
        state.slugs.remove(&space.slug);
        let cascaded = state.sorted_blocks(|b| b.space_id == id);
        state.blocks.retain(|_, b| b.space_id != id);
        log::debug!(
            "removed space {} and {} cascaded blocks",
            space.slug,
            cascaded.len()
        );
        Ok((space, cascaded))
    }

    async fn list_spaces(&self) -> StoreResult<Vec<Space>> {
        let state = self.state.read();
        let mut spaces: Vec<Space> = state.spaces.values().cloned().collect();
        spaces.sort_by_key(|s| s.created_at);
        Ok(spaces)
    }

    async fn root_space(&self) -> StoreResult<Option<Space>> {
        let state = self.state.read();
        Ok(state.spaces.values().find(|s| s.role == Role::Root).cloned())
    }

    async fn add_block(&self, block: Block) -> StoreResult<Block> {
        let mut state = self.state.write();
        state.space(block.space_id)?;
        let occupied = state.blocks.values().any(|b| {
            b.space_id == block.space_id
                && b.row == block.row
                && b.resolved_index() == block.resolved_index()
        });
        if occupied {
            return Err(StoreError::Constraint(format!(
                "index {} occupied in space {} row {}",
                block.resolved_index(),
                block.space_id,
                block.row
            )));
        }
        state.blocks.insert(block.id, block.clone());
        Ok(block)
    }

    async fn block(&self, id: BlockId) -> StoreResult<Block> {
        self.state
            .read()
            .blocks
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("block {}", id)))
    }

    async fn update_block(&self, block: Block) -> StoreResult<Block> {
        self.update_blocks(vec![block])
            .await
            .map(|mut blocks| blocks.remove(0))
    }

    async fn update_blocks(&self, blocks: Vec<Block>) -> StoreResult<Vec<Block>> {
        let mut state = self.state.write();
        for block in &blocks {
            if !state.blocks.contains_key(&block.id) {
                return Err(StoreError::NotFound(format!("block {}", block.id)));
            }
        }
        // Stage the whole batch, then verify the index invariant before
        // anything becomes visible.
        let mut staged = state.blocks.clone();
        for block in &blocks {
            staged.insert(block.id, block.clone());
        }
        State::check_index_uniqueness(&staged)?;
        state.blocks = staged;
        log::debug!("applied batch of {} block updates", blocks.len());
        Ok(blocks)
    }

    async fn remove_block(&self, id: BlockId) -> StoreResult<Block> {
        self.state
            .write()
            .blocks
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("block {}", id)))
    }

    async fn blocks_in_space(&self, space: SpaceId) -> StoreResult<Vec<Block>> {
        let state = self.state.read();
        state.space(space)?;
        Ok(state.sorted_blocks(|b| b.space_id == space))
    }

    async fn blocks_in_row(&self, space: SpaceId, row: u32) -> StoreResult<Vec<Block>> {
        let state = self.state.read();
        state.space(space)?;
        Ok(state.sorted_blocks(|b| b.space_id == space && b.row == row))
    }

    async fn max_index_in_space(&self, space: SpaceId) -> StoreResult<u32> {
        let state = self.state.read();
        state.space(space)?;
        state
            .blocks
            .values()
            .filter(|b| b.space_id == space)
            .map(Block::resolved_index)
            .max()
            .ok_or_else(|| StoreError::NotFound(format!("no blocks in space {}", space)))
    }

    async fn blocks_with_index_ge(&self, space: SpaceId, threshold: u32) -> StoreResult<Vec<Block>> {
        let state = self.state.read();
        state.space(space)?;
        Ok(state.sorted_blocks(|b| b.space_id == space && b.resolved_index() >= threshold))
    }

    async fn add_translation(&self, translation: Translation) -> StoreResult<Translation> {
        let mut state = self.state.write();
        if let Some(space_id) = translation.space_id {
            state.space(space_id)?;
        }
        let duplicate = state.translations.values().any(|t| {
            t.space_id == translation.space_id && t.language_code == translation.language_code
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "language '{}' already present in scope",
                translation.language_code
            )));
        }
        state.translations.insert(translation.id, translation.clone());
        Ok(translation)
    }

    async fn translation(&self, id: TranslationId) -> StoreResult<Translation> {
        self.state
            .read()
            .translations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("translation {}", id)))
    }

    async fn update_translation(&self, translation: Translation) -> StoreResult<Translation> {
        let mut state = self.state.write();
        if !state.translations.contains_key(&translation.id) {
            return Err(StoreError::NotFound(format!("translation {}", translation.id)));
        }
        state.translations.insert(translation.id, translation.clone());
        Ok(translation)
    }

    async fn remove_translation(&self, id: TranslationId) -> StoreResult<Translation> {
        self.state
            .write()
            .translations
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("translation {}", id)))
    }

    async fn translations(&self) -> StoreResult<Vec<Translation>> {
        let state = self.state.read();
        let mut translations: Vec<Translation> = state.translations.values().cloned().collect();
        translations.sort_by(|a, b| a.language_code.cmp(&b.language_code));
        Ok(translations)
    }

    async fn translations_for_space(
        &self,
        space: Option<SpaceId>,
    ) -> StoreResult<Vec<Translation>> {
        let state = self.state.read();
        if let Some(space_id) = space {
            state.space(space_id)?;
        }
        let mut translations: Vec<Translation> = state
            .translations
            .values()
            .filter(|t| t.space_id == space)
            .cloned()
            .collect();
        translations.sort_by(|a, b| a.language_code.cmp(&b.language_code));
        Ok(translations)
    }

    async fn default_translation(&self) -> StoreResult<Option<Translation>> {
        let state = self.state.read();
        Ok(state
            .translations
            .values()
            .find(|t| t.is_default)
            .cloned())
    }

    async fn translation_for_language(
        &self,
        space: Option<SpaceId>,
        language: &str,
    ) -> StoreResult<Option<Translation>> {
        let state = self.state.read();
        Ok(state
            .translations
            .values()
            .find(|t| t.space_id == space && t.language_code == language)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slug_conflict() {
        let store = MemoryStore::new();
        store.create_space(Space::new("home")).await.unwrap();

        let result = store.create_space(Space::new("home")).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_single_root_constraint() {
        let store = MemoryStore::new();
        store
            .create_space(Space::new("root").with_role(Role::Root))
            .await
            .unwrap();

        let result = store
            .create_space(Space::new("second").with_role(Role::Root))
            .await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
        assert_eq!(store.root_space().await.unwrap().unwrap().slug, "root");
    }

    #[tokio::test]
    async fn test_update_space_bumps_timestamp_and_reindexes_slug() {
        let store = MemoryStore::new();
        let mut space = store.create_space(Space::new("old")).await.unwrap();
        let created_at = space.updated_at;

        space.slug = "new".to_string();
        let updated = store.update_space(space).await.unwrap();
        assert!(updated.updated_at >= created_at);

        assert!(store.space_by_slug("old").await.is_err());
        assert_eq!(store.space_by_slug("new").await.unwrap().id, updated.id);
    }

    #[tokio::test]
    async fn test_max_index_empty_space_is_not_found() {
        let store = MemoryStore::new();
        let space = store.create_space(Space::new("s")).await.unwrap();

        let result = store.max_index_in_space(space.id).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_block_rejects_occupied_slot() {
        let store = MemoryStore::new();
        let space = store.create_space(Space::new("s")).await.unwrap();
        store
            .add_block(Block::new(space.id, 0, 100).with_index(0))
            .await
            .unwrap();

        let result = store
            .add_block(Block::new(space.id, 0, 50).with_index(0))
            .await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_update_blocks_is_all_or_nothing() {
        let store = MemoryStore::new();
        let space = store.create_space(Space::new("s")).await.unwrap();
        let a = store
            .add_block(Block::new(space.id, 0, 100).with_index(0))
            .await
            .unwrap();
        let b = store
            .add_block(Block::new(space.id, 0, 100).with_index(1))
            .await
            .unwrap();

        // Second entry collides with the first; nothing may be applied.
        let mut a2 = a.clone();
        a2.index = Some(5);
        let mut b2 = b.clone();
        b2.index = Some(5);
        let result = store.update_blocks(vec![a2, b2]).await;
        assert!(matches!(result, Err(StoreError::Constraint(_))));

        assert_eq!(store.block(a.id).await.unwrap().index, Some(0));
        assert_eq!(store.block(b.id).await.unwrap().index, Some(1));
    }

    #[tokio::test]
    async fn test_remove_space_cascades_blocks() {
        let store = MemoryStore::new();
        let space = store.create_space(Space::new("s")).await.unwrap();
        let other = store.create_space(Space::new("other")).await.unwrap();
        store
            .add_block(Block::new(space.id, 0, 10).with_index(0))
            .await
            .unwrap();
        store
            .add_block(Block::new(space.id, 1, 10).with_index(1))
            .await
            .unwrap();
        let kept = store
            .add_block(Block::new(other.id, 0, 10).with_index(0))
            .await
            .unwrap();

        let (removed, cascaded) = store.remove_space(space.id).await.unwrap();
        assert_eq!(removed.id, space.id);
        assert_eq!(cascaded.len(), 2);
        assert_eq!(store.block_count(), 1);
        assert!(store.block(kept.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_blocks_with_index_ge_spans_rows() {
        let store = MemoryStore::new();
        let space = store.create_space(Space::new("s")).await.unwrap();
        store
            .add_block(Block::new(space.id, 0, 10).with_index(0))
            .await
            .unwrap();
        store
            .add_block(Block::new(space.id, 1, 10).with_index(1))
            .await
            .unwrap();
        store
            .add_block(Block::new(space.id, 2, 10).with_index(2))
            .await
            .unwrap();

        let trailing = store.blocks_with_index_ge(space.id, 1).await.unwrap();
        let rows: Vec<u32> = trailing.iter().map(|b| b.row).collect();
        assert_eq!(rows, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_translations_for_space_lists_one_scope() {
        let store = MemoryStore::new();
        let space = store.create_space(Space::new("s")).await.unwrap();
        store
            .add_translation(Translation::new("en", "English"))
            .await
            .unwrap();
        store
            .add_translation(Translation::new("de", "Deutsch").with_space(space.id))
            .await
            .unwrap();
        store
            .add_translation(Translation::new("en", "English").with_space(space.id))
            .await
            .unwrap();

        let scoped = store.translations_for_space(Some(space.id)).await.unwrap();
        let codes: Vec<&str> = scoped.iter().map(|t| t.language_code.as_str()).collect();
        assert_eq!(codes, vec!["de", "en"]);

        let global = store.translations_for_space(None).await.unwrap();
        assert_eq!(global.len(), 1);
        assert!(global[0].space_id.is_none());
    }

    #[tokio::test]
    async fn test_default_translation_keyed_on_flag() {
        let store = MemoryStore::new();
        store
            .add_translation(Translation::new("de", "Deutsch"))
            .await
            .unwrap();
        assert!(store.default_translation().await.unwrap().is_none());

        store
            .add_translation(Translation::new("en", "English").with_default(true))
            .await
            .unwrap();
        let default = store.default_translation().await.unwrap().unwrap();
        assert_eq!(default.language_code, "en");
        assert!(default.is_default);
    }

    #[tokio::test]
    async fn test_translation_scope_lookup() {
        let store = MemoryStore::new();
        let space = store.create_space(Space::new("s")).await.unwrap();
        store
            .add_translation(Translation::new("en", "English"))
            .await
            .unwrap();
        store
            .add_translation(Translation::new("en", "English").with_space(space.id))
            .await
            .unwrap();

        let global = store.translation_for_language(None, "en").await.unwrap();
        assert!(global.unwrap().space_id.is_none());

        let scoped = store
            .translation_for_language(Some(space.id), "en")
            .await
            .unwrap();
        assert_eq!(scoped.unwrap().space_id, Some(space.id));

        let missing = store.translation_for_language(None, "fr").await.unwrap();
        assert!(missing.is_none());
    }
}
