//! Translation resolution
//!
//! A key lookup falls back from the space-scoped translation to the global
//! one for the requested language, then to the configured default language.

use atrium_core::{SpaceId, Translation};

use crate::store::{LayoutStore, StoreResult};

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    /// Language code used when the requested language is absent everywhere
    pub default_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
        }
    }
}

/// Fallback-chain resolver over a [`LayoutStore`]
pub struct TranslationResolver {
    config: TranslationConfig,
}

impl TranslationResolver {
    /// Create a resolver with the given configuration
    pub fn new(config: TranslationConfig) -> Self {
        Self { config }
    }

    /// Create a resolver with the default configuration
    pub fn with_defaults() -> Self {
        Self::new(TranslationConfig::default())
    }

    /// Resolve the translation record for a language within a space
    ///
    /// Order: space-scoped for `language`, global for `language`, global for
    /// the configured default language, then whichever record is flagged as
    /// the default. `None` when nothing matches.
    pub async fn resolve(
        &self,
        store: &dyn LayoutStore,
        space: Option<SpaceId>,
        language: &str,
    ) -> StoreResult<Option<Translation>> {
        if let Some(space_id) = space {
            if let Some(found) = store
                .translation_for_language(Some(space_id), language)
                .await?
            {
                return Ok(Some(found));
            }
        }
        if let Some(found) = store.translation_for_language(None, language).await? {
            return Ok(Some(found));
        }
        if language != self.config.default_language {
            if let Some(found) = store
                .translation_for_language(None, &self.config.default_language)
                .await?
            {
                return Ok(Some(found));
            }
        }
        store.default_translation().await
    }

    /// Resolve a single key, following the fallback chain
    pub async fn lookup(
        &self,
        store: &dyn LayoutStore,
        space: Option<SpaceId>,
        language: &str,
        key: &str,
    ) -> StoreResult<Option<String>> {
        Ok(self
            .resolve(store, space, language)
            .await?
            .and_then(|t| t.get(key).map(str::to_string)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use atrium_core::Space;

    async fn seeded() -> (MemoryStore, SpaceId) {
        let store = MemoryStore::new();
        let space = store.create_space(Space::new("s")).await.unwrap();
        store
            .add_translation(
                Translation::new("en", "English")
                    .with_default(true)
                    .with_entry("title", "Welcome"),
            )
            .await
            .unwrap();
        store
            .add_translation(
                Translation::new("en", "English")
                    .with_space(space.id)
                    .with_entry("title", "Space welcome"),
            )
            .await
            .unwrap();
        store
            .add_translation(Translation::new("de", "Deutsch").with_entry("title", "Willkommen"))
            .await
            .unwrap();
        (store, space.id)
    }

    #[tokio::test]
    async fn test_space_scope_wins() {
        let (store, space) = seeded().await;
        let resolver = TranslationResolver::with_defaults();

        let title = resolver
            .lookup(&store, Some(space), "en", "title")
            .await
            .unwrap();
        assert_eq!(title.as_deref(), Some("Space welcome"));
    }

    #[tokio::test]
    async fn test_global_fallback() {
        let (store, space) = seeded().await;
        let resolver = TranslationResolver::with_defaults();

        // "de" has no space-scoped record, the global one is used
        let title = resolver
            .lookup(&store, Some(space), "de", "title")
            .await
            .unwrap();
        assert_eq!(title.as_deref(), Some("Willkommen"));
    }

    #[tokio::test]
    async fn test_default_language_fallback() {
        let (store, _) = seeded().await;
        let resolver = TranslationResolver::with_defaults();

        // "fr" is unknown; falls back to the configured default ("en")
        let resolved = resolver.resolve(&store, None, "fr").await.unwrap().unwrap();
        assert_eq!(resolved.language_code, "en");
    }

    #[tokio::test]
    async fn test_unknown_everywhere() {
        let store = MemoryStore::new();
        let resolver = TranslationResolver::with_defaults();

        let resolved = resolver.resolve(&store, None, "fr").await.unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn test_default_flag_is_last_resort() {
        let store = MemoryStore::new();
        store
            .add_translation(Translation::new("de", "Deutsch").with_default(true))
            .await
            .unwrap();
        let resolver = TranslationResolver::with_defaults();

        // neither "fr" nor the configured default ("en") exist; the record
        // flagged as default is used
        let resolved = resolver.resolve(&store, None, "fr").await.unwrap().unwrap();
        assert_eq!(resolved.language_code, "de");
    }
}
