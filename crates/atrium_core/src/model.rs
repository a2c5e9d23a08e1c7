//! Data model records for spaces, blocks and translations
//!
//! Records are plain serde-friendly structs. Positions (row, index, size)
//! live on the block; a "row" is not persisted, it exists only as the set
//! of blocks sharing a row value.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{BlockId, SpaceId, TranslationId};

/// Default row capacity of a space, in size units
pub const DEFAULT_ROW_CAPACITY: u32 = 300;

/// Current wall-clock time as epoch milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Role of a space within a dataset
///
/// Exactly one space may hold [`Role::Root`] at any time; the store and the
/// engine both enforce this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// The single entry-point space of the dataset
    Root,
    /// Any other space
    Regular,
}

impl Default for Role {
    fn default() -> Self {
        Self::Regular
    }
}

/// A hierarchical document owning rows of positioned blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    /// Space id
    pub id: SpaceId,
    /// Human slug, unique across spaces, mutable
    pub slug: String,
    /// Role tag
    pub role: Role,
    /// Arbitrary metadata
    pub metadata: HashMap<String, Value>,
    /// View configuration blob (theme, title, ...)
    pub view: Value,
    /// Row capacity in size units
    pub row_capacity: u32,
    /// Creation time, epoch millis
    pub created_at: u64,
    /// Last update time, epoch millis
    pub updated_at: u64,
}

impl Space {
    /// Create a new regular space with the given slug
    pub fn new(slug: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: SpaceId::generate(),
            slug: slug.into(),
            role: Role::Regular,
            metadata: HashMap::new(),
            view: Value::Null,
            row_capacity: DEFAULT_ROW_CAPACITY,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the role
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set the view configuration
    pub fn with_view(mut self, view: Value) -> Self {
        self.view = view;
        self
    }

    /// Set the row capacity
    pub fn with_row_capacity(mut self, capacity: u32) -> Self {
        self.row_capacity = capacity;
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Check if this is the root space
    pub fn is_root(&self) -> bool {
        self.role == Role::Root
    }
}

/// A typed content fragment inside a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntity {
    /// Kind tag ("text", "file", ...)
    pub kind: String,
    /// Kind-specific parameters
    pub params: HashMap<String, Value>,
}

impl ContentEntity {
    /// Create an entity of the given kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: HashMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Whether this entity may need external metadata population
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

/// A positioned content block within a space
///
/// The index is nullable in storage ("append"), but the engine resolves it
/// before every write, so persisted blocks normally carry `Some`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block id
    pub id: BlockId,
    /// Owning space
    pub space_id: SpaceId,
    /// Row index within the space
    pub row: u32,
    /// Position within the global index ordering, `None` = append
    pub index: Option<u32>,
    /// Span width in size units, positive
    pub size: u32,
    /// Ordered content fragments
    pub entities: Vec<ContentEntity>,
    /// Arbitrary metadata
    pub metadata: HashMap<String, Value>,
}

impl Block {
    /// Create a block in the given space and row, appended by default
    pub fn new(space_id: SpaceId, row: u32, size: u32) -> Self {
        Self {
            id: BlockId::generate(),
            space_id,
            row,
            index: None,
            size,
            entities: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Request an explicit index
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Append a content entity
    pub fn with_entity(mut self, entity: ContentEntity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Resolved position; a legacy `None` sorts first
    pub fn resolved_index(&self) -> u32 {
        self.index.unwrap_or(0)
    }
}

/// A language resource, optionally scoped to one space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Translation id
    pub id: TranslationId,
    /// Owning space; `None` = global/default scope
    pub space_id: Option<SpaceId>,
    /// BCP-47-ish language code ("en", "de", ...)
    pub language_code: String,
    /// Human-readable language name
    pub language_name: String,
    /// Marks the default language
    pub is_default: bool,
    /// Key to localized string
    pub translations: HashMap<String, String>,
}

impl Translation {
    /// Create a global translation for the given language
    pub fn new(language_code: impl Into<String>, language_name: impl Into<String>) -> Self {
        Self {
            id: TranslationId::generate(),
            space_id: None,
            language_code: language_code.into(),
            language_name: language_name.into(),
            is_default: false,
            translations: HashMap::new(),
        }
    }

    /// Scope to a space
    pub fn with_space(mut self, space_id: SpaceId) -> Self {
        self.space_id = Some(space_id);
        self
    }

    /// Mark as the default language
    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    /// Add a key/string pair
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.translations.insert(key.into(), value.into());
        self
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.translations.get(key).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_space_defaults() {
        let space = Space::new("home");
        assert_eq!(space.slug, "home");
        assert_eq!(space.role, Role::Regular);
        assert_eq!(space.row_capacity, DEFAULT_ROW_CAPACITY);
        assert!(!space.is_root());
    }

    #[test]
    fn test_space_builder() {
        let space = Space::new("root")
            .with_role(Role::Root)
            .with_row_capacity(120)
            .with_metadata("owner", json!("ops"));
        assert!(space.is_root());
        assert_eq!(space.row_capacity, 120);
        assert_eq!(space.metadata.get("owner"), Some(&json!("ops")));
    }

    #[test]
    fn test_block_resolved_index() {
        let space = Space::new("s");
        let block = Block::new(space.id, 0, 100);
        assert_eq!(block.index, None);
        assert_eq!(block.resolved_index(), 0);

        let block = block.with_index(4);
        assert_eq!(block.resolved_index(), 4);
    }

    #[test]
    fn test_content_entity_file() {
        let text = ContentEntity::new("text").with_param("body", json!("hi"));
        assert!(!text.is_file());

        let file = ContentEntity::new("file").with_param("url", json!("a/b.png"));
        assert!(file.is_file());
    }

    #[test]
    fn test_translation_lookup() {
        let t = Translation::new("en", "English")
            .with_default(true)
            .with_entry("title", "Welcome");
        assert!(t.is_default);
        assert_eq!(t.get("title"), Some("Welcome"));
        assert_eq!(t.get("missing"), None);
    }
}
