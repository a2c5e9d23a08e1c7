//! # atrium_core - Atrium Core Model
//!
//! Identifiers and data model records shared by the Atrium crates:
//! - Typed ids for spaces, blocks, translations and acting identities
//! - Space/Block/Translation records with metadata maps
//! - Row capacity constant and epoch-millisecond clock helper
//!
//! Records are plain immutable-by-convention data: collaborators are passed
//! explicitly, there is no runtime property bag.

pub mod id;
pub mod model;

pub use id::{ActorId, BlockId, SpaceId, TranslationId};
pub use model::{
    now_millis, Block, ContentEntity, Role, Space, Translation, DEFAULT_ROW_CAPACITY,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::id::{ActorId, BlockId, SpaceId, TranslationId};
    pub use crate::model::{Block, ContentEntity, Role, Space, Translation};
}
