//! Typed identifiers for Atrium entities

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id! {
    /// Identifier of a space
    SpaceId
}

entity_id! {
    /// Identifier of a block
    BlockId
}

entity_id! {
    /// Identifier of a translation record
    TranslationId
}

entity_id! {
    /// Identity of the caller performing a mutation, supplied by the
    /// external auth layer and trusted as-is
    ActorId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique() {
        let a = SpaceId::generate();
        let b = SpaceId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_uuid_roundtrip() {
        let uuid = Uuid::new_v4();
        let id = BlockId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }
}
