//! Event references and change payloads
//!
//! A reference is the subscription key: an entity-kind tag plus an optional
//! instance discriminator. Matching is a pure function so it can be tested
//! without any bus or transport.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use atrium_core::{ActorId, Block, Space, Translation};

/// Entity-kind tag of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A space was created
    SpaceCreated,
    /// A space was updated
    SpaceUpdated,
    /// A space was removed
    SpaceRemoved,
    /// A block was created
    BlockCreated,
    /// A block was updated
    BlockUpdated,
    /// A block was removed
    BlockRemoved,
    /// A translation was created
    TranslationCreated,
    /// A translation was updated
    TranslationUpdated,
    /// A translation was removed
    TranslationRemoved,
}

impl EventKind {
    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpaceCreated => "space-created",
            Self::SpaceUpdated => "space-updated",
            Self::SpaceRemoved => "space-removed",
            Self::BlockCreated => "block-created",
            Self::BlockUpdated => "block-updated",
            Self::BlockRemoved => "block-removed",
            Self::TranslationCreated => "translation-created",
            Self::TranslationUpdated => "translation-updated",
            Self::TranslationRemoved => "translation-removed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instance discriminator of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discriminator {
    /// A single entity instance
    Entity(Uuid),
    /// All blocks sharing one row index
    Row(u32),
}

/// Structured subscription key: kind plus optional discriminator
///
/// A reference without a discriminator matches every event of its kind; a
/// discriminated reference matches only that instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventRef {
    /// Entity-kind tag
    pub kind: EventKind,
    /// Optional instance discriminator
    pub discriminator: Option<Discriminator>,
}

impl EventRef {
    /// Reference matching every event of the kind
    pub fn wildcard(kind: EventKind) -> Self {
        Self {
            kind,
            discriminator: None,
        }
    }

    /// Reference scoped to one entity instance
    pub fn entity(kind: EventKind, id: impl Into<Uuid>) -> Self {
        Self {
            kind,
            discriminator: Some(Discriminator::Entity(id.into())),
        }
    }

    /// Reference scoped to one row index
    pub fn row(kind: EventKind, row: u32) -> Self {
        Self {
            kind,
            discriminator: Some(Discriminator::Row(row)),
        }
    }

    /// Whether a subscription with this reference receives `published`
    ///
    /// Kinds must be equal; the subscriber discriminator must be absent
    /// (wildcard) or equal to the published one.
    pub fn matches(&self, published: &EventRef) -> bool {
        if self.kind != published.kind {
            return false;
        }
        match self.discriminator {
            None => true,
            Some(d) => published.discriminator == Some(d),
        }
    }
}

impl fmt::Display for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.discriminator {
            None => write!(f, "{}", self.kind),
            Some(Discriminator::Entity(id)) => write!(f, "{}({})", self.kind, id),
            Some(Discriminator::Row(row)) => write!(f, "{}(row={})", self.kind, row),
        }
    }
}

/// New state of the changed entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// A space record
    Space(Space),
    /// A block record
    Block(Block),
    /// A translation record
    Translation(Translation),
}

/// A published change: reference, new entity state, acting identity
///
/// Only the new state is carried; old field values are not retained. An
/// event may carry a secondary qualifier reference (for block events, the
/// row); a subscription is delivered at most once per event, whichever
/// reference it matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Reference the event is addressed under
    pub reference: EventRef,
    /// Secondary composite qualifier the event is also addressed under
    pub qualifier: Option<EventRef>,
    /// New state of the entity
    pub payload: EventPayload,
    /// Identity that caused the change, if known
    pub actor: Option<ActorId>,
}

impl ChangeEvent {
    /// Create an event for the given reference and payload
    pub fn new(reference: EventRef, payload: EventPayload) -> Self {
        Self {
            reference,
            qualifier: None,
            payload,
            actor: None,
        }
    }

    /// Attach a secondary qualifier reference
    pub fn with_qualifier(mut self, qualifier: EventRef) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// Attach the acting identity
    pub fn with_actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Whether a subscription under `reference` receives this event
    pub fn addressed_to(&self, reference: &EventRef) -> bool {
        reference.matches(&self.reference)
            || self
                .qualifier
                .map_or(false, |qualifier| reference.matches(&qualifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(EventKind::BlockUpdated.as_str(), "block-updated");
        assert_eq!(EventKind::SpaceRemoved.to_string(), "space-removed");
    }

    #[test]
    fn test_wildcard_matches_any_instance() {
        let sub = EventRef::wildcard(EventKind::BlockUpdated);
        let a = EventRef::entity(EventKind::BlockUpdated, Uuid::new_v4());
        let b = EventRef::row(EventKind::BlockUpdated, 3);
        assert!(sub.matches(&a));
        assert!(sub.matches(&b));
        assert!(sub.matches(&EventRef::wildcard(EventKind::BlockUpdated)));
    }

    #[test]
    fn test_discriminated_matches_only_own_instance() {
        let id = Uuid::new_v4();
        let sub = EventRef::entity(EventKind::BlockRemoved, id);
        assert!(sub.matches(&EventRef::entity(EventKind::BlockRemoved, id)));
        assert!(!sub.matches(&EventRef::entity(EventKind::BlockRemoved, Uuid::new_v4())));
        // A discriminated subscriber does not match an undiscriminated event
        assert!(!sub.matches(&EventRef::wildcard(EventKind::BlockRemoved)));
    }

    #[test]
    fn test_kind_mismatch_never_matches() {
        let id = Uuid::new_v4();
        let sub = EventRef::entity(EventKind::BlockUpdated, id);
        assert!(!sub.matches(&EventRef::entity(EventKind::BlockRemoved, id)));
        assert!(!EventRef::wildcard(EventKind::SpaceCreated)
            .matches(&EventRef::wildcard(EventKind::SpaceUpdated)));
    }

    #[test]
    fn test_row_discriminator_equality() {
        let sub = EventRef::row(EventKind::BlockUpdated, 2);
        assert!(sub.matches(&EventRef::row(EventKind::BlockUpdated, 2)));
        assert!(!sub.matches(&EventRef::row(EventKind::BlockUpdated, 3)));
    }

    #[test]
    fn test_event_addressed_by_qualifier() {
        use atrium_core::{Block, Space};

        let space = Space::new("s");
        let block = Block::new(space.id, 2, 10);
        let event = ChangeEvent::new(
            EventRef::entity(EventKind::BlockUpdated, block.id.as_uuid()),
            EventPayload::Block(block.clone()),
        )
        .with_qualifier(EventRef::row(EventKind::BlockUpdated, 2));

        // reachable through the entity id, the row and the wildcard, but a
        // subscription matches a given event at most once
        assert!(event.addressed_to(&EventRef::entity(EventKind::BlockUpdated, block.id.as_uuid())));
        assert!(event.addressed_to(&EventRef::row(EventKind::BlockUpdated, 2)));
        assert!(event.addressed_to(&EventRef::wildcard(EventKind::BlockUpdated)));
        assert!(!event.addressed_to(&EventRef::row(EventKind::BlockUpdated, 3)));
        assert!(!event.addressed_to(&EventRef::row(EventKind::BlockRemoved, 2)));
    }
}
