//! Change publisher
//!
//! Translates committed store mutations into bus publications. One event is
//! published per logically-changed entity, so discriminator-scoped
//! subscribers still see their instance when a shift touches many blocks.
//! Publication always happens after the commit; subscribers never observe
//! speculative state.

use std::sync::Arc;

use atrium_core::{ActorId, Block, Space, Translation};
use atrium_event::{ChangeEvent, EventBus, EventKind, EventPayload, EventRef};

/// Publishes entity changes on the event bus
#[derive(Clone)]
pub struct ChangePublisher {
    bus: Arc<EventBus>,
}

impl ChangePublisher {
    /// Create a publisher over the given bus
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    /// The underlying bus
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    fn publish(&self, kind: EventKind, payload: EventPayload, actor: Option<ActorId>) {
        let (reference, qualifier) = match &payload {
            EventPayload::Space(space) => (EventRef::entity(kind, space.id.as_uuid()), None),
            EventPayload::Block(block) => (
                EventRef::entity(kind, block.id.as_uuid()),
                Some(EventRef::row(kind, block.row)),
            ),
            EventPayload::Translation(t) => (EventRef::entity(kind, t.id.as_uuid()), None),
        };
        let mut event = ChangeEvent::new(reference, payload);
        event.qualifier = qualifier;
        event.actor = actor;
        let delivered = self.bus.publish(&event);
        log::debug!("published {} to {} handlers", reference, delivered);
    }

    /// A space was created
    pub fn space_created(&self, space: &Space, actor: Option<ActorId>) {
        self.publish(EventKind::SpaceCreated, EventPayload::Space(space.clone()), actor);
    }

    /// A space was updated
    pub fn space_updated(&self, space: &Space, actor: Option<ActorId>) {
        self.publish(EventKind::SpaceUpdated, EventPayload::Space(space.clone()), actor);
    }

    /// A space was removed; payload carries its final state
    pub fn space_removed(&self, space: &Space, actor: Option<ActorId>) {
        self.publish(EventKind::SpaceRemoved, EventPayload::Space(space.clone()), actor);
    }

    /// A block was created
    pub fn block_created(&self, block: &Block, actor: Option<ActorId>) {
        self.publish(EventKind::BlockCreated, EventPayload::Block(block.clone()), actor);
    }

    /// A block was updated (content, position or size)
    pub fn block_updated(&self, block: &Block, actor: Option<ActorId>) {
        self.publish(EventKind::BlockUpdated, EventPayload::Block(block.clone()), actor);
    }

    /// A block was removed; payload carries its final state
    pub fn block_removed(&self, block: &Block, actor: Option<ActorId>) {
        self.publish(EventKind::BlockRemoved, EventPayload::Block(block.clone()), actor);
    }

    /// A translation was created
    pub fn translation_created(&self, translation: &Translation, actor: Option<ActorId>) {
        self.publish(
            EventKind::TranslationCreated,
            EventPayload::Translation(translation.clone()),
            actor,
        );
    }

    /// A translation was updated
    pub fn translation_updated(&self, translation: &Translation, actor: Option<ActorId>) {
        self.publish(
            EventKind::TranslationUpdated,
            EventPayload::Translation(translation.clone()),
            actor,
        );
    }

    /// A translation was removed
    pub fn translation_removed(&self, translation: &Translation, actor: Option<ActorId>) {
        self.publish(
            EventKind::TranslationRemoved,
            EventPayload::Translation(translation.clone()),
            actor,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_one_event_per_entity() {
        let bus = Arc::new(EventBus::new());
        let publisher = ChangePublisher::new(Arc::clone(&bus));

        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);
        bus.subscribe(EventRef::wildcard(EventKind::BlockUpdated), move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        let space = Space::new("s");
        let blocks = [
            Block::new(space.id, 0, 10),
            Block::new(space.id, 0, 10),
            Block::new(space.id, 0, 10),
        ];
        for block in &blocks {
            publisher.block_updated(block, None);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_actor_is_carried() {
        let bus = Arc::new(EventBus::new());
        let publisher = ChangePublisher::new(Arc::clone(&bus));
        let (_id, rx) = bus.subscribe_channel(EventRef::wildcard(EventKind::SpaceCreated));

        let actor = ActorId::generate();
        publisher.space_created(&Space::new("s"), Some(actor));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.actor, Some(actor));
    }
}
