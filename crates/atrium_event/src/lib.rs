//! # atrium_event - Reference Router
//!
//! In-process publish/subscribe keyed by structured event references:
//! - Typed event kinds (created/updated/removed per entity type)
//! - Optional instance discriminators for scoped subscriptions
//! - Fire-and-forget delivery; a panicking handler never stalls the rest
//! - Channel subscriptions for transport adapters
//!
//! No persistence or replay: a subscriber not registered at publish time
//! misses the event (at-most-once, best-effort).

pub mod bus;
pub mod reference;

pub use bus::{DeliveryStats, EventBus, SubscriptionId};
pub use reference::{ChangeEvent, Discriminator, EventKind, EventPayload, EventRef};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bus::{EventBus, SubscriptionId};
    pub use crate::reference::{ChangeEvent, Discriminator, EventKind, EventPayload, EventRef};
}
