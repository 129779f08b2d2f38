//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Protocol
pub use crate::demand::Demand;
// Engine
pub use crate::demand_buffer::DemandBuffer;
// Publishers and operators
pub use crate::publisher::{create, from_iter, Create, Emitter, FromIter, Publisher, PublisherExt};
// Shared slots
pub use crate::rc::{MutArc, RcDeref, RcDerefMut};
// Relays
pub use crate::relay::{CurrentValueRelay, PassthroughRelay, Relay, UnitRelay};
pub use crate::sink::Sink;
// Subject
pub use crate::subject::*;
pub use crate::subscriber::{
  AnySubscriber, AnySubscription, BoxedSubscriber, Completion, Subscriber, Subscription,
};
// Subscription
pub use crate::subscription::*;
