//! # rxflow: backpressured reactive streams
//!
//! A small Reactive-Streams style protocol ([`Publisher`], [`Subscriber`],
//! [`Subscription`], [`Demand`]) and the machinery that makes demand work
//! across operators, subjects and relays.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxflow::prelude::*;
//!
//! let subject = ReplaySubject::<i32, ()>::new(1);
//! subject.send(1);
//!
//! let seen = MutArc::own(vec![]);
//! let s = seen.clone();
//! let _c = subject.clone().map(|v| v * 10).sink_value(move |v| s.rc_deref_mut().push(v));
//! subject.send(2);
//! assert_eq!(*seen.rc_deref(), vec![10, 20]);
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DemandBuffer`] | Queues signals until the downstream asks for them |
//! | [`Sink`] | Bridges an upstream publisher into a demand buffer |
//! | [`ReplaySubject`] | Multicast with bounded history for late subscribers |
//! | [`PassthroughRelay`] / [`CurrentValueRelay`] | Value-only multicast, finished on drop |
//! | [`AnyCancellable`] / [`CancelBag`] | RAII cancellation handles |
//!
//! ## Feature Flags
//!
//! - **`tokio-runtime`** (default): `PublisherExt::sink_value_async`
//!
//! [`Publisher`]: publisher::Publisher
//! [`Subscriber`]: subscriber::Subscriber
//! [`Subscription`]: subscriber::Subscription
//! [`Demand`]: demand::Demand
//! [`DemandBuffer`]: demand_buffer::DemandBuffer
//! [`Sink`]: sink::Sink
//! [`ReplaySubject`]: subject::ReplaySubject
//! [`PassthroughRelay`]: relay::PassthroughRelay
//! [`CurrentValueRelay`]: relay::CurrentValueRelay
//! [`AnyCancellable`]: subscription::AnyCancellable
//! [`CancelBag`]: subscription::CancelBag

pub mod demand;
pub mod demand_buffer;
pub mod ops;
pub mod prelude;
pub mod publisher;
pub mod rc;
pub mod relay;
pub mod sink;
pub mod sinks;
pub mod subject;
pub mod subscriber;
pub mod subscription;
mod upstream;

// Re-export the prelude module
pub use prelude::*;
