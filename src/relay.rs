//! Value-only multicast sources.
//!
//! A relay is a subject that never terminates on its own: it accepts values,
//! forwards values from publishers it is subscribed to, and drops their
//! completions. Its subscribers finish exactly once, when the relay itself is
//! dropped. Cancelling a relay subscription just removes it.
use std::{convert::Infallible, sync::Arc};

use crate::{
  demand::Demand,
  publisher::Publisher,
  rc::{MutArc, RcDeref, RcDerefMut, WeakMutArc},
  sink::Sink,
  subject::ReplaySubject,
  subscriber::{AnySubscription, Completion, Subscriber, Subscription},
  subscription::{AnyCancellable, DynamicSubscriptions},
  upstream::Upstream,
};

mod current_value_relay;
mod passthrough_relay;

pub use current_value_relay::CurrentValueRelay;
pub use passthrough_relay::PassthroughRelay;

pub trait Relay {
  type Item;

  /// Send `value` to every subscriber.
  fn accept(&self, value: Self::Item);

  /// Forward every value `publisher` emits into this relay. Its completion is
  /// ignored. Dropping the returned handle stops the forwarding.
  fn subscribe_to<P>(&self, publisher: P) -> AnyCancellable
  where
    P: Publisher<Item = Self::Item>,
    P::Err: 'static;
}

/// Relays of `()`.
pub trait UnitRelay: Relay<Item = ()> {
  fn accept_unit(&self) { self.accept(()) }
}

impl<R: Relay<Item = ()>> UnitRelay for R {}

type RelaySink<Item> = Sink<Item, Infallible, Item, Infallible>;

/// Forces one subscription to finish.
type Finisher = Box<dyn FnOnce() + Send>;

/// State shared by both relay flavours.
pub(crate) struct RelayCore<Item> {
  subject: ReplaySubject<Item, Infallible>,
  finishers: MutArc<DynamicSubscriptions<Finisher>>,
  /// Mirrors the latest accepted value for relays that expose it.
  current: Option<MutArc<Item>>,
}

impl<Item> Clone for RelayCore<Item> {
  fn clone(&self) -> Self {
    Self {
      subject: self.subject.clone(),
      finishers: self.finishers.clone(),
      current: self.current.clone(),
    }
  }
}

impl<Item> RelayCore<Item> {
  pub(crate) fn subscriber_count(&self) -> usize { self.finishers.rc_deref().len() }

  /// Finish every live subscription. Called when the owning relay drops.
  pub(crate) fn finish_all(&self) {
    let finishers: Vec<_> = self.finishers.rc_deref_mut().drain().collect();
    tracing::debug!(subscribers = finishers.len(), "relay dropped, finishing subscribers");
    for finish in finishers {
      finish();
    }
  }
}

impl<Item> RelayCore<Item>
where
  Item: Clone + Send + 'static,
{
  pub(crate) fn passthrough() -> Self {
    Self { subject: ReplaySubject::new(0), finishers: MutArc::own(Default::default()), current: None }
  }

  /// A core replaying `current` to new subscribers and keeping it up to date.
  pub(crate) fn current_value(current: MutArc<Item>) -> Self {
    let subject = ReplaySubject::new(1);
    subject.send(current.rc_deref().clone());
    Self { subject, finishers: MutArc::own(Default::default()), current: Some(current) }
  }

  pub(crate) fn accept(&self, value: Item) {
    match &self.current {
      Some(current) => self
        .subject
        .send_inspect(value, |value| *current.rc_deref_mut() = value.clone()),
      None => self.subject.send(value),
    }
  }

  pub(crate) fn subscribe<S>(&self, subscriber: S)
  where
    S: Subscriber<Item, Infallible> + Send + 'static,
  {
    let sink = RelaySink::passthrough(subscriber);
    sink.suppress_completion();
    let finisher = sink.clone();
    let id = self
      .finishers
      .rc_deref_mut()
      .add(Box::new(move || finisher.force_finish()));
    sink.attach(self.subject.clone());
    sink.start(Arc::new(RelaySubscription {
      sink: sink.clone(),
      finishers: self.finishers.downgrade(),
      id,
    }));
  }

  pub(crate) fn subscribe_to<P>(&self, publisher: P) -> AnyCancellable
  where
    P: Publisher<Item = Item>,
    P::Err: 'static,
  {
    let forwarder =
      ValueForwarder { relay: self.clone(), upstream: Upstream::with_demand(Demand::Unlimited) };
    let upstream = forwarder.upstream.clone();
    publisher.subscribe(forwarder);
    AnyCancellable::new(move || {
      upstream.cancel();
    })
  }
}

struct RelaySubscription<Item> {
  sink: RelaySink<Item>,
  finishers: WeakMutArc<DynamicSubscriptions<Finisher>>,
  id: usize,
}

impl<Item> Subscription for RelaySubscription<Item>
where
  Item: Send + 'static,
{
  fn request(&self, demand: Demand) { self.sink.demand(demand); }

  fn cancel(&self) {
    self.sink.cancel();
    if let Some(finishers) = self.finishers.upgrade() {
      if finishers.rc_deref_mut().remove(self.id).is_some() {
        tracing::trace!(id = self.id, "relay subscription cancelled");
      }
    }
  }
}

/// Forwards values into a relay and ignores the completion.
struct ValueForwarder<Item> {
  relay: RelayCore<Item>,
  upstream: Upstream,
}

impl<Item, Err> Subscriber<Item, Err> for ValueForwarder<Item>
where
  Item: Clone + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.upstream.attach(subscription);
  }

  fn receive(&mut self, value: Item) -> Demand {
    self.relay.accept(value);
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    tracing::trace!(failed = completion.is_failed(), "relay ignored an upstream completion");
  }
}
