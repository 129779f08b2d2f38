//! Subscriber side of the protocol.
//!
//! A subscriber first receives a [`Subscription`], through which it requests
//! [`Demand`]. It then receives at most as many values as it requested,
//! followed by at most one [`Completion`].
use std::{fmt::Debug, sync::Arc};

use crate::demand::Demand;

// ============================================================================
// Completion
// ============================================================================

/// The terminal event of a stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Completion<Err> {
  Finished,
  Failed(Err),
}

impl<Err> Completion<Err> {
  #[inline]
  pub fn is_finished(&self) -> bool { matches!(self, Completion::Finished) }

  #[inline]
  pub fn is_failed(&self) -> bool { matches!(self, Completion::Failed(_)) }

  pub fn map_err<E2>(self, f: impl FnOnce(Err) -> E2) -> Completion<E2> {
    match self {
      Completion::Finished => Completion::Finished,
      Completion::Failed(err) => Completion::Failed(f(err)),
    }
  }

  pub fn err(self) -> Option<Err> {
    match self {
      Completion::Finished => None,
      Completion::Failed(err) => Some(err),
    }
  }
}

// ============================================================================
// Subscription
// ============================================================================

/// The handle a subscriber uses to pull values and to stop the stream.
///
/// Both methods may be called from any thread, and from inside the
/// subscriber's own callbacks.
pub trait Subscription: Send + Sync {
  /// Ask for `demand` more values.
  fn request(&self, demand: Demand);

  /// Stop the stream. Only the first call has an effect.
  fn cancel(&self);
}

/// Shared, type-erased subscription handle.
pub type AnySubscription = Arc<dyn Subscription>;

// ============================================================================
// Subscriber
// ============================================================================

pub trait Subscriber<Item, Err> {
  /// Called once, before any other signal.
  fn receive_subscription(&mut self, subscription: AnySubscription);

  /// Receive a value and return how much *additional* demand to add.
  fn receive(&mut self, value: Item) -> Demand;

  /// Called at most once; no signal follows it.
  fn receive_completion(&mut self, completion: Completion<Err>);
}

/// Owned, type-erased subscriber.
pub type BoxedSubscriber<Item, Err> = Box<dyn Subscriber<Item, Err> + Send>;

impl<Item, Err, S> Subscriber<Item, Err> for Box<S>
where
  S: Subscriber<Item, Err> + ?Sized,
{
  #[inline]
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    (**self).receive_subscription(subscription)
  }

  #[inline]
  fn receive(&mut self, value: Item) -> Demand { (**self).receive(value) }

  #[inline]
  fn receive_completion(&mut self, completion: Completion<Err>) {
    (**self).receive_completion(completion)
  }
}

// ============================================================================
// AnySubscriber - Closure adapter
// ============================================================================

type OnSubscription = Box<dyn FnMut(AnySubscription) + Send>;
type OnValue<Item> = Box<dyn FnMut(Item) -> Demand + Send>;
type OnCompletion<Err> = Box<dyn FnMut(Completion<Err>) + Send>;

/// A subscriber assembled from closures.
///
/// Unlike the `sink` helpers, it leaves demand entirely to the caller: the
/// subscription callback decides the initial request and the value callback
/// returns any extra demand.
///
/// ```rust
/// use rxflow::prelude::*;
///
/// let subject = ReplaySubject::<i32, ()>::new(4);
/// subject.send(1);
/// subject.send(2);
///
/// let subscriber = AnySubscriber::new(
///   |subscription: AnySubscription| subscription.request(Demand::max(1)),
///   |v| {
///     assert_eq!(v, 1);
///     Demand::NONE
///   },
///   |_| {},
/// );
/// subject.subscribe(subscriber);
/// ```
pub struct AnySubscriber<Item, Err> {
  on_subscription: OnSubscription,
  on_value: OnValue<Item>,
  on_completion: OnCompletion<Err>,
}

impl<Item, Err> AnySubscriber<Item, Err> {
  pub fn new(
    on_subscription: impl FnMut(AnySubscription) + Send + 'static,
    on_value: impl FnMut(Item) -> Demand + Send + 'static,
    on_completion: impl FnMut(Completion<Err>) + Send + 'static,
  ) -> Self {
    Self {
      on_subscription: Box::new(on_subscription),
      on_value: Box::new(on_value),
      on_completion: Box::new(on_completion),
    }
  }
}

impl<Item, Err> Subscriber<Item, Err> for AnySubscriber<Item, Err> {
  #[inline]
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    (self.on_subscription)(subscription)
  }

  #[inline]
  fn receive(&mut self, value: Item) -> Demand { (self.on_value)(value) }

  #[inline]
  fn receive_completion(&mut self, completion: Completion<Err>) { (self.on_completion)(completion) }
}

impl<Item, Err> Debug for AnySubscriber<Item, Err> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AnySubscriber").finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::rc::{MutArc, RcDeref, RcDerefMut};

  struct NoopSubscription;

  impl Subscription for NoopSubscription {
    fn request(&self, _: Demand) {}
    fn cancel(&self) {}
  }

  #[rxflow_macro::test]
  fn completion_helpers() {
    let failed: Completion<&str> = Completion::Failed("boom");
    assert!(failed.is_failed());
    assert_eq!(failed.map_err(str::len), Completion::Failed(4));
    assert_eq!(Completion::<&str>::Finished.err(), None);
    assert_eq!(Completion::Failed(1).err(), Some(1));
  }

  #[rxflow_macro::test]
  fn any_subscriber_dispatches_to_closures() {
    let log = MutArc::own(vec![]);
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    let mut subscriber: BoxedSubscriber<i32, ()> = Box::new(AnySubscriber::new(
      move |_| l1.rc_deref_mut().push("subscription".to_string()),
      move |v| {
        l2.rc_deref_mut().push(format!("value {v}"));
        Demand::max(1)
      },
      move |c: Completion<()>| l3.rc_deref_mut().push(format!("{c:?}")),
    ));

    subscriber.receive_subscription(Arc::new(NoopSubscription));
    assert_eq!(subscriber.receive(7), Demand::max(1));
    subscriber.receive_completion(Completion::Finished);

    assert_eq!(*log.rc_deref(), vec!["subscription", "value 7", "Finished"]);
  }
}
