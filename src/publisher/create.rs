use std::{
  marker::PhantomData,
  sync::{Arc, Weak},
};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  demand_buffer::DemandBuffer,
  publisher::Publisher,
  subscriber::{Completion, Subscriber, Subscription},
  subscription::{AnyCancellable, Cancellable},
};

/// Build a publisher from an imperative push callback.
///
/// `factory` runs once per subscription with an [`Emitter`] and returns the
/// cleanup to run when the subscription ends. Values emitted before the
/// subscriber has demand are buffered. The cleanup runs exactly once: on
/// cancel, or right after the terminal event has been delivered.
///
/// ```rust
/// use rxflow::prelude::*;
///
/// let values = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
/// let v = values.clone();
/// let _c = create(|emitter: Emitter<i32, ()>| {
///   emitter.send(1);
///   emitter.send(2);
///   emitter.send_completion(Completion::Finished);
///   AnyCancellable::empty()
/// })
/// .sink_value(move |x| v.lock().unwrap().push(x));
/// assert_eq!(*values.lock().unwrap(), vec![1, 2]);
/// ```
pub fn create<Item, Err, F>(factory: F) -> Create<Item, Err, F>
where
  F: FnOnce(Emitter<Item, Err>) -> AnyCancellable,
{
  Create { factory, _p: PhantomData }
}

pub struct Create<Item, Err, F> {
  factory: F,
  _p: PhantomData<fn() -> (Item, Err)>,
}

struct CreateShared<Item, Err> {
  buffer: DemandBuffer<Item, Err>,
  cleanup: Mutex<Option<AnyCancellable>>,
}

impl<Item, Err> CreateShared<Item, Err> {
  fn finish_if_ended(&self) {
    if self.buffer.is_terminated() || self.buffer.is_cancelled() {
      let cleanup = self.cleanup.lock().take();
      if let Some(cleanup) = cleanup {
        tracing::trace!("create publisher running cleanup");
        cleanup.cancel();
      }
    }
  }
}

/// The push side of a [`create`] publisher.
///
/// It does not keep the subscription alive; once the subscription is gone
/// every call is a no-op.
pub struct Emitter<Item, Err> {
  shared: Weak<CreateShared<Item, Err>>,
}

impl<Item, Err> Clone for Emitter<Item, Err> {
  fn clone(&self) -> Self { Self { shared: self.shared.clone() } }
}

impl<Item, Err> Emitter<Item, Err> {
  pub fn send(&self, value: Item) {
    if let Some(shared) = self.shared.upgrade() {
      shared.buffer.buffer(value);
    }
  }

  pub fn send_completion(&self, completion: Completion<Err>) {
    if let Some(shared) = self.shared.upgrade() {
      shared.buffer.complete(completion);
      shared.finish_if_ended();
    }
  }

  /// Whether the subscription is still interested in values.
  pub fn is_active(&self) -> bool {
    self
      .shared
      .upgrade()
      .is_some_and(|shared| !shared.buffer.is_cancelled() && !shared.buffer.is_completing())
  }
}

struct CreateSubscription<Item, Err>(Arc<CreateShared<Item, Err>>);

impl<Item: Send, Err: Send> Subscription for CreateSubscription<Item, Err> {
  fn request(&self, demand: Demand) {
    self.0.buffer.request(demand);
    self.0.finish_if_ended();
  }

  fn cancel(&self) {
    self.0.buffer.cancel();
    self.0.finish_if_ended();
  }
}

impl<Item, Err, F> Publisher for Create<Item, Err, F>
where
  Item: Send + 'static,
  Err: Send + 'static,
  F: FnOnce(Emitter<Item, Err>) -> AnyCancellable,
{
  type Item = Item;
  type Err = Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Item, Err> + Send + 'static,
  {
    let shared = Arc::new(CreateShared {
      buffer: DemandBuffer::new(Box::new(subscriber)),
      cleanup: Mutex::new(None),
    });
    let cleanup = (self.factory)(Emitter { shared: Arc::downgrade(&shared) });
    *shared.cleanup.lock() = Some(cleanup);
    shared.buffer.start(Arc::new(CreateSubscription(shared.clone())));
    shared.finish_if_ended();
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::{
    rc::{MutArc, RcDeref, RcDerefMut},
    subscriber::{AnySubscriber, AnySubscription},
  };

  fn counted_cleanup(count: &Arc<AtomicUsize>) -> AnyCancellable {
    let count = count.clone();
    AnyCancellable::new(move || {
      count.fetch_add(1, Ordering::SeqCst);
    })
  }

  #[rxflow_macro::test]
  fn buffers_until_demand_then_cleans_up() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let values = MutArc::own(vec![]);
    let done = MutArc::own(vec![]);
    let subscription: MutArc<Option<AnySubscription>> = MutArc::own(None);

    let (c, v, d, s) = (cleanups.clone(), values.clone(), done.clone(), subscription.clone());
    create(move |emitter: Emitter<i32, &'static str>| {
      for i in 1..=4 {
        emitter.send(i);
      }
      emitter.send_completion(Completion::Finished);
      counted_cleanup(&c)
    })
    .subscribe(AnySubscriber::new(
      move |sub: AnySubscription| {
        sub.request(Demand::max(2));
        *s.rc_deref_mut() = Some(sub);
      },
      move |x| {
        v.rc_deref_mut().push(x);
        Demand::NONE
      },
      move |completion| d.rc_deref_mut().push(completion),
    ));

    assert_eq!(*values.rc_deref(), vec![1, 2]);
    assert!(done.rc_deref().is_empty());
    assert_eq!(cleanups.load(Ordering::SeqCst), 0);

    let sub = subscription.rc_deref().clone();
    if let Some(sub) = sub {
      sub.request(Demand::max(2));
    }
    assert_eq!(*values.rc_deref(), vec![1, 2, 3, 4]);
    assert_eq!(*done.rc_deref(), vec![Completion::Finished]);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
  }

  #[rxflow_macro::test]
  fn cancel_runs_cleanup_once() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let emitter_slot: MutArc<Option<Emitter<i32, ()>>> = MutArc::own(None);
    let values = MutArc::own(vec![]);

    let (c, e, v) = (cleanups.clone(), emitter_slot.clone(), values.clone());
    let subscription: MutArc<Option<AnySubscription>> = MutArc::own(None);
    let s = subscription.clone();
    create(move |emitter: Emitter<i32, ()>| {
      *e.rc_deref_mut() = Some(emitter);
      counted_cleanup(&c)
    })
    .subscribe(AnySubscriber::new(
      move |sub: AnySubscription| {
        sub.request(Demand::Unlimited);
        *s.rc_deref_mut() = Some(sub);
      },
      move |x| {
        v.rc_deref_mut().push(x);
        Demand::NONE
      },
      |_| {},
    ));

    let emitter = emitter_slot.take();
    assert!(emitter.as_ref().is_some_and(Emitter::is_active));
    if let Some(emitter) = &emitter {
      emitter.send(5);
    }

    let sub = subscription.take();
    if let Some(sub) = sub {
      sub.cancel();
      sub.cancel();
    }
    if let Some(emitter) = &emitter {
      emitter.send(6);
      assert!(!emitter.is_active());
    }
    assert_eq!(*values.rc_deref(), vec![5]);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
  }
}
