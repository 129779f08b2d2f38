use std::sync::Arc;

use smallvec::SmallVec;

use crate::{
  demand_buffer::DemandBuffer,
  subscriber::Completion,
  subscription::DynamicSubscriptions,
};

pub(crate) type Engine<Item, Err> = Arc<DemandBuffer<Item, Err>>;

/// Engines that still have to be drained after the subject lock is released.
pub(crate) type Pending<Item, Err> = SmallVec<[Engine<Item, Err>; 2]>;

/// The demand buffers of a subject's live subscriptions, in registration
/// order.
///
/// Broadcasting only queues into each buffer; the caller drains the returned
/// engines once it has released the lock guarding this container.
pub(crate) struct Subscribers<Item, Err> {
  inner: DynamicSubscriptions<Engine<Item, Err>>,
}

impl<Item, Err> Default for Subscribers<Item, Err> {
  fn default() -> Self { Self { inner: DynamicSubscriptions::default() } }
}

impl<Item, Err> Subscribers<Item, Err> {
  #[inline]
  pub(crate) fn add(&mut self, engine: Engine<Item, Err>) -> usize { self.inner.add(engine) }

  #[inline]
  pub(crate) fn remove(&mut self, id: usize) -> Option<Engine<Item, Err>> { self.inner.remove(id) }

  #[inline]
  pub(crate) fn len(&self) -> usize { self.inner.len() }

  pub(crate) fn ids(&self) -> Vec<usize> { self.inner.ids().collect() }

  /// Queue `value` into every buffer. The last one receives the moved value.
  pub(crate) fn enqueue_value(&self, value: Item) -> Pending<Item, Err>
  where
    Item: Clone,
  {
    let mut pending = Pending::new();
    let mut iter = self.inner.iter().peekable();
    while let Some(engine) = iter.next() {
      if iter.peek().is_some() {
        engine.enqueue(value.clone());
      } else {
        engine.enqueue(value);
        pending.push(engine.clone());
        break;
      }
      pending.push(engine.clone());
    }
    pending
  }

  /// Queue `completion` into every buffer and empty the container.
  pub(crate) fn enqueue_completion(&mut self, completion: Completion<Err>) -> Pending<Item, Err>
  where
    Err: Clone,
  {
    let pending: Pending<Item, Err> = self.inner.drain().collect();
    for engine in &pending {
      engine.enqueue_completion(completion.clone());
    }
    pending
  }
}
