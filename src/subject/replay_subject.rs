use std::{collections::VecDeque, sync::Arc};

use super::subscribers::{Engine, Pending, Subscribers};
use crate::{
  demand::Demand,
  demand_buffer::DemandBuffer,
  publisher::Publisher,
  rc::{MutArc, RcDeref, RcDerefMut, WeakMutArc},
  subscriber::{Completion, Subscriber, Subscription},
};

struct ReplayState<Item, Err> {
  buffer_size: usize,
  history: VecDeque<Item>,
  completion: Option<Completion<Err>>,
  subscribers: Subscribers<Item, Err>,
}

/// A multicast subject that replays its most recent values to new
/// subscribers.
///
/// The subject keeps up to `buffer_size` of the latest values. Each subscriber
/// gets its own [`DemandBuffer`] seeded with that history (oldest first) and,
/// once the subject has terminated, with the terminal event, so a late
/// subscriber still sees how the stream ended.
///
/// History and registration share one lock: a subscriber that subscribes
/// while another thread sends observes the history and the new value in send
/// order, never a torn or reordered sequence. Delivery itself happens outside
/// that lock, so subscribers may call back into the subject.
///
/// ```rust
/// use rxflow::prelude::*;
///
/// let subject = ReplaySubject::<i32, ()>::new(2);
/// subject.send(1);
/// subject.send(2);
/// subject.send(3);
///
/// let received = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
/// let r = received.clone();
/// let _c = subject.clone().sink_value(move |v| r.lock().unwrap().push(v));
/// assert_eq!(*received.lock().unwrap(), vec![2, 3]);
/// ```
pub struct ReplaySubject<Item, Err> {
  state: MutArc<ReplayState<Item, Err>>,
}

impl<Item, Err> Clone for ReplaySubject<Item, Err> {
  fn clone(&self) -> Self { Self { state: self.state.clone() } }
}

impl<Item, Err> ReplaySubject<Item, Err> {
  pub fn new(buffer_size: usize) -> Self {
    Self {
      state: MutArc::own(ReplayState {
        buffer_size,
        history: VecDeque::with_capacity(buffer_size),
        completion: None,
        subscribers: Subscribers::default(),
      }),
    }
  }

  pub fn buffer_size(&self) -> usize { self.state.rc_deref().buffer_size }

  /// Number of registered subscriptions.
  pub fn subscriber_count(&self) -> usize { self.state.rc_deref().subscribers.len() }

  /// Identities of the registered subscriptions, in registration order.
  pub fn subscription_ids(&self) -> Vec<usize> { self.state.rc_deref().subscribers.ids() }

  pub fn is_terminated(&self) -> bool { self.state.rc_deref().completion.is_some() }
}

impl<Item, Err> ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  /// Record `value` in the history and push it to every subscriber.
  ///
  /// Does nothing once the subject has terminated.
  pub fn send(&self, value: Item) { self.send_inspect(value, |_| {}) }

  /// [`send`](Self::send), running `inspect` on the value before the subject
  /// lock is released.
  pub(crate) fn send_inspect(&self, value: Item, inspect: impl FnOnce(&Item)) {
    let pending = {
      let mut state = self.state.rc_deref_mut();
      if state.completion.is_some() {
        tracing::trace!("replay subject dropped a value sent after termination");
        return;
      }
      if state.buffer_size > 0 {
        if state.history.len() == state.buffer_size {
          state.history.pop_front();
        }
        state.history.push_back(value.clone());
      }
      inspect(&value);
      state.subscribers.enqueue_value(value)
    };
    drain(pending);
  }

  /// Terminate the subject. Only the first completion counts.
  pub fn send_completion(&self, completion: Completion<Err>) {
    let pending = {
      let mut state = self.state.rc_deref_mut();
      if state.completion.is_some() {
        return;
      }
      state.completion = Some(completion.clone());
      tracing::debug!(
        subscribers = state.subscribers.len(),
        failed = completion.is_failed(),
        "replay subject terminated"
      );
      state.subscribers.enqueue_completion(completion)
    };
    drain(pending);
  }

  /// Snapshot of the replayed values, oldest first.
  pub fn history(&self) -> Vec<Item> { self.state.rc_deref().history.iter().cloned().collect() }

  /// The most recent value still in the history.
  pub fn latest(&self) -> Option<Item> { self.state.rc_deref().history.back().cloned() }
}

fn drain<Item, Err>(pending: Pending<Item, Err>) {
  for engine in pending {
    engine.try_drain();
  }
}

impl<Item, Err> Publisher for ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Item, Err> + Send + 'static,
  {
    let engine: Engine<Item, Err> = Arc::new(DemandBuffer::new(Box::new(subscriber)));
    let id = {
      let mut state = self.state.rc_deref_mut();
      for value in state.history.iter() {
        engine.enqueue(value.clone());
      }
      match state.completion.clone() {
        Some(completion) => {
          engine.enqueue_completion(completion);
          None
        }
        None => Some(state.subscribers.add(engine.clone())),
      }
    };
    tracing::trace!(?id, "replay subject subscribed");
    let subscription =
      Arc::new(ReplaySubscription { subject: self.state.downgrade(), engine: engine.clone(), id });
    engine.start(subscription);
  }
}

impl<Item, Err> Publisher for &ReplaySubject<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Item, Err> + Send + 'static,
  {
    self.clone().subscribe(subscriber)
  }
}

struct ReplaySubscription<Item, Err> {
  subject: WeakMutArc<ReplayState<Item, Err>>,
  engine: Engine<Item, Err>,
  /// `None` when the subject had already terminated at subscribe time.
  id: Option<usize>,
}

impl<Item, Err> Subscription for ReplaySubscription<Item, Err>
where
  Item: Send,
  Err: Send,
{
  fn request(&self, demand: Demand) { self.engine.request(demand); }

  fn cancel(&self) {
    self.engine.cancel();
    if let (Some(id), Some(subject)) = (self.id, self.subject.upgrade()) {
      let removed = subject.rc_deref_mut().subscribers.remove(id);
      if removed.is_some() {
        tracing::trace!(id, "replay subscription cancelled");
      }
    }
  }
}
