//! Demand-respecting delivery engine.
//!
//! A [`DemandBuffer`] sits in front of exactly one downstream subscriber. It
//! queues values and at most one completion, and releases them only as far as
//! the downstream's outstanding demand allows:
//!
//! - values are delivered in the order they were queued;
//! - a value is delivered only while outstanding demand is positive, and each
//!   delivery consumes one unit of it;
//! - the completion is delivered once the queue is empty, exactly once, and
//!   nothing is delivered after it;
//! - after [`cancel`](DemandBuffer::cancel) nothing more is delivered, not even
//!   a pending completion.
//!
//! Delivery happens on whichever thread wins the right to drain, and always
//! without holding the state lock, so the downstream may call back into the
//! buffer (request more, cancel, or cause new values to be queued) from inside
//! its callbacks. Work arriving while a drain is in progress is picked up by
//! that drain before it releases.
use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  subscriber::{AnySubscription, BoxedSubscriber, Completion},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Status {
  Active,
  Terminated,
  Cancelled,
}

struct BufferState<Item, Err> {
  queue: VecDeque<Item>,
  /// Demand the downstream granted that no value has consumed yet.
  outstanding: Demand,
  /// Demand granted since it was last handed back to the caller.
  unsent: Demand,
  completion: Option<Completion<Err>>,
  /// Whether some thread currently owns delivery.
  draining: bool,
  status: Status,
}

enum Step<Item, Err> {
  Value(Item),
  Complete(Completion<Err>),
  Cancelled,
  Idle(Demand),
}

pub struct DemandBuffer<Item, Err> {
  state: Mutex<BufferState<Item, Err>>,
  /// Only touched by the thread that owns delivery.
  downstream: Mutex<Option<BoxedSubscriber<Item, Err>>>,
}

impl<Item, Err> DemandBuffer<Item, Err> {
  /// Create a buffer for `downstream`.
  ///
  /// Nothing is delivered until [`start`](DemandBuffer::start) hands the
  /// downstream its subscription. Values and a completion queued before that
  /// are kept.
  pub fn new(downstream: BoxedSubscriber<Item, Err>) -> Self {
    Self {
      state: Mutex::new(BufferState {
        queue: VecDeque::new(),
        outstanding: Demand::NONE,
        unsent: Demand::NONE,
        completion: None,
        draining: true,
        status: Status::Active,
      }),
      downstream: Mutex::new(Some(downstream)),
    }
  }

  /// Give the downstream its subscription, then deliver whatever it asks for.
  ///
  /// Must be called once. Returns the demand granted during the call that
  /// values already queued did not satisfy.
  pub fn start(&self, subscription: AnySubscription) -> Demand {
    if let Some(downstream) = self.downstream.lock().as_mut() {
      downstream.receive_subscription(subscription);
    }
    self.drain()
  }

  /// Queue a value without delivering it.
  ///
  /// Returns `false`, dropping the value, once a completion has been queued or
  /// the buffer was cancelled.
  pub fn enqueue(&self, value: Item) -> bool {
    let mut state = self.state.lock();
    if state.status != Status::Active || state.completion.is_some() {
      tracing::trace!(status = ?state.status, "value dropped by closed demand buffer");
      return false;
    }
    state.queue.push_back(value);
    true
  }

  /// Queue the completion without delivering it. Only the first one counts.
  pub fn enqueue_completion(&self, completion: Completion<Err>) -> bool {
    let mut state = self.state.lock();
    if state.status != Status::Active || state.completion.is_some() {
      return false;
    }
    state.completion = Some(completion);
    true
  }

  /// Queue a value and deliver as much as demand allows.
  ///
  /// Returns the demand the downstream granted meanwhile; zero if another
  /// thread is delivering.
  pub fn buffer(&self, value: Item) -> Demand {
    if self.enqueue(value) { self.try_drain() } else { Demand::NONE }
  }

  /// Queue the completion and deliver if nothing stands before it.
  pub fn complete(&self, completion: Completion<Err>) {
    if self.enqueue_completion(completion) {
      self.try_drain();
    }
  }

  /// Add downstream demand and deliver what it releases.
  ///
  /// Returns the demand that should be forwarded upstream. Zero if another
  /// thread is delivering: that thread hands the demand back instead.
  pub fn request(&self, demand: Demand) -> Demand {
    {
      let mut state = self.state.lock();
      if state.status != Status::Active {
        return Demand::NONE;
      }
      state.outstanding += demand;
      state.unsent += demand;
      if state.draining {
        return Demand::NONE;
      }
      state.draining = true;
    }
    self.drain()
  }

  /// Deliver queued work unless another thread is already doing so.
  pub fn try_drain(&self) -> Demand {
    {
      let mut state = self.state.lock();
      if state.draining {
        return Demand::NONE;
      }
      state.draining = true;
    }
    self.drain()
  }

  /// Stop delivery for good and release the downstream.
  ///
  /// Queued values and a pending completion are discarded.
  pub fn cancel(&self) {
    let (discarded, release) = {
      let mut state = self.state.lock();
      if state.status != Status::Active {
        return;
      }
      state.status = Status::Cancelled;
      state.completion = None;
      state.outstanding = Demand::NONE;
      state.unsent = Demand::NONE;
      let release = !state.draining;
      state.draining = true;
      (std::mem::take(&mut state.queue), release)
    };
    drop(discarded);
    // Otherwise the thread owning delivery releases it when it sees the flag.
    if release {
      let downstream = self.downstream.lock().take();
      drop(downstream);
    }
  }

  /// Number of values waiting for demand.
  pub fn queued(&self) -> usize { self.state.lock().queue.len() }

  pub fn outstanding(&self) -> Demand { self.state.lock().outstanding }

  /// Whether the completion has been handed to the downstream.
  pub fn is_terminated(&self) -> bool { self.state.lock().status == Status::Terminated }

  pub fn is_cancelled(&self) -> bool { self.state.lock().status == Status::Cancelled }

  /// Whether a completion is queued or already delivered.
  pub fn is_completing(&self) -> bool {
    let state = self.state.lock();
    state.completion.is_some() || state.status == Status::Terminated
  }

  fn next_step(&self) -> Step<Item, Err> {
    let mut state = self.state.lock();
    if state.status != Status::Active {
      return Step::Cancelled;
    }
    if !state.queue.is_empty() && !state.outstanding.is_none() {
      if let Some(value) = state.queue.pop_front() {
        state.outstanding -= 1usize;
        return Step::Value(value);
      }
    }
    if state.queue.is_empty() {
      if let Some(completion) = state.completion.take() {
        state.status = Status::Terminated;
        return Step::Complete(completion);
      }
    }
    state.draining = false;
    Step::Idle(std::mem::take(&mut state.unsent))
  }

  /// Must only run on the thread that set `draining`.
  fn drain(&self) -> Demand {
    loop {
      match self.next_step() {
        Step::Value(value) => {
          let extra = match self.downstream.lock().as_mut() {
            Some(downstream) => downstream.receive(value),
            None => Demand::NONE,
          };
          if !extra.is_none() {
            let mut state = self.state.lock();
            if state.status == Status::Active {
              state.outstanding += extra;
              state.unsent += extra;
            }
          }
        }
        Step::Complete(completion) => {
          let downstream = self.downstream.lock().take();
          if let Some(mut downstream) = downstream {
            downstream.receive_completion(completion);
          }
          return Demand::NONE;
        }
        Step::Cancelled => {
          let downstream = self.downstream.lock().take();
          drop(downstream);
          return Demand::NONE;
        }
        Step::Idle(unsent) => return unsent,
      }
    }
  }
}

impl<Item, Err> std::fmt::Debug for DemandBuffer<Item, Err> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let state = self.state.lock();
    f.debug_struct("DemandBuffer")
      .field("queued", &state.queue.len())
      .field("outstanding", &state.outstanding)
      .field("status", &state.status)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{Arc, Weak};

  use super::*;
  use crate::{
    rc::{MutArc, RcDeref, RcDerefMut},
    subscriber::{Subscriber, Subscription},
  };

  type Buffer = DemandBuffer<i32, &'static str>;

  #[derive(Debug, PartialEq)]
  enum Event {
    Value(i32),
    Done(Completion<&'static str>),
  }

  struct Handle(Weak<Buffer>);

  impl Subscription for Handle {
    fn request(&self, demand: Demand) {
      if let Some(buffer) = self.0.upgrade() {
        buffer.request(demand);
      }
    }

    fn cancel(&self) {
      if let Some(buffer) = self.0.upgrade() {
        buffer.cancel();
      }
    }
  }

  #[derive(Clone, Default)]
  struct Recorder {
    events: MutArc<Vec<Event>>,
    subscription: MutArc<Option<AnySubscription>>,
  }

  impl Recorder {
    fn values(&self) -> Vec<i32> {
      self
        .events
        .rc_deref()
        .iter()
        .filter_map(|e| if let Event::Value(v) = e { Some(*v) } else { None })
        .collect()
    }

    fn completions(&self) -> Vec<Completion<&'static str>> {
      self
        .events
        .rc_deref()
        .iter()
        .filter_map(|e| if let Event::Done(c) = e { Some(*c) } else { None })
        .collect()
    }
  }

  /// Records events and grants `per_value` from `receive`.
  struct Probe {
    recorder: Recorder,
    initial: Demand,
    per_value: Demand,
    request_inline: bool,
  }

  impl Subscriber<i32, &'static str> for Probe {
    fn receive_subscription(&mut self, subscription: AnySubscription) {
      *self.recorder.subscription.rc_deref_mut() = Some(subscription.clone());
      if !self.initial.is_none() {
        subscription.request(self.initial);
      }
    }

    fn receive(&mut self, value: i32) -> Demand {
      self.recorder.events.rc_deref_mut().push(Event::Value(value));
      if self.request_inline {
        let subscription = self.recorder.subscription.rc_deref().clone();
        if let Some(subscription) = subscription {
          subscription.request(self.per_value);
        }
        Demand::NONE
      } else {
        self.per_value
      }
    }

    fn receive_completion(&mut self, completion: Completion<&'static str>) {
      self.recorder.events.rc_deref_mut().push(Event::Done(completion));
    }
  }

  fn started(initial: Demand, per_value: Demand, request_inline: bool) -> (Arc<Buffer>, Recorder) {
    let recorder = Recorder::default();
    let probe = Probe { recorder: recorder.clone(), initial, per_value, request_inline };
    let buffer = Arc::new(Buffer::new(Box::new(probe)));
    buffer.start(Arc::new(Handle(Arc::downgrade(&buffer))));
    (buffer, recorder)
  }

  #[rxflow_macro::test]
  fn delivers_in_order_within_demand() {
    let (buffer, recorder) = started(Demand::NONE, Demand::NONE, false);
    for v in 1..=5 {
      assert_eq!(buffer.buffer(v), Demand::NONE);
    }
    assert!(recorder.values().is_empty());
    assert_eq!(buffer.queued(), 5);

    buffer.request(Demand::max(2));
    assert_eq!(recorder.values(), vec![1, 2]);
    assert_eq!(buffer.outstanding(), Demand::NONE);

    buffer.request(Demand::Unlimited);
    assert_eq!(recorder.values(), vec![1, 2, 3, 4, 5]);
    assert_eq!(buffer.outstanding(), Demand::Unlimited);
  }

  #[rxflow_macro::test]
  fn values_queued_before_start_are_kept() {
    let recorder = Recorder::default();
    let probe = Probe {
      recorder: recorder.clone(),
      initial: Demand::max(2),
      per_value: Demand::NONE,
      request_inline: false,
    };
    let buffer = Arc::new(Buffer::new(Box::new(probe)));
    buffer.buffer(1);
    buffer.buffer(2);
    buffer.buffer(3);
    assert!(recorder.values().is_empty());

    buffer.start(Arc::new(Handle(Arc::downgrade(&buffer))));
    assert_eq!(recorder.values(), vec![1, 2]);
    assert_eq!(buffer.queued(), 1);
  }

  #[rxflow_macro::test]
  fn completion_waits_for_queue() {
    let (buffer, recorder) = started(Demand::NONE, Demand::NONE, false);
    buffer.buffer(1);
    buffer.buffer(2);
    buffer.complete(Completion::Finished);
    assert!(recorder.completions().is_empty());
    assert!(!buffer.is_terminated());
    assert!(buffer.is_completing());

    buffer.request(Demand::max(1));
    assert_eq!(recorder.values(), vec![1]);
    assert!(recorder.completions().is_empty());

    buffer.request(Demand::max(1));
    assert_eq!(*recorder.events.rc_deref(), vec![
      Event::Value(1),
      Event::Value(2),
      Event::Done(Completion::Finished)
    ]);
    assert!(buffer.is_terminated());
  }

  #[rxflow_macro::test]
  fn completion_without_demand_when_queue_is_empty() {
    let (buffer, recorder) = started(Demand::NONE, Demand::NONE, false);
    buffer.complete(Completion::Failed("boom"));
    assert_eq!(recorder.completions(), vec![Completion::Failed("boom")]);
  }

  #[rxflow_macro::test]
  fn terminal_is_delivered_once() {
    let (buffer, recorder) = started(Demand::Unlimited, Demand::NONE, false);
    buffer.complete(Completion::Finished);
    buffer.complete(Completion::Failed("late"));
    assert!(!buffer.enqueue(9));
    assert_eq!(buffer.buffer(9), Demand::NONE);
    assert_eq!(buffer.request(Demand::max(3)), Demand::NONE);
    assert_eq!(*recorder.events.rc_deref(), vec![Event::Done(Completion::Finished)]);
  }

  #[rxflow_macro::test]
  fn demand_returned_from_receive_is_added() {
    let (buffer, recorder) = started(Demand::max(1), Demand::max(1), false);
    for v in 0..4 {
      buffer.buffer(v);
    }
    assert_eq!(recorder.values(), vec![0, 1, 2, 3]);
    assert_eq!(buffer.outstanding(), Demand::max(1));
  }

  #[rxflow_macro::test]
  fn reentrant_request_is_honoured() {
    let recorder = Recorder::default();
    let probe = Probe {
      recorder: recorder.clone(),
      initial: Demand::max(1),
      per_value: Demand::max(1),
      request_inline: true,
    };
    let buffer = Arc::new(Buffer::new(Box::new(probe)));
    for v in 1..=3 {
      buffer.enqueue(v);
    }
    buffer.start(Arc::new(Handle(Arc::downgrade(&buffer))));
    assert_eq!(recorder.values(), vec![1, 2, 3]);
  }

  #[rxflow_macro::test]
  fn request_hands_back_unsatisfied_demand() {
    let (buffer, _recorder) = started(Demand::NONE, Demand::NONE, false);
    assert_eq!(buffer.request(Demand::max(3)), Demand::max(3));
    assert_eq!(buffer.buffer(1), Demand::NONE);
    assert_eq!(buffer.outstanding(), Demand::max(2));
  }

  #[rxflow_macro::test]
  fn cancel_wins_over_pending_completion() {
    let (buffer, recorder) = started(Demand::NONE, Demand::NONE, false);
    buffer.buffer(1);
    buffer.complete(Completion::Failed("boom"));
    buffer.cancel();
    buffer.cancel();

    assert!(buffer.is_cancelled());
    assert_eq!(buffer.queued(), 0);
    buffer.request(Demand::Unlimited);
    assert!(recorder.events.rc_deref().is_empty());
  }

  #[rxflow_macro::test]
  fn cancel_releases_downstream() {
    let (buffer, recorder) = started(Demand::NONE, Demand::NONE, false);
    // The probe holds a subscription handle; once the buffer lets go of the
    // probe, the recorder is the only owner left.
    buffer.cancel();
    assert_eq!(Arc::strong_count(&buffer), 1);
    assert!(buffer.downstream.lock().is_none());
    assert!(recorder.events.rc_deref().is_empty());
  }
}
