//! Default bridge from an upstream publisher to a [`DemandBuffer`].
//!
//! A [`Sink`] subscribes to the upstream as an ordinary subscriber, converts
//! what it receives with its transforms, and feeds the result into a demand
//! buffer that serves a single downstream. Downstream demand flows the other
//! way: it is settled against the buffer first, and only what the buffer
//! cannot satisfy from its queue is requested from the upstream.
use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc,
};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  demand_buffer::DemandBuffer,
  publisher::Publisher,
  subscriber::{AnySubscription, Completion, Subscriber, Subscription},
  upstream::Upstream,
};

pub type OutputTransform<UpItem, Item> = Box<dyn FnMut(UpItem) -> Option<Item> + Send>;
pub type FailureTransform<UpErr, Err> = Box<dyn FnMut(UpErr) -> Option<Err> + Send>;

struct SinkInner<UpItem, UpErr, Item, Err> {
  buffer: DemandBuffer<Item, Err>,
  upstream: Upstream,
  transform_output: Mutex<Option<OutputTransform<UpItem, Item>>>,
  transform_failure: Mutex<Option<FailureTransform<UpErr, Err>>>,
  forward_completion: AtomicBool,
}

/// Upstream subscriber feeding a demand buffer.
///
/// Clones share the same state. The usual wiring is:
///
/// 1. build the sink around the downstream and set its transforms;
/// 2. [`attach`](Sink::attach) it to the upstream;
/// 3. [`start`](Sink::start) it with the subscription the downstream should
///    see, usually [`subscription`](Sink::subscription).
///
/// Attaching after starting works too; demand requested in between is held
/// until the upstream subscription arrives.
///
/// A value arriving without an output transform, or a failure arriving without
/// a failure transform, is a wiring bug and panics.
pub struct Sink<UpItem, UpErr, Item, Err> {
  inner: Arc<SinkInner<UpItem, UpErr, Item, Err>>,
}

impl<UpItem, UpErr, Item, Err> Clone for Sink<UpItem, UpErr, Item, Err> {
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

impl<UpItem, UpErr, Item, Err> Sink<UpItem, UpErr, Item, Err>
where
  UpItem: 'static,
  UpErr: 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  /// A sink without transforms.
  pub fn new<S>(downstream: S) -> Self
  where
    S: Subscriber<Item, Err> + Send + 'static,
  {
    Self {
      inner: Arc::new(SinkInner {
        buffer: DemandBuffer::new(Box::new(downstream)),
        upstream: Upstream::new(),
        transform_output: Mutex::new(None),
        transform_failure: Mutex::new(None),
        forward_completion: AtomicBool::new(true),
      }),
    }
  }

  /// Convert upstream values; `None` drops the value.
  pub fn with_output(self, f: impl FnMut(UpItem) -> Option<Item> + Send + 'static) -> Self {
    *self.inner.transform_output.lock() = Some(Box::new(f));
    self
  }

  /// Convert upstream failures; `None` turns the failure into `Finished`.
  pub fn with_failure(self, f: impl FnMut(UpErr) -> Option<Err> + Send + 'static) -> Self {
    *self.inner.transform_failure.lock() = Some(Box::new(f));
    self
  }

  /// Drop completions coming from the upstream. Only
  /// [`force_finish`](Sink::force_finish) can end the stream afterwards.
  pub fn suppress_completion(&self) { self.inner.forward_completion.store(false, Ordering::SeqCst); }

  /// Subscribe this sink to `upstream`.
  pub fn attach<P>(&self, upstream: P)
  where
    P: Publisher<Item = UpItem, Err = UpErr>,
  {
    upstream.subscribe(self.clone());
  }

  /// Hand `subscription` to the downstream and deliver what it asks for.
  pub fn start(&self, subscription: AnySubscription) {
    let demand = self.inner.buffer.start(subscription);
    self.inner.upstream.request(demand);
  }

  /// The default downstream handle: requests go to [`demand`](Sink::demand),
  /// cancellation to [`cancel`](Sink::cancel).
  pub fn subscription(&self) -> AnySubscription { Arc::new(SinkSubscription(self.clone())) }

  /// Settle downstream demand against the buffer and request the rest
  /// upstream.
  pub fn demand(&self, demand: Demand) {
    let upstream_demand = self.inner.buffer.request(demand);
    self.inner.upstream.request(upstream_demand);
  }

  /// Stop delivery downstream and cancel the upstream.
  pub fn cancel(&self) {
    self.inner.buffer.cancel();
    self.cancel_upstream();
  }

  /// Cancel the upstream subscription. Only the first call has an effect.
  pub fn cancel_upstream(&self) {
    if self.inner.upstream.cancel() {
      tracing::trace!("sink cancelled its upstream");
    }
  }

  /// Finish the downstream regardless of
  /// [`suppress_completion`](Sink::suppress_completion), after the values
  /// already queued.
  pub fn force_finish(&self) {
    self.inner.buffer.complete(Completion::Finished);
    self.cancel_upstream();
  }

  /// Whether the downstream received its completion.
  pub fn is_terminated(&self) -> bool { self.inner.buffer.is_terminated() }

  pub fn is_cancelled(&self) -> bool { self.inner.buffer.is_cancelled() }

  /// Values waiting for downstream demand.
  pub fn queued(&self) -> usize { self.inner.buffer.queued() }
}

impl<UpItem, UpErr, Item, Err> Sink<UpItem, UpErr, Item, Err>
where
  UpItem: 'static,
  UpErr: 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  UpItem: Into<Item>,
  UpErr: Into<Err>,
{
  /// A sink that forwards values and failures unchanged.
  pub fn passthrough<S>(downstream: S) -> Self
  where
    S: Subscriber<Item, Err> + Send + 'static,
  {
    Self::new(downstream)
      .with_output(|v: UpItem| Some(v.into()))
      .with_failure(|e: UpErr| Some(e.into()))
  }
}

impl<UpItem, UpErr, Item, Err> Subscriber<UpItem, UpErr> for Sink<UpItem, UpErr, Item, Err>
where
  UpItem: 'static,
  UpErr: 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.inner.upstream.attach(subscription);
  }

  fn receive(&mut self, value: UpItem) -> Demand {
    let output = {
      let mut transform = self.inner.transform_output.lock();
      match transform.as_mut() {
        Some(f) => f(value),
        None => panic!("Sink received a value but no output transform was set"),
      }
    };
    match output {
      Some(value) => self.inner.buffer.buffer(value),
      // The dropped value consumed upstream demand but no downstream demand.
      None => Demand::max(1),
    }
  }

  fn receive_completion(&mut self, completion: Completion<UpErr>) {
    if !self.inner.forward_completion.load(Ordering::SeqCst) {
      tracing::trace!("sink suppressed an upstream completion");
      return;
    }
    let completion = match completion {
      Completion::Finished => Completion::Finished,
      Completion::Failed(err) => {
        let mut transform = self.inner.transform_failure.lock();
        match transform.as_mut() {
          Some(f) => f(err).map_or(Completion::Finished, Completion::Failed),
          None => panic!("Sink received a failure but no failure transform was set"),
        }
      }
    };
    self.inner.buffer.complete(completion);
    self.cancel_upstream();
  }
}

impl<UpItem, UpErr, Item, Err> Drop for SinkInner<UpItem, UpErr, Item, Err> {
  fn drop(&mut self) { self.upstream.cancel(); }
}

struct SinkSubscription<UpItem, UpErr, Item, Err>(Sink<UpItem, UpErr, Item, Err>);

impl<UpItem, UpErr, Item, Err> Subscription for SinkSubscription<UpItem, UpErr, Item, Err>
where
  UpItem: 'static,
  UpErr: 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn request(&self, demand: Demand) { self.0.demand(demand); }

  fn cancel(&self) { self.0.cancel(); }
}
