use std::sync::Arc;

use crate::{
  demand::Demand,
  publisher::Publisher,
  rc::{MutArc, RcDeref, RcDerefMut},
  sink::Sink,
  subscriber::{AnySubscription, Completion, Subscriber, Subscription},
  upstream::Upstream,
};

/// Combines every value of a source with the latest value of another
/// publisher.
///
/// The source is only subscribed after the other publisher has emitted its
/// first value. Only the source terminates the stream: the other publisher's
/// completion and failure are both ignored.
///
/// This struct is created by
/// [`PublisherExt::with_latest_from`](crate::publisher::PublisherExt::with_latest_from)
/// and its variants.
#[derive(Clone)]
pub struct WithLatestFrom<S, O, F> {
  source: S,
  other: O,
  func: F,
}

impl<S, O, F> WithLatestFrom<S, O, F> {
  pub(crate) fn new(source: S, other: O, func: F) -> Self { Self { source, other, func } }
}

type LatestSink<ItemA, Out, Err> = Sink<ItemA, Err, Out, Err>;

impl<S, O, F, Out> Publisher for WithLatestFrom<S, O, F>
where
  S: Publisher + Send + 'static,
  O: Publisher<Err = S::Err>,
  S::Item: 'static,
  O::Item: Clone + Send + 'static,
  S::Err: Send + 'static,
  F: FnMut(S::Item, O::Item) -> Out + Send + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = S::Err;

  fn subscribe<Down>(self, subscriber: Down)
  where
    Down: Subscriber<Out, S::Err> + Send + 'static,
  {
    let latest: MutArc<Option<O::Item>> = MutArc::own(None);
    let other_upstream = Upstream::with_demand(Demand::Unlimited);

    let mut func = self.func;
    let current = latest.clone();
    let sink: LatestSink<S::Item, Out, S::Err> =
      Sink::new(CancelOtherOnTerminal { downstream: subscriber, other: other_upstream.clone() })
        .with_output(move |value| {
          let other = current.rc_deref().clone();
          other.map(|other| func(value, other))
        })
        .with_failure(Some);
    sink.start(Arc::new(WithLatestFromSubscription {
      sink: sink.clone(),
      other: other_upstream.clone(),
    }));

    self.other.subscribe(OtherSubscriber {
      latest,
      sink,
      source: Some(self.source),
      upstream: other_upstream,
    });
  }
}

/// Wraps the downstream so the other publisher is released together with it.
struct CancelOtherOnTerminal<D> {
  downstream: D,
  other: Upstream,
}

impl<D, Item, Err> Subscriber<Item, Err> for CancelOtherOnTerminal<D>
where
  D: Subscriber<Item, Err>,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.downstream.receive_subscription(subscription)
  }

  fn receive(&mut self, value: Item) -> Demand { self.downstream.receive(value) }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    self.other.cancel();
    self.downstream.receive_completion(completion)
  }
}

struct OtherSubscriber<S, ItemB, Out, Err>
where
  S: Publisher,
{
  latest: MutArc<Option<ItemB>>,
  sink: LatestSink<S::Item, Out, Err>,
  /// Taken when the first value arrives.
  source: Option<S>,
  upstream: Upstream,
}

impl<S, ItemB, Out, Err> Subscriber<ItemB, Err> for OtherSubscriber<S, ItemB, Out, Err>
where
  S: Publisher<Err = Err>,
  S::Item: 'static,
  Err: Send + 'static,
  Out: Send + 'static,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.upstream.attach(subscription);
  }

  fn receive(&mut self, value: ItemB) -> Demand {
    *self.latest.rc_deref_mut() = Some(value);
    if let Some(source) = self.source.take() {
      self.sink.attach(source);
    }
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    tracing::trace!(
      failed = completion.is_failed(),
      attached = self.source.is_none(),
      "with_latest_from: other publisher completion ignored"
    );
  }
}

struct WithLatestFromSubscription<ItemA, Out, Err> {
  sink: LatestSink<ItemA, Out, Err>,
  other: Upstream,
}

impl<ItemA, Out, Err> Subscription for WithLatestFromSubscription<ItemA, Out, Err>
where
  ItemA: 'static,
  Out: Send + 'static,
  Err: Send + 'static,
{
  fn request(&self, demand: Demand) { self.sink.demand(demand); }

  fn cancel(&self) {
    self.sink.cancel();
    self.other.cancel();
  }
}
