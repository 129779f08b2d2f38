use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  demand_buffer::DemandBuffer,
  publisher::Publisher,
  subscriber::{AnySubscription, Completion, Subscriber, Subscription},
  upstream::Upstream,
};

/// Emits the latest value of each source whenever either of them emits.
///
/// Both sources are consumed with unlimited demand; the pairs wait in a
/// demand buffer until the downstream asks for them.
#[derive(Clone)]
pub struct CombineLatest<A, B> {
  a: A,
  b: B,
}

impl<A, B> CombineLatest<A, B> {
  pub(crate) fn new(a: A, b: B) -> Self { Self { a, b } }
}

struct Latest<ItemA, ItemB> {
  a: Option<ItemA>,
  b: Option<ItemB>,
  finished: usize,
}

struct CombineShared<ItemA, ItemB, Err> {
  latest: Mutex<Latest<ItemA, ItemB>>,
  buffer: DemandBuffer<(ItemA, ItemB), Err>,
  upstream_a: Upstream,
  upstream_b: Upstream,
}

impl<ItemA, ItemB, Err> CombineShared<ItemA, ItemB, Err>
where
  ItemA: Clone,
  ItemB: Clone,
{
  /// Store a new value with `update`, and queue the pair if both sides have
  /// one. Queueing under the same lock keeps pairs in update order.
  fn update(&self, update: impl FnOnce(&mut Latest<ItemA, ItemB>)) {
    {
      let mut latest = self.latest.lock();
      update(&mut latest);
      if let (Some(a), Some(b)) = (&latest.a, &latest.b) {
        self.buffer.enqueue((a.clone(), b.clone()));
      }
    }
    self.buffer.try_drain();
  }

  fn complete(&self, completion: Completion<Err>) {
    let done = match completion {
      Completion::Failed(err) => Some(Completion::Failed(err)),
      Completion::Finished => {
        let mut latest = self.latest.lock();
        latest.finished += 1;
        (latest.finished == 2).then_some(Completion::Finished)
      }
    };
    if let Some(completion) = done {
      self.buffer.complete(completion);
      self.cancel_upstreams();
    }
  }

  fn cancel_upstreams(&self) {
    self.upstream_a.cancel();
    self.upstream_b.cancel();
  }
}

/// Subscriber for the first source.
struct FirstSubscriber<ItemA, ItemB, Err>(Arc<CombineShared<ItemA, ItemB, Err>>);

/// Subscriber for the second source.
struct SecondSubscriber<ItemA, ItemB, Err>(Arc<CombineShared<ItemA, ItemB, Err>>);

impl<ItemA, ItemB, Err> Subscriber<ItemA, Err> for FirstSubscriber<ItemA, ItemB, Err>
where
  ItemA: Clone,
  ItemB: Clone,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.0.upstream_a.attach(subscription);
  }

  fn receive(&mut self, value: ItemA) -> Demand {
    self.0.update(|latest| latest.a = Some(value));
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<Err>) { self.0.complete(completion); }
}

impl<ItemA, ItemB, Err> Subscriber<ItemB, Err> for SecondSubscriber<ItemA, ItemB, Err>
where
  ItemA: Clone,
  ItemB: Clone,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.0.upstream_b.attach(subscription);
  }

  fn receive(&mut self, value: ItemB) -> Demand {
    self.0.update(|latest| latest.b = Some(value));
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<Err>) { self.0.complete(completion); }
}

struct CombineSubscription<ItemA, ItemB, Err>(Arc<CombineShared<ItemA, ItemB, Err>>);

impl<ItemA, ItemB, Err> Subscription for CombineSubscription<ItemA, ItemB, Err>
where
  ItemA: Send,
  ItemB: Send,
  Err: Send,
{
  fn request(&self, demand: Demand) { self.0.buffer.request(demand); }

  fn cancel(&self) {
    self.0.buffer.cancel();
    self.0.upstream_a.cancel();
    self.0.upstream_b.cancel();
  }
}

impl<A, B> Publisher for CombineLatest<A, B>
where
  A: Publisher,
  B: Publisher<Err = A::Err>,
  A::Item: Clone + Send + 'static,
  B::Item: Clone + Send + 'static,
  A::Err: Send + 'static,
{
  type Item = (A::Item, B::Item);
  type Err = A::Err;

  fn subscribe<O>(self, subscriber: O)
  where
    O: Subscriber<(A::Item, B::Item), A::Err> + Send + 'static,
  {
    let shared = Arc::new(CombineShared {
      latest: Mutex::new(Latest { a: None, b: None, finished: 0 }),
      buffer: DemandBuffer::new(Box::new(subscriber)),
      upstream_a: Upstream::with_demand(Demand::Unlimited),
      upstream_b: Upstream::with_demand(Demand::Unlimited),
    });
    shared.buffer.start(Arc::new(CombineSubscription(shared.clone())));
    self.a.subscribe(FirstSubscriber(shared.clone()));
    self.b.subscribe(SecondSubscriber(shared));
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[rxflow_macro::test]
  fn emits_once_both_have_values() {
    let a = ReplaySubject::<i32, ()>::new(0);
    let b = ReplaySubject::<&'static str, ()>::new(0);
    let out = MutArc::own(vec![]);
    let o = out.clone();
    let _c = a
      .clone()
      .combine_latest(b.clone())
      .sink_value(move |pair| o.rc_deref_mut().push(pair));

    a.send(1);
    a.send(2);
    b.send("x");
    a.send(3);
    b.send("y");

    assert_eq!(*out.rc_deref(), vec![(2, "x"), (3, "x"), (3, "y")]);
  }

  #[rxflow_macro::test]
  fn finishes_when_both_finish() {
    let a = ReplaySubject::<i32, ()>::new(0);
    let b = ReplaySubject::<i32, ()>::new(0);
    let finished = MutArc::own(false);
    let f = finished.clone();
    let _c = a
      .clone()
      .combine_latest(b.clone())
      .sink_completion(move || *f.rc_deref_mut() = true);

    a.send_completion(Completion::Finished);
    assert!(!*finished.rc_deref());
    b.send_completion(Completion::Finished);
    assert!(*finished.rc_deref());
  }

  #[rxflow_macro::test]
  fn failure_cancels_the_other_side() {
    let a = ReplaySubject::<i32, &'static str>::new(0);
    let b = ReplaySubject::<i32, &'static str>::new(0);
    let failure = MutArc::own(None);
    let f = failure.clone();
    let _c = a
      .clone()
      .combine_latest(b.clone())
      .sink_failure(move |e| *f.rc_deref_mut() = Some(e));

    assert_eq!(b.subscriber_count(), 1);
    a.send_completion(Completion::Failed("a broke"));
    assert_eq!(*failure.rc_deref(), Some("a broke"));
    assert_eq!(b.subscriber_count(), 0);
  }

  #[rxflow_macro::test]
  fn pairs_wait_for_demand() {
    let a = ReplaySubject::<i32, ()>::new(0);
    let b = ReplaySubject::<i32, ()>::new(0);
    let out = MutArc::own(vec![]);
    let subscription: MutArc<Option<AnySubscription>> = MutArc::own(None);
    let (o, s) = (out.clone(), subscription.clone());
    a.clone().combine_latest(b.clone()).subscribe(AnySubscriber::new(
      move |sub: AnySubscription| *s.rc_deref_mut() = Some(sub),
      move |pair| {
        o.rc_deref_mut().push(pair);
        Demand::NONE
      },
      |_| {},
    ));

    a.send(1);
    b.send(10);
    b.send(20);
    assert!(out.rc_deref().is_empty());

    let sub = subscription.rc_deref().clone();
    if let Some(sub) = sub {
      sub.request(Demand::max(1));
    }
    assert_eq!(*out.rc_deref(), vec![(1, 10)]);
  }
}
