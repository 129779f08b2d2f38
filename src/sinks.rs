//! Closure-based terminal subscribers behind `PublisherExt::sink*`.
use crate::{
  demand::Demand,
  publisher::Publisher,
  subscriber::{AnySubscription, Completion, Subscriber},
  subscription::AnyCancellable,
  upstream::Upstream,
};

/// Requests unlimited demand and hands every signal to a closure.
pub struct ClosureSubscriber<V, C> {
  upstream: Upstream,
  on_value: V,
  on_completion: C,
}

impl<V, C> ClosureSubscriber<V, C> {
  pub fn new(on_value: V, on_completion: C) -> Self {
    Self { upstream: Upstream::with_demand(Demand::Unlimited), on_value, on_completion }
  }

  /// A handle cancelling this subscriber's subscription.
  pub fn cancellable(&self) -> AnyCancellable {
    let upstream = self.upstream.clone();
    AnyCancellable::new(move || {
      upstream.cancel();
    })
  }
}

impl<Item, Err, V, C> Subscriber<Item, Err> for ClosureSubscriber<V, C>
where
  V: FnMut(Item),
  C: FnMut(Completion<Err>),
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.upstream.attach(subscription);
  }

  fn receive(&mut self, value: Item) -> Demand {
    (self.on_value)(value);
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<Err>) { (self.on_completion)(completion) }
}

pub(crate) fn subscribe_closures<P, V, C>(publisher: P, on_value: V, on_completion: C) -> AnyCancellable
where
  P: Publisher,
  P::Item: 'static,
  P::Err: 'static,
  V: FnMut(P::Item) + Send + 'static,
  C: FnMut(Completion<P::Err>) + Send + 'static,
{
  let subscriber = ClosureSubscriber::new(on_value, on_completion);
  let cancellable = subscriber.cancellable();
  publisher.subscribe(subscriber);
  cancellable
}

#[cfg(feature = "tokio-runtime")]
pub(crate) fn subscribe_async<P, V, Fut>(publisher: P, mut on_value: V) -> AnyCancellable
where
  P: Publisher,
  P::Item: 'static,
  P::Err: 'static,
  V: FnMut(P::Item) -> Fut + Send + 'static,
  Fut: std::future::Future<Output = ()> + Send + 'static,
{
  let handle = tokio::runtime::Handle::current();
  subscribe_closures(
    publisher,
    move |value| {
      handle.spawn(on_value(value));
    },
    |_| {},
  )
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[rxflow_macro::test]
  fn sink_variants_see_their_events() {
    let subject = ReplaySubject::<i32, &'static str>::new(0);
    let log = MutArc::own(vec![]);
    let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
    let _all = subject.clone().sink(
      move |c| l1.rc_deref_mut().push(format!("sink {c:?}")),
      move |v| l2.rc_deref_mut().push(format!("sink {v}")),
    );
    let _done = subject.clone().sink_completion(move || l3.rc_deref_mut().push("finished".into()));
    let _failed = subject
      .clone()
      .sink_failure(move |e| l4.rc_deref_mut().push(format!("failure {e}")));

    subject.send(1);
    subject.send_completion(Completion::Failed("x"));
    assert_eq!(*log.rc_deref(), vec!["sink 1", "sink Failed(\"x\")", "failure x"]);
  }

  #[rxflow_macro::test]
  fn dropping_the_cancellable_unsubscribes() {
    let subject = ReplaySubject::<i32, ()>::new(0);
    let seen = MutArc::own(vec![]);
    let s = seen.clone();
    let cancellable = subject.clone().sink_value(move |v| s.rc_deref_mut().push(v));
    subject.send(1);
    drop(cancellable);
    subject.send(2);
    assert_eq!(*seen.rc_deref(), vec![1]);
    assert_eq!(subject.subscriber_count(), 0);
  }

  #[cfg(all(feature = "tokio-runtime", not(target_arch = "wasm32")))]
  #[rxflow_macro::test(multi)]
  async fn async_sink_spawns_each_value() {
    use futures::{channel::mpsc, StreamExt};

    let (tx, rx) = mpsc::unbounded();
    let subject = ReplaySubject::<i32, ()>::new(0);
    let _c = subject.clone().sink_value_async(move |v| {
      let tx = tx.clone();
      async move {
        let _ = tx.unbounded_send(v * 2);
      }
    });
    for v in 1..=3 {
      subject.send(v);
    }
    let mut got: Vec<i32> = rx.take(3).collect().await;
    got.sort_unstable();
    assert_eq!(got, vec![2, 4, 6]);
  }
}
