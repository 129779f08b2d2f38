use super::ReplaySubject;
use crate::{
  demand::Demand,
  subscriber::{AnySubscription, Completion, Subscriber},
  subscription::AnyCancellable,
  upstream::Upstream,
};

/// Forwards everything an upstream emits into a [`ReplaySubject`].
///
/// It requests unlimited demand: the subject buffers per subscriber, so
/// backpressure is applied between the subject and its subscribers instead.
pub struct SubjectSubscriber<Item, Err> {
  subject: ReplaySubject<Item, Err>,
  upstream: Upstream,
}

impl<Item, Err> SubjectSubscriber<Item, Err> {
  pub fn new(subject: ReplaySubject<Item, Err>) -> Self {
    Self { subject, upstream: Upstream::with_demand(Demand::Unlimited) }
  }

  /// A handle cancelling the upstream subscription, whenever it arrives.
  pub fn cancellable(&self) -> AnyCancellable {
    let upstream = self.upstream.clone();
    AnyCancellable::new(move || {
      upstream.cancel();
    })
  }
}

impl<Item, Err> Subscriber<Item, Err> for SubjectSubscriber<Item, Err>
where
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  fn receive_subscription(&mut self, subscription: AnySubscription) {
    self.upstream.attach(subscription);
  }

  fn receive(&mut self, value: Item) -> Demand {
    self.subject.send(value);
    Demand::NONE
  }

  fn receive_completion(&mut self, completion: Completion<Err>) {
    self.subject.send_completion(completion);
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[rxflow_macro::test]
  fn forwards_until_cancelled() {
    let source = ReplaySubject::<i32, ()>::new(0);
    let target = ReplaySubject::<i32, ()>::new(8);
    let forwarder = SubjectSubscriber::new(target.clone());
    let cancellable = forwarder.cancellable();
    source.clone().subscribe(forwarder);

    source.send(1);
    source.send(2);
    cancellable.cancel();
    source.send(3);

    assert_eq!(target.history(), vec![1, 2]);
    assert_eq!(source.subscriber_count(), 0);
  }

  #[rxflow_macro::test]
  fn completion_terminates_the_subject() {
    let source = ReplaySubject::<i32, &'static str>::new(0);
    let target = ReplaySubject::<i32, &'static str>::new(1);
    source.clone().subscribe(SubjectSubscriber::new(target.clone()));
    source.send_completion(Completion::Failed("closed"));
    assert!(target.is_terminated());
  }
}
