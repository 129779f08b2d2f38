use std::convert::Infallible;

use super::{Relay, RelayCore};
use crate::{
  publisher::Publisher,
  rc::{MutArc, RcDeref},
  subscriber::Subscriber,
  subscription::AnyCancellable,
};

/// A relay holding a current value. Each new subscriber receives that value
/// first, then every value accepted afterwards.
pub struct CurrentValueRelay<Item> {
  core: RelayCore<Item>,
  current: MutArc<Item>,
}

impl<Item> CurrentValueRelay<Item>
where
  Item: Clone + Send + 'static,
{
  pub fn new(value: Item) -> Self {
    let current = MutArc::own(value);
    Self { core: RelayCore::current_value(current.clone()), current }
  }

  /// The latest accepted value.
  pub fn value(&self) -> Item { self.current.rc_deref().clone() }
}

impl<Item> CurrentValueRelay<Item> {
  pub fn subscriber_count(&self) -> usize { self.core.subscriber_count() }
}

impl<Item> Default for CurrentValueRelay<Item>
where
  Item: Clone + Default + Send + 'static,
{
  fn default() -> Self { Self::new(Item::default()) }
}

impl<Item> Relay for CurrentValueRelay<Item>
where
  Item: Clone + Send + 'static,
{
  type Item = Item;

  fn accept(&self, value: Item) { self.core.accept(value) }

  fn subscribe_to<P>(&self, publisher: P) -> AnyCancellable
  where
    P: Publisher<Item = Item>,
    P::Err: 'static,
  {
    self.core.subscribe_to(publisher)
  }
}

impl<'a, Item> Publisher for &'a CurrentValueRelay<Item>
where
  Item: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Infallible;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Item, Infallible> + Send + 'static,
  {
    self.core.subscribe(subscriber)
  }
}

impl<Item> Drop for CurrentValueRelay<Item> {
  fn drop(&mut self) { self.core.finish_all() }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[rxflow_macro::test]
  fn new_subscriber_gets_current_value_first() {
    let relay = CurrentValueRelay::new(0);
    relay.accept(1);
    let seen = MutArc::own(vec![]);
    let s = seen.clone();
    let _c = (&relay).sink_value(move |v| s.rc_deref_mut().push(v));
    relay.accept(2);
    assert_eq!(*seen.rc_deref(), vec![1, 2]);
    assert_eq!(relay.value(), 2);
  }

  #[rxflow_macro::test]
  fn value_is_readable_from_a_callback() {
    let relay = std::sync::Arc::new(CurrentValueRelay::new(String::from("a")));
    let seen = MutArc::own(vec![]);
    let (r, s) = (relay.clone(), seen.clone());
    let _c = (&*relay).sink_value(move |v: String| {
      assert_eq!(r.value(), v);
      s.rc_deref_mut().push(v)
    });
    relay.accept("b".into());
    assert_eq!(*seen.rc_deref(), vec!["a", "b"]);
  }

  #[rxflow_macro::test]
  fn tracks_forwarded_values() {
    let relay = CurrentValueRelay::<i32>::default();
    let source = ReplaySubject::<i32, ()>::new(2);
    source.send(5);
    source.send(6);
    let _forward = relay.subscribe_to(source.clone());
    assert_eq!(relay.value(), 6);

    source.send_completion(Completion::Finished);
    relay.accept(7);
    assert_eq!(relay.value(), 7);
  }

  #[rxflow_macro::test]
  fn demand_limits_delivery() {
    let relay = CurrentValueRelay::new(10);
    let seen = MutArc::own(vec![]);
    let subscription: MutArc<Option<AnySubscription>> = MutArc::own(None);
    let (s, sub) = (seen.clone(), subscription.clone());
    (&relay).subscribe(AnySubscriber::new(
      move |subscription: AnySubscription| {
        subscription.request(Demand::max(1));
        *sub.rc_deref_mut() = Some(subscription);
      },
      move |v| {
        s.rc_deref_mut().push(v);
        Demand::NONE
      },
      |_| {},
    ));
    relay.accept(11);
    relay.accept(12);
    assert_eq!(*seen.rc_deref(), vec![10]);

    let handle = subscription.rc_deref().clone();
    if let Some(handle) = handle {
      handle.request(Demand::max(1));
    }
    assert_eq!(*seen.rc_deref(), vec![10, 11]);
  }
}
