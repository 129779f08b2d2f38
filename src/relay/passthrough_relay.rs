use std::convert::Infallible;

use super::{Relay, RelayCore};
use crate::{
  publisher::Publisher,
  subscriber::Subscriber,
  subscription::AnyCancellable,
};

/// A relay that remembers nothing: subscribers see only the values accepted
/// after they subscribed.
///
/// ```rust
/// use rxflow::prelude::*;
///
/// let relay = PassthroughRelay::new();
/// relay.accept(1);
///
/// let seen = MutArc::own(vec![]);
/// let s = seen.clone();
/// let _c = (&relay).sink_value(move |v| s.rc_deref_mut().push(v));
/// relay.accept(2);
/// assert_eq!(*seen.rc_deref(), vec![2]);
/// ```
pub struct PassthroughRelay<Item> {
  core: RelayCore<Item>,
}

impl<Item> PassthroughRelay<Item>
where
  Item: Clone + Send + 'static,
{
  pub fn new() -> Self { Self { core: RelayCore::passthrough() } }
}

impl<Item> PassthroughRelay<Item> {
  /// Live subscriptions.
  pub fn subscriber_count(&self) -> usize { self.core.subscriber_count() }
}

impl<Item> Default for PassthroughRelay<Item>
where
  Item: Clone + Send + 'static,
{
  fn default() -> Self { Self::new() }
}

impl<Item> Relay for PassthroughRelay<Item>
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

impl<'a, Item> Publisher for &'a PassthroughRelay<Item>
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

impl<Item> Drop for PassthroughRelay<Item> {
  fn drop(&mut self) { self.core.finish_all() }
}
