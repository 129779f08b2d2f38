//! Publisher side of the protocol and the operator surface.
//!
//! Operators are provided by [`PublisherExt`], which every [`Publisher`]
//! implements. They consume the publisher by value; a source that should be
//! subscribed more than once is cloned (subjects) or borrowed (relays).
use crate::{
  ops::{
    catch_with::CatchWith, combine_latest::CombineLatest, map::Map, map_to::MapTo,
    share_replay::ShareReplay, with_latest_from::WithLatestFrom,
  },
  relay::Relay,
  sinks,
  subscriber::{Completion, Subscriber},
  subscription::AnyCancellable,
};

mod create;
mod from_iter;

pub use create::{create, Create, Emitter};
pub use from_iter::{from_iter, FromIter};

pub trait Publisher {
  type Item;
  type Err;

  /// Attach `subscriber`. It receives its subscription synchronously or
  /// later, depending on the publisher.
  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<Self::Item, Self::Err> + Send + 'static;
}

/// Keeps only the companion side of a combined value.
pub type Latest<A, B> = fn(A, B) -> B;
pub type Latest3<A, B, C, D> = fn(A, ((B, C), D)) -> (B, C, D);

pub trait PublisherExt: Publisher + Sized {
  /// Transform every value with `f`.
  fn map<Out, F>(self, f: F) -> Map<Self, F>
  where
    F: FnMut(Self::Item) -> Out,
  {
    Map::new(self, f)
  }

  /// Replace every value with a clone of `value`.
  fn map_to_value<V: Clone>(self, value: V) -> MapTo<Self, V> { MapTo::new(self, value) }

  /// Replace every value with `()`.
  fn map_to_unit(self) -> MapTo<Self, ()> { MapTo::new(self, ()) }

  /// Emit a pair of the latest values of both publishers whenever either of
  /// them emits, once both have emitted. Finishes when both finish; fails as
  /// soon as either fails.
  fn combine_latest<O>(self, other: O) -> CombineLatest<Self, O>
  where
    O: Publisher<Err = Self::Err>,
  {
    CombineLatest::new(self, other)
  }

  /// Emit the latest value of `other` every time this publisher emits.
  ///
  /// This publisher is only subscribed once `other` has emitted, so values it
  /// emits before that are never seen. Only this publisher's completion ends
  /// the stream; completions of `other` are ignored.
  fn with_latest_from<O>(self, other: O) -> WithLatestFrom<Self, O, Latest<Self::Item, O::Item>>
  where
    O: Publisher<Err = Self::Err>,
  {
    WithLatestFrom::new(self, other, (|_, b| b) as Latest<Self::Item, O::Item>)
  }

  /// Like [`with_latest_from`](PublisherExt::with_latest_from), combining the
  /// value with the companion's latest through `f`.
  fn with_latest_from_map<O, Out, F>(self, other: O, f: F) -> WithLatestFrom<Self, O, F>
  where
    O: Publisher<Err = Self::Err>,
    F: FnMut(Self::Item, O::Item) -> Out,
  {
    WithLatestFrom::new(self, other, f)
  }

  /// Emit the latest values of both companions as a pair.
  #[allow(clippy::type_complexity)]
  fn with_latest_from2<O1, O2>(
    self, first: O1, second: O2,
  ) -> WithLatestFrom<Self, CombineLatest<O1, O2>, Latest<Self::Item, (O1::Item, O2::Item)>>
  where
    O1: Publisher<Err = Self::Err>,
    O2: Publisher<Err = Self::Err>,
  {
    WithLatestFrom::new(
      self,
      first.combine_latest(second),
      (|_, bc| bc) as Latest<Self::Item, (O1::Item, O2::Item)>,
    )
  }

  fn with_latest_from2_map<O1, O2, Out, F>(
    self, first: O1, second: O2, mut f: F,
  ) -> impl Publisher<Item = Out, Err = Self::Err>
  where
    Self: Send + 'static,
    O1: Publisher<Err = Self::Err>,
    O2: Publisher<Err = Self::Err>,
    CombineLatest<O1, O2>: Publisher<Item = (O1::Item, O2::Item), Err = Self::Err>,
    F: FnMut(Self::Item, O1::Item, O2::Item) -> Out + Send + 'static,
    Out: Send + 'static,
    Self::Item: 'static,
    O1::Item: Clone + Send + 'static,
    O2::Item: Clone + Send + 'static,
    Self::Err: Send + 'static,
  {
    self.with_latest_from_map(first.combine_latest(second), move |a, (b, c)| f(a, b, c))
  }

  /// Emit the latest values of the three companions as a triple.
  fn with_latest_from3<O1, O2, O3>(
    self, first: O1, second: O2, third: O3,
  ) -> WithLatestFrom<
    Self,
    CombineLatest<CombineLatest<O1, O2>, O3>,
    Latest3<Self::Item, O1::Item, O2::Item, O3::Item>,
  >
  where
    O1: Publisher<Err = Self::Err>,
    O2: Publisher<Err = Self::Err>,
    O3: Publisher<Err = Self::Err>,
    CombineLatest<O1, O2>: Publisher<Item = (O1::Item, O2::Item), Err = Self::Err>,
  {
    WithLatestFrom::new(
      self,
      first.combine_latest(second).combine_latest(third),
      (|_, ((b, c), d)| (b, c, d)) as Latest3<Self::Item, O1::Item, O2::Item, O3::Item>,
    )
  }

  #[allow(clippy::type_complexity)]
  fn with_latest_from3_map<O1, O2, O3, Out, F>(
    self, first: O1, second: O2, third: O3, mut f: F,
  ) -> impl Publisher<Item = Out, Err = Self::Err>
  where
    Self: Send + 'static,
    O1: Publisher<Err = Self::Err>,
    O2: Publisher<Err = Self::Err>,
    O3: Publisher<Err = Self::Err>,
    CombineLatest<CombineLatest<O1, O2>, O3>:
      Publisher<Item = ((O1::Item, O2::Item), O3::Item), Err = Self::Err>,
    F: FnMut(Self::Item, O1::Item, O2::Item, O3::Item) -> Out + Send + 'static,
    Out: Send + 'static,
    Self::Item: 'static,
    O1::Item: Clone + Send + 'static,
    O2::Item: Clone + Send + 'static,
    O3::Item: Clone + Send + 'static,
    Self::Err: Send + 'static,
  {
    self.with_latest_from_map(
      first.combine_latest(second).combine_latest(third),
      move |a, ((b, c), d)| f(a, b, c, d),
    )
  }

  /// Hand a failure to `handler` and finish normally instead.
  fn catch_with<F>(self, handler: F) -> CatchWith<Self, F>
  where
    F: FnMut(Self::Err),
  {
    CatchWith::new(self, handler)
  }

  /// Share one subscription to this publisher among all subscribers,
  /// replaying the last `buffer_size` values to each newcomer.
  ///
  /// The upstream is subscribed when the first subscriber arrives and stays
  /// subscribed for the lifetime of the source.
  fn share_replay(self, buffer_size: usize) -> ShareReplay<Self, Self::Item, Self::Err>
  where
    Self::Item: Clone + Send + 'static,
    Self::Err: Clone + Send + 'static,
  {
    ShareReplay::new(self, buffer_size)
  }

  /// Forward every value into `relay`. The relay never sees the completion.
  fn subscribe_relay<R>(self, relay: &R) -> AnyCancellable
  where
    R: Relay<Item = Self::Item>,
    Self::Item: Clone + Send + 'static,
    Self::Err: 'static,
  {
    relay.subscribe_to(self)
  }

  /// Subscribe with unlimited demand.
  fn sink<C, V>(self, on_completion: C, on_value: V) -> AnyCancellable
  where
    C: FnMut(Completion<Self::Err>) + Send + 'static,
    V: FnMut(Self::Item) + Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    sinks::subscribe_closures(self, on_value, on_completion)
  }

  fn sink_value<V>(self, on_value: V) -> AnyCancellable
  where
    V: FnMut(Self::Item) + Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    sinks::subscribe_closures(self, on_value, |_| {})
  }

  /// `on_finished` runs on a normal completion only.
  fn sink_completion<C>(self, mut on_finished: C) -> AnyCancellable
  where
    C: FnMut() + Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    sinks::subscribe_closures(self, |_| {}, move |c: Completion<Self::Err>| {
      if c.is_finished() {
        on_finished()
      }
    })
  }

  /// `on_failure` runs on a failed completion only.
  fn sink_failure<C>(self, mut on_failure: C) -> AnyCancellable
  where
    C: FnMut(Self::Err) + Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    sinks::subscribe_closures(self, |_| {}, move |c: Completion<Self::Err>| {
      if let Completion::Failed(err) = c {
        on_failure(err)
      }
    })
  }

  /// Spawn the future returned by `on_value` for every value.
  ///
  /// Futures run on the tokio runtime this method is called from; calling it
  /// outside of a runtime panics.
  #[cfg(feature = "tokio-runtime")]
  fn sink_value_async<V, Fut>(self, on_value: V) -> AnyCancellable
  where
    V: FnMut(Self::Item) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
    Self::Item: 'static,
    Self::Err: 'static,
  {
    sinks::subscribe_async(self, on_value)
  }
}

impl<P: Publisher> PublisherExt for P {}
