use crate::{
  publisher::Publisher,
  sink::Sink,
  subscriber::Subscriber,
};

/// A publisher which calls a closure on each value and emits its return.
///
/// This struct is created by [`PublisherExt::map`](crate::publisher::PublisherExt::map).
#[derive(Clone)]
pub struct Map<S, F> {
  source: S,
  func: F,
}

impl<S, F> Map<S, F> {
  pub(crate) fn new(source: S, func: F) -> Self { Self { source, func } }
}

impl<S, F, Out> Publisher for Map<S, F>
where
  S: Publisher,
  S::Item: 'static,
  S::Err: Send + 'static,
  F: FnMut(S::Item) -> Out + Send + 'static,
  Out: Send + 'static,
{
  type Item = Out;
  type Err = S::Err;

  fn subscribe<O>(self, subscriber: O)
  where
    O: Subscriber<Out, S::Err> + Send + 'static,
  {
    let mut func = self.func;
    let sink = Sink::new(subscriber)
      .with_output(move |v| Some(func(v)))
      .with_failure(Some);
    sink.attach(self.source);
    sink.start(sink.subscription());
  }
}
