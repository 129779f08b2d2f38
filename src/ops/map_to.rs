use crate::{
  publisher::Publisher,
  sink::Sink,
  subscriber::Subscriber,
};

/// Emits a clone of a fixed value for every upstream value.
#[derive(Clone)]
pub struct MapTo<S, V> {
  source: S,
  value: V,
}

impl<S, V> MapTo<S, V> {
  pub(crate) fn new(source: S, value: V) -> Self { Self { source, value } }
}

impl<S, V> Publisher for MapTo<S, V>
where
  S: Publisher,
  S::Item: 'static,
  S::Err: Send + 'static,
  V: Clone + Send + 'static,
{
  type Item = V;
  type Err = S::Err;

  fn subscribe<O>(self, subscriber: O)
  where
    O: Subscriber<V, S::Err> + Send + 'static,
  {
    let value = self.value;
    let sink = Sink::new(subscriber)
      .with_output(move |_| Some(value.clone()))
      .with_failure(Some);
    sink.attach(self.source);
    sink.start(sink.subscription());
  }
}
