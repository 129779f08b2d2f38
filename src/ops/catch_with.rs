use std::convert::Infallible;

use crate::{
  publisher::Publisher,
  sink::Sink,
  subscriber::Subscriber,
};

/// Hands a failure to a side-effecting handler and finishes instead of
/// failing.
#[derive(Clone)]
pub struct CatchWith<S, F> {
  source: S,
  handler: F,
}

impl<S, F> CatchWith<S, F> {
  pub(crate) fn new(source: S, handler: F) -> Self { Self { source, handler } }
}

impl<S, F> Publisher for CatchWith<S, F>
where
  S: Publisher,
  S::Item: Send + 'static,
  S::Err: 'static,
  F: FnMut(S::Err) + Send + 'static,
{
  type Item = S::Item;
  type Err = Infallible;

  fn subscribe<O>(self, subscriber: O)
  where
    O: Subscriber<S::Item, Infallible> + Send + 'static,
  {
    let mut handler = self.handler;
    let sink = Sink::new(subscriber)
      .with_output(Some)
      .with_failure(move |err| {
        handler(err);
        None
      });
    sink.attach(self.source);
    sink.start(sink.subscription());
  }
}
