use std::{convert::Infallible, iter::Peekable, sync::Arc};

use parking_lot::Mutex;

use crate::{
  demand::Demand,
  demand_buffer::DemandBuffer,
  publisher::Publisher,
  subscriber::{Completion, Subscriber, Subscription},
};

/// A publisher pulling from an iterator as demand arrives.
///
/// It finishes as soon as the iterator is exhausted, so an empty iterator
/// finishes immediately on subscribe.
pub fn from_iter<I: IntoIterator>(iter: I) -> FromIter<I> { FromIter { iter } }

#[derive(Clone)]
pub struct FromIter<I> {
  iter: I,
}

struct Producer<I: Iterator> {
  iter: Option<Peekable<I>>,
  /// Demand not yet turned into items.
  demand: Demand,
  /// Whether some call is currently pulling from the iterator.
  producing: bool,
}

struct FromIterShared<I: Iterator> {
  producer: Mutex<Producer<I>>,
  buffer: DemandBuffer<I::Item, Infallible>,
}

enum Pull<Item> {
  Value(Item),
  Exhausted,
  Stop,
}

impl<I: Iterator> FromIterShared<I> {
  /// Add `demand` and pull items for it, unless another call is already
  /// pulling; that call picks the demand up before it stops.
  ///
  /// Items are delivered without holding the producer lock, so the
  /// subscriber may request more from inside `receive`.
  fn produce(&self, demand: Demand) {
    {
      let mut producer = self.producer.lock();
      producer.demand += demand;
      if producer.producing {
        return;
      }
      producer.producing = true;
    }
    loop {
      match self.pull() {
        Pull::Value(value) => {
          let extra = self.buffer.buffer(value);
          if !extra.is_none() {
            self.producer.lock().demand += extra;
          }
        }
        Pull::Exhausted => {
          self.buffer.complete(Completion::Finished);
          return;
        }
        Pull::Stop => return,
      }
    }
  }

  fn pull(&self) -> Pull<I::Item> {
    let mut guard = self.producer.lock();
    let producer = &mut *guard;
    if self.buffer.is_cancelled() {
      producer.iter = None;
    }
    let Some(iter) = producer.iter.as_mut() else {
      producer.producing = false;
      return Pull::Stop;
    };
    if iter.peek().is_none() {
      producer.iter = None;
      producer.producing = false;
      return Pull::Exhausted;
    }
    if producer.demand.is_none() {
      producer.producing = false;
      return Pull::Stop;
    }
    match iter.next() {
      Some(value) => {
        producer.demand -= 1usize;
        Pull::Value(value)
      }
      None => {
        producer.producing = false;
        Pull::Stop
      }
    }
  }
}

struct FromIterSubscription<I: Iterator>(Arc<FromIterShared<I>>);

impl<I> Subscription for FromIterSubscription<I>
where
  I: Iterator + Send,
  I::Item: Send,
{
  fn request(&self, demand: Demand) {
    let demand = self.0.buffer.request(demand);
    self.0.produce(demand);
  }

  fn cancel(&self) {
    self.0.buffer.cancel();
    self.0.producer.lock().iter = None;
  }
}

impl<I> Publisher for FromIter<I>
where
  I: IntoIterator,
  I::IntoIter: Send + 'static,
  I::Item: Send + 'static,
{
  type Item = I::Item;
  type Err = Infallible;

  fn subscribe<S>(self, subscriber: S)
  where
    S: Subscriber<I::Item, Infallible> + Send + 'static,
  {
    let shared = Arc::new(FromIterShared {
      producer: Mutex::new(Producer {
        iter: Some(self.iter.into_iter().peekable()),
        demand: Demand::NONE,
        producing: false,
      }),
      buffer: DemandBuffer::new(Box::new(subscriber)),
    });
    let demand = shared.buffer.start(Arc::new(FromIterSubscription(shared.clone())));
    shared.produce(demand);
  }
}
