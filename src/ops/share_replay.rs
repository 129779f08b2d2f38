use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  publisher::Publisher,
  subject::{ReplaySubject, SubjectSubscriber},
  subscriber::Subscriber,
};

/// Multicasts a single subscription to its source through a
/// [`ReplaySubject`].
///
/// Clones share the subject and the source. The source is subscribed once,
/// when the first subscriber arrives, with unlimited demand; each subscriber
/// then applies its own backpressure against the subject.
pub struct ShareReplay<S, Item, Err> {
  subject: ReplaySubject<Item, Err>,
  source: Arc<Mutex<Option<S>>>,
}

impl<S, Item, Err> Clone for ShareReplay<S, Item, Err> {
  fn clone(&self) -> Self { Self { subject: self.subject.clone(), source: self.source.clone() } }
}

impl<S, Item, Err> ShareReplay<S, Item, Err> {
  pub(crate) fn new(source: S, buffer_size: usize) -> Self {
    Self { subject: ReplaySubject::new(buffer_size), source: Arc::new(Mutex::new(Some(source))) }
  }

  /// Whether the source has been subscribed.
  pub fn is_connected(&self) -> bool { self.source.lock().is_none() }
}

impl<S, Item, Err> Publisher for ShareReplay<S, Item, Err>
where
  S: Publisher<Item = Item, Err = Err>,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Item = Item;
  type Err = Err;

  fn subscribe<O>(self, subscriber: O)
  where
    O: Subscriber<Item, Err> + Send + 'static,
  {
    self.subject.clone().subscribe(subscriber);
    let source = self.source.lock().take();
    if let Some(source) = source {
      tracing::trace!("share_replay connecting to its source");
      source.subscribe(SubjectSubscriber::new(self.subject));
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use crate::prelude::*;

  #[rxflow_macro::test]
  fn source_is_subscribed_once() {
    let subscriptions = Arc::new(AtomicUsize::new(0));
    let s = subscriptions.clone();
    let shared = create(move |emitter: Emitter<i32, ()>| {
      s.fetch_add(1, Ordering::SeqCst);
      emitter.send(1);
      emitter.send(2);
      emitter.send(3);
      AnyCancellable::empty()
    })
    .share_replay(2);
    assert!(!shared.is_connected());

    let first = MutArc::own(vec![]);
    let second = MutArc::own(vec![]);
    let (f, s) = (first.clone(), second.clone());
    let _a = shared.clone().sink_value(move |v| f.rc_deref_mut().push(v));
    let _b = shared.clone().sink_value(move |v| s.rc_deref_mut().push(v));

    assert!(shared.is_connected());
    assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
    assert_eq!(*first.rc_deref(), vec![1, 2, 3]);
    assert_eq!(*second.rc_deref(), vec![2, 3]);
  }

  #[rxflow_macro::test]
  fn completion_is_shared_and_replayed() {
    let source = ReplaySubject::<i32, &'static str>::new(0);
    let shared = source.clone().share_replay(1);
    let failures = MutArc::own(vec![]);
    let (f1, f2) = (failures.clone(), failures.clone());
    let _a = shared.clone().sink_failure(move |e| f1.rc_deref_mut().push(e));
    source.send(5);
    source.send_completion(Completion::Failed("down"));
    let late = MutArc::own(vec![]);
    let l = late.clone();
    let _b = shared.clone().sink(
      move |c| {
        if let Completion::Failed(e) = c {
          f2.rc_deref_mut().push(e)
        }
      },
      move |v| l.rc_deref_mut().push(v),
    );
    assert_eq!(*failures.rc_deref(), vec!["down", "down"]);
    assert_eq!(*late.rc_deref(), vec![5]);
  }
}
