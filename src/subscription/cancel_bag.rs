use parking_lot::Mutex;

use super::{AnyCancellable, Cancellable};

/// A collection of cancellables that are torn down together.
///
/// The bag cancels everything it holds when [`cancel`](Cancellable::cancel)
/// is called or when it is dropped. It can be reused after a cancel.
///
/// Conditional handles are collected by passing `Option`s through
/// [`store_all`](CancelBag::store_all):
///
/// ```rust
/// use rxflow::prelude::*;
///
/// let relay = PassthroughRelay::<i32>::new();
/// let verbose = false;
///
/// let bag = CancelBag::new();
/// bag.store_all(
///   [Some((&relay).sink_value(|_| {})), verbose.then(|| (&relay).sink_value(|v| println!("{v}")))]
///     .into_iter()
///     .flatten(),
/// );
/// assert_eq!(bag.len(), 1);
/// ```
#[derive(Default)]
pub struct CancelBag(Mutex<Vec<AnyCancellable>>);

impl CancelBag {
  pub fn new() -> Self { Self::default() }

  pub fn store(&self, cancellable: AnyCancellable) { self.0.lock().push(cancellable); }

  pub fn store_all(&self, cancellables: impl IntoIterator<Item = AnyCancellable>) {
    self.0.lock().extend(cancellables);
  }

  pub fn len(&self) -> usize { self.0.lock().len() }

  pub fn is_empty(&self) -> bool { self.0.lock().is_empty() }
}

impl Cancellable for CancelBag {
  fn cancel(&self) {
    // Cancelled outside the lock so cleanup work may store into the bag.
    let items = std::mem::take(&mut *self.0.lock());
    for item in &items {
      item.cancel();
    }
  }
}

impl Extend<AnyCancellable> for CancelBag {
  fn extend<I: IntoIterator<Item = AnyCancellable>>(&mut self, iter: I) { self.store_all(iter); }
}

impl FromIterator<AnyCancellable> for CancelBag {
  fn from_iter<I: IntoIterator<Item = AnyCancellable>>(iter: I) -> Self {
    Self(Mutex::new(iter.into_iter().collect()))
  }
}

impl Drop for CancelBag {
  fn drop(&mut self) { self.cancel(); }
}

impl std::fmt::Debug for CancelBag {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CancelBag").field("len", &self.len()).finish()
  }
}
