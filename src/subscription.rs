//! Cancellation handles.
//!
//! [`Cancellable`] is a unit of cleanup work that runs at most once.
//! [`AnyCancellable`] owns such work and runs it when cancelled or dropped;
//! [`CancelBag`] collects many of them.
use std::fmt::{Debug, Formatter};

use parking_lot::Mutex;

use crate::subscriber::AnySubscription;

mod cancel_bag;
mod dynamic;

pub use cancel_bag::CancelBag;
pub use dynamic::DynamicSubscriptions;

pub trait Cancellable {
  /// Run the cleanup. Calls after the first are no-ops.
  fn cancel(&self);
}

type CancelAction = Box<dyn FnOnce() + Send>;

/// A type-erased cancellable that cancels itself when dropped.
///
/// Keep it alive for as long as the work it guards should run. Dropping it,
/// for instance by not binding the result of `sink`, tears the work down
/// immediately.
///
/// ```rust
/// use std::sync::{
///   atomic::{AtomicBool, Ordering},
///   Arc,
/// };
///
/// use rxflow::prelude::*;
///
/// let cancelled = Arc::new(AtomicBool::new(false));
/// let c = cancelled.clone();
/// {
///   let _guard = AnyCancellable::new(move || c.store(true, Ordering::SeqCst));
/// }
/// assert!(cancelled.load(Ordering::SeqCst));
/// ```
#[must_use = "dropping an AnyCancellable cancels it immediately"]
pub struct AnyCancellable(Mutex<Option<CancelAction>>);

impl AnyCancellable {
  pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
    Self(Mutex::new(Some(Box::new(action))))
  }

  /// A cancellable with nothing to clean up.
  pub fn empty() -> Self { Self(Mutex::new(None)) }

  /// Wrap a subscription so that cancelling or dropping the result cancels it.
  pub fn from_subscription(subscription: AnySubscription) -> Self {
    Self::new(move || subscription.cancel())
  }

  /// Move this handle into `bag`; it is cancelled together with the bag.
  pub fn store_in(self, bag: &CancelBag) { bag.store(self); }

  /// Whether the cleanup already ran.
  pub fn is_cancelled(&self) -> bool { self.0.lock().is_none() }
}

impl Cancellable for AnyCancellable {
  fn cancel(&self) {
    // Release the slot before running the action; the action may drop other
    // cancellables that point back here.
    let action = self.0.lock().take();
    if let Some(action) = action {
      action();
    }
  }
}

impl Drop for AnyCancellable {
  fn drop(&mut self) { self.cancel(); }
}

impl Debug for AnyCancellable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AnyCancellable")
      .field("is_cancelled", &self.is_cancelled())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  fn counter() -> (Arc<AtomicUsize>, AnyCancellable) {
    let count = Arc::new(AtomicUsize::new(0));
    let c = count.clone();
    (count, AnyCancellable::new(move || {
      c.fetch_add(1, Ordering::SeqCst);
    }))
  }

  #[rxflow_macro::test]
  fn runs_once() {
    let (count, cancellable) = counter();
    assert!(!cancellable.is_cancelled());
    cancellable.cancel();
    cancellable.cancel();
    drop(cancellable);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[rxflow_macro::test]
  fn drop_cancels() {
    let (count, cancellable) = counter();
    drop(cancellable);
    assert_eq!(count.load(Ordering::SeqCst), 1);
  }

  #[rxflow_macro::test]
  fn empty_is_already_cancelled() {
    let cancellable = AnyCancellable::empty();
    assert!(cancellable.is_cancelled());
    cancellable.cancel();
  }
}
