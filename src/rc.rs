//! Shared mutable slots.
//!
//! Everything that crosses a subscription boundary can be touched from more
//! than one thread, so the crate only carries the `Arc`/`Mutex` flavour.
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, MutexGuard};

pub trait RcDeref {
  type Target<'a>
  where
    Self: 'a;
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref<'a>(&'a self) -> Self::Target<'a>;
}

pub trait RcDerefMut {
  type Target<'a>
  where
    Self: 'a;
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref_mut<'a>(&'a self) -> Self::Target<'a>;
}

/// A cloneable handle to a value behind a mutex.
#[derive(Default)]
pub struct MutArc<T>(Arc<Mutex<T>>);

/// Non-owning counterpart of [`MutArc`].
pub struct WeakMutArc<T>(Weak<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(t: T) -> Self { Self(Arc::new(Mutex::new(t))) }

  pub fn downgrade(&self) -> WeakMutArc<T> { WeakMutArc(Arc::downgrade(&self.0)) }

  /// Replace the inner value and return the previous one.
  pub fn replace(&self, value: T) -> T { std::mem::replace(&mut *self.0.lock(), value) }

  pub fn ptr_eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

impl<T: Default> MutArc<T> {
  /// Take the inner value, leaving `T::default()` behind.
  pub fn take(&self) -> T { std::mem::take(&mut *self.0.lock()) }
}

impl<T> WeakMutArc<T> {
  pub fn upgrade(&self) -> Option<MutArc<T>> { self.0.upgrade().map(MutArc) }
}

impl<T> RcDeref for MutArc<T> {
  type Target<'a>
    = MutexGuard<'a, T>
  where
    Self: 'a;

  #[inline]
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref<'a>(&'a self) -> Self::Target<'a> { self.0.lock() }
}

impl<T> RcDerefMut for MutArc<T> {
  type Target<'a>
    = MutexGuard<'a, T>
  where
    Self: 'a;

  #[inline]
  #[allow(clippy::needless_lifetimes)]
  fn rc_deref_mut<'a>(&'a self) -> Self::Target<'a> { self.0.lock() }
}

impl<T> From<T> for MutArc<T> {
  fn from(value: T) -> Self { Self::own(value) }
}

impl<T> Clone for MutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}

impl<T> Clone for WeakMutArc<T> {
  #[inline]
  fn clone(&self) -> Self { Self(self.0.clone()) }
}
