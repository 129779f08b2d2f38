use smallvec::SmallVec;

use super::Cancellable;

/// Registry of live subscriptions keyed by registration id.
///
/// Ids grow monotonically and are never handed out twice, so the entries
/// stay sorted by id and a stale id cannot remove a newer registration.
/// Iteration follows registration order.
///
/// ```rust
/// use rxflow::subscription::DynamicSubscriptions;
///
/// let mut subs: DynamicSubscriptions<&str> = DynamicSubscriptions::default();
///
/// let first = subs.add("first");
/// let second = subs.add("second");
/// assert_eq!(subs.ids().collect::<Vec<_>>(), vec![first, second]);
///
/// assert_eq!(subs.remove(first), Some("first"));
/// assert_eq!(subs.remove(first), None);
/// assert_eq!(subs.len(), 1);
/// ```
pub struct DynamicSubscriptions<U> {
  next_id: usize,
  entries: SmallVec<[(usize, U); 2]>,
}

impl<U> Default for DynamicSubscriptions<U> {
  fn default() -> Self { Self { next_id: 0, entries: SmallVec::new() } }
}

impl<U> DynamicSubscriptions<U> {
  pub fn new() -> Self { Self::default() }

  /// Register `entry` and return its id.
  pub fn add(&mut self, entry: U) -> usize {
    let id = self.next_id;
    self.next_id += 1;
    self.entries.push((id, entry));
    id
  }

  /// Unregister `id`. Returns `None` if it was already removed.
  pub fn remove(&mut self, id: usize) -> Option<U> {
    let index = self.index_of(id)?;
    Some(self.entries.remove(index).1)
  }

  pub fn contains(&self, id: usize) -> bool { self.index_of(id).is_some() }

  #[inline]
  pub fn len(&self) -> usize { self.entries.len() }

  #[inline]
  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn ids(&self) -> impl Iterator<Item = usize> + '_ { self.entries.iter().map(|(id, _)| *id) }

  /// Unregister everything, in registration order.
  pub fn drain(&mut self) -> impl Iterator<Item = U> + '_ {
    self.entries.drain(..).map(|(_, entry)| entry)
  }

  pub fn iter(&self) -> impl Iterator<Item = &U> { self.entries.iter().map(|(_, entry)| entry) }

  fn index_of(&self, id: usize) -> Option<usize> {
    self.entries.binary_search_by_key(&id, |(id, _)| *id).ok()
  }
}

impl<U: Cancellable> DynamicSubscriptions<U> {
  /// Cancel every registration, oldest first, and clear the registry.
  pub fn cancel_all(&mut self) {
    for entry in self.drain() {
      entry.cancel();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::subscription::AnyCancellable;

  #[rxflow_macro::test]
  fn ids_are_not_reused() {
    let mut subs = DynamicSubscriptions::new();
    let a = subs.add('a');
    subs.remove(a);
    let b = subs.add('b');
    assert_ne!(a, b);
    assert!(!subs.contains(a));
    assert!(subs.contains(b));
  }

  #[rxflow_macro::test]
  fn cancel_all_empties() {
    let mut subs = DynamicSubscriptions::new();
    subs.add(AnyCancellable::empty());
    subs.add(AnyCancellable::empty());
    subs.cancel_all();
    assert!(subs.is_empty());
  }
}
