//! Demand arithmetic.
//!
//! A [`Demand`] is the number of values a subscriber is still willing to
//! receive. It is either a finite count or unlimited, and every operation on
//! it saturates: it never goes below zero, overflowing finite demand becomes
//! unlimited, and unlimited demand absorbs everything added to or taken from
//! it.
use std::{
  cmp::Ordering,
  fmt::{Display, Formatter},
  ops::{Add, AddAssign, Sub, SubAssign},
};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Demand {
  /// At most this many more values.
  Max(usize),
  /// Any number of values.
  Unlimited,
}

impl Demand {
  /// No demand at all.
  pub const NONE: Demand = Demand::Max(0);

  #[inline]
  pub fn max(count: usize) -> Self { Demand::Max(count) }

  #[inline]
  pub fn is_none(&self) -> bool { *self == Demand::NONE }

  #[inline]
  pub fn is_unlimited(&self) -> bool { matches!(self, Demand::Unlimited) }

  /// The finite count, or `None` for unlimited demand.
  #[inline]
  pub fn count(&self) -> Option<usize> {
    match self {
      Demand::Max(n) => Some(*n),
      Demand::Unlimited => None,
    }
  }

  pub fn saturating_add(self, rhs: Demand) -> Demand {
    match (self, rhs) {
      (Demand::Max(a), Demand::Max(b)) => a.checked_add(b).map_or(Demand::Unlimited, Demand::Max),
      _ => Demand::Unlimited,
    }
  }

  pub fn saturating_sub(self, rhs: Demand) -> Demand {
    match (self, rhs) {
      (Demand::Unlimited, _) => Demand::Unlimited,
      (Demand::Max(_), Demand::Unlimited) => Demand::NONE,
      (Demand::Max(a), Demand::Max(b)) => Demand::Max(a.saturating_sub(b)),
    }
  }
}

impl Default for Demand {
  fn default() -> Self { Demand::NONE }
}

impl From<usize> for Demand {
  fn from(count: usize) -> Self { Demand::Max(count) }
}

impl PartialOrd for Demand {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Demand {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (Demand::Max(a), Demand::Max(b)) => a.cmp(b),
      (Demand::Max(_), Demand::Unlimited) => Ordering::Less,
      (Demand::Unlimited, Demand::Max(_)) => Ordering::Greater,
      (Demand::Unlimited, Demand::Unlimited) => Ordering::Equal,
    }
  }
}

impl PartialEq<usize> for Demand {
  fn eq(&self, other: &usize) -> bool { *self == Demand::Max(*other) }
}

impl PartialOrd<usize> for Demand {
  fn partial_cmp(&self, other: &usize) -> Option<Ordering> { Some(self.cmp(&Demand::Max(*other))) }
}

impl Display for Demand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Demand::Max(n) => write!(f, "max({n})"),
      Demand::Unlimited => f.write_str("unlimited"),
    }
  }
}

macro_rules! impl_demand_arith {
  ($rhs: ty, $conv: expr) => {
    impl Add<$rhs> for Demand {
      type Output = Demand;
      #[inline]
      fn add(self, rhs: $rhs) -> Demand { self.saturating_add($conv(rhs)) }
    }

    impl Sub<$rhs> for Demand {
      type Output = Demand;
      #[inline]
      fn sub(self, rhs: $rhs) -> Demand { self.saturating_sub($conv(rhs)) }
    }

    impl AddAssign<$rhs> for Demand {
      #[inline]
      fn add_assign(&mut self, rhs: $rhs) { *self = *self + rhs; }
    }

    impl SubAssign<$rhs> for Demand {
      #[inline]
      fn sub_assign(&mut self, rhs: $rhs) { *self = *self - rhs; }
    }
  };
}

impl_demand_arith!(Demand, std::convert::identity);
impl_demand_arith!(usize, Demand::Max);
