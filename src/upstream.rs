use crate::{
  demand::Demand,
  rc::{MutArc, RcDerefMut},
  subscriber::AnySubscription,
};

enum UpstreamState {
  /// Not attached yet; holds demand requested so far.
  Pending(Demand),
  Attached(AnySubscription),
  Cancelled,
}

/// The subscription a subscriber holds on its upstream.
///
/// Requests made before the subscription arrives are held back and forwarded
/// on attach. Cancelling is one-shot: whichever of explicit cancel, terminal
/// handling or teardown comes first wins, and a subscription arriving after
/// that is cancelled straight away. Upstream calls are always made without
/// holding the slot lock.
#[derive(Clone)]
pub(crate) struct Upstream(MutArc<UpstreamState>);

impl Upstream {
  pub(crate) fn new() -> Self { Self::with_demand(Demand::NONE) }

  /// A slot that requests `demand` as soon as it is attached.
  pub(crate) fn with_demand(demand: Demand) -> Self {
    Self(MutArc::own(UpstreamState::Pending(demand)))
  }

  pub(crate) fn attach(&self, subscription: AnySubscription) {
    let pending = {
      let mut state = self.0.rc_deref_mut();
      match &mut *state {
        UpstreamState::Pending(demand) => {
          let demand = *demand;
          *state = UpstreamState::Attached(subscription.clone());
          Some(demand)
        }
        UpstreamState::Attached(_) | UpstreamState::Cancelled => None,
      }
    };
    match pending {
      Some(demand) if !demand.is_none() => subscription.request(demand),
      Some(_) => {}
      None => {
        tracing::trace!("upstream already attached or cancelled, cancelling new subscription");
        subscription.cancel();
      }
    }
  }

  pub(crate) fn request(&self, demand: Demand) {
    if demand.is_none() {
      return;
    }
    let attached = {
      let mut state = self.0.rc_deref_mut();
      match &mut *state {
        UpstreamState::Pending(pending) => {
          *pending += demand;
          None
        }
        UpstreamState::Attached(subscription) => Some(subscription.clone()),
        UpstreamState::Cancelled => None,
      }
    };
    if let Some(subscription) = attached {
      subscription.request(demand);
    }
  }

  /// Returns whether this call performed the cancellation.
  pub(crate) fn cancel(&self) -> bool {
    let previous = std::mem::replace(&mut *self.0.rc_deref_mut(), UpstreamState::Cancelled);
    match previous {
      UpstreamState::Attached(subscription) => {
        subscription.cancel();
        true
      }
      UpstreamState::Pending(_) => true,
      UpstreamState::Cancelled => false,
    }
  }

  #[cfg(test)]
  pub(crate) fn is_cancelled(&self) -> bool {
    matches!(*self.0.rc_deref_mut(), UpstreamState::Cancelled)
  }
}
