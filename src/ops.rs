//! Operators built on [`Sink`](crate::sink::Sink) and
//! [`DemandBuffer`](crate::demand_buffer::DemandBuffer). Use them through
//! [`PublisherExt`](crate::publisher::PublisherExt).
pub mod catch_with;
pub mod combine_latest;
pub mod map;
pub mod map_to;
pub mod share_replay;
pub mod with_latest_from;
