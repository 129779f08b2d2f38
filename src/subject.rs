//! Multicast sources.
//!
//! [`ReplaySubject`] is both a handle producers push into and a
//! [`Publisher`](crate::publisher::Publisher) any number of subscribers attach
//! to. [`SubjectSubscriber`] connects an upstream publisher to a subject.
mod replay_subject;
mod subject_subscriber;
mod subscribers;

pub use replay_subject::ReplaySubject;
pub use subject_subscriber::SubjectSubscriber;
