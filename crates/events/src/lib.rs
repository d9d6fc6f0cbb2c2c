//! `shopkeep-events` — domain event plumbing.
//!
//! The aggregate crates define typed event enums; this crate defines the
//! shared contract (`DomainEvent`), the serialized form handed to subscribers
//! (`EventEnvelope`) and the in-process dispatcher that fans envelopes out to
//! per-kind subscribers after a successful commit.

pub mod dispatcher;
pub mod envelope;
pub mod event;

pub use dispatcher::{EventDispatcher, EventSubscriber};
pub use envelope::EventEnvelope;
pub use event::DomainEvent;
