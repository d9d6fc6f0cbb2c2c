//! Aggregate root trait for the domain models.

use crate::entity::AuditInfo;

/// Aggregate root marker + minimal interface.
///
/// This is intentionally small so domain modules can decide how they model
/// state transitions without bringing in any infrastructure concerns. The
/// only shared obligation is the pending-event list: state transitions record
/// the events they raise, and the unit of work drains them after a successful
/// commit.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync + 'static;

    /// Event type raised by this aggregate's state transitions.
    type Event: Clone + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> Self::Id;

    /// Audit stamps and the soft-delete marker. Owned by the store.
    fn audit(&self) -> &AuditInfo;

    fn audit_mut(&mut self) -> &mut AuditInfo;

    /// Events recorded since the last successful commit, in raise order.
    fn pending_events(&self) -> &[Self::Event];

    /// Drain the pending events, leaving the list empty.
    fn take_events(&mut self) -> Vec<Self::Event>;
}
