use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A domain event: something that happened to an aggregate.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **named** by a stable dotted kind (e.g. "product.stock_reduced")
/// - raised during a state transition and dispatched only after the
///   transition has been committed
pub trait DomainEvent: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event kind identifier. Subscribers register against this.
    fn kind(&self) -> &'static str;

    /// Unique id of this occurrence.
    fn event_id(&self) -> Uuid;

    /// When the event occurred (business time).
    fn occurred_on(&self) -> DateTime<Utc>;

    /// Id of the aggregate the event happened to.
    fn subject_id(&self) -> Uuid;
}
