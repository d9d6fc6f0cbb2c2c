//! Store-facing contracts: mutation batches and the traits a backend
//! implements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shopkeep_core::{AggregateRoot, StoreError};
use shopkeep_events::EventEnvelope;
use shopkeep_products::Product;
use shopkeep_users::User;

/// An aggregate in its storable form.
///
/// The store works on this closed set so it can enforce cross-row rules
/// (unique email, unique SKU) without generic machinery.
#[derive(Debug, Clone)]
pub enum EntityRecord {
    User(User),
    Product(Product),
}

impl EntityRecord {
    pub fn uuid(&self) -> Uuid {
        match self {
            EntityRecord::User(u) => *u.id().as_uuid(),
            EntityRecord::Product(p) => *p.id().as_uuid(),
        }
    }

    fn audit_mut(&mut self) -> &mut shopkeep_core::AuditInfo {
        match self {
            EntityRecord::User(u) => u.audit_mut(),
            EntityRecord::Product(p) => p.audit_mut(),
        }
    }
}

/// What to do with the record at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    /// Logical delete with optional actor attribution.
    Delete { deleted_by: Option<String> },
}

/// One staged change, queued by a repository and committed by the unit of
/// work. Ordering within a batch is staging order.
#[derive(Debug, Clone)]
pub struct Mutation {
    pub kind: MutationKind,
    pub record: EntityRecord,
}

impl Mutation {
    /// Apply the audit stamping this mutation kind calls for.
    pub fn stamp(&mut self, now: DateTime<Utc>) {
        let kind = self.kind.clone();
        let audit = self.record.audit_mut();
        match kind {
            MutationKind::Insert => audit.stamp_created(now),
            MutationKind::Update => audit.stamp_updated(now),
            MutationKind::Delete { deleted_by } => audit.mark_deleted(now, deleted_by),
        }
    }

    /// Drain the record's pending events into envelopes, preserving raise
    /// order. The record is left with an empty pending list.
    pub fn drain_events_into(
        &mut self,
        envelopes: &mut Vec<EventEnvelope>,
    ) -> Result<(), StoreError> {
        match &mut self.record {
            EntityRecord::User(u) => {
                for event in u.take_events() {
                    envelopes.push(
                        EventEnvelope::from_event(&event)
                            .map_err(|e| StoreError::Backend(e.to_string()))?,
                    );
                }
            }
            EntityRecord::Product(p) => {
                for event in p.take_events() {
                    envelopes.push(
                        EventEnvelope::from_event(&event)
                            .map_err(|e| StoreError::Backend(e.to_string()))?,
                    );
                }
            }
        }
        Ok(())
    }
}

/// Read side of a backend, per entity type.
#[async_trait]
pub trait EntityStore<T>: Send + Sync {
    /// Load every row of the entity's table (soft-deleted rows included;
    /// exclusion is the caller's plan's job).
    async fn load(&self, ct: &CancellationToken) -> Result<Vec<T>, StoreError>;
}

/// Write side of a backend.
///
/// `apply` is all-or-nothing: the batch is validated in full (row existence,
/// unique business keys) before any row changes; on error nothing is
/// applied. `begin`/`commit`/`rollback` bound an explicit transaction
/// spanning multiple `apply` calls.
#[async_trait]
pub trait TransactionalStore: EntityStore<User> + EntityStore<Product> {
    async fn apply(
        &self,
        batch: Vec<Mutation>,
        ct: &CancellationToken,
    ) -> Result<(), StoreError>;

    async fn begin(&self) -> Result<(), StoreError>;

    async fn commit(&self) -> Result<(), StoreError>;

    async fn rollback(&self) -> Result<(), StoreError>;
}
