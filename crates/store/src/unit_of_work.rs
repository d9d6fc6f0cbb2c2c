//! Unit of work: one commit cycle per logical operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use shopkeep_core::{DomainError, DomainResult, StoreError};
use shopkeep_events::{EventDispatcher, EventEnvelope};
use shopkeep_products::Product;
use shopkeep_users::User;

use crate::repository::{Journal, Repository};
use crate::store::{Mutation, TransactionalStore};

/// Coordinates the repositories' staged mutations into one atomic commit,
/// then dispatches the domain events the committed aggregates raised.
///
/// Guarantees:
/// - entity state is durable before any event is delivered;
/// - a rejected commit stamps nothing visible and dispatches nothing;
/// - each pending event is dispatched exactly once per successful commit;
/// - once the durable write has succeeded, cancellation no longer aborts
///   dispatch.
pub struct UnitOfWork<S> {
    store: Arc<S>,
    dispatcher: Arc<EventDispatcher>,
    journal: Journal,
    deferred: Mutex<Vec<EventEnvelope>>,
    in_transaction: AtomicBool,
}

impl<S> UnitOfWork<S>
where
    S: TransactionalStore,
{
    pub fn new(store: Arc<S>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            journal: Journal::default(),
            deferred: Mutex::new(Vec::new()),
            in_transaction: AtomicBool::new(false),
        }
    }

    pub fn users(&self) -> Repository<User, S> {
        Repository::new(Arc::clone(&self.store), Arc::clone(&self.journal))
    }

    pub fn products(&self) -> Repository<Product, S> {
        Repository::new(Arc::clone(&self.store), Arc::clone(&self.journal))
    }

    /// Commit the staged mutations. Returns how many were applied.
    ///
    /// Stamps audit fields on working copies, applies the batch atomically,
    /// and only then drains and dispatches the pending events in staging
    /// order (entity first, its events after). Inside an explicit
    /// transaction dispatch is deferred until `commit_transaction`.
    pub async fn save_changes(&self, ct: &CancellationToken) -> DomainResult<usize> {
        if ct.is_cancelled() {
            return Err(StoreError::Cancelled.into());
        }

        // Work on clones; the journal stays intact until the store accepted
        // the batch, so a rejected commit leaves everything re-submittable.
        let mut batch: Vec<Mutation> = {
            let journal = self.lock_journal()?;
            journal.clone()
        };
        if batch.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut envelopes = Vec::new();
        for mutation in &mut batch {
            mutation.stamp(now);
            mutation.drain_events_into(&mut envelopes)?;
        }

        let count = batch.len();
        self.store.apply(batch, ct).await?;

        {
            let mut journal = self.lock_journal()?;
            journal.clear();
        }
        tracing::debug!(mutations = count, events = envelopes.len(), "changes committed");

        if self.in_transaction.load(Ordering::Acquire) {
            self.lock_deferred()?.extend(envelopes);
        } else {
            self.dispatcher.dispatch(&envelopes);
        }
        Ok(count)
    }

    /// Open an explicit transaction spanning several `save_changes` calls.
    pub async fn begin_transaction(&self, ct: &CancellationToken) -> DomainResult<()> {
        if ct.is_cancelled() {
            return Err(StoreError::Cancelled.into());
        }
        self.store.begin().await?;
        self.in_transaction.store(true, Ordering::Release);
        Ok(())
    }

    /// Make the transaction durable and dispatch every deferred event, in
    /// the order the saves produced them.
    pub async fn commit_transaction(&self, ct: &CancellationToken) -> DomainResult<()> {
        if ct.is_cancelled() {
            return Err(StoreError::Cancelled.into());
        }
        self.store.commit().await?;
        self.in_transaction.store(false, Ordering::Release);
        let deferred: Vec<EventEnvelope> = {
            let mut guard = self.lock_deferred()?;
            std::mem::take(&mut *guard)
        };
        self.dispatcher.dispatch(&deferred);
        Ok(())
    }

    /// Restore the pre-transaction state. Deferred events and any still
    /// staged mutations are discarded; nothing is dispatched.
    pub async fn rollback_transaction(&self) -> DomainResult<()> {
        if let Err(err) = self.store.rollback().await {
            tracing::error!(error = %err, "transaction rollback failed");
            return Err(err.into());
        }
        self.in_transaction.store(false, Ordering::Release);
        self.lock_deferred()?.clear();
        self.lock_journal()?.clear();
        Ok(())
    }

    /// Staged-but-uncommitted mutation count.
    pub fn pending_mutations(&self) -> DomainResult<usize> {
        Ok(self.lock_journal()?.len())
    }

    fn lock_journal(&self) -> DomainResult<std::sync::MutexGuard<'_, Vec<Mutation>>> {
        self.journal
            .lock()
            .map_err(|_| DomainError::from(StoreError::Backend("mutation journal poisoned".into())))
    }

    fn lock_deferred(&self) -> DomainResult<std::sync::MutexGuard<'_, Vec<EventEnvelope>>> {
        self.deferred
            .lock()
            .map_err(|_| DomainError::from(StoreError::Backend("deferred events poisoned".into())))
    }
}
