//! In-memory backend for tests/dev.
//!
//! Stands in for the persistent store behind the repositories. Rows live in
//! `BTreeMap`s keyed by UUIDv7, so iteration order is creation order and
//! reads are deterministic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shopkeep_core::{AggregateRoot, StoreError};
use shopkeep_products::Product;
use shopkeep_users::User;

use crate::store::{EntityRecord, EntityStore, Mutation, MutationKind, TransactionalStore};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    products: BTreeMap<Uuid, Product>,
}

/// In-memory transactional store.
///
/// - `apply` validates the whole batch against a working copy and swaps it
///   in only when every mutation passed, so a rejected batch changes nothing.
/// - Explicit transactions are snapshot/restore over both tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<State>,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    snapshot: Option<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore<User> for MemoryStore {
    async fn load(&self, ct: &CancellationToken) -> Result<Vec<User>, StoreError> {
        if ct.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let state = self.inner.read().await;
        Ok(state.tables.users.values().cloned().collect())
    }
}

#[async_trait]
impl EntityStore<Product> for MemoryStore {
    async fn load(&self, ct: &CancellationToken) -> Result<Vec<Product>, StoreError> {
        if ct.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let state = self.inner.read().await;
        Ok(state.tables.products.values().cloned().collect())
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    async fn apply(
        &self,
        batch: Vec<Mutation>,
        ct: &CancellationToken,
    ) -> Result<(), StoreError> {
        // Cancellation is honored up to the durable write, never after.
        if ct.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let mut state = self.inner.write().await;
        let mut work = state.tables.clone();
        for mutation in batch {
            apply_one(&mut work, mutation)?;
        }
        state.tables = work;
        Ok(())
    }

    async fn begin(&self) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        if state.snapshot.is_some() {
            return Err(StoreError::Backend("transaction already open".into()));
        }
        state.snapshot = Some(state.tables.clone());
        Ok(())
    }

    async fn commit(&self) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        if state.snapshot.take().is_none() {
            return Err(StoreError::Backend("no open transaction".into()));
        }
        Ok(())
    }

    async fn rollback(&self) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        match state.snapshot.take() {
            Some(tables) => {
                state.tables = tables;
                Ok(())
            }
            None => Err(StoreError::Backend("no open transaction".into())),
        }
    }
}

fn apply_one(tables: &mut Tables, mutation: Mutation) -> Result<(), StoreError> {
    let id = mutation.record.uuid();
    match (mutation.kind, mutation.record) {
        (MutationKind::Insert, EntityRecord::User(user)) => {
            if tables.users.contains_key(&id) {
                return Err(StoreError::Backend(format!("user row {id} already exists")));
            }
            check_unique_email(tables, &user, id)?;
            tables.users.insert(id, user);
        }
        (MutationKind::Insert, EntityRecord::Product(product)) => {
            if tables.products.contains_key(&id) {
                return Err(StoreError::Backend(format!(
                    "product row {id} already exists"
                )));
            }
            check_unique_sku(tables, &product, id)?;
            tables.products.insert(id, product);
        }
        (MutationKind::Update | MutationKind::Delete { .. }, EntityRecord::User(user)) => {
            if !tables.users.contains_key(&id) {
                return Err(StoreError::Missing(format!("user row {id}")));
            }
            check_unique_email(tables, &user, id)?;
            tables.users.insert(id, user);
        }
        (MutationKind::Update | MutationKind::Delete { .. }, EntityRecord::Product(product)) => {
            if !tables.products.contains_key(&id) {
                return Err(StoreError::Missing(format!("product row {id}")));
            }
            check_unique_sku(tables, &product, id)?;
            tables.products.insert(id, product);
        }
    }
    Ok(())
}

/// Email is unique among live (non-deleted) rows.
fn check_unique_email(tables: &Tables, user: &User, own_id: Uuid) -> Result<(), StoreError> {
    let taken = tables.users.iter().any(|(id, existing)| {
        *id != own_id && !existing.audit().is_deleted() && existing.email() == user.email()
    });
    if taken {
        return Err(StoreError::UniqueViolation(format!(
            "email {} is already registered",
            user.email()
        )));
    }
    Ok(())
}

/// SKU is unique among live (non-deleted) rows.
fn check_unique_sku(tables: &Tables, product: &Product, own_id: Uuid) -> Result<(), StoreError> {
    let taken = tables.products.iter().any(|(id, existing)| {
        *id != own_id && !existing.audit().is_deleted() && existing.sku() == product.sku()
    });
    if taken {
        return Err(StoreError::UniqueViolation(format!(
            "sku {} is already in use",
            product.sku()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopkeep_core::Email;

    fn user(email: &str) -> User {
        let mut u = User::new("Jane", "Doe", Email::new(email).unwrap(), "hash").unwrap();
        u.take_events();
        u
    }

    fn insert(user: User) -> Mutation {
        Mutation {
            kind: MutationKind::Insert,
            record: EntityRecord::User(user),
        }
    }

    #[tokio::test]
    async fn insert_then_load() {
        let store = MemoryStore::new();
        let ct = CancellationToken::new();
        store.apply(vec![insert(user("a@example.com"))], &ct).await.unwrap();
        let users: Vec<User> = store.load(&ct).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_rejects_whole_batch() {
        let store = MemoryStore::new();
        let ct = CancellationToken::new();
        let err = store
            .apply(
                vec![insert(user("a@example.com")), insert(user("a@example.com"))],
                &ct,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        let users: Vec<User> = store.load(&ct).await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn update_of_missing_row_fails() {
        let store = MemoryStore::new();
        let ct = CancellationToken::new();
        let err = store
            .apply(
                vec![Mutation {
                    kind: MutationKind::Update,
                    record: EntityRecord::User(user("a@example.com")),
                }],
                &ct,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));
    }

    #[tokio::test]
    async fn cancelled_token_stops_everything() {
        let store = MemoryStore::new();
        let ct = CancellationToken::new();
        ct.cancel();
        let err = store.apply(vec![insert(user("a@example.com"))], &ct).await.unwrap_err();
        assert_eq!(err, StoreError::Cancelled);
        let err = EntityStore::<User>::load(&store, &ct).await.unwrap_err();
        assert_eq!(err, StoreError::Cancelled);
    }

    #[tokio::test]
    async fn rollback_restores_the_snapshot() {
        let store = MemoryStore::new();
        let ct = CancellationToken::new();
        store.apply(vec![insert(user("a@example.com"))], &ct).await.unwrap();

        store.begin().await.unwrap();
        store.apply(vec![insert(user("b@example.com"))], &ct).await.unwrap();
        let users: Vec<User> = store.load(&ct).await.unwrap();
        assert_eq!(users.len(), 2);

        store.rollback().await.unwrap();
        let users: Vec<User> = store.load(&ct).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn transaction_misuse_is_surfaced() {
        let store = MemoryStore::new();
        assert!(store.commit().await.is_err());
        assert!(store.rollback().await.is_err());
        store.begin().await.unwrap();
        assert!(store.begin().await.is_err());
        store.commit().await.unwrap();
    }
}
