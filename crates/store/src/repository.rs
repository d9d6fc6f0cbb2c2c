//! Generic repository over one aggregate type.

use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use shopkeep_core::specification::{Predicate, Specification};
use shopkeep_core::{AggregateRoot, DomainResult, Email, StoreError, UserId};
use shopkeep_products::Product;
use shopkeep_users::User;

use crate::evaluator::SpecificationEvaluator;
use crate::store::{EntityRecord, EntityStore, Mutation, MutationKind};

/// Staged mutations shared between the repositories of one unit of work.
/// Order is staging order; the store applies it verbatim.
pub(crate) type Journal = Arc<Mutex<Vec<Mutation>>>;

/// An aggregate the store knows how to persist.
pub trait StoreAggregate: AggregateRoot + Clone + Send + Sync + 'static {
    fn into_record(self) -> EntityRecord;
}

impl StoreAggregate for User {
    fn into_record(self) -> EntityRecord {
        EntityRecord::User(self)
    }
}

impl StoreAggregate for Product {
    fn into_record(self) -> EntityRecord {
        EntityRecord::Product(self)
    }
}

/// Reads evaluate specifications against the backing store; writes stage
/// mutations into the owning unit of work's journal. Nothing is durable
/// until `UnitOfWork::save_changes`.
///
/// Soft-deleted rows are excluded from every read; no specification can
/// bring them back.
pub struct Repository<T, S> {
    store: Arc<S>,
    journal: Journal,
    _entity: PhantomData<fn() -> T>,
}

impl<T, S> Repository<T, S>
where
    T: StoreAggregate,
    S: EntityStore<T>,
{
    pub(crate) fn new(store: Arc<S>, journal: Journal) -> Self {
        Self {
            store,
            journal,
            _entity: PhantomData,
        }
    }

    async fn run_spec(
        &self,
        spec: &Specification<T>,
        ct: &CancellationToken,
    ) -> DomainResult<Vec<T>> {
        let rows = self.store.load(ct).await?;
        let plan = SpecificationEvaluator::evaluate(spec)
            .with_base_filter(Predicate::new(|e: &T| !e.audit().is_deleted()));
        Ok(plan.run(rows))
    }

    pub async fn get_by_id(&self, id: T::Id, ct: &CancellationToken) -> DomainResult<Option<T>> {
        let spec = Specification::matching(Predicate::new(move |e: &T| e.id() == id));
        Ok(self.run_spec(&spec, ct).await?.into_iter().next())
    }

    /// First row matching the specification, honoring its ordering.
    pub async fn get_by_spec(
        &self,
        spec: &Specification<T>,
        ct: &CancellationToken,
    ) -> DomainResult<Option<T>> {
        Ok(self.run_spec(spec, ct).await?.into_iter().next())
    }

    pub async fn get_all(&self, ct: &CancellationToken) -> DomainResult<Vec<T>> {
        self.run_spec(&Specification::all(), ct).await
    }

    pub async fn get_list(
        &self,
        spec: &Specification<T>,
        ct: &CancellationToken,
    ) -> DomainResult<Vec<T>> {
        self.run_spec(spec, ct).await
    }

    pub async fn count(
        &self,
        spec: &Specification<T>,
        ct: &CancellationToken,
    ) -> DomainResult<usize> {
        Ok(self.run_spec(spec, ct).await?.len())
    }

    pub async fn exists(
        &self,
        spec: &Specification<T>,
        ct: &CancellationToken,
    ) -> DomainResult<bool> {
        Ok(!self.run_spec(spec, ct).await?.is_empty())
    }

    /// Stage an insert. Takes the aggregate by value: its pending events now
    /// belong to the commit cycle, and callers re-fetch for post-commit
    /// state.
    pub fn add(&self, entity: T, ct: &CancellationToken) -> DomainResult<()> {
        self.stage(MutationKind::Insert, entity, ct)
    }

    pub fn add_range(&self, entities: Vec<T>, ct: &CancellationToken) -> DomainResult<()> {
        for entity in entities {
            self.stage(MutationKind::Insert, entity, ct)?;
        }
        Ok(())
    }

    /// Stage an update of an existing row.
    pub fn update(&self, entity: T, ct: &CancellationToken) -> DomainResult<()> {
        self.stage(MutationKind::Update, entity, ct)
    }

    /// Stage a logical delete. The row survives with its deletion marker and
    /// actor attribution set; reads will no longer return it.
    pub fn delete(
        &self,
        entity: T,
        deleted_by: Option<&str>,
        ct: &CancellationToken,
    ) -> DomainResult<()> {
        self.stage(
            MutationKind::Delete {
                deleted_by: deleted_by.map(str::to_string),
            },
            entity,
            ct,
        )
    }

    pub fn delete_range(
        &self,
        entities: Vec<T>,
        deleted_by: Option<&str>,
        ct: &CancellationToken,
    ) -> DomainResult<()> {
        for entity in entities {
            self.delete(entity, deleted_by, ct)?;
        }
        Ok(())
    }

    fn stage(&self, kind: MutationKind, entity: T, ct: &CancellationToken) -> DomainResult<()> {
        if ct.is_cancelled() {
            return Err(StoreError::Cancelled.into());
        }
        let mut journal = self
            .journal
            .lock()
            .map_err(|_| StoreError::Backend("mutation journal poisoned".into()))?;
        journal.push(Mutation {
            kind,
            record: entity.into_record(),
        });
        Ok(())
    }
}

impl<S> Repository<User, S>
where
    S: EntityStore<User>,
{
    pub async fn get_by_email(
        &self,
        email: &Email,
        ct: &CancellationToken,
    ) -> DomainResult<Option<User>> {
        self.get_by_spec(&shopkeep_users::specs::by_email(email), ct)
            .await
    }

    pub async fn exists_by_email(
        &self,
        email: &Email,
        ct: &CancellationToken,
    ) -> DomainResult<bool> {
        self.exists(&shopkeep_users::specs::by_email(email), ct)
            .await
    }

    pub async fn get_active(&self, ct: &CancellationToken) -> DomainResult<Vec<User>> {
        self.get_list(&shopkeep_users::specs::active(), ct).await
    }

    pub async fn get_by_role(
        &self,
        role: &str,
        ct: &CancellationToken,
    ) -> DomainResult<Vec<User>> {
        self.get_list(&shopkeep_users::specs::by_role(role), ct)
            .await
    }
}

impl<S> Repository<Product, S>
where
    S: EntityStore<Product>,
{
    pub async fn get_by_sku(
        &self,
        sku: &str,
        ct: &CancellationToken,
    ) -> DomainResult<Option<Product>> {
        self.get_by_spec(&shopkeep_products::specs::by_sku(sku), ct)
            .await
    }

    pub async fn exists_by_sku(&self, sku: &str, ct: &CancellationToken) -> DomainResult<bool> {
        self.exists(&shopkeep_products::specs::by_sku(sku), ct)
            .await
    }

    pub async fn get_active(&self, ct: &CancellationToken) -> DomainResult<Vec<Product>> {
        self.get_list(&shopkeep_products::specs::active(), ct).await
    }

    pub async fn get_by_category(
        &self,
        category: &str,
        ct: &CancellationToken,
    ) -> DomainResult<Vec<Product>> {
        self.get_list(&shopkeep_products::specs::by_category(category), ct)
            .await
    }

    pub async fn get_low_stock(
        &self,
        threshold: Option<u32>,
        ct: &CancellationToken,
    ) -> DomainResult<Vec<Product>> {
        self.get_list(&shopkeep_products::specs::low_stock(threshold), ct)
            .await
    }

    pub async fn get_by_owner(
        &self,
        owner_id: UserId,
        ct: &CancellationToken,
    ) -> DomainResult<Vec<Product>> {
        self.get_list(&shopkeep_products::specs::by_owner(owner_id), ct)
            .await
    }
}
