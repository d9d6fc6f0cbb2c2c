//! End-to-end tests over repository + unit of work + memory store.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use shopkeep_core::{AggregateRoot, DomainError, Email, Money, StoreError, UserId};
use shopkeep_events::{EventDispatcher, EventEnvelope, EventSubscriber};
use shopkeep_products::Product;
use shopkeep_users::User;

use crate::memory::MemoryStore;
use crate::store::EntityStore;
use crate::unit_of_work::UnitOfWork;

struct Recorder {
    seen: Mutex<Vec<String>>,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn kinds(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl EventSubscriber for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn handle(&self, envelope: &EventEnvelope) -> anyhow::Result<()> {
        self.seen.lock().unwrap().push(envelope.kind().to_string());
        Ok(())
    }
}

fn harness() -> (Arc<MemoryStore>, UnitOfWork<MemoryStore>, Arc<Recorder>) {
    shopkeep_observability::init();
    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(EventDispatcher::new());
    let recorder = Recorder::new();
    for kind in [
        "user.created",
        "user.email_confirmed",
        "user.deactivated",
        "product.created",
        "product.stock_reduced",
    ] {
        dispatcher.subscribe(kind, recorder.clone());
    }
    let uow = UnitOfWork::new(Arc::clone(&store), dispatcher);
    (store, uow, recorder)
}

fn user(email: &str) -> User {
    User::new("Jane", "Doe", Email::new(email).unwrap(), "hash").unwrap()
}

fn product(name: &str, sku: &str, stock: u32, owner: UserId) -> Product {
    Product::new(
        name,
        "a widget",
        Money::new(9.99, "USD").unwrap(),
        sku,
        stock,
        "gadgets",
        owner,
    )
    .unwrap()
}

#[tokio::test]
async fn commit_stamps_entities_and_dispatches_once() {
    let (_, uow, recorder) = harness();
    let ct = CancellationToken::new();

    uow.users().add(user("jane@example.com"), &ct).unwrap();
    assert_eq!(uow.save_changes(&ct).await.unwrap(), 1);

    let email = Email::new("jane@example.com").unwrap();
    let saved = uow
        .users()
        .get_by_email(&email, &ct)
        .await
        .unwrap()
        .expect("user should be committed");
    assert!(saved.audit().created_at.is_some());
    assert_eq!(saved.audit().created_at, saved.audit().updated_at);
    // Stored rows carry no undispatched events.
    assert!(saved.pending_events().is_empty());

    assert_eq!(recorder.kinds(), vec!["user.created"]);

    // An empty journal commits nothing and re-dispatches nothing.
    assert_eq!(uow.save_changes(&ct).await.unwrap(), 0);
    assert_eq!(recorder.kinds().len(), 1);
}

#[tokio::test]
async fn events_are_dispatched_in_staging_order() {
    let (_, uow, recorder) = harness();
    let ct = CancellationToken::new();

    let owner = user("jane@example.com");
    let owner_id = owner.id();
    uow.users().add(owner, &ct).unwrap();
    uow.products()
        .add(product("Widget", "WID-1", 5, owner_id), &ct)
        .unwrap();
    uow.save_changes(&ct).await.unwrap();

    assert_eq!(recorder.kinds(), vec!["user.created", "product.created"]);
}

#[tokio::test]
async fn rejected_commit_applies_and_dispatches_nothing() {
    let (store, uow, recorder) = harness();
    let ct = CancellationToken::new();

    uow.users().add(user("jane@example.com"), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();
    assert_eq!(recorder.kinds().len(), 1);

    // Same email again, plus an innocent bystander in the same batch.
    uow.users().add(user("jane@example.com"), &ct).unwrap();
    uow.users().add(user("john@example.com"), &ct).unwrap();
    let err = uow.save_changes(&ct).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    // Nothing from the failed batch landed or dispatched; the journal is
    // still intact for a corrected retry.
    let rows: Vec<User> = store.load(&ct).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(recorder.kinds().len(), 1);
    assert_eq!(uow.pending_mutations().unwrap(), 2);
}

#[tokio::test]
async fn soft_delete_hides_rows_and_attributes_the_actor() {
    let (store, uow, recorder) = harness();
    let ct = CancellationToken::new();

    uow.users().add(user("jane@example.com"), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    let email = Email::new("jane@example.com").unwrap();
    let saved = uow.users().get_by_email(&email, &ct).await.unwrap().unwrap();
    uow.users().delete(saved, Some("admin"), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    // Gone from every repository read.
    assert!(uow.users().get_all(&ct).await.unwrap().is_empty());
    assert!(!uow.users().exists_by_email(&email, &ct).await.unwrap());

    // But the row survives with the marker and attribution set.
    let rows: Vec<User> = store.load(&ct).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].audit().is_deleted());
    assert_eq!(rows[0].audit().deleted_by.as_deref(), Some("admin"));
    assert_eq!(recorder.kinds(), vec!["user.created"]);
}

#[tokio::test]
async fn freed_unique_key_is_reusable_after_soft_delete() {
    let (_, uow, _) = harness();
    let ct = CancellationToken::new();

    uow.users().add(user("jane@example.com"), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    let email = Email::new("jane@example.com").unwrap();
    let saved = uow.users().get_by_email(&email, &ct).await.unwrap().unwrap();
    uow.users().delete(saved, None, &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    uow.users().add(user("jane@example.com"), &ct).unwrap();
    uow.save_changes(&ct)
        .await
        .expect("email of a soft-deleted row is free again");
}

#[tokio::test]
async fn cancelled_token_blocks_staging_and_commit() {
    let (store, uow, recorder) = harness();
    let ct = CancellationToken::new();

    uow.users().add(user("jane@example.com"), &ct).unwrap();

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = uow.save_changes(&cancelled).await.unwrap_err();
    assert_eq!(err, DomainError::Store(StoreError::Cancelled));

    let err = uow.users().add(user("x@example.com"), &cancelled).unwrap_err();
    assert_eq!(err, DomainError::Store(StoreError::Cancelled));

    let rows: Vec<User> = store.load(&ct).await.unwrap();
    assert!(rows.is_empty());
    assert!(recorder.kinds().is_empty());
}

#[tokio::test]
async fn transaction_commit_defers_dispatch_until_durable() {
    let (_, uow, recorder) = harness();
    let ct = CancellationToken::new();

    uow.begin_transaction(&ct).await.unwrap();
    uow.users().add(user("jane@example.com"), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    // Applied but not yet announced.
    assert_eq!(uow.users().get_all(&ct).await.unwrap().len(), 1);
    assert!(recorder.kinds().is_empty());

    uow.commit_transaction(&ct).await.unwrap();
    assert_eq!(recorder.kinds(), vec!["user.created"]);
}

#[tokio::test]
async fn transaction_rollback_discards_state_and_events() {
    let (_, uow, recorder) = harness();
    let ct = CancellationToken::new();

    uow.users().add(user("kept@example.com"), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    uow.begin_transaction(&ct).await.unwrap();
    uow.users().add(user("doomed@example.com"), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();
    uow.rollback_transaction().await.unwrap();

    let all = uow.users().get_all(&ct).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].email().as_str(), "kept@example.com");
    // Only the pre-transaction commit ever dispatched.
    assert_eq!(recorder.kinds(), vec!["user.created"]);
}

#[tokio::test]
async fn update_cycle_re_stamps_and_dispatches_new_events() {
    let (_, uow, recorder) = harness();
    let ct = CancellationToken::new();

    uow.users().add(user("jane@example.com"), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    let email = Email::new("jane@example.com").unwrap();
    let mut saved = uow.users().get_by_email(&email, &ct).await.unwrap().unwrap();
    saved.confirm_email().unwrap();
    saved.deactivate();
    uow.users().update(saved, &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    let reloaded = uow.users().get_by_email(&email, &ct).await.unwrap().unwrap();
    assert!(reloaded.is_email_confirmed());
    assert!(!reloaded.is_active());
    assert!(reloaded.audit().updated_at >= reloaded.audit().created_at);
    assert_eq!(
        recorder.kinds(),
        vec!["user.created", "user.email_confirmed", "user.deactivated"]
    );
}

#[tokio::test]
async fn specifications_drive_repository_reads() {
    let (_, uow, _) = harness();
    let ct = CancellationToken::new();
    let owner = UserId::new();

    let mut dormant = product("Delta", "SKU-D", 40, owner);
    dormant.deactivate();
    uow.products()
        .add_range(
            vec![
                product("Charlie", "SKU-C", 3, owner),
                product("Alpha", "SKU-A", 0, owner),
                product("Bravo", "SKU-B", 40, UserId::new()),
                dormant,
            ],
            &ct,
        )
        .unwrap();
    uow.save_changes(&ct).await.unwrap();

    // Active spec orders by name and excludes the deactivated row.
    let active = uow.products().get_active(&ct).await.unwrap();
    let names: Vec<&str> = active.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["Alpha", "Bravo", "Charlie"]);

    // Low stock keeps the emptiest first.
    let low = uow.products().get_low_stock(None, &ct).await.unwrap();
    let skus: Vec<&str> = low.iter().map(|p| p.sku()).collect();
    assert_eq!(skus, vec!["SKU-A", "SKU-C"]);

    // Ownership via the foreign key (active or not).
    let owned = uow.products().get_by_owner(owner, &ct).await.unwrap();
    assert_eq!(owned.len(), 3);

    // Counting and existence reuse the same plans.
    let in_stock = shopkeep_products::specs::in_stock();
    assert_eq!(uow.products().count(&in_stock, &ct).await.unwrap(), 3);
    assert!(uow.products().exists(&in_stock, &ct).await.unwrap());

    // Paged search.
    let paged = shopkeep_products::specs::active().paged(1, 1);
    let page = uow.products().get_list(&paged, &ct).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name(), "Bravo");
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let (_, uow, _) = harness();
    let ct = CancellationToken::new();
    let owner = UserId::new();

    uow.products().add(product("One", "SKU-1", 1, owner), &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    // SKU comparison is against the normalized form.
    uow.products().add(product("Two", " sku-1 ", 1, owner), &ct).unwrap();
    let err = uow.save_changes(&ct).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
    assert!(uow.products().exists_by_sku("SKU-1", &ct).await.unwrap());
    assert_eq!(uow.products().get_all(&ct).await.unwrap().len(), 1);
}

#[tokio::test]
async fn get_by_id_round_trips() {
    let (_, uow, _) = harness();
    let ct = CancellationToken::new();

    let u = user("jane@example.com");
    let id = u.id();
    uow.users().add(u, &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    let found = uow.users().get_by_id(id, &ct).await.unwrap();
    assert!(found.is_some());
    let missing = uow.users().get_by_id(UserId::new(), &ct).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn stock_reduction_events_flow_through_commit() {
    let (_, uow, recorder) = harness();
    let ct = CancellationToken::new();

    let p = product("Widget", "WID-1", 10, UserId::new());
    let id = p.id();
    uow.products().add(p, &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    let mut saved = uow.products().get_by_id(id, &ct).await.unwrap().unwrap();
    saved.reduce_stock(4).unwrap();
    uow.products().update(saved, &ct).unwrap();
    uow.save_changes(&ct).await.unwrap();

    let reloaded = uow.products().get_by_id(id, &ct).await.unwrap().unwrap();
    assert_eq!(reloaded.stock_quantity(), 6);
    assert_eq!(
        recorder.kinds(),
        vec!["product.created", "product.stock_reduced"]
    );
}
