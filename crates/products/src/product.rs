//! Product aggregate: catalog entry with price, stock and ownership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopkeep_core::{
    AggregateRoot, AuditInfo, DomainError, DomainResult, Money, ProductId, UserId,
};
use shopkeep_events::DomainEvent;

/// Stock level at or below which a product counts as running low.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

/// Events raised by product state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProductEvent {
    Created(ProductCreated),
    DetailsUpdated(ProductDetailsUpdated),
    PriceChanged(ProductPriceChanged),
    StockUpdated(ProductStockUpdated),
    StockReduced(ProductStockReduced),
    StockAdded(ProductStockAdded),
    Activated(ProductActivated),
    Deactivated(ProductDeactivated),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub owner_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetailsUpdated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPriceChanged {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub product_id: ProductId,
    pub old_price: Money,
    pub new_price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStockUpdated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub product_id: ProductId,
    pub old_quantity: u32,
    pub new_quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStockReduced {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub product_id: ProductId,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub reduced_by: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductStockAdded {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub product_id: ProductId,
    pub old_quantity: u32,
    pub new_quantity: u32,
    pub added: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductActivated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub product_id: ProductId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDeactivated {
    pub event_id: Uuid,
    pub occurred_on: DateTime<Utc>,
    pub product_id: ProductId,
}

impl DomainEvent for ProductEvent {
    fn kind(&self) -> &'static str {
        match self {
            ProductEvent::Created(_) => "product.created",
            ProductEvent::DetailsUpdated(_) => "product.details_updated",
            ProductEvent::PriceChanged(_) => "product.price_changed",
            ProductEvent::StockUpdated(_) => "product.stock_updated",
            ProductEvent::StockReduced(_) => "product.stock_reduced",
            ProductEvent::StockAdded(_) => "product.stock_added",
            ProductEvent::Activated(_) => "product.activated",
            ProductEvent::Deactivated(_) => "product.deactivated",
        }
    }

    fn event_id(&self) -> Uuid {
        match self {
            ProductEvent::Created(e) => e.event_id,
            ProductEvent::DetailsUpdated(e) => e.event_id,
            ProductEvent::PriceChanged(e) => e.event_id,
            ProductEvent::StockUpdated(e) => e.event_id,
            ProductEvent::StockReduced(e) => e.event_id,
            ProductEvent::StockAdded(e) => e.event_id,
            ProductEvent::Activated(e) => e.event_id,
            ProductEvent::Deactivated(e) => e.event_id,
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::Created(e) => e.occurred_on,
            ProductEvent::DetailsUpdated(e) => e.occurred_on,
            ProductEvent::PriceChanged(e) => e.occurred_on,
            ProductEvent::StockUpdated(e) => e.occurred_on,
            ProductEvent::StockReduced(e) => e.occurred_on,
            ProductEvent::StockAdded(e) => e.occurred_on,
            ProductEvent::Activated(e) => e.occurred_on,
            ProductEvent::Deactivated(e) => e.occurred_on,
        }
    }

    fn subject_id(&self) -> Uuid {
        let id = match self {
            ProductEvent::Created(e) => e.product_id,
            ProductEvent::DetailsUpdated(e) => e.product_id,
            ProductEvent::PriceChanged(e) => e.product_id,
            ProductEvent::StockUpdated(e) => e.product_id,
            ProductEvent::StockReduced(e) => e.product_id,
            ProductEvent::StockAdded(e) => e.product_id,
            ProductEvent::Activated(e) => e.product_id,
            ProductEvent::Deactivated(e) => e.product_id,
        };
        *id.as_uuid()
    }
}

/// A catalog entry owned by a user.
///
/// Ownership is a plain foreign key (`owner_id`); the user side carries no
/// back-pointer, the reverse direction goes through `specs::by_owner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    price: Money,
    sku: String,
    stock_quantity: u32,
    is_active: bool,
    category: String,
    tags: Vec<String>,
    owner_id: UserId,
    audit: AuditInfo,

    /// Transient; never persisted, drained on commit.
    #[serde(skip, default)]
    pending_events: Vec<ProductEvent>,
}

impl Product {
    pub fn new(
        name: &str,
        description: &str,
        price: Money,
        sku: &str,
        stock_quantity: u32,
        category: &str,
        owner_id: UserId,
    ) -> DomainResult<Self> {
        let name = required_trimmed(name, "name")?;
        let sku = normalize_sku(sku)?;
        let category = required_trimmed(category, "category")?;

        let id = ProductId::new();
        let mut product = Self {
            id,
            name: name.clone(),
            description: description.trim().to_string(),
            price,
            sku: sku.clone(),
            stock_quantity,
            is_active: true,
            category,
            tags: Vec::new(),
            owner_id,
            audit: AuditInfo::unsaved(),
            pending_events: Vec::new(),
        };
        product.record(ProductEvent::Created(ProductCreated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            product_id: id,
            name,
            sku,
            owner_id,
        }));
        Ok(product)
    }

    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> &Money {
        &self.price
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn is_in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    pub fn is_low_stock(&self, threshold: u32) -> bool {
        self.stock_quantity <= threshold
    }

    pub fn update_details(
        &mut self,
        name: &str,
        description: &str,
        category: &str,
    ) -> DomainResult<()> {
        let name = required_trimmed(name, "name")?;
        let category = required_trimmed(category, "category")?;
        let description = description.trim().to_string();
        self.name = name.clone();
        self.description = description.clone();
        self.category = category;
        self.record(ProductEvent::DetailsUpdated(ProductDetailsUpdated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            product_id: self.id,
            name,
            description,
        }));
        Ok(())
    }

    /// Change the price. The event carries both old and new price.
    pub fn update_price(&mut self, new_price: Money) -> DomainResult<()> {
        if new_price.currency() != self.price.currency() {
            return Err(DomainError::invalid_operation(format!(
                "price currency cannot change from {} to {}",
                self.price.currency(),
                new_price.currency()
            )));
        }
        let old_price = self.price.clone();
        self.price = new_price.clone();
        self.record(ProductEvent::PriceChanged(ProductPriceChanged {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            product_id: self.id,
            old_price,
            new_price,
        }));
        Ok(())
    }

    /// Set the absolute stock level.
    pub fn update_stock(&mut self, quantity: u32) -> DomainResult<()> {
        let old_quantity = self.stock_quantity;
        self.stock_quantity = quantity;
        self.record(ProductEvent::StockUpdated(ProductStockUpdated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            product_id: self.id,
            old_quantity,
            new_quantity: quantity,
        }));
        Ok(())
    }

    /// Consume stock. Fails when the reduction would underflow.
    pub fn reduce_stock(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::invalid_argument(
                "reduction quantity must be positive",
            ));
        }
        if quantity > self.stock_quantity {
            return Err(DomainError::insufficient(format!(
                "cannot reduce stock by {quantity}, only {} available",
                self.stock_quantity
            )));
        }
        let old_quantity = self.stock_quantity;
        self.stock_quantity -= quantity;
        self.record(ProductEvent::StockReduced(ProductStockReduced {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            product_id: self.id,
            old_quantity,
            new_quantity: self.stock_quantity,
            reduced_by: quantity,
        }));
        Ok(())
    }

    /// Replenish stock.
    pub fn add_stock(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::invalid_argument(
                "added quantity must be positive",
            ));
        }
        let old_quantity = self.stock_quantity;
        self.stock_quantity += quantity;
        self.record(ProductEvent::StockAdded(ProductStockAdded {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            product_id: self.id,
            old_quantity,
            new_quantity: self.stock_quantity,
            added: quantity,
        }));
        Ok(())
    }

    /// Emits even when already active.
    pub fn activate(&mut self) {
        self.is_active = true;
        self.record(ProductEvent::Activated(ProductActivated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            product_id: self.id,
        }));
    }

    /// Emits even when already inactive.
    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.record(ProductEvent::Deactivated(ProductDeactivated {
            event_id: Uuid::now_v7(),
            occurred_on: Utc::now(),
            product_id: self.id,
        }));
    }

    /// Attach a tag. Idempotent (case-insensitive); timestamp bump on
    /// change, no event.
    pub fn add_tag(&mut self, tag: &str) -> DomainResult<()> {
        let tag = required_trimmed(tag, "tag")?;
        if !self.has_tag(&tag) {
            self.tags.push(tag);
            self.touch();
        }
        Ok(())
    }

    /// Detach a tag if present. Timestamp bump on change, no event.
    pub fn remove_tag(&mut self, tag: &str) {
        let before = self.tags.len();
        self.tags.retain(|t| !t.eq_ignore_ascii_case(tag));
        if self.tags.len() != before {
            self.touch();
        }
    }

    fn record(&mut self, event: ProductEvent) {
        self.pending_events.push(event);
        self.touch();
    }

    /// Mark the aggregate as modified. The commit-time stamp written by the
    /// unit of work remains the authoritative persisted value.
    fn touch(&mut self) {
        self.audit.stamp_updated(Utc::now());
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;
    type Event = ProductEvent;

    fn id(&self) -> ProductId {
        self.id
    }

    fn audit(&self) -> &AuditInfo {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit
    }

    fn pending_events(&self) -> &[ProductEvent] {
        &self.pending_events
    }

    fn take_events(&mut self) -> Vec<ProductEvent> {
        std::mem::take(&mut self.pending_events)
    }
}

fn required_trimmed(value: &str, field: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_argument(format!(
            "{field} cannot be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// SKUs are the unique business key; stored trimmed and upper-cased.
fn normalize_sku(sku: &str) -> DomainResult<String> {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_argument("sku cannot be empty"));
    }
    Ok(trimmed.to_ascii_uppercase())
}
