//! Named query specifications over products.

use chrono::{Duration, Utc};

use shopkeep_core::specification::{Predicate, SortKey, SortValue, Specification};
use shopkeep_core::{AggregateRoot, DomainError, DomainResult, Money, UserId};

use crate::product::{DEFAULT_LOW_STOCK_THRESHOLD, Product};

/// Lookup by normalized SKU (unique business key).
pub fn by_sku(sku: &str) -> Specification<Product> {
    let needle = sku.trim().to_ascii_uppercase();
    Specification::matching(Predicate::new(move |p: &Product| p.sku() == needle))
}

/// Only active products, alphabetical by name.
pub fn active() -> Specification<Product> {
    Specification::matching(Predicate::new(|p: &Product| p.is_active()))
        .ordered_by(SortKey::new(|p: &Product| {
            SortValue::Text(p.name().to_string())
        }))
}

pub fn by_category(category: &str) -> Specification<Product> {
    let needle = category.trim().to_lowercase();
    Specification::matching(Predicate::new(move |p: &Product| {
        p.category().to_lowercase() == needle
    }))
}

pub fn in_stock() -> Specification<Product> {
    Specification::matching(Predicate::new(|p: &Product| p.is_in_stock()))
}

/// Products running low, emptiest first. `None` uses the default threshold.
pub fn low_stock(threshold: Option<u32>) -> Specification<Product> {
    let threshold = threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    Specification::matching(Predicate::new(move |p: &Product| {
        p.is_low_stock(threshold)
    }))
    .ordered_by(SortKey::new(|p: &Product| {
        SortValue::Int(i64::from(p.stock_quantity()))
    }))
}

/// Products owned by a user, with the owning user loaded alongside.
pub fn by_owner(owner_id: UserId) -> Specification<Product> {
    Specification::matching(Predicate::new(move |p: &Product| p.owner_id() == owner_id))
        .including("user")
}

/// Price between `min` and `max` inclusive, cheapest first.
///
/// Both bounds must share one currency; products priced in any other
/// currency never match.
pub fn by_price_range(min: Money, max: Money) -> DomainResult<Specification<Product>> {
    if min.try_cmp(&max)? == core::cmp::Ordering::Greater {
        return Err(DomainError::invalid_argument(
            "price range lower bound exceeds upper bound",
        ));
    }
    Ok(Specification::matching(Predicate::new(move |p: &Product| {
        p.price().currency() == min.currency()
            && p.price().minor_units() >= min.minor_units()
            && p.price().minor_units() <= max.minor_units()
    }))
    .ordered_by(SortKey::new(|p: &Product| {
        SortValue::Int(p.price().minor_units())
    })))
}

/// Case-insensitive match against name or description.
pub fn search(term: &str) -> Specification<Product> {
    let needle = term.trim().to_lowercase();
    Specification::matching(Predicate::new(move |p: &Product| {
        !needle.is_empty()
            && (p.name().to_lowercase().contains(&needle)
                || p.description().to_lowercase().contains(&needle))
    }))
}

pub fn by_tag(tag: &str) -> Specification<Product> {
    let needle = tag.trim().to_string();
    Specification::matching(Predicate::new(move |p: &Product| p.has_tag(&needle)))
}

/// Products created in the last `days` days, newest first.
pub fn created_within_days(days: i64) -> Specification<Product> {
    let cutoff = Utc::now() - Duration::days(days);
    Specification::matching(Predicate::new(move |p: &Product| {
        p.audit().created_at.is_some_and(|at| at >= cutoff)
    }))
    .ordered_by_desc(SortKey::new(|p: &Product| {
        SortValue::Timestamp(p.audit().created_at.unwrap_or(chrono::DateTime::UNIX_EPOCH))
    }))
}
