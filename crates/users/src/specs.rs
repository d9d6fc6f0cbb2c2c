//! Named query specifications over users.
//!
//! Each function captures one query intent; repositories evaluate them
//! through the store-side planner.

use chrono::{Duration, Utc};

use shopkeep_core::specification::{Predicate, SortKey, SortValue, Specification};
use shopkeep_core::{AggregateRoot, Email};

use crate::user::User;

/// Lookup by normalized email (unique business key).
pub fn by_email(email: &Email) -> Specification<User> {
    let needle = email.as_str().to_string();
    Specification::matching(Predicate::new(move |u: &User| u.email().as_str() == needle))
}

/// Only active accounts, alphabetical by last name.
pub fn active() -> Specification<User> {
    Specification::matching(Predicate::new(|u: &User| u.is_active()))
        .ordered_by(SortKey::new(|u: &User| {
            SortValue::Text(u.last_name().to_string())
        }))
}

pub fn by_role(role: &str) -> Specification<User> {
    let role = role.to_string();
    Specification::matching(Predicate::new(move |u: &User| u.has_role(&role)))
}

pub fn with_confirmed_email() -> Specification<User> {
    Specification::matching(Predicate::new(|u: &User| u.is_email_confirmed()))
}

/// Case-insensitive match against first, last or full name.
pub fn by_name(term: &str) -> Specification<User> {
    let needle = term.trim().to_lowercase();
    Specification::matching(Predicate::new(move |u: &User| {
        !needle.is_empty() && u.full_name().to_lowercase().contains(&needle)
    }))
}

/// All users, with their owned products loaded alongside.
pub fn with_products() -> Specification<User> {
    Specification::all().including("products").as_split_query()
}

/// Accounts created in the last `days` days, newest first.
pub fn created_within_days(days: i64) -> Specification<User> {
    let cutoff = Utc::now() - Duration::days(days);
    Specification::matching(Predicate::new(move |u: &User| {
        u.audit().created_at.is_some_and(|at| at >= cutoff)
    }))
    .ordered_by_desc(SortKey::new(|u: &User| {
        SortValue::Timestamp(u.audit().created_at.unwrap_or(chrono::DateTime::UNIX_EPOCH))
    }))
}
