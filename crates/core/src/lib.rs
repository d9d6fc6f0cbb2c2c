//! `shopkeep-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the error taxonomy, typed identifiers, the aggregate/audit base, the
//! self-validating value objects and the declarative specification model.

pub mod aggregate;
pub mod email;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod specification;
pub mod value_object;

pub use aggregate::AggregateRoot;
pub use email::Email;
pub use entity::AuditInfo;
pub use error::{DomainError, DomainResult, StoreError};
pub use id::{ProductId, UserId};
pub use money::Money;
pub use specification::{
    GroupKey, GroupValue, Include, Predicate, SortKey, SortValue, Specification,
};
pub use value_object::ValueObject;
