//! `shopkeep-store` — query planning and persistence coordination.
//!
//! Turns declarative specifications into executable plans, stages aggregate
//! mutations behind repositories, and commits them through a unit of work
//! that dispatches domain events strictly after the durable write.

pub mod evaluator;
pub mod memory;
pub mod repository;
pub mod store;
pub mod unit_of_work;

#[cfg(test)]
mod integration_tests;

pub use evaluator::{QueryPlan, SpecificationEvaluator};
pub use memory::MemoryStore;
pub use repository::{Repository, StoreAggregate};
pub use store::{EntityRecord, EntityStore, Mutation, MutationKind, TransactionalStore};
pub use unit_of_work::UnitOfWork;
