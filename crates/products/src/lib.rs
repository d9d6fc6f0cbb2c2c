//! `shopkeep-products` — the product aggregate.

pub mod product;
pub mod specs;

pub use product::{Product, ProductEvent};
