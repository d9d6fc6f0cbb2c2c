//! `shopkeep-users` — the user aggregate.

pub mod specs;
pub mod user;

pub use user::{User, UserEvent};
