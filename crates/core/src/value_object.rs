//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

/// Marker trait for value objects.
///
/// Value objects are domain objects that are **immutable** and **compared by value**.
/// They represent concepts where identity doesn't matter - only the values matter.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// Example:
/// - `Money { minor: 1000, currency: "USD" }` is a value object
/// - `User { id: UserId(...), name: "..." }` is an entity
///
/// ## Immutability
///
/// Value objects should be **immutable** - once created, they don't change. To "modify"
/// a value object, create a new one with the new values. This ensures:
/// - **Thread safety**: Immutable objects are safe to share across threads
/// - **Predictability**: Value objects can't be unexpectedly modified
/// - **Value semantics**: Values behave like primitives (can be copied, compared)
///
/// ## Design Constraints
///
/// The trait requires:
/// - **Clone**: Value objects should be cheap to copy (they're values, not references)
/// - **PartialEq**: Value objects are compared by their attribute values
/// - **Debug**: Value objects should be debuggable (helpful for logging, testing)
///
/// Constructors are the validation gate: a value object that exists is valid,
/// so arithmetic and comparisons never re-check their operands' shape (only
/// cross-operand rules such as matching currencies).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
