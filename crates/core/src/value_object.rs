//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value** — identity does
/// not matter, only the values do. `DiscountAmount { amount: 1000 }` is a
/// value object; a coupon with an id is an entity.
///
/// "Modifying" a value object means constructing a new, fully-validated one
/// and handing it to the owning aggregate. A partially-validated value must
/// never exist.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
