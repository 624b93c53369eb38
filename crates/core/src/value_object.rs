//! Value object trait: equality by value, not identity.

/// Marker for immutable domain values compared by their attributes.
///
/// [`crate::money::Money`] is one: two amounts of 100 cents are the same
/// amount. A `Product` is not: two products with the same name and price are
/// still different products, so it implements [`crate::entity::Entity`]
/// instead.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
