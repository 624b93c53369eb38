//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Products, orders and cart lines implement this: they keep their identity
/// while their attributes (stock, status, quantity) change over time.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
