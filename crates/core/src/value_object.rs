//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attributes. A selected
/// option (`Color = Black`) or a component mapping (`[variant A, variant B]`)
/// is a value object; a variant is not, because it has an id.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
