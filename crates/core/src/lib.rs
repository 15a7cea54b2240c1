//! `duobundle-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no platform or storage
//! concerns): identifiers, the error model, aggregate/entity traits and the
//! text normalization shared by the mapper and the cart transform.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod normalize;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BundleId, GlobalId, ShopId};
pub use normalize::{normalize, normalize_joined};
pub use value_object::ValueObject;
