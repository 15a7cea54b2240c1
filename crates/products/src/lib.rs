//! Catalog snapshots and bundle records.
//!
//! Deterministic domain logic only (no IO, no HTTP, no storage): the product
//! and variant shapes read from the platform, the component-reference
//! metafield convention, and the `Bundle` aggregate.

pub mod bundle;
pub mod component;
pub mod product;

pub use bundle::{
    Bundle, BundleCommand, BundleComponents, BundleCreated, BundleDeleted, BundleEvent,
    BundleSynced, BundleUpdated, CreateBundle, DeleteBundle, DeletionReason, RecordSync,
    UpdateBundle,
};
pub use component::{
    COMPONENT_KEY, COMPONENT_NAMESPACE, COMPONENT_TYPE, ComponentMapping, MIN_COMPONENTS,
    check_ownership, decode_component_reference,
};
pub use product::{
    DEFAULT_OPTION_NAME, DEFAULT_OPTION_VALUE, Product, ProductOption, ProductStatus,
    SelectedOption, Variant, handleize,
};
