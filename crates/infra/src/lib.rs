//! Infrastructure layer: configuration, platform adapters, bundle storage and
//! the bundle lifecycle service.

pub mod config;
pub mod lifecycle;
pub mod platform;
pub mod repository;


pub use config::{AppConfig, ConfigError};
pub use lifecycle::{
    BundleChange, BundleLifecycle, BundleUpdate, LifecycleError, NewBundle, SyncOutcome,
};
pub use platform::{InMemoryPlatform, NewProduct, ProductAdmin, bundle_options};
pub use repository::{BundleRepository, InMemoryBundleRepository, RepositoryError};
