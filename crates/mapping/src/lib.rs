//! Variant mapping: matching bundle variants to component variants.
//!
//! - [`mapper`] is the pure matching algorithm.
//! - [`client`] is the seam to the platform (reads products, writes metafields).
//! - [`service`] runs a sync: concurrent reads, mapping, one batched write.

pub mod client;
pub mod error;
pub mod mapper;
pub mod service;

pub use client::{ClientError, MetafieldIdentifier, MetafieldWrite, PlatformClient, UserError};
pub use error::MappingError;
pub use mapper::{MatchStrategy, ProductRole, VariantMapper};
pub use service::{MappingHealth, MappingService, SyncReport, assess_health};
