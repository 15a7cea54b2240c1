//! Bundle record storage.
//!
//! The application's only persistent state. Records are rebuilt from
//! commands; component mappings live on the platform, not here.

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use duobundle_core::{BundleId, ExpectedVersion, GlobalId, ShopId};
use duobundle_products::Bundle;

pub use in_memory::InMemoryBundleRepository;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("bundle {0} has no owning shop")]
    MissingShop(BundleId),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Shop-isolated bundle storage.
pub trait BundleRepository: Send + Sync {
    fn get(&self, shop: &ShopId, id: BundleId) -> Result<Option<Bundle>, RepositoryError>;

    fn list(&self, shop: &ShopId) -> Result<Vec<Bundle>, RepositoryError>;

    /// Bundles of `shop` whose parent product is `product_id`.
    fn find_by_parent(
        &self,
        shop: &ShopId,
        product_id: &GlobalId,
    ) -> Result<Vec<Bundle>, RepositoryError>;

    /// Insert or replace a bundle; the stored version must match `expected`
    /// (absent records count as version 0).
    fn save(&self, bundle: &Bundle, expected: ExpectedVersion) -> Result<(), RepositoryError>;

    /// Returns whether a record was removed.
    fn remove(&self, shop: &ShopId, id: BundleId) -> Result<bool, RepositoryError>;

    /// Remove every bundle of a shop; returns how many were removed.
    fn clear_shop(&self, shop: &ShopId) -> Result<usize, RepositoryError>;
}

impl<R> BundleRepository for Arc<R>
where
    R: BundleRepository + ?Sized,
{
    fn get(&self, shop: &ShopId, id: BundleId) -> Result<Option<Bundle>, RepositoryError> {
        (**self).get(shop, id)
    }

    fn list(&self, shop: &ShopId) -> Result<Vec<Bundle>, RepositoryError> {
        (**self).list(shop)
    }

    fn find_by_parent(
        &self,
        shop: &ShopId,
        product_id: &GlobalId,
    ) -> Result<Vec<Bundle>, RepositoryError> {
        (**self).find_by_parent(shop, product_id)
    }

    fn save(&self, bundle: &Bundle, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        (**self).save(bundle, expected)
    }

    fn remove(&self, shop: &ShopId, id: BundleId) -> Result<bool, RepositoryError> {
        (**self).remove(shop, id)
    }

    fn clear_shop(&self, shop: &ShopId) -> Result<usize, RepositoryError> {
        (**self).clear_shop(shop)
    }
}
