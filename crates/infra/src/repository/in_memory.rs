use std::collections::HashMap;
use std::sync::RwLock;

use duobundle_core::{AggregateRoot, BundleId, ExpectedVersion, GlobalId, ShopId};
use duobundle_products::Bundle;

use super::{BundleRepository, RepositoryError};

type Key = (ShopId, BundleId);

/// In-memory shop-isolated bundle store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBundleRepository {
    inner: RwLock<HashMap<Key, Bundle>>,
}

impl InMemoryBundleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> RepositoryError {
        RepositoryError::Unavailable("lock poisoned".to_string())
    }

    fn filtered<F>(&self, shop: &ShopId, pred: F) -> Result<Vec<Bundle>, RepositoryError>
    where
        F: Fn(&Bundle) -> bool,
    {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        let mut bundles: Vec<Bundle> = map
            .iter()
            .filter_map(|((s, _), b)| (s == shop && pred(b)).then(|| b.clone()))
            .collect();
        // BundleId is UUIDv7, so this is creation order.
        bundles.sort_by_key(|b| *b.id_typed().as_uuid());
        Ok(bundles)
    }
}

impl BundleRepository for InMemoryBundleRepository {
    fn get(&self, shop: &ShopId, id: BundleId) -> Result<Option<Bundle>, RepositoryError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(&(shop.clone(), id)).cloned())
    }

    fn list(&self, shop: &ShopId) -> Result<Vec<Bundle>, RepositoryError> {
        self.filtered(shop, |_| true)
    }

    fn find_by_parent(
        &self,
        shop: &ShopId,
        product_id: &GlobalId,
    ) -> Result<Vec<Bundle>, RepositoryError> {
        self.filtered(shop, |b| b.parent_product() == Some(product_id))
    }

    fn save(&self, bundle: &Bundle, expected: ExpectedVersion) -> Result<(), RepositoryError> {
        let shop = bundle
            .shop()
            .cloned()
            .ok_or(RepositoryError::MissingShop(bundle.id_typed()))?;
        let key = (shop, bundle.id_typed());

        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let current = map.get(&key).map(|b| b.version()).unwrap_or(0);
        if !expected.matches(current) {
            return Err(RepositoryError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        map.insert(key, bundle.clone());
        Ok(())
    }

    fn remove(&self, shop: &ShopId, id: BundleId) -> Result<bool, RepositoryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        Ok(map.remove(&(shop.clone(), id)).is_some())
    }

    fn clear_shop(&self, shop: &ShopId) -> Result<usize, RepositoryError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        let before = map.len();
        map.retain(|(s, _), _| s != shop);
        Ok(before - map.len())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use duobundle_events::execute;
    use duobundle_products::{BundleCommand, BundleComponents, CreateBundle};

    fn shop(name: &str) -> ShopId {
        ShopId::parse(&format!("{name}.myshopify.com")).unwrap()
    }

    fn bundle(shop: &ShopId, parent: u64) -> Bundle {
        let id = BundleId::new();
        let mut bundle = Bundle::empty(id);
        execute(
            &mut bundle,
            &BundleCommand::CreateBundle(CreateBundle {
                shop: shop.clone(),
                bundle_id: id,
                title: "Duo".to_string(),
                parent_product: GlobalId::product(parent).unwrap(),
                components: BundleComponents::new(
                    GlobalId::product(1).unwrap(),
                    GlobalId::product(2).unwrap(),
                )
                .unwrap(),
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        bundle
    }

    #[test]
    fn save_and_get_are_shop_isolated() {
        let repo = InMemoryBundleRepository::new();
        let acme = shop("acme");
        let b = bundle(&acme, 100);
        repo.save(&b, ExpectedVersion::Exact(0)).unwrap();

        assert_eq!(repo.get(&acme, b.id_typed()).unwrap(), Some(b.clone()));
        assert_eq!(repo.get(&shop("other"), b.id_typed()).unwrap(), None);
        assert!(repo.list(&shop("other")).unwrap().is_empty());
    }

    #[test]
    fn stale_save_is_rejected() {
        let repo = InMemoryBundleRepository::new();
        let b = bundle(&shop("acme"), 100);
        repo.save(&b, ExpectedVersion::Exact(0)).unwrap();

        let err = repo.save(&b, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, RepositoryError::Concurrency(_)));
        assert!(repo.save(&b, ExpectedVersion::Exact(1)).is_ok());
        assert!(repo.save(&b, ExpectedVersion::Any).is_ok());
    }

    #[test]
    fn find_by_parent_and_clear_shop() {
        let repo = InMemoryBundleRepository::new();
        let acme = shop("acme");
        let other = shop("other");
        for b in [bundle(&acme, 100), bundle(&acme, 101), bundle(&other, 100)] {
            repo.save(&b, ExpectedVersion::Any).unwrap();
        }

        let parent = GlobalId::product(100).unwrap();
        assert_eq!(repo.find_by_parent(&acme, &parent).unwrap().len(), 1);

        assert_eq!(repo.clear_shop(&acme).unwrap(), 2);
        assert!(repo.list(&acme).unwrap().is_empty());
        assert_eq!(repo.list(&other).unwrap().len(), 1);
    }

    #[test]
    fn remove_reports_whether_a_record_existed() {
        let repo = InMemoryBundleRepository::new();
        let acme = shop("acme");
        let b = bundle(&acme, 100);
        repo.save(&b, ExpectedVersion::Any).unwrap();

        assert!(repo.remove(&acme, b.id_typed()).unwrap());
        assert!(!repo.remove(&acme, b.id_typed()).unwrap());
    }
}
