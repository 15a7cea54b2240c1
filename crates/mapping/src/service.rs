//! Sync orchestration: read the three products, map, write once.

use tracing::{debug, info, warn};

use duobundle_core::GlobalId;
use duobundle_products::{
    BundleComponents, ComponentMapping, Product, Variant, check_ownership,
    decode_component_reference,
};

use crate::client::{MetafieldIdentifier, MetafieldWrite, PlatformClient};
use crate::error::MappingError;
use crate::mapper::{MatchStrategy, ProductRole, VariantMapper};

/// Outcome of a successful sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub bundle_product: GlobalId,
    pub mappings: Vec<ComponentMapping>,
}

impl SyncReport {
    pub fn mapped_variants(&self) -> usize {
        self.mappings.len()
    }
}

/// Whether every bundle variant carries a usable component mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingHealth {
    Synced { variants: usize },
    /// Variants without a mapping to the current components. Checkout leaves
    /// undecodable ones unexpanded.
    NeedsSync { missing: Vec<GlobalId> },
}

impl MappingHealth {
    pub fn is_synced(&self) -> bool {
        matches!(self, MappingHealth::Synced { .. })
    }
}

/// Health of a bundle product from its variants' stored mappings. A mapping
/// only counts when it references variants of `components`, in order.
pub fn assess_health(variants: &[Variant], components: [&Product; 2]) -> MappingHealth {
    let missing: Vec<GlobalId> = variants
        .iter()
        .filter(|v| {
            v.component_reference
                .as_deref()
                .and_then(decode_component_reference)
                .is_none_or(|ids| check_ownership(&ids, components).is_err())
        })
        .map(|v| v.id.clone())
        .collect();

    if missing.is_empty() && !variants.is_empty() {
        MappingHealth::Synced {
            variants: variants.len(),
        }
    } else {
        MappingHealth::NeedsSync { missing }
    }
}

/// Computes and persists component mappings for bundle products.
#[derive(Debug, Clone)]
pub struct MappingService<C> {
    client: C,
    mapper: VariantMapper,
}

impl<C: PlatformClient> MappingService<C> {
    pub fn new(client: C, strategy: MatchStrategy) -> Self {
        Self {
            client,
            mapper: VariantMapper::new(strategy),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Recompute and write the mappings of every variant of `bundle_product`.
    ///
    /// The three products are read concurrently. Nothing is written unless
    /// every bundle variant maps; the writes then go out as one batch.
    pub async fn sync(
        &self,
        bundle_product: &GlobalId,
        components: &BundleComponents,
    ) -> Result<SyncReport, MappingError> {
        let (bundle, first, second) = tokio::try_join!(
            self.load(ProductRole::Bundle, bundle_product),
            self.load(ProductRole::FirstComponent, components.first()),
            self.load(ProductRole::SecondComponent, components.second()),
        )?;

        debug!(
            bundle_product = %bundle_product,
            bundle_variants = bundle.variants.len(),
            first_variants = first.variants.len(),
            second_variants = second.variants.len(),
            "loaded bundle products"
        );

        let mappings = match self
            .mapper
            .map(&bundle.variants, &first.variants, &second.variants)
        {
            Ok(m) => m,
            Err(e) => {
                warn!(bundle_product = %bundle_product, error = %e, "variant mapping failed");
                return Err(e);
            }
        };

        for mapping in &mappings {
            mapping.validate_against([&first, &second])?;
        }

        let writes: Vec<MetafieldWrite> = mappings
            .iter()
            .map(MetafieldWrite::component_reference)
            .collect();
        let user_errors = self.client.set_metafields(writes).await?;
        if !user_errors.is_empty() {
            warn!(
                bundle_product = %bundle_product,
                errors = user_errors.len(),
                "platform rejected component mappings"
            );
            return Err(MappingError::WriteRejected(user_errors));
        }

        info!(
            bundle_product = %bundle_product,
            mapped_variants = mappings.len(),
            "component mappings written"
        );

        Ok(SyncReport {
            bundle_product: bundle_product.clone(),
            mappings,
        })
    }

    /// Read back the bundle product and report which variants lack a mapping
    /// to the current components.
    pub async fn check_health(
        &self,
        bundle_product: &GlobalId,
        components: &BundleComponents,
    ) -> Result<MappingHealth, MappingError> {
        let (bundle, first, second) = tokio::try_join!(
            self.load(ProductRole::Bundle, bundle_product),
            self.load(ProductRole::FirstComponent, components.first()),
            self.load(ProductRole::SecondComponent, components.second()),
        )?;
        Ok(assess_health(&bundle.variants, [&first, &second]))
    }

    /// Delete every stored component reference of the bundle product's
    /// variants in one batch. Returns how many were removed.
    pub async fn clear(&self, bundle_product: &GlobalId) -> Result<usize, MappingError> {
        let bundle = self.load(ProductRole::Bundle, bundle_product).await?;
        let ids: Vec<MetafieldIdentifier> = bundle
            .variants
            .iter()
            .filter(|v| v.component_reference.is_some())
            .map(|v| MetafieldIdentifier::component_reference(&v.id))
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let cleared = ids.len();
        let user_errors = self.client.delete_metafields(ids).await?;
        if !user_errors.is_empty() {
            return Err(MappingError::WriteRejected(user_errors));
        }

        info!(bundle_product = %bundle_product, cleared, "component mappings cleared");
        Ok(cleared)
    }

    async fn load(&self, role: ProductRole, id: &GlobalId) -> Result<Product, MappingError> {
        self.client
            .fetch_product(id)
            .await?
            .ok_or_else(|| MappingError::ProductNotFound {
                role,
                id: id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::client::{ClientError, UserError};
    use duobundle_products::{ProductStatus, SelectedOption};

    #[derive(Default)]
    struct StubClient {
        products: HashMap<GlobalId, Product>,
        reject_with: Vec<UserError>,
        writes: Mutex<Vec<Vec<MetafieldWrite>>>,
        deletes: Mutex<Vec<Vec<MetafieldIdentifier>>>,
    }

    impl StubClient {
        fn with(mut self, product: Product) -> Self {
            self.products.insert(product.id.clone(), product);
            self
        }

        fn write_batches(&self) -> Vec<Vec<MetafieldWrite>> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlatformClient for StubClient {
        async fn fetch_product(&self, id: &GlobalId) -> Result<Option<Product>, ClientError> {
            Ok(self.products.get(id).cloned())
        }

        async fn set_metafields(
            &self,
            writes: Vec<MetafieldWrite>,
        ) -> Result<Vec<UserError>, ClientError> {
            self.writes.lock().unwrap().push(writes);
            Ok(self.reject_with.clone())
        }

        async fn delete_metafields(
            &self,
            ids: Vec<MetafieldIdentifier>,
        ) -> Result<Vec<UserError>, ClientError> {
            self.deletes.lock().unwrap().push(ids);
            Ok(self.reject_with.clone())
        }
    }

    fn pid(n: u64) -> GlobalId {
        GlobalId::product(n).unwrap()
    }

    fn vid(n: u64) -> GlobalId {
        GlobalId::variant(n).unwrap()
    }

    fn product(id: u64, variants: &[(u64, &str)]) -> Product {
        Product {
            id: pid(id),
            title: format!("Product {id}"),
            handle: format!("product-{id}"),
            status: ProductStatus::Active,
            options: vec![],
            variants: variants
                .iter()
                .map(|(v, color)| {
                    Variant::new(vid(*v), vec![SelectedOption::new("Color", *color)])
                })
                .collect(),
        }
    }

    fn components() -> BundleComponents {
        BundleComponents::new(pid(1), pid(2)).unwrap()
    }

    fn client() -> StubClient {
        StubClient::default()
            .with(product(100, &[(1001, "Obsidian Black"), (1002, "Arctic White")]))
            .with(product(1, &[(11, "Black"), (12, "White")]))
            .with(product(2, &[(21, "black"), (22, "white")]))
    }

    #[tokio::test]
    async fn sync_writes_one_batch_with_every_mapping() {
        let service = MappingService::new(client(), MatchStrategy::FirstMatch);
        let report = service.sync(&pid(100), &components()).await.unwrap();

        assert_eq!(report.mapped_variants(), 2);
        let batches = service.client().write_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0][0].owner_id, vid(1001));
        assert_eq!(
            batches[0][0].value,
            r#"["gid://shopify/ProductVariant/11","gid://shopify/ProductVariant/21"]"#
        );
        assert_eq!(batches[0][1].owner_id, vid(1002));
    }

    #[tokio::test]
    async fn unmapped_variant_prevents_any_write() {
        let stub = client().with(product(100, &[(1001, "Obsidian Black"), (1002, "Sand")]));
        let service = MappingService::new(stub, MatchStrategy::FirstMatch);

        let err = service.sync(&pid(100), &components()).await.unwrap_err();
        assert_eq!(
            err,
            MappingError::Unmapped {
                unmapped: vec!["sand".to_string()]
            }
        );
        assert!(service.client().write_batches().is_empty());
    }

    #[tokio::test]
    async fn missing_component_product_is_reported_by_role() {
        let mut stub = client();
        stub.products.remove(&pid(2));
        let service = MappingService::new(stub, MatchStrategy::FirstMatch);

        let err = service.sync(&pid(100), &components()).await.unwrap_err();
        assert_eq!(
            err,
            MappingError::ProductNotFound {
                role: ProductRole::SecondComponent,
                id: pid(2),
            }
        );
        assert!(service.client().write_batches().is_empty());
    }

    #[tokio::test]
    async fn user_errors_are_propagated_verbatim() {
        let rejection = UserError {
            field: vec!["metafields".into(), "1".into(), "ownerId".into()],
            message: "Owner does not exist".into(),
            code: Some("INVALID_VALUE".into()),
        };
        let mut stub = client();
        stub.reject_with = vec![rejection.clone()];
        let service = MappingService::new(stub, MatchStrategy::FirstMatch);

        let err = service.sync(&pid(100), &components()).await.unwrap_err();
        assert_eq!(err, MappingError::WriteRejected(vec![rejection]));
    }

    #[tokio::test]
    async fn check_health_reads_stored_mappings() {
        let mut bundle = product(100, &[(1001, "Black"), (1002, "White")]);
        bundle.variants[0].component_reference = Some(
            r#"["gid://shopify/ProductVariant/11","gid://shopify/ProductVariant/21"]"#.to_string(),
        );
        bundle.variants[1].component_reference = Some("not json".to_string());
        let service = MappingService::new(client().with(bundle), MatchStrategy::FirstMatch);

        let health = service.check_health(&pid(100), &components()).await.unwrap();
        assert_eq!(
            health,
            MappingHealth::NeedsSync {
                missing: vec![vid(1002)]
            }
        );
    }

    #[tokio::test]
    async fn well_formed_mappings_to_other_products_need_sync() {
        let mut bundle = product(100, &[(1001, "Black"), (1002, "White")]);
        bundle.variants[0].component_reference = Some(
            r#"["gid://shopify/ProductVariant/11","gid://shopify/ProductVariant/21"]"#.to_string(),
        );
        bundle.variants[1].component_reference = Some(
            r#"["gid://shopify/ProductVariant/12","gid://shopify/ProductVariant/22"]"#.to_string(),
        );
        let stub = client()
            .with(bundle)
            .with(product(3, &[(31, "black"), (32, "white")]));
        let service = MappingService::new(stub, MatchStrategy::FirstMatch);

        let current = service.check_health(&pid(100), &components()).await.unwrap();
        assert_eq!(current, MappingHealth::Synced { variants: 2 });

        let replaced = BundleComponents::new(pid(1), pid(3)).unwrap();
        let health = service.check_health(&pid(100), &replaced).await.unwrap();
        assert_eq!(
            health,
            MappingHealth::NeedsSync {
                missing: vec![vid(1001), vid(1002)]
            }
        );
    }

    #[tokio::test]
    async fn clear_deletes_only_stored_references_in_one_batch() {
        let mut bundle = product(100, &[(1001, "Black"), (1002, "White")]);
        bundle.variants[1].component_reference = Some("[]".to_string());
        let service = MappingService::new(client().with(bundle), MatchStrategy::FirstMatch);

        assert_eq!(service.clear(&pid(100)).await.unwrap(), 1);
        let deletes = service.client().deletes.lock().unwrap().clone();
        assert_eq!(deletes, vec![vec![MetafieldIdentifier::component_reference(&vid(1002))]]);

        let empty = MappingService::new(client(), MatchStrategy::FirstMatch);
        assert_eq!(empty.clear(&pid(100)).await.unwrap(), 0);
        assert!(empty.client().deletes.lock().unwrap().is_empty());
    }

    #[test]
    fn assess_health_requires_two_owned_components_per_variant() {
        let first = product(1, &[(11, "Black")]);
        let second = product(2, &[(21, "Black")]);
        let mut variants = product(100, &[(1001, "Black")]).variants;
        variants[0].component_reference = Some(r#"["gid://shopify/ProductVariant/11"]"#.into());
        assert!(!assess_health(&variants, [&first, &second]).is_synced());

        variants[0].component_reference = Some(
            r#"["gid://shopify/ProductVariant/11","gid://shopify/ProductVariant/21"]"#.into(),
        );
        assert_eq!(
            assess_health(&variants, [&first, &second]),
            MappingHealth::Synced { variants: 1 }
        );
        assert!(!assess_health(&variants, [&second, &first]).is_synced());
        assert!(!assess_health(&[], [&first, &second]).is_synced());
    }
}
