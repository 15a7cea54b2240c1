//! Bundle lifecycle: the operations a merchant (or a platform webhook)
//! triggers on a bundle, coordinating the platform, the mapping service and
//! the bundle store.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use duobundle_core::{AggregateRoot, BundleId, DomainError, ExpectedVersion, GlobalId, ShopId};
use duobundle_events::{Event, execute};
use duobundle_mapping::{
    ClientError, MappingError, MappingHealth, MappingService, MatchStrategy, ProductRole,
    SyncReport,
};
use duobundle_products::{
    Bundle, BundleCommand, BundleComponents, BundleEvent, CreateBundle, DeleteBundle,
    DeletionReason, Product, ProductStatus, RecordSync, UpdateBundle, handleize,
};

use crate::config::{AppConfig, ConfigError};
use crate::platform::{NewProduct, ProductAdmin, bundle_options};
use crate::repository::{BundleRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("platform request failed: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("bundle {0} was not found")]
    NotFound(BundleId),

    #[error("component product {0} was not found")]
    ComponentNotFound(GlobalId),

    /// The parent product disappeared; the bundle record has been removed.
    #[error("parent product of bundle {0} no longer exists")]
    ParentProductRemoved(BundleId),

    #[error("shop {0} is not served by this deployment")]
    ShopNotServed(ShopId),
}

/// Result of the mapping step of create/update.
///
/// A failed mapping does not undo the bundle change: the bundle stays in
/// `needs_sync` and the merchant can fix the variants and re-sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced(SyncReport),
    Failed(MappingError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced(_))
    }
}

/// A bundle together with the outcome of its latest mapping attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleChange {
    pub bundle: Bundle,
    pub sync: SyncOutcome,
}

/// Input for [`BundleLifecycle::create_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBundle {
    pub title: String,
    pub components: BundleComponents,
}

/// Input for [`BundleLifecycle::update_bundle`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleUpdate {
    pub title: Option<String>,
    pub components: Option<BundleComponents>,
}

pub struct BundleLifecycle<P, R> {
    mapping: MappingService<P>,
    repository: R,
    /// When set, requests for any other shop are refused.
    served_shop: Option<ShopId>,
}

impl<P, R> BundleLifecycle<P, R>
where
    P: ProductAdmin,
    R: BundleRepository,
{
    pub fn new(platform: P, repository: R, strategy: MatchStrategy) -> Self {
        Self {
            mapping: MappingService::new(platform, strategy),
            repository,
            served_shop: None,
        }
    }

    pub fn from_config(platform: P, repository: R, config: &AppConfig) -> Self {
        Self {
            served_shop: config.shop_domain.clone(),
            ..Self::new(platform, repository, config.match_strategy)
        }
    }

    /// Load `DUOBUNDLE_*` configuration, install logging in the configured
    /// format and build the service.
    pub fn from_env(platform: P, repository: R) -> Result<Self, ConfigError> {
        let config = AppConfig::from_env()?;
        config.init_observability();
        Ok(Self::from_config(platform, repository, &config))
    }

    pub fn platform(&self) -> &P {
        self.mapping.client()
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Create the parent product from the two components, record the bundle
    /// and map its variants.
    pub async fn create_bundle(
        &self,
        shop: &ShopId,
        input: NewBundle,
    ) -> Result<BundleChange, LifecycleError> {
        self.serve(shop)?;
        let (first, second) = tokio::try_join!(
            self.component(input.components.first()),
            self.component(input.components.second()),
        )?;

        let parent = self
            .platform()
            .create_product(NewProduct {
                handle: handleize(&input.title),
                title: input.title.clone(),
                status: ProductStatus::Draft,
                options: bundle_options(&first, &second),
            })
            .await?;

        let bundle_id = BundleId::new();
        let mut bundle = Bundle::empty(bundle_id);
        let created = execute(
            &mut bundle,
            &BundleCommand::CreateBundle(CreateBundle {
                shop: shop.clone(),
                bundle_id,
                title: input.title,
                parent_product: parent.id.clone(),
                components: input.components,
                occurred_at: Utc::now(),
            }),
        );
        let recorded = match created {
            Ok(_) => self
                .repository
                .save(&bundle, ExpectedVersion::Exact(0))
                .map_err(LifecycleError::from),
            Err(e) => Err(e.into()),
        };
        if let Err(e) = recorded {
            // Do not leave an orphan product behind.
            self.platform().delete_product(&parent.id).await?;
            return Err(e);
        }

        info!(
            shop = %shop,
            bundle_id = %bundle_id,
            product_id = %parent.id,
            variants = parent.variants.len(),
            "bundle created"
        );

        self.sync_and_record(shop, bundle).await
    }

    /// Change the title and/or components, then re-map every variant.
    pub async fn update_bundle(
        &self,
        shop: &ShopId,
        bundle_id: BundleId,
        update: BundleUpdate,
    ) -> Result<BundleChange, LifecycleError> {
        self.serve(shop)?;
        let mut bundle = self.load(shop, bundle_id)?;
        let parent = self.parent_of(&bundle)?;
        let expected = ExpectedVersion::Exact(bundle.version());

        let events = execute(
            &mut bundle,
            &BundleCommand::UpdateBundle(UpdateBundle {
                shop: shop.clone(),
                bundle_id,
                title: update.title.clone(),
                components: update.components.clone(),
                occurred_at: Utc::now(),
            }),
        )?;

        if update.title.is_some()
            && !self
                .platform()
                .update_product_title(&parent, bundle.title())
                .await?
        {
            return Err(self.parent_removed(shop, bundle_id)?);
        }

        let components_changed = events.iter().any(|event| {
            matches!(event, BundleEvent::BundleUpdated(e) if e.components_changed)
        });
        let new_components = update.components.as_ref().filter(|_| components_changed);
        if let Some(components) = new_components {
            let (first, second) = tokio::try_join!(
                self.component(components.first()),
                self.component(components.second()),
            )?;
            let options = bundle_options(&first, &second);
            if self
                .platform()
                .set_product_options(&parent, options)
                .await?
                .is_none()
            {
                return Err(self.parent_removed(shop, bundle_id)?);
            }
            // Surviving variants still reference the old components.
            if let Err(e) = self.mapping.clear(&parent).await {
                return Err(match e {
                    MappingError::ProductNotFound { .. } => self.parent_removed(shop, bundle_id)?,
                    e => e.into(),
                });
            }
        }

        for event in &events {
            debug!(bundle_id = %bundle_id, event = event.event_type(), "bundle event applied");
        }
        if !events.is_empty() {
            self.repository.save(&bundle, expected)?;
            info!(shop = %shop, bundle_id = %bundle_id, "bundle updated");
        }

        self.sync_and_record(shop, bundle).await
    }

    /// Re-map every variant of the bundle product.
    ///
    /// A bundle whose parent product is gone is removed and reported as
    /// [`LifecycleError::ParentProductRemoved`].
    pub async fn sync_bundle(
        &self,
        shop: &ShopId,
        bundle_id: BundleId,
    ) -> Result<SyncReport, LifecycleError> {
        self.serve(shop)?;
        let bundle = self.load(shop, bundle_id)?;
        let parent = self.parent_of(&bundle)?;

        if self.platform().fetch_product(&parent).await?.is_none() {
            return Err(self.parent_removed(shop, bundle_id)?);
        }

        match self.sync_and_record(shop, bundle).await?.sync {
            SyncOutcome::Synced(report) => Ok(report),
            SyncOutcome::Failed(e) => Err(e.into()),
        }
    }

    /// Merchant deletion: removes the parent product and the bundle record.
    pub async fn delete_bundle(
        &self,
        shop: &ShopId,
        bundle_id: BundleId,
    ) -> Result<(), LifecycleError> {
        self.serve(shop)?;
        let mut bundle = self.load(shop, bundle_id)?;
        let parent = self.parent_of(&bundle)?;

        execute(
            &mut bundle,
            &BundleCommand::DeleteBundle(DeleteBundle {
                shop: shop.clone(),
                bundle_id,
                reason: DeletionReason::Merchant,
                occurred_at: Utc::now(),
            }),
        )?;

        if !self.platform().delete_product(&parent).await? {
            warn!(
                shop = %shop,
                bundle_id = %bundle_id,
                product_id = %parent,
                "parent product already gone"
            );
        }
        self.repository.remove(shop, bundle_id)?;

        info!(shop = %shop, bundle_id = %bundle_id, "bundle deleted");
        Ok(())
    }

    /// Product-deleted webhook: drop every bundle of `shop` whose parent was
    /// `product_id`. Returns the removed bundle ids.
    pub fn handle_product_deleted(
        &self,
        shop: &ShopId,
        product_id: &GlobalId,
    ) -> Result<Vec<BundleId>, LifecycleError> {
        self.serve(shop)?;
        let mut removed = Vec::new();
        for mut bundle in self.repository.find_by_parent(shop, product_id)? {
            let bundle_id = bundle.id_typed();
            self.mark_deleted(&mut bundle, shop, DeletionReason::ParentProductRemoved)?;
            if self.repository.remove(shop, bundle_id)? {
                removed.push(bundle_id);
            }
        }

        if !removed.is_empty() {
            info!(
                shop = %shop,
                product_id = %product_id,
                bundles = removed.len(),
                "bundles removed after parent product deletion"
            );
        }
        Ok(removed)
    }

    /// App-uninstalled webhook: purge every bundle record of `shop`.
    pub fn handle_app_uninstalled(&self, shop: &ShopId) -> Result<usize, LifecycleError> {
        self.serve(shop)?;
        let removed = self.repository.clear_shop(shop)?;
        info!(shop = %shop, bundles = removed, "shop data purged after uninstall");
        Ok(removed)
    }

    /// Mapping health of one bundle, read back from the platform.
    pub async fn bundle_health(
        &self,
        shop: &ShopId,
        bundle_id: BundleId,
    ) -> Result<MappingHealth, LifecycleError> {
        self.serve(shop)?;
        let bundle = self.load(shop, bundle_id)?;
        let parent = self.parent_of(&bundle)?;
        let components = self.components_of(&bundle)?;

        match self.mapping.check_health(&parent, &components).await {
            Err(MappingError::ProductNotFound {
                role: ProductRole::Bundle,
                ..
            }) => Err(self.parent_removed(shop, bundle_id)?),
            Err(MappingError::ProductNotFound { id, .. }) => {
                Err(LifecycleError::ComponentNotFound(id))
            }
            other => Ok(other?),
        }
    }

    async fn sync_and_record(
        &self,
        shop: &ShopId,
        mut bundle: Bundle,
    ) -> Result<BundleChange, LifecycleError> {
        let bundle_id = bundle.id_typed();
        let parent = self.parent_of(&bundle)?;
        let components = self.components_of(&bundle)?;

        let report = match self.mapping.sync(&parent, &components).await {
            Ok(report) => report,
            Err(e @ MappingError::Client(_)) => return Err(e.into()),
            Err(e) => {
                warn!(shop = %shop, bundle_id = %bundle_id, error = %e, "bundle needs sync");
                return Ok(BundleChange {
                    bundle,
                    sync: SyncOutcome::Failed(e),
                });
            }
        };

        let expected = ExpectedVersion::Exact(bundle.version());
        execute(
            &mut bundle,
            &BundleCommand::RecordSync(RecordSync {
                shop: shop.clone(),
                bundle_id,
                mapped_variants: report.mapped_variants(),
                occurred_at: Utc::now(),
            }),
        )?;
        self.repository.save(&bundle, expected)?;

        Ok(BundleChange {
            bundle,
            sync: SyncOutcome::Synced(report),
        })
    }

    async fn component(&self, id: &GlobalId) -> Result<Product, LifecycleError> {
        self.platform()
            .fetch_product(id)
            .await?
            .ok_or_else(|| LifecycleError::ComponentNotFound(id.clone()))
    }

    fn load(&self, shop: &ShopId, bundle_id: BundleId) -> Result<Bundle, LifecycleError> {
        self.repository
            .get(shop, bundle_id)?
            .ok_or(LifecycleError::NotFound(bundle_id))
    }

    fn parent_of(&self, bundle: &Bundle) -> Result<GlobalId, LifecycleError> {
        bundle
            .parent_product()
            .cloned()
            .ok_or_else(|| DomainError::invariant("created bundle without parent product").into())
    }

    fn components_of(&self, bundle: &Bundle) -> Result<BundleComponents, LifecycleError> {
        bundle
            .components()
            .cloned()
            .ok_or_else(|| DomainError::invariant("created bundle without components").into())
    }

    fn serve(&self, shop: &ShopId) -> Result<(), LifecycleError> {
        match &self.served_shop {
            Some(served) if served != shop => Err(LifecycleError::ShopNotServed(shop.clone())),
            _ => Ok(()),
        }
    }

    fn mark_deleted(
        &self,
        bundle: &mut Bundle,
        shop: &ShopId,
        reason: DeletionReason,
    ) -> Result<(), LifecycleError> {
        let bundle_id = bundle.id_typed();
        execute(
            bundle,
            &BundleCommand::DeleteBundle(DeleteBundle {
                shop: shop.clone(),
                bundle_id,
                reason,
                occurred_at: Utc::now(),
            }),
        )?;
        Ok(())
    }

    /// Remove a bundle whose parent product vanished and build the error to
    /// report.
    fn parent_removed(
        &self,
        shop: &ShopId,
        bundle_id: BundleId,
    ) -> Result<LifecycleError, LifecycleError> {
        if let Some(mut bundle) = self.repository.get(shop, bundle_id)? {
            self.mark_deleted(&mut bundle, shop, DeletionReason::ParentProductRemoved)?;
            self.repository.remove(shop, bundle_id)?;
            warn!(shop = %shop, bundle_id = %bundle_id, "parent product gone, bundle removed");
        }
        Ok(LifecycleError::ParentProductRemoved(bundle_id))
    }
}
