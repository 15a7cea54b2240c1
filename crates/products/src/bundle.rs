use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duobundle_core::{
    Aggregate, AggregateRoot, BundleId, DomainError, GlobalId, ShopId, ValueObject,
};
use duobundle_events::Event;

/// The two component products of a bundle, in position order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleComponents {
    first: GlobalId,
    second: GlobalId,
}

impl BundleComponents {
    pub fn new(first: GlobalId, second: GlobalId) -> Result<Self, DomainError> {
        for id in [&first, &second] {
            if !id.is_product() {
                return Err(DomainError::validation(format!(
                    "component {id} is not a product id"
                )));
            }
        }
        if first == second {
            return Err(DomainError::validation(
                "a bundle needs two different component products",
            ));
        }
        Ok(Self { first, second })
    }

    pub fn first(&self) -> &GlobalId {
        &self.first
    }

    pub fn second(&self) -> &GlobalId {
        &self.second
    }

    pub fn contains(&self, product_id: &GlobalId) -> bool {
        &self.first == product_id || &self.second == product_id
    }
}

impl ValueObject for BundleComponents {}

/// Why a bundle record was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionReason {
    /// The merchant deleted it.
    Merchant,
    /// The platform reported the parent product gone.
    ParentProductRemoved,
    /// The owning shop uninstalled the application.
    ShopUninstalled,
}

/// Aggregate root: Bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    id: BundleId,
    shop: Option<ShopId>,
    title: String,
    parent_product: Option<GlobalId>,
    components: Option<BundleComponents>,
    last_synced_at: Option<DateTime<Utc>>,
    mapped_variants: usize,
    deleted: Option<DeletionReason>,
    version: u64,
    created: bool,
}

impl Bundle {
    /// Create an empty, not-yet-created aggregate instance.
    pub fn empty(id: BundleId) -> Self {
        Self {
            id,
            shop: None,
            title: String::new(),
            parent_product: None,
            components: None,
            last_synced_at: None,
            mapped_variants: 0,
            deleted: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> BundleId {
        self.id
    }

    pub fn shop(&self) -> Option<&ShopId> {
        self.shop.as_ref()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn parent_product(&self) -> Option<&GlobalId> {
        self.parent_product.as_ref()
    }

    pub fn components(&self) -> Option<&BundleComponents> {
        self.components.as_ref()
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.last_synced_at
    }

    pub fn mapped_variants(&self) -> usize {
        self.mapped_variants
    }

    pub fn deletion_reason(&self) -> Option<DeletionReason> {
        self.deleted
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// A bundle needs a sync until mappings were written for its current
    /// components.
    pub fn needs_sync(&self) -> bool {
        self.created && !self.is_deleted() && self.last_synced_at.is_none()
    }
}

impl AggregateRoot for Bundle {
    type Id = BundleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateBundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBundle {
    pub shop: ShopId,
    pub bundle_id: BundleId,
    pub title: String,
    pub parent_product: GlobalId,
    pub components: BundleComponents,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateBundle. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBundle {
    pub shop: ShopId,
    pub bundle_id: BundleId,
    pub title: Option<String>,
    pub components: Option<BundleComponents>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordSync (mappings were written for every bundle variant).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSync {
    pub shop: ShopId,
    pub bundle_id: BundleId,
    pub mapped_variants: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteBundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBundle {
    pub shop: ShopId,
    pub bundle_id: BundleId,
    pub reason: DeletionReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleCommand {
    CreateBundle(CreateBundle),
    UpdateBundle(UpdateBundle),
    RecordSync(RecordSync),
    DeleteBundle(DeleteBundle),
}

/// Event: BundleCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleCreated {
    pub shop: ShopId,
    pub bundle_id: BundleId,
    pub title: String,
    pub parent_product: GlobalId,
    pub components: BundleComponents,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BundleUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleUpdated {
    pub shop: ShopId,
    pub bundle_id: BundleId,
    pub title: String,
    pub components: BundleComponents,
    /// Whether the components changed (existing mappings are stale).
    pub components_changed: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BundleSynced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSynced {
    pub shop: ShopId,
    pub bundle_id: BundleId,
    pub mapped_variants: usize,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BundleDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleDeleted {
    pub shop: ShopId,
    pub bundle_id: BundleId,
    pub reason: DeletionReason,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleEvent {
    BundleCreated(BundleCreated),
    BundleUpdated(BundleUpdated),
    BundleSynced(BundleSynced),
    BundleDeleted(BundleDeleted),
}

impl Event for BundleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BundleEvent::BundleCreated(_) => "bundles.bundle.created",
            BundleEvent::BundleUpdated(_) => "bundles.bundle.updated",
            BundleEvent::BundleSynced(_) => "bundles.bundle.synced",
            BundleEvent::BundleDeleted(_) => "bundles.bundle.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BundleEvent::BundleCreated(e) => e.occurred_at,
            BundleEvent::BundleUpdated(e) => e.occurred_at,
            BundleEvent::BundleSynced(e) => e.occurred_at,
            BundleEvent::BundleDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Bundle {
    type Command = BundleCommand;
    type Event = BundleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            BundleEvent::BundleCreated(e) => {
                self.id = e.bundle_id;
                self.shop = Some(e.shop.clone());
                self.title = e.title.clone();
                self.parent_product = Some(e.parent_product.clone());
                self.components = Some(e.components.clone());
                self.last_synced_at = None;
                self.mapped_variants = 0;
                self.created = true;
            }
            BundleEvent::BundleUpdated(e) => {
                self.title = e.title.clone();
                self.components = Some(e.components.clone());
                if e.components_changed {
                    self.last_synced_at = None;
                    self.mapped_variants = 0;
                }
            }
            BundleEvent::BundleSynced(e) => {
                self.last_synced_at = Some(e.occurred_at);
                self.mapped_variants = e.mapped_variants;
            }
            BundleEvent::BundleDeleted(e) => {
                self.deleted = Some(e.reason);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            BundleCommand::CreateBundle(cmd) => self.handle_create(cmd),
            BundleCommand::UpdateBundle(cmd) => self.handle_update(cmd),
            BundleCommand::RecordSync(cmd) => self.handle_record_sync(cmd),
            BundleCommand::DeleteBundle(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Bundle {
    /// Guard shared by every command on an existing bundle.
    fn ensure_live(&self, shop: &ShopId, bundle_id: BundleId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.shop.as_ref() != Some(shop) {
            return Err(DomainError::invariant("shop mismatch"));
        }
        if self.id != bundle_id {
            return Err(DomainError::invariant("bundle_id mismatch"));
        }
        if self.is_deleted() {
            return Err(DomainError::conflict("bundle has been deleted"));
        }
        Ok(())
    }

    fn validate_title(title: &str) -> Result<(), DomainError> {
        if title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }
        Ok(())
    }

    fn validate_parent(
        parent: &GlobalId,
        components: &BundleComponents,
    ) -> Result<(), DomainError> {
        if !parent.is_product() {
            return Err(DomainError::validation(format!(
                "parent {parent} is not a product id"
            )));
        }
        if components.contains(parent) {
            return Err(DomainError::validation(
                "a bundle cannot contain its own parent product",
            ));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateBundle) -> Result<Vec<BundleEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("bundle already exists"));
        }
        Self::validate_title(&cmd.title)?;
        Self::validate_parent(&cmd.parent_product, &cmd.components)?;

        Ok(vec![BundleEvent::BundleCreated(BundleCreated {
            shop: cmd.shop.clone(),
            bundle_id: cmd.bundle_id,
            title: cmd.title.trim().to_string(),
            parent_product: cmd.parent_product.clone(),
            components: cmd.components.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateBundle) -> Result<Vec<BundleEvent>, DomainError> {
        self.ensure_live(&cmd.shop, cmd.bundle_id)?;

        let title = match &cmd.title {
            Some(t) => {
                Self::validate_title(t)?;
                t.trim().to_string()
            }
            None => self.title.clone(),
        };

        let current = self
            .components
            .as_ref()
            .ok_or_else(|| DomainError::invariant("created bundle without components"))?;
        let components = cmd.components.clone().unwrap_or_else(|| current.clone());

        if let Some(parent) = &self.parent_product {
            Self::validate_parent(parent, &components)?;
        }

        let components_changed = &components != current;
        if title == self.title && !components_changed {
            return Ok(vec![]);
        }

        Ok(vec![BundleEvent::BundleUpdated(BundleUpdated {
            shop: cmd.shop.clone(),
            bundle_id: cmd.bundle_id,
            title,
            components,
            components_changed,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_sync(&self, cmd: &RecordSync) -> Result<Vec<BundleEvent>, DomainError> {
        self.ensure_live(&cmd.shop, cmd.bundle_id)?;

        if cmd.mapped_variants == 0 {
            return Err(DomainError::validation(
                "a sync must map at least one bundle variant",
            ));
        }

        Ok(vec![BundleEvent::BundleSynced(BundleSynced {
            shop: cmd.shop.clone(),
            bundle_id: cmd.bundle_id,
            mapped_variants: cmd.mapped_variants,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteBundle) -> Result<Vec<BundleEvent>, DomainError> {
        self.ensure_live(&cmd.shop, cmd.bundle_id)?;

        Ok(vec![BundleEvent::BundleDeleted(BundleDeleted {
            shop: cmd.shop.clone(),
            bundle_id: cmd.bundle_id,
            reason: cmd.reason,
            occurred_at: cmd.occurred_at,
        })])
    }
}
