use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use duobundle_core::GlobalId;
use duobundle_products::{
    COMPONENT_KEY, COMPONENT_NAMESPACE, COMPONENT_TYPE, ComponentMapping, Product,
};

/// One entry of a batched metafield write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldWrite {
    pub owner_id: GlobalId,
    pub namespace: String,
    pub key: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl MetafieldWrite {
    /// The component-reference metafield for one bundle variant.
    pub fn component_reference(mapping: &ComponentMapping) -> Self {
        Self {
            owner_id: mapping.bundle_variant_id().clone(),
            namespace: COMPONENT_NAMESPACE.to_string(),
            key: COMPONENT_KEY.to_string(),
            kind: COMPONENT_TYPE.to_string(),
            value: mapping.to_metafield_value(),
        }
    }
}

/// Address of one metafield, for deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetafieldIdentifier {
    pub owner_id: GlobalId,
    pub namespace: String,
    pub key: String,
}

impl MetafieldIdentifier {
    /// The component-reference metafield of `owner`.
    pub fn component_reference(owner: &GlobalId) -> Self {
        Self {
            owner_id: owner.clone(),
            namespace: COMPONENT_NAMESPACE.to_string(),
            key: COMPONENT_KEY.to_string(),
        }
    }
}

/// Field-level error reported by the platform for a write it refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    /// Path to the offending input field, e.g. `["metafields", "0", "ownerId"]`.
    #[serde(default)]
    pub field: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl core::fmt::Display for UserError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.field.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.field.join("."), self.message)
        }
    }
}

/// Transport-level failure talking to the platform.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request was throttled")]
    Throttled,

    #[error("access token rejected")]
    Unauthorized,

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

/// Platform operations the mapper depends on.
///
/// Injected into the services that need it; there is no shared global client.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Read a product with its options and variants. `None` if it no longer
    /// exists.
    async fn fetch_product(&self, id: &GlobalId) -> Result<Option<Product>, ClientError>;

    /// Write a batch of metafields in one call.
    ///
    /// Returns the platform's per-item field errors; an empty list means the
    /// whole batch was accepted.
    async fn set_metafields(
        &self,
        writes: Vec<MetafieldWrite>,
    ) -> Result<Vec<UserError>, ClientError>;

    /// Delete a batch of metafields in one call. Absent metafields are not an
    /// error.
    async fn delete_metafields(
        &self,
        ids: Vec<MetafieldIdentifier>,
    ) -> Result<Vec<UserError>, ClientError>;
}

#[async_trait]
impl<C> PlatformClient for Arc<C>
where
    C: PlatformClient + ?Sized,
{
    async fn fetch_product(&self, id: &GlobalId) -> Result<Option<Product>, ClientError> {
        (**self).fetch_product(id).await
    }

    async fn set_metafields(
        &self,
        writes: Vec<MetafieldWrite>,
    ) -> Result<Vec<UserError>, ClientError> {
        (**self).set_metafields(writes).await
    }

    async fn delete_metafields(
        &self,
        ids: Vec<MetafieldIdentifier>,
    ) -> Result<Vec<UserError>, ClientError> {
        (**self).delete_metafields(ids).await
    }
}
