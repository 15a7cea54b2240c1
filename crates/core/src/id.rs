//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a bundle record (local to this application).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleId(Uuid);

impl BundleId {
    /// Create a new identifier.
    ///
    /// Uses UUIDv7 (time-ordered). Prefer passing IDs explicitly in tests
    /// for determinism.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BundleId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for BundleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for BundleId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("BundleId: {e}")))?;
        Ok(Self(uuid))
    }
}

/// Identifier of a merchant shop (the tenant boundary).
///
/// Shops are addressed by their platform domain, e.g. `acme.myshopify.com`.
/// The domain is stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShopId(String);

impl ShopId {
    pub fn parse(domain: &str) -> Result<Self, DomainError> {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(DomainError::invalid_id("ShopId: empty shop domain"));
        }
        if domain.chars().any(|c| c.is_whitespace() || c == '/') {
            return Err(DomainError::invalid_id(format!(
                "ShopId: '{domain}' is not a bare domain"
            )));
        }
        Ok(Self(domain))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ShopId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShopId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ShopId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopId> for String {
    fn from(value: ShopId) -> Self {
        value.0
    }
}

/// Scheme and platform prefix shared by every platform global id.
pub const GID_PREFIX: &str = "gid://shopify/";

/// Resource type of a product variant global id.
pub const VARIANT_TYPE: &str = "ProductVariant";

/// Resource type of a product global id.
pub const PRODUCT_TYPE: &str = "Product";

/// Platform global identifier: `gid://shopify/<Type>/<id>`.
///
/// The platform treats these as opaque strings; the only structure relied on
/// here is the prefix and the resource type segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GlobalId(String);

impl GlobalId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let rest = raw
            .strip_prefix(GID_PREFIX)
            .ok_or_else(|| DomainError::invalid_id(format!("'{raw}' is not a global id")))?;

        let (kind, id) = rest
            .split_once('/')
            .ok_or_else(|| DomainError::invalid_id(format!("'{raw}' has no resource id")))?;

        if kind.is_empty() || id.is_empty() || id.contains('/') {
            return Err(DomainError::invalid_id(format!("'{raw}' is malformed")));
        }

        Ok(Self(raw.to_string()))
    }

    /// Build a global id from a resource type and a local id.
    pub fn new(kind: &str, id: impl core::fmt::Display) -> Result<Self, DomainError> {
        Self::parse(&format!("{GID_PREFIX}{kind}/{id}"))
    }

    pub fn variant(id: impl core::fmt::Display) -> Result<Self, DomainError> {
        Self::new(VARIANT_TYPE, id)
    }

    pub fn product(id: impl core::fmt::Display) -> Result<Self, DomainError> {
        Self::new(PRODUCT_TYPE, id)
    }

    /// Resource type segment, e.g. `ProductVariant`.
    pub fn kind(&self) -> &str {
        self.0[GID_PREFIX.len()..]
            .split_once('/')
            .map(|(kind, _)| kind)
            .unwrap_or_default()
    }

    /// Resource id segment (everything after the type).
    pub fn local_id(&self) -> &str {
        self.0[GID_PREFIX.len()..]
            .split_once('/')
            .map(|(_, id)| id)
            .unwrap_or_default()
    }

    pub fn is_variant(&self) -> bool {
        self.kind() == VARIANT_TYPE
    }

    pub fn is_product(&self) -> bool {
        self.kind() == PRODUCT_TYPE
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for GlobalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GlobalId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for GlobalId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GlobalId> for String {
    fn from(value: GlobalId) -> Self {
        value.0
    }
}

impl AsRef<str> for GlobalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
