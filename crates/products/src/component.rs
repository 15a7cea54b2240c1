//! Component mapping and its metafield storage convention.
//!
//! A bundle variant stores the variants it expands into as a metafield:
//!
//! - namespace `duobundle`, key `component_reference`, type `json`
//! - value: JSON array of component variant global ids, component order
//!
//! This is the only convention written or read. Payloads using other
//! namespaces (or the older fixed-pair layout) are treated as absent.

use serde_json::Value as JsonValue;

use duobundle_core::{DomainError, DomainResult, GlobalId, ValueObject};

use crate::product::Product;

pub const COMPONENT_NAMESPACE: &str = "duobundle";
pub const COMPONENT_KEY: &str = "component_reference";
pub const COMPONENT_TYPE: &str = "json";

/// Fewest component ids a payload needs to describe an expansion.
pub const MIN_COMPONENTS: usize = 2;

/// The component variants a bundle variant expands into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMapping {
    bundle_variant_id: GlobalId,
    components: Vec<GlobalId>,
}

impl ValueObject for ComponentMapping {}

impl ComponentMapping {
    pub fn new(bundle_variant_id: GlobalId, first: GlobalId, second: GlobalId) -> Self {
        Self {
            bundle_variant_id,
            components: vec![first, second],
        }
    }

    pub fn bundle_variant_id(&self) -> &GlobalId {
        &self.bundle_variant_id
    }

    /// Component variant ids in component order.
    pub fn components(&self) -> &[GlobalId] {
        &self.components
    }

    /// Metafield value for this mapping.
    pub fn to_metafield_value(&self) -> String {
        JsonValue::Array(
            self.components
                .iter()
                .map(|id| JsonValue::String(id.to_string()))
                .collect(),
        )
        .to_string()
    }

    /// Check that each referenced variant belongs to the matching component
    /// product (first id to the first product, and so on).
    pub fn validate_against(&self, components: [&Product; 2]) -> DomainResult<()> {
        check_ownership(&self.components, components)
    }
}

/// Ownership rule for a list of component variant ids: the first id must be a
/// variant of the first product, the second of the second.
pub fn check_ownership(variant_ids: &[GlobalId], components: [&Product; 2]) -> DomainResult<()> {
    if variant_ids.len() < MIN_COMPONENTS {
        return Err(DomainError::invariant(format!(
            "expected at least {MIN_COMPONENTS} component variants, got {}",
            variant_ids.len()
        )));
    }
    for (variant_id, product) in variant_ids.iter().zip(components) {
        if !product.has_variant(variant_id) {
            return Err(DomainError::invariant(format!(
                "variant {variant_id} does not belong to component product {}",
                product.id
            )));
        }
    }
    Ok(())
}

/// Decode a component-reference payload.
///
/// Returns `None` unless the payload is a JSON array whose every element is a
/// product-variant global id. The minimum length is left to the caller.
pub fn decode_component_reference(raw: &str) -> Option<Vec<GlobalId>> {
    let JsonValue::Array(items) = serde_json::from_str::<JsonValue>(raw).ok()? else {
        return None;
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| GlobalId::parse(s).ok())
                .filter(GlobalId::is_variant)
        })
        .collect()
}
