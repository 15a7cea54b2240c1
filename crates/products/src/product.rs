use serde::{Deserialize, Serialize};

use duobundle_core::{Entity, GlobalId, ValueObject, normalize, normalize_joined};

/// Option name the platform gives products that have no real options.
pub const DEFAULT_OPTION_NAME: &str = "Title";

/// Value of the single variant of a product that has no real options.
pub const DEFAULT_OPTION_VALUE: &str = "Default Title";

/// Product status lifecycle (as reported by the platform).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Active,
    Archived,
}

/// One (option name, option value) pair of a variant, e.g. `Color = Black`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

impl SelectedOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    fn is_default(&self) -> bool {
        self.name == DEFAULT_OPTION_NAME && self.value == DEFAULT_OPTION_VALUE
    }
}

impl ValueObject for SelectedOption {}

/// A product option with its ordered values, e.g. `Color: [Black, Blue]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub name: String,
    pub values: Vec<String>,
}

impl ProductOption {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// The synthetic `Title: [Default Title]` option of an option-less product.
    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_OPTION_NAME
            && self.values.len() == 1
            && self.values[0] == DEFAULT_OPTION_VALUE
    }
}

impl ValueObject for ProductOption {}

/// Variant snapshot as read from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: GlobalId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
    /// Raw value of the component-reference metafield, when one is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_reference: Option<String>,
}

impl Variant {
    pub fn new(id: GlobalId, selected_options: Vec<SelectedOption>) -> Self {
        let title = selected_options
            .iter()
            .map(|o| o.value.as_str())
            .collect::<Vec<_>>()
            .join(" / ");
        Self {
            id,
            title,
            selected_options,
            component_reference: None,
        }
    }

    pub fn option_values(&self) -> impl Iterator<Item = &str> {
        self.selected_options.iter().map(|o| o.value.as_str())
    }

    /// Normalized concatenation of every option value of this variant.
    pub fn value_blob(&self) -> String {
        normalize_joined(self.option_values())
    }

    /// Normalized form of each option value, in option order.
    pub fn normalized_values(&self) -> Vec<String> {
        self.option_values().map(normalize).collect()
    }

    /// True when the variant carries no real option distinction.
    pub fn is_default(&self) -> bool {
        match self.selected_options.as_slice() {
            [] => true,
            [only] => only.is_default(),
            _ => false,
        }
    }
}

impl Entity for Variant {
    type Id = GlobalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Product snapshot as read from the platform, variants included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: GlobalId,
    pub title: String,
    pub handle: String,
    pub status: ProductStatus,
    #[serde(default)]
    pub options: Vec<ProductOption>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    /// Products with exactly one variant and no real options.
    pub fn is_default_variant_product(&self) -> bool {
        matches!(self.variants.as_slice(), [only] if only.is_default())
    }

    /// Options other than the synthetic default option.
    pub fn real_options(&self) -> impl Iterator<Item = &ProductOption> {
        self.options.iter().filter(|o| !o.is_default())
    }

    pub fn variant(&self, id: &GlobalId) -> Option<&Variant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    pub fn has_variant(&self, id: &GlobalId) -> bool {
        self.variant(id).is_some()
    }
}

impl Entity for Product {
    type Id = GlobalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// URL-safe handle derived from a title ("Gift Set: Mug & Tee" → "gift-set-mug-tee").
pub fn handleize(title: &str) -> String {
    normalize(title).replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(id: u64, options: &[(&str, &str)]) -> Variant {
        Variant::new(
            GlobalId::variant(id).unwrap(),
            options
                .iter()
                .map(|(n, v)| SelectedOption::new(*n, *v))
                .collect(),
        )
    }

    fn product(variants: Vec<Variant>, options: Vec<ProductOption>) -> Product {
        Product {
            id: GlobalId::product(1).unwrap(),
            title: "Mug".to_string(),
            handle: "mug".to_string(),
            status: ProductStatus::Active,
            options,
            variants,
        }
    }

    #[test]
    fn value_blob_normalizes_and_joins_option_values() {
        let v = variant(1, &[("Color", "Obsidian-Black"), ("Size", " XL ")]);
        assert_eq!(v.value_blob(), "obsidian black xl");
        assert_eq!(v.normalized_values(), vec!["obsidian black", "xl"]);
        assert_eq!(v.title, "Obsidian-Black /  XL ");
    }

    #[test]
    fn default_variant_detection() {
        assert!(variant(1, &[]).is_default());
        assert!(variant(1, &[("Title", "Default Title")]).is_default());
        assert!(!variant(1, &[("Color", "Black")]).is_default());
        assert!(!variant(1, &[("Title", "Default Title"), ("Size", "M")]).is_default());
    }

    #[test]
    fn default_variant_product_requires_single_default_variant() {
        let single = product(
            vec![variant(1, &[("Title", "Default Title")])],
            vec![ProductOption::new("Title", ["Default Title"])],
        );
        assert!(single.is_default_variant_product());
        assert_eq!(single.real_options().count(), 0);

        let single_colored = product(vec![variant(1, &[("Color", "Black")])], vec![]);
        assert!(!single_colored.is_default_variant_product());

        let two = product(vec![variant(1, &[]), variant(2, &[])], vec![]);
        assert!(!two.is_default_variant_product());
    }

    #[test]
    fn variant_lookup_by_id() {
        let p = product(vec![variant(7, &[("Color", "Blue")])], vec![]);
        assert!(p.has_variant(&GlobalId::variant(7).unwrap()));
        assert!(!p.has_variant(&GlobalId::variant(8).unwrap()));
    }

    #[test]
    fn handleize_produces_url_safe_handles() {
        assert_eq!(handleize("Gift Set: Mug & Tee"), "gift-set-mug-tee");
        assert_eq!(handleize("  Café Duo  "), "café-duo");
    }

    #[test]
    fn variant_deserializes_platform_shape() {
        let raw = r#"{
            "id": "gid://shopify/ProductVariant/3",
            "title": "Black",
            "selectedOptions": [{"name": "Color", "value": "Black"}],
            "componentReference": "[\"gid://shopify/ProductVariant/1\"]"
        }"#;
        let v: Variant = serde_json::from_str(raw).unwrap();
        assert_eq!(v.selected_options, vec![SelectedOption::new("Color", "Black")]);
        assert!(v.component_reference.is_some());
    }
}
