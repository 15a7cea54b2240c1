//! Platform adapters.
//!
//! [`PlatformClient`] (reads + metafield writes) is what the mapper needs;
//! [`ProductAdmin`] adds the product mutations the bundle lifecycle performs.

pub mod in_memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use duobundle_core::{GlobalId, normalize};
use duobundle_mapping::{ClientError, PlatformClient};
use duobundle_products::{Product, ProductOption, ProductStatus};

pub use in_memory::InMemoryPlatform;

/// Input for creating a product on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub handle: String,
    pub status: ProductStatus,
    /// Options to create; the platform creates one variant per combination.
    pub options: Vec<ProductOption>,
}

/// Product mutations used by the bundle lifecycle.
#[async_trait]
pub trait ProductAdmin: PlatformClient {
    async fn create_product(&self, product: NewProduct) -> Result<Product, ClientError>;

    /// Returns whether the product existed.
    async fn update_product_title(&self, id: &GlobalId, title: &str) -> Result<bool, ClientError>;

    /// Replace the product's options; its variants are regenerated. `None` if
    /// the product no longer exists.
    async fn set_product_options(
        &self,
        id: &GlobalId,
        options: Vec<ProductOption>,
    ) -> Result<Option<Product>, ClientError>;

    /// Returns whether the product existed.
    async fn delete_product(&self, id: &GlobalId) -> Result<bool, ClientError>;
}

#[async_trait]
impl<P> ProductAdmin for Arc<P>
where
    P: ProductAdmin + ?Sized,
{
    async fn create_product(&self, product: NewProduct) -> Result<Product, ClientError> {
        (**self).create_product(product).await
    }

    async fn update_product_title(&self, id: &GlobalId, title: &str) -> Result<bool, ClientError> {
        (**self).update_product_title(id, title).await
    }

    async fn set_product_options(
        &self,
        id: &GlobalId,
        options: Vec<ProductOption>,
    ) -> Result<Option<Product>, ClientError> {
        (**self).set_product_options(id, options).await
    }

    async fn delete_product(&self, id: &GlobalId) -> Result<bool, ClientError> {
        (**self).delete_product(id).await
    }
}

/// Options of a bundle product built from its two components.
///
/// Each component contributes its real options in order. When both components
/// use the same option name, the names are prefixed with the product title so
/// that the bundle product has distinct options ("Mug Color", "Tee Color").
pub fn bundle_options(first: &Product, second: &Product) -> Vec<ProductOption> {
    let first_names: Vec<String> = first.real_options().map(|o| normalize(&o.name)).collect();
    let second_names: Vec<String> = second.real_options().map(|o| normalize(&o.name)).collect();

    let clashes = |name: &str| {
        first_names.iter().any(|n| n == name) && second_names.iter().any(|n| n == name)
    };

    [first, second]
        .into_iter()
        .flat_map(|product| product.real_options().map(move |option| (product, option)))
        .map(|(product, option)| {
            let name = if clashes(&normalize(&option.name)) {
                format!("{} {}", product.title, option.name)
            } else {
                option.name.clone()
            };
            ProductOption {
                name,
                values: option.values.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: u64, title: &str, options: Vec<ProductOption>) -> Product {
        Product {
            id: GlobalId::product(id).unwrap(),
            title: title.to_string(),
            handle: title.to_lowercase(),
            status: ProductStatus::Active,
            options,
            variants: vec![],
        }
    }

    #[test]
    fn combines_real_options_in_component_order() {
        let mug = product(1, "Mug", vec![ProductOption::new("Color", ["Black", "White"])]);
        let tee = product(2, "Tee", vec![ProductOption::new("Size", ["S", "M"])]);

        assert_eq!(
            bundle_options(&mug, &tee),
            vec![
                ProductOption::new("Color", ["Black", "White"]),
                ProductOption::new("Size", ["S", "M"]),
            ]
        );
    }

    #[test]
    fn clashing_option_names_are_prefixed() {
        let mug = product(1, "Mug", vec![ProductOption::new("Color", ["Black"])]);
        let tee = product(2, "Tee", vec![ProductOption::new("color", ["Red"])]);

        let names: Vec<String> = bundle_options(&mug, &tee).into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["Mug Color", "Tee color"]);
    }

    #[test]
    fn default_options_are_dropped() {
        let mug = product(1, "Mug", vec![ProductOption::new("Title", ["Default Title"])]);
        let tee = product(2, "Tee", vec![ProductOption::new("Title", ["Default Title"])]);
        assert!(bundle_options(&mug, &tee).is_empty());
    }
}
