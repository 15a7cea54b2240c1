use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use duobundle_core::{DomainError, GlobalId};
use duobundle_mapping::{
    ClientError, MetafieldIdentifier, MetafieldWrite, PlatformClient, UserError,
};
use duobundle_products::{
    COMPONENT_KEY, COMPONENT_NAMESPACE, DEFAULT_OPTION_NAME, DEFAULT_OPTION_VALUE, Product,
    ProductOption, SelectedOption, Variant,
};

use super::{NewProduct, ProductAdmin};

/// Metafields are keyed by (owner, namespace, key).
type MetafieldKey = (GlobalId, String, String);

#[derive(Debug, Default)]
struct State {
    products: HashMap<GlobalId, Product>,
    metafields: HashMap<MetafieldKey, String>,
    write_calls: usize,
    unavailable: bool,
}

impl State {
    fn variant_exists(&self, id: &GlobalId) -> bool {
        self.products.values().any(|p| p.has_variant(id))
    }

    fn drop_metafields_of(&mut self, variants: &HashSet<GlobalId>) {
        self.metafields.retain(|(owner, _, _), _| !variants.contains(owner));
    }
}

/// In-memory platform for tests/dev.
///
/// Behaves like the real Admin API where the bundle flow depends on it:
/// variants are generated from options, and a metafield batch is validated as
/// a whole (user errors, nothing applied) before any entry is written.
#[derive(Debug)]
pub struct InMemoryPlatform {
    state: RwLock<State>,
    next_id: AtomicU64,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self {
            state: RwLock::new(State::default()),
            next_id: AtomicU64::new(10_000),
        }
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a product as-is. Variant `component_reference` values become
    /// stored metafields.
    pub fn insert_product(&self, mut product: Product) {
        if let Ok(mut state) = self.state.write() {
            for variant in &mut product.variants {
                if let Some(value) = variant.component_reference.take() {
                    state.metafields.insert(component_key(&variant.id), value);
                }
            }
            state.products.insert(product.id.clone(), product);
        }
    }

    /// Current product snapshot with metafields resolved.
    pub fn product(&self, id: &GlobalId) -> Option<Product> {
        let state = self.state.read().ok()?;
        state.products.get(id).map(|p| resolve(&state, p))
    }

    /// Ids of every stored product, sorted.
    pub fn product_ids(&self) -> Vec<GlobalId> {
        let mut ids: Vec<GlobalId> = match self.state.read() {
            Ok(state) => state.products.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        ids.sort();
        ids
    }

    /// Stored component-reference value of a variant.
    pub fn metafield(&self, variant_id: &GlobalId) -> Option<String> {
        let state = self.state.read().ok()?;
        state.metafields.get(&component_key(variant_id)).cloned()
    }

    /// Remove a product outside of the application (merchant deleted it in the
    /// admin).
    pub fn remove_product(&self, id: &GlobalId) -> bool {
        match self.state.write() {
            Ok(mut state) => remove(&mut state, id),
            Err(_) => false,
        }
    }

    /// Number of `set_metafields` calls received.
    pub fn write_calls(&self) -> usize {
        self.state.read().map(|s| s.write_calls).unwrap_or(0)
    }

    /// Make every call fail with a transport error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.write() {
            state.unavailable = unavailable;
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, ClientError> {
        let state = self.state.read().map_err(|_| poisoned())?;
        if state.unavailable {
            return Err(ClientError::Transport("platform unavailable".to_string()));
        }
        Ok(state)
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, ClientError> {
        let state = self.state.write().map_err(|_| poisoned())?;
        if state.unavailable {
            return Err(ClientError::Transport("platform unavailable".to_string()));
        }
        Ok(state)
    }

    /// One variant per combination of option values, reusing the id of an
    /// existing variant with the same selection.
    fn build_variants(
        &self,
        options: &[ProductOption],
        existing: &[Variant],
    ) -> Result<Vec<Variant>, ClientError> {
        option_combinations(options)
            .into_iter()
            .map(|selected| {
                let id = match existing.iter().find(|v| v.selected_options == selected) {
                    Some(v) => v.id.clone(),
                    None => GlobalId::variant(self.next_id()).map_err(invalid)?,
                };
                Ok(Variant::new(id, selected))
            })
            .collect()
    }
}

fn invalid(err: DomainError) -> ClientError {
    ClientError::InvalidResponse(err.to_string())
}

fn poisoned() -> ClientError {
    ClientError::Transport("lock poisoned".to_string())
}

fn component_key(owner: &GlobalId) -> MetafieldKey {
    (
        owner.clone(),
        COMPONENT_NAMESPACE.to_string(),
        COMPONENT_KEY.to_string(),
    )
}

fn resolve(state: &State, product: &Product) -> Product {
    let mut product = product.clone();
    for variant in &mut product.variants {
        variant.component_reference = state.metafields.get(&component_key(&variant.id)).cloned();
    }
    product
}

fn remove(state: &mut State, id: &GlobalId) -> bool {
    match state.products.remove(id) {
        Some(product) => {
            let variants = product.variants.into_iter().map(|v| v.id).collect();
            state.drop_metafields_of(&variants);
            true
        }
        None => false,
    }
}

/// Options as stored: the default option when no real option has values.
fn effective_options(options: Vec<ProductOption>) -> Vec<ProductOption> {
    let real: Vec<ProductOption> = options
        .into_iter()
        .filter(|o| !o.is_default() && !o.values.is_empty())
        .collect();
    if real.is_empty() {
        vec![ProductOption::new(DEFAULT_OPTION_NAME, [DEFAULT_OPTION_VALUE])]
    } else {
        real
    }
}

fn option_combinations(options: &[ProductOption]) -> Vec<Vec<SelectedOption>> {
    options.iter().fold(vec![Vec::new()], |combos, option| {
        combos
            .into_iter()
            .flat_map(|prefix| {
                option.values.iter().map(move |value| {
                    let mut next = prefix.clone();
                    next.push(SelectedOption::new(option.name.as_str(), value.as_str()));
                    next
                })
            })
            .collect()
    })
}

fn user_error(index: usize, field: &str, message: &str) -> UserError {
    UserError {
        field: vec!["metafields".to_string(), index.to_string(), field.to_string()],
        message: message.to_string(),
        code: Some("INVALID_VALUE".to_string()),
    }
}

#[async_trait]
impl PlatformClient for InMemoryPlatform {
    async fn fetch_product(&self, id: &GlobalId) -> Result<Option<Product>, ClientError> {
        let state = self.read()?;
        Ok(state.products.get(id).map(|p| resolve(&state, p)))
    }

    async fn set_metafields(
        &self,
        writes: Vec<MetafieldWrite>,
    ) -> Result<Vec<UserError>, ClientError> {
        let mut state = self.write()?;
        state.write_calls += 1;

        let mut errors = Vec::new();
        for (idx, write) in writes.iter().enumerate() {
            if !state.variant_exists(&write.owner_id) {
                errors.push(user_error(idx, "ownerId", "Owner does not exist"));
            }
            if write.kind == "json"
                && serde_json::from_str::<serde_json::Value>(&write.value).is_err()
            {
                errors.push(user_error(idx, "value", "Value is invalid JSON"));
            }
        }
        if !errors.is_empty() {
            return Ok(errors);
        }

        for write in writes {
            state
                .metafields
                .insert((write.owner_id, write.namespace, write.key), write.value);
        }
        Ok(Vec::new())
    }

    async fn delete_metafields(
        &self,
        ids: Vec<MetafieldIdentifier>,
    ) -> Result<Vec<UserError>, ClientError> {
        let mut state = self.write()?;
        for id in ids {
            state.metafields.remove(&(id.owner_id, id.namespace, id.key));
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl ProductAdmin for InMemoryPlatform {
    async fn create_product(&self, product: NewProduct) -> Result<Product, ClientError> {
        let options = effective_options(product.options);
        let variants = self.build_variants(&options, &[])?;
        let id = GlobalId::product(self.next_id()).map_err(invalid)?;

        let created = Product {
            id: id.clone(),
            title: product.title,
            handle: product.handle,
            status: product.status,
            options,
            variants,
        };
        self.write()?.products.insert(id, created.clone());
        Ok(created)
    }

    async fn update_product_title(
        &self,
        id: &GlobalId,
        title: &str,
    ) -> Result<bool, ClientError> {
        let mut state = self.write()?;
        Ok(match state.products.get_mut(id) {
            Some(product) => {
                product.title = title.to_string();
                true
            }
            None => false,
        })
    }

    async fn set_product_options(
        &self,
        id: &GlobalId,
        options: Vec<ProductOption>,
    ) -> Result<Option<Product>, ClientError> {
        let mut state = self.write()?;
        let Some(existing) = state.products.get(id).cloned() else {
            return Ok(None);
        };

        let options = effective_options(options);
        let variants = self.build_variants(&options, &existing.variants)?;

        let kept: HashSet<GlobalId> = variants.iter().map(|v| v.id.clone()).collect();
        let dropped: HashSet<GlobalId> = existing
            .variants
            .into_iter()
            .map(|v| v.id)
            .filter(|v| !kept.contains(v))
            .collect();
        state.drop_metafields_of(&dropped);

        let Some(product) = state.products.get_mut(id) else {
            return Ok(None);
        };
        product.options = options;
        product.variants = variants;
        let updated = product.clone();
        Ok(Some(resolve(&state, &updated)))
    }

    async fn delete_product(&self, id: &GlobalId) -> Result<bool, ClientError> {
        let mut state = self.write()?;
        Ok(remove(&mut state, id))
    }
}
