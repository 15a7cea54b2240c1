//! The cart expansion transform.
//!
//! Pure and total: no IO, no shared state, one pass over the cart lines.
//! Every line it cannot expand is left alone, so a misconfigured bundle never
//! blocks checkout.

use std::borrow::Cow;

use duobundle_products::{MIN_COMPONENTS, decode_component_reference};

use crate::schema::{
    Attribute, CartLine, CartOperation, CartTransformRunResult, ExpandOperation, ExpandedItem,
    Input, Merchandise,
};

/// Attribute on each expanded line naming the bundle variant it came from.
pub const PARENT_ATTRIBUTE: &str = "_bundle_parent";

/// Attribute on each expanded line giving its 1-based component position.
pub const COMPONENT_ATTRIBUTE: &str = "_bundle_component";

/// The shared "no changes" result.
pub static NO_CHANGES: CartTransformRunResult = CartTransformRunResult {
    operations: Vec::new(),
};

/// Expand every bundle line of the cart.
///
/// Returns a borrow of [`NO_CHANGES`] when nothing needs expanding, otherwise
/// one expand operation per bundle line, in line order.
pub fn run(input: &Input) -> Cow<'static, CartTransformRunResult> {
    let operations: Vec<CartOperation> = input.cart.lines.iter().filter_map(expand_line).collect();

    if operations.is_empty() {
        Cow::Borrowed(&NO_CHANGES)
    } else {
        Cow::Owned(CartTransformRunResult { operations })
    }
}

fn expand_line(line: &CartLine) -> Option<CartOperation> {
    let Merchandise::ProductVariant(variant) = &line.merchandise else {
        return None;
    };
    let payload = variant.component_reference.as_ref()?;
    let components = decode_component_reference(&payload.value)?;

    if components.len() < MIN_COMPONENTS || line.quantity < 1 {
        return None;
    }

    let expanded_cart_items = components
        .into_iter()
        .enumerate()
        .map(|(idx, merchandise_id)| ExpandedItem {
            merchandise_id: merchandise_id.into(),
            quantity: line.quantity,
            attributes: vec![
                Attribute::new(PARENT_ATTRIBUTE, variant.id.as_str()),
                Attribute::new(COMPONENT_ATTRIBUTE, (idx + 1).to_string()),
            ],
        })
        .collect();

    Some(CartOperation::Expand(ExpandOperation {
        cart_line_id: line.id.clone(),
        expanded_cart_items,
    }))
}
