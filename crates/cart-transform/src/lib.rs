//! Checkout-time expansion of bundle lines into their component lines.
//!
//! The platform invokes [`run`] once per cart compute pass with the cart
//! snapshot; each bundle variant line carrying a component-reference metafield
//! is replaced by one line per component variant.

pub mod run;
pub mod schema;

pub use run::{COMPONENT_ATTRIBUTE, NO_CHANGES, PARENT_ATTRIBUTE, run};
pub use schema::{
    Attribute, Cart, CartLine, CartOperation, CartTransformRunResult, ExpandOperation,
    ExpandedItem, Input, Merchandise, Metafield, ProductVariant,
};
