//! Domain model, pricing, and document derivation for NLGD estimates.

pub mod catalog;
pub mod document;
pub mod model;
pub mod numbering;
pub mod pricing;
pub mod validate;

pub use catalog::{builtin_catalog, catalog_by_type, filter_catalog};
pub use model::*;
pub use pricing::{DocumentTotals, Priceable};
pub use validate::ValidationError;

pub const CRATE_NAME: &str = "nlgd-core";
