pub mod correlation;
pub mod reconciler;

#[cfg(feature = "desktop")]
pub mod commands;

pub use correlation::{ByName, Correlation};
pub use reconciler::{CatalogEdit, CatalogSelector, SelectionChange};
