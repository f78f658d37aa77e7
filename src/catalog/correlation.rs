use crate::models::{CatalogEntry, RosterRow};

/// How a catalog entry and a roster row are recognised as the same device.
///
/// Nothing outside this trait assumes what the join key is, so a stable
/// synthetic key can replace the name without touching the callers.
pub trait Correlation: Send + Sync {
    fn entry_key<'a>(&self, entry: &'a CatalogEntry) -> &'a str;
    fn row_key<'a>(&self, row: &'a RosterRow) -> &'a str;

    fn matches(&self, entry: &CatalogEntry, row: &RosterRow) -> bool {
        let key = self.entry_key(entry);
        !key.is_empty() && key == self.row_key(row)
    }
}

/// Exact string equality of device-type title and row name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByName;

impl Correlation for ByName {
    fn entry_key<'a>(&self, entry: &'a CatalogEntry) -> &'a str {
        &entry.title
    }

    fn row_key<'a>(&self, row: &'a RosterRow) -> &'a str {
        &row.name
    }
}
