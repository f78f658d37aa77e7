use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::{RosterError, RosterResult},
    identity::{IdentityAllocator, RowOrigin},
    models::{CatalogEntry, DeviceType, RosterRow},
    roster::editor::validate_fields,
};

use super::correlation::{ByName, Correlation};

const ENABLE_LOGS: bool = true;
use crate::{log_debug, log_warn};

/// Bound values the operator may change on a selected entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEdit {
    pub tag: String,
    #[serde(default)]
    pub description: String,
    pub quantity: i64,
}

/// One operator gesture in the dual-list selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SelectionChange {
    /// Move entries from the available side to the selected side.
    Select { keys: Vec<String> },
    /// Move entries back to the available side.
    Deselect { keys: Vec<String> },
    /// Change the bound values of a selected entry in place.
    Edit { key: String, edit: CatalogEdit },
}

/// The fixed device-type catalog and which of its entries are bound into
/// the roster.
///
/// Entries and roster rows are correlated through `C`; by default an entry
/// is bound when a row carries its title as name.
pub struct CatalogSelector<C: Correlation = ByName> {
    entries: Vec<CatalogEntry>,
    correlation: C,
    allocator: IdentityAllocator,
}

impl CatalogSelector<ByName> {
    pub fn new(devices: Vec<DeviceType>) -> Self {
        Self::with_correlation(devices, ByName)
    }
}

impl<C: Correlation> CatalogSelector<C> {
    pub fn with_correlation(devices: Vec<DeviceType>, correlation: C) -> Self {
        let entries = devices
            .into_iter()
            .enumerate()
            .map(|(position, device)| CatalogEntry::new(position, device))
            .collect();
        Self {
            entries,
            correlation,
            allocator: IdentityAllocator::new(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, key: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Current selected set, in catalog order.
    pub fn selected(&self) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.selected)
            .cloned()
            .collect()
    }

    pub fn available(&self) -> Vec<CatalogEntry> {
        self.entries
            .iter()
            .filter(|entry| !entry.selected)
            .cloned()
            .collect()
    }

    /// Applies an operator change and returns the full selected set.
    pub fn push_selection(&mut self, change: SelectionChange) -> RosterResult<Vec<CatalogEntry>> {
        match change {
            SelectionChange::Select { keys } => self.select(&keys),
            SelectionChange::Deselect { keys } => self.deselect(&keys),
            SelectionChange::Edit { key, edit } => self.edit_selected(&key, edit),
        }
    }

    /// Entries already selected keep their bound values; newly selected
    /// ones start from their device defaults.
    pub fn select(&mut self, keys: &[String]) -> RosterResult<Vec<CatalogEntry>> {
        self.ensure_known(keys)?;
        for entry in self.entries.iter_mut() {
            if !entry.selected && keys.contains(&entry.key) {
                entry.bind_defaults();
            }
        }
        Ok(self.selected())
    }

    pub fn deselect(&mut self, keys: &[String]) -> RosterResult<Vec<CatalogEntry>> {
        self.ensure_known(keys)?;
        for entry in self.entries.iter_mut() {
            if keys.contains(&entry.key) {
                entry.release();
            }
        }
        Ok(self.selected())
    }

    pub fn edit_selected(&mut self, key: &str, edit: CatalogEdit) -> RosterResult<Vec<CatalogEntry>> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.key == key)
            .ok_or_else(|| RosterError::UnknownCatalogKey(key.to_string()))?;
        if !entry.selected {
            return Err(RosterError::CatalogEntryNotSelected(key.to_string()));
        }
        if let Err(err) = validate_fields(&edit.tag, edit.quantity) {
            log_warn!("edit of catalog entry {} rejected: {}", key, err);
            return Err(err.into());
        }

        entry.bind(edit.tag.trim(), &edit.description, edit.quantity);
        Ok(self.selected())
    }

    /// Re-derives selection from a roster snapshot.
    ///
    /// An entry matched by some row copies that row's values and becomes
    /// selected; every other entry is released.
    pub fn pull_roster(&mut self, rows: &[RosterRow]) {
        let correlation = &self.correlation;
        for entry in self.entries.iter_mut() {
            match rows.iter().find(|row| correlation.matches(entry, row)) {
                Some(row) => entry.bind(&row.tag_number, &row.description, row.quantity),
                None => entry.release(),
            }
        }
        log_debug!(
            "catalog pulled from {} rows: {} selected",
            rows.len(),
            self.entries.iter().filter(|entry| entry.selected).count()
        );
    }

    /// Builds the roster that follows from the current selection.
    ///
    /// Rows that did not come from the catalog are kept as they are, in
    /// order. Catalog rows are dropped and re-materialised from the selected
    /// entries, except for entries already carried by a kept row.
    pub fn rebuild(&self, roster: &[RosterRow]) -> RosterResult<Vec<RosterRow>> {
        let kept: Vec<RosterRow> = roster
            .iter()
            .filter(|row| row.origin() != RowOrigin::Catalog)
            .cloned()
            .collect();
        let carried: HashSet<&str> = kept
            .iter()
            .map(|row| self.correlation.row_key(row))
            .collect();

        let mut materialised = Vec::new();
        for entry in self.entries.iter().filter(|entry| entry.selected) {
            if carried.contains(self.correlation.entry_key(entry)) {
                continue;
            }
            materialised.push(RosterRow {
                id: self.allocator.catalog_derived_id(&entry.key)?,
                name: entry.title.clone(),
                tag_number: entry.tag.clone(),
                description: entry.description.clone(),
                quantity: entry.quantity,
                is_editing: false,
            });
        }

        Ok(kept.into_iter().chain(materialised).collect())
    }

    fn ensure_known(&self, keys: &[String]) -> RosterResult<()> {
        match keys.iter().find(|key| self.entry(key).is_none()) {
            Some(unknown) => Err(RosterError::UnknownCatalogKey(unknown.clone())),
            None => Ok(()),
        }
    }
}
