use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::{
    catalog::{ByName, CatalogSelector, Correlation, SelectionChange},
    error::{RosterResult, ValidationError},
    identity::{IdentityAllocator, RowId},
    models::{AssembledRow, CatalogEntry, DeviceType, EquipmentItem, RosterRow, RowPatch},
    session::{EquipmentSlot, SessionContext},
};

use super::{
    assembler::assemble,
    editor::RosterEditor,
    store::{RosterSnapshot, RosterStore},
};

const ENABLE_LOGS: bool = true;
use crate::{log_info, log_warn};

/// Everything the device table screen renders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterView {
    pub revision: u64,
    pub rows: Vec<RosterRow>,
    pub catalog: Vec<CatalogEntry>,
}

/// Keeps the roster table and the catalog selector consistent.
///
/// Editor operations are followed by a pull of the roster into the
/// selector; selector operations are followed by a rebuild of the roster
/// from the selection.
pub struct RosterController<C: Correlation = ByName> {
    store: RosterStore,
    selector: CatalogSelector<C>,
    session: SessionContext,
    allocator: IdentityAllocator,
    initial_selection: Vec<String>,
}

impl RosterController<ByName> {
    pub fn new(
        session: SessionContext,
        catalog: Vec<DeviceType>,
        initial_selection: Vec<String>,
    ) -> Self {
        Self::with_selector(session, CatalogSelector::new(catalog), initial_selection)
    }
}

impl<C: Correlation> RosterController<C> {
    pub fn with_selector(
        session: SessionContext,
        mut selector: CatalogSelector<C>,
        initial_selection: Vec<String>,
    ) -> Self {
        let store = RosterStore::restore(Arc::new(session.clone()));
        selector.pull_roster(store.rows());
        Self {
            store,
            selector,
            session,
            allocator: IdentityAllocator::new(),
            initial_selection,
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn rows(&self) -> &[RosterRow] {
        self.store.rows()
    }

    pub fn catalog(&self) -> &[CatalogEntry] {
        self.selector.entries()
    }

    pub fn selected(&self) -> Vec<CatalogEntry> {
        self.selector.selected()
    }

    pub fn available(&self) -> Vec<CatalogEntry> {
        self.selector.available()
    }

    pub fn view(&self) -> RosterView {
        RosterView {
            revision: self.store.revision(),
            rows: self.store.get(),
            catalog: self.selector.entries().to_vec(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RosterSnapshot> {
        self.store.subscribe()
    }

    /// Populates the roster when the screen is entered.
    ///
    /// A saved device table wins; otherwise the station's source equipment
    /// is converted; otherwise the configured initial selection is used.
    pub fn load(&mut self) -> RosterResult<RosterView> {
        if self.store.has_saved_state() {
            self.store.reload();
            log_info!("roster restored with {} rows", self.store.len());
        } else {
            let equipment = self.session.equipment();
            if !equipment.is_empty() {
                let rows = self.convert_equipment(&equipment)?;
                log_info!("roster built from {} equipment items", rows.len());
                self.store.replace(rows)?;
            } else {
                self.selector.pull_roster(&[]);
                let keys = self.initial_selection.clone();
                self.selector.select(&keys)?;
                let rows = self.selector.rebuild(&[])?;
                self.store.replace(rows)?;
            }
        }

        self.selector.pull_roster(self.store.rows());
        Ok(self.view())
    }

    /// Source items become committed rows numbered from 1.
    pub fn convert_equipment(&self, items: &[EquipmentItem]) -> RosterResult<Vec<RosterRow>> {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                Ok(RosterRow {
                    id: self.allocator.source_derived_id(index)?,
                    name: item.name.clone(),
                    tag_number: format!("TAG-{}", item.id),
                    description: item.tech_param.clone(),
                    quantity: source_quantity(item),
                    is_editing: false,
                })
            })
            .collect()
    }

    pub fn add(&mut self) -> RosterResult<RosterRow> {
        let row = RosterEditor::new(&mut self.store).add()?;
        self.pull();
        Ok(row)
    }

    pub fn begin_edit(&mut self, id: RowId) -> RosterResult<()> {
        RosterEditor::new(&mut self.store).begin_edit(id)?;
        self.pull();
        Ok(())
    }

    pub fn update_draft(&mut self, id: RowId, patch: RowPatch) -> RosterResult<()> {
        RosterEditor::new(&mut self.store).update_draft(id, patch)?;
        self.pull();
        Ok(())
    }

    pub fn commit_edit(&mut self, id: RowId) -> RosterResult<RosterRow> {
        let row = RosterEditor::new(&mut self.store).commit_edit(id)?;
        self.pull();
        Ok(row)
    }

    pub fn cancel_edit(&mut self, id: RowId, index: usize) -> RosterResult<()> {
        RosterEditor::new(&mut self.store).cancel_edit(id, index)?;
        self.pull();
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> RosterResult<RosterRow> {
        let row = RosterEditor::new(&mut self.store).delete(index)?;
        self.pull();
        Ok(row)
    }

    /// Applies a selector change and rebuilds the roster from the result.
    ///
    /// Refused while a row is mid-edit, since the rebuild would replace
    /// catalog rows underneath it.
    pub fn push_selection(&mut self, change: SelectionChange) -> RosterResult<Vec<CatalogEntry>> {
        if let Some(editing) = self.store.editing_row() {
            log_warn!("selection change refused: row {} is being edited", editing.id);
            return Err(ValidationError::EditInProgress.into());
        }

        let result = self
            .selector
            .push_selection(change)
            .and_then(|_| self.selector.rebuild(self.store.rows()))
            .and_then(|rows| self.store.replace(rows));

        // Either way the selector ends up mirroring the store.
        self.pull();
        result.map(|()| self.selector.selected())
    }

    /// Fails closed while a row is mid-edit or no station is chosen.
    pub fn assemble(&self) -> Result<Vec<AssembledRow>, ValidationError> {
        assemble(self.store.rows(), self.session.station_id().as_deref())
    }

    /// The "clear form" action: drops the whole session and the roster.
    pub fn reset(&mut self) -> RosterResult<()> {
        self.session.clear();
        self.store.replace(Vec::new())?;
        self.pull();
        Ok(())
    }

    fn pull(&mut self) {
        self.selector.pull_roster(self.store.rows());
    }
}

/// Source quantities are fractional and may be missing. A row always
/// carries at least one unit.
fn source_quantity(item: &EquipmentItem) -> i64 {
    let raw = item.quantity;
    let rounded = if raw.is_finite() { raw.round() } else { 0.0 };
    if rounded < 1.0 {
        log_warn!("equipment {} has quantity {raw}, using 1", item.id);
        return 1;
    }
    rounded as i64
}
