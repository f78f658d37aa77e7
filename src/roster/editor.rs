use crate::{
    error::{RosterError, RosterResult, ValidationError},
    identity::{IdentityAllocator, RowId},
    models::{RosterRow, RowPatch},
};

use super::store::RosterStore;

const ENABLE_LOGS: bool = true;
use crate::{log_info, log_warn};

/// Row-level editing on top of a [`RosterStore`].
///
/// At most one row is mid-edit at a time. Operations that would start or
/// finish an edit on some other row are rejected with
/// [`ValidationError::EditInProgress`] instead of being serialised.
pub struct RosterEditor<'a> {
    store: &'a mut RosterStore,
    allocator: IdentityAllocator,
}

impl<'a> RosterEditor<'a> {
    pub fn new(store: &'a mut RosterStore) -> Self {
        Self {
            store,
            allocator: IdentityAllocator::new(),
        }
    }

    /// Prepends a blank provisional row in edit mode.
    pub fn add(&mut self) -> RosterResult<RosterRow> {
        if let Some(editing) = self.store.editing_row() {
            log_warn!("add rejected: row {} is still being edited", editing.id);
            return Err(ValidationError::EditInProgress.into());
        }

        let allocator = self.allocator;
        self.store.transact(|rows, _| {
            let row = RosterRow::provisional(allocator.next_provisional_id(rows));
            rows.insert(0, row.clone());
            Ok(row)
        })
    }

    pub fn begin_edit(&mut self, id: RowId) -> RosterResult<()> {
        self.ensure_no_other_edit(id)?;
        self.store.transact(|rows, committed| {
            let row = find_mut(rows, id)?;
            if !row.is_provisional() {
                committed.entry(id).or_insert_with(|| row.fields());
            }
            row.is_editing = true;
            Ok(())
        })
    }

    /// Applies what the operator typed to the row being edited.
    pub fn update_draft(&mut self, id: RowId, patch: RowPatch) -> RosterResult<()> {
        self.ensure_no_other_edit(id)?;
        let patch = patch.fields_only();
        self.store.transact(|rows, committed| {
            let row = find_mut(rows, id)?;
            if !row.is_editing && !row.is_provisional() {
                committed.entry(id).or_insert_with(|| row.fields());
            }
            row.apply(&patch);
            row.is_editing = true;
            Ok(())
        })
    }

    /// Validates and saves the row. A provisional row is given a permanent id.
    ///
    /// A rejected commit leaves the row in edit mode with its draft intact.
    pub fn commit_edit(&mut self, id: RowId) -> RosterResult<RosterRow> {
        self.ensure_no_other_edit(id)?;

        let row = self.store.find(id).ok_or(RosterError::RowNotFound(id))?;
        if let Err(err) = validate(row) {
            log_warn!("commit of row {} rejected: {}", id, err);
            return Err(err.into());
        }

        let allocator = self.allocator;
        let committed_row = self.store.transact(|rows, committed| {
            let permanent_id = if id < 0 {
                allocator.next_manual_id(rows)
            } else {
                id
            };
            let row = find_mut(rows, id)?;
            row.id = permanent_id;
            row.is_editing = false;
            committed.remove(&id);
            committed.insert(permanent_id, row.fields());
            Ok(row.clone())
        })?;

        if committed_row.id != id {
            log_info!("provisional row {} committed as {}", id, committed_row.id);
        }
        Ok(committed_row)
    }

    /// Abandons the edit on `id`, found at `index` in the current roster.
    ///
    /// A provisional row is removed outright. A committed row gets its
    /// fields back as they were at the last commit.
    pub fn cancel_edit(&mut self, id: RowId, index: usize) -> RosterResult<()> {
        self.ensure_no_other_edit(id)?;
        self.store.transact(|rows, committed| {
            let index = match rows.get(index) {
                Some(row) if row.id == id => index,
                _ => rows
                    .iter()
                    .position(|row| row.id == id)
                    .ok_or(RosterError::RowNotFound(id))?,
            };

            if rows[index].is_provisional() {
                rows.remove(index);
                return Ok(());
            }

            let row = &mut rows[index];
            row.is_editing = false;
            if let Some(fields) = committed.get(&id) {
                row.restore(fields);
            }
            Ok(())
        })
    }

    /// Removes the row at `index`, whether or not it is being edited.
    pub fn delete(&mut self, index: usize) -> RosterResult<RosterRow> {
        self.store.transact(|rows, _| {
            if index >= rows.len() {
                return Err(RosterError::IndexOutOfRange(index));
            }
            Ok(rows.remove(index))
        })
    }

    fn ensure_no_other_edit(&self, id: RowId) -> RosterResult<()> {
        match self.store.editing_row() {
            Some(editing) if editing.id != id => {
                log_warn!(
                    "operation on row {} rejected: row {} is being edited",
                    id,
                    editing.id
                );
                Err(ValidationError::EditInProgress.into())
            }
            _ => Ok(()),
        }
    }
}

/// Checks applied when a row is saved.
pub fn validate(row: &RosterRow) -> Result<(), ValidationError> {
    validate_fields(&row.tag_number, row.quantity)
}

pub(crate) fn validate_fields(tag: &str, quantity: i64) -> Result<(), ValidationError> {
    if tag.trim().is_empty() {
        return Err(ValidationError::EmptyTag);
    }
    if quantity <= 0 {
        return Err(ValidationError::NonPositiveQuantity);
    }
    Ok(())
}

fn find_mut(rows: &mut [RosterRow], id: RowId) -> RosterResult<&mut RosterRow> {
    rows.iter_mut()
        .find(|row| row.id == id)
        .ok_or(RosterError::RowNotFound(id))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::identity::MANUAL_ID_BASE;
    use crate::session::SessionContext;

    fn row(id: RowId, name: &str, tag: &str, quantity: i64) -> RosterRow {
        RosterRow {
            id,
            name: name.into(),
            tag_number: tag.into(),
            description: String::new(),
            quantity,
            is_editing: false,
        }
    }

    fn store_with(rows: Vec<RosterRow>) -> RosterStore {
        let mut store = RosterStore::new(Arc::new(SessionContext::new()));
        store.replace(rows).unwrap();
        store
    }

    fn draft(tag: &str, quantity: i64) -> RowPatch {
        RowPatch {
            tag_number: Some(tag.into()),
            quantity: Some(quantity),
            ..RowPatch::default()
        }
    }

    #[test]
    fn add_then_cancel_restores_roster() {
        let original = vec![row(1, "阀门", "INV-001", 10)];
        let mut store = store_with(original.clone());
        let mut editor = RosterEditor::new(&mut store);

        let added = editor.add().unwrap();
        assert_eq!(added.id, -1);
        assert!(added.is_editing);
        assert_eq!(store.len(), 2);
        assert_eq!(store.rows()[0], added);

        RosterEditor::new(&mut store).cancel_edit(-1, 0).unwrap();
        assert_eq!(store.get(), original);
    }

    #[test]
    fn add_rejected_while_editing() {
        let mut store = store_with(vec![row(1, "阀门", "INV-001", 10)]);
        let mut editor = RosterEditor::new(&mut store);
        editor.begin_edit(1).unwrap();
        assert_eq!(
            editor.add().unwrap_err().validation(),
            Some(ValidationError::EditInProgress)
        );
    }

    #[test]
    fn begin_edit_rejected_for_second_row() {
        let mut store = store_with(vec![row(1, "阀门", "A", 1), row(2, "流量计", "B", 1)]);
        let mut editor = RosterEditor::new(&mut store);
        editor.begin_edit(1).unwrap();
        assert!(editor.begin_edit(2).is_err());
        // Re-entering the same row is fine.
        editor.begin_edit(1).unwrap();
        assert_eq!(store.editing_row().unwrap().id, 1);
    }

    #[test]
    fn commit_validates_tag_and_quantity() {
        let mut store = store_with(vec![row(1, "阀门", "INV-001", 10)]);
        let mut editor = RosterEditor::new(&mut store);
        editor.begin_edit(1).unwrap();

        for (tag, quantity, expected) in [
            ("", 1, ValidationError::EmptyTag),
            ("   ", 1, ValidationError::EmptyTag),
            ("INV-002", 0, ValidationError::NonPositiveQuantity),
            ("INV-002", -1, ValidationError::NonPositiveQuantity),
        ] {
            editor.update_draft(1, draft(tag, quantity)).unwrap();
            let err = editor.commit_edit(1).unwrap_err();
            assert_eq!(err.validation(), Some(expected), "tag={tag:?} qty={quantity}");
        }
        assert!(store.find(1).unwrap().is_editing);

        let mut editor = RosterEditor::new(&mut store);
        editor.update_draft(1, draft("INV-002", 1)).unwrap();
        let saved = editor.commit_edit(1).unwrap();
        assert!(!saved.is_editing);
        assert_eq!(store.committed(1).unwrap().tag_number, "INV-002");
    }

    #[test]
    fn cancel_rolls_back_draft() {
        let mut store = store_with(vec![row(1, "阀门", "INV-001", 10)]);
        let mut editor = RosterEditor::new(&mut store);
        editor.begin_edit(1).unwrap();
        editor
            .update_draft(
                1,
                RowPatch {
                    name: Some("压缩机".into()),
                    tag_number: Some("XXX".into()),
                    description: Some("typed".into()),
                    quantity: Some(99),
                    is_editing: None,
                },
            )
            .unwrap();
        editor.cancel_edit(1, 0).unwrap();

        assert_eq!(store.get(), vec![row(1, "阀门", "INV-001", 10)]);
    }

    #[test]
    fn cancel_restores_last_commit_not_initial_load() {
        let mut store = store_with(vec![row(1, "阀门", "INV-001", 10)]);
        let mut editor = RosterEditor::new(&mut store);
        editor.update_draft(1, draft("INV-002", 5)).unwrap();
        editor.commit_edit(1).unwrap();
        editor.update_draft(1, draft("INV-003", 7)).unwrap();
        editor.cancel_edit(1, 0).unwrap();

        let restored = store.find(1).unwrap();
        assert_eq!(restored.tag_number, "INV-002");
        assert_eq!(restored.quantity, 5);
    }

    #[test]
    fn committed_provisional_row_gets_manual_id() {
        let mut store = store_with(vec![row(1, "阀门", "INV-001", 10)]);
        let mut editor = RosterEditor::new(&mut store);
        let added = editor.add().unwrap();
        editor
            .update_draft(
                added.id,
                RowPatch {
                    name: Some("干燥器".into()),
                    tag_number: Some("SUB-001".into()),
                    ..RowPatch::default()
                },
            )
            .unwrap();
        let saved = editor.commit_edit(added.id).unwrap();
        assert_eq!(saved.id, MANUAL_ID_BASE);

        // A later cancelled edit restores instead of deleting it.
        editor.update_draft(saved.id, draft("CHANGED", 3)).unwrap();
        editor.cancel_edit(saved.id, 0).unwrap();
        let row = store.find(MANUAL_ID_BASE).unwrap();
        assert_eq!(row.tag_number, "SUB-001");
        assert_eq!(row.quantity, 1);
    }

    #[test]
    fn cancel_falls_back_to_lookup_by_id() {
        let mut store = store_with(vec![row(1, "阀门", "A", 1), row(2, "流量计", "B", 1)]);
        let mut editor = RosterEditor::new(&mut store);
        editor.add().unwrap();
        // Stale index: the provisional row is at 0, not 2.
        editor.cancel_edit(-1, 2).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.find(-1).is_none());
    }

    #[test]
    fn delete_is_unconditional() {
        let mut store = store_with(vec![row(1, "阀门", "A", 1), row(2, "流量计", "B", 1)]);
        let mut editor = RosterEditor::new(&mut store);
        editor.begin_edit(2).unwrap();
        let removed = editor.delete(1).unwrap();
        assert_eq!(removed.id, 2);
        assert!(editor.delete(5).is_err());
        assert!(store.editing_row().is_none());
    }
}
