use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use serde::Serialize;
use tokio::sync::watch;

use crate::{
    error::{RosterError, RosterResult},
    identity::RowId,
    models::{RosterRow, RowFields, RowPatch},
    session::{DeviceTableData, DeviceTableSlot},
};

const ENABLE_LOGS: bool = true;
use crate::log_debug;

/// Full roster as published to subscribers.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterSnapshot {
    pub revision: u64,
    pub rows: Vec<RosterRow>,
}

/// The authoritative roster.
///
/// Alongside the live rows the store keeps the last committed field values
/// for every id. Draft edits only touch the live rows, which is what lets a
/// cancelled edit be rolled back.
///
/// Every successful mutation bumps the revision, is mirrored into the
/// session's device table slot and is published on a watch channel.
/// Subscribers pick the latest snapshot up on their own task; the store
/// never calls back into them.
pub struct RosterStore {
    rows: Vec<RosterRow>,
    committed: BTreeMap<RowId, RowFields>,
    revision: u64,
    notifier: watch::Sender<RosterSnapshot>,
    persistence: Arc<dyn DeviceTableSlot>,
}

impl RosterStore {
    pub fn new(persistence: Arc<dyn DeviceTableSlot>) -> Self {
        let (notifier, _) = watch::channel(RosterSnapshot::default());
        Self {
            rows: Vec::new(),
            committed: BTreeMap::new(),
            revision: 0,
            notifier,
            persistence,
        }
    }

    /// Rebuilds the store from whatever the session saved last time.
    pub fn restore(persistence: Arc<dyn DeviceTableSlot>) -> Self {
        let saved = persistence.device_table();
        let mut store = Self::new(persistence);
        if let Some(DeviceTableData { rows, committed }) = saved {
            store.rows = rows;
            store.committed = committed;
            store.publish();
        }
        store
    }

    /// Re-reads the session slot, e.g. after another screen changed it.
    pub fn reload(&mut self) {
        let saved = self.persistence.device_table().unwrap_or_default();
        self.rows = saved.rows;
        self.committed = saved.committed;
        self.publish();
    }

    pub fn has_saved_state(&self) -> bool {
        self.persistence
            .device_table()
            .is_some_and(|data| !data.is_empty())
    }

    /// Current rows, copied.
    pub fn get(&self) -> Vec<RosterRow> {
        self.rows.clone()
    }

    pub fn rows(&self) -> &[RosterRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn find(&self, id: RowId) -> Option<&RosterRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn position(&self, id: RowId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    pub fn editing_row(&self) -> Option<&RosterRow> {
        self.rows.iter().find(|row| row.is_editing)
    }

    /// Last committed values for `id`.
    pub fn committed(&self, id: RowId) -> Option<&RowFields> {
        self.committed.get(&id)
    }

    pub fn subscribe(&self) -> watch::Receiver<RosterSnapshot> {
        self.notifier.subscribe()
    }

    /// Swaps in a whole new roster.
    ///
    /// Rows that are not mid-edit become the new committed baseline; rows
    /// that are keep the baseline they had.
    pub fn replace(&mut self, rows: Vec<RosterRow>) -> RosterResult<()> {
        ensure_unique_ids(&rows)?;

        let mut committed = BTreeMap::new();
        for row in &rows {
            if !row.is_editing {
                committed.insert(row.id, row.fields());
            } else if let Some(previous) = self.committed.get(&row.id) {
                committed.insert(row.id, previous.clone());
            }
        }

        self.rows = rows;
        self.committed = committed;
        self.publish();
        Ok(())
    }

    pub fn patch_in_place(&mut self, id: RowId, patch: &RowPatch) -> RosterResult<()> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(RosterError::RowNotFound(id))?;
        row.apply(patch);
        self.publish();
        Ok(())
    }

    /// Runs `f` against a working copy and keeps the result only if `f`
    /// succeeds, so a rejected operation leaves no trace.
    pub(crate) fn transact<T>(
        &mut self,
        f: impl FnOnce(&mut Vec<RosterRow>, &mut BTreeMap<RowId, RowFields>) -> RosterResult<T>,
    ) -> RosterResult<T> {
        let mut rows = self.rows.clone();
        let mut committed = self.committed.clone();
        let value = f(&mut rows, &mut committed)?;
        ensure_unique_ids(&rows)?;

        committed.retain(|id, _| rows.iter().any(|row| row.id == *id));
        self.rows = rows;
        self.committed = committed;
        self.publish();
        Ok(value)
    }

    fn publish(&mut self) {
        self.revision += 1;
        log_debug!(
            "roster revision {} ({} rows)",
            self.revision,
            self.rows.len()
        );

        self.persistence.set_device_table(DeviceTableData {
            rows: self.rows.clone(),
            committed: self.committed.clone(),
        });
        self.notifier.send_replace(RosterSnapshot {
            revision: self.revision,
            rows: self.rows.clone(),
        });
    }
}

fn ensure_unique_ids(rows: &[RosterRow]) -> RosterResult<()> {
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.id) {
            return Err(RosterError::DuplicateRowId(row.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn store() -> (RosterStore, SessionContext) {
        let session = SessionContext::new();
        (RosterStore::new(Arc::new(session.clone())), session)
    }

    #[test]
    fn replace_rejects_duplicate_ids() {
        let (mut store, _) = store();
        let err = store
            .replace(vec![row(1, "阀门", "A", 1), row(1, "流量计", "B", 1)])
            .unwrap_err();
        assert_eq!(err, RosterError::DuplicateRowId(1));
        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn replace_mirrors_into_session() {
        let (mut store, session) = store();
        store.replace(vec![row(1, "阀门", "INV-001", 10)]).unwrap();

        let saved = session.device_table().unwrap();
        assert_eq!(saved.rows, store.get());
        assert_eq!(saved.committed.get(&1).unwrap().tag_number, "INV-001");
    }

    #[test]
    fn get_returns_a_copy() {
        let (mut store, _) = store();
        store.replace(vec![row(1, "阀门", "INV-001", 10)]).unwrap();
        let mut copy = store.get();
        copy[0].tag_number = "changed".into();
        assert_eq!(store.rows()[0].tag_number, "INV-001");
    }

    #[test]
    fn patch_leaves_baseline_alone() {
        let (mut store, _) = store();
        store.replace(vec![row(1, "阀门", "INV-001", 10)]).unwrap();
        store
            .patch_in_place(
                1,
                &RowPatch {
                    tag_number: Some("INV-999".into()),
                    ..RowPatch::default()
                },
            )
            .unwrap();

        assert_eq!(store.find(1).unwrap().tag_number, "INV-999");
        assert_eq!(store.committed(1).unwrap().tag_number, "INV-001");
    }

    #[test]
    fn patch_unknown_row_fails() {
        let (mut store, _) = store();
        assert_eq!(
            store.patch_in_place(7, &RowPatch::default()),
            Err(RosterError::RowNotFound(7))
        );
    }

    #[test]
    fn editing_rows_keep_previous_baseline_on_replace() {
        let (mut store, _) = store();
        store.replace(vec![row(1, "阀门", "INV-001", 10)]).unwrap();

        let mut editing = row(1, "阀门", "draft", 3);
        editing.is_editing = true;
        store.replace(vec![editing]).unwrap();

        assert_eq!(store.committed(1).unwrap().tag_number, "INV-001");
    }

    #[test]
    fn failed_transaction_changes_nothing() {
        let (mut store, _) = store();
        store.replace(vec![row(1, "阀门", "INV-001", 10)]).unwrap();
        let revision = store.revision();

        let result: RosterResult<()> = store.transact(|rows, _| {
            rows.clear();
            Err(RosterError::IndexOutOfRange(3))
        });

        assert!(result.is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn subscribers_see_latest_snapshot() {
        let (mut store, _) = store();
        let mut receiver = store.subscribe();
        store.replace(vec![row(1, "阀门", "INV-001", 10)]).unwrap();
        store.replace(vec![row(2, "流量计", "DCB-001", 20)]).unwrap();

        assert!(receiver.has_changed().unwrap());
        let snapshot = receiver.borrow_and_update().clone();
        assert_eq!(snapshot.revision, 2);
        assert_eq!(snapshot.rows[0].name, "流量计");
    }

    #[test]
    fn restore_reads_saved_table() {
        let (mut store, session) = store();
        let mut editing = row(1, "阀门", "draft", 10);
        store.replace(vec![row(1, "阀门", "INV-001", 10)]).unwrap();
        editing.is_editing = true;
        store
            .patch_in_place(
                1,
                &RowPatch {
                    tag_number: Some("draft".into()),
                    is_editing: Some(true),
                    ..RowPatch::default()
                },
            )
            .unwrap();

        let restored = RosterStore::restore(Arc::new(session));
        assert_eq!(restored.get(), vec![editing]);
        assert_eq!(restored.committed(1).unwrap().tag_number, "INV-001");
    }
}
