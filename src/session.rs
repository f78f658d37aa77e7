//! Cross-navigation session state.
//!
//! One `SessionContext` is created per window and handed to every consumer
//! that needs it. Consumers only see the slot trait they are given.

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::identity::RowId;
use crate::models::{EquipmentItem, ProjectInfo, RosterRow, RowFields};

/// Saved device table: live rows plus the committed values behind them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTableData {
    pub rows: Vec<RosterRow>,
    #[serde(default)]
    pub committed: BTreeMap<RowId, RowFields>,
}

impl DeviceTableData {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub project_data: Vec<ProjectInfo>,
    pub selected_project: Option<ProjectInfo>,
    pub equipment_data: Vec<EquipmentItem>,
    pub device_table_data: Option<DeviceTableData>,
    pub station_number: String,
}

pub trait ProjectSlot {
    fn projects(&self) -> Vec<ProjectInfo>;
    fn selected_project(&self) -> Option<ProjectInfo>;
    /// Returns `true` when the selection changed, in which case the
    /// previous project's equipment and device table are gone.
    fn select_project(&self, project: Option<ProjectInfo>) -> bool;
    fn station_number(&self) -> String;
    fn set_station_number(&self, station_number: String);
}

pub trait EquipmentSlot {
    fn equipment(&self) -> Vec<EquipmentItem>;
    fn set_equipment(&self, equipment: Vec<EquipmentItem>);
}

pub trait DeviceTableSlot: Send + Sync {
    fn device_table(&self) -> Option<DeviceTableData>;
    fn set_device_table(&self, data: DeviceTableData);
}

#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<SessionSnapshot>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(snapshot)),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&SessionSnapshot) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut SessionSnapshot) -> T) -> T {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(Clone::clone)
    }

    pub fn restore(&self, snapshot: SessionSnapshot) {
        self.write(|state| *state = snapshot);
    }

    /// The "clear form" action.
    pub fn clear(&self) {
        self.write(|state| *state = SessionSnapshot::default());
    }

    /// Records the results of a new project query. Everything derived from
    /// the previous query is invalidated.
    pub fn begin_project_query(&self, projects: Vec<ProjectInfo>) {
        self.write(|state| {
            state.project_data = projects;
            state.selected_project = None;
            drop_derived(state);
        });
    }

    /// Equipment looked up for a station replaces whatever table was
    /// derived from the previous lookup. A selected project for some other
    /// station is deselected so the roster and its station stay paired.
    pub fn record_station_equipment(&self, station: &str, equipment: Vec<EquipmentItem>) {
        self.write(|state| {
            let other_station = state
                .selected_project
                .as_ref()
                .is_some_and(|project| project.station_name.trim() != station);
            if other_station {
                state.selected_project = None;
            }
            state.station_number = station.to_string();
            state.equipment_data = equipment;
            state.device_table_data = None;
        });
    }

    /// Station the roster is built for: the selected project's station,
    /// falling back to the manually entered station number.
    pub fn station_id(&self) -> Option<String> {
        self.read(|state| {
            state
                .selected_project
                .as_ref()
                .map(|project| project.station_name.trim().to_string())
                .filter(|name| !name.is_empty())
                .or_else(|| {
                    let number = state.station_number.trim();
                    (!number.is_empty()).then(|| number.to_string())
                })
        })
    }
}

fn drop_derived(state: &mut SessionSnapshot) {
    state.equipment_data.clear();
    state.device_table_data = None;
}

impl ProjectSlot for SessionContext {
    fn projects(&self) -> Vec<ProjectInfo> {
        self.read(|state| state.project_data.clone())
    }

    fn selected_project(&self) -> Option<ProjectInfo> {
        self.read(|state| state.selected_project.clone())
    }

    fn select_project(&self, project: Option<ProjectInfo>) -> bool {
        self.write(|state| {
            let changed = state.selected_project != project;
            if changed {
                drop_derived(state);
            }
            state.selected_project = project;
            changed
        })
    }

    fn station_number(&self) -> String {
        self.read(|state| state.station_number.clone())
    }

    fn set_station_number(&self, station_number: String) {
        self.write(|state| state.station_number = station_number);
    }
}

impl EquipmentSlot for SessionContext {
    fn equipment(&self) -> Vec<EquipmentItem> {
        self.read(|state| state.equipment_data.clone())
    }

    fn set_equipment(&self, equipment: Vec<EquipmentItem>) {
        self.write(|state| state.equipment_data = equipment);
    }
}

impl DeviceTableSlot for SessionContext {
    fn device_table(&self) -> Option<DeviceTableData> {
        self.read(|state| state.device_table_data.clone())
    }

    fn set_device_table(&self, data: DeviceTableData) {
        self.write(|state| state.device_table_data = Some(data));
    }
}
