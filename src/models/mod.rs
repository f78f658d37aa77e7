pub mod catalog;
pub mod equipment;
pub mod roster;

pub use catalog::{CatalogEntry, DeviceType};
pub use equipment::{EquipmentItem, ProjectInfo};
pub use roster::{AssembledRow, RosterRow, RowFields, RowPatch};
