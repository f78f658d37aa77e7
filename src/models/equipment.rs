use serde::{Deserialize, Serialize};

/// Project record returned by the project lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectInfo {
    pub id: String,
    pub project_name: String,
    pub project_number: String,
    #[serde(default)]
    pub design_number: String,
    #[serde(default)]
    pub customer_name: String,
    pub station_name: String,
}

/// Source equipment line for a station.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EquipmentItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub tech_param: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub external_param: String,
}
