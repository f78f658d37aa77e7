use serde::{Deserialize, Serialize};

/// A fixed device type offered by the selector, with the values a fresh
/// selection starts from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceType {
    pub name: String,
    pub default_tag: String,
    #[serde(default)]
    pub default_description: String,
    pub default_quantity: i64,
}

/// One device type as shown in the dual-list selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Position in the catalog, as a string.
    pub key: String,
    pub title: String,
    pub tag: String,
    pub description: String,
    pub quantity: i64,
    pub selected: bool,
    #[serde(skip)]
    pub device: DeviceType,
}

impl CatalogEntry {
    pub fn new(position: usize, device: DeviceType) -> Self {
        Self {
            key: position.to_string(),
            title: device.name.clone(),
            tag: String::new(),
            description: String::new(),
            quantity: 0,
            selected: false,
            device,
        }
    }

    pub(crate) fn bind(&mut self, tag: &str, description: &str, quantity: i64) {
        self.tag = tag.to_string();
        self.description = description.to_string();
        self.quantity = quantity;
        self.selected = true;
    }

    pub(crate) fn bind_defaults(&mut self) {
        self.tag.clone_from(&self.device.default_tag);
        self.description.clone_from(&self.device.default_description);
        self.quantity = self.device.default_quantity;
        self.selected = true;
    }

    pub(crate) fn release(&mut self) {
        self.tag.clear();
        self.description.clear();
        self.quantity = 0;
        self.selected = false;
    }
}
