use serde::{Deserialize, Serialize};

use crate::identity::{RowId, RowOrigin};

/// One line of the device roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub id: RowId,
    pub name: String,
    pub tag_number: String,
    pub description: String,
    pub quantity: i64,
    /// Transient UI flag; cleared by commit and cancel.
    #[serde(default)]
    pub is_editing: bool,
}

impl RosterRow {
    /// Blank row for the operator to fill in.
    pub fn provisional(id: RowId) -> Self {
        Self {
            id,
            name: String::new(),
            tag_number: String::new(),
            description: String::new(),
            quantity: 1,
            is_editing: true,
        }
    }

    pub fn origin(&self) -> RowOrigin {
        RowOrigin::of(self.id)
    }

    pub fn is_provisional(&self) -> bool {
        self.origin().is_provisional()
    }

    pub fn fields(&self) -> RowFields {
        RowFields {
            name: self.name.clone(),
            tag_number: self.tag_number.clone(),
            description: self.description.clone(),
            quantity: self.quantity,
        }
    }

    pub fn restore(&mut self, fields: &RowFields) {
        self.name.clone_from(&fields.name);
        self.tag_number.clone_from(&fields.tag_number);
        self.description.clone_from(&fields.description);
        self.quantity = fields.quantity;
    }

    pub fn apply(&mut self, patch: &RowPatch) {
        if let Some(name) = &patch.name {
            self.name.clone_from(name);
        }
        if let Some(tag_number) = &patch.tag_number {
            self.tag_number.clone_from(tag_number);
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(is_editing) = patch.is_editing {
            self.is_editing = is_editing;
        }
    }
}

/// The four operator-editable fields of a row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RowFields {
    pub name: String,
    pub tag_number: String,
    pub description: String,
    pub quantity: i64,
}

/// Partial update; `None` leaves the field alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RowPatch {
    pub name: Option<String>,
    pub tag_number: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i64>,
    pub is_editing: Option<bool>,
}

impl RowPatch {
    /// Strips the editing flag so draft updates cannot toggle it.
    pub fn fields_only(mut self) -> Self {
        self.is_editing = None;
        self
    }
}

/// A roster row as handed to the point table generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssembledRow {
    pub id: RowId,
    pub name: String,
    pub tag_number: String,
    pub description: String,
    pub quantity: i64,
    /// 1-based position in the assembled roster.
    pub order: usize,
    pub station_name: String,
}
