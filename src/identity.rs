//! Row identity bands.
//!
//! Every roster row carries an integer id whose range tells where the row
//! came from:
//!
//! | band            | range            | allocated by                    |
//! |-----------------|------------------|---------------------------------|
//! | provisional     | `< 0`            | operator "add", not yet saved   |
//! | source          | `1..1000`        | source equipment item position  |
//! | catalog         | `1000..2000`     | catalog selection (key + 1000)  |
//! | manual          | `>= 2000`        | commit of a provisional row     |
//!
//! Allocation in the provisional and manual bands is monotonic over the rows
//! currently in the roster, so a new id never equals a live one. The source
//! and catalog bands are bounded and allocation past them is an error.

use serde::{Deserialize, Serialize};

use crate::error::IdentityError;
use crate::models::RosterRow;

pub type RowId = i64;

pub const CATALOG_ID_OFFSET: RowId = 1000;
pub const CATALOG_CAPACITY: usize = 1000;
pub const MANUAL_ID_BASE: RowId = CATALOG_ID_OFFSET + CATALOG_CAPACITY as RowId;

/// Largest number of source equipment items that fit below the catalog band.
pub const SOURCE_CAPACITY: usize = (CATALOG_ID_OFFSET - 1) as usize;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RowOrigin {
    Provisional,
    Source,
    Catalog,
    Manual,
}

impl RowOrigin {
    pub fn of(id: RowId) -> Self {
        if id < 0 {
            RowOrigin::Provisional
        } else if id < CATALOG_ID_OFFSET {
            RowOrigin::Source
        } else if id < MANUAL_ID_BASE {
            RowOrigin::Catalog
        } else {
            RowOrigin::Manual
        }
    }

    pub fn is_provisional(self) -> bool {
        self == RowOrigin::Provisional
    }
}

/// Stateless: every allocation is derived from the roster it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAllocator;

impl IdentityAllocator {
    pub fn new() -> Self {
        Self
    }

    /// One below the smallest id present, and never above `-1`.
    pub fn next_provisional_id(&self, rows: &[RosterRow]) -> RowId {
        let lowest = rows.iter().map(|row| row.id).min().unwrap_or(0).min(0);
        lowest - 1
    }

    /// One above the largest manual id present, starting at [`MANUAL_ID_BASE`].
    pub fn next_manual_id(&self, rows: &[RosterRow]) -> RowId {
        rows.iter()
            .map(|row| row.id)
            .filter(|id| *id >= MANUAL_ID_BASE)
            .max()
            .map_or(MANUAL_ID_BASE, |id| id + 1)
    }

    pub fn catalog_derived_id(&self, key: &str) -> Result<RowId, IdentityError> {
        let parsed: RowId = key
            .trim()
            .parse()
            .map_err(|_| IdentityError::CatalogKeyNotNumeric(key.to_string()))?;
        if parsed < 0 || parsed >= CATALOG_CAPACITY as RowId {
            return Err(IdentityError::CatalogKeyOutOfRange(parsed));
        }
        Ok(parsed + CATALOG_ID_OFFSET)
    }

    /// Sequential id for the `index`-th item of a source equipment list.
    pub fn source_derived_id(&self, index: usize) -> Result<RowId, IdentityError> {
        if index >= SOURCE_CAPACITY {
            return Err(IdentityError::SourceIndexOutOfRange(index));
        }
        Ok(index as RowId + 1)
    }
}
