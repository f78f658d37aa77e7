use thiserror::Error;

use crate::identity::RowId;

/// Operator-facing rejections. These never leave the roster in a partial state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Tag number is empty once trimmed.
    #[error("位号不能为空")]
    EmptyTag,
    /// Quantity is zero or negative.
    #[error("数量必须大于0")]
    NonPositiveQuantity,
    /// Another row is mid-edit.
    #[error("请先完成编辑中的项目")]
    EditInProgress,
    /// No station identifier has been chosen for this session.
    #[error("请先选择一个项目")]
    MissingStation,
}

/// Row identity allocation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("catalog key '{0}' is not an integer")]
    CatalogKeyNotNumeric(String),
    #[error("catalog key {0} is outside the catalog id band")]
    CatalogKeyOutOfRange(i64),
    #[error("source index {0} is outside the source id band")]
    SourceIndexOutOfRange(usize),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RosterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("no roster row with id {0}")]
    RowNotFound(RowId),
    #[error("roster row id {0} appears more than once")]
    DuplicateRowId(RowId),
    #[error("roster index {0} is out of range")]
    IndexOutOfRange(usize),
    #[error("unknown catalog key '{0}'")]
    UnknownCatalogKey(String),
    #[error("catalog entry '{0}' is not selected")]
    CatalogEntryNotSelected(String),
}

impl RosterError {
    pub fn validation(&self) -> Option<ValidationError> {
        match self {
            RosterError::Validation(err) => Some(*err),
            _ => None,
        }
    }
}

/// Failures surfaced by the lookup / generation workflow.
///
/// Opening a generated artifact is best-effort and is reported on the
/// successful outcome instead of here.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("查询设备清单失败: {0}")]
    Lookup(String),
    #[error("生成IO点表失败: {0}")]
    Generation(String),
}

pub type RosterResult<T> = std::result::Result<T, RosterError>;
