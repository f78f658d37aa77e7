use crate::{
    error::ValidationError,
    models::{AssembledRow, RosterRow},
};

const ENABLE_LOGS: bool = true;
use crate::log_warn;

/// Turns the roster into the generator's input.
///
/// Fails closed: nothing is assembled while any row is mid-edit or when no
/// station has been chosen.
pub fn assemble(
    rows: &[RosterRow],
    station: Option<&str>,
) -> Result<Vec<AssembledRow>, ValidationError> {
    if let Some(editing) = rows.iter().find(|row| row.is_editing) {
        log_warn!("assemble refused: row {} is still being edited", editing.id);
        return Err(ValidationError::EditInProgress);
    }

    let station = station
        .map(str::trim)
        .filter(|station| !station.is_empty())
        .ok_or(ValidationError::MissingStation)?;

    Ok(rows
        .iter()
        .enumerate()
        .map(|(index, row)| AssembledRow {
            id: row.id,
            name: row.name.clone(),
            tag_number: row.tag_number.clone(),
            description: row.description.clone(),
            quantity: row.quantity,
            order: index + 1,
            station_name: station.to_string(),
        })
        .collect())
}
