use serde::Serialize;
use tauri::State;

use crate::{app::AppState, models::CatalogEntry};

use super::SelectionChange;

/// Both sides of the selection screen.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogLists {
    pub available: Vec<CatalogEntry>,
    pub selected: Vec<CatalogEntry>,
}

#[tauri::command]
pub async fn get_catalog(state: State<'_, AppState>) -> Result<CatalogLists, String> {
    let roster = state.roster.lock().await;
    Ok(CatalogLists {
        available: roster.available(),
        selected: roster.selected(),
    })
}

/// Returns the full selected set after the change.
#[tauri::command]
pub async fn push_selection(
    state: State<'_, AppState>,
    change: SelectionChange,
) -> Result<Vec<CatalogEntry>, String> {
    let selected = state
        .roster
        .lock()
        .await
        .push_selection(change)
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(selected)
}
