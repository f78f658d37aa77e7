use tauri::State;

use crate::{
    app::AppState,
    identity::RowId,
    models::{AssembledRow, RosterRow, RowPatch},
};

use super::RosterView;

#[tauri::command]
pub async fn load_roster(state: State<'_, AppState>) -> Result<RosterView, String> {
    let view = {
        let mut roster = state.roster.lock().await;
        roster.load().map_err(|e| e.to_string())?
    };
    state.persist_session().await;
    Ok(view)
}

#[tauri::command]
pub async fn get_roster(state: State<'_, AppState>) -> Result<RosterView, String> {
    Ok(state.roster.lock().await.view())
}

#[tauri::command]
pub async fn add_device(state: State<'_, AppState>) -> Result<RosterRow, String> {
    let row = state
        .roster
        .lock()
        .await
        .add()
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(row)
}

#[tauri::command]
pub async fn begin_edit(state: State<'_, AppState>, id: RowId) -> Result<(), String> {
    state
        .roster
        .lock()
        .await
        .begin_edit(id)
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(())
}

#[tauri::command]
pub async fn update_device_draft(
    state: State<'_, AppState>,
    id: RowId,
    patch: RowPatch,
) -> Result<(), String> {
    state
        .roster
        .lock()
        .await
        .update_draft(id, patch)
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(())
}

#[tauri::command]
pub async fn commit_edit(state: State<'_, AppState>, id: RowId) -> Result<RosterRow, String> {
    let row = state
        .roster
        .lock()
        .await
        .commit_edit(id)
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(row)
}

#[tauri::command]
pub async fn cancel_edit(
    state: State<'_, AppState>,
    id: RowId,
    index: usize,
) -> Result<(), String> {
    state
        .roster
        .lock()
        .await
        .cancel_edit(id, index)
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(())
}

#[tauri::command]
pub async fn delete_device(state: State<'_, AppState>, index: usize) -> Result<RosterRow, String> {
    let row = state
        .roster
        .lock()
        .await
        .delete(index)
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(row)
}

/// Drops the whole session, on disk too.
#[tauri::command]
pub async fn clear_form(state: State<'_, AppState>) -> Result<(), String> {
    state
        .roster
        .lock()
        .await
        .reset()
        .map_err(|e| e.to_string())?;
    state.db.clear_session().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn assemble_roster(state: State<'_, AppState>) -> Result<Vec<AssembledRow>, String> {
    state
        .roster
        .lock()
        .await
        .assemble()
        .map_err(|e| e.to_string())
}
