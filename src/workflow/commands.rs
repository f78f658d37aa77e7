use anyhow::{Context, Result};
use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;

use crate::{
    app::AppState,
    models::ProjectInfo,
    roster::RosterView,
    session::ProjectSlot,
};

use super::{ArtifactLocator, ArtifactOpener, GenerationOutcome};

/// Opens artifacts through the opener plugin.
pub struct TauriOpener {
    app: AppHandle,
}

impl TauriOpener {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl ArtifactOpener for TauriOpener {
    async fn open_artifact(&self, locator: &ArtifactLocator) -> Result<()> {
        self.app
            .opener()
            .open_path(locator.path().to_string_lossy(), None::<&str>)
            .with_context(|| format!("failed to open {locator}"))
    }
}

/// Looks up the station's equipment and rebuilds the roster from it.
#[tauri::command]
pub async fn query_equipment_by_station(
    state: State<'_, AppState>,
    station_name: String,
) -> Result<RosterView, String> {
    state
        .workflow
        .query_equipment(&state.session, &station_name)
        .await
        .map_err(|e| e.to_string())?;

    let view = state
        .roster
        .lock()
        .await
        .load()
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(view)
}

#[tauri::command]
pub async fn get_projects(state: State<'_, AppState>) -> Result<Vec<ProjectInfo>, String> {
    Ok(state.session.projects())
}

/// Stores the result of a project search. The previous selection and
/// everything derived from it are dropped, so the roster is reloaded.
#[tauri::command]
pub async fn record_project_query(
    state: State<'_, AppState>,
    projects: Vec<ProjectInfo>,
) -> Result<RosterView, String> {
    state.session.begin_project_query(projects);
    let view = state
        .roster
        .lock()
        .await
        .load()
        .map_err(|e| e.to_string())?;
    state.persist_session().await;
    Ok(view)
}

/// Switching to another project drops the previous project's equipment
/// and table before the roster is reloaded.
#[tauri::command]
pub async fn select_project(
    state: State<'_, AppState>,
    project: Option<ProjectInfo>,
) -> Result<RosterView, String> {
    let view = {
        let mut roster = state.roster.lock().await;
        if state.session.select_project(project) {
            roster.load().map_err(|e| e.to_string())?
        } else {
            roster.view()
        }
    };
    state.persist_session().await;
    Ok(view)
}

#[tauri::command]
pub async fn set_station_number(
    state: State<'_, AppState>,
    station_number: String,
) -> Result<(), String> {
    state.session.set_station_number(station_number);
    state.persist_session().await;
    Ok(())
}

#[tauri::command]
pub async fn generate_point_table(state: State<'_, AppState>) -> Result<GenerationOutcome, String> {
    let rows = state.roster.lock().await.rows().to_vec();
    state
        .workflow
        .generate(&state.session, &rows)
        .await
        .map_err(|e| e.to_string())
}
