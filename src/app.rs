use std::sync::Arc;

use tauri::{Emitter, Manager, State};
use tokio::sync::Mutex;

use crate::{
    catalog::commands::{get_catalog, push_selection},
    db::Database,
    roster::{
        commands::{
            add_device, assemble_roster, begin_edit, cancel_edit, clear_form, commit_edit,
            delete_device, get_roster, load_roster, update_device_draft,
        },
        RosterController,
    },
    session::SessionContext,
    settings::{RosterSettings, SettingsStore},
    utils::logging::init_logging,
    workflow::{
        commands::{
            generate_point_table, get_projects, query_equipment_by_station, record_project_query,
            select_project, set_station_number, TauriOpener,
        },
        JsonEquipmentSource, JsonRosterGenerator, PointTableWorkflow,
    },
};

const ENABLE_LOGS: bool = true;
use crate::{log_info, log_warn};

pub(crate) type DesktopWorkflow =
    PointTableWorkflow<JsonEquipmentSource, JsonRosterGenerator, TauriOpener>;

pub(crate) struct AppState {
    pub(crate) roster: Arc<Mutex<RosterController>>,
    pub(crate) session: SessionContext,
    pub(crate) db: Database,
    pub(crate) settings: SettingsStore,
    pub(crate) workflow: DesktopWorkflow,
}

impl AppState {
    /// Writes the session to disk. Failures are logged, the in-memory
    /// session stays authoritative.
    pub(crate) async fn persist_session(&self) {
        if let Err(err) = self.db.save_session(&self.session.snapshot()).await {
            log_warn!("Failed to save session: {err:#}");
        }
    }
}

#[tauri::command]
fn get_settings(state: State<'_, AppState>) -> Result<RosterSettings, String> {
    Ok(state.settings.get())
}

/// Catalog and directory changes apply from the next launch.
#[tauri::command]
fn update_settings(settings: RosterSettings, state: State<'_, AppState>) -> Result<(), String> {
    state.settings.update(settings).map_err(|e| format!("{e:#}"))
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_logging(log::LevelFilter::Info);
    log_info!("station-roster starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let settings = SettingsStore::new(app_data_dir.join("settings.json"))?;
                let config = settings.get();

                let database = Database::new(app_data_dir.join("station-roster.sqlite3"))?;
                let session = SessionContext::new();
                {
                    let db = database.clone();
                    let (saved, saved_at) = tauri::async_runtime::block_on(async {
                        anyhow::Ok((db.load_session().await?, db.session_saved_at().await?))
                    })?;
                    if let Some(saved) = saved {
                        match saved_at {
                            Some(at) => log_info!(
                                "Restored session for station '{}' saved at {}",
                                saved.station_number,
                                at.to_rfc3339()
                            ),
                            None => log_info!(
                                "Restored session for station '{}'",
                                saved.station_number
                            ),
                        }
                        session.restore(saved);
                    }
                }

                let controller = RosterController::new(
                    session.clone(),
                    config.catalog.clone(),
                    config.initial_selection.clone(),
                );

                let mut receiver = controller.subscribe();
                let handle = app.handle().clone();
                tauri::async_runtime::spawn(async move {
                    while receiver.changed().await.is_ok() {
                        let snapshot = receiver.borrow_and_update().clone();
                        if let Err(err) = handle.emit("roster-changed", &snapshot) {
                            log_warn!("Failed to emit roster-changed: {err}");
                        }
                    }
                });

                let workflow = PointTableWorkflow::new(
                    JsonEquipmentSource::new(config.equipment_dir_or(&app_data_dir)),
                    JsonRosterGenerator::new(config.output_dir_or(&app_data_dir)),
                    TauriOpener::new(app.handle().clone()),
                )
                .open_after_generate(config.open_after_generate);

                app.manage(AppState {
                    roster: Arc::new(Mutex::new(controller)),
                    session,
                    db: database,
                    settings,
                    workflow,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .invoke_handler(tauri::generate_handler![
            load_roster,
            get_roster,
            add_device,
            begin_edit,
            update_device_draft,
            commit_edit,
            cancel_edit,
            delete_device,
            clear_form,
            assemble_roster,
            get_catalog,
            push_selection,
            query_equipment_by_station,
            get_projects,
            record_project_query,
            select_project,
            set_station_number,
            generate_point_table,
            get_settings,
            update_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
