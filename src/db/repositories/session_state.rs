//! One row per session slot, each holding that slot's JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::{
    db::{helpers::parse_datetime, Database},
    session::SessionSnapshot,
};

const PROJECT_DATA: &str = "projectData";
const SELECTED_PROJECT: &str = "selectedProject";
const EQUIPMENT_DATA: &str = "equipmentData";
const DEVICE_TABLE_DATA: &str = "deviceTableData";
const STATION_NUMBER: &str = "stationNumber";

fn encode_slots(snapshot: &SessionSnapshot) -> Result<Vec<(&'static str, String)>> {
    Ok(vec![
        (PROJECT_DATA, serde_json::to_string(&snapshot.project_data)?),
        (
            SELECTED_PROJECT,
            serde_json::to_string(&snapshot.selected_project)?,
        ),
        (EQUIPMENT_DATA, serde_json::to_string(&snapshot.equipment_data)?),
        (
            DEVICE_TABLE_DATA,
            serde_json::to_string(&snapshot.device_table_data)?,
        ),
        (STATION_NUMBER, serde_json::to_string(&snapshot.station_number)?),
    ])
}

fn decode_slot(snapshot: &mut SessionSnapshot, key: &str, value: &str) -> Result<()> {
    let context = || format!("failed to decode session slot {key}");
    match key {
        PROJECT_DATA => snapshot.project_data = serde_json::from_str(value).with_context(context)?,
        SELECTED_PROJECT => {
            snapshot.selected_project = serde_json::from_str(value).with_context(context)?
        }
        EQUIPMENT_DATA => {
            snapshot.equipment_data = serde_json::from_str(value).with_context(context)?
        }
        DEVICE_TABLE_DATA => {
            snapshot.device_table_data = serde_json::from_str(value).with_context(context)?
        }
        STATION_NUMBER => {
            snapshot.station_number = serde_json::from_str(value).with_context(context)?
        }
        // Slots written by a newer build are left alone.
        _ => {}
    }
    Ok(())
}

impl Database {
    /// Replaces every stored slot with the values in `snapshot`.
    pub async fn save_session(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let slots = encode_slots(snapshot)?;
        let updated_at = Utc::now().to_rfc3339();

        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for (key, value) in slots {
                tx.execute(
                    "INSERT INTO session_state (key, value, updated_at)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )
                .with_context(|| format!("failed to save session slot {key}"))?;
            }
            tx.commit().context("failed to commit session state")?;
            Ok(())
        })
        .await
    }

    /// `None` when nothing has been saved yet.
    pub async fn load_session(&self) -> Result<Option<SessionSnapshot>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM session_state")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;

            if rows.is_empty() {
                return Ok(None);
            }

            let mut snapshot = SessionSnapshot::default();
            for (key, value) in rows {
                decode_slot(&mut snapshot, &key, &value)?;
            }
            Ok(Some(snapshot))
        })
        .await
    }

    pub async fn session_saved_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.execute(|conn| {
            let latest: Option<String> = conn
                .query_row("SELECT MAX(updated_at) FROM session_state", [], |row| {
                    row.get(0)
                })
                .optional()?
                .flatten();

            latest
                .map(|value| parse_datetime(&value, "updated_at"))
                .transpose()
        })
        .await
    }

    pub async fn clear_session(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM session_state", [])
                .context("failed to clear session state")?;
            Ok(())
        })
        .await
    }
}
