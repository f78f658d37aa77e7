use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{fs, process::Command};
use uuid::Uuid;

use crate::models::{AssembledRow, EquipmentItem};

use super::{ArtifactLocator, ArtifactOpener, EquipmentSource, RosterGenerator};

const ENABLE_LOGS: bool = true;
use crate::log_debug;

/// Station names end up in file names.
fn station_file_stem(station: &str) -> Result<&str> {
    let station = station.trim();
    if station.is_empty() {
        bail!("station name is empty");
    }
    if station.contains(['/', '\\']) || station == "." || station == ".." {
        bail!("station name '{station}' cannot be used as a file name");
    }
    Ok(station)
}

/// Equipment exports either as a bare array or wrapped the way the lookup
/// service returns them.
#[derive(Deserialize)]
#[serde(untagged)]
enum EquipmentExport {
    List(Vec<EquipmentItem>),
    Wrapped { equipment_list: Vec<EquipmentItem> },
}

/// Reads `<dir>/<station>.json`.
#[derive(Debug, Clone)]
pub struct JsonEquipmentSource {
    dir: PathBuf,
}

impl JsonEquipmentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl EquipmentSource for JsonEquipmentSource {
    async fn lookup_equipment(&self, station: &str) -> Result<Vec<EquipmentItem>> {
        let path = self.dir.join(format!("{}.json", station_file_stem(station)?));
        let contents = fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read equipment list {}", path.display()))?;
        let export: EquipmentExport = serde_json::from_str(&contents)
            .with_context(|| format!("invalid equipment list {}", path.display()))?;

        Ok(match export {
            EquipmentExport::List(items) => items,
            EquipmentExport::Wrapped { equipment_list } => equipment_list,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PointTableDocument<'a> {
    station_name: &'a str,
    generated_at: DateTime<Utc>,
    rows: &'a [AssembledRow],
}

/// Writes `<dir>/<station>_IO点表.json`.
///
/// The document goes to a temporary file first and is renamed into place,
/// so a failed write never leaves a partial table behind.
#[derive(Debug, Clone)]
pub struct JsonRosterGenerator {
    dir: PathBuf,
}

impl JsonRosterGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn artifact_path(&self, station: &str) -> Result<PathBuf> {
        Ok(self
            .dir
            .join(format!("{}_IO点表.json", station_file_stem(station)?)))
    }
}

impl RosterGenerator for JsonRosterGenerator {
    async fn generate_roster(&self, rows: &[AssembledRow], station: &str) -> Result<ArtifactLocator> {
        let target = self.artifact_path(station)?;
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create output directory {}", self.dir.display()))?;

        let document = PointTableDocument {
            station_name: station.trim(),
            generated_at: Utc::now(),
            rows,
        };
        let serialized = serde_json::to_vec_pretty(&document)?;

        let staging = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));
        if let Err(err) = write_then_rename(&staging, &target, &serialized).await {
            let _ = fs::remove_file(&staging).await;
            return Err(err);
        }

        log_debug!("wrote {} rows to {}", rows.len(), target.display());
        Ok(ArtifactLocator::new(target))
    }
}

async fn write_then_rename(staging: &Path, target: &Path, contents: &[u8]) -> Result<()> {
    fs::write(staging, contents)
        .await
        .with_context(|| format!("failed to write {}", staging.display()))?;
    fs::rename(staging, target)
        .await
        .with_context(|| format!("failed to move point table to {}", target.display()))
}

/// Opens artifacts with the platform's default handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemOpener;

impl SystemOpener {
    fn command(path: &Path) -> Command {
        if cfg!(target_os = "macos") {
            let mut command = Command::new("open");
            command.arg(path);
            command
        } else if cfg!(target_os = "windows") {
            let mut command = Command::new("cmd");
            command.args(["/C", "start", ""]).arg(path);
            command
        } else {
            let mut command = Command::new("xdg-open");
            command.arg(path);
            command
        }
    }
}

impl ArtifactOpener for SystemOpener {
    async fn open_artifact(&self, locator: &ArtifactLocator) -> Result<()> {
        if !fs::try_exists(locator.path()).await.unwrap_or(false) {
            bail!("{} does not exist", locator);
        }

        let status = Self::command(locator.path())
            .status()
            .await
            .with_context(|| format!("failed to launch a handler for {locator}"))?;
        if !status.success() {
            bail!("handler for {locator} exited with {status}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assembled(order: usize) -> AssembledRow {
        AssembledRow {
            id: order as i64,
            name: "阀门".into(),
            tag_number: format!("INV-00{order}"),
            description: String::new(),
            quantity: 1,
            order,
            station_name: "ST-01".into(),
        }
    }

    #[test]
    fn station_names_must_be_plain_file_names() {
        assert!(station_file_stem("长庆一号站").is_ok());
        assert!(station_file_stem(" ").is_err());
        assert!(station_file_stem("../etc").is_err());
        assert!(station_file_stem("..").is_err());
    }

    #[tokio::test]
    async fn reads_bare_and_wrapped_exports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ST-01.json"),
            r#"[{"id":"e1","name":"阀门","tech_param":"DN50","quantity":2}]"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("ST-02.json"),
            r#"{"equipment_list":[{"id":"e2","name":"流量计"}]}"#,
        )
        .unwrap();

        let source = JsonEquipmentSource::new(dir.path());
        let bare = source.lookup_equipment("ST-01").await.unwrap();
        assert_eq!(bare[0].tech_param, "DN50");
        assert_eq!(bare[0].quantity, 2.0);

        let wrapped = source.lookup_equipment("ST-02").await.unwrap();
        assert_eq!(wrapped[0].name, "流量计");
        assert_eq!(wrapped[0].quantity, 0.0);
    }

    #[tokio::test]
    async fn missing_export_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonEquipmentSource::new(dir.path());
        assert!(source.lookup_equipment("ST-404").await.is_err());
    }

    #[tokio::test]
    async fn generator_writes_only_the_final_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let generator = JsonRosterGenerator::new(&out);

        let locator = generator
            .generate_roster(&[assembled(1), assembled(2)], "ST-01")
            .await
            .unwrap();

        assert_eq!(locator.path(), out.join("ST-01_IO点表.json").as_path());
        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(locator.path()).unwrap()).unwrap();
        assert_eq!(written["stationName"], "ST-01");
        assert_eq!(written["rows"].as_array().unwrap().len(), 2);
        assert_eq!(written["rows"][1]["order"], 2);

        let entries = std::fs::read_dir(&out).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn generator_overwrites_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let generator = JsonRosterGenerator::new(dir.path());
        generator
            .generate_roster(&[assembled(1), assembled(2)], "ST-01")
            .await
            .unwrap();
        let locator = generator
            .generate_roster(&[assembled(1)], "ST-01")
            .await
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(locator.path()).unwrap()).unwrap();
        assert_eq!(written["rows"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn opener_rejects_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let locator = ArtifactLocator::new(dir.path().join("absent.json"));
        assert!(SystemOpener.open_artifact(&locator).await.is_err());
    }
}
