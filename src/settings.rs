use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
};

use crate::{identity::CATALOG_CAPACITY, models::DeviceType};

const ENABLE_LOGS: bool = true;
use crate::log_warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RosterSettings {
    /// Device types offered by the selector, in display order.
    pub catalog: Vec<DeviceType>,
    /// Catalog keys selected when a station has no equipment yet.
    pub initial_selection: Vec<String>,
    /// Where `<station>.json` equipment exports are read from.
    pub equipment_dir: Option<PathBuf>,
    /// Where generated point tables are written.
    pub output_dir: Option<PathBuf>,
    pub open_after_generate: bool,
}

impl Default for RosterSettings {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            initial_selection: vec!["2".into(), "3".into()],
            equipment_dir: None,
            output_dir: None,
            open_after_generate: true,
        }
    }
}

fn default_catalog() -> Vec<DeviceType> {
    (1..=20)
        .map(|n| DeviceType {
            name: format!("设备{n}"),
            default_tag: format!("TAG-{}", n + 99),
            default_description: format!("设备{n}的详细描述信息"),
            default_quantity: n,
        })
        .collect()
}

impl RosterSettings {
    pub fn validate(&self) -> Result<()> {
        if self.catalog.len() > CATALOG_CAPACITY {
            bail!(
                "catalog has {} device types, at most {} are supported",
                self.catalog.len(),
                CATALOG_CAPACITY
            );
        }

        let mut names = HashSet::new();
        for device in &self.catalog {
            if device.name.trim().is_empty() {
                bail!("catalog contains a device type without a name");
            }
            if !names.insert(device.name.as_str()) {
                bail!("device type '{}' appears more than once", device.name);
            }
        }

        for key in &self.initial_selection {
            let in_range = key
                .parse::<usize>()
                .map(|position| position < self.catalog.len())
                .unwrap_or(false);
            if !in_range {
                bail!("initial selection key '{key}' is not in the catalog");
            }
        }
        Ok(())
    }

    pub fn equipment_dir_or(&self, base: &Path) -> PathBuf {
        self.equipment_dir
            .clone()
            .unwrap_or_else(|| base.join("equipment"))
    }

    pub fn output_dir_or(&self, base: &Path) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| base.join("output"))
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<RosterSettings>,
}

impl SettingsStore {
    /// Loads `path`, falling back to defaults when it is missing or unusable.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str::<RosterSettings>(&contents) {
                Ok(settings) => match settings.validate() {
                    Ok(()) => settings,
                    Err(err) => {
                        log_warn!("Ignoring invalid settings in {}: {err:#}", path.display());
                        RosterSettings::default()
                    }
                },
                Err(err) => {
                    log_warn!("Ignoring unreadable settings in {}: {err}", path.display());
                    RosterSettings::default()
                }
            }
        } else {
            RosterSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> RosterSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: RosterSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    fn persist(&self, data: &RosterSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
