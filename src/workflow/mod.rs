//! Equipment lookup and point table generation around the roster.
//!
//! The three external collaborators are traits so the desktop shell and the
//! tests can plug in their own.

use std::{
    fmt,
    future::Future,
    path::{Path, PathBuf},
};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    error::WorkflowError,
    models::{AssembledRow, EquipmentItem, RosterRow},
    roster::assemble,
    session::SessionContext,
};

mod sources;

#[cfg(feature = "desktop")]
pub mod commands;

pub use sources::{JsonEquipmentSource, JsonRosterGenerator, SystemOpener};

const ENABLE_LOGS: bool = true;
use crate::{log_error, log_info, log_warn};

/// Where a generated point table ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactLocator(PathBuf);

impl ArtifactLocator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ArtifactLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A generation that produced an artifact. A failed open is reported here
/// as a warning, not as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub locator: ArtifactLocator,
    pub opened: bool,
    pub open_warning: Option<String>,
}

pub trait EquipmentSource {
    fn lookup_equipment(
        &self,
        station: &str,
    ) -> impl Future<Output = Result<Vec<EquipmentItem>>> + Send;
}

pub trait RosterGenerator {
    fn generate_roster(
        &self,
        rows: &[AssembledRow],
        station: &str,
    ) -> impl Future<Output = Result<ArtifactLocator>> + Send;
}

pub trait ArtifactOpener {
    fn open_artifact(&self, locator: &ArtifactLocator) -> impl Future<Output = Result<()>> + Send;
}

pub struct PointTableWorkflow<S, G, O> {
    source: S,
    generator: G,
    opener: O,
    open_after_generate: bool,
}

impl<S, G, O> PointTableWorkflow<S, G, O>
where
    S: EquipmentSource + Sync,
    G: RosterGenerator + Sync,
    O: ArtifactOpener + Sync,
{
    pub fn new(source: S, generator: G, opener: O) -> Self {
        Self {
            source,
            generator,
            opener,
            open_after_generate: true,
        }
    }

    pub fn open_after_generate(mut self, open: bool) -> Self {
        self.open_after_generate = open;
        self
    }

    /// Looks up the station's equipment and records it in the session.
    ///
    /// The session is only touched when the lookup succeeds.
    pub async fn query_equipment(
        &self,
        session: &SessionContext,
        station: &str,
    ) -> Result<Vec<EquipmentItem>, WorkflowError> {
        let station = station.trim();
        if station.is_empty() {
            return Err(crate::error::ValidationError::MissingStation.into());
        }

        let equipment = self
            .source
            .lookup_equipment(station)
            .await
            .map_err(|err| {
                log_warn!("equipment lookup for {station} failed: {err:#}");
                WorkflowError::Lookup(format!("{err:#}"))
            })?;

        log_info!("station {station}: {} equipment items", equipment.len());
        session.record_station_equipment(station, equipment.clone());
        Ok(equipment)
    }

    /// Assembles `rows`, writes the point table and opens it.
    ///
    /// Nothing is generated while a row is mid-edit or no station is known.
    pub async fn generate(
        &self,
        session: &SessionContext,
        rows: &[RosterRow],
    ) -> Result<GenerationOutcome, WorkflowError> {
        let station = session.station_id();
        let assembled = assemble(rows, station.as_deref()).map_err(|err| {
            log_warn!("point table generation refused: {err}");
            WorkflowError::Validation(err)
        })?;
        let station = station.unwrap_or_default();

        let locator = self
            .generator
            .generate_roster(&assembled, &station)
            .await
            .map_err(|err| {
                log_error!("point table generation for {station} failed: {err:#}");
                WorkflowError::Generation(format!("{err:#}"))
            })?;
        log_info!("point table for {station} written to {locator}");

        if !self.open_after_generate {
            return Ok(GenerationOutcome {
                locator,
                opened: false,
                open_warning: None,
            });
        }

        match self.opener.open_artifact(&locator).await {
            Ok(()) => Ok(GenerationOutcome {
                locator,
                opened: true,
                open_warning: None,
            }),
            Err(err) => {
                log_warn!("opening {locator} failed: {err:#}");
                let warning = format!("IO点表已生成，但打开失败: {locator}");
                Ok(GenerationOutcome {
                    locator,
                    opened: false,
                    open_warning: Some(warning),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use anyhow::anyhow;

    use super::*;
    use crate::{
        error::ValidationError,
        session::{DeviceTableData, DeviceTableSlot, EquipmentSlot, ProjectSlot},
    };

    #[derive(Default)]
    struct FakeSource {
        fail: bool,
    }

    impl EquipmentSource for FakeSource {
        async fn lookup_equipment(&self, station: &str) -> Result<Vec<EquipmentItem>> {
            if self.fail {
                return Err(anyhow!("timeout"));
            }
            Ok(vec![EquipmentItem {
                id: format!("{station}-1"),
                name: "阀门".into(),
                quantity: 3.0,
                ..EquipmentItem::default()
            }])
        }
    }

    #[derive(Default)]
    struct FakeGenerator {
        fail: bool,
        received: Mutex<Vec<(Vec<AssembledRow>, String)>>,
    }

    impl RosterGenerator for FakeGenerator {
        async fn generate_roster(&self, rows: &[AssembledRow], station: &str) -> Result<ArtifactLocator> {
            if self.fail {
                return Err(anyhow!("disk full"));
            }
            self.received
                .lock()
                .unwrap()
                .push((rows.to_vec(), station.to_string()));
            Ok(ArtifactLocator::new(format!("/tmp/{station}_IO点表.json")))
        }
    }

    #[derive(Default)]
    struct FakeOpener {
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl ArtifactOpener for FakeOpener {
        async fn open_artifact(&self, _locator: &ArtifactLocator) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(anyhow!("no handler"))
            } else {
                Ok(())
            }
        }
    }

    fn committed_row() -> RosterRow {
        RosterRow {
            id: 1,
            name: "阀门".into(),
            tag_number: "INV-001".into(),
            description: String::new(),
            quantity: 10,
            is_editing: false,
        }
    }

    fn session_with_station() -> SessionContext {
        let session = SessionContext::new();
        session.set_station_number("ST-01".into());
        session
    }

    #[tokio::test]
    async fn query_records_station_and_equipment() {
        let workflow = PointTableWorkflow::new(
            FakeSource::default(),
            FakeGenerator::default(),
            FakeOpener::default(),
        );
        let session = SessionContext::new();
        session.set_device_table(DeviceTableData::default());

        let items = workflow.query_equipment(&session, " ST-09 ").await.unwrap();

        assert_eq!(items[0].id, "ST-09-1");
        assert_eq!(session.station_number(), "ST-09");
        assert_eq!(session.equipment(), items);
        assert!(session.device_table().is_none());
    }

    #[tokio::test]
    async fn failed_query_leaves_session_alone() {
        let workflow = PointTableWorkflow::new(
            FakeSource { fail: true },
            FakeGenerator::default(),
            FakeOpener::default(),
        );
        let session = session_with_station();
        session.set_device_table(DeviceTableData {
            rows: vec![committed_row()],
            ..DeviceTableData::default()
        });
        let before = session.snapshot();

        let err = workflow.query_equipment(&session, "ST-02").await.unwrap_err();

        assert!(matches!(err, WorkflowError::Lookup(message) if message.contains("timeout")));
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn query_needs_a_station() {
        let workflow = PointTableWorkflow::new(
            FakeSource::default(),
            FakeGenerator::default(),
            FakeOpener::default(),
        );
        let err = workflow
            .query_equipment(&SessionContext::new(), "  ")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::MissingStation)
        ));
    }

    #[tokio::test]
    async fn generate_assembles_and_opens() {
        let opener = FakeOpener::default();
        let calls = opener.calls.clone();
        let workflow = PointTableWorkflow::new(FakeSource::default(), FakeGenerator::default(), opener);

        let outcome = workflow
            .generate(&session_with_station(), &[committed_row()])
            .await
            .unwrap();

        assert!(outcome.opened);
        assert_eq!(outcome.open_warning, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let received = workflow.generator.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1, "ST-01");
        assert_eq!(received[0].0[0].order, 1);
    }

    #[tokio::test]
    async fn open_failure_is_only_a_warning() {
        let workflow = PointTableWorkflow::new(
            FakeSource::default(),
            FakeGenerator::default(),
            FakeOpener {
                fail: true,
                ..FakeOpener::default()
            },
        );

        let outcome = workflow
            .generate(&session_with_station(), &[committed_row()])
            .await
            .unwrap();

        assert!(!outcome.opened);
        assert_eq!(outcome.locator.path(), Path::new("/tmp/ST-01_IO点表.json"));
        assert!(outcome.open_warning.unwrap().contains("打开失败"));
    }

    #[tokio::test]
    async fn opening_can_be_turned_off() {
        let opener = FakeOpener::default();
        let calls = opener.calls.clone();
        let workflow = PointTableWorkflow::new(FakeSource::default(), FakeGenerator::default(), opener)
            .open_after_generate(false);

        let outcome = workflow
            .generate(&session_with_station(), &[committed_row()])
            .await
            .unwrap();

        assert!(!outcome.opened);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generate_refuses_while_editing() {
        let workflow = PointTableWorkflow::new(
            FakeSource::default(),
            FakeGenerator::default(),
            FakeOpener::default(),
        );
        let mut editing = committed_row();
        editing.is_editing = true;

        let err = workflow
            .generate(&session_with_station(), &[editing])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Validation(ValidationError::EditInProgress)
        ));
        assert!(workflow.generator.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn generator_failure_is_surfaced() {
        let workflow = PointTableWorkflow::new(
            FakeSource::default(),
            FakeGenerator {
                fail: true,
                ..FakeGenerator::default()
            },
            FakeOpener::default(),
        );

        let err = workflow
            .generate(&session_with_station(), &[committed_row()])
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Generation(message) if message.contains("disk full")));
    }
}
