//! Tile-by-tile provisioning of a wall.
//!
//! Tiles are deployed strictly in sequence order, one session at a time.
//! For every tile the orchestrator obtains a target, connects (retrying only
//! transient connection failures), uploads the wall config, the tile
//! descriptor and the service files, then runs the activation commands with
//! elevation. Command failures are warnings. Connection and transfer
//! failures end the tile and, depending on policy, the run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::credentials::{CredentialProvider, DeploymentTarget};
use super::elevation::Elevation;
use super::report::{DeployReport, FailureKind, TileOutcome, TileReport};
use super::session::{ConnectOptions, Connector, RemoteSession};
use crate::artifacts::serializer::{
    REMOTE_DESCRIPTOR, REMOTE_WALL_CONFIG, render_descriptor, serialize,
};
use crate::artifacts::service::{SERVICE_FILE_MODE, ServiceBundle};
use crate::errors::{ConnectionError, StateError, TransferError};
use crate::plan::{Plan, PlanStore, Tile, resolve_plan};

/// Upload mode of the wall config and tile descriptor.
const CONFIG_FILE_MODE: i32 = 0o644;

const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Shared flag asking a running deployment to stop before the next tile.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Policy and timeouts for a deployment run.
#[derive(Debug, Clone)]
pub struct DeploySettings {
    pub connect: ConnectOptions,
    /// Total connection attempts per tile, including the first
    pub connect_attempts: u32,
    /// Delay before the first retry, doubled for each further retry
    pub retry_backoff: Duration,
    /// Stop the whole run when a tile cannot be connected to
    pub abort_on_connection_failure: bool,
    /// Move on to the next tile after a transfer failure
    pub continue_on_tile_failure: bool,
    pub elevation: Elevation,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            connect: ConnectOptions::default(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            abort_on_connection_failure: true,
            continue_on_tile_failure: false,
            elevation: Elevation::default(),
        }
    }
}

impl DeploySettings {
    pub fn with_connect_options(mut self, connect: ConnectOptions) -> Self {
        self.connect = connect;
        self
    }

    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_abort_on_connection_failure(mut self, abort: bool) -> Self {
        self.abort_on_connection_failure = abort;
        self
    }

    pub fn with_continue_on_tile_failure(mut self, keep_going: bool) -> Self {
        self.continue_on_tile_failure = keep_going;
        self
    }

    pub fn with_elevation(mut self, elevation: Elevation) -> Self {
        self.elevation = elevation;
        self
    }
}

/// Progress callbacks. All methods default to doing nothing.
pub trait DeployObserver: Send {
    fn tile_started(&self, _tile: &Tile, _hostname: &str) {}
    fn step(&self, _tile: &Tile, _step: &str) {}
    fn retrying(&self, _tile: &Tile, _attempt: u32, _error: &ConnectionError) {}
    fn tile_finished(&self, _report: &TileReport) {}
}

struct SilentObserver;

impl DeployObserver for SilentObserver {}

/// Why the tile loop stopped early.
enum Halt {
    Cancelled,
    Failed,
}

pub struct Deployer<C> {
    connector: C,
    settings: DeploySettings,
    service: ServiceBundle,
    observer: Box<dyn DeployObserver>,
}

impl<C: Connector> Deployer<C> {
    pub fn new(connector: C, settings: DeploySettings, service: ServiceBundle) -> Self {
        Self {
            connector,
            settings,
            service,
            observer: Box::new(SilentObserver),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn DeployObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Deploy the in-memory plan, or the persisted one when there is none.
    ///
    /// The plan is resolved before anything touches the network.
    pub fn deploy_resolved(
        &self,
        in_memory: Option<Plan>,
        store: &PlanStore,
        credentials: &mut dyn CredentialProvider,
        cancel: &CancelToken,
    ) -> Result<DeployReport, StateError> {
        let plan = resolve_plan(in_memory, store)?;
        Ok(self.deploy(&plan, credentials, cancel))
    }

    pub fn deploy(
        &self,
        plan: &Plan,
        credentials: &mut dyn CredentialProvider,
        cancel: &CancelToken,
    ) -> DeployReport {
        let wall_config = serialize(plan).wall_config;
        let mut report = DeployReport::new(&plan.wall().id);
        let mut halt: Option<Halt> = None;

        tracing::info!(
            wall = %plan.wall().id,
            tiles = plan.tiles().len(),
            run_id = %report.run_id,
            "starting deployment"
        );

        for tile in plan.tiles() {
            if halt.is_none() && cancel.is_cancelled() {
                halt = Some(Halt::Cancelled);
            }
            if halt.is_some() {
                report
                    .tiles
                    .push(TileReport::not_attempted(tile.sequence_id, &tile.name));
                continue;
            }

            let target = match credentials.target_for(tile) {
                Ok(target) => target,
                Err(e) => {
                    tracing::error!(tile = tile.sequence_id, error = %e, "no deployment target");
                    let tile_report = TileReport {
                        outcome: TileOutcome::Failed {
                            kind: FailureKind::Credentials,
                            message: e.to_string(),
                        },
                        ..TileReport::not_attempted(tile.sequence_id, &tile.name)
                    };
                    self.observer.tile_finished(&tile_report);
                    report.tiles.push(tile_report);
                    halt = Some(Halt::Failed);
                    continue;
                }
            };

            if cancel.is_cancelled() {
                halt = Some(Halt::Cancelled);
                report.tiles.push(TileReport {
                    hostname: target.hostname.clone(),
                    ..TileReport::not_attempted(tile.sequence_id, &tile.name)
                });
                continue;
            }

            let tile_report = self.deploy_tile(tile, &target, &wall_config, cancel);
            if self.is_fatal(&tile_report.outcome) {
                halt = Some(Halt::Failed);
            }
            self.observer.tile_finished(&tile_report);
            report.tiles.push(tile_report);
        }

        report.cancelled = matches!(halt, Some(Halt::Cancelled));
        report.finish();
        tracing::info!(
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            not_attempted = report.not_attempted_count(),
            warnings = report.warning_count(),
            cancelled = report.cancelled,
            "deployment finished"
        );
        report
    }

    fn is_fatal(&self, outcome: &TileOutcome) -> bool {
        match outcome {
            TileOutcome::Failed {
                kind: FailureKind::Connection,
                ..
            } => self.settings.abort_on_connection_failure,
            TileOutcome::Failed {
                kind: FailureKind::Transfer,
                ..
            } => !self.settings.continue_on_tile_failure,
            TileOutcome::Failed {
                kind: FailureKind::Credentials,
                ..
            } => true,
            TileOutcome::Succeeded | TileOutcome::NotAttempted => false,
        }
    }

    fn deploy_tile(
        &self,
        tile: &Tile,
        target: &DeploymentTarget,
        wall_config: &str,
        cancel: &CancelToken,
    ) -> TileReport {
        let mut report = TileReport {
            sequence_id: tile.sequence_id,
            tile_name: tile.name.clone(),
            hostname: target.hostname.clone(),
            outcome: TileOutcome::Succeeded,
            warnings: Vec::new(),
        };
        tracing::info!(
            tile = tile.sequence_id,
            host = %target.hostname,
            user = %target.username,
            "deploying tile"
        );
        self.observer.tile_started(tile, &target.hostname);

        let mut session = match self.connect_with_retry(tile, target, cancel) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(tile = tile.sequence_id, error = %e, "connection failed");
                report.outcome = TileOutcome::Failed {
                    kind: FailureKind::Connection,
                    message: e.to_string(),
                };
                return report;
            }
        };

        let result = self.provision(session.as_mut(), tile, target, wall_config, &mut report.warnings);
        session.close();

        if let Err(e) = result {
            tracing::error!(tile = tile.sequence_id, error = %e, "transfer failed");
            report.outcome = TileOutcome::Failed {
                kind: FailureKind::Transfer,
                message: e.to_string(),
            };
        }
        report
    }

    fn connect_with_retry(
        &self,
        tile: &Tile,
        target: &DeploymentTarget,
        cancel: &CancelToken,
    ) -> Result<Box<dyn RemoteSession>, ConnectionError> {
        let attempts = self.settings.connect_attempts.max(1);
        let mut delay = self.settings.retry_backoff;
        let mut attempt = 1;
        loop {
            match self.connector.connect(
                &target.hostname,
                &target.username,
                &target.password,
                &self.settings.connect,
            ) {
                Ok(session) => return Ok(session),
                Err(e) if e.is_transient() && attempt < attempts && !cancel.is_cancelled() => {
                    tracing::warn!(
                        host = %target.hostname,
                        attempt,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "connection attempt failed, retrying"
                    );
                    self.observer.retrying(tile, attempt, &e);
                    std::thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn provision(
        &self,
        session: &mut dyn RemoteSession,
        tile: &Tile,
        target: &DeploymentTarget,
        wall_config: &str,
        warnings: &mut Vec<String>,
    ) -> Result<(), TransferError> {
        let descriptor = render_descriptor(tile.sequence_id);
        let staged_config = self.service.staged_config_name();
        let staged_script = self.service.staged_script_name();
        let service_config = self.service.config_for(&target.username);
        let service_script = self.service.script_for(&target.username);
        let uploads: [(&str, &[u8], i32); 4] = [
            (REMOTE_WALL_CONFIG, wall_config.as_bytes(), CONFIG_FILE_MODE),
            (REMOTE_DESCRIPTOR, descriptor.as_bytes(), CONFIG_FILE_MODE),
            (staged_config.as_str(), service_config.as_bytes(), SERVICE_FILE_MODE),
            (staged_script.as_str(), service_script.as_bytes(), SERVICE_FILE_MODE),
        ];
        for (remote_path, contents, mode) in uploads {
            self.observer.step(tile, &format!("uploading {}", remote_path));
            session.upload(remote_path, contents, mode)?;
        }

        for command in self.service.activation_commands() {
            self.observer.step(tile, &command);
            match session.run_elevated(&command, self.settings.elevation, &target.password) {
                Ok(output) => {
                    tracing::debug!(tile = tile.sequence_id, command = %command, output = %output.output, "command ok");
                }
                Err(e) => {
                    tracing::warn!(tile = tile.sequence_id, error = %e, "command failed");
                    warnings.push(e.to_string());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::credentials::{CredentialDefaults, StaticCredentials};
    use crate::deploy::session::CommandOutput;
    use crate::errors::{CommandError, CredentialError};
    use crate::plan::{RandomNames, WallSpec, compute_plan};
    use secrecy::{ExposeSecret, SecretString};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Behavior {
        Healthy,
        Refuse,
        Unresolved,
        RejectAuth,
        FailUpload(&'static str),
        FailCommand(&'static str),
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Connect(String),
        Upload(String, String, i32),
        Run(String, String, Elevation, String),
        Close(String),
    }

    /// Host, remote path and contents of every completed upload.
    type Uploaded = Arc<Mutex<Vec<(String, String, String)>>>;

    #[derive(Clone, Default)]
    struct FakeConnector {
        behaviors: HashMap<String, Behavior>,
        events: Arc<Mutex<Vec<Event>>>,
        uploaded: Uploaded,
    }

    impl FakeConnector {
        fn with(mut self, host: &str, behavior: Behavior) -> Self {
            self.behaviors.insert(host.to_string(), behavior);
            self
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn uploaded(&self, host: &str, remote_path: &str) -> Option<String> {
            self.uploaded
                .lock()
                .unwrap()
                .iter()
                .find(|(h, p, _)| h == host && p == remote_path)
                .map(|(_, _, contents)| contents.clone())
        }

        fn connects_to(&self, host: &str) -> usize {
            self.events()
                .iter()
                .filter(|e| **e == Event::Connect(host.to_string()))
                .count()
        }
    }

    impl Connector for FakeConnector {
        fn connect(
            &self,
            host: &str,
            username: &str,
            _password: &SecretString,
            _options: &ConnectOptions,
        ) -> Result<Box<dyn RemoteSession>, ConnectionError> {
            self.events.lock().unwrap().push(Event::Connect(host.to_string()));
            let behavior = self.behaviors.get(host).copied().unwrap_or(Behavior::Healthy);
            match behavior {
                Behavior::Refuse => Err(ConnectionError::Unreachable {
                    host: host.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                }),
                Behavior::Unresolved => Err(ConnectionError::Resolve {
                    host: host.to_string(),
                    message: "Name or service not known".into(),
                }),
                Behavior::RejectAuth => Err(ConnectionError::AuthRejected {
                    host: host.to_string(),
                    username: username.to_string(),
                    message: "bad password".into(),
                }),
                _ => Ok(Box::new(FakeSession {
                    host: host.to_string(),
                    behavior,
                    events: Arc::clone(&self.events),
                    uploaded: Arc::clone(&self.uploaded),
                })),
            }
        }
    }

    struct FakeSession {
        host: String,
        behavior: Behavior,
        events: Arc<Mutex<Vec<Event>>>,
        uploaded: Uploaded,
    }

    impl RemoteSession for FakeSession {
        fn upload(
            &mut self,
            remote_path: &str,
            contents: &[u8],
            mode: i32,
        ) -> Result<(), TransferError> {
            if let Behavior::FailUpload(failing) = self.behavior {
                if remote_path == failing {
                    return Err(TransferError::Rejected {
                        remote_path: remote_path.to_string(),
                        message: "No space left on device".into(),
                    });
                }
            }
            self.events.lock().unwrap().push(Event::Upload(
                self.host.clone(),
                remote_path.to_string(),
                mode,
            ));
            self.uploaded.lock().unwrap().push((
                self.host.clone(),
                remote_path.to_string(),
                String::from_utf8_lossy(contents).into_owned(),
            ));
            Ok(())
        }

        fn run_elevated(
            &mut self,
            command: &str,
            elevation: Elevation,
            password: &SecretString,
        ) -> Result<CommandOutput, CommandError> {
            self.events.lock().unwrap().push(Event::Run(
                self.host.clone(),
                command.to_string(),
                elevation,
                password.expose_secret().to_string(),
            ));
            if let Behavior::FailCommand(prefix) = self.behavior {
                if command.starts_with(prefix) {
                    return Err(CommandError::NonZeroExit {
                        command: command.to_string(),
                        exit_code: 1,
                        output: "failed".into(),
                    });
                }
            }
            Ok(CommandOutput::default())
        }

        fn close(&mut self) {
            self.events.lock().unwrap().push(Event::Close(self.host.clone()));
        }
    }

    fn plan(columns: u32) -> Plan {
        let spec = WallSpec {
            columns,
            rows: 1,
            monitor_width_px: 1920,
            monitor_height_px: 1080,
            monitor_inside_width_mm: 520.0,
            bezel_mm: 10.0,
        };
        compute_plan(&spec, &mut RandomNames::seeded(9)).unwrap()
    }

    fn hosts(n: u32) -> StaticCredentials {
        StaticCredentials::new(
            (1..=n).map(|i| format!("pi-{}", i)).collect(),
            CredentialDefaults::new("pi", SecretString::from("raspberry")),
        )
    }

    fn settings() -> DeploySettings {
        DeploySettings::default().with_retry_backoff(Duration::ZERO)
    }

    fn deployer(connector: &FakeConnector, settings: DeploySettings) -> Deployer<FakeConnector> {
        let service = ServiceBundle::load("tilewall-player", None, None).unwrap();
        Deployer::new(connector.clone(), settings, service)
    }

    fn kinds(report: &DeployReport) -> Vec<Option<FailureKind>> {
        report
            .tiles
            .iter()
            .map(|t| match &t.outcome {
                TileOutcome::Failed { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_healthy_wall_is_fully_provisioned() {
        let connector = FakeConnector::default();
        let report = deployer(&connector, settings()).deploy(&plan(2), &mut hosts(2), &CancelToken::new());

        assert!(report.is_success());
        assert_eq!(report.succeeded_count(), 2);
        assert_eq!(report.tiles[1].hostname, "pi-2");

        let events = connector.events();
        let tile_one: Vec<&Event> = events
            .iter()
            .filter(|e| match e {
                Event::Connect(h) | Event::Close(h) => h == "pi-1",
                Event::Upload(h, ..) | Event::Run(h, ..) => h == "pi-1",
            })
            .collect();
        assert_eq!(tile_one.len(), 10);
        assert_eq!(*tile_one[0], Event::Connect("pi-1".into()));
        let uploads: Vec<(String, i32)> = tile_one
            .iter()
            .filter_map(|e| match e {
                Event::Upload(_, path, mode) => Some((path.clone(), *mode)),
                _ => None,
            })
            .collect();
        assert_eq!(
            uploads,
            vec![
                (".piwall".to_string(), 0o644),
                (".pitile".to_string(), 0o644),
                ("tilewall-player.conf.staged".to_string(), 0o755),
                ("tilewall-player.init.staged".to_string(), 0o755),
            ]
        );
        assert_eq!(
            *tile_one[5],
            Event::Run(
                "pi-1".into(),
                "mv tilewall-player.conf.staged /etc/tilewall-player.conf".into(),
                Elevation::Sudo,
                "raspberry".into()
            )
        );
        assert_eq!(*tile_one[9], Event::Close("pi-1".into()));
        // Tile 1's session is closed before tile 2 connects
        let close_one = events.iter().position(|e| *e == Event::Close("pi-1".into()));
        let connect_two = events.iter().position(|e| *e == Event::Connect("pi-2".into()));
        assert!(close_one < connect_two);
    }

    #[test]
    fn test_refused_tile_aborts_remaining_tiles() {
        let connector = FakeConnector::default().with("pi-2", Behavior::Refuse);
        let report = deployer(&connector, settings()).deploy(&plan(3), &mut hosts(3), &CancelToken::new());

        assert_eq!(kinds(&report), vec![None, Some(FailureKind::Connection), None]);
        assert!(report.tiles[0].succeeded());
        assert_eq!(report.tiles[2].outcome, TileOutcome::NotAttempted);
        assert_eq!(connector.connects_to("pi-2"), 3);
        assert_eq!(connector.connects_to("pi-3"), 0);
        assert!(!report.cancelled);
    }

    #[test]
    fn test_connection_failure_can_be_tolerated() {
        let connector = FakeConnector::default().with("pi-2", Behavior::Refuse);
        let report = deployer(
            &connector,
            settings().with_abort_on_connection_failure(false),
        )
        .deploy(&plan(3), &mut hosts(3), &CancelToken::new());

        assert_eq!(kinds(&report), vec![None, Some(FailureKind::Connection), None]);
        assert!(report.tiles[2].succeeded());
    }

    #[test]
    fn test_auth_rejection_is_never_retried() {
        let connector = FakeConnector::default().with("pi-1", Behavior::RejectAuth);
        let report = deployer(&connector, settings().with_connect_attempts(5))
            .deploy(&plan(1), &mut hosts(1), &CancelToken::new());

        assert_eq!(kinds(&report), vec![Some(FailureKind::Connection)]);
        assert_eq!(connector.connects_to("pi-1"), 1);
    }

    #[test]
    fn test_unreachable_host_retried_up_to_limit() {
        let connector = FakeConnector::default().with("pi-1", Behavior::Refuse);
        deployer(&connector, settings().with_connect_attempts(5))
            .deploy(&plan(1), &mut hosts(1), &CancelToken::new());
        assert_eq!(connector.connects_to("pi-1"), 5);
    }

    #[test]
    fn test_unresolved_host_retried_up_to_limit() {
        let connector = FakeConnector::default().with("pi-1", Behavior::Unresolved);
        let report = deployer(&connector, settings().with_connect_attempts(3))
            .deploy(&plan(1), &mut hosts(1), &CancelToken::new());
        assert_eq!(kinds(&report), vec![Some(FailureKind::Connection)]);
        assert_eq!(connector.connects_to("pi-1"), 3);
    }

    #[test]
    fn test_service_config_names_login_user() {
        let connector = FakeConnector::default();
        let mut targets = StaticCredentials::new(
            vec!["pi-1".to_string()],
            CredentialDefaults::new("wallop", SecretString::from("hunter2")),
        );
        let report = deployer(&connector, settings()).deploy(&plan(1), &mut targets, &CancelToken::new());
        assert!(report.is_success());

        let config = connector
            .uploaded("pi-1", "tilewall-player.conf.staged")
            .unwrap();
        assert!(config.contains("PLAYER_USER=wallop\n"));
        assert!(config.contains("--config=pimcplayer "));
        assert!(!config.contains('@'));
        let wall = connector.uploaded("pi-1", ".piwall").unwrap();
        assert!(wall.contains("[pimcplayer]"));
    }

    #[test]
    fn test_command_failure_is_a_warning() {
        let connector = FakeConnector::default().with("pi-1", Behavior::FailCommand("update-rc.d"));
        let report = deployer(&connector, settings()).deploy(&plan(2), &mut hosts(2), &CancelToken::new());

        assert!(report.is_success());
        assert_eq!(report.tiles[0].warnings.len(), 1);
        assert!(report.tiles[0].warnings[0].contains("update-rc.d"));
        // The start command still ran after the failure
        assert!(connector.events().contains(&Event::Run(
            "pi-1".into(),
            "service tilewall-player start".into(),
            Elevation::Sudo,
            "raspberry".into()
        )));
    }

    #[test]
    fn test_transfer_failure_stops_run_by_default() {
        let connector = FakeConnector::default().with("pi-1", Behavior::FailUpload(".pitile"));
        let report = deployer(&connector, settings()).deploy(&plan(2), &mut hosts(2), &CancelToken::new());

        assert_eq!(kinds(&report), vec![Some(FailureKind::Transfer), None]);
        assert_eq!(report.tiles[1].outcome, TileOutcome::NotAttempted);
        // No command runs after a failed upload, and the session is still closed
        let events = connector.events();
        assert!(!events.iter().any(|e| matches!(e, Event::Run(..))));
        assert!(events.contains(&Event::Close("pi-1".into())));
    }

    #[test]
    fn test_transfer_failure_tolerated_when_configured() {
        let connector = FakeConnector::default().with("pi-1", Behavior::FailUpload(".piwall"));
        let report = deployer(&connector, settings().with_continue_on_tile_failure(true))
            .deploy(&plan(2), &mut hosts(2), &CancelToken::new());
        assert_eq!(kinds(&report), vec![Some(FailureKind::Transfer), None]);
        assert!(report.tiles[1].succeeded());
    }

    #[test]
    fn test_missing_target_ends_run() {
        let connector = FakeConnector::default();
        let report = deployer(&connector, settings()).deploy(&plan(3), &mut hosts(1), &CancelToken::new());
        assert_eq!(kinds(&report), vec![None, Some(FailureKind::Credentials), None]);
        assert_eq!(report.tiles[2].outcome, TileOutcome::NotAttempted);
    }

    #[test]
    fn test_cancel_before_start_touches_nothing() {
        let connector = FakeConnector::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        let report = deployer(&connector, settings()).deploy(&plan(2), &mut hosts(2), &cancel);
        assert!(report.cancelled);
        assert_eq!(report.not_attempted_count(), 2);
        assert!(connector.events().is_empty());
    }

    /// Cancels the run while handing out the target for `cancel_at`.
    struct CancellingProvider {
        inner: StaticCredentials,
        cancel_at: u32,
        token: CancelToken,
    }

    impl CredentialProvider for CancellingProvider {
        fn target_for(&mut self, tile: &Tile) -> Result<DeploymentTarget, CredentialError> {
            if tile.sequence_id == self.cancel_at {
                self.token.cancel();
            }
            self.inner.target_for(tile)
        }
    }

    #[test]
    fn test_cancel_between_tiles() {
        let connector = FakeConnector::default();
        let token = CancelToken::new();
        let mut provider = CancellingProvider {
            inner: hosts(3),
            cancel_at: 2,
            token: token.clone(),
        };
        let report = deployer(&connector, settings()).deploy(&plan(3), &mut provider, &token);

        assert!(report.cancelled);
        assert!(report.tiles[0].succeeded());
        assert_eq!(report.tiles[1].outcome, TileOutcome::NotAttempted);
        assert_eq!(report.tiles[1].hostname, "pi-2");
        assert_eq!(report.tiles[2].outcome, TileOutcome::NotAttempted);
        assert_eq!(connector.connects_to("pi-2"), 0);
    }

    #[test]
    fn test_missing_plan_never_connects() {
        let dir = tempdir().unwrap();
        let store = PlanStore::new(dir.path().join("plan.json"));
        let connector = FakeConnector::default();
        let result = deployer(&connector, settings()).deploy_resolved(
            None,
            &store,
            &mut hosts(4),
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(StateError::NotFound { .. })));
        assert!(connector.events().is_empty());
    }

    #[test]
    fn test_persisted_plan_is_deployed() {
        let dir = tempdir().unwrap();
        let store = PlanStore::new(dir.path().join("plan.json"));
        store.save(&plan(2)).unwrap();
        let connector = FakeConnector::default();
        let report = deployer(&connector, settings())
            .deploy_resolved(None, &store, &mut hosts(2), &CancelToken::new())
            .unwrap();
        assert_eq!(report.tiles.len(), 2);
        assert!(report.is_success());
    }

    #[test]
    fn test_settings_builder() {
        let s = DeploySettings::default()
            .with_connect_attempts(7)
            .with_elevation(Elevation::None)
            .with_continue_on_tile_failure(true);
        assert_eq!(s.connect_attempts, 7);
        assert_eq!(s.elevation, Elevation::None);
        assert!(s.continue_on_tile_failure);
        assert!(s.abort_on_connection_failure);
        assert_eq!(s.retry_backoff, Duration::from_millis(500));
    }
}
