//! Provisioning nodes over SSH.

pub mod credentials;
pub mod elevation;
pub mod orchestrator;
pub mod report;
pub mod scp;
pub mod session;
pub mod ssh;

pub use credentials::{
    CredentialDefaults, CredentialProvider, DeploymentTarget, PromptCredentials, StaticCredentials,
};
pub use elevation::Elevation;
pub use orchestrator::{CancelToken, DeployObserver, DeploySettings, Deployer};
pub use report::{DeployReport, FailureKind, TileOutcome, TileReport};
pub use session::{CommandOutput, ConnectOptions, Connector, RemoteSession};
pub use ssh::SshConnector;
