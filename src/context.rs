//! Explicit per-process state threaded through every command.

use anyhow::Result;

use crate::artifacts::ServiceBundle;
use crate::config::Config;
use crate::deploy::DeploySettings;
use crate::plan::{Plan, PlanStore, RandomNames};
use crate::settings::Settings;

pub struct WallContext {
    pub config: Config,
    pub settings: Settings,
    /// Shared by every generate in this process so names never repeat
    pub names: RandomNames,
    /// Most recently generated plan, if any
    pub plan: Option<Plan>,
}

impl WallContext {
    pub fn new(config: Config, settings: Settings) -> Self {
        Self {
            config,
            settings,
            names: RandomNames::new(),
            plan: None,
        }
    }

    /// Load settings from the installation root.
    pub fn load(config: Config) -> Result<Self> {
        let settings = Settings::load_or_default(&config.settings_file)?;
        for warning in settings.validate() {
            tracing::warn!("{}", warning);
        }
        Ok(Self::new(config, settings))
    }

    pub fn plan_store(&self) -> PlanStore {
        PlanStore::new(self.config.state_file.clone())
    }

    /// Deploy settings with the known_hosts path resolved against the root.
    pub fn deploy_settings(&self) -> DeploySettings {
        let mut settings = self.settings.deploy_settings();
        settings.connect.known_hosts = settings
            .connect
            .known_hosts
            .take()
            .map(|p| self.config.resolve(&p));
        settings
    }

    pub fn service_bundle(&self) -> Result<ServiceBundle> {
        let service = &self.settings.service;
        let config_file = service.config_file.as_deref().map(|p| self.config.resolve(p));
        let script_file = service.script_file.as_deref().map(|p| self.config.resolve(p));
        ServiceBundle::load(&service.name, config_file.as_deref(), script_file.as_deref())
    }
}
