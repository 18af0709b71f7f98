pub mod artifacts;
pub mod cleanup;
pub mod config;
pub mod context;
pub mod deploy;
pub mod errors;
pub mod logging;
pub mod plan;
pub mod prompt;
pub mod settings;
pub mod ui;
