//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                         |
//! |------------|------------------------------------------|
//! | `generate` | `Generate`                               |
//! | `deploy`   | `Deploy`                                 |
//! | `clean`    | `Clean`                                  |
//! | `status`   | `Status`                                 |
//! | `config`   | `Config`                                 |
//! | `menu`     | no subcommand (interactive main menu)    |

pub mod clean;
pub mod config;
pub mod deploy;
pub mod generate;
pub mod menu;
pub mod status;

pub use clean::cmd_clean;
pub use config::cmd_config;
pub use deploy::{DeployOptions, cmd_deploy};
pub use generate::cmd_generate;
pub use menu::cmd_menu;
pub use status::cmd_status;
