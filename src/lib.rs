pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use app::ActionRouter;
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{HttpTransport, SystemClipboard, SystemLauncher, TracingStatus};
pub use app::{ProcessingEngine, Session};
pub use config::{cli::LocalStorage, toml_config::ConsoleConfig};
pub use utils::error::{ConsoleError, Result};
