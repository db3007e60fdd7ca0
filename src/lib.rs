//! umpv: append files to one running mpv instead of opening a new window
//! per invocation.

use std::path::PathBuf;

pub mod broker;
pub mod channel;
pub mod cli;
pub mod config;
pub mod error;
pub mod focus;
pub mod mpv;
pub mod request;

pub use broker::{Broker, Outcome};
pub use cli::Cli;
pub use error::DispatchError;

use config::{load_config, Settings};
use focus::PlatformFocus;
use mpv::Launcher;
use request::Classifier;

/// Directory holding the running executable.
fn exe_dir() -> Option<PathBuf> {
  match std::env::current_exe() {
    Ok(path) => path.parent().map(PathBuf::from),
    Err(e) => {
      log::warn!("Error getting executable path: {}", e);
      None
    }
  }
}

/// One full invocation: settings, classification, channel, dispatch.
pub async fn run(cli: Cli) -> Result<Outcome, DispatchError> {
  let exe_dir = exe_dir();

  let file_config = load_config(cli.config.as_deref(), exe_dir.as_deref())?;
  let settings = Settings::merge(cli.overrides(), file_config);
  log::debug!("Effective settings: {:?}", settings);

  let files = Classifier::from_current_dir().classify_all(&cli.files);
  let address = channel::resolve_native(settings.ipc_server.as_deref())?;

  let launcher = Launcher::from_env(settings.mpv_path, exe_dir, settings.mpv_args);
  let broker = Broker::new(address, launcher, PlatformFocus);
  broker.dispatch(&files, settings.loadfile_flag).await
}
