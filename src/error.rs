//! Top-level error for a dispatch run.

use thiserror::Error;

use crate::channel::ChannelError;
use crate::config::ConfigError;
use crate::mpv::{IpcError, ProcessError};

/// Any failure that aborts the run with a non-zero exit status.
#[derive(Error, Debug)]
pub enum DispatchError {
  #[error("Configuration error: {0}")]
  Config(#[from] ConfigError),
  #[error(transparent)]
  Channel(#[from] ChannelError),
  #[error(transparent)]
  Ipc(#[from] IpcError),
  #[error("Error starting mpv: {0}")]
  Process(#[from] ProcessError),
}
