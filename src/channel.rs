//! Resolution of the control channel address.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Named pipe namespace on Windows.
pub const PIPE_PREFIX: &str = r"\\.\pipe\";
/// Pipe used when nothing else is configured on Windows.
pub const DEFAULT_PIPE: &str = r"\\.\pipe\umpv";
/// Socket file name inside the resolved base directory on Unix.
pub const SOCKET_NAME: &str = ".umpv";

/// Base directory candidates for the socket, in order.
pub const SOCKET_DIR_VARS: [&str; 4] = ["UMPV_SOCKET_DIR", "XDG_RUNTIME_DIR", "HOME", "TMPDIR"];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChannelError {
  #[error("cannot determine IPC socket location: none of {} is set", SOCKET_DIR_VARS.join(", "))]
  NoChannelDeterminable,
  #[error("IPC server pipe name is not valid: {0}")]
  InvalidPipeName(String),
}

/// Flavour of the channel on the current platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
  NamedPipe,
  UnixSocket,
}

impl ChannelKind {
  pub fn native() -> Self {
    if cfg!(windows) {
      ChannelKind::NamedPipe
    } else {
      ChannelKind::UnixSocket
    }
  }
}

/// Resolved address of the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAddress(PathBuf);

impl ChannelAddress {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self(path.into())
  }

  pub fn as_path(&self) -> &Path {
    &self.0
  }

  /// Value for mpv's `--input-ipc-server=` option.
  pub fn ipc_server_arg(&self) -> OsString {
    let mut arg = OsString::from("--input-ipc-server=");
    arg.push(self.0.as_os_str());
    arg
  }
}

impl fmt::Display for ChannelAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.display())
  }
}

/// Normalize an explicit pipe name: lower-case, and add the pipe namespace
/// unless present. A bare name containing `\` is rejected.
fn pipe_name(explicit: &str) -> Result<String, ChannelError> {
  let name = explicit.to_lowercase();
  if name.starts_with(PIPE_PREFIX) {
    return Ok(name);
  }
  if name.contains('\\') {
    return Err(ChannelError::InvalidPipeName(name));
  }
  Ok(format!("{PIPE_PREFIX}{name}"))
}

/// Compute the channel address.
///
/// Precedence: `explicit` > environment (Unix only, see [`SOCKET_DIR_VARS`]) >
/// platform default. Empty values count as unset.
pub fn resolve<F>(explicit: Option<&str>, env: F, kind: ChannelKind) -> Result<ChannelAddress, ChannelError>
where
  F: Fn(&str) -> Option<OsString>,
{
  let explicit = explicit.filter(|s| !s.is_empty());

  match kind {
    ChannelKind::NamedPipe => match explicit {
      Some(name) => pipe_name(name).map(ChannelAddress::new),
      None => Ok(ChannelAddress::new(DEFAULT_PIPE)),
    },
    ChannelKind::UnixSocket => {
      if let Some(path) = explicit {
        return Ok(ChannelAddress::new(path));
      }
      SOCKET_DIR_VARS
        .iter()
        .find_map(|var| env(var).filter(|v| !v.is_empty()))
        .map(|dir| ChannelAddress::new(PathBuf::from(dir).join(SOCKET_NAME)))
        .ok_or(ChannelError::NoChannelDeterminable)
    }
  }
}

/// [`resolve`] against the process environment and native channel kind.
pub fn resolve_native(explicit: Option<&str>) -> Result<ChannelAddress, ChannelError> {
  resolve(explicit, |var| std::env::var_os(var), ChannelKind::native())
}
