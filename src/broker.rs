//! Connect-or-spawn: join the player owning the channel, or start one.
//!
//! The connect attempt is not serialized across processes. Two invocations racing before
//! a fresh player has bound the channel will both spawn.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::channel::ChannelAddress;
use crate::error::DispatchError;
use crate::focus::FocusWindow;
use crate::mpv::{
  ControlConnection, IpcError, Launcher, LoadFileFlag, DEFAULT_IO_TIMEOUT, SPAWNED_PROCESS,
};
use crate::request::FileRequest;

/// How the batch reached a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// Sent over the channel to the existing owner with this pid.
  Joined { pid: u32 },
  /// Passed on the command line of a newly started player. `pid` is the
  /// process umpv launched: MPV on Unix, the `cmd.exe` wrapper on Windows.
  Spawned { pid: u32 },
}

pub struct Broker<F> {
  address: ChannelAddress,
  launcher: Launcher,
  focus: F,
  io_timeout: Duration,
}

impl<F: FocusWindow> Broker<F> {
  pub fn new(address: ChannelAddress, launcher: Launcher, focus: F) -> Self {
    Self {
      address,
      launcher,
      focus,
      io_timeout: DEFAULT_IO_TIMEOUT,
    }
  }

  /// Deadline for each connect, write and read on the channel.
  pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
    self.io_timeout = io_timeout;
    self
  }

  /// Hand `files` to the player owning the channel, starting one if needed.
  pub async fn dispatch(&self, files: &[FileRequest], flag: LoadFileFlag) -> Result<Outcome, DispatchError> {
    match ControlConnection::connect(&self.address, self.io_timeout).await {
      Ok(mut conn) => self.join(&mut conn, files, flag).await,
      Err(IpcError::Absent { address, source }) => {
        log::info!("No player on {} ({}), starting one", address, source);
        let pid = self.launcher.spawn(&self.address, files)?;
        log::info!("Started {} (pid: {})", SPAWNED_PROCESS, pid);
        Ok(Outcome::Spawned { pid })
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Send the batch over an open connection, then raise the owner's window.
  async fn join<S>(
    &self,
    conn: &mut ControlConnection<S>,
    files: &[FileRequest],
    flag: LoadFileFlag,
  ) -> Result<Outcome, DispatchError>
  where
    S: AsyncRead + AsyncWrite + Unpin,
  {
    conn.send_files(files, flag).await?;
    log::info!("Sent {} file(s) to running MPV", files.len());

    let pid = conn.query_pid().await?;
    if let Err(e) = self.focus.focus_window(pid) {
      log::warn!("Error setting foreground window: {}", e);
    }
    Ok(Outcome::Joined { pid })
  }
}
