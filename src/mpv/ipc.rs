//! Control connection to a running MPV.
//!
//! Handles platform-specific socket/pipe connections. Every operation is bounded
//! by a deadline; an expired deadline is reported as an unreachable channel.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::protocol::{encode_batch, LoadFileFlag, MpvCommand, MpvMessage, PlayerQueryResponse};
use crate::channel::ChannelAddress;
use crate::request::FileRequest;

/// Longest reply line accepted from MPV.
pub const MAX_REPLY_LEN: usize = 4096;

/// Default deadline for connect, write and read.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum IpcError {
  /// Nothing owns the channel; a player may be spawned.
  #[error("no player listening on {address}: {source}")]
  Absent {
    address: String,
    #[source]
    source: io::Error,
  },
  #[error("cannot reach player on {address}: {source}")]
  Unreachable {
    address: String,
    #[source]
    source: io::Error,
  },
  #[error("write to player failed: {0}")]
  WriteFailed(#[source] io::Error),
  #[error("read from player failed: {0}")]
  ReadFailed(#[source] io::Error),
  #[error("player closed the connection before replying")]
  Disconnected,
  #[error("malformed reply from player: {0}")]
  MalformedResponse(String),
  #[error("error from player: {0}")]
  RemoteError(String),
}

/// Whether a connect error means "no owner" rather than a real failure.
pub fn is_absent(err: &io::Error) -> bool {
  matches!(
    err.kind(),
    io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
  )
}

#[cfg(windows)]
pub type ChannelStream = tokio::net::windows::named_pipe::NamedPipeClient;
#[cfg(not(windows))]
pub type ChannelStream = tokio::net::UnixStream;

#[cfg(windows)]
async fn open_stream(address: &ChannelAddress) -> io::Result<ChannelStream> {
  use tokio::net::windows::named_pipe::ClientOptions;

  ClientOptions::new().open(address.as_path())
}

#[cfg(not(windows))]
async fn open_stream(address: &ChannelAddress) -> io::Result<ChannelStream> {
  tokio::net::UnixStream::connect(address.as_path()).await
}

/// Exclusive connection to the owning player, closed on drop.
pub struct ControlConnection<S> {
  stream: BufReader<S>,
  address: String,
  io_timeout: Duration,
  next_request_id: i64,
}

impl ControlConnection<ChannelStream> {
  /// Connect to the channel. Fails with [`IpcError::Absent`] when nobody owns it.
  pub async fn connect(address: &ChannelAddress, io_timeout: Duration) -> Result<Self, IpcError> {
    let display = address.to_string();
    log::debug!("Connecting to {}", display);

    match tokio::time::timeout(io_timeout, open_stream(address)).await {
      Ok(Ok(stream)) => Ok(Self::new(stream, display, io_timeout)),
      Ok(Err(source)) if is_absent(&source) => Err(IpcError::Absent {
        address: display,
        source,
      }),
      Ok(Err(source)) => Err(IpcError::Unreachable {
        address: display,
        source,
      }),
      Err(_) => Err(IpcError::Unreachable {
        address: display,
        source: timed_out(io_timeout),
      }),
    }
  }
}

fn timed_out(after: Duration) -> io::Error {
  io::Error::new(
    io::ErrorKind::TimedOut,
    format!("no progress within {:?}", after),
  )
}

impl<S> ControlConnection<S>
where
  S: AsyncRead + AsyncWrite + Unpin,
{
  /// Wrap an already connected stream.
  pub fn new(stream: S, address: impl Into<String>, io_timeout: Duration) -> Self {
    Self {
      stream: BufReader::new(stream),
      address: address.into(),
      io_timeout,
      next_request_id: 1,
    }
  }

  fn deadline_expired(&self) -> IpcError {
    IpcError::Unreachable {
      address: self.address.clone(),
      source: timed_out(self.io_timeout),
    }
  }

  async fn write_line(&mut self, line: &str) -> Result<(), IpcError> {
    let io_timeout = self.io_timeout;
    let write = async {
      self.stream.write_all(line.as_bytes()).await?;
      self.stream.flush().await
    };
    match tokio::time::timeout(io_timeout, write).await {
      Ok(result) => result.map_err(IpcError::WriteFailed),
      Err(_) => Err(self.deadline_expired()),
    }
  }

  /// Send `raw loadfile` lines for the batch, in order. Stops at the first
  /// failed write.
  pub async fn send_files(&mut self, batch: &[FileRequest], flag: LoadFileFlag) -> Result<(), IpcError> {
    for line in encode_batch(batch, flag) {
      log::debug!("Sending: {}", line.trim_end());
      self.write_line(&line).await?;
    }
    Ok(())
  }

  /// Read one reply line, bounded by [`MAX_REPLY_LEN`].
  async fn read_reply_line(&mut self) -> Result<String, IpcError> {
    let mut line = String::new();
    let mut limited = (&mut self.stream).take(MAX_REPLY_LEN as u64);
    let read = limited.read_line(&mut line).await;
    match read {
      Ok(0) => Err(IpcError::Disconnected),
      Ok(n) if n >= MAX_REPLY_LEN && !line.ends_with('\n') => Err(IpcError::MalformedResponse(
        format!("reply longer than {} bytes", MAX_REPLY_LEN),
      )),
      Ok(_) => Ok(line),
      Err(e) if e.kind() == io::ErrorKind::InvalidData => {
        Err(IpcError::MalformedResponse(e.to_string()))
      }
      Err(e) => Err(IpcError::ReadFailed(e)),
    }
  }

  async fn await_reply(&mut self, request_id: i64) -> Result<PlayerQueryResponse, IpcError> {
    loop {
      let line = self.read_reply_line().await?;
      let trimmed = line.trim();
      if trimmed.is_empty() {
        continue;
      }

      match MpvMessage::parse(trimmed) {
        Ok(MpvMessage::Event(event)) => {
          log::debug!("Ignoring MPV event while waiting for reply: {}", event.event);
        }
        Ok(MpvMessage::Response(response)) if !response.answers(request_id) => {
          log::debug!(
            "Ignoring reply for request_id={:?}, waiting for {}",
            response.request_id,
            request_id
          );
        }
        Ok(MpvMessage::Response(response)) => {
          if !response.is_success() {
            return Err(IpcError::RemoteError(response.error));
          }
          return Ok(PlayerQueryResponse {
            request_id,
            data: response.data.unwrap_or(serde_json::Value::Null),
          });
        }
        Err(e) => {
          log::warn!("Failed to parse MPV message: {} - {}", e, trimmed);
          return Err(IpcError::MalformedResponse(e.to_string()));
        }
      }
    }
  }

  /// Query a property and wait for its reply.
  pub async fn query(&mut self, property: &str) -> Result<PlayerQueryResponse, IpcError> {
    let request_id = self.next_request_id;
    self.next_request_id += 1;

    let line = MpvCommand::get_property(property, request_id)
      .to_line()
      .map_err(|e| IpcError::WriteFailed(e.into()))?;
    log::debug!("Sending MPV command: {}", line.trim_end());
    self.write_line(&line).await?;

    let io_timeout = self.io_timeout;
    let reply = tokio::time::timeout(io_timeout, self.await_reply(request_id)).await;
    match reply {
      Ok(result) => result,
      Err(_) => Err(self.deadline_expired()),
    }
  }

  /// Process id of the owning player.
  pub async fn query_pid(&mut self) -> Result<u32, IpcError> {
    let response = self.query("pid").await?;
    log::debug!("pid reply for request_id={}: {}", response.request_id, response.data);
    response
      .as_pid()
      .ok_or_else(|| IpcError::MalformedResponse(format!("pid is not a process id: {}", response.data)))
  }
}
