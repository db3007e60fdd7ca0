//! MPV IPC module - spawns MPV or hands work to a running one.
//!
//! Architecture:
//! - `process.rs` - MPV binary detection and detached spawning
//! - `ipc.rs` - Control connection (Named Pipes on Windows, Unix Sockets on Linux/macOS)
//! - `protocol.rs` - Input command encoding and JSON request/reply types

mod ipc;
mod process;
mod protocol;

pub use ipc::{is_absent, ChannelStream, ControlConnection, IpcError, DEFAULT_IO_TIMEOUT, MAX_REPLY_LEN};
pub use process::{Launcher, ProcessError, MPV_ENV, SPAWNED_PROCESS};
pub use protocol::{
  encode_batch, escape_argument, loadfile_line, LoadFileFlag, MpvCommand, MpvMessage, MpvResponse,
  ParseFlagError, PlayerQueryResponse,
};
