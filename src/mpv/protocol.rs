//! MPV IPC protocol types.
//!
//! Two encodings share the channel: plain text input commands (`raw loadfile ...`)
//! which mpv executes without replying, and JSON requests carrying a `request_id`
//! which mpv answers with one JSON line.
//!
//! Reference: https://mpv.io/manual/master/#json-ipc

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::request::FileRequest;

/// How a loaded file is inserted into the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadFileFlag {
  /// Stop playback and replace the playlist.
  Replace,
  /// Append to the playlist.
  Append,
  /// Append, and start playing if nothing is playing.
  #[default]
  AppendPlay,
}

impl LoadFileFlag {
  pub fn as_str(self) -> &'static str {
    match self {
      LoadFileFlag::Replace => "replace",
      LoadFileFlag::Append => "append",
      LoadFileFlag::AppendPlay => "append-play",
    }
  }

  /// Flag used for the file after this one in the same batch.
  /// A batch clears the playlist at most once.
  pub fn next_in_batch(self) -> Self {
    match self {
      LoadFileFlag::Replace => LoadFileFlag::Append,
      other => other,
    }
  }
}

impl fmt::Display for LoadFileFlag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid loadfile flag '{0}' (expected replace, append or append-play)")]
pub struct ParseFlagError(String);

impl FromStr for LoadFileFlag {
  type Err = ParseFlagError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "replace" => Ok(LoadFileFlag::Replace),
      "append" => Ok(LoadFileFlag::Append),
      "append-play" => Ok(LoadFileFlag::AppendPlay),
      other => Err(ParseFlagError(other.to_string())),
    }
  }
}

/// Escape text for a double-quoted argument of an input command.
pub fn escape_argument(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  for c in text.chars() {
    match c {
      '\\' => out.push_str("\\\\"),
      '"' => out.push_str("\\\""),
      '\n' => out.push_str("\\n"),
      c => out.push(c),
    }
  }
  out
}

/// A single `raw loadfile` line, newline-terminated.
pub fn loadfile_line(target: &str, flag: LoadFileFlag) -> String {
  format!("raw loadfile \"{}\" {}\n", escape_argument(target), flag)
}

/// Encode a batch of requests as `raw loadfile` lines, in order.
///
/// Only the first line may carry `replace`; later lines are downgraded to
/// `append` so the batch does not keep clearing the playlist.
pub fn encode_batch(batch: &[FileRequest], start: LoadFileFlag) -> Vec<String> {
  let mut flag = start;
  batch
    .iter()
    .map(|request| {
      let line = loadfile_line(request.as_str(), flag);
      flag = flag.next_in_batch();
      line
    })
    .collect()
}

/// JSON command sent to MPV via IPC.
#[derive(Debug, Clone, Serialize)]
pub struct MpvCommand {
  pub command: Vec<serde_json::Value>,
  pub request_id: i64,
}

impl MpvCommand {
  pub fn new(args: Vec<serde_json::Value>, request_id: i64) -> Self {
    Self {
      command: args,
      request_id,
    }
  }

  /// Get a property value.
  pub fn get_property(name: &str, request_id: i64) -> Self {
    Self::new(vec!["get_property".into(), name.into()], request_id)
  }

  /// Serialize as one newline-terminated line.
  pub fn to_line(&self) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(self)?;
    line.push('\n');
    Ok(line)
  }
}

/// Reply from MPV for a JSON command.
#[derive(Debug, Clone, Deserialize)]
pub struct MpvResponse {
  /// "success" or error message.
  pub error: String,
  /// Response data (command-specific).
  #[serde(default)]
  pub data: Option<serde_json::Value>,
  /// Matching request ID, absent when the request carried none.
  #[serde(default)]
  pub request_id: Option<i64>,
}

impl MpvResponse {
  pub fn is_success(&self) -> bool {
    self.error == "success"
  }

  /// Whether this reply answers the request with the given id.
  pub fn answers(&self, request_id: i64) -> bool {
    self.request_id.map_or(true, |id| id == request_id)
  }
}

/// Asynchronous event pushed by MPV to every client (e.g. "start-file").
#[derive(Debug, Clone, Deserialize)]
pub struct MpvEvent {
  pub event: String,
}

/// Message received from MPV IPC (either reply or event).
#[derive(Debug, Clone)]
pub enum MpvMessage {
  Response(MpvResponse),
  Event(MpvEvent),
}

impl MpvMessage {
  /// Parse one JSON line from MPV.
  pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(line)?;
    if value.get("event").is_some() {
      Ok(MpvMessage::Event(serde_json::from_value(value)?))
    } else {
      Ok(MpvMessage::Response(serde_json::from_value(value)?))
    }
  }
}

/// A successful property query: the reply's status was "success".
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerQueryResponse {
  pub request_id: i64,
  pub data: serde_json::Value,
}

impl PlayerQueryResponse {
  /// Payload as a process id, if it is a non-negative integer that fits.
  pub fn as_pid(&self) -> Option<u32> {
    self.data.as_u64().and_then(|n| u32::try_from(n).ok())
  }
}
