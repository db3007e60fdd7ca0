//! Command-line arguments.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

use crate::config::Overrides;
use crate::mpv::LoadFileFlag;

/// Append files to a single running mpv, starting it if needed.
#[derive(Parser, Debug)]
#[command(name = "umpv", version, about, long_about = None)]
pub struct Cli {
  /// IPC server pipe name or socket path
  #[arg(long, value_name = "ADDR")]
  pub ipc_server: Option<String>,

  /// How the first file is added: replace, append or append-play
  #[arg(long, value_name = "FLAG")]
  pub loadfile_flag: Option<LoadFileFlag>,

  /// Configuration file path
  #[arg(long, value_name = "PATH")]
  pub config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long)]
  pub verbose: bool,

  /// Files or URLs to play
  #[arg(value_name = "FILES")]
  pub files: Vec<OsString>,
}

impl Cli {
  pub fn overrides(&self) -> Overrides {
    Overrides {
      ipc_server: self.ipc_server.clone(),
      loadfile_flag: self.loadfile_flag,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_flags_and_files() {
    let cli = Cli::try_parse_from([
      "umpv",
      "--ipc-server",
      "mypipe",
      "--loadfile-flag",
      "replace",
      "a.mkv",
      "http://x/y",
    ])
    .unwrap();
    assert_eq!(cli.ipc_server.as_deref(), Some("mypipe"));
    assert_eq!(cli.loadfile_flag, Some(LoadFileFlag::Replace));
    assert_eq!(cli.files, vec![OsString::from("a.mkv"), OsString::from("http://x/y")]);
  }

  #[test]
  fn test_invalid_flag_rejected() {
    assert!(Cli::try_parse_from(["umpv", "--loadfile-flag", "shuffle"]).is_err());
  }

  #[test]
  fn test_files_after_separator() {
    let cli = Cli::try_parse_from(["umpv", "--", "--not-a-flag.mkv"]).unwrap();
    assert_eq!(cli.files, vec![OsString::from("--not-a-flag.mkv")]);
  }
}
