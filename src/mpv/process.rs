//! MPV executable detection and detached spawning.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::channel::ChannelAddress;
use crate::request::FileRequest;

/// Environment variable naming the MPV executable to run.
pub const MPV_ENV: &str = "MPV";

#[cfg(windows)]
const MPV_EXE: &str = "mpv.exe";
#[cfg(not(windows))]
const MPV_EXE: &str = "mpv";

/// What the pid returned by [`Launcher::spawn`] belongs to.
#[cfg(windows)]
pub const SPAWNED_PROCESS: &str = "cmd.exe wrapper for MPV";
#[cfg(not(windows))]
pub const SPAWNED_PROCESS: &str = "MPV";

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("MPV executable not found")]
  NotFound,
  #[error("Failed to spawn MPV: {0}")]
  SpawnFailed(#[from] std::io::Error),
}

/// Where to look for MPV and what extra arguments to give it.
#[derive(Debug, Clone, Default)]
pub struct Launcher {
  /// Value of the `MPV` environment variable.
  pub env_override: Option<OsString>,
  /// Executable from configuration.
  pub configured: Option<PathBuf>,
  /// Directory of the running umpv executable.
  pub exe_dir: Option<PathBuf>,
  /// Additional arguments placed before the `--` separator.
  pub extra_args: Vec<String>,
}

impl Launcher {
  /// Launcher reading `MPV` from the process environment.
  pub fn from_env(configured: Option<PathBuf>, exe_dir: Option<PathBuf>, extra_args: Vec<String>) -> Self {
    Self {
      env_override: std::env::var_os(MPV_ENV),
      configured,
      exe_dir,
      extra_args,
    }
  }

  /// Find MPV: `MPV` env var, configuration, next to umpv, then PATH.
  pub fn find_mpv(&self) -> Result<PathBuf, ProcessError> {
    if let Some(env) = self.env_override.as_ref().filter(|v| !v.is_empty()) {
      return Ok(PathBuf::from(env));
    }
    if let Some(configured) = &self.configured {
      return Ok(configured.clone());
    }
    if let Some(local) = self.exe_dir.as_deref().and_then(sibling_mpv) {
      return Ok(local);
    }
    which::which(MPV_EXE).map_err(|e| {
      log::debug!("MPV lookup on PATH failed: {}", e);
      ProcessError::NotFound
    })
  }

  /// Arguments for MPV: IPC binding, window flags, extra args, `--`, files.
  pub fn mpv_args(&self, address: &ChannelAddress, files: &[FileRequest]) -> Vec<OsString> {
    let mut args = vec![
      address.ipc_server_arg(),
      OsString::from("--force-window=yes"),
      OsString::from("--idle=yes"),
    ];
    args.extend(self.extra_args.iter().map(OsString::from));
    args.push(OsString::from("--"));
    args.extend(files.iter().map(|f| OsString::from(f.as_str())));
    args
  }

  /// Start MPV owning `address` and loading `files`. Does not wait for it to
  /// bind the channel. Returns the pid of [`SPAWNED_PROCESS`].
  pub fn spawn(&self, address: &ChannelAddress, files: &[FileRequest]) -> Result<u32, ProcessError> {
    let mpv_exe = self.find_mpv()?;
    log::info!("Spawning MPV: {:?} with IPC: {}", mpv_exe, address);
    if !self.extra_args.is_empty() {
      log::info!("Extra MPV args: {:?}", self.extra_args);
    }

    let args = self.mpv_args(address, files);
    let child = detached_command(&mpv_exe, &args).spawn()?;
    Ok(child.id())
  }
}

fn sibling_mpv(dir: &Path) -> Option<PathBuf> {
  let candidate = dir.join(MPV_EXE);
  candidate.is_file().then_some(candidate)
}

#[cfg(not(windows))]
fn detached_command(mpv_exe: &Path, args: &[OsString]) -> Command {
  use std::os::unix::process::CommandExt;

  let mut cmd = Command::new(mpv_exe);
  cmd.args(args).stdin(Stdio::null()).process_group(0);
  cmd
}

/// Windows starts MPV through `cmd.exe` so no console window is left behind.
#[cfg(windows)]
fn detached_command(mpv_exe: &Path, args: &[OsString]) -> Command {
  use std::os::windows::process::CommandExt;
  use windows::Win32::System::Threading::CREATE_NO_WINDOW;

  let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
  let line = shell_command_line(&mpv_exe.to_string_lossy(), &args);

  let mut cmd = Command::new(r"C:\Windows\system32\cmd.exe");
  cmd
    .raw_arg(format!("/s /c \"{}\"", line))
    .stdin(Stdio::null())
    .creation_flags(CREATE_NO_WINDOW.0);
  cmd
}

/// Quote one argument for `cmd.exe`: drop surrounding `"`/`'`, wrap in `"`.
#[cfg_attr(not(windows), allow(dead_code))]
fn shell_quote(arg: &str) -> String {
  format!("\"{}\"", arg.trim_matches(|c| c == '"' || c == '\''))
}

/// Command line run by `cmd.exe /s /c`. Every argument is quoted so spaces
/// and shell metacharacters stay inside it.
#[cfg_attr(not(windows), allow(dead_code))]
fn shell_command_line(mpv_exe: &str, args: &[String]) -> String {
  let mut line = shell_quote(mpv_exe);
  for arg in args {
    line.push(' ');
    line.push_str(&shell_quote(arg));
  }
  line
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_env_override_wins() {
    let launcher = Launcher {
      env_override: Some(OsString::from("/opt/mpv/bin/mpv")),
      configured: Some(PathBuf::from("/usr/local/bin/mpv")),
      ..Default::default()
    };
    assert_eq!(launcher.find_mpv().unwrap(), PathBuf::from("/opt/mpv/bin/mpv"));
  }

  #[test]
  fn test_configured_before_sibling() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MPV_EXE), b"").unwrap();
    let launcher = Launcher {
      env_override: Some(OsString::new()),
      configured: Some(PathBuf::from("/usr/local/bin/mpv")),
      exe_dir: Some(dir.path().to_path_buf()),
      ..Default::default()
    };
    assert_eq!(launcher.find_mpv().unwrap(), PathBuf::from("/usr/local/bin/mpv"));
  }

  #[test]
  fn test_sibling_executable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MPV_EXE), b"").unwrap();
    let launcher = Launcher {
      exe_dir: Some(dir.path().to_path_buf()),
      ..Default::default()
    };
    assert_eq!(launcher.find_mpv().unwrap(), dir.path().join(MPV_EXE));
  }

  #[test]
  fn test_mpv_args_layout() {
    let launcher = Launcher {
      extra_args: vec!["--profile=fast".into()],
      ..Default::default()
    };
    let address = ChannelAddress::new("/run/user/1000/.umpv");
    let files = [
      FileRequest::LocalPath("/v/-weird name.mkv".into()),
      FileRequest::RemoteLocator("https://example.com/a".into()),
    ];
    let args = launcher.mpv_args(&address, &files);
    let args: Vec<&str> = args.iter().map(|a| a.to_str().unwrap()).collect();
    assert_eq!(
      args,
      vec![
        "--input-ipc-server=/run/user/1000/.umpv",
        "--force-window=yes",
        "--idle=yes",
        "--profile=fast",
        "--",
        "/v/-weird name.mkv",
        "https://example.com/a",
      ]
    );
  }

  #[test]
  fn test_shell_command_line_quotes_every_argument() {
    let args: Vec<String> = vec![
      r"--input-ipc-server=\\.\pipe\my pipe".into(),
      "--force-window=yes".into(),
      "--idle=yes".into(),
      "--title=My Player & more".into(),
      "--".into(),
      r"C:\My Videos\a.mkv".into(),
      "'quoted'".into(),
    ];
    assert_eq!(
      shell_command_line(r"C:\mpv\mpv.exe", &args),
      concat!(
        r#""C:\mpv\mpv.exe" "--input-ipc-server=\\.\pipe\my pipe" "--force-window=yes" "#,
        r#""--idle=yes" "--title=My Player & more" "--" "C:\My Videos\a.mkv" "quoted""#
      )
    );
  }

  #[test]
  fn test_spawned_process_label() {
    if cfg!(windows) {
      assert!(SPAWNED_PROCESS.starts_with("cmd.exe"));
    } else {
      assert_eq!(SPAWNED_PROCESS, "MPV");
    }
  }

  #[cfg(unix)]
  #[test]
  fn test_spawned_pid_is_the_child() {
    let launcher = Launcher {
      env_override: Some(OsString::from("true")),
      ..Default::default()
    };
    let pid = launcher.spawn(&ChannelAddress::new("/tmp/.umpv-test"), &[]).unwrap();
    assert_ne!(pid, std::process::id());
  }

  #[cfg(unix)]
  #[test]
  fn test_spawn_missing_executable() {
    let launcher = Launcher {
      env_override: Some(OsString::from("/nonexistent/umpv-test/mpv")),
      ..Default::default()
    };
    let address = ChannelAddress::new("/tmp/.umpv-test");
    assert!(matches!(
      launcher.spawn(&address, &[]),
      Err(ProcessError::SpawnFailed(_))
    ));
  }
}
