//! Classification of command-line tokens into playback requests.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// A token that could not be turned into a request. The token is skipped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassifyError {
  #[error("empty file name")]
  Empty,
  #[error("path is not valid UTF-8: {0}")]
  NotUtf8(String),
  #[error("cannot resolve relative path {0}: working directory unknown")]
  NoWorkingDirectory(String),
}

/// One file or URL handed to the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRequest {
  /// Absolute, normalized filesystem path.
  LocalPath(String),
  /// URL passed through untouched.
  RemoteLocator(String),
}

impl FileRequest {
  /// Text sent over the control channel or on the player's command line.
  pub fn as_str(&self) -> &str {
    match self {
      FileRequest::LocalPath(s) | FileRequest::RemoteLocator(s) => s,
    }
  }
}

/// Whether `token` looks like `scheme://...`.
///
/// The scheme may only contain ASCII letters, digits and `_`. An empty scheme
/// (`"://x"`) is accepted.
pub fn is_url(token: &str) -> bool {
  match token.find("://") {
    Some(index) => token[..index]
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_'),
    None => false,
  }
}

/// Lexically normalize an absolute path: drop `.`, fold `..`.
fn normalize(path: &Path) -> PathBuf {
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        // `..` at the root stays at the root.
        if !matches!(
          out.components().next_back(),
          None | Some(Component::RootDir) | Some(Component::Prefix(_))
        ) {
          out.pop();
        }
      }
      other => out.push(other.as_os_str()),
    }
  }
  out
}

/// Turns command-line tokens into requests relative to a working directory.
#[derive(Debug, Clone)]
pub struct Classifier {
  cwd: Option<PathBuf>,
}

impl Classifier {
  pub fn new(cwd: Option<PathBuf>) -> Self {
    Self { cwd }
  }

  /// Classifier rooted at the process working directory.
  pub fn from_current_dir() -> Self {
    match std::env::current_dir() {
      Ok(cwd) => Self::new(Some(cwd)),
      Err(e) => {
        log::warn!("Cannot determine working directory: {}", e);
        Self::new(None)
      }
    }
  }

  /// Classify one command-line token. An empty token is rejected rather than
  /// taken to mean the working directory.
  pub fn classify(&self, token: &OsStr) -> Result<FileRequest, ClassifyError> {
    if token.is_empty() {
      return Err(ClassifyError::Empty);
    }

    let text = token
      .to_str()
      .ok_or_else(|| ClassifyError::NotUtf8(token.to_string_lossy().into_owned()))?;
    if is_url(text) {
      return Ok(FileRequest::RemoteLocator(text.to_string()));
    }

    let path = Path::new(text);
    let absolute = if path.is_absolute() {
      path.to_path_buf()
    } else {
      match &self.cwd {
        Some(cwd) => cwd.join(path),
        None => return Err(ClassifyError::NoWorkingDirectory(text.to_string())),
      }
    };

    let normalized = normalize(&absolute);
    // Joining UTF-8 onto a non-UTF-8 working directory can still fail.
    normalized
      .into_os_string()
      .into_string()
      .map(FileRequest::LocalPath)
      .map_err(|s| ClassifyError::NotUtf8(s.to_string_lossy().into_owned()))
  }

  /// Classify every token, logging and skipping the ones that fail.
  pub fn classify_all<I, S>(&self, tokens: I) -> Vec<FileRequest>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
  {
    tokens
      .into_iter()
      .filter_map(|token| {
        let token = token.as_ref();
        match self.classify(token) {
          Ok(request) => Some(request),
          Err(e) => {
            log::error!("Skipping {:?}: {}", token, e);
            None
          }
        }
      })
      .collect()
  }
}
