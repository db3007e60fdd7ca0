//! Configuration file and merged settings.

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::mpv::LoadFileFlag;

/// File name looked up next to the executable and in the user config dir.
pub const CONFIG_FILE_NAME: &str = "umpv.conf";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("cannot read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  /// `umpv.conf` is TOML; INI-style bare values must now be quoted.
  #[error("cannot parse {path} as TOML (string values must be quoted, e.g. ipc-server = \"umpv\"): {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
  #[error("{0}")]
  Invalid(String),
}

/// Contents of `umpv.conf`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
  /// Pipe name or socket path.
  #[serde(default)]
  pub ipc_server: Option<String>,

  /// Flag for the first file of each batch.
  #[serde(default)]
  pub loadfile_flag: Option<LoadFileFlag>,

  /// MPV executable (None = auto-detect).
  #[serde(default)]
  pub mpv_path: Option<String>,

  /// Additional MPV command-line arguments used when spawning.
  #[serde(default)]
  pub mpv_args: Vec<String>,
}

impl FileConfig {
  pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
    let config: FileConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    config.validate()?;
    Ok(config)
  }

  /// Validate configuration values.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if let Some(path) = &self.mpv_path {
      if path.trim().is_empty() {
        return Err(ConfigError::Invalid("mpv-path cannot be blank".to_string()));
      }
    }
    if self.mpv_args.iter().any(|a| a.is_empty()) {
      return Err(ConfigError::Invalid("mpv-args cannot contain empty arguments".to_string()));
    }
    Ok(())
  }

  /// Load a file. A missing file yields `None`.
  pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
    match std::fs::read_to_string(path) {
      Ok(text) => Self::parse(&text, path).map(Some),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(ConfigError::Read {
        path: path.to_path_buf(),
        source,
      }),
    }
  }
}

/// Files to try, in order, when no explicit path is given.
pub fn default_locations(exe_dir: Option<&Path>, config_dir: Option<&Path>) -> Vec<PathBuf> {
  let mut locations = Vec::new();
  if let Some(dir) = exe_dir {
    locations.push(dir.join(CONFIG_FILE_NAME));
  }
  if let Some(dir) = config_dir {
    locations.push(dir.join("umpv").join(CONFIG_FILE_NAME));
  }
  locations
}

/// Load the configuration: `explicit` if given, else the first existing
/// default location. Missing files mean defaults.
pub fn load_config(explicit: Option<&Path>, exe_dir: Option<&Path>) -> Result<FileConfig, ConfigError> {
  if let Some(path) = explicit {
    return match FileConfig::load(path)? {
      Some(config) => Ok(config),
      None => {
        log::warn!("Config file {} not found, using defaults", path.display());
        Ok(FileConfig::default())
      }
    };
  }

  let config_dir = dirs::config_dir();
  for path in default_locations(exe_dir, config_dir.as_deref()) {
    if let Some(config) = FileConfig::load(&path)? {
      log::debug!("Loaded config from {}", path.display());
      return Ok(config);
    }
  }
  Ok(FileConfig::default())
}

/// Values given on the command line; they win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
  pub ipc_server: Option<String>,
  pub loadfile_flag: Option<LoadFileFlag>,
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub ipc_server: Option<String>,
  pub loadfile_flag: LoadFileFlag,
  pub mpv_path: Option<PathBuf>,
  pub mpv_args: Vec<String>,
}

impl Settings {
  /// Command line > file > defaults. Empty strings count as unset.
  pub fn merge(overrides: Overrides, file: FileConfig) -> Self {
    let non_empty = |s: Option<String>| s.filter(|s| !s.is_empty());
    Self {
      ipc_server: non_empty(overrides.ipc_server).or_else(|| non_empty(file.ipc_server)),
      loadfile_flag: overrides
        .loadfile_flag
        .or(file.loadfile_flag)
        .unwrap_or_default(),
      mpv_path: non_empty(file.mpv_path).map(PathBuf::from),
      mpv_args: file.mpv_args,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_file() {
    let text = r#"
ipc-server = "/tmp/custom.sock"
loadfile-flag = "replace"
mpv-path = "/opt/mpv/mpv"
mpv-args = ["--profile=fast", "--volume=50"]
"#;
    let config = FileConfig::parse(text, Path::new("umpv.conf")).unwrap();
    assert_eq!(config.ipc_server.as_deref(), Some("/tmp/custom.sock"));
    assert_eq!(config.loadfile_flag, Some(LoadFileFlag::Replace));
    assert_eq!(config.mpv_path.as_deref(), Some("/opt/mpv/mpv"));
    assert_eq!(config.mpv_args, vec!["--profile=fast", "--volume=50"]);
  }

  #[test]
  fn test_bad_flag_rejected() {
    let err = FileConfig::parse("loadfile-flag = \"shuffle\"", Path::new("umpv.conf"));
    assert!(matches!(err, Err(ConfigError::Parse { .. })));
  }

  #[test]
  fn test_unquoted_ini_value_explained() {
    let err = FileConfig::parse("ipc-server = mypipe\n", Path::new("umpv.conf")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    let message = err.to_string();
    assert!(message.contains("as TOML"), "{}", message);
    assert!(message.contains("must be quoted"), "{}", message);
  }

  #[test]
  fn test_unknown_key_rejected() {
    let err = FileConfig::parse("ipc_server = \"x\"", Path::new("umpv.conf"));
    assert!(matches!(err, Err(ConfigError::Parse { .. })));
  }

  #[test]
  fn test_blank_mpv_path_invalid() {
    let err = FileConfig::parse("mpv-path = \"  \"", Path::new("umpv.conf"));
    assert!(matches!(err, Err(ConfigError::Invalid(_))));
  }

  #[test]
  fn test_missing_file_is_none() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(FileConfig::load(&dir.path().join("absent.conf")).unwrap(), None);
  }

  #[test]
  fn test_explicit_path_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mine.conf");
    std::fs::write(&path, "loadfile-flag = \"append\"\n").unwrap();
    let config = load_config(Some(path.as_path()), None).unwrap();
    assert_eq!(config.loadfile_flag, Some(LoadFileFlag::Append));
  }

  #[test]
  fn test_explicit_missing_path_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(Some(dir.path().join("nope.conf").as_path()), None).unwrap();
    assert_eq!(config, FileConfig::default());
  }

  #[test]
  fn test_default_locations_order() {
    let locations = default_locations(Some(Path::new("/opt/umpv")), Some(Path::new("/home/me/.config")));
    assert_eq!(
      locations,
      vec![
        PathBuf::from("/opt/umpv/umpv.conf"),
        PathBuf::from("/home/me/.config/umpv/umpv.conf"),
      ]
    );
  }

  #[test]
  fn test_merge_precedence() {
    let file = FileConfig {
      ipc_server: Some("from-file".into()),
      loadfile_flag: Some(LoadFileFlag::Append),
      mpv_path: Some(String::new()),
      mpv_args: vec![],
    };

    let settings = Settings::merge(Overrides::default(), file.clone());
    assert_eq!(settings.ipc_server.as_deref(), Some("from-file"));
    assert_eq!(settings.loadfile_flag, LoadFileFlag::Append);
    assert_eq!(settings.mpv_path, None);

    let settings = Settings::merge(
      Overrides {
        ipc_server: Some("from-cli".into()),
        loadfile_flag: Some(LoadFileFlag::Replace),
      },
      file,
    );
    assert_eq!(settings.ipc_server.as_deref(), Some("from-cli"));
    assert_eq!(settings.loadfile_flag, LoadFileFlag::Replace);
  }

  #[test]
  fn test_merge_defaults() {
    let settings = Settings::merge(
      Overrides {
        ipc_server: Some(String::new()),
        loadfile_flag: None,
      },
      FileConfig::default(),
    );
    assert_eq!(settings.ipc_server, None);
    assert_eq!(settings.loadfile_flag, LoadFileFlag::AppendPlay);
  }
}
