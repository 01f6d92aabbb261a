//! caseflow configuration (`caseflow.toml`).
//!
//! Selects the storage backend and the update and audit policies. Missing
//! file → all defaults (no error).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "caseflow.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level caseflow configuration.
///
/// ```toml
/// [store]
/// backend = "file"
/// path = ".caseflow"
///
/// [update]
/// auto_merge = true
///
/// [audit]
/// record_empty_updates = false
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseflowConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub update: UpdateConfig,

    #[serde(default)]
    pub audit: AuditConfig,
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Storage backend selection.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Root directory of the file store, relative to the config file's
    /// directory when not absolute.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".caseflow")
}

/// Which storage backend to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// One JSON document per case under `store.path`.
    #[default]
    File,
    /// In-process only; nothing survives the process. For library use and
    /// tests; the CLI refuses it.
    Memory,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateConfig
// ---------------------------------------------------------------------------

/// Update policy.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateConfig {
    /// Merge non-overlapping concurrent edits without the client asking.
    ///
    /// When `false`, a mergeable update is only merged if the request says
    /// `resolveMode = "merge"`; otherwise the conflict details are returned
    /// and nothing is written.
    #[serde(default = "default_auto_merge")]
    pub auto_merge: bool,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            auto_merge: default_auto_merge(),
        }
    }
}

const fn default_auto_merge() -> bool {
    true
}

// ---------------------------------------------------------------------------
// AuditConfig
// ---------------------------------------------------------------------------

/// Audit-log policy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Write (and log) updates that change nothing. Off by default: an
    /// empty diff leaves the case and its log untouched.
    #[serde(default)]
    pub record_empty_updates: bool,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a caseflow configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl CaseflowConfig {
    /// Load configuration from a TOML file.
    ///
    /// A relative `store.path` is resolved against the file's directory.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default().rooted_at(path.parent()));
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents)
            .map(|cfg| cfg.rooted_at(path.parent()))
            .map_err(|mut e| {
                e.path = Some(path.to_owned());
                e
            })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }

    fn rooted_at(mut self, dir: Option<&Path>) -> Self {
        if let Some(dir) = dir
            && self.store.path.is_relative()
            && !dir.as_os_str().is_empty()
        {
            self.store.path = dir.join(&self.store.path);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = CaseflowConfig::default();
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(cfg.store.path, PathBuf::from(".caseflow"));
        assert!(cfg.update.auto_merge);
        assert!(!cfg.audit.record_empty_updates);
    }

    #[test]
    fn empty_string_is_defaults() {
        assert_eq!(CaseflowConfig::parse("").unwrap(), CaseflowConfig::default());
    }

    #[test]
    fn parses_every_section() {
        let cfg = CaseflowConfig::parse(
            r#"
[store]
backend = "memory"
path = "/var/lib/caseflow"

[update]
auto_merge = false

[audit]
record_empty_updates = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.store.path, PathBuf::from("/var/lib/caseflow"));
        assert!(!cfg.update.auto_merge);
        assert!(cfg.audit.record_empty_updates);
    }

    #[test]
    fn unknown_field_is_rejected_with_line() {
        let err = CaseflowConfig::parse("[update]\nauto_merge = true\nretries = 3\n").unwrap_err();
        assert!(err.message.starts_with("line 3:"), "got: {}", err.message);
        assert!(err.to_string().starts_with("config error:"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = CaseflowConfig::parse("[store]\nbackend = \"postgres\"\n").unwrap_err();
        assert!(err.message.contains("postgres") || err.message.contains("variant"));
    }

    #[test]
    fn missing_file_is_defaults_rooted_at_parent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CaseflowConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(cfg.store.path, dir.path().join(".caseflow"));
        assert!(cfg.update.auto_merge);
    }

    #[test]
    fn load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[store\n").unwrap();
        let err = CaseflowConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn absolute_store_path_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[store]\npath = \"/srv/cases\"\n").unwrap();
        let cfg = CaseflowConfig::load(&path).unwrap();
        assert_eq!(cfg.store.path, PathBuf::from("/srv/cases"));
    }

    #[test]
    fn backend_display() {
        assert_eq!(StoreBackend::File.to_string(), "file");
        assert_eq!(StoreBackend::Memory.to_string(), "memory");
    }
}
