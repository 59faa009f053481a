//! Engine configuration loaded from TOML.
//!
//! Resolution precedence (highest wins):
//! 1. explicit path (`--config`)
//! 2. `ASYNCBC_CONFIG` env var
//! 3. `./asyncbc.toml` in the working directory
//! 4. `<config dir>/asyncbc/config.toml`
//! 5. built-in defaults
//!
//! `ASYNCBC_THREADS` then overrides `threads`. CLI flags are applied on top
//! by the binary.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::graph::GraphFormat;
use crate::worklist::WorklistOrder;

pub const CONFIG_ENV: &str = "ASYNCBC_CONFIG";
pub const THREADS_ENV: &str = "ASYNCBC_THREADS";
pub const LOCAL_CONFIG_FILE: &str = "asyncbc.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub worklist_order: WorklistOrder,
    #[serde(default)]
    pub count_actions: bool,
    #[serde(default)]
    pub check_consistency: bool,
    #[serde(default)]
    pub graph: GraphConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            worklist_order: WorklistOrder::default(),
            count_actions: false,
            check_consistency: false,
            graph: GraphConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub format: GraphFormat,
    #[serde(default)]
    pub symmetrize: bool,
}

/// A configuration together with the file it came from, if any.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EngineConfig,
    pub source: Option<PathBuf>,
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroThreads`] when `threads` is 0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(())
    }
}

/// Parse a config file. A missing file is an error here; discovery decides
/// whether a path is worth loading.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML for
/// [`EngineConfig`].
pub fn load_config_file(path: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str::<EngineConfig>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the effective configuration for a run rooted at `cwd`.
///
/// # Errors
///
/// Returns an error if a discovered config file cannot be parsed, if
/// `ASYNCBC_THREADS` is not a positive integer, or if the result fails
/// [`EngineConfig::validate`].
pub fn resolve_config(explicit: Option<&Path>, cwd: &Path) -> Result<ResolvedConfig, ConfigError> {
    let env_path = env::var_os(CONFIG_ENV).map(PathBuf::from);
    let user_path = dirs::config_dir().map(|dir| dir.join("asyncbc/config.toml"));
    let env_threads = env::var(THREADS_ENV).ok();

    resolve_config_inner(
        explicit,
        env_path.as_deref(),
        cwd,
        user_path.as_deref(),
        env_threads.as_deref(),
    )
}

/// Core resolution logic, separated from process environment for testability.
fn resolve_config_inner(
    explicit: Option<&Path>,
    env_path: Option<&Path>,
    cwd: &Path,
    user_path: Option<&Path>,
    env_threads: Option<&str>,
) -> Result<ResolvedConfig, ConfigError> {
    // Explicit and env paths must exist; discovered ones are optional.
    let chosen = if let Some(path) = explicit.or(env_path) {
        Some(path.to_path_buf())
    } else {
        let local = cwd.join(LOCAL_CONFIG_FILE);
        if local.is_file() {
            Some(local)
        } else {
            user_path.filter(|p| p.is_file()).map(Path::to_path_buf)
        }
    };

    let mut config = match &chosen {
        Some(path) => load_config_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(raw) = env_threads {
        config.threads = parse_threads(raw)?;
    }

    config.validate()?;

    Ok(ResolvedConfig {
        config,
        source: chosen,
    })
}

fn parse_threads(raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::ZeroThreads),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::BadEnv {
            var: THREADS_ENV,
            value: raw.to_string(),
        }),
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let resolved =
            resolve_config_inner(None, None, dir.path(), None, None).expect("resolve defaults");
        assert!(resolved.source.is_none());
        assert!(resolved.config.threads >= 1);
        assert_eq!(resolved.config.worklist_order, WorklistOrder::Fifo);
        assert!(!resolved.config.count_actions);
        assert!(!resolved.config.graph.symmetrize);
        assert_eq!(resolved.config.graph.format, GraphFormat::Auto);
    }

    #[test]
    fn local_file_is_discovered() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(
            dir.path().join(LOCAL_CONFIG_FILE),
            "threads = 3\nworklist_order = \"lifo\"\n\n[graph]\nsymmetrize = true\n",
        )
        .expect("write config");

        let resolved =
            resolve_config_inner(None, None, dir.path(), None, None).expect("resolve local");
        assert_eq!(resolved.config.threads, 3);
        assert_eq!(resolved.config.worklist_order, WorklistOrder::Lifo);
        assert!(resolved.config.graph.symmetrize);
        assert_eq!(
            resolved.source.as_deref(),
            Some(dir.path().join(LOCAL_CONFIG_FILE).as_path())
        );
    }

    #[test]
    fn explicit_path_beats_local_file() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), "threads = 3\n").expect("write");
        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "threads = 5\ncount_actions = true\n").expect("write");

        let resolved = resolve_config_inner(Some(&explicit), None, dir.path(), None, None)
            .expect("resolve explicit");
        assert_eq!(resolved.config.threads, 5);
        assert!(resolved.config.count_actions);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        let err = resolve_config_inner(Some(&missing), None, dir.path(), None, None)
            .expect_err("missing explicit config must fail");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_threads_override_file() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), "threads = 3\n").expect("write");
        let resolved = resolve_config_inner(None, None, dir.path(), None, Some("7"))
            .expect("resolve with env");
        assert_eq!(resolved.config.threads, 7);
    }

    #[test]
    fn zero_threads_rejected() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), "threads = 0\n").expect("write");
        let err = resolve_config_inner(None, None, dir.path(), None, None)
            .expect_err("zero threads must fail");
        assert!(matches!(err, ConfigError::ZeroThreads));

        let err = parse_threads("many").expect_err("non-numeric must fail");
        assert!(matches!(err, ConfigError::BadEnv { .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join(LOCAL_CONFIG_FILE), "threads = [oops\n").expect("write");
        let err = resolve_config_inner(None, None, dir.path(), None, None)
            .expect_err("bad toml must fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn format_names_are_kebab_case() {
        let cfg: EngineConfig =
            toml::from_str("[graph]\nformat = \"edge-list\"\n").expect("parse format");
        assert_eq!(cfg.graph.format, GraphFormat::EdgeList);
        let cfg: EngineConfig = toml::from_str("[graph]\nformat = \"gr\"\n").expect("parse gr");
        assert_eq!(cfg.graph.format, GraphFormat::Gr);
    }
}
