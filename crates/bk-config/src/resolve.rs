//! State file path resolution.
//!
//! Resolution order: CLI argument → environment variables → XDG path → none.

use std::path::{Path, PathBuf};

/// Where a state file path came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StateSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via `BANKER_STATE` or found under `BANKER_CONFIG_DIR`.
    Environment,

    /// Found in the XDG config directory.
    XdgConfig,

    /// A built-in preset, not a file.
    Preset,

    /// Nothing found.
    #[default]
    None,
}

impl std::fmt::Display for StateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateSource::CliArgument => write!(f, "CLI argument"),
            StateSource::Environment => write!(f, "environment variable"),
            StateSource::XdgConfig => write!(f, "XDG config"),
            StateSource::Preset => write!(f, "preset"),
            StateSource::None => write!(f, "none"),
        }
    }
}

/// A resolved state path with its provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedStatePath {
    pub path: Option<PathBuf>,
    pub source: StateSource,
}

/// Environment variable names.
const ENV_STATE_PATH: &str = "BANKER_STATE";
const ENV_CONFIG_DIR: &str = "BANKER_CONFIG_DIR";

/// Standard state file name.
const STATE_FILENAME: &str = "state.json";

/// Application name for XDG directories.
const APP_NAME: &str = "bankers-algo";

/// Resolve the state file path.
///
/// 1. Explicit CLI path, even if it does not exist (loading will report it)
/// 2. `BANKER_STATE`, likewise taken as given
/// 3. `BANKER_CONFIG_DIR/state.json`, if present
/// 4. `~/.config/bankers-algo/state.json`, if present
/// 5. None
pub fn resolve_state_path(cli_path: Option<&Path>) -> ResolvedStatePath {
    resolve_with(
        cli_path,
        |name| std::env::var(name).ok(),
        xdg_config_dir(),
    )
}

fn resolve_with<F>(cli_path: Option<&Path>, env: F, xdg_dir: Option<PathBuf>) -> ResolvedStatePath
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = cli_path {
        return ResolvedStatePath {
            path: Some(path.to_path_buf()),
            source: StateSource::CliArgument,
        };
    }

    if let Some(env_path) = env(ENV_STATE_PATH).filter(|v| !v.is_empty()) {
        return ResolvedStatePath {
            path: Some(PathBuf::from(env_path)),
            source: StateSource::Environment,
        };
    }

    if let Some(config_dir) = env(ENV_CONFIG_DIR).filter(|v| !v.is_empty()) {
        let path = PathBuf::from(config_dir).join(STATE_FILENAME);
        if path.exists() {
            return ResolvedStatePath {
                path: Some(path),
                source: StateSource::Environment,
            };
        }
    }

    if let Some(dir) = xdg_dir {
        let path = dir.join(STATE_FILENAME);
        if path.exists() {
            return ResolvedStatePath {
                path: Some(path),
                source: StateSource::XdgConfig,
            };
        }
    }

    ResolvedStatePath::default()
}

/// Get the XDG config directory for bankers-algo.
pub fn xdg_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_state_source_display() {
        assert_eq!(format!("{}", StateSource::CliArgument), "CLI argument");
        assert_eq!(format!("{}", StateSource::Environment), "environment variable");
        assert_eq!(format!("{}", StateSource::XdgConfig), "XDG config");
        assert_eq!(format!("{}", StateSource::None), "none");
    }

    #[test]
    fn test_cli_path_wins_even_if_missing() {
        let resolved = resolve_with(Some(Path::new("/nonexistent/state.json")), no_env, None);
        assert_eq!(resolved.source, StateSource::CliArgument);
        assert_eq!(resolved.path, Some(PathBuf::from("/nonexistent/state.json")));
    }

    #[test]
    fn test_env_state_path() {
        let env = |name: &str| (name == ENV_STATE_PATH).then(|| "/tmp/s.json".to_string());
        let resolved = resolve_with(None, env, None);
        assert_eq!(resolved.source, StateSource::Environment);
        assert_eq!(resolved.path, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn test_config_dir_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dir_str = dir.path().to_string_lossy().to_string();
        let env = move |name: &str| (name == ENV_CONFIG_DIR).then(|| dir_str.clone());

        let resolved = resolve_with(None, &env, None);
        assert_eq!(resolved, ResolvedStatePath::default());

        std::fs::write(dir.path().join(STATE_FILENAME), "{}").unwrap();
        let resolved = resolve_with(None, &env, None);
        assert_eq!(resolved.source, StateSource::Environment);
        assert_eq!(resolved.path, Some(dir.path().join(STATE_FILENAME)));
    }

    #[test]
    fn test_xdg_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(STATE_FILENAME), "{}").unwrap();
        let resolved = resolve_with(None, no_env, Some(dir.path().to_path_buf()));
        assert_eq!(resolved.source, StateSource::XdgConfig);
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_with(None, no_env, Some(dir.path().to_path_buf()));
        assert!(resolved.path.is_none());
        assert_eq!(resolved.source, StateSource::None);
    }

    #[test]
    fn test_xdg_config_dir() {
        if let Some(path) = xdg_config_dir() {
            assert!(path.ends_with(APP_NAME));
        }
    }
}
