//! No-mock state validation + resolution tests.
//!
//! Covers:
//! - Loading and validating real JSON state files from a temp dir
//! - Resolution order (CLI > BANKER_STATE > BANKER_CONFIG_DIR)
//! - Preset determinism and snapshot hashing

use bk_config::preset::{get_preset, list_presets, PresetName};
use bk_config::resolve::{resolve_state_path, StateSource};
use bk_config::validate::{validate_state, ValidationError};
use bk_config::{StateFile, StateSnapshot, SystemShape};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let mut saved = Vec::with_capacity(keys.len());
        for key in keys {
            saved.push(env::var(key).ok());
            env::remove_var(key);
        }
        EnvGuard {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.keys.iter().zip(self.saved.iter()) {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write fixture");
    path
}

mod loading {
    use super::*;

    #[test]
    fn well_formed_state_loads_and_validates() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "state.json",
            r#"{
                "available": [1, 2],
                "allocation": [[1, 0], [0, 1]],
                "max": [[2, 2], [1, 3]],
                "total": [2, 3]
            }"#,
        );
        let state = StateFile::load_validated(&path).expect("valid state");
        assert_eq!(state.schema_version, bk_config::STATE_SCHEMA_VERSION);
        assert_eq!(state.shape().processes, 2);
        assert_eq!(state.shape().resources, 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = StateFile::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ValidationError::Io { .. }));
        assert_eq!(err.code(), 60);
    }

    #[test]
    fn missing_field_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "state.json", r#"{"available": [1], "max": [[1]]}"#);
        let err = StateFile::load(&path).unwrap_err();
        assert!(matches!(err, ValidationError::Parse(_)));
    }

    #[test]
    fn ragged_matrix_is_shape_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "state.json",
            r#"{"available": [1, 1], "allocation": [[0, 0], [0]], "max": [[1, 1], [1, 1]]}"#,
        );
        let err = StateFile::load_validated(&path).unwrap_err();
        assert!(matches!(err, ValidationError::Shape(_)), "{}", err);
    }

    #[test]
    fn future_schema_version_is_rejected() {
        let state = StateFile {
            schema_version: "9.0.0".to_string(),
            ..get_preset(PresetName::Idle)
        };
        assert!(matches!(
            validate_state(&state).unwrap_err(),
            ValidationError::VersionMismatch { .. }
        ));
    }

    #[test]
    fn checks_run_in_order_signs_before_claims() {
        let dir = TempDir::new().unwrap();
        // Negative available and max below allocation: signs are reported first.
        let path = write_file(
            &dir,
            "state.json",
            r#"{"available": [-1], "allocation": [[2]], "max": [[1]]}"#,
        );
        let err = StateFile::load_validated(&path).unwrap_err();
        match err {
            ValidationError::Negative { field, value } => {
                assert_eq!(field, "available[0]");
                assert_eq!(value, -1);
            }
            other => panic!("expected Negative, got {:?}", other),
        }
    }

    #[test]
    fn saved_state_reloads_identically() {
        let dir = TempDir::new().unwrap();
        let original = get_preset(PresetName::Textbook);
        let path = write_file(&dir, "state.json", &original.to_json_pretty());
        assert_eq!(StateFile::load_validated(&path).unwrap(), original);
    }
}

mod resolution {
    use super::*;

    const KEYS: &[&str] = &["BANKER_STATE", "BANKER_CONFIG_DIR"];

    #[test]
    fn cli_path_wins_over_environment() {
        let _lock = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _guard = EnvGuard::new(KEYS);
        env::set_var("BANKER_STATE", "/from/env.json");

        let cli = PathBuf::from("/from/cli.json");
        let resolved = resolve_state_path(Some(&cli));
        assert_eq!(resolved.path, Some(cli));
        assert_eq!(resolved.source, StateSource::CliArgument);
    }

    #[test]
    fn banker_state_is_taken_as_given() {
        let _lock = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _guard = EnvGuard::new(KEYS);
        env::set_var("BANKER_STATE", "/does/not/exist.json");

        let resolved = resolve_state_path(None);
        assert_eq!(resolved.path, Some(PathBuf::from("/does/not/exist.json")));
        assert_eq!(resolved.source, StateSource::Environment);
    }

    #[test]
    fn config_dir_used_only_when_file_exists() {
        let _lock = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap();
        let _guard = EnvGuard::new(KEYS);
        let dir = TempDir::new().unwrap();
        env::set_var("BANKER_CONFIG_DIR", dir.path());

        let before = resolve_state_path(None);
        assert_ne!(before.path, Some(dir.path().join("state.json")));

        let path = write_file(&dir, "state.json", &get_preset(PresetName::Idle).to_json_pretty());
        let after = resolve_state_path(None);
        assert_eq!(after.path, Some(path));
        assert_eq!(after.source, StateSource::Environment);
    }
}

mod presets_and_snapshots {
    use super::*;

    #[test]
    fn every_preset_validates() {
        for info in list_presets() {
            let state = get_preset(info.name);
            validate_state(&state).unwrap_or_else(|e| panic!("{} invalid: {}", info.name, e));
            assert_eq!(state.shape(), info.shape);
        }
    }

    #[test]
    fn presets_are_deterministic() {
        for name in PresetName::ALL {
            assert_eq!(get_preset(*name), get_preset(*name));
        }
    }

    #[test]
    fn snapshot_hash_ignores_file_formatting() {
        let dir = TempDir::new().unwrap();
        let compact = write_file(
            &dir,
            "compact.json",
            r#"{"available":[1],"allocation":[[0]],"max":[[1]]}"#,
        );
        let spaced = write_file(
            &dir,
            "spaced.json",
            "{\n  \"max\": [[1]],\n  \"allocation\": [[0]],\n  \"available\": [1]\n}",
        );
        let a = StateSnapshot::capture(
            &StateFile::load(&compact).unwrap(),
            StateSource::CliArgument,
            Some(&compact),
        );
        let b = StateSnapshot::capture(
            &StateFile::load(&spaced).unwrap(),
            StateSource::CliArgument,
            Some(&spaced),
        );
        assert!(a.same_state(&b));
        assert_eq!(a.state_id(), b.state_id());
    }

    #[test]
    fn zeroed_state_from_shape_validates() {
        let state = SystemShape::new(4, 2).zeroed_state();
        validate_state(&state).unwrap();
        assert_eq!(state.max.process_count(), 4);
    }
}
