//! Integration tests for ConfigStore and config.ini handling
//!
//! These tests verify:
//! - First-run creation of config.ini
//! - Loading files written by hand or by older releases
//! - Save/load round trips
//! - Error reporting for malformed files
//! - Path resolution

use camino::{Utf8Path, Utf8PathBuf};
use ocswapper::{ConfigError, ConfigStore, Configuration, Variant};
use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_dir)
}

fn filled_config() -> Configuration {
    Configuration {
        steamvr_hash: "0123456789abcdef0123456789abcdef".to_string(),
        opencomposite_hash: "fedcba9876543210fedcba9876543210".to_string(),
        target_dir: "C:\\Games\\Steam\\steamapps\\common\\SkyrimVR".to_string(),
        steamvr_storage_dir: "D:\\Swap\\SteamVR Files".to_string(),
        opencomposite_storage_dir: "D:\\Swap\\OpenComposite Files".to_string(),
        last_used: Some(Variant::OpenComposite),
    }
}

#[test]
fn test_create_config_store() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();

    assert_eq!(store.config_path(), config_dir.join("config.ini"));
    assert_eq!(store.base_dir(), config_dir);
}

#[test]
fn test_store_creates_missing_directory() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let nested = config_dir.join("a").join("b");

    let store = ConfigStore::in_dir(&nested).unwrap();
    assert!(nested.exists());
    assert_eq!(store.base_dir(), nested);
}

#[test]
fn test_first_run_creates_default_file() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();

    let config = store.load().unwrap();

    assert!(config.steamvr_hash.is_empty());
    assert!(config.opencomposite_hash.is_empty());
    assert!(config.target_dir.is_empty());
    assert_eq!(config.steamvr_storage_dir, "SteamVR Files");
    assert_eq!(config.opencomposite_storage_dir, "OpenComposite Files");
    assert!(!config.is_complete());

    // Second load reads the file that was just written
    let reloaded = store.load().unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn test_load_hand_written_file() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();

    // Spaces around '=' and CRLF line endings, as older releases wrote them
    let content = "[FILES]\r\n\
        SteamFile = 0123456789ABCDEF0123456789ABCDEF\r\n\
        OpenCompositeFile = fedcba9876543210fedcba9876543210\r\n\
        OpenVRDLLFilePath = C:\\Games\\SkyrimVR\r\n\
        SteamVRStorageFolder = SteamVR Files\r\n\
        OpenCompositeStorageFolder = OpenComposite Files\r\n\
        \r\n\
        [RUNTIME]\r\n\
        LastUsed = 1\r\n";
    fs::write(store.config_path(), content).unwrap();

    let config = store.load().unwrap();
    assert_eq!(config.steamvr_hash, "0123456789ABCDEF0123456789ABCDEF");
    assert_eq!(config.target_dir, "C:\\Games\\SkyrimVR");
    assert_eq!(config.opencomposite_storage_dir, "OpenComposite Files");
    assert_eq!(config.last_used, Some(Variant::OpenComposite));
    assert!(config.is_complete());
}

#[test]
fn test_missing_keys_read_as_empty() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();
    fs::write(store.config_path(), "[FILES]\nSteamFile=abc\n").unwrap();

    let config = store.load().unwrap();
    assert_eq!(config.steamvr_hash, "abc");
    assert_eq!(config.opencomposite_hash, "");
    assert_eq!(config.last_used, None);
    assert_eq!(
        config.missing_fields(),
        vec![
            "OpenCompositeFile",
            "OpenVRDLLFilePath",
            "SteamVRStorageFolder",
            "OpenCompositeStorageFolder"
        ]
    );
}

#[test]
fn test_unrecognized_last_used_is_ignored() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();
    fs::write(store.config_path(), "[FILES]\n[RUNTIME]\nLastUsed=7\n").unwrap();

    assert_eq!(store.load().unwrap().last_used, None);
}

#[test]
fn test_malformed_file_is_a_parse_error() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();
    fs::write(store.config_path(), "[FILES\nSteamFile=abc\n").unwrap();

    let err = store.load().unwrap_err();
    match err {
        ConfigError::Parse { path, line, .. } => {
            assert_eq!(path, store.config_path());
            assert!(line >= 1);
        }
        other => panic!("Expected parse error, got: {:?}", other),
    }
}

#[test]
fn test_keys_outside_sections_are_ignored() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();
    fs::write(store.config_path(), "SteamFile=abc\n[FILES]\nOpenCompositeFile=def\n").unwrap();

    let config = store.load().unwrap();
    assert_eq!(config.steamvr_hash, "");
    assert_eq!(config.opencomposite_hash, "def");
}

#[test]
fn test_save_and_load_config() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();

    let config = filled_config();
    store.save(&config).unwrap();

    assert_eq!(store.load().unwrap(), config);
}

#[test]
fn test_save_leaves_no_temp_files() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();

    store.save(&filled_config()).unwrap();
    store.save(&Configuration::default()).unwrap();

    let entries: Vec<_> = fs::read_dir(&config_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_load_then_save_keeps_values_and_order() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();

    let hand_written = "[FILES]\n\
        SteamFile=0123456789abcdef0123456789abcdef\n\
        OpenCompositeFile=fedcba9876543210fedcba9876543210\n\
        OpenVRDLLFilePath=C:\\Games\\SkyrimVR\n\
        SteamVRStorageFolder=SteamVR Files\n\
        OpenCompositeStorageFolder=OpenComposite Files\n\
        \n\
        [RUNTIME]\n\
        LastUsed=0\n";
    fs::write(store.config_path(), hand_written).unwrap();

    let config = store.load().unwrap();
    store.save(&config).unwrap();
    assert_eq!(store.load().unwrap(), config);

    let saved = fs::read_to_string(store.config_path()).unwrap();
    let lines: Vec<&str> = saved.lines().filter(|l| !l.is_empty()).collect();
    let expected: Vec<&str> = hand_written.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(lines, expected);
}

#[test]
fn test_resolve_against_config_directory() {
    let (_temp_dir, config_dir) = create_test_config_dir();
    let store = ConfigStore::in_dir(&config_dir).unwrap();

    let config = Configuration {
        target_dir: "/games/SkyrimVR".to_string(),
        ..Configuration::default()
    };
    let resolved = store.resolve(&config);

    assert_eq!(
        resolved.target_path,
        Utf8Path::new("/games/SkyrimVR/openvr_api.dll")
    );
    assert_eq!(
        resolved.steamvr_storage_path,
        config_dir.join("SteamVR Files").join("openvr_api.dll")
    );
    assert_eq!(
        resolved.opencomposite_storage_path,
        config_dir.join("OpenComposite Files").join("openvr_api.dll")
    );
}

fn field() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_:/.\\\\-]([A-Za-z0-9 _:/.=\\\\-]{0,30}[A-Za-z0-9_:/.\\\\-])?"
}

fn last_used() -> impl Strategy<Value = Option<Variant>> {
    prop_oneof![
        Just(None),
        Just(Some(Variant::SteamVr)),
        Just(Some(Variant::OpenComposite)),
    ]
}

proptest! {
    #[test]
    fn prop_save_then_load_round_trips(
        steamvr_hash in field(),
        opencomposite_hash in field(),
        target_dir in field(),
        steamvr_storage_dir in field(),
        opencomposite_storage_dir in field(),
        last_used in last_used(),
    ) {
        let (_temp_dir, config_dir) = create_test_config_dir();
        let store = ConfigStore::in_dir(&config_dir).unwrap();

        let config = Configuration {
            steamvr_hash,
            opencomposite_hash,
            target_dir,
            steamvr_storage_dir,
            opencomposite_storage_dir,
            last_used,
        };
        store.save(&config).unwrap();

        prop_assert_eq!(store.load().unwrap(), config);
    }
}
