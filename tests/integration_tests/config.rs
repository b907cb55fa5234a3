use std::fs;

use bsonite::config::{Config, ConnectionString};
use bsonite::errors::DbError;

#[test]
fn config_file_sets_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bsonite.toml");
    fs::write(
        &path,
        "default_database = \"inventory\"\n[log]\nretention = 3\n[codec]\nmax_depth = 12\n[query]\nslow_query_ms = 50\n",
    )
    .unwrap();
    let mut expected = Config::default();
    expected.default_database = Some("inventory".into());
    expected.codec.max_depth = 12;
    expected.log.retention = 3;
    expected.query.slow_query_ms = 50;
    assert_eq!(Config::from_file(&path).unwrap(), expected);
}

#[test]
fn explicit_path_wins_and_missing_files_fail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[query]\nslow_query_ms = 5\n").unwrap();
    assert_eq!(Config::load(Some(&path)).unwrap().query.slow_query_ms, 5);
    let missing = dir.path().join("absent.toml");
    assert!(matches!(Config::load(Some(&missing)), Err(DbError::Io(_))));
}

#[test]
fn reader_settings_follow_the_codec_section() {
    let cfg = Config::from_toml_str("[codec]\nmax_document_size = 64\nmax_depth = 4\n").unwrap();
    let settings = cfg.reader_settings();
    assert_eq!((settings.max_document_size, settings.max_depth), (64, 4));
    assert!(matches!(Config::from_toml_str("[codec]\nmax_depth = 0\n"), Err(DbError::Configuration(_))));
}

#[test]
fn connection_string_display_is_canonical() {
    let cs: ConnectionString = "mongodb://localhost".parse().unwrap();
    assert_eq!(cs.to_string(), "mongodb://localhost:27017");
    let cs = ConnectionString::parse("mongodb://h1,h2:1234/?replicaSet=rs0").unwrap();
    assert_eq!(cs.database, None);
    assert_eq!(cs.to_string(), "mongodb://h1:27017,h2:1234/?replicaSet=rs0");
}
