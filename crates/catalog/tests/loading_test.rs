use catalog::{CatalogError, ConfigStore, Language, LanguageCodes, TranslationTable};
use std::fs;
use tempfile::tempdir;

/// Test loading a model configuration and its translation table from disk
///
/// Tests:
/// - Config identifiers resolve to a table under the translations directory
/// - Translation lookups for both languages
/// - Unknown keys survive in the config document
#[test]
fn test_config_and_table_load_together() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("model_config.json");
    let translations_dir = dir.path().join("translations");
    fs::create_dir(&translations_dir).unwrap();

    fs::write(
        &config_path,
        r#"{"model_name": "yolov8m.onnx", "translate_name": "coco.csv", "notes": "default"}"#,
    )
    .unwrap();
    fs::write(
        translations_dir.join("coco.csv"),
        "english,class_number,russian\nperson,0,человек\ndog,16,собака\n",
    )
    .unwrap();

    let config = ConfigStore::new(&config_path).load().unwrap();
    assert_eq!(config.model_identifier, "yolov8m.onnx");
    assert!(
        config.document().contains_key("notes"),
        "Unknown keys should be kept in the document"
    );

    let table = TranslationTable::load(&translations_dir, &config.translation_table_identifier)
        .unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.identifier(), "coco.csv");

    let codes = LanguageCodes::default();
    let target = codes.parse("ru").unwrap();
    assert_eq!(table.translate("dog", target), "собака");
    assert_eq!(table.translate("dog", Language::Source), "dog");
}

/// Test that a missing config file is reported with its path
#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");

    let err = ConfigStore::new(&path).load().unwrap_err();

    match &err {
        CatalogError::ConfigLoad { path: reported, .. } => assert_eq!(reported, &path),
        other => panic!("Expected ConfigLoad, got {:?}", other),
    }
    assert!(err.to_string().contains("absent.json"));
}

/// Test that a malformed table names the file and the offending row
#[test]
fn test_malformed_table_reports_row() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("broken.csv"),
        "english,class_number,russian\nperson,0,человек\ncat,,кошка\n",
    )
    .unwrap();

    let err = TranslationTable::load(dir.path(), "broken.csv").unwrap_err();

    assert!(matches!(err, CatalogError::TranslationLoad { .. }));
    let message = err.to_string();
    assert!(message.contains("broken.csv"), "got: {}", message);
    assert!(message.contains("row 2"), "got: {}", message);
}

/// Test that a missing table file is a load error, not an empty table
#[test]
fn test_missing_table_file() {
    let dir = tempdir().unwrap();
    let err = TranslationTable::load(dir.path(), "nope.csv").unwrap_err();
    assert!(matches!(err, CatalogError::TranslationLoad { .. }));
}
