use checksize::records::{RecordSet, RecordSettings, RecordsError, RECORDS_VERSION};
use checksize::scanner::{Walker, WalkerConfig};
use checksize::uniqueness::UniquenessResolver;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_records_survive_save_and_load() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("photos");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a.jpg"), [1u8; 700]).unwrap();
    fs::write(data.join("b.jpg"), [2u8; 700]).unwrap();
    fs::write(data.join("c.jpg"), [3u8; 10]).unwrap();

    let config = WalkerConfig::default().with_media_only(true);
    let discovery = Walker::new(&data, config.clone()).discover();
    let set = RecordSet::new(data.clone(), RecordSettings::from(&config), discovery.records);

    let path = dir.path().join("records.json");
    set.save(&path).unwrap();
    let loaded = RecordSet::load(&path).unwrap();

    assert_eq!(loaded.version, RECORDS_VERSION);
    assert_eq!(loaded.root, data);
    assert!(loaded.settings.media_only);
    assert_eq!(loaded.records, set.records);
}

#[test]
fn test_resolving_loaded_records_matches_direct_resolution() {
    let dir = tempdir().unwrap();
    for (name, byte) in [("a.bin", 1u8), ("b.bin", 2), ("c.bin", 3)] {
        fs::write(dir.path().join(name), vec![byte; 2000]).unwrap();
    }
    let discovery = Walker::new(dir.path(), WalkerConfig::default()).discover();
    let set = RecordSet::new(dir.path().to_path_buf(), RecordSettings::default(), discovery.records);

    let path = dir.path().join("saved.json");
    set.save(&path).unwrap();
    let loaded = RecordSet::load(&path).unwrap();

    let resolver = UniquenessResolver::with_defaults();
    let direct = resolver.resolve(&set.to_store()).unwrap();
    let reloaded = resolver.resolve(&loaded.to_store()).unwrap();

    assert_eq!(direct.result, reloaded.result);
    assert_eq!(reloaded.result.get(2000), Some(128));
}

#[test]
fn test_truncated_file_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.json");
    RecordSet::new(dir.path().to_path_buf(), RecordSettings::default(), Vec::new())
        .save(&path)
        .unwrap();

    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, &content[..content.len() / 2]).unwrap();

    assert!(matches!(RecordSet::load(&path), Err(RecordsError::Parse(_))));
}

#[test]
fn test_records_with_vanished_files_still_load() {
    let dir = tempdir().unwrap();
    let victim = dir.path().join("victim.bin");
    fs::write(&victim, b"soon gone").unwrap();
    let discovery = Walker::new(dir.path(), WalkerConfig::default()).discover();
    let set = RecordSet::new(dir.path().to_path_buf(), RecordSettings::default(), discovery.records);

    let path = dir.path().join("records.json");
    set.save(&path).unwrap();
    fs::remove_file(&victim).unwrap();

    let loaded = RecordSet::load(&path).unwrap();
    assert_eq!(loaded.len(), 1);
}
