use checksize::cli::Cli;
use checksize::error::ExitCode;
use checksize::scanner::{Walker, WalkerConfig};
use checksize::uniqueness::{SizeBucketStore, StoreStats};
use clap::Parser;
use std::fs::{self, File};
use std::io::Write;
use tempfile::tempdir;

fn run(args: &[&str]) -> anyhow::Result<ExitCode> {
    let mut argv = vec!["checksize", "-q"];
    argv.extend_from_slice(args);
    checksize::run_app(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let discovery = Walker::new(dir.path(), WalkerConfig::default()).discover();

    assert!(discovery.records.is_empty());
    assert!(discovery.errors.is_empty());
    assert!(!discovery.cancelled);
}

#[test]
fn test_scan_nested_directories_into_buckets() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("subdir").join("deeper");
    fs::create_dir_all(&sub).unwrap();

    File::create(dir.path().join("a.txt"))
        .unwrap()
        .write_all(b"same size")
        .unwrap();
    File::create(sub.join("b.txt"))
        .unwrap()
        .write_all(b"SAME SIZE")
        .unwrap();
    File::create(sub.join("c.txt"))
        .unwrap()
        .write_all(b"other")
        .unwrap();

    let discovery = Walker::new(dir.path(), WalkerConfig::default()).discover();
    let store: SizeBucketStore = discovery.records.into_iter().collect();
    let stats = StoreStats::from_store(&store);

    assert_eq!(stats.total_files, 3);
    assert_eq!(stats.candidate_buckets, 1);
    assert_eq!(stats.unique_by_size, 1);
    assert_eq!(store.count(9), 2);
}

#[test]
fn test_walk_is_deterministic() {
    let dir = tempdir().unwrap();
    for name in ["z.bin", "a.bin", "m.bin"] {
        fs::write(dir.path().join(name), name).unwrap();
    }

    let first: Vec<_> = Walker::new(dir.path(), WalkerConfig::default())
        .discover()
        .records;
    let second: Vec<_> = Walker::new(dir.path(), WalkerConfig::default())
        .discover()
        .records;

    assert_eq!(first, second);
}

#[test]
fn test_run_app_scan_success() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), [1u8; 256]).unwrap();
    fs::write(dir.path().join("b.bin"), [2u8; 256]).unwrap();

    let code = run(&["scan", dir.path().to_str().unwrap(), "--output", "json"]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_run_app_scan_no_candidates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), [1u8; 10]).unwrap();
    fs::write(dir.path().join("b.bin"), [2u8; 20]).unwrap();

    let code = run(&["scan", dir.path().to_str().unwrap()]).unwrap();
    assert_eq!(code, ExitCode::NoCandidates);
}

#[test]
fn test_run_app_scan_missing_directory() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("not-here");

    let err = run(&["scan", missing.to_str().unwrap()]).unwrap_err();
    assert!(format!("{err:#}").contains("not-here"));
}

#[test]
fn test_run_app_rejects_inverted_size_range() {
    let dir = tempdir().unwrap();
    let result = run(&[
        "stats",
        dir.path().to_str().unwrap(),
        "--min-size",
        "1MB",
        "--max-size",
        "1KB",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_run_app_stats_and_schedule() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.bin"), [1u8; 64]).unwrap();
    fs::write(dir.path().join("b.bin"), [1u8; 64]).unwrap();

    let code = run(&["stats", dir.path().to_str().unwrap(), "--output", "csv"]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let code = run(&["schedule", "1MiB"]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_run_app_save_then_resolve_records() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a.bin"), [1u8; 300]).unwrap();
    fs::write(data.join("b.bin"), [2u8; 300]).unwrap();
    let records = dir.path().join("records.json");

    let code = run(&[
        "scan",
        data.to_str().unwrap(),
        "--save-records",
        records.to_str().unwrap(),
        "--output",
        "csv",
    ])
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(records.exists());

    let code = run(&["resolve", records.to_str().unwrap(), "--io-threads", "2"]).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[cfg(unix)]
#[test]
fn test_run_app_saves_records_despite_non_utf8_name() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::write(data.join("a.bin"), [1u8; 300]).unwrap();
    fs::write(data.join("b.bin"), [2u8; 300]).unwrap();
    fs::write(data.join(OsStr::from_bytes(b"\xff\xfe.bin")), [3u8; 300]).unwrap();
    let records = dir.path().join("records.json");

    let code = run(&[
        "scan",
        data.to_str().unwrap(),
        "--save-records",
        records.to_str().unwrap(),
        "--output",
        "csv",
    ])
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    let saved = checksize::records::RecordSet::load(&records).unwrap();
    assert_eq!(saved.len(), 2);
}
