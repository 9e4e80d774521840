use checksize::progress::{FnProgress, NoProgress};
use checksize::scanner::{
    Blake3Prefix, Digest, FileRecord, HashError, PrefixChecksum, Walker, WalkerConfig,
};
use checksize::signal::CancelToken;
use checksize::uniqueness::{
    checksum_schedule, resolve_with, ResolverConfig, SizeBucketStore, UniquenessResolver,
};
use checksize::worker::spawn_resolution;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// `len` bytes of `base`, switching to `tail` from byte `offset` on.
fn content(len: usize, offset: usize, base: u8, tail: u8) -> Vec<u8> {
    (0..len).map(|i| if i < offset { base } else { tail }).collect()
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> FileRecord {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    FileRecord::new(path, bytes.len() as u64)
}

fn resolve(store: &SizeBucketStore) -> checksize::uniqueness::Resolution {
    resolve_with(store, &Blake3Prefix::new(), &NoProgress, &|| false).unwrap()
}

#[test]
fn test_two_identical_one_divergent_has_no_entry() {
    let dir = tempdir().unwrap();
    let store: SizeBucketStore = vec![
        write(dir.path(), "a.bin", &content(500, 200, 1, 1)),
        write(dir.path(), "b.bin", &content(500, 200, 1, 1)),
        write(dir.path(), "c.bin", &content(500, 200, 1, 2)),
    ]
    .into_iter()
    .collect();

    let resolution = resolve(&store);

    assert!(resolution.result.get(500).is_none());
    assert!(!resolution.cancelled);
    assert_eq!(resolution.stats.exhausted_buckets, 1);
}

#[test]
fn test_divergence_offsets_map_to_schedule_points() {
    // schedule(500) = [128, 256, 384, 512, 628]
    for (offset, expected) in [(0, 128), (127, 128), (128, 256), (300, 384), (499, 512)] {
        let dir = tempdir().unwrap();
        let store: SizeBucketStore = vec![
            write(dir.path(), "a.bin", &content(500, offset, 0, 0)),
            write(dir.path(), "b.bin", &content(500, offset, 0, 9)),
        ]
        .into_iter()
        .collect();

        let resolution = resolve(&store);
        assert_eq!(
            resolution.result.get(500),
            Some(expected),
            "divergence at byte {offset}"
        );
    }
}

#[test]
fn test_small_files_resolve_at_floor() {
    let dir = tempdir().unwrap();
    let store: SizeBucketStore = vec![
        write(dir.path(), "a.txt", b"hello"),
        write(dir.path(), "b.txt", b"world"),
    ]
    .into_iter()
    .collect();

    assert_eq!(resolve(&store).result.get(5), Some(128));
}

#[test]
fn test_resolved_prefix_is_minimal() {
    let dir = tempdir().unwrap();
    let store: SizeBucketStore = vec![
        write(dir.path(), "a.bin", &content(10_000, 3000, 4, 4)),
        write(dir.path(), "b.bin", &content(10_000, 3000, 4, 5)),
    ]
    .into_iter()
    .collect();

    let prefix = resolve(&store).result.get(10_000).unwrap();
    let schedule = checksum_schedule(10_000);
    let position = schedule.iter().position(|&p| p == prefix).unwrap();

    assert!(prefix > 3000);
    if position > 0 {
        assert!(schedule[position - 1] <= 3000);
    }
}

#[test]
fn test_zero_length_bucket_never_resolves() {
    let dir = tempdir().unwrap();
    let store: SizeBucketStore = vec![
        write(dir.path(), "empty1", b""),
        write(dir.path(), "empty2", b""),
    ]
    .into_iter()
    .collect();

    let resolution = resolve(&store);
    assert!(resolution.result.is_empty());
    assert_eq!(resolution.stats.candidate_buckets, 1);
}

#[test]
fn test_deleted_file_is_counted_not_fatal() {
    let dir = tempdir().unwrap();
    let gone = write(dir.path(), "gone.bin", &[1u8; 300]);
    let store: SizeBucketStore = vec![
        write(dir.path(), "a.bin", &[2u8; 300]),
        write(dir.path(), "b.bin", &[3u8; 300]),
        gone.clone(),
        write(dir.path(), "x.bin", &[1u8; 40]),
        write(dir.path(), "y.bin", &[2u8; 40]),
    ]
    .into_iter()
    .collect();
    fs::remove_file(&gone.path).unwrap();

    let resolution = resolve(&store);

    assert!(resolution.result.get(300).is_none());
    assert_eq!(resolution.result.get(40), Some(128));
    assert!(resolution.stats.digest_errors() > 0);
}

#[test]
fn test_idempotent_across_runs() {
    let dir = tempdir().unwrap();
    let mut records = Vec::new();
    for (i, offset) in [10usize, 600, 2000].into_iter().enumerate() {
        for j in 0..3u8 {
            records.push(write(
                dir.path(),
                &format!("f{i}_{j}.bin"),
                &content(4096, offset, 0, j),
            ));
        }
    }
    let store: SizeBucketStore = records.into_iter().collect();

    let first = resolve(&store);
    let second = resolve(&store);

    assert_eq!(first.result, second.result);
}

#[test]
fn test_cancellation_yields_subset_of_full_result() {
    let dir = tempdir().unwrap();
    let mut records = Vec::new();
    for size in [300usize, 700, 1500, 3000, 6000] {
        records.push(write(dir.path(), &format!("a{size}"), &content(size, 0, 1, 1)));
        records.push(write(dir.path(), &format!("b{size}"), &content(size, 0, 2, 2)));
    }
    let store: SizeBucketStore = records.into_iter().collect();
    let full = resolve(&store);
    assert_eq!(full.result.len(), 5);

    for cutoff in 0..12 {
        let polls = AtomicUsize::new(0);
        let should_cancel = || polls.fetch_add(1, Ordering::SeqCst) >= cutoff;
        let partial =
            resolve_with(&store, &Blake3Prefix::new(), &NoProgress, &should_cancel).unwrap();

        assert!(partial.result.is_subset_of(&full.result), "cutoff {cutoff}");
        if partial.cancelled {
            assert!(partial.result.len() < full.result.len());
        }
    }
}

/// BLAKE3 digests that trip `token` once `budget` digests have been taken.
struct CancelAfter {
    token: CancelToken,
    budget: usize,
    taken: AtomicUsize,
}

impl PrefixChecksum for CancelAfter {
    fn checksum(&self, path: &Path, prefix_len: u64) -> Result<Digest, HashError> {
        if self.taken.fetch_add(1, Ordering::SeqCst) + 1 >= self.budget {
            self.token.cancel();
        }
        Blake3Prefix::new().checksum(path, prefix_len)
    }
}

fn distinct_buckets(dir: &Path) -> SizeBucketStore {
    let mut records = Vec::new();
    for size in [300usize, 700, 1500, 3000, 6000, 9000, 12_000, 20_000] {
        records.push(write(dir, &format!("a{size}"), &content(size, 0, 1, 1)));
        records.push(write(dir, &format!("b{size}"), &content(size, 0, 2, 2)));
    }
    records.into_iter().collect()
}

#[test]
fn test_parallel_cancellation_yields_subset_of_full_result() {
    let dir = tempdir().unwrap();
    let store = distinct_buckets(dir.path());
    let full = resolve(&store);
    assert_eq!(full.result.len(), 8);

    for budget in [1usize, 2, 3, 5, 8, 13] {
        let token = CancelToken::new();
        let checksum = Arc::new(CancelAfter {
            token: token.clone(),
            budget,
            taken: AtomicUsize::new(0),
        });
        let partial = UniquenessResolver::new(
            checksum,
            ResolverConfig::default()
                .with_io_threads(3)
                .with_cancel_token(token),
        )
        .resolve(&store)
        .unwrap();

        assert!(partial.result.is_subset_of(&full.result), "budget {budget}");
        assert!(partial.stats.finished_buckets <= partial.stats.candidate_buckets);
        if partial.cancelled {
            assert!(partial.result.len() < full.result.len(), "budget {budget}");
        }
    }
}

#[test]
fn test_parallel_run_cancelled_up_front_does_nothing() {
    let dir = tempdir().unwrap();
    let store = distinct_buckets(dir.path());
    let token = CancelToken::new();
    token.cancel();

    let resolution = UniquenessResolver::new(
        Arc::new(Blake3Prefix::new()),
        ResolverConfig::default()
            .with_io_threads(4)
            .with_cancel_token(token),
    )
    .resolve(&store)
    .unwrap();

    assert!(resolution.cancelled);
    assert!(resolution.result.is_empty());
    assert_eq!(resolution.stats.finished_buckets, 0);
    assert_eq!(resolution.stats.digests_computed, 0);
}

#[test]
fn test_progress_reaches_total() {
    let dir = tempdir().unwrap();
    let mut records = Vec::new();
    for size in [10usize, 20, 30] {
        records.push(write(dir.path(), &format!("a{size}"), &vec![1u8; size]));
        records.push(write(dir.path(), &format!("b{size}"), &vec![2u8; size]));
    }
    records.push(write(dir.path(), "single", &[0u8; 77]));
    let store: SizeBucketStore = records.into_iter().collect();

    let seen = Mutex::new(Vec::new());
    let progress = FnProgress::new(|done, total| seen.lock().unwrap().push((done, total)));
    resolve_with(&store, &Blake3Prefix::new(), &progress, &|| false).unwrap();

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen, vec![(0, 3), (1, 3), (2, 3), (3, 3)]);
}

#[test]
fn test_parallel_resolver_matches_sequential_on_disk() {
    let dir = tempdir().unwrap();
    let mut records = Vec::new();
    for size in [200usize, 900, 5000, 20_000] {
        for j in 0..3u8 {
            records.push(write(
                dir.path(),
                &format!("p{size}_{j}"),
                &content(size, size / 3, 7, j),
            ));
        }
    }
    let store: SizeBucketStore = records.into_iter().collect();

    let sequential = UniquenessResolver::with_defaults().resolve(&store).unwrap();
    let parallel = UniquenessResolver::new(
        Arc::new(Blake3Prefix::new()),
        ResolverConfig::default().with_io_threads(3),
    )
    .resolve(&store)
    .unwrap();

    assert_eq!(sequential.result, parallel.result);
    assert_eq!(parallel.stats.finished_buckets, 4);
}

#[test]
fn test_discover_then_resolve_in_background() {
    let dir = tempdir().unwrap();
    let album = dir.path().join("album");
    fs::create_dir(&album).unwrap();
    write(&album, "one.jpg", &content(1000, 0, 1, 1));
    write(&album, "two.jpg", &content(1000, 0, 2, 2));
    write(&album, "three.jpg", &content(1000, 0, 2, 2));
    write(&album, "notes.txt", &content(1000, 0, 3, 3));
    write(&album, "solo.mp3", &[9u8; 64]);

    let discovery = Walker::new(dir.path(), WalkerConfig::default().with_media_only(true)).discover();
    assert_eq!(discovery.records.len(), 4);
    let store: SizeBucketStore = discovery.records.into_iter().collect();

    let handle = spawn_resolution(
        Arc::new(store),
        Arc::new(Blake3Prefix::new()),
        ResolverConfig::default().with_cancel_token(CancelToken::new()),
    )
    .unwrap();
    let events: Vec<_> = handle.events().iter().collect();
    let resolution = handle.join().unwrap();

    // one.jpg differs, but two.jpg and three.jpg are identical
    assert!(resolution.result.get(1000).is_none());
    assert!(!events.is_empty());
}
