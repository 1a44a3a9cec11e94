use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};
use triage_store::{
    Batch, CategorySet, CategoryStore, MergePolicy, StoreConfig, read_snapshot_from_path,
};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "triage-contract-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn open_store(path: &Path) -> CategoryStore {
    CategoryStore::initialize(
        path,
        StoreConfig {
            categories: CategorySet::new(["police", "fire"]).expect("set should build"),
            policy: MergePolicy::default(),
        },
    )
    .expect("store should initialize")
}

fn case(number: &str) -> Value {
    json!({
        "case_number": number,
        "location": "Main St",
        "dispatch": "unit 4",
        "situation": "noise complaint",
        "open_status": "yes",
        "stack_rank": 3
    })
}

#[test]
fn merging_the_same_batch_twice_matches_merging_once() {
    let tmp = TempDirGuard::new("idempotent");
    let path = tmp.path().join("data.json");
    let store = open_store(&path);
    let batch = Batch::from_json(json!({
        "police": [case("P1"), case("P2")],
        "fire": [case("F1")]
    }))
    .expect("batch should parse");

    let first = store.merge(&batch).expect("first merge");
    let once = fs::read_to_string(&path).expect("store file");
    let second = store.merge(&batch).expect("second merge");
    let twice = fs::read_to_string(&path).expect("store file");

    assert_eq!(first.total_added(), 3);
    assert_eq!(second.total_added(), 0);
    assert_eq!(second.total_duplicates(), 3);
    assert_eq!(once, twice);
}

#[test]
fn persisted_file_matches_published_snapshot() {
    let tmp = TempDirGuard::new("persisted");
    let path = tmp.path().join("data.json");
    let store = open_store(&path);
    store
        .merge(&Batch::from_json(json!({ "police": [case("P1")] })).expect("batch"))
        .expect("merge");

    let on_disk = read_snapshot_from_path(&path).expect("file should parse");
    assert_eq!(&on_disk, store.snapshot().expect("snapshot").as_ref());
    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).expect("file"))
        .expect("file should be JSON");
    assert_eq!(
        raw["police"][0],
        json!({
            "case_number": "P1",
            "location": "Main St",
            "dispatch": "unit 4",
            "situation": "noise complaint",
            "open_status": "open",
            "stack_rank": 3
        })
    );
}

#[test]
fn concurrent_merges_never_lose_or_double_insert() {
    let tmp = TempDirGuard::new("concurrent-merge");
    let store = Arc::new(open_store(&tmp.path().join("data.json")));

    let workers = 8usize;
    let barrier = Arc::new(Barrier::new(workers + 1));
    let mut handles = Vec::new();
    for idx in 0..workers {
        let store = Arc::clone(&store);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            // Every worker submits one shared case plus one of its own.
            let batch = Batch::from_json(json!({
                "police": [case("SHARED"), case(&format!("P{idx}"))]
            }))
            .expect("batch should parse");
            barrier.wait();
            store.merge(&batch).expect("merge should succeed")
        }));
    }
    barrier.wait();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker should join"))
        .collect();

    let added: usize = outcomes.iter().map(|o| o.total_added()).sum();
    let duplicates: usize = outcomes.iter().map(|o| o.total_duplicates()).sum();
    assert_eq!(added, workers + 1);
    assert_eq!(duplicates, workers - 1);

    let snapshot = store.snapshot().expect("snapshot");
    let police = snapshot.cases("police").expect("police");
    assert_eq!(police.len(), workers + 1);
    let shared = police.iter().filter(|c| c.case_number == "SHARED").count();
    assert_eq!(shared, 1);
}

#[test]
fn readers_never_observe_part_of_a_merge() {
    let tmp = TempDirGuard::new("atomic-read");
    let store = Arc::new(open_store(&tmp.path().join("data.json")));
    let per_batch = 5usize;
    let batches = 40usize;
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..3 {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        readers.push(thread::spawn(move || {
            let mut observations = 0usize;
            loop {
                let finished = done.load(Ordering::Acquire);
                let snapshot = store.snapshot().expect("snapshot");
                let len = snapshot.cases("police").map(<[_]>::len).unwrap_or(0);
                assert_eq!(len % per_batch, 0, "reader saw a partial merge: {len} cases");
                observations += 1;
                if finished {
                    break;
                }
            }
            observations
        }));
    }

    for batch_idx in 0..batches {
        let cases: Vec<Value> = (0..per_batch)
            .map(|case_idx| case(&format!("B{batch_idx}-{case_idx}")))
            .collect();
        let batch = Batch::from_json(json!({ "police": cases })).expect("batch");
        store.merge(&batch).expect("merge");
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        let observations = reader.join().expect("reader should join");
        assert!(observations > 0);
    }
    let snapshot = store.snapshot().expect("snapshot");
    assert_eq!(
        snapshot.cases("police").map(<[_]>::len),
        Some(per_batch * batches)
    );
}
