//! `JsonFileStore` against real files in a temporary directory, including
//! injected failures of individual filesystem steps.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use todo_core::{Filesystem, JsonFileStore, RecordStore, StdFilesystem, StoreError, Todo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fail {
    Nothing,
    Write,
    Rename,
    Link,
}

/// Delegates to `StdFilesystem` but fails the chosen step and records
/// directory syncs. With `hide_target` set, `exists` always answers false,
/// as it would for a process that lost a race to create the file.
#[derive(Debug)]
struct FaultyFilesystem {
    fail: Fail,
    hide_target: bool,
    synced: Mutex<Vec<PathBuf>>,
}

impl FaultyFilesystem {
    fn new(fail: Fail) -> Self {
        Self {
            fail,
            hide_target: false,
            synced: Mutex::new(Vec::new()),
        }
    }
}

impl Filesystem for &FaultyFilesystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        StdFilesystem.read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if self.fail == Fail::Write {
            // Leave a partial staging file behind, as a crash mid-write would.
            StdFilesystem.write(path, &bytes[..bytes.len() / 2])?;
            return Err(io::Error::other("injected write failure"));
        }
        StdFilesystem.write(path, bytes)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        StdFilesystem.create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.fail == Fail::Rename {
            return Err(io::Error::other("injected rename failure"));
        }
        StdFilesystem.rename(from, to)
    }

    fn hard_link(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.fail == Fail::Link {
            return Err(io::Error::other("injected link failure"));
        }
        StdFilesystem.hard_link(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        StdFilesystem.remove_file(path)
    }

    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        self.synced.lock().unwrap().push(dir.to_path_buf());
        StdFilesystem.sync_dir(dir)
    }

    fn exists(&self, path: &Path) -> bool {
        !self.hide_target && StdFilesystem.exists(path)
    }
}

fn entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    entries.sort();
    entries
}

#[test]
fn load_missing_file_initializes_empty_collection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("todos.json");
    let store = JsonFileStore::new(&path);

    assert!(!store.exists());
    assert!(store.load().unwrap().is_empty());
    assert!(store.exists());
    assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
}

#[test]
fn initialize_is_idempotent_and_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("todos.json"));
    store.initialize().unwrap();
    store.initialize().unwrap();

    let todo = Todo::new("Keep me").unwrap();
    store.save(&[todo.clone()]).unwrap();
    store.initialize().unwrap();
    assert_eq!(store.load().unwrap(), vec![todo]);
}

#[test]
fn initialize_fails_when_parent_is_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let store = JsonFileStore::new(blocker.join("todos.json"));

    let err = store.initialize().unwrap_err();
    assert!(matches!(err, StoreError::Init { .. }), "{err}");
}

#[test]
fn save_then_load_preserves_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("todos.json"));
    let todos: Vec<Todo> = ["first", "second", "third"]
        .iter()
        .map(|d| Todo::new(d).unwrap())
        .collect();

    store.save(&todos).unwrap();
    assert_eq!(store.load().unwrap(), todos);

    store.save(&todos[1..]).unwrap();
    assert_eq!(store.load().unwrap(), todos[1..].to_vec());
}

#[test]
fn saved_file_uses_camel_case_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let store = JsonFileStore::new(&path);
    store.save(&[Todo::new("Buy milk").unwrap()]).unwrap();

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let record = &raw.as_array().unwrap()[0];
    assert_eq!(record["description"], "Buy milk");
    assert_eq!(record["completed"], false);
    assert!(record["createdAt"].as_str().unwrap().ends_with('Z'));
    assert!(record["updatedAt"].is_string());
}

#[test]
fn load_malformed_file_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let store = JsonFileStore::new(&path);

    for content in ["{not json", "{\"id\": 1}", ""] {
        std::fs::write(&path, content).unwrap();
        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Format { .. }), "{content:?}: {err}");
    }
}

#[test]
fn load_unreadable_location_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    std::fs::create_dir(&path).unwrap();

    let err = JsonFileStore::new(&path).load().unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }), "{err}");
}

#[test]
fn failed_rename_keeps_previous_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let original = vec![Todo::new("Original").unwrap()];
    JsonFileStore::new(&path).save(&original).unwrap();
    let before = std::fs::read(&path).unwrap();

    let rename_fails = FaultyFilesystem::new(Fail::Rename);
    let faulty = JsonFileStore::with_filesystem(&path, &rename_fails);
    let err = faulty.save(&[Todo::new("Replacement").unwrap()]).unwrap_err();

    assert!(matches!(err, StoreError::Write { .. }), "{err}");
    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(entries(dir.path()), vec![path]);
}

#[test]
fn failed_rename_without_prior_file_leaves_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");

    let rename_fails = FaultyFilesystem::new(Fail::Rename);
    let faulty = JsonFileStore::with_filesystem(&path, &rename_fails);
    assert!(faulty.save(&[Todo::new("Lost").unwrap()]).is_err());

    assert!(!path.exists());
    assert!(entries(dir.path()).is_empty());
}

#[test]
fn failed_staging_write_removes_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let original = vec![Todo::new("Original").unwrap()];
    JsonFileStore::new(&path).save(&original).unwrap();

    let write_fails = FaultyFilesystem::new(Fail::Write);
    let faulty = JsonFileStore::with_filesystem(&path, &write_fails);
    let err = faulty.save(&[Todo::new("Replacement").unwrap()]).unwrap_err();

    assert!(matches!(err, StoreError::Write { .. }), "{err}");
    assert_eq!(JsonFileStore::new(&path).load().unwrap(), original);
    assert_eq!(entries(dir.path()), vec![path]);
}

#[test]
fn interrupted_initialize_leaves_no_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");

    for fail in [Fail::Write, Fail::Link] {
        let filesystem = FaultyFilesystem::new(fail);
        let err = JsonFileStore::with_filesystem(&path, &filesystem)
            .initialize()
            .unwrap_err();
        assert!(matches!(err, StoreError::Init { .. }), "{fail:?}: {err}");
        assert!(entries(dir.path()).is_empty(), "{fail:?}");
    }

    // After a restart the store initializes and reads as empty.
    let store = JsonFileStore::new(&path);
    store.initialize().unwrap();
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn initialize_writes_complete_file_and_removes_staging() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let filesystem = FaultyFilesystem::new(Fail::Nothing);
    let store = JsonFileStore::with_filesystem(&path, &filesystem);

    store.initialize().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");
    assert_eq!(entries(dir.path()), vec![path.clone()]);
    assert_eq!(*filesystem.synced.lock().unwrap(), vec![dir.path().to_path_buf()]);
}

#[test]
fn initialize_does_not_replace_a_file_created_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let todo = Todo::new("Written first").unwrap();
    JsonFileStore::new(&path).save(&[todo.clone()]).unwrap();

    let filesystem = FaultyFilesystem {
        hide_target: true,
        ..FaultyFilesystem::new(Fail::Nothing)
    };
    JsonFileStore::with_filesystem(&path, &filesystem)
        .initialize()
        .unwrap();

    assert_eq!(JsonFileStore::new(&path).load().unwrap(), vec![todo]);
    assert_eq!(entries(dir.path()), vec![path]);
}

#[test]
fn save_syncs_the_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    let filesystem = FaultyFilesystem::new(Fail::Nothing);
    let store = JsonFileStore::with_filesystem(&path, &filesystem);

    store.save(&[Todo::new("Durable").unwrap()]).unwrap();
    assert_eq!(*filesystem.synced.lock().unwrap(), vec![dir.path().to_path_buf()]);

    // A failed save does not sync.
    let rename_fails = FaultyFilesystem::new(Fail::Rename);
    let _ = JsonFileStore::with_filesystem(&path, &rename_fails).save(&[]);
    assert!(rename_fails.synced.lock().unwrap().is_empty());
}

#[test]
fn location_is_the_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todos.json");
    assert_eq!(JsonFileStore::new(&path).location(), path.as_path());
}
