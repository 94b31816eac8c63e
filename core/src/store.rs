//! Durable storage of the whole todo collection.
//!
//! # Design
//! The collection is small, so it is read and replaced wholesale. A save
//! stages the new document in a hidden sibling file and renames it over the
//! target; the rename is the only consistency mechanism. Readers see either
//! the old document or the new one, never a torn write, and a failed save
//! leaves the old document in place.
//!
//! A new store is created the same way, except the staged file is
//! hard-linked into place: the link fails if the target already exists,
//! so initialization never replaces data and never exposes a half-written
//! file.
//!
//! File access goes through the `Filesystem` adapter so tests can inject
//! failures into individual steps.

use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use uuid::Uuid;

use crate::error::StoreError;
use crate::todo::Todo;

/// A location holding the entire todo collection.
pub trait RecordStore: Send + Sync {
    /// Make sure the location exists, creating it with an empty collection
    /// if absent. Existing content is never touched.
    fn initialize(&self) -> Result<(), StoreError>;

    /// Read the whole collection. An absent location is initialized and
    /// reads as empty.
    fn load(&self) -> Result<Vec<Todo>, StoreError>;

    /// Replace the whole collection.
    fn save(&self, todos: &[Todo]) -> Result<(), StoreError>;

    fn exists(&self) -> bool;

    /// Where the collection lives, for logs and error messages.
    fn location(&self) -> &Path;
}

/// The file operations `JsonFileStore` depends on.
pub trait Filesystem: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Create or truncate `path` and flush `bytes` to disk.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    /// Link `to` to the file at `from`, failing with `AlreadyExists` if
    /// `to` is present.
    fn hard_link(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    /// Flush directory entries (renames, links) of `dir` to disk.
    fn sync_dir(&self, dir: &Path) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// `Filesystem` backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFilesystem;

impl Filesystem for StdFilesystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = std::fs::File::create(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn hard_link(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::hard_link(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        std::fs::File::open(dir)?.sync_all()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

const EMPTY_COLLECTION: &[u8] = b"[]\n";

/// Stores the collection as a pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore<F = StdFilesystem> {
    path: PathBuf,
    fs: F,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_filesystem(path, StdFilesystem)
    }
}

impl<F: Filesystem> JsonFileStore<F> {
    pub fn with_filesystem(path: impl Into<PathBuf>, fs: F) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }

    /// A fresh hidden sibling of the target, unique per write so that
    /// overlapping writers never share a staging file.
    fn staging_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        let staging = format!(".{name}.{}.tmp", Uuid::new_v4().simple());
        match self.parent_dir() {
            Some(parent) => parent.join(staging),
            None => PathBuf::from(staging),
        }
    }

    /// Stage `bytes` in a fresh sibling file, then move it into place with
    /// `publish`. The staging file never outlives the call.
    fn write_staged<P>(&self, bytes: &[u8], publish: P) -> io::Result<()>
    where
        P: FnOnce(&Path, &Path) -> io::Result<()>,
    {
        if let Some(parent) = self.parent_dir() {
            self.fs.create_dir_all(parent)?;
        }
        let staging = self.staging_path();
        let result = self
            .fs
            .write(&staging, bytes)
            .and_then(|()| publish(&staging, &self.path));
        self.remove_staging(&staging);
        if result.is_ok() {
            self.sync_parent();
        }
        result
    }

    fn remove_staging(&self, staging: &Path) {
        if let Err(err) = self.fs.remove_file(staging) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %staging.display(),
                    error = %err,
                    "failed to remove staging file"
                );
            }
        }
    }

    /// Best effort: a failure here does not undo the completed write.
    fn sync_parent(&self) {
        let dir = self.parent_dir().unwrap_or(Path::new("."));
        if let Err(err) = self.fs.sync_dir(dir) {
            tracing::debug!(path = %dir.display(), error = %err, "failed to sync directory");
        }
    }
}

impl<F: Filesystem> RecordStore for JsonFileStore<F> {
    fn initialize(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.parent_dir() {
            self.fs
                .create_dir_all(parent)
                .map_err(|source| StoreError::Init {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        if self.fs.exists(&self.path) {
            return Ok(());
        }
        match self.write_staged(EMPTY_COLLECTION, |staging, path| {
            self.fs.hard_link(staging, path)
        }) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "initialized empty store");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(StoreError::Init {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn load(&self) -> Result<Vec<Todo>, StoreError> {
        let bytes = match self.fs.read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                self.initialize()?;
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, todos: &[Todo]) -> Result<(), StoreError> {
        let mut bytes = serde_json::to_vec_pretty(todos).map_err(|err| StoreError::Write {
            path: self.path.clone(),
            source: io::Error::other(err),
        })?;
        bytes.push(b'\n');
        self.write_staged(&bytes, |staging, path| self.fs.rename(staging, path))
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(path = %self.path.display(), count = todos.len(), "saved store");
        Ok(())
    }

    fn exists(&self) -> bool {
        self.fs.exists(&self.path)
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Keeps the collection in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    todos: Mutex<Option<Vec<Todo>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    fn initialize(&self) -> Result<(), StoreError> {
        self.todos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(Vec::new);
        Ok(())
    }

    fn load(&self) -> Result<Vec<Todo>, StoreError> {
        let mut todos = self.todos.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(todos.get_or_insert_with(Vec::new).clone())
    }

    fn save(&self, todos: &[Todo]) -> Result<(), StoreError> {
        *self.todos.lock().unwrap_or_else(PoisonError::into_inner) = Some(todos.to_vec());
        Ok(())
    }

    fn exists(&self) -> bool {
        self.todos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn location(&self) -> &Path {
        Path::new("memory")
    }
}
