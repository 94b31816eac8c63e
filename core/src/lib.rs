//! Todo list core: the todo entity, its durable store and the service that
//! ties them together.
//!
//! # Overview
//! `TodoService` is the only way todos change. Each operation loads the
//! whole collection from a `RecordStore`, applies the change in memory and
//! writes the whole collection back. `JsonFileStore` keeps the collection
//! in one JSON file and replaces it with an atomic rename, so a crash or an
//! overlapping writer never leaves a partially written file behind.
//!
//! # Design
//! - The service is an ordinary value built once per process and shared by
//!   reference, not a global.
//! - Request input is validated once, at construction (`Todo::new`,
//!   `NewTodo::from_value`) and update (`TodoPatch::from_value`,
//!   `Todo::apply`).
//! - Errors are typed per kind (`TodoError`), so callers can separate
//!   input mistakes from storage failures.
//! - The collection is reloaded on every call. That keeps every process
//!   consistent with the file at the cost of O(n) work per request, which
//!   caps practical collection size.

pub mod error;
pub mod service;
pub mod store;
pub mod todo;

pub use error::{ErrorKind, Result, StoreError, TodoError, ValidationError};
pub use service::{TodoCount, TodoService};
pub use store::{Filesystem, JsonFileStore, MemoryStore, RecordStore, StdFilesystem};
pub use todo::{NewTodo, Todo, TodoPatch, MAX_DESCRIPTION_LEN};
