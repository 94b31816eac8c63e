//! Business rules for todos on top of a `RecordStore`.
//!
//! # Design
//! The service keeps no todos in memory between calls. Every operation
//! loads the full collection, works on it and, for mutations, writes the
//! full collection back. Mutations hold an in-process lock for the whole
//! load-modify-save cycle so overlapping calls in one process apply one
//! after another; across processes the last rename wins.
//!
//! Storage errors pass through unchanged. The service only adds its own
//! argument and validation errors.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TodoError};
use crate::store::RecordStore;
use crate::todo::{Todo, TodoPatch};

/// Totals over the whole collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoCount {
    pub total: usize,
    pub completed: usize,
    pub incomplete: usize,
}

/// The only mutation path for todo records.
#[derive(Debug)]
pub struct TodoService<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: RecordStore> TodoService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// All todos in insertion order.
    #[tracing::instrument(skip(self))]
    pub fn get_all(&self) -> Result<Vec<Todo>> {
        Ok(self.store.load()?)
    }

    /// The todo with `id`, or `None` if there is none.
    #[tracing::instrument(skip(self))]
    pub fn get_by_id(&self, id: &str) -> Result<Option<Todo>> {
        let id = require_id(id)?;
        Ok(self.store.load()?.into_iter().find(|todo| todo.id() == id))
    }

    /// Append a new todo and return it.
    #[tracing::instrument(skip(self))]
    pub fn create(&self, description: &str) -> Result<Todo> {
        let todo = Todo::new(description)?;
        let _guard = self.lock();
        let mut todos = self.store.load()?;
        todos.push(todo.clone());
        self.store.save(&todos)?;
        tracing::info!(id = todo.id(), "created todo");
        Ok(todo)
    }

    /// Apply the fields present in `patch` to the todo with `id`.
    #[tracing::instrument(skip(self))]
    pub fn update(&self, id: &str, patch: &TodoPatch) -> Result<Todo> {
        let id = require_id(id)?;
        if patch.is_empty() {
            return Err(TodoError::InvalidArgument(
                "updates must include description or completed".to_string(),
            ));
        }
        self.modify(id, |todo| todo.apply(patch).map_err(TodoError::from))
    }

    /// Flip the completion state of the todo with `id`.
    #[tracing::instrument(skip(self))]
    pub fn toggle_complete(&self, id: &str) -> Result<Todo> {
        let id = require_id(id)?;
        self.modify(id, |todo| {
            todo.toggle();
            Ok(())
        })
    }

    /// Permanently remove the todo with `id`.
    #[tracing::instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        let id = require_id(id)?;
        let _guard = self.lock();
        let mut todos = self.store.load()?;
        let position = todos
            .iter()
            .position(|todo| todo.id() == id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        todos.remove(position);
        self.store.save(&todos)?;
        tracing::info!(id, "deleted todo");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn count(&self) -> Result<TodoCount> {
        let todos = self.get_all()?;
        let completed = todos.iter().filter(|todo| todo.completed()).count();
        Ok(TodoCount {
            total: todos.len(),
            completed,
            incomplete: todos.len() - completed,
        })
    }

    /// Remove every todo.
    #[tracing::instrument(skip(self))]
    pub fn clear_all(&self) -> Result<()> {
        let _guard = self.lock();
        self.store.save(&[])?;
        tracing::info!("cleared all todos");
        Ok(())
    }

    /// Remove completed todos and return how many were removed.
    #[tracing::instrument(skip(self))]
    pub fn clear_completed(&self) -> Result<usize> {
        let _guard = self.lock();
        let mut todos = self.store.load()?;
        let before = todos.len();
        todos.retain(|todo| !todo.completed());
        let removed = before - todos.len();
        if removed > 0 {
            self.store.save(&todos)?;
        }
        tracing::info!(removed, "cleared completed todos");
        Ok(removed)
    }

    /// Load, change the todo with `id` in place, save, return the result.
    fn modify<F>(&self, id: &str, change: F) -> Result<Todo>
    where
        F: FnOnce(&mut Todo) -> Result<()>,
    {
        let _guard = self.lock();
        let mut todos = self.store.load()?;
        let todo = todos
            .iter_mut()
            .find(|todo| todo.id() == id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;
        change(todo)?;
        let updated = todo.clone();
        self.store.save(&todos)?;
        tracing::info!(id, completed = updated.completed(), "updated todo");
        Ok(updated)
    }
}

/// Ids are opaque: blank ones are rejected, others are matched verbatim.
fn require_id(id: &str) -> Result<&str> {
    if id.trim().is_empty() {
        return Err(TodoError::InvalidArgument(
            "id must be a non-empty string".to_string(),
        ));
    }
    Ok(id)
}
