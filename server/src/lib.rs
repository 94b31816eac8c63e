//! HTTP front end for the todo service.
//!
//! Handlers are thin: they turn request bodies into typed input, call the
//! shared `TodoService` on the blocking pool and let `ApiError` pick the
//! status code.

pub mod config;
mod error;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, patch},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use todo_core::{NewTodo, RecordStore, Todo, TodoCount, TodoError, TodoPatch, TodoService};

pub use error::ApiError;

/// The service shared by every handler.
pub type SharedService<S> = Arc<TodoService<S>>;

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct Removed {
    removed: usize,
}

pub fn app<S: RecordStore + 'static>(service: SharedService<S>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/todos",
            get(list_todos::<S>)
                .post(create_todo::<S>)
                .delete(clear_all::<S>),
        )
        .route("/api/todos/stats", get(todo_stats::<S>))
        .route("/api/todos/completed", delete(clear_completed::<S>))
        .route(
            "/api/todos/{id}",
            get(get_todo::<S>)
                .put(update_todo::<S>)
                .patch(update_todo::<S>)
                .delete(delete_todo::<S>),
        )
        .route("/api/todos/{id}/toggle", patch(toggle_todo::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

pub async fn run<S: RecordStore + 'static>(
    listener: TcpListener,
    service: SharedService<S>,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app(service)).await
}

/// Run a service call on the blocking pool; store access is synchronous file I/O.
async fn blocking<S, T, F>(service: &SharedService<S>, call: F) -> Result<T, ApiError>
where
    S: RecordStore + 'static,
    T: Send + 'static,
    F: FnOnce(&TodoService<S>) -> todo_core::Result<T> + Send + 'static,
{
    let service = Arc::clone(service);
    Ok(tokio::task::spawn_blocking(move || call(&service)).await??)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn list_todos<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    blocking(&state, |service| service.get_all()).await.map(Json)
}

async fn create_todo<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let Json(body) = payload?;
    let input = NewTodo::from_value(&body)?;
    let todo = blocking(&state, move |service| service.create(&input.description)).await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    blocking(&state, move |service| {
        service
            .get_by_id(&id)?
            .ok_or(TodoError::NotFound(id))
    })
    .await
    .map(Json)
}

async fn update_todo<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Json(body) = payload?;
    let patch = TodoPatch::from_value(&body)?;
    blocking(&state, move |service| service.update(&id, &patch))
        .await
        .map(Json)
}

async fn toggle_todo<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    blocking(&state, move |service| service.toggle_complete(&id))
        .await
        .map(Json)
}

async fn delete_todo<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |service| service.delete(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn todo_stats<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
) -> Result<Json<TodoCount>, ApiError> {
    blocking(&state, |service| service.count()).await.map(Json)
}

async fn clear_all<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, |service| service.clear_all()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_completed<S: RecordStore + 'static>(
    State(state): State<SharedService<S>>,
) -> Result<Json<Removed>, ApiError> {
    let removed = blocking(&state, |service| service.clear_completed()).await?;
    Ok(Json(Removed { removed }))
}
