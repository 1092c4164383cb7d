//! Collection row routes.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use snakeboard_engine::protocol::{CreateRowRequest, CreateRowResponse, ReadQuery};
use snakeboard_engine::{BestWrite, RemoteRow};

use crate::error::Result;
use crate::handlers::{ensure_collection, handle_best, handle_create, handle_delete, handle_list};
use crate::AppState;

/// Create row routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/collections/{collection}/rows",
            get(list_handler).post(create_handler),
        )
        .route("/collections/{collection}/rows/{row_id}", delete(delete_handler))
        .route("/collections/{collection}/best", post(best_handler))
}

/// GET /collections/{collection}/rows - Read every row.
async fn list_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    query: std::result::Result<Query<ReadQuery>, QueryRejection>,
) -> Result<Json<Vec<RemoteRow>>> {
    let Query(query) = query?;
    let rows = handle_list(&state.pool, &collection, query).await?;
    Ok(Json(rows))
}

/// POST /collections/{collection}/rows - Append a row.
async fn create_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    payload: std::result::Result<Json<CreateRowRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateRowResponse>)> {
    ensure_collection(&collection)?;
    let Json(request) = payload?;
    let response = handle_create(&state.pool, &state.conn_manager, &collection, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /collections/{collection}/rows/{row_id} - Remove a row.
async fn delete_handler(
    State(state): State<AppState>,
    Path((collection, row_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    handle_delete(&state.pool, &state.conn_manager, &collection, &row_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /collections/{collection}/best - Atomic create-or-improve.
async fn best_handler(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    payload: std::result::Result<Json<CreateRowRequest>, JsonRejection>,
) -> Result<Json<BestWrite>> {
    ensure_collection(&collection)?;
    let Json(request) = payload?;
    let write = handle_best(&state.pool, &state.conn_manager, &collection, request).await?;
    Ok(Json(write))
}
