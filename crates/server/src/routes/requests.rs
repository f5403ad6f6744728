use axum::{extract::{Path, Query, State}, Extension, Json};
use serde::{Deserialize, Serialize};

use models::{CreateRequestInput, MediaRequest};
use service::caller::Caller;

use crate::errors::ApiError;
use crate::routes::auth::ServerState;

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessOutput {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOutput {
    pub success: bool,
    #[serde(rename = "requestId")]
    pub request_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotesInput {
    #[serde(default, rename = "adminNotes", alias = "AdminNotes")]
    pub admin_notes: Option<String>,
}

#[utoipa::path(get, path = "/Requests/All", tag = "requests",
    responses((status = 200, description = "Requests visible to the caller, newest first", body = [crate::openapi::MediaRequestDoc]), (status = 401, description = "Unauthorized")))]
pub async fn list(
    State(state): State<ServerState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<MediaRequest>>, ApiError> {
    let items = state.requests.list_visible(&caller).await?;
    tracing::debug!(user = %caller.id, admin = caller.is_admin, count = items.len(), "list requests");
    Ok(Json(items))
}

#[utoipa::path(post, path = "/Requests/Create", tag = "requests", request_body = crate::openapi::CreateRequestDoc,
    responses((status = 200, description = "Created", body = crate::openapi::CreateOutputDoc), (status = 400, description = "Title is required"), (status = 401, description = "Unauthorized")))]
pub async fn create(
    State(state): State<ServerState>,
    Extension(caller): Extension<Caller>,
    Json(input): Json<CreateRequestInput>,
) -> Result<Json<CreateOutput>, ApiError> {
    let request_id = state.requests.create(&caller, &input.title).await?;
    Ok(Json(CreateOutput { success: true, request_id }))
}

#[utoipa::path(put, path = "/Requests/{id}/Status", tag = "requests",
    params(("id" = String, Path, description = "Request id"), ("status" = String, Query, description = "Pending | Processing | Complete")),
    responses((status = 200, description = "Updated", body = crate::openapi::SuccessDoc), (status = 400, description = "Invalid status"), (status = 403, description = "Administrator only"), (status = 404, description = "Request not found")))]
pub async fn update_status(
    State(state): State<ServerState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Query(q): Query<StatusQuery>,
) -> Result<Json<SuccessOutput>, ApiError> {
    let status = q.status.unwrap_or_default();
    state.requests.update_status(&caller, &id, &status).await?;
    Ok(Json(SuccessOutput { success: true }))
}

#[utoipa::path(put, path = "/Requests/{id}/Notes", tag = "requests", request_body = crate::openapi::NotesDoc,
    params(("id" = String, Path, description = "Request id")),
    responses((status = 200, description = "Updated", body = crate::openapi::SuccessDoc), (status = 403, description = "Administrator only"), (status = 404, description = "Request not found")))]
pub async fn update_notes(
    State(state): State<ServerState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(input): Json<NotesInput>,
) -> Result<Json<SuccessOutput>, ApiError> {
    state.requests.update_notes(&caller, &id, input.admin_notes).await?;
    Ok(Json(SuccessOutput { success: true }))
}

#[utoipa::path(delete, path = "/Requests/{id}", tag = "requests",
    params(("id" = String, Path, description = "Request id")),
    responses((status = 200, description = "Deleted", body = crate::openapi::SuccessDoc), (status = 403, description = "Administrator only"), (status = 404, description = "Request not found")))]
pub async fn delete(
    State(state): State<ServerState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<SuccessOutput>, ApiError> {
    state.requests.delete(&caller, &id).await?;
    Ok(Json(SuccessOutput { success: true }))
}
