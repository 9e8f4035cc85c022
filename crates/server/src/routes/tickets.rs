//! Ticket routes: creation through the pipeline, role-scoped reads, and the
//! admin lifecycle operations.

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::ticket::{Ticket, UpdateTicketFields};
use serde::{Deserialize, Serialize};
use services::services::{
    ticket_pipeline::{NewTicket, TicketPipeline},
    tickets::TicketService,
};
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// POST /api/tickets
/// Multipart upload (student_name, location, image) fed through the
/// analyze -> classify -> persist pipeline.
pub async fn create_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<Ticket>>, ApiError> {
    let request = read_ticket_form(&mut multipart).await?;

    let pipeline = TicketPipeline::new(state.db.pool.clone(), state.images.clone())?;
    let ticket = pipeline.create_ticket(user.id, request).await?;

    Ok(ResponseJson(ApiResponse::success(ticket)))
}

/// GET /api/tickets
/// Students get their own tickets, admins get all of them, newest first.
pub async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<Ticket>>>, ApiError> {
    let tickets = TicketService::list(&state.db.pool, &user.caller()).await?;
    Ok(ResponseJson(ApiResponse::success(tickets)))
}

/// GET /api/tickets/{id}
pub async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<Ticket>>, ApiError> {
    let ticket = TicketService::get(&state.db.pool, &user.caller(), id).await?;
    Ok(ResponseJson(ApiResponse::success(ticket)))
}

/// PUT /api/tickets/{id}/status
/// Admin-only status overwrite.
pub async fn update_ticket_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<ResponseJson<ApiResponse<Ticket>>, ApiError> {
    let ticket =
        TicketService::update_status(&state.db.pool, &user.caller(), id, &payload.status).await?;
    Ok(ResponseJson(ApiResponse::success(ticket)))
}

/// PATCH /api/tickets/{id}
/// Partial field edit by the owner or an admin; status is not editable here.
pub async fn update_ticket_fields(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateTicketFields>,
) -> Result<ResponseJson<ApiResponse<Ticket>>, ApiError> {
    let ticket =
        TicketService::update_fields(&state.db.pool, &user.caller(), id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(ticket)))
}

/// DELETE /api/tickets/{id}
/// Admin-only; removes the stored upload along with the row.
pub async fn delete_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    TicketService::delete(&state.db.pool, &user.caller(), &state.images, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Pull the three expected fields out of the multipart form.
async fn read_ticket_form(multipart: &mut Multipart) -> Result<NewTicket, ApiError> {
    let mut student_name = None;
    let mut location = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "student_name" => {
                student_name = Some(field.text().await.map_err(|e| {
                    ApiError::InvalidInput(format!("invalid student_name field: {e}"))
                })?);
            }
            "location" => {
                location = Some(field.text().await.map_err(|e| {
                    ApiError::InvalidInput(format!("invalid location field: {e}"))
                })?);
            }
            "image" => {
                let file_name = field
                    .file_name()
                    .map(str::to_owned)
                    .ok_or_else(|| ApiError::InvalidInput("no image file provided".to_string()))?;
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::InvalidInput(format!("failed to read image upload: {e}"))
                })?;
                image = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let student_name = student_name
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("missing field: student_name".to_string()))?;
    let location = location
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ApiError::InvalidInput("missing field: location".to_string()))?;
    let (image_name, image_bytes) =
        image.ok_or_else(|| ApiError::InvalidInput("no image file provided".to_string()))?;
    if image_bytes.is_empty() {
        return Err(ApiError::InvalidInput("no image file provided".to_string()));
    }

    Ok(NewTicket {
        student_name,
        location,
        image_name,
        image_bytes,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/tickets",
        Router::new()
            .route("/", post(create_ticket).get(list_tickets))
            .route(
                "/{id}",
                get(get_ticket)
                    .patch(update_ticket_fields)
                    .delete(delete_ticket),
            )
            .route("/{id}/status", put(update_ticket_status)),
    )
}
