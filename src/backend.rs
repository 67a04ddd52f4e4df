//! Reference Flow backend exposing the REST endpoints the gateway talks to.
//! Flows live in a [`MemoryFlowStore`]; nothing is written to disk.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::gateway::http::IDEMPOTENCY_HEADER;
use crate::gateway::wire::{
    ErrorEnvelope, FlowEnvelope, FlowListEnvelope, FlowUpdate, MediaEnvelope, WireFlow,
};
use crate::gateway::MemoryFlowStore;

const MAX_UPLOAD_BYTES: usize = 101 * 1024 * 1024;

pub type BackendState = Arc<MemoryFlowStore>;

pub fn router(state: BackendState) -> Router {
    Router::new()
        .route("/flows", get(list_flows).post(create_flow))
        .route(
            "/flows/{id}",
            get(get_flow).put(update_flow).delete(delete_flow),
        )
        .route("/upload-media", post(upload_media))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidWire(_) | GatewayError::Serialization(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorEnvelope {
                message: self.message,
            }),
        )
            .into_response()
    }
}

async fn list_flows(State(store): State<BackendState>) -> Json<FlowListEnvelope> {
    Json(FlowListEnvelope {
        flows: store.metas().await,
    })
}

async fn get_flow(
    State(store): State<BackendState>,
    Path(id): Path<String>,
) -> Result<Json<FlowEnvelope>, ApiError> {
    let flow = store.get(&id).await?;
    Ok(Json(FlowEnvelope { flow }))
}

async fn create_flow(
    State(store): State<BackendState>,
    headers: HeaderMap,
    Json(document): Json<WireFlow>,
) -> Result<(StatusCode, Json<FlowEnvelope>), ApiError> {
    let key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let flow = store.create(document, key.as_deref()).await?;
    info!(flow = ?flow.id, name = %flow.name, "flow stored");
    Ok((StatusCode::CREATED, Json(FlowEnvelope { flow })))
}

async fn update_flow(
    State(store): State<BackendState>,
    Path(id): Path<String>,
    Json(update): Json<FlowUpdate>,
) -> Result<Json<FlowEnvelope>, ApiError> {
    let flow = store.update(&id, update).await?;
    debug!(flow = %id, "flow replaced");
    Ok(Json(FlowEnvelope { flow }))
}

async fn delete_flow(
    State(store): State<BackendState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    store.delete(&id).await?;
    info!(flow = %id, "flow removed");
    Ok(Json(json!({})))
}

async fn upload_media(
    State(store): State<BackendState>,
    mut multipart: Multipart,
) -> Result<Json<MediaEnvelope>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request(err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| ApiError::bad_request(err.to_string()))?;

        let media_id = store
            .store_media(&file_name, &mime_type, bytes.len() as u64)
            .await;
        debug!(media = %media_id, file = %file_name, size = bytes.len(), "media stored");
        return Ok(Json(MediaEnvelope { media_id }));
    }

    Err(ApiError::bad_request("multipart body has no 'file' field"))
}
