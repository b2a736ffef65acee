//! HTTP/JSON routes for the record API.
//!
//! Every error leaves as `{"error": "..."}` with status 400, 404 or 500.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::error::Error;
use crate::model::{
    Contraction, FinishContraction, Hospital, HospitalPatch, Message, NewContraction, NewHospital,
};

use super::RecordService;

/// Body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// An error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
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

    /// Map a crate error, using `fallback` as the message for server faults.
    fn from_error(err: Error, fallback: &'static str) -> Self {
        match err {
            Error::Validation(message) => Self::bad_request(message),
            err @ Error::NotFound { .. } => Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
            },
            err => {
                error!("{fallback}: {err}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: fallback.to_string(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the application router.
///
/// Record routes are mounted under `/api`; `/` answers with a short banner.
pub fn router(service: RecordService) -> Router {
    let api = Router::new()
        .route(
            "/contractions",
            get(list_contractions).post(create_contraction),
        )
        .route(
            "/contractions/{id}",
            put(finish_contraction).delete(delete_contraction),
        )
        .route("/hospitals", get(list_hospitals).post(create_hospital))
        .route(
            "/hospitals/{id}",
            put(update_hospital).delete(delete_hospital),
        );

    Router::new()
        .route("/", get(index))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(e.to_string()))
}

fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid id: {raw}")))
}

async fn index() -> Json<Message> {
    Json(Message::new("Labor log API"))
}

async fn list_contractions(
    State(service): State<RecordService>,
) -> ApiResult<Json<Vec<Contraction>>> {
    service
        .list_contractions()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, "Failed to fetch contractions"))
}

async fn create_contraction(
    State(service): State<RecordService>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Contraction>)> {
    let request: NewContraction = parse_body(&body)?;
    let created = service
        .create_contraction(request)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to create contraction"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn finish_contraction(
    State(service): State<RecordService>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Contraction>> {
    let id = parse_id(&id)?;
    let request: FinishContraction = parse_body(&body)?;
    service
        .finish_contraction(id, request)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, "Failed to update contraction"))
}

async fn delete_contraction(
    State(service): State<RecordService>,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    let id = parse_id(&id)?;
    service
        .delete_contraction(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, "Failed to delete contraction"))
}

async fn list_hospitals(State(service): State<RecordService>) -> ApiResult<Json<Vec<Hospital>>> {
    service
        .list_hospitals()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, "Failed to fetch hospitals"))
}

async fn create_hospital(
    State(service): State<RecordService>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Hospital>)> {
    let request: NewHospital = parse_body(&body)?;
    let created = service
        .create_hospital(request)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to create hospital"))?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_hospital(
    State(service): State<RecordService>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Hospital>> {
    let id = parse_id(&id)?;
    let patch: HospitalPatch = parse_body(&body)?;
    service
        .update_hospital(id, patch)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, "Failed to update hospital"))
}

async fn delete_hospital(
    State(service): State<RecordService>,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    let id = parse_id(&id)?;
    service
        .delete_hospital(id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_error(e, "Failed to delete hospital"))
}
