//! HTTP surface.
//!
//! | Route | Success | Failure |
//! |-------|---------|---------|
//! | `PUT /create` `{name}` | 201 | 409 `{"Error": ..}` |
//! | `GET /read` | 200 `{"numberOfContainers", "containers"}` | 409 |
//! | `POST /sign` `{name, userId}` | 201 | 409 |
//! | `DELETE /delete?name=&userId=` | 201 | 409 |
//! | `GET /verify?name=` | 200 report | 409 |
//!
//! Other methods on these paths get 405 from the router.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use sigbox_core::{ContainerError, ContainerService};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub fn router(service: ContainerService) -> Router {
    Router::new()
        .route("/create", put(create))
        .route("/read", get(read))
        .route("/sign", post(sign))
        .route("/delete", delete(remove_signature))
        .route("/verify", get(verify))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Body and query fields. Missing fields stay empty so the service reports
/// its own validation message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerParams {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

impl ContainerParams {
    fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::BadBody(format!("Request body is not valid JSON: {e}")))
    }

    fn from_query(query: Result<Query<Self>, QueryRejection>) -> Result<Self, ApiError> {
        query
            .map(|Query(params)| params)
            .map_err(|rejection| ApiError::BadBody(rejection.body_text()))
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or_default()
    }
}

enum ApiError {
    BadBody(String),
    Container(ContainerError),
}

impl From<ContainerError> for ApiError {
    fn from(err: ContainerError) -> Self {
        Self::Container(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match self {
            Self::BadBody(message) => {
                warn!(kind = "bad_request", error = %message, "request rejected");
                message
            }
            Self::Container(err) => {
                warn!(kind = err.kind(), error = %err, "request failed");
                err.to_string()
            }
        };
        (StatusCode::CONFLICT, Json(json!({ "Error": message }))).into_response()
    }
}

async fn create(
    State(service): State<ContainerService>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let params = ContainerParams::from_body(&body)?;
    service.create(params.name()).await?;
    Ok(StatusCode::CREATED)
}

async fn read(State(service): State<ContainerService>) -> Result<Response, ApiError> {
    let list = service.list().await?;
    Ok((StatusCode::OK, Json(list)).into_response())
}

async fn sign(
    State(service): State<ContainerService>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let params = ContainerParams::from_body(&body)?;
    service.sign(params.name(), params.user_id()).await?;
    Ok(StatusCode::CREATED)
}

async fn remove_signature(
    State(service): State<ContainerService>,
    query: Result<Query<ContainerParams>, QueryRejection>,
) -> Result<StatusCode, ApiError> {
    let params = ContainerParams::from_query(query)?;
    service.delete(params.name(), params.user_id()).await?;
    Ok(StatusCode::CREATED)
}

async fn verify(
    State(service): State<ContainerService>,
    query: Result<Query<ContainerParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let params = ContainerParams::from_query(query)?;
    let report = service.verify(params.name()).await?;
    Ok((StatusCode::OK, Json(report)).into_response())
}
