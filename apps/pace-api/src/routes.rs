use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{delete, get, post, put},
};
use serde::Serialize;

use pace_service::{
	CompleteTaskRequest, CreateTaskRequest, CreateTaskResponse, Error as ServiceError,
	EstimationResponse, TaskAck, UpsertTagRequest,
};

use crate::{state::AppState, ws};

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/tasks", post(create_task))
		.route("/v1/tasks/{task_client_id}", delete(delete_task))
		.route("/v1/tasks/{task_client_id}/complete", post(complete_task))
		.route("/v1/tasks/{task_client_id}/estimation", get(get_estimation))
		.route("/v1/tags", put(upsert_tag))
		.route("/ws/{client_id}", get(ws::notifications))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

/// Returns as soon as the task is stored; the estimate arrives on the client's socket.
async fn create_task(
	State(state): State<AppState>,
	Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<CreateTaskResponse>), ApiError> {
	let response = state.service.create_task(payload).await?;

	Ok((StatusCode::ACCEPTED, Json(response)))
}

async fn complete_task(
	State(state): State<AppState>,
	Path(task_client_id): Path<String>,
	Json(payload): Json<CompleteTaskRequest>,
) -> Result<Json<TaskAck>, ApiError> {
	let response = state.service.complete_task(&task_client_id, payload).await?;

	Ok(Json(response))
}

async fn delete_task(
	State(state): State<AppState>,
	Path(task_client_id): Path<String>,
) -> Result<Json<TaskAck>, ApiError> {
	let response = state.service.delete_task(&task_client_id).await?;

	Ok(Json(response))
}

async fn upsert_tag(
	State(state): State<AppState>,
	Json(payload): Json<UpsertTagRequest>,
) -> Result<StatusCode, ApiError> {
	state.service.upsert_tag(payload).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn get_estimation(
	State(state): State<AppState>,
	Path(task_client_id): Path<String>,
) -> Result<Json<EstimationResponse>, ApiError> {
	let response = state.service.get_estimation(&task_client_id).await?;

	Ok(Json(response))
}

#[derive(Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	pub fn status(&self) -> StatusCode {
		self.status
	}

	pub fn error_code(&self) -> &str {
		&self.error_code
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			ServiceError::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			ServiceError::QueueClosed => json_error(
				StatusCode::SERVICE_UNAVAILABLE,
				"QUEUE_CLOSED",
				"Estimation queue is closed.",
				None,
			),
			other => {
				tracing::error!(error = %other, "Request failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTERNAL_ERROR",
					"Internal error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
