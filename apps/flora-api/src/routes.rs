use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use flora_engine::{identify::IdentifyOutcome, session::SessionPayload};
use flora_providers::vision;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/identify", post(identify))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct IdentifyHttpRequest {
	pub image_base64: String,
	#[serde(default)]
	pub extra_instructions: Option<String>,
	#[serde(default)]
	pub session_data: Option<SessionPayload>,
}

#[derive(Debug, Serialize)]
pub struct IdentifyHttpResponse {
	/// Raw vision-model reply the round was built from.
	pub reply: String,
	#[serde(flatten)]
	pub outcome: IdentifyOutcome,
}

async fn identify(
	State(state): State<AppState>,
	Json(payload): Json<IdentifyHttpRequest>,
) -> Result<Json<IdentifyHttpResponse>, ApiError> {
	if payload.image_base64.trim().is_empty() {
		return Err(ApiError::new(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"image_base64 must be non-empty.",
		));
	}

	// The vision model is the one collaborator the round cannot degrade
	// around; its failure is the caller's problem, not an empty result.
	let reply = vision::describe(
		&state.cfg.providers.vision,
		&payload.image_base64,
		payload.extra_instructions.as_deref(),
	)
	.await
	.map_err(|error| {
		tracing::error!(?error, "vision model request failed");

		ApiError::new(
			StatusCode::BAD_GATEWAY,
			"vision_unavailable",
			"The vision model did not return a description.",
		)
	})?;

	let request =
		flora_engine::identify::IdentifyRequest { reply: reply.clone(), session: payload.session_data };
	let outcome = state.engine.identify(&request).await?;

	Ok(Json(IdentifyHttpResponse { reply, outcome }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<flora_engine::Error> for ApiError {
	fn from(err: flora_engine::Error) -> Self {
		match err {
			flora_engine::Error::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			flora_engine::Error::SessionEncode { .. } => Self::new(
				StatusCode::INTERNAL_SERVER_ERROR,
				"internal",
				"Failed to encode session state.",
			),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
