use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use super::AppState;
use crate::components::google_calendar::Credential;
use crate::error::Error;

/// Body of a prompt request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// Handler for health checks
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

/// Interpret a prompt and run the calendar operations it asks for
pub async fn handle_user_prompt(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Response {
    let Some(credential) = bearer_credential(&headers) else {
        warn!("Prompt request without a bearer credential");
        return failure(StatusCode::UNAUTHORIZED, "Missing access token");
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected prompt body: {}", rejection.body_text());
            return failure(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    if request.prompt.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Prompt is required");
    }

    match state
        .assistant
        .handle_prompt(&request.prompt, credential, request.time_zone.as_deref())
        .await
    {
        Ok(response) => {
            info!("Prompt handled");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Pull the token out of `Authorization: Bearer <token>`; the scheme is case-insensitive
fn bearer_credential(headers: &HeaderMap) -> Option<Credential> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(Credential::new(token))
}

fn error_response(err: &Error) -> Response {
    let status = match err {
        Error::Validation(_) | Error::UnsupportedOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::GoogleCalendar(_) | Error::Intent(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if err.is_client_error() {
        warn!("Prompt rejected: {}", err);
    } else {
        error!("Failed to handle prompt: {:?}", err);
    }

    failure(status, &err.user_message())
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"success": false, "error": message}))).into_response()
}
