//! Error responses
//!
//! Every failed request answers with the same body:
//! `{"status":"error","kind":"…","message":"…","retryable":bool}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::shared::errors::DispatchError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Always `"error"`
    pub status: String,
    /// Machine-readable cause: `upstream_unavailable`, `not_found`,
    /// `conflict_or_rejected`, `partial_failure`, `validation`, `bad_request`
    pub kind: String,
    pub message: String,
    /// Whether repeating the same request may succeed
    pub retryable: bool,
    /// Spots removed before a garage deletion failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_spots: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                status: "error".to_string(),
                kind: kind.to_string(),
                message: message.into(),
                retryable: false,
                deleted_spots: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "validation", message)
    }
}

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        let status = match &err {
            DispatchError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::NotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::ConflictOrRejected { .. } => StatusCode::CONFLICT,
            DispatchError::PartialFailure { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        let mut api = Self::new(status, err.kind(), err.to_string());
        api.body.retryable = err.is_transient();
        if let DispatchError::PartialFailure {
            deleted_spot_ids, ..
        } = err
        {
            api.body.deleted_spots = Some(deleted_spot_ids);
        }
        api
    }
}

/// Body that is not JSON or does not fit the request type.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

/// One `field: reason` entry per failed rule, fields in name order.
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let reasons: Vec<String> = fields
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => format!("{field}: {message}"),
                    None => format!("{field}: {}", e.code),
                })
            })
            .collect();

        if reasons.is_empty() {
            Self::validation("Validation failed")
        } else {
            Self::validation(reasons.join("; "))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
