use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::SnapshotError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Snapshot creation is not implemented")]
    NotImplemented,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SnapshotError> for AppError {
    fn from(e: SnapshotError) -> Self {
        match e {
            SnapshotError::UnknownEventType(event_type) => AppError::UnknownEventType(event_type),
            SnapshotError::ProviderNotImplemented => AppError::NotImplemented,
            SnapshotError::Provider(_) | SnapshotError::Outbox(_) => AppError::Internal(e.to_string()),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::UnknownEventType(_) => {
                HttpResponse::UnprocessableEntity().json(serde_json::json!({
                    "error": self.to_string()
                }))
            }
            AppError::BadRequest(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::NotImplemented => HttpResponse::NotImplemented().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::Internal(_) => HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Internal server error"
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::OutboxError;
    use actix_web::ResponseError;

    #[test]
    fn unknown_event_type_returns_422() {
        let resp = AppError::UnknownEventType("x".to_string()).error_response();
        assert_eq!(
            resp.status(),
            actix_web::http::StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn bad_request_returns_400() {
        assert_eq!(
            AppError::BadRequest("x".to_string()).error_response().status(),
            actix_web::http::StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_implemented_returns_501() {
        assert_eq!(
            AppError::NotImplemented.error_response().status(),
            actix_web::http::StatusCode::NOT_IMPLEMENTED
        );
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn snapshot_errors_map_to_app_errors() {
        let unknown: AppError = SnapshotError::UnknownEventType("t".to_string()).into();
        assert!(matches!(unknown, AppError::UnknownEventType(t) if t == "t"));

        let missing: AppError = SnapshotError::ProviderNotImplemented.into();
        assert!(matches!(missing, AppError::NotImplemented));

        let db: AppError = SnapshotError::Outbox(OutboxError::Database("down".to_string())).into();
        assert!(matches!(db, AppError::Internal(_)));
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }
}
