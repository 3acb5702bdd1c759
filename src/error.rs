use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    InternalServerError(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
    AuthError(String),
    Upstream(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            ApiError::DatabaseError(err) => write!(f, "Database Error: {}", err),
            ApiError::AuthError(msg) => write!(f, "Auth Error: {}", msg),
            ApiError::Upstream(msg) => write!(f, "Upstream Error: {}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        // Driver messages can leak schema details; keep them in the log only.
        let message = match self {
            ApiError::DatabaseError(err) => {
                log::error!("Database error: {}", err);
                "Database Error".to_string()
            }
            other => other.to_string(),
        };
        let error_response = ErrorResponse { success: false, message };

        match self {
            ApiError::BadRequest(_) => HttpResponse::BadRequest().json(error_response),
            ApiError::NotFound(_) => HttpResponse::NotFound().json(error_response),
            ApiError::Unauthorized(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::Forbidden(_) => HttpResponse::Forbidden().json(error_response),
            ApiError::ValidationError(_) => HttpResponse::UnprocessableEntity().json(error_response),
            ApiError::DatabaseError(_) => HttpResponse::InternalServerError().json(error_response),
            ApiError::AuthError(_) => HttpResponse::Unauthorized().json(error_response),
            ApiError::InternalServerError(_) => HttpResponse::InternalServerError().json(error_response),
            ApiError::Upstream(_) => HttpResponse::BadGateway().json(error_response),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

impl ApiError {
    pub fn not_found(entity: &str) -> Self {
        ApiError::NotFound(format!("{} not found", entity))
    }

    pub fn bad_request(msg: &str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }

    pub fn scholarship_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Scholarship with ID '{}' not found", id))
    }

    pub fn guide_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Guide with ID '{}' not found", id))
    }

    pub fn post_not_found(id: &str) -> Self {
        ApiError::NotFound(format!("Post with ID '{}' not found", id))
    }

    pub fn invalid_level(level: &str) -> Self {
        ApiError::ValidationError(format!(
            "Invalid degree level '{}'. Valid levels: {}",
            level,
            crate::models::DegreeLevel::all_values().join(", ")
        ))
    }

    pub fn not_owner(entity: &str) -> Self {
        ApiError::Forbidden(format!("You can only modify your own {}", entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::not_found("Guide").error_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::ValidationError("title".into()).error_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::Upstream("busy".into()).error_response().status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::DatabaseError(sqlx::Error::RowNotFound).error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_level_lists_allowed_values() {
        let msg = ApiError::invalid_level("Diploma").to_string();
        assert!(msg.contains("Diploma"));
        assert!(msg.contains("Masters"));
        assert!(msg.contains("PhD"));
    }
}
