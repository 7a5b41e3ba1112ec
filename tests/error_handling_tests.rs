//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are properly formatted
//! - The API envelope hides server-side failure details

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;
use villa::core::error::{NotFoundError, PersistenceError, StoreError, ValidationError};
use villa::identity::AuthError;
use villa::server::ApiError;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn constraint() -> StoreError {
    StoreError::Persistence(PersistenceError::ConstraintViolation {
        table: "villa_numbers".to_string(),
        message: "duplicate value 101 for unique column 'villa_no'".to_string(),
    })
}

fn backend_failure() -> StoreError {
    StoreError::Persistence(PersistenceError::Backend {
        backend: "postgres".to_string(),
        message: "connection refused on 10.0.0.7".to_string(),
    })
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_not_found_returns_404() {
        assert_eq!(
            StoreError::not_found("villas", 3).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_validation_errors_return_400() {
        let errors = [
            ValidationError::UnknownField {
                entity_type: "villas".into(),
                field: "colour".into(),
            },
            ValidationError::InvalidFilter {
                message: "bad".into(),
            },
            ValidationError::UnknownInclude {
                entity_type: "villas".into(),
                include: "owner".into(),
            },
            ValidationError::InvalidPage { number: 0 },
            ValidationError::NotTracked {
                entity_type: "villas".into(),
                id: 1,
            },
        ];
        for err in errors {
            assert_eq!(StoreError::from(err).status_code(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_constraint_violation_returns_409() {
        assert_eq!(constraint().status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_backend_failure_returns_500() {
        assert_eq!(
            backend_failure().status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_status_codes() {
        assert_eq!(AuthError::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InvalidToken("bad".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::WeakPassword { min: 6 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::DuplicateUsername("alice".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Hashing("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::from(StoreError::not_found("accounts", 1)).status_code(),
            StatusCode::NOT_FOUND
        );
    }
}

// =============================================================================
// Error Code Tests
// =============================================================================

mod error_code_tests {
    use super::*;

    #[test]
    fn test_store_error_codes() {
        assert_eq!(
            StoreError::not_found("villas", 1).error_code(),
            "ENTITY_NOT_FOUND"
        );
        assert_eq!(
            StoreError::from(ValidationError::InvalidPage { number: 0 }).error_code(),
            "INVALID_PAGE"
        );
        assert_eq!(constraint().error_code(), "CONSTRAINT_VIOLATION");
        assert_eq!(backend_failure().error_code(), "STORAGE_ERROR");
    }

    #[test]
    fn test_auth_error_codes() {
        assert_eq!(AuthError::TokenExpired.error_code(), "TOKEN_EXPIRED");
        assert_eq!(
            AuthError::from(constraint()).error_code(),
            "CONSTRAINT_VIOLATION"
        );
    }
}

// =============================================================================
// Error Response Format Tests
// =============================================================================

mod response_format_tests {
    use super::*;

    #[test]
    fn test_error_response_has_code_and_message() {
        let response = StoreError::not_found("villas", 7).to_response();
        assert_eq!(response.code, "ENTITY_NOT_FOUND");
        assert!(response.message.contains("villas"));
        assert!(response.message.contains('7'));
    }

    #[tokio::test]
    async fn test_store_error_into_response() {
        let response = StoreError::from(NotFoundError {
            entity_type: "villas".into(),
            id: 2,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["code"], "ENTITY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_api_error_uses_envelope() {
        let response = ApiError::from(constraint()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["statusCode"], 409);
        assert_eq!(body["isSuccess"], false);
        assert_eq!(body["result"], Value::Null);
        assert!(body["errorMessages"][0].as_str().unwrap().contains("villa_no"));
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response = ApiError::from(backend_failure()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        let message = body["errorMessages"][0].as_str().unwrap();
        assert_eq!(message, "Internal server error");
        assert!(!body.to_string().contains("10.0.0.7"));
    }

    #[tokio::test]
    async fn test_auth_error_through_api_error() {
        let response = ApiError::from(AuthError::TokenExpired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["errorMessages"][0], "token expired");
    }
}

// =============================================================================
// Error Matching Tests
// =============================================================================

mod error_matching_tests {
    use super::*;

    #[test]
    fn test_can_match_specific_errors() {
        let err = StoreError::from(ValidationError::UnknownInclude {
            entity_type: "villa_numbers".into(),
            include: "owner".into(),
        });
        match err {
            StoreError::Validation(ValidationError::UnknownInclude { include, .. }) => {
                assert_eq!(include, "owner")
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_auth_error_keeps_store_source() {
        let err = AuthError::from(StoreError::not_found("accounts", 9));
        assert!(matches!(err, AuthError::Store(ref e) if e.is_not_found()));
        assert_eq!(err.to_string(), "accounts with id '9' not found");
    }
}
