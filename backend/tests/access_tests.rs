//! Access policy and HTTP boundary tests
//!
//! The capability table per role, and requests that are rejected before any
//! database access: missing or invalid tokens, forbidden operations and
//! malformed status updates.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

use shared::{authorize, capabilities, Access, Actor, Operation, OrderStatus, Role};
use warehouse_backend::{
    config::{DatabaseConfig, JwtConfig, ReportsConfig, SchedulerConfig, ServerConfig},
    create_app,
    services::auth::Claims,
    AppError, AppState, Config,
};

const SECRET: &str = "test-secret";

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        log_format: "pretty".to_string(),
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "postgres://localhost/warehouse_test".to_string(),
            max_connections: 1,
            min_connections: 0,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 86400,
        },
        scheduler: SchedulerConfig::default(),
        reports: ReportsConfig {
            low_stock_threshold: 5,
        },
        bootstrap_admin: None,
    }
}

fn test_app() -> axum::Router {
    let db = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/warehouse_test")
        .unwrap();

    create_app(AppState {
        db,
        config: Arc::new(test_config()),
    })
}

fn token_for(role: Role) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        username: "tester".to_string(),
        role,
        exp: now + 600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn error_code(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    json["error"]["code"].as_str().unwrap_or_default().to_string()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_admin_capabilities() {
        for op in Operation::ALL {
            let expected = op != Operation::CancelOwnOrder;
            assert_eq!(
                authorize(Role::Admin, op).is_allowed(),
                expected,
                "admin {:?}",
                op
            );
        }
    }

    #[test]
    fn test_employee_capabilities() {
        let allowed = [
            Operation::ViewProducts,
            Operation::CreateOrder,
            Operation::ViewOwnOrders,
            Operation::CancelOwnOrder,
        ];
        for op in Operation::ALL {
            assert_eq!(
                authorize(Role::Employee, op),
                if allowed.contains(&op) {
                    Access::Allowed
                } else {
                    Access::Denied
                },
                "employee {:?}",
                op
            );
        }
        assert_eq!(capabilities(Role::Employee).len(), allowed.len());
    }

    #[test]
    fn test_actor_checks_its_role() {
        let actor = Actor::new(Uuid::new_v4(), Role::Employee);
        assert!(actor.can(Operation::CreateOrder));
        assert!(!actor.can(Operation::UpdateOrderStatus));
        assert!(!actor.can(Operation::GenerateReports));
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (AppError::NotAuthorized, StatusCode::FORBIDDEN),
            (
                AppError::InsufficientStock {
                    available: 3,
                    requested: 5,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::NotCancelable(OrderStatus::Completed),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::InvalidStatus("shipped".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (AppError::OrderNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (AppError::ProductNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (AppError::InvalidCredentials, StatusCode::UNAUTHORIZED),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}

// ============================================================================
// HTTP Tests
// ============================================================================

#[cfg(test)]
mod http_tests {
    use super::*;

    #[tokio::test]
    async fn test_root_is_public() {
        let response = test_app()
            .oneshot(request(Method::GET, "/", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let response = test_app()
            .oneshot(request(Method::GET, "/api/v1/products", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let response = test_app()
            .oneshot(request(
                Method::GET,
                "/api/v1/orders/mine",
                Some("not-a-jwt"),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_employee_cannot_view_reports() {
        let token = token_for(Role::Employee);
        let response = test_app()
            .oneshot(request(Method::GET, "/api/v1/reports", Some(&token), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(error_code(response).await, "NOT_AUTHORIZED");
    }

    #[tokio::test]
    async fn test_employee_cannot_open_dashboard() {
        let token = token_for(Role::Employee);
        let response = test_app()
            .oneshot(request(
                Method::GET,
                "/api/v1/dashboard?period=week",
                Some(&token),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_employee_cannot_set_order_status() {
        let token = token_for(Role::Employee);
        let uri = format!("/api/v1/orders/{}/status", Uuid::new_v4());
        let response = test_app()
            .oneshot(request(
                Method::PUT,
                &uri,
                Some(&token),
                Some(r#"{"status":"completed"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_cannot_cancel_as_owner() {
        let token = token_for(Role::Admin);
        let uri = format!("/api/v1/orders/{}/cancel", Uuid::new_v4());
        let response = test_app()
            .oneshot(request(Method::POST, &uri, Some(&token), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_status_is_invalid() {
        let token = token_for(Role::Admin);
        let uri = format!("/api/v1/orders/{}/status", Uuid::new_v4());
        let response = test_app()
            .oneshot(request(
                Method::PUT,
                &uri,
                Some(&token),
                Some(r#"{"status":"shipped"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "INVALID_STATUS");
    }

    #[tokio::test]
    async fn test_employee_cannot_create_products() {
        let token = token_for(Role::Employee);
        let response = test_app()
            .oneshot(request(
                Method::POST,
                "/api/v1/products",
                Some(&token),
                Some(r#"{"name":"Desk","quantity":3,"price":"150.00"}"#),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_employee_cannot_place_completed_order() {
        let token = token_for(Role::Employee);
        let body = format!(
            r#"{{"product_id":"{}","quantity":1,"status":"completed"}}"#,
            Uuid::new_v4()
        );
        let response = test_app()
            .oneshot(request(Method::POST, "/api/v1/orders", Some(&token), Some(&body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_canceled_initial_status_is_rejected() {
        let token = token_for(Role::Admin);
        let body = format!(
            r#"{{"product_id":"{}","quantity":1,"status":"canceled"}}"#,
            Uuid::new_v4()
        );
        let response = test_app()
            .oneshot(request(Method::POST, "/api/v1/orders", Some(&token), Some(&body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "INVALID_STATUS");
    }

    #[tokio::test]
    async fn test_zero_quantity_order_is_invalid() {
        let token = token_for(Role::Employee);
        let body = format!(r#"{{"product_id":"{}","quantity":0}}"#, Uuid::new_v4());
        let response = test_app()
            .oneshot(request(Method::POST, "/api/v1/orders", Some(&token), Some(&body)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "VALIDATION_ERROR");
    }
}
