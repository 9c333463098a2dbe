//! Route definitions for the warehouse ledger API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .merge(protected_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", post(handlers::create_user))
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .nest("/reports", report_routes())
        .route("/dashboard", get(handlers::get_dashboard))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product catalog routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route("/in-stock", get(handlers::list_in_stock))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
}

/// Order ledger routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route("/mine", get(handlers::list_my_orders))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/status", put(handlers::update_order_status))
        .route("/:order_id/cancel", post(handlers::cancel_order))
}

/// Report routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_reports))
        .route("/sales", post(handlers::generate_sales_report))
        .route("/sales/:date/lines", get(handlers::get_sales_lines))
        .route("/low-stock", post(handlers::generate_low_stock_alert))
        .route("/:report_id", get(handlers::get_report))
}
