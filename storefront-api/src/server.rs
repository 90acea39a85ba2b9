use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::api::{admin, auth, cart, orders, products, wishlist};
use crate::config::Config;
use crate::middleware::auth::{require_admin, require_auth};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: sqlx::MySqlPool,
}

pub fn create_app(state: AppState) -> Router {
    let app_state = Arc::new(state);

    // 健康检查路由
    let health_route = Router::new().route("/health", get(|| async { "OK" }));

    // 公开路由
    let public_routes = Router::new()
        .nest("/auth", auth::public_routes())
        .merge(products::public_routes());

    // 需要认证的路由
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_routes())
        .nest("/cart", cart::routes())
        .nest("/orders", orders::routes())
        .nest("/wishlist", wishlist::routes())
        .layer(from_fn_with_state(app_state.clone(), require_auth));

    // 管理员路由
    let admin_routes = Router::new()
        .nest("/admin", admin::routes())
        .layer(from_fn_with_state(app_state.clone(), require_admin))
        .layer(from_fn_with_state(app_state.clone(), require_auth));

    // 组合所有路由
    let api_routes = public_routes.merge(protected_routes).merge(admin_routes);

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_route)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                .layer(CorsLayer::new().allow_origin(Any)),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthConfig, DatabaseConfig, LoggingConfig, ServerConfig};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::mysql::MySqlPoolOptions;
    use tower::ServiceExt;

    // connect_lazy 不会建立真实连接，足以组装路由
    fn test_app() -> Router {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                environment: "test".to_string(),
            },
            database: DatabaseConfig {
                url: "mysql://root@localhost:3306/storefront".to_string(),
                max_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                token_expiry_hours: 1,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        let db = MySqlPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect_lazy(&config.database.url)
            .unwrap();

        create_app(AppState { config, db })
    }

    #[tokio::test]
    async fn health_check_responds_ok() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn orders_require_authentication() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/orders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_require_authentication() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/admin/dashboard")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
