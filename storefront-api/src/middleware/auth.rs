use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::services::auth_service::AuthService;
use crate::error::AppError;
use crate::server::AppState;

/// Authenticated caller, resolved from the bearer token and attached to the
/// request extensions for handlers to extract.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub is_admin: bool,
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 从请求头获取令牌
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    // 验证令牌并加载用户
    let auth_service = AuthService::new(state.clone());
    let user = auth_service.authenticate(token).await?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        is_admin: user.is_admin,
    });

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(_state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current_user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    if !current_user.is_admin {
        return Err(AppError::Forbidden(
            "Administrator privileges required".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
