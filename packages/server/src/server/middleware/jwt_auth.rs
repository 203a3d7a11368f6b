use std::sync::Arc;

use axum::http::request::Parts;
use axum::{extract::FromRequestParts, middleware::Next, response::Response};
use tracing::debug;

use crate::common::{AppError, AuthUser, CompanyId, UserId};
use crate::domains::auth::JwtService;

/// JWT authentication middleware
///
/// Extracts the bearer token from the Authorization header, verifies it, and
/// adds AuthUser to request extensions. Requests without a valid token
/// continue without AuthUser; handlers that require auth reject via the
/// `AuthUser` extractor.
pub async fn jwt_auth_middleware(
    jwt_service: Arc<JwtService>,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let auth_user = extract_auth_user(&request, &jwt_service);

    if let Some(user) = auth_user {
        debug!("Authenticated user: {} ({:?})", user.user_id, user.role);
        request.extensions_mut().insert(user);
    } else {
        debug!("No valid authentication token");
    }

    next.run(request).await
}

/// Extract and verify the bearer token from a request
fn extract_auth_user(
    request: &axum::http::Request<axum::body::Body>,
    jwt_service: &JwtService,
) -> Option<AuthUser> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    // Accept both "Bearer <token>" and a raw token
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str);

    let claims = jwt_service.verify_token(token).ok()?;

    Some(AuthUser {
        user_id: UserId::from_uuid(claims.user_id),
        company_id: claims.company_id.map(CompanyId::from_uuid),
        role: claims.role,
        email: claims.email,
    })
}

/// Handlers take `user: AuthUser` to require authentication; a missing or
/// invalid token becomes a 401 before the handler body runs.
#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Auth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Role;
    use uuid::Uuid;

    fn service() -> JwtService {
        JwtService::new("test_secret", "test_issuer".to_string())
    }

    fn request_with_header(value: Option<String>) -> axum::http::Request<axum::body::Body> {
        let mut builder = axum::http::Request::builder();
        if let Some(value) = value {
            builder = builder.header("authorization", value);
        }
        builder.body(axum::body::Body::empty()).unwrap()
    }

    #[test]
    fn test_extract_token_with_bearer() {
        let jwt_service = service();
        let user_id = Uuid::new_v4();
        let token = jwt_service
            .create_token(user_id, None, Role::Platform, "p@example.com".into())
            .unwrap();

        let request = request_with_header(Some(format!("Bearer {}", token)));
        let auth_user = extract_auth_user(&request, &jwt_service);
        assert_eq!(auth_user.unwrap().user_id, UserId::from_uuid(user_id));
    }

    #[test]
    fn test_extract_token_without_bearer() {
        let jwt_service = service();
        let user_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();
        let token = jwt_service
            .create_token(user_id, Some(company_id), Role::Admin, "a@example.com".into())
            .unwrap();

        let request = request_with_header(Some(token));
        let auth_user = extract_auth_user(&request, &jwt_service).unwrap();
        assert_eq!(auth_user.company_id, Some(CompanyId::from_uuid(company_id)));
    }

    #[test]
    fn test_no_auth_header() {
        let request = request_with_header(None);
        assert!(extract_auth_user(&request, &service()).is_none());
    }

    #[test]
    fn test_invalid_token() {
        let request = request_with_header(Some("Bearer invalid_token".to_string()));
        assert!(extract_auth_user(&request, &service()).is_none());
    }
}
