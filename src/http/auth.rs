//! Typed request identity.
//!
//! Token issuance and verification live in an upstream gateway (an
//! external collaborator); by the time a request reaches this service its
//! identity has been verified and forwarded as headers. This extractor is
//! the single place handlers obtain `{tenant_id, role}` from.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::Role;
use crate::CommerceError;

const TENANT_HEADER: &str = "x-auth-tenant";
const ROLE_HEADER: &str = "x-auth-role";
const CUSTOMER_HEADER: &str = "x-auth-customer";

#[derive(Clone, Copy, Debug)]
pub struct AuthContext {
    pub tenant_id: i64,
    pub role: Role,
    /// Set when the caller is a storefront customer.
    pub customer_id: Option<i64>,
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthContext {
    type Rejection = CommerceError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };

        let tenant_id = header(TENANT_HEADER)
            .and_then(|v| v.parse().ok())
            .ok_or(CommerceError::Unauthorized)?;
        let role: Role = header(ROLE_HEADER)
            .and_then(|v| v.parse().ok())
            .ok_or(CommerceError::Unauthorized)?;
        let customer_id = header(CUSTOMER_HEADER).and_then(|v| v.parse().ok());

        Ok(AuthContext {
            tenant_id,
            role,
            customer_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> std::result::Result<AuthContext, CommerceError> {
        let (mut parts, _) = req.into_parts();
        AuthContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_admin_context_is_parsed() {
        let req = Request::builder()
            .header("x-auth-tenant", "7")
            .header("x-auth-role", "tenant_admin")
            .body(())
            .unwrap();
        let ctx = extract(req).await.unwrap();
        assert_eq!(ctx.tenant_id, 7);
        assert_eq!(ctx.role, Role::TenantAdmin);
        assert_eq!(ctx.customer_id, None);
    }

    #[tokio::test]
    async fn test_customer_context_carries_customer_id() {
        let req = Request::builder()
            .header("x-auth-tenant", "3")
            .header("x-auth-role", "customer")
            .header("x-auth-customer", "41")
            .body(())
            .unwrap();
        let ctx = extract(req).await.unwrap();
        assert_eq!(ctx.role, Role::Customer);
        assert_eq!(ctx.customer_id, Some(41));
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let req = Request::builder().body(()).unwrap();
        assert!(matches!(
            extract(req).await,
            Err(CommerceError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_unknown_role_is_unauthorized() {
        let req = Request::builder()
            .header("x-auth-tenant", "1")
            .header("x-auth-role", "owner")
            .body(())
            .unwrap();
        assert!(matches!(
            extract(req).await,
            Err(CommerceError::Unauthorized)
        ));
    }
}
