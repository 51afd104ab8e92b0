//! Caller identity as forwarded by the authenticating gateway.
//!
//! Sessions and credentials are handled upstream; this service trusts the
//! `x-user-id`, `x-user-roles` and `x-tenant-id` headers it is given.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLES_HEADER: &str = "x-user-roles";
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

pub const ROLE_ADMIN: &str = "admin";

/// Acting user of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub roles: Vec<String>,
    pub tenant_id: Option<Uuid>,
}

impl AuthUser {
    pub fn new(user_id: impl Into<String>, roles: Vec<String>, tenant_id: Option<Uuid>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
            tenant_id,
        }
    }

    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    /// Check if the user is an admin
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Fails with FORBIDDEN unless the caller is an admin.
    pub fn require_admin(&self, action: &str) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "Only administrators can {}",
                action
            )))
        }
    }

    /// Tenant filter applied to listings; admins see every tenant.
    pub fn tenant_scope(&self) -> Option<Uuid> {
        if self.is_admin() {
            None
        } else {
            self.tenant_id
        }
    }

    fn from_parts(parts: &Parts) -> Result<Self, ServiceError> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let user_id = header(USER_ID_HEADER)
            .ok_or_else(|| ServiceError::Unauthorized("missing x-user-id header".to_string()))?;

        let roles = header(USER_ROLES_HEADER)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let tenant_id = header(TENANT_ID_HEADER)
            .map(|raw| {
                Uuid::parse_str(raw).map_err(|_| {
                    ServiceError::BadRequest(format!("invalid x-tenant-id header: {}", raw))
                })
            })
            .transpose()?;

        Ok(Self::new(user_id, roles, tenant_id))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts)
    }
}
