//! Tenant scoping: the single chokepoint for company isolation.
//!
//! Every read and write resolves its effective company through [`AuthUser`].
//! Non-platform callers are pinned to their token's company; client-supplied
//! company ids are ignored for them. A row that belongs to another company is
//! reported as NotFound, never as Forbidden, so cross-tenant probing cannot
//! enumerate ids.

use serde::{Deserialize, Serialize};

use super::entity_ids::{CompanyId, UserId};
use super::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Platform,
    Admin,
    Technician,
    Dispatcher,
}

/// Authenticated caller, decoded from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    /// None only for platform operators.
    pub company_id: Option<CompanyId>,
    pub role: Role,
    pub email: String,
}

impl AuthUser {
    pub fn is_platform(&self) -> bool {
        self.role == Role::Platform
    }

    /// Resolve the company this request operates on.
    ///
    /// Platform operators must name a company explicitly; everyone else is
    /// pinned to their own and the `requested` argument is ignored.
    pub fn effective_company(&self, requested: Option<CompanyId>) -> Result<CompanyId, AppError> {
        if self.is_platform() {
            requested
                .ok_or_else(|| AppError::validation_field("companyId", "required for platform operators"))
        } else {
            self.company_id
                .ok_or_else(|| AppError::Forbidden("account is not attached to a company".to_string()))
        }
    }

    /// Check that a fetched row is visible to this caller.
    ///
    /// Cross-tenant rows surface as NotFound for the named entity.
    pub fn ensure_visible(
        &self,
        row_company: CompanyId,
        entity: &'static str,
    ) -> Result<(), AppError> {
        if self.is_platform() || self.company_id == Some(row_company) {
            Ok(())
        } else {
            Err(AppError::NotFound(entity))
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        match self.role {
            Role::Platform | Role::Admin => Ok(()),
            _ => Err(AppError::Forbidden("admin access required".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, company: Option<CompanyId>) -> AuthUser {
        AuthUser {
            user_id: UserId::new(),
            company_id: company,
            role,
            email: "t@example.com".to_string(),
        }
    }

    #[test]
    fn test_non_platform_ignores_requested_company() {
        let own = CompanyId::new();
        let other = CompanyId::new();
        let caller = user(Role::Dispatcher, Some(own));

        let effective = caller.effective_company(Some(other)).unwrap();
        assert_eq!(effective, own);
    }

    #[test]
    fn test_platform_requires_explicit_company() {
        let caller = user(Role::Platform, None);
        assert!(caller.effective_company(None).is_err());

        let target = CompanyId::new();
        assert_eq!(caller.effective_company(Some(target)).unwrap(), target);
    }

    #[test]
    fn test_cross_tenant_read_masks_as_not_found() {
        let caller = user(Role::Admin, Some(CompanyId::new()));
        let err = caller
            .ensure_visible(CompanyId::new(), "Job")
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("Job")));
    }

    #[test]
    fn test_platform_sees_everything() {
        let caller = user(Role::Platform, None);
        assert!(caller.ensure_visible(CompanyId::new(), "Job").is_ok());
    }
}
