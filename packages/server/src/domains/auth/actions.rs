//! Login and onboarding actions.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::common::{AppError, Role};
use crate::domains::company::models::Company;
use crate::kernel::ServerDeps;

use super::models::{EmailVerification, User};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub company_name: String,
    pub timezone: Option<String>,
    pub industry: Option<String>,
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub role: Role,
}

/// Exchange email + password for a bearer token.
pub async fn login(deps: &ServerDeps, input: LoginInput) -> Result<AuthResponse, AppError> {
    let user = User::find_by_email(&input.email, &deps.db_pool)
        .await?
        .ok_or(AppError::Auth)?;

    if !user.is_active {
        return Err(AppError::Auth);
    }

    let valid = bcrypt::verify(&input.password, &user.password_hash)
        .map_err(|e| anyhow::anyhow!("password verification failed: {}", e))?;
    if !valid {
        return Err(AppError::Auth);
    }

    let token = deps
        .jwt_service
        .create_token(user.id, user.company_id, user.role, user.email.clone())?;

    Ok(AuthResponse {
        token,
        user_id: user.id,
        company_id: user.company_id,
        role: user.role,
    })
}

/// Create a company plus its admin user. Requires a prior verified-email
/// record for the admin address.
pub async fn register(deps: &ServerDeps, input: RegisterInput) -> Result<AuthResponse, AppError> {
    if EmailVerification::find_verified(&input.email, &deps.db_pool)
        .await?
        .is_none()
    {
        return Err(AppError::validation_field("email", "address has not been verified"));
    }

    create_company_with_admin(deps, input).await
}

/// Self-serve onboarding: same shape as register without the verification
/// prerequisite.
pub async fn onboard(deps: &ServerDeps, input: RegisterInput) -> Result<AuthResponse, AppError> {
    create_company_with_admin(deps, input).await
}

async fn create_company_with_admin(
    deps: &ServerDeps,
    input: RegisterInput,
) -> Result<AuthResponse, AppError> {
    validate_registration(&input)?;

    if User::find_by_email(&input.email, &deps.db_pool).await?.is_some() {
        return Err(AppError::conflict("email is already registered"));
    }

    let password_hash = bcrypt::hash(&input.password, bcrypt::DEFAULT_COST)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;

    let mut tx = deps.db_pool.begin().await.map_err(AppError::Database)?;

    let company = Company::insert_in_tx(
        &mut tx,
        &input.company_name,
        input.timezone.as_deref().unwrap_or("America/Chicago"),
        input.industry.as_deref(),
    )
    .await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, company_id, email, password_hash, name, phone, role, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
         RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(company.id)
    .bind(&input.email)
    .bind(&password_hash)
    .bind(&input.name)
    .bind(&input.phone)
    .bind(Role::Admin)
    .fetch_one(&mut *tx)
    .await
    .map_err(AppError::Database)?;

    tx.commit().await.map_err(AppError::Database)?;

    info!(company_id = %company.id, user_id = %user.id, "company onboarded");

    let token = deps
        .jwt_service
        .create_token(user.id, user.company_id, user.role, user.email.clone())?;

    Ok(AuthResponse {
        token,
        user_id: user.id,
        company_id: user.company_id,
        role: user.role,
    })
}

fn validate_registration(input: &RegisterInput) -> Result<(), AppError> {
    if input.company_name.trim().is_empty() {
        return Err(AppError::validation_field("companyName", "must not be empty"));
    }
    if !input.email.contains('@') {
        return Err(AppError::validation_field("email", "must be a valid address"));
    }
    if input.password.len() < 8 {
        return Err(AppError::validation_field("password", "must be at least 8 characters"));
    }
    if let Some(tz) = &input.timezone {
        if tz.parse::<chrono_tz::Tz>().is_err() {
            return Err(AppError::validation_field("timezone", "unknown timezone"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RegisterInput {
        RegisterInput {
            company_name: "Summit HVAC".to_string(),
            timezone: Some("America/Chicago".to_string()),
            industry: Some("hvac".to_string()),
            email: "owner@summit.example".to_string(),
            password: "hunter2hunter2".to_string(),
            name: "Jo Owner".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_validate_accepts_good_input() {
        assert!(validate_registration(&input()).is_ok());
    }

    #[test]
    fn test_validate_rejects_short_password() {
        let mut bad = input();
        bad.password = "short".to_string();
        assert!(validate_registration(&bad).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_timezone() {
        let mut bad = input();
        bad.timezone = Some("Mars/Olympus".to_string());
        assert!(validate_registration(&bad).is_err());
    }
}
