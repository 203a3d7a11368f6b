use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Role;

/// JWT Claims - data stored in a session token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,              // Subject (user_id as string)
    pub user_id: Uuid,            // User UUID
    pub company_id: Option<Uuid>, // None only for platform operators
    pub role: Role,
    pub email: String,
    pub exp: i64, // Expiration timestamp
    pub iat: i64, // Issued at timestamp
    pub iss: String,  // Issuer
    pub jti: String,  // JWT ID (unique token identifier)
}

/// Claims for the public ETA lookup token.
///
/// A distinct audience keeps session tokens and ETA tokens from being
/// interchangeable.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EtaClaims {
    pub sub: String, // job_id as string
    pub job_id: Uuid,
    pub company_id: Uuid,
    pub aud: String, // always "eta"
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
}

/// JWT Service - creates and verifies JWT tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    /// Create new JWT service with secret and issuer
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Create a session token for a user.
    ///
    /// Token expires after 24 hours.
    pub fn create_token(
        &self,
        user_id: Uuid,
        company_id: Option<Uuid>,
        role: Role,
        email: String,
    ) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(24);

        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            company_id,
            role,
            email,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a session token.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }

    /// Create a short-lived public ETA token for one job (2 hour expiry).
    pub fn create_eta_token(&self, job_id: Uuid, company_id: Uuid) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(2);

        let claims = EtaClaims {
            sub: job_id.to_string(),
            job_id,
            company_id,
            aud: "eta".to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode an ETA token.
    pub fn verify_eta_token(&self, token: &str) -> Result<EtaClaims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&["eta"]);

        decode::<EtaClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let user_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();

        let token = service
            .create_token(
                user_id,
                Some(company_id),
                Role::Dispatcher,
                "dispatch@example.com".to_string(),
            )
            .unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.company_id, Some(company_id));
        assert_eq!(claims.role, Role::Dispatcher);
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        assert!(service.verify_token("invalid_token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", "test_issuer".to_string());
        let service2 = JwtService::new("secret2", "test_issuer".to_string());

        let token = service1
            .create_token(Uuid::new_v4(), None, Role::Platform, "p@example.com".into())
            .unwrap();

        assert!(service2.verify_token(&token).is_err());
    }

    #[test]
    fn test_eta_token_is_not_a_session_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let eta = service
            .create_eta_token(Uuid::new_v4(), Uuid::new_v4())
            .unwrap();

        // The ETA token must not verify as a session token (missing fields),
        // and a session token must not verify as an ETA token (audience).
        assert!(service.verify_token(&eta).is_err());

        let session = service
            .create_token(Uuid::new_v4(), None, Role::Platform, "p@example.com".into())
            .unwrap();
        assert!(service.verify_eta_token(&session).is_err());
    }

    #[test]
    fn test_eta_token_roundtrip() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let job_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();

        let token = service.create_eta_token(job_id, company_id).unwrap();
        let claims = service.verify_eta_token(&token).unwrap();
        assert_eq!(claims.job_id, job_id);
        assert_eq!(claims.company_id, company_id);
    }
}
