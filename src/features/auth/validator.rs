use super::jwks::JwksClient;
use super::model::{AuthenticatedUser, CustomClaims};
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Namespace under which the identity provider places application claims
const CLAIMS_NAMESPACE: &str = "https://ureport.in/claims";

/// Validates RS256 access tokens and maps them to an [`AuthenticatedUser`]
pub struct JwtValidator {
    jwks_client: Arc<JwksClient>,
    issuer: String,
    audience: String,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "https://ureport.in/claims", default)]
    custom_claims: Option<CustomClaims>,
}

impl JwtValidator {
    pub fn new(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: String,
        leeway: Duration,
    ) -> Self {
        Self {
            jwks_client,
            issuer,
            audience,
            leeway: leeway.as_secs(),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Auth(e.to_string()))?;

        if header.alg != Algorithm::RS256 {
            return Err(AppError::Auth(format!(
                "Unsupported algorithm: {:?}. Only RS256 is allowed",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| AppError::Auth("Missing kid in token header".to_string()))?;

        let decoding_key = self
            .jwks_client
            .get_key(&kid)
            .await
            .map_err(|e| AppError::Auth(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;

        let claims = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Auth(e.to_string()))?
            .claims;

        user_from_claims(claims)
    }
}

/// The numeric user id comes from the namespaced claims, falling back to a numeric `sub`
fn user_from_claims(claims: Claims) -> Result<AuthenticatedUser, AppError> {
    let (claimed_id, roles) = match claims.custom_claims {
        Some(custom) => (custom.user_id, custom.roles),
        None => (None, Vec::new()),
    };

    let user_id = claimed_id
        .or_else(|| claims.sub.parse::<i64>().ok())
        .ok_or_else(|| {
            AppError::Auth(format!(
                "Token carries no numeric user id ({} or sub)",
                CLAIMS_NAMESPACE
            ))
        })?;

    Ok(AuthenticatedUser {
        user_id,
        sub: claims.sub,
        roles,
    })
}
