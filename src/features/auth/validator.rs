use super::jwks::JwksClient;
use super::model::AuthenticatedUser;
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Where token signatures are checked against
enum KeySource {
    /// RS256 keys published by an OIDC identity provider
    Jwks(Arc<JwksClient>),
    /// HS256 secret shared with the token issuer
    Secret(DecodingKey),
}

pub struct JwtValidator {
    keys: KeySource,
    issuer: Option<String>,
    audience: Option<String>,
    leeway: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct Claims {
    // Tokens minted by the legacy login flow carry the id as `userId`
    #[serde(alias = "userId")]
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

impl JwtValidator {
    pub fn with_jwks(
        jwks_client: Arc<JwksClient>,
        issuer: String,
        audience: Option<String>,
        leeway: Duration,
    ) -> Self {
        Self {
            keys: KeySource::Jwks(jwks_client),
            issuer: Some(issuer),
            audience,
            leeway: leeway.as_secs(),
        }
    }

    pub fn with_secret(
        secret: &str,
        issuer: Option<String>,
        audience: Option<String>,
        leeway: Duration,
    ) -> Self {
        Self {
            keys: KeySource::Secret(DecodingKey::from_secret(secret.as_bytes())),
            issuer,
            audience,
            leeway: leeway.as_secs(),
        }
    }

    /// Build the validator described by the auth configuration.
    ///
    /// An issuer selects JWKS verification; otherwise the shared secret is used.
    pub fn from_config(config: &AuthConfig) -> Result<Self, String> {
        match (&config.jwks_url, &config.issuer, &config.jwt_secret) {
            (Some(jwks_url), Some(issuer), _) => Ok(Self::with_jwks(
                Arc::new(JwksClient::new(jwks_url, config.jwks_cache_ttl)),
                issuer.clone(),
                config.audience.clone(),
                config.jwt_leeway,
            )),
            (_, _, Some(secret)) => Ok(Self::with_secret(
                secret,
                config.issuer.clone(),
                config.audience.clone(),
                config.jwt_leeway,
            )),
            _ => Err("No token verification key configured".to_string()),
        }
    }

    pub async fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let header = decode_header(token).map_err(|e| AppError::Unauthorized(e.to_string()))?;

        let (decoding_key, algorithm) = match &self.keys {
            KeySource::Jwks(jwks_client) => {
                if header.alg != Algorithm::RS256 {
                    return Err(AppError::Unauthorized(format!(
                        "Unsupported algorithm: {:?}. Only RS256 is allowed",
                        header.alg
                    )));
                }
                let kid = header.kid.ok_or_else(|| {
                    AppError::Unauthorized("Missing kid in token header".to_string())
                })?;
                let key = jwks_client
                    .get_key(&kid)
                    .await
                    .map_err(|e| AppError::Unauthorized(e.to_string()))?;
                (key, Algorithm::RS256)
            }
            KeySource::Secret(key) => {
                if header.alg != Algorithm::HS256 {
                    return Err(AppError::Unauthorized(format!(
                        "Unsupported algorithm: {:?}. Only HS256 is allowed",
                        header.alg
                    )));
                }
                (key.clone(), Algorithm::HS256)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = self.leeway;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        let claims = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized("Token has an empty subject".to_string()));
        }

        Ok(AuthenticatedUser {
            sub: claims.sub,
            email: claims.email,
        })
    }
}
