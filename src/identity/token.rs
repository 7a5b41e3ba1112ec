//! Session token issuance and validation
//!
//! Tokens are HS256 JWTs signed with a symmetric secret that is loaded once
//! at start-up. They live for [`TOKEN_LIFETIME`] and cannot be refreshed:
//! after expiry the user logs in again.

use crate::core::auth::AuthContext;
use crate::identity::error::AuthError;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// How long an issued token stays valid
pub const TOKEN_LIFETIME: Duration = Duration::minutes(7);

/// The symmetric signing key.
///
/// `Debug` never prints the key.
#[derive(Clone)]
pub struct SigningSecret(Arc<str>);

impl SigningSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Arc::from(secret.into()))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// Claim set carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token, so two logins in the same second differ
    pub jti: String,
}

impl Claims {
    pub fn subject_id(&self) -> Result<i64, AuthError> {
        self.sub
            .parse()
            .map_err(|_| AuthError::InvalidToken(format!("non-numeric subject '{}'", self.sub)))
    }

    /// The user context these validated claims authenticate
    pub fn auth_context(&self) -> Result<AuthContext, AuthError> {
        Ok(AuthContext::User {
            user_id: self.subject_id()?,
            roles: self.role.iter().cloned().collect(),
        })
    }
}

/// A freshly signed token and the facts it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub subject_id: i64,
    pub role: Option<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// The signature segment of the compact JWT
    pub fn signature(&self) -> &str {
        self.token.rsplit('.').next().unwrap_or_default()
    }
}

/// Signs and validates session tokens.
///
/// Cheap to clone: the keys are shared.
#[derive(Clone)]
pub struct TokenIssuer {
    keys: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(secret: &SigningSecret) -> Self {
        Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            }),
        }
    }

    /// Issue a token valid from now
    pub fn issue(&self, subject_id: i64, role: Option<&str>) -> Result<IssuedToken, AuthError> {
        self.issue_at(subject_id, role, Utc::now())
    }

    /// Issue a token as if signed at `issued_at`
    pub fn issue_at(
        &self,
        subject_id: i64,
        role: Option<&str>,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        // JWT timestamps have second precision
        let issued_at = Utc
            .timestamp_opt(issued_at.timestamp(), 0)
            .single()
            .ok_or_else(|| AuthError::Signing("issue time out of range".to_string()))?;
        let expires_at = issued_at + TOKEN_LIFETIME;

        let claims = Claims {
            sub: subject_id.to_string(),
            role: role.map(str::to_string),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)
            .map_err(|e| AuthError::Signing(format!("failed to sign JWT: {}", e)))?;

        Ok(IssuedToken {
            token,
            subject_id,
            role: claims.role,
            issued_at,
            expires_at,
        })
    }

    /// Check signature and expiry and return the claims
    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.keys.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let err = match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken(e.to_string()),
                };
                warn!(error = %err, "Token validation failed");
                err
            })
    }
}
