//! Bearer token verification.
//!
//! Tokens are issued elsewhere; this module only verifies them and maps the
//! claims onto a [`Caller`]. Claims used: `sub`, `username` and `role`
//! (`"admin"` grants [`Caller::Admin`], anything else [`Caller::User`]).

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{SignageError, SignageResult};
use crate::state::JwtConfig;
use crate::tenant::{Caller, TenantId};

/// Role claim value that grants admin rights.
const ADMIN_ROLE: &str = "admin";

/// Verifies a bearer token and returns the identity it carries.
///
/// Implementations must never return [`Caller::Anonymous`]; a token that
/// cannot be verified is an error.
pub trait IdentityVerifier: Send + Sync {
    /// Verifies `token` (without the `Bearer ` prefix).
    fn verify(&self, token: &str) -> SignageResult<Caller>;
}

#[derive(Debug, Deserialize)]
struct Claims {
    #[allow(dead_code)]
    sub: String,
    username: String,
    #[serde(default)]
    role: Option<String>,
}

/// HS256 JWT verifier.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Creates a verifier from configuration.
    ///
    /// Returns `None` when no secret is configured.
    pub fn from_config(config: &JwtConfig) -> Option<Self> {
        let secret = config.secret.as_deref()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256];
        validation.leeway = config.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(iss) = config.issuer.as_deref() {
            validation.set_issuer(&[iss]);
        }
        match config.audience.as_deref() {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        Some(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> SignageResult<Caller> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            log::debug!("[Auth] Token rejected: {}", e);
            SignageError::Unauthorized("Invalid token".to_string())
        })?;

        let username = TenantId::parse(&data.claims.username)
            .map_err(|_| SignageError::Unauthorized("Invalid username claim".to_string()))?;

        Ok(match data.claims.role.as_deref() {
            Some(ADMIN_ROLE) => Caller::Admin { username },
            _ => Caller::User { username },
        })
    }
}

/// Verifier used when no signing secret is configured: every token fails.
pub struct RejectAllVerifier;

impl IdentityVerifier for RejectAllVerifier {
    fn verify(&self, _token: &str) -> SignageResult<Caller> {
        Err(SignageError::Unauthorized(
            "Token authentication is not configured".to_string(),
        ))
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// Returns `None` unless the value uses the `Bearer` scheme with a
/// non-empty token.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let token = header_value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}


#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> JwtVerifier {
        JwtVerifier::from_config(&JwtConfig {
            secret: Some(test_tokens::SECRET.to_string()),
            ..JwtConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn no_secret_means_no_verifier() {
        assert!(JwtVerifier::from_config(&JwtConfig::default()).is_none());
    }

    #[test]
    fn user_token_maps_to_user_caller() {
        let caller = verifier().verify(&test_tokens::user("acme")).unwrap();
        assert_eq!(
            caller,
            Caller::User {
                username: TenantId::parse("acme").unwrap()
            }
        );
    }

    #[test]
    fn admin_role_maps_to_admin_caller() {
        let caller = verifier().verify(&test_tokens::admin("root")).unwrap();
        assert!(matches!(caller, Caller::Admin { .. }));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = test_tokens::mint("acme", "user", -3600);
        let err = verifier().verify(&token).unwrap_err();
        assert!(matches!(err, SignageError::Unauthorized(_)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let token = encode(
            &Header::default(),
            &serde_json::json!({"sub": "x", "username": "acme", "exp": u32::MAX}),
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();
        assert!(verifier().verify(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verifier().verify("not-a-jwt").is_err());
        assert!(RejectAllVerifier.verify("anything").is_err());
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
