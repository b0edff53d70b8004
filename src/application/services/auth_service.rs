//! Authentication service for API token validation.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;

use crate::domain::repositories::TokenRepository;
use crate::error::AppError;
use serde_json::json;

type HmacSha256 = Hmac<Sha256>;

/// The authenticated caller of an `/api` route.
///
/// Inserted into request extensions by the auth middleware; every analytics
/// and link-management query is scoped to `owner_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub owner_id: i64,
}

/// Hashes a raw token with HMAC-SHA256 keyed by `signing_secret`.
///
/// Returns a 64-character lowercase hex-encoded MAC. Shared with the admin CLI
/// so tokens it issues verify against the server.
pub fn hash_token(signing_secret: &str, token: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(token.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Service for authenticating API requests via Bearer tokens.
///
/// Tokens are hashed with HMAC-SHA256 (keyed by `signing_secret`) before storage
/// and comparison. An attacker with read-only access to the database cannot verify
/// or forge tokens without the server-side secret.
pub struct AuthService {
    repository: Arc<dyn TokenRepository>,
    signing_secret: String,
}

impl AuthService {
    /// Creates a new authentication service.
    ///
    /// `signing_secret` must match the value used when tokens were created.
    pub fn new(repository: Arc<dyn TokenRepository>, signing_secret: String) -> Self {
        Self {
            repository,
            signing_secret,
        }
    }

    fn hash(&self, token: &str) -> String {
        hash_token(&self.signing_secret, token)
    }

    /// Resolves a raw token to the principal that owns it.
    ///
    /// On success the token's `last_used_at` is touched; a failure to do so is
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unauthorized`] if the token is unknown or revoked.
    /// Returns [`AppError::Internal`] on database errors.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AppError> {
        let token_hash = self.hash(token);

        let Some(owner_id) = self.repository.find_active_owner(&token_hash).await? else {
            return Err(AppError::unauthorized(
                "Unauthorized",
                json!({"reason": "Invalid or revoked token"}),
            ));
        };

        let _ = self.repository.update_last_used(&token_hash).await;

        Ok(Principal { owner_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockTokenRepository;

    const SECRET: &str = "test-signing-secret";

    #[tokio::test]
    async fn test_authenticate_success() {
        let mut mock_repo = MockTokenRepository::new();

        let token = "valid-token";
        let expected_hash = hash_token(SECRET, token);

        mock_repo
            .expect_find_active_owner()
            .withf(move |hash| hash == expected_hash)
            .times(1)
            .returning(|_| Ok(Some(42)));

        mock_repo
            .expect_update_last_used()
            .times(1)
            .returning(|_| Ok(()));

        let service = AuthService::new(Arc::new(mock_repo), SECRET.to_string());

        let principal = service.authenticate(token).await.unwrap();
        assert_eq!(principal, Principal { owner_id: 42 });
    }

    #[tokio::test]
    async fn test_authenticate_invalid_token() {
        let mut mock_repo = MockTokenRepository::new();

        mock_repo
            .expect_find_active_owner()
            .times(1)
            .returning(|_| Ok(None));
        mock_repo.expect_update_last_used().times(0);

        let service = AuthService::new(Arc::new(mock_repo), SECRET.to_string());

        let result = service.authenticate("invalid-token").await;
        assert!(matches!(result.unwrap_err(), AppError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_last_used_failure_does_not_reject() {
        let mut mock_repo = MockTokenRepository::new();

        mock_repo
            .expect_find_active_owner()
            .returning(|_| Ok(Some(1)));
        mock_repo
            .expect_update_last_used()
            .returning(|_| Err(AppError::internal("db down", json!({}))));

        let service = AuthService::new(Arc::new(mock_repo), SECRET.to_string());
        assert!(service.authenticate("t").await.is_ok());
    }

    #[test]
    fn test_hash_token_consistency() {
        let hash1 = hash_token(SECRET, "test-token");
        let hash2 = hash_token(SECRET, "test-token");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, hash_token(SECRET, "other-token"));
    }

    #[test]
    fn test_hash_token_secret_matters() {
        assert_ne!(hash_token("secret-a", "token"), hash_token("secret-b", "token"));
    }
}
