use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::MemoryStore;
use crate::domain::repositories::{ApiToken, TokenRepository};
use crate::error::AppError;

/// API token storage backed by [`MemoryStore`].
pub struct MemoryTokenRepository {
    store: Arc<MemoryStore>,
}

impl MemoryTokenRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    fn find_active(&self, token_hash: &str) -> Option<i64> {
        self.store
            .tokens
            .iter()
            .find(|entry| entry.token_hash == token_hash && entry.revoked_at.is_none())
            .map(|entry| *entry.key())
    }
}

#[async_trait]
impl TokenRepository for MemoryTokenRepository {
    async fn find_active_owner(&self, token_hash: &str) -> Result<Option<i64>, AppError> {
        Ok(self
            .find_active(token_hash)
            .and_then(|id| self.store.tokens.get(&id).map(|t| t.owner_id)))
    }

    async fn update_last_used(&self, token_hash: &str) -> Result<(), AppError> {
        if let Some(id) = self.find_active(token_hash)
            && let Some(mut token) = self.store.tokens.get_mut(&id)
        {
            token.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_token(
        &self,
        name: &str,
        owner_id: i64,
        token_hash: &str,
    ) -> Result<ApiToken, AppError> {
        if self.store.tokens.iter().any(|t| t.token_hash == token_hash) {
            return Err(AppError::conflict(
                "Token already exists",
                json!({ "name": name }),
            ));
        }

        let token = ApiToken {
            id: self.store.next_token_id(),
            name: name.to_string(),
            owner_id,
            token_hash: token_hash.to_string(),
            created_at: Utc::now(),
            last_used_at: None,
            revoked_at: None,
        };
        self.store.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn list_tokens(&self) -> Result<Vec<ApiToken>, AppError> {
        let mut tokens: Vec<ApiToken> = self
            .store
            .tokens
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tokens)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ApiToken>, AppError> {
        Ok(self.store.tokens.get(&id).map(|t| t.value().clone()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<ApiToken>, AppError> {
        Ok(self
            .store
            .tokens
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.value().clone()))
    }

    async fn revoke_token(&self, id: i64) -> Result<(), AppError> {
        if let Some(mut token) = self.store.tokens.get_mut(&id)
            && token.revoked_at.is_none()
        {
            token.revoked_at = Some(Utc::now());
        }
        Ok(())
    }
}
