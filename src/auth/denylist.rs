use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

/// Logged-out token ids, kept until the token would have expired anyway
#[derive(Clone, Debug, Default)]
pub struct TokenDenylist {
    revoked: Arc<RwLock<HashMap<String, i64>>>,
}

impl TokenDenylist {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn revoke(&self, jti: &str, exp: i64) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, expires| *expires > now);
        revoked.insert(jti.to_string(), exp);
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.read().await.contains_key(jti)
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn revoked_ids_are_remembered() {
        let denylist = TokenDenylist::new();
        let exp = Utc::now().timestamp() + 3600;
        denylist.revoke("a", exp).await;
        assert!(denylist.is_revoked("a").await);
        assert!(!denylist.is_revoked("b").await);
    }

    #[tokio::test]
    async fn expired_entries_are_pruned_on_write() {
        let denylist = TokenDenylist::new();
        let now = Utc::now().timestamp();
        denylist.revoke("old", now - 10).await;
        denylist.revoke("new", now + 3600).await;
        assert!(!denylist.is_revoked("old").await);
        assert_eq!(denylist.len().await, 1);
    }
}
