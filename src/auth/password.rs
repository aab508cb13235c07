use super::AuthError;

/// bcrypt on the blocking pool so request tasks never stall on hashing
pub async fn hash_password(plain: &str) -> Result<String, AuthError> {
    hash_with_cost(plain, bcrypt::DEFAULT_COST).await
}

pub async fn hash_with_cost(plain: &str, cost: u32) -> Result<String, AuthError> {
    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// False for a wrong password and for a malformed or empty hash
pub async fn verify_password(plain: &str, hash: &str) -> bool {
    if hash.is_empty() {
        return false;
    }
    let plain = plain.to_string();
    let hash = hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            tracing::debug!("bcrypt verify failed: {}", e);
            false
        }
        Err(e) => {
            tracing::error!("bcrypt task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_with_cost("s3cret", 4).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("s3cret", &hash).await);
        assert!(!verify_password("wrong", &hash).await);
    }

    #[tokio::test]
    async fn accepts_2y_prefixed_hashes() {
        let hash = hash_with_cost("s3cret", 4).await.unwrap();
        let legacy = format!("$2y{}", &hash[3..]);
        assert!(verify_password("s3cret", &legacy).await);
    }

    #[tokio::test]
    async fn malformed_hashes_never_match() {
        assert!(!verify_password("s3cret", "").await);
        assert!(!verify_password("s3cret", "plaintext").await);
    }
}
