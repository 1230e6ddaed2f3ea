//! # tb-auth-argon2
//!
//! Argon2id implementation of `SecretHasher`.
//! Hashes thread and reply delete passwords and verifies them in constant time.
//! Both directions run on tokio's blocking pool so the deliberately slow hash
//! never stalls an async worker.

use anyhow::Context;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use async_trait::async_trait;
use tb_core::traits::SecretHasher;
use zeroize::Zeroizing;

/// Cost tuned for interactive posting: 19 MiB, 2 passes, 1 lane.
pub const INTERACTIVE_M_COST: u32 = 19 * 1024;
pub const INTERACTIVE_T_COST: u32 = 2;
pub const INTERACTIVE_P_COST: u32 = 1;

#[derive(Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Uses the interactive cost constants.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_cost(INTERACTIVE_M_COST, INTERACTIVE_T_COST, INTERACTIVE_P_COST)
    }

    /// Custom cost, e.g. a cheap one for test suites.
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> anyhow::Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 parameters: {e}"))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

#[async_trait]
impl SecretHasher for Argon2Hasher {
    /// Returns a PHC string (`$argon2id$v=19$m=...`) carrying its own salt and cost.
    async fn hash_secret(&self, secret: &str) -> anyhow::Result<String> {
        let secret = Zeroizing::new(secret.to_owned());
        let argon2 = self.argon2();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(secret.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow::anyhow!("argon2 hashing failed: {e}"))
        })
        .await
        .context("hashing task panicked")?
    }

    /// Verifies with the parameters recorded in the hash itself, so hashes made
    /// under an older cost keep working.
    async fn verify_secret(&self, secret: &str, hash: &str) -> anyhow::Result<bool> {
        let secret = Zeroizing::new(secret.to_owned());
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || {
            let parsed_hash = match PasswordHash::new(&hash) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("stored password hash is malformed: {e}");
                    return false;
                }
            };
            Argon2::default()
                .verify_password(secret.as_bytes(), &parsed_hash)
                .is_ok()
        })
        .await
        .context("verification task panicked")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Hasher {
        Argon2Hasher::with_cost(8, 1, 1).unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = cheap();
        let hash = hasher.hash_secret("pw1").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("pw1"));
        assert!(hasher.verify_secret("pw1", &hash).await.unwrap());
        assert!(!hasher.verify_secret("pw2", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let hasher = cheap();
        let a = hasher.hash_secret("same").await.unwrap();
        let b = hasher.hash_secret("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_never_verifies() {
        let hasher = cheap();
        assert!(!hasher.verify_secret("pw1", "pw1").await.unwrap());
        assert!(!hasher.verify_secret("pw1", "").await.unwrap());
    }

    #[tokio::test]
    async fn interactive_cost_is_recorded_in_the_hash() {
        let hasher = Argon2Hasher::new().unwrap();
        let hash = hasher.hash_secret("pw1").await.unwrap();
        assert!(hash.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn rejects_impossible_cost() {
        assert!(Argon2Hasher::with_cost(0, 0, 0).is_err());
    }
}
