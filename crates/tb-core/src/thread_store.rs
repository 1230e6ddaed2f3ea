//! # Thread Store
//!
//! Create, list, report and delete threads. Owns the bump ordering of a board.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{now, Thread, RECENT_REPLY_LIMIT, RECENT_THREAD_LIMIT};
use crate::traits::{SecretHasher, ThreadRepo};

/// Returned by operations whose only result is that they happened.
pub const SUCCESS: &str = "success";

#[derive(Clone)]
pub struct ThreadStore {
    repo: Arc<dyn ThreadRepo>,
    hasher: Arc<dyn SecretHasher>,
}

impl ThreadStore {
    pub fn new(repo: Arc<dyn ThreadRepo>, hasher: Arc<dyn SecretHasher>) -> Self {
        Self { repo, hasher }
    }

    pub(crate) fn repo(&self) -> &dyn ThreadRepo {
        self.repo.as_ref()
    }

    pub(crate) fn hasher(&self) -> &dyn SecretHasher {
        self.hasher.as_ref()
    }

    /// The 10 most recently bumped threads of `board`, 3 newest replies each.
    #[tracing::instrument(skip(self))]
    pub async fn list_recent(&self, board: &str) -> Result<Vec<Thread>> {
        let board = required(board, "board name")?;
        let threads = self
            .repo
            .list_recent(board, RECENT_THREAD_LIMIT, RECENT_REPLY_LIMIT)
            .await?;
        Ok(threads)
    }

    /// Posts a new thread. Fields are checked board, text, password; first miss wins.
    #[tracing::instrument(skip(self, text, secret))]
    pub async fn create(&self, board: &str, text: &str, secret: &SecretString) -> Result<Thread> {
        let board = required(board, "board name")?;
        let text = required(text, "thread text")?;
        let secret = required_secret(secret)?;

        let hash = self.hasher.hash_secret(secret).await?;
        let thread = Thread::new(board, text, hash, now());
        self.repo.insert_thread(thread.clone()).await?;

        tracing::info!(thread_id = %thread.id, "thread created");
        Ok(thread)
    }

    /// Flags a thread for moderators and bumps it. Anyone may report; no
    /// password involved.
    #[tracing::instrument(skip(self))]
    pub async fn report(&self, thread_id: &str) -> Result<&'static str> {
        let thread_id = required(thread_id, "thread id")?;
        let denied = || AppError::denied("report", "thread");

        let id = parse_id(thread_id).ok_or_else(denied)?;
        if !self.repo.set_thread_reported(id, now()).await? {
            return Err(denied());
        }

        tracing::info!(thread_id = %id, "thread reported");
        Ok(SUCCESS)
    }

    /// Removes a thread and all its replies once the delete password checks out.
    #[tracing::instrument(skip(self, secret))]
    pub async fn delete(&self, thread_id: &str, secret: &SecretString) -> Result<&'static str> {
        let thread_id = required(thread_id, "thread id")?;
        let secret = required_secret(secret)?;
        let denied = || AppError::denied("delete", "thread");

        let id = parse_id(thread_id).ok_or_else(denied)?;
        let hash = self
            .repo
            .thread_password_hash(id)
            .await?
            .ok_or_else(denied)?;

        if !self.hasher.verify_secret(secret, &hash).await? {
            tracing::warn!(thread_id = %id, "thread delete rejected: password mismatch");
            return Err(AppError::Unauthorized);
        }

        // Guarded by the verified hash: a concurrent delete turns into NotFound.
        if !self.repo.delete_thread(id, &hash).await? {
            return Err(denied());
        }

        tracing::info!(thread_id = %id, "thread deleted");
        Ok(SUCCESS)
    }

    /// Loads a whole thread. Malformed and unknown ids both come back as `None`.
    pub async fn find(&self, thread_id: &str) -> Result<Option<Thread>> {
        match parse_id(thread_id) {
            Some(id) => Ok(self.repo.get_thread(id).await?),
            None => Ok(None),
        }
    }
}

pub(crate) fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    if value.is_empty() {
        return Err(AppError::required(field));
    }
    Ok(value)
}

pub(crate) fn required_secret(secret: &SecretString) -> Result<&str> {
    required(secret.expose_secret(), "password")
}

pub(crate) fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockSecretHasher, MockThreadRepo};
    use mockall::predicate::eq;

    fn store(repo: MockThreadRepo, hasher: MockSecretHasher) -> ThreadStore {
        ThreadStore::new(Arc::new(repo), Arc::new(hasher))
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[tokio::test]
    async fn create_checks_board_then_text_then_password() {
        // No expectations: any storage or hasher call would panic.
        let store = store(MockThreadRepo::new(), MockSecretHasher::new());

        let err = store.create("", "", &secret("")).await.unwrap_err();
        assert_eq!(err.to_string(), "board name is a required field");

        let err = store.create("qa", "", &secret("")).await.unwrap_err();
        assert_eq!(err.to_string(), "thread text is a required field");

        let err = store.create("qa", "hello", &secret("")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(err.to_string(), "password is a required field");
    }

    #[tokio::test]
    async fn create_persists_hashed_thread() {
        let mut hasher = MockSecretHasher::new();
        hasher
            .expect_hash_secret()
            .with(eq("pw1"))
            .returning(|_| Ok("hashed-pw1".to_string()));

        let mut repo = MockThreadRepo::new();
        repo.expect_insert_thread()
            .withf(|t| {
                t.board == "qa"
                    && t.text == "hello"
                    && t.delete_password_hash == "hashed-pw1"
                    && !t.reported
                    && t.reply_count == 0
                    && t.replies.is_empty()
                    && t.created_on == t.bumped_on
            })
            .times(1)
            .returning(|_| Ok(()));

        let thread = store(repo, hasher)
            .create("qa", "hello", &secret("pw1"))
            .await
            .unwrap();
        assert_eq!(thread.text, "hello");
        assert_ne!(thread.delete_password_hash, "pw1");
    }

    #[tokio::test]
    async fn list_recent_asks_for_top_ten_with_three_replies() {
        let mut repo = MockThreadRepo::new();
        repo.expect_list_recent()
            .with(eq("qa"), eq(10usize), eq(3usize))
            .returning(|_, _, _| Ok(Vec::new()));

        let threads = store(repo, MockSecretHasher::new())
            .list_recent("qa")
            .await
            .unwrap();
        assert!(threads.is_empty());

        let err = store(MockThreadRepo::new(), MockSecretHasher::new())
            .list_recent("")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn report_unknown_or_malformed_thread_is_denied() {
        let mut repo = MockThreadRepo::new();
        repo.expect_set_thread_reported().returning(|_, _| Ok(false));
        let store = store(repo, MockSecretHasher::new());

        let err = store.report(&Uuid::now_v7().to_string()).await.unwrap_err();
        assert_eq!(err.to_string(), "cannot report this thread");

        let err = store.report("not-a-uuid").await.unwrap_err();
        assert_eq!(err.to_string(), "cannot report this thread");

        let err = store.report("").await.unwrap_err();
        assert_eq!(err.to_string(), "thread id is a required field");
    }

    #[tokio::test]
    async fn delete_with_wrong_password_keeps_thread() {
        let mut repo = MockThreadRepo::new();
        repo.expect_thread_password_hash()
            .returning(|_| Ok(Some("stored".to_string())));
        repo.expect_delete_thread().never();

        let mut hasher = MockSecretHasher::new();
        hasher
            .expect_verify_secret()
            .with(eq("wrong"), eq("stored"))
            .returning(|_, _| Ok(false));

        let err = store(repo, hasher)
            .delete(&Uuid::now_v7().to_string(), &secret("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn delete_lost_race_is_not_found() {
        let mut repo = MockThreadRepo::new();
        repo.expect_thread_password_hash()
            .returning(|_| Ok(Some("stored".to_string())));
        repo.expect_delete_thread()
            .withf(|_, hash| hash == "stored")
            .returning(|_, _| Ok(false));

        let mut hasher = MockSecretHasher::new();
        hasher.expect_verify_secret().returning(|_, _| Ok(true));

        let err = store(repo, hasher)
            .delete(&Uuid::now_v7().to_string(), &secret("pw1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot delete this thread");
    }

    #[tokio::test]
    async fn store_failures_propagate_as_internal() {
        let mut repo = MockThreadRepo::new();
        repo.expect_list_recent()
            .returning(|_, _, _| Err(anyhow::anyhow!("database is locked")));

        let err = store(repo, MockSecretHasher::new())
            .list_recent("qa")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
