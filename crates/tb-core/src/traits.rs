//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Reply, Thread};

/// Data persistence contract for thread documents and their nested replies.
///
/// Every mutating method is one atomic unit against a single thread document.
/// Methods returning `bool` report whether anything matched.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ThreadRepo: Send + Sync {
    // Thread Operations
    async fn insert_thread(&self, thread: Thread) -> anyhow::Result<()>;
    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>>;
    /// Latest-bumped threads of a board, each cut to its newest `reply_limit` replies.
    async fn list_recent(
        &self,
        board: &str,
        thread_limit: usize,
        reply_limit: usize,
    ) -> anyhow::Result<Vec<Thread>>;
    /// Flags the thread and bumps it to `bumped_on` (never backwards).
    async fn set_thread_reported(
        &self,
        id: Uuid,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<bool>;
    /// Stored hash of the thread's delete password.
    async fn thread_password_hash(&self, id: Uuid) -> anyhow::Result<Option<String>>;
    /// Removes the thread and its replies, but only while its hash is still `expected_hash`.
    async fn delete_thread(&self, id: Uuid, expected_hash: &str) -> anyhow::Result<bool>;

    // Reply Operations
    /// Increments `reply_count`, inserts `reply` newest-first and bumps the
    /// thread to `bumped_on`, all at once. `None` when the thread is absent.
    async fn push_reply(
        &self,
        thread_id: Uuid,
        reply: Reply,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<Option<Thread>>;
    async fn reply_password_hash(
        &self,
        thread_id: Uuid,
        reply_id: Uuid,
    ) -> anyhow::Result<Option<String>>;
    /// Flags one reply. The thread's `bumped_on` is left as it is.
    async fn set_reply_reported(&self, thread_id: Uuid, reply_id: Uuid) -> anyhow::Result<bool>;
    /// Replaces the reply's text with the placeholder and bumps the thread,
    /// but only while the reply's hash is still `expected_hash`.
    async fn redact_reply(
        &self,
        thread_id: Uuid,
        reply_id: Uuid,
        expected_hash: &str,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<bool>;

    /// Releases connections at shutdown.
    async fn close(&self) {}
}

/// Delete-password contract: slow salted hashing and constant-time verification.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SecretHasher: Send + Sync {
    /// Produces a self-describing (salt and parameters included) hash string.
    async fn hash_secret(&self, secret: &str) -> anyhow::Result<String>;

    /// Checks `secret` against a stored hash. Malformed hashes never verify.
    async fn verify_secret(&self, secret: &str, hash: &str) -> anyhow::Result<bool>;
}
