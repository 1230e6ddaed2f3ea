//! # Reply Engine
//!
//! Replies live inside their thread document. Every mutation here addresses a
//! single reply by `(thread_id, reply_id)` and leaves its siblings alone.

use secrecy::SecretString;

use crate::error::{AppError, Result};
use crate::models::{now, Reply, Thread};
use crate::thread_store::{parse_id, required, required_secret, ThreadStore, SUCCESS};

#[derive(Clone)]
pub struct ReplyEngine {
    threads: ThreadStore,
}

impl ReplyEngine {
    pub fn new(threads: ThreadStore) -> Self {
        Self { threads }
    }

    /// A thread with every one of its replies, unlike the board listing.
    #[tracing::instrument(skip(self))]
    pub async fn get_with_replies(&self, thread_id: &str) -> Result<Thread> {
        let thread_id = required(thread_id, "thread id")?;
        self.threads
            .find(thread_id)
            .await?
            .ok_or_else(|| AppError::denied("find", "thread"))
    }

    /// Adds a reply and bumps its thread. Returns the thread as updated.
    #[tracing::instrument(skip(self, text, secret))]
    pub async fn create_reply(
        &self,
        thread_id: &str,
        text: &str,
        secret: &SecretString,
    ) -> Result<Thread> {
        let thread_id = required(thread_id, "thread id")?;
        let text = required(text, "reply text")?;
        let secret = required_secret(secret)?;
        let denied = || AppError::denied("reply to", "thread");

        let id = parse_id(thread_id).ok_or_else(denied)?;
        let hash = self.threads.hasher().hash_secret(secret).await?;

        let posted_on = now();
        let reply = Reply::new(text, hash, posted_on);
        let reply_id = reply.id;

        // Count, insert and bump land as one update in the store.
        let thread = self
            .threads
            .repo()
            .push_reply(id, reply, posted_on)
            .await?
            .ok_or_else(denied)?;

        tracing::info!(thread_id = %id, reply_id = %reply_id, reply_count = thread.reply_count, "reply created");
        Ok(thread)
    }

    /// Flags one reply. Anyone may report; the thread is not bumped.
    #[tracing::instrument(skip(self))]
    pub async fn report_reply(&self, thread_id: &str, reply_id: &str) -> Result<&'static str> {
        let thread_id = required(thread_id, "thread id")?;
        let reply_id = required(reply_id, "reply id")?;
        let denied = || AppError::denied("report", "reply");

        let (Some(tid), Some(rid)) = (parse_id(thread_id), parse_id(reply_id)) else {
            return Err(denied());
        };
        if !self.threads.repo().set_reply_reported(tid, rid).await? {
            return Err(denied());
        }

        tracing::info!(thread_id = %tid, reply_id = %rid, "reply reported");
        Ok(SUCCESS)
    }

    /// Redacts a reply once its own delete password checks out. The record
    /// stays in place with its text replaced by the placeholder; the thread
    /// is bumped.
    #[tracing::instrument(skip(self, secret))]
    pub async fn delete_reply(
        &self,
        thread_id: &str,
        reply_id: &str,
        secret: &SecretString,
    ) -> Result<&'static str> {
        let thread_id = required(thread_id, "thread id")?;
        let reply_id = required(reply_id, "reply id")?;
        let secret = required_secret(secret)?;
        let denied = || AppError::denied("delete", "reply");

        let (Some(tid), Some(rid)) = (parse_id(thread_id), parse_id(reply_id)) else {
            return Err(denied());
        };
        let repo = self.threads.repo();
        let hash = repo
            .reply_password_hash(tid, rid)
            .await?
            .ok_or_else(denied)?;

        if !self.threads.hasher().verify_secret(secret, &hash).await? {
            tracing::warn!(thread_id = %tid, reply_id = %rid, "reply delete rejected: password mismatch");
            return Err(AppError::Unauthorized);
        }

        if !repo.redact_reply(tid, rid, &hash, now()).await? {
            return Err(denied());
        }

        tracing::info!(thread_id = %tid, reply_id = %rid, "reply redacted");
        Ok(SUCCESS)
    }
}
