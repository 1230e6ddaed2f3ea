//! # tb-db-memory
//!
//! Process-local implementation of `ThreadRepo`, one DashMap entry per thread
//! document. Every mutation runs while holding that entry's write guard, which
//! gives the per-document atomicity the services rely on. Nothing survives a
//! restart; meant for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tb_core::models::{sort_by_bump, Reply, Thread};
use tb_core::traits::ThreadRepo;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryThreadRepo {
    threads: DashMap<Uuid, Thread>,
}

impl MemoryThreadRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadRepo for MemoryThreadRepo {
    async fn insert_thread(&self, thread: Thread) -> anyhow::Result<()> {
        match self.threads.entry(thread.id) {
            Entry::Occupied(existing) => anyhow::bail!("thread {} already exists", existing.key()),
            Entry::Vacant(slot) => {
                slot.insert(thread);
                Ok(())
            }
        }
    }

    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>> {
        Ok(self.threads.get(&id).map(|t| t.value().clone()))
    }

    async fn list_recent(
        &self,
        board: &str,
        thread_limit: usize,
        reply_limit: usize,
    ) -> anyhow::Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self
            .threads
            .iter()
            .filter(|entry| entry.board == board)
            .map(|entry| entry.value().clone())
            .collect();

        sort_by_bump(&mut threads);
        threads.truncate(thread_limit);

        Ok(threads
            .into_iter()
            .map(|t| t.with_recent_replies(reply_limit))
            .collect())
    }

    async fn set_thread_reported(
        &self,
        id: Uuid,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        Ok(match self.threads.get_mut(&id) {
            Some(mut thread) => {
                thread.reported = true;
                thread.touch(bumped_on);
                true
            }
            None => false,
        })
    }

    async fn thread_password_hash(&self, id: Uuid) -> anyhow::Result<Option<String>> {
        Ok(self
            .threads
            .get(&id)
            .map(|t| t.delete_password_hash.clone()))
    }

    async fn delete_thread(&self, id: Uuid, expected_hash: &str) -> anyhow::Result<bool> {
        Ok(self
            .threads
            .remove_if(&id, |_, t| t.delete_password_hash == expected_hash)
            .is_some())
    }

    async fn push_reply(
        &self,
        thread_id: Uuid,
        reply: Reply,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<Option<Thread>> {
        Ok(self.threads.get_mut(&thread_id).map(|mut thread| {
            thread.accept_reply(reply, bumped_on);
            thread.value().clone()
        }))
    }

    async fn set_reply_reported(&self, thread_id: Uuid, reply_id: Uuid) -> anyhow::Result<bool> {
        let Some(mut thread) = self.threads.get_mut(&thread_id) else {
            return Ok(false);
        };
        Ok(match thread.reply_mut(reply_id) {
            Some(reply) => {
                reply.reported = true;
                true
            }
            None => false,
        })
    }

    async fn reply_password_hash(
        &self,
        thread_id: Uuid,
        reply_id: Uuid,
    ) -> anyhow::Result<Option<String>> {
        Ok(self.threads.get(&thread_id).and_then(|thread| {
            thread
                .reply(reply_id)
                .map(|r| r.delete_password_hash.clone())
        }))
    }

    async fn redact_reply(
        &self,
        thread_id: Uuid,
        reply_id: Uuid,
        expected_hash: &str,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let Some(mut thread) = self.threads.get_mut(&thread_id) else {
            return Ok(false);
        };
        match thread.reply_mut(reply_id) {
            Some(reply) if reply.delete_password_hash == expected_hash => reply.redact(),
            _ => return Ok(false),
        }
        thread.touch(bumped_on);
        Ok(true)
    }

    async fn close(&self) {
        tracing::debug!(threads = self.threads.len(), "dropping in-memory threads");
        self.threads.clear();
    }
}
