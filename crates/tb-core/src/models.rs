//! # Domain Models
//!
//! A board is only a grouping key; the persisted unit is the Thread document
//! with its replies nested inside it.
//! UUID v7 keeps identifiers time-ordered, like the timestamps next to them.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placeholder that replaces the text of a redacted reply.
pub const REDACTED_TEXT: &str = "[deleted]";

/// How many threads a board listing shows.
pub const RECENT_THREAD_LIMIT: usize = 10;

/// How many replies each thread carries in a board listing.
pub const RECENT_REPLY_LIMIT: usize = 3;

/// A thread posted on a board, together with every reply it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub board: String,
    pub text: String,
    /// PHC-encoded hash of the thread's delete password. Never rendered.
    #[serde(skip_serializing, default)]
    pub delete_password_hash: String,
    pub reported: bool,
    /// Replies ever accepted. Redaction does not decrement it.
    pub reply_count: i64,
    /// Most recent first.
    pub replies: Vec<Reply>,
    pub created_on: DateTime<Utc>,
    /// Sort key for board listings; moves forward on every reply, thread
    /// report and reply redaction.
    pub bumped_on: DateTime<Utc>,
}

/// A reply nested in a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: Uuid,
    pub text: String,
    #[serde(skip_serializing, default)]
    pub delete_password_hash: String,
    pub reported: bool,
    pub created_on: DateTime<Utc>,
}

impl Thread {
    pub fn new(board: &str, text: &str, delete_password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            board: board.to_string(),
            text: text.to_string(),
            delete_password_hash,
            reported: false,
            reply_count: 0,
            replies: Vec::new(),
            created_on: now,
            bumped_on: now,
        }
    }

    /// Accepts a reply into the document: counts it, inserts it keeping the
    /// sequence newest-first (stable, so equal timestamps keep insertion order)
    /// and bumps the thread.
    ///
    /// Adapters that keep whole documents in memory call this under their
    /// per-document lock; SQL adapters express the same update in statements.
    pub fn accept_reply(&mut self, reply: Reply, now: DateTime<Utc>) {
        self.reply_count += 1;
        self.replies.push(reply);
        self.replies.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        self.touch(now);
    }

    /// Records a mutation of the document at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.bumped_on = next_bump(self.bumped_on, now);
    }

    pub fn reply(&self, reply_id: Uuid) -> Option<&Reply> {
        self.replies.iter().find(|r| r.id == reply_id)
    }

    pub fn reply_mut(&mut self, reply_id: Uuid) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|r| r.id == reply_id)
    }

    /// The listing view of this thread: only the newest `limit` replies.
    pub fn with_recent_replies(mut self, limit: usize) -> Self {
        self.replies.truncate(limit);
        self
    }
}

impl Reply {
    pub fn new(text: &str, delete_password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            text: text.to_string(),
            delete_password_hash,
            reported: false,
            created_on: now,
        }
    }

    pub fn redact(&mut self) {
        self.text = REDACTED_TEXT.to_string();
    }
}

/// Current time at the precision every store keeps: microseconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// The bump timestamp to store when a thread is touched at `now`.
/// Never earlier than, and never equal to, the previous bump.
pub fn next_bump(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    now.max(floor)
}

/// Orders threads the way board listings show them: latest bump first.
pub fn sort_by_bump(threads: &mut [Thread]) {
    threads.sort_by(|a, b| {
        b.bumped_on
            .cmp(&a.bumped_on)
            .then_with(|| b.created_on.cmp(&a.created_on))
    });
}
