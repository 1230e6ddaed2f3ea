//! # tb-db-sqlite Implementation
//!
//! This module implements the mapping between the SQLite relational model and
//! the `tb-core` thread documents: one `threads` row per document, nested
//! replies in `replies` keyed by `thread_id`.
//!
//! Timestamps are stored as unix microseconds so ordering is plain integer
//! comparison.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection};
use tb_core::models::{Reply, Thread, REDACTED_TEXT};
use tb_core::traits::ThreadRepo;
use uuid::Uuid;

pub struct SqliteThreadRepo {
    pool: SqlitePool,
}

impl SqliteThreadRepo {
    /// Opens (creating if needed) the database at `url` and brings the schema
    /// up to date. `sqlite::memory:` gives a private database that lives as
    /// long as this repo.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let in_memory = url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(url)
            .context("invalid sqlite database url")?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // An in-memory database exists per connection: keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running sqlite migrations")?;

        tracing::info!(in_memory, "sqlite thread store ready");
        Ok(Self { pool })
    }
}

#[derive(FromRow)]
struct ThreadRow {
    id: Uuid,
    board: String,
    text: String,
    delete_password_hash: String,
    reported: bool,
    reply_count: i64,
    created_on: i64,
    bumped_on: i64,
}

#[derive(FromRow)]
struct ReplyRow {
    id: Uuid,
    text: String,
    delete_password_hash: String,
    reported: bool,
    created_on: i64,
}

impl ThreadRow {
    fn into_thread(self, replies: Vec<Reply>) -> anyhow::Result<Thread> {
        Ok(Thread {
            id: self.id,
            board: self.board,
            text: self.text,
            delete_password_hash: self.delete_password_hash,
            reported: self.reported,
            reply_count: self.reply_count,
            replies,
            created_on: from_micros(self.created_on)?,
            bumped_on: from_micros(self.bumped_on)?,
        })
    }
}

impl TryFrom<ReplyRow> for Reply {
    type Error = anyhow::Error;

    fn try_from(row: ReplyRow) -> anyhow::Result<Self> {
        Ok(Reply {
            id: row.id,
            text: row.text,
            delete_password_hash: row.delete_password_hash,
            reported: row.reported,
            created_on: from_micros(row.created_on)?,
        })
    }
}

fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

fn from_micros(micros: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .with_context(|| format!("stored timestamp out of range: {micros}"))
}

/// Newest-first replies of a thread; equal timestamps keep insertion order.
/// A `None` limit returns all of them.
async fn fetch_replies(
    conn: &mut SqliteConnection,
    thread_id: Uuid,
    limit: Option<usize>,
) -> anyhow::Result<Vec<Reply>> {
    // SQLite treats a negative LIMIT as "no limit".
    let limit = match limit {
        Some(n) => i64::try_from(n)?,
        None => -1,
    };
    let rows: Vec<ReplyRow> = sqlx::query_as(
        "SELECT id, text, delete_password_hash, reported, created_on FROM replies \
         WHERE thread_id = ? ORDER BY created_on DESC, seq ASC LIMIT ?",
    )
    .bind(thread_id)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Reply::try_from).collect()
}

async fn load_thread(conn: &mut SqliteConnection, id: Uuid) -> anyhow::Result<Option<Thread>> {
    let row: Option<ThreadRow> = sqlx::query_as(
        "SELECT id, board, text, delete_password_hash, reported, reply_count, created_on, bumped_on \
         FROM threads WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let replies = fetch_replies(conn, id, None).await?;
            Ok(Some(row.into_thread(replies)?))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl ThreadRepo for SqliteThreadRepo {
    async fn insert_thread(&self, thread: Thread) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO threads (id, board, text, delete_password_hash, reported, reply_count, created_on, bumped_on) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(thread.id)
        .bind(&thread.board)
        .bind(&thread.text)
        .bind(&thread.delete_password_hash)
        .bind(thread.reported)
        .bind(thread.reply_count)
        .bind(to_micros(thread.created_on))
        .bind(to_micros(thread.bumped_on))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_thread(&self, id: Uuid) -> anyhow::Result<Option<Thread>> {
        let mut conn = self.pool.acquire().await?;
        load_thread(&mut conn, id).await
    }

    async fn list_recent(
        &self,
        board: &str,
        thread_limit: usize,
        reply_limit: usize,
    ) -> anyhow::Result<Vec<Thread>> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<ThreadRow> = sqlx::query_as(
            "SELECT id, board, text, delete_password_hash, reported, reply_count, created_on, bumped_on \
             FROM threads WHERE board = ? ORDER BY bumped_on DESC, created_on DESC LIMIT ?",
        )
        .bind(board)
        .bind(i64::try_from(thread_limit)?)
        .fetch_all(&mut *conn)
        .await?;

        let mut threads = Vec::with_capacity(rows.len());
        for row in rows {
            let replies = fetch_replies(&mut conn, row.id, Some(reply_limit)).await?;
            threads.push(row.into_thread(replies)?);
        }
        Ok(threads)
    }

    async fn set_thread_reported(
        &self,
        id: Uuid,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE threads SET reported = 1, bumped_on = MAX(bumped_on + 1, ?) WHERE id = ?",
        )
        .bind(to_micros(bumped_on))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn thread_password_hash(&self, id: Uuid) -> anyhow::Result<Option<String>> {
        let hash = sqlx::query_scalar("SELECT delete_password_hash FROM threads WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    /// Replies go with the thread through `ON DELETE CASCADE`.
    async fn delete_thread(&self, id: Uuid, expected_hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM threads WHERE id = ? AND delete_password_hash = ?")
            .bind(id)
            .bind(expected_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count, bump and insert commit together. The UPDATE comes first so the
    /// transaction takes the write lock before anything else.
    async fn push_reply(
        &self,
        thread_id: Uuid,
        reply: Reply,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<Option<Thread>> {
        let mut tx = self.pool.begin().await?;

        let bumped = sqlx::query(
            "UPDATE threads SET reply_count = reply_count + 1, bumped_on = MAX(bumped_on + 1, ?) \
             WHERE id = ?",
        )
        .bind(to_micros(bumped_on))
        .bind(thread_id)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query(
            "INSERT INTO replies (id, thread_id, text, delete_password_hash, reported, created_on) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(reply.id)
        .bind(thread_id)
        .bind(&reply.text)
        .bind(&reply.delete_password_hash)
        .bind(reply.reported)
        .bind(to_micros(reply.created_on))
        .execute(&mut *tx)
        .await?;

        let thread = load_thread(&mut tx, thread_id).await?;
        tx.commit().await?;
        Ok(thread)
    }

    async fn set_reply_reported(&self, thread_id: Uuid, reply_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE replies SET reported = 1 WHERE thread_id = ? AND id = ?")
            .bind(thread_id)
            .bind(reply_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn reply_password_hash(
        &self,
        thread_id: Uuid,
        reply_id: Uuid,
    ) -> anyhow::Result<Option<String>> {
        let hash = sqlx::query_scalar(
            "SELECT delete_password_hash FROM replies WHERE thread_id = ? AND id = ?",
        )
        .bind(thread_id)
        .bind(reply_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(hash)
    }

    async fn redact_reply(
        &self,
        thread_id: Uuid,
        reply_id: Uuid,
        expected_hash: &str,
        bumped_on: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let redacted = sqlx::query(
            "UPDATE replies SET text = ? WHERE thread_id = ? AND id = ? AND delete_password_hash = ?",
        )
        .bind(REDACTED_TEXT)
        .bind(thread_id)
        .bind(reply_id)
        .bind(expected_hash)
        .execute(&mut *tx)
        .await?;

        if redacted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("UPDATE threads SET bumped_on = MAX(bumped_on + 1, ?) WHERE id = ?")
            .bind(to_micros(bumped_on))
            .bind(thread_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("sqlite thread store closed");
    }
}
