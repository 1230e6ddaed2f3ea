//! Fixtures shared by the integration suites: the services wired to each
//! storage adapter and a cheap Argon2 hasher.

use std::sync::Arc;

use secrecy::SecretString;
use tb_auth_argon2::Argon2Hasher;
use tb_core::{ReplyEngine, SecretHasher, ThreadRepo, ThreadStore};
use tb_db_memory::MemoryThreadRepo;
use tb_db_sqlite::SqliteThreadRepo;

#[derive(Debug, Clone, Copy)]
pub enum Backend {
    Memory,
    Sqlite,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

    pub async fn repo(self) -> anyhow::Result<Arc<dyn ThreadRepo>> {
        Ok(match self {
            Backend::Memory => Arc::new(MemoryThreadRepo::new()),
            Backend::Sqlite => Arc::new(SqliteThreadRepo::connect("sqlite::memory:").await?),
        })
    }
}

pub struct Board {
    pub threads: ThreadStore,
    pub replies: ReplyEngine,
    pub repo: Arc<dyn ThreadRepo>,
}

impl Board {
    pub async fn on(backend: Backend) -> anyhow::Result<Self> {
        let repo = backend.repo().await?;
        let threads = ThreadStore::new(Arc::clone(&repo), cheap_hasher()?);
        let replies = ReplyEngine::new(threads.clone());
        Ok(Self {
            threads,
            replies,
            repo,
        })
    }
}

/// Real Argon2id at the lowest cost the algorithm allows.
pub fn cheap_hasher() -> anyhow::Result<Arc<dyn SecretHasher>> {
    Ok(Arc::new(Argon2Hasher::with_cost(8, 1, 1)?))
}

pub fn secret(s: &str) -> SecretString {
    SecretString::from(s)
}
