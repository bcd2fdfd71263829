//! Namespaced knowledge snippets with similarity search
//!
//! The index lives in its own SQLite file so it can be thrown away and rebuilt
//! from seed data without touching subjects or analysis records.

use crate::db::connect;
use crate::embedding::{cosine_similarity, Embedder, HashingEmbedder};
use crate::{seed, Error, KnowledgeItem, Metadata, Pillar, Result, ScoredItem};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How hard to try before giving up on the index file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RecoveryPolicy {
    /// Run `op` until it succeeds, at most `attempts` times
    ///
    /// Waits `backoff` between failures. After the last failure its error is
    /// reported as [`Error::Initialization`].
    pub async fn retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("{} failed (attempt {}/{}): {}", what, attempt, attempts, e);
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
            }
        }

        Err(Error::Initialization {
            attempts,
            message: last_error,
        })
    }
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Knowledge store handle; clones share the same index
#[derive(Clone)]
pub struct KnowledgeStore {
    inner: Arc<Inner>,
}

struct Inner {
    pool: SqlitePool,
    path: PathBuf,
    embedder: Arc<dyn Embedder>,
    /// Namespaces found empty at open and not yet refilled
    pending: Mutex<BTreeSet<Pillar>>,
}

impl KnowledgeStore {
    /// Open the index with the default embedder and recovery policy
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_recovery(
            path,
            RecoveryPolicy::default(),
            Arc::new(HashingEmbedder::default()),
        )
        .await
    }

    /// Open the index, deleting and recreating it when it cannot be used
    ///
    /// Each failed attempt removes the index files and waits `policy.backoff`
    /// before trying again. After `policy.attempts` failures the last error is
    /// reported as [`Error::Initialization`].
    pub async fn open_with_recovery<P: AsRef<Path>>(
        path: P,
        policy: RecoveryPolicy,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let path = crate::db::expand_path(path)?;
        let attempts = policy.attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match open_index(&path).await {
                Ok(pool) => {
                    info!("Knowledge index ready at: {}", path.display());
                    let store = Self {
                        inner: Arc::new(Inner {
                            pool,
                            path,
                            embedder,
                            pending: Mutex::new(BTreeSet::new()),
                        }),
                    };
                    store.mark_empty_namespaces().await?;
                    return Ok(store);
                }
                Err(e) => {
                    warn!(
                        "Knowledge index unusable (attempt {}/{}): {}",
                        attempt, attempts, e
                    );
                    last_error = e.to_string();
                    remove_index_files(&path);
                    if attempt < attempts {
                        tokio::time::sleep(policy.backoff).await;
                    }
                }
            }
        }

        Err(Error::Initialization {
            attempts,
            message: last_error,
        })
    }

    async fn mark_empty_namespaces(&self) -> Result<()> {
        let mut pending = self.inner.pending.lock().await;
        for pillar in Pillar::all() {
            if self.namespace_count(*pillar).await? == 0 {
                pending.insert(*pillar);
            }
        }

        if !pending.is_empty() {
            debug!("Namespaces awaiting refill: {:?}", pending);
        }
        Ok(())
    }

    /// Populate every pending namespace in the background
    pub fn spawn_refill(&self) -> JoinHandle<Result<()>> {
        let store = self.clone();
        tokio::spawn(async move { store.refill_pending().await })
    }

    /// Populate every pending namespace now
    pub async fn refill_pending(&self) -> Result<()> {
        let mut pending = self.inner.pending.lock().await;
        while let Some(pillar) = pending.first().copied() {
            self.seed_namespace(pillar).await?;
            pending.remove(&pillar);
        }
        Ok(())
    }

    /// Namespaces still waiting for their seed data
    pub async fn pending_namespaces(&self) -> Vec<Pillar> {
        self.inner.pending.lock().await.iter().copied().collect()
    }

    /// Make sure every namespace holds its seed data; returns items inserted
    pub async fn reseed(&self) -> Result<usize> {
        let mut pending = self.inner.pending.lock().await;
        let mut inserted = 0;
        for pillar in Pillar::all() {
            inserted += self.seed_namespace(*pillar).await?;
        }
        pending.clear();

        info!("Knowledge index reseeded ({} new items)", inserted);
        Ok(inserted)
    }

    /// [`reseed`](Self::reseed) under `policy`
    pub async fn reseed_with_retry(&self, policy: RecoveryPolicy) -> Result<usize> {
        policy
            .retry("Knowledge index reseed", move || self.reseed())
            .await
    }

    async fn seed_namespace(&self, pillar: Pillar) -> Result<usize> {
        let mut inserted = 0;
        for item in seed::knowledge_for(pillar) {
            if self.add(&item).await? {
                inserted += 1;
            }
        }
        debug!("Seeded {} items into {}", inserted, pillar);
        Ok(inserted)
    }

    /// Add one item; returns false when an identical item is already indexed
    pub async fn add(&self, item: &KnowledgeItem) -> Result<bool> {
        let key = item_key(item);
        let embedding = self.inner.embedder.embed(&item.content);

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO knowledge_items
                (item_key, namespace, content, metadata_json, embedding_json)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&key)
        .bind(item.namespace.as_str())
        .bind(&item.content)
        .bind(serde_json::to_string(&item.metadata)?)
        .bind(serde_json::to_string(&embedding)?)
        .execute(&self.inner.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Up to `k` items of `namespace`, most similar to `text` first
    pub async fn query(
        &self,
        namespace: Pillar,
        text: &str,
        k: usize,
    ) -> Result<Vec<KnowledgeItem>> {
        Ok(self
            .query_scored(namespace, text, k)
            .await?
            .into_iter()
            .map(|scored| scored.item)
            .collect())
    }

    /// Like [`query`](Self::query) but keeps the cosine similarity of each hit
    pub async fn query_scored(
        &self,
        namespace: Pillar,
        text: &str,
        k: usize,
    ) -> Result<Vec<ScoredItem>> {
        self.ensure_ready(namespace).await?;

        if k == 0 {
            return Ok(Vec::new());
        }

        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT content, metadata_json, embedding_json
            FROM knowledge_items
            WHERE namespace = ?
            ORDER BY seq
            "#,
        )
        .bind(namespace.as_str())
        .fetch_all(&self.inner.pool)
        .await?;

        let target = self.inner.embedder.embed(text);
        let mut scored = rows
            .into_iter()
            .map(|(content, metadata_json, embedding_json)| {
                let metadata: Metadata = serde_json::from_str(&metadata_json)?;
                let embedding: Vec<f32> = serde_json::from_str(&embedding_json)?;
                Ok(ScoredItem {
                    score: cosine_similarity(&target, &embedding),
                    item: KnowledgeItem::new(namespace, content, metadata),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);

        debug!(
            "Knowledge query in {} returned {} items",
            namespace,
            scored.len()
        );
        Ok(scored)
    }

    async fn ensure_ready(&self, namespace: Pillar) -> Result<()> {
        let mut pending = self.inner.pending.lock().await;
        if pending.contains(&namespace) {
            self.seed_namespace(namespace).await?;
            pending.remove(&namespace);
        }
        Ok(())
    }

    /// Number of items in one namespace
    pub async fn namespace_count(&self, namespace: Pillar) -> Result<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM knowledge_items WHERE namespace = ?")
                .bind(namespace.as_str())
                .fetch_one(&self.inner.pool)
                .await?;

        Ok(count.max(0) as u64)
    }

    /// Index file location
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Close the index connection
    pub async fn close(&self) {
        self.inner.pool.close().await;
    }
}

async fn open_index(path: &Path) -> Result<SqlitePool> {
    let pool = connect(path).await?;

    let (status,): (String,) = sqlx::query_as("PRAGMA integrity_check")
        .fetch_one(&pool)
        .await?;
    if status != "ok" {
        pool.close().await;
        return Err(Error::Other(format!("integrity check failed: {}", status)));
    }

    if let Err(e) = sqlx::migrate!("./knowledge-migrations").run(&pool).await {
        pool.close().await;
        return Err(Error::Migration(e.to_string()));
    }

    Ok(pool)
}

fn remove_index_files(path: &Path) {
    let mut wal = path.as_os_str().to_owned();
    wal.push("-wal");
    let mut shm = path.as_os_str().to_owned();
    shm.push("-shm");

    for file in [path.to_path_buf(), PathBuf::from(wal), PathBuf::from(shm)] {
        match std::fs::remove_file(&file) {
            Ok(()) => debug!("Removed {}", file.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Could not remove {}: {}", file.display(), e),
        }
    }
}

fn item_key(item: &KnowledgeItem) -> String {
    let mut hasher = Sha256::new();
    hasher.update(item.namespace.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(item.content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fast_policy(attempts: u32) -> RecoveryPolicy {
        RecoveryPolicy {
            attempts,
            backoff: Duration::from_millis(10),
        }
    }

    async fn open_in(dir: &TempDir) -> KnowledgeStore {
        KnowledgeStore::open_with_recovery(
            dir.path().join("knowledge.db"),
            fast_policy(3),
            Arc::new(HashingEmbedder::default()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_query_returns_at_most_k_most_similar_first() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        store.reseed().await.unwrap();

        let hits = store
            .query_scored(Pillar::Cfc, "hackathon team projects", 3)
            .await
            .unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(hits[0].item.content.contains("hackathon"));

        let two = store.query(Pillar::Sri, "anything", 5).await.unwrap();
        assert_eq!(two.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_namespace_yields_empty_result() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        // Drop pending state without seeding anything
        store.inner.pending.lock().await.clear();

        let hits = store.query(Pillar::Scd, "LeetCode", 3).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_pending_namespace_is_filled_on_first_query() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        assert_eq!(store.pending_namespaces().await.len(), Pillar::all().len());

        let hits = store.query(Pillar::Scd, "LeetCode practice", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].content.contains("LeetCode"));
        assert!(!store.pending_namespaces().await.contains(&Pillar::Scd));

        store.spawn_refill().await.unwrap().unwrap();
        assert!(store.pending_namespaces().await.is_empty());
        for pillar in Pillar::all() {
            assert_eq!(
                store.namespace_count(*pillar).await.unwrap() as usize,
                seed::knowledge_for(*pillar).len()
            );
        }
    }

    #[tokio::test]
    async fn test_reseed_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        let first = store.reseed().await.unwrap();
        let second = store.reseed().await.unwrap();
        assert!(first > 0);
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn test_retry_recovers_after_transient_failure() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let counter = &calls;

        let value = fast_policy(3)
            .retry("flaky", move || async move {
                if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                    Err(Error::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(42)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reseed_gives_up_after_configured_attempts() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        sqlx::query("DROP TABLE knowledge_items")
            .execute(&store.inner.pool)
            .await
            .unwrap();

        let err = store
            .reseed_with_retry(fast_policy(2))
            .await
            .err()
            .unwrap();

        match err {
            Error::Initialization { attempts, message } => {
                assert_eq!(attempts, 2);
                assert!(message.contains("no such table"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_reseed_with_retry_seeds_every_namespace() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        let inserted = store.reseed_with_retry(fast_policy(3)).await.unwrap();
        assert!(inserted > 0);
        assert!(store.pending_namespaces().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupted_index_is_rebuilt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("knowledge.db");
        std::fs::write(&path, vec![0xAB; 8192]).unwrap();

        let store = KnowledgeStore::open_with_recovery(
            &path,
            fast_policy(3),
            Arc::new(HashingEmbedder::default()),
        )
        .await
        .unwrap();

        store.reseed().await.unwrap();
        assert!(store.namespace_count(Pillar::Clt).await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_gives_up_after_configured_attempts() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let err = KnowledgeStore::open_with_recovery(
            blocker.join("knowledge.db"),
            fast_policy(2),
            Arc::new(HashingEmbedder::default()),
        )
        .await
        .err()
        .unwrap();

        assert!(matches!(err, Error::Initialization { attempts: 2, .. }));
    }
}
