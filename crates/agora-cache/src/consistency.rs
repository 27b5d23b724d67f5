//! Write-path ordering.
//!
//! The database write always commits first and invalidation follows. Reversing
//! the order lets a concurrent reader repopulate the cache with the old row
//! between the delete and the commit. Invalidation failure never rolls the
//! write back; the affected entries stay stale for at most their TTL.

use crate::invalidation::{InvalidationEngine, InvalidationReport, Mutation};
use std::future::Future;
use tracing::warn;

/// A committed write together with the outcome of its invalidation.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub invalidation: InvalidationReport,
}

impl<T> Committed<T> {
    /// Returns the write's output, discarding the invalidation report.
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Awaits `write`, then invalidates the cache for the mutation `describe`
/// derives from its output.
///
/// A failed write is returned untouched and the cache is not consulted.
pub async fn commit_then_invalidate<T, E, W, D>(
    engine: &InvalidationEngine,
    write: W,
    describe: D,
) -> Result<Committed<T>, E>
where
    W: Future<Output = Result<T, E>>,
    D: FnOnce(&T) -> Mutation,
{
    let value = write.await?;
    let mutation = describe(&value);
    let invalidation = engine.apply(&mutation).await;

    if !invalidation.is_clean() {
        warn!(
            mutation = %invalidation.kind,
            id = %mutation.id(),
            errors = ?invalidation.errors,
            "Write committed but invalidation was incomplete"
        );
    }

    Ok(Committed { value, invalidation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeySpace;
    use crate::store::{CacheStore, MemoryCacheStore};
    use crate::TtlPolicy;
    use agora_core::ContentId;
    use std::sync::Arc;
    use std::time::Duration;

    fn engine(store: Arc<MemoryCacheStore>) -> InvalidationEngine {
        InvalidationEngine::new(store, KeySpace::new("post"), TtlPolicy::default())
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let store = Arc::new(MemoryCacheStore::new());
        store
            .set_with_ttl("post:list:page:1:10", "{}", Duration::from_secs(60))
            .await
            .unwrap();

        let result = commit_then_invalidate(
            &engine(store.clone()),
            async { Err::<u64, _>("constraint violation") },
            |id| Mutation::Delete {
                id: ContentId::new(*id),
                author_id: None,
            },
        )
        .await;

        assert_eq!(result.unwrap_err(), "constraint violation");
        assert!(store.contains("post:list:page:1:10"));
        assert_eq!(store.pipelines_executed(), 0);
    }

    #[tokio::test]
    async fn test_committed_write_invalidates() {
        let store = Arc::new(MemoryCacheStore::new());
        store
            .set_with_ttl("post:list:page:1:10", "{}", Duration::from_secs(60))
            .await
            .unwrap();

        let committed = commit_then_invalidate(
            &engine(store.clone()),
            async { Ok::<_, String>(42_u64) },
            |id| Mutation::Delete {
                id: ContentId::new(*id),
                author_id: None,
            },
        )
        .await
        .unwrap();

        assert!(committed.invalidation.is_clean());
        assert_eq!(committed.into_inner(), 42);
        assert!(!store.contains("post:list:page:1:10"));
    }

    #[tokio::test]
    async fn test_invalidation_failure_does_not_fail_the_write() {
        let store = Arc::new(MemoryCacheStore::new());
        store.set_unavailable(true);

        let committed = commit_then_invalidate(
            &engine(store.clone()),
            async { Ok::<_, String>(7_u64) },
            |id| Mutation::Delete {
                id: ContentId::new(*id),
                author_id: None,
            },
        )
        .await
        .unwrap();

        assert!(!committed.invalidation.is_clean());
        assert_eq!(committed.value, 7);
    }
}
