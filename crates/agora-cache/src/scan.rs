//! Cursor-draining pattern scans.
//!
//! A Redis `SCAN` returns an arbitrary slice of the keyspace per call and may
//! return empty pages before it is done; only a returned cursor of `0` means
//! the walk is complete. [`KeyScan`] keeps calling until that happens.

use crate::store::CacheStore;
use crate::{CacheError, CacheResult};
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::BTreeSet;
use tracing::trace;

/// Default number of keys examined per scan call.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A resumable walk over every key matching one pattern.
pub struct KeyScan<'a> {
    store: &'a dyn CacheStore,
    pattern: String,
    batch_size: usize,
    cursor: u64,
    finished: bool,
    scanned: usize,
}

impl<'a> KeyScan<'a> {
    /// Starts a scan of `pattern`.
    #[must_use]
    pub fn new(store: &'a dyn CacheStore, pattern: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            batch_size: batch_size.max(1),
            cursor: 0,
            finished: false,
            scanned: 0,
        }
    }

    /// Returns the pattern being scanned.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true once the cursor has come back to zero.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of matching keys returned so far.
    #[must_use]
    pub const fn scanned(&self) -> usize {
        self.scanned
    }

    /// Fetches the next page of matching keys.
    ///
    /// Returns `Ok(None)` once the scan is complete. A page may be empty while
    /// the scan is still in progress. On error the cursor is left where it
    /// was, so calling again resumes from the failed page.
    pub async fn next_batch(&mut self) -> CacheResult<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }

        let page = self
            .store
            .scan_page(&self.pattern, self.cursor, self.batch_size)
            .await
            .map_err(|e| CacheError::ScanIncomplete {
                pattern: self.pattern.clone(),
                scanned: self.scanned,
                reason: e.to_string(),
            })?;

        trace!(
            pattern = %self.pattern,
            cursor = page.cursor,
            matched = page.keys.len(),
            "Scan page"
        );

        self.cursor = page.cursor;
        self.scanned += page.keys.len();
        if self.cursor == 0 {
            self.finished = true;
        }

        Ok(Some(page.keys))
    }

    /// Collects every remaining key into `keys`.
    ///
    /// Keys found before a failure stay in `keys`, so the caller can still
    /// act on a partial result.
    pub async fn drain_into(&mut self, keys: &mut BTreeSet<String>) -> CacheResult<()> {
        while let Some(batch) = self.next_batch().await? {
            keys.extend(batch);
        }
        Ok(())
    }

    /// Collects every remaining key.
    pub async fn drain(mut self) -> CacheResult<BTreeSet<String>> {
        let mut keys = BTreeSet::new();
        self.drain_into(&mut keys).await?;
        Ok(keys)
    }

    /// Starts the walk over from cursor zero.
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.finished = false;
        self.scanned = 0;
    }

    /// Turns the scan into a stream of matching keys.
    ///
    /// A key can appear more than once if the keyspace is resized mid-walk.
    pub fn into_stream(self) -> impl Stream<Item = CacheResult<String>> + 'a {
        stream::try_unfold(self, |mut scan| async move {
            match scan.next_batch().await? {
                Some(batch) => {
                    let keys = stream::iter(batch.into_iter().map(Ok::<String, CacheError>));
                    Ok::<_, CacheError>(Some((keys, scan)))
                }
                None => Ok(None),
            }
        })
        .try_flatten()
    }
}
