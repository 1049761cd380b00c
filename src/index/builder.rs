use crate::crawler::count_tokens;
use crate::storage::{IndexEntry, Storage, StorageError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type Postings = HashMap<String, HashMap<String, u64>>;

/// In-memory reverse index for one session
///
/// Merges are additive per (word, url) and serialized through a single
/// mutex, so concurrent merges from different workers produce the same
/// state as applying them one after another in any order. Token counting
/// happens before the lock is taken.
#[derive(Default)]
pub struct IndexBuilder {
    postings: Mutex<Postings>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Postings> {
        self.postings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Merges one page's tokens: `index[word][url] += count`
    pub fn merge_page<S: AsRef<str>>(&self, url: &str, tokens: &[S]) {
        let counts = count_tokens(tokens);
        if counts.is_empty() {
            return;
        }

        let mut postings = self.lock();
        for (word, count) in counts {
            *postings
                .entry(word)
                .or_default()
                .entry(url.to_string())
                .or_insert(0) += count;
        }
    }

    /// Frequency of `word` on `url` not yet flushed
    pub fn frequency(&self, word: &str, url: &str) -> u64 {
        self.lock()
            .get(word)
            .and_then(|urls| urls.get(url))
            .copied()
            .unwrap_or(0)
    }

    /// Number of unflushed (word, url) pairs
    pub fn len(&self) -> usize {
        self.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ordered copy of the unflushed state
    pub fn snapshot(&self) -> BTreeMap<String, BTreeMap<String, u64>> {
        self.lock()
            .iter()
            .map(|(word, urls)| {
                let urls = urls
                    .iter()
                    .map(|(url, freq)| (url.clone(), *freq))
                    .collect();
                (word.clone(), urls)
            })
            .collect()
    }

    /// Takes every unflushed triple, leaving the builder empty
    ///
    /// Entries are sorted so flushes are reproducible.
    pub fn drain(&self) -> Vec<IndexEntry> {
        let postings = std::mem::take(&mut *self.lock());

        let mut entries: Vec<IndexEntry> = postings
            .into_iter()
            .flat_map(|(word, urls)| {
                urls.into_iter().map(move |(url, frequency)| IndexEntry {
                    word: word.clone(),
                    url,
                    frequency,
                })
            })
            .collect();
        entries.sort();
        entries
    }

    /// Adds previously drained entries back
    fn restore(&self, entries: Vec<IndexEntry>) {
        let mut postings = self.lock();
        for entry in entries {
            *postings
                .entry(entry.word)
                .or_default()
                .entry(entry.url)
                .or_insert(0) += entry.frequency;
        }
    }

    /// Writes all unflushed triples to the store as additive upserts
    ///
    /// Flushed counts are removed from memory, so flushing twice never counts
    /// a token twice. On failure the drained counts are merged back and the
    /// error is returned.
    pub fn flush_to(&self, storage: &dyn Storage) -> Result<usize, StorageError> {
        let entries = self.drain();
        if entries.is_empty() {
            return Ok(0);
        }

        match storage.upsert_index_entries(&entries) {
            Ok(()) => {
                tracing::debug!("Flushed {} index entries", entries.len());
                Ok(entries.len())
            }
            Err(e) => {
                tracing::error!("Index flush of {} entries failed: {}", entries.len(), e);
                self.restore(entries);
                Err(e)
            }
        }
    }
}
