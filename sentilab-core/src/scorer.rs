//! Sentiment scorer seam with a persistent score cache.
//!
//! Scoring a text is expensive (an LLM call upstream), so results are
//! cached by a fingerprint of the text and the strategy that scored
//! it. A cache hit returns the stored pair unchanged; a miss computes
//! once and persists. The registry hands out one scorer per strategy
//! name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error("scoring failed: {0}")]
    Upstream(String),

    #[error("cache io error on {path}: {source}")]
    CacheIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cache is not valid json: {0}")]
    CacheFormat(#[from] serde_json::Error),
}

/// Scores one text, returning the score and a short reason.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> Result<(f64, String), ScorerError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct CachedScore {
    score: f64,
    reason: String,
}

/// File-backed score cache keyed by `blake3(text | strategy_name)`.
///
/// The map lives behind one mutex which is held across a miss, so a
/// given fingerprint is computed at most once even under concurrent
/// callers.
pub struct ScoreCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, CachedScore>>,
}

impl ScoreCache {
    /// Open a cache file, loading existing entries if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ScorerError> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| ScorerError::CacheIo {
                path: path.display().to_string(),
                source: e,
            })?;
            serde_json::from_str(&raw)?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn fingerprint(text: &str, strategy_name: &str) -> String {
        blake3::hash(format!("{text}|{strategy_name}").as_bytes())
            .to_hex()
            .to_string()
    }

    /// Return the cached pair, or score and persist on a miss.
    pub fn lookup_or_score(
        &self,
        scorer: &dyn SentimentScorer,
        text: &str,
        strategy_name: &str,
    ) -> Result<(f64, String), ScorerError> {
        let key = Self::fingerprint(text, strategy_name);
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(hit) = entries.get(&key) {
            return Ok((hit.score, hit.reason.clone()));
        }

        let (score, reason) = scorer.score(text)?;
        entries.insert(
            key,
            CachedScore {
                score,
                reason: reason.clone(),
            },
        );
        self.persist(&entries)?;
        Ok((score, reason))
    }

    fn persist(&self, entries: &HashMap<String, CachedScore>) -> Result<(), ScorerError> {
        let json = serde_json::to_string(entries)?;
        std::fs::write(&self.path, json).map_err(|e| ScorerError::CacheIo {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

/// One scorer instance per strategy name, created lazily.
#[derive(Default)]
pub struct ScorerRegistry {
    inner: Mutex<HashMap<String, Arc<dyn SentimentScorer>>>,
}

impl ScorerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the scorer for `name`, creating it on first use.
    pub fn lookup_or_create<F>(&self, name: &str, create: F) -> Arc<dyn SentimentScorer>
    where
        F: FnOnce() -> Arc<dyn SentimentScorer>,
    {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.entry(name.to_string()).or_insert_with(create).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingScorer {
        calls: AtomicUsize,
    }

    impl CountingScorer {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SentimentScorer for CountingScorer {
        fn score(&self, text: &str) -> Result<(f64, String), ScorerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((text.len() as f64 / 100.0, "length heuristic".into()))
        }
    }

    #[test]
    fn hit_returns_stored_pair_without_rescoring() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ScoreCache::open(dir.path().join("scores.json")).unwrap();
        let scorer = CountingScorer::new();

        let first = cache
            .lookup_or_score(&scorer, "rates cut again", "headline-v1")
            .unwrap();
        let second = cache
            .lookup_or_score(&scorer, "rates cut again", "headline-v1")
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn strategy_name_is_part_of_the_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ScoreCache::open(dir.path().join("scores.json")).unwrap();
        let scorer = CountingScorer::new();

        cache
            .lookup_or_score(&scorer, "same text", "strategy-a")
            .unwrap();
        cache
            .lookup_or_score(&scorer, "same text", "strategy-b")
            .unwrap();

        assert_eq!(scorer.calls.load(Ordering::SeqCst), 2);
        assert_ne!(
            ScoreCache::fingerprint("same text", "strategy-a"),
            ScoreCache::fingerprint("same text", "strategy-b"),
        );
    }

    #[test]
    fn cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.json");
        let scorer = CountingScorer::new();

        {
            let cache = ScoreCache::open(&path).unwrap();
            cache
                .lookup_or_score(&scorer, "persisted", "headline-v1")
                .unwrap();
        }

        let cache = ScoreCache::open(&path).unwrap();
        cache
            .lookup_or_score(&scorer, "persisted", "headline-v1")
            .unwrap();
        assert_eq!(scorer.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_returns_same_instance_per_name() {
        let registry = ScorerRegistry::new();
        let a = registry.lookup_or_create("headline-v1", || Arc::new(CountingScorer::new()));
        let b = registry.lookup_or_create("headline-v1", || Arc::new(CountingScorer::new()));
        assert!(Arc::ptr_eq(&a, &b));
    }
}
