//! Shared section cache.
//!
//! A section list is a pure function of the series, its source data version,
//! `half_window`, `tau` and the build settings (variance convention, section
//! policy and cleaning policy). All of them are part of [`SectionKey`], so
//! one cache can be shared by extractors with different configurations and
//! reused across experiments that re-extract the same series. The cache is
//! `Send + Sync`: a read-mostly `RwLock` around an `AHashMap`, with atomic
//! hit/miss counters.
//!
//! Entries are only inserted on successful builds. Insufficient-data
//! failures are never cached; degenerate scales are cached (their short
//! section list is still a valid result).

use crate::config::{ExtractorConfig, ScaleSpec};
use crate::error::Result;
use crate::preprocessing::{CleaningPolicy, VarianceConvention};
use crate::sections::{Section, SectionPolicy};
use crate::series::SeriesId;
use ahash::AHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration that shapes a section list besides `half_window` and `tau`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SectionSettings {
    pub variance: VarianceConvention,
    pub policy: SectionPolicy,
    pub cleaning: CleaningPolicy,
}

impl SectionSettings {
    /// Settings `config` applies to `scale`, per-scale overrides included.
    pub fn for_scale(config: &ExtractorConfig, scale: &ScaleSpec) -> Self {
        Self {
            variance: config.variance_for(scale),
            policy: config.section_policy(),
            cleaning: config.cleaning_policy(),
        }
    }
}

/// Cache key for one section list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionKey {
    pub series_id: SeriesId,
    pub half_window: usize,
    tau_bits: u64,
    pub version: u64,
    pub settings: SectionSettings,
}

impl SectionKey {
    /// Key under default settings; see [`SectionKey::with_settings`].
    pub fn new(series_id: SeriesId, half_window: usize, tau: f64, version: u64) -> Self {
        Self {
            series_id,
            half_window,
            tau_bits: tau.to_bits(),
            version,
            settings: SectionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SectionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn tau(&self) -> f64 {
        f64::from_bits(self.tau_bits)
    }
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe section cache.
#[derive(Debug, Default)]
pub struct SectionCache {
    entries: RwLock<AHashMap<SectionKey, Arc<Vec<Section>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SectionKey) -> Option<Arc<Vec<Section>>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    /// Return the cached list for `key`, building and inserting it on a miss.
    ///
    /// `build` runs without holding the lock, so two threads missing on the
    /// same key may both build; the first insert wins.
    pub fn get_or_build<F>(&self, key: SectionKey, build: F) -> Result<Arc<Vec<Section>>>
    where
        F: FnOnce() -> Result<Vec<Section>>,
    {
        if let Some(sections) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(sections);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let built = Arc::new(build()?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key).or_insert(built)))
    }

    /// Drop every entry of `series_id`. Returns the number removed.
    pub fn invalidate_series(&self, series_id: &SeriesId) -> usize {
        self.remove_where(|key| &key.series_id == series_id)
    }

    /// Drop the entries of `series_id` built from source version `version`.
    pub fn invalidate_version(&self, series_id: &SeriesId, version: u64) -> usize {
        self.remove_where(|key| &key.series_id == series_id && key.version == version)
    }

    /// Drop everything and reset the counters.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    fn remove_where(&self, predicate: impl Fn(&SectionKey) -> bool) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        let removed = before - entries.len();
        if removed > 0 {
            log::debug!("section cache: invalidated {removed} entries");
        }
        removed
    }
}
