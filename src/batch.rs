//! Parallel batch extraction over many series.
//!
//! Series are independent, so a batch is embarrassingly parallel: each
//! series is extracted on a worker of a local Rayon thread pool against a
//! shared, read-only [`MultiScaleExtractor`]. Results come back in input
//! order regardless of scheduling.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     BatchProcessor                       │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │               Rayon Thread Pool                    │  │
//! │  │                                                    │  │
//! │  │   Thread 1        Thread 2        Thread N         │  │
//! │  │   series 0        series 1        series k         │  │
//! │  │      │               │               │             │  │
//! │  │      ▼               ▼               ▼             │  │
//! │  │  Arc<MultiScaleExtractor>  (+ optional SectionCache)│  │
//! │  │      │               │               │             │  │
//! │  │   row / exclusion / skipped (cancelled)            │  │
//! │  └─────────────────────────┬──────────────────────────┘  │
//! │                            ▼                             │
//! │          BatchOutput { examples, exclusions, summary }   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Without the `parallel` cargo feature the same code runs sequentially.
//!
//! # Example
//!
//! ```
//! use levy_sections::batch::{BatchConfig, BatchProcessor};
//! use levy_sections::{ExtractorBuilder, ReturnSeries};
//!
//! let extractor = ExtractorBuilder::new()
//!     .scale("fast", 0.05)
//!     .scale("slow", 0.2)
//!     .half_window(2)
//!     .build()
//!     .unwrap();
//!
//! let alternating: Vec<f64> = (0..200).map(|i| if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
//! let series = vec![
//!     ReturnSeries::new("a", alternating.clone()),
//!     ReturnSeries::new("b", vec![0.1; 3]),
//! ];
//!
//! let processor = BatchProcessor::new(extractor, BatchConfig::new().with_threads(2));
//! let output = processor.process(&series).unwrap();
//!
//! assert_eq!(output.summary.processed, 1);
//! assert_eq!(output.summary.excluded, 1);
//! ```

use crate::cache::SectionCache;
use crate::error::Result;
use crate::features::MultiScaleExtractor;
use crate::series::{Exclusion, ExclusionReason, LabeledExample, ReturnSeries};
use crate::validation::validate_row;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ============================================================================
// Cancellation Support
// ============================================================================

/// Token for cancelling batch processing.
///
/// Cloneable and shareable across threads. Workers check it before each
/// series; series already extracted are kept in the output.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread at any time.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Reset the token for reuse. Only call when no batch is running.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for batch processing.
#[derive(Debug, Clone, Default)]
pub struct BatchConfig {
    /// Number of threads to use.
    ///
    /// - `None`: Use Rayon default (typically num_cpus)
    /// - `Some(n)`: Use exactly n threads
    pub num_threads: Option<usize>,

    /// Stack size per thread in bytes (advanced).
    pub stack_size: Option<usize>,

    /// Check every produced row for width and finiteness.
    pub validate_output: bool,
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of threads to use.
    ///
    /// # Panics
    ///
    /// Panics if threads is 0.
    pub fn with_threads(mut self, threads: usize) -> Self {
        assert!(threads > 0, "Thread count must be > 0");
        self.num_threads = Some(threads);
        self
    }

    pub fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_output = validate;
        self
    }

    /// Configured threads, or the Rayon default.
    #[cfg(feature = "parallel")]
    pub fn effective_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(rayon::current_num_threads)
    }

    /// Always 1 without the `parallel` feature.
    #[cfg(not(feature = "parallel"))]
    pub fn effective_threads(&self) -> usize {
        1
    }
}

// ============================================================================
// Results
// ============================================================================

/// Aggregate counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Series that produced a row.
    pub processed: usize,

    /// Series excluded (too short after cleaning, no valid scale, or a row
    /// that failed output validation).
    pub excluded: usize,

    /// Invalid scale blocks across produced rows and series excluded because
    /// no scale was valid.
    pub invalid_scales: usize,

    /// Values coerced to `0.0` across all produced rows.
    pub coerced: usize,

    /// Values dropped across all produced rows.
    pub dropped: usize,
}

/// Output of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Extracted rows in input order.
    pub examples: Vec<LabeledExample>,

    /// Excluded series in input order.
    pub exclusions: Vec<Exclusion>,

    pub summary: BatchSummary,

    pub elapsed: Duration,

    pub threads_used: usize,

    /// Whether the run was cancelled.
    pub was_cancelled: bool,

    /// Series not attempted because of cancellation.
    pub skipped_count: usize,
}

impl BatchOutput {
    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        self.examples.iter().map(|e| e.features.to_row())
    }

    /// Series per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.summary.processed + self.summary.excluded) as f64 / secs
        } else {
            0.0
        }
    }
}

// ============================================================================
// Progress Reporting
// ============================================================================

/// Progress information for callbacks.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    pub current_series: String,

    /// Index of the current series (0-based).
    pub current_index: usize,

    pub total: usize,

    /// Series finished with a row so far.
    pub completed: usize,

    /// Series excluded so far.
    pub excluded: usize,

    pub elapsed: Duration,
}

impl ProgressInfo {
    /// Completion percentage (0.0 to 100.0).
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed + self.excluded) as f64 / self.total as f64 * 100.0
        }
    }

    pub fn estimated_remaining(&self) -> Option<Duration> {
        let done = self.completed + self.excluded;
        if done == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(done);
        let avg_time = self.elapsed.as_secs_f64() / done as f64;
        Some(Duration::from_secs_f64(avg_time * remaining as f64))
    }
}

/// Trait for progress reporting callbacks.
pub trait ProgressCallback: Send + Sync {
    /// Called when starting a series.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called once the batch completes.
    fn on_complete(&self, output: &BatchOutput);
}

/// Progress reporter that writes through the `log` facade.
#[derive(Debug)]
pub struct LogProgress {
    /// Log one progress line every `every` series.
    pub every: usize,
}

impl Default for LogProgress {
    fn default() -> Self {
        Self { every: 100 }
    }
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn every(mut self, every: usize) -> Self {
        self.every = every.max(1);
        self
    }
}

impl ProgressCallback for LogProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if info.current_index % self.every == 0 {
            log::info!(
                "[{}/{}] extracting {} ({:.1}% complete)",
                info.current_index + 1,
                info.total,
                info.current_series,
                info.percent_complete()
            );
        }
    }

    fn on_complete(&self, output: &BatchOutput) {
        log::info!(
            "batch complete: {} rows, {} excluded, {} invalid scales, {} skipped in {:?} ({:.1} series/s)",
            output.summary.processed,
            output.summary.excluded,
            output.summary.invalid_scales,
            output.skipped_count,
            output.elapsed,
            output.throughput()
        );
    }
}

// ============================================================================
// Batch Processor
// ============================================================================

enum SeriesOutcome {
    Extracted(Box<LabeledExample>),
    Excluded(Exclusion),
    Skipped,
}

/// Parallel batch processor.
pub struct BatchProcessor {
    extractor: Arc<MultiScaleExtractor>,
    batch_config: BatchConfig,
    progress_callback: Option<Box<dyn ProgressCallback>>,
    cancellation_token: CancellationToken,
    cache: Option<Arc<SectionCache>>,
}

impl BatchProcessor {
    pub fn new(extractor: MultiScaleExtractor, batch_config: BatchConfig) -> Self {
        Self {
            extractor: Arc::new(extractor),
            batch_config,
            progress_callback: None,
            cancellation_token: CancellationToken::new(),
            cache: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: Box<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Use an external cancellation token (cancel from another thread).
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Route every extraction through a shared section cache.
    pub fn with_cache(mut self, cache: Arc<SectionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn batch_config(&self) -> &BatchConfig {
        &self.batch_config
    }

    pub fn extractor(&self) -> &MultiScaleExtractor {
        &self.extractor
    }

    /// Extract unlabeled series.
    pub fn process(&self, series: &[ReturnSeries]) -> Result<BatchOutput> {
        self.run(series, |s| (s, None))
    }

    /// Extract series paired with their break labels.
    pub fn process_labeled(&self, items: &[(ReturnSeries, Option<bool>)]) -> Result<BatchOutput> {
        self.run(items, |(s, label)| (s, *label))
    }

    fn run<T, F>(&self, items: &[T], view: F) -> Result<BatchOutput>
    where
        T: Sync,
        F: Fn(&T) -> (&ReturnSeries, Option<bool>) + Sync,
    {
        let start = Instant::now();
        let total = items.len();
        let threads_used = self.batch_config.effective_threads();

        let completed = AtomicUsize::new(0);
        let excluded = AtomicUsize::new(0);

        let work = |index: usize, item: &T| -> SeriesOutcome {
            if self.cancellation_token.is_cancelled() {
                return SeriesOutcome::Skipped;
            }
            let (series, label) = view(item);

            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(&ProgressInfo {
                    current_series: series.id.to_string(),
                    current_index: index,
                    total,
                    completed: completed.load(Ordering::Relaxed),
                    excluded: excluded.load(Ordering::Relaxed),
                    elapsed: start.elapsed(),
                });
            }

            let result = match &self.cache {
                Some(cache) => self.extractor.extract_cached(series, cache),
                None => self.extractor.extract(series),
            };

            match result {
                Ok(features) => {
                    completed.fetch_add(1, Ordering::Relaxed);
                    SeriesOutcome::Extracted(Box::new(LabeledExample::new(features, label)))
                }
                Err(exclusion) => {
                    excluded.fetch_add(1, Ordering::Relaxed);
                    SeriesOutcome::Excluded(exclusion)
                }
            }
        };

        let outcomes = self.map_items(items, threads_used, work)?;

        let mut examples = Vec::new();
        let mut exclusions = Vec::new();
        let mut skipped_count = 0usize;
        let mut summary = BatchSummary::default();
        let expected_width = self.extractor.feature_count();

        for outcome in outcomes {
            match outcome {
                SeriesOutcome::Extracted(example) => {
                    let example = if self.batch_config.validate_output {
                        match checked_row(example, expected_width) {
                            Ok(example) => example,
                            Err(exclusion) => {
                                summary.excluded += 1;
                                exclusions.push(exclusion);
                                continue;
                            }
                        }
                    } else {
                        example
                    };
                    let features = &example.features;
                    summary.processed += 1;
                    summary.invalid_scales += features.scales.len() - features.valid_scale_count();
                    summary.coerced += features.cleaning.coerced;
                    summary.dropped += features.cleaning.dropped;
                    examples.push(*example);
                }
                SeriesOutcome::Excluded(exclusion) => {
                    if let ExclusionReason::AllScalesInvalid {
                        insufficient,
                        degenerate,
                    } = exclusion.reason
                    {
                        summary.invalid_scales += insufficient + degenerate;
                    }
                    summary.excluded += 1;
                    exclusions.push(exclusion);
                }
                SeriesOutcome::Skipped => skipped_count += 1,
            }
        }

        let output = BatchOutput {
            examples,
            exclusions,
            summary,
            elapsed: start.elapsed(),
            threads_used,
            was_cancelled: self.cancellation_token.is_cancelled(),
            skipped_count,
        };

        log::info!(
            "batch done: {} processed, {} excluded, {} invalid scales in {:.2?}",
            summary.processed,
            summary.excluded,
            summary.invalid_scales,
            output.elapsed
        );
        if output.was_cancelled {
            log::warn!(
                "batch cancelled: {} series skipped of {}",
                output.skipped_count,
                total
            );
        }
        if let Some(ref callback) = self.progress_callback {
            callback.on_complete(&output);
        }

        Ok(output)
    }

    #[cfg(feature = "parallel")]
    fn map_items<T, W>(&self, items: &[T], threads: usize, work: W) -> Result<Vec<SeriesOutcome>>
    where
        T: Sync,
        W: Fn(usize, &T) -> SeriesOutcome + Sync + Send,
    {
        // Local pool: build_global() only works once per process.
        let mut pool_builder = rayon::ThreadPoolBuilder::new().num_threads(threads);
        if let Some(stack_size) = self.batch_config.stack_size {
            pool_builder = pool_builder.stack_size(stack_size);
        }
        let pool = pool_builder
            .build()
            .map_err(|e| crate::error::LevyError::ThreadPool(e.to_string()))?;

        Ok(pool.install(|| {
            items
                .par_iter()
                .enumerate()
                .map(|(index, item)| work(index, item))
                .collect()
        }))
    }

    #[cfg(not(feature = "parallel"))]
    fn map_items<T, W>(&self, items: &[T], _threads: usize, work: W) -> Result<Vec<SeriesOutcome>>
    where
        T: Sync,
        W: Fn(usize, &T) -> SeriesOutcome + Sync + Send,
    {
        Ok(items
            .iter()
            .enumerate()
            .map(|(index, item)| work(index, item))
            .collect())
    }
}

/// Extract a batch with default batch settings.
pub fn extract_batch(extractor: MultiScaleExtractor, series: &[ReturnSeries]) -> Result<BatchOutput> {
    BatchProcessor::new(extractor, BatchConfig::default()).process(series)
}

/// Extract a batch with an explicit thread count.
pub fn extract_batch_with_threads(
    extractor: MultiScaleExtractor,
    series: &[ReturnSeries],
    threads: usize,
) -> Result<BatchOutput> {
    BatchProcessor::new(extractor, BatchConfig::new().with_threads(threads)).process(series)
}

/// Validate a produced row; a failing row becomes an exclusion.
fn checked_row(
    example: Box<LabeledExample>,
    expected_width: usize,
) -> std::result::Result<Box<LabeledExample>, Exclusion> {
    match validate_row(&example.features.to_row(), expected_width) {
        Ok(()) => Ok(example),
        Err(err) => {
            let exclusion = Exclusion::new(
                example.series_id.clone(),
                ExclusionReason::Failed(err.to_string()),
            );
            log::warn!("{exclusion}");
            Err(exclusion)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ExtractorBuilder;
    use std::sync::Mutex;

    fn extractor() -> MultiScaleExtractor {
        ExtractorBuilder::new()
            .scale("fast", 0.05)
            .scale("slow", 0.2)
            .half_window(2)
            .build()
            .unwrap()
    }

    fn alternating(id: &str, n: usize, amplitude: f64) -> ReturnSeries {
        let values = (0..n)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect();
        ReturnSeries::new(id, values)
    }

    #[test]
    fn test_batch_config_defaults() {
        let config = BatchConfig::default();
        assert!(config.num_threads.is_none());
        assert!(config.stack_size.is_none());
        assert!(!config.validate_output);
        assert!(config.effective_threads() >= 1);
    }

    #[test]
    #[should_panic(expected = "Thread count must be > 0")]
    fn test_batch_config_zero_threads() {
        let _ = BatchConfig::new().with_threads(0);
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        let shared = token.clone();
        assert!(!token.is_cancelled());
        shared.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!shared.is_cancelled());
    }

    #[test]
    fn test_results_in_input_order() {
        let series: Vec<ReturnSeries> = (0..20)
            .map(|i| alternating(&format!("s{i}"), 150 + i * 5, 0.1))
            .collect();
        let processor = BatchProcessor::new(extractor(), BatchConfig::new().with_threads(4));
        let output = processor.process(&series).unwrap();

        let ids: Vec<String> = output.examples.iter().map(|e| e.series_id.to_string()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("s{i}")).collect();
        assert_eq!(ids, expected);
        assert_eq!(output.summary.processed, 20);
        assert_eq!(output.threads_used, 4);
    }

    #[test]
    fn test_summary_counts() {
        let mut dirty = alternating("dirty", 200, 0.1);
        dirty.values[10] = f64::NAN;
        let items = vec![
            (alternating("ok", 200, 0.1), Some(true)),
            (dirty, Some(false)),
            (alternating("short", 3, 0.1), None),
        ];
        let processor = BatchProcessor::new(extractor(), BatchConfig::new().with_validation(true));
        let output = processor.process_labeled(&items).unwrap();

        assert_eq!(output.summary.processed, 2);
        assert_eq!(output.summary.excluded, 1);
        assert_eq!(output.summary.coerced, 1);
        // both scales of "short" are too short for q = 2
        assert_eq!(output.summary.invalid_scales, 2);
        assert_eq!(output.examples[0].label, Some(true));
        assert_eq!(output.examples[1].label, Some(false));
        assert!(matches!(
            output.exclusions[0].reason,
            ExclusionReason::AllScalesInvalid { .. }
        ));
    }

    #[test]
    fn test_invalid_row_becomes_exclusion() {
        let extractor = extractor();
        let width = extractor.feature_count();
        let mut features = extractor.extract(&alternating("bad", 200, 0.1)).unwrap();
        features.scales[0].stats.duration_mean = f64::NAN;
        let example = Box::new(LabeledExample::new(features, Some(true)));

        let exclusion = checked_row(example.clone(), width).unwrap_err();
        assert_eq!(exclusion.series_id.as_str(), "bad");
        assert!(matches!(exclusion.reason, ExclusionReason::Failed(_)));

        let narrow = checked_row(example, width + 1).unwrap_err();
        assert!(matches!(narrow.reason, ExclusionReason::Failed(ref msg) if !msg.is_empty()));

        let clean = extractor.extract(&alternating("good", 200, 0.1)).unwrap();
        let kept = checked_row(Box::new(LabeledExample::new(clean, None)), width).unwrap();
        assert_eq!(kept.series_id.as_str(), "good");
    }

    #[test]
    fn test_cancelled_before_start_skips_everything() {
        let series: Vec<ReturnSeries> = (0..5).map(|i| alternating(&i.to_string(), 100, 0.1)).collect();
        let token = CancellationToken::new();
        token.cancel();

        let processor =
            BatchProcessor::new(extractor(), BatchConfig::default()).with_cancellation_token(token);
        let output = processor.process(&series).unwrap();

        assert!(output.was_cancelled);
        assert_eq!(output.skipped_count, 5);
        assert!(output.examples.is_empty());
    }

    struct Recorder {
        seen: Mutex<Vec<usize>>,
        completed: AtomicBool,
    }

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.seen.lock().unwrap().push(info.current_index);
        }

        fn on_complete(&self, _output: &BatchOutput) {
            self.completed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_progress_callback_sees_every_series() {
        let recorder = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            completed: AtomicBool::new(false),
        });

        struct Forward(Arc<Recorder>);
        impl ProgressCallback for Forward {
            fn on_progress(&self, info: &ProgressInfo) {
                self.0.on_progress(info);
            }
            fn on_complete(&self, output: &BatchOutput) {
                self.0.on_complete(output);
            }
        }

        let series: Vec<ReturnSeries> = (0..8).map(|i| alternating(&i.to_string(), 100, 0.1)).collect();
        let processor = BatchProcessor::new(extractor(), BatchConfig::new().with_threads(2))
            .with_progress_callback(Box::new(Forward(Arc::clone(&recorder))));
        processor.process(&series).unwrap();

        let mut seen = recorder.seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
        assert!(recorder.completed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_progress_info_math() {
        let info = ProgressInfo {
            current_series: "x".to_string(),
            current_index: 3,
            total: 10,
            completed: 4,
            excluded: 1,
            elapsed: Duration::from_secs(5),
        };
        assert!((info.percent_complete() - 50.0).abs() < 1e-12);
        assert_eq!(info.estimated_remaining(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_cached_batch_fills_cache() {
        let cache = Arc::new(SectionCache::new());
        let series = vec![alternating("a", 200, 0.1), alternating("b", 200, 0.2)];
        let processor =
            BatchProcessor::new(extractor(), BatchConfig::default()).with_cache(Arc::clone(&cache));

        let first = processor.process(&series).unwrap();
        let second = processor.process(&series).unwrap();
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.stats().hits, 4);
        assert_eq!(first.examples, second.examples);
    }
}
