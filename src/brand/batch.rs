//! Chunked brand assignment over a whole catalog.
//!
//! Items are pulled from a [`CatalogSource`] one chunk at a time, resolved
//! against a shared [`BrandResolver`] and handed to a [`ResultSink`] as one
//! batch per chunk, so only a bounded number of chunks is ever held in memory.
//! Chunks do not depend on each other; with more than one worker several
//! chunks are resolved at once on the blocking thread pool.

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::resolver::BrandResolver;
use super::types::{CatalogItem, MatchResult};
use super::TARGET_BATCH;

pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Builds the stable record identifier from the source name and the item's
/// source ID.
pub type RecordIdFn = fn(&str, &str) -> String;

/// SHA-256 of `"{source}_{source_item_id}"`, hex encoded.
pub fn record_id(source: &str, source_item_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}_{}", source, source_item_id).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Supplies catalog items in order, one chunk per call. An empty chunk means
/// the catalog is exhausted.
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    /// Number of items the source expects to yield, for progress reporting.
    fn total(&self) -> usize;

    async fn next_chunk(&mut self, limit: usize) -> Result<Vec<CatalogItem>>;
}

/// Receives the results of each finished chunk. Delivery guarantees are the
/// sink's business; the driver never retries a failed write.
#[allow(async_fn_in_trait)]
pub trait ResultSink {
    async fn persist_chunk(&self, chunk_number: usize, results: &[MatchResult]) -> Result<()>;
}

pub trait ProgressReporter {
    /// Called after every persisted chunk with a non-decreasing `completed`.
    fn report(&self, completed: usize, total: usize);
}

/// Catalog held in memory.
pub struct VecCatalog {
    items: Vec<CatalogItem>,
    position: usize,
}

impl VecCatalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        VecCatalog { items, position: 0 }
    }
}

impl CatalogSource for VecCatalog {
    fn total(&self) -> usize {
        self.items.len()
    }

    async fn next_chunk(&mut self, limit: usize) -> Result<Vec<CatalogItem>> {
        let end = (self.position + limit).min(self.items.len());
        let chunk = self.items[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }
}

/// Sink that keeps every chunk in memory.
#[derive(Default)]
pub struct MemorySink {
    chunks: Mutex<Vec<(usize, Vec<MatchResult>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persisted chunks ordered by chunk number.
    pub fn into_chunks(self) -> Vec<(usize, Vec<MatchResult>)> {
        let mut chunks = self
            .chunks
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        chunks.sort_by_key(|(number, _)| *number);
        chunks
    }
}

impl ResultSink for MemorySink {
    async fn persist_chunk(&self, chunk_number: usize, results: &[MatchResult]) -> Result<()> {
        self.chunks
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink lock poisoned"))?
            .push((chunk_number, results.to_vec()));
        Ok(())
    }
}

/// Logs progress through `tracing`.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, completed: usize, total: usize) {
        let percent = if total == 0 {
            100.0
        } else {
            completed as f64 * 100.0 / total as f64
        };
        info!(
            target: TARGET_BATCH,
            "Progress: {}/{} items ({:.1}%)", completed, total, percent
        );
    }
}

/// Keeps the highest completed count seen so far.
#[derive(Default)]
pub struct AtomicProgress {
    completed: AtomicUsize,
    reports: AtomicUsize,
}

impl AtomicProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn reports(&self) -> usize {
        self.reports.load(Ordering::SeqCst)
    }
}

impl ProgressReporter for AtomicProgress {
    fn report(&self, completed: usize, _total: usize) {
        self.completed.fetch_max(completed, Ordering::SeqCst);
        self.reports.fetch_add(1, Ordering::SeqCst);
    }
}

/// Results of one chunk before they reach the sink.
#[derive(Debug, Clone, Default)]
pub struct ChunkOutcome {
    pub results: Vec<MatchResult>,
    pub item_count: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub chunks: usize,
    pub processed: usize,
    pub skipped: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    fn absorb(&mut self, outcome: &ChunkOutcome) {
        self.chunks += 1;
        self.processed += outcome.results.len();
        self.skipped += outcome.skipped;
        let matched = outcome
            .results
            .iter()
            .filter(|r| r.final_brand.is_some())
            .count();
        self.matched += matched;
        self.unmatched += outcome.results.len() - matched;
    }
}

/// Resolve every item of one chunk. Items that already carry a match are
/// skipped and produce no result.
pub fn process_items(
    resolver: &BrandResolver,
    source: &str,
    record_id: RecordIdFn,
    items: &[CatalogItem],
) -> ChunkOutcome {
    let mut outcome = ChunkOutcome {
        results: Vec::with_capacity(items.len()),
        item_count: items.len(),
        skipped: 0,
    };

    for item in items {
        if item.is_matched() {
            outcome.skipped += 1;
            continue;
        }

        let resolution = resolver.resolve_title(&item.title);
        outcome.results.push(MatchResult {
            item_id: item.item_id,
            source_item_id: item.source_item_id.clone(),
            matched_brands: resolution.matched_brands,
            final_brand: resolution.final_brand,
            record_id: record_id(source, &item.source_item_id),
        });
    }

    outcome
}

pub struct BatchProcessor {
    resolver: Arc<BrandResolver>,
    source: String,
    chunk_size: usize,
    workers: usize,
    record_id: RecordIdFn,
}

impl BatchProcessor {
    pub fn new(resolver: Arc<BrandResolver>, source: &str) -> Self {
        BatchProcessor {
            resolver,
            source: source.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: 1,
            record_id,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_record_id(mut self, record_id: RecordIdFn) -> Self {
        self.record_id = record_id;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn process_chunk(&self, items: &[CatalogItem]) -> ChunkOutcome {
        process_items(&self.resolver, &self.source, self.record_id, items)
    }

    /// Drive the whole catalog through the resolver.
    ///
    /// Cancellation is checked before a chunk is scheduled and before a
    /// finished chunk is persisted; chunks still in flight at that point are
    /// dropped, so only complete chunks ever reach the sink.
    pub async fn run<C, S, P>(
        &self,
        catalog: &mut C,
        sink: &S,
        progress: &P,
        cancel: &watch::Receiver<bool>,
    ) -> Result<BatchSummary>
    where
        C: CatalogSource,
        S: ResultSink,
        P: ProgressReporter,
    {
        let total = catalog.total();
        let total_chunks = total.div_ceil(self.chunk_size);
        info!(
            target: TARGET_BATCH,
            "Processing {} items from '{}' in {} chunks of {} with {} worker(s)",
            total, self.source, total_chunks, self.chunk_size, self.workers
        );

        let mut summary = BatchSummary::default();
        let mut in_flight = FuturesUnordered::new();
        let mut scheduled = 0;
        let mut exhausted = false;
        let mut completed = 0;

        loop {
            while !exhausted && in_flight.len() < self.workers && !*cancel.borrow() {
                let items = catalog
                    .next_chunk(self.chunk_size)
                    .await
                    .context("Failed to load catalog chunk")?;
                if items.is_empty() {
                    exhausted = true;
                    break;
                }

                scheduled += 1;
                let chunk_number = scheduled;
                let resolver = Arc::clone(&self.resolver);
                let source = self.source.clone();
                let record_id = self.record_id;
                debug!(
                    target: TARGET_BATCH,
                    "Scheduling chunk {} with {} items", chunk_number, items.len()
                );
                in_flight.push(tokio::task::spawn_blocking(move || {
                    (chunk_number, process_items(&resolver, &source, record_id, &items))
                }));
            }

            if *cancel.borrow() {
                warn!(
                    target: TARGET_BATCH,
                    "Cancellation received, discarding {} chunk(s) in flight",
                    in_flight.len()
                );
                summary.cancelled = true;
                break;
            }

            let Some(joined) = in_flight.next().await else {
                break;
            };
            let (chunk_number, outcome) = joined.context("Brand resolution worker failed")?;

            if *cancel.borrow() {
                warn!(
                    target: TARGET_BATCH,
                    "Cancellation received, chunk {} not persisted", chunk_number
                );
                summary.cancelled = true;
                break;
            }

            sink.persist_chunk(chunk_number, &outcome.results)
                .await
                .with_context(|| format!("Failed to persist chunk {}", chunk_number))?;

            summary.absorb(&outcome);
            completed += outcome.item_count;
            info!(
                target: TARGET_BATCH,
                "Chunk {}/{} completed: {} items processed, {} skipped",
                chunk_number,
                total_chunks,
                outcome.results.len(),
                outcome.skipped
            );
            progress.report(completed, total);
        }

        info!(
            target: TARGET_BATCH,
            "Finished '{}': {} chunks, {} processed, {} matched, {} unmatched, {} skipped{}",
            self.source,
            summary.chunks,
            summary.processed,
            summary.matched,
            summary.unmatched,
            summary.skipped,
            if summary.cancelled { " (cancelled)" } else { "" }
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brand::types::BrandAssociation;
    use crate::brand::validation::HeuristicRules;

    fn resolver() -> Arc<BrandResolver> {
        let associations = vec![
            BrandAssociation::new("Vichy", "vichy laboratoires"),
            BrandAssociation::new("RICH", "rich"),
        ];
        Arc::new(BrandResolver::from_associations(
            &associations,
            HeuristicRules::default(),
        ))
    }

    fn catalog(count: usize) -> Vec<CatalogItem> {
        (0..count)
            .map(|i| {
                let title = if i % 2 == 0 {
                    format!("Vichy serum {}", i)
                } else {
                    format!("plain cream {}", i)
                };
                CatalogItem::new(i as i64 + 1, &format!("SKU-{}", i), &title)
            })
            .collect()
    }

    /// Sink that raises the cancel flag once it has stored one chunk.
    struct CancellingSink {
        inner: MemorySink,
        cancel: watch::Sender<bool>,
    }

    impl ResultSink for CancellingSink {
        async fn persist_chunk(&self, chunk_number: usize, results: &[MatchResult]) -> Result<()> {
            self.inner.persist_chunk(chunk_number, results).await?;
            let _ = self.cancel.send(true);
            Ok(())
        }
    }

    struct FailingSink;

    impl ResultSink for FailingSink {
        async fn persist_chunk(&self, _chunk_number: usize, _results: &[MatchResult]) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn test_record_id_is_stable() {
        assert_eq!(record_id("pharmacy", "A-1"), record_id("pharmacy", "A-1"));
        assert_ne!(record_id("pharmacy", "A-1"), record_id("other", "A-1"));
        assert_eq!(record_id("pharmacy", "A-1").len(), 64);
    }

    #[test]
    fn test_process_items_skips_matched() {
        let processor = BatchProcessor::new(resolver(), "pharmacy");
        let items = vec![
            CatalogItem::new(1, "A", "Vichy serum"),
            CatalogItem::new(2, "B", "Vichy cream").with_existing_match("done"),
            CatalogItem::new(3, "C", ""),
        ];
        let outcome = processor.process_chunk(&items);

        assert_eq!(outcome.item_count, 3);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.results[0].final_brand.as_deref(), Some("vichy"));
        assert_eq!(outcome.results[1].final_brand, None);
        assert!(outcome.results[1].matched_brands.is_empty());
    }

    #[tokio::test]
    async fn test_chunks_are_bounded() {
        let processor = BatchProcessor::new(resolver(), "pharmacy").with_chunk_size(100);
        let sink = MemorySink::new();
        let progress = AtomicProgress::new();
        let (_tx, rx) = watch::channel(false);

        let summary = processor
            .run(&mut VecCatalog::new(catalog(250)), &sink, &progress, &rx)
            .await
            .unwrap();

        let chunks = sink.into_chunks();
        let sizes: Vec<usize> = chunks.iter().map(|(_, r)| r.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.processed, 250);
        assert_eq!(summary.matched, 125);
        assert_eq!(summary.unmatched, 125);
        assert!(!summary.cancelled);
        assert_eq!(progress.completed(), 250);
        assert_eq!(progress.reports(), 3);
    }

    #[tokio::test]
    async fn test_record_ids_stable_across_runs() {
        let processor = BatchProcessor::new(resolver(), "pharmacy").with_chunk_size(100);
        let (_tx, rx) = watch::channel(false);

        let first = MemorySink::new();
        processor
            .run(&mut VecCatalog::new(catalog(250)), &first, &LogProgress, &rx)
            .await
            .unwrap();
        let second = MemorySink::new();
        processor
            .run(&mut VecCatalog::new(catalog(250)), &second, &LogProgress, &rx)
            .await
            .unwrap();

        let ids = |sink: MemorySink| -> Vec<String> {
            sink.into_chunks()
                .into_iter()
                .flat_map(|(_, results)| results.into_iter().map(|r| r.record_id))
                .collect()
        };
        assert_eq!(ids(first), ids(second));
    }

    #[tokio::test]
    async fn test_parallel_workers_cover_all_chunks() {
        let processor = BatchProcessor::new(resolver(), "pharmacy")
            .with_chunk_size(10)
            .with_workers(4);
        let sink = MemorySink::new();
        let progress = AtomicProgress::new();
        let (_tx, rx) = watch::channel(false);

        let summary = processor
            .run(&mut VecCatalog::new(catalog(95)), &sink, &progress, &rx)
            .await
            .unwrap();

        let chunks = sink.into_chunks();
        let numbers: Vec<usize> = chunks.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
        assert_eq!(chunks[9].1.len(), 5);
        assert_eq!(summary.processed, 95);
        assert_eq!(progress.completed(), 95);
    }

    #[tokio::test]
    async fn test_cancellation_keeps_only_completed_chunks() {
        let processor = BatchProcessor::new(resolver(), "pharmacy").with_chunk_size(100);
        let (tx, rx) = watch::channel(false);
        let sink = CancellingSink {
            inner: MemorySink::new(),
            cancel: tx,
        };

        let summary = processor
            .run(&mut VecCatalog::new(catalog(250)), &sink, &LogProgress, &rx)
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.chunks, 1);
        assert_eq!(sink.inner.into_chunks().len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let processor = BatchProcessor::new(resolver(), "pharmacy");
        let (_tx, rx) = watch::channel(true);
        let sink = MemorySink::new();

        let summary = processor
            .run(&mut VecCatalog::new(catalog(10)), &sink, &LogProgress, &rx)
            .await
            .unwrap();

        assert!(summary.cancelled);
        assert!(sink.into_chunks().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_propagates() {
        let processor = BatchProcessor::new(resolver(), "pharmacy");
        let (_tx, rx) = watch::channel(false);

        let err = processor
            .run(&mut VecCatalog::new(catalog(10)), &FailingSink, &LogProgress, &rx)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("disk full"));
    }

    #[tokio::test]
    async fn test_empty_catalog() {
        let processor = BatchProcessor::new(resolver(), "pharmacy");
        let (_tx, rx) = watch::channel(false);
        let sink = MemorySink::new();

        let summary = processor
            .run(&mut VecCatalog::new(Vec::new()), &sink, &LogProgress, &rx)
            .await
            .unwrap();
        assert_eq!(summary, BatchSummary::default());
    }
}
