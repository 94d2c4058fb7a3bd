//! Performance metrics and statistics tracking for the prediction service.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Upper bounds of the price distribution buckets (last bucket is open-ended)
const PRICE_BUCKET_BOUNDS: [f64; 5] = [10.0, 100.0, 1_000.0, 10_000.0, 100_000.0];

const PRICE_BUCKET_LABELS: [&str; 6] = [
    "<10",
    "10-100",
    "100-1k",
    "1k-10k",
    "10k-100k",
    ">=100k",
];

/// Metrics collector for request handling
pub struct ServiceMetrics {
    /// Successful predictions
    pub predictions_served: AtomicU64,
    /// Requests rejected because of the caller's input
    pub client_errors: AtomicU64,
    /// Requests that failed inside the models
    pub inference_failures: AtomicU64,
    /// Client errors by kind
    errors_by_kind: RwLock<HashMap<String, u64>>,
    /// End-to-end inference times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Per-stage times (in microseconds)
    stage_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Unit price distribution buckets
    price_buckets: RwLock<[u64; 6]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            client_errors: AtomicU64::new(0),
            inference_failures: AtomicU64::new(0),
            errors_by_kind: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            stage_times: RwLock::new(HashMap::new()),
            price_buckets: RwLock::new([0; 6]),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, processing_time: Duration, price_per_unit: f64) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = PRICE_BUCKET_BOUNDS
            .iter()
            .position(|&bound| price_per_unit < bound)
            .unwrap_or(PRICE_BUCKET_BOUNDS.len());
        if let Ok(mut buckets) = self.price_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a request rejected for its input
    pub fn record_client_error(&self, kind: &str) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut by_kind) = self.errors_by_kind.write() {
            *by_kind.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a failed inference
    pub fn record_inference_failure(&self) {
        self.inference_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the duration of one pipeline stage
    pub fn record_stage_time(&self, stage: &str, duration: Duration) {
        if let Ok(mut times) = self.stage_times.write() {
            let stage_times = times.entry(stage.to_string()).or_insert_with(Vec::new);
            stage_times.push(duration.as_micros() as u64);
            // Keep only last 1000 per stage
            if stage_times.len() > 1000 {
                stage_times.drain(0..500);
            }
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Get per-stage statistics
    pub fn get_stage_stats(&self) -> HashMap<String, StageStats> {
        let mut stats = HashMap::new();
        let Ok(times) = self.stage_times.read() else {
            return stats;
        };

        for (stage, stage_times) in times.iter() {
            if stage_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = stage_times.clone();
            sorted.sort_unstable();

            let sum: u64 = sorted.iter().sum();
            let count = sorted.len();

            stats.insert(
                stage.clone(),
                StageStats {
                    calls: count as u64,
                    mean_us: sum / count as u64,
                    p50_us: sorted[count / 2],
                    p99_us: sorted[(count as f64 * 0.99) as usize],
                },
            );
        }

        stats
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_served.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get unit price distribution
    pub fn get_price_distribution(&self) -> [u64; 6] {
        self.price_buckets.read().map(|b| *b).unwrap_or([0; 6])
    }

    /// Get client errors by kind
    pub fn get_errors_by_kind(&self) -> HashMap<String, u64> {
        self.errors_by_kind
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let served = self.predictions_served.load(Ordering::Relaxed);
        let client_errors = self.client_errors.load(Ordering::Relaxed);
        let failures = self.inference_failures.load(Ordering::Relaxed);
        let total = served + client_errors + failures;
        let error_rate = if total > 0 {
            ((client_errors + failures) as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let errors_by_kind = self.get_errors_by_kind();
        let price_dist = self.get_price_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║          PRICE PREDICTION SERVICE - METRICS SUMMARY          ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions Served: {:>8}  │  Throughput: {:>7.2} req/s  ║",
            served, throughput
        );
        info!(
            "║ Client Errors: {:>6}  Inference Failures: {:>6}  ({:>5.1}%) ║",
            client_errors, failures, error_rate
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Inference Time (μs): mean={:>6} p50={:>6} p95={:>6} p99={:>6} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        if !errors_by_kind.is_empty() {
            info!("╠══════════════════════════════════════════════════════════════╣");
            info!("║ Client Errors by Kind:                                       ║");
            for (kind, count) in &errors_by_kind {
                info!("║   {:26}: {:>6}                          ║", kind, count);
            }
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Unit Price Distribution:                                     ║");
        let priced: u64 = price_dist.iter().sum();
        for (label, &count) in PRICE_BUCKET_LABELS.iter().zip(price_dist.iter()) {
            let pct = if priced > 0 {
                (count as f64 / priced as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 5.0) as usize).min(20));
            info!("║   {:>9}: {:>6} ({:>5.1}%) {}", label, count, pct, bar);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");

        let stage_stats = self.get_stage_stats();
        if !stage_stats.is_empty() {
            info!("Stage Times (μs):");
            for (stage, stats) in &stage_stats {
                info!(
                    "  {}: mean={} p50={} p99={} (calls={})",
                    stage, stats.mean_us, stats.p50_us, stats.p99_us, stats.calls
                );
            }
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Stage-specific statistics
#[derive(Debug)]
pub struct StageStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately; skip it so the first report has data.
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
