//! Performance metrics and statistics tracking for the inference service.

use crate::models::Label;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for served predictions
pub struct PipelineMetrics {
    /// Predictions returned to callers
    pub predictions_served: AtomicU64,
    /// Predictions labeled positive
    pub positive_labels: AtomicU64,
    /// Requests rejected as caller errors
    pub rejected_requests: AtomicU64,
    /// Requests failed by the predictor
    pub predictor_faults: AtomicU64,
    /// Audit records the sink could not accept
    pub audit_dropped: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            positive_labels: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
            predictor_faults: AtomicU64::new(0),
            audit_dropped: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a served prediction
    pub fn record_prediction(&self, processing_time: Duration, probability: f64, label: Label) {
        self.predictions_served.fetch_add(1, Ordering::Relaxed);
        if label == Label::Positive {
            self.positive_labels.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (probability * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_rejection(&self) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fault(&self) {
        self.predictor_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_audit_drop(&self) {
        self.audit_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted: Vec<u64> = match self.processing_times.read() {
            Ok(times) => times.clone(),
            Err(_) => return ProcessingStats::default(),
        };
        if sorted.is_empty() {
            return ProcessingStats::default();
        }
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: sorted[count - 1],
        }
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

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|buckets| *buckets)
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let served = self.predictions_served.load(Ordering::Relaxed);
        let positives = self.positive_labels.load(Ordering::Relaxed);
        let positive_rate = if served > 0 {
            (positives as f64 / served as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let distribution = self.get_probability_distribution();

        info!(
            served,
            positives,
            positive_rate = format!("{:.1}%", positive_rate),
            rejected = self.rejected_requests.load(Ordering::Relaxed),
            faults = self.predictor_faults.load(Ordering::Relaxed),
            audit_dropped = self.audit_dropped.load(Ordering::Relaxed),
            throughput = format!("{:.1} req/s", self.get_throughput()),
            "Prediction summary"
        );
        info!(
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Processing latency"
        );
        info!(buckets = ?distribution, "Probability distribution (0.1 wide buckets)");
    }
}

impl Default for PipelineMetrics {
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

/// Periodic metrics reporter
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // first tick fires immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), 0.3, Label::Negative);
        metrics.record_prediction(Duration::from_micros(200), 0.8, Label::Positive);
        metrics.record_prediction(Duration::from_micros(300), 1.0, Label::Positive);
        metrics.record_rejection();
        metrics.record_fault();

        assert_eq!(metrics.predictions_served.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.positive_labels.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rejected_requests.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.predictor_faults.load(Ordering::Relaxed), 1);

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[3], 1);
        assert_eq!(distribution[8], 1);
        assert_eq!(distribution[9], 1);
    }

    #[test]
    fn test_processing_stats() {
        let metrics = PipelineMetrics::new();
        for us in 1..=100 {
            metrics.record_prediction(Duration::from_micros(us), 0.5, Label::Positive);
        }

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 100);
        assert_eq!(stats.max_us, 100);
        assert_eq!(stats.p50_us, 51);
        assert_eq!(stats.mean_us, 50);
    }

    #[test]
    fn test_empty_stats() {
        let stats = PipelineMetrics::new().get_processing_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.max_us, 0);
    }
}
