// src/utils/metrics.rs
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Duration, Instant};

/// Per-source pipeline counters.
pub struct SchedulerMetrics {
    start_time: Instant,
    frames_total: AtomicU64,
    jobs_dispatched: AtomicU64,
    jobs_skipped_busy: AtomicU64,
    jobs_failed: AtomicU64,
    detections_total: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    inference_time: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub frames_total: u64,
    pub jobs_dispatched: u64,
    pub jobs_skipped_busy: u64,
    pub jobs_failed: u64,
    pub detections_total: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_inference_micros: u64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            frames_total: AtomicU64::new(0),
            jobs_dispatched: AtomicU64::new(0),
            jobs_skipped_busy: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            detections_total: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            inference_time: AtomicU64::new(0),
        }
    }

    pub fn record_frame(&self) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self) {
        self.jobs_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_busy(&self) {
        self.jobs_skipped_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job(&self, duration: Duration, detections: usize, success: bool) {
        self.inference_time.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.detections_total.fetch_add(detections as u64, Ordering::Relaxed);
        if !success {
            self.jobs_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let completed = self.jobs_dispatched.load(Ordering::Relaxed);
        let total_time = self.inference_time.load(Ordering::Relaxed);

        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            frames_total: self.frames_total.load(Ordering::Relaxed),
            jobs_dispatched: completed,
            jobs_skipped_busy: self.jobs_skipped_busy.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            detections_total: self.detections_total.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            avg_inference_micros: if completed == 0 { 0 } else { total_time / completed },
        }
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
