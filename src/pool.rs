//! Detection worker pool
//!
//! Runs detections off the caller's thread on a dedicated rayon pool.
//! Every job owns its input and settings, so workers share nothing.

use rayon::prelude::*;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::detection::{
    self, CancellationToken, DetectionError, DetectionResult, DetectionSettings, PixelBuffer,
};

/// Pool error types
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to build thread pool: {0}")]
    Build(String),

    #[error("Worker exited before sending a result")]
    Disconnected,

    #[error("Timed out waiting for detection after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Detection(#[from] DetectionError),
}

pub type Result<T> = std::result::Result<T, PoolError>;

// ============================================================
// Detection Handle
// ============================================================

/// Pending result of a submitted detection
pub struct DetectionHandle {
    receiver: mpsc::Receiver<detection::Result<DetectionResult>>,
    cancel: CancellationToken,
}

impl DetectionHandle {
    /// Block until the detection finishes
    pub fn wait(self) -> Result<DetectionResult> {
        match self.receiver.recv() {
            Ok(result) => Ok(result?),
            Err(_) => Err(PoolError::Disconnected),
        }
    }

    /// Wait at most `timeout`; the job keeps running on `Timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Result<DetectionResult> {
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Ok(result?),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(PoolError::Timeout(timeout)),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(PoolError::Disconnected),
        }
    }

    /// Ask the worker to abandon the scan
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

// ============================================================
// Detection Pool
// ============================================================

/// Fixed-size pool for template detection
pub struct DetectionPool {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl DetectionPool {
    /// Create a pool; `None` uses one thread per CPU
    pub fn new(threads: Option<usize>) -> Result<Self> {
        let threads = threads.unwrap_or_else(num_cpus::get).max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("detect-{i}"))
            .build()
            .map_err(|e| PoolError::Build(e.to_string()))?;

        tracing::debug!(threads, "detection pool started");
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run one detection in the background
    pub fn submit(&self, image: Arc<PixelBuffer>, settings: DetectionSettings) -> DetectionHandle {
        self.submit_with_cancel(image, settings, CancellationToken::new())
    }

    /// Run one detection in the background under `cancel`
    pub fn submit_with_cancel(
        &self,
        image: Arc<PixelBuffer>,
        settings: DetectionSettings,
        cancel: CancellationToken,
    ) -> DetectionHandle {
        let (sender, receiver) = mpsc::channel();
        let worker_cancel = cancel.clone();

        self.pool.spawn(move || {
            let result = detection::detect_with_cancel(&image, &settings, &worker_cancel);
            // Receiver may already be gone; nothing to report then
            let _ = sender.send(result);
        });

        DetectionHandle { receiver, cancel }
    }

    /// Detect every image in parallel, preserving input order
    pub fn detect_batch(
        &self,
        images: &[PixelBuffer],
        settings: &DetectionSettings,
    ) -> Vec<detection::Result<DetectionResult>> {
        self.map(images, |image| detection::detect(image, settings))
    }

    /// Apply `f` to every item on the pool, preserving input order
    pub fn map<I, T, F>(&self, items: &[I], f: F) -> Vec<T>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn template(size: u32, zone: Option<(u32, u32, u32, u32)>) -> PixelBuffer {
        let mut img = RgbaImage::from_pixel(size, size, Rgba([255, 255, 255, 255]));
        if let Some((x0, y0, w, h)) = zone {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    img.put_pixel(x, y, Rgba([0, 255, 0, 255]));
                }
            }
        }
        PixelBuffer::from_rgba_image(img).unwrap()
    }

    #[test]
    fn test_pool_thread_count() {
        let pool = DetectionPool::new(Some(3)).unwrap();
        assert_eq!(pool.threads(), 3);

        let pool = DetectionPool::new(Some(0)).unwrap();
        assert_eq!(pool.threads(), 1);
    }

    #[test]
    fn test_submit_and_wait() {
        let pool = DetectionPool::new(Some(2)).unwrap();
        let image = Arc::new(template(100, Some((20, 30, 40, 20))));

        let handle = pool.submit(image, DetectionSettings::default());
        let result = handle.wait().unwrap();

        assert_eq!(result.regions.len(), 1);
        assert_eq!(result.regions[0].pixel_count, 800);
    }

    #[test]
    fn test_wait_timeout_returns_result() {
        let pool = DetectionPool::new(Some(1)).unwrap();
        let handle = pool.submit(Arc::new(template(50, None)), DetectionSettings::default());
        let result = handle.wait_timeout(Duration::from_secs(30)).unwrap();
        assert!(!result.has_target_color);
    }

    #[test]
    fn test_cancelled_job_reports_cancellation() {
        let pool = DetectionPool::new(Some(1)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let handle = pool.submit_with_cancel(
            Arc::new(template(64, Some((0, 0, 10, 10)))),
            DetectionSettings::default(),
            cancel,
        );
        assert!(matches!(
            handle.wait(),
            Err(PoolError::Detection(DetectionError::Cancelled))
        ));
    }

    #[test]
    fn test_detect_batch_preserves_order() {
        let pool = DetectionPool::new(Some(4)).unwrap();
        let images = vec![
            template(80, Some((10, 10, 20, 20))),
            template(80, None),
            template(80, Some((5, 5, 30, 10))),
        ];

        let results = pool.detect_batch(&images, &DetectionSettings::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().total_area, 400);
        assert_eq!(results[1].as_ref().unwrap().total_area, 0);
        assert_eq!(results[2].as_ref().unwrap().total_area, 300);
    }
}
