//! Per-exercise detector workers and the router that feeds them.
//!
//! ```text
//!  frame msgs ──▶ FeedRouter ──try_send──▶ mpsc ──▶ ExerciseWorker ──apply──▶ Registry
//!                  (one Sender per key)            (owns one detector)
//! ```
//!
//! Each worker is the only writer of its registry entry. Feeds never wait
//! on a busy worker: when its queue is full the frame is dropped.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use repcoach_core::{build_detector, DetectorConfig, ExerciseDetector, ExerciseKind, Frame};

use crate::registry::{RegistryError, RegistryHandle};

/// One unit of work for a detector; `None` is a detection gap.
pub type FrameInput = Option<Frame>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedError {
    #[error("No feed for exercise: {0}")]
    NoFeed(ExerciseKind),

    #[error("Feed for {0} is busy, frame dropped")]
    Busy(ExerciseKind),

    #[error("Feed for {0} is closed")]
    Closed(ExerciseKind),
}

/// Routes frames to the worker that owns each exercise.
#[derive(Clone, Default)]
pub struct FeedRouter {
    feeds: HashMap<ExerciseKind, mpsc::Sender<FrameInput>>,
}

impl FeedRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, exercise: ExerciseKind, sender: mpsc::Sender<FrameInput>) {
        self.feeds.insert(exercise, sender);
    }

    /// Queues `input` for the worker owning `exercise` without waiting.
    pub fn route(&self, exercise: ExerciseKind, input: FrameInput) -> Result<(), FeedError> {
        let feed = self
            .feeds
            .get(&exercise)
            .ok_or(FeedError::NoFeed(exercise))?;

        feed.try_send(input).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                debug!(exercise = %exercise, "Worker busy, dropping frame");
                FeedError::Busy(exercise)
            }
            mpsc::error::TrySendError::Closed(_) => FeedError::Closed(exercise),
        })
    }
}

/// Drives one detector from its feed and writes deltas to the registry.
pub struct ExerciseWorker {
    detector: Box<dyn ExerciseDetector>,
    receiver: mpsc::Receiver<FrameInput>,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
}

impl ExerciseWorker {
    pub fn new(
        detector: Box<dyn ExerciseDetector>,
        receiver: mpsc::Receiver<FrameInput>,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            detector,
            receiver,
            registry,
            cancel_token,
        }
    }

    /// Processes frames until cancelled or the feed closes.
    pub async fn run(mut self) {
        let exercise = self.detector.kind();
        debug!(exercise = %exercise, "Exercise worker starting");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    debug!(exercise = %exercise, "Exercise worker shutting down");
                    break;
                }

                input = self.receiver.recv() => {
                    let Some(input) = input else {
                        debug!(exercise = %exercise, "Feed closed");
                        break;
                    };
                    if let Err(e) = self.process(exercise, input).await {
                        warn!(exercise = %exercise, error = %e, "Dropping worker");
                        break;
                    }
                }
            }
        }
    }

    async fn process(&mut self, exercise: ExerciseKind, input: FrameInput) -> Result<(), RegistryError> {
        let at = input.as_ref().map_or_else(Utc::now, Frame::timestamp);
        let delta = self.detector.update(input.as_ref());
        if delta.is_noop() {
            return Ok(());
        }
        self.registry.apply(exercise, delta, at).await
    }
}

/// Starts one worker per exercise and returns the router feeding them.
pub fn spawn_workers(
    exercises: &[ExerciseKind],
    registry: &RegistryHandle,
    detector_config: &DetectorConfig,
    feed_buffer: usize,
    cancel_token: &CancellationToken,
) -> (FeedRouter, Vec<JoinHandle<()>>) {
    let mut router = FeedRouter::new();
    let mut handles = Vec::with_capacity(exercises.len());

    for &exercise in exercises {
        let (tx, rx) = mpsc::channel(feed_buffer.max(1));
        router.insert(exercise, tx);

        let worker = ExerciseWorker::new(
            build_detector(exercise, detector_config),
            rx,
            registry.clone(),
            cancel_token.child_token(),
        );
        handles.push(tokio::spawn(worker.run()));
    }

    info!(workers = handles.len(), "Exercise workers started");
    (router, handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::spawn_registry;
    use repcoach_core::LandmarkId::*;
    use std::time::Duration;

    fn curl_frames() -> Vec<Frame> {
        let extended = [
            (LeftShoulder, 0.5, 0.3),
            (LeftElbow, 0.5, 0.45),
            (LeftWrist, 0.5, 0.6),
            (LeftHip, 0.52, 0.6),
        ];
        let curled = [
            (LeftShoulder, 0.5, 0.3),
            (LeftElbow, 0.5, 0.45),
            (LeftWrist, 0.52, 0.32),
            (LeftHip, 0.52, 0.6),
        ];
        vec![
            Frame::from_points(Utc::now(), &extended),
            Frame::from_points(Utc::now(), &curled),
        ]
    }

    #[tokio::test]
    async fn test_worker_counts_into_registry() {
        let registry = spawn_registry();
        let cancel = CancellationToken::new();
        let (router, handles) = spawn_workers(
            &[ExerciseKind::LeftBicep],
            &registry,
            &DetectorConfig::default(),
            16,
            &cancel,
        );

        router.route(ExerciseKind::LeftBicep, None).unwrap();
        for frame in curl_frames() {
            router.route(ExerciseKind::LeftBicep, Some(frame)).unwrap();
        }

        let mut reps = 0;
        for _ in 0..50 {
            reps = registry.get(ExerciseKind::LeftBicep).await.unwrap().reps;
            if reps == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(reps, 1);

        cancel.cancel();
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_route_errors() {
        let router = FeedRouter::new();
        assert_eq!(
            router.route(ExerciseKind::Squat, None),
            Err(FeedError::NoFeed(ExerciseKind::Squat))
        );

        let mut router = FeedRouter::new();
        let (tx, rx) = mpsc::channel(1);
        router.insert(ExerciseKind::Squat, tx);
        router.route(ExerciseKind::Squat, None).unwrap();
        assert_eq!(
            router.route(ExerciseKind::Squat, None),
            Err(FeedError::Busy(ExerciseKind::Squat))
        );
        drop(rx);
        assert_eq!(
            router.route(ExerciseKind::Squat, None),
            Err(FeedError::Closed(ExerciseKind::Squat))
        );
    }
}
