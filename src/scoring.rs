use image::RgbImage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureMetadata, CaptureService};
use crate::common::Position;
use crate::config::DetectionSettings;
use crate::detect::Detector;
use crate::error::AppError;
use crate::game::{GameState, RecognizedLabels};
use crate::media::MediaSourceManager;
use crate::notify::{Notification, NotificationHub};
use crate::overlay::OverlayRenderer;

/// The detection-and-scoring orchestrator. One instance lives per camera
/// session; the one-shot capture flag is therefore reset exactly when the
/// session restarts, never per cycle.
pub struct ScoringLoop {
    detector: Arc<dyn Detector>,
    media: Arc<tokio::sync::Mutex<MediaSourceManager>>,
    position_rx: watch::Receiver<Option<Position>>,
    state: Arc<GameState>,
    renderer: OverlayRenderer,
    canvas: RgbImage,
    capture: CaptureService,
    notifications: NotificationHub,
    recognized: RecognizedLabels,
    reward_points: u64,
    capture_label: String,
    capture_taken: bool,
}

impl ScoringLoop {
    pub fn new(
        detector: Arc<dyn Detector>,
        media: Arc<tokio::sync::Mutex<MediaSourceManager>>,
        position_rx: watch::Receiver<Option<Position>>,
        state: Arc<GameState>,
        renderer: OverlayRenderer,
        capture: CaptureService,
        notifications: NotificationHub,
        settings: &DetectionSettings,
    ) -> Self {
        Self {
            detector,
            media,
            position_rx,
            state,
            renderer,
            canvas: RgbImage::new(0, 0),
            capture,
            notifications,
            recognized: RecognizedLabels::new(&settings.recognized_labels),
            reward_points: settings.reward_points,
            capture_label: settings.capture_label.clone(),
            capture_taken: false,
        }
    }

    /// Cadence-driven cycle task. The select only chooses between *starting*
    /// a tick and cancellation; once a cycle has begun it runs to completion,
    /// so an in-flight detection is never forcibly aborted.
    pub async fn run(mut self, period: Duration, cancel_token: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("Scoring loop started ({:?} cadence)", period);
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = interval.tick() => {
                    // A failed cycle never stops the cadence.
                    if let Err(e) = self.cycle().await {
                        tracing::warn!("Detection cycle failed: {}", e);
                    }
                }
            }
        }
        tracing::info!("Scoring loop stopped");
    }

    /// One detection cycle: capture frame, run detector, update state, render.
    pub async fn cycle(&mut self) -> Result<(), AppError> {
        // Preconditions. Not an error; the loop simply no-ops until the
        // camera is ready and a position fix is cached.
        let frame = {
            let mut media = self.media.lock().await;
            if !media.is_ready() {
                return Ok(());
            }
            media.frame()?
        };
        let position = match *self.position_rx.borrow() {
            Some(position) => position,
            None => return Ok(()),
        };

        // The drawing surface tracks the video's native size even when the
        // rest of the cycle bails out.
        let (width, height) = frame.dimensions();
        if self.canvas.dimensions() != (width, height) {
            self.canvas = RgbImage::new(width, height);
        }

        let detections = match self.detector.detect(&frame).await {
            Ok(detections) => detections,
            Err(e) => {
                tracing::warn!("Error during object detection: {}", e);
                return Ok(());
            }
        };

        // The detect call is this cycle's suspension point. If the session
        // was torn down while it was in flight, discard the results.
        if !self.media.lock().await.is_ready() {
            return Ok(());
        }

        self.renderer.render(&mut self.canvas, &frame, &detections);

        for detection in &detections {
            if !self.recognized.contains(&detection.label) {
                continue;
            }

            self.state.add_points(self.reward_points);
            self.state.add_detected_item(
                &detection.label,
                position.latitude,
                position.longitude,
            );
            self.state.update_daily_challenge();
            self.notifications
                .publish(Notification::item_found(&detection.label, self.reward_points));

            if detection.label.eq_ignore_ascii_case(&self.capture_label) && !self.capture_taken {
                // At most one evidence capture per session-label pair, no
                // matter how many later cycles see the same label.
                self.capture_taken = true;
                self.capture.capture(
                    &self.canvas,
                    CaptureMetadata::new(&detection.label, position),
                );
            }
        }
        Ok(())
    }

    pub fn capture_taken(&self) -> bool {
        self.capture_taken
    }

    pub fn canvas_dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::MemorySink;
    use crate::common::Frame;
    use crate::config::OverlaySettings;
    use crate::detect::{BoundingBox, Detection};
    use crate::error::DetectorError;
    use crate::media::test_pattern::TestPatternDevice;
    use crate::media::StreamConstraints;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedDetector {
        detections: Vec<Detection>,
        calls: AtomicUsize,
    }

    impl ScriptedDetector {
        fn returning(detections: Vec<Detection>) -> Arc<Self> {
            Arc::new(Self {
                detections,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Detector for ScriptedDetector {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.detections.clone())
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl Detector for FailingDetector {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
            Err(DetectorError::DetectionFailed("backend exploded".to_string()))
        }
    }

    fn detection(label: &str) -> Detection {
        Detection {
            label: label.to_string(),
            confidence: 0.9,
            bbox: BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 50.0,
                height: 50.0,
            },
        }
    }

    struct Harness {
        scoring_loop: ScoringLoop,
        state: Arc<GameState>,
        sink: Arc<MemorySink>,
        // Keeps the position channel open for the duration of a test.
        _position_tx: watch::Sender<Option<Position>>,
        media: Arc<tokio::sync::Mutex<MediaSourceManager>>,
        notifications_rx: tokio::sync::broadcast::Receiver<Notification>,
    }

    async fn harness(detector: Arc<dyn Detector>, ready: bool, with_position: bool) -> Harness {
        let mut manager = MediaSourceManager::new(Arc::new(TestPatternDevice::new()));
        if ready {
            manager
                .acquire(&StreamConstraints {
                    ideal_width: 64,
                    ideal_height: 48,
                    ..StreamConstraints::default()
                })
                .await
                .unwrap();
        }
        let media = Arc::new(tokio::sync::Mutex::new(manager));

        let initial = with_position.then(|| Position::new(48.2, 16.4));
        let (position_tx, position_rx) = watch::channel(initial);

        let state = Arc::new(GameState::new(5));
        let sink = Arc::new(MemorySink::new());
        let notifications = NotificationHub::default();
        let notifications_rx = notifications.subscribe();

        let scoring_loop = ScoringLoop::new(
            detector,
            Arc::clone(&media),
            position_rx,
            Arc::clone(&state),
            OverlayRenderer::new(&OverlaySettings::default()),
            CaptureService::new(sink.clone()),
            notifications,
            &DetectionSettings::default(),
        );

        Harness {
            scoring_loop,
            state,
            sink,
            _position_tx: position_tx,
            media,
            notifications_rx,
        }
    }

    async fn wait_for_blobs(sink: &MemorySink, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while sink.count() < expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("capture never landed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn worked_example_scores_records_notifies_and_captures() {
        let mut h = harness(
            ScriptedDetector::returning(vec![detection("bottle")]),
            true,
            true,
        )
        .await;

        h.scoring_loop.cycle().await.unwrap();

        assert_eq!(h.state.score(), 10);
        let items = h.state.detected_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "bottle");
        assert_eq!(items[0].latitude, 48.2);
        assert_eq!(items[0].longitude, 16.4);

        let notification = h.notifications_rx.recv().await.unwrap();
        assert_eq!(notification.message, "Found bottle! +10 points");

        assert!(h.scoring_loop.capture_taken());
        // PNG plus JSON sidecar.
        wait_for_blobs(&h.sink, 2).await;
    }

    #[tokio::test]
    async fn missing_position_makes_the_cycle_a_silent_noop() {
        let mut h = harness(
            ScriptedDetector::returning(vec![detection("bottle")]),
            true,
            false,
        )
        .await;

        h.scoring_loop.cycle().await.unwrap();

        assert_eq!(h.state.score(), 0);
        assert_eq!(h.state.detected_items_count(), 0);
        assert!(!h.scoring_loop.capture_taken());
        assert!(h.notifications_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unready_media_makes_the_cycle_a_silent_noop() {
        let detector = ScriptedDetector::returning(vec![detection("bottle")]);
        let mut h = harness(detector.clone(), false, true).await;

        h.scoring_loop.cycle().await.unwrap();

        assert_eq!(h.state.score(), 0);
        // The detector is not even consulted before preconditions hold.
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn each_recognized_detection_scores_exactly_once_per_cycle() {
        let mut h = harness(
            ScriptedDetector::returning(vec![
                detection("bottle"),
                detection("CAN"),
                detection("rock"),
            ]),
            true,
            true,
        )
        .await;

        h.scoring_loop.cycle().await.unwrap();

        // Two recognized labels out of three detections; matching is
        // case-insensitive and "rock" never scores.
        assert_eq!(h.state.score(), 20);
        assert_eq!(h.state.detected_items_count(), 2);
        assert_eq!(h.state.daily_challenge().progress, 2);
        assert_eq!(
            h.notifications_rx.recv().await.unwrap().message,
            "Found bottle! +10 points"
        );
        assert_eq!(
            h.notifications_rx.recv().await.unwrap().message,
            "Found CAN! +10 points"
        );
        assert!(h.notifications_rx.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn the_capture_label_captures_at_most_once_per_session() {
        let mut h = harness(
            ScriptedDetector::returning(vec![detection("bottle")]),
            true,
            true,
        )
        .await;

        for _ in 0..5 {
            h.scoring_loop.cycle().await.unwrap();
        }

        assert_eq!(h.state.score(), 50);
        assert!(h.scoring_loop.capture_taken());
        wait_for_blobs(&h.sink, 2).await;
        // Settle, then confirm no further capture snuck in.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(h.sink.count(), 2);
    }

    #[tokio::test]
    async fn a_failing_detection_cycle_mutates_nothing() {
        let mut h = harness(Arc::new(FailingDetector), true, true).await;

        h.scoring_loop.cycle().await.unwrap();

        assert_eq!(h.state.score(), 0);
        assert_eq!(h.state.detected_items_count(), 0);
        assert!(h.notifications_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn canvas_tracks_the_video_dimensions() {
        let mut h = harness(ScriptedDetector::returning(vec![]), true, true).await;

        h.scoring_loop.cycle().await.unwrap();
        assert_eq!(h.scoring_loop.canvas_dimensions(), (64, 48));
    }

    /// Releases the camera session from inside the detect call, standing in
    /// for a teardown racing an in-flight detection.
    struct ReleasingDetector {
        media: Arc<tokio::sync::Mutex<MediaSourceManager>>,
    }

    #[async_trait]
    impl Detector for ReleasingDetector {
        fn name(&self) -> &'static str {
            "releasing"
        }

        async fn detect(&self, _frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
            self.media.lock().await.release();
            Ok(vec![detection("bottle")])
        }
    }

    #[tokio::test]
    async fn results_arriving_after_teardown_are_discarded() {
        let placeholder = ScriptedDetector::returning(vec![]);
        let mut h = harness(placeholder, true, true).await;
        h.scoring_loop.detector = Arc::new(ReleasingDetector {
            media: Arc::clone(&h.media),
        });

        h.scoring_loop.cycle().await.unwrap();

        // The detector did return a bottle, but readiness had gone false by
        // the time the result landed.
        assert_eq!(h.state.score(), 0);
        assert!(!h.scoring_loop.capture_taken());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_keeps_ticking_and_stops_on_cancellation() {
        let detector = ScriptedDetector::returning(vec![]);
        let h = harness(detector.clone(), true, true).await;

        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(
            h.scoring_loop
                .run(Duration::from_millis(10), cancel_token.clone()),
        );

        tokio::time::timeout(Duration::from_secs(2), async {
            while detector.calls.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loop never ticked");

        cancel_token.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("loop never stopped")
            .unwrap();
    }
}
