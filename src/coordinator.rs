use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::capture::{BlobSink, CaptureService};
use crate::common::Position;
use crate::config::Configuration;
use crate::detect::Detector;
use crate::error::AppError;
use crate::game::GameState;
use crate::media::{MediaDevice, MediaSourceManager};
use crate::notify::{Notification, NotificationHub};
use crate::overlay::OverlayRenderer;
use crate::scoring::ScoringLoop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No video ready; no cycles running.
    Idle,
    /// Cadence-driven detection cycles are running.
    Detecting,
    /// Camera setup failed; waiting for the user to retry.
    Error,
}

struct ActiveSession {
    cancel_token: CancellationToken,
    loop_task: tokio::task::JoinHandle<()>,
}

/// Owns the session lifecycle: full setup, teardown, and the user-facing
/// retry action. One scoring-loop instance exists per session, so the
/// one-shot capture flag resets transactionally on restart.
pub struct SessionCoordinator {
    configuration: Configuration,
    detector: Arc<dyn Detector>,
    state: Arc<GameState>,
    position_rx: watch::Receiver<Option<Position>>,
    capture: CaptureService,
    notifications: NotificationHub,
    media: Arc<tokio::sync::Mutex<MediaSourceManager>>,
    session: Option<ActiveSession>,
    phase: SessionPhase,
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator").finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    /// Runs the full setup sequence: stop anything live, acquire the camera,
    /// spawn a fresh scoring loop.
    pub async fn start(&mut self) -> Result<(), AppError> {
        self.stop().await;

        let acquired = {
            let mut media = self.media.lock().await;
            media.acquire(&self.configuration.camera).await
        };
        if let Err(e) = acquired {
            tracing::error!("Error accessing camera: {}", e);
            self.phase = SessionPhase::Error;
            self.notifications.publish(Notification::new(
                "Camera access failed. Please check permissions and try again.",
            ));
            return Err(e.into());
        }
        self.notifications
            .publish(Notification::new("Camera initialized successfully!"));

        let scoring_loop = ScoringLoop::new(
            Arc::clone(&self.detector),
            Arc::clone(&self.media),
            self.position_rx.clone(),
            Arc::clone(&self.state),
            OverlayRenderer::new(&self.configuration.overlay),
            self.capture.clone(),
            self.notifications.clone(),
            &self.configuration.detection,
        );
        let cancel_token = CancellationToken::new();
        let period = Duration::from_millis(self.configuration.detection.cadence_ms);
        let loop_task = tokio::spawn(scoring_loop.run(period, cancel_token.clone()));

        self.session = Some(ActiveSession {
            cancel_token,
            loop_task,
        });
        self.phase = SessionPhase::Detecting;
        Ok(())
    }

    /// Cancels the cycle timer, waits the loop out, releases the media
    /// session. In-flight detection is not aborted; its results are discarded
    /// by the loop's own readiness re-check.
    pub async fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel_token.cancel();
            if let Err(e) = session.loop_task.await {
                tracing::error!("Scoring loop task failed: {}", e);
            }
        }
        self.media.lock().await.release();
        self.phase = SessionPhase::Idle;
    }

    /// The user-facing recovery action for camera failures: re-runs the full
    /// setup sequence (stop, then acquire).
    pub async fn retry(&mut self) -> Result<(), AppError> {
        self.start().await
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub async fn is_video_ready(&self) -> bool {
        self.media.lock().await.is_ready()
    }

    pub fn subscribe_notifications(&self) -> tokio::sync::broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn state(&self) -> Arc<GameState> {
        Arc::clone(&self.state)
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel_token.cancel();
            session.loop_task.abort();
        }
    }
}

pub struct SessionCoordinatorBuilder {
    configuration: Configuration,
    device: Option<Arc<dyn MediaDevice>>,
    detector: Option<Arc<dyn Detector>>,
    state: Option<Arc<GameState>>,
    position_rx: Option<watch::Receiver<Option<Position>>>,
    capture_sink: Option<Arc<dyn BlobSink>>,
}

impl SessionCoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            device: None,
            detector: None,
            state: None,
            position_rx: None,
            capture_sink: None,
        }
    }

    pub fn device(mut self, device: Arc<dyn MediaDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = Some(detector);
        self
    }

    // Defaults to a fresh state container when not provided.
    pub fn state(mut self, state: Arc<GameState>) -> Self {
        self.state = Some(state);
        self
    }

    pub fn positions(mut self, position_rx: watch::Receiver<Option<Position>>) -> Self {
        self.position_rx = Some(position_rx);
        self
    }

    pub fn capture_sink(mut self, sink: Arc<dyn BlobSink>) -> Self {
        self.capture_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<SessionCoordinator, AppError> {
        let device = self
            .device
            .ok_or(AppError::Setup("Media device not set".to_string()))?;
        let detector = self
            .detector
            .ok_or(AppError::Setup("Detector not set".to_string()))?;
        let position_rx = self
            .position_rx
            .ok_or(AppError::Setup("Position source not set".to_string()))?;
        let capture_sink = self.capture_sink.ok_or(AppError::Setup(
            "Capture sink not set".to_string(),
        ))?;
        let state = self
            .state
            .unwrap_or_else(|| Arc::new(GameState::new(self.configuration.game.daily_challenge_goal)));

        Ok(SessionCoordinator {
            media: Arc::new(tokio::sync::Mutex::new(MediaSourceManager::new(device))),
            detector,
            state,
            position_rx,
            capture: CaptureService::new(capture_sink),
            notifications: NotificationHub::default(),
            configuration: self.configuration,
            session: None,
            phase: SessionPhase::Idle,
        })
    }
}
