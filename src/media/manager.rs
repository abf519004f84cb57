use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::common::Frame;
use crate::error::CameraError;
use crate::media::device::{MediaDevice, MediaStream, StreamConstraints};

/// Exactly one of these is alive at a time; it owns the underlying stream
/// handle and is released before any re-acquisition.
struct CameraSession {
    stream: Box<dyn MediaStream>,
    session_id: Uuid,
    dimensions: (u32, u32),
}

/// Acquires and releases the live camera stream. Readiness only becomes true
/// once the stream reports playback with non-zero dimensions, so detection
/// never runs against a stream without metadata.
pub struct MediaSourceManager {
    device: Arc<dyn MediaDevice>,
    session: Option<CameraSession>,
    ready: bool,
}

impl MediaSourceManager {
    pub fn new(device: Arc<dyn MediaDevice>) -> Self {
        Self {
            device,
            session: None,
            ready: false,
        }
    }

    /// Requests a stream matching the constraints. Teardown always precedes
    /// acquisition, keeping the at-most-one-session invariant.
    pub async fn acquire(&mut self, constraints: &StreamConstraints) -> Result<(), CameraError> {
        self.release();

        let mut stream = self.device.get_stream(constraints).await?;
        stream.play().await?;

        let dimensions = stream.dimensions();
        if dimensions.0 == 0 || dimensions.1 == 0 {
            stream.stop();
            return Err(CameraError::Unavailable(
                "stream started with zero dimensions".to_string(),
            ));
        }

        let session_id = Uuid::new_v4();
        tracing::info!(
            "Camera session {} ready at {}x{}",
            session_id,
            dimensions.0,
            dimensions.1
        );
        self.session = Some(CameraSession {
            stream,
            session_id,
            dimensions,
        });
        self.ready = true;
        Ok(())
    }

    /// Stops all underlying tracks and clears readiness. Safe to call when
    /// nothing is active.
    pub fn release(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stream.stop();
            tracing::info!("Camera session {} released", session.session_id);
        }
        self.ready = false;
    }

    pub fn is_ready(&self) -> bool {
        self.ready && self.session.is_some()
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.session.as_ref().map(|session| session.dimensions)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|session| session.session_id)
    }

    /// Pulls the current video image as a frame tagged with this session.
    pub fn frame(&mut self) -> Result<Frame, CameraError> {
        if !self.ready {
            return Err(CameraError::NotReady);
        }
        let session = self.session.as_mut().ok_or(CameraError::NotReady)?;
        let image = session.stream.frame()?;
        Ok(Frame::new(session.session_id, image, Utc::now()))
    }
}

impl Drop for MediaSourceManager {
    fn drop(&mut self) {
        self.release();
    }
}
