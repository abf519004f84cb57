use chrono::{DateTime, Utc};
use image::RgbImage;
use serde::Serialize;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use crate::common::Position;
use crate::error::CaptureError;

/// What gets written next to the evidence image.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureMetadata {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
    pub captured_at: DateTime<Utc>,
}

impl CaptureMetadata {
    pub fn new(label: &str, position: Position) -> Self {
        Self {
            label: label.to_string(),
            latitude: position.latitude,
            longitude: position.longitude,
            captured_at: Utc::now(),
        }
    }
}

/// Persistence seam for captured evidence. An uploader would implement this
/// the same way the file sink does.
pub trait BlobSink: Send + Sync {
    fn save_blob(&self, bytes: &[u8], filename: &str) -> Result<(), CaptureError>;
}

pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BlobSink for FileSink {
    fn save_blob(&self, bytes: &[u8], filename: &str) -> Result<(), CaptureError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| CaptureError::Io(e, filename.to_string()))?;
        let path = self.dir.join(filename);
        std::fs::write(&path, bytes).map_err(|e| CaptureError::Io(e, filename.to_string()))?;
        tracing::info!("Saved capture {}", path.display());
        Ok(())
    }
}

/// Snapshots the current canvas composite to the persistence sink without
/// ever blocking the scoring loop: encoding and I/O run on a blocking task,
/// failures are logged and go no further.
#[derive(Clone)]
pub struct CaptureService {
    sink: Arc<dyn BlobSink>,
}

impl CaptureService {
    pub fn new(sink: Arc<dyn BlobSink>) -> Self {
        Self { sink }
    }

    pub fn capture(&self, canvas: &RgbImage, metadata: CaptureMetadata) {
        let sink = Arc::clone(&self.sink);
        let canvas = canvas.clone();
        tokio::spawn(async move {
            let result =
                tokio::task::spawn_blocking(move || persist(sink.as_ref(), &canvas, &metadata))
                    .await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Error capturing frame: {}", e),
                Err(e) => tracing::error!("Capture task failed: {}", e),
            }
        });
    }
}

fn persist(
    sink: &dyn BlobSink,
    canvas: &RgbImage,
    metadata: &CaptureMetadata,
) -> Result<(), CaptureError> {
    let stem = format!("captured_frame_{}", metadata.captured_at.timestamp_millis());

    let mut png = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;
    sink.save_blob(&png, &format!("{stem}.png"))?;

    let json = serde_json::to_vec_pretty(metadata)?;
    sink.save_blob(&json, &format!("{stem}.json"))?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// In-memory sink shared by the capture, scoring and coordinator tests.
    pub(crate) struct MemorySink {
        pub blobs: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl MemorySink {
        pub(crate) fn new() -> Self {
            Self {
                blobs: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn count(&self) -> usize {
            self.blobs.lock().unwrap().len()
        }
    }

    impl BlobSink for MemorySink {
        fn save_blob(&self, bytes: &[u8], filename: &str) -> Result<(), CaptureError> {
            self.blobs
                .lock()
                .unwrap()
                .push((filename.to_string(), bytes.to_vec()));
            Ok(())
        }
    }
}
