use async_trait::async_trait;
use image::RgbImage;

use super::{BoundingBox, Detection, Detector};
use crate::common::Frame;
use crate::error::DetectorError;

/// Deterministic built-in backend: reports the brightest coarse-grid cell of
/// the frame as a single detection when it clears the luminance threshold.
/// It exists so the binary and the tests run hermetically; real models plug
/// in behind the same trait.
pub struct LuminanceDetector {
    /// Edge length of the sampling grid cells, in pixels.
    pub cell_size: u32,
    /// Mean luminance a cell must reach to count as an object.
    pub threshold: f32,
    /// Label reported for a hit.
    pub label: String,
}

impl LuminanceDetector {
    pub fn new() -> Self {
        Self {
            cell_size: 32,
            threshold: 200.0,
            label: "bottle".to_string(),
        }
    }

    fn luminance(rgb: &RgbImage, x: u32, y: u32) -> f32 {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        (0.2126 * r as f32) + (0.7152 * g as f32) + (0.0722 * b as f32)
    }

    fn mean_cell_luminance(rgb: &RgbImage, cx: u32, cy: u32, cell: u32) -> f32 {
        let (width, height) = rgb.dimensions();
        let mut sum = 0.0;
        let mut count = 0u32;
        // Sampling every other pixel is plenty at this granularity.
        for y in (cy..(cy + cell).min(height)).step_by(2) {
            for x in (cx..(cx + cell).min(width)).step_by(2) {
                sum += Self::luminance(rgb, x, y);
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}

impl Default for LuminanceDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Detector for LuminanceDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, DetectorError> {
        let rgb = frame.image();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::DetectionFailed(
                "frame has zero dimensions".to_string(),
            ));
        }

        let cell = self.cell_size.min(width).min(height).max(1);
        let mut best: Option<(u32, u32, f32)> = None;
        for cy in (0..height).step_by(cell as usize) {
            for cx in (0..width).step_by(cell as usize) {
                let mean = Self::mean_cell_luminance(rgb, cx, cy, cell);
                if best.map(|(_, _, b)| mean > b).unwrap_or(true) {
                    best = Some((cx, cy, mean));
                }
            }
        }

        let mut detections = Vec::new();
        if let Some((cx, cy, mean)) = best {
            if mean >= self.threshold {
                detections.push(Detection {
                    label: self.label.clone(),
                    confidence: (mean / 255.0).clamp(0.0, 1.0),
                    bbox: BoundingBox {
                        x: cx as f32,
                        y: cy as f32,
                        width: cell as f32,
                        height: cell as f32,
                    },
                });
            }
        }
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::Rgb;
    use uuid::Uuid;

    fn frame_of(image: RgbImage) -> Frame {
        Frame::new(Uuid::new_v4(), image, Utc::now())
    }

    #[tokio::test]
    async fn dark_frames_produce_no_detections() {
        let detector = LuminanceDetector::new();
        let image = RgbImage::from_pixel(64, 64, Rgb([10, 10, 10]));
        let detections = detector.detect(&frame_of(image)).await.unwrap();
        assert!(detections.is_empty());
    }

    #[tokio::test]
    async fn a_bright_region_is_reported_with_its_cell_bbox() {
        let detector = LuminanceDetector::new();
        let mut image = RgbImage::from_pixel(64, 64, Rgb([10, 10, 10]));
        for y in 32..64 {
            for x in 32..64 {
                image.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let detections = detector.detect(&frame_of(image)).await.unwrap();
        assert_eq!(detections.len(), 1);
        let detection = &detections[0];
        assert_eq!(detection.label, "bottle");
        assert!(detection.confidence > 0.9);
        assert_eq!(detection.bbox.x, 32.0);
        assert_eq!(detection.bbox.y, 32.0);
    }
}
