use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::common::Frame;
use crate::config::OverlaySettings;
use crate::detect::Detection;

/// Nominal design canvas the marker coordinates are authored against; actual
/// frames scale proportionally.
const DESIGN_CANVAS_SIZE: f32 = 400.0;

const MARKER_RADIUS: f32 = 20.0;
const MARKER_FILL: Rgb<u8> = Rgb([255, 179, 107]);
const MARKER_TEXT: Rgb<u8> = Rgb([99, 72, 50]);
const MARKER_FONT_SIZE: f32 = 14.0;

const BOX_STROKE: Rgb<u8> = Rgb([166, 127, 92]);
const BOX_LABEL: Rgb<u8> = Rgb([99, 72, 50]);
const BOX_FONT_SIZE: f32 = 16.0;

/// Fixed decorative markers. Purely cosmetic gamification flourish; never an
/// input to detection or scoring.
#[derive(Debug, Clone, Copy)]
pub struct VirtualMarker {
    pub label: &'static str,
    pub points: u64,
    pub x: f32,
    pub y: f32,
}

pub const VIRTUAL_MARKERS: [VirtualMarker; 3] = [
    VirtualMarker {
        label: "bottle",
        points: 10,
        x: 100.0,
        y: 200.0,
    },
    VirtualMarker {
        label: "can",
        points: 15,
        x: 300.0,
        y: 150.0,
    },
    VirtualMarker {
        label: "paper",
        points: 5,
        x: 200.0,
        y: 300.0,
    },
];

/// Stateless redraw of the full overlay for one cycle. Holds only immutable
/// configuration (font, marker toggle); the canvas belongs to the caller.
pub struct OverlayRenderer {
    font: Option<FontVec>,
    draw_virtual_markers: bool,
}

impl OverlayRenderer {
    pub fn new(settings: &OverlaySettings) -> Self {
        let font = settings.font_path.as_ref().and_then(|path| {
            match std::fs::read(path) {
                Ok(bytes) => match FontVec::try_from_vec(bytes) {
                    Ok(font) => Some(font),
                    Err(e) => {
                        tracing::warn!("Unusable overlay font {}: {}", path.display(), e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read overlay font {}: {}", path.display(), e);
                    None
                }
            }
        });
        Self {
            font,
            draw_virtual_markers: settings.draw_virtual_markers,
        }
    }

    /// Redraws everything for one cycle: resizes the canvas to the frame when
    /// they differ, blits the frame (clearing the previous cycle's drawing),
    /// draws the decorative markers, then every raw detection on top,
    /// recognized or not.
    pub fn render(&self, canvas: &mut RgbImage, frame: &Frame, detections: &[Detection]) {
        let (width, height) = frame.dimensions();
        if canvas.dimensions() != (width, height) {
            *canvas = RgbImage::new(width, height);
        }
        canvas.copy_from_slice(frame.image().as_raw());

        if self.draw_virtual_markers {
            self.draw_markers(canvas);
        }
        for detection in detections {
            self.draw_detection(canvas, detection);
        }
    }

    fn draw_markers(&self, canvas: &mut RgbImage) {
        let (width, height) = canvas.dimensions();
        let scale_x = width as f32 / DESIGN_CANVAS_SIZE;
        let scale_y = height as f32 / DESIGN_CANVAS_SIZE;
        let scale_min = scale_x.min(scale_y);

        for marker in &VIRTUAL_MARKERS {
            let cx = marker.x * scale_x;
            let cy = marker.y * scale_y;
            let radius = (MARKER_RADIUS * scale_min).max(1.0);
            draw_filled_circle_mut(
                canvas,
                (cx as i32, cy as i32),
                radius as i32,
                MARKER_FILL,
            );
            if let Some(font) = &self.font {
                draw_text_mut(
                    canvas,
                    MARKER_TEXT,
                    (cx - 20.0 * scale_x) as i32,
                    (cy - 25.0 * scale_y) as i32,
                    PxScale::from((MARKER_FONT_SIZE * scale_min).max(6.0)),
                    font,
                    marker.label,
                );
            }
        }
    }

    fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
        let (width, height) = canvas.dimensions();
        let bbox = &detection.bbox;

        let x = (bbox.x as i32).clamp(0, width as i32 - 1);
        let y = (bbox.y as i32).clamp(0, height as i32 - 1);
        let box_width = (bbox.width as i32).min(width as i32 - x);
        let box_height = (bbox.height as i32).min(height as i32 - y);
        if box_width < 2 || box_height < 2 {
            return;
        }

        // 2px stroke: an outer rect and one inset by a pixel.
        draw_hollow_rect_mut(
            canvas,
            Rect::at(x, y).of_size(box_width as u32, box_height as u32),
            BOX_STROKE,
        );
        if box_width > 2 && box_height > 2 {
            draw_hollow_rect_mut(
                canvas,
                Rect::at(x + 1, y + 1).of_size(box_width as u32 - 2, box_height as u32 - 2),
                BOX_STROKE,
            );
        }

        if let Some(font) = &self.font {
            let label = format!(
                "{} ({}%)",
                detection.label,
                (detection.confidence * 100.0).round() as i32
            );
            // Above the box when there is room, inside-below otherwise.
            let label_y = if y > 20 { y - 21 } else { y + box_height + 4 };
            draw_text_mut(
                canvas,
                BOX_LABEL,
                x,
                label_y.clamp(0, height as i32 - 1),
                PxScale::from(BOX_FONT_SIZE),
                font,
                &label,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use chrono::Utc;
    use uuid::Uuid;

    fn renderer(markers: bool) -> OverlayRenderer {
        OverlayRenderer::new(&OverlaySettings {
            font_path: None,
            draw_virtual_markers: markers,
        })
    }

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::new(Uuid::new_v4(), RgbImage::new(width, height), Utc::now())
    }

    fn detection(x: f32, y: f32, width: f32, height: f32) -> Detection {
        Detection {
            label: "rock".to_string(),
            confidence: 0.5,
            bbox: BoundingBox {
                x,
                y,
                width,
                height,
            },
        }
    }

    #[test]
    fn canvas_is_resized_to_the_frame_before_drawing() {
        let renderer = renderer(false);
        let mut canvas = RgbImage::new(0, 0);
        renderer.render(&mut canvas, &black_frame(64, 48), &[]);
        assert_eq!(canvas.dimensions(), (64, 48));

        renderer.render(&mut canvas, &black_frame(32, 32), &[]);
        assert_eq!(canvas.dimensions(), (32, 32));
    }

    #[test]
    fn markers_are_drawn_at_scaled_positions_when_enabled() {
        let mut canvas = RgbImage::new(0, 0);
        let frame = black_frame(400, 400);

        renderer(true).render(&mut canvas, &frame, &[]);
        // Scale 1:1 on the design canvas, so the first marker sits at (100, 200).
        assert_eq!(*canvas.get_pixel(100, 200), MARKER_FILL);

        renderer(false).render(&mut canvas, &frame, &[]);
        assert_eq!(*canvas.get_pixel(100, 200), Rgb([0, 0, 0]));
    }

    #[test]
    fn every_raw_detection_is_drawn_and_previous_drawing_is_cleared() {
        let renderer = renderer(false);
        let mut canvas = RgbImage::new(0, 0);
        let frame = black_frame(64, 64);

        renderer.render(&mut canvas, &frame, &[detection(10.0, 30.0, 20.0, 20.0)]);
        assert_eq!(*canvas.get_pixel(10, 30), BOX_STROKE);

        // A redraw with no detections leaves no stale boxes behind.
        renderer.render(&mut canvas, &frame, &[]);
        assert_eq!(*canvas.get_pixel(10, 30), Rgb([0, 0, 0]));
    }
}
