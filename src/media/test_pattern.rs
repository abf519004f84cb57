use async_trait::async_trait;
use image::{Rgb, RgbImage};

use crate::error::CameraError;
use crate::media::device::{MediaDevice, MediaStream, StreamConstraints};

/// Synthetic camera for demo runs and hermetic tests: a dim gradient backdrop
/// with a bright square wandering across it, bright enough for the luminance
/// backend to pick up.
pub struct TestPatternDevice;

impl TestPatternDevice {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TestPatternDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevice for TestPatternDevice {
    async fn get_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, CameraError> {
        if constraints.ideal_width == 0 || constraints.ideal_height == 0 {
            return Err(CameraError::Unavailable(
                "constraints unsatisfiable: zero resolution".to_string(),
            ));
        }
        Ok(Box::new(TestPatternStream {
            width: constraints.ideal_width,
            height: constraints.ideal_height,
            tick: 0,
            playing: false,
        }))
    }
}

struct TestPatternStream {
    width: u32,
    height: u32,
    tick: u32,
    playing: bool,
}

#[async_trait]
impl MediaStream for TestPatternStream {
    async fn play(&mut self) -> Result<(), CameraError> {
        self.playing = true;
        Ok(())
    }

    fn dimensions(&self) -> (u32, u32) {
        if self.playing {
            (self.width, self.height)
        } else {
            (0, 0)
        }
    }

    fn frame(&mut self) -> Result<RgbImage, CameraError> {
        if !self.playing {
            return Err(CameraError::NotReady);
        }

        let (width, height) = (self.width, self.height);
        let side = (width.min(height) / 8).max(8);
        let range_x = (width.saturating_sub(side)).max(1);
        let range_y = (height.saturating_sub(side)).max(1);
        let square_x = (self.tick.wrapping_mul(7)) % range_x;
        let square_y = (self.tick.wrapping_mul(5)) % range_y;

        let image = RgbImage::from_fn(width, height, |x, y| {
            let in_square = x >= square_x
                && x < square_x + side
                && y >= square_y
                && y < square_y + side;
            if in_square {
                Rgb([255, 255, 255])
            } else {
                // Dim gradient, well under any detection threshold.
                let shade = ((x + y) % 64) as u8;
                Rgb([20 + shade, 30 + shade / 2, 25 + shade / 3])
            }
        });

        self.tick = self.tick.wrapping_add(1);
        Ok(image)
    }

    fn stop(&mut self) {
        self.playing = false;
    }
}
