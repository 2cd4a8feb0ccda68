//! Decoded frame buffer.
//!
//! A `Frame` is one decoded video frame as packed RGB24:
//! - Produced by a video source, one per pipeline iteration
//! - Mutated in place by the annotation layer (boxes, labels)
//! - Handed by reference to the sink and the live display
//!
//! Frames do not outlive the iteration that produced them; the pipeline
//! keeps no cross-frame pixel state.

use anyhow::{bail, Context, Result};

/// Bytes per pixel for packed RGB24.
pub const CHANNELS: usize = 3;

/// One decoded frame, packed RGB24, row-major, no padding between rows.
#[derive(Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an existing pixel buffer. The buffer length must be exactly
    /// `width * height * 3`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            bail!(
                "frame buffer length {} does not match {}x{} RGB24 ({} bytes)",
                data.len(),
                width,
                height,
                expected
            );
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Allocate a frame filled with a single color.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * CHANNELS);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Read one pixel. Panics if `(x, y)` is outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Write one pixel. Coordinates outside the frame are ignored, so
    /// drawing code may clip against the edges without pre-checking.
    pub fn put_rgb(&mut self, x: i32, y: i32, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[idx..idx + CHANNELS].copy_from_slice(&rgb);
    }

    /// Encode the frame as JPEG for the live display. `quality` is 1..=100.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
        encoder
            .encode(
                &self.data,
                self.width,
                self.height,
                image::ExtendedColorType::Rgb8,
            )
            .context("jpeg encode of live frame failed")?;
        Ok(out)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_length() {
        assert!(Frame::new(4, 4, vec![0u8; 4 * 4 * 3]).is_ok());
        assert!(Frame::new(4, 4, vec![0u8; 4 * 4 * 3 - 1]).is_err());
        assert!(Frame::new(4, 4, vec![0u8; 4 * 4 * 4]).is_err());
    }

    #[test]
    fn filled_sets_every_pixel() {
        let frame = Frame::filled(3, 2, [10, 20, 30]);
        for y in 0..2 {
            for x in 0..3 {
                assert_eq!(frame.pixel(x, y), [10, 20, 30]);
            }
        }
    }

    #[test]
    fn put_rgb_ignores_out_of_bounds() {
        let mut frame = Frame::filled(4, 4, [0, 0, 0]);
        frame.put_rgb(-1, 0, [255, 0, 0]);
        frame.put_rgb(0, -1, [255, 0, 0]);
        frame.put_rgb(4, 0, [255, 0, 0]);
        frame.put_rgb(0, 4, [255, 0, 0]);
        assert!(frame.data().iter().all(|&b| b == 0));

        frame.put_rgb(2, 3, [1, 2, 3]);
        assert_eq!(frame.pixel(2, 3), [1, 2, 3]);
    }

    #[test]
    fn to_jpeg_produces_jpeg_magic() {
        let frame = Frame::filled(16, 16, [200, 100, 50]);
        let jpeg = frame.to_jpeg(80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }
}
