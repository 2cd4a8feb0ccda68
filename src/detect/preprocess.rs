//! Model input preparation.
//!
//! Detection models take a fixed square input; frames are letterboxed onto
//! that square (aspect-preserving resize, gray padding, centered) and the
//! resulting mapping is kept so box coordinates can be projected back into
//! source-frame space after inference.

use anyhow::{anyhow, Result};
use image::imageops::FilterType;

use crate::frame::{Frame, CHANNELS};

/// Padding value for the letterbox border, one byte per channel.
pub const PAD_GRAY: u8 = 114;

/// Geometry of one letterbox operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub scaled_w: u32,
    pub scaled_h: u32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub target: u32,
}

impl Letterbox {
    /// Map a model-space x coordinate back into source-frame space.
    pub fn unmap_x(&self, x: f32) -> f32 {
        (x - self.pad_x as f32) / self.scale
    }

    /// Map a model-space y coordinate back into source-frame space.
    pub fn unmap_y(&self, y: f32) -> f32 {
        (y - self.pad_y as f32) / self.scale
    }
}

/// Compute the letterbox geometry for a source of `src_w` x `src_h` onto a
/// `target` x `target` canvas. The longer side scales to `target`; the
/// shorter side is centered between equal pads.
pub fn letterbox_params(src_w: u32, src_h: u32, target: u32) -> Letterbox {
    let scale = (target as f32 / src_w as f32).min(target as f32 / src_h as f32);
    let scaled_w = (src_w as f32 * scale).round() as u32;
    let scaled_h = (src_h as f32 * scale).round() as u32;
    Letterbox {
        scale,
        scaled_w,
        scaled_h,
        pad_x: (target - scaled_w) / 2,
        pad_y: (target - scaled_h) / 2,
        target,
    }
}

/// Letterbox a frame onto a square RGB24 canvas of side `target`. Returns
/// the packed canvas bytes and the geometry used to produce them.
pub fn letterbox_frame(frame: &Frame, target: u32) -> Result<(Vec<u8>, Letterbox)> {
    let lb = letterbox_params(frame.width(), frame.height(), target);

    let src = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| anyhow!("frame buffer does not form an RGB image"))?;
    let resized = image::imageops::resize(&src, lb.scaled_w, lb.scaled_h, FilterType::Triangle);
    let raw = resized.as_raw();

    let target_usize = target as usize;
    let row_bytes = lb.scaled_w as usize * CHANNELS;
    let mut canvas = vec![PAD_GRAY; target_usize * target_usize * CHANNELS];
    for row in 0..lb.scaled_h as usize {
        let src_start = row * row_bytes;
        let dst_start =
            ((row + lb.pad_y as usize) * target_usize + lb.pad_x as usize) * CHANNELS;
        canvas[dst_start..dst_start + row_bytes]
            .copy_from_slice(&raw[src_start..src_start + row_bytes]);
    }

    Ok((canvas, lb))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_for_square_source_fill_the_canvas() {
        let lb = letterbox_params(640, 640, 640);
        assert_eq!(lb.scale, 1.0);
        assert_eq!((lb.scaled_w, lb.scaled_h), (640, 640));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 0));
    }

    #[test]
    fn params_for_wide_source_pad_vertically() {
        let lb = letterbox_params(1280, 720, 640);
        assert!((lb.scale - 0.5).abs() < 1e-6);
        assert_eq!((lb.scaled_w, lb.scaled_h), (640, 360));
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 140);
    }

    #[test]
    fn params_for_tall_source_pad_horizontally() {
        let lb = letterbox_params(360, 640, 640);
        assert_eq!(lb.scale, 1.0);
        assert_eq!((lb.scaled_w, lb.scaled_h), (360, 640));
        assert_eq!(lb.pad_x, 140);
        assert_eq!(lb.pad_y, 0);
    }

    #[test]
    fn unmap_inverts_the_forward_mapping() {
        let lb = letterbox_params(1280, 720, 640);
        let src_x = 333.0_f32;
        let src_y = 123.0_f32;
        let model_x = src_x * lb.scale + lb.pad_x as f32;
        let model_y = src_y * lb.scale + lb.pad_y as f32;
        assert!((lb.unmap_x(model_x) - src_x).abs() < 1e-3);
        assert!((lb.unmap_y(model_y) - src_y).abs() < 1e-3);
    }

    #[test]
    fn letterbox_frame_pads_with_gray_and_centers_content() {
        // A solid red 32x16 frame onto a 32x32 canvas: rows 0..8 and 24..32
        // are padding, rows 8..24 are red.
        let frame = Frame::filled(32, 16, [255, 0, 0]);
        let (canvas, lb) = letterbox_frame(&frame, 32).unwrap();
        assert_eq!(lb.pad_y, 8);
        assert_eq!(canvas.len(), 32 * 32 * 3);

        let px = |x: usize, y: usize| {
            let idx = (y * 32 + x) * 3;
            [canvas[idx], canvas[idx + 1], canvas[idx + 2]]
        };
        assert_eq!(px(0, 0), [PAD_GRAY, PAD_GRAY, PAD_GRAY]);
        assert_eq!(px(31, 31), [PAD_GRAY, PAD_GRAY, PAD_GRAY]);
        assert_eq!(px(16, 16), [255, 0, 0]);
    }
}
