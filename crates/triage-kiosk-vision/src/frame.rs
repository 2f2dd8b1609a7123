//! Raster frames and face bounding boxes.

use serde::{Deserialize, Serialize};

use crate::detector::{VisionError, VisionResult};

/// Bytes per pixel (packed RGB, 8 bits per channel).
pub const CHANNELS: usize = 3;

/// A single camera frame, packed RGB8, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap raw RGB8 pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> VisionResult<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if width == 0 || height == 0 {
            return Err(VisionError::InvalidFrame(format!(
                "frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        if pixels.len() != expected {
            return Err(VisionError::InvalidFrame(format!(
                "expected {} bytes for {}x{} RGB frame, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A black frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixels: vec![0; width.max(1) as usize * height.max(1) as usize * CHANNELS],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGB value at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        Some([
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ])
    }

    /// Nearest-neighbour resize by `scale` on both axes.
    ///
    /// Output dimensions are rounded and never drop below one pixel.
    pub fn downscale(&self, scale: f64) -> Frame {
        let width = ((self.width as f64 * scale).round() as u32).max(1);
        let height = ((self.height as f64 * scale).round() as u32).max(1);

        let mut pixels = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            let src_y = ((y as f64 / scale) as u32).min(self.height - 1);
            for x in 0..width {
                let src_x = ((x as f64 / scale) as u32).min(self.width - 1);
                let offset = (src_y as usize * self.width as usize + src_x as usize) * CHANNELS;
                pixels.extend_from_slice(&self.pixels[offset..offset + CHANNELS]);
            }
        }

        Frame {
            width,
            height,
            pixels,
        }
    }

    /// Encode as binary PPM (P6), the format used for enrollment artifacts.
    pub fn to_ppm(&self) -> Vec<u8> {
        let header = format!("P6\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }
}

/// Axis-aligned face bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceBox {
    pub fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Map a box found on `small` back onto `full`.
    ///
    /// Each axis uses the real size ratio between the two frames, so scales
    /// that are not reciprocals of an integer restore correctly. The result
    /// is clamped to `full`.
    pub fn restore(&self, small: &Frame, full: &Frame) -> FaceBox {
        let sx = full.width() as f64 / small.width() as f64;
        let sy = full.height() as f64 / small.height() as f64;
        let x = |v: u32| ((v as f64 * sx).round() as u32).min(full.width());
        let y = |v: u32| ((v as f64 * sy).round() as u32).min(full.height());
        FaceBox {
            top: y(self.top),
            right: x(self.right),
            bottom: y(self.bottom),
            left: x(self.left),
        }
    }
}
