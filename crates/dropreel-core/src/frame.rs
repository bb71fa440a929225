//! Frame buffers handed from the renderer to the capture stage.
//!
//! Frames are packed, tightly strided pixel arrays so they can be written to the
//! encoder's raw-video input without conversion.

use serde::{Deserialize, Serialize};

/// Packed pixel formats accepted by the capture stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit RGB (24 bits per pixel)
    #[default]
    Rgb24,
    /// 8-bit RGBA (32 bits per pixel)
    Rgba8,
    /// 8-bit BGRA, the layout most window surfaces hand back
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb24 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }

    /// Total bytes of a tightly packed frame.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }

    /// Name of the format on the encoder's raw-video input.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Rgb24 => "rgb24",
            Self::Rgba8 => "rgba",
            Self::Bgra8 => "bgra",
        }
    }
}

/// A rendered frame in CPU memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Row-major pixel data, `width * bytes_per_pixel` bytes per row
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// Black frame of the given dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            format,
            width,
            height,
            data: vec![0u8; format.frame_size(width, height)],
        }
    }

    /// Wrap pixel data produced elsewhere. The length is not checked here; the
    /// capture stage validates it per frame.
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            format,
            width,
            height,
            data,
        }
    }

    /// Whether the pixel data length agrees with the declared dimensions.
    pub fn is_well_formed(&self) -> bool {
        !self.data.is_empty() && self.data.len() == self.format.frame_size(self.width, self.height)
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * self.format.bytes_per_pixel();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let stride = self.width as usize * self.format.bytes_per_pixel();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    /// Paint every pixel with one RGB color.
    pub fn fill(&mut self, rgb: [u8; 3]) {
        let pixel = self.encode(rgb);
        for chunk in self.data.chunks_exact_mut(self.format.bytes_per_pixel()) {
            chunk.copy_from_slice(&pixel[..chunk.len()]);
        }
    }

    /// Paint an axis-aligned rectangle, clipped to the frame.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, rgb: [u8; 3]) {
        let pixel = self.encode(rgb);
        let bpp = self.format.bytes_per_pixel();
        let x_end = x.saturating_add(w).min(self.width);
        let y_end = y.saturating_add(h).min(self.height);
        for row_y in y.min(self.height)..y_end {
            let row = self.row_mut(row_y);
            for col in x.min(x_end)..x_end {
                let i = col as usize * bpp;
                row[i..i + bpp].copy_from_slice(&pixel[..bpp]);
            }
        }
    }

    /// Color bars, for dry runs without a renderer.
    pub fn test_pattern(width: u32, height: u32) -> Self {
        const BARS: [[u8; 3]; 8] = [
            [255, 255, 255],
            [255, 255, 0],
            [0, 255, 255],
            [0, 255, 0],
            [255, 0, 255],
            [255, 0, 0],
            [0, 0, 255],
            [0, 0, 0],
        ];
        let mut frame = Self::new(width, height, PixelFormat::Rgb24);
        let bar_width = (width / 8).max(1);
        for (i, color) in BARS.iter().enumerate() {
            frame.fill_rect(i as u32 * bar_width, 0, bar_width, height, *color);
        }
        frame
    }

    fn encode(&self, [r, g, b]: [u8; 3]) -> [u8; 4] {
        match self.format {
            PixelFormat::Rgb24 => [r, g, b, 0],
            PixelFormat::Rgba8 => [r, g, b, 255],
            PixelFormat::Bgra8 => [b, g, r, 255],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb24_frame_size() {
        let frame = FrameBuffer::new(1080, 1920, PixelFormat::Rgb24);
        assert_eq!(frame.data.len(), 1080 * 1920 * 3);
        assert!(frame.is_well_formed());
    }

    #[test]
    fn test_truncated_frame_is_not_well_formed() {
        let frame = FrameBuffer::from_raw(4, 4, PixelFormat::Rgba8, vec![0; 60]);
        assert!(!frame.is_well_formed());
        let empty = FrameBuffer::from_raw(0, 0, PixelFormat::Rgb24, Vec::new());
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn test_test_pattern() {
        let frame = FrameBuffer::test_pattern(64, 8);
        assert_eq!(frame.row(0)[0..3], [255, 255, 255]);
        // Last bar is black
        assert_eq!(frame.row(7)[63 * 3..64 * 3], [0, 0, 0]);
    }

    #[test]
    fn test_fill_rect_clips_and_swizzles() {
        let mut frame = FrameBuffer::new(4, 4, PixelFormat::Bgra8);
        frame.fill_rect(2, 2, 10, 10, [10, 20, 30]);
        assert_eq!(frame.row(3)[12..16], [30, 20, 10, 255]);
        assert_eq!(frame.row(0)[0..4], [0, 0, 0, 0]);
    }
}
