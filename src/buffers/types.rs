// SPDX-License-Identifier: GPL-3.0-only

//! Picture-buffer shape and per-buffer metadata

use crate::constants::{DEFAULT_PICTURE_HEIGHT, DEFAULT_PICTURE_WIDTH};
use serde::{Deserialize, Serialize};

/// Kind of picture data carried by a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PictureKind {
    /// 8-bit raw Bayer data
    Raw8,
    /// Raw Bayer data stored in 16-bit words
    Raw16,
    /// YCbCr 4:2:0
    #[default]
    YCbCr420,
    /// YCbCr 4:2:2
    YCbCr422,
    /// Packed 24-bit RGB
    Rgb888,
}

/// Memory layout of the picture planes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PictureLayout {
    /// All components interleaved in one plane
    Interleaved,
    /// Luma plane followed by one interleaved chroma plane
    #[default]
    SemiPlanar,
    /// One plane per component
    Planar,
}

/// Shape of the payload every buffer of a pool is sized for
///
/// Validating the (kind, layout) combination happens before a pool is
/// configured; the pool only uses the shape to size its storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PictureFormat {
    pub kind: PictureKind,
    pub layout: PictureLayout,
    pub width: u32,
    pub height: u32,
}

impl PictureFormat {
    pub fn new(kind: PictureKind, layout: PictureLayout, width: u32, height: u32) -> Self {
        Self {
            kind,
            layout,
            width,
            height,
        }
    }

    /// Number of payload bytes one picture of this format occupies
    pub fn frame_size(&self) -> usize {
        let pixels = self.width as usize * self.height as usize;
        match self.kind {
            PictureKind::Raw8 => pixels,
            PictureKind::Raw16 => pixels * 2,
            PictureKind::YCbCr420 => pixels * 3 / 2,
            PictureKind::YCbCr422 => pixels * 2,
            PictureKind::Rgb888 => pixels * 3,
        }
    }
}

impl Default for PictureFormat {
    fn default() -> Self {
        Self::new(
            PictureKind::default(),
            PictureLayout::default(),
            DEFAULT_PICTURE_WIDTH,
            DEFAULT_PICTURE_HEIGHT,
        )
    }
}

impl std::fmt::Display for PictureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} {:?}/{:?}",
            self.width, self.height, self.kind, self.layout
        )
    }
}

/// Metadata travelling with a buffer's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferMetadata {
    /// Capture time in microseconds, stamped when the buffer is delivered
    pub timestamp_us: u64,
    /// Frame sequence number assigned by the producer
    pub sequence: u64,
    /// Shape of the payload
    pub format: PictureFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sizes() {
        let yuv = PictureFormat::new(PictureKind::YCbCr420, PictureLayout::SemiPlanar, 4, 4);
        assert_eq!(yuv.frame_size(), 24);

        let raw = PictureFormat::new(PictureKind::Raw16, PictureLayout::Interleaved, 4, 4);
        assert_eq!(raw.frame_size(), 32);

        let rgb = PictureFormat::new(PictureKind::Rgb888, PictureLayout::Interleaved, 2, 2);
        assert_eq!(rgb.frame_size(), 12);
    }

    #[test]
    fn test_default_format_is_vga_nv12() {
        let format = PictureFormat::default();
        assert_eq!(format.width, 640);
        assert_eq!(format.height, 480);
        assert_eq!(format.layout, PictureLayout::SemiPlanar);
    }
}
