//! Framebuffer panel output.
//!
//! Views draw into an in-memory [`FrameBuffer`] through the
//! `embedded-graphics` [`DrawTarget`] trait, and [`FbPanel`] pushes the
//! finished frame to a Linux fbdev device in one write. The device
//! geometry comes from the config, not from the kernel.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;

use embedded_graphics::pixelcolor::{IntoStorage, Rgb565};
use embedded_graphics::prelude::*;

use crate::config::DisplayConfig;

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("could not open framebuffer {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("framebuffer write failed")]
    Write(#[from] io::Error),

    #[error("unsupported framebuffer depth {bpp}, expected 16 or 32")]
    Depth { bpp: u8 },
}

/// RGB565 frame in memory, row major.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Raw pixel words in row major order.
    pub fn words(&self) -> impl Iterator<Item = u16> + '_ {
        self.pixels.iter().copied()
    }

    #[cfg(test)]
    fn pixel(&self, x: u32, y: u32) -> u16 {
        self.pixels[(y * self.width + x) as usize]
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb565;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Out-of-frame pixels are clipped, not an error.
            if point.x >= 0 && point.y >= 0 && (point.x as u32) < self.width && (point.y as u32) < self.height {
                let index = point.y as usize * self.width as usize + point.x as usize;
                self.pixels[index] = color.into_storage();
            }
        }
        Ok(())
    }
}

/// Widens one RGB565 word to little endian XRGB8888. The high channel
/// bits are replicated into the low ones so full-scale stays full-scale.
fn xrgb_bytes(word: u16) -> [u8; 4] {
    let r5 = ((word >> 11) & 0x1f) as u8;
    let g6 = ((word >> 5) & 0x3f) as u8;
    let b5 = (word & 0x1f) as u8;
    [
        b5 << 3 | b5 >> 2,
        g6 << 2 | g6 >> 4,
        r5 << 3 | r5 >> 2,
        0,
    ]
}

/// An opened fbdev device.
pub struct FbPanel {
    file: File,
    bpp: u8,
    scratch: Vec<u8>,
}

impl FbPanel {
    pub fn open(config: &DisplayConfig) -> Result<Self, PanelError> {
        if config.bpp != 16 && config.bpp != 32 {
            return Err(PanelError::Depth { bpp: config.bpp });
        }
        let file = OpenOptions::new()
            .write(true)
            .open(&config.device)
            .map_err(|source| PanelError::Open {
                path: config.device.clone(),
                source,
            })?;
        Ok(Self {
            file,
            bpp: config.bpp,
            scratch: Vec::new(),
        })
    }

    /// Pushes the whole frame from offset zero. 16 bpp devices take the
    /// RGB565 words directly, 32 bpp devices take each word widened to
    /// XRGB8888.
    pub fn flush(&mut self, frame: &FrameBuffer) -> Result<(), PanelError> {
        self.scratch.clear();
        if self.bpp == 16 {
            for word in frame.words() {
                self.scratch.extend_from_slice(&word.to_le_bytes());
            }
        } else {
            for word in frame.words() {
                self.scratch.extend_from_slice(&xrgb_bytes(word));
            }
        }
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&self.scratch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::pixelcolor::RgbColor;
    use std::io::Read;

    fn panel_config(device: PathBuf, bpp: u8) -> DisplayConfig {
        DisplayConfig {
            device,
            width: 4,
            height: 2,
            bpp,
        }
    }

    #[test]
    fn draws_clip_to_the_frame() {
        let mut frame = FrameBuffer::new(4, 2);
        frame
            .draw_iter([
                Pixel(Point::new(0, 0), Rgb565::RED),
                Pixel(Point::new(3, 1), Rgb565::GREEN),
                Pixel(Point::new(-1, 0), Rgb565::WHITE),
                Pixel(Point::new(4, 0), Rgb565::WHITE),
                Pixel(Point::new(0, 2), Rgb565::WHITE),
            ])
            .unwrap();
        assert_eq!(frame.pixel(0, 0), Rgb565::RED.into_storage());
        assert_eq!(frame.pixel(3, 1), Rgb565::GREEN.into_storage());
        assert_eq!(frame.pixel(1, 0), 0);
    }

    #[test]
    fn xrgb_keeps_full_scale_channels() {
        assert_eq!(xrgb_bytes(0xffff), [0xff, 0xff, 0xff, 0x00]);
        assert_eq!(xrgb_bytes(0x0000), [0x00, 0x00, 0x00, 0x00]);
        // Pure red in 565 widens to pure red in 888.
        assert_eq!(xrgb_bytes(0xf800), [0x00, 0x00, 0xff, 0x00]);
        assert_eq!(xrgb_bytes(0x07e0), [0x00, 0xff, 0x00, 0x00]);
        assert_eq!(xrgb_bytes(0x001f), [0xff, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn flush_writes_little_endian_565() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut panel = FbPanel::open(&panel_config(file.path().to_path_buf(), 16)).unwrap();

        let mut frame = FrameBuffer::new(4, 2);
        frame.draw_iter([Pixel(Point::new(0, 0), Rgb565::RED)]).unwrap();
        panel.flush(&frame).unwrap();
        // Flushing again must overwrite, not append.
        panel.flush(&frame).unwrap();

        let mut written = Vec::new();
        File::open(file.path()).unwrap().read_to_end(&mut written).unwrap();
        assert_eq!(written.len(), 4 * 2 * 2);
        assert_eq!(&written[0..2], &0xf800u16.to_le_bytes());
        assert_eq!(&written[2..4], &[0, 0]);
    }

    #[test]
    fn flush_widens_for_32bpp() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut panel = FbPanel::open(&panel_config(file.path().to_path_buf(), 32)).unwrap();

        let mut frame = FrameBuffer::new(4, 2);
        frame.draw_iter([Pixel(Point::new(1, 0), Rgb565::BLUE)]).unwrap();
        panel.flush(&frame).unwrap();

        let mut written = Vec::new();
        File::open(file.path()).unwrap().read_to_end(&mut written).unwrap();
        assert_eq!(written.len(), 4 * 2 * 4);
        assert_eq!(&written[4..8], &[0xff, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn odd_depths_are_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        match FbPanel::open(&panel_config(file.path().to_path_buf(), 24)) {
            Err(PanelError::Depth { bpp: 24 }) => {}
            other => panic!("expected Depth error, got {:?}", other.map(|_| ())),
        }
    }
}
