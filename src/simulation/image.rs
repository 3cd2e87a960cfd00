//! Decoded sprite pixels.
//!
//! The simulation only ever sees an 8-bit RGBA grid; `load_png` is the thin
//! loader that produces one from disk.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{SimError, SimResult};

/// Row-major RGBA8 pixels, row 0 at the top of the sprite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbaImage {
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> SimResult<Self> {
        if data.len() != width * height * 4 {
            return Err(SimError::Image(format!(
                "expected {} bytes for a {}x{} RGBA image, got {}",
                width * height * 4,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Fully transparent image
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 4],
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let i = (y * self.width + x) * 4;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    pub fn is_opaque(&self, x: usize, y: usize) -> bool {
        self.data[(y * self.width + x) * 4 + 3] != 0
    }

    /// Number of pixels with non-zero alpha
    pub fn opaque_count(&self) -> usize {
        self.data.chunks_exact(4).filter(|p| p[3] != 0).count()
    }
}

/// Decode a PNG into RGBA8, expanding palette, grey and RGB layouts
pub fn load_png(path: impl AsRef<Path>) -> SimResult<RgbaImage> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| SimError::io(path, e))?;

    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);

    let mut reader = decoder
        .read_info()
        .map_err(|e| SimError::Image(format!("{}: {}", path.display(), e)))?;

    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| SimError::Image(format!("{}: {}", path.display(), e)))?;
    buf.truncate(info.buffer_size());

    let (width, height) = (info.width as usize, info.height as usize);
    let data = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => buf
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        png::ColorType::GrayscaleAlpha => buf
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        png::ColorType::Grayscale => buf.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        png::ColorType::Indexed => {
            return Err(SimError::Image(format!(
                "{}: palette was not expanded",
                path.display()
            )))
        }
    };

    RgbaImage::from_rgba(width, height, data)
}

/// Encode RGBA8 pixels as a PNG file
pub fn save_png(path: impl AsRef<Path>, image: &RgbaImage) -> SimResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| SimError::io(path, e))?;

    let mut encoder = png::Encoder::new(
        std::io::BufWriter::new(file),
        image.width as u32,
        image.height as u32,
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut writer = encoder
        .write_header()
        .map_err(|e| SimError::Image(format!("{}: {}", path.display(), e)))?;
    writer
        .write_image_data(&image.data)
        .map_err(|e| SimError::Image(format!("{}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_rejects_short_buffer() {
        assert!(RgbaImage::from_rgba(2, 2, vec![0; 15]).is_err());
        assert!(RgbaImage::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn png_round_trip_keeps_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprite.png");

        let mut img = RgbaImage::blank(3, 2);
        img.set_pixel(0, 0, [255, 0, 0, 255]);
        img.set_pixel(2, 1, [10, 20, 30, 128]);
        save_png(&path, &img).unwrap();

        let loaded = load_png(&path).unwrap();
        assert_eq!(loaded, img);
        assert_eq!(loaded.opaque_count(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_png("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, SimError::Io { .. }));
    }
}
