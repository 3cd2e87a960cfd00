//! CPU rasteriser and PNG frame recorder
//!
//! Draws each occupied node of `state[tick]` as a solid square in its source
//! colour and writes numbered frames to disk. Used by `--record` in both the
//! headless runner and the viewer.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{SimError, SimResult};
use crate::simulation::body::SoftBody;
use crate::simulation::image::{save_png, RgbaImage};
use crate::simulation::states::NVec2;

const BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Output window and camera settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub width: u32,
    pub height: u32,
    pub scale: f32, // screen pixels per lattice unit
    pub track: bool, // follow the centroid
}

impl View {
    /// Lattice point the view is centred on
    pub fn center(&self, body: &SoftBody) -> NVec2 {
        if self.track {
            body.centroid().position
        } else {
            let f = body.field();
            NVec2::new((f.width() as f32 - 1.0) * 0.5, (f.height() as f32 - 1.0) * 0.5)
        }
    }

    /// Lattice position to screen pixel (y down), relative to `center`
    pub fn to_screen(&self, p: NVec2, center: NVec2) -> NVec2 {
        (p - center) * self.scale + NVec2::new(self.width as f32 * 0.5, self.height as f32 * 0.5)
    }
}

/// Render the current state into an RGBA image of the view's size
pub fn rasterize(body: &SoftBody, view: &View) -> RgbaImage {
    let (w, h) = (view.width as usize, view.height as usize);
    let mut img = RgbaImage::blank(w, h);
    for px in img.data.chunks_exact_mut(4) {
        px.copy_from_slice(&BACKGROUND);
    }

    let center = view.center(body);
    let size = view.scale.max(1.0);
    let half = size * 0.5;
    let field = body.field();

    for (i, s) in body.current().iter().enumerate() {
        if !field.role(i).is_occupied() {
            continue;
        }
        let [r, g, b] = *field.colors.at(i);
        let c = view.to_screen(s.position, center);

        let x0 = (c.x - half).round().max(0.0) as usize;
        let y0 = (c.y - half).round().max(0.0) as usize;
        let x1 = ((c.x + half).round().max(0.0) as usize).min(w);
        let y1 = ((c.y + half).round().max(0.0) as usize).min(h);

        for y in y0..y1 {
            for x in x0..x1 {
                img.set_pixel(x, y, [r, g, b, 255]);
            }
        }
    }
    img
}

/// Writes `frame_00000.png`, `frame_00001.png`, ... into one directory
pub struct FrameRecorder {
    dir: PathBuf,
    next: u64,
}

impl FrameRecorder {
    pub fn new(dir: impl AsRef<Path>) -> SimResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| SimError::io(&dir, e))?;
        info!("recording frames to {}", dir.display());
        Ok(Self { dir, next: 0 })
    }

    pub fn frames_written(&self) -> u64 {
        self.next
    }

    pub fn record(&mut self, body: &SoftBody, view: &View) -> SimResult<PathBuf> {
        let path = self.dir.join(format!("frame_{:05}.png", self.next));
        save_png(&path, &rasterize(body, view))?;
        self.next += 1;
        Ok(path)
    }
}
