//! Page artifacts: rendering seam and hit annotation.
//!
//! Rendering a document page to a raster file is done by an external tool and
//! sits behind [`PageRenderer`]. [`OutlineAnnotator`] then draws every hit
//! quadrilateral onto the rendered image in place.

use crate::interface::{Corners, Point};
use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("render failed: {0}")]
    Render(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("artifact missing: {}", .0.display())]
    Missing(PathBuf),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

/// Renders page `page_index` (0-based) of `source` to a raster file at `output`.
pub trait PageRenderer: Send + Sync {
    fn render(&self, source: &Path, page_index: usize, output: &Path) -> ArtifactResult<()>;
}

impl<F> PageRenderer for F
where
    F: Fn(&Path, usize, &Path) -> ArtifactResult<()> + Send + Sync,
{
    fn render(&self, source: &Path, page_index: usize, output: &Path) -> ArtifactResult<()> {
        self(source, page_index, output)
    }
}

/// Marks hit locations on a rendered artifact, rewriting the file.
pub trait Annotator: Send + Sync {
    fn annotate(&self, artifact: &Path, coords: &[Corners]) -> ArtifactResult<()>;
}

impl<F> Annotator for F
where
    F: Fn(&Path, &[Corners]) -> ArtifactResult<()> + Send + Sync,
{
    fn annotate(&self, artifact: &Path, coords: &[Corners]) -> ArtifactResult<()> {
        self(artifact, coords)
    }
}

/// Draws the edges of each hit quadrilateral.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineAnnotator {
    pub color: [u8; 3],
    /// Line width relative to `sqrt(width * height)` of the image.
    pub width_factor: f64,
    /// Scale from token coordinates to raster pixels.
    pub zoom: f64,
}

impl Default for OutlineAnnotator {
    fn default() -> Self {
        Self {
            color: [255, 0, 0],
            width_factor: 0.005,
            zoom: 1.0,
        }
    }
}

impl OutlineAnnotator {
    pub fn line_width(&self, width: u32, height: u32) -> u32 {
        let w = ((width as f64) * (height as f64)).sqrt() * self.width_factor;
        (w as u32).max(1)
    }

    /// Draw onto an image already in memory.
    ///
    /// Corner sets with fewer than two finite points, or with a point beyond
    /// [`MAX_COORDINATE`] after zooming, are skipped. Edges are clipped to the
    /// image before rasterizing.
    pub fn draw(&self, img: &mut RgbImage, coords: &[Corners]) {
        let thickness = self.line_width(img.width(), img.height());
        let color = Rgb(self.color);

        for corners in coords {
            let points: Vec<(f64, f64)> = corners
                .iter()
                .filter(|p| p.x.is_finite() && p.y.is_finite())
                .map(|p| self.scale(p))
                .collect();
            if points.len() < 2 {
                tracing::warn!(corners = corners.len(), "skipping hit outline without usable corners");
                continue;
            }
            if points.iter().any(|&(x, y)| x.abs() > MAX_COORDINATE || y.abs() > MAX_COORDINATE) {
                tracing::warn!(corners = corners.len(), "skipping hit outline with out-of-range corners");
                continue;
            }
            for (i, &from) in points.iter().enumerate() {
                let to = points[(i + 1) % points.len()];
                draw_thick_line(img, from, to, thickness, color);
            }
        }
    }

    fn scale(&self, p: &Point) -> (f64, f64) {
        (p.x * self.zoom, p.y * self.zoom)
    }
}

impl Annotator for OutlineAnnotator {
    fn annotate(&self, artifact: &Path, coords: &[Corners]) -> ArtifactResult<()> {
        if !artifact.exists() {
            return Err(ArtifactError::Missing(artifact.to_path_buf()));
        }
        let mut img = image::open(artifact)?.to_rgb8();
        self.draw(&mut img, coords);
        img.save(artifact)?;
        Ok(())
    }
}

/// Largest absolute pixel coordinate an outline corner may have.
pub const MAX_COORDINATE: f64 = 1.0e7;

/// Bresenham line stamped with a square brush. The segment is first clipped to
/// the image grown by the brush size, so the walk never leaves that box.
fn draw_thick_line(img: &mut RgbImage, from: (f64, f64), to: (f64, f64), thickness: u32, color: Rgb<u8>) {
    let margin = thickness as f64 + 1.0;
    let bounds = (
        -margin,
        -margin,
        img.width() as f64 + margin,
        img.height() as f64 + margin,
    );
    let Some((from, to)) = clip_segment(from, to, bounds) else {
        return;
    };
    let (mut x, mut y) = (from.0.round() as i64, from.1.round() as i64);
    let to = (to.0.round() as i64, to.1.round() as i64);

    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        stamp(img, x, y, thickness, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Liang-Barsky clipping of a segment to `(min_x, min_y, max_x, max_y)`.
/// `None` when the segment lies entirely outside.
fn clip_segment(
    from: (f64, f64),
    to: (f64, f64),
    (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);

    for (p, q) in [
        (-dx, from.0 - min_x),
        (dx, max_x - from.0),
        (-dy, from.1 - min_y),
        (dy, max_y - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some((
        (from.0 + t0 * dx, from.1 + t0 * dy),
        (from.0 + t1 * dx, from.1 + t1 * dy),
    ))
}

fn stamp(img: &mut RgbImage, cx: i64, cy: i64, thickness: u32, color: Rgb<u8>) {
    let t = thickness as i64;
    let half = t / 2;
    let (w, h) = (img.width() as i64, img.height() as i64);
    for y in (cy - half)..(cy - half + t) {
        for x in (cx - half)..(cx - half + t) {
            if (0..w).contains(&x) && (0..h).contains(&y) {
                img.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}
