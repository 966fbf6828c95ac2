use std::collections::HashMap;

use crate::app::assets::Bitmap;
use crate::app::node::Color;

use super::transform::DrawParams;

/// Drawing surface used by the compositor.
pub trait Canvas {
    /// `None` keeps the previous frame's pixels.
    fn clear(&mut self, color: Option<Color>);

    fn draw_bitmap(&mut self, bitmap: &Bitmap, params: &DrawParams);

    /// Solid rectangle, used for entities whose image is missing.
    fn fill_rect(&mut self, params: &DrawParams);

    /// Paints a cached-static layer. Implementations may keep the result
    /// keyed by `key` and repaint only when `revision` changes.
    fn draw_cached_layer(&mut self, key: &str, revision: u64, paint: &mut dyn FnMut(&mut dyn Canvas));
}

/// Plain RGBA8 frame with nearest-neighbour blits.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgba: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.rgba.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Source-over composite of another frame of the same size.
    pub fn composite(&mut self, layer: &FrameBuffer) {
        if layer.width != self.width || layer.height != self.height {
            return;
        }
        for (dst, src) in self.rgba.chunks_exact_mut(4).zip(layer.rgba.chunks_exact(4)) {
            blend(dst, [src[0], src[1], src[2]], src[3]);
        }
    }

    fn blend_at(&mut self, x: i32, y: i32, rgb: [u8; 3], alpha: u8) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let Some(pixel_offset) = (y as usize)
            .checked_mul(self.width as usize)
            .and_then(|row| row.checked_add(x as usize))
        else {
            return;
        };
        let start = pixel_offset * 4;
        if let Some(dst) = self.rgba.get_mut(start..start + 4) {
            blend(dst, rgb, alpha);
        }
    }

    /// Walks every frame pixel the (possibly rotated) destination covers and
    /// hands the matching unit-square coordinate to `sample`.
    fn rasterize(&mut self, params: &DrawParams, mut sample: impl FnMut(f32, f32) -> Option<([u8; 3], u8)>) {
        let dest = params.dest;
        if dest.w == 0 || dest.h == 0 {
            return;
        }
        let (w, h) = (dest.w as f32, dest.h as f32);
        let cx = dest.x as f32 + w / 2.0;
        let cy = dest.y as f32 + h / 2.0;
        let (sin, cos) = (-params.angle.to_radians()).sin_cos();

        let (min_x, min_y, max_x, max_y) = if params.angle == 0.0 {
            (dest.x, dest.y, dest.x + dest.w as i32, dest.y + dest.h as i32)
        } else {
            let rx = (w * cos.abs() + h * sin.abs()) / 2.0;
            let ry = (w * sin.abs() + h * cos.abs()) / 2.0;
            (
                (cx - rx).floor() as i32,
                (cy - ry).floor() as i32,
                (cx + rx).ceil() as i32,
                (cy + ry).ceil() as i32,
            )
        };
        let min_x = min_x.max(0);
        let min_y = min_y.max(0);
        let max_x = max_x.min(self.width as i32);
        let max_y = max_y.min(self.height as i32);

        for py in min_y..max_y {
            for px in min_x..max_x {
                let dx = px as f32 + 0.5 - cx;
                let dy = py as f32 + 0.5 - cy;
                // inverse rotation back into the unrotated rectangle
                let ux = dx * cos + dy * sin;
                let uy = -dx * sin + dy * cos;
                let u = (ux + w / 2.0) / w;
                let v = (uy + h / 2.0) / h;
                if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                    continue;
                }
                if let Some((rgb, a)) = sample(u, v) {
                    self.blend_at(px, py, rgb, a);
                }
            }
        }
    }
}

fn blend(dst: &mut [u8], rgb: [u8; 3], alpha: u8) {
    if alpha == 0 {
        return;
    }
    if alpha == 255 {
        dst[..3].copy_from_slice(&rgb);
        dst[3] = 255;
        return;
    }
    let a = alpha as u32;
    for i in 0..3 {
        dst[i] = ((rgb[i] as u32 * a + dst[i] as u32 * (255 - a)) / 255) as u8;
    }
    dst[3] = (a + dst[3] as u32 * (255 - a) / 255).min(255) as u8;
}

fn tinted(rgb: [u8; 3], tint: Color) -> [u8; 3] {
    [
        (rgb[0] as u32 * tint.r as u32 / 255) as u8,
        (rgb[1] as u32 * tint.g as u32 / 255) as u8,
        (rgb[2] as u32 * tint.b as u32 / 255) as u8,
    ]
}

impl Canvas for FrameBuffer {
    fn clear(&mut self, color: Option<Color>) {
        let Some(color) = color else {
            return;
        };
        let px = color.components();
        for chunk in self.rgba.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, params: &DrawParams) {
        if bitmap.width() == 0 || bitmap.height() == 0 || params.alpha == 0 {
            return;
        }
        let (bw, bh) = (bitmap.width(), bitmap.height());
        self.rasterize(params, |u, v| {
            let sx = ((u * bw as f32) as u32).min(bw - 1);
            let sy = ((v * bh as f32) as u32).min(bh - 1);
            let [r, g, b, a] = bitmap.pixel(sx, sy)?;
            if a == 0 {
                return None;
            }
            let alpha = (a as u32 * params.alpha as u32 / 255) as u8;
            Some((tinted([r, g, b], params.tint), alpha))
        });
    }

    fn fill_rect(&mut self, params: &DrawParams) {
        let rgb = [params.tint.r, params.tint.g, params.tint.b];
        let alpha = params.alpha;
        self.rasterize(params, |_, _| Some((rgb, alpha)));
    }

    fn draw_cached_layer(&mut self, _key: &str, _revision: u64, paint: &mut dyn FnMut(&mut dyn Canvas)) {
        paint(self);
    }
}

/// Frame that keeps cached-static layers in off-screen buffers and repaints
/// them only when the layer revision changes.
#[derive(Debug)]
pub struct CachingFrame {
    frame: FrameBuffer,
    caches: HashMap<String, (u64, FrameBuffer)>,
    repaints: u64,
}

impl CachingFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: FrameBuffer::new(width, height),
            caches: HashMap::new(),
            repaints: 0,
        }
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    /// Number of cached-layer repaints so far.
    pub fn repaints(&self) -> u64 {
        self.repaints
    }

    pub fn forget_caches(&mut self) {
        self.caches.clear();
    }
}

impl Canvas for CachingFrame {
    fn clear(&mut self, color: Option<Color>) {
        self.frame.clear(color);
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, params: &DrawParams) {
        self.frame.draw_bitmap(bitmap, params);
    }

    fn fill_rect(&mut self, params: &DrawParams) {
        self.frame.fill_rect(params);
    }

    fn draw_cached_layer(&mut self, key: &str, revision: u64, paint: &mut dyn FnMut(&mut dyn Canvas)) {
        let fresh = self
            .caches
            .get(key)
            .is_some_and(|(cached, _)| *cached == revision);
        if !fresh {
            let mut layer = FrameBuffer::new(self.frame.width, self.frame.height);
            paint(&mut layer);
            self.caches.insert(key.to_string(), (revision, layer));
            self.repaints += 1;
        }
        if let Some((_, layer)) = self.caches.get(key) {
            self.frame.composite(layer);
        }
    }
}
