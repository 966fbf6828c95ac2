use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::assets::Bitmap;
use crate::app::node::Color;

use super::canvas::{CachingFrame, Canvas};
use super::transform::DrawParams;

/// Window-backed canvas. The frame is kept at game resolution and scaled
/// onto the window surface by `pixels`.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    canvas: CachingFrame,
    resolution: (u32, u32),
}

impl Renderer {
    pub fn new(window: Arc<Window>, resolution: (u32, u32)) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), resolution, size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            canvas: CachingFrame::new(resolution.0, resolution.1),
            resolution,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), self.resolution, width, height)?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        resolution: (u32, u32),
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width.max(1), surface_height.max(1), window);
        Pixels::new(resolution.0, resolution.1, surface)
    }

    /// Copies the finished frame to the surface and presents it.
    pub fn present(&mut self) -> Result<(), Error> {
        let src = self.canvas.frame().rgba();
        let dst = self.pixels.frame_mut();
        if dst.len() == src.len() {
            dst.copy_from_slice(src);
        }
        self.pixels.render()
    }

    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl Canvas for Renderer {
    fn clear(&mut self, color: Option<Color>) {
        self.canvas.clear(color);
    }

    fn draw_bitmap(&mut self, bitmap: &Bitmap, params: &DrawParams) {
        self.canvas.draw_bitmap(bitmap, params);
    }

    fn fill_rect(&mut self, params: &DrawParams) {
        self.canvas.fill_rect(params);
    }

    fn draw_cached_layer(&mut self, key: &str, revision: u64, paint: &mut dyn FnMut(&mut dyn Canvas)) {
        self.canvas.draw_cached_layer(key, revision, paint);
    }
}
