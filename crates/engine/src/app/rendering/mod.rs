mod canvas;
mod compositor;
mod renderer;
mod transform;

pub use canvas::{CachingFrame, Canvas, FrameBuffer};
pub use compositor::draw_scene;
pub use renderer::Renderer;
pub use transform::{clamp_alpha, entity_draw_params, particle_draw_params, DestRect, DrawParams};
