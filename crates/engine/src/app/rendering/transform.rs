use crate::app::node::{Color, Entity};
use crate::app::particles::Particle;

/// Destination rectangle in frame pixels, before rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

/// How one bitmap lands on the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawParams {
    pub dest: DestRect,
    pub alpha: u8,
    pub tint: Color,
    /// Degrees, counter-clockwise, about the rectangle center.
    pub angle: f32,
}

/// Placement of an entity: the hotspot lands on (x, y) and the scaled size
/// is truncated to whole pixels.
pub fn entity_draw_params(entity: &Entity) -> Option<DrawParams> {
    if !entity.is_visible() {
        return None;
    }
    let w = entity.width();
    let h = entity.height();
    if w <= 0.0 || h <= 0.0 || !w.is_finite() || !h.is_finite() {
        return None;
    }
    let dest = DestRect {
        x: (entity.x - entity.hotspot.x * w) as i32,
        y: (entity.y - entity.hotspot.y * h) as i32,
        w: w as u32,
        h: h as u32,
    };
    if dest.w == 0 || dest.h == 0 {
        return None;
    }
    Some(DrawParams {
        dest,
        alpha: clamp_alpha(entity.alpha),
        tint: entity.color,
        angle: entity.angle,
    })
}

/// Particles draw centered on their position at `base * scale`.
pub fn particle_draw_params(particle: &Particle, base_w: f32, base_h: f32) -> Option<DrawParams> {
    let w = (base_w * particle.scale) as i32;
    let h = (base_h * particle.scale) as i32;
    if w <= 0 || h <= 0 {
        return None;
    }
    Some(DrawParams {
        dest: DestRect {
            x: (particle.x - w as f32 / 2.0) as i32,
            y: (particle.y - h as f32 / 2.0) as i32,
            w: w as u32,
            h: h as u32,
        },
        alpha: clamp_alpha(particle.alpha),
        tint: particle.color,
        angle: 0.0,
    })
}

pub fn clamp_alpha(alpha: f32) -> u8 {
    if alpha.is_nan() {
        return 0;
    }
    alpha.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::context::SceneContext;
    use crate::app::node::Hotspot;

    #[test]
    fn hotspot_maps_to_top_left_of_dest() {
        let mut ctx = SceneContext::headless(100, 100);
        let id = ctx.spawn_blank();
        let entity = ctx.entity_mut(id).expect("entity");
        entity.set_base_size(20.0, 10.0);
        entity.set_scale(1.5);
        entity.hotspot = Hotspot::BOTTOM_CENTER;
        entity.set_position(50.0, 40.0);
        entity.alpha = 300.0;

        let params = entity_draw_params(entity).expect("visible");
        assert_eq!(params.dest, DestRect { x: 35, y: 25, w: 30, h: 15 });
        assert_eq!(params.alpha, 255);
    }

    #[test]
    fn hidden_or_empty_entities_are_skipped() {
        let mut ctx = SceneContext::headless(100, 100);
        let id = ctx.spawn_blank();
        let entity = ctx.entity_mut(id).expect("entity");
        assert!(entity_draw_params(entity).is_none());
        entity.set_base_size(4.0, 4.0);
        entity.hidden = true;
        assert!(entity_draw_params(entity).is_none());
    }
}
