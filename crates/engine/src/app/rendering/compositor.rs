use crate::app::context::SceneContext;
use crate::app::layer::{Layer, LayerPolicy};
use crate::app::node::{Entity, World};
use crate::app::particles::ParticleStore;

use super::canvas::Canvas;
use super::transform::{entity_draw_params, particle_draw_params};

/// Side of the square drawn for particles of a system without a shape.
const BARE_PARTICLE_SIZE: f32 = 2.0;

/// Paints the current scene: optional clear, then every layer in creation
/// order. Entities outside any layer are never drawn.
pub fn draw_scene(ctx: &SceneContext, canvas: &mut dyn Canvas) {
    canvas.clear(ctx.clear_color());
    let world = ctx.world();
    let particles = ctx.particles();
    for layer in ctx.layers().ordered() {
        if layer.policy() == LayerPolicy::CachedStatic {
            let mut paint = |target: &mut dyn Canvas| draw_layer(layer, world, particles, target);
            canvas.draw_cached_layer(layer.name(), layer.revision(), &mut paint);
        } else {
            draw_layer(layer, world, particles, canvas);
        }
    }
}

fn draw_layer(layer: &Layer, world: &World, particles: &ParticleStore, canvas: &mut dyn Canvas) {
    for id in layer.members() {
        let Some(entity) = world.get(id) else {
            continue;
        };
        if !entity.is_visible() {
            continue;
        }
        draw_entity(entity, canvas);
        if let Some(system) = entity.particle_system().and_then(|sid| particles.system(sid)) {
            let (base_w, base_h) = system
                .shape()
                .map(|s| (s.width() as f32, s.height() as f32))
                .unwrap_or((BARE_PARTICLE_SIZE, BARE_PARTICLE_SIZE));
            for particle in system.particles() {
                let Some(params) = particle_draw_params(particle, base_w, base_h) else {
                    continue;
                };
                match system.shape() {
                    Some(shape) => canvas.draw_bitmap(shape, &params),
                    None => canvas.fill_rect(&params),
                }
            }
        }
    }
}

fn draw_entity(entity: &Entity, canvas: &mut dyn Canvas) {
    let Some(mut params) = entity_draw_params(entity) else {
        return;
    };
    if let Some(shape) = entity.shape() {
        canvas.draw_bitmap(shape, &params);
    } else if let Some(fill) = entity.placeholder {
        params.tint = fill;
        canvas.fill_rect(&params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::node::{Color, EntityTemplate, Hotspot};
    use crate::app::rendering::canvas::FrameBuffer;

    #[test]
    fn later_layers_draw_over_earlier_ones() {
        let mut ctx = SceneContext::headless(10, 10);
        ctx.new_layer("back");
        ctx.new_layer("front");
        let red = EntityTemplate::new("missing/red", "back")
            .with_hotspot(Hotspot::TOP_LEFT)
            .with_fallback(4.0, 4.0, Color::rgb(255, 0, 0));
        let blue = EntityTemplate::new("missing/blue", "front")
            .with_hotspot(Hotspot::TOP_LEFT)
            .with_fallback(4.0, 4.0, Color::rgb(0, 0, 255));
        ctx.spawn(&blue);
        ctx.spawn(&red);

        let mut frame = FrameBuffer::new(10, 10);
        draw_scene(&ctx, &mut frame);
        assert_eq!(frame.pixel(1, 1), Some([0, 0, 255, 255]));
        assert_eq!(frame.pixel(8, 8), Some([0, 0, 0, 255]));
    }

    #[test]
    fn unplaced_and_hidden_entities_are_not_drawn() {
        let mut ctx = SceneContext::headless(6, 6);
        ctx.set_clear_color(None);
        ctx.new_layer("main");
        let template = EntityTemplate::new("missing/blank", "main")
            .with_hotspot(Hotspot::TOP_LEFT)
            .with_fallback(6.0, 6.0, Color::WHITE);
        let id = ctx.spawn(&template);
        if let Some(e) = ctx.entity_mut(id) {
            e.hidden = true;
        }
        let loose = ctx.spawn_blank();
        if let Some(e) = ctx.entity_mut(loose) {
            e.set_base_size(6.0, 6.0);
        }

        let mut frame = FrameBuffer::new(6, 6);
        draw_scene(&ctx, &mut frame);
        assert!(frame.rgba().iter().all(|b| *b == 0));
    }
}
