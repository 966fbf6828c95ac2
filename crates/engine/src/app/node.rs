use std::collections::BTreeMap;

use serde::Deserialize;

use super::assets::Bitmap;
use super::particles::ParticleSystemId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// RGBA tint. Alpha in `a` is carried for color fades but the entity's own
/// `alpha` field governs draw opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn components(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_components(c: [u8; 4]) -> Self {
        Self::rgba(c[0], c[1], c[2], c[3])
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Normalized anchor inside the bitmap: (0,0) top-left, (0.5,0.5) center.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Hotspot {
    pub x: f32,
    pub y: f32,
}

impl Hotspot {
    pub const CENTER: Hotspot = Hotspot { x: 0.5, y: 0.5 };
    pub const TOP_LEFT: Hotspot = Hotspot { x: 0.0, y: 0.0 };
    pub const BOTTOM_CENTER: Hotspot = Hotspot { x: 0.5, y: 1.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Default for Hotspot {
    fn default() -> Self {
        Self::CENTER
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub size: u32,
    pub color: Color,
}

/// Per-kind construction record: default image, layer and a placeholder used
/// when the image cannot be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTemplate {
    pub image: Option<&'static str>,
    pub layer: Option<&'static str>,
    pub hotspot: Hotspot,
    pub fallback_size: (f32, f32),
    pub fallback_color: Color,
}

impl EntityTemplate {
    pub const fn new(image: &'static str, layer: &'static str) -> Self {
        Self {
            image: Some(image),
            layer: Some(layer),
            hotspot: Hotspot::CENTER,
            fallback_size: (0.0, 0.0),
            fallback_color: Color::WHITE,
        }
    }

    pub const fn with_hotspot(mut self, hotspot: Hotspot) -> Self {
        self.hotspot = hotspot;
        self
    }

    pub const fn with_fallback(mut self, width: f32, height: f32, color: Color) -> Self {
        self.fallback_size = (width, height);
        self.fallback_color = color;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    pub x: f32,
    pub y: f32,
    scale: f32,
    pub angle: f32,
    pub alpha: f32,
    pub color: Color,
    pub hidden: bool,
    deleted: bool,
    pub hotspot: Hotspot,
    base_width: f32,
    base_height: f32,
    shape: Option<Bitmap>,
    pub(crate) placeholder: Option<Color>,
    pub(crate) layer: Option<String>,
    pub(crate) font: Option<FontSpec>,
    pub(crate) text: Option<String>,
    pub(crate) particles: Option<ParticleSystemId>,
}

impl Entity {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            id,
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            angle: 0.0,
            alpha: 255.0,
            color: Color::WHITE,
            hidden: false,
            deleted: false,
            hotspot: Hotspot::CENTER,
            base_width: 0.0,
            base_height: 0.0,
            shape: None,
            placeholder: None,
            layer: None,
            font: None,
            text: None,
            particles: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden && !self.deleted
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn shape(&self) -> Option<&Bitmap> {
        self.shape.as_ref()
    }

    pub fn particle_system(&self) -> Option<ParticleSystemId> {
        self.particles
    }

    /// Swaps the drawn bitmap and adopts its natural size.
    pub fn set_shape(&mut self, shape: Option<Bitmap>) {
        if let Some(bitmap) = &shape {
            self.base_width = bitmap.width() as f32;
            self.base_height = bitmap.height() as f32;
            self.placeholder = None;
        }
        self.shape = shape;
    }

    /// Frame swaps keep the base size of the entity.
    pub(crate) fn set_frame(&mut self, frame: Bitmap) {
        self.shape = Some(frame);
    }

    pub fn set_base_size(&mut self, width: f32, height: f32) {
        self.base_width = width;
        self.base_height = height;
    }

    pub fn base_width(&self) -> f32 {
        self.base_width
    }

    pub fn base_height(&self) -> f32 {
        self.base_height
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    pub fn width(&self) -> f32 {
        self.base_width * self.scale
    }

    pub fn height(&self) -> f32 {
        self.base_height * self.scale
    }

    pub fn set_width(&mut self, width: f32) {
        if self.base_width > 0.0 {
            self.scale = width / self.base_width;
        }
    }

    pub fn set_height(&mut self, height: f32) {
        if self.base_height > 0.0 {
            self.scale = height / self.base_height;
        }
    }

    pub fn left(&self) -> f32 {
        self.x - self.hotspot.x * self.width()
    }

    pub fn right(&self) -> f32 {
        self.x + (1.0 - self.hotspot.x) * self.width()
    }

    pub fn centerx(&self) -> f32 {
        self.x + (0.5 - self.hotspot.x) * self.width()
    }

    pub fn top(&self) -> f32 {
        self.y - self.hotspot.y * self.height()
    }

    pub fn bottom(&self) -> f32 {
        self.y + (1.0 - self.hotspot.y) * self.height()
    }

    pub fn centery(&self) -> f32 {
        self.y + (0.5 - self.hotspot.y) * self.height()
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.centerx(), self.centery())
    }

    pub fn set_left(&mut self, left: f32) {
        self.x = left + self.hotspot.x * self.width();
    }

    pub fn set_right(&mut self, right: f32) {
        self.x = right - (1.0 - self.hotspot.x) * self.width();
    }

    pub fn set_centerx(&mut self, centerx: f32) {
        self.x = centerx - (0.5 - self.hotspot.x) * self.width();
    }

    pub fn set_top(&mut self, top: f32) {
        self.y = top + self.hotspot.y * self.height();
    }

    pub fn set_bottom(&mut self, bottom: f32) {
        self.y = bottom - (1.0 - self.hotspot.y) * self.height();
    }

    pub fn set_centery(&mut self, centery: f32) {
        self.y = centery - (0.5 - self.hotspot.y) * self.height();
    }

    /// Bulk assignment; scale lands first so edge setters see the final size.
    pub fn set(&mut self, props: &[Prop]) {
        for prop in props {
            if let Prop::Scale(scale) = prop {
                self.scale = *scale;
            }
        }
        for prop in props {
            match *prop {
                Prop::Scale(_) => {}
                Prop::X(v) => self.x = v,
                Prop::Y(v) => self.y = v,
                Prop::Left(v) => self.set_left(v),
                Prop::Right(v) => self.set_right(v),
                Prop::CenterX(v) => self.set_centerx(v),
                Prop::Top(v) => self.set_top(v),
                Prop::Bottom(v) => self.set_bottom(v),
                Prop::CenterY(v) => self.set_centery(v),
                Prop::Width(v) => self.set_width(v),
                Prop::Height(v) => self.set_height(v),
                Prop::Alpha(v) => self.alpha = v,
                Prop::Angle(v) => self.angle = v,
                Prop::Color(c) => self.color = c,
                Prop::Hotspot(h) => self.hotspot = h,
            }
        }
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
        self.hidden = true;
        self.layer = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prop {
    X(f32),
    Y(f32),
    Left(f32),
    Right(f32),
    CenterX(f32),
    Top(f32),
    Bottom(f32),
    CenterY(f32),
    Width(f32),
    Height(f32),
    Scale(f32),
    Alpha(f32),
    Angle(f32),
    Color(Color),
    Hotspot(Hotspot),
}

/// Arena of live entities. Deleted entities stay readable until the next
/// purge so callers holding an id observe `is_deleted()` within the frame.
#[derive(Debug, Default)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    next_id: u64,
    pending_purge: Vec<EntityId>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn spawn(&mut self) -> EntityId {
        self.next_id += 1;
        let id = EntityId(self.next_id);
        self.entities.insert(id, Entity::new(id));
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.get(&id).is_some_and(|e| !e.deleted)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub(crate) fn queue_purge(&mut self, id: EntityId) {
        self.pending_purge.push(id);
    }

    pub(crate) fn apply_pending(&mut self) -> Vec<EntityId> {
        if self.pending_purge.is_empty() {
            return Vec::new();
        }
        let mut purged = std::mem::take(&mut self.pending_purge);
        purged.sort_by_key(|id| id.0);
        purged.dedup();
        for id in &purged {
            self.entities.remove(id);
        }
        purged
    }

    pub(crate) fn clear(&mut self) {
        self.entities.clear();
        self.pending_purge.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(w: f32, h: f32) -> Entity {
        let mut e = Entity::new(EntityId(1));
        e.set_base_size(w, h);
        e
    }

    #[test]
    fn width_follows_scale() {
        let mut e = sized(40.0, 30.0);
        for scale in [0.25_f32, 1.0, 1.75, 3.0] {
            e.set_scale(scale);
            assert!((e.width() - 40.0 * scale).abs() < 1e-4);
            assert!((e.height() - 30.0 * scale).abs() < 1e-4);
        }
    }

    #[test]
    fn a_new_shape_brings_its_size_but_frames_do_not() {
        let mut e = sized(10.0, 10.0);
        e.set_shape(Some(Bitmap::solid(24, 16, Color::WHITE)));
        assert_eq!((e.base_width(), e.base_height()), (24.0, 16.0));
        e.set_frame(Bitmap::solid(8, 8, Color::WHITE));
        assert_eq!((e.base_width(), e.base_height()), (24.0, 16.0));
    }

    #[test]
    fn setting_width_adjusts_scale() {
        let mut e = sized(40.0, 30.0);
        e.set_width(80.0);
        assert!((e.scale() - 2.0).abs() < 1e-6);
        assert!((e.height() - 60.0).abs() < 1e-4);
    }

    #[test]
    fn centerx_round_trips_for_any_hotspot() {
        for (hx, hy) in [(0.0, 0.0), (0.5, 0.5), (1.0, 1.0), (0.2, 0.9)] {
            let mut e = sized(50.0, 20.0);
            e.hotspot = Hotspot::new(hx, hy);
            e.set_centerx(123.5);
            e.set_centery(-7.25);
            assert!((e.centerx() - 123.5).abs() < 1e-4, "hx={hx}");
            assert!((e.centery() + 7.25).abs() < 1e-4, "hy={hy}");
        }
    }

    #[test]
    fn edges_respect_hotspot() {
        let mut e = sized(100.0, 50.0);
        e.hotspot = Hotspot::new(0.5, 1.0);
        e.set_position(200.0, 300.0);
        assert_eq!(e.left(), 150.0);
        assert_eq!(e.right(), 250.0);
        assert_eq!(e.top(), 250.0);
        assert_eq!(e.bottom(), 300.0);

        e.set_right(400.0);
        assert_eq!(e.right(), 400.0);
        assert_eq!(e.left(), 300.0);
    }

    #[test]
    fn bulk_set_applies_scale_before_edges() {
        let mut e = sized(10.0, 10.0);
        e.hotspot = Hotspot::TOP_LEFT;
        e.set(&[Prop::Right(100.0), Prop::Scale(2.0)]);
        assert_eq!(e.width(), 20.0);
        assert_eq!(e.x, 80.0);
    }

    #[test]
    fn purge_drops_entities_once() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        world.queue_purge(a);
        world.queue_purge(a);
        assert_eq!(world.apply_pending(), vec![a]);
        assert!(world.get(a).is_none());
        assert!(world.is_alive(b));
    }
}
