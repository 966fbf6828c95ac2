use std::collections::{HashSet, VecDeque};

use fastrand::Rng;
use tracing::warn;

use super::action::{self, ActionId, ActionKind, Sequence, Signal};
use super::assets::{AssetResolver, Bitmap, NullAssets};
use super::audio::{Audio, SilentAudio};
use super::collision::{CollisionEngine, CollisionNode};
use super::input::{HeldKeys, Key};
use super::layer::{Layer, LayerPolicy, LayerStack};
use super::node::{Color, Entity, EntityId, EntityTemplate, FontSpec, Prop, Vec2, World};
use super::particles::{self, EmitterConfig, EmitterId, EmitterTweak, ParticleStore, ParticleSystemId};
use super::reactor::{Reactor, TickTarget};
use super::scene::{Scene, SceneRequest};
use super::schedule::Schedule;

/// Everything the active scene can touch: entities, layers, running actions,
/// collision circles, particles, timers and the asset/audio boundaries.
pub struct SceneContext {
    pub(crate) world: World,
    pub(crate) layers: LayerStack,
    pub(crate) reactor: Reactor,
    pub(crate) actions: action::ActionRuntime,
    pub(crate) collisions: CollisionEngine,
    pub(crate) particles: ParticleStore,
    pub(crate) schedule: Schedule,
    pub(crate) signals: VecDeque<(Signal, EntityId)>,
    pub(crate) held: HeldKeys,
    pub(crate) state: Option<&'static str>,
    pub(crate) rng: Rng,
    pub(crate) pending_scene: Option<SceneRequest>,
    pub(crate) quit_requested: bool,
    assets: Box<dyn AssetResolver>,
    audio: Box<dyn Audio>,
    warned_assets: HashSet<String>,
    now_ms: u64,
    resolution: (u32, u32),
    clear_color: Option<Color>,
    volume: f32,
}

impl SceneContext {
    pub fn new(
        resolution: (u32, u32),
        assets: Box<dyn AssetResolver>,
        audio: Box<dyn Audio>,
        seed: u64,
    ) -> Self {
        Self {
            world: World::new(),
            layers: LayerStack::new(),
            reactor: Reactor::new(),
            actions: action::ActionRuntime::default(),
            collisions: CollisionEngine::new(),
            particles: ParticleStore::default(),
            schedule: Schedule::default(),
            signals: VecDeque::new(),
            held: HeldKeys::default(),
            state: None,
            rng: Rng::with_seed(seed),
            pending_scene: None,
            quit_requested: false,
            assets,
            audio,
            warned_assets: HashSet::new(),
            now_ms: 0,
            resolution,
            clear_color: Some(Color::BLACK),
            volume: 1.0,
        }
    }

    /// Context without files or sound, for tests and tools.
    pub fn headless(width: u32, height: u32) -> Self {
        Self::new(
            (width, height),
            Box::new(NullAssets),
            Box::new(SilentAudio::default()),
            0,
        )
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    pub fn res_w(&self) -> f32 {
        self.resolution.0 as f32
    }

    pub fn res_h(&self) -> f32 {
        self.resolution.1 as f32
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub(crate) fn set_now_ms(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    pub fn rng(&mut self) -> &mut Rng {
        &mut self.rng
    }

    pub fn clear_color(&self) -> Option<Color> {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Option<Color>) {
        self.clear_color = color;
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    // --- entities ---

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.world.get_mut(id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.world.is_alive(id)
    }

    /// Entity with no shape and no layer.
    pub fn spawn_blank(&mut self) -> EntityId {
        self.world.spawn()
    }

    /// Builds an entity from its kind record: resolves the image, applies
    /// the hotspot and places it on the default layer.
    pub fn spawn(&mut self, template: &EntityTemplate) -> EntityId {
        let shape = template.image.and_then(|key| self.bitmap(key));
        let id = self.world.spawn();
        if let Some(entity) = self.world.get_mut(id) {
            entity.hotspot = template.hotspot;
            match shape {
                Some(bitmap) => entity.set_shape(Some(bitmap)),
                None => {
                    let (w, h) = template.fallback_size;
                    entity.set_base_size(w, h);
                    entity.placeholder = Some(template.fallback_color);
                }
            }
        }
        if let Some(layer) = template.layer {
            self.place(id, layer);
        }
        id
    }

    pub fn spawn_with(&mut self, template: &EntityTemplate, props: &[Prop]) -> EntityId {
        let id = self.spawn(template);
        self.set(id, props);
        id
    }

    pub fn spawn_text(&mut self, text: &str, font: FontSpec, layer: Option<&str>) -> EntityId {
        let id = self.world.spawn();
        let bitmap = self.assets.render_text(&font, text);
        if let Some(entity) = self.world.get_mut(id) {
            entity.set_shape(Some(bitmap));
            entity.font = Some(font);
            entity.text = Some(text.to_string());
        }
        if let Some(layer) = layer {
            self.place(id, layer);
        }
        id
    }

    /// Re-renders a text entity; base size follows the new bitmap.
    pub fn set_text(&mut self, id: EntityId, text: &str) {
        let Some(font) = self.world.get(id).and_then(|e| e.font.clone()) else {
            return;
        };
        let bitmap = self.assets.render_text(&font, text);
        if let Some(entity) = self.world.get_mut(id) {
            entity.set_shape(Some(bitmap));
            entity.text = Some(text.to_string());
        }
    }

    pub fn set(&mut self, id: EntityId, props: &[Prop]) {
        if let Some(entity) = self.world.get_mut(id) {
            entity.set(props);
        }
    }

    pub fn set_shape(&mut self, id: EntityId, key: &str) {
        let shape = self.bitmap(key);
        if let Some(entity) = self.world.get_mut(id) {
            entity.set_shape(shape);
        }
    }

    /// Moves the entity to `layer`, leaving its previous one. An unknown
    /// layer leaves the entity unplaced.
    pub fn place(&mut self, id: EntityId, layer: &str) {
        let Some(entity) = self.world.get_mut(id).filter(|e| !e.is_deleted()) else {
            return;
        };
        if let Some(old) = entity.layer.take() {
            if let Some(old_layer) = self.layers.get_mut(&old) {
                old_layer.remove(id);
            }
        }
        if let Some(new_layer) = self.layers.get_mut(layer) {
            new_layer.add(id);
            entity.layer = Some(layer.to_string());
        }
    }

    /// Terminal: hides, detaches from the layer, aborts every action and
    /// drops the collision circles.
    pub fn delete(&mut self, id: EntityId) {
        if !self.world.is_alive(id) {
            return;
        }
        self.abort_actions(id, None);
        self.collisions.remove_owner(id);
        if let Some(entity) = self.world.get_mut(id) {
            if let Some(layer) = entity.layer.clone() {
                if let Some(layer) = self.layers.get_mut(&layer) {
                    layer.remove(id);
                }
            }
            entity.mark_deleted();
        }
        self.world.queue_purge(id);
    }

    pub(crate) fn purge_deleted(&mut self) {
        self.world.apply_pending();
    }

    // --- actions ---

    pub fn run(&mut self, id: EntityId, sequence: impl Into<Sequence>) -> Option<ActionId> {
        action::start(self, id, &sequence.into())
    }

    pub fn abort(&mut self, action: ActionId) {
        action::abort(self, action);
    }

    /// Aborts the entity's running actions, optionally only those of a kind.
    pub fn abort_actions(&mut self, id: EntityId, filter: Option<ActionKind>) {
        for action_id in self.actions.ids_of(id) {
            let matches = match (filter, self.actions.kind(action_id)) {
                (None, _) => true,
                (Some(filter), Some(kind)) => kind.matches(filter),
                (Some(_), None) => false,
            };
            if matches {
                action::abort(self, action_id);
            }
        }
    }

    pub fn abort_kinds(&mut self, id: EntityId, filters: &[ActionKind]) {
        for filter in filters {
            self.abort_actions(id, Some(*filter));
        }
    }

    pub fn has_actions(&self, id: EntityId, filter: Option<ActionKind>) -> bool {
        match filter {
            None => !self.actions.ids_of(id).is_empty(),
            Some(filter) => self.actions.kinds_of(id).iter().any(|k| k.matches(filter)),
        }
    }

    pub fn count_actions(&self, id: EntityId, filters: &[ActionKind]) -> usize {
        self.actions
            .kinds_of(id)
            .iter()
            .filter(|kind| filters.iter().any(|f| kind.matches(*f)))
            .count()
    }

    pub fn is_action_running(&self, action: ActionId) -> bool {
        self.actions.is_running(action)
    }

    pub fn running_action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn reactor_is_idle(&self) -> bool {
        self.reactor.is_empty()
    }

    /// One reactor pass: every registered action, emitter and particle
    /// system advances by `delta`.
    pub fn tick_reactor(&mut self, delta: f32) {
        for target in self.reactor.begin_pass() {
            if self.reactor.is_removed(target) {
                continue;
            }
            match target {
                TickTarget::Action(id) => action::tick(self, id, delta),
                TickTarget::Emitter(id) => particles::tick_emitter(self, id, delta),
                TickTarget::Particles(id) => particles::tick_system(self, id, delta),
            }
        }
    }

    // --- signals and scheduling ---

    pub fn emit(&mut self, signal: Signal, source: EntityId) {
        self.signals.push_back((signal, source));
    }

    pub fn take_signals(&mut self) -> Vec<(Signal, EntityId)> {
        self.signals.drain(..).collect()
    }

    pub(crate) fn next_signal(&mut self) -> Option<(Signal, EntityId)> {
        self.signals.pop_front()
    }

    /// Delivers `signal` through the scene's scheduled hook on the first
    /// realtick at least `delay_ms` from now.
    pub fn schedule_in(&mut self, delay_ms: u64, signal: Signal) {
        self.schedule.push(self.now_ms.saturating_add(delay_ms), signal);
    }

    pub fn cancel_scheduled(&mut self, tag: &str) -> usize {
        self.schedule.cancel(tag)
    }

    pub fn pending_scheduled(&self) -> usize {
        self.schedule.len()
    }

    // --- collisions ---

    pub fn add_collnode(&mut self, owner: EntityId, group: &'static str, radius: f32, offset: Vec2) {
        if !self.world.is_alive(owner) {
            return;
        }
        self.collisions.add_node(group, CollisionNode { owner, radius, offset });
    }

    pub fn collisions(&self) -> &CollisionEngine {
        &self.collisions
    }

    // --- layers ---

    pub fn new_layer(&mut self, name: &str) {
        self.create_layer(name, LayerPolicy::Unordered);
    }

    pub fn new_ordered_layer(&mut self, name: &str) {
        self.create_layer(name, LayerPolicy::Ordered);
    }

    pub fn new_static_layer(&mut self, name: &str) {
        self.create_layer(name, LayerPolicy::CachedStatic);
    }

    fn create_layer(&mut self, name: &str, policy: LayerPolicy) {
        for orphan in self.layers.create(name, policy) {
            if let Some(entity) = self.world.get_mut(orphan) {
                entity.layer = None;
            }
        }
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn layer_members(&self, name: &str) -> Vec<EntityId> {
        self.layers.get(name).map(Layer::members).unwrap_or_default()
    }

    // --- scene control ---

    pub fn state(&self) -> Option<&'static str> {
        self.state
    }

    pub fn set_state(&mut self, state: Option<&'static str>) {
        self.state = state;
    }

    /// Requests a switch; applied at the end of the current frame.
    pub fn switch_scene(&mut self, scene: Box<dyn Scene>) {
        self.pending_scene = Some(SceneRequest::Switch(scene));
    }

    pub fn switch_to_previous(&mut self) {
        self.pending_scene = Some(SceneRequest::Previous);
    }

    pub fn quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.held.is_down(key)
    }

    // --- assets and audio ---

    /// Resolves a bitmap, warning once per key when it is unavailable.
    pub fn bitmap(&mut self, key: &str) -> Option<Bitmap> {
        match self.assets.bitmap(key) {
            Ok(bitmap) => Some(bitmap),
            Err(error) => {
                if self.warned_assets.insert(key.to_string()) {
                    warn!(asset_key = key, error = %error, "asset_load_failed_using_placeholder");
                }
                None
            }
        }
    }

    pub fn frames(&mut self, dir: &str, token: &str) -> Vec<Bitmap> {
        let frames = self.assets.frames(dir, token);
        if frames.is_empty() && self.warned_assets.insert(format!("{dir}/*_{token}_*")) {
            warn!(dir, token, "asset_frames_missing");
        }
        frames
    }

    pub fn play_sound(&mut self, name: &str) {
        if let Err(error) = self.audio.play_sound(name, self.volume) {
            warn!(sound = name, error = %error, "audio_sound_failed");
        }
    }

    pub fn play_music(&mut self, name: &str, looped: bool) {
        if let Err(error) = self.audio.play_music(name, looped) {
            warn!(music = name, error = %error, "audio_music_failed");
        }
    }

    pub fn fade_out_music(&mut self, millis: u32) {
        if let Err(error) = self.audio.fade_out_music(millis) {
            warn!(error = %error, "audio_music_fade_failed");
        }
    }

    pub fn pause_music(&mut self, paused: bool) {
        if let Err(error) = self.audio.pause_music(paused) {
            warn!(error = %error, "audio_music_pause_failed");
        }
    }

    // --- particles ---

    /// Attaches a particle system to `holder`, which draws it from its layer.
    pub fn new_particle_system(&mut self, holder: EntityId, shape: Option<Bitmap>) -> ParticleSystemId {
        let id = particles::create_system(self, holder, shape);
        if let Some(entity) = self.world.get_mut(holder) {
            entity.particles = Some(id);
        }
        id
    }

    pub fn new_emitter(
        &mut self,
        system: ParticleSystemId,
        node: EntityId,
        config: EmitterConfig,
        tweak: Option<EmitterTweak>,
    ) -> EmitterId {
        particles::create_emitter(self, system, node, config, tweak)
    }

    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    /// Drops everything owned by the outgoing scene. Assets, audio, time and
    /// the random stream persist across scenes.
    pub(crate) fn reset_for_scene(&mut self) {
        self.world.clear();
        self.layers.clear();
        self.reactor.clear();
        self.actions.clear();
        self.collisions = CollisionEngine::new();
        self.particles.clear();
        self.schedule.clear();
        self.signals.clear();
        self.state = None;
        self.clear_color = Some(Color::BLACK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::action::Action;

    #[test]
    fn place_moves_between_layers_and_unknown_layer_unplaces() {
        let mut ctx = SceneContext::headless(100, 100);
        ctx.new_layer("a");
        ctx.new_ordered_layer("b");
        let id = ctx.spawn_blank();
        ctx.place(id, "a");
        ctx.place(id, "b");
        assert!(ctx.layer_members("a").is_empty());
        assert_eq!(ctx.layer_members("b"), vec![id]);
        ctx.place(id, "nowhere");
        assert!(ctx.layer_members("b").is_empty());
        assert_eq!(ctx.entity(id).and_then(Entity::layer), None);
    }

    #[test]
    fn delete_is_terminal() {
        let mut ctx = SceneContext::headless(100, 100);
        ctx.new_layer("actors");
        let id = ctx.spawn_blank();
        ctx.place(id, "actors");
        ctx.add_collnode(id, "player", 5.0, Vec2::default());
        ctx.run(id, Action::delay(1.0));
        ctx.delete(id);

        let entity = ctx.entity(id).expect("readable until purge");
        assert!(entity.is_deleted() && entity.hidden);
        assert!(ctx.layer_members("actors").is_empty());
        assert!(!ctx.has_actions(id, None));
        assert_eq!(ctx.collisions().node_count(), 0);

        ctx.run(id, Action::delay(1.0));
        assert!(!ctx.has_actions(id, None));
        ctx.purge_deleted();
        assert!(ctx.entity(id).is_none());
    }

    #[test]
    fn missing_image_uses_template_fallback() {
        let mut ctx = SceneContext::headless(100, 100);
        ctx.new_layer("building");
        let template = EntityTemplate::new("window", "building").with_fallback(40.0, 60.0, Color::rgb(1, 2, 3));
        let id = ctx.spawn(&template);
        let entity = ctx.entity(id).expect("entity");
        assert_eq!((entity.width(), entity.height()), (40.0, 60.0));
        assert_eq!(entity.layer(), Some("building"));
        assert!(entity.shape().is_none());
    }

    #[test]
    fn set_text_updates_base_size() {
        let mut ctx = SceneContext::headless(100, 100);
        let font = FontSpec {
            size: 5,
            color: Color::WHITE,
        };
        let id = ctx.spawn_text("1", font, None);
        let narrow = ctx.entity(id).map(Entity::width);
        ctx.set_text(id, "1000");
        let wide = ctx.entity(id).map(Entity::width);
        assert!(wide > narrow);
        assert_eq!(ctx.entity(id).and_then(Entity::text), Some("1000"));
    }

    #[test]
    fn recreating_layer_clears_member_back_references() {
        let mut ctx = SceneContext::headless(100, 100);
        ctx.new_layer("load");
        let id = ctx.spawn_blank();
        ctx.place(id, "load");
        ctx.new_ordered_layer("load");
        assert_eq!(ctx.entity(id).and_then(Entity::layer), None);
        ctx.place(id, "load");
        assert_eq!(ctx.layer_members("load"), vec![id]);
    }

    #[test]
    fn scheduled_signals_use_context_clock() {
        let mut ctx = SceneContext::headless(100, 100);
        ctx.set_now_ms(1_000);
        ctx.schedule_in(250, Signal::new("countdown"));
        assert!(ctx.schedule.drain_due(1_200).is_empty());
        assert_eq!(ctx.schedule.drain_due(1_250).len(), 1);
    }
}
