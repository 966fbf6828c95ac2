mod action;
mod assets;
mod audio;
mod collision;
mod context;
mod director;
mod gamepad;
mod input;
mod layer;
mod loop_runner;
mod metrics;
mod node;
mod particles;
mod reactor;
mod rendering;
mod scene;
mod schedule;

pub use action::{Action, ActionId, ActionKind, Callback, Mode, Sequence, Signal};
pub use assets::{render_builtin_text, AssetError, AssetResolver, Bitmap, FileAssets, NullAssets};
pub use audio::{Audio, AudioError, SilentAudio};
pub use collision::{circles_overlap, CollisionEngine, CollisionNode, CollisionPair};
pub use context::SceneContext;
pub use director::{Director, Ticker};
pub use input::{HeldKeys, InputEvent, InputEventKind, Key};
pub use layer::{Layer, LayerPolicy, LayerStack};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use metrics::{LoopMetricsSnapshot, RunStats};
pub use node::{Color, Entity, EntityId, EntityTemplate, FontSpec, Hotspot, Prop, Vec2, World};
pub use particles::{
    random_f32_range, EmitterConfig, EmitterId, EmitterTweak, Particle, ParticleStore,
    ParticleSystem, ParticleSystemId, RingEmitter,
};
pub use reactor::{Reactor, TickTarget};
pub use rendering::{
    clamp_alpha, draw_scene, entity_draw_params, particle_draw_params, CachingFrame, Canvas,
    DestRect, DrawParams, FrameBuffer, Renderer,
};
pub use scene::{HookOutcome, Scene, SceneMachine, SceneRequest};
pub use schedule::Schedule;
