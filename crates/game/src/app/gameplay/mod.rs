use std::collections::HashMap;
use std::sync::Arc;

use engine::{
    random_f32_range, Action, ActionKind, Bitmap, Color, EmitterConfig, EntityId, EntityTemplate,
    FontSpec, HookOutcome, Hotspot, InputEvent, InputEventKind, Key, Mode, ParticleSystemId, Prop,
    Scene, SceneContext, Sequence, Signal, Vec2,
};
use fastrand::Rng;
use tracing::{debug, info};

use super::config::{Difficulty, GameConfig};

const BLINK_ON_SECS: f32 = 0.35;
const BLINK_OFF_SECS: f32 = 0.15;
const FIRST_ENTRY_BLINKS: u32 = 20;
const RESPAWN_BLINKS: u32 = 10;
const DEMO_PLAY_SECS: u64 = 180;
const SCROLL_UP_SECS: f32 = 0.25;
const SCROLL_DOWN_SECS: f32 = 0.5;
const CLOUDS_PER_LAYER: usize = 6;
const FIREWORK_SHOTS: i32 = 5;
const LABEL_PULSES: u32 = 10;

include!("types.rs");
include!("climber.rs");
include!("stage.rs");
include!("items.rs");
include!("weather.rs");
include!("hud.rs");
include!("game_scene.rs");
include!("title.rs");

pub(crate) fn build_title_scene(settings: GameSettings) -> Box<dyn Scene> {
    Box::new(TitleScene::new(settings))
}
