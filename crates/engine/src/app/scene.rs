use super::action::Signal;
use super::context::SceneContext;
use super::input::{InputEvent, InputEventKind};
use super::node::EntityId;

/// What a substate hook did with the tick it was offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Handled,
    /// No variant for this state; the default hook runs instead.
    Fallthrough,
}

/// A screen of the game. The director owns exactly one active scene and
/// calls these hooks in a fixed order each frame; all of them receive the
/// scene's context.
pub trait Scene {
    fn name(&self) -> &'static str;

    /// Entry hook, run after layers, state, actions and collisions were reset.
    fn enter(&mut self, ctx: &mut SceneContext);

    fn leave(&mut self, _ctx: &mut SceneContext) {}

    /// Fixed-rate gameplay hook.
    fn realtick(&mut self, _ctx: &mut SceneContext) {}

    /// Per-frame hook.
    fn tick(&mut self, _ctx: &mut SceneContext, _delta: f32) {}

    /// Realtick variant for the named substate set with `set_state`.
    fn state_realtick(&mut self, _ctx: &mut SceneContext, _state: &'static str) -> HookOutcome {
        HookOutcome::Fallthrough
    }

    fn state_tick(&mut self, _ctx: &mut SceneContext, _state: &'static str, _delta: f32) -> HookOutcome {
        HookOutcome::Fallthrough
    }

    /// Event kinds this scene handles; others are dropped by the pump.
    fn handled_events(&self) -> &'static [InputEventKind] {
        &[]
    }

    fn handle_event(&mut self, _ctx: &mut SceneContext, _event: &InputEvent) {}

    /// Group pairs checked every realtick while the scene is active.
    fn collision_handlers(&self) -> Vec<(&'static str, &'static str)> {
        Vec::new()
    }

    fn on_collision(
        &mut self,
        _ctx: &mut SceneContext,
        _groups: (&'static str, &'static str),
        _first: EntityId,
        _second: EntityId,
    ) {
    }

    /// Signal posted by an action chain running on `source`.
    fn on_signal(&mut self, _ctx: &mut SceneContext, _signal: Signal, _source: EntityId) {}

    /// One-shot event queued with `schedule_in`.
    fn on_scheduled(&mut self, _ctx: &mut SceneContext, _signal: Signal) {}
}

/// Deferred scene change, applied after the frame that requested it.
pub enum SceneRequest {
    Switch(Box<dyn Scene>),
    Previous,
}

/// Holds the active scene and the one it replaced.
#[derive(Default)]
pub struct SceneMachine {
    active: Option<Box<dyn Scene>>,
    previous: Option<Box<dyn Scene>>,
}

impl SceneMachine {
    pub fn active_name(&self) -> Option<&'static str> {
        self.active.as_ref().map(|scene| scene.name())
    }

    pub fn previous_name(&self) -> Option<&'static str> {
        self.previous.as_ref().map(|scene| scene.name())
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut (dyn Scene + 'static)> {
        self.active.as_deref_mut()
    }

    pub(crate) fn take_active(&mut self) -> Option<Box<dyn Scene>> {
        self.active.take()
    }

    /// Installs `next`; the outgoing scene becomes the previous one.
    pub(crate) fn install(&mut self, next: Box<dyn Scene>, outgoing: Option<Box<dyn Scene>>) {
        if outgoing.is_some() {
            self.previous = outgoing;
        }
        self.active = Some(next);
    }

    /// Swaps back to the previous scene when there is one.
    pub(crate) fn take_previous(&mut self) -> Option<Box<dyn Scene>> {
        self.previous.take()
    }
}
