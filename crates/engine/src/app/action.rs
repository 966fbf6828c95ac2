//! Time-driven behaviours bound to one entity at a time.
//!
//! An [`Action`] is a blueprint; a [`Sequence`] chains blueprints. Starting a
//! sequence on an entity copies the chain into a running instance with its
//! own captured start state, so one blueprint can be started any number of
//! times. Ending a step starts the next one synchronously within the same
//! reactor pass; aborting never continues the chain.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use super::assets::Bitmap;
use super::context::SceneContext;
use super::node::{Color, Entity, EntityId, Vec2};
use super::reactor::TickTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub u64);

/// Maps raw progress (elapsed / secs) onto interpolation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Stop,
    Repeat,
    PingPong,
}

impl Mode {
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Mode::Stop => t.clamp(0.0, 1.0),
            Mode::Repeat => t.rem_euclid(1.0),
            Mode::PingPong => {
                let t = t.rem_euclid(2.0);
                if t <= 1.0 {
                    t
                } else {
                    2.0 - t
                }
            }
        }
    }
}

/// Message an action chain posts to the active scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub tag: &'static str,
    pub arg: i64,
}

impl Signal {
    pub const fn new(tag: &'static str) -> Self {
        Self { tag, arg: 0 }
    }

    pub const fn with_arg(tag: &'static str, arg: i64) -> Self {
        Self { tag, arg }
    }
}

pub type Callback = Rc<dyn Fn(&mut SceneContext, EntityId)>;

#[derive(Clone)]
pub enum Action {
    MoveTo { x: f32, y: f32, secs: f32, mode: Mode },
    MoveBy { dx: f32, dy: f32, secs: f32, mode: Mode },
    /// Constant velocity in pixels per second. Never ends on its own.
    Move { vx: f32, vy: f32 },
    AlphaFade { to: f32, secs: f32, mode: Mode },
    ColorFade { to: Color, secs: f32, mode: Mode },
    Scale { to: f32, secs: f32, mode: Mode },
    CenteredScale { to: f32, secs: f32, mode: Mode, center: Option<Vec2> },
    RotateBy { degrees: f32, secs: f32, mode: Mode },
    /// `hold` keeps the last shown frame when the animation ends.
    Animate { frames: Arc<[Bitmap]>, secs: f32, mode: Mode, hold: bool },
    Delay { secs: f32 },
    Call(Callback),
    Notify(Signal),
    Delete,
    Hide,
    Show,
    Blink { on: f32, off: f32, repeats: Option<u32> },
    Repeat { body: Sequence, times: Option<u32> },
}

impl Action {
    pub fn move_to(x: f32, y: f32, secs: f32) -> Self {
        Action::MoveTo { x, y, secs, mode: Mode::Stop }
    }

    pub fn move_by(dx: f32, dy: f32, secs: f32) -> Self {
        Action::MoveBy { dx, dy, secs, mode: Mode::Stop }
    }

    pub fn velocity(vx: f32, vy: f32) -> Self {
        Action::Move { vx, vy }
    }

    pub fn alpha_fade(to: f32, secs: f32) -> Self {
        Action::AlphaFade { to, secs, mode: Mode::Stop }
    }

    pub fn color_fade(to: Color, secs: f32) -> Self {
        Action::ColorFade { to, secs, mode: Mode::Stop }
    }

    pub fn scale(to: f32, secs: f32) -> Self {
        Action::Scale { to, secs, mode: Mode::Stop }
    }

    pub fn centered_scale(to: f32, secs: f32, center: Option<Vec2>) -> Self {
        Action::CenteredScale { to, secs, mode: Mode::Stop, center }
    }

    pub fn rotate_by(degrees: f32, secs: f32) -> Self {
        Action::RotateBy { degrees, secs, mode: Mode::Stop }
    }

    pub fn animate(frames: impl Into<Arc<[Bitmap]>>, secs: f32) -> Self {
        Action::Animate { frames: frames.into(), secs, mode: Mode::Stop, hold: false }
    }

    /// Animation that leaves the current frame in place when it ends.
    pub fn wait(frames: impl Into<Arc<[Bitmap]>>, secs: f32) -> Self {
        Action::Animate { frames: frames.into(), secs, mode: Mode::Stop, hold: true }
    }

    pub fn delay(secs: f32) -> Self {
        Action::Delay { secs }
    }

    pub fn call(callback: impl Fn(&mut SceneContext, EntityId) + 'static) -> Self {
        Action::Call(Rc::new(callback))
    }

    pub fn notify(signal: Signal) -> Self {
        Action::Notify(signal)
    }

    pub fn blink(on: f32, off: f32, repeats: Option<u32>) -> Self {
        Action::Blink { on, off, repeats }
    }

    pub fn repeat(body: impl Into<Sequence>, times: Option<u32>) -> Self {
        Action::Repeat { body: body.into(), times }
    }

    /// Replaces the interpolation mode of time-based actions.
    pub fn with_mode(mut self, new_mode: Mode) -> Self {
        match &mut self {
            Action::MoveTo { mode, .. }
            | Action::MoveBy { mode, .. }
            | Action::AlphaFade { mode, .. }
            | Action::ColorFade { mode, .. }
            | Action::Scale { mode, .. }
            | Action::CenteredScale { mode, .. }
            | Action::RotateBy { mode, .. }
            | Action::Animate { mode, .. } => *mode = new_mode,
            _ => {}
        }
        self
    }

    pub fn then(self, next: impl Into<Sequence>) -> Sequence {
        Sequence::from(self).then(next)
    }

    fn kind(&self) -> Option<ActionKind> {
        Some(match self {
            Action::MoveTo { .. } => ActionKind::MoveTo,
            Action::MoveBy { .. } => ActionKind::MoveBy,
            Action::Move { .. } => ActionKind::Move,
            Action::AlphaFade { .. } => ActionKind::AlphaFade,
            Action::ColorFade { .. } => ActionKind::ColorFade,
            Action::Scale { .. } => ActionKind::Scale,
            Action::CenteredScale { .. } => ActionKind::CenteredScale,
            Action::RotateBy { .. } => ActionKind::RotateBy,
            Action::Animate { hold: false, .. } => ActionKind::Animate,
            Action::Animate { hold: true, .. } => ActionKind::Wait,
            Action::Delay { .. } => ActionKind::Delay,
            Action::Blink { .. } => ActionKind::Blink,
            _ => return None,
        })
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Call(_) => f.write_str("Call(..)"),
            Action::Notify(signal) => write!(f, "Notify({signal:?})"),
            Action::Delete => f.write_str("Delete"),
            Action::Hide => f.write_str("Hide"),
            Action::Show => f.write_str("Show"),
            Action::Repeat { body, times } => f
                .debug_struct("Repeat")
                .field("body", body)
                .field("times", times)
                .finish(),
            other => match other.kind() {
                Some(kind) => write!(f, "{kind:?}"),
                None => f.write_str("Action"),
            },
        }
    }
}

/// Ordered chain of blueprints.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    steps: Vec<Action>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, next: impl Into<Sequence>) -> Self {
        self.steps.extend(next.into().steps);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[Action] {
        &self.steps
    }
}

impl From<&Sequence> for Sequence {
    fn from(sequence: &Sequence) -> Self {
        sequence.clone()
    }
}

impl From<Action> for Sequence {
    fn from(action: Action) -> Self {
        Self {
            steps: vec![action],
        }
    }
}

/// Type filter for querying and aborting running actions. `Wait` is a kind
/// of `Animate` and `CenteredScale` a kind of `Scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    MoveTo,
    MoveBy,
    Move,
    AlphaFade,
    ColorFade,
    Scale,
    CenteredScale,
    RotateBy,
    Animate,
    Wait,
    Delay,
    Blink,
}

impl ActionKind {
    pub fn matches(self, filter: ActionKind) -> bool {
        self == filter
            || (filter == ActionKind::Animate && self == ActionKind::Wait)
            || (filter == ActionKind::Scale && self == ActionKind::CenteredScale)
    }
}

#[derive(Debug)]
enum Tween {
    Position { from: Vec2, to: Vec2 },
    Alpha { from: f32, to: f32 },
    Color { from: [u8; 4], to: [u8; 4] },
    Scale { from: f32, to: f32, center: Option<Vec2> },
    Rotate { from: f32, delta: f32 },
    Frames { frames: Arc<[Bitmap]>, shown: Option<usize>, hold: bool },
    Idle,
    Blink { on: f32, cycle: f32 },
}

#[derive(Debug)]
enum Step {
    Timed {
        tween: Tween,
        secs: f32,
        mode: Mode,
        elapsed: f32,
    },
    Velocity {
        vx: f32,
        vy: f32,
    },
}

impl Step {
    fn start(action: &Action, entity: &Entity) -> Option<Step> {
        let timed = |tween, secs, mode| Step::Timed {
            tween,
            secs,
            mode,
            elapsed: 0.0,
        };
        let here = entity.position();
        Some(match action {
            Action::MoveTo { x, y, secs, mode } => timed(
                Tween::Position {
                    from: here,
                    to: Vec2::new(*x, *y),
                },
                *secs,
                *mode,
            ),
            Action::MoveBy { dx, dy, secs, mode } => timed(
                Tween::Position {
                    from: here,
                    to: Vec2::new(here.x + dx, here.y + dy),
                },
                *secs,
                *mode,
            ),
            Action::Move { vx, vy } => Step::Velocity { vx: *vx, vy: *vy },
            Action::AlphaFade { to, secs, mode } => timed(
                Tween::Alpha {
                    from: entity.alpha,
                    to: *to,
                },
                *secs,
                *mode,
            ),
            Action::ColorFade { to, secs, mode } => timed(
                Tween::Color {
                    from: entity.color.components(),
                    to: to.components(),
                },
                *secs,
                *mode,
            ),
            Action::Scale { to, secs, mode } => timed(
                Tween::Scale {
                    from: entity.scale(),
                    to: *to,
                    center: None,
                },
                *secs,
                *mode,
            ),
            Action::CenteredScale {
                to,
                secs,
                mode,
                center,
            } => timed(
                Tween::Scale {
                    from: entity.scale(),
                    to: *to,
                    center: *center,
                },
                *secs,
                *mode,
            ),
            Action::RotateBy {
                degrees,
                secs,
                mode,
            } => timed(
                Tween::Rotate {
                    from: entity.angle,
                    delta: *degrees,
                },
                *secs,
                *mode,
            ),
            Action::Animate {
                frames,
                secs,
                mode,
                hold,
            } => timed(
                Tween::Frames {
                    frames: Arc::clone(frames),
                    shown: None,
                    hold: *hold,
                },
                *secs,
                *mode,
            ),
            Action::Delay { secs } => timed(Tween::Idle, *secs, Mode::Stop),
            Action::Blink { on, off, repeats } => {
                let cycle = on + off;
                match repeats {
                    Some(n) => timed(Tween::Blink { on: *on, cycle }, cycle * *n as f32, Mode::Stop),
                    None => timed(Tween::Blink { on: *on, cycle }, f32::INFINITY, Mode::Stop),
                }
            }
            _ => return None,
        })
    }

    /// Advances by `delta`; returns true when the step reached its end.
    fn advance(&mut self, entity: &mut Entity, delta: f32) -> bool {
        match self {
            Step::Velocity { vx, vy } => {
                entity.x += *vx * delta;
                entity.y += *vy * delta;
                false
            }
            Step::Timed {
                tween,
                secs,
                mode,
                elapsed,
            } => {
                *elapsed += delta;
                let raw = if *secs <= 0.0 { 1.0 } else { *elapsed / *secs };
                let t = mode.apply(raw);
                tween.apply(entity, t, *elapsed);
                *mode == Mode::Stop && raw >= 1.0
            }
        }
    }

    fn finish(&self, entity: &mut Entity) {
        if let Step::Timed { tween, .. } = self {
            match tween {
                Tween::Frames {
                    frames,
                    hold: false,
                    ..
                } => {
                    if let Some(first) = frames.first() {
                        entity.set_frame(first.clone());
                    }
                }
                Tween::Blink { .. } => entity.hidden = false,
                _ => {}
            }
        }
    }

    fn abort(&self, entity: &mut Entity) {
        if let Step::Timed {
            tween: Tween::Blink { .. },
            ..
        } = self
        {
            entity.hidden = false;
        }
    }
}

impl Tween {
    fn apply(&mut self, entity: &mut Entity, t: f32, elapsed: f32) {
        match self {
            Tween::Position { from, to } => {
                entity.x = from.x + (to.x - from.x) * t;
                entity.y = from.y + (to.y - from.y) * t;
            }
            Tween::Alpha { from, to } => {
                entity.alpha = (*from + (*to - *from) * t).trunc();
            }
            Tween::Color { from, to } => {
                let mut out = [0u8; 4];
                for (i, slot) in out.iter_mut().enumerate() {
                    let start = from[i] as f32;
                    let value = start + (to[i] as f32 - start) * t;
                    *slot = value.trunc().clamp(0.0, 255.0) as u8;
                }
                entity.color = Color::from_components(out);
            }
            Tween::Scale { from, to, center } => {
                entity.set_scale(*from + (*to - *from) * t);
                if let Some(c) = center {
                    entity.set_centerx(c.x);
                    entity.set_centery(c.y);
                }
            }
            Tween::Rotate { from, delta } => {
                entity.angle = *from + *delta * t;
            }
            Tween::Frames { frames, shown, .. } => {
                let count = frames.len();
                if count == 0 {
                    return;
                }
                let idx = ((t * count as f32) as usize).min(count - 1);
                if *shown != Some(idx) {
                    *shown = Some(idx);
                    entity.set_frame(frames[idx].clone());
                }
            }
            Tween::Idle => {}
            Tween::Blink { on, cycle } => {
                if *cycle > 0.0 {
                    entity.hidden = elapsed.rem_euclid(*cycle) >= *on;
                }
            }
        }
    }
}

#[derive(Debug)]
struct RepeatCounter {
    done: u32,
    times: Option<u32>,
    timed: bool,
}

#[derive(Debug)]
struct Frame {
    steps: Rc<[Action]>,
    next: usize,
    repeat: Option<RepeatCounter>,
}

#[derive(Debug)]
pub(crate) struct RunningAction {
    target: EntityId,
    kind: ActionKind,
    step: Step,
    frames: Vec<Frame>,
}

/// Per-scene bookkeeping of running chains.
#[derive(Debug, Default)]
pub(crate) struct ActionRuntime {
    next_id: u64,
    running: HashMap<ActionId, RunningAction>,
    by_entity: HashMap<EntityId, BTreeSet<ActionId>>,
    cancelled: HashSet<ActionId>,
}

impl ActionRuntime {
    pub(crate) fn kinds_of(&self, target: EntityId) -> Vec<ActionKind> {
        self.by_entity
            .get(&target)
            .into_iter()
            .flatten()
            .filter_map(|id| self.running.get(id).map(|run| run.kind))
            .collect()
    }

    pub(crate) fn ids_of(&self, target: EntityId) -> Vec<ActionId> {
        self.by_entity
            .get(&target)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn kind(&self, id: ActionId) -> Option<ActionKind> {
        self.running.get(&id).map(|run| run.kind)
    }

    pub(crate) fn is_running(&self, id: ActionId) -> bool {
        self.running.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.running.len()
    }

    pub(crate) fn clear(&mut self) {
        self.running.clear();
        self.by_entity.clear();
        self.cancelled.clear();
    }

    fn forget(&mut self, target: EntityId, id: ActionId) {
        if let Some(ids) = self.by_entity.get_mut(&target) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_entity.remove(&target);
            }
        }
    }
}

/// Starts a copy of `sequence` on `target`. Returns `None` when the chain
/// completed synchronously or the target is gone.
pub(crate) fn start(ctx: &mut SceneContext, target: EntityId, sequence: &Sequence) -> Option<ActionId> {
    if sequence.is_empty() || !ctx.world.is_alive(target) {
        return None;
    }
    ctx.actions.next_id += 1;
    let id = ActionId(ctx.actions.next_id);
    ctx.actions.by_entity.entry(target).or_default().insert(id);

    let mut frames = vec![Frame {
        steps: sequence.steps.clone().into(),
        next: 0,
        repeat: None,
    }];
    match continue_chain(ctx, id, target, &mut frames) {
        Some((kind, step)) => {
            ctx.actions.running.insert(
                id,
                RunningAction {
                    target,
                    kind,
                    step,
                    frames,
                },
            );
            ctx.reactor.add(TickTarget::Action(id));
            Some(id)
        }
        None => {
            ctx.actions.cancelled.remove(&id);
            ctx.actions.forget(target, id);
            None
        }
    }
}

/// Advances one running chain by `delta`.
pub(crate) fn tick(ctx: &mut SceneContext, id: ActionId, delta: f32) {
    let Some(mut run) = ctx.actions.running.remove(&id) else {
        ctx.reactor.remove(TickTarget::Action(id));
        return;
    };
    let target = run.target;
    let Some(entity) = ctx.world.get_mut(target).filter(|e| !e.is_deleted()) else {
        ctx.actions.forget(target, id);
        ctx.reactor.remove(TickTarget::Action(id));
        return;
    };

    if !run.step.advance(entity, delta) {
        ctx.actions.running.insert(id, run);
        return;
    }
    run.step.finish(entity);

    match continue_chain(ctx, id, target, &mut run.frames) {
        Some((kind, step)) => {
            run.kind = kind;
            run.step = step;
            ctx.actions.running.insert(id, run);
        }
        None => {
            ctx.actions.cancelled.remove(&id);
            ctx.actions.forget(target, id);
            ctx.reactor.remove(TickTarget::Action(id));
        }
    }
}

/// Cancels one running chain without continuing it.
pub(crate) fn abort(ctx: &mut SceneContext, id: ActionId) {
    match ctx.actions.running.remove(&id) {
        Some(run) => {
            if let Some(entity) = ctx.world.get_mut(run.target) {
                run.step.abort(entity);
            }
            ctx.actions.forget(run.target, id);
        }
        // a chain currently executing immediate steps; stop it when control returns
        None => {
            ctx.actions.cancelled.insert(id);
        }
    }
    ctx.reactor.remove(TickTarget::Action(id));
}

/// Runs immediate steps until a timed step starts or the chain is exhausted.
fn continue_chain(
    ctx: &mut SceneContext,
    id: ActionId,
    target: EntityId,
    frames: &mut Vec<Frame>,
) -> Option<(ActionKind, Step)> {
    loop {
        if ctx.actions.cancelled.contains(&id) || !ctx.world.is_alive(target) {
            return None;
        }
        let frame = frames.last_mut()?;
        if frame.next >= frame.steps.len() {
            let exhausted = match &mut frame.repeat {
                None => true,
                Some(counter) => {
                    counter.done += 1;
                    let again = match counter.times {
                        Some(times) => counter.done < times,
                        // an untimed endless body would spin forever
                        None => counter.timed,
                    };
                    counter.timed = false;
                    !again
                }
            };
            if exhausted {
                frames.pop();
            } else {
                frame.next = 0;
            }
            continue;
        }

        let steps = Rc::clone(&frame.steps);
        let action = &steps[frame.next];
        frame.next += 1;

        match action {
            Action::Repeat { body, times } => {
                if body.is_empty() || *times == Some(0) {
                    continue;
                }
                frames.push(Frame {
                    steps: body.steps.clone().into(),
                    next: 0,
                    repeat: Some(RepeatCounter {
                        done: 0,
                        times: *times,
                        timed: false,
                    }),
                });
            }
            Action::Call(callback) => callback(ctx, target),
            Action::Notify(signal) => ctx.signals.push_back((*signal, target)),
            Action::Delete => ctx.delete(target),
            Action::Hide => {
                if let Some(entity) = ctx.world.get_mut(target) {
                    entity.hidden = true;
                }
            }
            Action::Show => {
                if let Some(entity) = ctx.world.get_mut(target) {
                    entity.hidden = false;
                }
            }
            timed => {
                let entity = ctx.world.get(target)?;
                let kind = timed.kind()?;
                let step = Step::start(timed, entity)?;
                for frame in frames.iter_mut() {
                    if let Some(counter) = &mut frame.repeat {
                        counter.timed = true;
                    }
                }
                return Some((kind, step));
            }
        }
    }
}
