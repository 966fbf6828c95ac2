use std::collections::VecDeque;

use tracing::{debug, info, warn};

use super::collision::is_live;
use super::context::SceneContext;
use super::input::InputEvent;
use super::metrics::RunStats;
use super::rendering::{draw_scene, Canvas};
use super::scene::{HookOutcome, Scene, SceneMachine, SceneRequest};

/// Signals drained per hook before the rest are dropped.
const MAX_SIGNALS_PER_DRAIN: usize = 4096;

/// Clock producing the per-frame delta and the fixed-rate realtick flag.
#[derive(Debug, Clone)]
pub struct Ticker {
    period_ms: f64,
    last_ms: Option<u64>,
    next_realtick_ms: f64,
    delta: f32,
    realtick: bool,
}

impl Ticker {
    pub fn new(hz: u32) -> Self {
        Self {
            period_ms: 1000.0 / f64::from(hz.max(1)),
            last_ms: None,
            next_realtick_ms: 0.0,
            delta: 0.0,
            realtick: false,
        }
    }

    /// Advances to `now_ms`. The first call yields a zero delta and a
    /// realtick; after that a realtick is raised whenever `now_ms` reached
    /// the next boundary, which is then rescheduled one period from now.
    pub fn tick(&mut self, now_ms: u64) {
        self.delta = match self.last_ms {
            Some(last) => now_ms.saturating_sub(last) as f32 / 1000.0,
            None => 0.0,
        };
        self.last_ms = Some(now_ms);
        let now = now_ms as f64;
        self.realtick = now >= self.next_realtick_ms;
        if self.realtick {
            self.next_realtick_ms = now + self.period_ms;
        }
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn realtick(&self) -> bool {
        self.realtick
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
        self.next_realtick_ms = 0.0;
        self.delta = 0.0;
        self.realtick = false;
    }
}

/// Owns the active scene and its context and runs one frame per `step`.
pub struct Director {
    ctx: SceneContext,
    scenes: SceneMachine,
    ticker: Ticker,
    events: VecDeque<InputEvent>,
    running: bool,
    started_ms: Option<u64>,
    stats: RunStats,
}

impl Director {
    pub fn new(ctx: SceneContext, realtick_hz: u32) -> Self {
        Self {
            ctx,
            scenes: SceneMachine::default(),
            ticker: Ticker::new(realtick_hz),
            events: VecDeque::new(),
            running: true,
            started_ms: None,
            stats: RunStats::default(),
        }
    }

    /// Activates `scene` immediately.
    pub fn set_scene(&mut self, scene: Box<dyn Scene>) {
        let outgoing = self.scenes.take_active();
        self.activate(scene, outgoing);
    }

    pub fn push_event(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn context(&self) -> &SceneContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut SceneContext {
        &mut self.ctx
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn last_realtick(&self) -> bool {
        self.ticker.realtick()
    }

    pub fn active_scene_name(&self) -> Option<&'static str> {
        self.scenes.active_name()
    }

    pub fn previous_scene_name(&self) -> Option<&'static str> {
        self.scenes.previous_name()
    }

    /// Runs one frame at wall time `now_ms`. Returns whether the director is
    /// still running afterwards.
    pub fn step(&mut self, now_ms: u64, canvas: Option<&mut dyn Canvas>) -> bool {
        if !self.running {
            return false;
        }
        self.ctx.set_now_ms(now_ms);
        if let Some(canvas) = canvas {
            draw_scene(&self.ctx, canvas);
        }

        self.ticker.tick(now_ms);
        let delta = self.ticker.delta();
        let realtick = self.ticker.realtick();
        let started = *self.started_ms.get_or_insert(now_ms);
        self.stats.ticks += 1;
        self.stats.secs = now_ms.saturating_sub(started) as f64 / 1000.0;

        if realtick {
            self.stats.realticks += 1;
            self.check_collisions();
            self.drain_signals();
            self.pump_events();
            self.drain_signals();
            self.run_scheduled();
            self.drain_signals();
            self.run_realtick();
            self.drain_signals();
        }

        self.run_tick(delta);
        self.drain_signals();

        self.ctx.tick_reactor(delta);
        self.drain_signals();

        self.ctx.purge_deleted();
        self.apply_pending_scene();

        if self.ctx.quit_requested {
            self.running = false;
        }
        self.running
    }

    fn activate(&mut self, mut next: Box<dyn Scene>, mut outgoing: Option<Box<dyn Scene>>) {
        if let Some(old) = outgoing.as_mut() {
            old.leave(&mut self.ctx);
        }
        self.ctx.reset_for_scene();
        for (first, second) in next.collision_handlers() {
            self.ctx.collisions.add_handler(first, second);
        }
        info!(
            scene = next.name(),
            from = outgoing.as_ref().map(|s| s.name()).unwrap_or("none"),
            "scene_activated"
        );
        next.enter(&mut self.ctx);
        self.scenes.install(next, outgoing);
    }

    fn apply_pending_scene(&mut self) {
        let Some(request) = self.ctx.pending_scene.take() else {
            return;
        };
        match request {
            SceneRequest::Switch(next) => {
                let outgoing = self.scenes.take_active();
                self.activate(next, outgoing);
            }
            SceneRequest::Previous => match self.scenes.take_previous() {
                Some(previous) => {
                    let mut outgoing = self.scenes.take_active();
                    if let Some(old) = outgoing.as_mut() {
                        old.leave(&mut self.ctx);
                    }
                    self.activate(previous, None);
                }
                None => {
                    info!("no_previous_scene_quitting");
                    self.ctx.quit_requested = true;
                }
            },
        }
    }

    fn check_collisions(&mut self) {
        let Some(scene) = self.scenes.active_mut() else {
            return;
        };
        let pairs = self.ctx.collisions.pairs().to_vec();
        for pair in pairs {
            let hits = self.ctx.collisions.candidates(&pair, &self.ctx.world);
            for (a, b) in hits {
                // an earlier callback this tick may have removed either side
                if !is_live(&self.ctx.world, a.owner) || !is_live(&self.ctx.world, b.owner) {
                    continue;
                }
                scene.on_collision(&mut self.ctx, (pair.first, pair.second), a.owner, b.owner);
            }
        }
    }

    fn pump_events(&mut self) {
        while let Some(event) = self.events.pop_front() {
            self.ctx.held.observe(&event);
            if event == InputEvent::Quit {
                info!("quit_event_received");
                self.running = false;
                self.events.clear();
                return;
            }
            let Some(scene) = self.scenes.active_mut() else {
                continue;
            };
            if scene.handled_events().contains(&event.kind()) {
                scene.handle_event(&mut self.ctx, &event);
            } else {
                debug!(kind = ?event.kind(), "event_unhandled");
            }
        }
    }

    fn run_scheduled(&mut self) {
        let due = self.ctx.schedule.drain_due(self.ctx.now_ms());
        let Some(scene) = self.scenes.active_mut() else {
            return;
        };
        for signal in due {
            scene.on_scheduled(&mut self.ctx, signal);
        }
    }

    fn run_realtick(&mut self) {
        let Some(scene) = self.scenes.active_mut() else {
            return;
        };
        let handled = match self.ctx.state() {
            Some(state) => scene.state_realtick(&mut self.ctx, state),
            None => HookOutcome::Fallthrough,
        };
        if handled == HookOutcome::Fallthrough {
            scene.realtick(&mut self.ctx);
        }
    }

    fn run_tick(&mut self, delta: f32) {
        let Some(scene) = self.scenes.active_mut() else {
            return;
        };
        let handled = match self.ctx.state() {
            Some(state) => scene.state_tick(&mut self.ctx, state, delta),
            None => HookOutcome::Fallthrough,
        };
        if handled == HookOutcome::Fallthrough {
            scene.tick(&mut self.ctx, delta);
        }
    }

    fn drain_signals(&mut self) {
        let Some(scene) = self.scenes.active_mut() else {
            self.ctx.signals.clear();
            return;
        };
        let mut delivered = 0;
        while let Some((signal, source)) = self.ctx.next_signal() {
            if delivered == MAX_SIGNALS_PER_DRAIN {
                warn!(
                    dropped = self.ctx.signals.len() + 1,
                    "signal_drain_limit_reached"
                );
                self.ctx.signals.clear();
                return;
            }
            scene.on_signal(&mut self.ctx, signal, source);
            delivered += 1;
        }
    }
}
