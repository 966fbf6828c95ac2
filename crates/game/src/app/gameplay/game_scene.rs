const TIMER_DEMO_END: &str = "demo_end";
const LOADING_STATE: &str = "loading";
const LAST_LOADING_STEP: u32 = 9;

/// Argument of [`SIG_DESTROY_ITEM`]: break the item only if it is intact, or
/// finish one that was already collected.
const DESTROY_IF_INTACT: i64 = 0;
const DESTROY_COLLECTED: i64 = 1;

/// What the climber needs from the world after a realtick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upkeep {
    Idle,
    Respawn,
    Fall,
    ScrollDown,
    ScrollUp,
    EndGame,
    CheckWindows,
}

/// One climb up the building, from the loading screen to the final label.
pub(crate) struct GameScene {
    settings: GameSettings,
    demo: bool,
    paused: bool,
    finished: bool,
    loading_step: u32,
    loading_text: Option<EntityId>,
    /// Countdown signs still to show, the last one goes first.
    countdown: Vec<EntityId>,
    interrupted: Vec<CellIndex>,
    next_movement: u64,
    fireworks: Option<ParticleSystemId>,
    pause_overlay: Vec<EntityId>,
    stage: Option<Stage>,
    player: Option<Climber>,
    hud: Option<Hud>,
    shown: Option<(i64, u32, usize)>,
}

impl GameScene {
    pub(crate) fn new(settings: GameSettings, demo: bool) -> Self {
        Self {
            settings,
            demo,
            paused: false,
            finished: false,
            loading_step: 0,
            loading_text: None,
            countdown: Vec::new(),
            interrupted: Vec::new(),
            next_movement: 0,
            fireworks: None,
            pause_overlay: Vec::new(),
            stage: None,
            player: None,
            hud: None,
            shown: None,
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        !self.countdown.is_empty() || self.paused || self.finished
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.loading_step > LAST_LOADING_STEP
    }

    fn loading_message(&self, ctx: &mut SceneContext, text: &str) {
        let Some(id) = self.loading_text else {
            return;
        };
        ctx.set_text(id, text);
        ctx.set(
            id,
            &[
                Prop::CenterX((ctx.res_w() / 2.0).floor()),
                Prop::CenterY((ctx.res_h() / 2.0).floor()),
            ],
        );
    }

    /// Runs one loading step; one step per realtick keeps the screen alive.
    fn load_step(&mut self, ctx: &mut SceneContext) {
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        match self.loading_step {
            0 => {
                self.loading_message(ctx, "LOADING LAYERS...");
                let loading: Vec<EntityId> = ctx.layer_members(LAYER_LOAD);
                ctx.new_static_layer(LAYER_BG);
                ctx.new_layer(LAYER_CITY);
                ctx.new_layer(LAYER_WEATHER_BACK);
                ctx.new_layer(LAYER_PARTICLES);
                ctx.new_layer(LAYER_DUMMY);
                ctx.new_layer(LAYER_ROOM);
                ctx.new_layer(LAYER_GLASS);
                ctx.new_ordered_layer(LAYER_BUILDING);
                ctx.new_ordered_layer(LAYER_ACTORS);
                ctx.new_layer(LAYER_WEATHER_FRONT);
                ctx.new_ordered_layer(LAYER_INFO);
                ctx.new_layer(LAYER_POINTS);
                ctx.new_ordered_layer(LAYER_PAUSE);
                ctx.new_ordered_layer(LAYER_LOAD);
                for id in loading {
                    ctx.place(id, LAYER_LOAD);
                }
            }
            1 => {
                self.loading_message(ctx, "LOADING BACKGROUND...");
                let bg = ctx.spawn(&BACKGROUND);
                let scale = ctx
                    .entity(bg)
                    .map(|e| res_w / e.base_width().max(1.0))
                    .unwrap_or(1.0);
                ctx.set(bg, &[Prop::X(0.0), Prop::Y(0.0), Prop::Scale(scale)]);
                ctx.set_clear_color(None);
            }
            2 => {
                self.loading_message(ctx, "LOADING MUSIC...");
                if self.settings.music {
                    ctx.play_music("juego0", false);
                }
            }
            3 => {
                self.loading_message(ctx, "LOADING STAGE...");
                let holder = ctx.spawn_blank();
                ctx.place(holder, LAYER_PARTICLES);
                let star = ctx.bitmap(STAR);
                self.fireworks = Some(ctx.new_particle_system(holder, star));
                spawn_clouds(ctx, LAYER_WEATHER_BACK, &CLOUD_BACK, CLOUDS_PER_LAYER);
                spawn_clouds(ctx, LAYER_WEATHER_FRONT, &CLOUD_FRONT, CLOUDS_PER_LAYER);
                let layout = match &self.settings.layout {
                    Some(layout) => layout.clone(),
                    None => generate_layout(
                        self.settings.levels,
                        self.settings.columns,
                        self.settings.difficulty,
                        ctx.rng(),
                    ),
                };
                self.stage = Some(Stage::build(ctx, &layout));
            }
            4 => {
                self.loading_message(ctx, "LOADING PLAYER...");
                if let Some(stage) = &self.stage {
                    let mut player = Climber::new(
                        ctx,
                        (res_w / 2.0).floor(),
                        (res_h / 2.0).floor(),
                        stage.width_unit(),
                        stage.height_unit(),
                    );
                    let width = ctx.entity(player.entity()).map(|e| e.width()).unwrap_or(0.0);
                    self.hud = Some(Hud::new(ctx, width, player.lives()));
                    player.respawn(ctx, stage);
                    self.player = Some(player);
                }
                self.sync_hud(ctx);
            }
            5 => {
                self.loading_message(ctx, "LOADING MENU...");
                let overlay = ctx.spawn(&OVERLAY);
                ctx.set(
                    overlay,
                    &[
                        Prop::X(0.0),
                        Prop::Y(0.0),
                        Prop::Scale(res_w.max(res_h)),
                        Prop::Alpha(165.0),
                    ],
                );
                let text = ctx.spawn_text(
                    "PAUSED",
                    FontSpec {
                        size: (res_w / 10.0) as u32,
                        color: Color::WHITE,
                    },
                    Some(LAYER_PAUSE),
                );
                ctx.set(
                    text,
                    &[Prop::CenterX((res_w / 2.0).floor()), Prop::CenterY((res_h / 2.0).floor())],
                );
                for id in [overlay, text] {
                    if let Some(entity) = ctx.entity_mut(id) {
                        entity.hidden = true;
                    }
                }
                self.pause_overlay = vec![overlay, text];
            }
            6 => {
                self.loading_message(ctx, "LOADING CONTROLS...");
                debug!("controls_ready");
            }
            7 => {
                if self.demo {
                    self.loading_message(ctx, "LOADING AI...");
                    let label = ctx.spawn_text(
                        "DEMO MODE",
                        FontSpec {
                            size: (res_w / 24.0) as u32,
                            color: Color::rgb(255, 165, 0),
                        },
                        Some(LAYER_INFO),
                    );
                    ctx.set(
                        label,
                        &[
                            Prop::Right((res_w * 39.0 / 40.0).floor()),
                            Prop::Bottom((res_h * 39.0 / 40.0).floor()),
                        ],
                    );
                    ctx.run(label, Action::blink(0.5, 0.25, None));
                    self.next_movement = ctx.now_ms();
                    ctx.schedule_in(DEMO_PLAY_SECS * 1000, Signal::new(TIMER_DEMO_END));
                    info!("demo_mode_started");
                }
            }
            8 => {
                self.loading_message(ctx, "LOADING COUNTDOWN...");
                self.start_countdown(ctx);
            }
            _ => {
                self.loading_message(ctx, "GAME LOADED");
                ctx.set_state(None);
                for id in ctx.layer_members(LAYER_LOAD) {
                    ctx.run(id, Action::Hide);
                }
                info!(
                    levels = self.stage.as_ref().map_or(0, Stage::levels),
                    demo = self.demo,
                    "game_loaded"
                );
            }
        }
        self.loading_step += 1;
    }

    fn spawn_sign(ctx: &mut SceneContext, key: &'static str, text: &str, width: f32) -> EntityId {
        let id = if ctx.bitmap(key).is_some() {
            ctx.spawn(&EntityTemplate::new(key, LAYER_INFO))
        } else {
            ctx.spawn_text(
                text,
                FontSpec {
                    size: (ctx.res_h() / 12.0).max(5.0) as u32,
                    color: Color::WHITE,
                },
                Some(LAYER_INFO),
            )
        };
        let scale = ctx
            .entity(id)
            .map(|e| width / e.base_width().max(1.0))
            .unwrap_or(1.0);
        ctx.set(id, &[Prop::Scale(scale)]);
        id
    }

    fn start_countdown(&mut self, ctx: &mut SceneContext) {
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        let center = Vec2::new((res_w / 2.0).floor(), (res_h / 2.0).floor());
        self.countdown.clear();
        for (key, text) in COUNTDOWN_DIGITS.into_iter().zip(COUNTDOWN_TEXT) {
            let sign = Self::spawn_sign(ctx, key, text, res_w / 3.0);
            ctx.set(sign, &[Prop::CenterX(center.x), Prop::CenterY(center.y)]);
            if let Some(entity) = ctx.entity_mut(sign) {
                entity.hidden = true;
            }
            self.countdown.push(sign);
        }
        self.countdown_step(ctx);
    }

    /// Shows the next sign and queues the one after it.
    fn countdown_step(&mut self, ctx: &mut SceneContext) {
        let Some(sign) = self.countdown.pop() else {
            return;
        };
        let center = Vec2::new((ctx.res_w() / 2.0).floor(), (ctx.res_h() / 2.0).floor());
        ctx.run(
            sign,
            Action::Show
                .then(Action::delay(0.1))
                .then(Action::centered_scale(0.0, 0.9, Some(center)))
                .then(Action::Delete),
        );
        ctx.schedule_in(COUNTDOWN_STEP_MS, Signal::new(TIMER_COUNTDOWN));
        debug!(remaining = self.countdown.len(), "countdown_step");
    }

    /// Pushes the boards when the climber's numbers changed.
    fn sync_hud(&mut self, ctx: &mut SceneContext) {
        let (Some(player), Some(hud)) = (&self.player, self.hud.as_mut()) else {
            return;
        };
        let current = (player.score(), player.lives(), player.level());
        if self.shown == Some(current) {
            return;
        }
        hud.refresh(ctx, current.0, current.1, current.2);
        self.shown = Some(current);
    }

    fn upkeep(&self, ctx: &SceneContext) -> Upkeep {
        let (Some(stage), Some(player)) = (&self.stage, &self.player) else {
            return Upkeep::Idle;
        };
        if player.is_moving(ctx) {
            return if player.lives() == 0 {
                Upkeep::EndGame
            } else {
                Upkeep::Idle
            };
        }
        let res_h = ctx.res_h();
        let y = ctx.entity(player.entity()).map_or(0.0, |body| body.y);
        let both_hands = player.hands() == 2;
        if player.last() == Some(Stance::Fall) {
            Upkeep::Respawn
        } else if stage.is_window_closed(ctx, player.level(), player.window())
            && !player.is_invincible(ctx)
        {
            Upkeep::Fall
        } else if y < (res_h / 4.0).floor() && both_hands {
            Upkeep::ScrollDown
        } else if y > (res_h * 5.0 / 6.0).floor() && both_hands {
            Upkeep::ScrollUp
        } else if (player.level() >= stage.levels() && both_hands) || player.lives() == 0 {
            Upkeep::EndGame
        } else {
            Upkeep::CheckWindows
        }
    }

    /// Moves the world by `dy`; the skyline drifts `city_dy` for parallax.
    fn scroll(&mut self, ctx: &mut SceneContext, dy: f32, secs: f32, city_dy: f32) {
        let (Some(stage), Some(player)) = (self.stage.as_mut(), &self.player) else {
            return;
        };
        stage.shift(ctx, dy, secs);
        ctx.run(player.entity(), Action::move_by(0.0, dy, secs));
        for cloud in ctx.layer_members(LAYER_WEATHER_FRONT) {
            ctx.run(cloud, Action::move_by(0.0, dy, 0.5));
        }
        for city in ctx.layer_members(LAYER_CITY) {
            ctx.run(city, Action::move_by(0.0, city_dy, 0.5));
        }
        debug!(dy, "world_scrolled");
    }

    fn drive_demo(&mut self, ctx: &mut SceneContext) {
        let (Some(stage), Some(player)) = (&self.stage, self.player.as_mut()) else {
            return;
        };
        if ctx.now_ms() > self.next_movement {
            self.next_movement += player.auto_move(ctx, stage);
        }
    }

    fn end_game(&mut self, ctx: &mut SceneContext) {
        let (Some(stage), Some(player)) = (&self.stage, self.player.as_mut()) else {
            return;
        };
        self.finished = true;
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        if self.settings.music {
            ctx.fade_out_music(1500);
        }
        let winner = player.level() >= stage.levels();
        let (sign, center) = if winner {
            player.request(ctx, None, MoveRequest::Winner);
            if let Some(system) = self.fireworks {
                launch_fireworks(ctx, None, system, FIREWORK_SHOTS);
            }
            ctx.play_sound("victoria");
            let center = Vec2::new((res_w / 2.0).floor(), (res_h * 3.0 / 4.0).floor());
            let sign = Self::spawn_sign(ctx, "common/winner", "WINNER", res_w / 2.0);
            ctx.run(sign, Action::color_fade(PLAYER_COLOR, 0.5));
            (sign, center)
        } else {
            ctx.play_sound("perdedor");
            if let Some(hud) = &self.hud {
                hud.loser(ctx);
            }
            let center = Vec2::new((res_w / 2.0).floor(), (res_h / 2.0).floor());
            (Self::spawn_sign(ctx, "common/gameover", "GAME OVER", res_w / 2.0), center)
        };
        ctx.set(sign, &[Prop::CenterX(center.x), Prop::CenterY(center.y)]);
        let scale = ctx.entity(sign).map(|e| e.scale()).unwrap_or(1.0);
        let pulse = Action::delay(0.4)
            .then(Action::centered_scale(scale * 1.1, 0.5, Some(center)))
            .then(Action::centered_scale(scale, 0.1, Some(center)));
        ctx.run(
            sign,
            Action::repeat(pulse, Some(LABEL_PULSES)).then(Action::notify(Signal::new(SIG_EXIT_GAME))),
        );
        info!(
            winner,
            score = player.score(),
            level = player.level(),
            lives = player.lives(),
            "game_finished"
        );
    }

    fn toggle_pause(&mut self, ctx: &mut SceneContext) {
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        if self.paused {
            for id in &self.pause_overlay {
                ctx.run(*id, Action::Hide);
            }
            self.paused = false;
            let interrupted = std::mem::take(&mut self.interrupted);
            stage.resume_windows(ctx, &interrupted);
        } else {
            self.interrupted = stage.freeze_windows(ctx);
            for id in &self.pause_overlay {
                ctx.run(*id, Action::Show);
            }
            self.paused = true;
        }
        if self.settings.music {
            ctx.fade_out_music(2000);
        }
        info!(paused = self.paused, interrupted = self.interrupted.len(), "pause_toggled");
    }

    fn exit_game(&mut self, ctx: &mut SceneContext) {
        self.demo = false;
        info!("game_exit");
        ctx.switch_to_previous();
    }

    fn request_move(&mut self, ctx: &mut SceneContext, request: MoveRequest) {
        let (Some(stage), Some(player)) = (&self.stage, self.player.as_mut()) else {
            return;
        };
        player.request(ctx, Some(stage), request);
        self.sync_hud(ctx);
    }

    fn handle_key(&mut self, ctx: &mut SceneContext, key: Key) {
        let demo_exit = self.demo && matches!(key, Key::Space | Key::Enter);
        if key == Key::Escape || demo_exit {
            self.exit_game(ctx);
        } else if key == Key::P {
            self.toggle_pause(ctx);
        }
        if self.is_paused() {
            return;
        }
        let held = |other: Key| ctx.key_down(other);
        let request = if (key == Key::S && held(Key::K)) || key == Key::Keypad2 {
            Some(MoveRequest::Down)
        } else if (key == Key::I && held(Key::S)) || (key == Key::S && held(Key::I)) || key == Key::Keypad9 {
            Some(MoveRequest::UpRight)
        } else if (key == Key::W && held(Key::K)) || (key == Key::K && held(Key::W)) || key == Key::Keypad7 {
            Some(MoveRequest::UpLeft)
        } else if (key == Key::D && held(Key::L)) || (key == Key::L && held(Key::D)) || key == Key::Keypad6 {
            Some(MoveRequest::Right)
        } else if (key == Key::A && held(Key::J)) || (key == Key::J && held(Key::A)) || key == Key::Keypad4 {
            Some(MoveRequest::Left)
        } else {
            None
        };
        if let Some(request) = request {
            self.request_move(ctx, request);
        }
    }

    fn handle_axis(&mut self, ctx: &mut SceneContext, axis: u8, value: f32) {
        if self.is_paused() || self.demo {
            return;
        }
        let request = match axis {
            3 if value < -0.2 => Some(MoveRequest::UpRight),
            1 if value < -0.9 => Some(MoveRequest::UpLeft),
            0 if value < -0.9 => Some(MoveRequest::Left),
            4 if value > 0.8 => Some(MoveRequest::Right),
            _ => None,
        };
        if let Some(request) = request {
            self.request_move(ctx, request);
        }
        if (axis == 3 && value > 0.5) || (axis == 1 && value > 0.9) {
            self.request_move(ctx, MoveRequest::Down);
        }
    }

    fn handle_button(&mut self, ctx: &mut SceneContext, button: u8) {
        if button == 9 {
            self.toggle_pause(ctx);
        }
        if self.is_paused() {
            return;
        }
        if button == 8 {
            self.exit_game(ctx);
        }
    }

    /// Picks the next track from how high the climber got.
    fn next_track(&mut self, ctx: &mut SceneContext) {
        if !self.settings.music {
            return;
        }
        let level = self.player.as_ref().map_or(0, Climber::level);
        let levels = self.stage.as_ref().map_or(1, Stage::levels);
        let track = if self.paused {
            "pause"
        } else if level >= levels * 3 / 4 {
            "juego3"
        } else if level >= levels / 2 {
            "juego2"
        } else {
            "juego1"
        };
        ctx.play_music(track, false);
    }

    /// Shared guard of the item callbacks.
    fn item_ignored(&self, item: EntityId, needs_lives: bool) -> bool {
        let Some(stage) = &self.stage else {
            return true;
        };
        let out_of_lives = needs_lives && self.player.as_ref().map_or(true, |p| p.lives() == 0);
        stage.is_item_destroyed(item) || self.is_paused() || out_of_lives
    }

    fn collect(&mut self, ctx: &mut SceneContext, item: EntityId, target: Vec2, reward: Signal) {
        if let Some(stage) = self.stage.as_mut() {
            stage.mark_destroyed(item);
        }
        ctx.run(item, Action::move_to(target.x, target.y, 1.0));
        ctx.run(item, Action::delay(0.9).then(Action::notify(reward)));
        ctx.run(
            item,
            Action::delay(0.7).then(Action::notify(Signal::with_arg(SIG_DESTROY_ITEM, DESTROY_COLLECTED))),
        );
    }

    fn player_bonus(&mut self, ctx: &mut SceneContext, item: EntityId) {
        if self.item_ignored(item, false) {
            return;
        }
        let Some(target) = self.hud.as_ref().map(|hud| hud.score_target(ctx)) else {
            return;
        };
        self.collect(ctx, item, target, Signal::with_arg(SIG_SCORE, SCORE_ITEM));
        ctx.run(
            item,
            Action::delay(0.9).then(Action::call(|ctx: &mut SceneContext, _| ctx.play_sound("puntos"))),
        );
    }

    fn player_extra_life(&mut self, ctx: &mut SceneContext, item: EntityId) {
        if self.item_ignored(item, true) {
            return;
        }
        let Some(target) = self.hud.as_ref().map(|hud| hud.lives_target(ctx)) else {
            return;
        };
        ctx.play_sound("bien");
        self.collect(ctx, item, target, Signal::new(SIG_EXTRA_LIFE));
    }

    fn player_enemy(&mut self, ctx: &mut SceneContext, item: EntityId) {
        if self.item_ignored(item, true) {
            return;
        }
        let (Some(stage), Some(player)) = (self.stage.as_mut(), self.player.as_mut()) else {
            return;
        };
        if !stage.is_item_active(item) || player.is_invincible(ctx) {
            return;
        }
        player.request(ctx, None, MoveRequest::Hit);
        stage.destroy_item(ctx, item);
        self.sync_hud(ctx);
    }

    fn player_invincibility(&mut self, ctx: &mut SceneContext, item: EntityId) {
        if self.item_ignored(item, true) {
            return;
        }
        let (Some(stage), Some(player)) = (self.stage.as_mut(), self.player.as_mut()) else {
            return;
        };
        stage.destroy_item(ctx, item);
        player.add_score(SCORE_ITEM);
        let body = player.entity();
        let scale = ctx.entity(body).map(|e| e.scale()).unwrap_or(1.0);
        spawn_super(ctx, scale);
        ctx.play_sound("supertirititran");
        ctx.run(
            body,
            Action::repeat(
                Action::alpha_fade(200.0, 0.5).then(Action::alpha_fade(128.0, 0.5)),
                Some(10),
            )
            .then(Action::alpha_fade(255.0, 1.0)),
        );
        self.sync_hud(ctx);
    }

    /// Plants around the climber break one after another, nearest first.
    fn player_bomb(&mut self, ctx: &mut SceneContext, item: EntityId) {
        if self.item_ignored(item, true) {
            return;
        }
        let (Some(stage), Some(player)) = (self.stage.as_mut(), &self.player) else {
            return;
        };
        ctx.play_sound("bomb");
        let reach = (ctx.res_w().min(ctx.res_h()) / 3.0).floor();
        let y = ctx.entity(player.entity()).map_or(0.0, |body| body.y);
        for plant in stage.plants_near(ctx, y, reach) {
            let d = distance(ctx, plant, item);
            ctx.run(
                plant,
                Action::delay(d * 0.0025)
                    .then(Action::notify(Signal::with_arg(SIG_DESTROY_ITEM, DESTROY_IF_INTACT))),
            );
        }
        stage.destroy_item(ctx, item);
    }

    fn ground_enemy(&mut self, ctx: &mut SceneContext, item: EntityId) {
        if self.item_ignored(item, false) {
            return;
        }
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        if stage.is_item_active(item) {
            stage.destroy_item(ctx, item);
        }
    }
}

impl Scene for GameScene {
    fn name(&self) -> &'static str {
        "game"
    }

    fn enter(&mut self, ctx: &mut SceneContext) {
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        self.loading_step = 0;
        self.finished = false;
        self.paused = false;
        ctx.set_state(Some(LOADING_STATE));
        ctx.new_ordered_layer(LAYER_LOAD);
        let backdrop = ctx.spawn(&OVERLAY);
        ctx.set(
            backdrop,
            &[
                Prop::X(0.0),
                Prop::Y(0.0),
                Prop::Scale(res_w.max(res_h)),
                Prop::Alpha(220.0),
            ],
        );
        ctx.place(backdrop, LAYER_LOAD);
        let text = ctx.spawn_text(
            "LOADING...",
            FontSpec {
                size: (res_w / 20.0) as u32,
                color: Color::WHITE,
            },
            Some(LAYER_LOAD),
        );
        self.loading_text = Some(text);
        self.loading_message(ctx, "LOADING...");
        info!(demo = self.demo, "game_entered");
    }

    fn leave(&mut self, ctx: &mut SceneContext) {
        ctx.cancel_scheduled(TIMER_COUNTDOWN);
        ctx.cancel_scheduled(TIMER_DEMO_END);
    }

    fn state_realtick(&mut self, ctx: &mut SceneContext, state: &'static str) -> HookOutcome {
        if state != LOADING_STATE {
            return HookOutcome::Fallthrough;
        }
        self.load_step(ctx);
        HookOutcome::Handled
    }

    fn realtick(&mut self, ctx: &mut SceneContext) {
        if self.is_paused() {
            return;
        }
        if self.demo {
            self.drive_demo(ctx);
        }
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        match self.upkeep(ctx) {
            Upkeep::Idle => {}
            Upkeep::Respawn => {
                if let (Some(stage), Some(player)) = (&self.stage, self.player.as_mut()) {
                    player.respawn(ctx, stage);
                }
            }
            Upkeep::Fall => {
                if let Some(player) = self.player.as_mut() {
                    player.request(ctx, None, MoveRequest::Fall);
                }
                ctx.play_sound("ups");
            }
            Upkeep::ScrollDown => {
                let dy = (res_h / 2.0).floor();
                self.scroll(ctx, dy, SCROLL_DOWN_SECS, (res_h / 20.0).floor());
            }
            Upkeep::ScrollUp => {
                let height = self
                    .player
                    .as_ref()
                    .and_then(|p| ctx.entity(p.entity()))
                    .map_or(0.0, |body| body.height());
                self.scroll(ctx, -height, SCROLL_UP_SECS, -(height / 16.0).floor());
            }
            Upkeep::EndGame => {
                if !self.finished {
                    self.end_game(ctx);
                }
            }
            Upkeep::CheckWindows => {
                let difficulty = self.settings.difficulty;
                if let (Some(stage), Some(player)) = (self.stage.as_mut(), &self.player) {
                    let x = ctx.entity(player.entity()).map_or(res_w / 2.0, |body| body.x);
                    stage.prune_items(ctx);
                    stage.check_windows(ctx, x, difficulty);
                }
            }
        }
        self.sync_hud(ctx);
        if let Some(stage) = &self.stage {
            let maxy = stage.middle_level(ctx);
            wrap_clouds(ctx, maxy);
        }
    }

    fn handled_events(&self) -> &'static [InputEventKind] {
        &[
            InputEventKind::KeyDown,
            InputEventKind::JoyAxis,
            InputEventKind::JoyButton,
            InputEventKind::Custom,
        ]
    }

    fn handle_event(&mut self, ctx: &mut SceneContext, event: &InputEvent) {
        if !self.is_loaded() {
            return;
        }
        match *event {
            InputEvent::KeyDown(key) => self.handle_key(ctx, key),
            InputEvent::JoyAxis { axis, value } => self.handle_axis(ctx, axis, value),
            InputEvent::JoyButton { button } => self.handle_button(ctx, button),
            InputEvent::Custom(signal) if signal.tag == SIG_MUSIC_ENDED => self.next_track(ctx),
            _ => {}
        }
    }

    fn collision_handlers(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            (GROUP_PLAYER, GROUP_BONUS),
            (GROUP_PLAYER, GROUP_LIFE1UP),
            (GROUP_PLAYER, GROUP_ENEMY),
            (GROUP_PLAYER, GROUP_INVINCIBILITY),
            (GROUP_PLAYER, GROUP_BOMB),
            (GROUP_GROUND, GROUP_PLAYER),
            (GROUP_GROUND, GROUP_ENEMY),
        ]
    }

    fn on_collision(
        &mut self,
        ctx: &mut SceneContext,
        groups: (&'static str, &'static str),
        first: EntityId,
        second: EntityId,
    ) {
        match groups {
            (GROUP_PLAYER, GROUP_BONUS) => self.player_bonus(ctx, second),
            (GROUP_PLAYER, GROUP_LIFE1UP) => self.player_extra_life(ctx, second),
            (GROUP_PLAYER, GROUP_ENEMY) => self.player_enemy(ctx, second),
            (GROUP_PLAYER, GROUP_INVINCIBILITY) => self.player_invincibility(ctx, second),
            (GROUP_PLAYER, GROUP_BOMB) => self.player_bomb(ctx, second),
            (GROUP_GROUND, GROUP_PLAYER) => ctx.abort_actions(second, Some(ActionKind::MoveBy)),
            (GROUP_GROUND, GROUP_ENEMY) => self.ground_enemy(ctx, second),
            _ => {
                debug!(first = first.0, second = second.0, "collision_unhandled");
            }
        }
    }

    fn on_signal(&mut self, ctx: &mut SceneContext, signal: Signal, source: EntityId) {
        match signal.tag {
            SIG_SCORE => {
                if let Some(player) = self.player.as_mut() {
                    player.add_score(signal.arg);
                }
                self.sync_hud(ctx);
            }
            SIG_EXTRA_LIFE => {
                if let Some(player) = self.player.as_mut() {
                    player.add_life();
                }
                self.sync_hud(ctx);
            }
            SIG_CLOSED_WINDOWS => {
                if let Some(stage) = self.stage.as_mut() {
                    let closed = stage.count_closed(signal.arg);
                    debug!(closed, "closed_windows_changed");
                }
            }
            SIG_DESTROY_ITEM => {
                if let Some(stage) = self.stage.as_mut() {
                    if signal.arg == DESTROY_COLLECTED || !stage.is_item_destroyed(source) {
                        stage.destroy_item(ctx, source);
                    }
                }
            }
            SIG_EFFECT_CYCLE => {
                if let Some(stage) = self.stage.as_mut() {
                    stage.cycle_effect(ctx, source, signal.arg.max(0) as usize);
                }
            }
            SIG_SPAWN_RAY => {
                if let Some(stage) = self.stage.as_mut() {
                    stage.spawn_ray(ctx, source);
                }
            }
            SIG_RESUME_WINDOW => {
                if let Some(stage) = self.stage.as_mut() {
                    stage.resume_window(ctx, source);
                }
            }
            SIG_EXIT_GAME => self.exit_game(ctx),
            other => {
                debug!(tag = other, "signal_unhandled");
            }
        }
    }

    fn on_scheduled(&mut self, ctx: &mut SceneContext, signal: Signal) {
        match signal.tag {
            TIMER_COUNTDOWN => self.countdown_step(ctx),
            TIMER_DEMO_END => {
                if self.demo && !self.finished {
                    info!("demo_time_up");
                    self.exit_game(ctx);
                }
            }
            other => {
                debug!(tag = other, "timer_unhandled");
            }
        }
    }
}
