const LAYER_MENU_BG: &str = "bg";
const LAYER_MENU_ANIMATION: &str = "animation";
const LAYER_MENU_UI: &str = "ui";

const SIG_START_GAME: &str = "start_game";
const SIG_QUIT_GAME: &str = "quit_game";

const MENU_OPTIONS: [&str; 2] = ["START", "QUIT"];
const OPTION_SELECTED: Color = Color::rgb(100, 200, 0);
const OPTION_IDLE: Color = Color::rgb(80, 80, 80);
const TITLE_COLOR: Color = Color::rgb(255, 215, 0);
const MENU_CLEAR: Color = Color::rgb(20, 30, 60);

/// Title screen: start or quit, and a demo game after a while without
/// input.
pub(crate) struct TitleScene {
    settings: GameSettings,
    selected: usize,
    options: Vec<EntityId>,
    fading: Vec<EntityId>,
    leaving: bool,
    /// Set until the first demo starts when configured to open with one.
    demo_pending: bool,
}

impl TitleScene {
    pub(crate) fn new(settings: GameSettings) -> Self {
        let demo_pending = settings.start_in_demo;
        Self {
            settings,
            selected: 0,
            options: Vec::new(),
            fading: Vec::new(),
            leaving: false,
            demo_pending,
        }
    }

    fn option_font(ctx: &SceneContext, selected: bool) -> FontSpec {
        FontSpec {
            size: (ctx.res_w() / 24.0).max(5.0) as u32,
            color: if selected { OPTION_SELECTED } else { OPTION_IDLE },
        }
    }

    fn reset_idle_timer(&self, ctx: &mut SceneContext) {
        ctx.cancel_scheduled(TIMER_IDLE_DEMO);
        if !self.leaving {
            ctx.schedule_in(self.settings.demo_idle_secs * 1000, Signal::new(TIMER_IDLE_DEMO));
        }
    }

    fn redraw_options(&mut self, ctx: &mut SceneContext) {
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        let gap = (res_w / 4.0).floor();
        let centery = (res_h * 0.92).floor();
        for id in self.options.drain(..) {
            ctx.delete(id);
        }
        for (i, label) in MENU_OPTIONS.iter().enumerate() {
            let font = Self::option_font(ctx, i == self.selected);
            let id = ctx.spawn_text(label, font, Some(LAYER_MENU_UI));
            let centerx = (res_w / 2.0).floor() + (i as f32 - 0.5) * gap;
            ctx.set(id, &[Prop::CenterX(centerx), Prop::CenterY(centery)]);
            self.options.push(id);
        }
    }

    fn step_selection(&mut self, ctx: &mut SceneContext, forward: bool) {
        let count = MENU_OPTIONS.len();
        self.selected = if forward {
            (self.selected + 1) % count
        } else {
            (self.selected + count - 1) % count
        };
        self.redraw_options(ctx);
        ctx.play_sound("cliki");
    }

    /// Fades the screen out, then posts `signal` to finish the choice.
    fn fade_out(&mut self, ctx: &mut SceneContext, signal: Signal, secs: f32) {
        self.leaving = true;
        ctx.cancel_scheduled(TIMER_IDLE_DEMO);
        if self.settings.music {
            ctx.fade_out_music((secs * 1000.0) as u32);
        }
        for id in self.options.iter().chain(&self.fading) {
            ctx.run(*id, Action::alpha_fade(0.0, secs / 2.0));
        }
        let anchor = ctx.spawn_blank();
        ctx.run(anchor, Action::delay(secs).then(Action::notify(signal)));
    }

    fn choose(&mut self, ctx: &mut SceneContext) {
        if self.selected == 0 {
            ctx.play_sound("ok");
            self.fade_out(ctx, Signal::new(SIG_START_GAME), 2.0);
        } else {
            self.fade_out(ctx, Signal::new(SIG_QUIT_GAME), 1.0);
        }
        info!(option = MENU_OPTIONS[self.selected], "title_option_chosen");
    }

    fn quit(&mut self, ctx: &mut SceneContext) {
        self.selected = MENU_OPTIONS.len() - 1;
        self.fade_out(ctx, Signal::new(SIG_QUIT_GAME), 1.0);
    }

    fn start_game(&mut self, ctx: &mut SceneContext, demo: bool) {
        self.leaving = true;
        ctx.cancel_scheduled(TIMER_IDLE_DEMO);
        info!(demo, "game_starting");
        ctx.switch_scene(Box::new(GameScene::new(self.settings.clone(), demo)));
    }
}

impl Scene for TitleScene {
    fn name(&self) -> &'static str {
        "title"
    }

    fn enter(&mut self, ctx: &mut SceneContext) {
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        self.selected = 0;
        self.leaving = false;
        self.options.clear();
        self.fading.clear();
        ctx.new_layer(LAYER_MENU_BG);
        ctx.new_ordered_layer(LAYER_MENU_ANIMATION);
        ctx.new_ordered_layer(LAYER_MENU_UI);
        ctx.set_clear_color(Some(MENU_CLEAR));
        if self.settings.music {
            ctx.play_music("menuintro", true);
        }

        let climber = ctx.spawn(&CLIMBER);
        let scale = ctx
            .entity(climber)
            .map(|e| res_h * 0.6 / e.base_height().max(1.0))
            .unwrap_or(1.0);
        ctx.set(
            climber,
            &[
                Prop::Scale(scale),
                Prop::CenterX((res_w / 2.0).floor()),
                Prop::CenterY((res_h * 0.55).floor()),
                Prop::Alpha(0.0),
            ],
        );
        ctx.place(climber, LAYER_MENU_ANIMATION);
        let frames: Arc<[Bitmap]> = ctx.frames(CLIMBER_FRAMES_DIR, "wait").into();
        ctx.run(climber, Action::animate(frames, 1.5).with_mode(Mode::Repeat));
        ctx.run(climber, Action::alpha_fade(255.0, 1.5));

        let title = ctx.spawn_text(
            "TOWER CLIMB",
            FontSpec {
                size: (res_w / 12.0).max(5.0) as u32,
                color: TITLE_COLOR,
            },
            Some(LAYER_MENU_ANIMATION),
        );
        ctx.set(
            title,
            &[
                Prop::CenterX((res_w / 2.0).floor()),
                Prop::CenterY((res_h * 0.15).floor()),
                Prop::Alpha(0.0),
            ],
        );
        ctx.run(title, Action::alpha_fade(255.0, 3.0));

        let prompt = ctx.spawn_text(
            "PRESS ENTER",
            FontSpec {
                size: (res_w / 32.0).max(5.0) as u32,
                color: Color::WHITE,
            },
            Some(LAYER_MENU_UI),
        );
        ctx.set(
            prompt,
            &[Prop::CenterX((res_w / 2.0).floor()), Prop::CenterY((res_h * 0.84).floor())],
        );
        ctx.run(prompt, Action::blink(0.6, 0.4, None));
        self.fading = vec![climber, title, prompt];

        self.redraw_options(ctx);
        if self.demo_pending {
            self.demo_pending = false;
            ctx.schedule_in(0, Signal::new(TIMER_IDLE_DEMO));
        } else {
            self.reset_idle_timer(ctx);
        }
        info!(idle_secs = self.settings.demo_idle_secs, "title_entered");
    }

    fn leave(&mut self, ctx: &mut SceneContext) {
        ctx.cancel_scheduled(TIMER_IDLE_DEMO);
    }

    fn handled_events(&self) -> &'static [InputEventKind] {
        &[
            InputEventKind::KeyDown,
            InputEventKind::JoyAxis,
            InputEventKind::JoyButton,
        ]
    }

    fn handle_event(&mut self, ctx: &mut SceneContext, event: &InputEvent) {
        if self.leaving {
            return;
        }
        self.reset_idle_timer(ctx);
        match *event {
            InputEvent::KeyDown(Key::Left | Key::A) => self.step_selection(ctx, false),
            InputEvent::KeyDown(Key::Right | Key::D) => self.step_selection(ctx, true),
            InputEvent::KeyDown(Key::Enter | Key::Space) => self.choose(ctx),
            InputEvent::KeyDown(Key::Escape) => self.quit(ctx),
            InputEvent::JoyButton { button: 0 | 1 } => self.choose(ctx),
            InputEvent::JoyButton { button: 8 } => self.quit(ctx),
            _ => {}
        }
    }

    fn on_signal(&mut self, ctx: &mut SceneContext, signal: Signal, _source: EntityId) {
        match signal.tag {
            SIG_START_GAME => self.start_game(ctx, false),
            SIG_QUIT_GAME => {
                info!("title_quit");
                ctx.quit();
            }
            _ => {}
        }
    }

    fn on_scheduled(&mut self, ctx: &mut SceneContext, signal: Signal) {
        if signal.tag == TIMER_IDLE_DEMO && !self.leaving {
            self.start_game(ctx, true);
        }
    }
}
