const SCORE_COLOR: Color = Color::rgb(225, 225, 30);
const SCORE_SHADOW: Color = Color::rgba(0, 0, 0, 160);
const LIVES_COLOR: Color = Color::rgb(255, 0, 0);
const LEVEL_COLOR: Color = Color::rgba(0, 255, 255, 192);
const BOARD_ALPHA: f32 = 190.0;

/// Score, lives and level boards in the corners of the screen.
pub(crate) struct Hud {
    score: EntityId,
    shadow: EntityId,
    score_frame: EntityId,
    life_icon: EntityId,
    lives: EntityId,
    level_icon: EntityId,
    level: EntityId,
    shown_lives: u32,
    loser_frames: Arc<[Bitmap]>,
}

impl Hud {
    /// Boards are sized from the climber's on-screen width.
    pub(crate) fn new(ctx: &mut SceneContext, climber_width: f32, lives: u32) -> Self {
        let res_w = ctx.res_w();
        let font_size = (climber_width / 2.0).max(1.0) as u32;

        let score_frame = ctx.spawn(&SCORE_FRAME);
        let shadow = ctx.spawn_text(
            "0",
            FontSpec {
                size: font_size,
                color: SCORE_SHADOW,
            },
            Some(LAYER_INFO),
        );
        let score = ctx.spawn_text(
            "0",
            FontSpec {
                size: font_size,
                color: SCORE_COLOR,
            },
            Some(LAYER_INFO),
        );
        let score_height = ctx.entity(score).map(|e| e.height()).unwrap_or(0.0);
        ctx.set(
            score,
            &[Prop::Right((res_w * 20.0 / 21.0).floor()), Prop::CenterY(score_height)],
        );
        let frame_height = ctx.entity(score_frame).map(|e| e.base_height()).unwrap_or(1.0);
        let (score_centery, score_bottom, score_x, score_y) = ctx
            .entity(score)
            .map(|e| (e.centery(), e.bottom(), e.x, e.y))
            .unwrap_or((0.0, 0.0, 0.0, 0.0));
        ctx.set(
            score_frame,
            &[
                Prop::Scale(score_height / (frame_height.max(1.0) / 1.7)),
                Prop::Alpha(BOARD_ALPHA),
                Prop::Right(res_w),
                Prop::CenterY(score_centery),
            ],
        );
        ctx.set(shadow, &[Prop::X(score_x + 2.0), Prop::Y(score_y + 2.0)]);

        let life_icon = ctx.spawn(&LIFE_ICON);
        let icon_width = (climber_width * 0.75).floor();
        let icon_scale = ctx
            .entity(life_icon)
            .map(|e| icon_width / e.base_width().max(1.0))
            .unwrap_or(1.0);
        ctx.set(
            life_icon,
            &[
                Prop::Scale(icon_scale),
                Prop::X(res_w - climber_width * 1.25),
                Prop::Y(score_bottom + (score_height * 6.0 / 5.0).floor()),
            ],
        );
        let (icon_right, icon_centery, icon_w) = ctx
            .entity(life_icon)
            .map(|e| (e.right(), e.centery(), e.width()))
            .unwrap_or((0.0, 0.0, 0.0));
        ctx.spawn_with(
            &SCORE_FRAME,
            &[
                Prop::Scale(icon_scale * 1.1),
                Prop::Alpha(BOARD_ALPHA),
                Prop::CenterX(icon_right),
                Prop::CenterY(icon_centery),
            ],
        );
        // The frame sits behind the icon.
        ctx.place(life_icon, LAYER_INFO);
        let lives_text = ctx.spawn_text(
            &format!("x {lives}"),
            FontSpec {
                size: (icon_w / 2.0).max(1.0) as u32,
                color: LIVES_COLOR,
            },
            Some(LAYER_INFO),
        );
        ctx.set(
            lives_text,
            &[
                Prop::CenterX(icon_right + (icon_w / 3.0).floor()),
                Prop::CenterY(icon_centery),
            ],
        );

        let status_width = climber_width * 1.15;
        let level_icon = ctx.spawn(&LEVEL_ICON);
        let level_scale = ctx
            .entity(level_icon)
            .map(|e| status_width / e.base_width().max(1.0) * 1.15)
            .unwrap_or(1.0);
        let corner = (status_width / 1.5).floor();
        ctx.set(
            level_icon,
            &[Prop::Scale(level_scale), Prop::CenterX(corner), Prop::CenterY(corner)],
        );
        let icon_frames: Arc<[Bitmap]> = ctx.frames(CLIMBER_FRAMES_DIR, "miniclimber").into();
        let loser_frames: Arc<[Bitmap]> = ctx.frames(CLIMBER_FRAMES_DIR, "miniclimberloser").into();
        ctx.run(level_icon, Action::animate(icon_frames, 0.75).with_mode(Mode::PingPong));
        ctx.run(
            level_icon,
            Action::repeat(
                Action::alpha_fade(255.0, 0.75)
                    .then(Action::delay(3.0))
                    .then(Action::alpha_fade(0.0, 0.5))
                    .then(Action::delay(1.0)),
                None,
            ),
        );
        let level = ctx.spawn_text(
            "01",
            FontSpec {
                size: (status_width * 0.5).max(1.0) as u32,
                color: LEVEL_COLOR,
            },
            Some(LAYER_INFO),
        );
        ctx.set(level, &[Prop::CenterX(corner), Prop::CenterY(corner)]);

        Self {
            score,
            shadow,
            score_frame,
            life_icon,
            lives: lives_text,
            level_icon,
            level,
            shown_lives: lives,
            loser_frames,
        }
    }

    /// Redraws every board from the climber's numbers.
    pub(crate) fn refresh(&mut self, ctx: &mut SceneContext, score: i64, lives: u32, level: usize) {
        let text = score.to_string();
        ctx.set_text(self.score, &text);
        ctx.set_text(self.shadow, &text);
        let frame_centerx = ctx.entity(self.score_frame).map(|e| e.centerx()).unwrap_or(0.0);
        ctx.set(self.score, &[Prop::CenterX(frame_centerx)]);
        let score_x = ctx.entity(self.score).map(|e| e.x).unwrap_or(0.0);
        ctx.set(self.shadow, &[Prop::X(score_x + 2.0)]);

        let level_text = format!("{:02}", level.saturating_sub(1));
        ctx.set_text(self.level, &level_text);
        if let Some(center) = ctx.entity(self.level_icon).map(|e| e.center()) {
            ctx.set(self.level, &[Prop::CenterX(center.x), Prop::CenterY(center.y)]);
        }

        if self.shown_lives == 2 && lives == 1 {
            ctx.run(self.lives, Action::blink(0.25, 0.25, None));
        } else if self.shown_lives == 1 && lives == 2 {
            ctx.abort_actions(self.lives, Some(ActionKind::Blink));
        }
        self.shown_lives = lives;
        ctx.set_text(self.lives, &format!("x {lives}"));
        if let Some((right, centery, width)) = ctx
            .entity(self.life_icon)
            .map(|e| (e.right(), e.centery(), e.width()))
        {
            ctx.set(
                self.lives,
                &[Prop::CenterX(right + (width / 3.0).floor()), Prop::CenterY(centery)],
            );
        }
    }

    /// Where collected bonuses fly to.
    pub(crate) fn score_target(&self, ctx: &SceneContext) -> Vec2 {
        ctx.entity(self.score)
            .map(|e| e.center())
            .unwrap_or_default()
    }

    /// Where collected extra lives fly to.
    pub(crate) fn lives_target(&self, ctx: &SceneContext) -> Vec2 {
        ctx.entity(self.life_icon)
            .map(|e| Vec2::new(e.right(), e.centery()))
            .unwrap_or_default()
    }

    /// Swaps the level badge to the losing animation.
    pub(crate) fn loser(&self, ctx: &mut SceneContext) {
        ctx.abort_kinds(
            self.level_icon,
            &[ActionKind::AlphaFade, ActionKind::Delay, ActionKind::Animate],
        );
        ctx.run(self.level_icon, Action::alpha_fade(255.0, 1.0));
        ctx.run(
            self.level_icon,
            Action::animate(Arc::clone(&self.loser_frames), 0.75).with_mode(Mode::PingPong),
        );
    }
}
