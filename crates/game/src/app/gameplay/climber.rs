const CLIMBER_ANIMATIONS: [&str; 16] = [
    "up1left", "up1right", "up2left", "up2right", "up3left", "up3right", "down", "left", "right",
    "wait", "waitleft", "waitright", "fall", "parachute", "final", "winner",
];

/// The player's body plus the climb state machine driving it.
pub(crate) struct Climber {
    entity: EntityId,
    lives: u32,
    level: usize,
    window: usize,
    score: i64,
    /// 2 = both hands on, 1 = mid climb, 0 = falling.
    hands: u8,
    last: Option<Stance>,
    step_height: f32,
    frames: HashMap<&'static str, Arc<[Bitmap]>>,
}

impl Climber {
    pub(crate) fn new(ctx: &mut SceneContext, x: f32, y: f32, width: f32, step_height: f32) -> Self {
        let entity = ctx.spawn(&CLIMBER);
        let scale = ctx
            .entity(entity)
            .map(|body| width / body.base_width().max(1.0))
            .unwrap_or(1.0);
        ctx.set(entity, &[Prop::Scale(scale), Prop::X(x), Prop::Y(y)]);
        ctx.add_collnode(
            entity,
            GROUP_PLAYER,
            30.0 * scale,
            Vec2::new(0.0, (-160.0 * scale).trunc()),
        );

        let mut frames = HashMap::new();
        for token in CLIMBER_ANIMATIONS {
            let list: Arc<[Bitmap]> = ctx.frames(CLIMBER_FRAMES_DIR, token).into();
            frames.insert(token, list);
        }

        Self {
            entity,
            lives: STARTING_LIVES,
            level: STARTING_LEVEL,
            window: STARTING_WINDOW,
            score: 0,
            hands: 2,
            last: None,
            step_height,
            frames,
        }
    }

    pub(crate) fn entity(&self) -> EntityId {
        self.entity
    }

    pub(crate) fn lives(&self) -> u32 {
        self.lives
    }

    pub(crate) fn score(&self) -> i64 {
        self.score
    }

    pub(crate) fn level(&self) -> usize {
        self.level
    }

    pub(crate) fn window(&self) -> usize {
        self.window
    }

    pub(crate) fn hands(&self) -> u8 {
        self.hands
    }

    pub(crate) fn last(&self) -> Option<Stance> {
        self.last
    }

    pub(crate) fn add_score(&mut self, points: i64) {
        self.score += points;
    }

    pub(crate) fn add_life(&mut self) {
        self.lives += 1;
    }

    /// Moves are locked while a displacement chain runs.
    pub(crate) fn is_moving(&self, ctx: &SceneContext) -> bool {
        ctx.count_actions(self.entity, &[ActionKind::MoveBy, ActionKind::Delay]) > 0
    }

    pub(crate) fn is_invincible(&self, ctx: &SceneContext) -> bool {
        ctx.has_actions(self.entity, Some(ActionKind::Blink))
            || ctx.has_actions(self.entity, Some(ActionKind::AlphaFade))
    }

    /// Runs one transition of the state machine. With a stage the request is
    /// first checked against the neighbouring cells. Returns whether the
    /// request was accepted.
    pub(crate) fn request(
        &mut self,
        ctx: &mut SceneContext,
        stage: Option<&Stage>,
        request: MoveRequest,
    ) -> bool {
        debug!(
            request = ?request,
            level = self.level,
            window = self.window,
            hands = self.hands,
            last = ?self.last,
            "move_requested"
        );
        if (self.is_moving(ctx) && request != MoveRequest::Hit) || self.last == Some(Stance::Fall) {
            debug!(request = ?request, reason = "busy", "move_discarded");
            return false;
        }
        if let Some(stage) = stage {
            if !self.is_legal(ctx, stage, request) {
                debug!(request = ?request, reason = "blocked", "move_discarded");
                return false;
            }
        }

        ctx.abort_actions(self.entity, Some(ActionKind::Wait));
        let mut motion = None;
        match request {
            MoveRequest::Wait => {
                ctx.abort_actions(self.entity, None);
                ctx.run(self.entity, self.animation("wait"));
                self.last = None;
                self.hands = 2;
            }
            MoveRequest::Left | MoveRequest::Right => {
                if self.last.is_none() {
                    let (token, next) = if request == MoveRequest::Left {
                        self.window = self.window.saturating_sub(1);
                        ("left", Motion::Left)
                    } else {
                        self.window += 1;
                        ("right", Motion::Right)
                    };
                    ctx.run(self.entity, self.animation(token).then(self.animation("wait")));
                    self.score += SCORE_SIDESTEP;
                    self.hands = 2;
                    motion = Some(next);
                }
            }
            MoveRequest::Down => {
                ctx.run(self.entity, self.animation("down").then(self.animation("wait")));
                if matches!(self.last, Some(Stance::Up1Left | Stance::Up1Right)) {
                    motion = Some(Motion::HalfDown);
                } else {
                    self.level = self.level.saturating_sub(1);
                    motion = Some(Motion::Down);
                }
                self.last = None;
                self.hands = 2;
            }
            MoveRequest::Fall => motion = Some(self.start_fall(ctx)),
            MoveRequest::UpRight => match self.last {
                None => {
                    ctx.run(self.entity, self.animation("up1right").then(self.animation("waitright")));
                    self.last = Some(Stance::Up1Right);
                    self.hands = 1;
                    motion = Some(Motion::Up1Right);
                }
                Some(Stance::Up1Left) => {
                    ctx.run(self.entity, self.animation("up2right").then(self.animation("waitright")));
                    self.last = Some(Stance::Up2Right);
                    self.level += 1;
                    motion = Some(Motion::Up2Right);
                }
                Some(Stance::Up2Left | Stance::Hit) => {
                    ctx.run(self.entity, self.animation("up3right").then(self.animation("wait")));
                    self.last = None;
                    self.score += SCORE_CLIMB;
                    self.hands = 2;
                    motion = Some(Motion::Up3Right);
                }
                _ => {}
            },
            MoveRequest::UpLeft => match self.last {
                None => {
                    ctx.run(self.entity, self.animation("up1left").then(self.animation("waitleft")));
                    self.last = Some(Stance::Up1Left);
                    self.hands = 1;
                    motion = Some(Motion::Up1Left);
                }
                Some(Stance::Up1Right) => {
                    ctx.run(self.entity, self.animation("up2left").then(self.animation("waitleft")));
                    self.last = Some(Stance::Up2Left);
                    self.level += 1;
                    motion = Some(Motion::Up2Left);
                }
                Some(Stance::Up2Right) => {
                    ctx.run(self.entity, self.animation("up3left").then(self.animation("wait")));
                    self.last = None;
                    self.score += SCORE_CLIMB;
                    self.hands = 2;
                    motion = Some(Motion::Up3Left);
                }
                _ => {}
            },
            MoveRequest::Hit => {
                if self.hands == 2 {
                    ctx.run(self.entity, self.animation("waitleft"));
                    self.last = Some(Stance::Hit);
                    self.score += SCORE_HIT;
                    self.hands = 1;
                } else if self.hands == 1 {
                    return self.request(ctx, stage, MoveRequest::Fall);
                }
            }
            MoveRequest::Winner => {
                ctx.run(self.entity, self.animation("winner"));
                self.last = None;
                motion = Some(Motion::Winner);
            }
        }

        if let Some(motion) = motion {
            let chain = self.movement(ctx, motion);
            ctx.run(self.entity, chain);
        }
        debug!(
            request = ?request,
            level = self.level,
            window = self.window,
            hands = self.hands,
            score = self.score,
            lives = self.lives,
            "move_accepted"
        );
        true
    }

    /// Loses a life and lets go.
    fn start_fall(&mut self, ctx: &mut SceneContext) -> Motion {
        self.lives = self.lives.saturating_sub(1);
        self.hands = 0;
        let (token, motion) = if self.lives == 0 {
            ("parachute", Motion::Parachute)
        } else {
            ("fall", Motion::Fall)
        };
        ctx.run(self.entity, self.animation(token));
        self.last = Some(Stance::Fall);
        motion
    }

    /// Neighbour checks; a committed climb (one hand on) never re-validates.
    fn is_legal(&self, ctx: &SceneContext, stage: &Stage, request: MoveRequest) -> bool {
        let (floor, window) = (self.level, self.window);
        match request {
            MoveRequest::Down => {
                self.hands == 1 || (floor > 1 && stage.is_climbable(ctx, floor - 1, window))
            }
            MoveRequest::UpRight | MoveRequest::UpLeft => {
                self.hands == 1 || (floor < stage.levels() && stage.is_climbable(ctx, floor + 1, window))
            }
            MoveRequest::Right => {
                window + 1 < stage.columns() && stage.is_climbable(ctx, floor, window + 1)
            }
            MoveRequest::Left => window > 1 && stage.is_climbable(ctx, floor, window - 1),
            _ => true,
        }
    }

    fn frames(&self, token: &str) -> Arc<[Bitmap]> {
        self.frames
            .get(token)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    fn animation(&self, token: &str) -> Sequence {
        let frames = self.frames(token);
        match token {
            "up1left" | "up1right" | "up3left" | "up3right" | "down" => {
                Action::animate(frames, 0.5).into()
            }
            "up2left" | "up2right" => Action::animate(frames, 0.7).into(),
            "left" | "right" => Action::animate(frames, 0.95).into(),
            "wait" => Action::wait(frames, 1.0).with_mode(Mode::PingPong).into(),
            "waitleft" | "waitright" => Action::wait(frames, 0.5).with_mode(Mode::PingPong).into(),
            "fall" => Action::animate(frames, 0.5).with_mode(Mode::PingPong).into(),
            "winner" => Action::animate(self.frames("final"), 0.5)
                .then(Action::animate(frames, 0.5).with_mode(Mode::PingPong)),
            "parachute" => Action::repeat(Action::animate(self.frames("fall"), 0.5), Some(2))
                .then(Action::animate(frames, 0.5))
                .then(Action::rotate_by(20.0, 0.5).with_mode(Mode::PingPong)),
            _ => Sequence::new(),
        }
    }

    fn movement(&self, ctx: &SceneContext, motion: Motion) -> Sequence {
        let step = self.step_height;
        let (width, height) = ctx
            .entity(self.entity)
            .map(|body| (body.width(), body.height()))
            .unwrap_or((0.0, 0.0));
        match motion {
            Motion::Up1Left | Motion::Up1Right => {
                Action::move_by(0.0, (-step / 2.0).ceil(), 0.4).then(Action::delay(0.1))
            }
            Motion::Up2Left | Motion::Up2Right => Action::delay(0.1)
                .then(Action::move_by(0.0, (-step / 2.0).floor(), 0.5))
                .then(Action::delay(0.1)),
            Motion::Up3Left | Motion::Up3Right => Action::delay(0.5).into(),
            Motion::HalfDown => Action::move_by(0.0, (step / 2.0).floor(), 0.25).into(),
            Motion::Down => Action::move_by(0.0, step, 0.5).into(),
            Motion::Left | Motion::Right => {
                let dx = if motion == Motion::Left { -width } else { width };
                Action::delay(0.25)
                    .then(Action::move_by(dx, 0.0, 0.5))
                    .then(Action::delay(0.2))
            }
            Motion::Fall => Action::move_by(0.0, 10.0, 1.0)
                .then(Action::move_by(0.0, (ctx.res_h() / 2.0).floor(), 1.0)),
            Motion::Parachute => Action::move_by(0.0, 10.0, 0.9)
                .then(Action::move_by(0.0, 30.0, 0.5))
                .then(Action::move_by(ctx.res_w() / 2.0, ctx.res_h() + height * 2.0, 6.0)),
            Motion::Winner => {
                let rise = (-step / 3.0).floor();
                Action::move_by(0.0, rise, 0.15)
                    .then(Action::delay(0.1))
                    .then(Action::move_by(0.0, rise, 0.1))
                    .then(Action::delay(0.25))
            }
        }
    }

    /// Drops the climber into `anchor`'s cell: idle pose, blinking while it
    /// is invulnerable. Without lives the body is parked out of sight.
    pub(crate) fn set_in_window(&mut self, ctx: &mut SceneContext, anchor: EntityId, first: bool) {
        let Some((x, y, height)) = ctx.entity(anchor).map(|cell| (cell.x, cell.y, cell.height()))
        else {
            return;
        };
        self.step_height = height;
        self.last = None;
        self.request(ctx, None, MoveRequest::Wait);
        if self.lives > 0 {
            ctx.set(
                self.entity,
                &[Prop::X(x), Prop::Y(y + (height * 3.0 / 5.0).floor()), Prop::Alpha(255.0)],
            );
            let blinks = if first { FIRST_ENTRY_BLINKS } else { RESPAWN_BLINKS };
            ctx.run(self.entity, Action::blink(BLINK_ON_SECS, BLINK_OFF_SECS, Some(blinks)));
        } else {
            let (cx, cy) = (ctx.res_w() / 2.0, ctx.res_h() / 2.0);
            ctx.set(self.entity, &[Prop::CenterX(cx), Prop::CenterY(cy), Prop::Alpha(0.0)]);
        }
    }

    /// Walks from the current (level, window) to the nearest climbable cell
    /// and drops the climber there.
    pub(crate) fn respawn(&mut self, ctx: &mut SceneContext, stage: &Stage) {
        let mut attempts = stage.levels() * stage.columns();
        while !stage.is_climbable(ctx, self.level, self.window) {
            if attempts == 0 {
                debug!(level = self.level, window = self.window, "respawn_cell_missing");
                return;
            }
            attempts -= 1;
            if self.level > STARTING_LEVEL {
                self.level -= 1;
            } else {
                self.window = (self.window + 1) % stage.columns().max(1);
            }
        }
        if let Some(anchor) = stage.anchor(self.level, self.window) {
            let first = self.level == STARTING_LEVEL;
            self.set_in_window(ctx, anchor, first);
        }
    }

    /// Demo controller: picks the next move from the surrounding cells and
    /// returns the delay in milliseconds before it should decide again.
    pub(crate) fn auto_move(&mut self, ctx: &mut SceneContext, stage: &Stage) -> u64 {
        let (floor, window) = (self.level, self.window);
        let levels = stage.levels();
        let columns = stage.columns();
        let climbable_above = floor < levels && stage.is_climbable(ctx, floor + 1, window);
        let climbable_below = floor > 1 && stage.is_climbable(ctx, floor - 1, window);
        let climbable_right = window + 1 < columns && stage.is_climbable(ctx, floor, window + 1);
        let climbable_left = window > 1 && stage.is_climbable(ctx, floor, window - 1);
        let here_moving = stage.is_glass_moving(ctx, floor, window);

        let mut range = (750, 1500);
        match self.last {
            Some(Stance::Up1Right) if climbable_above => {
                let next = if here_moving { MoveRequest::Down } else { MoveRequest::UpLeft };
                self.request(ctx, None, next);
                range = (625, 900);
            }
            Some(Stance::Up1Left) if climbable_above => {
                let next = if here_moving { MoveRequest::Down } else { MoveRequest::UpRight };
                self.request(ctx, None, next);
                range = (625, 900);
            }
            _ if stage.is_window(floor, window) && here_moving => {
                if self.last.is_none() && climbable_right {
                    self.request(ctx, None, MoveRequest::Right);
                    range = (900, 1500);
                } else if self.last.is_none() && climbable_left {
                    self.request(ctx, None, MoveRequest::Left);
                    range = (900, 1500);
                } else if climbable_below {
                    self.request(ctx, None, MoveRequest::Down);
                    range = (750, 1300);
                }
            }
            Some(Stance::Up2Right) => {
                self.request(ctx, None, MoveRequest::UpLeft);
            }
            Some(Stance::Up2Left | Stance::Hit) => {
                self.request(ctx, None, MoveRequest::UpRight);
            }
            None => {
                if climbable_above && !stage.is_glass_moving(ctx, floor + 1, window) {
                    self.request(ctx, None, MoveRequest::UpRight);
                    range = (550, 900);
                } else if climbable_left {
                    self.request(ctx, None, MoveRequest::Left);
                    range = (900, 1500);
                } else if climbable_right {
                    self.request(ctx, None, MoveRequest::Right);
                    range = (900, 1500);
                } else if climbable_below {
                    self.request(ctx, None, MoveRequest::Down);
                    range = (750, 1300);
                }
            }
            _ => {}
        }
        randint(ctx.rng(), range.0, range.1) as u64
    }
}
