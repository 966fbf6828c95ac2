/// Grid position of a cell: row index counted from the top, then column.
type CellIndex = (usize, usize);

/// One building block. Every sprite in `parts` travels with the anchor when
/// the stage scrolls.
#[derive(Debug, Clone)]
struct Cell {
    kind: CellKind,
    anchor: EntityId,
    frame: EntityId,
    glass: Option<EntityId>,
    room: Option<EntityId>,
    edge: Option<EntityId>,
    item: Option<EntityId>,
    effect: Option<EntityId>,
}

impl Cell {
    fn parts(&self) -> impl Iterator<Item = EntityId> + '_ {
        [
            Some(self.frame),
            self.glass,
            self.room,
            self.edge,
            self.item,
            self.effect,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone)]
struct Ground {
    entity: EntityId,
    props: [EntityId; 2],
}

#[derive(Debug, Clone)]
struct StageFrames {
    bonus: Arc<[Bitmap]>,
    bomb: Arc<[Bitmap]>,
    invincibility: Arc<[Bitmap]>,
    obstacle: Arc<[Bitmap]>,
    effect: Arc<[Bitmap]>,
    ray: Arc<[Bitmap]>,
}

impl StageFrames {
    fn load(ctx: &mut SceneContext) -> Self {
        let mut load = |token: &str| -> Arc<[Bitmap]> { ctx.frames(STAGE_FRAMES_DIR, token).into() };
        Self {
            bonus: load("bonus"),
            bomb: load("bomb"),
            invincibility: load("invincibility"),
            obstacle: load("staticenemy"),
            effect: load("sefx"),
            ray: load("ray"),
        }
    }
}

/// The building: a grid of cells standing on the ground, plus the items and
/// hazards living on it.
pub(crate) struct Stage {
    rows: Vec<Vec<Option<Cell>>>,
    columns: usize,
    width_unit: f32,
    height_unit: f32,
    ground: Ground,
    items: HashMap<EntityId, Item>,
    effects: HashMap<EntityId, ObstacleEffect>,
    frames: StageFrames,
    closed_windows: i64,
}

/// Level codes for a building of `levels` rows and `columns` columns, rows
/// listed top to bottom. The roof steps in from both sides depending on the
/// difficulty; each row holds at most one obstacle.
pub(crate) fn generate_layout(
    levels: usize,
    columns: usize,
    difficulty: Difficulty,
    rng: &mut Rng,
) -> Vec<Vec<Option<f64>>> {
    let dif = difficulty.factor();
    let (right_step, left_step) = match difficulty {
        Difficulty::Easy => (levels, levels),
        Difficulty::Normal => (4, 6),
        Difficulty::Hard => (4, 3),
    };
    let left_edge = levels / left_step.max(1);
    let right_edge = levels / right_step.max(1);
    let last_row = levels.saturating_sub(1);
    let last_col = columns.saturating_sub(1);
    let columns_u32 = columns as u32;

    let mut layout = vec![Vec::with_capacity(columns); levels];
    for j in (0..levels).rev() {
        let mut placed_obstacle = false;
        let mut row = Vec::with_capacity(columns);
        for i in 0..columns {
            let mut obstacle_roll = |low: usize, high: usize, divisor: u32, rng: &mut Rng| {
                if !placed_obstacle
                    && i >= low
                    && i + high <= columns
                    && one_in(rng, columns_u32 * (divisor / dif))
                {
                    placed_obstacle = true;
                    Some(0.0)
                } else {
                    Some(3.0)
                }
            };
            let code = if i == 0 && j >= left_edge {
                Some(if j == last_row {
                    7.0
                } else if j == left_edge {
                    5.0
                } else {
                    1.0
                })
            } else if i == last_col && j >= right_edge {
                Some(if j == last_row {
                    8.0
                } else if j == right_edge {
                    6.0
                } else {
                    2.0
                })
            } else if i == 1 && j <= left_edge {
                Some(if j == 0 {
                    5.0
                } else if j == left_edge {
                    4.1
                } else {
                    1.0
                })
            } else if i + 2 == columns && j <= right_edge {
                Some(if j == 0 {
                    6.0
                } else if j == right_edge {
                    4.2
                } else {
                    2.0
                })
            } else if j > right_edge && (2..last_col).contains(&i) {
                if j == last_row {
                    Some(9.0)
                } else {
                    obstacle_roll(3, 3, 24, rng)
                }
            } else if j <= right_edge && (1..columns.saturating_sub(2)).contains(&i) {
                if j == 0 {
                    Some(4.0)
                } else {
                    obstacle_roll(2, 4, 12, rng)
                }
            } else if j > left_edge && (1..columns.saturating_sub(2)).contains(&i) {
                Some(if j == last_row { 9.0 } else { 3.0 })
            } else if j <= left_edge && (2..last_col).contains(&i) {
                if j == 0 {
                    Some(4.0)
                } else {
                    obstacle_roll(3, 3, 12, rng)
                }
            } else {
                None
            };
            row.push(code);
        }
        layout[j] = row;
    }
    layout
}

impl Stage {
    /// Spawns the ground, the skyline and every cell of `layout` (rows top to
    /// bottom), stacking rows upward from just above the ground.
    pub(crate) fn build(ctx: &mut SceneContext, layout: &[Vec<Option<f64>>]) -> Self {
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        let columns = layout.first().map(Vec::len).unwrap_or(0);
        let ground = Self::build_ground(ctx);
        let frames = StageFrames::load(ctx);
        let width_unit = (res_w / (columns as f32 + 3.0)).floor();
        let ground_height = ctx.entity(ground.entity).map(|e| e.height()).unwrap_or(0.0);

        let mut stage = Self {
            rows: Vec::with_capacity(layout.len()),
            columns,
            width_unit,
            height_unit: CELL_BASE_H * width_unit / CELL_BASE_W,
            ground,
            items: HashMap::new(),
            effects: HashMap::new(),
            frames,
            closed_windows: 0,
        };

        let mut built: Vec<Vec<Option<Cell>>> = Vec::with_capacity(layout.len());
        let mut y = res_h - (ground_height * 4.0 / 3.0).floor();
        let mut row_height = 0.0;
        for codes in layout.iter().rev() {
            let mut x = (res_w - width_unit * columns as f32) / 1.5;
            let mut row = Vec::with_capacity(columns);
            for code in codes {
                let kind = code.and_then(CellKind::from_code);
                match kind {
                    Some(kind) => {
                        let cell = stage.build_cell(ctx, kind, x, y);
                        let height = ctx.entity(cell.anchor).map(|e| e.height()).unwrap_or(0.0);
                        if kind.is_bottom() {
                            row_height = height * 1.15;
                        } else {
                            row_height = height;
                            stage.height_unit = height;
                        }
                        row.push(Some(cell));
                    }
                    None => row.push(None),
                }
                x += width_unit;
            }
            built.push(row);
            y -= row_height;
        }
        built.reverse();
        stage.rows = built;
        let floors = stage.rows.len();
        for (row, window) in stage.window_indices() {
            stage.set_closed(ctx, floors - row, window, false);
        }

        let left = ctx.spawn(&LEFT_CITY);
        Self::fit_width(ctx, left, width_unit * 1.75);
        ctx.set(left, &[Prop::Left(0.0), Prop::Bottom(res_h)]);
        let right = ctx.spawn(&RIGHT_CITY);
        Self::fit_width(ctx, right, width_unit * 2.0);
        ctx.set(right, &[Prop::Right(res_w), Prop::Bottom(res_h)]);

        info!(
            levels = stage.levels(),
            columns,
            width_unit,
            height_unit = stage.height_unit,
            items = stage.items.len(),
            "stage_built"
        );
        stage
    }

    fn fit_width(ctx: &mut SceneContext, id: EntityId, width: f32) -> f32 {
        let scale = ctx
            .entity(id)
            .map(|e| width / e.base_width().max(1.0))
            .unwrap_or(1.0);
        ctx.set(id, &[Prop::Scale(scale)]);
        scale
    }

    fn build_ground(ctx: &mut SceneContext) -> Ground {
        let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
        let entity = ctx.spawn(&GROUND);
        let scale = Self::fit_width(ctx, entity, res_w);
        ctx.set(entity, &[Prop::CenterX((res_w / 2.0).floor()), Prop::Bottom(res_h)]);
        let (height, centery) = ctx
            .entity(entity)
            .map(|e| (e.height(), e.centery()))
            .unwrap_or((0.0, res_h));
        for i in -4i32..=4 {
            let offset = (i as f32 * res_w / 6.0).floor();
            ctx.add_collnode(entity, GROUP_GROUND, height / 2.0, Vec2::new(offset, 0.0));
        }
        let bin = ctx.spawn_with(
            &BIN,
            &[Prop::Scale(scale), Prop::X((res_w * 3.0 / 4.0).floor()), Prop::CenterY(centery)],
        );
        let bench = ctx.spawn_with(
            &BENCH,
            &[
                Prop::Scale(scale),
                Prop::X((res_w * 9.0 / 10.0).floor()),
                Prop::CenterY(centery - 20.0),
            ],
        );
        Ground { entity, props: [bin, bench] }
    }

    fn build_cell(&mut self, ctx: &mut SceneContext, kind: CellKind, x: f32, y: f32) -> Cell {
        let anchor = ctx.spawn(&CELL_ANCHOR);
        let scale = Self::fit_width(ctx, anchor, self.width_unit);
        ctx.set(anchor, &[Prop::X(x), Prop::Y(y)]);
        if let Some(entity) = ctx.entity_mut(anchor) {
            entity.hidden = true;
        }
        let placed = [Prop::Scale(scale), Prop::X(x), Prop::Y(y)];
        let frame_template = match kind {
            CellKind::LeftBorder => &LEFT_BORDER,
            CellKind::RightBorder => &RIGHT_BORDER,
            CellKind::Window => &WINDOW,
            CellKind::Top | CellKind::TopLeftEdge | CellKind::TopRightEdge => &CENTRAL_TOP,
            CellKind::LeftTop => &LEFT_TOP,
            CellKind::RightTop => &RIGHT_TOP,
            CellKind::LeftBottom => &LEFT_BOTTOM,
            CellKind::RightBottom => &RIGHT_BOTTOM,
            CellKind::Bottom => &CENTRAL_BOTTOM,
            CellKind::Obstacle => &STATIC_OBSTACLE,
        };
        let frame = ctx.spawn_with(frame_template, &placed);
        let mut cell = Cell {
            kind,
            anchor,
            frame,
            glass: None,
            room: None,
            edge: None,
            item: None,
            effect: None,
        };

        match kind {
            CellKind::Window => {
                cell.glass = Some(ctx.spawn_with(&GLASS, &placed));
                cell.room = Some(ctx.spawn_with(&ROOM, &placed));
                cell.item = self.roll_window_item(ctx, anchor, scale);
            }
            CellKind::TopLeftEdge => cell.edge = Some(ctx.spawn_with(&LEFT_BORDER, &placed)),
            CellKind::TopRightEdge => cell.edge = Some(ctx.spawn_with(&RIGHT_BORDER, &placed)),
            CellKind::Obstacle => {
                ctx.run(
                    frame,
                    Action::repeat(Action::animate(Arc::clone(&self.frames.obstacle), 10.0), None),
                );
                let (width, height) = ctx
                    .entity(anchor)
                    .map(|e| (e.width(), e.height()))
                    .unwrap_or((0.0, 0.0));
                cell.effect = Some(self.spawn_effect(ctx, x, y, scale, width, height));
            }
            _ => {}
        }
        cell
    }

    fn roll_window_item(&mut self, ctx: &mut SceneContext, anchor: EntityId, scale: f32) -> Option<EntityId> {
        let (centerx, top, height) = ctx
            .entity(anchor)
            .map(|e| (e.centerx(), e.top(), e.height()))?;
        let rng = ctx.rng();
        let kind = if one_in(rng, 5) {
            ItemKind::Plant
        } else if one_in(rng, 15) {
            ItemKind::Bonus
        } else if one_in(rng, 50) {
            ItemKind::Bomb
        } else if one_in(rng, 50) {
            ItemKind::Invincibility
        } else if one_in(rng, 55) {
            ItemKind::ExtraLife
        } else {
            return None;
        };
        let id = if kind == ItemKind::Plant {
            self.spawn_item(ctx, kind, centerx, top + height * 0.40, scale / 1.75)
        } else {
            self.spawn_item(ctx, kind, centerx, top + height * 0.35, scale)
        };
        Some(id)
    }

    pub(crate) fn levels(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn columns(&self) -> usize {
        self.columns
    }

    pub(crate) fn width_unit(&self) -> f32 {
        self.width_unit
    }

    pub(crate) fn height_unit(&self) -> f32 {
        self.height_unit
    }

    /// Tracks how many windows are shut right now; returns the new count.
    pub(crate) fn count_closed(&mut self, delta: i64) -> i64 {
        self.closed_windows += delta;
        self.closed_windows
    }

    /// Floors count from 1 at the bottom row.
    fn index(&self, floor: usize, window: usize) -> Option<CellIndex> {
        let row = self.rows.len().checked_sub(floor)?;
        (window < self.columns).then_some((row, window))
    }

    fn cell_at(&self, (row, col): CellIndex) -> Option<&Cell> {
        self.rows.get(row)?.get(col)?.as_ref()
    }

    fn cell(&self, floor: usize, window: usize) -> Option<&Cell> {
        self.index(floor, window).and_then(|idx| self.cell_at(idx))
    }

    pub(crate) fn anchor(&self, floor: usize, window: usize) -> Option<EntityId> {
        self.cell(floor, window).map(|cell| cell.anchor)
    }

    pub(crate) fn kind(&self, floor: usize, window: usize) -> Option<CellKind> {
        self.cell(floor, window).map(|cell| cell.kind)
    }

    pub(crate) fn is_window(&self, floor: usize, window: usize) -> bool {
        self.kind(floor, window) == Some(CellKind::Window)
    }

    /// Open windows and roofs can be climbed; empty cells never.
    pub(crate) fn is_climbable(&self, ctx: &SceneContext, floor: usize, window: usize) -> bool {
        let Some(cell) = self.cell(floor, window) else {
            return false;
        };
        match cell.kind {
            CellKind::Window => !Self::glass_closed(ctx, cell),
            CellKind::Top
            | CellKind::TopLeftEdge
            | CellKind::TopRightEdge
            | CellKind::LeftTop
            | CellKind::RightTop => true,
            CellKind::LeftBorder
            | CellKind::RightBorder
            | CellKind::LeftBottom
            | CellKind::RightBottom
            | CellKind::Bottom
            | CellKind::Obstacle => false,
        }
    }

    pub(crate) fn is_window_closed(&self, ctx: &SceneContext, floor: usize, window: usize) -> bool {
        self.cell(floor, window)
            .filter(|cell| cell.kind == CellKind::Window)
            .is_some_and(|cell| Self::glass_closed(ctx, cell))
    }

    pub(crate) fn is_glass_moving(&self, ctx: &SceneContext, floor: usize, window: usize) -> bool {
        self.cell(floor, window)
            .and_then(|cell| cell.glass)
            .is_some_and(|glass| ctx.has_actions(glass, None))
    }

    fn glass_closed(ctx: &SceneContext, cell: &Cell) -> bool {
        let Some(glass) = cell.glass.and_then(|glass| ctx.entity(glass)) else {
            return false;
        };
        ctx.entity(cell.frame)
            .is_some_and(|frame| (glass.y - frame.y).abs() < 0.5)
    }

    fn window_indices(&self) -> Vec<CellIndex> {
        let mut indices = Vec::new();
        for (row, cells) in self.rows.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if cell.as_ref().is_some_and(|cell| cell.kind == CellKind::Window) {
                    indices.push((row, col));
                }
            }
        }
        indices
    }

    /// Starts the glass sliding shut when `close` is set and it is idle, or
    /// when it is already shut. Otherwise stops the glass where it is and
    /// returns whether it had been moving.
    fn close_window(&mut self, ctx: &mut SceneContext, idx: CellIndex, close: bool) -> bool {
        let Some(cell) = self.cell_at(idx).cloned() else {
            return false;
        };
        let Some(glass) = cell.glass else {
            return false;
        };
        let moving = ctx.has_actions(glass, None);
        if (close && !moving) || Self::glass_closed(ctx, &cell) {
            let Some((x, y, top, height)) = ctx
                .entity(cell.anchor)
                .map(|e| (e.x, e.y, e.top(), e.height()))
            else {
                return false;
            };
            if ctx.entity(glass).is_some_and(|g| g.top() > top) {
                ctx.set(glass, &[Prop::Y(y - 0.5 * height)]);
            }
            let rng = ctx.rng();
            let shut_secs = uniform(rng, 2.0, 5.0);
            let hold_secs = uniform(rng, 2.0, 4.0);
            let open_secs = uniform(rng, 2.0, 5.0);
            ctx.run(
                glass,
                Action::Show
                    .then(Action::move_to(x, y, shut_secs))
                    .then(Action::notify(Signal::with_arg(SIG_CLOSED_WINDOWS, 1)))
                    .then(Action::delay(hold_secs))
                    .then(Action::notify(Signal::with_arg(SIG_CLOSED_WINDOWS, -1)))
                    .then(Action::move_to(x, y - (height / 2.0).floor(), open_secs))
                    .then(Action::Hide),
            );
            false
        } else {
            ctx.abort_actions(glass, None);
            moving
        }
    }

    /// Puts the glass fully shut or fully open without animating.
    pub(crate) fn set_closed(&self, ctx: &mut SceneContext, floor: usize, window: usize, closed: bool) {
        let Some(cell) = self.cell(floor, window) else {
            return;
        };
        let (Some(glass), Some((y, height))) = (
            cell.glass,
            ctx.entity(cell.anchor).map(|e| (e.y, e.height())),
        ) else {
            return;
        };
        ctx.abort_actions(glass, None);
        let target = if closed { y } else { y - 0.5 * height };
        ctx.set(glass, &[Prop::Y(target)]);
        if let Some(entity) = ctx.entity_mut(glass) {
            entity.hidden = !closed;
        }
    }

    /// Re-issues the close on the window owning `anchor` after a scroll
    /// interrupted it.
    pub(crate) fn resume_window(&mut self, ctx: &mut SceneContext, anchor: EntityId) {
        let found = self.window_indices().into_iter().find(|idx| {
            self.cell_at(*idx).is_some_and(|cell| cell.anchor == anchor)
        });
        if let Some(idx) = found {
            self.close_window(ctx, idx, true);
        }
    }

    /// Stops every closing window; returns the ones that were interrupted.
    pub(crate) fn freeze_windows(&mut self, ctx: &mut SceneContext) -> Vec<CellIndex> {
        let mut interrupted = Vec::new();
        for idx in self.window_indices() {
            if self.close_window(ctx, idx, false) {
                interrupted.push(idx);
            }
        }
        interrupted
    }

    pub(crate) fn resume_windows(&mut self, ctx: &mut SceneContext, windows: &[CellIndex]) {
        for idx in windows {
            self.close_window(ctx, *idx, true);
        }
    }

    fn lights(&self, ctx: &mut SceneContext, idx: CellIndex) {
        let Some(room) = self.cell_at(idx).and_then(|cell| cell.room) else {
            return;
        };
        let fade = if ctx.rng().bool() {
            Action::color_fade(Color::rgba(150, 150, 150, 255), 2.0)
        } else {
            Action::color_fade(Color::rgba(255, 255, 175, 255), 1.0)
        };
        ctx.run(room, fade);
    }

    /// Random window events for on-screen windows; `x` is the climber's
    /// column position.
    pub(crate) fn check_windows(&mut self, ctx: &mut SceneContext, x: f32, difficulty: Difficulty) {
        let dif = difficulty.factor();
        let res_h = ctx.res_h();
        for idx in self.window_indices() {
            let Some(cell) = self.cell_at(idx).cloned() else {
                continue;
            };
            let Some((cell_x, cell_y)) = ctx.entity(cell.anchor).map(|e| (e.x, e.y)) else {
                continue;
            };
            if cell_y <= 0.0 || cell_y >= res_h {
                continue;
            }
            let aligned = (cell_x - x).abs() < 0.5;
            let plant = cell
                .item
                .filter(|item| self.items.get(item).is_some_and(|state| state.kind == ItemKind::Plant));
            if (aligned && one_in(ctx.rng(), 250)) || one_in(ctx.rng(), 2700 / dif) {
                self.close_window(ctx, idx, true);
            } else if let Some(plant) = plant {
                if aligned && one_in(ctx.rng(), 300 / dif) {
                    self.activate_plant(ctx, plant);
                }
            }
            if one_in(ctx.rng(), 2000) {
                self.lights(ctx, idx);
            }
        }
    }

    /// Screen y of the middle of the building, used to spread clouds.
    pub(crate) fn middle_level(&self, ctx: &SceneContext) -> f32 {
        self.rows
            .get(self.rows.len() / 2)
            .and_then(|row| row.get(self.columns / 2))
            .and_then(Option::as_ref)
            .and_then(|cell| ctx.entity(cell.anchor))
            .map(|anchor| anchor.centery())
            .unwrap_or_else(|| ctx.res_h() / 2.0)
    }

    /// Scrolls the ground and every cell by `dy` over `secs`.
    pub(crate) fn shift(&mut self, ctx: &mut SceneContext, dy: f32, secs: f32) {
        let slide = Action::move_by(0.0, dy, secs);
        ctx.run(self.ground.entity, slide.clone());
        for prop in self.ground.props {
            ctx.run(prop, slide.clone());
        }
        let cells: Vec<Cell> = self.rows.iter().flatten().flatten().cloned().collect();
        for cell in cells {
            match cell.kind {
                CellKind::Window => self.shift_window(ctx, &cell, &slide, secs),
                CellKind::Obstacle => {
                    ctx.run(cell.anchor, slide.clone());
                    for part in cell.parts() {
                        ctx.run(part, slide.clone());
                    }
                }
                _ => {
                    ctx.run(cell.anchor, slide.clone());
                    for part in cell.parts() {
                        ctx.abort_actions(part, None);
                        ctx.run(part, slide.clone());
                    }
                }
            }
        }
    }

    fn shift_window(&self, ctx: &mut SceneContext, cell: &Cell, slide: &Action, secs: f32) {
        let interrupted = cell.glass.is_some_and(|glass| ctx.has_actions(glass, None));
        ctx.run(cell.anchor, slide.clone());
        for part in cell.parts() {
            let pinned = self
                .items
                .get(&part)
                .is_some_and(|item| item.destroyed && item.kind.pinned_when_destroyed());
            if pinned {
                continue;
            }
            ctx.abort_kinds(part, &[ActionKind::MoveTo, ActionKind::Delay]);
            ctx.run(part, slide.clone());
        }
        if interrupted {
            ctx.run(
                cell.anchor,
                Action::delay(secs + 0.15).then(Action::notify(Signal::new(SIG_RESUME_WINDOW))),
            );
        }
    }
}
