const EFFECT_STEP_SECS: [f32; 3] = [0.55, 0.40, 0.25];
/// Clockwise from north.
const RAY_DIRECTIONS: [(f32, f32); 8] = [
    (0.0, -1.0),
    (1.0, -1.0),
    (1.0, 0.0),
    (1.0, 1.0),
    (0.0, 1.0),
    (-1.0, 1.0),
    (-1.0, 0.0),
    (-1.0, -1.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Item {
    kind: ItemKind,
    destroyed: bool,
    /// Hazards only hurt while active.
    active: bool,
}

#[derive(Debug, Clone)]
struct ObstacleEffect {
    step: Vec2,
    scale: f32,
    next_direction: usize,
}

impl Stage {
    fn spawn_item(&mut self, ctx: &mut SceneContext, kind: ItemKind, x: f32, y: f32, scale: f32) -> EntityId {
        let template = match kind {
            ItemKind::Plant => &PLANT,
            ItemKind::Bonus => &BONUS,
            ItemKind::Bomb => &BOMB,
            ItemKind::Invincibility => &INVINCIBILITY,
            ItemKind::ExtraLife => &LIFE1UP,
            ItemKind::Ray => &RAY,
        };
        let id = ctx.spawn_with(template, &[Prop::Scale(scale), Prop::X(x), Prop::Y(y)]);
        ctx.add_collnode(id, kind.group(), ITEM_RADIUS * scale, Vec2::default());
        match kind {
            ItemKind::Bonus => {
                let frames = Arc::clone(&self.frames.bonus);
                ctx.run(id, Action::animate(frames, 1.8).with_mode(Mode::PingPong));
            }
            ItemKind::Bomb => {
                let frames = Arc::clone(&self.frames.bomb);
                ctx.run(id, Action::animate(frames, 1.8).with_mode(Mode::Repeat));
            }
            ItemKind::Invincibility => {
                let frames = Arc::clone(&self.frames.invincibility);
                ctx.run(id, Action::animate(frames, 1.6).with_mode(Mode::Repeat));
            }
            _ => {}
        }
        self.items.insert(
            id,
            Item {
                kind,
                destroyed: false,
                active: kind == ItemKind::Ray,
            },
        );
        id
    }

    fn item(&self, id: EntityId) -> Option<Item> {
        self.items.get(&id).copied()
    }

    pub(crate) fn is_item_destroyed(&self, id: EntityId) -> bool {
        self.item(id).map_or(true, |item| item.destroyed)
    }

    pub(crate) fn is_item_active(&self, id: EntityId) -> bool {
        self.item(id).is_some_and(|item| item.active)
    }

    pub(crate) fn mark_destroyed(&mut self, id: EntityId) {
        if let Some(item) = self.items.get_mut(&id) {
            item.destroyed = true;
        }
    }

    /// Plants within `reach` pixels vertically of `y`.
    pub(crate) fn plants_near(&self, ctx: &SceneContext, y: f32, reach: f32) -> Vec<EntityId> {
        let mut plants: Vec<EntityId> = self
            .items
            .iter()
            .filter(|(_, item)| item.kind == ItemKind::Plant)
            .map(|(id, _)| *id)
            .filter(|id| ctx.entity(*id).is_some_and(|plant| (plant.y - y).abs() <= reach))
            .collect();
        plants.sort();
        plants
    }

    /// Runs the item's break-up animation; the entity deletes itself when it
    /// ends.
    pub(crate) fn destroy_item(&mut self, ctx: &mut SceneContext, id: EntityId) {
        let Some(item) = self.items.get_mut(&id) else {
            return;
        };
        item.destroyed = true;
        let kind = item.kind;
        match kind {
            ItemKind::Plant => {
                ctx.abort_actions(id, None);
                ctx.run(
                    id,
                    Action::call(|ctx: &mut SceneContext, _| ctx.play_sound("maceta"))
                        .then(Action::alpha_fade(0.0, 0.4)),
                );
                ctx.run(
                    id,
                    Action::scale(0.5, 0.4)
                        .then(Action::call(|ctx: &mut SceneContext, id| {
                            ctx.abort_actions(id, Some(ActionKind::RotateBy));
                        }))
                        .then(Action::Delete),
                );
            }
            ItemKind::Ray => {
                ctx.abort_actions(id, None);
                ctx.run(id, Action::alpha_fade(0.0, 0.2).then(Action::Delete));
            }
            ItemKind::Bomb => {
                if let Some((center, width)) = ctx.entity(id).map(|e| (e.center(), e.width())) {
                    let wave = ctx.spawn(&WAVE);
                    let scale = ctx
                        .entity(wave)
                        .map(|e| width / e.base_width().max(1.0))
                        .unwrap_or(1.0);
                    ctx.set(
                        wave,
                        &[Prop::Scale(scale), Prop::CenterX(center.x), Prop::CenterY(center.y)],
                    );
                    ctx.run(
                        wave,
                        Action::centered_scale(1.5, 1.5, Some(center)).then(Action::Delete),
                    );
                }
                ctx.run(id, Action::alpha_fade(0.0, 0.9));
                ctx.run(id, Action::scale(1.5, 1.0).then(Action::Delete));
            }
            ItemKind::Bonus | ItemKind::Invincibility | ItemKind::ExtraLife => {
                ctx.run(id, Action::alpha_fade(0.0, 0.9));
                ctx.run(id, Action::scale(1.5, 1.0).then(Action::Delete));
            }
        }
        debug!(item = id.0, kind = ?kind, "item_destroyed");
    }

    /// Sets an on-screen plant wobbling; it drops after a moment and expires.
    pub(crate) fn activate_plant(&mut self, ctx: &mut SceneContext, id: EntityId) {
        let res_h = ctx.res_h();
        let Some(item) = self.items.get_mut(&id) else {
            return;
        };
        let on_screen = ctx.entity(id).is_some_and(|plant| plant.y > 0.0 && plant.y < res_h);
        if !on_screen || item.destroyed || item.active {
            return;
        }
        item.active = true;
        ctx.run(id, Action::rotate_by(20.0, 0.16).with_mode(Mode::PingPong));
        ctx.run(
            id,
            Action::delay(2.5).then(Action::velocity(0.0, (res_h / 7.0).floor())),
        );
        ctx.run(id, Action::delay(10.0).then(Action::Delete));
    }

    /// Forgets items whose entities are gone.
    pub(crate) fn prune_items(&mut self, ctx: &SceneContext) {
        self.items.retain(|id, _| ctx.is_alive(*id));
        self.effects.retain(|id, _| ctx.is_alive(*id));
    }

    fn spawn_effect(
        &mut self,
        ctx: &mut SceneContext,
        x: f32,
        y: f32,
        scale: f32,
        width: f32,
        height: f32,
    ) -> EntityId {
        let id = ctx.spawn_with(
            &OBSTACLE_EFFECT,
            &[Prop::Scale(scale), Prop::X(x), Prop::Y(y)],
        );
        self.effects.insert(
            id,
            ObstacleEffect {
                step: Vec2::new(width, height),
                scale,
                next_direction: 0,
            },
        );
        self.cycle_effect(ctx, id, 0);
        id
    }

    /// One step of the obstacle's pulse; every third step fires a ray.
    pub(crate) fn cycle_effect(&mut self, ctx: &mut SceneContext, id: EntityId, step: usize) {
        if !self.effects.contains_key(&id) {
            return;
        }
        let secs = EFFECT_STEP_SECS[step.min(2)];
        let pulse = Action::animate(Arc::clone(&self.frames.effect), secs);
        let chain = if step >= 2 {
            pulse
                .then(Action::notify(Signal::new(SIG_SPAWN_RAY)))
                .then(Action::delay(0.5))
                .then(Action::notify(Signal::with_arg(SIG_EFFECT_CYCLE, 0)))
        } else {
            pulse.then(Action::notify(Signal::with_arg(SIG_EFFECT_CYCLE, step as i64 + 1)))
        };
        ctx.run(id, chain);
    }

    /// Fires a short-lived hazard into the next neighbouring cell, turning
    /// clockwise each time.
    pub(crate) fn spawn_ray(&mut self, ctx: &mut SceneContext, effect: EntityId) {
        let Some(state) = self.effects.get_mut(&effect) else {
            return;
        };
        if state.step.x == 0.0 {
            return;
        }
        let Some((x, y)) = ctx.entity(effect).map(|e| (e.x, e.y)) else {
            return;
        };
        let (dx, dy) = RAY_DIRECTIONS[state.next_direction];
        state.next_direction = (state.next_direction + 1) % RAY_DIRECTIONS.len();
        let (step, scale) = (state.step, state.scale);
        let ray = self.spawn_item(ctx, ItemKind::Ray, x + dx * step.x, y + dy * step.y, scale);
        let frames = Arc::clone(&self.frames.ray);
        ctx.run(ray, Action::animate(frames, 0.55).then(Action::Delete));
    }
}
