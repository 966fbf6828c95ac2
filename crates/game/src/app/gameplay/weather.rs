/// Spawns `count` drifting clouds on `layer`, picking shapes from `pool`.
fn spawn_clouds(ctx: &mut SceneContext, layer: &'static str, pool: &[&'static str], count: usize) {
    let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
    let start_y = if layer == LAYER_WEATHER_BACK {
        (res_h * 3.0 / 2.0).floor()
    } else {
        -res_h
    };
    if pool.is_empty() {
        return;
    }
    for _ in 0..count {
        let key = pool[ctx.rng().usize(..pool.len())];
        let template = EntityTemplate::new(key, layer)
            .with_fallback(res_w / 5.0, res_w / 12.0, Color::rgba(255, 255, 255, 170));
        let cloud = ctx.spawn(&template);
        recolocate_cloud(ctx, cloud, start_y);
        let speed = randint(ctx.rng(), 15, 60) as f32;
        let direction = if ctx.rng().bool() { 1.0 } else { -1.0 };
        ctx.run(cloud, Action::velocity(direction * speed, 0.0));
    }
}

/// Random x across the screen; y inside `[0, maxy]`, or above the screen
/// when `maxy` is not positive.
fn recolocate_cloud(ctx: &mut SceneContext, cloud: EntityId, maxy: f32) {
    let res_w = ctx.res_w() as i64;
    let maxy = maxy as i64;
    let rng = ctx.rng();
    let x = randint(rng, 0, res_w) as f32;
    let y = if maxy <= 0 {
        -(randint(rng, maxy.abs(), (maxy * 2).abs()) as f32)
    } else {
        randint(rng, 0, maxy) as f32
    };
    ctx.set(cloud, &[Prop::X(x), Prop::Y(y)]);
}

/// Clouds leaving one side re-enter from the other at a new height.
fn wrap_clouds(ctx: &mut SceneContext, maxy: f32) {
    let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
    let maxy = maxy.min(res_h);
    for layer in [LAYER_WEATHER_BACK, LAYER_WEATHER_FRONT] {
        for cloud in ctx.layer_members(layer) {
            let Some((left, right)) = ctx.entity(cloud).map(|e| (e.left(), e.right())) else {
                continue;
            };
            if right < 0.0 {
                recolocate_cloud(ctx, cloud, maxy);
                ctx.set(cloud, &[Prop::Left(res_w)]);
            } else if left >= res_w {
                recolocate_cloud(ctx, cloud, maxy);
                ctx.set(cloud, &[Prop::Right(0.0)]);
            }
        }
    }
}

fn firework_config(res_w: f32) -> EmitterConfig {
    EmitterConfig {
        delay: 0.01,
        num_particles: 1,
        life: 0.7,
        fade_time: 0.5,
        fade_in: 0.1,
        scale: (0.1, 0.2),
        scale_delta: 0.2,
        alpha: 255.0,
        color: Color::WHITE,
        velocity: (res_w / 10.0).floor(),
        radius: (res_w / 16.0).floor(),
        tangent: true,
    }
}

fn firework_tweak(config: &mut EmitterConfig, rng: &mut Rng, (res_w, _): (u32, u32)) {
    if !one_in(rng, 56) {
        return;
    }
    let res_w = res_w as i64;
    config.color = FIREWORK_COLORS[rng.usize(..FIREWORK_COLORS.len())];
    config.radius = randint(rng, res_w / 20, res_w / 12) as f32;
    config.velocity = randint(rng, res_w / 12, res_w / 8) as f32;
}

/// Launches `shots` bursts across the upper third of the screen. Each burst
/// retires its node and launches `shots - 2` more when it fades out.
fn launch_fireworks(ctx: &mut SceneContext, parent: Option<EntityId>, system: ParticleSystemId, shots: i32) {
    if let Some(parent) = parent {
        ctx.run(parent, Action::Delete);
    }
    if shots <= 0 {
        return;
    }
    let sound = if ctx.rng().bool() { "silbido0" } else { "silbido1" };
    ctx.play_sound(sound);
    let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
    for i in 0..shots {
        let node = ctx.spawn_blank();
        let x = randint(ctx.rng(), 0, res_w as i64) as f32;
        let y = randint(ctx.rng(), 0, (res_h / 3.0) as i64) as f32;
        ctx.set(node, &[Prop::X(x), Prop::Y(y)]);
        ctx.new_emitter(system, node, firework_config(res_w), Some(firework_tweak));
        let delay = uniform(ctx.rng(), 1.2, 2.0);
        ctx.run(
            node,
            Action::Hide
                .then(Action::delay(delay * i as f32))
                .then(Action::call(|ctx: &mut SceneContext, _| ctx.play_sound("fireworks")))
                .then(Action::Show)
                .then(Action::delay(delay))
                .then(Action::alpha_fade(0.0, delay / 2.0))
                .then(Action::delay(delay * 2.0))
                .then(Action::call(move |ctx: &mut SceneContext, node| {
                    launch_fireworks(ctx, Some(node), system, shots - 2);
                })),
        );
    }
    debug!(shots, "fireworks_launched");
}

/// The caped climber that crosses the screen when invincibility is picked.
fn spawn_super(ctx: &mut SceneContext, scale: f32) -> EntityId {
    let (res_w, res_h) = (ctx.res_w(), ctx.res_h());
    let hero = ctx.spawn(&SUPER);
    ctx.set(hero, &[Prop::Scale(scale)]);
    let (width, height) = ctx
        .entity(hero)
        .map(|e| (e.width(), e.height()))
        .unwrap_or((0.0, 0.0));
    let x = (res_w * 11.0 / 12.0).floor();
    ctx.set(hero, &[Prop::X(x), Prop::Y(res_h + height)]);
    ctx.run(
        hero,
        Action::move_to(x - (width / 2.0).floor(), (res_h * 2.0 / 3.0).floor(), 0.75)
            .then(Action::move_to(x + (width / 3.0).floor(), (res_h / 3.0).floor(), 1.05))
            .then(Action::move_to(x, -height, 0.85))
            .then(Action::Delete),
    );
    hero
}
