    use super::*;
    use engine::Director;

    const RES: (u32, u32) = (800, 600);
    const FRAME_MS: u64 = 25;

    fn headless() -> SceneContext {
        SceneContext::headless(RES.0, RES.1)
    }

    fn climber(ctx: &mut SceneContext) -> Climber {
        Climber::new(ctx, 400.0, 300.0, 80.0, 100.0)
    }

    fn uniform_layout(code: f64, levels: usize, columns: usize) -> Vec<Vec<Option<f64>>> {
        vec![vec![Some(code); columns]; levels]
    }

    fn settings(layout: Vec<Vec<Option<f64>>>) -> GameSettings {
        GameSettings {
            levels: layout.len(),
            columns: layout.first().map_or(0, Vec::len),
            difficulty: Difficulty::Normal,
            music: false,
            demo_idle_secs: 15,
            start_in_demo: false,
            layout: Some(layout),
        }
    }

    /// Ticks the reactor until the climber's displacement chain is over.
    fn settle(ctx: &mut SceneContext, climber: &Climber) {
        for _ in 0..400 {
            if !climber.is_moving(ctx) {
                return;
            }
            ctx.tick_reactor(0.05);
            ctx.take_signals();
        }
        panic!("climber never settled");
    }

    /// Ticks the reactor for `secs`, handing every posted signal to `scene`.
    fn pump(scene: &mut GameScene, ctx: &mut SceneContext, secs: f32) {
        let steps = (secs / 0.05).ceil() as usize;
        for _ in 0..steps {
            ctx.tick_reactor(0.05);
            for (signal, source) in ctx.take_signals() {
                scene.on_signal(ctx, signal, source);
            }
        }
    }

    /// Runs the loading substate to the end and clears the countdown.
    fn loaded_game(ctx: &mut SceneContext, layout: Vec<Vec<Option<f64>>>, demo: bool) -> GameScene {
        let mut scene = GameScene::new(settings(layout), demo);
        scene.enter(ctx);
        assert_eq!(ctx.state(), Some(LOADING_STATE));
        for _ in 0..=LAST_LOADING_STEP {
            assert_eq!(scene.state_realtick(ctx, LOADING_STATE), HookOutcome::Handled);
        }
        assert!(scene.is_loaded());
        assert_eq!(ctx.state(), None);
        while !scene.countdown.is_empty() {
            scene.on_scheduled(ctx, Signal::new(TIMER_COUNTDOWN));
        }
        scene
    }

    fn make_vulnerable(ctx: &mut SceneContext, scene: &GameScene) {
        let body = scene.player.as_ref().map(Climber::entity).expect("player");
        ctx.abort_kinds(body, &[ActionKind::Blink, ActionKind::AlphaFade]);
    }

    fn step_until(director: &mut Director, clock: &mut u64, max_steps: usize, done: impl Fn(&Director) -> bool) {
        for _ in 0..max_steps {
            if done(director) {
                return;
            }
            director.step(*clock, None);
            *clock += FRAME_MS;
        }
        assert!(done(director), "condition not reached after {max_steps} steps");
    }

    #[test]
    fn cell_codes_map_to_kinds() {
        assert_eq!(CellKind::from_code(0.0), Some(CellKind::Obstacle));
        assert_eq!(CellKind::from_code(3.0), Some(CellKind::Window));
        assert_eq!(CellKind::from_code(4.1), Some(CellKind::TopLeftEdge));
        assert_eq!(CellKind::from_code(4.2), Some(CellKind::TopRightEdge));
        assert_eq!(CellKind::from_code(9.0), Some(CellKind::Bottom));
        assert_eq!(CellKind::from_code(3.5), None);
        assert!(CellKind::Bottom.is_bottom());
        assert!(CellKind::LeftBottom.is_bottom());
        assert!(!CellKind::Window.is_bottom());
    }

    #[test]
    fn settings_take_the_grid_from_a_configured_layout() {
        let config = GameConfig {
            volume: 0,
            layout: Some(uniform_layout(4.0, 3, 2)),
            ..GameConfig::default()
        };
        let settings = GameSettings::from_config(&config);
        assert_eq!((settings.levels, settings.columns), (3, 2));
        assert!(!settings.music);

        let settings = GameSettings::from_config(&GameConfig::default());
        assert_eq!(settings.levels, GameConfig::default().levels as usize);
        assert_eq!(settings.columns, GameConfig::default().columns());
    }

    #[test]
    fn single_hand_climb_cycle_scores_once() {
        let mut ctx = headless();
        let mut climber = climber(&mut ctx);
        assert!(climber.request(&mut ctx, None, MoveRequest::UpRight));
        assert_eq!((climber.last(), climber.hands()), (Some(Stance::Up1Right), 1));
        settle(&mut ctx, &climber);
        assert!(climber.request(&mut ctx, None, MoveRequest::UpLeft));
        assert_eq!(climber.last(), Some(Stance::Up2Left));
        assert_eq!(climber.level(), STARTING_LEVEL + 1);
        settle(&mut ctx, &climber);
        assert!(climber.request(&mut ctx, None, MoveRequest::UpRight));
        assert_eq!(climber.last(), None);
        assert_eq!(climber.hands(), 2);
        assert_eq!(climber.score(), SCORE_CLIMB);
    }

    #[test]
    fn second_hit_turns_into_a_fall() {
        let mut ctx = headless();
        let mut climber = climber(&mut ctx);
        assert!(climber.request(&mut ctx, None, MoveRequest::Hit));
        assert_eq!(climber.score(), SCORE_HIT);
        assert_eq!((climber.last(), climber.hands()), (Some(Stance::Hit), 1));
        assert!(climber.request(&mut ctx, None, MoveRequest::Hit));
        assert_eq!(climber.lives(), STARTING_LIVES - 1);
        assert_eq!((climber.last(), climber.hands()), (Some(Stance::Fall), 0));
        assert_eq!(climber.score(), SCORE_HIT);
    }

    #[test]
    fn a_fallen_climber_ignores_requests_until_replaced() {
        let mut ctx = headless();
        let mut climber = climber(&mut ctx);
        climber.request(&mut ctx, None, MoveRequest::Fall);
        settle(&mut ctx, &climber);
        assert!(!climber.request(&mut ctx, None, MoveRequest::UpRight));
        assert_eq!(climber.last(), Some(Stance::Fall));
    }

    #[test]
    fn last_life_falls_with_the_parachute() {
        let mut ctx = headless();
        let mut climber = climber(&mut ctx);
        climber.lives = 1;
        climber.request(&mut ctx, None, MoveRequest::Fall);
        assert_eq!(climber.lives(), 0);
        assert_eq!(climber.hands(), 0);
        assert!(climber.is_moving(&ctx));
    }

    #[test]
    fn requests_are_discarded_while_moving() {
        let mut ctx = headless();
        let mut climber = climber(&mut ctx);
        assert!(climber.request(&mut ctx, None, MoveRequest::UpRight));
        assert!(climber.is_moving(&ctx));
        assert!(!climber.request(&mut ctx, None, MoveRequest::UpLeft));
        assert_eq!(climber.last(), Some(Stance::Up1Right));
    }

    #[test]
    fn a_hit_mid_climb_cannot_drop_the_climber_until_the_climb_lands() {
        let mut ctx = headless();
        let mut climber = climber(&mut ctx);
        assert!(climber.request(&mut ctx, None, MoveRequest::UpRight));
        assert!(climber.is_moving(&ctx));
        assert!(!climber.request(&mut ctx, None, MoveRequest::Hit));
        assert_eq!(climber.lives(), STARTING_LIVES);
        assert_eq!((climber.last(), climber.hands()), (Some(Stance::Up1Right), 1));

        settle(&mut ctx, &climber);
        assert!(climber.request(&mut ctx, None, MoveRequest::Hit));
        assert_eq!(climber.lives(), STARTING_LIVES - 1);
        assert_eq!((climber.last(), climber.hands()), (Some(Stance::Fall), 0));
    }

    #[test]
    fn sidesteps_only_start_from_idle() {
        let mut ctx = headless();
        let mut climber = climber(&mut ctx);
        assert!(climber.request(&mut ctx, None, MoveRequest::Right));
        assert_eq!(climber.window(), STARTING_WINDOW + 1);
        assert_eq!(climber.score(), SCORE_SIDESTEP);
        settle(&mut ctx, &climber);

        climber.request(&mut ctx, None, MoveRequest::UpLeft);
        settle(&mut ctx, &climber);
        climber.request(&mut ctx, None, MoveRequest::Left);
        assert_eq!(climber.window(), STARTING_WINDOW + 1);
        assert_eq!(climber.score(), SCORE_SIDESTEP);
    }

    #[test]
    fn half_step_down_keeps_the_floor() {
        let mut ctx = headless();
        let mut climber = climber(&mut ctx);
        climber.request(&mut ctx, None, MoveRequest::UpLeft);
        settle(&mut ctx, &climber);
        climber.request(&mut ctx, None, MoveRequest::Down);
        assert_eq!(climber.level(), STARTING_LEVEL);
        assert_eq!((climber.last(), climber.hands()), (None, 2));
        settle(&mut ctx, &climber);
        climber.request(&mut ctx, None, MoveRequest::Down);
        assert_eq!(climber.level(), STARTING_LEVEL - 1);
    }

    #[test]
    fn climb_up_and_back_down_on_a_small_roof() {
        let mut ctx = headless();
        let stage = Stage::build(&mut ctx, &uniform_layout(4.0, 3, 2));
        let mut climber = climber(&mut ctx);
        climber.level = 1;
        climber.window = 0;

        for request in [
            MoveRequest::UpRight,
            MoveRequest::UpLeft,
            MoveRequest::UpRight,
            MoveRequest::Down,
        ] {
            assert!(climber.request(&mut ctx, Some(&stage), request), "{request:?} rejected");
            settle(&mut ctx, &climber);
        }
        assert_eq!(climber.level(), 1);
        assert_eq!(climber.score(), SCORE_CLIMB);
        assert_eq!(climber.lives(), STARTING_LIVES);
        assert_eq!(climber.hands(), 2);
    }

    #[test]
    fn moves_off_the_grid_are_discarded() {
        let mut ctx = headless();
        let stage = Stage::build(&mut ctx, &uniform_layout(4.0, 3, 2));
        let mut climber = climber(&mut ctx);
        climber.level = 1;
        climber.window = 0;

        assert!(!climber.request(&mut ctx, Some(&stage), MoveRequest::Down));
        assert!(!climber.request(&mut ctx, Some(&stage), MoveRequest::Left));
        assert_eq!((climber.level(), climber.window(), climber.score()), (1, 0, 0));

        climber.level = 3;
        assert!(!climber.request(&mut ctx, Some(&stage), MoveRequest::UpRight));
        assert_eq!(climber.last(), None);

        climber.level = 1;
        assert!(climber.request(&mut ctx, Some(&stage), MoveRequest::Right));
        assert_eq!(climber.window(), 1);
        settle(&mut ctx, &climber);
        assert!(!climber.request(&mut ctx, Some(&stage), MoveRequest::Right));
    }

    #[test]
    fn committed_climb_skips_the_neighbour_check() {
        let mut ctx = headless();
        // Rows top to bottom: only the bottom floor can be climbed.
        let layout = vec![vec![Some(9.0); 2], vec![Some(4.0); 2]];
        let stage = Stage::build(&mut ctx, &layout);
        let mut climber = climber(&mut ctx);
        climber.level = 1;
        climber.window = 0;
        assert!(!climber.request(&mut ctx, Some(&stage), MoveRequest::UpRight));

        climber.hands = 1;
        climber.last = Some(Stance::Up1Left);
        assert!(climber.request(&mut ctx, Some(&stage), MoveRequest::UpRight));
        assert_eq!(climber.level(), 2);
    }

    #[test]
    fn closed_windows_cannot_be_climbed() {
        let mut ctx = headless();
        let layout = vec![vec![Some(4.0); 2], vec![Some(3.0); 2]];
        let stage = Stage::build(&mut ctx, &layout);
        assert!(stage.is_window(1, 0));
        assert!(stage.is_climbable(&ctx, 1, 0));
        assert!(stage.is_climbable(&ctx, 2, 0));
        let glass = stage.cell(1, 0).and_then(|cell| cell.glass).expect("glass");
        assert!(ctx.entity(glass).is_some_and(|pane| pane.hidden));

        stage.set_closed(&mut ctx, 1, 0, true);
        assert!(stage.is_window_closed(&ctx, 1, 0));
        assert!(!stage.is_climbable(&ctx, 1, 0));
        assert!(stage.is_climbable(&ctx, 1, 1));

        stage.set_closed(&mut ctx, 1, 0, false);
        assert!(!stage.is_window_closed(&ctx, 1, 0));
        assert!(stage.is_climbable(&ctx, 1, 0));
    }

    #[test]
    fn borders_bottoms_obstacles_and_gaps_are_not_climbable() {
        let mut ctx = headless();
        let layout = vec![vec![Some(1.0), Some(2.0), Some(9.0), Some(0.0), None, Some(5.0)]];
        let stage = Stage::build(&mut ctx, &layout);
        for window in 0..5 {
            assert!(!stage.is_climbable(&ctx, 1, window), "column {window}");
        }
        assert!(stage.is_climbable(&ctx, 1, 5));
        assert!(!stage.is_climbable(&ctx, 2, 5));
        assert!(!stage.is_climbable(&ctx, 1, 6));
        assert_eq!(stage.kind(1, 4), None);
    }

    #[test]
    fn closing_window_reports_shut_and_reopens() {
        let mut ctx = headless();
        let layout = vec![vec![Some(3.0)]];
        let mut stage = Stage::build(&mut ctx, &layout);
        stage.close_window(&mut ctx, (0, 0), true);
        assert!(stage.is_glass_moving(&ctx, 1, 0));

        let mut deltas = Vec::new();
        let mut closed = 0;
        for _ in 0..400 {
            ctx.tick_reactor(0.05);
            for (signal, _) in ctx.take_signals() {
                if signal.tag == SIG_CLOSED_WINDOWS {
                    deltas.push(signal.arg);
                    closed = stage.count_closed(signal.arg);
                }
            }
        }
        assert_eq!(deltas, vec![1, -1]);
        assert_eq!(closed, 0);
        assert!(!stage.is_glass_moving(&ctx, 1, 0));
        assert!(!stage.is_window_closed(&ctx, 1, 0));
    }

    #[test]
    fn frozen_windows_resume_where_they_were() {
        let mut ctx = headless();
        let layout = vec![vec![Some(3.0), Some(3.0)]];
        let mut stage = Stage::build(&mut ctx, &layout);
        stage.close_window(&mut ctx, (0, 1), true);
        ctx.tick_reactor(0.5);

        let frozen = stage.freeze_windows(&mut ctx);
        assert_eq!(frozen, vec![(0, 1)]);
        assert!(!stage.is_glass_moving(&ctx, 1, 1));

        stage.resume_windows(&mut ctx, &frozen);
        assert!(stage.is_glass_moving(&ctx, 1, 1));
        assert!(!stage.is_glass_moving(&ctx, 1, 0));
    }

    #[test]
    fn shifting_moves_every_cell() {
        let mut ctx = headless();
        let mut stage = Stage::build(&mut ctx, &uniform_layout(4.0, 2, 2));
        let anchor = stage.anchor(1, 0).expect("anchor");
        let before = ctx.entity(anchor).map(|e| e.y).expect("cell");
        stage.shift(&mut ctx, -50.0, 0.25);
        for _ in 0..10 {
            ctx.tick_reactor(0.05);
        }
        let after = ctx.entity(anchor).map(|e| e.y).expect("cell");
        assert!((after - (before - 50.0)).abs() < 0.01, "{before} -> {after}");
    }

    #[test]
    fn generated_layout_has_a_stepped_roof_and_a_bottom_row() {
        let mut rng = Rng::with_seed(7);
        let layout = generate_layout(25, 8, Difficulty::Normal, &mut rng);
        assert_eq!(layout.len(), 25);
        assert!(layout.iter().all(|row| row.len() == 8));
        assert_eq!(
            layout[0],
            vec![None, Some(5.0), Some(4.0), Some(4.0), Some(4.0), Some(4.0), Some(6.0), None]
        );
        assert_eq!(layout[24][0], Some(7.0));
        assert_eq!(layout[24][7], Some(8.0));
        assert!(layout[24][2..7].iter().all(|code| *code == Some(9.0)));
        for row in &layout {
            assert!(row.iter().filter(|code| **code == Some(0.0)).count() <= 1);
            assert!(row.iter().flatten().all(|code| CellKind::from_code(*code).is_some()));
        }
    }

    #[test]
    fn respawn_walks_to_a_climbable_cell() {
        let mut ctx = headless();
        let layout = vec![vec![Some(4.0); 2], vec![Some(3.0); 2], vec![Some(3.0); 2]];
        let stage = Stage::build(&mut ctx, &layout);
        let mut climber = climber(&mut ctx);
        climber.respawn(&mut ctx, &stage);
        assert_eq!((climber.level(), climber.window()), (STARTING_LEVEL, 1));
        assert!(climber.is_invincible(&ctx));

        let anchor = stage.anchor(2, 1).expect("anchor");
        let (cell_x, cell_y, cell_h) = ctx.entity(anchor).map(|e| (e.x, e.y, e.height())).expect("cell");
        let body = ctx.entity(climber.entity()).expect("body");
        assert_eq!(body.x, cell_x);
        assert_eq!(body.y, cell_y + (cell_h * 3.0 / 5.0).floor());

        stage.set_closed(&mut ctx, 2, 1, true);
        climber.window = 1;
        climber.respawn(&mut ctx, &stage);
        assert_eq!((climber.level(), climber.window()), (STARTING_LEVEL, 0));
    }

    #[test]
    fn demo_controller_keeps_climbing() {
        let mut ctx = headless();
        let stage = Stage::build(&mut ctx, &uniform_layout(4.0, 4, 3));
        let mut climber = climber(&mut ctx);
        climber.level = 1;
        climber.window = 1;

        let delay = climber.auto_move(&mut ctx, &stage);
        assert!((550..=900).contains(&delay));
        assert_eq!(climber.last(), Some(Stance::Up1Right));
        settle(&mut ctx, &climber);

        let delay = climber.auto_move(&mut ctx, &stage);
        assert!((625..=900).contains(&delay));
        assert_eq!(climber.last(), Some(Stance::Up2Left));
        assert_eq!(climber.level(), 2);
        settle(&mut ctx, &climber);

        climber.auto_move(&mut ctx, &stage);
        assert_eq!(climber.last(), None);
        assert_eq!(climber.score(), SCORE_CLIMB);
    }

    #[test]
    fn demo_controller_steps_aside_from_a_closing_window() {
        let mut ctx = headless();
        let layout = vec![vec![Some(4.0); 3], vec![Some(3.0); 3]];
        let mut stage = Stage::build(&mut ctx, &layout);
        let mut climber = climber(&mut ctx);
        climber.level = 1;
        climber.window = 1;
        stage.close_window(&mut ctx, (1, 1), true);
        assert!(stage.is_glass_moving(&ctx, 1, 1));

        climber.auto_move(&mut ctx, &stage);
        assert_eq!(climber.window(), 2);
        assert_eq!(climber.score(), SCORE_SIDESTEP);
    }

    #[test]
    fn item_flags_track_destruction_and_activation() {
        let mut ctx = headless();
        let mut stage = Stage::build(&mut ctx, &uniform_layout(4.0, 1, 2));
        let bonus = stage.spawn_item(&mut ctx, ItemKind::Bonus, 100.0, 100.0, 1.0);
        assert!(!stage.is_item_destroyed(bonus));
        assert!(!stage.is_item_active(bonus));
        stage.mark_destroyed(bonus);
        assert!(stage.is_item_destroyed(bonus));
        assert!(stage.is_item_destroyed(EntityId(u64::MAX)));

        let plant = stage.spawn_item(&mut ctx, ItemKind::Plant, 100.0, 100.0, 0.5);
        let hidden_plant = stage.spawn_item(&mut ctx, ItemKind::Plant, 100.0, -40.0, 0.5);
        stage.activate_plant(&mut ctx, plant);
        stage.activate_plant(&mut ctx, hidden_plant);
        assert!(stage.is_item_active(plant));
        assert!(ctx.has_actions(plant, Some(ActionKind::RotateBy)));
        assert!(!stage.is_item_active(hidden_plant));
        assert_eq!(stage.plants_near(&ctx, 150.0, 100.0), vec![plant]);
    }

    #[test]
    fn destroyed_items_delete_themselves() {
        let mut ctx = headless();
        let mut stage = Stage::build(&mut ctx, &uniform_layout(4.0, 1, 2));
        let bomb = stage.spawn_item(&mut ctx, ItemKind::Bomb, 200.0, 200.0, 1.0);
        let entities = ctx.world().len();
        stage.destroy_item(&mut ctx, bomb);
        assert!(stage.is_item_destroyed(bomb));
        assert_eq!(ctx.world().len(), entities + 1, "shock wave spawned");
        for _ in 0..40 {
            ctx.tick_reactor(0.05);
        }
        assert!(!ctx.is_alive(bomb));
        stage.prune_items(&ctx);
        assert!(stage.item(bomb).is_none());
    }

    #[test]
    fn obstacle_rays_turn_clockwise() {
        let mut ctx = headless();
        let mut stage = Stage::build(&mut ctx, &vec![vec![Some(4.0), Some(0.0), Some(4.0)]]);
        let effect = *stage.effects.keys().next().expect("obstacle effect");
        let (x, y) = ctx.entity(effect).map(|e| (e.x, e.y)).expect("effect");
        let (width, height) = stage
            .anchor(1, 1)
            .and_then(|anchor| ctx.entity(anchor))
            .map(|e| (e.width(), e.height()))
            .expect("anchor");

        let rays_before = stage.items.len();
        stage.spawn_ray(&mut ctx, effect);
        stage.spawn_ray(&mut ctx, effect);
        assert_eq!(stage.items.len(), rays_before + 2);
        let mut rays: Vec<EntityId> = stage
            .items
            .iter()
            .filter(|(_, item)| item.kind == ItemKind::Ray)
            .map(|(id, _)| *id)
            .collect();
        rays.sort();
        let north = ctx.entity(rays[0]).expect("north ray");
        assert_eq!((north.x, north.y), (x, y - height));
        let north_east = ctx.entity(rays[1]).expect("north-east ray");
        assert_eq!((north_east.x, north_east.y), (x + width, y - height));
        assert!(rays.iter().all(|ray| stage.is_item_active(*ray)));
    }

    #[test]
    fn effect_cycle_fires_a_ray_every_third_step() {
        let mut ctx = headless();
        let mut stage = Stage::build(&mut ctx, &vec![vec![Some(0.0), Some(4.0)]]);
        let mut rays_requested = 0;
        for _ in 0..80 {
            ctx.tick_reactor(0.05);
            for (signal, source) in ctx.take_signals() {
                match signal.tag {
                    SIG_EFFECT_CYCLE => stage.cycle_effect(&mut ctx, source, signal.arg as usize),
                    SIG_SPAWN_RAY => rays_requested += 1,
                    _ => {}
                }
            }
        }
        // 4 s covers two full 0.55 + 0.40 + 0.25 + 0.5 cycles.
        assert_eq!(rays_requested, 2);
    }

    #[test]
    fn hud_boards_follow_the_climber() {
        let mut ctx = headless();
        let mut hud = Hud::new(&mut ctx, 80.0, 3);
        hud.refresh(&mut ctx, 1250, 2, 5);
        assert_eq!(ctx.entity(hud.score).and_then(|e| e.text()), Some("1250"));
        assert_eq!(ctx.entity(hud.shadow).and_then(|e| e.text()), Some("1250"));
        assert_eq!(ctx.entity(hud.level).and_then(|e| e.text()), Some("04"));
        assert_eq!(ctx.entity(hud.lives).and_then(|e| e.text()), Some("x 2"));
        assert!(!ctx.has_actions(hud.lives, Some(ActionKind::Blink)));

        hud.refresh(&mut ctx, 1250, 1, 5);
        assert!(ctx.has_actions(hud.lives, Some(ActionKind::Blink)));
        hud.refresh(&mut ctx, 1250, 2, 5);
        assert!(!ctx.has_actions(hud.lives, Some(ActionKind::Blink)));
        assert_eq!(hud.shown_lives, 2);
    }

    #[test]
    fn clouds_wrap_around_the_screen() {
        let mut ctx = headless();
        ctx.new_layer(LAYER_WEATHER_BACK);
        ctx.new_layer(LAYER_WEATHER_FRONT);
        spawn_clouds(&mut ctx, LAYER_WEATHER_FRONT, &CLOUD_FRONT, 3);
        spawn_clouds(&mut ctx, LAYER_WEATHER_BACK, &[], 3);
        let clouds = ctx.layer_members(LAYER_WEATHER_FRONT);
        assert_eq!(clouds.len(), 3);
        assert!(ctx.layer_members(LAYER_WEATHER_BACK).is_empty());
        assert!(clouds.iter().all(|cloud| ctx.has_actions(*cloud, Some(ActionKind::Move))));

        ctx.set(clouds[0], &[Prop::Right(-1.0)]);
        let off_right = ctx.res_w() + 1.0;
        ctx.set(clouds[1], &[Prop::Left(off_right)]);
        wrap_clouds(&mut ctx, 300.0);
        let first = ctx.entity(clouds[0]).expect("cloud");
        assert_eq!(first.left(), ctx.res_w());
        assert!(first.y >= 0.0 && first.y <= 300.0);
        let second = ctx.entity(clouds[1]).expect("cloud");
        assert_eq!(second.right(), 0.0);
    }

    #[test]
    fn fireworks_spawn_one_node_per_shot() {
        let mut ctx = headless();
        let holder = ctx.spawn_blank();
        let system = ctx.new_particle_system(holder, None);
        let before = ctx.world().len();
        launch_fireworks(&mut ctx, None, system, 3);
        assert_eq!(ctx.world().len(), before + 3);

        let parent = ctx.spawn_blank();
        launch_fireworks(&mut ctx, Some(parent), system, 0);
        assert!(!ctx.is_alive(parent));
    }

    #[test]
    fn firework_tweak_keeps_a_palette_colour() {
        let mut rng = Rng::with_seed(3);
        let mut config = firework_config(800.0);
        for _ in 0..2000 {
            firework_tweak(&mut config, &mut rng, RES);
        }
        assert!(config.color == Color::WHITE || FIREWORK_COLORS.contains(&config.color));
        assert!(config.radius >= 40.0 && config.radius <= 66.0);
    }

    #[test]
    fn loading_runs_one_step_per_realtick() {
        let mut ctx = headless();
        let mut scene = GameScene::new(settings(uniform_layout(4.0, 3, 2)), false);
        scene.enter(&mut ctx);
        for step in 0..=LAST_LOADING_STEP {
            assert!(!scene.is_loaded(), "loaded early at step {step}");
            scene.state_realtick(&mut ctx, LOADING_STATE);
        }
        assert!(scene.is_loaded());
        assert!(scene.stage.as_ref().is_some());
        assert!(!ctx.layer_members(LAYER_ACTORS).is_empty());
        assert!(!ctx.layer_members(LAYER_WEATHER_BACK).is_empty());
        let player = scene.player.as_ref().expect("player");
        assert_eq!((player.level(), player.window()), (STARTING_LEVEL, 1));
        assert!(scene.is_paused(), "countdown still running");
    }

    #[test]
    fn countdown_releases_the_game_after_the_last_sign() {
        let mut ctx = headless();
        let mut scene = GameScene::new(settings(uniform_layout(4.0, 3, 2)), false);
        scene.enter(&mut ctx);
        for _ in 0..=LAST_LOADING_STEP {
            scene.state_realtick(&mut ctx, LOADING_STATE);
        }
        assert_eq!(scene.countdown.len(), 3);
        assert_eq!(ctx.pending_scheduled(), 1);
        for remaining in (0..3).rev() {
            scene.on_scheduled(&mut ctx, Signal::new(TIMER_COUNTDOWN));
            assert_eq!(scene.countdown.len(), remaining);
        }
        assert!(!scene.is_paused());
    }

    #[test]
    fn keypad_moves_the_climber_unless_paused() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        scene.handle_event(&mut ctx, &InputEvent::KeyDown(Key::P));
        assert!(scene.is_paused());
        scene.handle_event(&mut ctx, &InputEvent::KeyDown(Key::Keypad9));
        assert_eq!(scene.player.as_ref().and_then(Climber::last), None);

        scene.handle_event(&mut ctx, &InputEvent::KeyDown(Key::P));
        assert!(!scene.is_paused());
        scene.handle_event(&mut ctx, &InputEvent::KeyDown(Key::Keypad9));
        assert_eq!(scene.player.as_ref().and_then(Climber::last), Some(Stance::Up1Right));
    }

    #[test]
    fn joystick_axes_map_to_moves() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        scene.handle_event(&mut ctx, &InputEvent::JoyAxis { axis: 1, value: -0.95 });
        assert_eq!(scene.player.as_ref().and_then(Climber::last), Some(Stance::Up1Left));
    }

    #[test]
    fn demo_games_ignore_the_stick_but_not_the_keyboard() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), true);
        scene.handle_event(&mut ctx, &InputEvent::JoyAxis { axis: 1, value: -0.95 });
        assert_eq!(scene.player.as_ref().and_then(Climber::last), None);
        scene.handle_event(&mut ctx, &InputEvent::KeyDown(Key::Keypad9));
        assert_eq!(scene.player.as_ref().and_then(Climber::last), Some(Stance::Up1Right));
        assert!(scene.demo);
        assert_eq!(ctx.cancel_scheduled(TIMER_DEMO_END), 1);
    }

    #[test]
    fn pause_freezes_closing_windows() {
        let mut ctx = headless();
        let layout = vec![vec![Some(4.0); 2], vec![Some(3.0); 2], vec![Some(3.0); 2]];
        let mut scene = loaded_game(&mut ctx, layout, false);
        scene.stage.as_mut().expect("stage").close_window(&mut ctx, (2, 0), true);

        scene.handle_event(&mut ctx, &InputEvent::KeyDown(Key::P));
        assert_eq!(scene.interrupted, vec![(2, 0)]);
        assert!(!scene.stage.as_ref().expect("stage").is_glass_moving(&ctx, 1, 0));

        scene.handle_event(&mut ctx, &InputEvent::KeyDown(Key::P));
        assert!(scene.interrupted.is_empty());
        assert!(scene.stage.as_ref().expect("stage").is_glass_moving(&ctx, 1, 0));
    }

    #[test]
    fn closed_window_drops_the_climber_and_it_respawns() {
        let mut ctx = headless();
        let layout = vec![vec![Some(4.0); 2], vec![Some(3.0); 2], vec![Some(3.0); 2]];
        let mut scene = loaded_game(&mut ctx, layout, false);
        make_vulnerable(&mut ctx, &scene);
        scene.stage.as_ref().expect("stage").set_closed(&mut ctx, 2, 1, true);

        scene.realtick(&mut ctx);
        let player = scene.player.as_ref().expect("player");
        assert_eq!(player.lives(), STARTING_LIVES - 1);
        assert_eq!(player.last(), Some(Stance::Fall));

        pump(&mut scene, &mut ctx, 2.5);
        scene.realtick(&mut ctx);
        let player = scene.player.as_ref().expect("player");
        assert_eq!(player.last(), None);
        assert_eq!((player.level(), player.window()), (STARTING_LEVEL, 0));
    }

    #[test]
    fn invincible_climber_stays_on_a_closed_window() {
        let mut ctx = headless();
        let layout = vec![vec![Some(4.0); 2], vec![Some(3.0); 2], vec![Some(3.0); 2]];
        let mut scene = loaded_game(&mut ctx, layout, false);
        scene.stage.as_ref().expect("stage").set_closed(&mut ctx, 2, 1, true);
        scene.realtick(&mut ctx);
        assert_eq!(scene.player.as_ref().map(Climber::lives), Some(STARTING_LIVES));
    }

    #[test]
    fn reaching_the_roof_wins() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        scene.player.as_mut().expect("player").level = 3;
        scene.realtick(&mut ctx);
        assert!(scene.finished);
        assert!(scene.is_paused());
    }

    #[test]
    fn running_out_of_lives_ends_the_game() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        scene.player.as_mut().expect("player").lives = 0;
        scene.realtick(&mut ctx);
        assert!(scene.finished);
    }

    #[test]
    fn collected_bonus_pays_out_once() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        let body = scene.player.as_ref().map(Climber::entity).expect("player");
        let bonus = scene
            .stage
            .as_mut()
            .expect("stage")
            .spawn_item(&mut ctx, ItemKind::Bonus, 400.0, 300.0, 1.0);

        scene.on_collision(&mut ctx, (GROUP_PLAYER, GROUP_BONUS), body, bonus);
        scene.on_collision(&mut ctx, (GROUP_PLAYER, GROUP_BONUS), body, bonus);
        pump(&mut scene, &mut ctx, 2.0);
        assert_eq!(scene.player.as_ref().map(Climber::score), Some(SCORE_ITEM));
        assert!(!ctx.is_alive(bonus));
    }

    #[test]
    fn extra_life_reaches_the_lives_board() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        let body = scene.player.as_ref().map(Climber::entity).expect("player");
        let life = scene
            .stage
            .as_mut()
            .expect("stage")
            .spawn_item(&mut ctx, ItemKind::ExtraLife, 400.0, 300.0, 1.0);
        scene.on_collision(&mut ctx, (GROUP_PLAYER, GROUP_LIFE1UP), body, life);
        pump(&mut scene, &mut ctx, 2.0);
        assert_eq!(scene.player.as_ref().map(Climber::lives), Some(STARTING_LIVES + 1));
        let hud = scene.hud.as_ref().expect("hud");
        assert_eq!(hud.shown_lives, STARTING_LIVES + 1);
    }

    #[test]
    fn only_active_hazards_hit_the_climber() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        make_vulnerable(&mut ctx, &scene);
        let body = scene.player.as_ref().map(Climber::entity).expect("player");
        let stage = scene.stage.as_mut().expect("stage");
        let plant = stage.spawn_item(&mut ctx, ItemKind::Plant, 400.0, 200.0, 0.5);

        scene.on_collision(&mut ctx, (GROUP_PLAYER, GROUP_ENEMY), body, plant);
        assert_eq!(scene.player.as_ref().map(Climber::score), Some(0));

        scene.stage.as_mut().expect("stage").activate_plant(&mut ctx, plant);
        scene.on_collision(&mut ctx, (GROUP_PLAYER, GROUP_ENEMY), body, plant);
        let player = scene.player.as_ref().expect("player");
        assert_eq!(player.score(), SCORE_HIT);
        assert_eq!(player.hands(), 1);
        assert!(scene.stage.as_ref().expect("stage").is_item_destroyed(plant));
    }

    #[test]
    fn invincibility_shields_from_hazards() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        make_vulnerable(&mut ctx, &scene);
        let body = scene.player.as_ref().map(Climber::entity).expect("player");
        let stage = scene.stage.as_mut().expect("stage");
        let star = stage.spawn_item(&mut ctx, ItemKind::Invincibility, 400.0, 300.0, 1.0);
        let plant = stage.spawn_item(&mut ctx, ItemKind::Plant, 400.0, 200.0, 0.5);
        stage.activate_plant(&mut ctx, plant);

        scene.on_collision(&mut ctx, (GROUP_PLAYER, GROUP_INVINCIBILITY), body, star);
        assert_eq!(scene.player.as_ref().map(Climber::score), Some(SCORE_ITEM));
        assert!(scene.player.as_ref().is_some_and(|p| p.is_invincible(&ctx)));

        scene.on_collision(&mut ctx, (GROUP_PLAYER, GROUP_ENEMY), body, plant);
        assert_eq!(scene.player.as_ref().map(Climber::score), Some(SCORE_ITEM));
        assert!(!scene.stage.as_ref().expect("stage").is_item_destroyed(plant));
    }

    #[test]
    fn bomb_clears_nearby_plants() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        let body = scene.player.as_ref().map(Climber::entity).expect("player");
        let body_y = ctx.entity(body).map(|e| e.y).expect("body");
        let stage = scene.stage.as_mut().expect("stage");
        let bomb = stage.spawn_item(&mut ctx, ItemKind::Bomb, 400.0, body_y, 1.0);
        let near = stage.spawn_item(&mut ctx, ItemKind::Plant, 300.0, body_y - 50.0, 0.5);
        let far = stage.spawn_item(&mut ctx, ItemKind::Plant, 300.0, body_y - 400.0, 0.5);

        scene.on_collision(&mut ctx, (GROUP_PLAYER, GROUP_BOMB), body, bomb);
        pump(&mut scene, &mut ctx, 1.0);
        let stage = scene.stage.as_ref().expect("stage");
        assert!(stage.is_item_destroyed(bomb));
        assert!(stage.is_item_destroyed(near));
        assert!(!stage.is_item_destroyed(far));
    }

    #[test]
    fn ground_lands_the_climber_and_breaks_falling_plants() {
        let mut ctx = headless();
        let mut scene = loaded_game(&mut ctx, uniform_layout(4.0, 3, 2), false);
        let body = scene.player.as_ref().map(Climber::entity).expect("player");
        let ground = scene.stage.as_ref().map(|stage| stage.ground.entity).expect("stage");
        ctx.run(body, Action::move_by(0.0, 100.0, 1.0));
        scene.on_collision(&mut ctx, (GROUP_GROUND, GROUP_PLAYER), ground, body);
        assert!(!ctx.has_actions(body, Some(ActionKind::MoveBy)));

        let stage = scene.stage.as_mut().expect("stage");
        let idle = stage.spawn_item(&mut ctx, ItemKind::Plant, 100.0, 500.0, 0.5);
        let falling = stage.spawn_item(&mut ctx, ItemKind::Plant, 200.0, 500.0, 0.5);
        stage.activate_plant(&mut ctx, falling);
        scene.on_collision(&mut ctx, (GROUP_GROUND, GROUP_ENEMY), ground, idle);
        scene.on_collision(&mut ctx, (GROUP_GROUND, GROUP_ENEMY), ground, falling);
        let stage = scene.stage.as_ref().expect("stage");
        assert!(!stage.is_item_destroyed(idle));
        assert!(stage.is_item_destroyed(falling));
    }

    #[test]
    fn leaving_the_game_cancels_its_timers() {
        let mut ctx = headless();
        let mut scene = GameScene::new(settings(uniform_layout(4.0, 3, 2)), true);
        scene.enter(&mut ctx);
        for _ in 0..=LAST_LOADING_STEP {
            scene.state_realtick(&mut ctx, LOADING_STATE);
        }
        assert_eq!(ctx.pending_scheduled(), 2);
        scene.leave(&mut ctx);
        assert_eq!(ctx.pending_scheduled(), 0);
    }

    #[test]
    fn title_menu_wraps_its_selection() {
        let mut ctx = headless();
        let mut title = TitleScene::new(settings(uniform_layout(4.0, 3, 2)));
        title.enter(&mut ctx);
        assert_eq!(title.selected, 0);
        title.handle_event(&mut ctx, &InputEvent::KeyDown(Key::Left));
        assert_eq!(title.selected, 1);
        title.handle_event(&mut ctx, &InputEvent::KeyDown(Key::D));
        assert_eq!(title.selected, 0);
        assert_eq!(ctx.layer_members(LAYER_MENU_UI).len(), MENU_OPTIONS.len() + 1);
        assert_eq!(ctx.pending_scheduled(), 1);
        title.leave(&mut ctx);
        assert_eq!(ctx.pending_scheduled(), 0);
    }

    #[test]
    fn enter_on_the_title_starts_a_fresh_game() {
        let mut director = Director::new(headless(), 40);
        director.set_scene(build_title_scene(settings(uniform_layout(4.0, 3, 2))));
        let mut clock = 0;
        director.step(clock, None);
        clock += FRAME_MS;

        director.push_event(InputEvent::KeyDown(Key::Enter));
        step_until(&mut director, &mut clock, 400, |d| d.active_scene_name() == Some("game"));
        assert_eq!(director.previous_scene_name(), Some("title"));
        assert_eq!(director.context().running_action_count(), 0);

        step_until(&mut director, &mut clock, 40, |d| d.context().state().is_none());
        director.push_event(InputEvent::KeyDown(Key::Escape));
        step_until(&mut director, &mut clock, 4, |d| d.active_scene_name() == Some("title"));
        assert!(director.is_running());
    }

    #[test]
    fn idle_title_switches_to_a_demo() {
        let mut settings = settings(uniform_layout(4.0, 3, 2));
        settings.demo_idle_secs = 1;
        let mut director = Director::new(headless(), 40);
        director.set_scene(build_title_scene(settings));
        let mut clock = 0;
        step_until(&mut director, &mut clock, 60, |d| d.active_scene_name() == Some("game"));
        assert!(clock >= 1000);
    }

    #[test]
    fn start_in_demo_skips_the_idle_wait() {
        let mut settings = settings(uniform_layout(4.0, 3, 2));
        settings.start_in_demo = true;
        let mut director = Director::new(headless(), 40);
        director.set_scene(build_title_scene(settings));
        director.step(0, None);
        assert_eq!(director.active_scene_name(), Some("game"));
    }

    #[test]
    fn escape_on_the_title_quits() {
        let mut director = Director::new(headless(), 40);
        director.set_scene(build_title_scene(settings(uniform_layout(4.0, 3, 2))));
        let mut clock = 0;
        director.push_event(InputEvent::KeyDown(Key::Escape));
        step_until(&mut director, &mut clock, 200, |d| !d.is_running());
        assert_eq!(director.active_scene_name(), Some("title"));
    }
