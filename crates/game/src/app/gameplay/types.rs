// Layers, back to front.
const LAYER_BG: &str = "bg";
const LAYER_CITY: &str = "city";
const LAYER_WEATHER_BACK: &str = "weather_b";
const LAYER_PARTICLES: &str = "particles";
const LAYER_DUMMY: &str = "dummy";
const LAYER_ROOM: &str = "room";
const LAYER_GLASS: &str = "glass";
const LAYER_BUILDING: &str = "building";
const LAYER_ACTORS: &str = "actors";
const LAYER_WEATHER_FRONT: &str = "weather_f";
const LAYER_INFO: &str = "info";
const LAYER_POINTS: &str = "points";
const LAYER_PAUSE: &str = "pausa";
const LAYER_LOAD: &str = "load";

const GROUP_PLAYER: &str = "player";
const GROUP_GROUND: &str = "ground";
const GROUP_ENEMY: &str = "enemy";
const GROUP_BONUS: &str = "bonus";
const GROUP_LIFE1UP: &str = "life1up";
const GROUP_INVINCIBILITY: &str = "invincibility";
const GROUP_BOMB: &str = "bomb";

// Signals posted by action chains back to the game scene.
const SIG_SCORE: &str = "score";
const SIG_EXTRA_LIFE: &str = "extra_life";
const SIG_CLOSED_WINDOWS: &str = "closed_windows";
const SIG_DESTROY_ITEM: &str = "destroy_item";
const SIG_EFFECT_CYCLE: &str = "effect_cycle";
const SIG_SPAWN_RAY: &str = "spawn_ray";
const SIG_RESUME_WINDOW: &str = "resume_window";
const SIG_EXIT_GAME: &str = "exit_game";
const SIG_MUSIC_ENDED: &str = "music_ended";

// One-shot timers.
const TIMER_COUNTDOWN: &str = "countdown";
const TIMER_IDLE_DEMO: &str = "idle_demo";

const CLIMBER_FRAMES_DIR: &str = "climber/female";
const STAGE_FRAMES_DIR: &str = "stages/default";

const CELL_BASE_W: f32 = 160.0;
const CELL_BASE_H: f32 = 200.0;
const CLIMBER_BASE_W: f32 = 170.0;
const CLIMBER_BASE_H: f32 = 340.0;
const ITEM_BASE: f32 = 112.0;
const ITEM_RADIUS: f32 = 56.0;

const STARTING_LIVES: u32 = 3;
const STARTING_LEVEL: usize = 2;
const STARTING_WINDOW: usize = 2;

const SCORE_SIDESTEP: i64 = 50;
const SCORE_CLIMB: i64 = 100;
const SCORE_HIT: i64 = -200;
const SCORE_ITEM: i64 = 500;

const COUNTDOWN_STEP_MS: u64 = 1250;

const PLAYER_COLOR: Color = Color::rgba(255, 0, 0, 255);
const FIREWORK_COLORS: [Color; 7] = [
    Color::rgba(255, 0, 0, 255),
    Color::rgba(0, 255, 0, 255),
    Color::rgba(30, 144, 255, 255),
    Color::rgba(255, 255, 0, 255),
    Color::rgba(160, 32, 240, 255),
    Color::rgba(0, 255, 255, 255),
    Color::rgba(255, 165, 0, 255),
];

const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

const BACKGROUND: EntityTemplate = EntityTemplate::new("stages/default/tile", LAYER_BG)
    .with_hotspot(Hotspot::TOP_LEFT)
    .with_fallback(800.0, 600.0, Color::rgb(70, 110, 170));
const CELL_ANCHOR: EntityTemplate = EntityTemplate::new("stages/default/dummy", LAYER_DUMMY)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, TRANSPARENT);
const WINDOW: EntityTemplate = EntityTemplate::new("stages/default/window", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(120, 120, 135, 255));
const GLASS: EntityTemplate = EntityTemplate::new("stages/default/glass", LAYER_GLASS)
    .with_fallback(CELL_BASE_W * 0.8, CELL_BASE_H * 0.8, Color::rgba(170, 220, 255, 220));
const ROOM: EntityTemplate = EntityTemplate::new("stages/default/room", LAYER_ROOM)
    .with_fallback(CELL_BASE_W * 0.8, CELL_BASE_H * 0.8, Color::rgba(60, 50, 40, 255));
const LEFT_BORDER: EntityTemplate = EntityTemplate::new("stages/default/lborder", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(100, 100, 115, 255));
const RIGHT_BORDER: EntityTemplate = EntityTemplate::new("stages/default/rborder", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(100, 100, 115, 255));
const CENTRAL_TOP: EntityTemplate = EntityTemplate::new("stages/default/top", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(140, 80, 70, 255));
const LEFT_TOP: EntityTemplate = EntityTemplate::new("stages/default/ltop", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(140, 80, 70, 255));
const RIGHT_TOP: EntityTemplate = EntityTemplate::new("stages/default/rtop", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(140, 80, 70, 255));
const LEFT_BOTTOM: EntityTemplate = EntityTemplate::new("stages/default/lbottom", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(90, 90, 100, 255));
const RIGHT_BOTTOM: EntityTemplate = EntityTemplate::new("stages/default/rbottom", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(90, 90, 100, 255));
const CENTRAL_BOTTOM: EntityTemplate = EntityTemplate::new("stages/default/bottom", LAYER_BUILDING)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(90, 90, 100, 255));
const STATIC_OBSTACLE: EntityTemplate =
    EntityTemplate::new("stages/default/obstacle_staticenemy_00", LAYER_BUILDING)
        .with_fallback(CELL_BASE_W, CELL_BASE_H, Color::rgba(60, 60, 60, 255));
const OBSTACLE_EFFECT: EntityTemplate = EntityTemplate::new("stages/default/dummy", LAYER_ACTORS)
    .with_fallback(CELL_BASE_W, CELL_BASE_H, TRANSPARENT);
const RAY: EntityTemplate = EntityTemplate::new("stages/default/obstacle_ray_00", LAYER_ACTORS)
    .with_fallback(ITEM_BASE, ITEM_BASE, Color::rgba(255, 240, 90, 200));
const GROUND: EntityTemplate = EntityTemplate::new("stages/default/ground", LAYER_BUILDING)
    .with_fallback(800.0, 90.0, Color::rgba(70, 90, 60, 255));
const BIN: EntityTemplate = EntityTemplate::new("stages/default/bin", LAYER_ACTORS)
    .with_fallback(40.0, 60.0, Color::rgba(50, 70, 50, 255));
const BENCH: EntityTemplate = EntityTemplate::new("stages/default/banco", LAYER_ACTORS)
    .with_fallback(120.0, 50.0, Color::rgba(110, 80, 50, 255));
const LEFT_CITY: EntityTemplate = EntityTemplate::new("stages/default/lcity", LAYER_CITY)
    .with_hotspot(Hotspot::new(0.0, 1.0))
    .with_fallback(200.0, 400.0, Color::rgba(40, 50, 80, 255));
const RIGHT_CITY: EntityTemplate = EntityTemplate::new("stages/default/rcity", LAYER_CITY)
    .with_hotspot(Hotspot::new(1.0, 1.0))
    .with_fallback(200.0, 450.0, Color::rgba(40, 50, 80, 255));

const PLANT: EntityTemplate = EntityTemplate::new("stages/default/maceta1", LAYER_ACTORS)
    .with_fallback(ITEM_BASE, ITEM_BASE * 1.4, Color::rgba(60, 160, 60, 255));
const BONUS: EntityTemplate = EntityTemplate::new("stages/default/item_bonus_00", LAYER_ACTORS)
    .with_fallback(ITEM_BASE, ITEM_BASE, Color::rgba(255, 215, 0, 255));
const BOMB: EntityTemplate = EntityTemplate::new("stages/default/item_bomb_00", LAYER_ACTORS)
    .with_fallback(ITEM_BASE, ITEM_BASE, Color::rgba(30, 30, 30, 255));
const INVINCIBILITY: EntityTemplate =
    EntityTemplate::new("stages/default/item_invincibility_00", LAYER_ACTORS)
        .with_fallback(ITEM_BASE, ITEM_BASE, Color::rgba(0, 200, 255, 255));
const LIFE1UP: EntityTemplate = EntityTemplate::new("stages/default/1up", LAYER_ACTORS)
    .with_fallback(ITEM_BASE, ITEM_BASE, Color::rgba(255, 80, 160, 255));
const WAVE: EntityTemplate = EntityTemplate::new("common/onda", LAYER_BUILDING)
    .with_fallback(ITEM_BASE, ITEM_BASE, Color::rgba(255, 255, 255, 90));
const SUPER: EntityTemplate = EntityTemplate::new("common/super", LAYER_ACTORS)
    .with_fallback(ITEM_BASE * 2.0, ITEM_BASE, Color::rgba(255, 255, 255, 255));

const CLIMBER: EntityTemplate = EntityTemplate::new("climber/female/climber_wait_00", LAYER_ACTORS)
    .with_fallback(CLIMBER_BASE_W, CLIMBER_BASE_H, PLAYER_COLOR);

const CLOUD_BACK: [&str; 2] = ["stages/default/cloud1", "stages/default/cloud2"];
const CLOUD_FRONT: [&str; 2] = ["stages/default/cloud3", "stages/default/cloud4"];
const STAR: &str = "common/star";

const OVERLAY: EntityTemplate = EntityTemplate::new("common/paused", LAYER_PAUSE)
    .with_hotspot(Hotspot::TOP_LEFT)
    .with_fallback(1.0, 1.0, Color::rgba(0, 0, 0, 255));
const COUNTDOWN_DIGITS: [&str; 4] = ["common/0", "common/1", "common/2", "common/3"];
const COUNTDOWN_TEXT: [&str; 4] = ["GO", "1", "2", "3"];
const SCORE_FRAME: EntityTemplate = EntityTemplate::new("common/status", LAYER_INFO)
    .with_fallback(160.0, 60.0, Color::rgba(20, 20, 20, 190));
const LIFE_ICON: EntityTemplate = EntityTemplate::new("common/climber", LAYER_INFO)
    .with_fallback(60.0, 60.0, PLAYER_COLOR);
const LEVEL_ICON: EntityTemplate = EntityTemplate::new("climber/female/status_miniclimber_00", LAYER_INFO)
    .with_fallback(60.0, 60.0, PLAYER_COLOR);

/// Building cell kinds and their layout codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CellKind {
    LeftBorder,
    RightBorder,
    Window,
    Top,
    TopLeftEdge,
    TopRightEdge,
    LeftTop,
    RightTop,
    LeftBottom,
    RightBottom,
    Bottom,
    Obstacle,
}

impl CellKind {
    pub(crate) fn from_code(code: f64) -> Option<Self> {
        const CODES: [(f64, CellKind); 12] = [
            (0.0, CellKind::Obstacle),
            (1.0, CellKind::LeftBorder),
            (2.0, CellKind::RightBorder),
            (3.0, CellKind::Window),
            (4.0, CellKind::Top),
            (4.1, CellKind::TopLeftEdge),
            (4.2, CellKind::TopRightEdge),
            (5.0, CellKind::LeftTop),
            (6.0, CellKind::RightTop),
            (7.0, CellKind::LeftBottom),
            (8.0, CellKind::RightBottom),
            (9.0, CellKind::Bottom),
        ];
        CODES
            .iter()
            .find(|(value, _)| (value - code).abs() < 1e-6)
            .map(|(_, kind)| *kind)
    }

    pub(crate) fn is_bottom(self) -> bool {
        matches!(self, CellKind::LeftBottom | CellKind::RightBottom | CellKind::Bottom)
    }
}

/// Requests accepted by [`Climber::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MoveRequest {
    Wait,
    Left,
    Right,
    Down,
    UpLeft,
    UpRight,
    Hit,
    Fall,
    Winner,
}

/// The climber's committed position between moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stance {
    Up1Left,
    Up1Right,
    Up2Left,
    Up2Right,
    Hit,
    Fall,
}

/// Resolved movement after the transition table ran; selects the
/// displacement chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Motion {
    Up1Left,
    Up1Right,
    Up2Left,
    Up2Right,
    Up3Left,
    Up3Right,
    HalfDown,
    Down,
    Left,
    Right,
    Fall,
    Parachute,
    Winner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Plant,
    Bonus,
    Bomb,
    Invincibility,
    ExtraLife,
    Ray,
}

impl ItemKind {
    fn group(self) -> &'static str {
        match self {
            ItemKind::Plant | ItemKind::Ray => GROUP_ENEMY,
            ItemKind::Bonus => GROUP_BONUS,
            ItemKind::Bomb => GROUP_BOMB,
            ItemKind::Invincibility => GROUP_INVINCIBILITY,
            ItemKind::ExtraLife => GROUP_LIFE1UP,
        }
    }

    /// Scrolling leaves collected bonuses and lives on their flight path.
    fn pinned_when_destroyed(self) -> bool {
        matches!(self, ItemKind::Bonus | ItemKind::ExtraLife)
    }
}

/// Settings a game scene is built from.
#[derive(Debug, Clone)]
pub(crate) struct GameSettings {
    pub(crate) levels: usize,
    pub(crate) columns: usize,
    pub(crate) difficulty: Difficulty,
    pub(crate) music: bool,
    pub(crate) demo_idle_secs: u64,
    pub(crate) start_in_demo: bool,
    pub(crate) layout: Option<Vec<Vec<Option<f64>>>>,
}

impl GameSettings {
    pub(crate) fn from_config(config: &GameConfig) -> Self {
        let layout = config.layout.clone();
        let (levels, columns) = match &layout {
            Some(rows) => (rows.len(), rows.first().map(Vec::len).unwrap_or(0)),
            None => (config.levels as usize, config.columns()),
        };
        Self {
            levels,
            columns,
            difficulty: config.difficulty,
            music: config.volume > 0,
            demo_idle_secs: config.demo_idle_secs,
            start_in_demo: config.start_in_demo,
            layout,
        }
    }
}

/// Inclusive integer roll.
fn randint(rng: &mut Rng, low: i64, high: i64) -> i64 {
    if high <= low {
        return low;
    }
    rng.i64(low..=high)
}

/// True with probability `1/n`; `n == 0` never fires.
fn one_in(rng: &mut Rng, n: u32) -> bool {
    n > 0 && rng.u32(0..n) == 0
}

fn uniform(rng: &mut Rng, low: f32, high: f32) -> f32 {
    random_f32_range(rng, low, high)
}

fn distance(ctx: &SceneContext, a: EntityId, b: EntityId) -> f32 {
    match (ctx.entity(a), ctx.entity(b)) {
        (Some(a), Some(b)) => ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt(),
        _ => 0.0,
    }
}
