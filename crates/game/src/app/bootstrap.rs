use engine::{
    resolve_app_paths, Director, FileAssets, LoopConfig, SceneContext, SilentAudio, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::config::{self, ConfigError, GameConfig};
use super::gameplay::{self, GameSettings};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) director: Director,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== Tower Climb Startup ===");

    let paths = resolve_app_paths()?;
    let game_config = config::load_config(&config::config_path(&paths.config_path))?;
    let loop_config = loop_config_for(&game_config);
    let seed = loop_config.resolved_seed();

    let mut ctx = SceneContext::new(
        (loop_config.width, loop_config.height),
        Box::new(FileAssets::new(paths.assets_dir.clone())),
        Box::new(SilentAudio::default()),
        seed,
    );
    ctx.set_volume(game_config.volume_fraction());
    let mut director = Director::new(ctx, loop_config.realtick_hz);
    director.set_scene(gameplay::build_title_scene(GameSettings::from_config(&game_config)));
    info!(
        root = %paths.root.display(),
        assets = %paths.assets_dir.display(),
        seed,
        "app_wired"
    );

    Ok(AppWiring {
        config: loop_config,
        director,
    })
}

fn loop_config_for(game_config: &GameConfig) -> LoopConfig {
    let (width, height) = game_config.resolution();
    LoopConfig {
        width,
        height,
        fullscreen: game_config.fullscreen,
        seed: game_config.seed,
        ..LoopConfig::default()
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_config_follows_the_game_config() {
        let game_config = GameConfig {
            fullscreen: true,
            seed: Some(7),
            ..GameConfig::default()
        };
        let loop_config = loop_config_for(&game_config);
        assert_eq!(
            (loop_config.width, loop_config.height),
            game_config.resolution()
        );
        assert!(loop_config.fullscreen);
        assert_eq!(loop_config.resolved_seed(), 7);
        assert_eq!(loop_config.realtick_hz, 40);
    }
}
