use std::path::Path;

use rally::settings::HOTKEY_MODE_ENV_VAR;
use rally::{resolve_app_paths, AppPaths, Position, RallySettings, Rotation, StartupError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::sim::{ScenarioConfig, SimWorld};

const LANDING_ROTATION_ENV_VAR: &str = "RALLY_LANDING_ROTATION";
const LANDING_ORIGIN_ENV_VAR: &str = "RALLY_LANDING_ORIGIN";

pub(crate) struct AppWiring {
    pub(crate) paths: AppPaths,
    pub(crate) world: SimWorld,
    pub(crate) scenario: ScenarioConfig,
}

pub(crate) fn build_app() -> Result<AppWiring, StartupError> {
    init_tracing();
    info!("=== Rally Outpost Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "app_paths_resolved");

    let settings = load_settings(&paths);
    let defaults = ScenarioConfig::default();
    let scenario = ScenarioConfig {
        landing_origin: parse_landing_origin_from_env(defaults.landing_origin),
        landing_rotation: parse_landing_rotation_from_env(defaults.landing_rotation),
        save_dir: paths.saves_dir.clone(),
        ..defaults
    };

    Ok(AppWiring {
        paths,
        world: SimWorld::new(settings),
        scenario,
    })
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

fn load_settings(paths: &AppPaths) -> RallySettings {
    let settings = read_settings_file(&paths.settings_file())
        .with_env_overrides(std::env::var(HOTKEY_MODE_ENV_VAR).ok().as_deref());
    info!(
        hotkey_mode = settings.hotkey_mode.as_token(),
        shift_key_mode = ?settings.shift_key_mode,
        same_group_distance = settings.same_group_distance,
        jumping_selects_nearby = settings.jumping_selects_nearby,
        "settings_loaded"
    );
    settings
}

/// First run writes the defaults out so there is a file to edit.
fn read_settings_file(path: &Path) -> RallySettings {
    if !path.exists() {
        let defaults = RallySettings::default();
        match defaults.save(path) {
            Ok(()) => info!(path = %path.display(), "settings_defaults_written"),
            Err(err) => warn!(error = %err, "settings_defaults_write_failed"),
        }
        return defaults;
    }
    match RallySettings::load_or_default(path) {
        Ok(settings) => settings,
        Err(err) => {
            warn!(error = %err, "settings_load_failed_using_defaults");
            RallySettings::default()
        }
    }
}

fn parse_landing_rotation_from_env(fallback: Rotation) -> Rotation {
    let Ok(raw) = std::env::var(LANDING_ROTATION_ENV_VAR) else {
        return fallback;
    };
    Rotation::parse_token(raw.trim()).unwrap_or_else(|| {
        warn!(var = LANDING_ROTATION_ENV_VAR, value = %raw, "env_override_ignored");
        fallback
    })
}

fn parse_landing_origin_from_env(fallback: Position) -> Position {
    let Ok(raw) = std::env::var(LANDING_ORIGIN_ENV_VAR) else {
        return fallback;
    };
    parse_cell(&raw).unwrap_or_else(|| {
        warn!(var = LANDING_ORIGIN_ENV_VAR, value = %raw, "env_override_ignored");
        fallback
    })
}

/// Parses `x,y,z`.
fn parse_cell(raw: &str) -> Option<Position> {
    let parts = raw
        .split(',')
        .map(str::trim)
        .map(str::parse::<i32>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    match parts.as_slice() {
        [x, y, z] => Some(Position::new(*x, *y, *z)),
        _ => None,
    }
}
