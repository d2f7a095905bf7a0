use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod agent;
pub mod area;
mod atomic_io;
pub mod controls;
pub mod hotkey;
pub mod pending;
pub mod persist;
pub mod position;
pub mod relocation;
pub mod settings;
pub mod slots;
pub mod squad;
pub mod transit;

pub use agent::{AgentId, AgentInfo, AgentView, AreaListener, Faction};
pub use area::{AreaRallyPoints, InteractionMode, TickEffects, POSITION_HIGHLIGHT_INTERVAL};
pub use controls::{
    resolve_control_action, AgentOrder, ContextAction, ControlAction, ControlOutcome,
    InteractionReport, Modifiers, ReportKind,
};
pub use hotkey::{HotkeyMode, MultiPressCycle, HOTKEY_MULTI_PRESS_TIMEOUT};
pub use pending::{Cue, PendingEffect};
pub use persist::{
    SaveLoadError, SavedPosition, SavedRallyState, SavedSlotStore, SavedSquad, SavedTransitState,
};
pub use position::{Position, Rotation};
pub use relocation::{filter_for_transit, restore_from_transit, DetachRequest};
pub use settings::{RallySettings, SettingsError, ShiftKeyMode};
pub use slots::{SlotError, SlotStore, NUM_SLOTS};
pub use squad::Squad;
pub use transit::{RejectedDetach, TransitError, TransitPhase, TransitRallyPoints};

pub const ROOT_ENV_VAR: &str = "RALLY_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub saves_dir: PathBuf,
}

impl AppPaths {
    /// Layout under an explicit root; directories are created on demand.
    pub fn under(root: &Path) -> Result<Self, StartupError> {
        let config_dir = root.join("config");
        let saves_dir = root.join("cache").join("saves");
        fs::create_dir_all(&saves_dir).map_err(|source| StartupError::CreateDir {
            path: saves_dir.clone(),
            source,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            config_dir,
            saves_dir,
        })
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(settings::SETTINGS_FILE)
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error("failed to create directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(
        "RALLY_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or config/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or config/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/rally\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    AppPaths::under(&resolve_root()?)
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_config = path.join("config").is_dir();

    cargo_toml && (has_crates || has_config)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn repo_marker_requires_cargo_toml() {
        let temp = TempDir::new().expect("temp");
        fs::create_dir_all(temp.path().join("crates")).expect("crates");
        assert!(!is_repo_marker(temp.path()));
        fs::write(temp.path().join("Cargo.toml"), "[workspace]").expect("cargo toml");
        assert!(is_repo_marker(temp.path()));
    }

    #[test]
    fn layout_under_root_creates_saves_dir() {
        let temp = TempDir::new().expect("temp");
        let paths = AppPaths::under(temp.path()).expect("paths");
        assert!(paths.saves_dir.is_dir());
        assert_eq!(
            paths.settings_file(),
            temp.path().join("config").join(settings::SETTINGS_FILE)
        );
    }
}
