/// Lifecycle events raised by the host world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RallyEvent {
    /// A structure leaves the loaded area, carrying `crew` on `footprint`.
    Detach {
        origin: Position,
        footprint: Vec<Position>,
        crew: Vec<AgentId>,
    },
    /// The structure lands and a fresh area is created around it.
    Reattach {
        new_origin: Position,
        rotation: Rotation,
    },
    /// The loaded area is dropped with nothing travelling out of it.
    UnloadWithoutTransfer,
}

#[derive(Debug, Error)]
pub(crate) enum SimError {
    #[error("no local area is loaded")]
    NoAreaLoaded,
    #[error("local area '{name}' is still loaded")]
    AreaAlreadyLoaded { name: String },
    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),
    #[error(transparent)]
    Transit(#[from] TransitError),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error(transparent)]
    SaveLoad(#[from] SaveLoadError),
}

#[derive(Debug)]
pub(crate) struct LoadedArea {
    pub(crate) name: String,
    pub(crate) rally: AreaRallyPoints,
}

/// Crew member travelling with a detached structure, relative to its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CrewBerth {
    agent: AgentId,
    offset: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SimAgent {
    pub(crate) name: String,
    pub(crate) info: AgentInfo,
    pub(crate) drafted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedFaction {
    Player,
    Other,
}

impl SavedFaction {
    fn from_faction(faction: Faction) -> Self {
        match faction {
            Faction::Player => Self::Player,
            Faction::Other => Self::Other,
        }
    }

    fn to_faction(self) -> Faction {
        match self {
            Self::Player => Faction::Player,
            Self::Other => Faction::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedAgent {
    id: u64,
    name: String,
    faction: SavedFaction,
    position: Option<SavedPosition>,
    #[serde(default)]
    destination: Option<SavedPosition>,
    #[serde(default)]
    destroyed: bool,
    #[serde(default)]
    drafted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedArea {
    name: String,
    rally: SavedRallyState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SavedBerth {
    agent: u64,
    offset: SavedPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedWorld {
    save_version: u32,
    tick: u64,
    next_agent_id: u64,
    agents: Vec<SavedAgent>,
    area: Option<SavedArea>,
    transit: SavedTransitState,
    #[serde(default)]
    crew: Vec<SavedBerth>,
}

#[derive(Debug, Clone)]
pub(crate) struct ScenarioConfig {
    pub(crate) landing_origin: Position,
    pub(crate) landing_rotation: Rotation,
    pub(crate) save_dir: PathBuf,
    pub(crate) max_ticks: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            landing_origin: Position::new(40, 0, 12),
            landing_rotation: Rotation::South,
            save_dir: PathBuf::from("cache").join("saves"),
            max_ticks: DEFAULT_SCENARIO_MAX_TICKS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScenarioReport {
    pub(crate) kept_stores: usize,
    pub(crate) landed_stores: usize,
    pub(crate) ticks: u64,
    pub(crate) arrived: usize,
    pub(crate) save_path: PathBuf,
}
