use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rally::persist::{read_json_file, write_json_file};
use rally::{
    AgentId, AgentInfo, AgentOrder, AgentView, AreaListener, AreaRallyPoints, ControlOutcome, Cue,
    DetachRequest, Faction, InteractionReport, Modifiers, Position, RallySettings, Rotation,
    SaveLoadError, SavedPosition, SavedRallyState, SavedTransitState, SlotError, Squad,
    TransitError, TransitPhase, TransitRallyPoints,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

const SAVE_VERSION: u32 = 1;
const WORLD_SAVE_FILE: &str = "world.save.json";
const DEFAULT_SCENARIO_MAX_TICKS: u64 = 200;

include!("types.rs");
include!("agents.rs");
include!("world.rs");
include!("world_state.rs");
include!("scenario.rs");
