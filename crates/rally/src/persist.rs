//! Serialization boundary for rally data.
//!
//! Live containers keep keyed maps; saves carry flat lists. Converting a
//! saved shape back into live data never fails: bad slot arrays reset,
//! out-of-range indices clamp, ownerless entries drop.

use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::agent::AgentId;
use crate::atomic_io::{read_text_if_present, write_text_atomic};
use crate::position::Position;
use crate::slots::{SlotStore, NUM_SLOTS};
use crate::squad::Squad;

#[derive(Debug, Error)]
pub enum SaveLoadError {
    #[error("failed to write save {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read save {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode save json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("parse save json at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("validation failed at {path}: {message}")]
    Validation { path: String, message: String },
}

impl SaveLoadError {
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn expected_actual(
        path: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        Self::validation(path, format!("expected {expected}, got {actual}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl SavedPosition {
    /// `None` encodes an empty slot.
    pub fn from_position(position: Position) -> Option<Self> {
        position.is_valid().then_some(Self {
            x: position.x,
            y: position.y,
            z: position.z,
        })
    }

    pub fn to_position(saved: Option<Self>) -> Position {
        saved.map_or(Position::INVALID, |saved| {
            Position::new(saved.x, saved.y, saved.z)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSlotStore {
    pub owner: Option<u64>,
    pub positions: Vec<Option<SavedPosition>>,
}

impl SavedSlotStore {
    pub fn from_store(store: &SlotStore) -> Self {
        Self {
            owner: Some(store.owner().0),
            positions: store
                .slots()
                .iter()
                .map(|position| SavedPosition::from_position(*position))
                .collect(),
        }
    }

    /// `None` for an entry whose owner reference did not survive.
    pub fn into_store(self) -> Option<SlotStore> {
        let owner = AgentId(self.owner?);
        let positions: Vec<Position> = self
            .positions
            .into_iter()
            .map(SavedPosition::to_position)
            .collect();
        Some(SlotStore::from_persisted(owner, &positions))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSquad {
    pub index: u8,
    pub members: Vec<u64>,
}

impl SavedSquad {
    pub fn from_squad(squad: &Squad) -> Self {
        Self {
            index: squad.index,
            members: squad.members.iter().map(|member| member.0).collect(),
        }
    }

    pub fn into_squad(self) -> Squad {
        Squad::new(self.index, self.members.into_iter().map(AgentId).collect())
    }
}

/// Shape shared by the area container and the transit container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedRallyState {
    #[serde(default)]
    pub stores: Vec<SavedSlotStore>,
    #[serde(default)]
    pub squads: Vec<SavedSquad>,
    #[serde(default)]
    pub advanced_mode: bool,
    #[serde(default)]
    pub last_used_slot: i64,
}

impl SavedRallyState {
    pub fn live_stores(&self) -> Vec<SlotStore> {
        self.stores
            .iter()
            .cloned()
            .filter_map(|saved| {
                let store = saved.into_store();
                if store.is_none() {
                    tracing::debug!("saved_store_without_owner_dropped");
                }
                store
            })
            .collect()
    }

    pub fn live_squads(&self) -> Vec<Squad> {
        self.squads.iter().cloned().map(SavedSquad::into_squad).collect()
    }

    pub fn clamped_last_used_slot(&self) -> usize {
        clamp_slot_index(self.last_used_slot)
    }
}

pub fn clamp_slot_index(raw: i64) -> usize {
    raw.clamp(0, NUM_SLOTS as i64 - 1) as usize
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedTransitState {
    #[serde(default)]
    pub in_transit: bool,
    #[serde(default)]
    pub state: SavedRallyState,
}

pub fn encode_json<T: Serialize>(value: &T) -> Result<String, SaveLoadError> {
    serde_json::to_string_pretty(value).map_err(SaveLoadError::Encode)
}

pub fn decode_json<T: DeserializeOwned>(raw: &str) -> Result<T, SaveLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, T>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        let source = error.into_inner();
        SaveLoadError::Parse {
            path: if path.is_empty() { ".".to_string() } else { path },
            message: source.to_string(),
        }
    })
}

pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), SaveLoadError> {
    let json = encode_json(value)?;
    write_text_atomic(path, &json).map_err(|source| SaveLoadError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// `Ok(None)` when no save exists at `path`.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SaveLoadError> {
    let raw = read_text_if_present(path).map_err(|source| SaveLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    raw.as_deref().map(decode_json::<T>).transpose()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn ownerless_entry_is_dropped() {
        let state = SavedRallyState {
            stores: vec![
                SavedSlotStore {
                    owner: None,
                    positions: vec![None; NUM_SLOTS],
                },
                SavedSlotStore {
                    owner: Some(4),
                    positions: vec![None; NUM_SLOTS],
                },
            ],
            ..SavedRallyState::default()
        };
        let stores = state.live_stores();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].owner(), AgentId(4));
    }

    #[test]
    fn wrong_length_positions_reset_to_empty() {
        let saved = SavedSlotStore {
            owner: Some(1),
            positions: vec![Some(SavedPosition { x: 1, y: 0, z: 1 }); 6],
        };
        let store = saved.into_store().expect("owner");
        assert!(!store.has_any_position());
    }

    #[test]
    fn last_used_index_is_clamped() {
        assert_eq!(clamp_slot_index(99), 3);
        assert_eq!(clamp_slot_index(-5), 0);
        assert_eq!(clamp_slot_index(2), 2);
    }

    #[test]
    fn missing_fields_decode_to_defaults() {
        let state: SavedTransitState = decode_json("{}").expect("decode");
        assert_eq!(state, SavedTransitState::default());
    }

    #[test]
    fn parse_error_carries_json_path() {
        let raw = r#"{ "stores": [ { "owner": 1, "positions": [ { "x": "nope", "y": 0, "z": 0 } ] } ] }"#;
        let error = decode_json::<SavedRallyState>(raw).expect_err("bad field");
        match error {
            SaveLoadError::Parse { path, .. } => assert_eq!(path, "stores[0].positions[0].x"),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn file_round_trip_and_missing_file() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("saves").join("transit.json");
        assert_eq!(read_json_file::<SavedTransitState>(&path).expect("read"), None);

        let state = SavedTransitState {
            in_transit: true,
            state: SavedRallyState {
                stores: vec![SavedSlotStore {
                    owner: Some(7),
                    positions: vec![
                        Some(SavedPosition { x: 0, y: 0, z: 0 }),
                        None,
                        Some(SavedPosition { x: 1, y: 0, z: 0 }),
                        None,
                    ],
                }],
                squads: vec![SavedSquad {
                    index: 2,
                    members: vec![7],
                }],
                advanced_mode: true,
                last_used_slot: 2,
            },
        };
        write_json_file(&path, &state).expect("write");
        assert_eq!(
            read_json_file::<SavedTransitState>(&path).expect("read"),
            Some(state)
        );
    }
}
