use std::collections::HashSet;
use std::time::Instant;

use thiserror::Error;

use crate::agent::{AgentId, AgentView, Faction};
use crate::hotkey::MultiPressCycle;
use crate::position::{Position, Rotation};

pub const NUM_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("cannot access saved positions while {owner} is not placed in a local area")]
    OwnerNotResident { owner: AgentId },
    #[error("slot index {slot} out of range (0..{NUM_SLOTS})")]
    SlotOutOfRange { slot: usize },
}

pub fn check_slot(slot: usize) -> Result<usize, SlotError> {
    if slot < NUM_SLOTS {
        Ok(slot)
    } else {
        Err(SlotError::SlotOutOfRange { slot })
    }
}

/// Rally points remembered by one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotStore {
    owner: AgentId,
    slots: [Position; NUM_SLOTS],
    pub(crate) multi_press: MultiPressCycle,
    pub(crate) highlight_blocked_until: Option<Instant>,
}

impl SlotStore {
    pub fn new(owner: AgentId) -> Self {
        Self::with_slots(owner, [Position::INVALID; NUM_SLOTS])
    }

    pub fn with_slots(owner: AgentId, slots: [Position; NUM_SLOTS]) -> Self {
        Self {
            owner,
            slots,
            multi_press: MultiPressCycle::default(),
            highlight_blocked_until: None,
        }
    }

    /// Builds a store from persisted data. Anything but exactly `NUM_SLOTS`
    /// entries resets the whole array.
    pub fn from_persisted(owner: AgentId, positions: &[Position]) -> Self {
        match <[Position; NUM_SLOTS]>::try_from(positions) {
            Ok(slots) => Self::with_slots(owner, slots),
            Err(_) => {
                tracing::debug!(
                    owner = owner.0,
                    persisted_len = positions.len(),
                    "slot_array_reset"
                );
                Self::new(owner)
            }
        }
    }

    pub fn owner(&self) -> AgentId {
        self.owner
    }

    /// Raw slot contents, including invalid entries. Residency is not checked.
    pub fn slots(&self) -> &[Position; NUM_SLOTS] {
        &self.slots
    }

    pub fn should_be_saved(&self, view: &dyn AgentView) -> bool {
        view.agent(self.owner)
            .is_some_and(|info| !info.destroyed && info.faction == Faction::Player)
    }

    pub fn has_position(&self, slot: usize) -> Result<bool, SlotError> {
        Ok(self.slots[check_slot(slot)?].is_valid())
    }

    pub fn has_any_position(&self) -> bool {
        self.slots.iter().any(|slot| slot.is_valid())
    }

    pub fn position(&self, slot: usize, view: &dyn AgentView) -> Result<Position, SlotError> {
        let slot = check_slot(slot)?;
        self.check_owner_resident(view)?;
        Ok(self.slots[slot])
    }

    pub fn set_position(
        &mut self,
        slot: usize,
        position: Position,
        view: &dyn AgentView,
    ) -> Result<(), SlotError> {
        let slot = check_slot(slot)?;
        self.check_owner_resident(view)?;
        self.slots[slot] = position;
        Ok(())
    }

    pub fn discard(&mut self, slot: usize, view: &dyn AgentView) -> Result<(), SlotError> {
        self.set_position(slot, Position::INVALID, view)
    }

    pub fn discard_not_in(&mut self, valid: &HashSet<Position>) {
        for slot in &mut self.slots {
            if !valid.contains(slot) {
                *slot = Position::INVALID;
            }
        }
    }

    /// Area-local absolute cells become offsets from `origin`.
    pub fn translate(&mut self, origin: Position) {
        for slot in self.slots.iter_mut().filter(|slot| slot.is_valid()) {
            *slot = *slot - origin;
        }
    }

    /// Offsets become absolute cells at `origin`, rotated first.
    pub fn translate_back(&mut self, origin: Position, rotation: Rotation) {
        for slot in self.slots.iter_mut().filter(|slot| slot.is_valid()) {
            *slot = rotation.rotate(*slot) + origin;
        }
    }

    /// Bit `i` is set when slot `i` holds a position.
    pub fn saved_mask(&self) -> u8 {
        self.slots
            .iter()
            .enumerate()
            .fold(0u8, |mask, (index, slot)| {
                mask | (u8::from(slot.is_valid()) << index)
            })
    }

    fn check_owner_resident(&self, view: &dyn AgentView) -> Result<(), SlotError> {
        if view.is_resident(self.owner) {
            Ok(())
        } else {
            Err(SlotError::OwnerNotResident { owner: self.owner })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::agent::AgentInfo;

    fn resident(id: u64, position: Position) -> HashMap<AgentId, AgentInfo> {
        let mut agents = HashMap::new();
        agents.insert(AgentId(id), AgentInfo::resident_at(position));
        agents
    }

    #[test]
    fn new_store_has_no_positions() {
        let store = SlotStore::new(AgentId(1));
        for slot in 0..NUM_SLOTS {
            assert!(!store.has_position(slot).expect("in range"));
        }
        assert_eq!(store.saved_mask(), 0);
    }

    #[test]
    fn out_of_range_slot_is_rejected() {
        let agents = resident(1, Position::ZERO);
        let mut store = SlotStore::new(AgentId(1));
        assert_eq!(
            store.has_position(NUM_SLOTS),
            Err(SlotError::SlotOutOfRange { slot: NUM_SLOTS })
        );
        assert_eq!(
            store.set_position(7, Position::ZERO, &agents),
            Err(SlotError::SlotOutOfRange { slot: 7 })
        );
    }

    #[test]
    fn access_requires_resident_owner() {
        let agents: HashMap<AgentId, AgentInfo> = HashMap::new();
        let mut store = SlotStore::new(AgentId(3));
        let expected = SlotError::OwnerNotResident { owner: AgentId(3) };
        assert_eq!(store.position(0, &agents), Err(expected));
        assert_eq!(store.set_position(0, Position::ZERO, &agents), Err(expected));
        assert_eq!(store.discard(0, &agents), Err(expected));
    }

    #[test]
    fn set_and_discard_overwrite_in_place() {
        let agents = resident(1, Position::ZERO);
        let mut store = SlotStore::new(AgentId(1));
        store
            .set_position(2, Position::new(4, 0, 4), &agents)
            .expect("set");
        assert_eq!(store.position(2, &agents), Ok(Position::new(4, 0, 4)));
        assert_eq!(store.saved_mask(), 0b0100);
        store.discard(2, &agents).expect("discard");
        assert_eq!(store.position(2, &agents), Ok(Position::INVALID));
    }

    #[test]
    fn short_persisted_array_resets_everything() {
        let store = SlotStore::from_persisted(AgentId(1), &[Position::new(1, 0, 1)]);
        assert_eq!(store.slots(), &[Position::INVALID; NUM_SLOTS]);

        let full = [
            Position::new(1, 0, 1),
            Position::INVALID,
            Position::new(2, 0, 2),
            Position::INVALID,
        ];
        let store = SlotStore::from_persisted(AgentId(1), &full);
        assert_eq!(store.slots(), &full);
    }

    #[test]
    fn discard_not_in_keeps_only_members() {
        let mut store = SlotStore::with_slots(
            AgentId(1),
            [
                Position::new(1, 0, 1),
                Position::new(9, 0, 9),
                Position::INVALID,
                Position::new(2, 0, 2),
            ],
        );
        let valid: HashSet<Position> = [Position::new(1, 0, 1), Position::new(2, 0, 2)]
            .into_iter()
            .collect();
        store.discard_not_in(&valid);
        assert_eq!(
            store.slots(),
            &[
                Position::new(1, 0, 1),
                Position::INVALID,
                Position::INVALID,
                Position::new(2, 0, 2),
            ]
        );
    }

    #[test]
    fn translate_skips_invalid_slots() {
        let mut store = SlotStore::with_slots(
            AgentId(1),
            [
                Position::new(5, 0, 5),
                Position::INVALID,
                Position::new(6, 0, 5),
                Position::INVALID,
            ],
        );
        store.translate(Position::new(5, 0, 5));
        assert_eq!(
            store.slots(),
            &[
                Position::ZERO,
                Position::INVALID,
                Position::new(1, 0, 0),
                Position::INVALID,
            ]
        );
    }

    #[test]
    fn translate_back_inverts_translate_without_rotation() {
        let original = [
            Position::new(12, 0, -3),
            Position::INVALID,
            Position::new(0, 1, 40),
            Position::new(-8, 0, 8),
        ];
        let origin = Position::new(7, 0, 2);
        let mut store = SlotStore::with_slots(AgentId(1), original);
        store.translate(origin);
        store.translate_back(origin, Rotation::IDENTITY);
        assert_eq!(store.slots(), &original);
    }

    #[test]
    fn translate_back_rotates_before_offsetting() {
        let mut store = SlotStore::with_slots(
            AgentId(1),
            [
                Position::new(1, 0, 0),
                Position::INVALID,
                Position::INVALID,
                Position::INVALID,
            ],
        );
        store.translate_back(Position::new(10, 0, 10), Rotation::East);
        assert_eq!(store.slots()[0], Position::new(10, 0, 9));
    }

    #[test]
    fn save_worthiness_follows_owner_state() {
        let mut agents = resident(1, Position::ZERO);
        let store = SlotStore::new(AgentId(1));
        assert!(store.should_be_saved(&agents));

        agents.get_mut(&AgentId(1)).expect("agent").faction = Faction::Other;
        assert!(!store.should_be_saved(&agents));

        agents.get_mut(&AgentId(1)).expect("agent").faction = Faction::Player;
        agents.get_mut(&AgentId(1)).expect("agent").destroyed = true;
        assert!(!store.should_be_saved(&agents));

        agents.clear();
        assert!(!store.should_be_saved(&agents));
    }
}
