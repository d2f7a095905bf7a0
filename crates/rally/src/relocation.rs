use std::collections::HashSet;

use tracing::trace;

use crate::agent::{AgentId, AgentView};
use crate::position::{Position, Rotation};
use crate::slots::SlotStore;

/// Everything known about a structure at the moment it detaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachRequest {
    pub origin: Position,
    /// Cells that travel with the structure.
    pub footprint: HashSet<Position>,
    pub crew: HashSet<AgentId>,
}

impl DetachRequest {
    pub fn new(
        origin: Position,
        footprint: impl IntoIterator<Item = Position>,
        crew: impl IntoIterator<Item = AgentId>,
    ) -> Self {
        Self {
            origin,
            footprint: footprint.into_iter().collect(),
            crew: crew.into_iter().collect(),
        }
    }

    fn keeps(&self, store: &SlotStore, view: &dyn AgentView) -> bool {
        let owner = store.owner();
        if !self.crew.contains(&owner) {
            trace!(owner = owner.0, "transit_drop_not_crew");
            return false;
        }
        let on_board = view
            .position_of(owner)
            .is_some_and(|position| self.footprint.contains(&position));
        if !on_board {
            trace!(owner = owner.0, "transit_drop_owner_off_footprint");
            return false;
        }
        let any_slot_on_board = store
            .slots()
            .iter()
            .any(|slot| slot.is_valid() && self.footprint.contains(slot));
        if !any_slot_on_board {
            trace!(owner = owner.0, "transit_drop_no_slot_on_footprint");
        }
        any_slot_on_board
    }
}

/// Prunes stores that lose meaning when the structure leaves and rewrites the
/// survivors as offsets from the structure origin. Input order is kept.
pub fn filter_for_transit(
    stores: Vec<SlotStore>,
    request: &DetachRequest,
    view: &dyn AgentView,
) -> Vec<SlotStore> {
    stores
        .into_iter()
        .filter(|store| request.keeps(store, view))
        .map(|mut store| {
            store.discard_not_in(&request.footprint);
            store.translate(request.origin);
            store
        })
        .collect()
}

/// Turns transit offsets back into absolute cells at the landing site.
pub fn restore_from_transit(stores: &mut [SlotStore], new_origin: Position, rotation: Rotation) {
    for store in stores {
        store.translate_back(new_origin, rotation);
    }
}
