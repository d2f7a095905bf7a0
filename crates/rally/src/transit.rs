use thiserror::Error;
use tracing::info;

use crate::agent::AgentView;
use crate::area::{AreaRallyPoints, InteractionMode};
use crate::persist::{SavedRallyState, SavedSlotStore, SavedSquad, SavedTransitState};
use crate::position::{Position, Rotation};
use crate::relocation::{filter_for_transit, restore_from_transit, DetachRequest};
use crate::slots::SlotStore;
use crate::squad::{discard_non_save_worthy, Squad};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitError {
    #[error("a relocation is already in transit; finish it before detaching again")]
    AlreadyInTransit,
    #[error("no relocation is in transit")]
    NotInTransit,
}

/// A detach refused because another relocation is still in flight. The
/// outgoing area is handed back untouched.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RejectedDetach {
    pub error: TransitError,
    pub area: AreaRallyPoints,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransitPhase {
    #[default]
    Idle,
    InTransit,
}

/// World-scoped holder of rally data while a structure has no placement.
///
/// Outlives every local area; empty outside a transit.
#[derive(Debug, Default)]
pub struct TransitRallyPoints {
    phase: TransitPhase,
    stores: Vec<SlotStore>,
    squads: Vec<Squad>,
    mode: InteractionMode,
    last_used_slot: usize,
}

impl TransitRallyPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> TransitPhase {
        self.phase
    }

    pub fn stores(&self) -> &[SlotStore] {
        &self.stores
    }

    pub fn squads(&self) -> &[Squad] {
        &self.squads
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty() && self.squads.is_empty()
    }

    /// Takes ownership of the outgoing area's save-list and rewrites it into
    /// transit-relative offsets. Returns how many stores survived.
    pub fn begin_transit(
        &mut self,
        outgoing: AreaRallyPoints,
        request: &DetachRequest,
        view: &dyn AgentView,
    ) -> Result<usize, RejectedDetach> {
        if self.phase != TransitPhase::Idle {
            return Err(RejectedDetach {
                error: TransitError::AlreadyInTransit,
                area: outgoing,
            });
        }
        let outgoing = outgoing.into_save_parts(view);
        let copied = outgoing.stores.len();
        self.stores = outgoing.stores;
        self.squads = outgoing.squads;
        self.mode = outgoing.mode;
        self.last_used_slot = outgoing.last_used_slot;
        self.phase = TransitPhase::InTransit;

        self.prepare_for_transit(request, view);
        info!(
            origin = %request.origin,
            footprint = request.footprint.len(),
            crew = request.crew.len(),
            copied,
            kept = self.stores.len(),
            "transit_started"
        );
        Ok(self.stores.len())
    }

    /// Filters the held list against the detaching structure and converts
    /// the survivors to offsets from its origin.
    pub fn prepare_for_transit(&mut self, request: &DetachRequest, view: &dyn AgentView) {
        let held = std::mem::take(&mut self.stores);
        self.stores = filter_for_transit(held, request, view);
    }

    /// Rewrites held offsets to absolute cells at the landing site. Does not
    /// release the data.
    pub fn finalize_transit(
        &mut self,
        new_origin: Position,
        rotation: Rotation,
    ) -> Result<(), TransitError> {
        if self.phase != TransitPhase::InTransit {
            return Err(TransitError::NotInTransit);
        }
        restore_from_transit(&mut self.stores, new_origin, rotation);
        Ok(())
    }

    /// Finishes the relocation: finalize, hand everything to a fresh area,
    /// then clear.
    pub fn complete_transit(
        &mut self,
        new_origin: Position,
        rotation: Rotation,
    ) -> Result<AreaRallyPoints, TransitError> {
        self.finalize_transit(new_origin, rotation)?;
        let area = AreaRallyPoints::from_parts(
            std::mem::take(&mut self.stores),
            std::mem::take(&mut self.squads),
            self.mode,
            self.last_used_slot,
        );
        self.clear();
        info!(
            origin = %new_origin,
            rotation = rotation.as_token(),
            stores = area.store_count(),
            "transit_completed"
        );
        Ok(area)
    }

    pub fn clear(&mut self) {
        self.stores.clear();
        self.squads.clear();
        self.phase = TransitPhase::Idle;
    }

    /// Snapshot for the world save. Squad members destroyed or turned
    /// hostile mid-flight are pruned first, as the local area does.
    pub fn to_saved(&mut self, view: &dyn AgentView) -> SavedTransitState {
        discard_non_save_worthy(&mut self.squads, view);
        SavedTransitState {
            in_transit: self.phase == TransitPhase::InTransit,
            state: SavedRallyState {
                stores: self.stores.iter().map(SavedSlotStore::from_store).collect(),
                squads: self.squads.iter().map(SavedSquad::from_squad).collect(),
                advanced_mode: self.mode.is_advanced(),
                last_used_slot: self.last_used_slot as i64,
            },
        }
    }

    pub fn from_saved(saved: &SavedTransitState) -> Self {
        let phase = if saved.in_transit {
            TransitPhase::InTransit
        } else {
            TransitPhase::Idle
        };
        let mut transit = Self {
            phase,
            stores: saved.state.live_stores(),
            squads: saved.state.live_squads(),
            mode: InteractionMode::from_advanced(saved.state.advanced_mode),
            last_used_slot: saved.state.clamped_last_used_slot(),
        };
        if phase == TransitPhase::Idle && !transit.is_empty() {
            tracing::warn!(
                stores = transit.stores.len(),
                "idle_transit_save_had_data_cleared"
            );
            transit.clear();
        }
        transit
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::agent::{AgentId, AgentInfo};
    use crate::persist::{decode_json, encode_json};

    const A: AgentId = AgentId(1);
    const B: AgentId = AgentId(2);

    fn view() -> HashMap<AgentId, AgentInfo> {
        let mut agents = HashMap::new();
        agents.insert(A, AgentInfo::resident_at(Position::new(5, 0, 5)));
        agents.insert(B, AgentInfo::resident_at(Position::new(30, 0, 30)));
        agents
    }

    fn outgoing_area(view: &HashMap<AgentId, AgentInfo>) -> AreaRallyPoints {
        let mut area = AreaRallyPoints::new();
        area.assign_slot(A, 0, view).expect("assign a0");
        area.get_or_add_store(A)
            .set_position(2, Position::new(6, 0, 5), view)
            .expect("assign a2");
        area.assign_slot(B, 1, view).expect("assign b1");
        area.set_last_used_slot(2).expect("slot");
        area.squads_mut().push(Squad::new(0, vec![A, B]));
        area
    }

    fn request() -> DetachRequest {
        DetachRequest::new(
            Position::new(5, 0, 5),
            [Position::new(5, 0, 5), Position::new(6, 0, 5)],
            [A],
        )
    }

    #[test]
    fn full_relocation_scenario() {
        let view = view();
        let mut transit = TransitRallyPoints::new();
        let kept = transit
            .begin_transit(outgoing_area(&view), &request(), &view)
            .expect("detach");
        assert_eq!(kept, 1);
        assert_eq!(transit.phase(), TransitPhase::InTransit);
        assert_eq!(
            transit.stores()[0].slots(),
            &[
                Position::ZERO,
                Position::INVALID,
                Position::new(1, 0, 0),
                Position::INVALID,
            ]
        );

        let area = transit
            .complete_transit(Position::new(10, 0, 20), Rotation::South)
            .expect("reattach");
        assert_eq!(
            area.store(A).expect("store").slots(),
            &[
                Position::new(10, 0, 20),
                Position::INVALID,
                Position::new(9, 0, 20),
                Position::INVALID,
            ]
        );
        assert!(area.store(B).is_none());
        assert_eq!(area.last_used_slot(), 2);
        assert_eq!(area.squads(), &[Squad::new(0, vec![A, B])]);
        assert!(transit.is_empty());
        assert_eq!(transit.phase(), TransitPhase::Idle);
    }

    #[test]
    fn second_detach_while_in_transit_is_rejected() {
        let view = view();
        let mut transit = TransitRallyPoints::new();
        transit
            .begin_transit(outgoing_area(&view), &request(), &view)
            .expect("detach");
        let before = transit.stores().to_vec();
        let rejected = transit
            .begin_transit(outgoing_area(&view), &request(), &view)
            .expect_err("second detach");
        assert_eq!(rejected.error, TransitError::AlreadyInTransit);
        assert_eq!(rejected.area.store_count(), 2);
        assert_eq!(transit.stores(), before.as_slice());
    }

    #[test]
    fn reattach_without_detach_is_rejected() {
        let mut transit = TransitRallyPoints::new();
        assert_eq!(
            transit.finalize_transit(Position::ZERO, Rotation::North),
            Err(TransitError::NotInTransit)
        );
        assert!(transit
            .complete_transit(Position::ZERO, Rotation::North)
            .is_err());
    }

    #[test]
    fn finalize_does_not_clear() {
        let view = view();
        let mut transit = TransitRallyPoints::new();
        transit
            .begin_transit(outgoing_area(&view), &request(), &view)
            .expect("detach");
        transit
            .finalize_transit(Position::new(1, 0, 1), Rotation::North)
            .expect("finalize");
        assert_eq!(transit.stores().len(), 1);
        assert_eq!(transit.phase(), TransitPhase::InTransit);
    }

    #[test]
    fn clear_twice_is_harmless() {
        let view = view();
        let mut transit = TransitRallyPoints::new();
        transit
            .begin_transit(outgoing_area(&view), &request(), &view)
            .expect("detach");
        transit.clear();
        transit.clear();
        assert!(transit.stores().is_empty());
        assert!(transit.squads().is_empty());
        assert_eq!(transit.phase(), TransitPhase::Idle);
    }

    #[test]
    fn transit_survives_save_and_load() {
        let view = view();
        let mut transit = TransitRallyPoints::new();
        transit
            .begin_transit(outgoing_area(&view), &request(), &view)
            .expect("detach");

        let json = encode_json(&transit.to_saved(&view)).expect("encode");
        let decoded: SavedTransitState = decode_json(&json).expect("decode");
        let mut reloaded = TransitRallyPoints::from_saved(&decoded);
        assert_eq!(reloaded.phase(), TransitPhase::InTransit);
        assert_eq!(reloaded.stores(), transit.stores());
        assert_eq!(reloaded.squads(), transit.squads());
        assert_eq!(reloaded.to_saved(&view), transit.to_saved(&view));

        let area = reloaded
            .complete_transit(Position::new(10, 0, 20), Rotation::South)
            .expect("reattach");
        assert_eq!(
            area.store(A).expect("store").slots()[2],
            Position::new(9, 0, 20)
        );
    }

    #[test]
    fn empty_survivor_list_is_still_in_transit() {
        let view = view();
        let mut transit = TransitRallyPoints::new();
        let mut request = request();
        request.crew.clear();
        let kept = transit
            .begin_transit(outgoing_area(&view), &request, &view)
            .expect("detach");
        assert_eq!(kept, 0);
        assert_eq!(transit.phase(), TransitPhase::InTransit);
        let decoded = TransitRallyPoints::from_saved(&transit.to_saved(&view));
        assert_eq!(decoded.phase(), TransitPhase::InTransit);
    }

    #[test]
    fn save_mid_flight_prunes_destroyed_squad_members() {
        let mut view = view();
        let mut area = outgoing_area(&view);
        area.squads_mut().push(Squad::new(1, vec![B]));
        let mut transit = TransitRallyPoints::new();
        transit
            .begin_transit(area, &request(), &view)
            .expect("detach");
        assert_eq!(transit.squads().len(), 2);

        view.get_mut(&B).expect("b").destroyed = true;
        let saved = transit.to_saved(&view);
        assert_eq!(
            saved.state.squads,
            vec![SavedSquad {
                index: 0,
                members: vec![A.0],
            }]
        );
        assert_eq!(transit.squads(), &[Squad::new(0, vec![A])]);
    }
}
