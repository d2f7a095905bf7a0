use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::agent::{AgentId, AgentView, AreaListener};
use crate::controls::{
    resolve_control_action, AgentOrder, ContextAction, ControlAction, ControlOutcome,
    InteractionReport, Modifiers, ReportKind,
};
use crate::hotkey::resolve_hotkey_slot;
use crate::pending::{Cue, PendingEffect};
use crate::persist::{SavedRallyState, SavedSlotStore, SavedSquad};
use crate::position::Position;
use crate::settings::RallySettings;
use crate::slots::{check_slot, SlotError, SlotStore, NUM_SLOTS};
use crate::squad::{discard_non_save_worthy, Squad};

pub const POSITION_HIGHLIGHT_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InteractionMode {
    #[default]
    Basic,
    Advanced,
}

impl InteractionMode {
    pub fn from_advanced(advanced: bool) -> Self {
        if advanced {
            Self::Advanced
        } else {
            Self::Basic
        }
    }

    pub fn is_advanced(self) -> bool {
        self == Self::Advanced
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Basic => Self::Advanced,
            Self::Advanced => Self::Basic,
        }
    }
}

/// What one tick applied. The host plays `cue` if present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEffects {
    pub mode_changed_to: Option<InteractionMode>,
    pub cue: Option<Cue>,
}

pub(crate) struct OutgoingArea {
    pub(crate) stores: Vec<SlotStore>,
    pub(crate) squads: Vec<Squad>,
    pub(crate) mode: InteractionMode,
    pub(crate) last_used_slot: usize,
}

/// Rally data of one loaded local area.
#[derive(Debug, Default)]
pub struct AreaRallyPoints {
    stores: HashMap<AgentId, SlotStore>,
    squads: Vec<Squad>,
    mode: InteractionMode,
    last_used_slot: usize,
    pending_mode_toggle: PendingEffect<()>,
    pending_cue: PendingEffect<Cue>,
}

impl AreaRallyPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(
        stores: Vec<SlotStore>,
        squads: Vec<Squad>,
        mode: InteractionMode,
        last_used_slot: usize,
    ) -> Self {
        let mut area = Self {
            squads,
            mode,
            last_used_slot: last_used_slot.min(NUM_SLOTS - 1),
            ..Self::default()
        };
        area.rebuild_from_list(stores);
        area
    }

    pub fn get_or_add_store(&mut self, agent: AgentId) -> &mut SlotStore {
        self.stores.entry(agent).or_insert_with(|| {
            debug!(agent = agent.0, "slot_store_created");
            SlotStore::new(agent)
        })
    }

    pub fn store(&self, agent: AgentId) -> Option<&SlotStore> {
        self.stores.get(&agent)
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    pub fn squads(&self) -> &[Squad] {
        &self.squads
    }

    pub fn squads_mut(&mut self) -> &mut Vec<Squad> {
        &mut self.squads
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn last_used_slot(&self) -> usize {
        self.last_used_slot
    }

    pub fn set_last_used_slot(&mut self, slot: usize) -> Result<(), SlotError> {
        self.last_used_slot = check_slot(slot)?;
        Ok(())
    }

    /// Stores that would be written by a save right now, ordered by owner.
    pub fn snapshot_for_save(&self, view: &dyn AgentView) -> Vec<SlotStore> {
        let mut list: Vec<SlotStore> = self
            .stores
            .values()
            .filter(|store| store.should_be_saved(view))
            .cloned()
            .collect();
        list.sort_by_key(|store| store.owner());
        list
    }

    /// Replaces every store. A later entry for the same owner wins.
    pub fn rebuild_from_list(&mut self, list: Vec<SlotStore>) {
        self.stores.clear();
        for store in list {
            self.stores.insert(store.owner(), store);
        }
    }

    /// The area is going away without a transfer; stores are left as they are.
    pub fn on_area_destroyed(&self, listener: &mut dyn AreaListener) {
        let mut owners: Vec<AgentId> = self.stores.keys().copied().collect();
        owners.sort();
        for owner in owners {
            listener.area_removed(owner);
        }
    }

    /// Squads that can no longer be saved are discarded in place.
    pub fn to_saved(&mut self, view: &dyn AgentView) -> SavedRallyState {
        discard_non_save_worthy(&mut self.squads, view);
        SavedRallyState {
            stores: self
                .snapshot_for_save(view)
                .iter()
                .map(SavedSlotStore::from_store)
                .collect(),
            squads: self.squads.iter().map(SavedSquad::from_squad).collect(),
            advanced_mode: self.mode.is_advanced(),
            last_used_slot: self.last_used_slot as i64,
        }
    }

    pub fn from_saved(saved: &SavedRallyState) -> Self {
        Self::from_parts(
            saved.live_stores(),
            saved.live_squads(),
            InteractionMode::from_advanced(saved.advanced_mode),
            saved.clamped_last_used_slot(),
        )
    }

    /// Consumes the area, yielding exactly what a save would have kept.
    pub(crate) fn into_save_parts(mut self, view: &dyn AgentView) -> OutgoingArea {
        discard_non_save_worthy(&mut self.squads, view);
        OutgoingArea {
            stores: self.snapshot_for_save(view),
            squads: self.squads,
            mode: self.mode,
            last_used_slot: self.last_used_slot,
        }
    }

    pub fn schedule_mode_toggle(&mut self) {
        self.pending_mode_toggle.schedule(());
    }

    pub fn schedule_cue(&mut self, cue: Cue) {
        self.pending_cue.schedule(cue);
    }

    /// Applies deferred effects. At most one toggle per tick however many
    /// requests were made.
    pub fn tick(&mut self) -> TickEffects {
        let mut effects = TickEffects::default();
        if self.pending_mode_toggle.take().is_some() {
            self.mode = self.mode.toggled();
            info!(mode = ?self.mode, "rally_mode_toggled");
            effects.mode_changed_to = Some(self.mode);
        }
        effects.cue = self.pending_cue.take();
        effects
    }

    /// Saves the agent's current destination, or its cell when idle.
    pub fn assign_slot(
        &mut self,
        agent: AgentId,
        slot: usize,
        view: &dyn AgentView,
    ) -> Result<InteractionReport, SlotError> {
        let slot = check_slot(slot)?;
        let target = view
            .agent(agent)
            .filter(|info| info.is_resident())
            .and_then(|info| info.destination_or_position())
            .ok_or(SlotError::OwnerNotResident { owner: agent })?;
        self.get_or_add_store(agent)
            .set_position(slot, target, view)?;
        info!(agent = agent.0, slot, position = %target, "slot_assigned");
        Ok(InteractionReport {
            kind: ReportKind::SavedPosition,
            agent,
            success: true,
            slot,
        })
    }

    pub fn clear_slot(
        &mut self,
        agent: AgentId,
        slot: usize,
        view: &dyn AgentView,
    ) -> Result<InteractionReport, SlotError> {
        let slot = check_slot(slot)?;
        let had_position = match self.stores.get_mut(&agent) {
            Some(store) => {
                let had_position = store.has_position(slot)?;
                store.discard(slot, view)?;
                had_position
            }
            None => {
                require_resident(agent, view)?;
                false
            }
        };
        info!(agent = agent.0, slot, had_position, "slot_cleared");
        Ok(InteractionReport {
            kind: ReportKind::ClearedPosition,
            agent,
            success: had_position,
            slot,
        })
    }

    /// Orders the agent to its saved cell. An empty slot reports failure and
    /// issues no order.
    pub fn send_to_slot(
        &mut self,
        agent: AgentId,
        slot: usize,
        view: &dyn AgentView,
    ) -> Result<ControlOutcome, SlotError> {
        let slot = check_slot(slot)?;
        let destination = match self.stores.get(&agent) {
            Some(store) => store.position(slot, view)?,
            None => {
                require_resident(agent, view)?;
                Position::INVALID
            }
        };
        let report = InteractionReport {
            kind: ReportKind::SentToSavedPosition,
            agent,
            success: destination.is_valid(),
            slot,
        };
        if !destination.is_valid() {
            debug!(agent = agent.0, slot, "send_to_empty_slot");
            return Ok(ControlOutcome::report_only(report));
        }
        self.schedule_cue(Cue::DraftOn);
        info!(agent = agent.0, slot, position = %destination, "agent_sent_to_slot");
        Ok(ControlOutcome {
            report,
            order: Some(AgentOrder { agent, destination }),
        })
    }

    pub fn handle_control(
        &mut self,
        agent: AgentId,
        slot: usize,
        modifiers: Modifiers,
        settings: &RallySettings,
        view: &dyn AgentView,
    ) -> Result<ControlOutcome, SlotError> {
        match resolve_control_action(modifiers, settings) {
            ControlAction::AssignSlot => self
                .assign_slot(agent, slot, view)
                .map(ControlOutcome::report_only),
            ControlAction::ClearSlot => self
                .clear_slot(agent, slot, view)
                .map(ControlOutcome::report_only),
            ControlAction::ToggleMode => {
                let slot = check_slot(slot)?;
                self.schedule_mode_toggle();
                Ok(ControlOutcome::report_only(InteractionReport {
                    kind: ReportKind::ModeToggleScheduled,
                    agent,
                    success: true,
                    slot,
                }))
            }
            ControlAction::SendToSlot => self.send_to_slot(agent, slot, view),
        }
    }

    /// Click on one of the advanced controls; remembers the slot for the
    /// last-used hotkey policy.
    pub fn click_control(
        &mut self,
        agent: AgentId,
        slot: usize,
        modifiers: Modifiers,
        settings: &RallySettings,
        view: &dyn AgentView,
    ) -> Result<ControlOutcome, SlotError> {
        self.set_last_used_slot(slot)?;
        // A send replaces the click with the draft cue.
        self.schedule_cue(Cue::Tick);
        self.handle_control(agent, slot, modifiers, settings, view)
    }

    pub fn hotkey_slot(&mut self, agent: AgentId, settings: &RallySettings, now: Instant) -> usize {
        let advanced = self.mode.is_advanced();
        let last_used = self.last_used_slot;
        let store = self.get_or_add_store(agent);
        resolve_hotkey_slot(
            settings.hotkey_mode,
            last_used,
            &mut store.multi_press,
            advanced,
            now,
        )
    }

    pub fn handle_hotkey(
        &mut self,
        agent: AgentId,
        modifiers: Modifiers,
        settings: &RallySettings,
        view: &dyn AgentView,
        now: Instant,
    ) -> Result<ControlOutcome, SlotError> {
        let slot = self.hotkey_slot(agent, settings, now);
        self.handle_control(agent, slot, modifiers, settings, view)
    }

    /// Sends the agent by hotkey, ignoring modifiers.
    pub fn try_send_by_hotkey(
        &mut self,
        agent: AgentId,
        settings: &RallySettings,
        view: &dyn AgentView,
        now: Instant,
    ) -> Result<ControlOutcome, SlotError> {
        let slot = self.hotkey_slot(agent, settings, now);
        self.send_to_slot(agent, slot, view)
    }

    pub fn context_actions(
        &self,
        agent: AgentId,
        slot: usize,
    ) -> Result<Vec<ContextAction>, SlotError> {
        let slot = check_slot(slot)?;
        let has_position = match self.stores.get(&agent) {
            Some(store) => store.has_position(slot)?,
            None => false,
        };
        let mut actions = vec![ContextAction::Assign { slot }];
        if has_position {
            actions.push(ContextAction::Clear { slot });
        }
        actions.push(ContextAction::ToggleMode);
        Ok(actions)
    }

    /// Saved cell to highlight for a hovered control, throttled per agent.
    /// `None` when throttled or the slot is empty.
    pub fn highlight_slot(
        &mut self,
        agent: AgentId,
        slot: usize,
        view: &dyn AgentView,
        now: Instant,
    ) -> Result<Option<Position>, SlotError> {
        let slot = check_slot(slot)?;
        let Some(store) = self.stores.get_mut(&agent) else {
            require_resident(agent, view)?;
            return Ok(None);
        };
        let position = store.position(slot, view)?;
        if store
            .highlight_blocked_until
            .is_some_and(|blocked_until| blocked_until > now)
        {
            return Ok(None);
        }
        if !position.is_valid() {
            return Ok(None);
        }
        store.highlight_blocked_until = Some(now + POSITION_HIGHLIGHT_INTERVAL);
        Ok(Some(position))
    }
}

fn require_resident(agent: AgentId, view: &dyn AgentView) -> Result<(), SlotError> {
    if view.is_resident(agent) {
        Ok(())
    } else {
        Err(SlotError::OwnerNotResident { owner: agent })
    }
}
