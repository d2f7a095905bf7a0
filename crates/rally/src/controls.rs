use crate::agent::AgentId;
use crate::position::Position;
use crate::settings::{RallySettings, ShiftKeyMode};

/// Modifier keys held while a rally control was used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn control() -> Self {
        Self {
            control: true,
            ..Self::NONE
        }
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::NONE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    AssignSlot,
    ClearSlot,
    ToggleMode,
    SendToSlot,
}

pub fn resolve_control_action(modifiers: Modifiers, settings: &RallySettings) -> ControlAction {
    if modifiers.shift && settings.shift_key_mode == ShiftKeyMode::AssignSlot {
        ControlAction::AssignSlot
    } else if modifiers.control {
        ControlAction::ClearSlot
    } else if modifiers.alt {
        ControlAction::ToggleMode
    } else {
        ControlAction::SendToSlot
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    SavedPosition,
    ClearedPosition,
    SentToSavedPosition,
    ModeToggleScheduled,
}

impl ReportKind {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::SavedPosition => "saved_position",
            Self::ClearedPosition => "cleared_position",
            Self::SentToSavedPosition => "sent_to_saved_position",
            Self::ModeToggleScheduled => "mode_toggle_scheduled",
        }
    }
}

/// Result of one command, for the host to aggregate into player messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionReport {
    pub kind: ReportKind,
    pub agent: AgentId,
    pub success: bool,
    pub slot: usize,
}

/// Movement the host should issue after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentOrder {
    pub agent: AgentId,
    pub destination: Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOutcome {
    pub report: InteractionReport,
    pub order: Option<AgentOrder>,
}

impl ControlOutcome {
    pub(crate) fn report_only(report: InteractionReport) -> Self {
        Self {
            report,
            order: None,
        }
    }
}

/// Entry of the per-slot context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    Assign { slot: usize },
    Clear { slot: usize },
    ToggleMode,
}
