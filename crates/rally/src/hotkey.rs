use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::slots::NUM_SLOTS;

pub const HOTKEY_MULTI_PRESS_TIMEOUT: Duration = Duration::from_millis(500);

/// Which slot the rally hotkey acts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyMode {
    #[default]
    FirstSlotOnly,
    LastUsedSlot,
    MultiPress,
}

impl HotkeyMode {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::FirstSlotOnly => "first_slot_only",
            Self::LastUsedSlot => "last_used_slot",
            Self::MultiPress => "multi_press",
        }
    }

    pub fn parse_token(token: &str) -> Option<Self> {
        match token.trim() {
            "first_slot_only" | "first" => Some(Self::FirstSlotOnly),
            "last_used_slot" | "last" => Some(Self::LastUsedSlot),
            "multi_press" | "multi" => Some(Self::MultiPress),
            _ => None,
        }
    }
}

/// Per-store state for repeated hotkey presses. Runtime only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiPressCycle {
    last_press: Option<Instant>,
    slot: usize,
}

impl MultiPressCycle {
    /// Advances to the next slot when pressed again within the timeout while
    /// the advanced controls are shown; otherwise starts over at slot 0.
    pub fn press(&mut self, now: Instant, advanced_mode: bool) -> usize {
        let within_window = self
            .last_press
            .and_then(|last| now.checked_duration_since(last))
            .is_some_and(|elapsed| elapsed < HOTKEY_MULTI_PRESS_TIMEOUT);
        self.slot = if advanced_mode && within_window {
            (self.slot + 1) % NUM_SLOTS
        } else {
            0
        };
        self.last_press = Some(now);
        self.slot
    }
}

pub fn resolve_hotkey_slot(
    mode: HotkeyMode,
    last_used_slot: usize,
    cycle: &mut MultiPressCycle,
    advanced_mode: bool,
    now: Instant,
) -> usize {
    match mode {
        HotkeyMode::FirstSlotOnly => 0,
        HotkeyMode::LastUsedSlot => last_used_slot.min(NUM_SLOTS - 1),
        HotkeyMode::MultiPress => cycle.press(now, advanced_mode),
    }
}
