/// One deferred side effect, applied at a fixed point of the next tick.
///
/// Scheduling again before the drain overwrites the previous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEffect<T> {
    slot: Option<T>,
}

impl<T> Default for PendingEffect<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> PendingEffect<T> {
    pub fn schedule(&mut self, value: T) {
        self.slot = Some(value);
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }
}

/// One-shot feedback cue the host may play when it drains a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cue {
    DraftOn,
    Tick,
}
