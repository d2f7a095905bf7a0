use std::collections::HashMap;
use std::fmt;

use crate::position::Position;

/// Stable identity of a controllable agent. Survives save/load and transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Faction {
    #[default]
    Player,
    Other,
}

/// What the host world currently knows about one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentInfo {
    /// `None` while the agent is not placed in any local area.
    pub position: Option<Position>,
    pub destroyed: bool,
    pub faction: Faction,
    /// Cell the agent is currently ordered to walk to, if any.
    pub destination: Option<Position>,
}

impl AgentInfo {
    pub fn resident_at(position: Position) -> Self {
        Self {
            position: Some(position),
            destroyed: false,
            faction: Faction::Player,
            destination: None,
        }
    }

    pub fn is_resident(&self) -> bool {
        !self.destroyed && self.position.is_some()
    }

    /// Where a newly assigned slot should point: the pending destination wins.
    pub fn destination_or_position(&self) -> Option<Position> {
        self.destination.or(self.position)
    }
}

/// Read access to agents owned by the host world.
pub trait AgentView {
    fn agent(&self, id: AgentId) -> Option<AgentInfo>;

    fn is_resident(&self, id: AgentId) -> bool {
        self.agent(id).is_some_and(|info| info.is_resident())
    }

    fn position_of(&self, id: AgentId) -> Option<Position> {
        self.agent(id).and_then(|info| {
            if info.destroyed {
                None
            } else {
                info.position
            }
        })
    }
}

impl AgentView for HashMap<AgentId, AgentInfo> {
    fn agent(&self, id: AgentId) -> Option<AgentInfo> {
        self.get(&id).copied()
    }
}

/// Receives per-agent notifications when a local area goes away without a
/// relocation transfer.
pub trait AreaListener {
    fn area_removed(&mut self, agent: AgentId);
}

impl AreaListener for Vec<AgentId> {
    fn area_removed(&mut self, agent: AgentId) {
        self.push(agent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroyed_agent_is_never_resident() {
        let mut agents = HashMap::new();
        let mut info = AgentInfo::resident_at(Position::new(1, 0, 1));
        info.destroyed = true;
        agents.insert(AgentId(1), info);
        assert!(!agents.is_resident(AgentId(1)));
        assert_eq!(agents.position_of(AgentId(1)), None);
        assert!(!agents.is_resident(AgentId(2)));
    }

    #[test]
    fn destination_takes_priority_over_position() {
        let mut info = AgentInfo::resident_at(Position::new(1, 0, 1));
        assert_eq!(info.destination_or_position(), Some(Position::new(1, 0, 1)));
        info.destination = Some(Position::new(4, 0, 2));
        assert_eq!(info.destination_or_position(), Some(Position::new(4, 0, 2)));
    }
}
