use crate::agent::{AgentId, AgentView, Faction};

/// A player-defined group of agents bound to a squad hotkey index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Squad {
    pub index: u8,
    pub members: Vec<AgentId>,
}

impl Squad {
    pub fn new(index: u8, members: Vec<AgentId>) -> Self {
        Self { index, members }
    }
}

fn member_is_save_worthy(member: AgentId, view: &dyn AgentView) -> bool {
    view.agent(member)
        .is_some_and(|info| !info.destroyed && info.faction == Faction::Player)
}

/// Drops members that can no longer be saved, then drops squads left empty.
pub fn discard_non_save_worthy(squads: &mut Vec<Squad>, view: &dyn AgentView) {
    for squad in squads.iter_mut() {
        squad
            .members
            .retain(|member| member_is_save_worthy(*member, view));
    }
    squads.retain(|squad| {
        let keep = !squad.members.is_empty();
        if !keep {
            tracing::debug!(squad = squad.index, "squad_discarded");
        }
        keep
    });
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::agent::AgentInfo;
    use crate::position::Position;

    #[test]
    fn discard_pass_prunes_members_and_empty_squads() {
        let mut agents = HashMap::new();
        agents.insert(AgentId(1), AgentInfo::resident_at(Position::ZERO));
        let mut raider = AgentInfo::resident_at(Position::ZERO);
        raider.faction = Faction::Other;
        agents.insert(AgentId(2), raider);
        let mut dead = AgentInfo::resident_at(Position::ZERO);
        dead.destroyed = true;
        agents.insert(AgentId(3), dead);

        let mut squads = vec![
            Squad::new(0, vec![AgentId(1), AgentId(2)]),
            Squad::new(1, vec![AgentId(3), AgentId(99)]),
        ];
        assert!(member_is_save_worthy(AgentId(1), &agents));
        assert!(!member_is_save_worthy(AgentId(2), &agents));
        assert!(!member_is_save_worthy(AgentId(99), &agents));

        discard_non_save_worthy(&mut squads, &agents);
        assert_eq!(squads, vec![Squad::new(0, vec![AgentId(1)])]);
    }
}
