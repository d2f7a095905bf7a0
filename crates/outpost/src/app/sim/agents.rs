/// Every agent the world knows about, placed or not.
#[derive(Debug, Default)]
pub(crate) struct AgentTable {
    agents: HashMap<AgentId, SimAgent>,
    next_id: u64,
}

impl AgentTable {
    pub(crate) fn spawn(&mut self, name: &str, faction: Faction, position: Position) -> AgentId {
        self.next_id += 1;
        let id = AgentId(self.next_id);
        let mut info = AgentInfo::resident_at(position);
        info.faction = faction;
        self.agents.insert(
            id,
            SimAgent {
                name: name.to_string(),
                info,
                drafted: false,
            },
        );
        info!(agent = id.0, name, position = %position, "agent_spawned");
        id
    }

    pub(crate) fn get(&self, id: AgentId) -> Option<&SimAgent> {
        self.agents.get(&id)
    }

    fn get_mut(&mut self, id: AgentId) -> Result<&mut SimAgent, SimError> {
        self.agents.get_mut(&id).ok_or(SimError::UnknownAgent(id))
    }

    pub(crate) fn len(&self) -> usize {
        self.agents.len()
    }

    fn sorted_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.agents.keys().copied().collect();
        ids.sort();
        ids
    }

    fn place(&mut self, id: AgentId, position: Position) -> Result<(), SimError> {
        let agent = self.get_mut(id)?;
        agent.info.position = Some(position);
        agent.info.destination = None;
        Ok(())
    }

    pub(crate) fn order(&mut self, order: AgentOrder) -> Result<(), SimError> {
        let agent = self.get_mut(order.agent)?;
        agent.info.destination = Some(order.destination);
        agent.drafted = true;
        debug!(agent = order.agent.0, destination = %order.destination, "agent_ordered");
        Ok(())
    }

    /// Takes every placed agent off the map. Returns how many were placed.
    fn unplace_all(&mut self) -> usize {
        let mut unplaced = 0;
        for agent in self.agents.values_mut() {
            if agent.info.position.take().is_some() {
                unplaced += 1;
            }
            agent.info.destination = None;
            agent.drafted = false;
        }
        unplaced
    }

    /// Moves each walking agent one cell toward its destination. Returns the
    /// number of agents that arrived this step.
    fn advance(&mut self) -> usize {
        let mut arrived = 0;
        for id in self.sorted_ids() {
            let Some(agent) = self.agents.get_mut(&id) else {
                continue;
            };
            if agent.info.destroyed {
                continue;
            }
            let (Some(position), Some(destination)) =
                (agent.info.position, agent.info.destination)
            else {
                continue;
            };
            let next = Position::new(
                position.x + (destination.x - position.x).signum(),
                destination.y,
                position.z + (destination.z - position.z).signum(),
            );
            agent.info.position = Some(next);
            if next == destination {
                agent.info.destination = None;
                arrived += 1;
                debug!(agent = id.0, position = %next, "agent_arrived");
            }
        }
        arrived
    }

    fn is_walking(&self) -> bool {
        self.agents
            .values()
            .any(|agent| !agent.info.destroyed && agent.info.destination.is_some())
    }

    fn to_saved(&self) -> Vec<SavedAgent> {
        self.sorted_ids()
            .into_iter()
            .filter_map(|id| self.agents.get(&id).map(|agent| (id, agent)))
            .map(|(id, agent)| SavedAgent {
                id: id.0,
                name: agent.name.clone(),
                faction: SavedFaction::from_faction(agent.info.faction),
                position: agent.info.position.and_then(SavedPosition::from_position),
                destination: agent.info.destination.and_then(SavedPosition::from_position),
                destroyed: agent.info.destroyed,
                drafted: agent.drafted,
            })
            .collect()
    }

    fn from_saved(saved: &[SavedAgent], next_id: u64) -> Self {
        let agents = saved
            .iter()
            .map(|agent| {
                let info = AgentInfo {
                    position: agent.position.map(|cell| SavedPosition::to_position(Some(cell))),
                    destroyed: agent.destroyed,
                    faction: agent.faction.to_faction(),
                    destination: agent
                        .destination
                        .map(|cell| SavedPosition::to_position(Some(cell))),
                };
                (
                    AgentId(agent.id),
                    SimAgent {
                        name: agent.name.clone(),
                        info,
                        drafted: agent.drafted,
                    },
                )
            })
            .collect();
        Self { agents, next_id }
    }
}

impl AgentView for AgentTable {
    fn agent(&self, id: AgentId) -> Option<AgentInfo> {
        self.agents.get(&id).map(|agent| agent.info)
    }
}

impl AreaListener for AgentTable {
    fn area_removed(&mut self, agent: AgentId) {
        if let Some(entry) = self.agents.get_mut(&agent) {
            entry.info.destination = None;
            entry.drafted = false;
            debug!(agent = agent.0, "rally_owner_area_removed");
        }
    }
}
