impl SimWorld {
    pub(crate) fn save_file_path(dir: &Path) -> PathBuf {
        dir.join(WORLD_SAVE_FILE)
    }

    pub(crate) fn save_to_disk(&mut self, dir: &Path) -> Result<PathBuf, SimError> {
        let save = self.build_saved_world();
        let path = Self::save_file_path(dir);
        write_json_file(&path, &save)?;
        info!(
            path = %path.display(),
            agents = save.agents.len(),
            in_transit = save.transit.in_transit,
            "world_saved"
        );
        Ok(path)
    }

    /// `Ok(None)` when `dir` holds no world save.
    pub(crate) fn load_from_disk(
        dir: &Path,
        settings: RallySettings,
    ) -> Result<Option<Self>, SimError> {
        let path = Self::save_file_path(dir);
        let Some(save) = read_json_file::<SavedWorld>(&path)? else {
            return Ok(None);
        };
        validate_saved_world(&save)?;
        let world = Self::apply_saved_world(save, settings);
        info!(
            path = %path.display(),
            agents = world.agents.len(),
            transit = ?world.transit.phase(),
            "world_loaded"
        );
        Ok(Some(world))
    }

    fn build_saved_world(&mut self) -> SavedWorld {
        let agents = &self.agents;
        let area = self.area.as_mut().map(|loaded| SavedArea {
            name: loaded.name.clone(),
            rally: loaded.rally.to_saved(agents),
        });
        SavedWorld {
            save_version: SAVE_VERSION,
            tick: self.tick,
            next_agent_id: self.agents.next_id,
            agents: self.agents.to_saved(),
            area,
            transit: self.transit.to_saved(agents),
            crew: self
                .crew
                .iter()
                .map(|berth| SavedBerth {
                    agent: berth.agent.0,
                    offset: saved_cell(berth.offset),
                })
                .collect(),
        }
    }

    fn apply_saved_world(save: SavedWorld, settings: RallySettings) -> Self {
        let transit = TransitRallyPoints::from_saved(&save.transit);
        let crew = if transit.phase() == TransitPhase::InTransit {
            save.crew
                .iter()
                .map(|berth| CrewBerth {
                    agent: AgentId(berth.agent),
                    offset: SavedPosition::to_position(Some(berth.offset)),
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            agents: AgentTable::from_saved(&save.agents, save.next_agent_id),
            area: save.area.map(|area| LoadedArea {
                rally: AreaRallyPoints::from_saved(&area.rally),
                name: area.name,
            }),
            transit,
            crew,
            settings,
            tick: save.tick,
        }
    }
}

fn saved_cell(position: Position) -> SavedPosition {
    SavedPosition {
        x: position.x,
        y: position.y,
        z: position.z,
    }
}

fn validate_saved_world(save: &SavedWorld) -> Result<(), SaveLoadError> {
    if save.save_version != SAVE_VERSION {
        return Err(SaveLoadError::expected_actual(
            "save_version",
            SAVE_VERSION,
            save.save_version,
        ));
    }

    let mut known_ids = HashMap::with_capacity(save.agents.len());
    for (index, agent) in save.agents.iter().enumerate() {
        if let Some(first_index) = known_ids.insert(agent.id, index) {
            return Err(SaveLoadError::validation(
                format!("agents[{index}].id"),
                format!(
                    "duplicate agent id {} (first seen at agents[{first_index}].id)",
                    agent.id
                ),
            ));
        }
        if agent.id > save.next_agent_id {
            return Err(SaveLoadError::expected_actual(
                format!("agents[{index}].id"),
                format!("<= next_agent_id {}", save.next_agent_id),
                agent.id,
            ));
        }
    }

    if !save.crew.is_empty() && !save.transit.in_transit {
        return Err(SaveLoadError::validation(
            "crew",
            "crew berths present while no relocation is in transit",
        ));
    }
    for (index, berth) in save.crew.iter().enumerate() {
        let path = format!("crew[{index}].agent");
        let Some(&agent_index) = known_ids.get(&berth.agent) else {
            return Err(SaveLoadError::validation(
                path,
                format!("unknown agent id {}", berth.agent),
            ));
        };
        if save.agents[agent_index].position.is_some() {
            return Err(SaveLoadError::validation(
                path,
                format!("agent {} is aboard but also placed", berth.agent),
            ));
        }
    }
    Ok(())
}
