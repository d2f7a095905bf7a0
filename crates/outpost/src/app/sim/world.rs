/// Headless host world: one optional loaded area, the world-scoped transit
/// holder, and every agent.
#[derive(Debug)]
pub(crate) struct SimWorld {
    agents: AgentTable,
    area: Option<LoadedArea>,
    transit: TransitRallyPoints,
    crew: Vec<CrewBerth>,
    settings: RallySettings,
    tick: u64,
}

impl SimWorld {
    pub(crate) fn new(settings: RallySettings) -> Self {
        Self {
            agents: AgentTable::default(),
            area: None,
            transit: TransitRallyPoints::new(),
            crew: Vec::new(),
            settings,
            tick: 0,
        }
    }

    pub(crate) fn agents(&self) -> &AgentTable {
        &self.agents
    }

    pub(crate) fn agents_mut(&mut self) -> &mut AgentTable {
        &mut self.agents
    }

    pub(crate) fn area(&self) -> Option<&LoadedArea> {
        self.area.as_ref()
    }

    pub(crate) fn area_mut(&mut self) -> Result<&mut LoadedArea, SimError> {
        self.area.as_mut().ok_or(SimError::NoAreaLoaded)
    }

    pub(crate) fn transit(&self) -> &TransitRallyPoints {
        &self.transit
    }

    pub(crate) fn settings(&self) -> &RallySettings {
        &self.settings
    }

    pub(crate) fn tick_count(&self) -> u64 {
        self.tick
    }

    pub(crate) fn load_area(&mut self, name: &str) -> Result<(), SimError> {
        if let Some(loaded) = &self.area {
            return Err(SimError::AreaAlreadyLoaded {
                name: loaded.name.clone(),
            });
        }
        self.area = Some(LoadedArea {
            name: name.to_string(),
            rally: AreaRallyPoints::new(),
        });
        info!(area = name, "area_loaded");
        Ok(())
    }

    /// Routes a rally control click for `agent` and issues any resulting order.
    pub(crate) fn command(
        &mut self,
        agent: AgentId,
        slot: usize,
        modifiers: Modifiers,
    ) -> Result<ControlOutcome, SimError> {
        let loaded = self.area.as_mut().ok_or(SimError::NoAreaLoaded)?;
        let outcome =
            loaded
                .rally
                .click_control(agent, slot, modifiers, &self.settings, &self.agents)?;
        self.finish_command(outcome)
    }

    pub(crate) fn hotkey(
        &mut self,
        agent: AgentId,
        modifiers: Modifiers,
        now: Instant,
    ) -> Result<ControlOutcome, SimError> {
        let loaded = self.area.as_mut().ok_or(SimError::NoAreaLoaded)?;
        let outcome =
            loaded
                .rally
                .handle_hotkey(agent, modifiers, &self.settings, &self.agents, now)?;
        self.finish_command(outcome)
    }

    fn finish_command(&mut self, outcome: ControlOutcome) -> Result<ControlOutcome, SimError> {
        log_report(&outcome.report);
        if let Some(order) = outcome.order {
            self.agents.order(order)?;
        }
        Ok(outcome)
    }

    pub(crate) fn handle_event(&mut self, event: RallyEvent) -> Result<(), SimError> {
        match event {
            RallyEvent::Detach {
                origin,
                footprint,
                crew,
            } => self.detach(origin, footprint, crew).map(|_| ()),
            RallyEvent::Reattach {
                new_origin,
                rotation,
            } => self.reattach(new_origin, rotation),
            RallyEvent::UnloadWithoutTransfer => self.unload_without_transfer(),
        }
    }

    fn detach(
        &mut self,
        origin: Position,
        footprint: Vec<Position>,
        crew: Vec<AgentId>,
    ) -> Result<usize, SimError> {
        let LoadedArea { name, rally } = self.area.take().ok_or(SimError::NoAreaLoaded)?;
        let request = DetachRequest::new(origin, footprint, crew);

        // Residency is read here, so agents stay placed until the filter ran.
        let kept = match self.transit.begin_transit(rally, &request, &self.agents) {
            Ok(kept) => kept,
            Err(rejected) => {
                self.area = Some(LoadedArea {
                    name,
                    rally: rejected.area,
                });
                return Err(rejected.error.into());
            }
        };

        let mut boarding: Vec<AgentId> = request.crew.iter().copied().collect();
        boarding.sort();
        self.crew = boarding
            .into_iter()
            .filter_map(|agent| {
                self.agents
                    .position_of(agent)
                    .filter(|position| request.footprint.contains(position))
                    .map(|position| CrewBerth {
                        agent,
                        offset: position - origin,
                    })
            })
            .collect();
        let left_behind = self.agents.unplace_all().saturating_sub(self.crew.len());
        info!(
            area = %name,
            kept,
            boarded = self.crew.len(),
            left_behind,
            "area_detached"
        );
        Ok(kept)
    }

    fn reattach(&mut self, new_origin: Position, rotation: Rotation) -> Result<(), SimError> {
        if let Some(loaded) = &self.area {
            return Err(SimError::AreaAlreadyLoaded {
                name: loaded.name.clone(),
            });
        }
        if self.transit.phase() != TransitPhase::InTransit {
            return Err(TransitError::NotInTransit.into());
        }

        for berth in std::mem::take(&mut self.crew) {
            self.agents
                .place(berth.agent, new_origin + rotation.rotate(berth.offset))?;
        }
        let rally = self.transit.complete_transit(new_origin, rotation)?;
        let name = format!("landing_{}_{}_{}", new_origin.x, new_origin.y, new_origin.z);
        info!(
            area = %name,
            rotation = rotation.as_token(),
            stores = rally.store_count(),
            "area_reattached"
        );
        self.area = Some(LoadedArea { name, rally });
        Ok(())
    }

    fn unload_without_transfer(&mut self) -> Result<(), SimError> {
        let loaded = self.area.take().ok_or(SimError::NoAreaLoaded)?;
        loaded.rally.on_area_destroyed(&mut self.agents);
        let stranded = self.agents.unplace_all();
        info!(area = %loaded.name, stranded, "area_unloaded");
        Ok(())
    }

    /// One simulation step: deferred rally effects first, then movement.
    /// Returns how many agents arrived.
    pub(crate) fn tick(&mut self) -> usize {
        self.tick += 1;
        if let Some(loaded) = self.area.as_mut() {
            let effects = loaded.rally.tick();
            if let Some(mode) = effects.mode_changed_to {
                info!(tick = self.tick, area = %loaded.name, mode = ?mode, "area_mode_changed");
            }
            match effects.cue {
                Some(Cue::DraftOn) => debug!(tick = self.tick, "cue_draft_on"),
                Some(Cue::Tick) => debug!(tick = self.tick, "cue_tick"),
                None => {}
            }
        }
        self.agents.advance()
    }

    /// Ticks until nobody is walking or `max_ticks` steps ran.
    pub(crate) fn run_until_idle(&mut self, max_ticks: u64) -> (u64, usize) {
        let mut ticks = 0;
        let mut arrived = 0;
        loop {
            arrived += self.tick();
            ticks += 1;
            if !self.agents.is_walking() || ticks >= max_ticks {
                break;
            }
        }
        (ticks, arrived)
    }
}

fn log_report(report: &InteractionReport) {
    if report.success {
        info!(
            agent = report.agent.0,
            slot = report.slot,
            kind = report.kind.as_token(),
            "rally_command"
        );
    } else {
        warn!(
            agent = report.agent.0,
            slot = report.slot,
            kind = report.kind.as_token(),
            "rally_command_failed"
        );
    }
}
