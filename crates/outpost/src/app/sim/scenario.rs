const CAMPSITE_AREA: &str = "campsite";
const HOMESTEAD_AREA: &str = "homestead";
const SHIP_ORIGIN: Position = Position::new(5, 0, 5);
const SHIP_SIZE: i32 = 3;

fn ship_footprint(origin: Position) -> Vec<Position> {
    (0..SHIP_SIZE)
        .flat_map(|dz| {
            (0..SHIP_SIZE).map(move |dx| Position::new(origin.x + dx, origin.y, origin.z + dz))
        })
        .collect()
}

/// Scripted relocation: a campsite is abandoned without transfer, rally
/// points are assigned on a homestead, the ship
/// lifts off with part of the crew, the world is saved and reloaded mid-flight,
/// the ship lands rotated at a new site and the crew is sent back to their
/// saved cells.
pub(crate) fn run_relocation_scenario(
    world: &mut SimWorld,
    config: &ScenarioConfig,
) -> Result<ScenarioReport, SimError> {
    world.load_area(CAMPSITE_AREA)?;
    let scout = world
        .agents_mut()
        .spawn("scout", Faction::Player, Position::new(1, 0, 1));
    world.command(scout, 0, Modifiers::shift())?;
    world.handle_event(RallyEvent::UnloadWithoutTransfer)?;

    world.load_area(HOMESTEAD_AREA)?;
    let pilot = world
        .agents_mut()
        .spawn("pilot", Faction::Player, SHIP_ORIGIN);
    let engineer = world
        .agents_mut()
        .spawn("engineer", Faction::Player, Position::new(6, 0, 6));
    let farmer = world
        .agents_mut()
        .spawn("farmer", Faction::Player, Position::new(20, 0, 20));
    let trader = world
        .agents_mut()
        .spawn("trader", Faction::Other, Position::new(7, 0, 7));

    world.command(pilot, 0, Modifiers::shift())?;
    world.agents_mut().order(AgentOrder {
        agent: pilot,
        destination: Position::new(7, 0, 5),
    })?;
    // Pending destination is what gets saved.
    world.command(pilot, 2, Modifiers::shift())?;
    world.command(engineer, 1, Modifiers::shift())?;
    world.command(engineer, 3, Modifiers::shift())?;
    world.command(engineer, 3, Modifiers::control())?;
    world.command(farmer, 0, Modifiers::shift())?;
    world.command(pilot, 0, Modifiers::alt())?;
    world
        .area_mut()?
        .rally
        .squads_mut()
        .push(Squad::new(0, vec![pilot, engineer, farmer]));

    world.run_until_idle(config.max_ticks);

    world.handle_event(RallyEvent::Detach {
        origin: SHIP_ORIGIN,
        footprint: ship_footprint(SHIP_ORIGIN),
        crew: vec![pilot, engineer, trader],
    })?;
    let kept_stores = world.transit().stores().len();

    let save_path = world.save_to_disk(&config.save_dir)?;
    let settings = *world.settings();
    *world = SimWorld::load_from_disk(&config.save_dir, settings)?.ok_or_else(|| {
        SaveLoadError::validation(".", format!("save vanished at {}", save_path.display()))
    })?;

    world.handle_event(RallyEvent::Reattach {
        new_origin: config.landing_origin,
        rotation: config.landing_rotation,
    })?;

    world.hotkey(pilot, Modifiers::NONE, Instant::now())?;
    world.command(engineer, 1, Modifiers::NONE)?;
    let (_, arrived) = world.run_until_idle(config.max_ticks);
    let landed_stores = world
        .area()
        .map_or(0, |loaded| loaded.rally.store_count());
    if let Some(agent) = world.agents().get(pilot) {
        info!(
            agent = pilot.0,
            name = %agent.name,
            position = ?agent.info.position,
            "pilot_landed"
        );
    }

    Ok(ScenarioReport {
        kept_stores,
        landed_stores,
        ticks: world.tick_count(),
        arrived,
        save_path,
    })
}
