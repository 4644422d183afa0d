use std::env;

use anyhow::Context;
use log::info;

use building_management::config::Config;
use building_management::recommender::recommend_study_room;
use building_management::Simulation;

fn report(simulation: &Simulation) {
    info!(
        "State after {} minutes ({})",
        simulation.minutes_elapsed(),
        simulation.now()
    );
    for building in simulation.buildings() {
        info!("{}", building);
        for floor in building.floors() {
            info!("  {}", floor);
            if let Some(schedule) = floor.maintenance_schedule() {
                info!("    {}", schedule);
            }
            for room in floor.rooms() {
                let hazard = room
                    .evaluate_hazard_level()
                    .map_or_else(|| "n/a".to_owned(), |level| level.to_string());
                info!("    {}, state={:?}, hazard={}", room, room.state(), hazard);
            }
        }
        match recommend_study_room(building) {
            Some(room) => info!("  Recommended study room: #{}", room.number()),
            None => info!("  No study room available"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config_path = env::args().nth(1).unwrap_or_else(|| "config.json5".to_owned());
    let config = Config::load(&config_path)?;

    let mut simulation = Simulation::load(&config.save_file, config.start_time)
        .with_context(|| format!("Could not load {}", config.save_file.display()))?;
    if config.start_paused {
        simulation.toggle_pause();
    }

    for _ in 0..config.minutes {
        simulation.tick();
    }
    report(&simulation);

    if let Some(output_file) = &config.output_file {
        simulation
            .save(output_file)
            .with_context(|| format!("Could not save {}", output_file.display()))?;
    }

    Ok(())
}
