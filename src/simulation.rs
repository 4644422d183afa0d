use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use uom::si::f64::Length;

use crate::building::Building;
use crate::error::{BmsError, FileFormatError, LoadError, Result};
use crate::floor::Floor;
use crate::hazard::HazardEvaluator;
use crate::persistence;
use crate::recommender;
use crate::registry::{TimedItem, TimedItemRegistry};
use crate::room::{Room, RoomType};
use crate::sensor::Sensor;

/// Owner of all simulated state.
///
/// Buildings are addressed by their index in insertion order. Everything added
/// through the simulation is registered for ticking right away.
#[derive(Clone, Debug)]
pub struct Simulation {
    buildings: Vec<Building>,
    registry: TimedItemRegistry,
    start: DateTime<Utc>,
    minutes_elapsed: u64,
    paused: bool,
}

fn building_mut(buildings: &mut [Building], index: usize) -> Result<&mut Building> {
    buildings
        .get_mut(index)
        .ok_or(BmsError::BuildingNotFound(index))
}

fn floor_mut(buildings: &mut [Building], index: usize, floor: i32) -> Result<&mut Floor> {
    building_mut(buildings, index)?
        .floor_by_number_mut(floor)
        .ok_or(BmsError::FloorNotFound(floor))
}

fn room_mut(buildings: &mut [Building], index: usize, floor: i32, room: i32) -> Result<&mut Room> {
    floor_mut(buildings, index, floor)?
        .room_by_number_mut(room)
        .ok_or(BmsError::RoomNotFound(room))
}

impl Simulation {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::with_buildings(Vec::new(), start)
    }

    /// Take over existing buildings, registering all their timed items
    pub fn with_buildings(buildings: Vec<Building>, start: DateTime<Utc>) -> Self {
        let mut registry = TimedItemRegistry::new();
        for (index, building) in buildings.iter().enumerate() {
            registry.register_building(index, building);
        }
        Simulation {
            buildings,
            registry,
            start,
            minutes_elapsed: 0,
            paused: false,
        }
    }

    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    pub fn building(&self, index: usize) -> Result<&Building> {
        self.buildings
            .get(index)
            .ok_or(BmsError::BuildingNotFound(index))
    }

    pub fn registry(&self) -> &TimedItemRegistry {
        &self.registry
    }

    /// Add a building and return its index
    pub fn add_building(&mut self, building: Building) -> usize {
        let index = self.buildings.len();
        self.registry.register_building(index, &building);
        info!("Added {}", building);
        self.buildings.push(building);
        index
    }

    pub fn add_floor(&mut self, building: usize, floor: Floor) -> Result<()> {
        let target = building_mut(&mut self.buildings, building)?;
        let number = floor.number();
        target.add_floor(floor)?;
        if let Some(floor) = target.floor_by_number(number) {
            self.registry.register_floor(building, floor);
        }
        Ok(())
    }

    pub fn add_room(&mut self, building: usize, floor: i32, room: Room) -> Result<()> {
        let target = floor_mut(&mut self.buildings, building, floor)?;
        let number = room.number();
        target.add_room(room)?;
        if let Some(room) = target.room_by_number(number) {
            self.registry.register_room(building, floor, room);
        }
        Ok(())
    }

    pub fn add_sensor(&mut self, building: usize, floor: i32, room: i32, sensor: Sensor) -> Result<()> {
        let sensor_type = sensor.sensor_type();
        room_mut(&mut self.buildings, building, floor, room)?.add_sensor(sensor)?;
        self.registry.register(TimedItem::Sensor {
            building,
            floor,
            room,
            sensor: sensor_type,
        });
        Ok(())
    }

    pub fn set_hazard_evaluator(
        &mut self,
        building: usize,
        floor: i32,
        room: i32,
        evaluator: HazardEvaluator,
    ) -> Result<()> {
        room_mut(&mut self.buildings, building, floor, room)?.set_hazard_evaluator(evaluator)
    }

    pub fn create_maintenance_schedule(
        &mut self,
        building: usize,
        floor: i32,
        room_order: Vec<i32>,
    ) -> Result<()> {
        floor_mut(&mut self.buildings, building, floor)?.create_maintenance_schedule(room_order)?;
        self.registry
            .register(TimedItem::MaintenanceSchedule { building, floor });
        Ok(())
    }

    pub fn skip_current_maintenance(&mut self, building: usize, floor: i32) -> Result<()> {
        floor_mut(&mut self.buildings, building, floor)?.skip_current_maintenance()
    }

    pub fn fire_drill(&mut self, building: usize, room_type: Option<RoomType>) -> Result<()> {
        building_mut(&mut self.buildings, building)?.fire_drill(room_type)
    }

    pub fn cancel_fire_drill(&mut self, building: usize) -> Result<()> {
        building_mut(&mut self.buildings, building)?.cancel_fire_drill();
        Ok(())
    }

    pub fn renovate_floor(
        &mut self,
        building: usize,
        floor: i32,
        width: Length,
        length: Length,
    ) -> Result<()> {
        building_mut(&mut self.buildings, building)?.renovate_floor(floor, width, length)
    }

    /// Advance every registered sensor and maintenance schedule by one minute,
    /// whether paused or not.
    pub fn elapse_one_minute(&mut self) {
        self.registry.elapse_one_minute(&mut self.buildings);
        self.minutes_elapsed += 1;
        debug!("Simulated time is now {}", self.now());
    }

    /// Driver tick: advances one minute unless paused. Returns whether time moved.
    pub fn tick(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.elapse_one_minute();
        true
    }

    /// Returns the new pause state
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        info!(
            "Simulation {} at {}",
            if self.paused { "paused" } else { "resumed" },
            self.now()
        );
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn minutes_elapsed(&self) -> u64 {
        self.minutes_elapsed
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start
    }

    /// Current simulated time
    pub fn now(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.minutes_elapsed as i64)
    }

    pub fn recommend_study_room(&self, building: usize) -> Result<Option<&Room>> {
        Ok(recommender::recommend_study_room(self.building(building)?))
    }

    pub fn encode(&self) -> String {
        persistence::encode(&self.buildings)
    }

    pub fn decode(text: &str, start: DateTime<Utc>) -> std::result::Result<Self, FileFormatError> {
        Ok(Self::with_buildings(persistence::decode(text)?, start))
    }

    pub fn load<P: AsRef<Path>>(path: P, start: DateTime<Utc>) -> std::result::Result<Self, LoadError> {
        Ok(Self::with_buildings(persistence::load(path)?, start))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        persistence::save(path, &self.buildings)
    }
}
