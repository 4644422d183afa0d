use std::collections::HashSet;

use log::{debug, warn};

use crate::building::Building;
use crate::floor::Floor;
use crate::room::Room;
use crate::sensor::SensorType;

/// Handle of something that advances with simulated time.
///
/// Handles address items by position in the simulation's building list and by
/// floor, room and sensor type, which are unique at their level.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimedItem {
    Sensor {
        building: usize,
        floor: i32,
        room: i32,
        sensor: SensorType,
    },
    /// The maintenance schedule a floor currently has
    MaintenanceSchedule { building: usize, floor: i32 },
}

/// Append-only list of timed items, ticked in registration order.
#[derive(Clone, Debug, Default)]
pub struct TimedItemRegistry {
    items: Vec<TimedItem>,
    registered: HashSet<TimedItem>,
}

impl TimedItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item; returns false if it was registered already.
    pub fn register(&mut self, item: TimedItem) -> bool {
        if !self.registered.insert(item) {
            return false;
        }
        debug!("Registered timed item {:?}", item);
        self.items.push(item);
        true
    }

    pub fn register_room(&mut self, building: usize, floor: i32, room: &Room) {
        for sensor in room.sensors() {
            self.register(TimedItem::Sensor {
                building,
                floor,
                room: room.number(),
                sensor: sensor.sensor_type(),
            });
        }
    }

    pub fn register_floor(&mut self, building: usize, floor: &Floor) {
        for room in floor.rooms() {
            self.register_room(building, floor.number(), room);
        }
        if floor.maintenance_schedule().is_some() {
            self.register(TimedItem::MaintenanceSchedule {
                building,
                floor: floor.number(),
            });
        }
    }

    /// Register every sensor and maintenance schedule of the building
    pub fn register_building(&mut self, index: usize, building: &Building) {
        for floor in building.floors() {
            self.register_floor(index, floor);
        }
    }

    pub fn items(&self) -> &[TimedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Advance every registered item by one minute. Handles that no longer
    /// resolve are skipped. Returns the number of items advanced.
    pub fn elapse_one_minute(&self, buildings: &mut [Building]) -> usize {
        let mut advanced = 0;
        for item in &self.items {
            if elapse_item(*item, buildings) {
                advanced += 1;
            } else {
                warn!("Timed item {:?} no longer exists", item);
            }
        }
        debug!("Advanced {} of {} timed items", advanced, self.items.len());
        advanced
    }
}

fn elapse_item(item: TimedItem, buildings: &mut [Building]) -> bool {
    match item {
        TimedItem::Sensor {
            building,
            floor,
            room,
            sensor,
        } => buildings
            .get_mut(building)
            .and_then(|b| b.floor_by_number_mut(floor))
            .and_then(|f| f.room_by_number_mut(room))
            .and_then(|r| r.sensor_mut(sensor))
            .map(|s| s.elapse_one_minute())
            .is_some(),
        TimedItem::MaintenanceSchedule { building, floor } => {
            match buildings
                .get_mut(building)
                .and_then(|b| b.floor_by_number_mut(floor))
            {
                Some(floor) if floor.maintenance_schedule().is_some() => {
                    floor.elapse_maintenance_minute();
                    true
                }
                _ => false,
            }
        }
    }
}
