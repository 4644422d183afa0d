use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use uom::si::{area::square_meter, f64::Area};

use crate::error::{invalid, BmsError, Result};
use crate::hazard::HazardEvaluator;
use crate::sensor::{Sensor, SensorType};
use crate::tools::mean;

#[cfg(test)]
use proptest::{
    arbitrary::{any, Arbitrary},
    prelude::prop,
    strategy::{BoxedStrategy, Strategy},
};

/// Smallest permitted room area, in square metres
pub const MIN_AREA: f64 = 5.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoomType {
    Study,
    Laboratory,
    Office,
}

impl RoomType {
    pub const ALL: [RoomType; 3] = [RoomType::Study, RoomType::Laboratory, RoomType::Office];

    /// Name used in save files, case sensitive
    pub fn name(self) -> &'static str {
        match self {
            RoomType::Study => "STUDY",
            RoomType::Laboratory => "LABORATORY",
            RoomType::Office => "OFFICE",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoomType {
    type Err = BmsError;

    fn from_str(s: &str) -> Result<Self> {
        RoomType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| invalid(format!("unknown room type {:?}", s)))
    }
}

/// Derived state of a room, never stored
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoomState {
    Open,
    Evacuate,
    Maintenance,
}

#[derive(Clone, Debug)]
pub struct Room {
    number: i32,
    room_type: RoomType,
    area: Area,
    /// At most one sensor per type, kept in canonical `SensorType` order
    sensors: Vec<Sensor>,
    hazard_evaluator: Option<HazardEvaluator>,
    fire_drill: bool,
    maintenance: bool,
}

impl Room {
    pub fn new(number: i32, room_type: RoomType, area: Area) -> Self {
        Room {
            number,
            room_type,
            area,
            sensors: Vec::new(),
            hazard_evaluator: None,
            fire_drill: false,
            maintenance: false,
        }
    }

    pub fn min_area() -> Area {
        Area::new::<square_meter>(MIN_AREA)
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn room_type(&self) -> RoomType {
        self.room_type
    }

    pub fn area(&self) -> Area {
        self.area
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn sensor(&self, sensor_type: SensorType) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.sensor_type() == sensor_type)
    }

    pub fn sensor_mut(&mut self, sensor_type: SensorType) -> Option<&mut Sensor> {
        self.sensors.iter_mut().find(|s| s.sensor_type() == sensor_type)
    }

    /// Attach a sensor. Any hazard evaluator is discarded, since it was
    /// configured for the previous set of sensors.
    pub fn add_sensor(&mut self, sensor: Sensor) -> Result<()> {
        match self
            .sensors
            .binary_search_by_key(&sensor.sensor_type(), |s| s.sensor_type())
        {
            Ok(_) => Err(BmsError::DuplicateSensor(sensor.sensor_type())),
            Err(position) => {
                self.sensors.insert(position, sensor);
                self.hazard_evaluator = None;
                Ok(())
            }
        }
    }

    pub fn hazard_evaluator(&self) -> Option<&HazardEvaluator> {
        self.hazard_evaluator.as_ref()
    }

    /// Install an evaluator. Every sensor type it refers to must be attached
    /// to this room, each at most once.
    pub fn set_hazard_evaluator(&mut self, evaluator: HazardEvaluator) -> Result<()> {
        let sensor_types = evaluator.sensor_types();
        if let Some(missing) = sensor_types.iter().find(|t| self.sensor(**t).is_none()) {
            return Err(invalid(format!(
                "room {} has no {} for the hazard evaluator",
                self.number, missing
            )));
        }
        if !sensor_types.iter().all_unique() {
            return Err(invalid("hazard evaluator refers to a sensor more than once"));
        }
        self.hazard_evaluator = Some(evaluator);
        Ok(())
    }

    pub fn clear_hazard_evaluator(&mut self) {
        self.hazard_evaluator = None;
    }

    /// Hazard level according to the room's evaluator, if it has one
    pub fn evaluate_hazard_level(&self) -> Option<u32> {
        self.hazard_evaluator
            .as_ref()
            .map(|evaluator| evaluator.evaluate(&self.sensors))
    }

    /// Average comfort level over all sensors, 0 for a room without sensors
    pub fn comfort_level(&self) -> f64 {
        mean(self.sensors.iter().map(|s| s.comfort_level())).unwrap_or(0.0)
    }

    pub fn fire_drill_ongoing(&self) -> bool {
        self.fire_drill
    }

    pub fn set_fire_drill(&mut self, fire_drill: bool) {
        self.fire_drill = fire_drill;
    }

    pub fn maintenance_ongoing(&self) -> bool {
        self.maintenance
    }

    pub fn set_maintenance(&mut self, maintenance: bool) {
        self.maintenance = maintenance;
    }

    pub fn state(&self) -> RoomState {
        let on_fire = self
            .sensor(SensorType::Temperature)
            .map_or(false, |s| s.hazard_level() == 100);
        if on_fire || self.fire_drill {
            RoomState::Evacuate
        } else if self.maintenance {
            RoomState::Maintenance
        } else {
            RoomState::Open
        }
    }
}

/// Structural equality; flags and the hazard evaluator are runtime state.
impl PartialEq for Room {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
            && self.room_type == other.room_type
            && self.area == other.area
            && self.sensors == other.sensors
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Room #{}: type={}, area={:.2}m^2, sensors={}",
            self.number,
            self.room_type,
            self.area.get::<square_meter>(),
            self.sensors.len()
        )
    }
}

#[cfg(test)]
impl Arbitrary for RoomType {
    type Parameters = ();
    type Strategy = BoxedStrategy<RoomType>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        prop::sample::select(RoomType::ALL.to_vec()).boxed()
    }
}

/// Parameter is the room number; the area is generated in quarter square metres
/// between the minimum and 30 m^2.
#[cfg(test)]
impl Arbitrary for Room {
    type Parameters = i32;
    type Strategy = BoxedStrategy<Room>;

    fn arbitrary_with(number: i32) -> Self::Strategy {
        (
            RoomType::arbitrary(),
            20u32..=120,
            prop::collection::vec(Sensor::arbitrary(), 0..5),
            any::<(bool, bool)>(),
        )
            .prop_map(move |(room_type, quarters, sensors, (evaluate, weighted))| {
                let mut room = Room::new(
                    number,
                    room_type,
                    Area::new::<square_meter>(quarters as f64 / 4.0),
                );
                for sensor in sensors {
                    // Duplicated types are simply dropped
                    let _ = room.add_sensor(sensor);
                }
                let types: Vec<_> = room.sensors().iter().map(|s| s.sensor_type()).collect();
                if evaluate && !types.is_empty() {
                    let evaluator = if weighted {
                        let share = 100 / types.len() as i32;
                        let first = 100 - share * (types.len() as i32 - 1);
                        HazardEvaluator::weighting_based(
                            types
                                .iter()
                                .enumerate()
                                .map(|(i, t)| (*t, if i == 0 { first } else { share })),
                        )
                        .unwrap()
                    } else {
                        HazardEvaluator::rule_based(types)
                    };
                    room.set_hazard_evaluator(evaluator).unwrap();
                }
                room
            })
            .boxed()
    }
}
