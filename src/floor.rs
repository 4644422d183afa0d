use std::fmt;

use log::info;
use uom::si::{
    area::square_meter,
    f64::{Area, Length},
    length::meter,
};

use crate::error::{invalid, BmsError, Result};
use crate::maintenance::MaintenanceSchedule;
use crate::room::{Room, RoomType};

#[cfg(test)]
use proptest::{
    arbitrary::{any, Arbitrary},
    prelude::prop,
    strategy::{BoxedStrategy, Strategy},
};

/// Smallest permitted floor width, in metres
pub const MIN_WIDTH: f64 = 5.0;
/// Smallest permitted floor length, in metres
pub const MIN_LENGTH: f64 = 5.0;

#[derive(Clone, Debug)]
pub struct Floor {
    number: i32,
    width: Length,
    length: Length,
    rooms: Vec<Room>,
    maintenance_schedule: Option<MaintenanceSchedule>,
}

/// Both dimensions must reach their minimum; NaN never does.
pub(crate) fn check_dimensions(width: Length, length: Length) -> Result<()> {
    let (w, l) = (width.get::<meter>(), length.get::<meter>());
    if !(w >= MIN_WIDTH) || !(l >= MIN_LENGTH) || w.is_infinite() || l.is_infinite() {
        return Err(invalid(format!(
            "floor dimensions {}m x {}m, must be at least {}m x {}m",
            w, l, MIN_WIDTH, MIN_LENGTH
        )));
    }
    Ok(())
}

impl Floor {
    /// Dimensions are checked when the floor is added to a building or gets
    /// its first room, whichever comes first.
    pub fn new(number: i32, width: Length, length: Length) -> Self {
        Floor {
            number,
            width,
            length,
            rooms: Vec::new(),
            maintenance_schedule: None,
        }
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn width(&self) -> Length {
        self.width
    }

    pub fn length(&self) -> Length {
        self.length
    }

    pub fn area(&self) -> Area {
        self.width * self.length
    }

    /// Sum of the areas of all rooms on the floor
    pub fn occupied_area(&self) -> Area {
        self.rooms
            .iter()
            .fold(Area::new::<square_meter>(0.0), |total, room| total + room.area())
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room_by_number(&self, number: i32) -> Option<&Room> {
        self.rooms.iter().find(|r| r.number() == number)
    }

    pub fn room_by_number_mut(&mut self, number: i32) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.number() == number)
    }

    pub fn add_room(&mut self, room: Room) -> Result<()> {
        check_dimensions(self.width, self.length)?;
        let area = room.area().get::<square_meter>();
        if !(room.area() >= Room::min_area()) || area.is_infinite() {
            return Err(invalid(format!(
                "room area {} m^2 is below the minimum of {} m^2",
                area,
                Room::min_area().get::<square_meter>()
            )));
        }
        if self.room_by_number(room.number()).is_some() {
            return Err(BmsError::DuplicateRoom(room.number()));
        }
        let occupied = self.occupied_area();
        if occupied + room.area() > self.area() {
            return Err(BmsError::InsufficientSpace {
                floor_area: self.area().get::<square_meter>(),
                occupied: occupied.get::<square_meter>(),
                requested: area,
            });
        }
        self.rooms.push(room);
        Ok(())
    }

    /// Resize the floor in place; the rooms must still fit.
    pub fn change_dimensions(&mut self, width: Length, length: Length) -> Result<()> {
        check_dimensions(width, length)?;
        let new_area = width * length;
        let occupied = self.occupied_area();
        if occupied > new_area {
            return Err(BmsError::InsufficientSpace {
                floor_area: new_area.get::<square_meter>(),
                occupied: occupied.get::<square_meter>(),
                requested: 0.0,
            });
        }
        self.width = width;
        self.length = length;
        Ok(())
    }

    /// Start a fire drill in every room of the given type, or in all rooms.
    pub fn fire_drill(&mut self, room_type: Option<RoomType>) {
        self.rooms
            .iter_mut()
            .filter(|room| room_type.map_or(true, |t| room.room_type() == t))
            .for_each(|room| room.set_fire_drill(true));
    }

    pub fn cancel_fire_drill(&mut self) {
        self.rooms.iter_mut().for_each(|room| room.set_fire_drill(false));
    }

    pub fn maintenance_schedule(&self) -> Option<&MaintenanceSchedule> {
        self.maintenance_schedule.as_ref()
    }

    /// Install a new maintenance schedule visiting rooms in `room_order`.
    /// A previous schedule is discarded after ending its current visit.
    pub fn create_maintenance_schedule(&mut self, room_order: Vec<i32>) -> Result<()> {
        let schedule = MaintenanceSchedule::new(room_order, &self.rooms)?;
        if let Some(previous) = self.maintenance_schedule.take() {
            previous.stop(&mut self.rooms);
        }
        schedule.start(&mut self.rooms);
        info!("Floor {}: {}", self.number, schedule);
        self.maintenance_schedule = Some(schedule);
        Ok(())
    }

    /// Advance the maintenance schedule, if any, by one minute
    pub fn elapse_maintenance_minute(&mut self) {
        if let Some(schedule) = self.maintenance_schedule.as_mut() {
            schedule.elapse_one_minute(&mut self.rooms);
        }
    }

    pub fn skip_current_maintenance(&mut self) -> Result<()> {
        match self.maintenance_schedule.as_mut() {
            Some(schedule) => {
                schedule.skip_current_maintenance(&mut self.rooms);
                Ok(())
            }
            None => Err(invalid(format!(
                "floor {} has no maintenance schedule",
                self.number
            ))),
        }
    }
}

/// Structural equality: number, dimensions and rooms in order
impl PartialEq for Floor {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
            && self.width == other.width
            && self.length == other.length
            && self.rooms == other.rooms
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Floor #{}: width={:.2}m, length={:.2}m, rooms={}",
            self.number,
            self.width.get::<meter>(),
            self.length.get::<meter>(),
            self.rooms.len()
        )
    }
}

/// Parameters are the floor number and its width and length in quarter metres.
/// Rooms are generated until the floor is full; some get a maintenance schedule.
#[cfg(test)]
impl Arbitrary for Floor {
    type Parameters = (i32, u32, u32);
    type Strategy = BoxedStrategy<Floor>;

    fn arbitrary_with((number, width, length): Self::Parameters) -> Self::Strategy {
        let candidates = (0..6)
            .map(|i| Room::arbitrary_with(number * 100 + i))
            .collect::<Vec<_>>();
        (candidates, any::<bool>())
            .prop_map(move |(rooms, scheduled)| {
                let mut floor = Floor::new(
                    number,
                    Length::new::<meter>(width as f64 / 4.0),
                    Length::new::<meter>(length as f64 / 4.0),
                );
                for room in rooms {
                    // Rooms which do not fit any more are left out
                    let _ = floor.add_room(room);
                }
                if scheduled && !floor.rooms().is_empty() {
                    let order = floor.rooms().iter().map(|r| r.number()).collect();
                    floor.create_maintenance_schedule(order).unwrap();
                }
                floor
            })
            .boxed()
    }
}
