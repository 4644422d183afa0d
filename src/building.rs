use std::fmt;

use log::info;
use uom::si::{area::square_meter, f64::Length, length::meter};

use crate::error::{invalid, BmsError, Result};
use crate::floor::{check_dimensions, Floor};
use crate::persistence;
use crate::room::RoomType;

#[cfg(test)]
use proptest::{
    arbitrary::Arbitrary,
    prelude::prop,
    strategy::{BoxedStrategy, Strategy},
};

/// A named stack of floors.
///
/// Floor numbers are unique, and every floor above the ground floor rests on
/// the floor numbered one lower, which must be at least as large.
#[derive(Clone, Debug)]
pub struct Building {
    name: String,
    floors: Vec<Floor>,
}

impl Building {
    /// The name has to fit on one save file line: not blank, no `:` and no
    /// line breaks.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(invalid("building name must not be blank"));
        }
        if name.contains(|c: char| matches!(c, ':' | '\n' | '\r')) {
            return Err(invalid(format!(
                "building name {:?} must not contain ':' or line breaks",
                name
            )));
        }
        Ok(Building {
            name,
            floors: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Floors in the order they were added
    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn floor_by_number(&self, number: i32) -> Option<&Floor> {
        self.floors.iter().find(|f| f.number() == number)
    }

    pub fn floor_by_number_mut(&mut self, number: i32) -> Option<&mut Floor> {
        self.floors.iter_mut().find(|f| f.number() == number)
    }

    pub fn add_floor(&mut self, floor: Floor) -> Result<()> {
        let number = floor.number();
        if number < 1 {
            return Err(invalid(format!("floor number must be 1 or higher, got {}", number)));
        }
        check_dimensions(floor.width(), floor.length())?;
        if self.floor_by_number(number).is_some() {
            return Err(BmsError::DuplicateFloor(number));
        }
        if number >= 2 {
            let below = self
                .floor_by_number(number - 1)
                .ok_or(BmsError::NoFloorBelow(number))?;
            if below.area() < floor.area() {
                return Err(BmsError::FloorTooSmall {
                    floor: number,
                    reason: format!(
                        "floor below has {} m^2, this floor needs {} m^2",
                        below.area().get::<square_meter>(),
                        floor.area().get::<square_meter>()
                    ),
                });
            }
        }
        self.floors.push(floor);
        Ok(())
    }

    /// Start a fire drill in all rooms of the given type (all rooms for `None`)
    /// on every floor.
    pub fn fire_drill(&mut self, room_type: Option<RoomType>) -> Result<()> {
        if self.floors.is_empty() {
            return Err(BmsError::FireDrill(format!(
                "there are no floors in {} yet",
                self.name
            )));
        }
        if self.floors.iter().all(|f| f.rooms().is_empty()) {
            return Err(BmsError::FireDrill(format!(
                "there are no rooms in {} yet",
                self.name
            )));
        }
        for floor in &mut self.floors {
            floor.fire_drill(room_type);
        }
        match room_type {
            Some(room_type) => info!("Fire drill in {} for {} rooms", self.name, room_type),
            None => info!("Fire drill in {} for all rooms", self.name),
        }
        Ok(())
    }

    pub fn cancel_fire_drill(&mut self) {
        for floor in &mut self.floors {
            floor.cancel_fire_drill();
        }
    }

    /// Resize a floor. Its rooms must still fit, the floor below must stay at
    /// least as large and the floor above must not become larger.
    pub fn renovate_floor(&mut self, number: i32, width: Length, length: Length) -> Result<()> {
        let floor = self
            .floor_by_number(number)
            .ok_or(BmsError::FloorNotFound(number))?;
        check_dimensions(width, length)?;
        let new_area = width * length;
        let occupied = floor.occupied_area();
        if occupied > new_area {
            return Err(BmsError::InsufficientSpace {
                floor_area: new_area.get::<square_meter>(),
                occupied: occupied.get::<square_meter>(),
                requested: 0.0,
            });
        }
        if let Some(below) = self.floor_by_number(number - 1) {
            if below.area() < new_area {
                return Err(BmsError::FloorTooSmall {
                    floor: number,
                    reason: format!(
                        "floor below only has {} m^2",
                        below.area().get::<square_meter>()
                    ),
                });
            }
        }
        if let Some(above) = self.floor_by_number(number + 1) {
            if above.area() > new_area {
                return Err(BmsError::FloorTooSmall {
                    floor: number,
                    reason: format!(
                        "floor above needs {} m^2 of support",
                        above.area().get::<square_meter>()
                    ),
                });
            }
        }

        self.floor_by_number_mut(number)
            .ok_or(BmsError::FloorNotFound(number))?
            .change_dimensions(width, length)?;
        info!(
            "Renovated floor {} of {} to {}m x {}m",
            number,
            self.name,
            width.get::<meter>(),
            length.get::<meter>()
        );
        Ok(())
    }

    /// Save file representation of this building alone
    pub fn encode(&self) -> String {
        persistence::encode(std::slice::from_ref(self))
    }
}

impl PartialEq for Building {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.floors == other.floors
    }
}

impl fmt::Display for Building {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Building: name=\"{}\", floors={}", self.name, self.floors.len())
    }
}

/// Buildings with up to four floors stacked on ever smaller (or equal) floors.
#[cfg(test)]
impl Arbitrary for Building {
    type Parameters = ();
    type Strategy = BoxedStrategy<Building>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        let dimensions = prop::collection::vec((20u32..=120, 20u32..=120), 0..4).prop_map(
            |dimensions| {
                let (mut widths, mut lengths): (Vec<u32>, Vec<u32>) =
                    dimensions.into_iter().unzip();
                widths.sort_unstable_by(|a, b| b.cmp(a));
                lengths.sort_unstable_by(|a, b| b.cmp(a));
                widths.into_iter().zip(lengths).collect::<Vec<_>>()
            },
        );
        ("[ A-Za-z0-9.,;'()&/-]{0,4}[A-Za-z0-9][ A-Za-z0-9.,;'()&/-]{0,12}", dimensions)
            .prop_flat_map(|(name, dimensions)| {
                let floors = dimensions
                    .into_iter()
                    .enumerate()
                    .map(|(i, (width, length))| Floor::arbitrary_with((i as i32 + 1, width, length)))
                    .collect::<Vec<_>>();
                (proptest::strategy::Just(name), floors)
            })
            .prop_map(|(name, floors)| {
                let mut building = Building::new(name).unwrap();
                for floor in floors {
                    building.add_floor(floor).unwrap();
                }
                building
            })
            .boxed()
    }
}
