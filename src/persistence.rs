//! Line based save file format.
//!
//! ```text
//! buildingName
//! floorCount
//! floorNumber:width:length:roomCount[:roomNumber,roomNumber,...]
//! roomNumber:ROOM_TYPE:area:sensorCount[:RuleBased|WeightingBased]
//! SensorType:r1,r2,...[:updateFrequency[:extra...]][@weight]
//! ```
//!
//! Rooms follow their floor line and sensors follow their room line, in order.
//! Decoding parses the whole text into an intermediate form first and then
//! rebuilds the buildings through the same checked operations the rest of the
//! crate uses, so a file is either accepted entirely or rejected.

use std::fs;
use std::iter::{Enumerate, Peekable};
use std::path::Path;
use std::str::FromStr;

use itertools::Itertools;
use log::info;
use uom::si::{area::square_meter, length::meter};

use crate::building::Building;
use crate::error::{FileFormatError, LoadError};
use crate::hazard::HazardEvaluator;
use crate::room::Room;
use crate::sensor::SensorKind;

type FormatResult<T> = std::result::Result<T, FileFormatError>;

/// Encode buildings in the save file format, one line per item, each line
/// terminated by `\n`.
pub fn encode(buildings: &[Building]) -> String {
    let mut lines = Vec::new();
    for building in buildings {
        encode_building(&mut lines, building);
    }
    lines.into_iter().map(|line| line + "\n").collect()
}

fn encode_building(lines: &mut Vec<String>, building: &Building) {
    lines.push(building.name().to_owned());
    lines.push(building.floors().len().to_string());
    for floor in building.floors() {
        let mut line = format!(
            "{}:{}:{}:{}",
            floor.number(),
            floor.width().get::<meter>(),
            floor.length().get::<meter>(),
            floor.rooms().len()
        );
        if let Some(schedule) = floor.maintenance_schedule() {
            line += &format!(":{}", schedule.room_order().iter().join(","));
        }
        lines.push(line);
        for room in floor.rooms() {
            encode_room(lines, room);
        }
    }
}

fn encode_room(lines: &mut Vec<String>, room: &Room) {
    let mut line = format!(
        "{}:{}:{}:{}",
        room.number(),
        room.room_type(),
        room.area().get::<square_meter>(),
        room.sensors().len()
    );
    let evaluator = room.hazard_evaluator();
    if let Some(evaluator) = evaluator {
        line += &format!(":{}", evaluator.name());
    }
    lines.push(line);
    for sensor in room.sensors() {
        let readings = sensor.readings().iter().join(",");
        let mut line = match sensor.kind() {
            SensorKind::Temperature => format!("{}:{}", sensor.sensor_type(), readings),
            SensorKind::Noise => format!(
                "{}:{}:{}",
                sensor.sensor_type(),
                readings,
                sensor.update_frequency()
            ),
            SensorKind::Occupancy { capacity } => format!(
                "{}:{}:{}:{}",
                sensor.sensor_type(),
                readings,
                sensor.update_frequency(),
                capacity
            ),
            SensorKind::CarbonDioxide {
                ideal_value,
                variation_limit,
            } => format!(
                "{}:{}:{}:{}:{}",
                sensor.sensor_type(),
                readings,
                sensor.update_frequency(),
                ideal_value,
                variation_limit
            ),
        };
        if let Some(evaluator @ HazardEvaluator::WeightingBased { .. }) = evaluator {
            line += &format!("@{}", evaluator.weighting(sensor.sensor_type()).unwrap_or(0));
        }
        lines.push(line);
    }
}

/// Decode a complete save file. Any violation rejects the whole input.
pub fn decode(text: &str) -> FormatResult<Vec<Building>> {
    let mut lines = LineReader::new(text);
    if lines.is_finished() {
        return Err(FileFormatError::eof("no buildings in file"));
    }
    let mut buildings = Vec::new();
    while !lines.is_finished() {
        buildings.push(as_loaded::Building::parse(&mut lines)?.convert()?);
    }
    Ok(buildings)
}

/// Read and decode a save file
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Building>, LoadError> {
    let text = fs::read_to_string(path.as_ref())?;
    let buildings = decode(&text)?;
    info!(
        "Loaded {} buildings from {}",
        buildings.len(),
        path.as_ref().display()
    );
    Ok(buildings)
}

/// Encode and write the buildings to a save file
pub fn save<P: AsRef<Path>>(path: P, buildings: &[Building]) -> std::io::Result<()> {
    fs::write(path.as_ref(), encode(buildings))?;
    info!(
        "Saved {} buildings to {}",
        buildings.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Hands out lines together with their 1-based line numbers.
/// Blank lines are never valid content.
struct LineReader<'a> {
    lines: Peekable<Enumerate<std::str::Lines<'a>>>,
}

impl<'a> LineReader<'a> {
    fn new(text: &'a str) -> Self {
        LineReader {
            lines: text.lines().enumerate().peekable(),
        }
    }

    fn is_finished(&mut self) -> bool {
        self.lines.peek().is_none()
    }

    fn next(&mut self, expected: &str) -> FormatResult<(usize, &'a str)> {
        match self.lines.next() {
            None => Err(FileFormatError::eof(format!(
                "file ended where {} was expected",
                expected
            ))),
            Some((index, line)) if line.trim().is_empty() => Err(FileFormatError::at(
                index + 1,
                format!("blank line where {} was expected", expected),
            )),
            Some((index, line)) => Ok((index + 1, line)),
        }
    }
}

/// Split a line into exactly one of the allowed numbers of `:` separated fields
fn fields<'a>(line_number: usize, line: &'a str, allowed: &[usize]) -> FormatResult<Vec<&'a str>> {
    let fields = line.split(':').collect::<Vec<_>>();
    if !allowed.contains(&fields.len()) {
        return Err(FileFormatError::at(
            line_number,
            format!(
                "expected {} fields, found {}",
                allowed.iter().join(" or "),
                fields.len()
            ),
        ));
    }
    Ok(fields)
}

fn parse<T>(line_number: usize, field: &str, what: &str) -> FormatResult<T>
where
    T: FromStr,
{
    field.parse().map_err(|_| {
        FileFormatError::at(line_number, format!("invalid {} {:?}", what, field))
    })
}

fn parse_finite(line_number: usize, field: &str, what: &str) -> FormatResult<f64> {
    let value: f64 = parse(line_number, field, what)?;
    if !value.is_finite() {
        return Err(FileFormatError::at(
            line_number,
            format!("{} must be a finite number", what),
        ));
    }
    Ok(value)
}

fn parse_list<T>(line_number: usize, field: &str, what: &str) -> FormatResult<Vec<T>>
where
    T: FromStr,
{
    field
        .split(',')
        .map(|item| parse(line_number, item, what))
        .collect()
}

/// Intermediate, purely syntactic form of a save file.
mod as_loaded {
    use uom::si::{
        area::square_meter,
        f64::{Area, Length},
        length::meter,
    };

    use super::{fields, parse, parse_finite, parse_list, FormatResult, LineReader};
    use crate::error::{BmsError, FileFormatError};
    use crate::floor::check_dimensions;
    use crate::hazard::HazardEvaluator;
    use crate::room::RoomType;
    use crate::sensor::SensorType;

    fn rejected(line: usize) -> impl FnOnce(BmsError) -> FileFormatError {
        move |error| FileFormatError::at(line, error.to_string())
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Building {
        pub line: usize,
        pub name: String,
        pub floors: Vec<Floor>,
    }

    impl Building {
        pub(super) fn parse(lines: &mut LineReader) -> FormatResult<Self> {
            let (line, name) = lines.next("a building name")?;
            if name.contains(':') {
                return Err(FileFormatError::at(
                    line,
                    "building name must not contain ':'",
                ));
            }
            let (count_line, count) = lines.next("a floor count")?;
            let count: usize = parse(count_line, count, "floor count")?;
            let floors = (0..count)
                .map(|_| Floor::parse(lines))
                .collect::<FormatResult<Vec<_>>>()?;
            Ok(Building {
                line,
                name: name.to_owned(),
                floors,
            })
        }

        pub fn convert(self) -> FormatResult<super::Building> {
            let mut building = super::Building::new(self.name).map_err(rejected(self.line))?;
            for floor in self.floors {
                let line = floor.line;
                building
                    .add_floor(floor.convert()?)
                    .map_err(rejected(line))?;
            }
            Ok(building)
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Floor {
        pub line: usize,
        pub number: i32,
        pub width: f64,
        pub length: f64,
        pub maintenance: Option<Vec<i32>>,
        pub rooms: Vec<Room>,
    }

    impl Floor {
        pub(super) fn parse(lines: &mut LineReader) -> FormatResult<Self> {
            let (line, text) = lines.next("a floor")?;
            let fields = fields(line, text, &[4, 5])?;
            let number = parse(line, fields[0], "floor number")?;
            let width = parse_finite(line, fields[1], "floor width")?;
            let length = parse_finite(line, fields[2], "floor length")?;
            let count: usize = parse(line, fields[3], "room count")?;
            let maintenance = fields
                .get(4)
                .map(|order| parse_list(line, order, "maintenance room number"))
                .transpose()?;
            let rooms = (0..count)
                .map(|_| Room::parse(lines))
                .collect::<FormatResult<Vec<_>>>()?;
            Ok(Floor {
                line,
                number,
                width,
                length,
                maintenance,
                rooms,
            })
        }

        pub fn convert(self) -> FormatResult<crate::floor::Floor> {
            let (width, length) = (
                Length::new::<meter>(self.width),
                Length::new::<meter>(self.length),
            );
            check_dimensions(width, length).map_err(rejected(self.line))?;
            let mut floor = crate::floor::Floor::new(self.number, width, length);
            for room in self.rooms {
                let line = room.line;
                floor.add_room(room.convert()?).map_err(rejected(line))?;
            }
            if let Some(order) = self.maintenance {
                floor
                    .create_maintenance_schedule(order)
                    .map_err(rejected(self.line))?;
            }
            Ok(floor)
        }
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum EvaluatorKind {
        RuleBased,
        WeightingBased,
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Room {
        pub line: usize,
        pub number: i32,
        pub room_type: RoomType,
        pub area: f64,
        pub evaluator: Option<EvaluatorKind>,
        pub sensors: Vec<Sensor>,
    }

    impl Room {
        pub(super) fn parse(lines: &mut LineReader) -> FormatResult<Self> {
            let (line, text) = lines.next("a room")?;
            let fields = fields(line, text, &[4, 5])?;
            let number = parse(line, fields[0], "room number")?;
            let room_type: RoomType = fields[1].parse().map_err(rejected(line))?;
            let area = parse_finite(line, fields[2], "room area")?;
            let count: usize = parse(line, fields[3], "sensor count")?;
            let evaluator = match fields.get(4) {
                None => None,
                Some(&"RuleBased") => Some(EvaluatorKind::RuleBased),
                Some(&"WeightingBased") => Some(EvaluatorKind::WeightingBased),
                Some(other) => {
                    return Err(FileFormatError::at(
                        line,
                        format!("unknown hazard evaluator {:?}", other),
                    ))
                }
            };
            let weighted = evaluator == Some(EvaluatorKind::WeightingBased);
            let sensors = (0..count)
                .map(|_| Sensor::parse(lines, weighted))
                .collect::<FormatResult<Vec<_>>>()?;
            Ok(Room {
                line,
                number,
                room_type,
                area,
                evaluator,
                sensors,
            })
        }

        pub fn convert(self) -> FormatResult<super::Room> {
            let mut room = super::Room::new(
                self.number,
                self.room_type,
                Area::new::<square_meter>(self.area),
            );
            let mut weightings = Vec::with_capacity(self.sensors.len());
            for sensor in self.sensors {
                let line = sensor.line;
                let sensor_type = sensor.sensor_type;
                if let Some(weight) = sensor.weight {
                    weightings.push((sensor_type, weight));
                }
                room.add_sensor(sensor.convert()?).map_err(rejected(line))?;
            }
            let evaluator = match self.evaluator {
                None => return Ok(room),
                Some(EvaluatorKind::RuleBased) => HazardEvaluator::rule_based(
                    room.sensors().iter().map(|s| s.sensor_type()).collect(),
                ),
                Some(EvaluatorKind::WeightingBased) => {
                    HazardEvaluator::weighting_based(weightings).map_err(rejected(self.line))?
                }
            };
            room.set_hazard_evaluator(evaluator)
                .map_err(rejected(self.line))?;
            Ok(room)
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    pub struct Sensor {
        pub line: usize,
        pub sensor_type: SensorType,
        pub readings: Vec<i32>,
        /// Update frequency followed by the type specific values
        pub parameters: Vec<i32>,
        pub weight: Option<i32>,
    }

    impl Sensor {
        pub(super) fn parse(lines: &mut LineReader, weighted: bool) -> FormatResult<Self> {
            let (line, text) = lines.next("a sensor")?;
            let (body, weight) = match (text.split_once('@'), weighted) {
                (Some((body, weight)), true) => (body, Some(parse(line, weight, "weighting")?)),
                (None, false) => (text, None),
                (Some(_), false) => {
                    return Err(FileFormatError::at(
                        line,
                        "weighting given for a room without a weighting based evaluator",
                    ))
                }
                (None, true) => {
                    return Err(FileFormatError::at(line, "sensor weighting missing"))
                }
            };
            let sensor_type: SensorType = body
                .split(':')
                .next()
                .unwrap_or_default()
                .parse()
                .map_err(rejected(line))?;
            let expected = match sensor_type {
                SensorType::Temperature => 2,
                SensorType::Noise => 3,
                SensorType::Occupancy => 4,
                SensorType::CarbonDioxide => 5,
            };
            let fields = fields(line, body, &[expected])?;
            let readings = parse_list(line, fields[1], "sensor reading")?;
            let parameters = fields[2..]
                .iter()
                .map(|field| parse(line, field, "sensor parameter"))
                .collect::<FormatResult<Vec<i32>>>()?;
            Ok(Sensor {
                line,
                sensor_type,
                readings,
                parameters,
                weight,
            })
        }

        pub fn convert(self) -> FormatResult<crate::sensor::Sensor> {
            use crate::sensor::Sensor;

            let readings = self.readings;
            let sensor = match (self.sensor_type, self.parameters.as_slice()) {
                (SensorType::Temperature, []) => Sensor::temperature(readings),
                (SensorType::Noise, &[frequency]) => Sensor::noise(readings, frequency),
                (SensorType::Occupancy, &[frequency, capacity]) => {
                    Sensor::occupancy(readings, frequency, capacity)
                }
                (SensorType::CarbonDioxide, &[frequency, ideal_value, variation_limit]) => {
                    Sensor::carbon_dioxide(readings, frequency, ideal_value, variation_limit)
                }
                (sensor_type, parameters) => {
                    return Err(FileFormatError::at(
                        self.line,
                        format!(
                            "{} parameters for a {}",
                            parameters.len(),
                            sensor_type
                        ),
                    ))
                }
            };
            sensor.map_err(rejected(self.line))
        }
    }
}
