use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::error::{invalid, BmsError, Result};
use crate::tools::{round_score, MAX_SCORE};

#[cfg(test)]
use proptest::{
    arbitrary::Arbitrary,
    prelude::prop,
    strategy::{BoxedStrategy, Strategy},
};

pub const MIN_UPDATE_FREQUENCY: i32 = 1;
pub const MAX_UPDATE_FREQUENCY: i32 = 5;

/// Temperature (°C) at or above which a room has to be evacuated
pub const FIRE_TEMPERATURE: i32 = 68;

/// Noise level (dB) that counts as "as loud as acceptable"
const REFERENCE_LOUDNESS: f64 = 70.0;

/// Concrete sensor types.
///
/// Variants are declared in type-name order, so the derived `Ord` is the
/// canonical order sensors are kept in within a room (and written to a save file).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorType {
    CarbonDioxide,
    Noise,
    Occupancy,
    Temperature,
}

impl SensorType {
    pub const ALL: [SensorType; 4] = [
        SensorType::CarbonDioxide,
        SensorType::Noise,
        SensorType::Occupancy,
        SensorType::Temperature,
    ];

    /// Name used in save files
    pub fn name(self) -> &'static str {
        match self {
            SensorType::CarbonDioxide => "CarbonDioxideSensor",
            SensorType::Noise => "NoiseSensor",
            SensorType::Occupancy => "OccupancySensor",
            SensorType::Temperature => "TemperatureSensor",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorType {
    type Err = BmsError;

    fn from_str(s: &str) -> Result<Self> {
        SensorType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| invalid(format!("unknown sensor type {:?}", s)))
    }
}

/// Type specific parameters of a sensor
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SensorKind {
    Temperature,
    Noise,
    Occupancy {
        capacity: i32,
    },
    CarbonDioxide {
        ideal_value: i32,
        variation_limit: i32,
    },
}

impl SensorKind {
    pub fn sensor_type(&self) -> SensorType {
        match self {
            SensorKind::Temperature => SensorType::Temperature,
            SensorKind::Noise => SensorType::Noise,
            SensorKind::Occupancy { .. } => SensorType::Occupancy,
            SensorKind::CarbonDioxide { .. } => SensorType::CarbonDioxide,
        }
    }
}

/// A timed sensor replaying a fixed array of readings.
///
/// Every `update_frequency` minutes the current reading moves on to the next
/// entry of the array, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct Sensor {
    kind: SensorKind,
    readings: Vec<i32>,
    update_frequency: i32,
    time_elapsed: u64,
    current_reading: i32,
}

impl Sensor {
    /// Temperature sensors always update every minute
    pub fn temperature(readings: Vec<i32>) -> Result<Self> {
        Self::timed(SensorKind::Temperature, readings, MIN_UPDATE_FREQUENCY)
    }

    pub fn noise(readings: Vec<i32>, update_frequency: i32) -> Result<Self> {
        Self::timed(SensorKind::Noise, readings, update_frequency)
    }

    pub fn occupancy(readings: Vec<i32>, update_frequency: i32, capacity: i32) -> Result<Self> {
        let sensor = Self::timed(SensorKind::Occupancy { capacity }, readings, update_frequency)?;
        if capacity < 0 {
            return Err(invalid("capacity must be >= 0"));
        }
        Ok(sensor)
    }

    pub fn carbon_dioxide(
        readings: Vec<i32>,
        update_frequency: i32,
        ideal_value: i32,
        variation_limit: i32,
    ) -> Result<Self> {
        let sensor = Self::timed(
            SensorKind::CarbonDioxide {
                ideal_value,
                variation_limit,
            },
            readings,
            update_frequency,
        )?;
        if ideal_value <= 0 {
            return Err(invalid("ideal CO2 value must be > 0"));
        }
        if variation_limit <= 0 {
            return Err(invalid("CO2 variation limit must be > 0"));
        }
        if ideal_value - variation_limit < 0 {
            return Err(invalid("ideal CO2 value - variation limit must be >= 0"));
        }
        Ok(sensor)
    }

    fn timed(kind: SensorKind, readings: Vec<i32>, update_frequency: i32) -> Result<Self> {
        if !(MIN_UPDATE_FREQUENCY..=MAX_UPDATE_FREQUENCY).contains(&update_frequency) {
            return Err(invalid(format!(
                "update frequency must be between {} and {} minutes (inclusive), got {}",
                MIN_UPDATE_FREQUENCY, MAX_UPDATE_FREQUENCY, update_frequency
            )));
        }
        let current_reading = *readings
            .first()
            .ok_or_else(|| invalid("sensor readings must have at least one element"))?;
        if readings.iter().any(|reading| *reading < 0) {
            return Err(invalid("all sensor readings must be non-negative"));
        }
        Ok(Sensor {
            kind,
            readings,
            update_frequency,
            time_elapsed: 0,
            current_reading,
        })
    }

    pub fn kind(&self) -> &SensorKind {
        &self.kind
    }

    pub fn sensor_type(&self) -> SensorType {
        self.kind.sensor_type()
    }

    pub fn readings(&self) -> &[i32] {
        &self.readings
    }

    pub fn update_frequency(&self) -> i32 {
        self.update_frequency
    }

    pub fn time_elapsed(&self) -> u64 {
        self.time_elapsed
    }

    pub fn current_reading(&self) -> i32 {
        self.current_reading
    }

    pub fn elapse_one_minute(&mut self) {
        self.time_elapsed += 1;

        let frequency = self.update_frequency as u64;
        let rotation = self.readings.len() as u64 * frequency;
        let index = (self.time_elapsed % rotation) / frequency;
        self.current_reading = self.readings[index as usize];
    }

    /// Hazard level of the current reading, 0..=100
    pub fn hazard_level(&self) -> u32 {
        let reading = self.current_reading;
        match self.kind {
            SensorKind::Temperature => {
                if reading >= FIRE_TEMPERATURE {
                    MAX_SCORE
                } else {
                    0
                }
            }
            SensorKind::Noise => round_score(100.0 * self.relative_loudness()),
            SensorKind::Occupancy { capacity } => {
                if reading >= capacity {
                    MAX_SCORE
                } else {
                    round_score(100.0 * reading as f64 / capacity as f64)
                }
            }
            SensorKind::CarbonDioxide { .. } => match reading {
                r if r < 1000 => 0,
                r if r < 2000 => 25,
                r if r < 5000 => 50,
                _ => MAX_SCORE,
            },
        }
    }

    /// Comfort level of the current reading, 0..=100
    pub fn comfort_level(&self) -> u32 {
        let reading = self.current_reading;
        match self.kind {
            SensorKind::Temperature => match reading {
                20..=26 => MAX_SCORE,
                r if r <= 15 || r >= 31 => 0,
                r if r < 20 => (100 - 20 * (20 - r)) as u32,
                r => (100 - 20 * (r - 26)) as u32,
            },
            SensorKind::Noise => {
                let loudness = self.relative_loudness();
                if loudness >= 1.0 {
                    0
                } else {
                    round_score(100.0 * (1.0 - loudness))
                }
            }
            SensorKind::Occupancy { capacity } => {
                if reading >= capacity {
                    0
                } else {
                    round_score(100.0 * (capacity - reading) as f64 / capacity as f64)
                }
            }
            SensorKind::CarbonDioxide {
                ideal_value,
                variation_limit,
            } => {
                let difference = (reading - ideal_value).abs();
                if difference >= variation_limit {
                    0
                } else {
                    round_score(100.0 * (1.0 - difference as f64 / variation_limit as f64))
                }
            }
        }
    }

    /// Loudness relative to the reference level; doubles every 10 dB.
    /// Only meaningful for noise sensors.
    pub fn relative_loudness(&self) -> f64 {
        2f64.powf((self.current_reading as f64 - REFERENCE_LOUDNESS) / 10.0)
    }
}

/// Sensors compare by configuration only; elapsed time and the current reading are runtime state.
impl PartialEq for Sensor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.update_frequency == other.update_frequency
            && self.readings == other.readings
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimedSensor: freq={}, readings={}, type={}",
            self.update_frequency,
            self.readings.iter().join(","),
            self.sensor_type()
        )?;
        match self.kind {
            SensorKind::Occupancy { capacity } => write!(f, ", capacity={}", capacity),
            SensorKind::CarbonDioxide {
                ideal_value,
                variation_limit,
            } => write!(f, ", idealPPM={}, varLimit={}", ideal_value, variation_limit),
            SensorKind::Temperature | SensorKind::Noise => Ok(()),
        }
    }
}

#[cfg(test)]
impl Arbitrary for Sensor {
    type Parameters = ();
    type Strategy = BoxedStrategy<Sensor>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        let readings = || prop::collection::vec(0i32..6000, 1..8);
        let frequency = || MIN_UPDATE_FREQUENCY..=MAX_UPDATE_FREQUENCY;
        prop::strategy::Union::new(vec![
            readings()
                .prop_map(|r| Sensor::temperature(r).unwrap())
                .boxed(),
            (readings(), frequency())
                .prop_map(|(r, f)| Sensor::noise(r, f).unwrap())
                .boxed(),
            (readings(), frequency(), 0i32..200)
                .prop_map(|(r, f, c)| Sensor::occupancy(r, f, c).unwrap())
                .boxed(),
            (readings(), frequency(), 1i32..500, 1i32..1500)
                .prop_map(|(r, f, limit, extra)| {
                    Sensor::carbon_dioxide(r, f, limit + extra, limit).unwrap()
                })
                .boxed(),
        ])
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;
    use test_strategy::proptest;

    /// Sensor of the given kind sitting on a single reading
    fn fixed(kind: SensorKind, reading: i32) -> Sensor {
        let readings = vec![reading];
        match kind {
            SensorKind::Temperature => Sensor::temperature(readings),
            SensorKind::Noise => Sensor::noise(readings, 1),
            SensorKind::Occupancy { capacity } => Sensor::occupancy(readings, 1, capacity),
            SensorKind::CarbonDioxide {
                ideal_value,
                variation_limit,
            } => Sensor::carbon_dioxide(readings, 1, ideal_value, variation_limit),
        }
        .unwrap()
    }

    #[test]
    fn initial_reading_is_first() {
        let sensor = Sensor::noise(vec![55, 62, 69], 3).unwrap();
        assert_eq!(sensor.current_reading(), 55);
        assert_eq!(sensor.time_elapsed(), 0);
    }

    #[test]
    fn readings_replay_cyclically() {
        let mut sensor = Sensor::noise(vec![1, 2, 3], 2).unwrap();
        let mut seen = Vec::new();
        for _ in 0..8 {
            sensor.elapse_one_minute();
            seen.push(sensor.current_reading());
        }
        assert_eq!(seen, vec![1, 2, 2, 3, 3, 1, 1, 2]);
        assert_eq!(sensor.time_elapsed(), 8);
    }

    #[proptest]
    fn reading_period(
        #[strategy(prop::collection::vec(0i32..100, 1..10))] readings: Vec<i32>,
        #[strategy(MIN_UPDATE_FREQUENCY..=MAX_UPDATE_FREQUENCY)] frequency: i32,
    ) {
        let mut sensor = Sensor::noise(readings.clone(), frequency).unwrap();
        let period = readings.len() * frequency as usize;
        for _ in 0..period {
            sensor.elapse_one_minute();
        }
        assert_eq!(sensor.current_reading(), readings[0]);
    }

    #[test_case(vec![], 1; "no readings")]
    #[test_case(vec![3, -1], 1; "negative reading")]
    #[test_case(vec![3], 0; "frequency too low")]
    #[test_case(vec![3], 6; "frequency too high")]
    fn timed_sensor_rejects(readings: Vec<i32>, frequency: i32) {
        assert_matches!(
            Sensor::noise(readings, frequency),
            Err(BmsError::InvalidArgument(_))
        );
    }

    #[test_case(600, 0; "ideal must be positive")]
    #[test_case(600, -5; "limit must be positive")]
    #[test_case(100, 200; "limit above ideal")]
    fn carbon_dioxide_rejects(ideal_value: i32, variation_limit: i32) {
        assert_matches!(
            Sensor::carbon_dioxide(vec![600], 2, ideal_value, variation_limit),
            Err(BmsError::InvalidArgument(_))
        );
    }

    #[test]
    fn occupancy_rejects_negative_capacity() {
        assert_matches!(
            Sensor::occupancy(vec![1], 2, -1),
            Err(BmsError::InvalidArgument(_))
        );
    }

    #[test_case(21, 8, 38; "partially full")]
    #[test_case(30, 34, 100; "over capacity")]
    #[test_case(0, 0, 100; "zero capacity")]
    fn occupancy_hazard(capacity: i32, reading: i32, expected: u32) {
        let sensor = fixed(SensorKind::Occupancy { capacity }, reading);
        assert_eq!(sensor.hazard_level(), expected);
    }

    #[test_case(21, 8, 62; "partially full")]
    #[test_case(30, 34, 0; "over capacity")]
    fn occupancy_comfort(capacity: i32, reading: i32, expected: u32) {
        let sensor = fixed(SensorKind::Occupancy { capacity }, reading);
        assert_eq!(sensor.comfort_level(), expected);
    }

    #[test_case(600, 200, 640, 80; "inside limit")]
    #[test_case(800, 100, 1000, 0; "outside limit")]
    #[test_case(800, 100, 700, 0; "exactly at limit")]
    fn carbon_dioxide_comfort(ideal_value: i32, variation_limit: i32, reading: i32, expected: u32) {
        let sensor = fixed(
            SensorKind::CarbonDioxide {
                ideal_value,
                variation_limit,
            },
            reading,
        );
        assert_eq!(sensor.comfort_level(), expected);
    }

    #[test_case(999, 0)]
    #[test_case(1000, 25)]
    #[test_case(1999, 25)]
    #[test_case(2000, 50)]
    #[test_case(4999, 50)]
    #[test_case(5000, 100)]
    fn carbon_dioxide_hazard(reading: i32, expected: u32) {
        let sensor = fixed(
            SensorKind::CarbonDioxide {
                ideal_value: 700,
                variation_limit: 300,
            },
            reading,
        );
        assert_eq!(sensor.hazard_level(), expected);
    }

    #[test_case(67, 0)]
    #[test_case(68, 100)]
    #[test_case(90, 100)]
    fn temperature_hazard(reading: i32, expected: u32) {
        assert_eq!(fixed(SensorKind::Temperature, reading).hazard_level(), expected);
    }

    #[test_case(15, 0)]
    #[test_case(17, 40)]
    #[test_case(19, 80)]
    #[test_case(20, 100)]
    #[test_case(26, 100)]
    #[test_case(28, 60)]
    #[test_case(30, 20)]
    #[test_case(31, 0)]
    fn temperature_comfort(reading: i32, expected: u32) {
        assert_eq!(fixed(SensorKind::Temperature, reading).comfort_level(), expected);
    }

    #[test_case(70, 100, 0; "reference level")]
    #[test_case(60, 50, 50; "half as loud")]
    #[test_case(50, 25, 75; "quarter as loud")]
    #[test_case(85, 100, 0; "very loud")]
    fn noise_levels(reading: i32, hazard: u32, comfort: u32) {
        let sensor = fixed(SensorKind::Noise, reading);
        assert_eq!(sensor.hazard_level(), hazard);
        assert_eq!(sensor.comfort_level(), comfort);
    }

    #[proptest]
    fn scores_in_range(sensor: Sensor) {
        assert!(sensor.hazard_level() <= MAX_SCORE);
        assert!(sensor.comfort_level() <= MAX_SCORE);
    }

    #[test]
    fn equality_ignores_runtime_state() {
        let a = Sensor::occupancy(vec![1, 2], 2, 10).unwrap();
        let mut b = a.clone();
        b.elapse_one_minute();
        b.elapse_one_minute();
        assert_eq!(a, b);
        assert_ne!(a, Sensor::occupancy(vec![1, 2], 2, 11).unwrap());
        assert_ne!(a, Sensor::noise(vec![1, 2], 2).unwrap());
    }

    #[test]
    fn display() {
        assert_eq!(
            Sensor::noise(vec![55, 62, 69, 63], 3).unwrap().to_string(),
            "TimedSensor: freq=3, readings=55,62,69,63, type=NoiseSensor"
        );
        assert_eq!(
            Sensor::carbon_dioxide(vec![745, 1320], 3, 700, 300)
                .unwrap()
                .to_string(),
            "TimedSensor: freq=3, readings=745,1320, type=CarbonDioxideSensor, idealPPM=700, varLimit=300"
        );
    }

    #[test]
    fn type_names_round_trip() {
        for sensor_type in SensorType::ALL {
            assert_eq!(sensor_type.name().parse::<SensorType>().unwrap(), sensor_type);
        }
        assert_matches!("noisesensor".parse::<SensorType>(), Err(BmsError::InvalidArgument(_)));
    }

    #[test]
    fn canonical_order_matches_names() {
        let names: Vec<_> = SensorType::ALL.iter().map(|t| t.name()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
