use std::collections::BTreeMap;
use std::fmt;

use crate::error::{invalid, Result};
use crate::sensor::{Sensor, SensorType};
use crate::tools::{mean, round_score, MAX_SCORE};

/// Strategy reducing the hazard levels of a room's sensors to a single score.
///
/// Evaluators do not own sensors; they refer to them by type, which is unique
/// within a room, and are evaluated against the room's sensor list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HazardEvaluator {
    RuleBased {
        sensors: Vec<SensorType>,
    },
    WeightingBased {
        weightings: BTreeMap<SensorType, u32>,
    },
}

impl HazardEvaluator {
    pub fn rule_based(sensors: Vec<SensorType>) -> Self {
        HazardEvaluator::RuleBased { sensors }
    }

    /// Every weighting must lie in 0..=100 and together they must sum to exactly 100.
    pub fn weighting_based<I>(weightings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (SensorType, i32)>,
    {
        let mut converted = BTreeMap::new();
        let mut sum = 0;
        for (sensor_type, weighting) in weightings {
            if !(0..=MAX_SCORE as i32).contains(&weighting) {
                return Err(invalid(format!(
                    "weighting {} for {} is outside 0..=100",
                    weighting, sensor_type
                )));
            }
            if converted.insert(sensor_type, weighting as u32).is_some() {
                return Err(invalid(format!("{} is weighted twice", sensor_type)));
            }
            sum += weighting;
        }
        if sum != MAX_SCORE as i32 {
            return Err(invalid(format!("weightings sum to {}, not 100", sum)));
        }
        Ok(HazardEvaluator::WeightingBased {
            weightings: converted,
        })
    }

    /// Name used in save files
    pub fn name(&self) -> &'static str {
        match self {
            HazardEvaluator::RuleBased { .. } => "RuleBased",
            HazardEvaluator::WeightingBased { .. } => "WeightingBased",
        }
    }

    /// Sensor types the evaluator reads from
    pub fn sensor_types(&self) -> Vec<SensorType> {
        match self {
            HazardEvaluator::RuleBased { sensors } => sensors.clone(),
            HazardEvaluator::WeightingBased { weightings } => weightings.keys().copied().collect(),
        }
    }

    pub fn weighting(&self, sensor_type: SensorType) -> Option<u32> {
        match self {
            HazardEvaluator::RuleBased { .. } => None,
            HazardEvaluator::WeightingBased { weightings } => weightings.get(&sensor_type).copied(),
        }
    }

    /// Evaluate against the sensors of the owning room.
    /// References to sensor types not present in `sensors` are ignored.
    pub fn evaluate(&self, sensors: &[Sensor]) -> u32 {
        let find = |sensor_type: &SensorType| sensors.iter().find(|s| s.sensor_type() == *sensor_type);
        match self {
            HazardEvaluator::RuleBased { sensors: types } => {
                let resolved: Vec<&Sensor> = types.iter().filter_map(find).collect();
                evaluate_rules(&resolved)
            }
            HazardEvaluator::WeightingBased { weightings } => {
                let total: f64 = weightings
                    .iter()
                    .filter_map(|(sensor_type, weighting)| {
                        find(sensor_type)
                            .map(|s| s.hazard_level() as f64 * (*weighting as f64 / 100.0))
                    })
                    .sum();
                round_score(total)
            }
        }
    }
}

/// Rule based evaluation:
/// any non-occupancy sensor at full hazard decides the result, otherwise the
/// non-occupancy average is scaled by the occupancy hazard (if present).
fn evaluate_rules(sensors: &[&Sensor]) -> u32 {
    match sensors {
        [] => 0,
        [single] => single.hazard_level(),
        _ => {
            let (occupancy, others): (Vec<&Sensor>, Vec<&Sensor>) = sensors
                .iter()
                .copied()
                .partition(|s| s.sensor_type() == SensorType::Occupancy);
            if others.iter().any(|s| s.hazard_level() == MAX_SCORE) {
                return MAX_SCORE;
            }
            let average = match mean(others.iter().map(|s| s.hazard_level())) {
                Some(average) => average,
                None => return 0,
            };
            let scaled = match occupancy.first() {
                Some(occupancy) => average * (occupancy.hazard_level() as f64 / 100.0),
                None => average,
            };
            round_score(scaled)
        }
    }
}

impl fmt::Display for HazardEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BmsError;
    use assert_matches::assert_matches;
    use test_case::test_case;

    fn temperature(reading: i32) -> Sensor {
        Sensor::temperature(vec![reading]).unwrap()
    }

    fn noise(reading: i32) -> Sensor {
        Sensor::noise(vec![reading], 1).unwrap()
    }

    fn carbon_dioxide(reading: i32) -> Sensor {
        Sensor::carbon_dioxide(vec![reading], 1, 700, 300).unwrap()
    }

    fn occupancy(reading: i32, capacity: i32) -> Sensor {
        Sensor::occupancy(vec![reading], 1, capacity).unwrap()
    }

    #[test]
    fn rule_based_no_sensors() {
        let evaluator = HazardEvaluator::rule_based(vec![]);
        assert_eq!(evaluator.evaluate(&[temperature(90)]), 0);
    }

    #[test]
    fn rule_based_single_sensor() {
        let sensors = [occupancy(8, 21)];
        let evaluator = HazardEvaluator::rule_based(vec![SensorType::Occupancy]);
        assert_eq!(evaluator.evaluate(&sensors), 38);
    }

    #[test]
    fn rule_based_full_hazard_wins() {
        let sensors = [carbon_dioxide(500), occupancy(0, 10), temperature(70)];
        let evaluator = HazardEvaluator::rule_based(vec![
            SensorType::CarbonDioxide,
            SensorType::Occupancy,
            SensorType::Temperature,
        ]);
        assert_eq!(evaluator.evaluate(&sensors), 100);
    }

    #[test]
    fn rule_based_average_scaled_by_occupancy() {
        // (0 + 25 + 50) / 3 = 25, occupancy at 50% -> 12.5
        let sensors = [carbon_dioxide(1500), noise(60), occupancy(5, 10), temperature(20)];
        let evaluator = HazardEvaluator::rule_based(SensorType::ALL.to_vec());
        assert_eq!(evaluator.evaluate(&sensors), 13);
    }

    #[test]
    fn rule_based_average_without_occupancy() {
        let sensors = [carbon_dioxide(2500), noise(60)];
        let evaluator = HazardEvaluator::rule_based(vec![SensorType::CarbonDioxide, SensorType::Noise]);
        assert_eq!(evaluator.evaluate(&sensors), 50);
    }

    #[test]
    fn weighting_based_sum() {
        let sensors = [carbon_dioxide(2500), noise(60), temperature(70)];
        let evaluator = HazardEvaluator::weighting_based([
            (SensorType::CarbonDioxide, 20),
            (SensorType::Noise, 50),
            (SensorType::Temperature, 30),
        ])
        .unwrap();
        // 50 * 0.2 + 50 * 0.5 + 100 * 0.3
        assert_eq!(evaluator.evaluate(&sensors), 65);
        assert_eq!(evaluator.weighting(SensorType::Noise), Some(50));
        assert_eq!(evaluator.weighting(SensorType::Occupancy), None);
    }

    #[test_case(&[50, 49]; "sum 99")]
    #[test_case(&[50, 51]; "sum 101")]
    #[test_case(&[-1, 101]; "negative weight")]
    #[test_case(&[101, -1]; "weight above 100")]
    #[test_case(&[]; "no weights")]
    fn weighting_based_rejects(weights: &[i32]) {
        let weightings = SensorType::ALL.into_iter().zip(weights.iter().copied());
        assert_matches!(
            HazardEvaluator::weighting_based(weightings),
            Err(BmsError::InvalidArgument(_))
        );
    }

    #[test]
    fn weighting_based_rejects_repeated_sensor() {
        assert_matches!(
            HazardEvaluator::weighting_based([(SensorType::Noise, 50), (SensorType::Noise, 50)]),
            Err(BmsError::InvalidArgument(_))
        );
    }

    #[test]
    fn names() {
        assert_eq!(HazardEvaluator::rule_based(vec![]).to_string(), "RuleBased");
        assert_eq!(
            HazardEvaluator::weighting_based([(SensorType::Noise, 100)])
                .unwrap()
                .to_string(),
            "WeightingBased"
        );
    }
}
