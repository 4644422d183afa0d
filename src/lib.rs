//! Building management simulation: buildings made of floors, rooms and
//! sensors, hazard evaluation, maintenance schedules and a text save format.

pub mod building;
pub mod config;
pub mod error;
pub mod floor;
pub mod hazard;
pub mod maintenance;
pub mod persistence;
pub mod recommender;
pub mod registry;
pub mod room;
pub mod sensor;
pub mod simulation;
pub mod tools;

pub use building::Building;
pub use error::{BmsError, ErrorKind, FileFormatError, LoadError, Result};
pub use floor::Floor;
pub use hazard::HazardEvaluator;
pub use maintenance::MaintenanceSchedule;
pub use room::{Room, RoomState, RoomType};
pub use sensor::{Sensor, SensorKind, SensorType};
pub use simulation::Simulation;
