use std::fmt;

use thiserror::Error;

use crate::sensor::SensorType;

pub type Result<T> = std::result::Result<T, BmsError>;

/// Failures reported by the live mutation API.
/// Every operation returning one of these has left the model untouched.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BmsError {
    #[error("floor {0} already exists in the building")]
    DuplicateFloor(i32),
    #[error("room number {0} is already taken on this floor")]
    DuplicateRoom(i32),
    #[error("room already has a sensor of type {0}")]
    DuplicateSensor(SensorType),
    #[error("there is no floor below floor {0} to support it")]
    NoFloorBelow(i32),
    #[error("floor {floor} cannot be supported: {reason}")]
    FloorTooSmall { floor: i32, reason: String },
    #[error("insufficient space: floor area {floor_area} m^2, occupied {occupied} m^2, requested {requested} m^2")]
    InsufficientSpace {
        floor_area: f64,
        occupied: f64,
        requested: f64,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cannot conduct fire drill: {0}")]
    FireDrill(String),
    #[error("no building with index {0}")]
    BuildingNotFound(usize),
    #[error("no floor with number {0}")]
    FloorNotFound(i32),
    #[error("no room with number {0}")]
    RoomNotFound(i32),
}

/// Coarse classification of [`BmsError`], so callers can react per category
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StructuralConflict,
    MissingSupport,
    UndersizedSupport,
    InsufficientSpace,
    InvalidArgument,
    OperationPrecondition,
    NotFound,
}

impl BmsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BmsError::DuplicateFloor(_)
            | BmsError::DuplicateRoom(_)
            | BmsError::DuplicateSensor(_) => ErrorKind::StructuralConflict,
            BmsError::NoFloorBelow(_) => ErrorKind::MissingSupport,
            BmsError::FloorTooSmall { .. } => ErrorKind::UndersizedSupport,
            BmsError::InsufficientSpace { .. } => ErrorKind::InsufficientSpace,
            BmsError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            BmsError::FireDrill(_) => ErrorKind::OperationPrecondition,
            BmsError::BuildingNotFound(_)
            | BmsError::FloorNotFound(_)
            | BmsError::RoomNotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Shorthand for building an [`BmsError::InvalidArgument`]
pub(crate) fn invalid(message: impl Into<String>) -> BmsError {
    BmsError::InvalidArgument(message.into())
}

/// A save file was rejected.
///
/// Decoding never returns a partial result, and the reason text is only a
/// diagnostic aid; it is not part of the contract.
#[derive(Clone, Debug, PartialEq)]
pub struct FileFormatError {
    pub line: Option<usize>,
    pub reason: String,
}

impl FileFormatError {
    pub fn at(line: usize, reason: impl Into<String>) -> Self {
        FileFormatError {
            line: Some(line),
            reason: reason.into(),
        }
    }

    pub fn eof(reason: impl Into<String>) -> Self {
        FileFormatError {
            line: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FileFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "invalid save file format (line {}): {}", line, self.reason),
            None => write!(f, "invalid save file format: {}", self.reason),
        }
    }
}

impl std::error::Error for FileFormatError {}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Format(#[from] FileFormatError),
}
