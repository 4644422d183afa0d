use std::fmt;

use itertools::Itertools;
use log::debug;
use uom::si::area::square_meter;

use crate::error::{invalid, Result};
use crate::room::{Room, RoomType, MIN_AREA};

/// Base visit length for a room of minimal area, in minutes
const BASE_MINUTES: f64 = 5.0;
/// Extra minutes per square metre above the minimal area
const MINUTES_PER_SQUARE_METER: f64 = 0.2;

/// Cyclic maintenance visit order of a single floor.
///
/// The schedule refers to rooms by number and works on the owning floor's
/// room list, which is passed in whenever the room flags have to change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaintenanceSchedule {
    room_order: Vec<i32>,
    current_index: usize,
    time_elapsed: u32,
}

fn type_factor(room_type: RoomType) -> f64 {
    match room_type {
        RoomType::Study => 1.0,
        RoomType::Office => 1.5,
        RoomType::Laboratory => 2.0,
    }
}

/// Minutes one maintenance visit of the room takes
pub fn maintenance_time(room: &Room) -> u32 {
    let area = room.area().get::<square_meter>();
    let raw = (BASE_MINUTES + MINUTES_PER_SQUARE_METER * (area - MIN_AREA))
        * type_factor(room.room_type());
    raw.round().max(0.0) as u32
}

fn set_maintenance(rooms: &mut [Room], number: i32, maintenance: bool) {
    if let Some(room) = rooms.iter_mut().find(|r| r.number() == number) {
        room.set_maintenance(maintenance);
    }
}

impl MaintenanceSchedule {
    /// Validate the order against `rooms`.
    ///
    /// The order must be non-empty, must only name rooms in `rooms` and must not
    /// visit the same room twice in a row, counting the wrap from last to first.
    /// No flag is touched until [`MaintenanceSchedule::start`].
    pub fn new(room_order: Vec<i32>, rooms: &[Room]) -> Result<Self> {
        let first = *room_order
            .first()
            .ok_or_else(|| invalid("maintenance room order must not be empty"))?;
        if room_order.len() > 1
            && room_order
                .iter()
                .circular_tuple_windows()
                .any(|(a, b)| a == b)
        {
            return Err(invalid(format!(
                "maintenance order {} repeats a room consecutively",
                room_order.iter().join(",")
            )));
        }
        if let Some(missing) = room_order
            .iter()
            .find(|number| !rooms.iter().any(|r| r.number() == **number))
        {
            return Err(invalid(format!(
                "maintenance order refers to room {} which is not on the floor",
                missing
            )));
        }

        debug!(
            "Maintenance schedule starting at room {} created: {}",
            first,
            room_order.iter().join(",")
        );
        Ok(MaintenanceSchedule {
            room_order,
            current_index: 0,
            time_elapsed: 0,
        })
    }

    pub fn room_order(&self) -> &[i32] {
        &self.room_order
    }

    /// Number of the room currently under maintenance
    pub fn current_room(&self) -> i32 {
        self.room_order[self.current_index]
    }

    pub fn time_elapsed_current_room(&self) -> u32 {
        self.time_elapsed
    }

    pub fn elapse_one_minute(&mut self, rooms: &mut [Room]) {
        self.time_elapsed += 1;
        let current = self.current_room();
        // A room that vanished from the floor has nothing left to maintain
        let required = rooms
            .iter()
            .find(|r| r.number() == current)
            .map_or(0, maintenance_time);
        if self.time_elapsed >= required {
            self.advance(rooms);
        }
    }

    /// Move on to the next room right away, whatever the elapsed time.
    pub fn skip_current_maintenance(&mut self, rooms: &mut [Room]) {
        self.advance(rooms);
    }

    /// Put the current room under maintenance
    pub(crate) fn start(&self, rooms: &mut [Room]) {
        set_maintenance(rooms, self.current_room(), true);
    }

    /// Clear the flag of the room being maintained; used when the schedule is replaced.
    pub(crate) fn stop(&self, rooms: &mut [Room]) {
        set_maintenance(rooms, self.current_room(), false);
    }

    fn advance(&mut self, rooms: &mut [Room]) {
        set_maintenance(rooms, self.current_room(), false);
        self.current_index = (self.current_index + 1) % self.room_order.len();
        self.time_elapsed = 0;
        set_maintenance(rooms, self.current_room(), true);
    }
}

impl fmt::Display for MaintenanceSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MaintenanceSchedule: currentRoom=#{}, currentElapsed={}",
            self.current_room(),
            self.time_elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BmsError;
    use assert_matches::assert_matches;
    use test_case::test_case;
    use uom::si::f64::Area;

    fn room(number: i32, room_type: RoomType, area: f64) -> Room {
        Room::new(number, room_type, Area::new::<square_meter>(area))
    }

    fn two_rooms() -> Vec<Room> {
        vec![
            room(101, RoomType::Study, 20.0),
            room(102, RoomType::Office, 25.6),
        ]
    }

    fn started(order: Vec<i32>, rooms: &mut [Room]) -> MaintenanceSchedule {
        let schedule = MaintenanceSchedule::new(order, rooms).unwrap();
        schedule.start(rooms);
        schedule
    }

    fn flags(rooms: &[Room]) -> Vec<bool> {
        rooms.iter().map(|r| r.maintenance_ongoing()).collect()
    }

    #[test_case(RoomType::Study, 5.0, 5; "minimal study")]
    #[test_case(RoomType::Study, 20.0, 8; "study")]
    #[test_case(RoomType::Office, 25.6, 14; "office")]
    #[test_case(RoomType::Laboratory, 12.5, 13; "laboratory")]
    #[test_case(RoomType::Office, 5.0, 8; "rounds half up")]
    fn maintenance_times(room_type: RoomType, area: f64, expected: u32) {
        assert_eq!(maintenance_time(&room(1, room_type, area)), expected);
    }

    #[test]
    fn first_room_flagged_on_creation() {
        let mut rooms = two_rooms();
        let schedule = MaintenanceSchedule::new(vec![101, 102], &rooms).unwrap();
        assert_eq!(flags(&rooms), vec![false, false]);
        schedule.start(&mut rooms);
        assert_eq!(schedule.current_room(), 101);
        assert_eq!(flags(&rooms), vec![true, false]);
    }

    #[test]
    fn wraps_around() {
        let mut rooms = two_rooms();
        let mut schedule = started(vec![101, 102], &mut rooms);

        for _ in 0..8 {
            schedule.elapse_one_minute(&mut rooms);
        }
        assert_eq!(schedule.current_room(), 102);
        assert_eq!(schedule.time_elapsed_current_room(), 0);
        assert_eq!(flags(&rooms), vec![false, true]);

        for _ in 0..10 {
            schedule.elapse_one_minute(&mut rooms);
        }
        assert_eq!(schedule.current_room(), 102);
        assert_eq!(schedule.time_elapsed_current_room(), 10);

        for _ in 0..8 {
            schedule.elapse_one_minute(&mut rooms);
        }
        assert_eq!(schedule.current_room(), 101);
        assert_eq!(schedule.time_elapsed_current_room(), 4);
        assert_eq!(flags(&rooms), vec![true, false]);
    }

    #[test]
    fn skip_ignores_elapsed_time() {
        let mut rooms = two_rooms();
        let mut schedule = started(vec![101, 102], &mut rooms);
        schedule.elapse_one_minute(&mut rooms);
        schedule.elapse_one_minute(&mut rooms);
        schedule.skip_current_maintenance(&mut rooms);
        assert_eq!(schedule.current_room(), 102);
        assert_eq!(schedule.time_elapsed_current_room(), 0);
        assert_eq!(flags(&rooms), vec![false, true]);
    }

    #[test]
    fn single_room_order_keeps_flag() {
        let mut rooms = two_rooms();
        let mut schedule = started(vec![102], &mut rooms);
        schedule.skip_current_maintenance(&mut rooms);
        assert_eq!(schedule.current_room(), 102);
        assert_eq!(flags(&rooms), vec![false, true]);
    }

    #[test_case(vec![]; "empty")]
    #[test_case(vec![101, 101]; "consecutive repeat")]
    #[test_case(vec![101, 102, 101]; "repeat across the wrap")]
    #[test_case(vec![101, 103]; "unknown room")]
    fn rejects_order(order: Vec<i32>) {
        let rooms = two_rooms();
        assert_matches!(
            MaintenanceSchedule::new(order, &rooms),
            Err(BmsError::InvalidArgument(_))
        );
    }

    #[test]
    fn non_consecutive_repeat_allowed() {
        let mut rooms = two_rooms();
        rooms.push(room(103, RoomType::Laboratory, 10.0));
        let schedule = MaintenanceSchedule::new(vec![101, 102, 101, 103], &rooms).unwrap();
        assert_eq!(schedule.room_order(), &[101, 102, 101, 103]);
    }

    #[test]
    fn display() {
        let mut rooms = two_rooms();
        let mut schedule = started(vec![101, 102], &mut rooms);
        schedule.elapse_one_minute(&mut rooms);
        assert_eq!(
            schedule.to_string(),
            "MaintenanceSchedule: currentRoom=#101, currentElapsed=1"
        );
    }
}
