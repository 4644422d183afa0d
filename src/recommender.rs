use itertools::Itertools;

use crate::building::Building;
use crate::room::{Room, RoomState, RoomType};

/// Pick the most comfortable open study room, preferring lower floors.
///
/// Floors are visited bottom up. Among the open study rooms of a floor the one
/// with the highest average sensor comfort wins (first in insertion order on a
/// tie). Climbing continues only while each floor beats the best room found so
/// far; a floor without open study rooms ends the search.
pub fn recommend_study_room(building: &Building) -> Option<&Room> {
    let mut best: Option<(&Room, f64)> = None;
    for floor in building.floors().iter().sorted_by_key(|f| f.number()) {
        let floor_best = floor
            .rooms()
            .iter()
            .filter(|r| r.room_type() == RoomType::Study && r.state() == RoomState::Open)
            .map(|r| (r, r.comfort_level()))
            .fold(None, |acc: Option<(&Room, f64)>, (room, comfort)| match acc {
                Some((_, top)) if top >= comfort => acc,
                _ => Some((room, comfort)),
            });
        match (floor_best, best) {
            (None, _) => break,
            (Some(candidate), None) => best = Some(candidate),
            (Some((_, comfort)), Some((_, top))) if comfort <= top => break,
            (Some(candidate), Some(_)) => best = Some(candidate),
        }
    }
    best.map(|(room, _)| room)
}
