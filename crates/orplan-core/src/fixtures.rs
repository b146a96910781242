//! Shared builders for unit tests.

use chrono::{NaiveDate, NaiveDateTime};

use crate::costs::CostTable;
use crate::model::{Operation, Room};

pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 12, 4)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid test time")
}

pub fn op(id: &str, start: (u32, u32), end: (u32, u32)) -> Operation {
    Operation::new(id, at(start.0, start.1), at(end.0, end.1), "Cardiología Pediátrica")
        .expect("valid test operation")
}

/// A(09:00-10:00), B(09:30-10:30), C(10:00-11:00): A-B and B-C conflict, A-C do not.
pub fn path_of_three() -> Vec<Operation> {
    vec![
        op("A", (9, 0), (10, 0)),
        op("B", (9, 30), (10, 30)),
        op("C", (10, 0), (11, 0)),
    ]
}

pub fn rooms(ids: &[&str]) -> Vec<Room> {
    ids.iter().map(|id| Room::new(*id)).collect()
}

/// Every room costs `base + index of room` for every operation.
pub fn flat_costs(operations: &[Operation], rooms: &[Room], base: f64) -> CostTable {
    let mut table = CostTable::new();
    for (r, room) in rooms.iter().enumerate() {
        for operation in operations {
            table
                .insert(room.id.clone(), operation.id.clone(), base + r as f64)
                .expect("valid test cost");
        }
    }
    table
}
