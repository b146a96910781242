use std::collections::HashMap;

use crate::error::{PlanError, Result};
use crate::model::{Operation, OperationId, Room, RoomId};

/// Cost of hosting each operation in each room.
#[derive(Debug, Clone, Default)]
pub struct CostTable {
    entries: HashMap<RoomId, HashMap<OperationId, f64>>,
}

/// Room-independent cost per operation, used by the covering models.
#[derive(Debug, Clone, Default)]
pub struct AverageCosts {
    by_operation: HashMap<OperationId, f64>,
}

fn check_cost(entity: impl FnOnce() -> String, cost: f64) -> Result<()> {
    if !cost.is_finite() || cost < 0.0 {
        return Err(PlanError::malformed(
            entity(),
            format!("cost must be a non-negative number, got {}", cost),
        ));
    }
    Ok(())
}

impl CostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, room: RoomId, operation: OperationId, cost: f64) -> Result<()> {
        check_cost(|| format!("cost of operation {} in room {}", operation, room), cost)?;
        self.entries.entry(room).or_default().insert(operation, cost);
        Ok(())
    }

    pub fn get(&self, room: &RoomId, operation: &OperationId) -> Option<f64> {
        self.entries.get(room).and_then(|row| row.get(operation)).copied()
    }

    pub fn cost(&self, room: &RoomId, operation: &OperationId) -> Result<f64> {
        self.get(room, operation).ok_or_else(|| PlanError::MissingCost {
            room: room.to_string(),
            operation: operation.to_string(),
        })
    }

    /// Every (room, operation) pair without an entry, in input order
    pub fn missing(&self, rooms: &[Room], operations: &[Operation]) -> Vec<(RoomId, OperationId)> {
        let mut missing = Vec::new();
        for operation in operations {
            for room in rooms {
                if self.get(&room.id, &operation.id).is_none() {
                    missing.push((room.id.clone(), operation.id.clone()));
                }
            }
        }
        missing
    }

    /// Entries naming a room or operation outside the given lists, sorted
    pub fn unknown_entries(&self, rooms: &[Room], operations: &[Operation]) -> Vec<(RoomId, OperationId)> {
        let mut unknown: Vec<(RoomId, OperationId)> = self
            .entries
            .iter()
            .flat_map(|(room, row)| row.keys().map(move |operation| (room, operation)))
            .filter(|&(room, operation)| {
                !rooms.iter().any(|r| &r.id == room) || !operations.iter().any(|o| &o.id == operation)
            })
            .map(|(room, operation)| (room.clone(), operation.clone()))
            .collect();
        unknown.sort();
        unknown
    }

    /// Mean cost of each operation across all rooms.
    pub fn averages(&self, rooms: &[Room], operations: &[Operation]) -> Result<AverageCosts> {
        let mut averages = AverageCosts::default();
        for operation in operations {
            if rooms.is_empty() {
                return Err(PlanError::MissingAverageCost(operation.id.to_string()));
            }
            let total = rooms
                .iter()
                .map(|room| self.cost(&room.id, &operation.id))
                .sum::<Result<f64>>()?;
            averages
                .by_operation
                .insert(operation.id.clone(), total / rooms.len() as f64);
        }
        Ok(averages)
    }
}

impl AverageCosts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, operation: OperationId, cost: f64) -> Result<()> {
        check_cost(|| format!("average cost of operation {}", operation), cost)?;
        self.by_operation.insert(operation, cost);
        Ok(())
    }

    pub fn cost(&self, operation: &OperationId) -> Result<f64> {
        self.by_operation
            .get(operation)
            .copied()
            .ok_or_else(|| PlanError::MissingAverageCost(operation.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_operation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_operation.is_empty()
    }
}
