//! Loads planning instances from JSON.
//!
//! ```json
//! {
//!   "operations": [
//!     { "id": "OP1", "start": "2024-12-04 09:00", "end": "2024-12-04 10:00", "specialty": "Cardiología Pediátrica" }
//!   ],
//!   "rooms": ["Q1", "Q2"],
//!   "costs": { "Q1": { "OP1": 120.0 }, "Q2": { "OP1": 150.0 } },
//!   "average_costs": { "OP1": 135.0 }
//! }
//! ```
//!
//! `average_costs` is optional; when absent it is derived from `costs`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::costs::{AverageCosts, CostTable};
use crate::error::{PlanError, Result};
use crate::model::{Operation, Room};

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Deserialize)]
struct InstanceFile {
    operations: Vec<OperationRecord>,
    rooms: Vec<String>,
    #[serde(default)]
    costs: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    average_costs: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Deserialize)]
struct OperationRecord {
    id: String,
    start: String,
    end: String,
    specialty: String,
}

/// Operations in input order, rooms and their cost data.
#[derive(Debug, Clone, Default)]
pub struct Instance {
    pub operations: Vec<Operation>,
    pub rooms: Vec<Room>,
    pub costs: CostTable,
    pub average_costs: Option<AverageCosts>,
}

fn parse_timestamp(operation: &str, field: &str, value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            PlanError::malformed(
                format!("operation {}", operation),
                format!("unparsable {} timestamp '{}'", field, value),
            )
        })
}

impl Instance {
    /// Build an instance, rejecting malformed windows and duplicate ids.
    pub fn new(operations: Vec<Operation>, rooms: Vec<Room>, costs: CostTable) -> Result<Self> {
        let mut seen = HashSet::new();
        for operation in &operations {
            operation.validate()?;
            if !seen.insert(&operation.id) {
                return Err(PlanError::malformed(
                    format!("operation {}", operation.id),
                    "duplicate operation id",
                ));
            }
        }
        let mut seen = HashSet::new();
        for room in &rooms {
            if !seen.insert(&room.id) {
                return Err(PlanError::malformed(format!("room {}", room.id), "duplicate room id"));
            }
        }

        Ok(Self {
            operations,
            rooms,
            costs,
            average_costs: None,
        })
    }

    pub fn with_average_costs(mut self, averages: AverageCosts) -> Self {
        self.average_costs = Some(averages);
        self
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let file: InstanceFile = serde_json::from_str(source)
            .map_err(|e| PlanError::malformed("instance", e.to_string()))?;

        let mut operations = Vec::with_capacity(file.operations.len());
        for record in &file.operations {
            let start = parse_timestamp(&record.id, "start", &record.start)?;
            let end = parse_timestamp(&record.id, "end", &record.end)?;
            operations.push(Operation::new(
                record.id.as_str(),
                start,
                end,
                record.specialty.trim(),
            )?);
        }

        let rooms = file.rooms.iter().map(|id| Room::new(id.as_str())).collect();

        let mut costs = CostTable::new();
        for (room, row) in file.costs {
            for (operation, cost) in row {
                costs.insert(room.as_str().into(), operation.into(), cost)?;
            }
        }

        let mut instance = Self::new(operations, rooms, costs)?;
        if let Some(averages) = file.average_costs {
            let mut table = AverageCosts::new();
            for (operation, cost) in averages {
                table.insert(operation.into(), cost)?;
            }
            instance = instance.with_average_costs(table);
        }

        let unknown = instance.costs.unknown_entries(&instance.rooms, &instance.operations);
        if let Some((room, operation)) = unknown.first() {
            warn!(
                count = unknown.len(),
                %room,
                %operation,
                "ignoring cost entries for rooms or operations not in the instance"
            );
        }

        debug!(
            operations = instance.operations.len(),
            rooms = instance.rooms.len(),
            "loaded instance"
        );
        Ok(instance)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| PlanError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&source)
    }

    /// Keep only operations whose specialty is listed, preserving input order.
    pub fn restrict_to_specialties<S: AsRef<str>>(mut self, specialties: &[S]) -> Self {
        if specialties.is_empty() {
            return self;
        }
        self.operations
            .retain(|op| specialties.iter().any(|s| s.as_ref() == op.specialty));
        self
    }

    /// Distinct specialties with their operation counts
    pub fn specialties(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for op in &self.operations {
            *counts.entry(op.specialty.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Supplied average costs, or the per-room mean of the cost table.
    pub fn average_costs(&self) -> Result<AverageCosts> {
        match &self.average_costs {
            Some(averages) => Ok(averages.clone()),
            None => self.costs.averages(&self.rooms, &self.operations),
        }
    }
}
