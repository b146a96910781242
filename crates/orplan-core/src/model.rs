//! Operations and rooms as loaded from the input.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};

/// Identifier of a scheduled operation. Ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub String);

/// Identifier of an operating room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl OperationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        OperationId(s.to_string())
    }
}

impl From<String> for OperationId {
    fn from(s: String) -> Self {
        OperationId(s)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        RoomId(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        RoomId(s)
    }
}

/// A scheduled surgical operation with a fixed time window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub id: OperationId,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub specialty: String,
}

impl Operation {
    pub fn new(
        id: impl Into<OperationId>,
        start: NaiveDateTime,
        end: NaiveDateTime,
        specialty: impl Into<String>,
    ) -> Result<Self> {
        let op = Self {
            id: id.into(),
            start,
            end,
            specialty: specialty.into(),
        };
        op.validate()?;
        Ok(op)
    }

    /// Rejects empty or inverted windows.
    pub fn validate(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(PlanError::malformed(
                format!("operation {}", self.id),
                format!("start {} is not before end {}", self.start, self.end),
            ));
        }
        Ok(())
    }

    /// Half-open overlap: an operation ending exactly when another starts
    /// does not conflict with it.
    pub fn overlaps(&self, other: &Operation) -> bool {
        (self.start <= other.start && other.start < self.end)
            || (other.start <= self.start && self.start < other.end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub id: RoomId,
}

impl Room {
    pub fn new(id: impl Into<RoomId>) -> Self {
        Self { id: id.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, op};

    #[test]
    fn test_rejects_inverted_window() {
        let err = Operation::new("A", at(10, 0), at(9, 0), "cardio").unwrap_err();
        assert!(matches!(err, PlanError::MalformedInput { .. }));

        let err = Operation::new("A", at(10, 0), at(10, 0), "cardio").unwrap_err();
        assert!(err.to_string().contains("operation A"));
    }

    #[test]
    fn test_half_open_overlap() {
        let a = op("A", (9, 0), (10, 0));
        let b = op("B", (9, 30), (10, 30));
        let c = op("C", (10, 0), (11, 0));
        let inner = op("D", (9, 15), (9, 45));

        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(b.overlaps(&c) && c.overlaps(&b));
        assert!(!a.overlaps(&c) && !c.overlaps(&a));
        assert!(a.overlaps(&inner) && inner.overlaps(&a));
        assert!(a.overlaps(&a));
    }
}
