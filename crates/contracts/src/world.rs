//! Spatial, perceptual, and identity contracts.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::Payload;

/// Integer grid coordinate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub x: i64,
    pub y: i64,
}

impl GridPos {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// `None` when either coordinate would overflow.
    pub fn checked_offset(self, dx: i64, dy: i64) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }

    /// Reads a position encoded either as `[x, y]` or `{"x": .., "y": ..}`.
    /// Fractional coordinates are truncated.
    pub fn from_value(value: &Value) -> Option<Self> {
        fn coord(value: &Value) -> Option<i64> {
            value
                .as_i64()
                .or_else(|| value.as_f64().map(|raw| raw as i64))
        }

        match value {
            Value::Array(items) if items.len() >= 2 => {
                Some(Self::new(coord(&items[0])?, coord(&items[1])?))
            }
            Value::Object(map) => Some(Self::new(coord(map.get("x")?)?, coord(map.get("y")?)?)),
            _ => None,
        }
    }

    /// Array form, as the world writes positions into outcome payloads.
    pub fn to_pair(self) -> Value {
        json!([self.x, self.y])
    }

    pub fn to_object(self) -> Value {
        json!({ "x": self.x, "y": self.y })
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldObjectRef {
    pub object_id: String,
    pub at: GridPos,
    pub solid: bool,
}

/// Debug-only view of the grid world.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorldSnapshot {
    pub agent: Option<GridPos>,
    pub objects: Vec<WorldObjectRef>,
    pub size: (i64, i64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PerceptKind {
    Position,
    Contact,
    Boundary,
    ActionResult,
    Unknown,
}

/// Structural, non-semantic reinterpretation of a raw event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Percept {
    pub kind: PerceptKind,
    pub source_event_id: String,
    pub payload: Payload,
}

/// Persistent continuity anchor across restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityRecord {
    pub identity_id: String,
    pub genesis_id: String,
    pub creation_tag: String,
    /// Increments on controlled rebuild.
    pub incarnation: u32,
    pub continuity_version: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_reads_pair_and_object_forms() {
        assert_eq!(GridPos::from_value(&json!([3, 4])), Some(GridPos::new(3, 4)));
        assert_eq!(
            GridPos::from_value(&json!({ "x": 3, "y": 4 })),
            Some(GridPos::new(3, 4))
        );
        assert_eq!(GridPos::from_value(&json!([2.9, -1])), Some(GridPos::new(2, -1)));
        assert_eq!(GridPos::from_value(&json!([1])), None);
        assert_eq!(GridPos::from_value(&json!("3,4")), None);
    }

    #[test]
    fn identity_notes_default_to_none() {
        let raw = r#"{"identity_id":"a","genesis_id":"b","creation_tag":"c","incarnation":2,"continuity_version":1}"#;
        let record: IdentityRecord = serde_json::from_str(raw).expect("decode");
        assert_eq!(record.notes, None);
        assert_eq!(record.incarnation, 2);
    }
}
