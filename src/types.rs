use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Number of movements kept per vehicle; older ones are dropped first.
pub const MAX_MOVEMENT_HISTORY: usize = 10;

/// Coordinates are compared after truncation to this many decimal digits.
const PRECISION_SCALE: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Position { lat, lon }
    }

    /// Reads `{lat, lon}` out of raw JSON. Returns None unless both are
    /// numbers within range.
    pub fn from_value(value: &Value) -> Option<Position> {
        let position = Position {
            lat: value.get("lat")?.as_f64()?,
            lon: value.get("lon")?.as_f64()?,
        };
        if position.is_valid() {
            Some(position)
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        // NaN fails every comparison, so it is rejected here too.
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Truncates (toward zero, not rounding) both coordinates to 4 decimals.
    pub fn truncated(&self) -> Position {
        Position {
            lat: (self.lat * PRECISION_SCALE).trunc() / PRECISION_SCALE,
            lon: (self.lon * PRECISION_SCALE).trunc() / PRECISION_SCALE,
        }
    }
}

/// Timestamps are written as `2023-01-01T11:00:00.000Z`, always with
/// milliseconds, so saved files keep the same shape from run to run.
mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(time: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn serialize_option<S: Serializer>(
        time: &Option<DateTime<Utc>>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serialize(time, s),
            None => s.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub from: Position,
    pub to: Position,
    #[serde(serialize_with = "millis::serialize")]
    pub timestamp: DateTime<Utc>,
}

/// Tracked state for a single plate. Older snapshots lack the optional
/// fields; they load as absent or empty. Fields this type does not know
/// about are carried in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleState {
    pub position: Position,
    #[serde(serialize_with = "millis::serialize")]
    pub last_update: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_energy_level: Option<f64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "millis::serialize_option"
    )]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub movement_history: Vec<Movement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VehicleState {
    pub fn new(position: Position, energy_level: Option<f64>, now: DateTime<Utc>) -> Self {
        VehicleState {
            position,
            last_update: now,
            last_energy_level: energy_level,
            first_seen: Some(now),
            movement_history: vec![],
            extra: Map::new(),
        }
    }

    /// Appends a movement, evicting the oldest entries past the cap.
    pub fn record_movement(&mut self, movement: Movement) {
        self.movement_history.push(movement);
        if self.movement_history.len() > MAX_MOVEMENT_HISTORY {
            let excess = self.movement_history.len() - MAX_MOVEMENT_HISTORY;
            self.movement_history.drain(..excess);
        }
    }
}

/// Serializable result of one merge; also the persisted file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(serialize_with = "millis::serialize")]
    pub timestamp: DateTime<Utc>,
    /// Human readable local time, filled in by the caller before saving.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    pub total_vehicles: usize,
    pub vehicles: IndexMap<String, VehicleState>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub total_vehicles: usize,
    pub vehicles_with_movements: usize,
    pub total_movements: usize,
}
