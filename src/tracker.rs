use crate::geo::{self, ComparisonInputs, Observation};
use crate::types::{Movement, Position, Snapshot, Statistics, VehicleState};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde_json::Value;

pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

#[derive(Debug, Fail, PartialEq)]
pub enum TrackerError {
    #[fail(display = "Vehicle data must be an array, got {}", _0)]
    InvalidInput(&'static str),
}

/// A single record of the available-vehicles list, once its plate and
/// position have been checked.
struct Sighting {
    plate: String,
    position: Position,
    energy_level: Option<f64>,
}

impl Sighting {
    fn from_record(record: &Value) -> Option<Sighting> {
        let description = &record["description"];
        // Some fleets report numeric plates; they are keyed by their text.
        let plate = match &description["plate"] {
            Value::String(plate) if !plate.is_empty() => plate.clone(),
            Value::Number(plate) => plate.to_string(),
            _ => {
                warn!(
                    "Vehicle without plate found, skipping: {}",
                    description["id"]
                );
                return None;
            }
        };
        let raw_position = &record["location"]["position"];
        let position = match Position::from_value(raw_position) {
            Some(position) => position,
            None => {
                warn!("Invalid position for vehicle {}: {}", plate, raw_position);
                return None;
            }
        };
        Some(Sighting {
            plate,
            position,
            energy_level: description["energyLevel"].as_f64(),
        })
    }

    fn observation(&self) -> Observation {
        Observation::new(self.position, self.energy_level)
    }
}

/// Per-plate state of every vehicle seen so far, in first-seen order.
#[derive(Debug, Default)]
pub struct VehicleTracker {
    vehicles: IndexMap<String, VehicleState>,
}

impl VehicleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vehicles(&self) -> &IndexMap<String, VehicleState> {
        &self.vehicles
    }

    /// Replaces the table with the `vehicles` of a previously saved
    /// snapshot, in stored order. Absent input leaves the table as it was;
    /// entries that cannot be read are skipped one by one.
    pub fn load_existing_data(&mut self, persisted: &Value) {
        let stored = match persisted.get("vehicles") {
            Some(Value::Object(stored)) => stored,
            Some(Value::Null) | None => {
                debug!("No previous vehicle data to load");
                return;
            }
            Some(other) => {
                warn!("Ignoring previous vehicle data that is not a map: {}", other);
                return;
            }
        };

        let mut vehicles = IndexMap::with_capacity(stored.len());
        for (plate, entry) in stored {
            match serde_json::from_value::<VehicleState>(entry.clone()) {
                Ok(state) => {
                    vehicles.insert(plate.clone(), state);
                }
                Err(e) => warn!("Skipping unreadable stored vehicle {}: {}", plate, e),
            }
        }
        info!(
            "Loaded {} of {} previously tracked vehicles",
            vehicles.len(),
            stored.len()
        );
        self.vehicles = vehicles;
    }

    /// Merges one poll of the available-vehicles list into the table.
    pub fn process_vehicle_data(&mut self, raw: &Value) -> Result<Snapshot, TrackerError> {
        let records = raw
            .as_array()
            .ok_or_else(|| TrackerError::InvalidInput(json_type(raw)))?;
        let now = Utc::now().trunc_subsecs(3);

        let (mut created, mut moved, mut skipped) = (0, 0, 0);
        for record in records {
            let sighting = match Sighting::from_record(record) {
                Some(sighting) => sighting,
                None => {
                    skipped += 1;
                    continue;
                }
            };
            match self.vehicles.get_mut(&sighting.plate) {
                Some(state) => {
                    if merge_sighting(state, &sighting, now) {
                        moved += 1;
                    }
                }
                None => {
                    let state = VehicleState::new(sighting.position, sighting.energy_level, now);
                    self.vehicles.insert(sighting.plate, state);
                    created += 1;
                }
            }
        }
        info!(
            "Processed {} records: {} new, {} moved, {} skipped, {} tracked",
            records.len(),
            created,
            moved,
            skipped,
            self.vehicles.len()
        );

        Ok(self.snapshot(now))
    }

    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> Snapshot {
        Snapshot {
            timestamp,
            last_update: None,
            total_vehicles: self.vehicles.len(),
            vehicles: self.vehicles.clone(),
        }
    }

    /// Drops every vehicle not updated within `max_age_hours`. Returns the
    /// number removed. An age reaching past the earliest representable time
    /// makes nothing stale.
    pub fn cleanup_old_vehicles(&mut self, max_age_hours: i64) -> usize {
        let cutoff = match Duration::try_hours(max_age_hours)
            .and_then(|age| Utc::now().checked_sub_signed(age))
        {
            Some(cutoff) => cutoff,
            None => {
                debug!(
                    "Max age of {}h is out of range, nothing to remove",
                    max_age_hours
                );
                return 0;
            }
        };
        let before = self.vehicles.len();
        self.vehicles.retain(|plate, state| {
            let keep = state.last_update >= cutoff;
            if !keep {
                debug!("Removing {}, last updated {}", plate, state.last_update);
            }
            keep
        });
        before - self.vehicles.len()
    }

    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics {
            total_vehicles: self.vehicles.len(),
            ..Statistics::default()
        };
        for state in self.vehicles.values() {
            if !state.movement_history.is_empty() {
                stats.vehicles_with_movements += 1;
                stats.total_movements += state.movement_history.len();
            }
        }
        stats
    }
}

/// Applies a sighting to an existing entry. Returns whether anything changed;
/// when nothing did, the entry is left untouched.
fn merge_sighting(state: &mut VehicleState, sighting: &Sighting, now: DateTime<Utc>) -> bool {
    let previous = Observation::new(state.position, state.last_energy_level);
    if !geo::has_vehicle_moved(&ComparisonInputs::new(previous, sighting.observation())) {
        return false;
    }

    debug!(
        "Vehicle {} moved from {:?} to {:?}",
        sighting.plate, state.position, sighting.position
    );
    // Persisted timestamps may be ahead of this clock; never go backward.
    let timestamp = now.max(state.last_update);
    state.record_movement(Movement {
        from: state.position,
        to: sighting.position,
        timestamp,
    });
    state.position = sighting.position;
    state.last_update = timestamp;
    if sighting.energy_level.is_some() {
        state.last_energy_level = sighting.energy_level;
    }
    true
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
