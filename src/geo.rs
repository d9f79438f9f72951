use crate::types::Position;
use serde_json::Value;

/// The observable fields of one sighting that take part in change detection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observation {
    pub position: Option<Position>,
    pub energy_level: Option<f64>,
}

impl Observation {
    pub fn new(position: Position, energy_level: Option<f64>) -> Self {
        Observation {
            position: Some(position),
            energy_level,
        }
    }
}

/// Two successive observations of the same vehicle. Either side may be
/// unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComparisonInputs {
    pub previous: Option<Observation>,
    pub current: Option<Observation>,
}

impl ComparisonInputs {
    pub fn new(previous: Observation, current: Observation) -> Self {
        ComparisonInputs {
            previous: Some(previous),
            current: Some(current),
        }
    }
}

/// True iff `candidate` is an object with numeric `lat` in [-90, 90] and
/// numeric `lon` in [-180, 180].
pub fn is_valid_position(candidate: &Value) -> bool {
    Position::from_value(candidate).is_some()
}

/// Whether the vehicle changed enough to be worth recording.
///
/// Unknown observations or positions count as a change. Positions are
/// compared at 4-decimal truncated precision (~11 m), so GPS jitter below
/// that is ignored. An energy level only counts when both sides carry one.
pub fn has_vehicle_moved(inputs: &ComparisonInputs) -> bool {
    let (previous, current) = match (inputs.previous, inputs.current) {
        (Some(previous), Some(current)) => (previous, current),
        _ => return true,
    };
    let (from, to) = match (previous.position, current.position) {
        (Some(from), Some(to)) => (from.truncated(), to.truncated()),
        _ => return true,
    };

    let position_changed = from.lat != to.lat || from.lon != to.lon;
    let energy_changed = match (previous.energy_level, current.energy_level) {
        (Some(before), Some(after)) => before != after,
        _ => false,
    };
    position_changed || energy_changed
}
