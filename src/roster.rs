use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Highest battery percentage a record can report.
pub const MAX_BATTERY: u8 = 100;

/// One robot in the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotRecord {
    pub id: u32,
    #[serde(default)]
    pub enabled: bool,
    pub battery: u8,
    pub home: String,
    pub role: String,
    pub team: String,
}

/// Compact `{id, enabled}` view used by the turtle enable bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RobotSummary {
    pub id: u32,
    pub enabled: bool,
}

/// Externally reported fields for a single robot.
///
/// `None` leaves the current value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Telemetry {
    pub battery: Option<u8>,
    pub role: Option<String>,
    pub home: Option<String>,
    pub team: Option<String>,
}

/// Ordered, fixed-length collection of robot records.
///
/// Records are addressed by position for operator actions and by `id` for
/// backend telemetry. Nothing ever adds, removes or reorders a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roster {
    records: Vec<RobotRecord>,
}

impl Roster {
    /// Build a roster, rejecting zero ids, duplicate ids and batteries above 100.
    pub fn new(records: Vec<RobotRecord>) -> Result<Self, SessionError> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if record.id == 0 {
                return Err(SessionError::InvalidRoster(
                    "robot ids must be positive".into(),
                ));
            }
            if !seen.insert(record.id) {
                return Err(SessionError::InvalidRoster(format!(
                    "duplicate robot id {}",
                    record.id
                )));
            }
            if record.battery > MAX_BATTERY {
                return Err(SessionError::InvalidRoster(format!(
                    "robot {} reports battery {}% (max {}%)",
                    record.id, record.battery, MAX_BATTERY
                )));
            }
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[RobotRecord] {
        &self.records
    }

    pub fn get(&self, position: usize) -> Option<&RobotRecord> {
        self.records.get(position)
    }

    /// Flip the `enabled` flag of the record at `position`.
    ///
    /// Returns the new value of the flag. Out-of-range positions fail and
    /// leave every record untouched.
    pub fn toggle_enabled(&mut self, position: usize) -> Result<bool, SessionError> {
        let len = self.records.len();
        let record = self
            .records
            .get_mut(position)
            .ok_or(SessionError::IndexOutOfRange { position, len })?;
        record.enabled = !record.enabled;
        Ok(record.enabled)
    }

    /// `{id, enabled}` for every record, in roster order.
    pub fn project_summary(&self) -> Vec<RobotSummary> {
        self.records
            .iter()
            .map(|r| RobotSummary {
                id: r.id,
                enabled: r.enabled,
            })
            .collect()
    }

    /// Full copies of the enabled records, in roster order.
    pub fn project_enabled(&self) -> Vec<RobotRecord> {
        self.records.iter().filter(|r| r.enabled).cloned().collect()
    }

    /// Refresh the reported fields of the robot with `id`.
    ///
    /// Returns false when no record has that id. Never touches `enabled`.
    pub fn apply_telemetry(&mut self, id: u32, telemetry: Telemetry) -> bool {
        let Some(record) = self.records.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        if let Some(battery) = telemetry.battery {
            record.battery = battery.min(MAX_BATTERY);
        }
        if let Some(role) = telemetry.role {
            record.role = role;
        }
        if let Some(home) = telemetry.home {
            record.home = home;
        }
        if let Some(team) = telemetry.team {
            record.team = team;
        }
        true
    }
}
