use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, types::CycleId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleDefinition {
    pub id: CycleId,
    pub name: String,
    #[serde(rename = "targetTemp")]
    pub target_temperature: f32,
    #[serde(rename = "durationHours")]
    pub nominal_duration_hours: f64,
}

impl CycleDefinition {
    pub fn new(
        id: CycleId,
        name: impl Into<String>,
        target_temperature: f32,
        nominal_duration_hours: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            target_temperature,
            nominal_duration_hours,
        }
    }

    pub fn validate(&self) -> bool {
        !self.name.trim().is_empty()
            && self.target_temperature.is_finite()
            && self.nominal_duration_hours.is_finite()
            && self.nominal_duration_hours > 0.0
    }

    pub fn countdown(&self) -> Countdown {
        Countdown::from_hours(self.nominal_duration_hours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Countdown {
    minutes: u32,
}

impl Countdown {
    pub fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    pub fn from_hours(hours: f64) -> Self {
        let minutes = (hours.max(0.0) * 60.0).round();
        let minutes = if minutes >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            minutes as u32
        };
        Self { minutes }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleCatalog {
    definitions: Vec<CycleDefinition>,
}

impl CycleCatalog {
    pub fn new(mut definitions: Vec<CycleDefinition>) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        for definition in &definitions {
            if !definition.validate() {
                return Err(ConfigError::InvalidCycle(definition.id));
            }
            if !seen.insert(definition.id) {
                return Err(ConfigError::DuplicateCycle(definition.id));
            }
        }
        definitions.sort_by_key(|definition| definition.id);
        Ok(Self { definitions })
    }

    pub fn lookup(&self, id: CycleId) -> Option<&CycleDefinition> {
        self.definitions
            .binary_search_by_key(&id, |definition| definition.id)
            .ok()
            .map(|index| &self.definitions[index])
    }

    pub fn definitions(&self) -> &[CycleDefinition] {
        &self.definitions
    }
}

impl Default for CycleCatalog {
    fn default() -> Self {
        Self {
            definitions: default_cycles(),
        }
    }
}

pub fn default_cycles() -> Vec<CycleDefinition> {
    vec![
        CycleDefinition::new(1, "Heating", 80.0, 12.0),
        CycleDefinition::new(2, "Vacuum Heating", 90.0, 24.0),
        CycleDefinition::new(3, "Vacuum Cooling", 60.0, 6.0),
    ]
}
