use serde::{Deserialize, Serialize};

use crate::chamber::ResumePlan;

pub type ChamberId = u32;
pub type CycleId = u32;

pub const OFF_CYCLE_NAME: &str = "Off";

pub const NO_CYCLE_COUNTDOWN: &str = "--:--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChamberStatus {
    Active,
    Paused,
    Idle,
    Fault,
}

impl ChamberStatus {
    pub fn is_operational(self) -> bool {
        matches!(self, Self::Active | Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SystemStatus {
    #[serde(rename = "Power Failure Detected")]
    PowerFailureDetected,
    #[serde(rename = "All Chambers Operational")]
    AllChambersOperational,
    #[serde(rename = "System Alert")]
    SystemAlert,
}

impl SystemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PowerFailureDetected => "Power Failure Detected",
            Self::AllChambersOperational => "All Chambers Operational",
            Self::SystemAlert => "System Alert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChamberSnapshot {
    pub id: ChamberId,
    pub name: String,
    pub status: ChamberStatus,
    #[serde(rename = "activeCycleName")]
    pub active_cycle_name: String,
    #[serde(rename = "configuredCycle")]
    pub configured_cycle: Option<String>,
    #[serde(rename = "currentTemp")]
    pub current_temperature: f32,
    #[serde(rename = "targetTemp")]
    pub target_temperature: Option<f32>,
    #[serde(rename = "timeRemaining")]
    pub time_remaining: String,
    #[serde(rename = "temperatureHistory")]
    pub temperature_history: Vec<f32>,
    #[serde(rename = "powerFailure")]
    pub power_failure: bool,
    #[serde(rename = "powerRestored")]
    pub power_restored: bool,
    #[serde(rename = "resumePlan")]
    pub resume_plan: Option<ResumePlan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetStatus {
    #[serde(rename = "systemStatus")]
    pub system_status: SystemStatus,
    pub chambers: Vec<ChamberSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_status_serializes_as_display_label() {
        let json = serde_json::to_string(&SystemStatus::PowerFailureDetected).unwrap();
        assert_eq!(json, "\"Power Failure Detected\"");
        assert_eq!(
            SystemStatus::SystemAlert.as_str(),
            serde_json::from_str::<String>(
                &serde_json::to_string(&SystemStatus::SystemAlert).unwrap()
            )
            .unwrap()
        );
    }

    #[test]
    fn chamber_status_round_trips_lowercase() {
        let status: ChamberStatus = serde_json::from_str("\"fault\"").unwrap();
        assert_eq!(status, ChamberStatus::Fault);
        assert!(!status.is_operational());
        assert!(ChamberStatus::Idle.is_operational());
    }
}
