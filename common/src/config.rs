use serde::{Deserialize, Serialize};

use crate::{
    catalog::{default_cycles, CycleDefinition},
    types::{ChamberId, ChamberStatus, CycleId},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResumeConfig {
    pub compensation_factor: f32,
    pub min_minutes: u32,
    pub max_minutes: u32,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            compensation_factor: 1.0,
            min_minutes: 15,
            max_minutes: 240,
        }
    }
}

impl ResumeConfig {
    pub fn sanitize(&mut self) {
        if !self.compensation_factor.is_finite() {
            self.compensation_factor = 1.0;
        }
        self.compensation_factor = self.compensation_factor.clamp(0.0, 10.0);
        self.max_minutes = self.max_minutes.clamp(1, 24 * 60);
        self.min_minutes = self.min_minutes.min(self.max_minutes);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum PowerSeed {
    Failure,
    Restored {
        #[serde(default)]
        outage_minutes: u32,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChamberSeed {
    pub id: ChamberId,
    pub name: String,
    pub status: ChamberStatus,
    #[serde(default)]
    pub cycle_id: Option<CycleId>,
    #[serde(default)]
    pub remaining_minutes: Option<u32>,
    pub current_temp_c: f32,
    #[serde(default)]
    pub temperature_history: Vec<f32>,
    #[serde(default)]
    pub power: Option<PowerSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FleetConfig {
    pub history_len: usize,
    pub event_log_len: usize,
    pub min_valid_temp_c: f32,
    pub max_valid_temp_c: f32,
    pub resume: ResumeConfig,
    pub cycles: Vec<CycleDefinition>,
    pub chambers: Vec<ChamberSeed>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            history_len: 10,
            event_log_len: 64,
            min_valid_temp_c: -40.0,
            max_valid_temp_c: 400.0,
            resume: ResumeConfig::default(),
            cycles: default_cycles(),
            chambers: default_chambers(),
        }
    }
}

impl FleetConfig {
    pub fn sanitize(&mut self) {
        self.history_len = self.history_len.clamp(1, 240);
        self.event_log_len = self.event_log_len.clamp(1, 1_000);

        if !self.min_valid_temp_c.is_finite() {
            self.min_valid_temp_c = -40.0;
        }
        if !self.max_valid_temp_c.is_finite() || self.max_valid_temp_c <= self.min_valid_temp_c {
            self.max_valid_temp_c = self.min_valid_temp_c + 440.0;
        }

        self.resume.sanitize();
    }

    pub fn is_plausible_temp(&self, celsius: f32) -> bool {
        celsius.is_finite() && (self.min_valid_temp_c..=self.max_valid_temp_c).contains(&celsius)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    pub fleet: FleetConfig,
    pub http: HttpConfig,
}

impl RuntimeConfig {
    pub fn sanitize(&mut self) {
        self.fleet.sanitize();
        if self.http.port == 0 {
            self.http.port = 8080;
        }
        if self.http.bind_addr.trim().is_empty() {
            self.http.bind_addr = HttpConfig::default().bind_addr;
        }
    }
}

pub fn default_chambers() -> Vec<ChamberSeed> {
    vec![
        ChamberSeed {
            id: 1,
            name: "Oven 1".to_string(),
            status: ChamberStatus::Active,
            cycle_id: Some(1),
            remaining_minutes: Some(8 * 60 + 23),
            current_temp_c: 75.0,
            temperature_history: vec![65.0, 68.0, 70.0, 71.0, 72.0, 73.0, 74.0, 74.0, 75.0, 75.0],
            power: None,
        },
        ChamberSeed {
            id: 2,
            name: "Oven 2".to_string(),
            status: ChamberStatus::Paused,
            cycle_id: Some(2),
            remaining_minutes: Some(18 * 60 + 45),
            current_temp_c: 85.0,
            temperature_history: vec![75.0, 78.0, 80.0, 82.0, 83.0, 84.0, 84.0, 85.0, 85.0, 85.0],
            power: Some(PowerSeed::Restored { outage_minutes: 45 }),
        },
        ChamberSeed {
            id: 3,
            name: "Oven 3".to_string(),
            status: ChamberStatus::Idle,
            cycle_id: None,
            remaining_minutes: None,
            current_temp_c: 28.0,
            temperature_history: vec![28.0; 10],
            power: None,
        },
        ChamberSeed {
            id: 4,
            name: "Oven 4".to_string(),
            status: ChamberStatus::Fault,
            cycle_id: Some(3),
            remaining_minutes: Some(2 * 60 + 15),
            current_temp_c: 68.0,
            temperature_history: vec![85.0, 82.0, 80.0, 77.0, 75.0, 73.0, 71.0, 70.0, 69.0, 68.0],
            power: Some(PowerSeed::Failure),
        },
    ]
}
