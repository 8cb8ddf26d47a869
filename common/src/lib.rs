pub mod catalog;
pub mod chamber;
pub mod config;
pub mod error;
pub mod events;
pub mod registry;
pub mod types;

pub use catalog::{Countdown, CycleCatalog, CycleDefinition};
pub use chamber::{Chamber, PowerIncident, ResumePlan, TemperatureHistory};
pub use config::{ChamberSeed, FleetConfig, HttpConfig, PowerSeed, ResumeConfig, RuntimeConfig};
pub use error::{CommandError, CommandKind, ConfigError, TransitionBlock};
pub use events::{ChamberEvent, ChamberEventKind};
pub use registry::{system_status, ChamberRegistry, Command};
pub use types::{
    ChamberId, ChamberSnapshot, ChamberStatus, CycleId, FleetStatus, SystemStatus,
    NO_CYCLE_COUNTDOWN, OFF_CYCLE_NAME,
};
