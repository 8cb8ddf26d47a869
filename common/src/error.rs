use std::fmt;

use thiserror::Error;

use crate::types::{ChamberId, CycleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Start,
    Stop,
    Resume,
    ApplyCycle,
    SignalPowerFailure,
    SignalPowerRestored,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Resume => "resume",
            Self::ApplyCycle => "apply cycle",
            Self::SignalPowerFailure => "signal power failure",
            Self::SignalPowerRestored => "signal power restored",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionBlock {
    #[error("chamber is already active")]
    AlreadyActive,
    #[error("chamber is already idle")]
    AlreadyIdle,
    #[error("chamber is running on battery after a power failure")]
    PowerFailure,
    #[error("chamber is waiting to resume after power was restored")]
    PendingResume,
    #[error("no power incident to recover from")]
    NoPowerIncident,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("chamber {0} not found")]
    ChamberNotFound(ChamberId),
    #[error("cycle {0} not found")]
    CycleNotFound(CycleId),
    #[error("cannot {command} chamber {chamber}: {reason}")]
    InvalidTransition {
        chamber: ChamberId,
        command: CommandKind,
        reason: TransitionBlock,
    },
    #[error("temperature reading {0} is outside the plausible range")]
    InvalidTemperature(f32),
}

impl CommandError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ChamberNotFound(_) | Self::CycleNotFound(_))
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("duplicate cycle id {0}")]
    DuplicateCycle(CycleId),
    #[error("cycle {0} has an empty name, non-finite target or non-positive duration")]
    InvalidCycle(CycleId),
    #[error("duplicate chamber id {0}")]
    DuplicateChamber(ChamberId),
    #[error("chamber {chamber} references unknown cycle {cycle}")]
    UnknownSeedCycle { chamber: ChamberId, cycle: CycleId },
}
