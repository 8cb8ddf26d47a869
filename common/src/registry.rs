use std::collections::BTreeMap;

use tracing::debug;

use crate::{
    catalog::{CycleCatalog, CycleDefinition},
    chamber::{whole_minutes, Chamber},
    config::FleetConfig,
    error::{CommandError, CommandKind, ConfigError, TransitionBlock},
    events::{ChamberEvent, ChamberEventKind},
    types::{ChamberId, ChamberSnapshot, ChamberStatus, CycleId, FleetStatus, SystemStatus},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Resume,
    ApplyCycle(CycleId),
}

impl Command {
    pub fn kind(self) -> CommandKind {
        match self {
            Self::Start => CommandKind::Start,
            Self::Stop => CommandKind::Stop,
            Self::Resume => CommandKind::Resume,
            Self::ApplyCycle(_) => CommandKind::ApplyCycle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChamberRegistry {
    config: FleetConfig,
    catalog: CycleCatalog,
    chambers: BTreeMap<ChamberId, Chamber>,
}

// A command with its cycle already resolved against the catalog.
enum Resolved<'a> {
    Start,
    Stop,
    Resume,
    ApplyCycle(&'a CycleDefinition),
}

impl ChamberRegistry {
    pub fn new(mut config: FleetConfig, now_ms: u64) -> Result<Self, ConfigError> {
        config.sanitize();
        let catalog = CycleCatalog::new(config.cycles.clone())?;

        let mut chambers = BTreeMap::new();
        for seed in &config.chambers {
            let chamber = Chamber::from_seed(seed, &catalog, &config, now_ms)?;
            if chambers.insert(seed.id, chamber).is_some() {
                return Err(ConfigError::DuplicateChamber(seed.id));
            }
        }

        Ok(Self {
            config,
            catalog,
            chambers,
        })
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CycleCatalog {
        &self.catalog
    }

    pub fn cycles(&self) -> &[CycleDefinition] {
        self.catalog.definitions()
    }

    pub fn len(&self) -> usize {
        self.chambers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chambers.is_empty()
    }

    pub fn chamber_ids(&self) -> impl Iterator<Item = ChamberId> + '_ {
        self.chambers.keys().copied()
    }

    pub fn snapshot(&self, now_ms: u64) -> Vec<ChamberSnapshot> {
        self.chambers
            .values()
            .map(|chamber| chamber.snapshot(now_ms, &self.config.resume))
            .collect()
    }

    pub fn chamber(&self, id: ChamberId, now_ms: u64) -> Result<ChamberSnapshot, CommandError> {
        self.chambers
            .get(&id)
            .map(|chamber| chamber.snapshot(now_ms, &self.config.resume))
            .ok_or(CommandError::ChamberNotFound(id))
    }

    pub fn events(&self, id: ChamberId) -> Result<Vec<ChamberEvent>, CommandError> {
        self.chambers
            .get(&id)
            .map(|chamber| chamber.events().to_vec())
            .ok_or(CommandError::ChamberNotFound(id))
    }

    pub fn system_status(&self) -> SystemStatus {
        system_status(self.chambers.values())
    }

    pub fn fleet_status(&self, now_ms: u64) -> FleetStatus {
        FleetStatus {
            system_status: self.system_status(),
            chambers: self.snapshot(now_ms),
        }
    }

    pub fn start(&mut self, id: ChamberId, now_ms: u64) -> Result<(), CommandError> {
        self.dispatch(id, Command::Start, now_ms)
    }

    pub fn stop(&mut self, id: ChamberId, now_ms: u64) -> Result<(), CommandError> {
        self.dispatch(id, Command::Stop, now_ms)
    }

    pub fn resume(&mut self, id: ChamberId, now_ms: u64) -> Result<(), CommandError> {
        self.dispatch(id, Command::Resume, now_ms)
    }

    pub fn apply_cycle(
        &mut self,
        id: ChamberId,
        cycle_id: CycleId,
        now_ms: u64,
    ) -> Result<(), CommandError> {
        self.dispatch(id, Command::ApplyCycle(cycle_id), now_ms)
    }

    pub fn dispatch(
        &mut self,
        id: ChamberId,
        command: Command,
        now_ms: u64,
    ) -> Result<(), CommandError> {
        let chamber = self
            .chambers
            .get_mut(&id)
            .ok_or(CommandError::ChamberNotFound(id))?;

        let resolved = match command {
            Command::Start => Resolved::Start,
            Command::Stop => Resolved::Stop,
            Command::Resume => Resolved::Resume,
            Command::ApplyCycle(cycle_id) => Resolved::ApplyCycle(
                self.catalog
                    .lookup(cycle_id)
                    .ok_or(CommandError::CycleNotFound(cycle_id))?,
            ),
        };

        if let Some(reason) = transition_block(chamber, command) {
            return Err(CommandError::InvalidTransition {
                chamber: id,
                command: command.kind(),
                reason,
            });
        }

        match resolved {
            Resolved::Start => {
                chamber.activate();
                chamber.log(now_ms, ChamberEventKind::CycleStarted);
            }
            Resolved::Stop => {
                chamber.deactivate();
                chamber.log(now_ms, ChamberEventKind::CycleStopped);
            }
            Resolved::Resume => {
                let compensation_minutes = chamber
                    .resume_plan(now_ms, &self.config.resume)
                    .map_or(0, |plan| plan.minutes);
                chamber.activate();
                chamber.log(
                    now_ms,
                    ChamberEventKind::CycleResumed {
                        compensation_minutes,
                    },
                );
            }
            Resolved::ApplyCycle(definition) => {
                chamber.assign_cycle(definition);
                chamber.log(
                    now_ms,
                    ChamberEventKind::CycleConfigured {
                        cycle: definition.name.clone(),
                    },
                );
            }
        }

        debug!("chamber {id}: {} applied", command.kind());
        Ok(())
    }

    pub fn signal_power_failure(&mut self, id: ChamberId, now_ms: u64) -> Result<(), CommandError> {
        let chamber = self.chamber_mut(id)?;
        if chamber.mark_power_failure(now_ms) {
            chamber.log(now_ms, ChamberEventKind::PowerFailureDetected);
            debug!("chamber {id}: power failure, running on battery");
        }
        Ok(())
    }

    pub fn signal_power_restored(
        &mut self,
        id: ChamberId,
        now_ms: u64,
    ) -> Result<(), CommandError> {
        let chamber = self.chamber_mut(id)?;
        let outage_ms =
            chamber
                .mark_power_restored(now_ms)
                .ok_or(CommandError::InvalidTransition {
                    chamber: id,
                    command: CommandKind::SignalPowerRestored,
                    reason: TransitionBlock::NoPowerIncident,
                })?;

        chamber.log(
            now_ms,
            ChamberEventKind::PowerRestored {
                outage_minutes: whole_minutes(outage_ms),
            },
        );
        debug!("chamber {id}: power restored after {outage_ms} ms, awaiting resume");
        Ok(())
    }

    pub fn record_temperature(&mut self, id: ChamberId, celsius: f32) -> Result<(), CommandError> {
        let plausible = self.config.is_plausible_temp(celsius);
        let chamber = self.chamber_mut(id)?;
        if !plausible {
            return Err(CommandError::InvalidTemperature(celsius));
        }
        chamber.record_temperature(celsius);
        Ok(())
    }

    fn chamber_mut(&mut self, id: ChamberId) -> Result<&mut Chamber, CommandError> {
        self.chambers
            .get_mut(&id)
            .ok_or(CommandError::ChamberNotFound(id))
    }
}

fn transition_block(chamber: &Chamber, command: Command) -> Option<TransitionBlock> {
    let power = chamber.power();
    match command {
        Command::Resume => None,
        _ if power.is_failure() => Some(TransitionBlock::PowerFailure),
        _ if power.is_restored() => Some(TransitionBlock::PendingResume),
        Command::Start if chamber.status() == ChamberStatus::Active => {
            Some(TransitionBlock::AlreadyActive)
        }
        Command::Stop if chamber.status() == ChamberStatus::Idle => {
            Some(TransitionBlock::AlreadyIdle)
        }
        _ => None,
    }
}

pub fn system_status<'a>(chambers: impl IntoIterator<Item = &'a Chamber>) -> SystemStatus {
    let mut all_operational = true;
    for chamber in chambers {
        if chamber.power_failure() {
            return SystemStatus::PowerFailureDetected;
        }
        all_operational &= chamber.status().is_operational();
    }

    if all_operational {
        SystemStatus::AllChambersOperational
    } else {
        SystemStatus::SystemAlert
    }
}
