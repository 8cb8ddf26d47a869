use std::{collections::VecDeque, fmt};

use serde::Serialize;

use crate::{
    catalog::{Countdown, CycleCatalog, CycleDefinition},
    config::{ChamberSeed, FleetConfig, PowerSeed, ResumeConfig},
    error::ConfigError,
    events::{ChamberEvent, ChamberEventKind, EventLog},
    types::{
        ChamberId, ChamberSnapshot, ChamberStatus, CycleId, NO_CYCLE_COUNTDOWN, OFF_CYCLE_NAME,
    },
};

const MS_PER_MINUTE: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerIncident {
    Normal,
    Failure { since_ms: u64 },
    Restored { outage_ms: u64 },
}

impl PowerIncident {
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn is_restored(self) -> bool {
        matches!(self, Self::Restored { .. })
    }

    pub fn outage_ms(self, now_ms: u64) -> Option<u64> {
        match self {
            Self::Normal => None,
            Self::Failure { since_ms } => Some(now_ms.saturating_sub(since_ms)),
            Self::Restored { outage_ms } => Some(outage_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResumePlan {
    pub minutes: u32,
    pub temperature: f32,
}

impl ResumePlan {
    pub fn compute(outage_ms: u64, temperature: f32, config: &ResumeConfig) -> Self {
        let outage_minutes = outage_ms.div_ceil(MS_PER_MINUTE) as f64;
        let scaled = (outage_minutes * f64::from(config.compensation_factor)).ceil();
        let capped = scaled.clamp(0.0, f64::from(config.max_minutes)) as u32;

        Self {
            minutes: capped.max(config.min_minutes).min(config.max_minutes),
            temperature,
        }
    }
}

impl fmt::Display for ResumePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle Resuming for {} mins at {}°C",
            self.minutes, self.temperature
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleAssignment {
    pub cycle_id: CycleId,
    pub name: String,
    pub target_temperature: f32,
    pub remaining: Countdown,
}

impl CycleAssignment {
    pub fn from_definition(definition: &CycleDefinition) -> Self {
        Self {
            cycle_id: definition.id,
            name: definition.name.clone(),
            target_temperature: definition.target_temperature,
            remaining: definition.countdown(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureHistory {
    capacity: usize,
    samples: VecDeque<f32>,
}

impl TemperatureHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn from_samples(capacity: usize, samples: impl IntoIterator<Item = f32>) -> Self {
        let mut history = Self::new(capacity);
        for sample in samples {
            history.push(sample);
        }
        history
    }

    pub fn push(&mut self, sample: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f32> {
        self.samples.back().copied()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.samples.iter().copied().collect()
    }
}

#[derive(Debug, Clone)]
pub struct Chamber {
    id: ChamberId,
    name: String,
    status: ChamberStatus,
    cycle: Option<CycleAssignment>,
    current_temperature: f32,
    history: TemperatureHistory,
    power: PowerIncident,
    events: EventLog,
}

impl Chamber {
    pub fn new(id: ChamberId, name: impl Into<String>, config: &FleetConfig) -> Self {
        Self {
            id,
            name: name.into(),
            status: ChamberStatus::Idle,
            cycle: None,
            current_temperature: 0.0,
            history: TemperatureHistory::new(config.history_len),
            power: PowerIncident::Normal,
            events: EventLog::new(config.event_log_len),
        }
    }

    pub fn from_seed(
        seed: &ChamberSeed,
        catalog: &CycleCatalog,
        config: &FleetConfig,
        now_ms: u64,
    ) -> Result<Self, ConfigError> {
        let cycle = match seed.cycle_id {
            Some(cycle_id) => {
                let definition =
                    catalog
                        .lookup(cycle_id)
                        .ok_or(ConfigError::UnknownSeedCycle {
                            chamber: seed.id,
                            cycle: cycle_id,
                        })?;
                let mut assignment = CycleAssignment::from_definition(definition);
                if let Some(minutes) = seed.remaining_minutes {
                    assignment.remaining = Countdown::from_minutes(minutes);
                }
                Some(assignment)
            }
            None => None,
        };

        let power = match seed.power {
            None => PowerIncident::Normal,
            Some(PowerSeed::Failure) => PowerIncident::Failure { since_ms: now_ms },
            Some(PowerSeed::Restored { outage_minutes }) => PowerIncident::Restored {
                outage_ms: u64::from(outage_minutes) * MS_PER_MINUTE,
            },
        };

        let mut history = TemperatureHistory::from_samples(
            config.history_len,
            seed.temperature_history.iter().copied(),
        );
        if history.latest() != Some(seed.current_temp_c) {
            history.push(seed.current_temp_c);
        }

        Ok(Self {
            id: seed.id,
            name: seed.name.clone(),
            status: seed.status,
            cycle,
            current_temperature: seed.current_temp_c,
            history,
            power,
            events: EventLog::new(config.event_log_len),
        })
    }

    pub fn status(&self) -> ChamberStatus {
        self.status
    }

    pub fn power(&self) -> PowerIncident {
        self.power
    }

    pub fn power_failure(&self) -> bool {
        self.power.is_failure()
    }

    pub fn power_restored(&self) -> bool {
        self.power.is_restored()
    }

    pub fn current_temperature(&self) -> f32 {
        self.current_temperature
    }

    pub fn history(&self) -> &TemperatureHistory {
        &self.history
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    fn running_cycle(&self) -> Option<&CycleAssignment> {
        match self.status {
            ChamberStatus::Idle => None,
            _ => self.cycle.as_ref(),
        }
    }

    pub fn configured_cycle(&self) -> Option<&CycleAssignment> {
        self.cycle.as_ref()
    }

    pub fn active_cycle_name(&self) -> &str {
        self.running_cycle()
            .map(|cycle| cycle.name.as_str())
            .unwrap_or(OFF_CYCLE_NAME)
    }

    pub fn target_temperature(&self) -> Option<f32> {
        self.running_cycle().map(|cycle| cycle.target_temperature)
    }

    pub fn time_remaining(&self) -> String {
        self.running_cycle()
            .map(|cycle| cycle.remaining.to_string())
            .unwrap_or_else(|| NO_CYCLE_COUNTDOWN.to_string())
    }

    pub fn resume_plan(&self, now_ms: u64, config: &ResumeConfig) -> Option<ResumePlan> {
        let outage_ms = self.power.outage_ms(now_ms)?;
        let temperature = self
            .cycle
            .as_ref()
            .map(|cycle| cycle.target_temperature)
            .unwrap_or(self.current_temperature);
        Some(ResumePlan::compute(outage_ms, temperature, config))
    }

    pub fn snapshot(&self, now_ms: u64, config: &ResumeConfig) -> ChamberSnapshot {
        ChamberSnapshot {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            active_cycle_name: self.active_cycle_name().to_string(),
            configured_cycle: self.cycle.as_ref().map(|cycle| cycle.name.clone()),
            current_temperature: self.current_temperature,
            target_temperature: self.target_temperature(),
            time_remaining: self.time_remaining(),
            temperature_history: self.history.to_vec(),
            power_failure: self.power_failure(),
            power_restored: self.power_restored(),
            resume_plan: self.resume_plan(now_ms, config),
        }
    }

    // Mutations below are applied by the registry only after the command has
    // been validated against the current state.

    pub(crate) fn activate(&mut self) {
        self.status = ChamberStatus::Active;
        self.power = PowerIncident::Normal;
    }

    pub(crate) fn deactivate(&mut self) {
        self.status = ChamberStatus::Idle;
        self.cycle = None;
    }

    pub(crate) fn assign_cycle(&mut self, definition: &CycleDefinition) {
        self.cycle = Some(CycleAssignment::from_definition(definition));
    }

    pub(crate) fn mark_power_failure(&mut self, now_ms: u64) -> bool {
        if self.power.is_failure() {
            return false;
        }
        self.power = PowerIncident::Failure { since_ms: now_ms };
        true
    }

    pub(crate) fn mark_power_restored(&mut self, now_ms: u64) -> Option<u64> {
        let PowerIncident::Failure { since_ms } = self.power else {
            return None;
        };
        let outage_ms = now_ms.saturating_sub(since_ms);
        self.power = PowerIncident::Restored { outage_ms };
        Some(outage_ms)
    }

    pub(crate) fn record_temperature(&mut self, celsius: f32) {
        self.current_temperature = celsius;
        self.history.push(celsius);
    }

    pub(crate) fn log(&mut self, at_ms: u64, event: ChamberEventKind) {
        let entry = ChamberEvent::new(
            at_ms,
            event,
            self.current_temperature,
            self.target_temperature(),
            self.status,
        );
        self.events.push(entry);
    }
}

pub(crate) fn whole_minutes(ms: u64) -> u32 {
    u32::try_from(ms.div_ceil(MS_PER_MINUTE)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn seed() -> ChamberSeed {
        ChamberSeed {
            id: 7,
            name: "Oven 7".to_string(),
            status: ChamberStatus::Active,
            cycle_id: Some(1),
            remaining_minutes: None,
            current_temp_c: 70.0,
            temperature_history: vec![60.0, 65.0],
            power: None,
        }
    }

    #[test]
    fn history_ring_discards_oldest_sample() {
        let mut history = TemperatureHistory::from_samples(3, [1.0, 2.0, 3.0]);
        history.push(4.0);

        assert_eq!(history.to_vec(), vec![2.0, 3.0, 4.0]);
        assert_eq!(history.len(), history.capacity());
        assert_eq!(history.latest(), Some(4.0));
        assert!(!history.is_empty());
        assert!(TemperatureHistory::new(3).is_empty());
    }

    #[test]
    fn resume_plan_follows_outage_length() {
        let config = ResumeConfig::default();

        // 45 minutes of outage compensated one-to-one.
        let plan = ResumePlan::compute(45 * 60_000, 120.0, &config);
        assert_eq!(plan.minutes, 45);
        assert_eq!(plan.to_string(), "Cycle Resuming for 45 mins at 120°C");

        // Partial minutes round up, short outages get the floor.
        assert_eq!(ResumePlan::compute(1, 80.0, &config).minutes, 15);
        assert_eq!(ResumePlan::compute(20 * 60_000 + 1, 80.0, &config).minutes, 21);

        // Long outages are capped.
        assert_eq!(ResumePlan::compute(10 * 3_600_000, 80.0, &config).minutes, 240);
    }

    #[test]
    fn resume_plan_scales_by_factor() {
        let config = ResumeConfig {
            compensation_factor: 1.5,
            min_minutes: 0,
            max_minutes: 600,
        };
        assert_eq!(ResumePlan::compute(60 * 60_000, 80.0, &config).minutes, 90);
    }

    #[test]
    fn seed_applies_cycle_and_remaining_override() {
        let config = FleetConfig::default();
        let catalog = CycleCatalog::default();
        let mut seed = seed();
        seed.remaining_minutes = Some(8 * 60 + 23);

        let chamber = Chamber::from_seed(&seed, &catalog, &config, 0).unwrap();

        assert_eq!(chamber.active_cycle_name(), "Heating");
        assert_eq!(chamber.target_temperature(), Some(80.0));
        assert_eq!(chamber.time_remaining(), "8:23");
        assert_eq!(chamber.history().to_vec(), vec![60.0, 65.0, 70.0]);
    }

    #[test]
    fn seed_with_unknown_cycle_is_rejected() {
        let mut seed = seed();
        seed.cycle_id = Some(42);

        let err = Chamber::from_seed(&seed, &CycleCatalog::default(), &FleetConfig::default(), 0)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownSeedCycle {
                chamber: 7,
                cycle: 42
            }
        );
    }

    #[test]
    fn idle_chamber_hides_configured_cycle() {
        let config = FleetConfig::default();
        let catalog = CycleCatalog::default();
        let mut chamber = Chamber::new(3, "Oven 3", &config);
        chamber.assign_cycle(catalog.lookup(3).unwrap());

        assert_eq!(chamber.active_cycle_name(), OFF_CYCLE_NAME);
        assert_eq!(chamber.target_temperature(), None);
        assert_eq!(chamber.time_remaining(), NO_CYCLE_COUNTDOWN);
        assert_eq!(
            chamber.configured_cycle().map(|cycle| cycle.name.as_str()),
            Some("Vacuum Cooling")
        );
    }

    #[test]
    fn restoration_records_outage() {
        let mut chamber = Chamber::new(1, "Oven 1", &FleetConfig::default());

        assert!(chamber.mark_power_failure(1_000));
        assert!(!chamber.mark_power_failure(5_000));
        assert_eq!(chamber.power().outage_ms(61_000), Some(60_000));

        assert_eq!(chamber.mark_power_restored(121_000), Some(120_000));
        assert!(chamber.power_restored());
        assert!(!chamber.power_failure());
        assert_eq!(chamber.mark_power_restored(200_000), None);
    }

    #[test]
    fn whole_minutes_rounds_up() {
        assert_eq!(whole_minutes(0), 0);
        assert_eq!(whole_minutes(1), 1);
        assert_eq!(whole_minutes(120_000), 2);
    }
}
