use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::ChamberStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChamberEventKind {
    CycleStarted,
    CycleStopped,
    CycleConfigured { cycle: String },
    PowerFailureDetected,
    PowerRestored {
        #[serde(rename = "outageMinutes")]
        outage_minutes: u32,
    },
    CycleResumed {
        #[serde(rename = "compensationMinutes")]
        compensation_minutes: u32,
    },
}

impl ChamberEventKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CycleStarted => "Cycle Started",
            Self::CycleStopped => "Cycle Stopped",
            Self::CycleConfigured { .. } => "Cycle Configured",
            Self::PowerFailureDetected => "Power Failure Detected",
            Self::PowerRestored { .. } => "Power Restored",
            Self::CycleResumed { .. } => "Cycle Resumed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChamberEvent {
    #[serde(rename = "atMs")]
    pub at_ms: u64,
    #[serde(rename = "timestamp")]
    pub timestamp_label: String,
    pub event: ChamberEventKind,
    pub temperature: f32,
    #[serde(rename = "targetTemp")]
    pub target_temperature: Option<f32>,
    pub status: ChamberStatus,
}

impl ChamberEvent {
    pub fn new(
        at_ms: u64,
        event: ChamberEventKind,
        temperature: f32,
        target_temperature: Option<f32>,
        status: ChamberStatus,
    ) -> Self {
        Self {
            at_ms,
            timestamp_label: timestamp_label(at_ms),
            event,
            temperature,
            target_temperature,
            status,
        }
    }
}

pub fn timestamp_label(at_ms: u64) -> String {
    i64::try_from(at_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "----------".to_string())
}

#[derive(Debug, Clone)]
pub struct EventLog {
    capacity: usize,
    entries: VecDeque<ChamberEvent>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: ChamberEvent) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChamberEvent> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ChamberEvent> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(at_ms: u64) -> ChamberEvent {
        ChamberEvent::new(
            at_ms,
            ChamberEventKind::CycleStarted,
            65.0,
            Some(80.0),
            ChamberStatus::Active,
        )
    }

    #[test]
    fn formats_epoch_millis_as_utc_label() {
        // 2026-02-09 14:35:22 UTC
        assert_eq!(timestamp_label(1_770_647_722_000), "2026-02-09 14:35:22");
        assert_eq!(timestamp_label(0), "1970-01-01 00:00:00");
    }

    #[test]
    fn drops_oldest_when_full() {
        let mut log = EventLog::new(3);
        assert!(log.is_empty());
        for at in 1..=5 {
            log.push(event(at));
        }

        let kept: Vec<_> = log.iter().map(|event| event.at_ms).collect();
        assert_eq!(kept, vec![3, 4, 5]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn serializes_kind_with_label_fields() {
        let event = ChamberEvent::new(
            0,
            ChamberEventKind::PowerRestored { outage_minutes: 12 },
            70.0,
            None,
            ChamberStatus::Active,
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"]["kind"], "powerRestored");
        assert_eq!(json["event"]["outageMinutes"], 12);
        assert_eq!(json["status"], "active");
        assert!(json["targetTemp"].is_null());
        assert_eq!(event.event.label(), "Power Restored");
    }
}
