use serde::Serialize;

use super::memory::MemoryInfo;
use super::process::{ProcessEntry, SortOrder, sort_processes};

/// One metric published by a sampling cycle. Each kind is emitted at most
/// once per cycle, and only when its source was read successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "metric", content = "value", rename_all = "snake_case")]
pub enum MetricEvent {
    /// Per-row usage, index 0 = aggregate.
    CpuUsage(Vec<u8>),
    Memory(MemoryInfo),
    Uptime { seconds: f64, formatted: String },
    /// Every tracked process, ordered by PID.
    Processes(Vec<ProcessEntry>),
    BatteryHealth(String),
    BatteryTechnology(String),
    BatteryLevel(i32),
    BatteryStatus(String),
    Temperature(i64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatteryInfo {
    pub health: Option<String>,
    pub technology: Option<String>,
    pub level: Option<i32>,
    pub status: Option<String>,
}

/// Everything published so far, folded into one value. Metrics that were
/// not refreshed in a cycle keep their last published value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemSnapshot {
    /// Completed sampling cycles.
    pub cycle: u64,
    pub cpu_usage: Vec<u8>,
    pub memory: Option<MemoryInfo>,
    pub uptime_secs: Option<f64>,
    pub uptime: String,
    pub processes: Vec<ProcessEntry>,
    pub battery: BatteryInfo,
    pub temperature: Option<i64>,
}

impl SystemSnapshot {
    pub fn apply(&mut self, event: &MetricEvent) {
        match event {
            MetricEvent::CpuUsage(usage) => self.cpu_usage.clone_from(usage),
            MetricEvent::Memory(info) => self.memory = Some(*info),
            MetricEvent::Uptime { seconds, formatted } => {
                self.uptime_secs = Some(*seconds);
                self.uptime.clone_from(formatted);
            }
            MetricEvent::Processes(processes) => self.processes.clone_from(processes),
            MetricEvent::BatteryHealth(v) => self.battery.health = Some(v.clone()),
            MetricEvent::BatteryTechnology(v) => self.battery.technology = Some(v.clone()),
            MetricEvent::BatteryLevel(v) => self.battery.level = Some(*v),
            MetricEvent::BatteryStatus(v) => self.battery.status = Some(v.clone()),
            MetricEvent::Temperature(v) => self.temperature = Some(*v),
        }
    }

    /// Fold a whole cycle's events and count the cycle.
    pub fn apply_cycle(&mut self, events: &[MetricEvent]) {
        for event in events {
            self.apply(event);
        }
        self.cycle += 1;
    }

    /// Aggregate cpu usage, the single value a summary view shows.
    pub fn cpu_summary(&self) -> u8 {
        self.cpu_usage.first().copied().unwrap_or(0)
    }

    pub fn top_processes(&self, order: SortOrder, limit: usize) -> Vec<ProcessEntry> {
        let mut processes = self.processes.clone();
        sort_processes(&mut processes, order);
        processes.truncate(limit);
        processes
    }
}
