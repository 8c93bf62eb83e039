use super::cpu::{CpuActivityHandler, CpuCountHandler, CpuState};
use super::error::SourceError;
use super::memory::{MEMINFO_LINES, MemInfoHandler};
use super::platform;
use super::power::PowerSampler;
use super::process::{NameRules, ProcessMemoryHandler, ProcessStatHandler};
use super::reader::{SourcePaths, read_source};
use super::snapshot::MetricEvent;
use super::table::{ProcessTable, ReconcilePlan, list_live_pids};
use super::uptime::{Uptime, UptimeHandler};
use crate::format::format_uptime;

/// Upper bound on lines scanned in `/proc/cpuinfo`.
const CPUINFO_MAX_LINES: usize = 255;

#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub paths: SourcePaths,
    pub name_rules: NameRules,
    pub page_size: u64,
    pub ticks_per_second: u64,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        CollectorSettings {
            paths: SourcePaths::default(),
            name_rules: NameRules::default(),
            page_size: platform::page_size(),
            ticks_per_second: platform::ticks_per_second(),
        }
    }
}

/// The sampling engine. Owns every long-lived counter and is only ever
/// driven by one thread at a time.
#[derive(Debug)]
pub struct Collector {
    settings: CollectorSettings,
    core_count: Option<usize>,
    cpu: CpuState,
    total_memory_kb: u64,
    uptime: Option<Uptime>,
    table: ProcessTable,
    power: PowerSampler,
    cycles: u64,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new(CollectorSettings::default())
    }
}

impl Collector {
    pub fn new(settings: CollectorSettings) -> Self {
        Collector {
            settings,
            core_count: None,
            cpu: CpuState::default(),
            total_memory_kb: 0,
            uptime: None,
            table: ProcessTable::new(),
            power: PowerSampler::new(),
            cycles: 0,
        }
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// Logical core count, known after the first cycle.
    pub fn core_count(&self) -> Option<usize> {
        self.core_count
    }

    pub fn cpu_usage(&self) -> &[u8] {
        self.cpu.usage()
    }

    pub fn total_memory_kb(&self) -> u64 {
        self.total_memory_kb
    }

    pub fn uptime(&self) -> Option<Uptime> {
        self.uptime
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Sample every source once and return what changed. Failures are
    /// logged and leave the affected metric at its previous value.
    pub fn run_cycle(&mut self) -> Vec<MetricEvent> {
        let _cycle_span = tracing::debug_span!("collector.cycle", cycle = self.cycles).entered();

        if self.core_count.is_none() {
            self.init_cores();
        }

        let mut events = Vec::new();
        events.extend(self.sample_uptime());
        events.extend(self.sample_cpu());
        events.extend(self.sample_memory());
        events.extend(self.sample_processes());
        events.extend(self.sample_power());

        self.cycles += 1;
        events
    }

    fn init_cores(&mut self) {
        let path = self.settings.paths.cpuinfo();
        let mut handler = CpuCountHandler::default();
        let count = match read_source(&path, &mut handler, CPUINFO_MAX_LINES, None) {
            Ok(_) => handler.count(),
            Err(e) => {
                tracing::error!(error = %e, "error reading processor count");
                0
            }
        };
        tracing::debug!(cores = count, "processor count");
        self.core_count = Some(count);
        self.cpu = CpuState::new(count);
    }

    fn sample_uptime(&mut self) -> Option<MetricEvent> {
        let path = self.settings.paths.uptime();
        let mut handler = UptimeHandler::default();
        let result = read_source(&path, &mut handler, 1, None);
        match (result, handler.value()) {
            (Ok(_), Some(uptime)) => {
                self.uptime = Some(uptime);
                Some(MetricEvent::Uptime {
                    seconds: uptime.since_boot,
                    formatted: format_uptime(uptime.since_boot),
                })
            }
            (Ok(_), None) => {
                tracing::warn!(path = %path.display(), "uptime source was empty");
                None
            }
            (Err(e), _) => {
                tracing::warn!(error = %e, "unable to read uptime");
                None
            }
        }
    }

    fn sample_cpu(&mut self) -> Option<MetricEvent> {
        let path = self.settings.paths.stat();
        let mut handler = CpuActivityHandler::default();
        match read_source(&path, &mut handler, self.cpu.rows(), None) {
            Ok(_) => {
                let usage = self.cpu.apply(&handler.into_rows());
                Some(MetricEvent::CpuUsage(usage.to_vec()))
            }
            Err(e) => {
                tracing::warn!(error = %e, "unable to read cpu activity");
                None
            }
        }
    }

    fn sample_memory(&mut self) -> Option<MetricEvent> {
        let path = self.settings.paths.meminfo();
        let mut handler = MemInfoHandler::default();
        if let Err(e) = read_source(&path, &mut handler, MEMINFO_LINES, None) {
            tracing::warn!(error = %e, "unable to read meminfo");
            return None;
        }
        match handler.finish() {
            Ok(info) => {
                self.total_memory_kb = info.total_kb;
                Some(MetricEvent::Memory(info))
            }
            Err(what) => {
                let e = SourceError::Incomplete { path, what };
                tracing::warn!(error = %e, "unable to read meminfo");
                None
            }
        }
    }

    fn sample_processes(&mut self) -> Option<MetricEvent> {
        let paths = &self.settings.paths;
        let live = match list_live_pids(&paths.proc_root) {
            Ok(live) => live,
            Err(e) => {
                tracing::warn!(error = %e, "unable to list processes");
                return None;
            }
        };

        let plan = self
            .table
            .plan(&live, |pid| paths.process_stat(pid).exists());
        self.table.insert_new(&plan.additions);
        self.read_process_files(&plan);
        self.table.remove_all(&plan.removals);

        tracing::debug!(
            tracked = self.table.len(),
            added = plan.additions.len(),
            removed = plan.removals.len(),
            "processes reconciled"
        );
        Some(MetricEvent::Processes(self.table.snapshot()))
    }

    fn read_process_files(&mut self, plan: &ReconcilePlan) {
        let paths = &self.settings.paths;
        let pids: Vec<_> = self
            .table
            .pids()
            .into_iter()
            .filter(|pid| plan.removals.binary_search(pid).is_err())
            .collect();

        let aggregate_total_ticks = self.cpu.aggregate_total();
        let entries = self.table.entries_mut();
        for pid in pids {
            let mut stat = ProcessStatHandler {
                entries: &mut *entries,
                aggregate_total_ticks,
                rules: &self.settings.name_rules,
            };
            if let Err(e) = read_source(&paths.process_stat(pid), &mut stat, 1, Some(pid)) {
                tracing::warn!(pid, error = %e, "error reading process stat file");
            }

            let mut statm = ProcessMemoryHandler {
                entries: &mut *entries,
                page_size: self.settings.page_size,
                total_memory_kb: self.total_memory_kb,
            };
            if let Err(e) = read_source(&paths.process_statm(pid), &mut statm, 1, Some(pid)) {
                tracing::warn!(pid, error = %e, "error reading process statm file");
            }
        }
    }

    fn sample_power(&mut self) -> Vec<MetricEvent> {
        let readings = self.power.sample(&self.settings.paths);
        let mut events = Vec::new();
        if let Some(v) = readings.health {
            events.push(MetricEvent::BatteryHealth(v));
        }
        if let Some(v) = readings.technology {
            events.push(MetricEvent::BatteryTechnology(v));
        }
        if let Some(v) = readings.level {
            events.push(MetricEvent::BatteryLevel(v));
        }
        if let Some(v) = readings.status {
            events.push(MetricEvent::BatteryStatus(v));
        }
        if let Some(v) = readings.temperature {
            events.push(MetricEvent::Temperature(v));
        }
        events
    }
}
