use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::cpu::usage_percent;
use super::error::{ParseError, parse_field};
use super::reader::{Flow, LineHandler};

pub type Pid = u32;

/// Bytes per kB as reported by `/proc/meminfo`.
const KB: u64 = 1024;

/// How packaged application names are shortened for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRules {
    pub package_prefix: String,
    pub package_marker: String,
}

impl Default for NameRules {
    fn default() -> Self {
        NameRules {
            package_prefix: "harbour-".to_string(),
            package_marker: "(h)".to_string(),
        }
    }
}

/// Strip the enclosing parentheses of a kernel command name and shorten a
/// packaged application name: `(harbour-foo)` becomes `foo(h)`.
pub fn sanitize_name(raw: &str, rules: &NameRules) -> String {
    let name = raw.strip_prefix('(').unwrap_or(raw);
    let name = name.strip_suffix(')').unwrap_or(name);
    match name.strip_prefix(rules.package_prefix.as_str()) {
        Some(rest) if !rules.package_prefix.is_empty() => {
            format!("{rest}{}", rules.package_marker)
        }
        _ => name.to_string(),
    }
}

/// The fields of `/proc/<pid>/stat` the engine uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStat {
    pub pid: Pid,
    /// Command name without its parentheses.
    pub comm: String,
    pub state: char,
    pub utime: u64,
    pub stime: u64,
    /// Start time after boot, in ticks. Distinguishes a reused PID.
    pub start_time: u64,
}

impl ProcessStat {
    pub fn parse(line: &str) -> Result<ProcessStat, ParseError> {
        // comm may contain spaces and parens, so split around the last ')'
        let open = line.find('(').ok_or(ParseError::MissingField("comm"))?;
        let close = line.rfind(')').ok_or(ParseError::MissingField("comm"))?;
        if close < open {
            return Err(ParseError::MissingField("comm"));
        }

        let pid = parse_field("pid", line[..open].split_ascii_whitespace().next())?;
        let comm = line[open + 1..close].to_string();

        // after comm: state(0) ppid(1) pgrp(2) session(3) tty_nr(4) tpgid(5)
        // flags(6) minflt(7) cminflt(8) majflt(9) cmajflt(10) utime(11)
        // stime(12) cutime(13) cstime(14) priority(15) nice(16)
        // num_threads(17) itrealvalue(18) starttime(19)
        let fields: Vec<&str> = line[close + 1..].split_ascii_whitespace().collect();
        if fields.len() < 20 {
            return Err(ParseError::FieldCount {
                expected: 20,
                found: fields.len(),
            });
        }

        let mut state_chars = fields[0].chars();
        let state = match (state_chars.next(), state_chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(ParseError::InvalidNumber {
                    field: "state",
                    value: fields[0].to_string(),
                });
            }
        };

        Ok(ProcessStat {
            pid,
            comm,
            state,
            utime: parse_field("utime", Some(fields[11]))?,
            stime: parse_field("stime", Some(fields[12]))?,
            start_time: parse_field("starttime", Some(fields[19]))?,
        })
    }
}

/// The page counts of `/proc/<pid>/statm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessStatm {
    pub size_pages: u64,
    pub resident_pages: u64,
    pub shared_pages: u64,
}

impl ProcessStatm {
    pub fn parse(line: &str) -> Result<ProcessStatm, ParseError> {
        let fields: Vec<&str> = line.split_ascii_whitespace().collect();
        if fields.len() < 3 {
            return Err(ParseError::FieldCount {
                expected: 3,
                found: fields.len(),
            });
        }
        Ok(ProcessStatm {
            size_pages: parse_field("size", Some(fields[0]))?,
            resident_pages: parse_field("resident", Some(fields[1]))?,
            shared_pages: parse_field("shared", Some(fields[2]))?,
        })
    }
}

/// Latest known state of one tracked process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessEntry {
    pub pid: Pid,
    pub name: String,
    pub state: char,
    /// utime + stime of the latest sample.
    pub cpu_ticks: u64,
    /// utime + stime of the sample before that.
    pub prev_cpu_ticks: u64,
    pub cpu_usage: u8,
    pub resident_bytes: u64,
    pub shared_bytes: u64,
    pub vm_size_bytes: u64,
    pub memory_usage: u8,
    #[serde(skip)]
    start_time: u64,
    /// Aggregate cpu total ticks at the latest stat sample.
    #[serde(skip)]
    baseline_total_ticks: Option<u64>,
}

impl ProcessEntry {
    /// A freshly observed process: nothing sampled, usage zeroed.
    pub fn new(pid: Pid) -> Self {
        ProcessEntry {
            pid,
            name: String::new(),
            state: '?',
            cpu_ticks: 0,
            prev_cpu_ticks: 0,
            cpu_usage: 0,
            resident_bytes: 0,
            shared_bytes: 0,
            vm_size_bytes: 0,
            memory_usage: 0,
            start_time: 0,
            baseline_total_ticks: None,
        }
    }

    /// Whether a stat sample has been taken, i.e. the next one yields a delta.
    pub fn has_baseline(&self) -> bool {
        self.baseline_total_ticks.is_some()
    }

    /// Fold in a stat sample. `aggregate_total_ticks` is the aggregate cpu
    /// row total at the time of this sample; while it is `None` no baseline
    /// is recorded and usage stays 0.
    pub fn update_stat(
        &mut self,
        stat: ProcessStat,
        aggregate_total_ticks: Option<u64>,
        rules: &NameRules,
    ) {
        let reused = self.has_baseline() && stat.start_time != self.start_time;
        if reused {
            tracing::debug!(pid = self.pid, "pid reused, resetting cpu baseline");
            self.baseline_total_ticks = None;
        }

        let ticks = stat.utime.saturating_add(stat.stime);
        self.cpu_usage = match (self.baseline_total_ticks, aggregate_total_ticks) {
            (Some(previous_total), Some(current_total)) => usage_percent(
                ticks.saturating_sub(self.cpu_ticks),
                current_total.saturating_sub(previous_total),
            ),
            _ => 0,
        };
        self.prev_cpu_ticks = if self.has_baseline() { self.cpu_ticks } else { ticks };
        self.cpu_ticks = ticks;
        self.baseline_total_ticks = aggregate_total_ticks;
        self.start_time = stat.start_time;
        self.state = stat.state;
        self.name = sanitize_name(&stat.comm, rules);
    }

    /// Fold in a statm sample. `total_memory_kb` of 0 means unknown.
    ///
    /// Total memory is scaled with 1024 bytes per kB, matching the kB that
    /// `/proc/meminfo` reports. A 1000-byte scale would overstate every
    /// percentage by about 2.4%.
    pub fn update_memory(&mut self, statm: ProcessStatm, page_size: u64, total_memory_kb: u64) {
        self.vm_size_bytes = statm.size_pages.saturating_mul(page_size);
        self.resident_bytes = statm.resident_pages.saturating_mul(page_size);
        self.shared_bytes = statm.shared_pages.saturating_mul(page_size);
        self.memory_usage =
            usage_percent(self.resident_bytes, total_memory_kb.saturating_mul(KB));
    }

    /// Cumulative cpu time spent by the process.
    pub fn cpu_time(&self, ticks_per_second: u64) -> Duration {
        if ticks_per_second == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.cpu_ticks as f64 / ticks_per_second as f64)
    }
}

impl fmt::Display for ProcessEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\tCPU: {}%", self.name, self.cpu_usage)
    }
}

/// Routes `/proc/<pid>/stat` lines to the table entry named by the key.
pub struct ProcessStatHandler<'a> {
    pub entries: &'a mut HashMap<Pid, ProcessEntry>,
    pub aggregate_total_ticks: Option<u64>,
    pub rules: &'a NameRules,
}

impl LineHandler for ProcessStatHandler<'_> {
    fn handle_line(&mut self, line: &str, _index: usize, key: Option<Pid>) -> Result<Flow, ParseError> {
        let stat = ProcessStat::parse(line)?;
        if let Some(entry) = key.and_then(|pid| self.entries.get_mut(&pid)) {
            entry.update_stat(stat, self.aggregate_total_ticks, self.rules);
        }
        Ok(Flow::Stop)
    }
}

/// Routes `/proc/<pid>/statm` lines to the table entry named by the key.
pub struct ProcessMemoryHandler<'a> {
    pub entries: &'a mut HashMap<Pid, ProcessEntry>,
    pub page_size: u64,
    pub total_memory_kb: u64,
}

impl LineHandler for ProcessMemoryHandler<'_> {
    fn handle_line(&mut self, line: &str, _index: usize, key: Option<Pid>) -> Result<Flow, ParseError> {
        let statm = ProcessStatm::parse(line)?;
        if let Some(entry) = key.and_then(|pid| self.entries.get_mut(&pid)) {
            entry.update_memory(statm, self.page_size, self.total_memory_kb);
        }
        Ok(Flow::Stop)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Cpu,
    Memory,
    Name,
}

impl SortOrder {
    pub fn next(self) -> Self {
        match self {
            SortOrder::Cpu => SortOrder::Memory,
            SortOrder::Memory => SortOrder::Name,
            SortOrder::Name => SortOrder::Cpu,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOrder::Cpu => "CPU",
            SortOrder::Memory => "Memory",
            SortOrder::Name => "Name",
        }
    }

    pub fn from_str_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "memory" | "mem" => SortOrder::Memory,
            "name" => SortOrder::Name,
            _ => SortOrder::Cpu,
        }
    }

    /// Usage descending, ties broken by PID descending; names compare
    /// case-insensitively.
    pub fn compare(self, a: &ProcessEntry, b: &ProcessEntry) -> Ordering {
        match self {
            SortOrder::Cpu => b
                .cpu_usage
                .cmp(&a.cpu_usage)
                .then_with(|| b.pid.cmp(&a.pid)),
            SortOrder::Memory => b
                .memory_usage
                .cmp(&a.memory_usage)
                .then_with(|| b.pid.cmp(&a.pid)),
            SortOrder::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        }
    }
}

pub fn sort_processes(processes: &mut [ProcessEntry], order: SortOrder) {
    processes.sort_by(|a, b| order.compare(a, b));
}
