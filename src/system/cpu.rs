use super::error::{ParseError, parse_field};
use super::process::Pid;
use super::reader::{Flow, LineHandler};

/// Counts `processor` entries in `/proc/cpuinfo`.
#[derive(Debug, Default)]
pub struct CpuCountHandler {
    count: usize,
}

impl CpuCountHandler {
    pub fn count(&self) -> usize {
        self.count
    }
}

impl LineHandler for CpuCountHandler {
    fn handle_line(&mut self, line: &str, _index: usize, _key: Option<Pid>) -> Result<Flow, ParseError> {
        if let Some((key, _)) = line.split_once(':')
            && key.trim() == "processor"
        {
            self.count += 1;
        }
        Ok(Flow::Continue)
    }
}

/// Cumulative tick counters for one `/proc/stat` cpu row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreTicks {
    pub active: u64,
    pub total: u64,
}

impl CoreTicks {
    /// Parse a `cpu`/`cpuN` row. Returns the row index (0 = aggregate,
    /// N+1 = core N) alongside the counters.
    pub fn parse(line: &str) -> Result<(usize, CoreTicks), ParseError> {
        let mut fields = line.split_ascii_whitespace();
        let label = fields.next().ok_or(ParseError::MissingField("cpu label"))?;
        let row = row_index(label)?;

        let values = fields
            .map(|v| parse_field::<u64>("cpu ticks", Some(v)))
            .collect::<Result<Vec<_>, _>>()?;
        // user nice system idle are present on every kernel we care about
        if values.len() < 4 {
            return Err(ParseError::FieldCount {
                expected: 4,
                found: values.len(),
            });
        }

        let field = |i: usize| values.get(i).copied().unwrap_or(0);
        let (user, nice, system, idle) = (field(0), field(1), field(2), field(3));
        let (iowait, irq, softirq, steal) = (field(4), field(5), field(6), field(7));

        // guest and guest_nice are already folded into user and nice
        let active = [nice, system, irq, softirq, steal]
            .into_iter()
            .fold(user, u64::saturating_add);
        Ok((
            row,
            CoreTicks {
                active,
                total: active.saturating_add(idle).saturating_add(iowait),
            },
        ))
    }
}

fn row_index(label: &str) -> Result<usize, ParseError> {
    let suffix = label.strip_prefix("cpu").ok_or_else(|| ParseError::UnexpectedKey {
        expected: "cpu",
        found: label.to_string(),
    })?;
    if suffix.is_empty() {
        return Ok(0);
    }
    let core: usize = parse_field("cpu index", Some(suffix))?;
    Ok(core + 1)
}

/// `round(100 * active / total)`, or 0 when there is nothing to divide by.
pub fn usage_percent(active_delta: u64, total_delta: u64) -> u8 {
    if total_delta == 0 {
        return 0;
    }
    let pct = (100.0 * active_delta as f64 / total_delta as f64).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Collects the rows of one `/proc/stat` read. Nothing is applied until
/// the whole read succeeded.
#[derive(Debug, Default)]
pub struct CpuActivityHandler {
    rows: Vec<(usize, CoreTicks)>,
}

impl CpuActivityHandler {
    pub fn into_rows(self) -> Vec<(usize, CoreTicks)> {
        self.rows
    }
}

impl LineHandler for CpuActivityHandler {
    fn handle_line(&mut self, line: &str, _index: usize, _key: Option<Pid>) -> Result<Flow, ParseError> {
        // cpu rows come first; anything else means we are past them
        if !line.starts_with("cpu") {
            return Ok(Flow::Stop);
        }
        self.rows.push(CoreTicks::parse(line)?);
        Ok(Flow::Continue)
    }
}

/// Last two samples per cpu row and the usage derived from them.
#[derive(Debug, Clone, Default)]
pub struct CpuState {
    samples: Vec<Option<CoreTicks>>,
    usage: Vec<u8>,
}

impl CpuState {
    pub fn new(core_count: usize) -> Self {
        CpuState {
            samples: vec![None; core_count + 1],
            usage: vec![0; core_count + 1],
        }
    }

    /// Number of rows tracked, aggregate included.
    pub fn rows(&self) -> usize {
        self.samples.len()
    }

    pub fn usage(&self) -> &[u8] {
        &self.usage
    }

    /// Aggregate total ticks of the latest sample, `None` before the first
    /// successful read.
    pub fn aggregate_total(&self) -> Option<u64> {
        self.samples.first().copied().flatten().map(|t| t.total)
    }

    /// Fold freshly read rows into the state. Rows outside the tracked
    /// range are ignored. A row's first sample reports 0.
    pub fn apply(&mut self, rows: &[(usize, CoreTicks)]) -> &[u8] {
        for &(row, current) in rows {
            let Some(slot) = self.samples.get_mut(row) else {
                continue;
            };
            self.usage[row] = match slot.replace(current) {
                Some(previous) => usage_percent(
                    current.active.saturating_sub(previous.active),
                    current.total.saturating_sub(previous.total),
                ),
                None => 0,
            };
        }
        &self.usage
    }
}
