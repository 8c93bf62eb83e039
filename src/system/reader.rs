use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::error::{ParseError, SourceError};
use super::process::Pid;

/// Whether a handler wants more lines from the current source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Consumes the lines of one kernel text source.
///
/// `key` is the context the caller passed to [`read_source`]; per-process
/// handlers use it to route a line to the right table entry.
pub trait LineHandler {
    fn handle_line(&mut self, line: &str, index: usize, key: Option<Pid>)
    -> Result<Flow, ParseError>;
}

impl<F> LineHandler for F
where
    F: FnMut(&str, usize, Option<Pid>) -> Result<Flow, ParseError>,
{
    fn handle_line(
        &mut self,
        line: &str,
        index: usize,
        key: Option<Pid>,
    ) -> Result<Flow, ParseError> {
        self(line, index, key)
    }
}

/// Feed at most `max_lines` lines of `path` to `handler`.
///
/// Returns the number of lines handed over. Reading stops early when the
/// handler returns [`Flow::Stop`].
pub fn read_source<H>(
    path: &Path,
    handler: &mut H,
    max_lines: usize,
    key: Option<Pid>,
) -> Result<usize, SourceError>
where
    H: LineHandler + ?Sized,
{
    let file = File::open(path).map_err(|e| SourceError::from_io(path.to_path_buf(), e))?;
    let reader = BufReader::new(file);

    // command names may carry arbitrary bytes, so lines are decoded lossily
    let mut consumed = 0;
    for (index, raw) in reader.split(b'\n').take(max_lines).enumerate() {
        let raw = raw.map_err(|e| SourceError::from_io(path.to_path_buf(), e))?;
        let decoded = String::from_utf8_lossy(&raw);
        let line = decoded.strip_suffix('\r').unwrap_or(&decoded);
        consumed += 1;
        match handler.handle_line(line, index, key) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Stop) => break,
            Err(source) => {
                return Err(SourceError::Malformed {
                    path: path.to_path_buf(),
                    line: index,
                    source,
                });
            }
        }
    }
    Ok(consumed)
}

/// Read a single-value sysfs node, newline stripped.
pub fn read_value(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim_end_matches(['\n', '\r']).to_string())
        .map_err(|e| SourceError::from_io(path.to_path_buf(), e))
}

/// Where every sampled source lives. Roots are configurable so the engine
/// can run against a captured tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub proc_root: PathBuf,
    pub sys_root: PathBuf,
    /// Battery power-supply directory, relative to `sys_root`.
    pub battery: PathBuf,
    /// Thermal zone directory, relative to `sys_root`.
    pub thermal_zone: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        SourcePaths {
            proc_root: PathBuf::from("/proc"),
            sys_root: PathBuf::from("/sys"),
            battery: PathBuf::from("class/power_supply/battery"),
            thermal_zone: PathBuf::from("class/thermal/thermal_zone0"),
        }
    }
}

impl SourcePaths {
    pub fn with_roots(proc_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        SourcePaths {
            proc_root: proc_root.into(),
            sys_root: sys_root.into(),
            ..SourcePaths::default()
        }
    }

    pub fn cpuinfo(&self) -> PathBuf {
        self.proc_root.join("cpuinfo")
    }

    pub fn stat(&self) -> PathBuf {
        self.proc_root.join("stat")
    }

    pub fn uptime(&self) -> PathBuf {
        self.proc_root.join("uptime")
    }

    pub fn meminfo(&self) -> PathBuf {
        self.proc_root.join("meminfo")
    }

    pub fn process_dir(&self, pid: Pid) -> PathBuf {
        self.proc_root.join(pid.to_string())
    }

    pub fn process_stat(&self, pid: Pid) -> PathBuf {
        self.process_dir(pid).join("stat")
    }

    pub fn process_statm(&self, pid: Pid) -> PathBuf {
        self.process_dir(pid).join("statm")
    }

    pub fn battery_attr(&self, attr: &str) -> PathBuf {
        self.sys_root.join(&self.battery).join(attr)
    }

    pub fn thermal_temp(&self) -> PathBuf {
        self.sys_root.join(&self.thermal_zone).join("temp")
    }
}
