use serde::Serialize;

use super::error::{ParseError, parse_field};
use super::process::Pid;
use super::reader::{Flow, LineHandler};

/// Lines of `/proc/meminfo` worth reading; MemTotal and MemFree are always
/// among the first four.
pub const MEMINFO_LINES: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryInfo {
    pub total_kb: u64,
    pub free_kb: u64,
}

impl MemoryInfo {
    pub fn used_kb(&self) -> u64 {
        self.total_kb.saturating_sub(self.free_kb)
    }
}

#[derive(Debug, Default)]
pub struct MemInfoHandler {
    total_kb: Option<u64>,
    free_kb: Option<u64>,
}

impl MemInfoHandler {
    /// The totals seen so far, or the name of the first one still missing.
    pub fn finish(&self) -> Result<MemoryInfo, &'static str> {
        Ok(MemoryInfo {
            total_kb: self.total_kb.ok_or("MemTotal")?,
            free_kb: self.free_kb.ok_or("MemFree")?,
        })
    }
}

/// Parse a `Key:   1234 kB` line into its key and kB value.
pub fn parse_meminfo_line(line: &str) -> Result<(&str, u64), ParseError> {
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
    let key = fields
        .first()
        .and_then(|k| k.strip_suffix(':'))
        .ok_or(ParseError::MissingField("meminfo key"))?;
    if fields.len() != 3 || fields[2] != "kB" {
        return Err(ParseError::FieldCount {
            expected: 3,
            found: fields.len(),
        });
    }
    Ok((key, parse_field(key_label(key), fields.get(1).copied())?))
}

fn key_label(key: &str) -> &'static str {
    match key {
        "MemTotal" => "MemTotal",
        "MemFree" => "MemFree",
        _ => "meminfo value",
    }
}

impl LineHandler for MemInfoHandler {
    fn handle_line(&mut self, line: &str, _index: usize, _key: Option<Pid>) -> Result<Flow, ParseError> {
        let (key, value) = parse_meminfo_line(line)?;
        match key {
            "MemTotal" => self.total_kb = Some(value),
            "MemFree" => self.free_kb = Some(value),
            _ => {}
        }
        if self.total_kb.is_some() && self.free_kb.is_some() {
            return Ok(Flow::Stop);
        }
        Ok(Flow::Continue)
    }
}
