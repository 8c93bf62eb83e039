use super::error::{ParseError, parse_field};
use super::process::Pid;
use super::reader::{Flow, LineHandler};

/// `/proc/uptime`: seconds since boot and aggregate idle seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Uptime {
    pub since_boot: f64,
    pub idle: f64,
}

impl Uptime {
    pub fn parse(line: &str) -> Result<Uptime, ParseError> {
        let fields: Vec<&str> = line.split_ascii_whitespace().collect();
        if fields.len() != 2 {
            return Err(ParseError::FieldCount {
                expected: 2,
                found: fields.len(),
            });
        }
        Ok(Uptime {
            since_boot: parse_field("uptime", Some(fields[0]))?,
            idle: parse_field("idle", Some(fields[1]))?,
        })
    }
}

#[derive(Debug, Default)]
pub struct UptimeHandler {
    value: Option<Uptime>,
}

impl UptimeHandler {
    pub fn value(&self) -> Option<Uptime> {
        self.value
    }
}

impl LineHandler for UptimeHandler {
    fn handle_line(&mut self, line: &str, _index: usize, _key: Option<Pid>) -> Result<Flow, ParseError> {
        self.value = Some(Uptime::parse(line)?);
        Ok(Flow::Stop)
    }
}
