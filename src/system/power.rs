use serde::Serialize;

use super::reader::{SourcePaths, read_value};

/// One round of best-effort battery and thermal reads. `None` means the
/// node was absent or unreadable this cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PowerReadings {
    pub health: Option<String>,
    pub technology: Option<String>,
    pub level: Option<i32>,
    pub status: Option<String>,
    /// Thermal zone value in the device's raw unit.
    pub temperature: Option<i64>,
}

/// Samples battery and thermal sysfs nodes. Health and technology do not
/// change at runtime and are read on the first sample only.
#[derive(Debug, Default)]
pub struct PowerSampler {
    static_fetched: bool,
}

impl PowerSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn static_fetched(&self) -> bool {
        self.static_fetched
    }

    pub fn sample(&mut self, paths: &SourcePaths) -> PowerReadings {
        let mut readings = PowerReadings::default();
        if !self.static_fetched {
            readings.health = read_string(paths, "health");
            readings.technology = read_string(paths, "technology");
            self.static_fetched = true;
        }
        readings.level = read_number(&paths.battery_attr("capacity"));
        readings.status = read_string(paths, "status");
        readings.temperature = read_number(&paths.thermal_temp());
        readings
    }
}

fn read_string(paths: &SourcePaths, attr: &str) -> Option<String> {
    let path = paths.battery_attr(attr);
    match read_value(&path) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping sysfs node");
            None
        }
    }
}

fn read_number<T: std::str::FromStr>(path: &std::path::Path) -> Option<T> {
    let value = match read_value(path) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping sysfs node");
            return None;
        }
    };
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::debug!(path = %path.display(), value = %value, "non-numeric sysfs value");
            None
        }
    }
}
