use std::fmt::Write;

use crate::format::{format_bytes, truncate_unicode};
use crate::system::snapshot::{BatteryInfo, SystemSnapshot};
use crate::system::process::SortOrder;

const NAME_WIDTH: usize = 16;

/// Plain-text view of a snapshot: system lines followed by the top
/// `limit` processes in `order`.
pub fn render(snapshot: &SystemSnapshot, order: SortOrder, limit: usize) -> String {
    let mut out = String::new();

    let uptime = if snapshot.uptime.is_empty() {
        "-"
    } else {
        snapshot.uptime.as_str()
    };
    let _ = writeln!(out, "cycle {}  up {}", snapshot.cycle, uptime);

    let cores: Vec<String> = snapshot
        .cpu_usage
        .iter()
        .skip(1)
        .map(|u| u.to_string())
        .collect();
    let _ = writeln!(out, "cpu {}% [{}]", snapshot.cpu_summary(), cores.join(" "));

    match snapshot.memory {
        Some(mem) => {
            let _ = writeln!(
                out,
                "mem {} used / {} total ({} free)",
                format_bytes(mem.used_kb() * 1024),
                format_bytes(mem.total_kb * 1024),
                format_bytes(mem.free_kb * 1024)
            );
        }
        None => out.push_str("mem -\n"),
    }

    let _ = writeln!(out, "battery {}", battery_line(&snapshot.battery));
    match snapshot.temperature {
        Some(t) => {
            let _ = writeln!(out, "temp {t}");
        }
        None => out.push_str("temp -\n"),
    }

    let _ = writeln!(
        out,
        "{:>7} {:<NAME_WIDTH$} {} {:>4} {:>4} {:>9}",
        "PID", "NAME", "S", "CPU%", "MEM%", "RSS"
    );
    for p in snapshot.top_processes(order, limit) {
        let _ = writeln!(
            out,
            "{:>7} {:<NAME_WIDTH$} {} {:>4} {:>4} {:>9}",
            p.pid,
            truncate_unicode(&p.name, NAME_WIDTH),
            p.state,
            p.cpu_usage,
            p.memory_usage,
            format_bytes(p.resident_bytes)
        );
    }
    out
}

fn battery_line(battery: &BatteryInfo) -> String {
    let mut parts = Vec::new();
    if let Some(level) = battery.level {
        parts.push(format!("{level}%"));
    }
    if let Some(status) = &battery.status {
        parts.push(status.clone());
    }
    let details: Vec<&str> = [&battery.health, &battery.technology]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect();
    if !details.is_empty() {
        parts.push(format!("({})", details.join(", ")));
    }
    if parts.is_empty() {
        return "-".to_string();
    }
    parts.join(" ")
}
