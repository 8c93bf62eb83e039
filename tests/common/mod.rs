#![allow(dead_code)]

use std::fs;
use std::path::Path;

use procpulse::system::collector::{Collector, CollectorSettings};
use procpulse::system::process::{NameRules, Pid};
use procpulse::system::reader::SourcePaths;
use tempfile::TempDir;

pub const PAGE_SIZE: u64 = 4096;

/// A throwaway proc/sys tree the engine can sample.
pub struct FakeTree {
    pub dir: TempDir,
    pub paths: SourcePaths,
}

impl FakeTree {
    pub fn new(cores: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = SourcePaths::with_roots(dir.path().join("proc"), dir.path().join("sys"));
        fs::create_dir_all(&paths.proc_root).unwrap();
        fs::create_dir_all(&paths.sys_root).unwrap();

        let tree = FakeTree { dir, paths };
        let cpuinfo: String = (0..cores)
            .map(|i| format!("processor\t: {i}\nBogoMIPS\t: 38.40\n\n"))
            .collect();
        tree.write_proc("cpuinfo", &cpuinfo);
        tree.set_uptime(90.0);
        tree.set_meminfo(1024 * 1024, 256 * 1024);
        tree
    }

    pub fn collector(&self) -> Collector {
        Collector::new(CollectorSettings {
            paths: self.paths.clone(),
            name_rules: NameRules::default(),
            page_size: PAGE_SIZE,
            ticks_per_second: 100,
        })
    }

    pub fn write_proc(&self, rel: &str, contents: &str) {
        write(&self.paths.proc_root.join(rel), contents.as_bytes());
    }

    /// Like [`set_process`](Self::set_process) but with a raw, possibly
    /// non-UTF-8 command name.
    pub fn set_process_raw(&self, pid: Pid, comm: &[u8], utime: u64, stime: u64, start: u64) {
        let mut line = format!("{pid} (").into_bytes();
        line.extend_from_slice(comm);
        line.extend_from_slice(
            format!(
                ") S 1 {pid} {pid} 0 -1 4194560 120 0 0 0 {utime} {stime} 0 0 20 0 1 0 {start} 123456789 900 18446744073709551615 1 1 0 0 0 0 0 4096 0 0 0 0 17 0 0 0 0 0 0\n"
            )
            .as_bytes(),
        );
        write(&self.paths.process_stat(pid), &line);
    }

    /// One `cpu`/`cpuN` row per entry of (user, system, idle).
    pub fn set_cpu(&self, rows: &[(u64, u64, u64)]) {
        let mut stat = String::new();
        for (i, (user, system, idle)) in rows.iter().enumerate() {
            let label = if i == 0 {
                "cpu ".to_string()
            } else {
                format!("cpu{}", i - 1)
            };
            stat.push_str(&format!("{label} {user} 0 {system} {idle} 0 0 0 0 0 0\n"));
        }
        stat.push_str("intr 12345 0 0\nctxt 999\nbtime 1700000000\n");
        self.write_proc("stat", &stat);
    }

    pub fn set_uptime(&self, secs: f64) {
        self.write_proc("uptime", &format!("{secs:.2} {:.2}\n", secs * 3.5));
    }

    pub fn set_meminfo(&self, total_kb: u64, free_kb: u64) {
        self.write_proc(
            "meminfo",
            &format!(
                "MemTotal:       {total_kb} kB\nMemFree:        {free_kb} kB\nMemAvailable:   {free_kb} kB\nBuffers:        1024 kB\nCached:         2048 kB\n"
            ),
        );
    }

    pub fn set_process(&self, pid: Pid, comm: &str, utime: u64, stime: u64, start: u64) {
        self.write_proc(
            &format!("{pid}/stat"),
            &format!(
                "{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194560 120 0 0 0 {utime} {stime} 0 0 20 0 1 0 {start} 123456789 900 18446744073709551615 1 1 0 0 0 0 0 4096 0 0 0 0 17 0 0 0 0 0 0\n"
            ),
        );
    }

    pub fn set_statm(&self, pid: Pid, size: u64, resident: u64, shared: u64) {
        self.write_proc(
            &format!("{pid}/statm"),
            &format!("{size} {resident} {shared} 10 0 400 0\n"),
        );
    }

    pub fn remove_process(&self, pid: Pid) {
        fs::remove_dir_all(self.paths.process_dir(pid)).unwrap();
    }

    pub fn set_battery(&self, attr: &str, value: &str) {
        write(&self.paths.battery_attr(attr), format!("{value}\n").as_bytes());
    }

    pub fn set_temperature(&self, value: i64) {
        write(&self.paths.thermal_temp(), format!("{value}\n").as_bytes());
    }
}

fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}
