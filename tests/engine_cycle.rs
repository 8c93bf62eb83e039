mod common;

use common::FakeTree;
use procpulse::system::snapshot::{MetricEvent, SystemSnapshot};

fn cpu_usage(events: &[MetricEvent]) -> Option<Vec<u8>> {
    events.iter().find_map(|e| match e {
        MetricEvent::CpuUsage(usage) => Some(usage.clone()),
        _ => None,
    })
}

fn processes(events: &[MetricEvent]) -> Vec<procpulse::system::process::ProcessEntry> {
    events
        .iter()
        .find_map(|e| match e {
            MetricEvent::Processes(p) => Some(p.clone()),
            _ => None,
        })
        .expect("no process event")
}

#[test]
fn first_cycle_reports_zero_usage_and_sizes_rows_from_cpuinfo() {
    let tree = FakeTree::new(2);
    tree.set_cpu(&[(200, 100, 700), (100, 50, 350), (100, 50, 350)]);
    let mut collector = tree.collector();

    let events = collector.run_cycle();

    assert_eq!(collector.core_count(), Some(2));
    assert_eq!(cpu_usage(&events), Some(vec![0, 0, 0]));
}

#[test]
fn second_cycle_derives_per_core_usage() {
    let tree = FakeTree::new(2);
    tree.set_cpu(&[(200, 100, 700), (100, 50, 350), (100, 50, 350)]);
    let mut collector = tree.collector();
    collector.run_cycle();

    // core0 fully busy, core1 idle
    tree.set_cpu(&[(300, 100, 800), (200, 50, 350), (100, 50, 450)]);
    let events = collector.run_cycle();
    assert_eq!(cpu_usage(&events), Some(vec![50, 100, 0]));
}

#[test]
fn unchanged_counters_give_zero_usage() {
    let tree = FakeTree::new(1);
    tree.set_cpu(&[(200, 100, 700), (200, 100, 700)]);
    let mut collector = tree.collector();
    collector.run_cycle();
    let events = collector.run_cycle();
    assert_eq!(cpu_usage(&events), Some(vec![0, 0]));
}

#[test]
fn missing_cpuinfo_tracks_aggregate_only() {
    let tree = FakeTree::new(0);
    std::fs::remove_file(tree.paths.cpuinfo()).unwrap();
    tree.set_cpu(&[(1, 1, 8), (1, 1, 8)]);
    let mut collector = tree.collector();
    let events = collector.run_cycle();
    assert_eq!(collector.core_count(), Some(0));
    assert_eq!(cpu_usage(&events), Some(vec![0]));
}

#[test]
fn malformed_stat_keeps_previous_values_and_baseline() {
    let tree = FakeTree::new(1);
    tree.set_cpu(&[(100, 100, 800), (100, 100, 800)]);
    let mut collector = tree.collector();
    collector.run_cycle();

    tree.set_cpu(&[(150, 150, 900), (150, 150, 900)]);
    collector.run_cycle();
    assert_eq!(collector.cpu_usage(), &[50, 50]);

    tree.write_proc("stat", "cpu  1 2\n");
    let events = collector.run_cycle();
    assert_eq!(cpu_usage(&events), None);
    assert_eq!(collector.cpu_usage(), &[50, 50]);

    // delta is taken against the last good sample
    tree.set_cpu(&[(250, 150, 1000), (250, 150, 1000)]);
    let events = collector.run_cycle();
    assert_eq!(cpu_usage(&events), Some(vec![50, 50]));
}

#[test]
fn skipped_cycles_resume_from_last_sample() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(100, 100, 800)]);
    let mut collector = tree.collector();
    collector.run_cycle();

    // counters move on while nobody samples them
    tree.set_cpu(&[(300, 100, 1100)]);
    tree.set_cpu(&[(500, 200, 1300)]);
    let events = collector.run_cycle();
    // active 700-200 over total 2000-1000
    assert_eq!(cpu_usage(&events), Some(vec![50]));
}

#[test]
fn process_usage_from_crafted_ticks() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(100, 100, 800)]);
    tree.set_process(42, "harbour-foo", 100, 50, 7);
    tree.set_statm(42, 131072, 65536, 1024);
    let mut collector = tree.collector();

    let first = processes(&collector.run_cycle());
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].pid, 42);
    assert_eq!(first[0].name, "foo(h)");
    assert_eq!(first[0].state, 'S');
    assert_eq!(first[0].cpu_usage, 0);

    tree.set_cpu(&[(150, 150, 900)]);
    tree.set_process(42, "harbour-foo", 150, 80, 7);
    let second = processes(&collector.run_cycle());
    assert_eq!(second[0].cpu_usage, 40);
    assert_eq!(second[0].prev_cpu_ticks, 150);
    assert_eq!(second[0].cpu_ticks, 230);

    let ticks_per_second = collector.settings().ticks_per_second;
    let cpu_time = second[0].cpu_time(ticks_per_second).as_secs_f64();
    assert!((cpu_time - 2.3).abs() < 1e-6);
}

#[test]
fn process_sampled_before_cpu_totals_reports_zero() {
    let tree = FakeTree::new(0);
    tree.set_process(42, "early", 100, 50, 7);
    tree.set_statm(42, 1, 1, 1);
    let mut collector = tree.collector();

    // no /proc/stat yet, so there is nothing to measure against
    let first = processes(&collector.run_cycle());
    assert_eq!(first[0].cpu_usage, 0);
    assert!(!first[0].has_baseline());

    tree.set_cpu(&[(150, 150, 900)]);
    tree.set_process(42, "early", 150, 80, 7);
    let second = processes(&collector.run_cycle());
    assert_eq!(second[0].cpu_usage, 0);
    assert!(second[0].has_baseline());

    tree.set_cpu(&[(250, 150, 1000)]);
    tree.set_process(42, "early", 190, 80, 7);
    let third = processes(&collector.run_cycle());
    assert_eq!(third[0].cpu_usage, 20);
}

#[test]
fn non_utf8_command_name_is_still_sampled() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(100, 100, 800)]);
    tree.set_process_raw(42, b"ab\xffc", 100, 50, 7);
    tree.set_statm(42, 1, 1, 1);
    let mut collector = tree.collector();
    collector.run_cycle();

    tree.set_cpu(&[(150, 150, 900)]);
    tree.set_process_raw(42, b"ab\xffc", 150, 80, 7);
    let procs = processes(&collector.run_cycle());
    assert_eq!(procs[0].name, "ab\u{fffd}c");
    assert_eq!(procs[0].state, 'S');
    assert_eq!(procs[0].cpu_ticks, 230);
    assert_eq!(procs[0].cpu_usage, 40);
}

#[test]
fn process_memory_against_total() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(1, 1, 8)]);
    tree.set_meminfo(1024 * 1024, 100);
    tree.set_process(7, "bar", 1, 1, 1);
    // 65536 pages of 4 KiB = 256 MiB of 1 GiB
    tree.set_statm(7, 131072, 65536, 1024);
    let mut collector = tree.collector();

    let procs = processes(&collector.run_cycle());
    assert_eq!(procs[0].name, "bar");
    assert_eq!(procs[0].resident_bytes, 256 * 1024 * 1024);
    assert_eq!(procs[0].vm_size_bytes, 512 * 1024 * 1024);
    assert_eq!(procs[0].shared_bytes, 4 * 1024 * 1024);
    assert_eq!(procs[0].memory_usage, 25);
}

#[test]
fn reconciliation_adds_and_removes() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(1, 1, 8)]);
    for pid in [10, 20] {
        tree.set_process(pid, "svc", 1, 1, 1);
        tree.set_statm(pid, 1, 1, 1);
    }
    let mut collector = tree.collector();
    collector.run_cycle();
    assert_eq!(collector.table().pids(), vec![10, 20]);

    tree.remove_process(20);
    tree.set_process(30, "late", 1, 1, 5);
    tree.set_statm(30, 1, 1, 1);
    let procs = processes(&collector.run_cycle());

    let pids: Vec<u32> = procs.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![10, 30]);
    assert_eq!(collector.table().pids(), vec![10, 30]);
    let late = collector.table().get(30).unwrap();
    assert_eq!(late.cpu_usage, 0);
    assert_eq!(late.name, "late");
}

#[test]
fn directory_without_stat_is_not_tracked() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(1, 1, 8)]);
    std::fs::create_dir_all(tree.paths.process_dir(99)).unwrap();
    let mut collector = tree.collector();
    let procs = processes(&collector.run_cycle());
    assert!(procs.is_empty());
    assert!(collector.table().is_empty());
}

#[test]
fn missing_statm_keeps_entry_with_zero_memory() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(1, 1, 8)]);
    tree.set_process(5, "nostatm", 1, 1, 1);
    let mut collector = tree.collector();
    let procs = processes(&collector.run_cycle());
    assert_eq!(procs.len(), 1);
    assert_eq!(procs[0].name, "nostatm");
    assert_eq!(procs[0].resident_bytes, 0);
}

#[test]
fn reused_pid_does_not_inherit_baseline() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(100, 100, 800)]);
    tree.set_process(42, "old", 500, 300, 7);
    tree.set_statm(42, 1, 1, 1);
    let mut collector = tree.collector();
    collector.run_cycle();

    tree.set_cpu(&[(150, 150, 900)]);
    tree.set_process(42, "new", 10, 10, 9000);
    let procs = processes(&collector.run_cycle());
    assert_eq!(procs[0].name, "new");
    assert_eq!(procs[0].cpu_usage, 0);
}

#[test]
fn uptime_memory_and_power_are_published() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(1, 1, 8)]);
    tree.set_uptime(3661.0);
    tree.set_battery("health", "Good");
    tree.set_battery("technology", "Li-ion");
    tree.set_battery("capacity", "64");
    tree.set_battery("status", "Discharging");
    tree.set_temperature(38000);
    let mut collector = tree.collector();

    let mut snapshot = SystemSnapshot::default();
    snapshot.apply_cycle(&collector.run_cycle());
    assert_eq!(snapshot.uptime, "1h 1m 1s");
    assert_eq!(snapshot.uptime_secs, Some(3661.0));
    assert_eq!(collector.uptime().map(|u| u.since_boot), Some(3661.0));
    assert_eq!(collector.total_memory_kb(), 1024 * 1024);
    let mem = snapshot.memory.unwrap();
    assert_eq!(mem.total_kb, 1024 * 1024);
    assert_eq!(mem.free_kb, 256 * 1024);
    assert_eq!(snapshot.battery.health.as_deref(), Some("Good"));
    assert_eq!(snapshot.battery.technology.as_deref(), Some("Li-ion"));
    assert_eq!(snapshot.battery.level, Some(64));
    assert_eq!(snapshot.battery.status.as_deref(), Some("Discharging"));
    assert_eq!(snapshot.temperature, Some(38000));

    // static battery facts come once; the snapshot keeps them
    tree.set_battery("capacity", "63");
    let events = collector.run_cycle();
    assert!(!events.iter().any(|e| matches!(e, MetricEvent::BatteryHealth(_))));
    snapshot.apply_cycle(&events);
    assert_eq!(snapshot.battery.health.as_deref(), Some("Good"));
    assert_eq!(snapshot.battery.level, Some(63));
}

#[test]
fn hardware_without_battery_still_samples_everything_else() {
    let tree = FakeTree::new(0);
    tree.set_cpu(&[(1, 1, 8)]);
    let mut collector = tree.collector();
    let events = collector.run_cycle();
    assert!(cpu_usage(&events).is_some());
    assert!(events.iter().any(|e| matches!(e, MetricEvent::Memory(_))));
    assert!(events.iter().any(|e| matches!(e, MetricEvent::Uptime { .. })));
    assert!(!events.iter().any(|e| matches!(
        e,
        MetricEvent::BatteryLevel(_) | MetricEvent::Temperature(_)
    )));
}

#[test]
fn unreadable_sources_publish_nothing_and_do_not_panic() {
    let tree = FakeTree::new(0);
    std::fs::remove_file(tree.paths.uptime()).unwrap();
    std::fs::remove_file(tree.paths.meminfo()).unwrap();
    let mut collector = tree.collector();
    let events = collector.run_cycle();
    assert!(cpu_usage(&events).is_none());
    assert!(!events.iter().any(|e| matches!(e, MetricEvent::Uptime { .. })));
    assert!(!events.iter().any(|e| matches!(e, MetricEvent::Memory(_))));
    assert_eq!(collector.cycles(), 1);
}
