/// Kernel constants the engine needs to turn raw counters into units.
pub trait PlatformExtensions {
    /// Bytes per memory page, as used by `/proc/<pid>/statm`.
    fn page_size() -> Option<u64>;
    /// Scheduler ticks per second, as used by `/proc/<pid>/stat`.
    fn ticks_per_second() -> Option<u64>;
}

pub const DEFAULT_PAGE_SIZE: u64 = 4096;
pub const DEFAULT_TICKS_PER_SECOND: u64 = 100;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod linux;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
mod other;

#[cfg(any(target_os = "linux", target_os = "android"))]
use linux as platform_impl;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
use other as platform_impl;

pub fn page_size() -> u64 {
    platform_impl::Platform::page_size().unwrap_or(DEFAULT_PAGE_SIZE)
}

pub fn ticks_per_second() -> u64 {
    platform_impl::Platform::ticks_per_second().unwrap_or(DEFAULT_TICKS_PER_SECOND)
}
