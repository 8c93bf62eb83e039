use super::PlatformExtensions;

pub struct Platform;

// No procfs here; callers fall back to the Linux defaults.
impl PlatformExtensions for Platform {
    fn page_size() -> Option<u64> {
        None
    }

    fn ticks_per_second() -> Option<u64> {
        None
    }
}
