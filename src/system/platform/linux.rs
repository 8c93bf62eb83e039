use super::PlatformExtensions;

pub struct Platform;

fn sysconf(name: libc::c_int) -> Option<u64> {
    // SAFETY: sysconf only reads a kernel constant.
    let value = unsafe { libc::sysconf(name) };
    u64::try_from(value).ok().filter(|&v| v > 0)
}

impl PlatformExtensions for Platform {
    fn page_size() -> Option<u64> {
        sysconf(libc::_SC_PAGESIZE)
    }

    fn ticks_per_second() -> Option<u64> {
        sysconf(libc::_SC_CLK_TCK)
    }
}
