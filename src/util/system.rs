//! Thin wrappers over system-specific timestamp calls.
//!
//! Mirrors the split rAdvisor keeps between the public, OS-independent
//! function signatures in `util::system` and the `libc`-backed
//! implementation underneath.

/// Gets the current time as a millisecond unix timestamp, used to stamp
/// each resolved metric value at emission time.
#[must_use]
pub fn milli_ts() -> u128 { imp::milli_ts() }

#[cfg(target_os = "linux")]
mod imp {
    use libc::{clock_gettime, timespec, CLOCK_REALTIME};
    use std::mem;

    fn get_time() -> timespec {
        let mut tp: timespec = unsafe { mem::zeroed() };
        unsafe {
            clock_gettime(CLOCK_REALTIME, &mut tp);
        }
        tp
    }

    pub fn milli_ts() -> u128 {
        let tp = get_time();
        (tp.tv_nsec as u128) / 1_000_000 + (tp.tv_sec as u128) * 1_000
    }
}

#[cfg(not(target_os = "linux"))]
mod imp {
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn milli_ts() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }
}
