use amiga_proto::nexus::Timestamp;

/// Current time on the system monotonic clock, the clock the robot stamps
/// acquisitions with.
#[cfg(unix)]
pub fn monotonic_now() -> Timestamp {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    // SAFETY: `ts` is a valid writable timespec and CLOCK_MONOTONIC is
    // supported on every unix target.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if rc != 0 {
        return Timestamp::default();
    }

    Timestamp {
        seconds: i64::from(ts.tv_sec),
        nanos: ts.tv_nsec as i32,
    }
}

/// Current time on a process-local monotonic clock.
#[cfg(not(unix))]
pub fn monotonic_now() -> Timestamp {
    use std::sync::OnceLock;
    use std::time::Instant;

    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    let elapsed = ORIGIN.get_or_init(Instant::now).elapsed();
    Timestamp {
        seconds: elapsed.as_secs() as i64,
        nanos: elapsed.subsec_nanos() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let first = monotonic_now();
        let second = monotonic_now();
        assert!((0..1_000_000_000).contains(&first.nanos));
        assert!(
            (second.seconds, second.nanos) >= (first.seconds, first.nanos),
            "{second:?} < {first:?}"
        );
    }
}
