//! The adaptive cache-interval algorithm: cheap to recompute paths get
//! walked often, expensive ones (huge directory trees) get walked rarely.

use std::time::Duration;

/// `(total_bytes threshold, interval)`, checked in descending order of size.
const SIZE_THRESHOLDS: [(u64, Duration); 4] = [
    (100 * GIB, Duration::from_secs(30 * 60)),
    (10 * GIB, Duration::from_secs(15 * 60)),
    (1 * GIB, Duration::from_secs(5 * 60)),
    (100 * MIB, Duration::from_secs(2 * 60)),
];

/// `(file_count threshold, interval)`, checked in descending order of count.
const COUNT_THRESHOLDS: [(u64, Duration); 3] = [
    (100_000, Duration::from_secs(20 * 60)),
    (10_000, Duration::from_secs(10 * 60)),
    (1_000, Duration::from_secs(3 * 60)),
];

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

pub const DEFAULT_MIN_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Computes the TTL to assign a freshly-walked `DirectoryStats` entry.
///
/// `calc_time` is how long the walk that produced `total_bytes`/`file_count`
/// took; cheap walks get a short floor (`calc_time * 10`), expensive ones are
/// additionally bumped by size/count thresholds, then clamped to
/// `[min_timeout, max_timeout]`.
pub fn dyn_ttl(
    total_bytes: u64,
    file_count: u64,
    calc_time: Duration,
    min_timeout: Duration,
    max_timeout: Duration,
) -> Duration {
    let mut base = calc_time.saturating_mul(10);

    for (threshold, interval) in SIZE_THRESHOLDS {
        if total_bytes >= threshold {
            base = base.max(interval);
            break;
        }
    }

    for (threshold, interval) in COUNT_THRESHOLDS {
        if file_count >= threshold {
            base = base.max(interval);
            break;
        }
    }

    base.clamp(min_timeout, max_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_with_size_threshold() {
        let ttl = dyn_ttl(
            2_000_000_000,
            500,
            Duration::from_secs(8),
            DEFAULT_MIN_TIMEOUT,
            DEFAULT_MAX_TIMEOUT,
        );
        assert_eq!(ttl, Duration::from_secs(5 * 60));
    }

    #[test]
    fn count_threshold_can_dominate_size_threshold() {
        let ttl = dyn_ttl(
            2_000_000_000,
            12_000,
            Duration::from_secs(8),
            DEFAULT_MIN_TIMEOUT,
            DEFAULT_MAX_TIMEOUT,
        );
        assert_eq!(ttl, Duration::from_secs(10 * 60));
    }

    #[test]
    fn tiny_directory_clamps_to_minimum() {
        let ttl = dyn_ttl(
            100,
            1,
            Duration::from_millis(1),
            DEFAULT_MIN_TIMEOUT,
            DEFAULT_MAX_TIMEOUT,
        );
        assert_eq!(ttl, DEFAULT_MIN_TIMEOUT);
    }

    #[test]
    fn enormous_walk_clamps_to_maximum() {
        let ttl = dyn_ttl(
            500 * GIB,
            1_000_000,
            Duration::from_secs(600),
            DEFAULT_MIN_TIMEOUT,
            DEFAULT_MAX_TIMEOUT,
        );
        assert_eq!(ttl, DEFAULT_MAX_TIMEOUT);
    }
}
