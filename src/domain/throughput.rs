use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Cumulative per-device counters from the kernel `stat` file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoCounters {
    pub sectors_read: u64,
    pub ms_reading: u64,
    pub sectors_written: u64,
    pub ms_writing: u64,
}

impl IoCounters {
    pub fn new(sectors_read: u64, ms_reading: u64, sectors_written: u64, ms_writing: u64) -> Self {
        Self {
            sectors_read,
            ms_reading,
            sectors_written,
            ms_writing,
        }
    }
}

/// Instantaneous read/write rate in bytes per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub read_bytes_per_sec: f64,
    pub write_bytes_per_sec: f64,
}

impl ThroughputSample {
    pub fn new(read_bytes_per_sec: f64, write_bytes_per_sec: f64) -> Self {
        Self {
            read_bytes_per_sec,
            write_bytes_per_sec,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.read_bytes_per_sec > 0.0 || self.write_bytes_per_sec > 0.0
    }
}

/// Per-device sampler state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplerState {
    Uninitialized {
        sector_size: u64,
    },
    Primed {
        read_bytes: u64,
        write_bytes: u64,
        at: Instant,
        sector_size: u64,
    },
    /// Counters were unreadable when the sampler was created
    Unavailable,
}

impl SamplerState {
    pub fn new(sector_size: u64) -> Self {
        Self::Uninitialized { sector_size }
    }
}

/// Advance a sampler by one tick.
///
/// The first tick divides the counters by the driver's own cumulative
/// time-spent fields. Later ticks diff against the baseline over monotonic
/// elapsed time. A failed read or a zero interval yields `(0, 0)` and keeps
/// the baseline untouched.
pub fn advance(
    state: SamplerState,
    now: Instant,
    counters: Option<IoCounters>,
) -> (SamplerState, ThroughputSample) {
    match state {
        SamplerState::Uninitialized { sector_size } => {
            let Some(c) = counters else {
                return (SamplerState::Unavailable, ThroughputSample::zero());
            };
            let read_bytes = c.sectors_read.saturating_mul(sector_size);
            let write_bytes = c.sectors_written.saturating_mul(sector_size);
            let sample = ThroughputSample::new(
                rate_over_ms(read_bytes, c.ms_reading),
                rate_over_ms(write_bytes, c.ms_writing),
            );
            let primed = SamplerState::Primed {
                read_bytes,
                write_bytes,
                at: now,
                sector_size,
            };
            (primed, sample)
        }
        SamplerState::Primed {
            read_bytes,
            write_bytes,
            at,
            sector_size,
        } => {
            let Some(c) = counters else {
                return (state, ThroughputSample::zero());
            };
            let elapsed = now.saturating_duration_since(at).as_secs_f64();
            if elapsed <= 0.0 {
                return (state, ThroughputSample::zero());
            }
            let current_read = c.sectors_read.saturating_mul(sector_size);
            let current_write = c.sectors_written.saturating_mul(sector_size);
            let sample = ThroughputSample::new(
                current_read.saturating_sub(read_bytes) as f64 / elapsed,
                current_write.saturating_sub(write_bytes) as f64 / elapsed,
            );
            let next = SamplerState::Primed {
                read_bytes: current_read,
                write_bytes: current_write,
                at: now,
                sector_size,
            };
            (next, sample)
        }
        SamplerState::Unavailable => (state, ThroughputSample::zero()),
    }
}

fn rate_over_ms(bytes: u64, ms: u64) -> f64 {
    if ms == 0 {
        return 0.0;
    }
    bytes as f64 / (ms as f64 / 1000.0)
}

/// Caller-owned sampler states keyed by device path.
///
/// Must persist across snapshots of a repeat loop and must not be shared
/// between concurrent snapshots.
#[derive(Debug, Default)]
pub struct SamplerCache {
    samplers: HashMap<String, SamplerState>,
}

impl SamplerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one sample for `device`, creating and priming its sampler on first use
    pub fn sample(
        &mut self,
        device: &str,
        sector_size: u64,
        now: Instant,
        counters: Option<IoCounters>,
    ) -> ThroughputSample {
        let state = self
            .samplers
            .get(device)
            .copied()
            .unwrap_or_else(|| SamplerState::new(sector_size));
        let (next, sample) = advance(state, now, counters);
        self.samplers.insert(device.to_string(), next);
        sample
    }

    /// Forget devices that are gone so a reappearing device starts fresh
    pub fn retain_devices<F: Fn(&str) -> bool>(&mut self, is_present: F) {
        self.samplers.retain(|device, _| is_present(device));
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_priming_uses_driver_time_fields() {
        let now = Instant::now();
        // 2000 sectors read in 500 ms, 1000 sectors written in 2000 ms
        let counters = IoCounters::new(2000, 500, 1000, 2000);
        let (state, sample) = advance(SamplerState::new(512), now, Some(counters));
        assert_eq!(sample.read_bytes_per_sec, 2000.0 * 512.0 / 0.5);
        assert_eq!(sample.write_bytes_per_sec, 1000.0 * 512.0 / 2.0);
        assert!(matches!(
            state,
            SamplerState::Primed { read_bytes: 1_024_000, write_bytes: 512_000, .. }
        ));
    }

    #[test]
    fn test_priming_with_no_time_spent_is_zero() {
        let (_, sample) = advance(SamplerState::new(512), Instant::now(), Some(IoCounters::new(10, 0, 0, 0)));
        assert_eq!(sample, ThroughputSample::zero());
    }

    #[test]
    fn test_primed_diffs_over_elapsed() {
        let t0 = Instant::now();
        let (state, _) = advance(SamplerState::new(512), t0, Some(IoCounters::new(0, 0, 0, 0)));
        let t1 = t0 + Duration::from_secs(2);
        let (_, sample) = advance(state, t1, Some(IoCounters::new(4096, 10, 2048, 10)));
        assert_eq!(sample.read_bytes_per_sec, 4096.0 * 512.0 / 2.0);
        assert_eq!(sample.write_bytes_per_sec, 2048.0 * 512.0 / 2.0);
    }

    #[test]
    fn test_failed_read_keeps_baseline() {
        let t0 = Instant::now();
        let (state, _) = advance(SamplerState::new(512), t0, Some(IoCounters::new(100, 1, 0, 0)));
        let (state, sample) = advance(state, t0 + Duration::from_secs(1), None);
        assert_eq!(sample, ThroughputSample::zero());

        let (_, sample) = advance(state, t0 + Duration::from_secs(4), Some(IoCounters::new(500, 2, 0, 0)));
        assert_eq!(sample.read_bytes_per_sec, 400.0 * 512.0 / 4.0);
    }

    #[test]
    fn test_zero_elapsed_keeps_baseline() {
        let t0 = Instant::now();
        let (state, _) = advance(SamplerState::new(512), t0, Some(IoCounters::new(100, 1, 0, 0)));
        let (same, sample) = advance(state, t0, Some(IoCounters::new(200, 1, 0, 0)));
        assert_eq!(sample, ThroughputSample::zero());
        assert_eq!(same, state);
    }

    #[test]
    fn test_unreadable_at_creation_is_zero_forever() {
        let t0 = Instant::now();
        let (state, _) = advance(SamplerState::new(512), t0, None);
        assert_eq!(state, SamplerState::Unavailable);
        let (state, sample) = advance(state, t0 + Duration::from_secs(1), Some(IoCounters::new(9, 9, 9, 9)));
        assert_eq!(state, SamplerState::Unavailable);
        assert_eq!(sample, ThroughputSample::zero());
    }

    #[test]
    fn test_counter_regression_saturates() {
        let t0 = Instant::now();
        let (state, _) = advance(SamplerState::new(512), t0, Some(IoCounters::new(1000, 1, 1000, 1)));
        let (_, sample) = advance(state, t0 + Duration::from_secs(1), Some(IoCounters::new(10, 1, 10, 1)));
        assert_eq!(sample, ThroughputSample::zero());
    }

    #[test]
    fn test_cache_persists_and_forgets() {
        let t0 = Instant::now();
        let mut cache = SamplerCache::new();
        cache.sample("/dev/sda", 512, t0, Some(IoCounters::new(0, 0, 0, 0)));
        let sample = cache.sample("/dev/sda", 512, t0 + Duration::from_secs(1), Some(IoCounters::new(2, 0, 0, 0)));
        assert_eq!(sample.read_bytes_per_sec, 1024.0);
        assert_eq!(cache.len(), 1);

        cache.retain_devices(|d| d != "/dev/sda");
        assert_eq!(cache.len(), 0);
    }
}
