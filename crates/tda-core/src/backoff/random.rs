//! Duration arithmetic helpers: jitter, quantization, random start offsets.

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Source of uniformly distributed `f64` values in `[low, high)`.
///
/// Every `rand::Rng` is a source; tests substitute a fixed draw.
pub trait UniformSource {
    fn next_in_range(&mut self, low: f64, high: f64) -> f64;
}

impl<R: rand::Rng> UniformSource for R {
    fn next_in_range(&mut self, low: f64, high: f64) -> f64 {
        self.gen_range(low..high)
    }
}

/// Round `duration` up to the next multiple of `quantum`. A zero quantum is a no-op.
pub fn quantize_duration(duration: Duration, quantum: Duration) -> Duration {
    let q = quantum.as_nanos();
    if q == 0 {
        return duration;
    }
    let steps = duration.as_nanos().div_ceil(q);
    duration_from_nanos(steps.saturating_mul(q))
}

/// Multiply `duration` by a uniform factor in `[1 - factor, 1 + factor]`.
///
/// `factor` must be within `[0, 1]`; a factor of 0 returns the input unchanged
/// without drawing from `source`.
pub fn jitter<S: UniformSource + ?Sized>(duration: Duration, factor: f64, source: &mut S) -> Duration {
    debug_assert!((0.0..=1.0).contains(&factor));
    if factor <= 0.0 {
        return duration;
    }
    let draw = source.next_in_range(1.0 - factor, 1.0 + factor);
    scale_duration(duration, draw)
}

/// A uniformly random fraction of `duration` in `[0, duration / 2)`.
///
/// Used to spread the first firing of recurring jobs.
pub fn random_duration<S: UniformSource + ?Sized>(duration: Duration, source: &mut S) -> Duration {
    scale_duration(duration, source.next_in_range(0.0, 0.5))
}

/// `duration * factor`, saturating at `Duration::MAX` on overflow or NaN.
pub(super) fn scale_duration(duration: Duration, factor: f64) -> Duration {
    Duration::try_from_secs_f64(duration.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

fn duration_from_nanos(nanos: u128) -> Duration {
    match u64::try_from(nanos / NANOS_PER_SEC) {
        Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
        Err(_) => Duration::MAX,
    }
}
