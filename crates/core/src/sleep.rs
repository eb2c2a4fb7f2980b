use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

/// `base` plus up to `spread * base` of random extra delay. Never shorter
/// than `base`.
pub fn jitter(base: Duration, spread: f64) -> Duration {
    if spread <= 0.0 || base.is_zero() {
        return base;
    }
    let extra = base.as_secs_f64() * spread;
    base + Duration::from_secs_f64(rand::thread_rng().gen_range(0.0..extra))
}

/// Sleep until `deadline`; returns at once if it already passed.
pub fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        thread::sleep(deadline - now);
    }
}
