//! Process-wide logical clock for tracker timestamps.
//!
//! Stamps are strictly increasing across the process, which makes "most recent
//! removal" comparisons deterministic even when two events land within the same
//! wall-clock instant.

use std::sync::atomic::{AtomicU64, Ordering};

pub type Stamp = u64;

static CLOCK: AtomicU64 = AtomicU64::new(1);

/// Next stamp; never returns the same value twice.
pub fn tick() -> Stamp {
    CLOCK.fetch_add(1, Ordering::Relaxed)
}
