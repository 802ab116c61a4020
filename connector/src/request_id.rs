//! Correlation identifiers sent as `request.id`.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Local, Utc};

/// Generates `request.id` values.
///
/// Identifiers have the form `PREFIX_USERNAME_COUNTER_TIMESTAMP`. The counter
/// is seeded from the creation time in milliseconds and increases on every
/// call, so two identifiers generated within the same millisecond still
/// differ.
#[derive(Debug)]
pub struct RequestIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl RequestIdGenerator {
    /// Creates a generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        let seed = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        Self::with_seed(prefix, seed)
    }

    /// Creates a generator whose first counter value is `seed + 1`.
    pub fn with_seed(prefix: impl Into<String>, seed: u64) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(seed),
        }
    }

    /// Produces the next identifier for `username`.
    pub fn next(&self, username: &str) -> String {
        let number = self.counter.fetch_add(1, Ordering::Relaxed) + 1;

        format!(
            "{}_{}_{}_{}",
            self.prefix,
            username.to_uppercase(),
            number,
            local_timestamp()
        )
    }
}

/// Local wall-clock time in ISO-8601 layout, e.g. `2026-10-16T14:03:07.512Z`.
///
/// The time is local; the trailing `Z` is part of the identifier format.
fn local_timestamp() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
