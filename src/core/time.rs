//! Layer 0: time primitives.
//!
//! Timestamp is the authoritative ordering key of the version log.
//! Clock hands out timestamps that never go backward.

use serde::{Deserialize, Serialize};

/// Wall clock milliseconds since the Unix epoch.
///
/// Copy is fine here - it's a measurement, not an identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Render as wall-clock `HH:MM:SS` (UTC) for status lines.
    pub fn hms(self) -> String {
        let format = time::macros::format_description!("[hour]:[minute]:[second]");
        time::OffsetDateTime::from_unix_timestamp((self.0 / 1000) as i64)
            .ok()
            .and_then(|t| t.format(&format).ok())
            .unwrap_or_else(|| "??:??:??".to_string())
    }
}

/// Monotonic wall clock.
///
/// Version timestamps must order the log, so ticks never go backward even
/// when the OS clock does: same-millisecond or backward reads bump by one.
pub struct Clock {
    last_ms: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self { last_ms: 0 }
    }

    /// Next timestamp, strictly greater than or equal to every prior tick.
    ///
    /// Equal timestamps are possible only across ticks in the same
    /// millisecond burst; callers that need a total order tie-break on the
    /// version id.
    pub fn tick(&mut self) -> Timestamp {
        let now = Timestamp::now().0;
        if now > self.last_ms {
            self.last_ms = now;
        }
        // else: clock stalled or went backward - reuse last_ms
        Timestamp(self.last_ms)
    }

    /// Raise the floor to a timestamp seen elsewhere (e.g. recovered from
    /// a persisted log), so later ticks never order behind it even after
    /// a backward OS-clock step across restarts.
    pub fn observe(&mut self, at: Timestamp) {
        if at.0 > self.last_ms {
            self.last_ms = at.0;
        }
    }

    /// Like `tick`, but strictly increasing.
    pub fn tick_unique(&mut self) -> Timestamp {
        let now = Timestamp::now().0;
        if now > self.last_ms {
            self.last_ms = now;
        } else {
            self.last_ms += 1;
        }
        Timestamp(self.last_ms)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
