//! Herd Guard Module
//!
//! Decides how values are stored and how reads react to soft expiration.
//!
//! Herd-protected values are stored for `ttl + herd_timeout` seconds, but carry
//! a soft deadline of `ttl`. The first reader past the soft deadline puts the
//! same value back for another `herd_timeout` seconds and reports a miss, so it
//! recomputes while everyone else keeps being served the old value. Nothing is
//! locked: readers racing in the window before that write lands all miss.

use tracing::warn;

use crate::cache::envelope::{unpack, Envelope};

/// Largest TTL the store treats as relative; larger values are unix timestamps.
pub const MAX_RELATIVE_TTL: u64 = 60 * 60 * 24 * 30;

// == Write Plan ==
/// Bytes and store-level expiry for one physical write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub payload: Vec<u8>,
    /// Store exptime, already converted to an absolute timestamp when needed
    pub exptime: u64,
}

// == Lookup ==
/// Outcome of inspecting a stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// Serve this value
    Fresh(Vec<u8>),
    /// Report a miss and write `republish` back
    Stale { republish: WritePlan },
}

// == Herd Guard ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HerdGuard {
    herd_timeout: u64,
    default_ttl: u64,
}

impl HerdGuard {
    /// # Arguments
    /// * `herd_timeout` - Grace period in seconds, at least 1
    /// * `default_ttl` - TTL used when a write passes `None`
    pub fn new(herd_timeout: u64, default_ttl: u64) -> Self {
        // An exptime of 0 never expires, so a zero grace would pin republished values.
        if herd_timeout == 0 {
            warn!("Herd timeout of 0s is not supported, using 1s");
        }

        Self {
            herd_timeout: herd_timeout.max(1),
            default_ttl,
        }
    }

    pub fn herd_timeout(&self) -> u64 {
        self.herd_timeout
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// Converts a relative TTL into the value handed to the store.
    ///
    /// TTLs beyond 30 days would be read as absolute dates, so they are turned
    /// into one here.
    pub fn store_exptime(&self, relative: u64, now: i64) -> u64 {
        if relative > MAX_RELATIVE_TTL {
            relative.saturating_add(now.max(0) as u64)
        } else {
            relative
        }
    }

    /// Plans a write of already-serialized `value`.
    ///
    /// `ttl == Some(0)` stores the value raw with no expiry, as does `herd == false`
    /// (with the resolved TTL).
    pub fn plan_write(&self, value: Vec<u8>, ttl: Option<u64>, herd: bool, now: i64) -> WritePlan {
        let ttl = ttl.unwrap_or(self.default_ttl);

        if !herd || ttl == 0 {
            return WritePlan {
                payload: value,
                exptime: self.store_exptime(ttl, now),
            };
        }

        WritePlan {
            payload: Envelope::pack(value, ttl, now).encode(),
            exptime: self.store_exptime(ttl.saturating_add(self.herd_timeout), now),
        }
    }

    /// Evaluates bytes read from the store at `now`.
    pub fn inspect(&self, raw: Vec<u8>, now: i64) -> Lookup {
        let unpacked = unpack(raw, now);
        if !unpacked.stale {
            return Lookup::Fresh(unpacked.value);
        }

        Lookup::Stale {
            republish: self.plan_republish(unpacked.value, now),
        }
    }

    /// Re-wraps a stale value with a fresh soft deadline `herd_timeout` away,
    /// stored for `herd_timeout` seconds.
    pub fn plan_republish(&self, value: Vec<u8>, now: i64) -> WritePlan {
        WritePlan {
            payload: Envelope::pack(value, self.herd_timeout, now).encode(),
            exptime: self.store_exptime(self.herd_timeout, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::envelope::Payload;

    const NOW: i64 = 1_700_000_000;

    fn guard() -> HerdGuard {
        HerdGuard::new(60, 300)
    }

    #[test]
    fn test_herd_write_adds_grace() {
        let plan = guard().plan_write(b"1".to_vec(), Some(10), true, NOW);

        assert_eq!(plan.exptime, 70);
        match Payload::decode(plan.payload) {
            Payload::Envelope(envelope) => {
                assert_eq!(envelope.value, b"1");
                assert_eq!(envelope.soft_expire_at, NOW + 10);
            }
            Payload::Raw(_) => panic!("herd write must be enveloped"),
        }
    }

    #[test]
    fn test_default_ttl_applies_to_none() {
        let plan = guard().plan_write(b"1".to_vec(), None, true, NOW);
        assert_eq!(plan.exptime, 360);

        let raw = guard().plan_write(b"1".to_vec(), None, false, NOW);
        assert_eq!(raw.exptime, 300);
        assert_eq!(raw.payload, b"1");
    }

    #[test]
    fn test_zero_ttl_is_native_write() {
        let plan = guard().plan_write(b"1".to_vec(), Some(0), true, NOW);
        assert_eq!(plan, WritePlan { payload: b"1".to_vec(), exptime: 0 });
    }

    #[test]
    fn test_non_herd_write_is_raw() {
        let plan = guard().plan_write(b"5".to_vec(), Some(10), false, NOW);
        assert_eq!(plan, WritePlan { payload: b"5".to_vec(), exptime: 10 });
    }

    #[test]
    fn test_long_ttl_becomes_absolute() {
        let forty_days = 40 * 24 * 3600;
        let plan = guard().plan_write(b"1".to_vec(), Some(forty_days), false, NOW);
        assert_eq!(plan.exptime, forty_days + NOW as u64);
    }

    #[test]
    fn test_grace_crossing_ceiling_becomes_absolute() {
        let plan = guard().plan_write(b"1".to_vec(), Some(MAX_RELATIVE_TTL - 10), true, NOW);
        assert_eq!(plan.exptime, MAX_RELATIVE_TTL + 50 + NOW as u64);
    }

    #[test]
    fn test_ceiling_itself_stays_relative() {
        assert_eq!(guard().store_exptime(MAX_RELATIVE_TTL, NOW), MAX_RELATIVE_TTL);
    }

    #[test]
    fn test_inspect_fresh() {
        let plan = guard().plan_write(b"7".to_vec(), Some(10), true, NOW);
        assert_eq!(guard().inspect(plan.payload, NOW + 10), Lookup::Fresh(b"7".to_vec()));
    }

    #[test]
    fn test_inspect_stale_rewraps_with_grace() {
        let plan = guard().plan_write(b"7".to_vec(), Some(10), true, NOW);

        match guard().inspect(plan.payload, NOW + 11) {
            Lookup::Stale { republish } => {
                assert_eq!(republish.exptime, 60);
                assert_eq!(
                    Payload::decode(republish.payload),
                    Payload::Envelope(Envelope {
                        value: b"7".to_vec(),
                        soft_expire_at: NOW + 11 + 60,
                    })
                );
            }
            Lookup::Fresh(_) => panic!("expected stale"),
        }
    }

    #[test]
    fn test_zero_grace_is_raised_to_one_second() {
        let guard = HerdGuard::new(0, 300);
        assert_eq!(guard.herd_timeout(), 1);

        let republish = guard.plan_republish(b"7".to_vec(), NOW);
        assert_eq!(republish.exptime, 1);
        assert_eq!(
            Payload::decode(republish.payload),
            Payload::Envelope(Envelope {
                value: b"7".to_vec(),
                soft_expire_at: NOW + 1,
            })
        );
    }

    #[test]
    fn test_raw_payload_never_stale() {
        assert_eq!(
            guard().inspect(b"\"legacy\"".to_vec(), i64::MAX),
            Lookup::Fresh(b"\"legacy\"".to_vec())
        );
    }
}
