//! Value Envelope Module
//!
//! Packs a value together with its soft-expiration timestamp so a stale copy
//! can outlive its logical lifetime in the store.
//!
//! # Layout
//! `MARKER (6 bytes) | soft_expire_at (i64, big-endian) | value bytes`
//!
//! Anything else read from the store is treated as a raw value.

/// Leading bytes identifying a herd-managed payload.
///
/// JSON text never starts with 0xFF, so serialized raw values cannot collide.
pub const MARKER: &[u8; 6] = b"\xffHERD\x01";

const HEADER_LEN: usize = MARKER.len() + 8;

// == Envelope ==
/// A herd-managed value with its logical expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Serialized value
    pub value: Vec<u8>,
    /// Unix second after which the value is stale
    pub soft_expire_at: i64,
}

impl Envelope {
    /// Wraps `value` so it turns stale `ttl` seconds after `now`.
    pub fn pack(value: Vec<u8>, ttl: u64, now: i64) -> Self {
        Self {
            value,
            soft_expire_at: now.saturating_add_unsigned(ttl),
        }
    }

    pub fn is_stale(&self, now: i64) -> bool {
        now > self.soft_expire_at
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.value.len());
        out.extend_from_slice(MARKER);
        out.extend_from_slice(&self.soft_expire_at.to_be_bytes());
        out.extend_from_slice(&self.value);
        out
    }
}

// == Payload ==
/// What a stored byte string turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Envelope(Envelope),
    /// Written without herd protection, or by someone else entirely
    Raw(Vec<u8>),
}

impl Payload {
    /// Classifies raw store bytes. Never fails.
    pub fn decode(raw: Vec<u8>) -> Self {
        if raw.len() < HEADER_LEN || !raw.starts_with(MARKER) {
            return Payload::Raw(raw);
        }

        let mut stamp = [0u8; 8];
        stamp.copy_from_slice(&raw[MARKER.len()..HEADER_LEN]);

        Payload::Envelope(Envelope {
            value: raw[HEADER_LEN..].to_vec(),
            soft_expire_at: i64::from_be_bytes(stamp),
        })
    }
}

// == Unpacked ==
/// A value read back from the store plus its freshness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unpacked {
    pub value: Vec<u8>,
    pub stale: bool,
}

/// Unwraps stored bytes, evaluating staleness at `now`.
///
/// Raw payloads pass through untouched and are always fresh.
pub fn unpack(raw: Vec<u8>, now: i64) -> Unpacked {
    match Payload::decode(raw) {
        Payload::Envelope(envelope) => {
            let stale = envelope.is_stale(now);
            Unpacked {
                value: envelope.value,
                stale,
            }
        }
        Payload::Raw(value) => Unpacked {
            value,
            stale: false,
        },
    }
}
