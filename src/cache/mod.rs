//! Cache Module
//!
//! Herd-protected caching on top of a memcached-style store: key encoding,
//! value envelopes, the stale-republish guard and the public facade.

mod clock;
mod envelope;
mod facade;
mod herd;
mod key;
mod stats;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::{unpack, Envelope, Payload, Unpacked, MARKER};
pub use facade::HerdCache;
pub use herd::{HerdGuard, Lookup, WritePlan, MAX_RELATIVE_TTL};
pub use key::{HashStrategy, KeyCodec, KeyEncoder};
pub use stats::{HerdStats, HerdStatsSnapshot};
