//! Anchor resolver: turns when-expressions into absolute treatment weeks.
//!
//! One [`AnchorContext`] is built per (protocol, version, stratum). Every
//! phase builder, the cycle calendar and the protocol checks resolve through
//! [`resolve_week`] / [`resolve_span`] against that context, so RT windows and
//! maintenance offsets are derived in exactly one place.

mod context;
mod parse;
mod resolve;
mod schedule;

pub use context::*;
pub use parse::*;
pub use resolve::*;
pub use schedule::*;

// ── Tests ──────────────────────────────────────────────────────────────────
