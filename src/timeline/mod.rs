//! Protocol timeline: phases, the week-sorted timeline, packed lanes and the
//! cycle calendar for one (protocol, version, stratum).
//!
//! Every builder takes the same [`crate::anchor::AnchorContext`], so an item
//! shows up at the same week in the phase list, the timeline, the lanes and
//! the calendar.

mod calendar;
mod labels;
mod lanes;
mod phases;
mod sequence;
mod types;

pub use calendar::*;
pub use labels::*;
pub use lanes::*;
pub use phases::*;
pub use sequence::*;
pub use types::*;

// ── Tests ──────────────────────────────────────────────────────────────────
