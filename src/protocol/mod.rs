//! Protocol documents: typed model, when-expressions, version lookup,
//! risk-arm filtering and loading.

pub mod lenient;
mod load;
mod strata;
mod types;
mod view;
mod when;

pub use load::*;
pub use strata::*;
pub use types::*;
pub use view::*;
pub use when::*;

// ── Tests ──────────────────────────────────────────────────────────────────
