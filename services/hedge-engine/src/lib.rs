//! Hedge Engine Service
//!
//! Books the residual directional exposure the firm carries when client
//! flow cannot be netted internally, and unwinds it once the physical leg
//! settles.
//!
//! Position lifecycle: `open -> closed` (terminal). Opening is idempotent
//! per linked order and closing is idempotent per hedge id.

pub mod pnl;
pub mod engine;

pub use engine::{ExposureBooking, HedgeClose, HedgeConfig, HedgeEngine};
