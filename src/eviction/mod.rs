//! Capacity-pressure victim selection.
//!
//! When a tier holds more bytes than its configured limit, the optimizer asks
//! [`TanCurvePolicy`] which entries to move out. Scores combine recency,
//! frequency, size and priority; lowest goes first.
//!
//! ```text
//! fast           ──over limit──▶ durable-small
//! durable-small  ──over limit──▶ durable-large
//! durable-large  ──over limit──▶ evicted
//! ```

pub mod tan_curve;

pub use tan_curve::{Candidate, TanCurvePolicy};
