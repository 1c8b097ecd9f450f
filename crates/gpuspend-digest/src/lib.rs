//! Daily digest and spend alerts for gpuspend
//!
//! [`DigestGenerator`] composes the daily snapshot report and
//! [`AlertChecker`] runs the burn-rate and idle-spend checks. Both read
//! through a [`Repository`](gpuspend_core::Repository) and reuse the
//! recommendation engine.

pub mod alerts;
pub mod digest;

pub use alerts::{AlertChecker, BurnRateAlert, IdleSpendAlert};
pub use digest::{DigestGenerator, DigestPayload, DigestRecommendation, TopContributor};
