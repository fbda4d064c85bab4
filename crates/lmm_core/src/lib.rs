//! # lmm_core: Curve-State Foundation for Market-Model Simulation
//!
//! ## Foundation Layer Role
//!
//! lmm_core is the bottom layer of the three-crate architecture, providing:
//! - Numeric type aliases and error types (`types`)
//! - Day count conventions and rate-grid setup glue (`daycount`)
//! - The narrow yield-curve discount lookup interface (`curves`)
//! - The tenor grid shared across a simulation run (`rate_times`)
//! - The discretised forward-rate curve snapshot (`curve_state`)
//! - The run-wide evolution timetable and measure helpers (`evolution`)
//! - Cash-flow-to-numeraire-bond conversion (`discounter`)
//!
//! ## Minimal Dependency Principle
//!
//! This layer has no dependencies on the other lmm_* crates and only minimal
//! external dependencies:
//! - num-traits: generic numeric bounds on the yield-curve interface
//! - chrono: date arithmetic behind the day-count glue
//! - thiserror: structured error types
//! - serde: serialisation support (optional)
//!
//! ## Precondition Policy
//!
//! Constructors and setters validate their inputs and return `Result`.
//! Per-step state queries (`discount_ratio`, `forward_rate`, the swap-rate
//! accessors) treat out-of-range indices and use-before-initialisation as
//! programming errors and panic with a descriptive message; they are never
//! silently clamped.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod curve_state;
pub mod curves;
pub mod daycount;
pub mod discounter;
pub mod evolution;
pub mod rate_times;
pub mod types;

pub use curve_state::LmmCurveState;
pub use discounter::CashFlowDiscounter;
pub use evolution::EvolutionDescription;
pub use rate_times::RateTimes;
pub use types::{DiscountFactor, Rate, Real, Time};
