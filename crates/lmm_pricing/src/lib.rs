//! # lmm_pricing: Products, Exercise-Value Collection and Path Engines
//!
//! ## Pricing Layer Role
//!
//! The top layer of the three-crate architecture. It drives evolvers from
//! `lmm_models` along simulated paths and turns curve states into priced
//! cash flows and regression training data:
//! - The product, exercise-value and basis-system capability traits with
//!   concrete swap implementations (`product`, `callability`)
//! - The Longstaff-Schwartz node-data collector, sequential and parallel
//!   (`callability::collect`)
//! - The accounting engine pricing a product along paths (`accounting`)
//! - The proxy Greek engine re-running paths under shifted models
//!   (`proxy`)
//! - Sequence statistics and the backward-induction regression helper
//!   (`stats`, `regression`)
//! - Collector configuration (`config`)
//!
//! ## Path-Parallel Execution
//!
//! Paths are embarrassingly parallel: every worker owns its evolver,
//! product clones and RNG stream, and writes to a disjoint path-index
//! range. The parallel collector is bit-identical to the sequential one
//! because Brownian streams are keyed by global path index.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod accounting;
pub mod callability;
pub mod config;
pub mod error;
pub mod product;
pub mod proxy;
pub mod regression;
pub mod stats;

pub use accounting::AccountingEngine;
pub use callability::{
    collect_node_data, collect_node_data_parallel, BasisSystem, ExerciseValue, NodeData,
    NothingExerciseValue, SwapBasisSystem,
};
pub use config::CollectorConfig;
pub use error::{CollectorError, ConfigError};
pub use product::{CashFlow, MarketModelProduct, MultiStepSwap};
pub use proxy::ProxyGreekEngine;
pub use regression::{longstaff_schwartz_regression, RegressionResult};
pub use stats::SequenceStats;
