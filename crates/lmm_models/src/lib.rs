//! # lmm_models: Covariance Parameterisations and Forward-Rate Evolvers
//!
//! ## Model Layer Role
//!
//! The middle layer of the three-crate architecture. It turns a calibrated
//! volatility/correlation description into per-step diffusion inputs and
//! advances the curve state along simulated paths:
//! - Exponential forward correlation (`correlation`)
//! - Rank-reduced pseudo-square-roots (`pseudo_sqrt`)
//! - The covariance parameterisation contract and its flat-volatility
//!   implementation (`covariance`)
//! - Brownian-increment generation with per-path independent streams
//!   (`brownian`)
//! - The evolver contract, the displaced-diffusion drift calculator, and
//!   the log-Euler / predictor-corrector evolvers (`evolver`)
//!
//! ## Static Dispatch
//!
//! Evolvers are generic over their covariance parameterisation and Brownian
//! generator; no trait objects appear in the per-step loop.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod brownian;
pub mod correlation;
pub mod covariance;
pub mod error;
pub mod evolver;
pub mod pseudo_sqrt;

pub use brownian::{BrownianGenerator, GaussianBrownianGenerator, GaussianBrownianGeneratorFactory};
pub use covariance::{CovarianceParameterization, FlatVol};
pub use error::ModelError;
pub use evolver::{LogNormalFwdRateEuler, LogNormalFwdRatePc, MarketModelEvolver};
