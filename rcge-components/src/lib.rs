//! Single-country CGE model built on `rcge-core`
//!
//! This crate turns a balanced social accounting matrix into a calibrated model and
//! solves it for a new equilibrium.
//!
//! # Module Organisation
//!
//! - `parameters`: Calibration of shares, rates and scale parameters from the baseline
//! - `components`: The equation library, one module per group of agents
//! - `economy`: Every derived quantity at a given state and price vector
//! - `residuals`: Market-clearing residuals solved by the inner solver
//! - `state`: The outer state and its provisional update
//! - `model`: The fixed-point problem, equilibrium output and Walras diagnostics
//!
//! # Configuration
//!
//! [`config::ModelConfig`] gathers account roles, elasticities, calibration targets,
//! the scenario and the solver settings. Every field has a default so a TOML file only
//! needs to list what differs.

pub mod components;
pub mod config;
pub mod economy;
pub mod model;
pub mod parameters;
pub mod residuals;
pub mod sample;
pub mod state;

pub use config::ModelConfig;
pub use model::{CGEModel, Equilibrium, LabelledSeries, MarketBalance};
pub use parameters::ParameterSet;
