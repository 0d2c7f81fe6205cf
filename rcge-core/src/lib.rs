//! Core machinery for calibrated general equilibrium models.
//!
//! This crate knows nothing about a particular economy. It provides the baseline
//! accounting table and its structural checks, the classification of accounts into
//! model sets, the inner nonlinear solver and the outer damped fixed-point iteration
//! that a concrete model plugs into.

pub mod config;
pub mod errors;
pub mod iteration;
pub mod orchestrator;
pub mod sam;
pub mod sets;
pub mod solver;

/// Floating point type used for every flow, price and parameter.
pub type FloatValue = f64;
