//! Equation library
//!
//! Pure functions implementing the economic relationships of the model. Every function
//! maps prices, quantities and parameters to a quantity or price and has no side
//! effects. Inputs are expected inside the function's domain (positive prices, shares
//! in `[0, 1]`); callers are responsible for that.

pub mod aggregates;
pub mod ces;
pub mod firms;
pub mod government;
pub mod household;
