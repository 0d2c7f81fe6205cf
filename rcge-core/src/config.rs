//! Solver settings
//!
//! Both tolerances are independent: the inner tolerance only decides when a price
//! vector is accepted for a given outer state, the outer tolerance decides when the
//! damped iteration has settled.

use crate::errors::{CGEError, CGEResult};
use crate::solver::{InnerSolver, LevenbergMarquardt};
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Settings for the two-level equilibrium search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Weight of the provisional outer state in each damped update.
    ///
    /// Must lie in (0, 1]; 1 applies provisional values without smoothing.
    /// Default: 0.1
    pub damping: FloatValue,

    /// Distance between successive outer states under which the iteration has converged.
    ///
    /// Default: 1e-10
    pub outer_tolerance: FloatValue,

    /// Maximum number of damped updates.
    ///
    /// Default: 1000
    pub max_outer_iterations: usize,

    /// Number of times a failed inner solve is restarted from its best iterate before the
    /// failure is reported.
    ///
    /// Default: 3
    pub max_inner_retries: usize,

    /// Inner root finder.
    ///
    /// Default: [`LevenbergMarquardt`] with a residual tolerance of 1e-5
    pub inner_solver: Arc<dyn InnerSolver>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            damping: 0.1,
            outer_tolerance: 1e-10,
            max_outer_iterations: 1000,
            max_inner_retries: 3,
            inner_solver: Arc::new(LevenbergMarquardt::default()),
        }
    }
}

impl SolverConfig {
    pub fn from_toml_str(content: &str) -> CGEResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| CGEError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CGEResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CGEError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Reject settings under which the iteration cannot terminate meaningfully
    pub fn validate(&self) -> CGEResult<()> {
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(CGEError::Config(format!(
                "damping must be in (0, 1], got {}",
                self.damping
            )));
        }
        if !(self.outer_tolerance > 0.0) {
            return Err(CGEError::Config(format!(
                "outer_tolerance must be positive, got {}",
                self.outer_tolerance
            )));
        }
        if !(self.inner_solver.tolerance() > 0.0) {
            return Err(CGEError::Config(format!(
                "inner solver tolerance must be positive, got {}",
                self.inner_solver.tolerance()
            )));
        }
        if self.max_outer_iterations == 0 {
            return Err(CGEError::Config(
                "max_outer_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_damping(self, damping: FloatValue) -> Self {
        Self { damping, ..self }
    }

    pub fn with_inner_solver(self, inner_solver: impl InnerSolver + 'static) -> Self {
        Self {
            inner_solver: Arc::new(inner_solver),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.damping, 0.1);
        assert_eq!(config.outer_tolerance, 1e-10);
        assert_eq!(config.max_outer_iterations, 1000);
        assert_eq!(config.inner_solver.tolerance(), 1e-5);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml() {
        let config = SolverConfig::from_toml_str(
            r#"
            damping = 0.25

            [inner_solver]
            type = "LevenbergMarquardt"
            tolerance = 1e-7
            "#,
        )
        .unwrap();
        assert_eq!(config.damping, 0.25);
        assert_eq!(config.max_inner_retries, 3);
        assert_eq!(config.inner_solver.tolerance(), 1e-7);
    }

    #[test]
    fn serialisation_round_trip() {
        let config = SolverConfig::default().with_damping(0.5);
        let json = serde_json::to_string(&config).unwrap();
        let restored: SolverConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.damping, 0.5);
        assert_eq!(restored.inner_solver.tolerance(), 1e-5);
    }

    #[test]
    fn rejects_invalid_damping() {
        for damping in [0.0, -0.1, 1.5, f64::NAN] {
            let config = SolverConfig::default().with_damping(damping);
            assert!(matches!(config.validate(), Err(CGEError::Config(_))));
        }
        assert!(matches!(
            SolverConfig::from_toml_str("damping = 2.0"),
            Err(CGEError::Config(_))
        ));
    }
}
