use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Account whose row total differs from its column total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imbalance {
    pub label: String,
    pub row_total: FloatValue,
    pub column_total: FloatValue,
}

impl fmt::Display for Imbalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (row total {}, column total {})",
            self.label, self.row_total, self.column_total
        )
    }
}

fn format_imbalances(imbalances: &[Imbalance]) -> String {
    imbalances
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Problems with the shape or bookkeeping of the baseline accounting table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("Accounting table is not square: {rows} rows and {columns} columns")]
    NotSquare { rows: usize, columns: usize },
    #[error("Row {row} has {found} entries, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Account label {0} appears more than once")]
    DuplicateLabel(String),
    #[error("Non-finite flow from {column} to {row}")]
    NonFinite { row: String, column: String },
    #[error("Row and column totals differ for: {}", format_imbalances(.imbalances))]
    Unbalanced { imbalances: Vec<Imbalance> },
    #[error("Account {0} is not present in the accounting table")]
    UnknownAccount(String),
    #[error("A {0} account is required but none was configured")]
    MissingAccount(String),
    #[error("Account {label} is assigned to both {first} and {second}")]
    ConflictingRole {
        label: String,
        first: String,
        second: String,
    },
    #[error("Account {0} has no role; list it as a sector or assign it explicitly")]
    UnclassifiedAccount(String),
    #[error("Failed to read accounting table: {0}")]
    Format(String),
}

/// Snapshot reported when the outer iteration stops without an equilibrium.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Number of damped updates applied before stopping
    pub iterations: usize,
    /// Residual norm of the last inner solve
    pub residual_norm: FloatValue,
    /// Distance between the last provisional and current outer state
    pub distance: FloatValue,
    /// Last inner solution
    pub prices: Vec<FloatValue>,
    /// Last outer state, flattened
    pub outer_state: Vec<FloatValue>,
}

/// Error type for every stage of an equilibrium computation.
#[derive(Error, Debug)]
pub enum CGEError {
    #[error(transparent)]
    StructuralInput(#[from] StructuralError),
    #[error("Calibrated {parameter} for {account} is {value}: {reason}")]
    CalibrationDomain {
        parameter: String,
        account: String,
        value: FloatValue,
        reason: String,
    },
    #[error("Inner solve did not converge after {iterations} iterations (residual norm {residual_norm:e})")]
    InnerSolveNonConvergence {
        iterations: usize,
        residual_norm: FloatValue,
        /// Iterate with the smallest residual norm seen
        best: Vec<FloatValue>,
    },
    #[error("Outer iteration did not converge after {} updates (distance {:e}, residual norm {:e})", .0.iterations, .0.distance, .0.residual_norm)]
    OuterMaxIterationsExceeded(Box<Diagnostics>),
    #[error("Outer iteration diverged after {} updates", .0.iterations)]
    OuterDiverged(Box<Diagnostics>),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl CGEError {
    /// Whether the error was raised before any solve was attempted.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CGEError::StructuralInput(_) | CGEError::CalibrationDomain { .. } | CGEError::Config(_)
        )
    }

    /// Whether the error came from the inner solver or the outer iteration.
    pub fn is_solver_error(&self) -> bool {
        !self.is_input_error()
    }

    /// Shorthand for a [`CGEError::CalibrationDomain`] error.
    pub fn calibration_domain(
        parameter: &str,
        account: &str,
        value: FloatValue,
        reason: &str,
    ) -> Self {
        CGEError::CalibrationDomain {
            parameter: parameter.to_string(),
            account: account.to_string(),
            value,
            reason: reason.to_string(),
        }
    }
}

/// Convenience type for `Result<T, CGEError>`.
pub type CGEResult<T> = Result<T, CGEError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbalanced_message_names_every_account() {
        let err = StructuralError::Unbalanced {
            imbalances: vec![
                Imbalance {
                    label: "AGR".to_string(),
                    row_total: 101.0,
                    column_total: 100.0,
                },
                Imbalance {
                    label: "HH".to_string(),
                    row_total: 50.0,
                    column_total: 51.0,
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("AGR (row total 101, column total 100)"));
        assert!(message.contains("HH (row total 50, column total 51)"));
    }

    #[test]
    fn error_families() {
        let input: CGEError = StructuralError::NotSquare {
            rows: 3,
            columns: 4,
        }
        .into();
        assert!(input.is_input_error());
        assert_eq!(
            input.to_string(),
            "Accounting table is not square: 3 rows and 4 columns"
        );

        let solver = CGEError::InnerSolveNonConvergence {
            iterations: 1,
            residual_norm: 2.5,
            best: vec![1.0],
        };
        assert!(solver.is_solver_error());
    }
}
