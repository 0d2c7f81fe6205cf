//! Baseline social accounting matrix
//!
//! Cell `(r, c)` holds the payment made by the column account `c` to the row account `r`,
//! so row totals are receipts and column totals are expenditures. A consistent table
//! is square and every account's receipts equal its expenditures.

use crate::errors::{CGEResult, Imbalance, StructuralError};
use crate::FloatValue;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default relative tolerance used when comparing row and column totals
pub const DEFAULT_BALANCE_TOLERANCE: FloatValue = 1e-6;

/// On-disk layout of an accounting table.
///
/// `values` is row-major and shares `labels` for both rows and columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SamRecord {
    labels: Vec<String>,
    values: Vec<Vec<FloatValue>>,
}

/// A labelled, square table of monetary flows between accounts.
///
/// The table is immutable once built; scenario tooling uses [`SocialAccountingMatrix::with_value`]
/// to derive modified copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SamRecord", into = "SamRecord")]
pub struct SocialAccountingMatrix {
    labels: Vec<String>,
    values: Array2<FloatValue>,
    index: HashMap<String, usize>,
}

impl TryFrom<SamRecord> for SocialAccountingMatrix {
    type Error = StructuralError;

    fn try_from(record: SamRecord) -> Result<Self, Self::Error> {
        SocialAccountingMatrix::from_rows(record.labels, record.values)
    }
}

impl From<SocialAccountingMatrix> for SamRecord {
    fn from(sam: SocialAccountingMatrix) -> Self {
        let values = sam.values.rows().into_iter().map(|r| r.to_vec()).collect();
        SamRecord {
            labels: sam.labels,
            values,
        }
    }
}

impl SocialAccountingMatrix {
    /// Build a table from labels and a dense matrix.
    ///
    /// Only the shape is checked here; call [`SocialAccountingMatrix::validate`] for the
    /// bookkeeping invariants.
    pub fn new(labels: Vec<String>, values: Array2<FloatValue>) -> Result<Self, StructuralError> {
        let (rows, columns) = values.dim();
        check_square(rows, columns)?;
        check_square(labels.len(), columns)?;

        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(StructuralError::DuplicateLabel(label.clone()));
            }
        }

        Ok(Self {
            labels,
            values,
            index,
        })
    }

    /// Build a table from row-major nested vectors.
    pub fn from_rows(
        labels: Vec<String>,
        rows: Vec<Vec<FloatValue>>,
    ) -> Result<Self, StructuralError> {
        let columns = rows.first().map(|r| r.len()).unwrap_or(0);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns {
                return Err(StructuralError::Ragged {
                    row: i,
                    expected: columns,
                    found: row.len(),
                });
            }
        }
        check_square(rows.len(), columns)?;

        let flat: Vec<FloatValue> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((columns, columns), flat)
            .map_err(|e| StructuralError::Format(e.to_string()))?;
        Self::new(labels, values)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, StructuralError> {
        toml::from_str(content).map_err(|e| StructuralError::Format(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, StructuralError> {
        serde_json::from_str(content).map_err(|e| StructuralError::Format(e.to_string()))
    }

    /// Read a table from a `.json` or `.toml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StructuralError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StructuralError::Format(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, StructuralError> {
        toml::to_string(self).map_err(|e| StructuralError::Format(e.to_string()))
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn values(&self) -> &Array2<FloatValue> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Payment from `column` to `row`, if both accounts exist
    pub fn get(&self, row: &str, column: &str) -> Option<FloatValue> {
        Some(self.values[[self.index_of(row)?, self.index_of(column)?]])
    }

    /// Payment from `column` to `row`.
    ///
    /// An account that is not in the table neither pays nor receives anything, so
    /// unknown labels give zero.
    pub fn flow(&self, row: &str, column: &str) -> FloatValue {
        self.get(row, column).unwrap_or(0.0)
    }

    /// Sum of the payments from every account in `columns` to every account in `rows`
    pub fn block<R: AsRef<str>, C: AsRef<str>>(&self, rows: &[R], columns: &[C]) -> FloatValue {
        rows.iter()
            .flat_map(|r| columns.iter().map(move |c| self.flow(r.as_ref(), c.as_ref())))
            .sum()
    }

    /// Receipts of an account
    pub fn row_total(&self, label: &str) -> Option<FloatValue> {
        self.index_of(label).map(|i| self.values.row(i).sum())
    }

    /// Expenditures of an account
    pub fn column_total(&self, label: &str) -> Option<FloatValue> {
        self.index_of(label).map(|i| self.values.column(i).sum())
    }

    /// `(label, row total, column total)` for every account, in table order
    pub fn totals(&self) -> Vec<(String, FloatValue, FloatValue)> {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                (
                    label.clone(),
                    self.values.row(i).sum(),
                    self.values.column(i).sum(),
                )
            })
            .collect()
    }

    /// Copy of the table with a single cell replaced
    pub fn with_value(
        &self,
        row: &str,
        column: &str,
        value: FloatValue,
    ) -> Result<Self, StructuralError> {
        let r = self
            .index_of(row)
            .ok_or_else(|| StructuralError::UnknownAccount(row.to_string()))?;
        let c = self
            .index_of(column)
            .ok_or_else(|| StructuralError::UnknownAccount(column.to_string()))?;
        let mut next = self.clone();
        next.values[[r, c]] = value;
        Ok(next)
    }

    /// Verify that the table is square
    pub fn check_square(&self) -> Result<(), StructuralError> {
        let (rows, columns) = self.values.dim();
        check_square(rows, columns)
    }

    /// Verify the structural invariants with the default tolerance.
    pub fn validate(&self) -> CGEResult<()> {
        self.validate_with_tolerance(DEFAULT_BALANCE_TOLERANCE)
    }

    /// Verify that the table is square, finite and balanced.
    ///
    /// Totals are compared with `tolerance` both as a relative and an absolute bound.
    /// Every unbalanced account is reported, not only the first one.
    pub fn validate_with_tolerance(&self, tolerance: FloatValue) -> CGEResult<()> {
        self.check_square()?;

        for ((r, c), v) in self.values.indexed_iter() {
            if !v.is_finite() {
                return Err(StructuralError::NonFinite {
                    row: self.labels[r].clone(),
                    column: self.labels[c].clone(),
                }
                .into());
            }
        }

        let imbalances: Vec<Imbalance> = self
            .totals()
            .into_iter()
            .filter(|(_, row_total, column_total)| {
                !within_tolerance(*row_total, *column_total, tolerance)
            })
            .map(|(label, row_total, column_total)| Imbalance {
                label,
                row_total,
                column_total,
            })
            .collect();

        if !imbalances.is_empty() {
            return Err(StructuralError::Unbalanced { imbalances }.into());
        }
        log::debug!("Accounting table with {} accounts is balanced", self.len());
        Ok(())
    }
}

fn check_square(rows: usize, columns: usize) -> Result<(), StructuralError> {
    if rows != columns {
        return Err(StructuralError::NotSquare { rows, columns });
    }
    Ok(())
}

fn within_tolerance(a: FloatValue, b: FloatValue, tolerance: FloatValue) -> bool {
    (a - b).abs() <= tolerance.max(tolerance * a.abs().max(b.abs()))
}
