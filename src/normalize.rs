use crate::error::{DataError, Result};
use crate::features::FeatureTable;
use serde::{Deserialize, Serialize};

/// Fitted `(min, max)` pair for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

impl ColumnScale {
    fn apply(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            // Constant column: map to zero instead of dividing by the range.
            0.0
        } else {
            (value - self.min) / range
        }
    }

    fn invert(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            self.min
        } else {
            value * range + self.min
        }
    }
}

/// Per-column min-max scaler fitted on one feature table. The fitted
/// parameters travel with the normalized data so the same transform can be
/// re-applied to held-out rows or inverted; refitting on new data instead of
/// reusing the scaler changes the mapping and is a correctness bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    scales: Vec<ColumnScale>,
}

impl MinMaxScaler {
    /// Fits `(min, max)` over every column not named in `exclude`. Each
    /// exclusion must name an existing column.
    pub fn fit(table: &FeatureTable, exclude: &[String]) -> Result<Self> {
        for name in exclude {
            if !table.has_column(name) {
                return Err(DataError::InvalidArgument(format!(
                    "exclude column '{}' not present in table",
                    name
                )));
            }
        }

        let mut scales = Vec::new();
        for column in table.columns() {
            if exclude.iter().any(|name| *name == column.name) {
                continue;
            }
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &value in column.values.iter().filter(|v| v.is_finite()) {
                min = min.min(value);
                max = max.max(value);
            }
            if !min.is_finite() || !max.is_finite() {
                return Err(DataError::InvalidData(format!(
                    "column '{}' has no defined values to fit",
                    column.name
                )));
            }
            scales.push(ColumnScale {
                column: column.name.clone(),
                min,
                max,
            });
        }

        Ok(Self { scales })
    }

    pub fn scales(&self) -> &[ColumnScale] {
        &self.scales
    }

    fn scale_for(&self, name: &str) -> Option<&ColumnScale> {
        self.scales.iter().find(|s| s.column == name)
    }

    /// Applies the fitted parameters to a table. Fitted columns must all be
    /// present; columns the scaler does not know pass through untouched.
    pub fn transform(&self, table: &FeatureTable) -> Result<FeatureTable> {
        self.map_table(table, |scale, value| scale.apply(value))
    }

    /// Maps a transformed table back to original units.
    pub fn inverse_transform(&self, table: &FeatureTable) -> Result<FeatureTable> {
        self.map_table(table, |scale, value| scale.invert(value))
    }

    fn map_table<F>(&self, table: &FeatureTable, f: F) -> Result<FeatureTable>
    where
        F: Fn(&ColumnScale, f64) -> f64,
    {
        for scale in &self.scales {
            if !table.has_column(&scale.column) {
                return Err(DataError::InvalidData(format!(
                    "table is missing fitted column '{}'",
                    scale.column
                )));
            }
        }

        let mut out = FeatureTable::new(table.dates().to_vec());
        for column in table.columns() {
            let values = match self.scale_for(&column.name) {
                Some(scale) => column.values.iter().map(|&v| f(scale, v)).collect(),
                None => column.values.clone(),
            };
            out.push_column(column.name.clone(), values)?;
        }
        Ok(out)
    }
}

/// Normalizes every non-excluded column of a feature table to [0, 1] and
/// returns the fitted scaler alongside the data.
pub fn normalize_features(
    table: &FeatureTable,
    exclude: &[String],
) -> Result<(FeatureTable, MinMaxScaler)> {
    let scaler = MinMaxScaler::fit(table, exclude)?;
    let normalized = scaler.transform(table)?;
    Ok((normalized, scaler))
}
